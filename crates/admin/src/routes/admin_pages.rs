//! Back-office pages.
//!
//! Pages are rendered on the server from the actions; every change goes
//! through the JSON API (`/api/admin/...`) called by `static/admin.js`.

use askama::Template;
use axum::{
    Router,
    extract::{Query, State},
    response::Html,
    routing::get,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::instrument;

use formdetoit_core::Permission;

use crate::actions::{MaintenanceMode, NotFoundEntry, NotFoundStats};
use crate::db::ResourceStats;
use crate::error::AppError;
use crate::filters;
use crate::middleware::{RequireAdminAuth, require_permission};
use crate::models::{
    Category, Certification, CurrentAdmin, Entity, JobOpening, LexiconTerm, Page, Popup,
    Redirect, TeamMember, User,
};
use crate::routes::render;
use crate::state::AppState;

/// Build the back-office page router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/admin", get(dashboard))
        .route("/admin/404-logs", get(not_found_logs))
        .merge(resource_page_router::<TeamMember>())
        .merge(resource_page_router::<JobOpening>())
        .merge(resource_page_router::<Category>())
        .merge(resource_page_router::<Certification>())
        .merge(resource_page_router::<LexiconTerm>())
        .merge(resource_page_router::<Page>())
        .merge(resource_page_router::<Popup>())
        .merge(resource_page_router::<Redirect>())
        .merge(resource_page_router::<User>())
}

fn resource_page_router<E: Entity>() -> Router<AppState> {
    Router::new().route(&format!("/admin/{}", E::RESOURCE), get(resource_page::<E>))
}

// =============================================================================
// Layout
// =============================================================================

/// Navigation entry shown in the sidebar.
#[derive(Debug, Clone)]
pub struct NavItem {
    pub href: String,
    pub label: &'static str,
    pub active: bool,
}

/// Signed-in account and navigation, shared by every back-office page.
#[derive(Debug, Clone)]
pub struct AdminLayout {
    pub admin_name: String,
    pub admin_email: String,
    pub nav: Vec<NavItem>,
}

struct NavEntry {
    href: String,
    label: &'static str,
    permission: Option<Permission>,
}

fn resource_entry<E: Entity>() -> NavEntry {
    NavEntry {
        href: format!("/admin/{}", E::RESOURCE),
        label: E::LABEL,
        permission: Some(E::PERMISSION),
    }
}

/// Sidebar entries in display order.
fn nav_entries() -> Vec<NavEntry> {
    vec![
        NavEntry {
            href: "/admin".to_owned(),
            label: "Tableau de bord",
            permission: None,
        },
        resource_entry::<Page>(),
        resource_entry::<TeamMember>(),
        resource_entry::<JobOpening>(),
        resource_entry::<Certification>(),
        resource_entry::<Category>(),
        resource_entry::<LexiconTerm>(),
        resource_entry::<Popup>(),
        resource_entry::<Redirect>(),
        NavEntry {
            href: "/admin/404-logs".to_owned(),
            label: "Erreurs 404",
            permission: Some(Permission::ManageSeo),
        },
        resource_entry::<User>(),
    ]
}

impl AdminLayout {
    /// Layout for `admin`, with the entries their roles allow.
    #[must_use]
    pub fn new(admin: &CurrentAdmin, current_path: &str) -> Self {
        let nav = nav_entries()
            .into_iter()
            .filter(|entry| entry.permission.is_none_or(|p| admin.has_permission(p)))
            .map(|entry| NavItem {
                active: entry.href == current_path,
                label: entry.label,
                href: entry.href,
            })
            .collect();
        Self {
            admin_name: admin.name.clone(),
            admin_email: admin.email.clone(),
            nav,
        }
    }
}

fn format_date(at: DateTime<Utc>) -> String {
    at.format("%d/%m/%Y %H:%M").to_string()
}

// =============================================================================
// Dashboard
// =============================================================================

/// Counts for one resource card.
#[derive(Debug, Clone)]
pub struct ResourceCard {
    pub label: &'static str,
    pub href: String,
    pub stats: ResourceStats,
}

#[derive(Template)]
#[template(path = "admin/dashboard.html")]
struct DashboardTemplate {
    layout: AdminLayout,
    cards: Vec<ResourceCard>,
    not_found: Option<NotFoundStats>,
    maintenance: Option<MaintenanceMode>,
}

async fn card<E: Entity>(
    state: &AppState,
    admin: &CurrentAdmin,
    cards: &mut Vec<ResourceCard>,
) -> Result<(), AppError> {
    if admin.has_permission(E::PERMISSION) {
        cards.push(ResourceCard {
            label: E::LABEL,
            href: format!("/admin/{}", E::RESOURCE),
            stats: state.resources::<E>().stats().await?,
        });
    }
    Ok(())
}

/// GET /admin
#[instrument(skip_all, fields(actor = %admin.id))]
async fn dashboard(
    RequireAdminAuth(admin): RequireAdminAuth,
    State(state): State<AppState>,
) -> Result<Html<String>, AppError> {
    let mut cards = Vec::new();
    card::<Page>(&state, &admin, &mut cards).await?;
    card::<TeamMember>(&state, &admin, &mut cards).await?;
    card::<JobOpening>(&state, &admin, &mut cards).await?;
    card::<Certification>(&state, &admin, &mut cards).await?;
    card::<Category>(&state, &admin, &mut cards).await?;
    card::<LexiconTerm>(&state, &admin, &mut cards).await?;
    card::<Popup>(&state, &admin, &mut cards).await?;
    card::<Redirect>(&state, &admin, &mut cards).await?;
    card::<User>(&state, &admin, &mut cards).await?;

    let not_found = if admin.has_permission(Permission::ManageSeo) {
        Some(state.redirects().not_found_stats().await?)
    } else {
        None
    };
    let maintenance = if admin.has_permission(Permission::ManageSettings) {
        Some(state.settings().maintenance().await?)
    } else {
        None
    };

    let template = DashboardTemplate {
        layout: AdminLayout::new(&admin, "/admin"),
        cards,
        not_found,
        maintenance,
    };
    render(&template)
}

// =============================================================================
// Resource listing
// =============================================================================

/// `?trash=true` shows soft-deleted records instead of live ones.
#[derive(Debug, Default, Deserialize)]
pub struct ListingQuery {
    #[serde(default)]
    pub trash: bool,
}

/// Current value of one switchable flag on a row.
#[derive(Debug, Clone)]
pub struct ToggleState {
    pub field: &'static str,
    pub on: bool,
}

/// One row of a resource listing.
#[derive(Debug, Clone)]
pub struct RecordRow {
    pub id: String,
    pub name: String,
    pub active: bool,
    pub toggles: Vec<ToggleState>,
    pub updated_at: String,
    pub deleted_at: Option<String>,
}

impl RecordRow {
    fn new<E: Entity>(record: &E) -> Self {
        let value = serde_json::to_value(record).unwrap_or_default();
        let toggles = E::TOGGLES
            .iter()
            .map(|&field| ToggleState {
                field,
                on: value.get(field).and_then(serde_json::Value::as_bool) == Some(true),
            })
            .collect();
        Self {
            id: record.id().to_string(),
            name: record.display_name(),
            active: record.is_active(),
            toggles,
            updated_at: format_date(record.updated_at()),
            deleted_at: record.deleted_at().map(format_date),
        }
    }
}

#[derive(Template)]
#[template(path = "admin/resource.html")]
struct ResourceTemplate {
    layout: AdminLayout,
    label: &'static str,
    resource: &'static str,
    api_base: String,
    page_href: String,
    trash: bool,
    stats: ResourceStats,
    rows: Vec<RecordRow>,
}

/// GET /admin/{resource}?trash=
#[instrument(skip_all, fields(resource = E::RESOURCE, trash = query.trash))]
async fn resource_page<E: Entity>(
    RequireAdminAuth(admin): RequireAdminAuth,
    State(state): State<AppState>,
    Query(query): Query<ListingQuery>,
) -> Result<Html<String>, AppError> {
    require_permission(&admin, E::PERMISSION)?;
    let actions = state.resources::<E>();

    let records = if query.trash {
        let mut all = actions.list(true).await?;
        all.retain(E::is_deleted);
        all
    } else {
        actions.list(false).await?
    };
    let rows = records.iter().map(RecordRow::new).collect();

    let page_href = format!("/admin/{}", E::RESOURCE);
    let template = ResourceTemplate {
        layout: AdminLayout::new(&admin, &page_href),
        label: E::LABEL,
        resource: E::RESOURCE,
        api_base: format!("/api/admin/{}", E::RESOURCE),
        page_href,
        trash: query.trash,
        stats: actions.stats().await?,
        rows,
    };
    render(&template)
}

// =============================================================================
// 404 log
// =============================================================================

/// One row of the 404 log page.
#[derive(Debug, Clone)]
pub struct NotFoundRow {
    pub path: String,
    pub hit_count: i64,
    pub first_seen: String,
    pub last_seen: String,
    pub has_redirect: bool,
}

impl From<NotFoundEntry> for NotFoundRow {
    fn from(entry: NotFoundEntry) -> Self {
        Self {
            path: entry.log.path,
            hit_count: entry.log.hit_count,
            first_seen: format_date(entry.log.first_seen),
            last_seen: format_date(entry.log.last_seen),
            has_redirect: entry.has_redirect,
        }
    }
}

#[derive(Template)]
#[template(path = "admin/not_found.html")]
struct NotFoundLogTemplate {
    layout: AdminLayout,
    stats: NotFoundStats,
    rows: Vec<NotFoundRow>,
}

/// GET /admin/404-logs
#[instrument(skip_all, fields(actor = %admin.id))]
async fn not_found_logs(
    RequireAdminAuth(admin): RequireAdminAuth,
    State(state): State<AppState>,
) -> Result<Html<String>, AppError> {
    require_permission(&admin, Permission::ManageSeo)?;
    let redirects = state.redirects();
    let template = NotFoundLogTemplate {
        layout: AdminLayout::new(&admin, "/admin/404-logs"),
        stats: redirects.not_found_stats().await?,
        rows: redirects
            .not_found_logs()
            .await?
            .into_iter()
            .map(NotFoundRow::from)
            .collect(),
    };
    render(&template)
}
