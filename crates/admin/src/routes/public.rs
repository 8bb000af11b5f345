//! Public site.
//!
//! Pages are rendered from the store and kept in the [`PageCache`] keyed by
//! request path; mutations in the back-office drop the affected entries.
//! Active redirects are answered earlier, by the redirect middleware.
//! Unknown paths go through the fallback: a published page by slug, then a
//! logged 404.
//!
//! [`PageCache`]: crate::actions::PageCache

use std::collections::BTreeMap;
use std::future::Future;
use std::sync::Arc;

use askama::Template;
use axum::{
    Json, Router,
    extract::State,
    http::{Method, StatusCode, Uri, header},
    response::{Html, IntoResponse, Response},
    routing::get,
};
use chrono::Utc;
use serde::Serialize;
use serde_json::Value;
use tracing::{error, instrument};

use formdetoit_core::{SitePath, Slug};

use crate::actions::{MaintenanceMode, is_internal_path};
use crate::error::{AppError, ErrorBody};
use crate::filters;
use crate::models::page::HOME_SLUG;
use crate::models::{
    Category, Certification, JobOpening, LexiconTerm, Page, Popup, Redirect, TeamMember,
};
use crate::routes::render;
use crate::state::AppState;

/// Build the public router (the slug fallback is installed separately).
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(home))
        .route("/recrutement", get(jobs))
        .route("/equipe", get(team))
        .route("/lexique", get(lexicon))
        .route("/certifications", get(certifications))
        .route("/api/popup", get(popup))
}

// =============================================================================
// Layout
// =============================================================================

/// Certification logo shown in the footer of every page.
#[derive(Debug, Clone)]
pub struct FooterLogo {
    pub name: String,
    pub logo_url: Option<String>,
    pub link_url: Option<String>,
}

/// Head metadata and footer shared by public pages.
#[derive(Debug, Clone, Default)]
pub struct SiteLayout {
    pub title: String,
    pub meta_description: Option<String>,
    pub canonical_url: Option<String>,
    pub noindex: bool,
    pub footer_logos: Vec<FooterLogo>,
}

impl SiteLayout {
    async fn load(state: &AppState, title: &str) -> Result<Self, AppError> {
        let footer_logos = state
            .resources::<Certification>()
            .list_active()
            .await?
            .into_iter()
            .filter(|c| c.logo_url.is_some())
            .map(|c| FooterLogo {
                name: c.name,
                logo_url: c.logo_url,
                link_url: c.link_url,
            })
            .collect();
        Ok(Self {
            title: title.to_owned(),
            footer_logos,
            ..Self::default()
        })
    }

    async fn for_page(state: &AppState, page: &Page) -> Result<Self, AppError> {
        let mut layout = Self::load(state, page.seo_title()).await?;
        layout.meta_description.clone_from(&page.meta_description);
        layout.canonical_url.clone_from(&page.canonical_url);
        layout.noindex = page.noindex;
        Ok(layout)
    }
}

/// Serve `path` from the page cache, rendering and storing it on a miss.
async fn serve_cached<F>(state: &AppState, path: &str, render_page: F) -> Result<Response, AppError>
where
    F: Future<Output = Result<String, AppError>>,
{
    if let Some(html) = state.cache().get(path).await {
        return Ok(Html(html.to_string()).into_response());
    }
    let generation = state.cache().generation();
    let html: Arc<str> = Arc::from(render_page.await?);
    state
        .cache()
        .insert_rendered(path, Arc::clone(&html), generation)
        .await;
    Ok(Html(html.to_string()).into_response())
}

// =============================================================================
// Pages
// =============================================================================

#[derive(Template)]
#[template(path = "public/home.html")]
struct HomeTemplate {
    layout: SiteLayout,
    page: Option<Page>,
    jobs_open: usize,
}

#[derive(Template)]
#[template(path = "public/page.html")]
struct PageTemplate {
    layout: SiteLayout,
    page: Page,
}

/// GET /
async fn home(State(state): State<AppState>) -> Result<Response, AppError> {
    serve_cached(&state, "/", async {
        let page = published_page(&state, HOME_SLUG).await?;
        let layout = match &page {
            Some(page) => SiteLayout::for_page(&state, page).await?,
            None => SiteLayout::load(&state, "FormDeToit, couvreur").await?,
        };
        let jobs_open = state.resources::<JobOpening>().list_active().await?.len();
        Ok(render(&HomeTemplate {
            layout,
            page,
            jobs_open,
        })?
        .0)
    })
    .await
}

async fn published_page(state: &AppState, slug: &str) -> Result<Option<Page>, AppError> {
    let key = Value::String(slug.to_owned());
    let page = state
        .resources::<Page>()
        .find_live_by("slug", &key)
        .await?;
    Ok(page.filter(|p| p.is_published))
}

#[derive(Template)]
#[template(path = "public/jobs.html")]
struct JobsTemplate {
    layout: SiteLayout,
    jobs: Vec<JobOpening>,
}

/// GET /recrutement
async fn jobs(State(state): State<AppState>) -> Result<Response, AppError> {
    serve_cached(&state, "/recrutement", async {
        let layout = SiteLayout::load(&state, "Recrutement").await?;
        let jobs = state.resources::<JobOpening>().list_active().await?;
        Ok(render(&JobsTemplate { layout, jobs })?.0)
    })
    .await
}

#[derive(Template)]
#[template(path = "public/team.html")]
struct TeamTemplate {
    layout: SiteLayout,
    members: Vec<TeamMember>,
}

/// GET /equipe
async fn team(State(state): State<AppState>) -> Result<Response, AppError> {
    serve_cached(&state, "/equipe", async {
        let layout = SiteLayout::load(&state, "Notre équipe").await?;
        let members = state.resources::<TeamMember>().list_active().await?;
        Ok(render(&TeamTemplate { layout, members })?.0)
    })
    .await
}

/// Lexicon terms under one category heading.
#[derive(Debug, Clone)]
pub struct LexiconSection {
    pub title: String,
    pub terms: Vec<LexiconTerm>,
}

/// Group terms by category, in category order; uncategorised terms last.
fn lexicon_sections(categories: Vec<Category>, terms: Vec<LexiconTerm>) -> Vec<LexiconSection> {
    let mut by_category: BTreeMap<Option<String>, Vec<LexiconTerm>> = BTreeMap::new();
    for term in terms {
        let key = term.category_id.map(|id| id.to_string());
        by_category.entry(key).or_default().push(term);
    }

    let mut sections: Vec<LexiconSection> = categories
        .into_iter()
        .filter_map(|category| {
            by_category
                .remove(&Some(category.id.to_string()))
                .map(|terms| LexiconSection {
                    title: category.name,
                    terms,
                })
        })
        .collect();

    // Terms left over have no category, or a category in the trash
    let rest: Vec<LexiconTerm> = by_category.into_values().flatten().collect();
    if !rest.is_empty() {
        sections.push(LexiconSection {
            title: "Autres termes".to_owned(),
            terms: rest,
        });
    }
    for section in &mut sections {
        section.terms.sort_by(|a, b| a.term.cmp(&b.term));
    }
    sections
}

#[derive(Template)]
#[template(path = "public/lexicon.html")]
struct LexiconTemplate {
    layout: SiteLayout,
    sections: Vec<LexiconSection>,
}

/// GET /lexique
async fn lexicon(State(state): State<AppState>) -> Result<Response, AppError> {
    serve_cached(&state, "/lexique", async {
        let layout = SiteLayout::load(&state, "Lexique de la toiture").await?;
        let categories = state.resources::<Category>().list(false).await?;
        let terms = state.resources::<LexiconTerm>().list_active().await?;
        Ok(render(&LexiconTemplate {
            layout,
            sections: lexicon_sections(categories, terms),
        })?
        .0)
    })
    .await
}

#[derive(Template)]
#[template(path = "public/certifications.html")]
struct CertificationsTemplate {
    layout: SiteLayout,
    certifications: Vec<Certification>,
}

/// GET /certifications
async fn certifications(State(state): State<AppState>) -> Result<Response, AppError> {
    serve_cached(&state, "/certifications", async {
        let layout = SiteLayout::load(&state, "Certifications").await?;
        let certifications = state.resources::<Certification>().list_active().await?;
        Ok(render(&CertificationsTemplate {
            layout,
            certifications,
        })?
        .0)
    })
    .await
}

// =============================================================================
// Popup
// =============================================================================

/// Popup fields exposed to visitors.
#[derive(Debug, Clone, Serialize)]
pub struct PublicPopup {
    pub id: String,
    pub title: String,
    pub content: String,
    pub cta_label: Option<String>,
    pub cta_url: Option<String>,
}

/// GET /api/popup
///
/// The newest active popup whose window includes now, or `null`.
async fn popup(State(state): State<AppState>) -> Result<Json<Option<PublicPopup>>, AppError> {
    let now = Utc::now();
    let showing = state
        .resources::<Popup>()
        .list_active()
        .await?
        .into_iter()
        .find(|p| p.is_showing(now))
        .map(|p| PublicPopup {
            id: p.id.to_string(),
            title: p.title,
            content: p.content,
            cta_label: p.cta_label,
            cta_url: p.cta_url,
        });
    Ok(Json(showing))
}

// =============================================================================
// Fallback: slug pages, 404
// =============================================================================

#[derive(Template)]
#[template(path = "public/not_found.html")]
struct NotFoundTemplate {
    layout: SiteLayout,
}

/// Any path without a route.
#[instrument(skip(state), fields(path = %uri.path()))]
pub async fn fallback(
    State(state): State<AppState>,
    method: Method,
    uri: Uri,
) -> Result<Response, AppError> {
    let path = uri.path();

    if is_internal_path(path) {
        let body = ErrorBody {
            error: "not found".to_owned(),
        };
        return Ok((StatusCode::NOT_FOUND, Json(body)).into_response());
    }

    if method == Method::GET || method == Method::HEAD {
        if let Some(response) = slug_page(&state, path).await? {
            return Ok(response);
        }
        if let Err(e) = state.redirects().record_not_found(path).await {
            error!(error = %e, "Failed to record 404");
        }
    }

    let layout = SiteLayout::load(&state, "Page introuvable").await?;
    Ok((StatusCode::NOT_FOUND, render(&NotFoundTemplate { layout })?).into_response())
}

/// The response sending visitors from a redirect's source to its destination.
///
/// # Errors
///
/// Returns `AppError::Internal` for a status code outside the HTTP range.
pub fn redirect_response(redirect: &Redirect) -> Result<Response, AppError> {
    let status = StatusCode::from_u16(redirect.status_code.code())
        .map_err(|e| AppError::Internal(format!("redirect status: {e}")))?;
    Ok((status, [(header::LOCATION, redirect.destination.clone())]).into_response())
}

/// A published page addressed by a one-segment path such as `/faq`.
async fn slug_page(state: &AppState, path: &str) -> Result<Option<Response>, AppError> {
    let Ok(site_path) = SitePath::parse(path) else {
        return Ok(None);
    };
    let segment = site_path.first_segment();
    if segment.is_empty() || segment.len() + 1 != site_path.as_str().len() {
        return Ok(None);
    }
    let Ok(slug) = Slug::parse(segment) else {
        return Ok(None);
    };

    if let Some(html) = state.cache().get(site_path.as_str()).await {
        return Ok(Some(Html(html.to_string()).into_response()));
    }
    let generation = state.cache().generation();
    let Some(page) = published_page(state, slug.as_str()).await? else {
        return Ok(None);
    };
    let layout = SiteLayout::for_page(state, &page).await?;
    let html: Arc<str> = Arc::from(render(&PageTemplate { layout, page })?.0);
    state
        .cache()
        .insert_rendered(site_path.as_str(), Arc::clone(&html), generation)
        .await;
    Ok(Some(Html(html.to_string()).into_response()))
}

// =============================================================================
// Maintenance
// =============================================================================

#[derive(Template)]
#[template(path = "public/maintenance.html")]
struct MaintenanceTemplate {
    message: Option<String>,
}

/// The 503 maintenance page.
#[must_use]
pub fn maintenance_response(mode: &MaintenanceMode) -> Response {
    let template = MaintenanceTemplate {
        message: mode.message.clone(),
    };
    match template.render() {
        Ok(html) => (
            StatusCode::SERVICE_UNAVAILABLE,
            [(header::RETRY_AFTER, "3600")],
            Html(html),
        )
            .into_response(),
        Err(e) => {
            error!(error = %e, "Maintenance template render error");
            (StatusCode::SERVICE_UNAVAILABLE, "Site en maintenance").into_response()
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use chrono::Utc;

    use formdetoit_core::{CategoryId, LexiconTermId};

    use super::*;

    fn category(name: &str) -> Category {
        let now = Utc::now();
        Category {
            id: CategoryId::generate(),
            name: name.into(),
            slug: name.to_lowercase(),
            description: None,
            sort_order: 0,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        }
    }

    fn term(term: &str, category_id: Option<CategoryId>) -> LexiconTerm {
        let now = Utc::now();
        LexiconTerm {
            id: LexiconTermId::generate(),
            term: term.into(),
            slug: term.to_lowercase(),
            definition: "...".into(),
            category_id,
            is_published: true,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        }
    }

    #[test]
    fn test_lexicon_sections_follow_category_order() {
        let couverture = category("Couverture");
        let zinguerie = category("Zinguerie");
        let terms = vec![
            term("Noue", Some(couverture.id)),
            term("Chéneau", Some(zinguerie.id)),
            term("Faîtage", Some(couverture.id)),
            term("Solin", None),
        ];

        let sections = lexicon_sections(vec![couverture, zinguerie], terms);

        assert_eq!(sections.len(), 3);
        assert_eq!(sections[0].title, "Couverture");
        assert_eq!(sections[0].terms[0].term, "Faîtage");
        assert_eq!(sections[1].title, "Zinguerie");
        assert_eq!(sections[2].title, "Autres termes");
        assert_eq!(sections[2].terms[0].term, "Solin");
    }

    #[test]
    fn test_empty_categories_are_skipped() {
        let sections = lexicon_sections(vec![category("Vide")], vec![]);
        assert!(sections.is_empty());
    }

    #[test]
    fn test_maintenance_response_is_503() {
        let response = maintenance_response(&MaintenanceMode {
            enabled: true,
            message: Some("Retour à 14h".into()),
        });
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }
}
