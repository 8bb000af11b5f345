//! 404 log API (requires `ManageSeo`).
//!
//! ```text
//! GET    /api/admin/404-logs           - Logged paths, most hit first
//! GET    /api/admin/404-logs/stats     - Aggregate figures
//! DELETE /api/admin/404-logs?path=     - Dismiss a path
//! ```

use axum::{Json, Router, extract::State, routing::get};
use serde::Deserialize;
use tracing::instrument;

use formdetoit_core::Permission;

use super::{ApiQuery, SuccessResponse};
use crate::actions::{NotFoundEntry, NotFoundStats};
use crate::error::AppError;
use crate::middleware::{RequireAdminAuth, require_permission};
use crate::state::AppState;

/// Build the 404 log router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/admin/404-logs", get(list).delete(dismiss))
        .route("/api/admin/404-logs/stats", get(stats))
}

/// `?path=/ancienne-page`.
#[derive(Debug, Deserialize)]
pub struct DismissQuery {
    pub path: String,
}

/// GET /api/admin/404-logs
async fn list(
    RequireAdminAuth(admin): RequireAdminAuth,
    State(state): State<AppState>,
) -> Result<Json<Vec<NotFoundEntry>>, AppError> {
    require_permission(&admin, Permission::ManageSeo)?;
    Ok(Json(state.redirects().not_found_logs().await?))
}

/// GET /api/admin/404-logs/stats
async fn stats(
    RequireAdminAuth(admin): RequireAdminAuth,
    State(state): State<AppState>,
) -> Result<Json<NotFoundStats>, AppError> {
    require_permission(&admin, Permission::ManageSeo)?;
    Ok(Json(state.redirects().not_found_stats().await?))
}

/// DELETE /api/admin/404-logs?path=
#[instrument(skip_all, fields(actor = %admin.id, path = %query.path))]
async fn dismiss(
    RequireAdminAuth(admin): RequireAdminAuth,
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<DismissQuery>,
) -> Result<Json<SuccessResponse>, AppError> {
    require_permission(&admin, Permission::ManageSeo)?;
    state.redirects().dismiss(&query.path).await?;
    Ok(Json(SuccessResponse::OK))
}
