//! Site settings API (requires `ManageSettings`).
//!
//! ```text
//! GET /api/admin/settings/maintenance  - Current maintenance mode
//! PUT /api/admin/settings/maintenance  - Switch maintenance mode
//! ```

use axum::{Json, Router, extract::State, routing::get};
use tracing::instrument;

use formdetoit_core::Permission;

use super::ApiJson;
use crate::actions::MaintenanceMode;
use crate::error::AppError;
use crate::middleware::{RequireAdminAuth, require_permission};
use crate::state::AppState;

/// Build the settings router.
pub fn router() -> Router<AppState> {
    Router::new().route(
        "/api/admin/settings/maintenance",
        get(maintenance).put(set_maintenance),
    )
}

/// GET /api/admin/settings/maintenance
async fn maintenance(
    RequireAdminAuth(admin): RequireAdminAuth,
    State(state): State<AppState>,
) -> Result<Json<MaintenanceMode>, AppError> {
    require_permission(&admin, Permission::ManageSettings)?;
    Ok(Json(state.settings().maintenance().await?))
}

/// PUT /api/admin/settings/maintenance
#[instrument(skip_all, fields(actor = %admin.id, enabled = mode.enabled))]
async fn set_maintenance(
    RequireAdminAuth(admin): RequireAdminAuth,
    State(state): State<AppState>,
    ApiJson(mode): ApiJson<MaintenanceMode>,
) -> Result<Json<MaintenanceMode>, AppError> {
    require_permission(&admin, Permission::ManageSettings)?;
    Ok(Json(state.settings().set_maintenance(mode).await?))
}
