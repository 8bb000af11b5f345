//! Account management API (requires `ManageUsers`).
//!
//! ```text
//! GET    /api/admin/users?showDeleted=   - List accounts
//! POST   /api/admin/users                - Create identity + account
//! GET    /api/admin/users/stats          - Counts
//! POST   /api/admin/users/bulk-delete    - Bulk delete
//! POST   /api/admin/users/bulk-restore   - Bulk restore
//! GET    /api/admin/users/{id}           - Get account
//! PUT    /api/admin/users/{id}           - Update profile
//! DELETE /api/admin/users/{id}?permanent= - Delete account
//! PUT    /api/admin/users/{id}/roles     - Replace role set
//! POST   /api/admin/users/{id}/restore   - Restore account
//! ```

use axum::{
    Json, Router,
    extract::State,
    response::Response,
    routing::{get, post, put},
};
use serde::Deserialize;
use tracing::instrument;
use uuid::Uuid;

use formdetoit_core::Permission;

use super::{
    ApiJson, ApiPath, ApiQuery, BulkRequest, DeleteQuery, ListQuery, SuccessResponse,
    bulk_response, restore_error,
};
use crate::db::ResourceStats;
use crate::error::AppError;
use crate::middleware::{RequireAdminAuth, require_permission};
use crate::models::User;
use crate::models::user::{UserInput, UserPatch};
use crate::state::AppState;

/// Build the users router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/admin/users", get(list).post(create))
        .route("/api/admin/users/stats", get(stats))
        .route("/api/admin/users/bulk-delete", post(bulk_delete))
        .route("/api/admin/users/bulk-restore", post(bulk_restore))
        .route(
            "/api/admin/users/{id}",
            get(show).put(update).delete(destroy),
        )
        .route("/api/admin/users/{id}/roles", put(update_roles))
        .route("/api/admin/users/{id}/restore", post(restore))
}

/// Body of the role assignment endpoint.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RolesRequest {
    pub roles: Vec<String>,
}

/// Body of `bulk-restore`.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BulkRestoreRequest {
    pub ids: Vec<Uuid>,
}

/// GET /api/admin/users
async fn list(
    RequireAdminAuth(admin): RequireAdminAuth,
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<ListQuery>,
) -> Result<Json<Vec<User>>, AppError> {
    require_permission(&admin, Permission::ManageUsers)?;
    Ok(Json(state.users().list(query.show_deleted).await?))
}

/// GET /api/admin/users/stats
async fn stats(
    RequireAdminAuth(admin): RequireAdminAuth,
    State(state): State<AppState>,
) -> Result<Json<ResourceStats>, AppError> {
    require_permission(&admin, Permission::ManageUsers)?;
    Ok(Json(state.users().stats().await?))
}

/// GET /api/admin/users/{id}
async fn show(
    RequireAdminAuth(admin): RequireAdminAuth,
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<Json<User>, AppError> {
    require_permission(&admin, Permission::ManageUsers)?;
    Ok(Json(state.users().get(id).await?))
}

/// POST /api/admin/users
#[instrument(skip_all, fields(actor = %admin.id))]
async fn create(
    RequireAdminAuth(admin): RequireAdminAuth,
    State(state): State<AppState>,
    ApiJson(input): ApiJson<UserInput>,
) -> Result<Json<User>, AppError> {
    require_permission(&admin, Permission::ManageUsers)?;
    Ok(Json(state.users().create(input).await?))
}

/// PUT /api/admin/users/{id}
#[instrument(skip_all, fields(actor = %admin.id, %id))]
async fn update(
    RequireAdminAuth(admin): RequireAdminAuth,
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(patch): ApiJson<UserPatch>,
) -> Result<Json<User>, AppError> {
    require_permission(&admin, Permission::ManageUsers)?;
    Ok(Json(state.users().update_profile(id, patch).await?))
}

/// PUT /api/admin/users/{id}/roles
#[instrument(skip_all, fields(actor = %admin.id, %id))]
async fn update_roles(
    RequireAdminAuth(admin): RequireAdminAuth,
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(body): ApiJson<RolesRequest>,
) -> Result<Json<User>, AppError> {
    require_permission(&admin, Permission::ManageUsers)?;
    let user = state
        .users()
        .update_roles(admin.id, id, &body.roles)
        .await?;
    Ok(Json(user))
}

/// DELETE /api/admin/users/{id}?permanent=
#[instrument(skip_all, fields(actor = %admin.id, %id, permanent = query.permanent))]
async fn destroy(
    RequireAdminAuth(admin): RequireAdminAuth,
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
    ApiQuery(query): ApiQuery<DeleteQuery>,
) -> Result<Json<SuccessResponse>, AppError> {
    require_permission(&admin, Permission::ManageUsers)?;
    let users = state.users();
    if query.permanent {
        users.permanent_delete(admin.id, id).await?;
    } else {
        users.soft_delete(admin.id, id).await?;
    }
    Ok(Json(SuccessResponse::OK))
}

/// POST /api/admin/users/{id}/restore
#[instrument(skip_all, fields(actor = %admin.id, %id))]
async fn restore(
    RequireAdminAuth(admin): RequireAdminAuth,
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<Json<SuccessResponse>, AppError> {
    require_permission(&admin, Permission::ManageUsers)?;
    state.users().restore(id).await.map_err(restore_error)?;
    Ok(Json(SuccessResponse::OK))
}

/// POST /api/admin/users/bulk-delete
#[instrument(skip_all, fields(actor = %admin.id, permanent = body.permanent))]
async fn bulk_delete(
    RequireAdminAuth(admin): RequireAdminAuth,
    State(state): State<AppState>,
    ApiJson(body): ApiJson<BulkRequest>,
) -> Result<Response, AppError> {
    require_permission(&admin, Permission::ManageUsers)?;
    let outcome = state
        .users()
        .bulk_delete(admin.id, body.ids()?, body.permanent)
        .await;
    Ok(bulk_response(outcome))
}

/// POST /api/admin/users/bulk-restore
#[instrument(skip_all, fields(actor = %admin.id))]
async fn bulk_restore(
    RequireAdminAuth(admin): RequireAdminAuth,
    State(state): State<AppState>,
    ApiJson(body): ApiJson<BulkRestoreRequest>,
) -> Result<Response, AppError> {
    require_permission(&admin, Permission::ManageUsers)?;
    if body.ids.is_empty() {
        return Err(AppError::BadRequest(
            "ids must be a non-empty array".to_owned(),
        ));
    }
    Ok(bulk_response(state.users().bulk_restore(&body.ids).await))
}
