//! Generic JSON handlers for admin-managed resources.
//!
//! One router per [`Entity`], mounted at `/api/admin/{E::RESOURCE}`. Every
//! handler requires a signed-in account holding `E::PERMISSION`.

use axum::{
    Json, Router,
    extract::State,
    routing::{get, post, put},
};
use serde::Deserialize;
use tracing::instrument;
use uuid::Uuid;

use super::{
    ApiJson, ApiPath, ApiQuery, BulkRequest, DeleteQuery, ListQuery, SuccessResponse,
    bulk_response, restore_error,
};
use crate::db::ResourceStats;
use crate::error::AppError;
use crate::middleware::{RequireAdminAuth, require_permission};
use crate::models::Entity;
use crate::state::AppState;

/// Build the router for one resource.
pub fn router<E: Entity>() -> Router<AppState> {
    let base = format!("/api/admin/{}", E::RESOURCE);
    Router::new()
        .route(&base, get(list::<E>).post(create::<E>))
        .route(&format!("{base}/stats"), get(stats::<E>))
        .route(&format!("{base}/bulk-delete"), post(bulk_delete::<E>))
        .route(
            &format!("{base}/{{id}}"),
            get(show::<E>).put(update::<E>).delete(destroy::<E>),
        )
        .route(&format!("{base}/{{id}}/toggle"), put(toggle::<E>))
        .route(&format!("{base}/{{id}}/restore"), post(restore::<E>))
}

/// Body of the toggle endpoint.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ToggleRequest {
    pub field: String,
    pub value: bool,
}

/// GET /api/admin/{resource}
#[instrument(skip_all, fields(resource = E::RESOURCE, show_deleted = query.show_deleted))]
async fn list<E: Entity>(
    RequireAdminAuth(admin): RequireAdminAuth,
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<ListQuery>,
) -> Result<Json<Vec<E>>, AppError> {
    require_permission(&admin, E::PERMISSION)?;
    let records = state.resources::<E>().list(query.show_deleted).await?;
    Ok(Json(records))
}

/// GET /api/admin/{resource}/stats
async fn stats<E: Entity>(
    RequireAdminAuth(admin): RequireAdminAuth,
    State(state): State<AppState>,
) -> Result<Json<ResourceStats>, AppError> {
    require_permission(&admin, E::PERMISSION)?;
    Ok(Json(state.resources::<E>().stats().await?))
}

/// GET /api/admin/{resource}/{id}
async fn show<E: Entity>(
    RequireAdminAuth(admin): RequireAdminAuth,
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<Json<E>, AppError> {
    require_permission(&admin, E::PERMISSION)?;
    Ok(Json(state.resources::<E>().get(id).await?))
}

/// POST /api/admin/{resource}
#[instrument(skip_all, fields(resource = E::RESOURCE, actor = %admin.id))]
async fn create<E: Entity>(
    RequireAdminAuth(admin): RequireAdminAuth,
    State(state): State<AppState>,
    ApiJson(input): ApiJson<E::Input>,
) -> Result<Json<E>, AppError> {
    require_permission(&admin, E::PERMISSION)?;
    Ok(Json(state.resources::<E>().create(input).await?))
}

/// PUT /api/admin/{resource}/{id}
#[instrument(skip_all, fields(resource = E::RESOURCE, actor = %admin.id, %id))]
async fn update<E: Entity>(
    RequireAdminAuth(admin): RequireAdminAuth,
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(patch): ApiJson<E::Patch>,
) -> Result<Json<E>, AppError> {
    require_permission(&admin, E::PERMISSION)?;
    Ok(Json(state.resources::<E>().update(id, patch).await?))
}

/// PUT /api/admin/{resource}/{id}/toggle
#[instrument(skip_all, fields(resource = E::RESOURCE, actor = %admin.id, %id, field = %body.field))]
async fn toggle<E: Entity>(
    RequireAdminAuth(admin): RequireAdminAuth,
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(body): ApiJson<ToggleRequest>,
) -> Result<Json<E>, AppError> {
    require_permission(&admin, E::PERMISSION)?;
    let record = state
        .resources::<E>()
        .toggle(id, &body.field, body.value)
        .await?;
    Ok(Json(record))
}

/// DELETE /api/admin/{resource}/{id}?permanent=
#[instrument(skip_all, fields(resource = E::RESOURCE, actor = %admin.id, %id, permanent = query.permanent))]
async fn destroy<E: Entity>(
    RequireAdminAuth(admin): RequireAdminAuth,
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
    ApiQuery(query): ApiQuery<DeleteQuery>,
) -> Result<Json<SuccessResponse>, AppError> {
    require_permission(&admin, E::PERMISSION)?;
    let actions = state.resources::<E>();
    if query.permanent {
        actions.permanent_delete(id).await?;
    } else {
        actions.soft_delete(id).await?;
    }
    Ok(Json(SuccessResponse::OK))
}

/// POST /api/admin/{resource}/{id}/restore
#[instrument(skip_all, fields(resource = E::RESOURCE, actor = %admin.id, %id))]
async fn restore<E: Entity>(
    RequireAdminAuth(admin): RequireAdminAuth,
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<Json<SuccessResponse>, AppError> {
    require_permission(&admin, E::PERMISSION)?;
    state
        .resources::<E>()
        .restore(id)
        .await
        .map_err(restore_error)?;
    Ok(Json(SuccessResponse::OK))
}

/// POST /api/admin/{resource}/bulk-delete
#[instrument(skip_all, fields(resource = E::RESOURCE, actor = %admin.id, permanent = body.permanent))]
async fn bulk_delete<E: Entity>(
    RequireAdminAuth(admin): RequireAdminAuth,
    State(state): State<AppState>,
    ApiJson(body): ApiJson<BulkRequest>,
) -> Result<axum::response::Response, AppError> {
    require_permission(&admin, E::PERMISSION)?;
    let outcome = state
        .resources::<E>()
        .bulk_delete(body.ids()?, body.permanent)
        .await;
    Ok(bulk_response(outcome))
}
