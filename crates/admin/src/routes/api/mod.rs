//! Admin JSON API.
//!
//! # Route Structure
//!
//! ```text
//! # Any resource except users ({resource} = team-members, job-openings, ...)
//! GET    /api/admin/{resource}?showDeleted=    - List records
//! POST   /api/admin/{resource}                 - Create record
//! GET    /api/admin/{resource}/stats           - Total / active / deleted counts
//! POST   /api/admin/{resource}/bulk-delete     - Soft or permanent bulk delete
//! GET    /api/admin/{resource}/{id}            - Get record
//! PUT    /api/admin/{resource}/{id}            - Update record
//! DELETE /api/admin/{resource}/{id}?permanent= - Delete record
//! PUT    /api/admin/{resource}/{id}/toggle     - Flip a boolean flag
//! POST   /api/admin/{resource}/{id}/restore    - Restore from trash
//!
//! # Users, 404 logs, settings
//! See `users`, `not_found` and `settings`.
//!
//! # Public
//! GET    /api/popup                            - Popup currently showing
//! ```
//!
//! Every error body is `{"error": "..."}`.

pub mod not_found;
pub mod resource;
pub mod settings;
pub mod users;

use axum::extract::{FromRequest, FromRequestParts};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::actions::{ActionError, BulkFailure, BulkOutcome};
use crate::error::AppError;
use crate::models::{
    Category, Certification, JobOpening, LexiconTerm, Page, Popup, Redirect, TeamMember,
};
use crate::state::AppState;

/// Build the admin API router.
pub fn router() -> Router<AppState> {
    Router::new()
        .merge(resource::router::<TeamMember>())
        .merge(resource::router::<JobOpening>())
        .merge(resource::router::<Category>())
        .merge(resource::router::<Certification>())
        .merge(resource::router::<LexiconTerm>())
        .merge(resource::router::<Page>())
        .merge(resource::router::<Popup>())
        .merge(resource::router::<Redirect>())
        .merge(users::router())
        .merge(not_found::router())
        .merge(settings::router())
}

// =============================================================================
// Extractors
// =============================================================================

/// JSON body whose rejection is a 400 `{error}` body.
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct ApiJson<T>(pub T);

/// Path parameters whose rejection is a 400 `{error}` body.
#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(AppError))]
pub struct ApiPath<T>(pub T);

/// Query string whose rejection is a 400 `{error}` body.
#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(AppError))]
pub struct ApiQuery<T>(pub T);

// =============================================================================
// Shared request and response bodies
// =============================================================================

/// `?showDeleted=true` on list endpoints.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListQuery {
    #[serde(default)]
    pub show_deleted: bool,
}

/// `?permanent=true` on delete endpoints.
#[derive(Debug, Default, Deserialize)]
pub struct DeleteQuery {
    #[serde(default)]
    pub permanent: bool,
}

/// Body of `bulk-delete` (and `bulk-restore` without `permanent`).
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BulkRequest {
    pub ids: Vec<Uuid>,
    #[serde(default)]
    pub permanent: bool,
}

impl BulkRequest {
    /// The ids, which must not be empty.
    ///
    /// # Errors
    ///
    /// Returns `AppError::BadRequest` for an empty list.
    pub fn ids(&self) -> Result<&[Uuid], AppError> {
        if self.ids.is_empty() {
            return Err(AppError::BadRequest(
                "ids must be a non-empty array".to_owned(),
            ));
        }
        Ok(&self.ids)
    }
}

/// `{"success": true}`.
#[derive(Debug, Serialize)]
pub struct SuccessResponse {
    pub success: bool,
}

impl SuccessResponse {
    pub const OK: Self = Self { success: true };
}

/// Response of bulk operations.
#[derive(Debug, Serialize)]
pub struct BulkResponse {
    pub success: bool,
    pub processed: usize,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub failed: Vec<BulkFailure>,
}

/// 200 when every id succeeded, 207 Multi-Status otherwise.
pub fn bulk_response(outcome: BulkOutcome) -> Response {
    let status = if outcome.is_complete() {
        StatusCode::OK
    } else {
        StatusCode::MULTI_STATUS
    };
    let body = BulkResponse {
        success: outcome.is_complete(),
        processed: outcome.processed(),
        failed: outcome.failed,
    };
    (status, Json(body)).into_response()
}

/// Restore answers 400 for an id it cannot bring back.
pub(crate) fn restore_error(err: ActionError) -> AppError {
    match err {
        ActionError::NotFound { .. } => AppError::BadRequest(err.to_string()),
        other => other.into(),
    }
}
