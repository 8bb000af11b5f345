//! Unified error handling for the HTTP layer.

use axum::{
    Json,
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

use crate::actions::{ActionError, IdentityError};

/// Application-level error type for handlers.
#[derive(Debug, Error)]
pub enum AppError {
    /// An action failed.
    #[error(transparent)]
    Action(#[from] ActionError),

    /// User is not authenticated.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// User lacks permission.
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Bad request from client.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Internal server error (session or template failures).
    #[error("Internal error: {0}")]
    Internal(String),
}

/// JSON error body: `{"error": "..."}`.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
}

impl AppError {
    /// HTTP status for the error.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::Action(ActionError::Validation(_)) | Self::BadRequest(_) => {
                StatusCode::BAD_REQUEST
            }
            Self::Action(ActionError::NotFound { .. }) => StatusCode::NOT_FOUND,
            Self::Action(
                ActionError::Conflict(_) | ActionError::Identity(IdentityError::AlreadyExists),
            ) => StatusCode::CONFLICT,
            Self::Action(ActionError::Identity(IdentityError::InvalidCredentials))
            | Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Action(ActionError::Identity(_)) => StatusCode::BAD_GATEWAY,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::Action(ActionError::Store(_)) | Self::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Message safe to return to the client.
    #[must_use]
    pub fn public_message(&self) -> String {
        match self {
            Self::Action(e) => e.public_message(),
            Self::Internal(_) => "internal error".to_owned(),
            Self::Unauthorized(m) | Self::Forbidden(m) | Self::BadRequest(m) => m.clone(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        // Log server errors with Sentry
        if status.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        }

        let body = ErrorBody {
            error: self.public_message(),
        };
        (status, Json(body)).into_response()
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

impl From<tower_sessions::session::Error> for AppError {
    fn from(err: tower_sessions::session::Error) -> Self {
        Self::Internal(format!("session: {err}"))
    }
}

impl From<askama::Error> for AppError {
    fn from(err: askama::Error) -> Self {
        Self::Internal(format!("template: {err}"))
    }
}

/// Set the Sentry user context from the signed-in account.
pub fn set_sentry_user(id: &str, email: Option<&str>) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(id.to_owned()),
            email: email.map(String::from),
            ..Default::default()
        }));
    });
}

/// Clear the Sentry user context.
pub fn clear_sentry_user() {
    sentry::configure_scope(|scope| {
        scope.set_user(None);
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::StoreError;
    use crate::models::ValidationError;

    fn get_status(err: AppError) -> StatusCode {
        err.into_response().status()
    }

    #[test]
    fn test_app_error_display() {
        let err = AppError::BadRequest("invalid input".to_string());
        assert_eq!(err.to_string(), "Bad request: invalid input");
    }

    #[test]
    fn test_action_error_status_codes() {
        assert_eq!(
            get_status(ActionError::from(ValidationError::new("title", "is required")).into()),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            get_status(
                ActionError::NotFound {
                    resource: "pages",
                    key: "x".into()
                }
                .into()
            ),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            get_status(ActionError::Conflict("slug".into()).into()),
            StatusCode::CONFLICT
        );
        assert_eq!(
            get_status(ActionError::Store(StoreError::Unavailable("down".into())).into()),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            get_status(
                ActionError::Identity(IdentityError::Api {
                    status: 500,
                    message: "down".into()
                })
                .into()
            ),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            get_status(ActionError::Identity(IdentityError::InvalidCredentials).into()),
            StatusCode::UNAUTHORIZED
        );
    }

    #[test]
    fn test_app_error_status_codes() {
        assert_eq!(
            get_status(AppError::Unauthorized("test".to_string())),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            get_status(AppError::Forbidden("test".to_string())),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            get_status(AppError::BadRequest("test".to_string())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            get_status(AppError::Internal("test".to_string())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_store_details_are_not_exposed() {
        let err = AppError::from(ActionError::Store(StoreError::DataCorruption(
            "pages.title: invalid type".into(),
        )));
        assert_eq!(err.public_message(), "internal error");
    }
}
