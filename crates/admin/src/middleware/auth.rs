//! Authentication middleware and extractors.
//!
//! Provides extractors for requiring a signed-in account in route handlers,
//! plus the permission check applied per resource.

use axum::{
    extract::FromRequestParts,
    http::request::Parts,
    response::{IntoResponse, Redirect, Response},
};
use tower_sessions::Session;
use tracing::{debug, warn};

use formdetoit_core::Permission;

use crate::actions::ActionError;
use crate::error::{AppError, set_sentry_user};
use crate::models::{CurrentAdmin, Entity as _, session_keys};
use crate::state::AppState;

/// Extractor that requires a signed-in account.
///
/// The session copy of the account is refreshed from the store on every
/// request, so role changes apply at once and trashed accounts lose access.
/// When no live account is signed in, HTML requests are redirected to the
/// login page and API requests get 401 Unauthorized.
///
/// # Example
///
/// ```rust,ignore
/// async fn protected_handler(
///     RequireAdminAuth(admin): RequireAdminAuth,
/// ) -> impl IntoResponse {
///     format!("Bonjour, {}!", admin.name)
/// }
/// ```
pub struct RequireAdminAuth(pub CurrentAdmin);

/// Error returned when authentication is required but missing.
pub enum AdminAuthRejection {
    /// Redirect to login page (for HTML requests).
    RedirectToLogin,
    /// Unauthorized response (for API requests).
    Unauthorized,
    /// The account could not be loaded.
    Failed(AppError),
}

impl IntoResponse for AdminAuthRejection {
    fn into_response(self) -> Response {
        match self {
            Self::RedirectToLogin => Redirect::to("/auth/login").into_response(),
            Self::Unauthorized => {
                AppError::Unauthorized("authentication required".to_owned()).into_response()
            }
            Self::Failed(err) => err.into_response(),
        }
    }
}

impl FromRequestParts<AppState> for RequireAdminAuth {
    type Rejection = AdminAuthRejection;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let is_api = parts.uri.path().starts_with("/api/");
        let reject = || {
            if is_api {
                AdminAuthRejection::Unauthorized
            } else {
                AdminAuthRejection::RedirectToLogin
            }
        };

        // Get the session from extensions (set by SessionManagerLayer)
        let session = parts
            .extensions
            .get::<Session>()
            .cloned()
            .ok_or(AdminAuthRejection::Unauthorized)?;

        let Some(signed_in) = session
            .get::<CurrentAdmin>(session_keys::CURRENT_ADMIN)
            .await
            .ok()
            .flatten()
        else {
            return Err(reject());
        };

        match state.users().get(signed_in.id.as_uuid()).await {
            Ok(user) if !user.is_deleted() => {
                let current = CurrentAdmin::from(user);
                if current != signed_in {
                    debug!(id = %current.id, "Refreshing session account");
                    set_current_admin(&session, &current)
                        .await
                        .map_err(|e| AdminAuthRejection::Failed(e.into()))?;
                }
                set_sentry_user(&current.id.to_string(), Some(&current.email));
                Ok(Self(current))
            }
            Ok(_) | Err(ActionError::NotFound { .. }) => {
                warn!(id = %signed_in.id, "Session account is gone; signing out");
                if let Err(e) = session.flush().await {
                    warn!(error = %e, "Failed to clear session");
                }
                Err(reject())
            }
            Err(e) => Err(AdminAuthRejection::Failed(e.into())),
        }
    }
}

/// Check that the account holds `permission`.
///
/// # Errors
///
/// Returns `AppError::Forbidden` if none of the account's roles grants it.
pub fn require_permission(admin: &CurrentAdmin, permission: Permission) -> Result<(), AppError> {
    if admin.has_permission(permission) {
        Ok(())
    } else {
        Err(AppError::Forbidden(format!(
            "missing permission: {permission:?}"
        )))
    }
}

/// Helper to set the current admin in the session.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn set_current_admin(
    session: &Session,
    admin: &CurrentAdmin,
) -> Result<(), tower_sessions::session::Error> {
    session.insert(session_keys::CURRENT_ADMIN, admin).await
}

/// Helper to end the session (logout).
///
/// # Errors
///
/// Returns an error if the session cannot be deleted.
pub async fn clear_current_admin(session: &Session) -> Result<(), tower_sessions::session::Error> {
    session.flush().await
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use formdetoit_core::{RoleLabel, UserId};

    use super::*;

    fn admin(roles: Vec<RoleLabel>) -> CurrentAdmin {
        CurrentAdmin {
            id: UserId::generate(),
            email: "seo@formdetoit.fr".into(),
            name: "Référenceur".into(),
            roles,
        }
    }

    #[test]
    fn test_require_permission() {
        let seo = admin(vec![RoleLabel::Seo]);
        assert!(require_permission(&seo, Permission::ManageSeo).is_ok());
        assert!(matches!(
            require_permission(&seo, Permission::ManageContent),
            Err(AppError::Forbidden(_))
        ));
    }

    #[test]
    fn test_unauthorized_rejection_is_json_401() {
        let response = AdminAuthRejection::Unauthorized.into_response();
        assert_eq!(response.status(), axum::http::StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn test_page_rejection_redirects_to_login() {
        let response = AdminAuthRejection::RedirectToLogin.into_response();
        assert_eq!(
            response.headers().get("location").unwrap(),
            "/auth/login"
        );
    }
}
