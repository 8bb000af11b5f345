//! Authentication route handlers.
//!
//! Password sign-in is checked by the auth platform; the session then holds
//! the signed-in account.

use askama::Template;
use axum::{
    Form, Router,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
    routing::{get, post},
};
use secrecy::SecretString;
use serde::Deserialize;
use tower_sessions::Session;
use tracing::{info, instrument, warn};

use crate::actions::{ActionError, IdentityError};
use crate::error::{AppError, clear_sentry_user};
use crate::filters;
use crate::middleware::{clear_current_admin, set_current_admin};
use crate::routes::render;
use crate::state::AppState;

/// Login page template.
#[derive(Template)]
#[template(path = "auth/login.html")]
struct LoginPageTemplate {
    email: String,
    error: Option<String>,
}

/// Login form body.
#[derive(Deserialize)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
}

/// Build the auth router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/auth/login", get(login_page).post(login))
        .route("/auth/logout", post(logout))
}

/// Render the login page.
///
/// GET /auth/login
async fn login_page() -> Result<Response, AppError> {
    let template = LoginPageTemplate {
        email: String::new(),
        error: None,
    };
    Ok(render(&template)?.into_response())
}

/// Check credentials and start a session.
///
/// POST /auth/login
#[instrument(skip_all)]
async fn login(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<LoginForm>,
) -> Result<Response, AppError> {
    let password = SecretString::from(form.password);

    let (status, message) = match state.users().sign_in(&form.email, &password).await {
        Ok(admin) => {
            // New session id on privilege change
            session.cycle_id().await?;
            set_current_admin(&session, &admin).await?;
            info!(id = %admin.id, "Signed in");
            return Ok(Redirect::to("/admin").into_response());
        }
        Err(ActionError::Identity(IdentityError::InvalidCredentials)) => {
            warn!("Rejected sign-in");
            (StatusCode::UNAUTHORIZED, "Email ou mot de passe incorrect.")
        }
        Err(e) => {
            let err = AppError::from(e);
            tracing::error!(error = %err, "Sign-in failed");
            (
                err.status(),
                "Connexion impossible pour le moment, réessayez plus tard.",
            )
        }
    };

    let template = LoginPageTemplate {
        email: form.email,
        error: Some(message.to_owned()),
    };
    Ok((status, render(&template)?).into_response())
}

/// Logout and clear session.
///
/// POST /auth/logout
async fn logout(session: Session) -> Redirect {
    if let Err(e) = clear_current_admin(&session).await {
        warn!(error = %e, "Failed to clear session");
    }
    clear_sentry_user();
    Redirect::to("/auth/login")
}
