//! Maintenance mode gate for the public site.
//!
//! While maintenance mode is enabled every public request answers 503 with
//! the maintenance page. The back-office, API, auth, assets and health
//! checks stay reachable so the mode can be switched off again.

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use tracing::error;

use crate::actions::is_internal_path;
use crate::routes::public::maintenance_response;
use crate::state::AppState;

/// Serve the maintenance page instead of public routes while enabled.
///
/// A failure to read the setting is logged and the request goes through.
pub async fn maintenance_middleware(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    if is_internal_path(request.uri().path()) {
        return next.run(request).await;
    }

    match state.settings().maintenance().await {
        Ok(mode) if mode.enabled => maintenance_response(&mode),
        Ok(_) => next.run(request).await,
        Err(e) => {
            error!(error = %e, "Failed to read maintenance mode");
            next.run(request).await
        }
    }
}
