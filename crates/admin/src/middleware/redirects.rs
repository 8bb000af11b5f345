//! Redirects for the public site.
//!
//! An active redirect answers its source path before any public route runs,
//! so it also covers routed pages such as `/equipe`.

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use tracing::{debug, error};

use crate::actions::is_internal_path;
use crate::routes::public::redirect_response;
use crate::state::AppState;

/// Answer with the live redirect for the request path, if there is one.
///
/// A failure to look the redirect up is logged and the request goes through.
pub async fn redirect_middleware(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let path = request.uri().path();
    if is_internal_path(path) {
        return next.run(request).await;
    }

    match state.redirects().resolve(path).await {
        Ok(Some(redirect)) => {
            debug!(path, destination = %redirect.destination, "Redirecting");
            redirect_response(&redirect).unwrap_or_else(IntoResponse::into_response)
        }
        Ok(None) => next.run(request).await,
        Err(e) => {
            error!(error = %e, path, "Failed to resolve redirect");
            next.run(request).await
        }
    }
}
