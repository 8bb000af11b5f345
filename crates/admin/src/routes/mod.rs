//! HTTP route handlers.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                    - Liveness
//! GET  /health/ready              - Readiness (store reachable)
//!
//! # Auth
//! GET  /auth/login                - Login page
//! POST /auth/login                - Password sign-in
//! POST /auth/logout               - Logout
//!
//! # Back-office pages
//! GET  /admin                     - Dashboard
//! GET  /admin/{resource}?trash=   - Resource listing / trash
//! GET  /admin/404-logs            - 404 log
//!
//! # Admin JSON API
//! /api/admin/...                  - See `api`
//!
//! # Public site
//! GET  /                          - Home (page `accueil`)
//! GET  /recrutement               - Job openings
//! GET  /equipe                    - Team
//! GET  /lexique                   - Lexicon
//! GET  /certifications            - Certifications
//! GET  /api/popup                 - Popup currently showing
//! GET  /{path}                    - Static page or 404
//!
//! Active redirects answer their source path ahead of every public route.
//! ```

pub mod admin_pages;
pub mod api;
pub mod auth;
pub mod public;

use askama::Template;
use axum::{
    Router,
    extract::State,
    http::{Request, Response, StatusCode},
    response::Html,
    routing::get,
};
use tower_http::services::ServeDir;
use tower_http::trace::{DefaultOnResponse, OnResponse, TraceLayer};
use tracing::Span;

use crate::error::AppError;
use crate::middleware::{
    maintenance_middleware, redirect_middleware, security_headers_middleware,
};
use crate::state::AppState;

/// Directory served under `/static`.
const STATIC_DIR: &str = "crates/admin/static";

/// Build the complete application router.
///
/// The session layer is added by the caller, so the same router runs over
/// the `PostgreSQL` session store in production and a memory store in tests.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/health/ready", get(readiness))
        .merge(auth::router())
        .merge(admin_pages::router())
        .merge(api::router())
        .merge(public::router())
        .fallback(public::fallback)
        .nest_service("/static", ServeDir::new(STATIC_DIR))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            redirect_middleware,
        ))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            maintenance_middleware,
        ))
        .layer(axum::middleware::from_fn(security_headers_middleware))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|request: &Request<_>| {
                    tracing::info_span!(
                        "http_request",
                        method = %request.method(),
                        uri = %request.uri(),
                        status = tracing::field::Empty,
                        latency_ms = tracing::field::Empty,
                    )
                })
                .on_response(
                    |response: &Response<_>, latency: std::time::Duration, span: &Span| {
                        span.record("status", response.status().as_u16());
                        span.record(
                            "latency_ms",
                            u64::try_from(latency.as_millis()).unwrap_or(u64::MAX),
                        );
                        DefaultOnResponse::default().on_response(response, latency, span);
                    },
                ),
        )
        .with_state(state)
}

/// Render a template into an HTML response.
///
/// # Errors
///
/// Returns `AppError::Internal` if rendering fails.
pub fn render(template: &impl Template) -> Result<Html<String>, AppError> {
    Ok(Html(template.render()?))
}

/// Liveness health check endpoint.
///
/// Returns "ok" if the server is running. Does not check dependencies.
async fn health() -> &'static str {
    "ok"
}

/// Readiness health check endpoint.
///
/// Returns 503 Service Unavailable if the store is not reachable.
async fn readiness(State(state): State<AppState>) -> StatusCode {
    match state.store().ping().await {
        Ok(()) => StatusCode::OK,
        Err(e) => {
            tracing::warn!(error = %e, "Readiness check failed");
            StatusCode::SERVICE_UNAVAILABLE
        }
    }
}
