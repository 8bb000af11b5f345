//! HTTP middleware stack.
//!
//! # Middleware Order (outermost first)
//!
//! 1. Sentry layers (capture errors, transactions)
//! 2. `TraceLayer` (request span with status and latency)
//! 3. Session layer (tower-sessions, `PostgreSQL` store)
//! 4. Security headers
//! 5. Maintenance gate (public routes only)
//! 6. Redirects (public routes only)
//!
//! Authentication is enforced per handler through the [`RequireAdminAuth`]
//! extractor.

pub mod auth;
pub mod maintenance;
pub mod redirects;
pub mod security_headers;
pub mod session;

pub use auth::{
    RequireAdminAuth, clear_current_admin, require_permission, set_current_admin,
};
pub use maintenance::maintenance_middleware;
pub use redirects::redirect_middleware;
pub use security_headers::security_headers_middleware;
pub use session::{create_session_layer, postgres_session_store};
