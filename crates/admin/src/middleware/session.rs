//! Session middleware configuration.
//!
//! Sessions are stored in `PostgreSQL` using tower-sessions with strict
//! cookie settings (SameSite=Strict, http-only, 24hr inactivity expiry).

use sqlx::PgPool;
use tower_sessions::{Expiry, SessionManagerLayer, SessionStore};
use tower_sessions_sqlx_store::PostgresStore;

/// Session cookie name.
pub const SESSION_COOKIE_NAME: &str = "fdt_admin_session";

/// Session expiry time in seconds (24 hours).
const SESSION_EXPIRY_SECONDS: i64 = 24 * 60 * 60;

/// Schema and table holding sessions (created by migration).
const SESSION_SCHEMA: &str = "admin";
const SESSION_TABLE: &str = "session";

/// Invalid session store configuration.
#[derive(Debug, thiserror::Error)]
#[error("session store: {0}")]
pub struct SessionStoreError(String);

/// Create the `PostgreSQL` session store in `admin.session`.
///
/// # Errors
///
/// Returns `SessionStoreError` if the schema or table name is rejected.
pub fn postgres_session_store(pool: &PgPool) -> Result<PostgresStore, SessionStoreError> {
    PostgresStore::new(pool.clone())
        .with_schema_name(SESSION_SCHEMA)
        .map_err(|e| SessionStoreError(e.to_string()))?
        .with_table_name(SESSION_TABLE)
        .map_err(|e| SessionStoreError(e.to_string()))
}

/// Create the session layer over any session store.
///
/// # Arguments
///
/// * `store` - Session store (`PostgreSQL` in production, memory in tests)
/// * `secure` - Whether to mark the cookie `Secure` (HTTPS deployments)
#[must_use]
pub fn create_session_layer<S: SessionStore + Clone>(
    store: S,
    secure: bool,
) -> SessionManagerLayer<S> {
    SessionManagerLayer::new(store)
        .with_name(SESSION_COOKIE_NAME)
        .with_expiry(Expiry::OnInactivity(
            tower_sessions::cookie::time::Duration::seconds(SESSION_EXPIRY_SECONDS),
        ))
        .with_secure(secure)
        .with_same_site(tower_sessions::cookie::SameSite::Strict)
        .with_http_only(true)
        .with_path("/")
}
