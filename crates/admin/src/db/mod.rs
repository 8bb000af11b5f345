//! Record storage for the hosted Postgres database.
//!
//! # Tables
//!
//! - `team_members`, `job_openings`, `categories`, `certifications`,
//!   `lexicon_terms`, `pages`, `popups`, `redirects`, `users` - admin-managed
//!   records, all carrying `id`, `created_at`, `updated_at`, `deleted_at`
//! - `not_found_logs` - 404 hits per path
//! - `settings` - site-wide settings (JSONB)
//! - `admin.session` - tower-sessions storage
//!
//! Records cross the store boundary as JSON objects ([`Row`]); the typed
//! models in [`crate::models`] are decoded from them by the action layer.
//! Two backends implement [`RecordStore`]: [`PgRecordStore`] for production
//! and [`MemoryRecordStore`] for tests and local experiments.
//!
//! # Migrations
//!
//! Migrations are stored in `crates/admin/migrations/` and run via:
//! ```bash
//! cargo run -p formdetoit-cli -- migrate
//! ```

pub mod memory;
pub mod postgres;

use std::time::Duration;

use chrono::{DateTime, Utc};
use futures::future::BoxFuture;
use secrecy::ExposeSecret;
use serde::Serialize;
use serde_json::{Map, Value};
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;
use uuid::Uuid;

use crate::models::NotFoundLog;

pub use memory::MemoryRecordStore;
pub use postgres::PgRecordStore;

/// A record as stored: column name to JSON value.
pub type Row = Map<String, Value>;

/// Errors that can occur during store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Constraint violation (e.g., duplicate slug).
    #[error("constraint violation: {0}")]
    Conflict(String),

    /// A column outside the table's declared columns was written.
    #[error("unknown column {column} on {table}")]
    UnknownColumn {
        table: &'static str,
        column: String,
    },

    /// The store cannot serve requests right now.
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Sort direction for a table's default ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    Desc,
}

/// Static description of an admin-managed table.
#[derive(Debug)]
pub struct TableSpec {
    /// Table name in the database.
    pub name: &'static str,
    /// Business columns the application may write.
    pub columns: &'static [&'static str],
    /// Columns carrying a uniqueness constraint.
    pub unique: &'static [&'static str],
    /// Default listing order.
    pub order_by: &'static [(&'static str, SortDirection)],
    /// Boolean column counted as "active" in stats, if any.
    pub active_flag: Option<&'static str>,
}

impl TableSpec {
    /// Whether `column` may be written by the application.
    #[must_use]
    pub fn allows(&self, column: &str) -> bool {
        self.columns.contains(&column)
    }

    /// Reject rows carrying columns outside the declared set.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::UnknownColumn` for the first foreign column.
    pub fn check_columns<'a>(
        &self,
        columns: impl IntoIterator<Item = &'a String>,
    ) -> Result<(), StoreError> {
        for column in columns {
            if !self.allows(column) && !SYSTEM_COLUMNS.contains(&column.as_str()) {
                return Err(StoreError::UnknownColumn {
                    table: self.name,
                    column: column.clone(),
                });
            }
        }
        Ok(())
    }
}

/// Columns every admin-managed table carries, maintained by the store.
pub const SYSTEM_COLUMNS: &[&str] = &["id", "created_at", "updated_at", "deleted_at"];

/// Row counts of a table, split by lifecycle state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ResourceStats {
    /// Every row, trash included.
    pub total: i64,
    /// Live rows whose active flag is set (all live rows without a flag).
    pub active: i64,
    /// Soft-deleted rows.
    pub deleted: i64,
}

/// Storage operations used by the action layer.
///
/// Implementations translate each call into a single round trip; there is
/// no transaction spanning several calls.
pub trait RecordStore: Send + Sync {
    /// List rows in the table's default order, trash included on request.
    fn list<'a>(
        &'a self,
        table: &'static TableSpec,
        include_deleted: bool,
    ) -> BoxFuture<'a, Result<Vec<Row>, StoreError>>;

    /// Fetch a row by ID, whether live or in the trash.
    fn get<'a>(
        &'a self,
        table: &'static TableSpec,
        id: Uuid,
    ) -> BoxFuture<'a, Result<Option<Row>, StoreError>>;

    /// Fetch the first live row whose `column` equals `value`.
    fn find_live_by<'a>(
        &'a self,
        table: &'static TableSpec,
        column: &'a str,
        value: &'a Value,
    ) -> BoxFuture<'a, Result<Option<Row>, StoreError>>;

    /// Insert a complete row (ID and timestamps included).
    fn insert<'a>(
        &'a self,
        table: &'static TableSpec,
        row: Row,
    ) -> BoxFuture<'a, Result<Row, StoreError>>;

    /// Update columns of a live row and bump `updated_at`.
    ///
    /// Returns `None` when no live row has this ID.
    fn update<'a>(
        &'a self,
        table: &'static TableSpec,
        id: Uuid,
        fields: Row,
    ) -> BoxFuture<'a, Result<Option<Row>, StoreError>>;

    /// Set (`Some`) or clear (`None`) the deletion marker.
    ///
    /// Setting keeps an existing marker. `updated_at` is not touched.
    /// Returns `None` when the row does not exist.
    fn set_deleted<'a>(
        &'a self,
        table: &'static TableSpec,
        id: Uuid,
        deleted_at: Option<DateTime<Utc>>,
    ) -> BoxFuture<'a, Result<Option<Row>, StoreError>>;

    /// Remove a row. Returns whether a row was removed.
    fn purge<'a>(
        &'a self,
        table: &'static TableSpec,
        id: Uuid,
    ) -> BoxFuture<'a, Result<bool, StoreError>>;

    /// Aggregate counts for the table.
    fn stats<'a>(
        &'a self,
        table: &'static TableSpec,
    ) -> BoxFuture<'a, Result<ResourceStats, StoreError>>;

    /// Count a 404 hit on `path`.
    fn record_not_found<'a>(
        &'a self,
        path: &'a str,
        at: DateTime<Utc>,
    ) -> BoxFuture<'a, Result<(), StoreError>>;

    /// Every 404 log entry, unordered.
    fn not_found_logs(&self) -> BoxFuture<'_, Result<Vec<NotFoundLog>, StoreError>>;

    /// Remove a 404 log entry. Returns whether it existed.
    fn delete_not_found<'a>(&'a self, path: &'a str) -> BoxFuture<'a, Result<bool, StoreError>>;

    /// Read a site-wide setting.
    fn get_setting<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Result<Option<Value>, StoreError>>;

    /// Write a site-wide setting.
    fn set_setting<'a>(
        &'a self,
        key: &'a str,
        value: Value,
    ) -> BoxFuture<'a, Result<(), StoreError>>;

    /// Check the store is reachable.
    fn ping(&self) -> BoxFuture<'_, Result<(), StoreError>>;
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}

#[cfg(test)]
mod tests {
    use super::*;

    static SPEC: TableSpec = TableSpec {
        name: "things",
        columns: &["name", "is_active"],
        unique: &[],
        order_by: &[("name", SortDirection::Asc)],
        active_flag: Some("is_active"),
    };

    #[test]
    fn test_check_columns_accepts_declared_and_system_columns() {
        let cols = ["name".to_string(), "id".to_string(), "deleted_at".to_string()];
        assert!(SPEC.check_columns(cols.iter()).is_ok());
    }

    #[test]
    fn test_check_columns_rejects_foreign_column() {
        let cols = ["password".to_string()];
        let err = SPEC.check_columns(cols.iter());
        assert!(matches!(
            err,
            Err(StoreError::UnknownColumn { table: "things", .. })
        ));
    }
}
