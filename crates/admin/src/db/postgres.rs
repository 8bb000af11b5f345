//! `PostgreSQL` implementation of [`RecordStore`].
//!
//! Rows are read with `to_jsonb(t.*)` and written through
//! `jsonb_populate_record`, so one set of queries serves every table. Table
//! and column names only ever come from static [`TableSpec`]s and are quoted
//! after an identifier check; values are always bound parameters.

use chrono::{DateTime, Utc};
use futures::FutureExt;
use futures::future::BoxFuture;
use serde_json::Value;
use sqlx::PgPool;
use uuid::Uuid;

use super::{RecordStore, ResourceStats, Row, SortDirection, StoreError, TableSpec};
use crate::models::NotFoundLog;

/// Record store backed by the hosted Postgres database.
#[derive(Debug, Clone)]
pub struct PgRecordStore {
    pool: PgPool,
}

impl PgRecordStore {
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Quote an identifier after checking it is a plain lowercase name.
fn ident(name: &str) -> Result<String, StoreError> {
    let plain = !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_');
    if plain {
        Ok(format!("\"{name}\""))
    } else {
        Err(StoreError::DataCorruption(format!(
            "refusing to use identifier {name:?}"
        )))
    }
}

fn order_clause(table: &TableSpec) -> Result<String, StoreError> {
    let mut parts = Vec::with_capacity(table.order_by.len() + 1);
    for (column, direction) in table.order_by {
        let dir = match direction {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        };
        parts.push(format!("t.{} {dir}", ident(column)?));
    }
    parts.push("t.\"id\" ASC".to_owned());
    Ok(parts.join(", "))
}

fn into_row(value: Value) -> Result<Row, StoreError> {
    match value {
        Value::Object(map) => Ok(map),
        other => Err(StoreError::DataCorruption(format!(
            "expected a JSON object row, got {other}"
        ))),
    }
}

/// Map unique violations to `Conflict`, keeping the constraint name.
fn map_write_error(table: &TableSpec, e: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(ref db_err) = e
        && db_err.is_unique_violation()
    {
        let constraint = db_err.constraint().unwrap_or(table.name);
        return StoreError::Conflict(format!("duplicate value violates {constraint}"));
    }
    StoreError::Database(e)
}

impl PgRecordStore {
    async fn list_rows(
        &self,
        table: &'static TableSpec,
        include_deleted: bool,
    ) -> Result<Vec<Row>, StoreError> {
        let filter = if include_deleted {
            ""
        } else {
            "WHERE t.deleted_at IS NULL"
        };
        let sql = format!(
            "SELECT to_jsonb(t.*) FROM {} AS t {filter} ORDER BY {}",
            ident(table.name)?,
            order_clause(table)?
        );
        let rows: Vec<Value> = sqlx::query_scalar(&sql).fetch_all(&self.pool).await?;
        rows.into_iter().map(into_row).collect()
    }

    async fn get_row(&self, table: &'static TableSpec, id: Uuid) -> Result<Option<Row>, StoreError> {
        let sql = format!(
            "SELECT to_jsonb(t.*) FROM {} AS t WHERE t.id = $1",
            ident(table.name)?
        );
        let row: Option<Value> = sqlx::query_scalar(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(into_row).transpose()
    }

    async fn find_live_row(
        &self,
        table: &'static TableSpec,
        column: &str,
        value: &Value,
    ) -> Result<Option<Row>, StoreError> {
        let sql = format!(
            "SELECT to_jsonb(t.*) FROM {} AS t \
             WHERE t.deleted_at IS NULL AND t.{} = (jsonb_populate_record(NULL::{}, $1)).{} \
             ORDER BY {} LIMIT 1",
            ident(table.name)?,
            ident(column)?,
            ident(table.name)?,
            ident(column)?,
            order_clause(table)?
        );
        let mut probe = Row::new();
        probe.insert(column.to_owned(), value.clone());
        let row: Option<Value> = sqlx::query_scalar(&sql)
            .bind(Value::Object(probe))
            .fetch_optional(&self.pool)
            .await?;
        row.map(into_row).transpose()
    }

    async fn insert_row(&self, table: &'static TableSpec, row: Row) -> Result<Row, StoreError> {
        table.check_columns(row.keys())?;
        let name = ident(table.name)?;
        let sql = format!(
            "INSERT INTO {name} AS t \
             SELECT * FROM jsonb_populate_record(NULL::{name}, $1) \
             RETURNING to_jsonb(t.*)"
        );
        let inserted: Value = sqlx::query_scalar(&sql)
            .bind(Value::Object(row))
            .fetch_one(&self.pool)
            .await
            .map_err(|e| map_write_error(table, e))?;
        into_row(inserted)
    }

    async fn update_row(
        &self,
        table: &'static TableSpec,
        id: Uuid,
        fields: Row,
    ) -> Result<Option<Row>, StoreError> {
        table.check_columns(fields.keys())?;
        let name = ident(table.name)?;
        let mut columns = Vec::with_capacity(fields.len() + 1);
        let mut sources = Vec::with_capacity(fields.len() + 1);
        for column in fields.keys().filter(|c| table.allows(c)) {
            let quoted = ident(column)?;
            sources.push(format!("r.{quoted}"));
            columns.push(quoted);
        }
        columns.push("\"updated_at\"".to_owned());
        sources.push("now()".to_owned());

        let sql = format!(
            "UPDATE {name} AS t SET ({}) = (SELECT {} FROM jsonb_populate_record(NULL::{name}, $2) AS r) \
             WHERE t.id = $1 AND t.deleted_at IS NULL \
             RETURNING to_jsonb(t.*)",
            columns.join(", "),
            sources.join(", ")
        );
        let updated: Option<Value> = sqlx::query_scalar(&sql)
            .bind(id)
            .bind(Value::Object(fields))
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_write_error(table, e))?;
        updated.map(into_row).transpose()
    }

    async fn set_deleted_row(
        &self,
        table: &'static TableSpec,
        id: Uuid,
        deleted_at: Option<DateTime<Utc>>,
    ) -> Result<Option<Row>, StoreError> {
        let sql = format!(
            "UPDATE {} AS t \
             SET deleted_at = CASE WHEN $2::timestamptz IS NULL THEN NULL ELSE COALESCE(t.deleted_at, $2) END \
             WHERE t.id = $1 \
             RETURNING to_jsonb(t.*)",
            ident(table.name)?
        );
        let row: Option<Value> = sqlx::query_scalar(&sql)
            .bind(id)
            .bind(deleted_at)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_write_error(table, e))?;
        row.map(into_row).transpose()
    }

    async fn purge_row(&self, table: &'static TableSpec, id: Uuid) -> Result<bool, StoreError> {
        let sql = format!("DELETE FROM {} WHERE id = $1", ident(table.name)?);
        let result = sqlx::query(&sql).bind(id).execute(&self.pool).await?;
        Ok(result.rows_affected() > 0)
    }

    async fn table_stats(&self, table: &'static TableSpec) -> Result<ResourceStats, StoreError> {
        let active_filter = match table.active_flag {
            Some(flag) => format!("deleted_at IS NULL AND {}", ident(flag)?),
            None => "deleted_at IS NULL".to_owned(),
        };
        let sql = format!(
            "SELECT COUNT(*), \
                    COUNT(*) FILTER (WHERE {active_filter}), \
                    COUNT(*) FILTER (WHERE deleted_at IS NOT NULL) \
             FROM {}",
            ident(table.name)?
        );
        let (total, active, deleted): (i64, i64, i64) =
            sqlx::query_as(&sql).fetch_one(&self.pool).await?;
        Ok(ResourceStats {
            total,
            active,
            deleted,
        })
    }
}

impl RecordStore for PgRecordStore {
    fn list<'a>(
        &'a self,
        table: &'static TableSpec,
        include_deleted: bool,
    ) -> BoxFuture<'a, Result<Vec<Row>, StoreError>> {
        self.list_rows(table, include_deleted).boxed()
    }

    fn get<'a>(
        &'a self,
        table: &'static TableSpec,
        id: Uuid,
    ) -> BoxFuture<'a, Result<Option<Row>, StoreError>> {
        self.get_row(table, id).boxed()
    }

    fn find_live_by<'a>(
        &'a self,
        table: &'static TableSpec,
        column: &'a str,
        value: &'a Value,
    ) -> BoxFuture<'a, Result<Option<Row>, StoreError>> {
        self.find_live_row(table, column, value).boxed()
    }

    fn insert<'a>(
        &'a self,
        table: &'static TableSpec,
        row: Row,
    ) -> BoxFuture<'a, Result<Row, StoreError>> {
        self.insert_row(table, row).boxed()
    }

    fn update<'a>(
        &'a self,
        table: &'static TableSpec,
        id: Uuid,
        fields: Row,
    ) -> BoxFuture<'a, Result<Option<Row>, StoreError>> {
        self.update_row(table, id, fields).boxed()
    }

    fn set_deleted<'a>(
        &'a self,
        table: &'static TableSpec,
        id: Uuid,
        deleted_at: Option<DateTime<Utc>>,
    ) -> BoxFuture<'a, Result<Option<Row>, StoreError>> {
        self.set_deleted_row(table, id, deleted_at).boxed()
    }

    fn purge<'a>(
        &'a self,
        table: &'static TableSpec,
        id: Uuid,
    ) -> BoxFuture<'a, Result<bool, StoreError>> {
        self.purge_row(table, id).boxed()
    }

    fn stats<'a>(
        &'a self,
        table: &'static TableSpec,
    ) -> BoxFuture<'a, Result<ResourceStats, StoreError>> {
        self.table_stats(table).boxed()
    }

    fn record_not_found<'a>(
        &'a self,
        path: &'a str,
        at: DateTime<Utc>,
    ) -> BoxFuture<'a, Result<(), StoreError>> {
        async move {
            sqlx::query(
                r"
                INSERT INTO not_found_logs (path, hit_count, first_seen, last_seen)
                VALUES ($1, 1, $2, $2)
                ON CONFLICT (path) DO UPDATE
                SET hit_count = not_found_logs.hit_count + 1, last_seen = $2
                ",
            )
            .bind(path)
            .bind(at)
            .execute(&self.pool)
            .await?;
            Ok(())
        }
        .boxed()
    }

    fn not_found_logs(&self) -> BoxFuture<'_, Result<Vec<NotFoundLog>, StoreError>> {
        async move {
            let rows: Vec<(String, i64, DateTime<Utc>, DateTime<Utc>)> = sqlx::query_as(
                "SELECT path, hit_count, first_seen, last_seen FROM not_found_logs",
            )
            .fetch_all(&self.pool)
            .await?;
            Ok(rows
                .into_iter()
                .map(|(path, hit_count, first_seen, last_seen)| NotFoundLog {
                    path,
                    hit_count,
                    first_seen,
                    last_seen,
                })
                .collect())
        }
        .boxed()
    }

    fn delete_not_found<'a>(&'a self, path: &'a str) -> BoxFuture<'a, Result<bool, StoreError>> {
        async move {
            let result = sqlx::query("DELETE FROM not_found_logs WHERE path = $1")
                .bind(path)
                .execute(&self.pool)
                .await?;
            Ok(result.rows_affected() > 0)
        }
        .boxed()
    }

    fn get_setting<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Result<Option<Value>, StoreError>> {
        async move {
            let value: Option<Value> =
                sqlx::query_scalar("SELECT value FROM settings WHERE key = $1")
                    .bind(key)
                    .fetch_optional(&self.pool)
                    .await?;
            Ok(value)
        }
        .boxed()
    }

    fn set_setting<'a>(
        &'a self,
        key: &'a str,
        value: Value,
    ) -> BoxFuture<'a, Result<(), StoreError>> {
        async move {
            sqlx::query(
                r"
                INSERT INTO settings (key, value)
                VALUES ($1, $2)
                ON CONFLICT (key) DO UPDATE SET value = $2, updated_at = NOW()
                ",
            )
            .bind(key)
            .bind(value)
            .execute(&self.pool)
            .await?;
            Ok(())
        }
        .boxed()
    }

    fn ping(&self) -> BoxFuture<'_, Result<(), StoreError>> {
        async move {
            sqlx::query("SELECT 1").execute(&self.pool).await?;
            Ok(())
        }
        .boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    static SPEC: TableSpec = TableSpec {
        name: "job_openings",
        columns: &["title"],
        unique: &[],
        order_by: &[
            ("sort_order", SortDirection::Asc),
            ("created_at", SortDirection::Desc),
        ],
        active_flag: None,
    };

    #[test]
    fn test_ident_quotes_plain_names() {
        assert_eq!(ident("job_openings").ok(), Some("\"job_openings\"".to_owned()));
    }

    #[test]
    fn test_ident_rejects_injection() {
        assert!(ident("x\"; DROP TABLE users; --").is_err());
        assert!(ident("").is_err());
        assert!(ident("Title").is_err());
    }

    #[test]
    fn test_order_clause_appends_id_tiebreak() {
        assert_eq!(
            order_clause(&SPEC).ok().as_deref(),
            Some("t.\"sort_order\" ASC, t.\"created_at\" DESC, t.\"id\" ASC")
        );
    }

    #[test]
    fn test_into_row_rejects_non_objects() {
        assert!(into_row(Value::Null).is_err());
        assert!(into_row(serde_json::json!({"id": 1})).is_ok());
    }
}
