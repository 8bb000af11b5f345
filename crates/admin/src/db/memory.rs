//! In-process implementation of [`RecordStore`].
//!
//! Mirrors the Postgres backend's observable behaviour (ordering, unique
//! columns, deletion markers, `updated_at` bumps) so actions and routes can
//! be exercised without a database.

use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};
use std::sync::RwLock;

use chrono::{DateTime, Utc};
use futures::FutureExt;
use futures::future::{BoxFuture, ready};
use serde_json::Value;
use uuid::Uuid;

use super::{RecordStore, ResourceStats, Row, SortDirection, StoreError, TableSpec};
use crate::models::NotFoundLog;

#[derive(Debug, Default)]
struct Inner {
    tables: HashMap<&'static str, Vec<Row>>,
    not_found: BTreeMap<String, NotFoundLog>,
    settings: HashMap<String, Value>,
}

/// Record store holding everything in memory.
#[derive(Debug, Default)]
pub struct MemoryRecordStore {
    inner: RwLock<Inner>,
}

fn poisoned<T>(_: T) -> StoreError {
    StoreError::Unavailable("memory store lock poisoned".to_owned())
}

fn row_id(row: &Row) -> Option<Uuid> {
    row.get("id")
        .and_then(Value::as_str)
        .and_then(|s| Uuid::parse_str(s).ok())
}

fn is_deleted(row: &Row) -> bool {
    row.get("deleted_at").is_some_and(|v| !v.is_null())
}

fn timestamp(at: DateTime<Utc>) -> Value {
    Value::String(at.to_rfc3339())
}

/// Order JSON values the way Postgres orders the underlying columns, with
/// NULLs last in ascending order.
fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    let a = a.filter(|v| !v.is_null());
    let b = b.filter(|v| !v.is_null());
    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Greater,
        (Some(_), None) => Ordering::Less,
        (Some(Value::Number(x)), Some(Value::Number(y))) => x
            .as_f64()
            .partial_cmp(&y.as_f64())
            .unwrap_or(Ordering::Equal),
        (Some(Value::Bool(x)), Some(Value::Bool(y))) => x.cmp(y),
        (Some(Value::String(x)), Some(Value::String(y))) => {
            match (DateTime::parse_from_rfc3339(x), DateTime::parse_from_rfc3339(y)) {
                (Ok(x), Ok(y)) => x.cmp(&y),
                _ => x.to_lowercase().cmp(&y.to_lowercase()),
            }
        }
        (Some(x), Some(y)) => x.to_string().cmp(&y.to_string()),
    }
}

fn sort_rows(table: &TableSpec, rows: &mut [Row]) {
    rows.sort_by(|a, b| {
        for (column, direction) in table.order_by {
            let ord = compare_values(a.get(*column), b.get(*column));
            let ord = match direction {
                SortDirection::Asc => ord,
                SortDirection::Desc => ord.reverse(),
            };
            if ord != Ordering::Equal {
                return ord;
            }
        }
        row_id(a).cmp(&row_id(b))
    });
}

/// Enforce the table's unique columns against every other row.
fn check_unique(
    table: &TableSpec,
    rows: &[Row],
    candidate: &Row,
    skip: Option<Uuid>,
) -> Result<(), StoreError> {
    for column in table.unique {
        let Some(value) = candidate.get(*column).filter(|v| !v.is_null()) else {
            continue;
        };
        let clash = rows
            .iter()
            .filter(|row| skip.is_none() || row_id(row) != skip)
            .any(|row| row.get(*column) == Some(value));
        if clash {
            return Err(StoreError::Conflict(format!(
                "duplicate value violates {}_{}_key",
                table.name, column
            )));
        }
    }
    Ok(())
}

impl MemoryRecordStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn read<T>(&self, f: impl FnOnce(&Inner) -> T) -> Result<T, StoreError> {
        let guard = self.inner.read().map_err(poisoned)?;
        Ok(f(&guard))
    }

    fn write<T>(
        &self,
        f: impl FnOnce(&mut Inner) -> Result<T, StoreError>,
    ) -> Result<T, StoreError> {
        let mut guard = self.inner.write().map_err(poisoned)?;
        f(&mut guard)
    }

    fn list_now(&self, table: &'static TableSpec, include_deleted: bool) -> Result<Vec<Row>, StoreError> {
        self.read(|inner| {
            let mut rows: Vec<Row> = inner
                .tables
                .get(table.name)
                .map(|rows| {
                    rows.iter()
                        .filter(|row| include_deleted || !is_deleted(row))
                        .cloned()
                        .collect()
                })
                .unwrap_or_default();
            sort_rows(table, &mut rows);
            rows
        })
    }

    fn insert_now(&self, table: &'static TableSpec, row: Row) -> Result<Row, StoreError> {
        table.check_columns(row.keys())?;
        if row_id(&row).is_none() {
            return Err(StoreError::DataCorruption("row without a UUID id".to_owned()));
        }
        self.write(|inner| {
            let rows = inner.tables.entry(table.name).or_default();
            if rows.iter().any(|existing| row_id(existing) == row_id(&row)) {
                return Err(StoreError::Conflict(format!(
                    "duplicate value violates {}_pkey",
                    table.name
                )));
            }
            check_unique(table, rows, &row, None)?;
            rows.push(row.clone());
            Ok(row)
        })
    }

    fn update_now(
        &self,
        table: &'static TableSpec,
        id: Uuid,
        fields: Row,
    ) -> Result<Option<Row>, StoreError> {
        table.check_columns(fields.keys())?;
        self.write(|inner| {
            let rows = inner.tables.entry(table.name).or_default();
            let Some(index) = rows
                .iter()
                .position(|row| row_id(row) == Some(id) && !is_deleted(row))
            else {
                return Ok(None);
            };
            let mut updated = rows.get(index).cloned().unwrap_or_default();
            for (column, value) in fields {
                if table.allows(&column) {
                    updated.insert(column, value);
                }
            }
            updated.insert("updated_at".to_owned(), timestamp(Utc::now()));
            check_unique(table, rows, &updated, Some(id))?;
            if let Some(slot) = rows.get_mut(index) {
                *slot = updated.clone();
            }
            Ok(Some(updated))
        })
    }

    fn set_deleted_now(
        &self,
        table: &'static TableSpec,
        id: Uuid,
        deleted_at: Option<DateTime<Utc>>,
    ) -> Result<Option<Row>, StoreError> {
        self.write(|inner| {
            let rows = inner.tables.entry(table.name).or_default();
            let Some(row) = rows.iter_mut().find(|row| row_id(row) == Some(id)) else {
                return Ok(None);
            };
            match deleted_at {
                Some(at) if !is_deleted(row) => {
                    row.insert("deleted_at".to_owned(), timestamp(at));
                }
                Some(_) => {}
                None => {
                    row.insert("deleted_at".to_owned(), Value::Null);
                }
            }
            Ok(Some(row.clone()))
        })
    }

    fn stats_now(&self, table: &'static TableSpec) -> Result<ResourceStats, StoreError> {
        self.read(|inner| {
            let rows = inner.tables.get(table.name).map_or(&[][..], Vec::as_slice);
            let mut stats = ResourceStats::default();
            for row in rows {
                stats.total += 1;
                if is_deleted(row) {
                    stats.deleted += 1;
                } else if table
                    .active_flag
                    .is_none_or(|flag| row.get(flag).and_then(Value::as_bool) == Some(true))
                {
                    stats.active += 1;
                }
            }
            stats
        })
    }
}

impl RecordStore for MemoryRecordStore {
    fn list<'a>(
        &'a self,
        table: &'static TableSpec,
        include_deleted: bool,
    ) -> BoxFuture<'a, Result<Vec<Row>, StoreError>> {
        ready(self.list_now(table, include_deleted)).boxed()
    }

    fn get<'a>(
        &'a self,
        table: &'static TableSpec,
        id: Uuid,
    ) -> BoxFuture<'a, Result<Option<Row>, StoreError>> {
        let result = self.read(|inner| {
            inner
                .tables
                .get(table.name)
                .and_then(|rows| rows.iter().find(|row| row_id(row) == Some(id)).cloned())
        });
        ready(result).boxed()
    }

    fn find_live_by<'a>(
        &'a self,
        table: &'static TableSpec,
        column: &'a str,
        value: &'a Value,
    ) -> BoxFuture<'a, Result<Option<Row>, StoreError>> {
        let result = self.list_now(table, false).map(|rows| {
            rows.into_iter()
                .find(|row| row.get(column) == Some(value))
        });
        ready(result).boxed()
    }

    fn insert<'a>(
        &'a self,
        table: &'static TableSpec,
        row: Row,
    ) -> BoxFuture<'a, Result<Row, StoreError>> {
        ready(self.insert_now(table, row)).boxed()
    }

    fn update<'a>(
        &'a self,
        table: &'static TableSpec,
        id: Uuid,
        fields: Row,
    ) -> BoxFuture<'a, Result<Option<Row>, StoreError>> {
        ready(self.update_now(table, id, fields)).boxed()
    }

    fn set_deleted<'a>(
        &'a self,
        table: &'static TableSpec,
        id: Uuid,
        deleted_at: Option<DateTime<Utc>>,
    ) -> BoxFuture<'a, Result<Option<Row>, StoreError>> {
        ready(self.set_deleted_now(table, id, deleted_at)).boxed()
    }

    fn purge<'a>(
        &'a self,
        table: &'static TableSpec,
        id: Uuid,
    ) -> BoxFuture<'a, Result<bool, StoreError>> {
        let result = self.write(|inner| {
            let rows = inner.tables.entry(table.name).or_default();
            let before = rows.len();
            rows.retain(|row| row_id(row) != Some(id));
            Ok(rows.len() < before)
        });
        ready(result).boxed()
    }

    fn stats<'a>(
        &'a self,
        table: &'static TableSpec,
    ) -> BoxFuture<'a, Result<ResourceStats, StoreError>> {
        ready(self.stats_now(table)).boxed()
    }

    fn record_not_found<'a>(
        &'a self,
        path: &'a str,
        at: DateTime<Utc>,
    ) -> BoxFuture<'a, Result<(), StoreError>> {
        let result = self.write(|inner| {
            inner
                .not_found
                .entry(path.to_owned())
                .and_modify(|log| {
                    log.hit_count += 1;
                    log.last_seen = at;
                })
                .or_insert_with(|| NotFoundLog {
                    path: path.to_owned(),
                    hit_count: 1,
                    first_seen: at,
                    last_seen: at,
                });
            Ok(())
        });
        ready(result).boxed()
    }

    fn not_found_logs(&self) -> BoxFuture<'_, Result<Vec<NotFoundLog>, StoreError>> {
        let result = self.read(|inner| inner.not_found.values().cloned().collect());
        ready(result).boxed()
    }

    fn delete_not_found<'a>(&'a self, path: &'a str) -> BoxFuture<'a, Result<bool, StoreError>> {
        let result = self.write(|inner| Ok(inner.not_found.remove(path).is_some()));
        ready(result).boxed()
    }

    fn get_setting<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Result<Option<Value>, StoreError>> {
        let result = self.read(|inner| inner.settings.get(key).cloned());
        ready(result).boxed()
    }

    fn set_setting<'a>(
        &'a self,
        key: &'a str,
        value: Value,
    ) -> BoxFuture<'a, Result<(), StoreError>> {
        let result = self.write(|inner| {
            inner.settings.insert(key.to_owned(), value);
            Ok(())
        });
        ready(result).boxed()
    }

    fn ping(&self) -> BoxFuture<'_, Result<(), StoreError>> {
        ready(self.read(|_| ())).boxed()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use serde_json::json;

    use super::*;

    static THINGS: TableSpec = TableSpec {
        name: "things",
        columns: &["name", "sort_order", "is_active"],
        unique: &["name"],
        order_by: &[("sort_order", SortDirection::Asc), ("name", SortDirection::Asc)],
        active_flag: Some("is_active"),
    };

    fn thing(name: &str, sort_order: i32, is_active: bool) -> Row {
        let now = Utc::now().to_rfc3339();
        let value = json!({
            "id": Uuid::new_v4().to_string(),
            "name": name,
            "sort_order": sort_order,
            "is_active": is_active,
            "created_at": now,
            "updated_at": now,
            "deleted_at": null,
        });
        match value {
            Value::Object(map) => map,
            _ => unreachable!(),
        }
    }

    #[tokio::test]
    async fn test_list_follows_table_ordering() {
        let store = MemoryRecordStore::new();
        store.insert(&THINGS, thing("b", 2, true)).await.unwrap();
        store.insert(&THINGS, thing("a", 2, true)).await.unwrap();
        store.insert(&THINGS, thing("z", 1, true)).await.unwrap();

        let names: Vec<_> = store
            .list(&THINGS, false)
            .await
            .unwrap()
            .into_iter()
            .map(|r| r["name"].as_str().unwrap().to_owned())
            .collect();
        assert_eq!(names, ["z", "a", "b"]);
    }

    #[tokio::test]
    async fn test_unique_columns_conflict() {
        let store = MemoryRecordStore::new();
        store.insert(&THINGS, thing("dup", 1, true)).await.unwrap();
        let err = store.insert(&THINGS, thing("dup", 2, true)).await;
        assert!(matches!(err, Err(StoreError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_set_deleted_keeps_first_marker() {
        let store = MemoryRecordStore::new();
        let row = store.insert(&THINGS, thing("x", 1, true)).await.unwrap();
        let id = row_id(&row).unwrap();
        let first = Utc::now() - chrono::Duration::hours(1);

        store.set_deleted(&THINGS, id, Some(first)).await.unwrap();
        let again = store
            .set_deleted(&THINGS, id, Some(Utc::now()))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(again["deleted_at"], timestamp(first));
        assert!(store.list(&THINGS, false).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_update_skips_trashed_rows() {
        let store = MemoryRecordStore::new();
        let row = store.insert(&THINGS, thing("x", 1, true)).await.unwrap();
        let id = row_id(&row).unwrap();
        store.set_deleted(&THINGS, id, Some(Utc::now())).await.unwrap();

        let mut fields = Row::new();
        fields.insert("name".to_owned(), json!("y"));
        assert!(store.update(&THINGS, id, fields).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_stats_counts_by_state() {
        let store = MemoryRecordStore::new();
        store.insert(&THINGS, thing("a", 1, true)).await.unwrap();
        store.insert(&THINGS, thing("b", 1, false)).await.unwrap();
        let c = store.insert(&THINGS, thing("c", 1, true)).await.unwrap();
        store
            .set_deleted(&THINGS, row_id(&c).unwrap(), Some(Utc::now()))
            .await
            .unwrap();

        let stats = store.stats(&THINGS).await.unwrap();
        assert_eq!(
            stats,
            ResourceStats {
                total: 3,
                active: 1,
                deleted: 1
            }
        );
    }

    #[tokio::test]
    async fn test_not_found_log_accumulates() {
        let store = MemoryRecordStore::new();
        store.record_not_found("/old", Utc::now()).await.unwrap();
        store.record_not_found("/old", Utc::now()).await.unwrap();
        let logs = store.not_found_logs().await.unwrap();
        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0].hit_count, 2);
        assert!(store.delete_not_found("/old").await.unwrap());
        assert!(!store.delete_not_found("/old").await.unwrap());
    }
}
