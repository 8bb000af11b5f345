//! Redirect resolution and 404 tracking.

use std::collections::HashSet;

use chrono::{Duration, Utc};
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, instrument};

use formdetoit_core::SitePath;

use super::{ActionError, decode};
use crate::db::RecordStore;
use crate::models::{Entity, NotFoundLog, Redirect};

/// First path segments served by the back-office and infrastructure.
const INTERNAL_PREFIXES: &[&str] = &["admin", "api", "auth", "static", "health"];

/// Whether `path` belongs to the back-office, API, assets or health checks
/// rather than the public site.
#[must_use]
pub fn is_internal_path(path: &str) -> bool {
    let first = path.trim_start_matches('/').split('/').next().unwrap_or_default();
    INTERNAL_PREFIXES.contains(&first)
}

/// A 404 log entry with redirect coverage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NotFoundEntry {
    #[serde(flatten)]
    pub log: NotFoundLog,
    /// Whether a live redirect already answers this path.
    pub has_redirect: bool,
}

/// Summary of the 404 log.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct NotFoundStats {
    pub tracked_paths: i64,
    pub total_hits: i64,
    pub seen_last_7_days: i64,
    pub covered_by_redirect: i64,
}

/// Redirect and 404 actions.
pub struct RedirectActions<'a> {
    store: &'a dyn RecordStore,
}

impl<'a> RedirectActions<'a> {
    #[must_use]
    pub const fn new(store: &'a dyn RecordStore) -> Self {
        Self { store }
    }

    /// The live, active redirect for a request path, if any.
    ///
    /// # Errors
    ///
    /// Returns `ActionError::Store` if the store fails.
    pub async fn resolve(&self, path: &str) -> Result<Option<Redirect>, ActionError> {
        let Ok(path) = SitePath::parse(path) else {
            return Ok(None);
        };
        let key = Value::String(path.as_str().to_owned());
        let Some(row) = self
            .store
            .find_live_by(Redirect::TABLE, "source_path", &key)
            .await?
        else {
            return Ok(None);
        };
        let redirect: Redirect = decode(row)?;
        Ok(redirect.is_active.then_some(redirect))
    }

    /// Count a 404 on a public path.
    ///
    /// Returns whether the hit was recorded; back-office and asset paths are
    /// skipped.
    ///
    /// # Errors
    ///
    /// Returns `ActionError::Store` if the store fails.
    #[instrument(skip(self))]
    pub async fn record_not_found(&self, path: &str) -> Result<bool, ActionError> {
        let Ok(path) = SitePath::parse(path) else {
            return Ok(false);
        };
        if INTERNAL_PREFIXES.contains(&path.first_segment()) {
            debug!("Skipping 404 tracking for internal path");
            return Ok(false);
        }
        self.store.record_not_found(path.as_str(), Utc::now()).await?;
        Ok(true)
    }

    /// The 404 log, most hit first, each entry flagged with redirect coverage.
    ///
    /// # Errors
    ///
    /// Returns `ActionError::Store` if the store fails.
    pub async fn not_found_logs(&self) -> Result<Vec<NotFoundEntry>, ActionError> {
        let mut logs = self.store.not_found_logs().await?;
        logs.sort_by(|a, b| {
            b.hit_count
                .cmp(&a.hit_count)
                .then_with(|| b.last_seen.cmp(&a.last_seen))
                .then_with(|| a.path.cmp(&b.path))
        });
        let covered = self.redirected_paths().await?;
        Ok(logs
            .into_iter()
            .map(|log| NotFoundEntry {
                has_redirect: covered.contains(&log.path),
                log,
            })
            .collect())
    }

    /// Aggregate figures for the 404 dashboard.
    ///
    /// # Errors
    ///
    /// Returns `ActionError::Store` if the store fails.
    pub async fn not_found_stats(&self) -> Result<NotFoundStats, ActionError> {
        let logs = self.store.not_found_logs().await?;
        let covered = self.redirected_paths().await?;
        let week_ago = Utc::now() - Duration::days(7);

        let mut stats = NotFoundStats::default();
        for log in &logs {
            stats.tracked_paths += 1;
            stats.total_hits += log.hit_count;
            if log.last_seen >= week_ago {
                stats.seen_last_7_days += 1;
            }
            if covered.contains(&log.path) {
                stats.covered_by_redirect += 1;
            }
        }
        Ok(stats)
    }

    /// Remove a 404 log entry.
    ///
    /// # Errors
    ///
    /// Returns `ActionError::NotFound` if the path is not logged.
    #[instrument(skip(self))]
    pub async fn dismiss(&self, path: &str) -> Result<(), ActionError> {
        if self.store.delete_not_found(path).await? {
            Ok(())
        } else {
            Err(ActionError::NotFound {
                resource: "404-logs",
                key: path.to_owned(),
            })
        }
    }

    async fn redirected_paths(&self) -> Result<HashSet<String>, ActionError> {
        let rows = self.store.list(Redirect::TABLE, false).await?;
        let mut paths = HashSet::with_capacity(rows.len());
        for row in rows {
            let redirect: Redirect = decode(row)?;
            if redirect.is_active {
                paths.insert(redirect.source_path);
            }
        }
        Ok(paths)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use std::time::Duration as StdDuration;

    use serde_json::json;

    use super::*;
    use crate::actions::{PageCache, ResourceActions};
    use crate::db::MemoryRecordStore;

    async fn redirect(store: &MemoryRecordStore, source: &str, active: bool) -> Redirect {
        let cache = PageCache::new(StdDuration::from_secs(60));
        ResourceActions::<Redirect>::new(store, &cache)
            .create(
                serde_json::from_value(json!({
                    "source_path": source,
                    "destination": "/",
                    "is_active": active
                }))
                .unwrap(),
            )
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_resolve_normalises_and_skips_inactive() {
        let store = MemoryRecordStore::new();
        redirect(&store, "/ancien-site", true).await;
        redirect(&store, "/inactive", false).await;
        let actions = RedirectActions::new(&store);

        let hit = actions.resolve("/ancien-site/").await.unwrap();
        assert_eq!(hit.map(|r| r.destination), Some("/".to_owned()));
        assert!(actions.resolve("/inactive").await.unwrap().is_none());
        assert!(actions.resolve("/nowhere").await.unwrap().is_none());
    }

    #[test]
    fn test_is_internal_path() {
        assert!(is_internal_path("/admin"));
        assert!(is_internal_path("/api/admin/pages"));
        assert!(is_internal_path("/health/ready"));
        assert!(!is_internal_path("/"));
        assert!(!is_internal_path("/administratif"));
        assert!(!is_internal_path("/equipe"));
    }

    #[tokio::test]
    async fn test_internal_paths_are_not_tracked() {
        let store = MemoryRecordStore::new();
        let actions = RedirectActions::new(&store);

        assert!(!actions.record_not_found("/admin/nope").await.unwrap());
        assert!(!actions.record_not_found("/static/missing.css").await.unwrap());
        assert!(actions.record_not_found("/toiture-ardoise").await.unwrap());

        let logs = actions.not_found_logs().await.unwrap();
        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0].log.path, "/toiture-ardoise");
    }

    #[tokio::test]
    async fn test_logs_order_and_coverage() {
        let store = MemoryRecordStore::new();
        let actions = RedirectActions::new(&store);
        actions.record_not_found("/rare").await.unwrap();
        for _ in 0..3 {
            actions.record_not_found("/frequent").await.unwrap();
        }
        redirect(&store, "/rare", false).await;

        let logs = actions.not_found_logs().await.unwrap();
        assert_eq!(logs[0].log.path, "/frequent");
        assert_eq!(logs[0].log.hit_count, 3);
        assert!(!logs[1].has_redirect);

        let stats = actions.not_found_stats().await.unwrap();
        assert_eq!(
            stats,
            NotFoundStats {
                tracked_paths: 2,
                total_hits: 4,
                seen_last_7_days: 2,
                covered_by_redirect: 0,
            }
        );
    }

    #[tokio::test]
    async fn test_dismiss_unknown_path() {
        let store = MemoryRecordStore::new();
        let actions = RedirectActions::new(&store);
        actions.record_not_found("/x").await.unwrap();
        actions.dismiss("/x").await.unwrap();
        assert!(matches!(
            actions.dismiss("/x").await,
            Err(ActionError::NotFound { .. })
        ));
    }
}
