//! Rendered public page cache.
//!
//! Public pages are rendered from the store on a miss and kept for the
//! configured TTL. Mutations drop the pages they affect (see
//! [`Invalidation`]).
//!
//! Every invalidation bumps a generation counter. A page rendered under an
//! older generation is dropped again right after it is stored, so a render
//! that raced a mutation never outlives it.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use moka::future::Cache;
use tracing::debug;

use crate::models::Invalidation;

const MAX_PAGES: u64 = 500;

/// Cache of rendered HTML keyed by request path.
#[derive(Clone)]
pub struct PageCache {
    pages: Cache<String, Arc<str>>,
    generation: Arc<AtomicU64>,
}

impl PageCache {
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        let pages = Cache::builder()
            .max_capacity(MAX_PAGES)
            .time_to_live(ttl)
            .build();
        Self {
            pages,
            generation: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Current invalidation generation; read it before rendering a page.
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    pub async fn get(&self, path: &str) -> Option<Arc<str>> {
        let hit = self.pages.get(path).await;
        if hit.is_some() {
            debug!(path, "Page cache hit");
        }
        hit
    }

    /// Store a page rendered at `generation`.
    ///
    /// Returns `false` when an invalidation ran since; the page is not kept.
    pub async fn insert_rendered(&self, path: &str, html: Arc<str>, generation: u64) -> bool {
        self.pages.insert(path.to_owned(), html).await;
        // Checked after the insert: an invalidation bumping the counter later
        // removes the entry itself.
        if self.generation() == generation {
            return true;
        }
        debug!(path, "Dropping page rendered before an invalidation");
        self.pages.invalidate(path).await;
        false
    }

    /// Drop cached pages after a mutation.
    pub async fn invalidate(&self, what: Invalidation) {
        if !matches!(what, Invalidation::Nothing) {
            self.generation.fetch_add(1, Ordering::AcqRel);
        }
        match what {
            Invalidation::Nothing => {}
            Invalidation::Paths(paths) => {
                for path in paths {
                    self.pages.invalidate(*path).await;
                }
            }
            Invalidation::Everything => {
                self.pages.invalidate_all();
                self.pages.run_pending_tasks().await;
            }
        }
    }
}

impl std::fmt::Debug for PageCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PageCache")
            .field("entries", &self.pages.entry_count())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_invalidate_listed_paths_only() {
        let cache = PageCache::new(Duration::from_secs(60));
        cache.insert_rendered("/equipe", Arc::from("team"), 0).await;
        cache.insert_rendered("/lexique", Arc::from("lexicon"), 0).await;

        cache.invalidate(Invalidation::Paths(&["/equipe"])).await;

        assert!(cache.get("/equipe").await.is_none());
        assert_eq!(cache.get("/lexique").await.as_deref(), Some("lexicon"));
    }

    #[tokio::test]
    async fn test_render_racing_an_invalidation_is_not_kept() {
        let cache = PageCache::new(Duration::from_secs(60));
        let before = cache.generation();

        // A mutation lands while the page is being rendered.
        cache.invalidate(Invalidation::Paths(&["/recrutement"])).await;

        let kept = cache
            .insert_rendered("/", Arc::from("stale home"), before)
            .await;
        assert!(!kept);
        assert!(cache.get("/").await.is_none());

        let fresh = cache.generation();
        assert!(cache.insert_rendered("/", Arc::from("home"), fresh).await);
        assert_eq!(cache.get("/").await.as_deref(), Some("home"));
    }

    #[tokio::test]
    async fn test_invalidate_everything() {
        let cache = PageCache::new(Duration::from_secs(60));
        cache.insert_rendered("/", Arc::from("home"), 0).await;
        cache.insert_rendered("/faq", Arc::from("faq"), 0).await;

        cache.invalidate(Invalidation::Everything).await;

        assert!(cache.get("/").await.is_none());
        assert!(cache.get("/faq").await.is_none());
    }
}
