//! Application state shared across handlers.

use std::sync::Arc;

use crate::actions::{
    IdentityProvider, PageCache, RedirectActions, ResourceActions, SettingsActions, UserActions,
};
use crate::config::AppConfig;
use crate::db::RecordStore;
use crate::models::Entity;

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and hands out the action
/// services, each borrowing the shared store, identity provider and page
/// cache for the duration of a request.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: AppConfig,
    store: Arc<dyn RecordStore>,
    identity: Arc<dyn IdentityProvider>,
    cache: PageCache,
}

impl AppState {
    /// Create a new application state.
    ///
    /// The page cache lifetime comes from `config.page_cache_ttl`.
    #[must_use]
    pub fn new(
        config: AppConfig,
        store: Arc<dyn RecordStore>,
        identity: Arc<dyn IdentityProvider>,
    ) -> Self {
        let cache = PageCache::new(config.page_cache_ttl);
        Self {
            inner: Arc::new(AppStateInner {
                config,
                store,
                identity,
                cache,
            }),
        }
    }

    #[must_use]
    pub fn config(&self) -> &AppConfig {
        &self.inner.config
    }

    #[must_use]
    pub fn store(&self) -> &dyn RecordStore {
        self.inner.store.as_ref()
    }

    #[must_use]
    pub fn cache(&self) -> &PageCache {
        &self.inner.cache
    }

    /// Generic CRUD actions for one resource.
    #[must_use]
    pub fn resources<E: Entity>(&self) -> ResourceActions<'_, E> {
        ResourceActions::new(self.store(), self.cache())
    }

    #[must_use]
    pub fn users(&self) -> UserActions<'_> {
        UserActions::new(self.store(), self.inner.identity.as_ref(), self.cache())
    }

    #[must_use]
    pub fn redirects(&self) -> RedirectActions<'_> {
        RedirectActions::new(self.store())
    }

    #[must_use]
    pub fn settings(&self) -> SettingsActions<'_> {
        SettingsActions::new(self.store(), self.cache())
    }
}
