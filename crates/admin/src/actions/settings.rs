//! Site-wide settings stored as JSON values.

use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use super::{ActionError, PageCache};
use crate::db::{RecordStore, StoreError};
use crate::models::{Invalidation, ValidationError};

const MAINTENANCE_KEY: &str = "maintenance";
const MESSAGE_MAX: usize = 500;

/// Maintenance mode: while enabled, public pages answer 503.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MaintenanceMode {
    pub enabled: bool,
    #[serde(default)]
    pub message: Option<String>,
}

/// Settings actions.
pub struct SettingsActions<'a> {
    store: &'a dyn RecordStore,
    cache: &'a PageCache,
}

impl<'a> SettingsActions<'a> {
    #[must_use]
    pub const fn new(store: &'a dyn RecordStore, cache: &'a PageCache) -> Self {
        Self { store, cache }
    }

    /// Current maintenance mode; disabled when never set.
    ///
    /// # Errors
    ///
    /// Returns `ActionError::Store` if the store fails or the value is corrupt.
    pub async fn maintenance(&self) -> Result<MaintenanceMode, ActionError> {
        match self.store.get_setting(MAINTENANCE_KEY).await? {
            Some(value) => serde_json::from_value(value)
                .map_err(|e| StoreError::DataCorruption(format!("maintenance setting: {e}")).into()),
            None => Ok(MaintenanceMode::default()),
        }
    }

    /// Switch maintenance mode; drops every cached public page.
    ///
    /// # Errors
    ///
    /// Returns `ActionError::Validation` for an overlong message,
    /// `ActionError::Store` if the store fails.
    #[instrument(skip(self))]
    pub async fn set_maintenance(&self, mode: MaintenanceMode) -> Result<MaintenanceMode, ActionError> {
        let message = mode
            .message
            .map(|m| m.trim().to_owned())
            .filter(|m| !m.is_empty());
        if message.as_ref().is_some_and(|m| m.chars().count() > MESSAGE_MAX) {
            return Err(ValidationError::new(
                "message",
                format!("must be at most {MESSAGE_MAX} characters"),
            )
            .into());
        }
        let mode = MaintenanceMode {
            enabled: mode.enabled,
            message,
        };
        let value = serde_json::to_value(&mode)
            .map_err(|e| StoreError::DataCorruption(format!("maintenance setting: {e}")))?;
        self.store.set_setting(MAINTENANCE_KEY, value).await?;
        self.cache.invalidate(Invalidation::Everything).await;
        info!(enabled = mode.enabled, "Maintenance mode updated");
        Ok(mode)
    }
}
