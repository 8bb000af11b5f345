//! Business operations behind the admin API and pages.
//!
//! # Actions
//!
//! - `resource` - generic CRUD, toggle and soft-delete lifecycle per entity
//! - `users` - accounts, role assignment, identity-aware deletion
//! - `redirects` - redirect resolution and 404 tracking
//! - `settings` - maintenance mode
//! - `cache` - rendered public page cache
//! - `identity` - auth platform seam
//!
//! Every action is a single pass over the store with no retry; a failed
//! call is reported to the caller as an [`ActionError`].

pub mod cache;
pub mod identity;
pub mod redirects;
pub mod resource;
pub mod settings;
pub mod users;

pub use cache::PageCache;
pub use identity::{
    Identity, IdentityError, IdentityProvider, MemoryIdentityProvider, SupabaseAuth,
};
pub use redirects::{NotFoundEntry, NotFoundStats, RedirectActions, is_internal_path};
pub use resource::ResourceActions;
pub use settings::{MaintenanceMode, SettingsActions};
pub use users::UserActions;

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;
use uuid::Uuid;

use crate::db::{Row, StoreError};
use crate::models::ValidationError;

/// Errors returned by actions.
#[derive(Debug, Error)]
pub enum ActionError {
    /// Malformed or inconsistent input.
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),

    /// The target does not exist (or is not in the required state).
    #[error("{resource} not found: {key}")]
    NotFound { resource: &'static str, key: String },

    /// A unique field is already taken.
    #[error("conflict: {0}")]
    Conflict(String),

    /// Persistence fault.
    #[error("store error: {0}")]
    Store(StoreError),

    /// Auth platform fault.
    #[error("identity provider error: {0}")]
    Identity(#[from] IdentityError),
}

impl From<StoreError> for ActionError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Conflict(message) => Self::Conflict(message),
            other => Self::Store(other),
        }
    }
}

impl ActionError {
    pub(crate) fn not_found(resource: &'static str, id: Uuid) -> Self {
        Self::NotFound {
            resource,
            key: id.to_string(),
        }
    }

    /// Message safe to show to clients. Store and platform faults stay
    /// generic; their details only go to the logs.
    #[must_use]
    pub fn public_message(&self) -> String {
        match self {
            Self::Validation(e) => e.to_string(),
            Self::Identity(IdentityError::AlreadyExists) => {
                "an account with this email already exists".to_owned()
            }
            Self::Identity(_) => "authentication service error".to_owned(),
            Self::Store(_) => "internal error".to_owned(),
            other => other.to_string(),
        }
    }
}

/// Decode a stored row into its typed model.
pub(crate) fn decode<T: DeserializeOwned>(row: Row) -> Result<T, ActionError> {
    serde_json::from_value(Value::Object(row))
        .map_err(|e| ActionError::Store(StoreError::DataCorruption(e.to_string())))
}

/// A per-id failure in a bulk operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BulkFailure {
    pub id: Uuid,
    pub error: String,
}

/// Result of a best-effort bulk operation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BulkOutcome {
    pub succeeded: Vec<Uuid>,
    pub failed: Vec<BulkFailure>,
}

impl BulkOutcome {
    pub(crate) fn record(&mut self, id: Uuid, result: Result<(), ActionError>) {
        match result {
            Ok(()) => self.succeeded.push(id),
            Err(e) => self.failed.push(BulkFailure {
                id,
                error: e.public_message(),
            }),
        }
    }

    /// Number of ids that succeeded.
    #[must_use]
    pub fn processed(&self) -> usize {
        self.succeeded.len()
    }

    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

#[cfg(test)]
#[allow(clippy::indexing_slicing)]
mod tests {
    use super::*;

    #[test]
    fn test_store_conflict_becomes_action_conflict() {
        let err = ActionError::from(StoreError::Conflict("pages_slug_key".into()));
        assert!(matches!(err, ActionError::Conflict(_)));
        let err = ActionError::from(StoreError::Unavailable("down".into()));
        assert!(matches!(err, ActionError::Store(_)));
    }

    #[test]
    fn test_bulk_outcome_records_each_id() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let mut outcome = BulkOutcome::default();
        outcome.record(a, Ok(()));
        outcome.record(b, Err(ActionError::not_found("pages", b)));
        assert_eq!(outcome.processed(), 1);
        assert!(!outcome.is_complete());
        assert_eq!(outcome.failed[0].id, b);
    }
}
