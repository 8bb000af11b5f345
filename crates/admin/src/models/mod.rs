//! Domain models for the site and back-office.
//!
//! Each admin-managed resource is a typed record implementing [`Entity`],
//! paired with a create input and a patch input that validate into the
//! column set written to the store.

pub mod category;
pub mod certification;
pub mod job_opening;
pub mod lexicon;
pub mod page;
pub mod popup;
pub mod redirect;
pub mod session;
pub mod team_member;
pub mod user;
pub mod validate;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde::de::DeserializeOwned;
use uuid::Uuid;

use formdetoit_core::Permission;

use crate::db::{Row, TableSpec};

pub use category::Category;
pub use certification::Certification;
pub use job_opening::JobOpening;
pub use lexicon::LexiconTerm;
pub use page::Page;
pub use popup::Popup;
pub use redirect::{NotFoundLog, Redirect};
pub use session::{CurrentAdmin, keys as session_keys};
pub use team_member::TeamMember;
pub use user::User;
pub use validate::ValidationError;

/// Public pages whose rendering depends on a resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Invalidation {
    /// Nothing public is rendered from the resource.
    Nothing,
    /// The listed public paths.
    Paths(&'static [&'static str]),
    /// Every cached page (layout-level content or slug-addressed pages).
    Everything,
}

/// A resource managed through the generic CRUD/soft-delete actions.
pub trait Entity: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    /// Validated input for `create`.
    type Input: DeserializeOwned + Send + 'static;
    /// Validated input for `update`; absent fields are left untouched.
    type Patch: DeserializeOwned + Send + 'static;

    /// Backing table.
    const TABLE: &'static TableSpec;
    /// URL segment under `/api/admin/` and `/admin/`.
    const RESOURCE: &'static str;
    /// Human label for admin pages.
    const LABEL: &'static str;
    /// Permission required to read or change the resource.
    const PERMISSION: Permission;
    /// Boolean columns that may be flipped through `toggle`.
    const TOGGLES: &'static [&'static str] = &[];
    /// Public pages to drop from the page cache after a mutation.
    const INVALIDATES: Invalidation = Invalidation::Nothing;

    fn id(&self) -> Uuid;
    fn deleted_at(&self) -> Option<DateTime<Utc>>;
    fn updated_at(&self) -> DateTime<Utc>;

    /// Display name used in admin listings.
    fn display_name(&self) -> String;

    /// Whether the record is switched on (published, visible, active).
    fn is_active(&self) -> bool {
        true
    }

    /// Validate a create input into the business columns to insert.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError` for the first invalid field.
    fn validate_input(input: Self::Input) -> Result<Row, ValidationError>;

    /// Validate a patch into the business columns to update.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError` for the first invalid field.
    fn validate_patch(patch: Self::Patch) -> Result<Row, ValidationError>;

    /// Cross-field checks on a record with a patch applied.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError` when the merged record is inconsistent.
    fn validate_record(&self) -> Result<(), ValidationError> {
        Ok(())
    }

    /// A 404 log path this record now answers, cleared after a write.
    fn resolves_not_found(&self) -> Option<&str> {
        None
    }

    fn is_deleted(&self) -> bool {
        self.deleted_at().is_some()
    }
}
