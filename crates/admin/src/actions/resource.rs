//! Generic lifecycle actions for admin-managed resources.

use std::marker::PhantomData;

use chrono::Utc;
use serde_json::Value;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use super::{ActionError, BulkOutcome, PageCache, decode};
use crate::db::{RecordStore, ResourceStats, Row};
use crate::models::{Entity, ValidationError};

/// CRUD, toggle and soft-delete actions for one entity type.
pub struct ResourceActions<'a, E> {
    store: &'a dyn RecordStore,
    cache: &'a PageCache,
    entity: PhantomData<fn() -> E>,
}

impl<'a, E: Entity> ResourceActions<'a, E> {
    #[must_use]
    pub const fn new(store: &'a dyn RecordStore, cache: &'a PageCache) -> Self {
        Self {
            store,
            cache,
            entity: PhantomData,
        }
    }

    /// Records in the table's order; trash included on request.
    ///
    /// # Errors
    ///
    /// Returns `ActionError::Store` if the store fails or a row is corrupt.
    pub async fn list(&self, include_deleted: bool) -> Result<Vec<E>, ActionError> {
        self.store
            .list(E::TABLE, include_deleted)
            .await?
            .into_iter()
            .map(decode)
            .collect()
    }

    /// Live records that are switched on, in the table's order.
    ///
    /// # Errors
    ///
    /// Returns `ActionError::Store` if the store fails or a row is corrupt.
    pub async fn list_active(&self) -> Result<Vec<E>, ActionError> {
        let mut records = self.list(false).await?;
        records.retain(E::is_active);
        Ok(records)
    }

    /// The live record whose `column` equals `value`, if any.
    ///
    /// # Errors
    ///
    /// Returns `ActionError::Store` if the store fails or the row is corrupt.
    pub async fn find_live_by(
        &self,
        column: &str,
        value: &Value,
    ) -> Result<Option<E>, ActionError> {
        self.store
            .find_live_by(E::TABLE, column, value)
            .await?
            .map(decode)
            .transpose()
    }

    /// Row counts by lifecycle state.
    ///
    /// # Errors
    ///
    /// Returns `ActionError::Store` if the store fails.
    pub async fn stats(&self) -> Result<ResourceStats, ActionError> {
        Ok(self.store.stats(E::TABLE).await?)
    }

    /// Fetch a record, live or in the trash.
    ///
    /// # Errors
    ///
    /// Returns `ActionError::NotFound` if no row has this id.
    pub async fn get(&self, id: Uuid) -> Result<E, ActionError> {
        let row = self
            .store
            .get(E::TABLE, id)
            .await?
            .ok_or_else(|| ActionError::not_found(E::RESOURCE, id))?;
        decode(row)
    }

    /// Validate and insert a new record.
    ///
    /// # Errors
    ///
    /// Returns `ActionError::Validation` for bad input, `ActionError::Conflict`
    /// when a unique field is taken.
    #[instrument(skip(self, input), fields(resource = E::RESOURCE))]
    pub async fn create(&self, input: E::Input) -> Result<E, ActionError> {
        let fields = E::validate_input(input)?;
        self.insert_row(fields).await
    }

    /// Insert already-validated business columns with fresh system columns.
    pub(crate) async fn insert_row(&self, fields: Row) -> Result<E, ActionError> {
        self.insert_with_id(Uuid::new_v4(), fields).await
    }

    pub(crate) async fn insert_with_id(&self, id: Uuid, fields: Row) -> Result<E, ActionError> {
        let now = Value::String(Utc::now().to_rfc3339());
        let mut row = fields;
        row.insert("id".to_owned(), Value::String(id.to_string()));
        row.insert("created_at".to_owned(), now.clone());
        row.insert("updated_at".to_owned(), now);
        row.insert("deleted_at".to_owned(), Value::Null);

        let candidate: E = decode(row.clone())?;
        candidate.validate_record()?;

        let record: E = decode(self.store.insert(E::TABLE, row).await?)?;
        info!(resource = E::RESOURCE, id = %id, "Record created");
        self.after_write(&record).await;
        Ok(record)
    }

    /// Apply a validated patch to a live record.
    ///
    /// # Errors
    ///
    /// Returns `ActionError::Validation` for an empty or bad patch,
    /// `ActionError::NotFound` if no live record has this id.
    #[instrument(skip(self, patch), fields(resource = E::RESOURCE))]
    pub async fn update(&self, id: Uuid, patch: E::Patch) -> Result<E, ActionError> {
        let fields = E::validate_patch(patch)?;
        self.apply(id, fields).await
    }

    /// Flip one of the entity's boolean toggles.
    ///
    /// # Errors
    ///
    /// Returns `ActionError::Validation` if `field` is not a toggle,
    /// `ActionError::NotFound` if no live record has this id.
    #[instrument(skip(self), fields(resource = E::RESOURCE))]
    pub async fn toggle(&self, id: Uuid, field: &str, value: bool) -> Result<E, ActionError> {
        if !E::TOGGLES.contains(&field) {
            return Err(ValidationError::new(
                "field",
                format!("{field} cannot be toggled on {}", E::RESOURCE),
            )
            .into());
        }
        let mut fields = Row::new();
        fields.insert(field.to_owned(), Value::Bool(value));
        self.apply(id, fields).await
    }

    /// Merge `fields` into the live record, check it, and write it.
    pub(crate) async fn apply(&self, id: Uuid, fields: Row) -> Result<E, ActionError> {
        let current = self
            .store
            .get(E::TABLE, id)
            .await?
            .filter(|row| row.get("deleted_at").is_none_or(Value::is_null))
            .ok_or_else(|| ActionError::not_found(E::RESOURCE, id))?;

        let mut merged = current;
        merged.extend(fields.clone());
        let candidate: E = decode(merged)?;
        candidate.validate_record()?;

        let row = self
            .store
            .update(E::TABLE, id, fields)
            .await?
            .ok_or_else(|| ActionError::not_found(E::RESOURCE, id))?;
        let record: E = decode(row)?;
        self.after_write(&record).await;
        Ok(record)
    }

    /// Move a record to the trash, keeping an existing marker.
    ///
    /// # Errors
    ///
    /// Returns `ActionError::NotFound` if no row has this id.
    #[instrument(skip(self), fields(resource = E::RESOURCE))]
    pub async fn soft_delete(&self, id: Uuid) -> Result<(), ActionError> {
        self.store
            .set_deleted(E::TABLE, id, Some(Utc::now()))
            .await?
            .ok_or_else(|| ActionError::not_found(E::RESOURCE, id))?;
        info!(resource = E::RESOURCE, id = %id, "Record moved to trash");
        self.cache.invalidate(E::INVALIDATES).await;
        Ok(())
    }

    /// Take a record out of the trash.
    ///
    /// # Errors
    ///
    /// Returns `ActionError::NotFound` if no row has this id.
    #[instrument(skip(self), fields(resource = E::RESOURCE))]
    pub async fn restore(&self, id: Uuid) -> Result<(), ActionError> {
        self.store
            .set_deleted(E::TABLE, id, None)
            .await?
            .ok_or_else(|| ActionError::not_found(E::RESOURCE, id))?;
        info!(resource = E::RESOURCE, id = %id, "Record restored");
        self.cache.invalidate(E::INVALIDATES).await;
        Ok(())
    }

    /// Remove a record for good.
    ///
    /// # Errors
    ///
    /// Returns `ActionError::NotFound` if no row has this id.
    #[instrument(skip(self), fields(resource = E::RESOURCE))]
    pub async fn permanent_delete(&self, id: Uuid) -> Result<(), ActionError> {
        if !self.store.purge(E::TABLE, id).await? {
            return Err(ActionError::not_found(E::RESOURCE, id));
        }
        info!(resource = E::RESOURCE, id = %id, "Record permanently deleted");
        self.cache.invalidate(E::INVALIDATES).await;
        Ok(())
    }

    /// Delete every id independently, in order.
    pub async fn bulk_delete(&self, ids: &[Uuid], permanent: bool) -> BulkOutcome {
        let mut outcome = BulkOutcome::default();
        for &id in ids {
            let result = if permanent {
                self.permanent_delete(id).await
            } else {
                self.soft_delete(id).await
            };
            outcome.record(id, result);
        }
        if !outcome.is_complete() {
            warn!(
                resource = E::RESOURCE,
                failed = outcome.failed.len(),
                processed = outcome.processed(),
                "Bulk delete partially failed"
            );
        }
        outcome
    }

    async fn after_write(&self, record: &E) {
        if let Some(path) = record.resolves_not_found() {
            if let Err(e) = self.store.delete_not_found(path).await {
                warn!(path, error = %e, "Failed to clear 404 log entry");
            }
        }
        self.cache.invalidate(E::INVALIDATES).await;
    }
}
