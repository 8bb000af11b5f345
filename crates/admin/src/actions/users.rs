//! Back-office accounts: identities, profiles and roles.
//!
//! Account rows and platform identities share their id. Creation makes the
//! identity first and removes it again if the row cannot be written;
//! permanent deletion removes the identity first, then the row.

use secrecy::SecretString;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use formdetoit_core::{Email, RoleLabel, UserId};

use super::{ActionError, BulkOutcome, IdentityError, IdentityProvider, PageCache, ResourceActions};
use crate::db::{RecordStore, ResourceStats, Row};
use crate::models::user::{AccountGrant, UserInput, UserPatch, roles_value, validate_roles};
use crate::models::{CurrentAdmin, Entity as _, User, ValidationError};

/// Account management actions.
pub struct UserActions<'a> {
    records: ResourceActions<'a, User>,
    identity: &'a dyn IdentityProvider,
}

impl<'a> UserActions<'a> {
    #[must_use]
    pub const fn new(
        store: &'a dyn RecordStore,
        identity: &'a dyn IdentityProvider,
        cache: &'a PageCache,
    ) -> Self {
        Self {
            records: ResourceActions::new(store, cache),
            identity,
        }
    }

    /// # Errors
    ///
    /// Returns `ActionError::Store` if the store fails.
    pub async fn list(&self, include_deleted: bool) -> Result<Vec<User>, ActionError> {
        self.records.list(include_deleted).await
    }

    /// # Errors
    ///
    /// Returns `ActionError::Store` if the store fails.
    pub async fn stats(&self) -> Result<ResourceStats, ActionError> {
        self.records.stats().await
    }

    /// # Errors
    ///
    /// Returns `ActionError::NotFound` if no account has this id.
    pub async fn get(&self, id: Uuid) -> Result<User, ActionError> {
        self.records.get(id).await
    }

    /// Check credentials and load the live account behind them.
    ///
    /// # Errors
    ///
    /// Returns `ActionError::Identity(InvalidCredentials)` for a bad pair or an
    /// account that is missing or in the trash.
    #[instrument(skip(self, password))]
    pub async fn sign_in(
        &self,
        email: &str,
        password: &SecretString,
    ) -> Result<CurrentAdmin, ActionError> {
        let email = Email::parse(email).map_err(|_| IdentityError::InvalidCredentials)?;
        let identity = self.identity.sign_in(email.as_str(), password).await?;

        let user = match self.records.get(identity.id).await {
            Ok(user) if !user.is_deleted() => user,
            Ok(_) | Err(ActionError::NotFound { .. }) => {
                warn!(id = %identity.id, "Sign-in for an identity without a live account");
                return Err(IdentityError::InvalidCredentials.into());
            }
            Err(e) => return Err(e),
        };

        Ok(user.into())
    }

    /// Create the identity and the account row.
    ///
    /// # Errors
    ///
    /// Returns `ActionError::Validation` for bad input, `ActionError::Conflict`
    /// when the email is taken, `ActionError::Identity` on platform faults.
    #[instrument(skip(self, input))]
    pub async fn create(&self, input: UserInput) -> Result<User, ActionError> {
        let new_user = input.validate()?;
        let identity = self
            .identity
            .create_identity(new_user.email.as_str(), &new_user.password)
            .await
            .map_err(|e| match e {
                IdentityError::AlreadyExists => ActionError::Conflict(format!(
                    "an account already exists for {}",
                    new_user.email
                )),
                other => other.into(),
            })?;

        match self.records.insert_with_id(identity.id, new_user.row()).await {
            Ok(user) => {
                info!(id = %user.id, "Account created");
                Ok(user)
            }
            Err(e) => {
                if let Err(cleanup) = self.identity.delete_identity(identity.id).await {
                    error!(
                        id = %identity.id,
                        error = %cleanup,
                        "Failed to remove identity after account insert failed"
                    );
                }
                Err(e)
            }
        }
    }

    /// Attach a profile and roles to an identity created on the platform.
    ///
    /// A row in the trash is restored; an existing row gets the new profile.
    ///
    /// # Errors
    ///
    /// Returns `ActionError::Validation` for a bad profile,
    /// `ActionError::Conflict` when another account holds the email.
    #[instrument(skip(self, grant))]
    pub async fn grant(&self, id: Uuid, grant: AccountGrant) -> Result<User, ActionError> {
        let fields = grant.validate()?;
        match self.records.get(id).await {
            Ok(existing) => {
                if existing.is_deleted() {
                    self.records.restore(id).await?;
                }
                let user = self.records.apply(id, fields).await?;
                info!(id = %id, roles = ?user.roles, "Account granted");
                Ok(user)
            }
            Err(ActionError::NotFound { .. }) => {
                let user = self.records.insert_with_id(id, fields).await?;
                info!(id = %id, roles = ?user.roles, "Account granted");
                Ok(user)
            }
            Err(e) => Err(e),
        }
    }

    /// Change profile fields (the full name).
    ///
    /// # Errors
    ///
    /// Returns `ActionError::Validation` for an empty patch,
    /// `ActionError::NotFound` if no live account has this id.
    pub async fn update_profile(&self, id: Uuid, patch: UserPatch) -> Result<User, ActionError> {
        self.records.update(id, patch).await
    }

    /// Replace the account's role set.
    ///
    /// # Errors
    ///
    /// Returns `ActionError::Validation` when no valid role remains or when
    /// the last super admin would lose the role.
    #[instrument(skip(self, roles))]
    pub async fn update_roles<S: AsRef<str> + Sync>(
        &self,
        actor: UserId,
        id: Uuid,
        roles: &[S],
    ) -> Result<User, ActionError> {
        let roles = validate_roles(roles)?;
        let user = self.live(id).await?;
        if user.is_super_admin() && !roles.contains(&RoleLabel::SuperAdmin) {
            self.ensure_not_last_super_admin(&user).await?;
        }

        let mut fields = Row::new();
        fields.insert("roles".to_owned(), roles_value(&roles));
        let updated = self.records.apply(id, fields).await?;
        info!(actor = %actor, id = %id, roles = ?updated.roles, "Roles updated");
        Ok(updated)
    }

    /// Move an account to the trash; it can no longer sign in.
    ///
    /// # Errors
    ///
    /// Returns `ActionError::Validation` for self-deletion or the last super
    /// admin, `ActionError::NotFound` for an unknown id.
    #[instrument(skip(self))]
    pub async fn soft_delete(&self, actor: UserId, id: Uuid) -> Result<(), ActionError> {
        self.check_deletable(actor, id).await?;
        self.records.soft_delete(id).await
    }

    /// # Errors
    ///
    /// Returns `ActionError::NotFound` for an unknown id.
    pub async fn restore(&self, id: Uuid) -> Result<(), ActionError> {
        self.records.restore(id).await
    }

    /// Remove the identity, then the account row.
    ///
    /// An identity that is already gone does not stop the row removal.
    ///
    /// # Errors
    ///
    /// Returns `ActionError::Validation` for self-deletion or the last super
    /// admin, `ActionError::NotFound` for an unknown id,
    /// `ActionError::Identity` if the platform refuses the deletion.
    #[instrument(skip(self))]
    pub async fn permanent_delete(&self, actor: UserId, id: Uuid) -> Result<(), ActionError> {
        self.check_deletable(actor, id).await?;
        match self.identity.delete_identity(id).await {
            Ok(()) => {}
            Err(IdentityError::NotFound) => {
                warn!(id = %id, "Identity already removed");
            }
            Err(e) => return Err(e.into()),
        }
        self.records.permanent_delete(id).await
    }

    /// Delete every id independently, in order.
    pub async fn bulk_delete(&self, actor: UserId, ids: &[Uuid], permanent: bool) -> BulkOutcome {
        let mut outcome = BulkOutcome::default();
        for &id in ids {
            let result = if permanent {
                self.permanent_delete(actor, id).await
            } else {
                self.soft_delete(actor, id).await
            };
            outcome.record(id, result);
        }
        outcome
    }

    /// Restore every id independently, in order.
    pub async fn bulk_restore(&self, ids: &[Uuid]) -> BulkOutcome {
        let mut outcome = BulkOutcome::default();
        for &id in ids {
            outcome.record(id, self.restore(id).await);
        }
        outcome
    }

    async fn live(&self, id: Uuid) -> Result<User, ActionError> {
        let user = self.records.get(id).await?;
        if user.is_deleted() {
            return Err(ActionError::not_found("users", id));
        }
        Ok(user)
    }

    async fn check_deletable(&self, actor: UserId, id: Uuid) -> Result<(), ActionError> {
        if actor.as_uuid() == id {
            return Err(ValidationError::new("id", "you cannot delete your own account").into());
        }
        let user = self.records.get(id).await?;
        if !user.is_deleted() && user.is_super_admin() {
            self.ensure_not_last_super_admin(&user).await?;
        }
        Ok(())
    }

    async fn ensure_not_last_super_admin(&self, user: &User) -> Result<(), ActionError> {
        let others = self
            .records
            .list(false)
            .await?
            .into_iter()
            .filter(|u| u.id != user.id && u.is_super_admin())
            .count();
        if others == 0 {
            return Err(ValidationError::new(
                "roles",
                "the last super admin cannot be removed",
            )
            .into());
        }
        Ok(())
    }
}
