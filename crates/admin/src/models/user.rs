//! Back-office user accounts.
//!
//! A user's `id` is the id of its identity on the auth platform; the row
//! here carries the profile and the role set.

use chrono::{DateTime, Utc};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use formdetoit_core::{Email, Permission, RoleLabel, UserId, sanitize_roles};

use super::validate::{Fields, ValidationError, required_text};
use super::{CurrentAdmin, Entity};
use crate::db::{Row, SortDirection, TableSpec};

pub const PASSWORD_MIN_LENGTH: usize = 8;
const NAME_MAX: usize = 120;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub email: String,
    pub full_name: String,
    pub roles: Vec<RoleLabel>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl User {
    #[must_use]
    pub fn is_super_admin(&self) -> bool {
        self.roles.contains(&RoleLabel::SuperAdmin)
    }
}

impl From<User> for CurrentAdmin {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            email: user.email,
            name: user.full_name,
            roles: user.roles,
        }
    }
}

/// Request to create an account.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UserInput {
    pub email: String,
    pub full_name: String,
    pub password: String,
    pub roles: Vec<String>,
}

/// A validated account request.
#[derive(Debug)]
pub struct NewUser {
    pub email: Email,
    pub full_name: String,
    pub password: SecretString,
    pub roles: Vec<RoleLabel>,
}

impl NewUser {
    /// Profile columns for the row created once the identity exists.
    #[must_use]
    pub fn row(&self) -> Row {
        Fields::new()
            .set("email", self.email.as_str())
            .set("full_name", self.full_name.as_str())
            .set("roles", roles_value(&self.roles))
            .into_row()
    }
}

impl UserInput {
    /// # Errors
    ///
    /// Returns `ValidationError` for the first invalid field.
    pub fn validate(self) -> Result<NewUser, ValidationError> {
        let email =
            Email::parse(&self.email).map_err(|e| ValidationError::new("email", e.to_string()))?;
        let full_name = required_text("full_name", &self.full_name, NAME_MAX)?;
        if self.password.chars().count() < PASSWORD_MIN_LENGTH {
            return Err(ValidationError::new(
                "password",
                format!("must be at least {PASSWORD_MIN_LENGTH} characters"),
            ));
        }
        let roles = validate_roles(&self.roles)?;
        Ok(NewUser {
            email,
            full_name,
            password: SecretString::from(self.password),
            roles,
        })
    }
}

/// Profile for an identity that already exists on the auth platform.
#[derive(Debug, Clone)]
pub struct AccountGrant {
    pub email: String,
    pub full_name: String,
    pub roles: Vec<String>,
}

impl AccountGrant {
    /// Check the profile and return the business columns of the row.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError` for a bad email, an empty name or no role.
    pub fn validate(self) -> Result<Row, ValidationError> {
        let email =
            Email::parse(&self.email).map_err(|e| ValidationError::new("email", e.to_string()))?;
        let full_name = required_text("full_name", &self.full_name, NAME_MAX)?;
        let roles = validate_roles(&self.roles)?;
        Ok(Fields::new()
            .set("email", email.as_str())
            .set("full_name", full_name)
            .set("roles", roles_value(&roles))
            .into_row())
    }
}

/// Profile changes; roles go through the dedicated role endpoint.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UserPatch {
    pub full_name: Option<String>,
}

/// Sanitize requested role labels, rejecting an empty result.
///
/// # Errors
///
/// Returns `ValidationError` when no known role remains.
pub fn validate_roles<S: AsRef<str>>(raw: &[S]) -> Result<Vec<RoleLabel>, ValidationError> {
    let roles = sanitize_roles(raw);
    if roles.is_empty() {
        return Err(ValidationError::new(
            "roles",
            "at least one valid role is required",
        ));
    }
    Ok(roles)
}

/// JSON form of a role set as stored in the `roles` column.
#[must_use]
pub fn roles_value(roles: &[RoleLabel]) -> serde_json::Value {
    roles.iter().map(|r| r.as_str()).collect::<Vec<_>>().into()
}

impl Entity for User {
    type Input = UserInput;
    type Patch = UserPatch;

    const TABLE: &'static TableSpec = &TableSpec {
        name: "users",
        columns: &["email", "full_name", "roles"],
        unique: &["email"],
        order_by: &[("full_name", SortDirection::Asc), ("email", SortDirection::Asc)],
        active_flag: None,
    };
    const RESOURCE: &'static str = "users";
    const LABEL: &'static str = "Utilisateurs";
    const PERMISSION: Permission = Permission::ManageUsers;

    fn id(&self) -> Uuid {
        self.id.as_uuid()
    }

    fn deleted_at(&self) -> Option<DateTime<Utc>> {
        self.deleted_at
    }

    fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    fn display_name(&self) -> String {
        format!("{} <{}>", self.full_name, self.email)
    }

    fn validate_input(input: Self::Input) -> Result<Row, ValidationError> {
        input.validate().map(|user| user.row())
    }

    fn validate_patch(patch: Self::Patch) -> Result<Row, ValidationError> {
        let full_name = patch
            .full_name
            .map(|v| required_text("full_name", &v, NAME_MAX))
            .transpose()?;
        Fields::new().maybe("full_name", full_name).into_patch()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use secrecy::ExposeSecret;
    use serde_json::json;

    use super::*;

    fn input(value: serde_json::Value) -> Result<NewUser, ValidationError> {
        serde_json::from_value::<UserInput>(value).unwrap().validate()
    }

    #[test]
    fn test_valid_account_request() {
        let user = input(json!({
            "email": " Claire@FormDeToit.fr ",
            "full_name": "Claire Martin",
            "password": "ardoise-2024",
            "roles": ["editor", "seo", "editor"]
        }))
        .unwrap();
        assert_eq!(user.email.as_str(), "claire@formdetoit.fr");
        assert_eq!(user.roles, vec![RoleLabel::Editor, RoleLabel::Seo]);
        assert_eq!(user.password.expose_secret(), "ardoise-2024");
        assert_eq!(user.row()["roles"], json!(["editor", "seo"]));
    }

    #[test]
    fn test_short_password_is_rejected() {
        let err = input(json!({
            "email": "a@formdetoit.fr",
            "full_name": "A",
            "password": "tuile",
            "roles": ["editor"]
        }))
        .unwrap_err();
        assert_eq!(err.field, "password");
    }

    #[test]
    fn test_roles_must_not_sanitize_to_nothing() {
        assert!(validate_roles::<&str>(&[]).is_err());
        assert!(validate_roles(&["invalid-label"]).is_err());
        assert_eq!(
            validate_roles(&["SEO", "nope", "admin"]).unwrap(),
            vec![RoleLabel::Admin, RoleLabel::Seo]
        );
    }

    #[test]
    fn test_grant_normalizes_profile() {
        let row = AccountGrant {
            email: "Chef@FormDeToit.fr".into(),
            full_name: " Chef ".into(),
            roles: vec!["super_admin".into(), "bogus".into()],
        }
        .validate()
        .unwrap();
        assert_eq!(row["email"], json!("chef@formdetoit.fr"));
        assert_eq!(row["roles"], json!(["super_admin"]));

        let err = AccountGrant {
            email: "chef@formdetoit.fr".into(),
            full_name: "Chef".into(),
            roles: vec![],
        }
        .validate()
        .unwrap_err();
        assert_eq!(err.field, "roles");
    }

    #[test]
    fn test_patch_cannot_touch_roles() {
        assert!(serde_json::from_value::<UserPatch>(json!({"roles": ["admin"]})).is_err());
    }
}
