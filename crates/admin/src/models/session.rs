//! Session-stored identity of the signed-in back-office user.

use serde::{Deserialize, Serialize};

use formdetoit_core::{Permission, RoleLabel, UserId};

/// Session keys used by the back-office.
pub mod keys {
    /// The signed-in [`super::CurrentAdmin`].
    pub const CURRENT_ADMIN: &str = "current_admin";
}

/// The signed-in user, as stored in the session at login.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrentAdmin {
    pub id: UserId,
    pub email: String,
    pub name: String,
    pub roles: Vec<RoleLabel>,
}

impl CurrentAdmin {
    /// Whether any of the user's roles grants `permission`.
    #[must_use]
    pub fn has_permission(&self, permission: Permission) -> bool {
        self.roles.iter().any(|role| role.grants(permission))
    }

    #[must_use]
    pub fn is_super_admin(&self) -> bool {
        self.roles.contains(&RoleLabel::SuperAdmin)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn admin(roles: Vec<RoleLabel>) -> CurrentAdmin {
        CurrentAdmin {
            id: UserId::generate(),
            email: "chef@formdetoit.fr".into(),
            name: "Chef".into(),
            roles,
        }
    }

    #[test]
    fn test_permissions_follow_roles() {
        let recruiter = admin(vec![RoleLabel::Recruiter]);
        assert!(recruiter.has_permission(Permission::ManageJobs));
        assert!(!recruiter.has_permission(Permission::ManageContent));

        let both = admin(vec![RoleLabel::Editor, RoleLabel::Seo]);
        assert!(both.has_permission(Permission::ManageContent));
        assert!(both.has_permission(Permission::ManageSeo));
        assert!(!both.has_permission(Permission::ManageUsers));
    }

    #[test]
    fn test_no_roles_grants_nothing() {
        assert!(!admin(vec![]).has_permission(Permission::ManageContent));
    }
}
