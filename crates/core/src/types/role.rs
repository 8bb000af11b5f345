//! Back-office roles and the permissions they grant.
//!
//! Roles form a fixed enumeration. A user holds a *set* of roles, and the
//! union of their permissions decides what the user may manage.

use serde::{Deserialize, Serialize};

/// A role label that can be assigned to a back-office user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoleLabel {
    /// Full access, including user accounts.
    SuperAdmin,
    /// Everything except user accounts.
    Admin,
    /// Site content: team, pages, lexicon, certifications, categories, popups.
    Editor,
    /// Job openings.
    Recruiter,
    /// Redirects and 404 tracking.
    Seo,
}

/// A capability checked by admin routes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Permission {
    /// Create, edit, delete users and assign roles.
    ManageUsers,
    /// Toggle maintenance mode and other site-wide settings.
    ManageSettings,
    /// Manage editorial content.
    ManageContent,
    /// Manage job openings.
    ManageJobs,
    /// Manage redirects and review 404 logs.
    ManageSeo,
}

impl RoleLabel {
    /// Every role, in display order.
    pub const ALL: [Self; 5] = [
        Self::SuperAdmin,
        Self::Admin,
        Self::Editor,
        Self::Recruiter,
        Self::Seo,
    ];

    /// The wire/database label of this role.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::SuperAdmin => "super_admin",
            Self::Admin => "admin",
            Self::Editor => "editor",
            Self::Recruiter => "recruiter",
            Self::Seo => "seo",
        }
    }

    /// Whether this role grants the given permission.
    #[must_use]
    pub const fn grants(&self, permission: Permission) -> bool {
        match self {
            Self::SuperAdmin => true,
            Self::Admin => !matches!(permission, Permission::ManageUsers),
            Self::Editor => matches!(permission, Permission::ManageContent),
            Self::Recruiter => matches!(permission, Permission::ManageJobs),
            Self::Seo => matches!(permission, Permission::ManageSeo),
        }
    }
}

impl std::fmt::Display for RoleLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for RoleLabel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|role| role.as_str() == s)
            .ok_or_else(|| format!("invalid role: {s}"))
    }
}

/// Sanitize raw role labels against the fixed enumeration.
///
/// Unknown labels are dropped, surrounding whitespace and case are ignored,
/// duplicates collapse, and the result is sorted in [`RoleLabel::ALL`] order.
/// The result may be empty; whether an empty set is acceptable is up to the
/// caller.
#[must_use]
pub fn sanitize_roles<S: AsRef<str>>(raw: &[S]) -> Vec<RoleLabel> {
    let mut roles: Vec<RoleLabel> = raw
        .iter()
        .filter_map(|label| label.as_ref().trim().to_ascii_lowercase().parse().ok())
        .collect();
    roles.sort_unstable();
    roles.dedup();
    roles
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_labels_round_trip() {
        for role in RoleLabel::ALL {
            assert_eq!(role.as_str().parse::<RoleLabel>(), Ok(role));
        }
        assert!("owner".parse::<RoleLabel>().is_err());
    }

    #[test]
    fn test_super_admin_grants_everything() {
        for permission in [
            Permission::ManageUsers,
            Permission::ManageSettings,
            Permission::ManageContent,
            Permission::ManageJobs,
            Permission::ManageSeo,
        ] {
            assert!(RoleLabel::SuperAdmin.grants(permission));
        }
    }

    #[test]
    fn test_admin_cannot_manage_users() {
        assert!(!RoleLabel::Admin.grants(Permission::ManageUsers));
        assert!(RoleLabel::Admin.grants(Permission::ManageSettings));
    }

    #[test]
    fn test_narrow_roles() {
        assert!(RoleLabel::Recruiter.grants(Permission::ManageJobs));
        assert!(!RoleLabel::Recruiter.grants(Permission::ManageContent));
        assert!(RoleLabel::Seo.grants(Permission::ManageSeo));
        assert!(!RoleLabel::Editor.grants(Permission::ManageSeo));
    }

    #[test]
    fn test_sanitize_drops_unknown_and_duplicates() {
        let roles = sanitize_roles(&["seo", "invalid-label", " Editor ", "seo"]);
        assert_eq!(roles, vec![RoleLabel::Editor, RoleLabel::Seo]);
    }

    #[test]
    fn test_sanitize_can_be_empty() {
        assert!(sanitize_roles::<&str>(&[]).is_empty());
        assert!(sanitize_roles(&["invalid-label"]).is_empty());
    }

    #[test]
    fn test_serde_uses_snake_case() {
        let json = serde_json::to_string(&RoleLabel::SuperAdmin).unwrap_or_default();
        assert_eq!(json, "\"super_admin\"");
    }
}
