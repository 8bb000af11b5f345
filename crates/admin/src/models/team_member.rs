//! Team members shown on the public team page.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use formdetoit_core::{Permission, TeamMemberId};

use super::validate::{Fields, ValidationError, optional_text, optional_url, required_text, sort_order};
use super::{Entity, Invalidation};
use crate::db::{Row, SortDirection, TableSpec};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamMember {
    pub id: TeamMemberId,
    pub full_name: String,
    pub job_title: String,
    pub bio: Option<String>,
    pub photo_url: Option<String>,
    pub sort_order: i32,
    pub is_visible: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

const fn visible_by_default() -> bool {
    true
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TeamMemberInput {
    pub full_name: String,
    pub job_title: String,
    #[serde(default)]
    pub bio: Option<String>,
    #[serde(default)]
    pub photo_url: Option<String>,
    #[serde(default)]
    pub sort_order: i32,
    #[serde(default = "visible_by_default")]
    pub is_visible: bool,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TeamMemberPatch {
    pub full_name: Option<String>,
    pub job_title: Option<String>,
    pub bio: Option<String>,
    pub photo_url: Option<String>,
    pub sort_order: Option<i32>,
    pub is_visible: Option<bool>,
}

const NAME_MAX: usize = 120;
const BIO_MAX: usize = 2_000;

impl Entity for TeamMember {
    type Input = TeamMemberInput;
    type Patch = TeamMemberPatch;

    const TABLE: &'static TableSpec = &TableSpec {
        name: "team_members",
        columns: &[
            "full_name",
            "job_title",
            "bio",
            "photo_url",
            "sort_order",
            "is_visible",
        ],
        unique: &[],
        order_by: &[
            ("sort_order", SortDirection::Asc),
            ("full_name", SortDirection::Asc),
        ],
        active_flag: Some("is_visible"),
    };
    const RESOURCE: &'static str = "team-members";
    const LABEL: &'static str = "Équipe";
    const PERMISSION: Permission = Permission::ManageContent;
    const TOGGLES: &'static [&'static str] = &["is_visible"];
    const INVALIDATES: Invalidation = Invalidation::Paths(&["/equipe"]);

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
        format!("{}, {}", self.full_name, self.job_title)
    }

    fn is_active(&self) -> bool {
        self.is_visible
    }

    fn validate_input(input: Self::Input) -> Result<Row, ValidationError> {
        Ok(Fields::new()
            .set("full_name", required_text("full_name", &input.full_name, NAME_MAX)?)
            .set("job_title", required_text("job_title", &input.job_title, NAME_MAX)?)
            .set("bio", optional_text("bio", input.bio, BIO_MAX)?)
            .set("photo_url", optional_url("photo_url", input.photo_url)?)
            .set("sort_order", sort_order(input.sort_order)?)
            .set("is_visible", input.is_visible)
            .into_row())
    }

    fn validate_patch(patch: Self::Patch) -> Result<Row, ValidationError> {
        let full_name = patch
            .full_name
            .map(|v| required_text("full_name", &v, NAME_MAX))
            .transpose()?;
        let job_title = patch
            .job_title
            .map(|v| required_text("job_title", &v, NAME_MAX))
            .transpose()?;
        let mut fields = Fields::new()
            .maybe("full_name", full_name)
            .maybe("job_title", job_title)
            .maybe("sort_order", patch.sort_order.map(sort_order).transpose()?)
            .maybe("is_visible", patch.is_visible);
        if patch.bio.is_some() {
            fields = fields.set("bio", optional_text("bio", patch.bio, BIO_MAX)?);
        }
        if patch.photo_url.is_some() {
            fields = fields.set("photo_url", optional_url("photo_url", patch.photo_url)?);
        }
        fields.into_patch()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_input_defaults_to_visible() {
        let input: TeamMemberInput = serde_json::from_value(
            json!({"full_name": "Marc Durand", "job_title": "Chef d'équipe"}),
        )
        .unwrap();
        let row = TeamMember::validate_input(input).unwrap();
        assert_eq!(row["is_visible"], json!(true));
        assert_eq!(row["sort_order"], json!(0));
    }

    #[test]
    fn test_negative_sort_order_is_rejected() {
        let patch = TeamMemberPatch {
            sort_order: Some(-1),
            ..TeamMemberPatch::default()
        };
        assert_eq!(
            TeamMember::validate_patch(patch).unwrap_err().field,
            "sort_order"
        );
    }

    #[test]
    fn test_photo_must_be_a_web_url() {
        let input: TeamMemberInput = serde_json::from_value(json!({
            "full_name": "Marc Durand",
            "job_title": "Couvreur",
            "photo_url": "file:///etc/passwd"
        }))
        .unwrap();
        assert_eq!(
            TeamMember::validate_input(input).unwrap_err().field,
            "photo_url"
        );
    }
}
