//! Promotional popups shown on the public site.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use formdetoit_core::{Permission, PopupId};

use super::validate::{
    Fields, ValidationError, double_option, optional_text, optional_url, required_text,
};
use super::Entity;
use crate::db::{Row, SortDirection, TableSpec};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Popup {
    pub id: PopupId,
    pub title: String,
    pub content: String,
    pub cta_label: Option<String>,
    pub cta_url: Option<String>,
    pub starts_at: Option<DateTime<Utc>>,
    pub ends_at: Option<DateTime<Utc>>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Popup {
    /// Whether the popup should be shown at `now`.
    #[must_use]
    pub fn is_showing(&self, now: DateTime<Utc>) -> bool {
        self.is_active
            && self.deleted_at.is_none()
            && self.starts_at.is_none_or(|start| start <= now)
            && self.ends_at.is_none_or(|end| now < end)
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PopupInput {
    pub title: String,
    pub content: String,
    #[serde(default)]
    pub cta_label: Option<String>,
    #[serde(default)]
    pub cta_url: Option<String>,
    #[serde(default)]
    pub starts_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub ends_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub is_active: bool,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PopupPatch {
    pub title: Option<String>,
    pub content: Option<String>,
    pub cta_label: Option<String>,
    pub cta_url: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub starts_at: Option<Option<DateTime<Utc>>>,
    #[serde(default, deserialize_with = "double_option")]
    pub ends_at: Option<Option<DateTime<Utc>>>,
    pub is_active: Option<bool>,
}

fn check_window(
    starts_at: Option<DateTime<Utc>>,
    ends_at: Option<DateTime<Utc>>,
) -> Result<(), ValidationError> {
    match (starts_at, ends_at) {
        (Some(start), Some(end)) if end <= start => {
            Err(ValidationError::new("ends_at", "must be after starts_at"))
        }
        _ => Ok(()),
    }
}

impl Entity for Popup {
    type Input = PopupInput;
    type Patch = PopupPatch;

    const TABLE: &'static TableSpec = &TableSpec {
        name: "popups",
        columns: &[
            "title",
            "content",
            "cta_label",
            "cta_url",
            "starts_at",
            "ends_at",
            "is_active",
        ],
        unique: &[],
        order_by: &[("created_at", SortDirection::Desc)],
        active_flag: Some("is_active"),
    };
    const RESOURCE: &'static str = "popups";
    const LABEL: &'static str = "Popups";
    const PERMISSION: Permission = Permission::ManageContent;
    const TOGGLES: &'static [&'static str] = &["is_active"];

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
        self.title.clone()
    }

    fn is_active(&self) -> bool {
        self.is_active
    }

    fn validate_record(&self) -> Result<(), ValidationError> {
        check_window(self.starts_at, self.ends_at)
    }

    fn validate_input(input: Self::Input) -> Result<Row, ValidationError> {
        check_window(input.starts_at, input.ends_at)?;
        Ok(Fields::new()
            .set("title", required_text("title", &input.title, 120)?)
            .set("content", required_text("content", &input.content, 5_000)?)
            .set("cta_label", optional_text("cta_label", input.cta_label, 60)?)
            .set("cta_url", optional_url("cta_url", input.cta_url)?)
            .set_time("starts_at", input.starts_at)
            .set_time("ends_at", input.ends_at)
            .set("is_active", input.is_active)
            .into_row())
    }

    fn validate_patch(patch: Self::Patch) -> Result<Row, ValidationError> {
        check_window(patch.starts_at.flatten(), patch.ends_at.flatten())?;
        let title = patch
            .title
            .map(|v| required_text("title", &v, 120))
            .transpose()?;
        let content = patch
            .content
            .map(|v| required_text("content", &v, 5_000))
            .transpose()?;
        let mut fields = Fields::new()
            .maybe("title", title)
            .maybe("content", content)
            .maybe("is_active", patch.is_active);
        if patch.cta_label.is_some() {
            fields = fields.set("cta_label", optional_text("cta_label", patch.cta_label, 60)?);
        }
        if patch.cta_url.is_some() {
            fields = fields.set("cta_url", optional_url("cta_url", patch.cta_url)?);
        }
        if let Some(starts_at) = patch.starts_at {
            fields = fields.set_time("starts_at", starts_at);
        }
        if let Some(ends_at) = patch.ends_at {
            fields = fields.set_time("ends_at", ends_at);
        }
        fields.into_patch()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::Duration;
    use serde_json::json;

    use super::*;

    fn popup(starts_at: Option<DateTime<Utc>>, ends_at: Option<DateTime<Utc>>) -> Popup {
        let now = Utc::now();
        Popup {
            id: PopupId::generate(),
            title: "Promo".into(),
            content: "-10% sur les démoussages".into(),
            cta_label: None,
            cta_url: None,
            starts_at,
            ends_at,
            is_active: true,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        }
    }

    #[test]
    fn test_window_must_be_ordered() {
        let input: PopupInput = serde_json::from_value(json!({
            "title": "Promo",
            "content": "Texte",
            "starts_at": "2026-05-01T00:00:00Z",
            "ends_at": "2026-04-01T00:00:00Z"
        }))
        .unwrap();
        assert_eq!(Popup::validate_input(input).unwrap_err().field, "ends_at");
    }

    #[test]
    fn test_patch_null_clears_schedule() {
        let patch: PopupPatch = serde_json::from_value(json!({"ends_at": null})).unwrap();
        let row = Popup::validate_patch(patch).unwrap();
        assert_eq!(row["ends_at"], json!(null));
        assert!(!row.contains_key("starts_at"));
    }

    #[test]
    fn test_is_showing_respects_window() {
        let now = Utc::now();
        assert!(popup(None, None).is_showing(now));
        assert!(popup(Some(now - Duration::days(1)), Some(now + Duration::days(1))).is_showing(now));
        assert!(!popup(Some(now + Duration::hours(1)), None).is_showing(now));
        assert!(!popup(None, Some(now)).is_showing(now));
    }
}
