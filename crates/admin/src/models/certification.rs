//! Certifications and quality labels held by the company.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use formdetoit_core::{CertificationId, Permission};

use super::validate::{Fields, ValidationError, optional_text, optional_url, required_text, sort_order};
use super::{Entity, Invalidation};
use crate::db::{Row, SortDirection, TableSpec};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Certification {
    pub id: CertificationId,
    pub name: String,
    pub issuer: Option<String>,
    pub logo_url: Option<String>,
    pub link_url: Option<String>,
    pub sort_order: i32,
    pub is_published: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CertificationInput {
    pub name: String,
    #[serde(default)]
    pub issuer: Option<String>,
    #[serde(default)]
    pub logo_url: Option<String>,
    #[serde(default)]
    pub link_url: Option<String>,
    #[serde(default)]
    pub sort_order: i32,
    #[serde(default)]
    pub is_published: bool,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CertificationPatch {
    pub name: Option<String>,
    pub issuer: Option<String>,
    pub logo_url: Option<String>,
    pub link_url: Option<String>,
    pub sort_order: Option<i32>,
    pub is_published: Option<bool>,
}

impl Entity for Certification {
    type Input = CertificationInput;
    type Patch = CertificationPatch;

    const TABLE: &'static TableSpec = &TableSpec {
        name: "certifications",
        columns: &[
            "name",
            "issuer",
            "logo_url",
            "link_url",
            "sort_order",
            "is_published",
        ],
        unique: &[],
        order_by: &[
            ("sort_order", SortDirection::Asc),
            ("name", SortDirection::Asc),
        ],
        active_flag: Some("is_published"),
    };
    const RESOURCE: &'static str = "certifications";
    const LABEL: &'static str = "Certifications";
    const PERMISSION: Permission = Permission::ManageContent;
    const TOGGLES: &'static [&'static str] = &["is_published"];
    // Logos appear in the footer of every public page.
    const INVALIDATES: Invalidation = Invalidation::Everything;

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
        match &self.issuer {
            Some(issuer) => format!("{} ({issuer})", self.name),
            None => self.name.clone(),
        }
    }

    fn is_active(&self) -> bool {
        self.is_published
    }

    fn validate_input(input: Self::Input) -> Result<Row, ValidationError> {
        Ok(Fields::new()
            .set("name", required_text("name", &input.name, 120)?)
            .set("issuer", optional_text("issuer", input.issuer, 120)?)
            .set("logo_url", optional_url("logo_url", input.logo_url)?)
            .set("link_url", optional_url("link_url", input.link_url)?)
            .set("sort_order", sort_order(input.sort_order)?)
            .set("is_published", input.is_published)
            .into_row())
    }

    fn validate_patch(patch: Self::Patch) -> Result<Row, ValidationError> {
        let name = patch
            .name
            .map(|v| required_text("name", &v, 120))
            .transpose()?;
        let mut fields = Fields::new()
            .maybe("name", name)
            .maybe("sort_order", patch.sort_order.map(sort_order).transpose()?)
            .maybe("is_published", patch.is_published);
        if patch.issuer.is_some() {
            fields = fields.set("issuer", optional_text("issuer", patch.issuer, 120)?);
        }
        if patch.logo_url.is_some() {
            fields = fields.set("logo_url", optional_url("logo_url", patch.logo_url)?);
        }
        if patch.link_url.is_some() {
            fields = fields.set("link_url", optional_url("link_url", patch.link_url)?);
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
    fn test_new_certifications_start_unpublished() {
        let input: CertificationInput =
            serde_json::from_value(json!({"name": "Qualibat RGE", "issuer": "Qualibat"})).unwrap();
        let row = Certification::validate_input(input).unwrap();
        assert_eq!(row["is_published"], json!(false));
        assert_eq!(row["logo_url"], json!(null));
    }

    #[test]
    fn test_invalid_link_is_rejected() {
        let patch = CertificationPatch {
            link_url: Some("qualibat.com".into()),
            ..CertificationPatch::default()
        };
        assert_eq!(
            Certification::validate_patch(patch).unwrap_err().field,
            "link_url"
        );
    }
}
