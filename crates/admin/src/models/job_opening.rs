//! Job openings shown on the public recruitment page.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use formdetoit_core::{JobOpeningId, Permission};

use super::validate::{Fields, ValidationError, optional_text, required_text};
use super::{Entity, Invalidation};
use crate::db::{Row, SortDirection, TableSpec};

/// Employment contract offered by an opening.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContractType {
    #[default]
    Cdi,
    Cdd,
    Interim,
    Apprentissage,
    Stage,
}

impl ContractType {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Cdi => "cdi",
            Self::Cdd => "cdd",
            Self::Interim => "interim",
            Self::Apprentissage => "apprentissage",
            Self::Stage => "stage",
        }
    }

    /// Label shown to candidates.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Cdi => "CDI",
            Self::Cdd => "CDD",
            Self::Interim => "Intérim",
            Self::Apprentissage => "Apprentissage",
            Self::Stage => "Stage",
        }
    }
}

/// A job opening.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobOpening {
    pub id: JobOpeningId,
    pub title: String,
    pub location: Option<String>,
    pub contract_type: ContractType,
    pub description: Option<String>,
    pub is_active: bool,
    pub is_highlighted: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

const fn default_true() -> bool {
    true
}

/// Input for creating a job opening.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct JobOpeningInput {
    pub title: String,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub contract_type: ContractType,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default)]
    pub is_highlighted: bool,
}

/// Partial update of a job opening.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct JobOpeningPatch {
    pub title: Option<String>,
    pub location: Option<String>,
    pub contract_type: Option<ContractType>,
    pub description: Option<String>,
    pub is_active: Option<bool>,
    pub is_highlighted: Option<bool>,
}

const TITLE_MAX: usize = 120;
const LOCATION_MAX: usize = 120;
const DESCRIPTION_MAX: usize = 20_000;

impl Entity for JobOpening {
    type Input = JobOpeningInput;
    type Patch = JobOpeningPatch;

    const TABLE: &'static TableSpec = &TableSpec {
        name: "job_openings",
        columns: &[
            "title",
            "location",
            "contract_type",
            "description",
            "is_active",
            "is_highlighted",
        ],
        unique: &[],
        order_by: &[
            ("is_highlighted", SortDirection::Desc),
            ("created_at", SortDirection::Desc),
        ],
        active_flag: Some("is_active"),
    };
    const RESOURCE: &'static str = "job-openings";
    const LABEL: &'static str = "Offres d'emploi";
    const PERMISSION: Permission = Permission::ManageJobs;
    const TOGGLES: &'static [&'static str] = &["is_active", "is_highlighted"];
    // The home page shows the open position count
    const INVALIDATES: Invalidation = Invalidation::Paths(&["/", "/recrutement"]);

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
        format!("{} ({})", self.title, self.contract_type.label())
    }

    fn is_active(&self) -> bool {
        self.is_active
    }

    fn validate_input(input: Self::Input) -> Result<Row, ValidationError> {
        Ok(Fields::new()
            .set("title", required_text("title", &input.title, TITLE_MAX)?)
            .set(
                "location",
                optional_text("location", input.location, LOCATION_MAX)?,
            )
            .set("contract_type", input.contract_type.as_str())
            .set(
                "description",
                optional_text("description", input.description, DESCRIPTION_MAX)?,
            )
            .set("is_active", input.is_active)
            .set("is_highlighted", input.is_highlighted)
            .into_row())
    }

    fn validate_patch(patch: Self::Patch) -> Result<Row, ValidationError> {
        let title = patch
            .title
            .map(|t| required_text("title", &t, TITLE_MAX))
            .transpose()?;
        let mut fields = Fields::new()
            .maybe("title", title)
            .maybe("contract_type", patch.contract_type.map(ContractType::as_str))
            .maybe("is_active", patch.is_active)
            .maybe("is_highlighted", patch.is_highlighted);
        if patch.location.is_some() {
            fields = fields.set(
                "location",
                optional_text("location", patch.location, LOCATION_MAX)?,
            );
        }
        if patch.description.is_some() {
            fields = fields.set(
                "description",
                optional_text("description", patch.description, DESCRIPTION_MAX)?,
            );
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
    fn test_minimal_input_fills_every_column() {
        let input: JobOpeningInput =
            serde_json::from_value(json!({"title": "Couvreur", "is_active": true})).unwrap();
        let row = JobOpening::validate_input(input).unwrap();
        for column in JobOpening::TABLE.columns {
            assert!(row.contains_key(*column), "missing {column}");
        }
        assert_eq!(row["contract_type"], json!("cdi"));
        assert_eq!(row["location"], json!(null));
    }

    #[test]
    fn test_unknown_contract_type_is_rejected() {
        let parsed = serde_json::from_value::<JobOpeningInput>(
            json!({"title": "Zingueur", "contract_type": "freelance"}),
        );
        assert!(parsed.is_err());
    }

    #[test]
    fn test_unknown_fields_are_rejected() {
        let parsed =
            serde_json::from_value::<JobOpeningInput>(json!({"title": "Zingueur", "salary": 1}));
        assert!(parsed.is_err());
    }

    #[test]
    fn test_blank_title_is_rejected() {
        let input: JobOpeningInput = serde_json::from_value(json!({"title": "  "})).unwrap();
        let err = JobOpening::validate_input(input).unwrap_err();
        assert_eq!(err.field, "title");
    }

    #[test]
    fn test_patch_clears_location_with_blank() {
        let patch = JobOpeningPatch {
            location: Some(String::new()),
            ..JobOpeningPatch::default()
        };
        let row = JobOpening::validate_patch(patch).unwrap();
        assert_eq!(row["location"], json!(null));
    }
}
