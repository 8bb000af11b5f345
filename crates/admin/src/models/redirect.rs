//! URL redirects and the 404 hit log.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use formdetoit_core::{Permission, RedirectId, RedirectStatus, SitePath, parse_destination};

use super::validate::{Fields, ValidationError};
use super::Entity;
use crate::db::{Row, SortDirection, TableSpec};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Redirect {
    pub id: RedirectId,
    pub source_path: String,
    pub destination: String,
    pub status_code: RedirectStatus,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

const fn active_by_default() -> bool {
    true
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RedirectInput {
    pub source_path: String,
    pub destination: String,
    #[serde(default)]
    pub status_code: RedirectStatus,
    #[serde(default = "active_by_default")]
    pub is_active: bool,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RedirectPatch {
    pub source_path: Option<String>,
    pub destination: Option<String>,
    pub status_code: Option<RedirectStatus>,
    pub is_active: Option<bool>,
}

fn source(value: &str) -> Result<String, ValidationError> {
    SitePath::parse(value)
        .map(String::from)
        .map_err(|e| ValidationError::new("source_path", e.to_string()))
}

fn destination(value: &str) -> Result<String, ValidationError> {
    parse_destination(value).map_err(|e| ValidationError::new("destination", e.to_string()))
}

fn check_not_loop(source: &str, destination: &str) -> Result<(), ValidationError> {
    if source == destination {
        return Err(ValidationError::new(
            "destination",
            "must differ from the source path",
        ));
    }
    Ok(())
}

impl Entity for Redirect {
    type Input = RedirectInput;
    type Patch = RedirectPatch;

    const TABLE: &'static TableSpec = &TableSpec {
        name: "redirects",
        columns: &["source_path", "destination", "status_code", "is_active"],
        unique: &["source_path"],
        order_by: &[("source_path", SortDirection::Asc)],
        active_flag: Some("is_active"),
    };
    const RESOURCE: &'static str = "redirects";
    const LABEL: &'static str = "Redirections";
    const PERMISSION: Permission = Permission::ManageSeo;
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
        format!(
            "{} -> {} ({})",
            self.source_path,
            self.destination,
            self.status_code.code()
        )
    }

    fn is_active(&self) -> bool {
        self.is_active
    }

    fn validate_record(&self) -> Result<(), ValidationError> {
        check_not_loop(&self.source_path, &self.destination)
    }

    fn resolves_not_found(&self) -> Option<&str> {
        self.is_active.then_some(self.source_path.as_str())
    }

    fn validate_input(input: Self::Input) -> Result<Row, ValidationError> {
        let source_path = source(&input.source_path)?;
        let destination = destination(&input.destination)?;
        check_not_loop(&source_path, &destination)?;
        Ok(Fields::new()
            .set("source_path", source_path)
            .set("destination", destination)
            .set("status_code", input.status_code.code())
            .set("is_active", input.is_active)
            .into_row())
    }

    fn validate_patch(patch: Self::Patch) -> Result<Row, ValidationError> {
        let source_path = patch.source_path.as_deref().map(source).transpose()?;
        let destination = patch.destination.as_deref().map(destination).transpose()?;
        if let (Some(s), Some(d)) = (&source_path, &destination) {
            check_not_loop(s, d)?;
        }
        Fields::new()
            .maybe("source_path", source_path)
            .maybe("destination", destination)
            .maybe("status_code", patch.status_code.map(RedirectStatus::code))
            .maybe("is_active", patch.is_active)
            .into_patch()
    }
}

/// Accumulated 404 hits on one path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotFoundLog {
    pub path: String,
    pub hit_count: i64,
    pub first_seen: DateTime<Utc>,
    pub last_seen: DateTime<Utc>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;

    fn input(value: serde_json::Value) -> Result<Row, ValidationError> {
        Redirect::validate_input(serde_json::from_value(value).unwrap())
    }

    #[test]
    fn test_source_is_normalised() {
        let row = input(json!({"source_path": "/ancien//blog/", "destination": "/blog"})).unwrap();
        assert_eq!(row["source_path"], json!("/ancien/blog"));
        assert_eq!(row["status_code"], json!(301));
        assert_eq!(row["is_active"], json!(true));
    }

    #[test]
    fn test_loop_is_rejected() {
        let err = input(json!({"source_path": "/a/", "destination": "/a"})).unwrap_err();
        assert_eq!(err.field, "destination");
    }

    #[test]
    fn test_external_destination_is_kept() {
        let row = input(json!({
            "source_path": "/avis",
            "destination": "https://g.page/formdetoit",
            "status_code": 302
        }))
        .unwrap();
        assert_eq!(row["destination"], json!("https://g.page/formdetoit"));
        assert_eq!(row["status_code"], json!(302));
    }

    #[test]
    fn test_unsupported_status_is_rejected() {
        let parsed = serde_json::from_value::<RedirectInput>(
            json!({"source_path": "/a", "destination": "/b", "status_code": 303}),
        );
        assert!(parsed.is_err());
    }
}
