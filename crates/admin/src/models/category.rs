//! Categories grouping lexicon terms.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use formdetoit_core::{CategoryId, Permission};

use super::validate::{Fields, ValidationError, optional_text, required_text, slug_or_derived, sort_order};
use super::{Entity, Invalidation};
use crate::db::{Row, SortDirection, TableSpec};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    pub sort_order: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CategoryInput {
    pub name: String,
    /// Derived from the name when omitted.
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub sort_order: i32,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CategoryPatch {
    pub name: Option<String>,
    pub slug: Option<String>,
    pub description: Option<String>,
    pub sort_order: Option<i32>,
}

const NAME_MAX: usize = 80;
const DESCRIPTION_MAX: usize = 1_000;

impl Entity for Category {
    type Input = CategoryInput;
    type Patch = CategoryPatch;

    const TABLE: &'static TableSpec = &TableSpec {
        name: "categories",
        columns: &["name", "slug", "description", "sort_order"],
        unique: &["slug"],
        order_by: &[
            ("sort_order", SortDirection::Asc),
            ("name", SortDirection::Asc),
        ],
        active_flag: None,
    };
    const RESOURCE: &'static str = "categories";
    const LABEL: &'static str = "Catégories";
    const PERMISSION: Permission = Permission::ManageContent;
    const INVALIDATES: Invalidation = Invalidation::Paths(&["/lexique"]);

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
        self.name.clone()
    }

    fn validate_input(input: Self::Input) -> Result<Row, ValidationError> {
        let name = required_text("name", &input.name, NAME_MAX)?;
        let slug = slug_or_derived("slug", input.slug.as_deref(), &name)?;
        Ok(Fields::new()
            .set("name", name)
            .set("slug", slug.as_str())
            .set(
                "description",
                optional_text("description", input.description, DESCRIPTION_MAX)?,
            )
            .set("sort_order", sort_order(input.sort_order)?)
            .into_row())
    }

    fn validate_patch(patch: Self::Patch) -> Result<Row, ValidationError> {
        let name = patch
            .name
            .map(|v| required_text("name", &v, NAME_MAX))
            .transpose()?;
        // A blank slug in a patch re-derives it from the new name only.
        let slug = match (patch.slug.as_deref(), name.as_deref()) {
            (Some(slug), Some(name)) => Some(slug_or_derived("slug", Some(slug), name)?),
            (Some(slug), None) => Some(
                formdetoit_core::Slug::parse(slug)
                    .map_err(|e| ValidationError::new("slug", e.to_string()))?,
            ),
            (None, _) => None,
        };
        let mut fields = Fields::new()
            .maybe("name", name)
            .maybe("slug", slug.map(String::from))
            .maybe("sort_order", patch.sort_order.map(sort_order).transpose()?);
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
    fn test_slug_is_derived_from_name() {
        let input: CategoryInput =
            serde_json::from_value(json!({"name": "Charpente & Zinguerie"})).unwrap();
        let row = Category::validate_input(input).unwrap();
        assert_eq!(row["slug"], json!("charpente-zinguerie"));
    }

    #[test]
    fn test_explicit_slug_must_be_valid() {
        let input: CategoryInput =
            serde_json::from_value(json!({"name": "Toiture", "slug": "Toi ture"})).unwrap();
        assert_eq!(Category::validate_input(input).unwrap_err().field, "slug");
    }

    #[test]
    fn test_patch_with_only_slug() {
        let patch = CategoryPatch {
            slug: Some("ardoise".into()),
            ..CategoryPatch::default()
        };
        let row = Category::validate_patch(patch).unwrap();
        assert_eq!(row["slug"], json!("ardoise"));
        assert!(!row.contains_key("name"));
    }
}
