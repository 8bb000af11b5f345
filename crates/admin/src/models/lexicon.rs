//! Roofing lexicon: terms and their definitions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use formdetoit_core::{CategoryId, LexiconTermId, Permission, Slug};

use super::validate::{Fields, ValidationError, double_option, required_text, slug_or_derived};
use super::{Entity, Invalidation};
use crate::db::{Row, SortDirection, TableSpec};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LexiconTerm {
    pub id: LexiconTermId,
    pub term: String,
    pub slug: String,
    pub definition: String,
    pub category_id: Option<CategoryId>,
    pub is_published: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LexiconTermInput {
    pub term: String,
    #[serde(default)]
    pub slug: Option<String>,
    pub definition: String,
    #[serde(default)]
    pub category_id: Option<CategoryId>,
    #[serde(default)]
    pub is_published: bool,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LexiconTermPatch {
    pub term: Option<String>,
    pub slug: Option<String>,
    pub definition: Option<String>,
    /// `null` detaches the term from its category.
    #[serde(default, deserialize_with = "double_option")]
    pub category_id: Option<Option<CategoryId>>,
    pub is_published: Option<bool>,
}

const TERM_MAX: usize = 120;
const DEFINITION_MAX: usize = 5_000;

impl Entity for LexiconTerm {
    type Input = LexiconTermInput;
    type Patch = LexiconTermPatch;

    const TABLE: &'static TableSpec = &TableSpec {
        name: "lexicon_terms",
        columns: &["term", "slug", "definition", "category_id", "is_published"],
        unique: &["slug"],
        order_by: &[("term", SortDirection::Asc)],
        active_flag: Some("is_published"),
    };
    const RESOURCE: &'static str = "lexicon";
    const LABEL: &'static str = "Lexique";
    const PERMISSION: Permission = Permission::ManageContent;
    const TOGGLES: &'static [&'static str] = &["is_published"];
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
        self.term.clone()
    }

    fn is_active(&self) -> bool {
        self.is_published
    }

    fn validate_input(input: Self::Input) -> Result<Row, ValidationError> {
        let term = required_text("term", &input.term, TERM_MAX)?;
        let slug = slug_or_derived("slug", input.slug.as_deref(), &term)?;
        Ok(Fields::new()
            .set("term", term)
            .set("slug", slug.as_str())
            .set(
                "definition",
                required_text("definition", &input.definition, DEFINITION_MAX)?,
            )
            .set("category_id", input.category_id.map(|id| id.to_string()))
            .set("is_published", input.is_published)
            .into_row())
    }

    fn validate_patch(patch: Self::Patch) -> Result<Row, ValidationError> {
        let term = patch
            .term
            .map(|v| required_text("term", &v, TERM_MAX))
            .transpose()?;
        let slug = patch
            .slug
            .map(|s| Slug::parse(&s).map_err(|e| ValidationError::new("slug", e.to_string())))
            .transpose()?;
        let definition = patch
            .definition
            .map(|v| required_text("definition", &v, DEFINITION_MAX))
            .transpose()?;
        let mut fields = Fields::new()
            .maybe("term", term)
            .maybe("slug", slug.map(String::from))
            .maybe("definition", definition)
            .maybe("is_published", patch.is_published);
        if let Some(category) = patch.category_id {
            fields = fields.set("category_id", category.map(|id| id.to_string()));
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
    fn test_term_slug_folds_accents() {
        let input: LexiconTermInput = serde_json::from_value(json!({
            "term": "Égout de toit",
            "definition": "Partie basse d'un versant."
        }))
        .unwrap();
        let row = LexiconTerm::validate_input(input).unwrap();
        assert_eq!(row["slug"], json!("egout-de-toit"));
    }

    #[test]
    fn test_patch_null_category_detaches() {
        let patch: LexiconTermPatch =
            serde_json::from_value(json!({"category_id": null})).unwrap();
        let row = LexiconTerm::validate_patch(patch).unwrap();
        assert_eq!(row["category_id"], json!(null));
    }

    #[test]
    fn test_patch_without_category_leaves_it() {
        let patch: LexiconTermPatch =
            serde_json::from_value(json!({"is_published": true})).unwrap();
        let row = LexiconTerm::validate_patch(patch).unwrap();
        assert!(!row.contains_key("category_id"));
    }
}
