//! Static content pages (FAQ, realisations, legal notices) with SEO metadata.
//!
//! A page is served at `/{slug}`; the page whose slug is [`HOME_SLUG`] is
//! served at `/`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use formdetoit_core::{PageId, Permission, Slug};

use super::validate::{Fields, ValidationError, optional_text, optional_url, required_text, slug_or_derived};
use super::{Entity, Invalidation};
use crate::db::{Row, SortDirection, TableSpec};

/// Slug of the page rendered at `/`.
pub const HOME_SLUG: &str = "accueil";

/// Slugs taken by application routes.
pub const RESERVED_SLUGS: &[&str] = &[
    "admin",
    "api",
    "auth",
    "static",
    "health",
    "recrutement",
    "equipe",
    "lexique",
    "certifications",
];

const META_TITLE_MAX: usize = 70;
const META_DESCRIPTION_MAX: usize = 160;
const CONTENT_MAX: usize = 200_000;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page {
    pub id: PageId,
    pub title: String,
    pub slug: String,
    pub content: String,
    pub is_published: bool,
    pub meta_title: Option<String>,
    pub meta_description: Option<String>,
    pub canonical_url: Option<String>,
    pub noindex: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Page {
    /// Public path of the page.
    #[must_use]
    pub fn path(&self) -> String {
        if self.slug == HOME_SLUG {
            "/".to_owned()
        } else {
            format!("/{}", self.slug)
        }
    }

    /// Title for the `<title>` element.
    #[must_use]
    pub fn seo_title(&self) -> &str {
        self.meta_title.as_deref().unwrap_or(&self.title)
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PageInput {
    pub title: String,
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub is_published: bool,
    #[serde(default)]
    pub meta_title: Option<String>,
    #[serde(default)]
    pub meta_description: Option<String>,
    #[serde(default)]
    pub canonical_url: Option<String>,
    #[serde(default)]
    pub noindex: bool,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PagePatch {
    pub title: Option<String>,
    pub slug: Option<String>,
    pub content: Option<String>,
    pub is_published: Option<bool>,
    pub meta_title: Option<String>,
    pub meta_description: Option<String>,
    pub canonical_url: Option<String>,
    pub noindex: Option<bool>,
}

fn check_not_reserved(slug: Slug) -> Result<Slug, ValidationError> {
    if RESERVED_SLUGS.contains(&slug.as_str()) {
        return Err(ValidationError::new("slug", "is reserved by the site"));
    }
    Ok(slug)
}

fn content(value: &str) -> Result<String, ValidationError> {
    if value.chars().count() > CONTENT_MAX {
        return Err(ValidationError::new(
            "content",
            format!("must be at most {CONTENT_MAX} characters"),
        ));
    }
    Ok(value.to_owned())
}

impl Entity for Page {
    type Input = PageInput;
    type Patch = PagePatch;

    const TABLE: &'static TableSpec = &TableSpec {
        name: "pages",
        columns: &[
            "title",
            "slug",
            "content",
            "is_published",
            "meta_title",
            "meta_description",
            "canonical_url",
            "noindex",
        ],
        unique: &["slug"],
        order_by: &[("title", SortDirection::Asc)],
        active_flag: Some("is_published"),
    };
    const RESOURCE: &'static str = "pages";
    const LABEL: &'static str = "Pages";
    const PERMISSION: Permission = Permission::ManageContent;
    const TOGGLES: &'static [&'static str] = &["is_published", "noindex"];
    // A slug change moves a page between paths.
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
        format!("{} ({})", self.title, self.path())
    }

    fn is_active(&self) -> bool {
        self.is_published
    }

    fn validate_input(input: Self::Input) -> Result<Row, ValidationError> {
        let title = required_text("title", &input.title, 200)?;
        let slug = check_not_reserved(slug_or_derived("slug", input.slug.as_deref(), &title)?)?;
        Ok(Fields::new()
            .set("title", title)
            .set("slug", slug.as_str())
            .set("content", content(&input.content)?)
            .set("is_published", input.is_published)
            .set(
                "meta_title",
                optional_text("meta_title", input.meta_title, META_TITLE_MAX)?,
            )
            .set(
                "meta_description",
                optional_text("meta_description", input.meta_description, META_DESCRIPTION_MAX)?,
            )
            .set(
                "canonical_url",
                optional_url("canonical_url", input.canonical_url)?,
            )
            .set("noindex", input.noindex)
            .into_row())
    }

    fn validate_patch(patch: Self::Patch) -> Result<Row, ValidationError> {
        let title = patch
            .title
            .map(|v| required_text("title", &v, 200))
            .transpose()?;
        let slug = patch
            .slug
            .map(|s| {
                Slug::parse(&s)
                    .map_err(|e| ValidationError::new("slug", e.to_string()))
                    .and_then(check_not_reserved)
            })
            .transpose()?;
        let mut fields = Fields::new()
            .maybe("title", title)
            .maybe("slug", slug.map(String::from))
            .maybe("content", patch.content.as_deref().map(content).transpose()?)
            .maybe("is_published", patch.is_published)
            .maybe("noindex", patch.noindex);
        if patch.meta_title.is_some() {
            fields = fields.set(
                "meta_title",
                optional_text("meta_title", patch.meta_title, META_TITLE_MAX)?,
            );
        }
        if patch.meta_description.is_some() {
            fields = fields.set(
                "meta_description",
                optional_text("meta_description", patch.meta_description, META_DESCRIPTION_MAX)?,
            );
        }
        if patch.canonical_url.is_some() {
            fields = fields.set(
                "canonical_url",
                optional_url("canonical_url", patch.canonical_url)?,
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

    fn input(value: serde_json::Value) -> Result<Row, ValidationError> {
        Page::validate_input(serde_json::from_value(value).unwrap())
    }

    #[test]
    fn test_reserved_slug_is_rejected() {
        let err = input(json!({"title": "Recrutement"})).unwrap_err();
        assert_eq!(err.field, "slug");
        let err = input(json!({"title": "Jobs", "slug": "admin"})).unwrap_err();
        assert_eq!(err.field, "slug");
    }

    #[test]
    fn test_meta_lengths_are_bounded() {
        let long = "x".repeat(71);
        let err = input(json!({"title": "FAQ", "meta_title": long})).unwrap_err();
        assert_eq!(err.field, "meta_title");

        let long = "x".repeat(161);
        let err = input(json!({"title": "FAQ", "meta_description": long})).unwrap_err();
        assert_eq!(err.field, "meta_description");
    }

    #[test]
    fn test_home_page_path() {
        let row = input(json!({"title": "Accueil", "is_published": true})).unwrap();
        assert_eq!(row["slug"], json!(HOME_SLUG));
    }

    #[test]
    fn test_patch_rejects_reserved_slug() {
        let patch = PagePatch {
            slug: Some("lexique".into()),
            ..PagePatch::default()
        };
        assert_eq!(Page::validate_patch(patch).unwrap_err().field, "slug");
    }
}
