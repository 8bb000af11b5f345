//! Field validation helpers shared by the resource inputs.

use chrono::{DateTime, Utc};
use serde_json::Value;

use formdetoit_core::Slug;

use crate::db::Row;

/// A single invalid input field.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{field}: {message}")]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl ValidationError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Trimmed, non-empty text of at most `max` characters.
pub fn required_text(field: &str, value: &str, max: usize) -> Result<String, ValidationError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(ValidationError::new(field, "is required"));
    }
    if value.chars().count() > max {
        return Err(ValidationError::new(
            field,
            format!("must be at most {max} characters"),
        ));
    }
    Ok(value.to_owned())
}

/// Optional text; blank becomes `None`.
pub fn optional_text(
    field: &str,
    value: Option<String>,
    max: usize,
) -> Result<Option<String>, ValidationError> {
    match value.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(text) => required_text(field, text, max).map(Some),
    }
}

/// Optional absolute `http`/`https` URL; blank becomes `None`.
pub fn optional_url(field: &str, value: Option<String>) -> Result<Option<String>, ValidationError> {
    let Some(text) = optional_text(field, value, 2048)? else {
        return Ok(None);
    };
    match url::Url::parse(&text) {
        Ok(url) if matches!(url.scheme(), "http" | "https") && url.has_host() => Ok(Some(text)),
        _ => Err(ValidationError::new(field, "must be an http(s) URL")),
    }
}

/// A slug, derived from `fallback` when `value` is blank.
pub fn slug_or_derived(
    field: &str,
    value: Option<&str>,
    fallback: &str,
) -> Result<Slug, ValidationError> {
    let result = match value.map(str::trim).filter(|s| !s.is_empty()) {
        Some(slug) => Slug::parse(slug),
        None => Slug::from_title(fallback),
    };
    result.map_err(|e| ValidationError::new(field, e.to_string()))
}

/// Sort order within the admin-chosen range.
pub fn sort_order(value: i32) -> Result<i32, ValidationError> {
    if (0..=10_000).contains(&value) {
        Ok(value)
    } else {
        Err(ValidationError::new(
            "sort_order",
            "must be between 0 and 10000",
        ))
    }
}

/// Deserialize a patch field so an absent key and an explicit `null` differ.
///
/// Use with `#[serde(default, deserialize_with = "double_option")]`.
///
/// # Errors
///
/// Propagates the inner deserializer's error.
pub fn double_option<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: serde::Deserialize<'de>,
    D: serde::Deserializer<'de>,
{
    serde::Deserialize::deserialize(deserializer).map(Some)
}

/// Column builder for validated inputs.
#[derive(Debug, Default)]
pub struct Fields(Row);

impl Fields {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn set(mut self, column: &str, value: impl Into<Value>) -> Self {
        self.0.insert(column.to_owned(), value.into());
        self
    }

    #[must_use]
    pub fn set_time(self, column: &str, value: Option<DateTime<Utc>>) -> Self {
        self.set(column, value.map(|at| at.to_rfc3339()))
    }

    /// Set `column` only when the patch carries a value.
    #[must_use]
    pub fn maybe(self, column: &str, value: Option<impl Into<Value>>) -> Self {
        match value {
            Some(value) => self.set(column, value),
            None => self,
        }
    }

    /// Finish a patch, rejecting one that changes nothing.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError` when no column was set.
    pub fn into_patch(self) -> Result<Row, ValidationError> {
        if self.0.is_empty() {
            return Err(ValidationError::new("body", "no fields to update"));
        }
        Ok(self.0)
    }

    #[must_use]
    pub fn into_row(self) -> Row {
        self.0
    }
}
