//! URL slug type for pages, lexicon terms and categories.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Errors that can occur when parsing a [`Slug`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum SlugError {
    #[error("slug cannot be empty")]
    Empty,
    #[error("slug must be at most {max} characters")]
    TooLong { max: usize },
    #[error("slug may only contain lowercase letters, digits and single hyphens")]
    InvalidCharacters,
}

/// A URL-safe identifier: lowercase ASCII letters, digits and single inner
/// hyphens (`pose-de-gouttieres`).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(try_from = "String", into = "String")]
pub struct Slug(String);

impl Slug {
    pub const MAX_LENGTH: usize = 120;

    /// Parse an already-formed slug.
    ///
    /// # Errors
    ///
    /// Returns an error if the input is empty, too long, or not in slug form.
    pub fn parse(s: &str) -> Result<Self, SlugError> {
        if s.is_empty() {
            return Err(SlugError::Empty);
        }
        if s.len() > Self::MAX_LENGTH {
            return Err(SlugError::TooLong {
                max: Self::MAX_LENGTH,
            });
        }
        let valid_chars = s
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-');
        if !valid_chars || s.starts_with('-') || s.ends_with('-') || s.contains("--") {
            return Err(SlugError::InvalidCharacters);
        }
        Ok(Self(s.to_owned()))
    }

    /// Derive a slug from a human title, folding common French accents.
    ///
    /// # Errors
    ///
    /// Returns [`SlugError::Empty`] when nothing sluggable remains.
    pub fn from_title(title: &str) -> Result<Self, SlugError> {
        let mut out = String::with_capacity(title.len());
        for c in title.chars().flat_map(char::to_lowercase) {
            let folded = match c {
                'à' | 'â' | 'ä' => 'a',
                'é' | 'è' | 'ê' | 'ë' => 'e',
                'î' | 'ï' => 'i',
                'ô' | 'ö' => 'o',
                'ù' | 'û' | 'ü' => 'u',
                'ç' => 'c',
                'ÿ' => 'y',
                c if c.is_ascii_alphanumeric() => c,
                _ => '-',
            };
            if folded == '-' && (out.is_empty() || out.ends_with('-')) {
                continue;
            }
            out.push(folded);
        }
        let trimmed = out.trim_end_matches('-');
        let truncated: String = trimmed.chars().take(Self::MAX_LENGTH).collect();
        Self::parse(truncated.trim_end_matches('-'))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Slug {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for Slug {
    type Error = SlugError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Slug> for String {
    fn from(slug: Slug) -> Self {
        slug.0
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_accepts_slugs() {
        assert!(Slug::parse("faq").is_ok());
        assert!(Slug::parse("zinguerie-2024").is_ok());
    }

    #[test]
    fn test_parse_rejects_bad_forms() {
        assert_eq!(Slug::parse(""), Err(SlugError::Empty));
        assert_eq!(Slug::parse("Faq"), Err(SlugError::InvalidCharacters));
        assert_eq!(Slug::parse("-faq"), Err(SlugError::InvalidCharacters));
        assert_eq!(Slug::parse("a--b"), Err(SlugError::InvalidCharacters));
    }

    #[test]
    fn test_from_title_folds_accents() {
        let slug = Slug::from_title("Étanchéité des toitures-terrasses !").unwrap();
        assert_eq!(slug.as_str(), "etancheite-des-toitures-terrasses");
    }

    #[test]
    fn test_from_title_rejects_symbols_only() {
        assert_eq!(Slug::from_title("!!!"), Err(SlugError::Empty));
    }
}
