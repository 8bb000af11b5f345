//! Site paths and redirect targets.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Errors that can occur when parsing a [`SitePath`] or redirect target.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum PathError {
    #[error("path must start with '/'")]
    NotAbsolute,
    #[error("path cannot contain whitespace, '?' or '#'")]
    InvalidCharacters,
    #[error("path must be at most {max} characters")]
    TooLong { max: usize },
    #[error("destination must be a site path or an http(s) URL")]
    InvalidDestination,
    #[error("unsupported redirect status {0} (expected 301, 302, 307 or 308)")]
    InvalidStatus(u16),
}

/// A normalised path on the public site, as matched by redirects and
/// recorded by 404 tracking.
///
/// Normalisation strips a trailing slash (except for `/`) and collapses
/// repeated slashes, so `/devis//` and `/devis` are the same path.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(try_from = "String", into = "String")]
pub struct SitePath(String);

impl SitePath {
    pub const MAX_LENGTH: usize = 2048;

    /// Parse and normalise a site path.
    ///
    /// # Errors
    ///
    /// Returns an error if the path is relative, too long, or contains
    /// whitespace, a query string or a fragment.
    pub fn parse(s: &str) -> Result<Self, PathError> {
        let s = s.trim();
        if !s.starts_with('/') {
            return Err(PathError::NotAbsolute);
        }
        if s.len() > Self::MAX_LENGTH {
            return Err(PathError::TooLong {
                max: Self::MAX_LENGTH,
            });
        }
        if s.chars().any(|c| c.is_whitespace() || c == '?' || c == '#') {
            return Err(PathError::InvalidCharacters);
        }

        let segments: Vec<&str> = s.split('/').filter(|seg| !seg.is_empty()).collect();
        Ok(Self(format!("/{}", segments.join("/"))))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// First path segment (`/admin/users` -> `admin`), empty for `/`.
    #[must_use]
    pub fn first_segment(&self) -> &str {
        self.0
            .trim_start_matches('/')
            .split('/')
            .next()
            .unwrap_or_default()
    }
}

impl fmt::Display for SitePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for SitePath {
    type Error = PathError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<SitePath> for String {
    fn from(path: SitePath) -> Self {
        path.0
    }
}

/// Validate a redirect destination: either a site path (normalised) or an
/// absolute `http`/`https` URL (kept verbatim).
///
/// # Errors
///
/// Returns [`PathError::InvalidDestination`] for anything else.
pub fn parse_destination(s: &str) -> Result<String, PathError> {
    let s = s.trim();
    if s.starts_with('/') && !s.starts_with("//") {
        return SitePath::parse(s).map(String::from);
    }
    match url::Url::parse(s) {
        Ok(url) if matches!(url.scheme(), "http" | "https") && url.has_host() => Ok(s.to_owned()),
        _ => Err(PathError::InvalidDestination),
    }
}

/// HTTP status used when following a redirect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "u16", into = "u16")]
pub enum RedirectStatus {
    #[default]
    MovedPermanently,
    Found,
    TemporaryRedirect,
    PermanentRedirect,
}

impl RedirectStatus {
    #[must_use]
    pub const fn code(self) -> u16 {
        match self {
            Self::MovedPermanently => 301,
            Self::Found => 302,
            Self::TemporaryRedirect => 307,
            Self::PermanentRedirect => 308,
        }
    }
}

impl TryFrom<u16> for RedirectStatus {
    type Error = PathError;

    fn try_from(code: u16) -> Result<Self, Self::Error> {
        match code {
            301 => Ok(Self::MovedPermanently),
            302 => Ok(Self::Found),
            307 => Ok(Self::TemporaryRedirect),
            308 => Ok(Self::PermanentRedirect),
            other => Err(PathError::InvalidStatus(other)),
        }
    }
}

impl From<RedirectStatus> for u16 {
    fn from(status: RedirectStatus) -> Self {
        status.code()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_site_path_normalises() {
        assert_eq!(SitePath::parse("/devis//").unwrap().as_str(), "/devis");
        assert_eq!(SitePath::parse("//a///b/").unwrap().as_str(), "/a/b");
        assert_eq!(SitePath::parse("/").unwrap().as_str(), "/");
    }

    #[test]
    fn test_site_path_rejects_invalid() {
        assert_eq!(SitePath::parse("devis"), Err(PathError::NotAbsolute));
        assert_eq!(
            SitePath::parse("/devis?x=1"),
            Err(PathError::InvalidCharacters)
        );
        assert_eq!(
            SitePath::parse("/mon devis"),
            Err(PathError::InvalidCharacters)
        );
    }

    #[test]
    fn test_first_segment() {
        assert_eq!(SitePath::parse("/admin/users").unwrap().first_segment(), "admin");
        assert_eq!(SitePath::parse("/").unwrap().first_segment(), "");
    }

    #[test]
    fn test_parse_destination() {
        assert_eq!(parse_destination("/contact/").unwrap(), "/contact");
        assert_eq!(
            parse_destination("https://formdetoit.fr/devis").unwrap(),
            "https://formdetoit.fr/devis"
        );
        assert!(parse_destination("//evil.example").is_err());
        assert!(parse_destination("javascript:alert(1)").is_err());
        assert!(parse_destination("ftp://files.example").is_err());
    }

    #[test]
    fn test_redirect_status_codes() {
        assert_eq!(RedirectStatus::try_from(308).unwrap().code(), 308);
        assert_eq!(RedirectStatus::default().code(), 301);
        assert_eq!(RedirectStatus::try_from(200), Err(PathError::InvalidStatus(200)));
    }
}
