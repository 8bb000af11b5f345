//! Custom Askama template filters.

#![allow(clippy::unnecessary_wraps)]

use std::borrow::Borrow;
use std::fmt::Display;

use chrono::{DateTime, Datelike, Utc};

/// Returns the current year.
///
/// Usage in templates: `{{ ""|current_year }}`
#[askama::filter_fn]
pub fn current_year(_value: impl Display, _env: &dyn askama::Values) -> askama::Result<i32> {
    Ok(Utc::now().year())
}

/// Formats a timestamp as a French calendar date, e.g. `07/03/2026`.
///
/// Usage in templates: `{{ job.created_at|fr_date }}`
#[askama::filter_fn]
pub fn fr_date(
    value: impl Borrow<DateTime<Utc>>,
    _env: &dyn askama::Values,
) -> askama::Result<String> {
    Ok(value.borrow().format("%d/%m/%Y").to_string())
}
