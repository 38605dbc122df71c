// Validation utilities module
// Custom field rules and the empty-string-as-absent deserializer

use std::sync::LazyLock;

use chrono::{DateTime, NaiveDate};
use regex::Regex;
use serde::{Deserialize, Deserializer};
use validator::ValidationError;

static ISBN_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?:\d{9}[\dXx]|\d{13})$").expect("ISBN pattern compiles"));

/// Deserializes a string field, mapping `""` (or whitespace only) to `None`
///
/// Applied to every string field of every request body so that an empty string
/// is indistinguishable from an omitted field.
pub fn empty_string_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<String>::deserialize(deserializer)?;
    Ok(value.filter(|s| !s.trim().is_empty()))
}

/// Canonical stored form of an ISBN: separators dropped, check digit `X` uppercased
pub fn normalize_isbn(isbn: &str) -> String {
    isbn.chars()
        .filter(|c| *c != '-' && *c != ' ')
        .map(|c| c.to_ascii_uppercase())
        .collect()
}

/// Validates an ISBN-10 or ISBN-13; hyphens and spaces between digits are ignored
pub fn validate_isbn(isbn: &str) -> Result<(), ValidationError> {
    if ISBN_PATTERN.is_match(&normalize_isbn(isbn)) {
        Ok(())
    } else {
        let mut err = ValidationError::new("invalid_isbn");
        err.message = Some("ISBN must have 10 or 13 digits".into());
        Err(err)
    }
}

/// Parses a publication date given as `YYYY-MM-DD` or as an RFC 3339 timestamp
pub fn parse_published_date(value: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .or_else(|| DateTime::parse_from_rfc3339(value).ok().map(|dt| dt.date_naive()))
}

pub fn validate_published_date(value: &str) -> Result<(), ValidationError> {
    match parse_published_date(value) {
        Some(_) => Ok(()),
        None => {
            let mut err = ValidationError::new("invalid_date");
            err.message = Some("Published date must be YYYY-MM-DD or an RFC 3339 timestamp".into());
            Err(err)
        }
    }
}
