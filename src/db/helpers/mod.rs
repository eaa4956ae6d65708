use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, Utc};

use crate::utils::time::DATE_KEY_FORMAT;

pub fn parse_datetime(value: &str, field: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .with_context(|| format!("failed to parse {field}"))
}

pub fn parse_optional_datetime(
    value: Option<String>,
    field: &str,
) -> Result<Option<DateTime<Utc>>> {
    match value {
        Some(raw) => parse_datetime(&raw, field).map(Some),
        None => Ok(None),
    }
}

/// Parses a `dd-mm-yyyy` ledger key.
pub fn parse_date_key(value: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(value, DATE_KEY_FORMAT)
        .with_context(|| format!("invalid ledger date '{value}'"))
}
