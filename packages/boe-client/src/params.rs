//! Caller input checks. Everything here fails fast with a validation error
//! before a request is built.

use std::sync::LazyLock;

use chrono::NaiveDate;
use regex::Regex;

use crate::error::{ApiError, Result};

/// Largest page size accepted by the search endpoint.
pub const MAX_LIMIT: u32 = 1000;

const API_DATE_FORMAT: &str = "%Y%m%d";
const ISO_DATE_FORMAT: &str = "%Y-%m-%d";

static RE_LAW_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^BOE-[A-Z]-\d{4}-\d{1,5}$").expect("law id pattern is valid"));

/// Consolidated-law identifiers look like `BOE-A-2015-10566`.
pub fn validate_law_id(law_id: &str) -> Result<()> {
    if RE_LAW_ID.is_match(law_id) {
        Ok(())
    } else {
        Err(ApiError::validation("law_id", law_id, "BOE-X-YYYY-NNNNN"))
    }
}

/// An 8-digit `YYYYMMDD` string naming a real calendar day.
pub fn validate_date(field: &str, value: &str) -> Result<()> {
    let well_formed = value.len() == 8
        && value.bytes().all(|b| b.is_ascii_digit())
        && NaiveDate::parse_from_str(value, API_DATE_FORMAT).is_ok();

    if well_formed {
        Ok(())
    } else {
        Err(ApiError::validation(field, value, "YYYYMMDD"))
    }
}

/// Accepts `YYYYMMDD` or `YYYY-MM-DD` and returns the API form.
pub fn format_date_for_api(field: &str, value: &str) -> Result<String> {
    if validate_date(field, value).is_ok() {
        return Ok(value.to_string());
    }
    NaiveDate::parse_from_str(value, ISO_DATE_FORMAT)
        .map(|date| date.format(API_DATE_FORMAT).to_string())
        .map_err(|_| ApiError::validation(field, value, "YYYYMMDD or YYYY-MM-DD"))
}

/// Like [`format_date_for_api`], returning the calendar day.
pub fn parse_date(field: &str, value: &str) -> Result<NaiveDate> {
    let api = format_date_for_api(field, value)?;
    NaiveDate::parse_from_str(&api, API_DATE_FORMAT)
        .map_err(|_| ApiError::validation(field, value, "YYYYMMDD or YYYY-MM-DD"))
}

/// `YYYYMMDD` form of `date`.
pub fn to_api_date(date: NaiveDate) -> String {
    date.format(API_DATE_FORMAT).to_string()
}

pub fn validate_limit(limit: u32) -> Result<()> {
    if (1..=MAX_LIMIT).contains(&limit) {
        Ok(())
    } else {
        Err(ApiError::validation(
            "limit",
            &limit.to_string(),
            &format!("a number between 1 and {}", MAX_LIMIT),
        ))
    }
}

/// Path segments supplied by callers must not smuggle extra path or query.
pub fn validate_segment(field: &str, value: &str) -> Result<()> {
    let clean = !value.is_empty()
        && value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));
    if clean {
        Ok(())
    } else {
        Err(ApiError::validation(field, value, "letters, digits, '-', '_' or '.'"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorKind;

    #[test]
    fn test_parse_date_accepts_both_forms() {
        let expected = NaiveDate::from_ymd_opt(2024, 5, 29).unwrap();
        assert_eq!(parse_date("start", "20240529").unwrap(), expected);
        assert_eq!(parse_date("start", "2024-05-29").unwrap(), expected);
        assert_eq!(to_api_date(expected), "20240529");
        assert_eq!(
            parse_date("start", "2024-02-30").unwrap_err().kind,
            ErrorKind::Validation
        );
    }

    #[test]
    fn test_law_ids() {
        assert!(validate_law_id("BOE-A-2015-10566").is_ok());
        assert!(validate_law_id("BOE-A-1978-31229").is_ok());
        assert!(validate_law_id("BOE-S-2024-130").is_ok());

        for bad in ["boe-a-2015-10566", "BOE-A-15-1", "BOE-A-2015-123456", "BOE-A-2015-1/x", ""] {
            let err = validate_law_id(bad).unwrap_err();
            assert_eq!(err.kind, ErrorKind::Validation, "{}", bad);
            assert_eq!(err.code, 400);
        }
    }

    #[test]
    fn test_dates() {
        assert!(validate_date("date", "20240529").is_ok());
        assert!(validate_date("date", "20240229").is_ok());
        for bad in ["20230229", "2024-05-29", "2024529", "20241301", "abcdefgh", "+2024052"] {
            assert!(validate_date("date", bad).is_err(), "{}", bad);
        }
    }

    #[test]
    fn test_format_date_for_api() {
        assert_eq!(format_date_for_api("from", "20240101").unwrap(), "20240101");
        assert_eq!(format_date_for_api("from", "2024-01-31").unwrap(), "20240131");
        let err = format_date_for_api("from", "31/01/2024").unwrap_err();
        assert_eq!(err.message, "Invalid parameter: from");
    }

    #[test]
    fn test_limits() {
        assert!(validate_limit(1).is_ok());
        assert!(validate_limit(MAX_LIMIT).is_ok());
        assert!(validate_limit(0).is_err());
        assert!(validate_limit(MAX_LIMIT + 1).is_err());
    }

    #[test]
    fn test_segments() {
        assert!(validate_segment("block_id", "a1").is_ok());
        assert!(validate_segment("block_id", "dd").is_ok());
        assert!(validate_segment("block_id", "../x").is_err());
        assert!(validate_segment("block_id", "a1?x=1").is_err());
        assert!(validate_segment("block_id", "").is_err());
    }
}
