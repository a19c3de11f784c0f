//! Field validation helpers used when classifying source records.
//!
//! Each helper returns the normalized value on success, or a human-readable
//! reason suitable for an `ignored`/`error` outcome detail on failure. Empty
//! optional fields pass through unchanged.

use std::sync::LazyLock;

use regex::Regex;
use time::format_description::well_known::Rfc3339;
use time::macros::format_description;
use time::{Date, OffsetDateTime, PrimitiveDateTime};

const ACCEPTED_STATES: &[&str] = &[
    "AL", "AK", "AZ", "AR", "CA", "CO", "CT", "DE", "DC", "FL", "GA", "HI", "ID", "IL", "IN", "IA",
    "KS", "KY", "LA", "ME", "MD", "MA", "MI", "MN", "MS", "MO", "MT", "NE", "NV", "NH", "NJ", "NM",
    "NY", "NC", "ND", "OH", "OK", "OR", "PA", "RI", "SC", "SD", "TN", "TX", "UT", "VT", "VA", "WA",
    "WV", "WI", "WY",
];

/// Normalizes a date to `YYYY-MM-DD`, accepting ISO input plus the slash,
/// dash and dot US formats seen in source exports.
pub fn validate_date(value: &str, field_name: &str) -> Result<String, String> {
    let value = value.trim();
    let invalid = || format!("Invalid {field_name} format: {value}");

    let date = parse_date(value).ok_or_else(invalid)?;
    date.format(format_description!("[year]-[month]-[day]"))
        .map_err(|_| invalid())
}

fn parse_date(value: &str) -> Option<Date> {
    if let Ok(parsed) = Date::parse(value, format_description!("[year]-[month]-[day]")) {
        return Some(parsed);
    }
    if let Ok(parsed) = OffsetDateTime::parse(value, &Rfc3339) {
        return Some(parsed.date());
    }

    let fallbacks = [
        format_description!("[month padding:none]/[day padding:none]/[year]"),
        format_description!("[month padding:none]-[day padding:none]-[year]"),
        format_description!("[month padding:none].[day padding:none].[year]"),
    ];
    fallbacks
        .into_iter()
        .find_map(|format| Date::parse(value, format).ok())
}

/// Normalizes a datetime to RFC 3339, also accepting timestamps without an
/// offset (treated as UTC).
pub fn validate_datetime(value: &str, field_name: &str) -> Result<String, String> {
    let value = value.trim();

    if let Ok(parsed) = OffsetDateTime::parse(value, &Rfc3339) {
        return parsed
            .format(&Rfc3339)
            .map_err(|_| format!("Invalid {field_name} format: {value}"));
    }

    let naive_format = format_description!("[year]-[month]-[day]T[hour]:[minute]:[second]");
    if let Ok(parsed) = PrimitiveDateTime::parse(value, naive_format) {
        return parsed
            .assume_utc()
            .format(&Rfc3339)
            .map_err(|_| format!("Invalid {field_name} format: {value}"));
    }

    Err(format!("Invalid {field_name} format: {value}"))
}

/// Validates that a required field is present and non-empty.
pub fn validate_required(value: &str, field_name: &str) -> Result<String, String> {
    let value = value.trim();
    if value.is_empty() {
        return Err(format!("Data is missing {field_name}"));
    }
    Ok(value.to_string())
}

/// Confirms an input's headers contain every expected column.
pub fn validate_header(headers: &[&str], accepted_headers: &[&str]) -> Result<(), String> {
    let missing: Vec<&str> = accepted_headers
        .iter()
        .filter(|h| !headers.contains(h))
        .copied()
        .collect();

    if missing.is_empty() {
        Ok(())
    } else {
        Err(format!(
            "Incorrect headers! These headers were missing {missing:?} from the supplied input with headers: {headers:?}"
        ))
    }
}

/// Accepts only two-character US state codes (empty passes through).
pub fn validate_state_code(value: &str, field_name: &str) -> Result<String, String> {
    let value = value.trim();
    if value.is_empty() {
        return Ok(String::new());
    }

    let upper = value.to_uppercase();
    if ACCEPTED_STATES.contains(&upper.as_str()) {
        Ok(upper)
    } else {
        Err(format!("Invalid {field_name}: {value}"))
    }
}

/// Extracts the first five digits as the postal code.
pub fn validate_postal_code(value: &str, field_name: &str) -> Result<String, String> {
    let value = value.trim();
    if value.is_empty() {
        return Ok(String::new());
    }

    let digits: String = value.chars().filter(|c| c.is_ascii_digit()).take(5).collect();
    if digits.len() == 5 {
        Ok(digits)
    } else {
        Err(format!("Invalid {field_name}: {value}"))
    }
}

/// Strips formatting (and a `+1` country prefix) and requires ten digits.
pub fn validate_phone_number(value: &str, field_name: &str) -> Result<String, String> {
    let value = value.trim();
    if value.is_empty() {
        return Ok(String::new());
    }

    let stripped = value.strip_prefix("+1").unwrap_or(value);
    let digits: String = stripped.chars().filter(|c| c.is_ascii_digit()).collect();
    if digits.len() == 10 {
        Ok(digits)
    } else {
        Err(format!("Invalid {field_name}: {value}"))
    }
}

/// Accepts the usual spellings of a boolean flag; empty means `false`.
pub fn validate_boolean(value: &str, field_name: &str) -> Result<bool, String> {
    let value = value.trim();
    if value.is_empty() {
        return Ok(false);
    }

    match value.to_uppercase().as_str() {
        "TRUE" | "T" | "Y" | "YES" => Ok(true),
        "FALSE" | "F" | "N" | "NO" => Ok(false),
        _ => Err(format!("Invalid boolean {field_name} given: {value}")),
    }
}

/// Email shape: a local part that neither starts nor ends with a dot, an
/// `@`, and a dotted domain with an alphabetic TLD.
static EMAIL_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^[A-Za-z0-9!#$%&'*+/=?^_`{|}~-](?:[A-Za-z0-9!#$%&'*+/=?^_`{|}~.-]*[A-Za-z0-9!#$%&'*+/=?^_`{|}~-])?@[A-Za-z0-9.-]+\.[A-Za-z]{2,}$",
    )
    .expect("Invalid email regex")
});

/// Validates an email address (empty passes through).
pub fn validate_email(value: &str, field_name: &str) -> Result<String, String> {
    let value = value.trim();
    if value.is_empty() {
        return Ok(String::new());
    }

    let lowered = value.to_lowercase();
    if EMAIL_REGEX.is_match(&lowered) {
        Ok(lowered)
    } else {
        Err(format!("Invalid {field_name}: {value}"))
    }
}
