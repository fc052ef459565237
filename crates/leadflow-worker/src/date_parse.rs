//! `source_created_at` parsing: ISO first, then the
//! configured `csv_config.date_format`, then a fixed fallback list.
//! Unparsable input is not a row-level failure - it just leaves the field
//! null.

use chrono::{DateTime, NaiveDate, Utc};

const FALLBACK_FORMATS: &[&str] = &["%m/%d/%Y", "%m-%d-%Y", "%Y-%m-%d"];

/// Tries RFC 3339 / ISO 8601 first, then `date_format`, then the fixed
/// fallback patterns. A bare date (no time component) is interpreted as
/// midnight UTC.
pub fn parse_source_created_at(raw: &str, date_format: &str) -> Option<DateTime<Utc>> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(dt.with_timezone(&Utc));
    }

    let mut formats = Vec::with_capacity(FALLBACK_FORMATS.len() + 1);
    formats.push(date_format);
    formats.extend_from_slice(FALLBACK_FORMATS);

    for format in formats {
        if let Ok(naive) = NaiveDate::parse_from_str(trimmed, format) {
            return naive.and_hms_opt(0, 0, 0).map(|dt| dt.and_utc());
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_rfc3339() {
        let parsed = parse_source_created_at("2024-03-05T10:30:00Z", "%Y-%m-%d").unwrap();
        assert_eq!(parsed.to_rfc3339(), "2024-03-05T10:30:00+00:00");
    }

    #[test]
    fn parses_configured_format() {
        let parsed = parse_source_created_at("03/05/2024", "%m/%d/%Y").unwrap();
        assert_eq!(parsed.format("%Y-%m-%d").to_string(), "2024-03-05");
    }

    #[test]
    fn falls_back_through_fixed_patterns() {
        assert!(parse_source_created_at("2024-03-05", "%d.%m.%Y").is_some());
        assert!(parse_source_created_at("03-05-2024", "%d.%m.%Y").is_some());
    }

    #[test]
    fn unparsable_is_none_not_an_error() {
        assert_eq!(parse_source_created_at("not a date", "%Y-%m-%d"), None);
    }

    #[test]
    fn empty_is_none() {
        assert_eq!(parse_source_created_at("   ", "%Y-%m-%d"), None);
    }
}
