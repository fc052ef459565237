//! Per-row validation against a `LeadSource`'s `validation_rules`.

use leadflow_core::model::ValidationRules;
use std::collections::BTreeMap;

/// Validates one mapped row (`target_field -> value`, already resolved by
/// [`crate::field_resolver::resolve_mapping`]). Returns the list of
/// validation errors; an empty list means the row is valid.
///
/// A required field is satisfied if *any* of its candidate columns has a
/// non-empty trimmed value in the raw row - this checks the mapped value
/// directly since mapping has already picked the first non-empty column.
pub fn validate_row(
    mapped: &BTreeMap<String, String>,
    rules: &ValidationRules,
) -> Vec<String> {
    let mut errors = Vec::new();

    for field in &rules.required_fields {
        let present = mapped
            .get(field)
            .map(|v| !v.trim().is_empty())
            .unwrap_or(false);
        if !present {
            errors.push(format!("missing required field: {field}"));
        }
    }

    if let Some(pattern) = &rules.email_regex {
        if let Some(email) = mapped.get("email") {
            if !email.trim().is_empty() {
                match regex::Regex::new(pattern) {
                    Ok(re) if !re.is_match(email.trim()) => {
                        errors.push(format!("email does not match pattern: {email}"));
                    }
                    Err(e) => errors.push(format!("invalid email_regex configured: {e}")),
                    _ => {}
                }
            }
        }
    }

    errors
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rules() -> ValidationRules {
        ValidationRules {
            required_fields: vec!["email".to_string(), "last_name".to_string()],
            email_regex: Some(r"^[^@\s]+@[^@\s]+\.[^@\s]+$".to_string()),
        }
    }

    #[test]
    fn valid_row_has_no_errors() {
        let mut row = BTreeMap::new();
        row.insert("email".to_string(), "jane@example.com".to_string());
        row.insert("last_name".to_string(), "Doe".to_string());
        assert!(validate_row(&row, &rules()).is_empty());
    }

    #[test]
    fn missing_required_field_is_flagged() {
        let mut row = BTreeMap::new();
        row.insert("email".to_string(), "jane@example.com".to_string());
        let errors = validate_row(&row, &rules());
        assert_eq!(errors.len(), 1);
        assert!(errors[0].contains("last_name"));
    }

    #[test]
    fn whitespace_only_value_counts_as_missing() {
        let mut row = BTreeMap::new();
        row.insert("email".to_string(), "jane@example.com".to_string());
        row.insert("last_name".to_string(), "   ".to_string());
        let errors = validate_row(&row, &rules());
        assert!(errors.iter().any(|e| e.contains("last_name")));
    }

    #[test]
    fn malformed_email_is_flagged() {
        let mut row = BTreeMap::new();
        row.insert("email".to_string(), "not-an-email".to_string());
        row.insert("last_name".to_string(), "Doe".to_string());
        let errors = validate_row(&row, &rules());
        assert!(errors.iter().any(|e| e.contains("email does not match")));
    }

    #[test]
    fn no_email_regex_skips_check() {
        let mut row = BTreeMap::new();
        row.insert("email".to_string(), "not-an-email".to_string());
        row.insert("last_name".to_string(), "Doe".to_string());
        let no_regex_rules = ValidationRules {
            required_fields: vec!["email".to_string(), "last_name".to_string()],
            email_regex: None,
        };
        assert!(validate_row(&row, &no_regex_rules).is_empty());
    }
}
