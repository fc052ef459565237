//! Field name resolution for a `LeadSource`'s `field_mapping`.

/// Normalizes a column name for comparison: lowercase, dashes and spaces
/// collapsed to underscores, trimmed.
pub fn normalize_field_name(name: &str) -> String {
    name.trim().to_lowercase().replace(['-', ' '], "_")
}

/// Finds the first of `candidate_columns` present (after normalization) in
/// `available_columns`, returning the column's original spelling from the
/// CSV header.
pub fn resolve_candidate(candidate_columns: &[String], available_columns: &[String]) -> Option<String> {
    for candidate in candidate_columns {
        let normalized = normalize_field_name(candidate);
        if let Some(found) = available_columns
            .iter()
            .find(|available| normalize_field_name(available) == normalized)
        {
            return Some(found.clone());
        }
    }
    None
}

/// Resolves every target field in a `field_mapping` against a CSV header
/// row, returning `target_field -> resolved_column` for the fields that
/// were found. Fields absent from the header are simply omitted; whether
/// that is an error is [`ValidationRules::required_fields`]'s concern, not
/// this function's.
pub fn resolve_mapping(
    field_mapping: &leadflow_core::model::FieldMapping,
    available_columns: &[String],
) -> std::collections::BTreeMap<String, String> {
    field_mapping
        .iter()
        .filter_map(|(target_field, candidates)| {
            resolve_candidate(candidates, available_columns)
                .map(|resolved| (target_field.clone(), resolved))
        })
        .collect()
}

/// Resolves every target field against one row's actual values. Unlike [`resolve_mapping`], which only
/// asks whether a column exists in the header, this looks at the row's
/// contents - a candidate column present in the header but blank on this
/// row is skipped in favor of the next candidate.
pub fn resolve_row_values(
    field_mapping: &leadflow_core::model::FieldMapping,
    row: &std::collections::BTreeMap<String, String>,
) -> std::collections::BTreeMap<String, String> {
    field_mapping
        .iter()
        .filter_map(|(target_field, candidates)| {
            candidates
                .iter()
                .find_map(|candidate| {
                    let normalized = normalize_field_name(candidate);
                    row.iter().find_map(|(column, value)| {
                        if normalize_field_name(column) == normalized && !value.trim().is_empty() {
                            Some(value.trim().to_string())
                        } else {
                            None
                        }
                    })
                })
                .map(|value| (target_field.clone(), value))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_dashes_and_case() {
        assert_eq!(normalize_field_name("First-Name"), "first_name");
        assert_eq!(normalize_field_name(" Email Address "), "email_address");
    }

    #[test]
    fn resolves_first_matching_candidate() {
        let available = vec!["Email".to_string(), "Phone".to_string()];
        let candidates = vec!["email_address".to_string(), "email".to_string()];
        assert_eq!(
            resolve_candidate(&candidates, &available),
            Some("Email".to_string())
        );
    }

    #[test]
    fn no_match_returns_none() {
        let available = vec!["Phone".to_string()];
        let candidates = vec!["email".to_string()];
        assert_eq!(resolve_candidate(&candidates, &available), None);
    }

    #[test]
    fn resolve_mapping_skips_unmapped_fields() {
        let mut mapping = leadflow_core::model::FieldMapping::new();
        mapping.insert("email".to_string(), vec!["email".to_string()]);
        mapping.insert("phone".to_string(), vec!["mobile".to_string()]);
        let available = vec!["Email".to_string()];

        let resolved = resolve_mapping(&mapping, &available);
        assert_eq!(resolved.get("email"), Some(&"Email".to_string()));
        assert_eq!(resolved.get("phone"), None);
    }

    #[test]
    fn resolve_row_values_skips_blank_candidate_for_the_next_one() {
        let mut mapping = leadflow_core::model::FieldMapping::new();
        mapping.insert(
            "email".to_string(),
            vec!["email".to_string(), "email_address".to_string()],
        );
        let mut row = std::collections::BTreeMap::new();
        row.insert("email".to_string(), "   ".to_string());
        row.insert("email_address".to_string(), "jane@example.com".to_string());

        let resolved = resolve_row_values(&mapping, &row);
        assert_eq!(resolved.get("email"), Some(&"jane@example.com".to_string()));
    }

    #[test]
    fn resolve_row_values_trims_the_winning_value() {
        let mut mapping = leadflow_core::model::FieldMapping::new();
        mapping.insert("last_name".to_string(), vec!["last_name".to_string()]);
        let mut row = std::collections::BTreeMap::new();
        row.insert("last_name".to_string(), "  Doe  ".to_string());

        let resolved = resolve_row_values(&mapping, &row);
        assert_eq!(resolved.get("last_name"), Some(&"Doe".to_string()));
    }
}
