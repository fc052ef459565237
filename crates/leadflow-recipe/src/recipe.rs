//! `LeadSource` recipe validation - checks a configured feed is well-formed
//! before it is allowed to accept uploads.

use leadflow_core::model::LeadSource;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RecipeError {
    #[error("slug cannot be empty")]
    EmptySlug,

    #[error("display_name cannot be empty")]
    EmptyDisplayName,

    #[error("csv_config.delimiter cannot be a letter or digit")]
    InvalidDelimiter,

    #[error("field_mapping has no entries")]
    EmptyFieldMapping,

    #[error("field_mapping target '{0}' has no candidate columns")]
    EmptyCandidateList(String),

    #[error("required_fields entry '{0}' is not a key in field_mapping")]
    RequiredFieldNotMapped(String),

    #[error("validation_rules.email_regex is not a valid regular expression: {0}")]
    InvalidEmailRegex(String),
}

/// Validates a `LeadSource` recipe, on the assumption that
/// `field_mapping` and `validation_rules` are internally consistent before
/// any CSV is parsed against them. Used by the CLI's recipe-validate
/// command and before a `LeadSource` is persisted.
pub fn validate_recipe(source: &LeadSource) -> Result<(), Vec<RecipeError>> {
    let mut errors = Vec::new();

    if source.slug.trim().is_empty() {
        errors.push(RecipeError::EmptySlug);
    }
    if source.display_name.trim().is_empty() {
        errors.push(RecipeError::EmptyDisplayName);
    }
    if source.csv_config.delimiter.is_alphanumeric() {
        errors.push(RecipeError::InvalidDelimiter);
    }

    if source.field_mapping.is_empty() {
        errors.push(RecipeError::EmptyFieldMapping);
    }
    for (target_field, candidates) in &source.field_mapping {
        if candidates.is_empty() {
            errors.push(RecipeError::EmptyCandidateList(target_field.clone()));
        }
    }

    for required in &source.validation_rules.required_fields {
        if !source.field_mapping.contains_key(required) {
            errors.push(RecipeError::RequiredFieldNotMapped(required.clone()));
        }
    }

    if let Some(pattern) = &source.validation_rules.email_regex {
        if let Err(e) = regex::Regex::new(pattern) {
            errors.push(RecipeError::InvalidEmailRegex(e.to_string()));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use leadflow_core::model::{CsvConfig, ValidationRules};
    use uuid::Uuid;

    fn valid_source() -> LeadSource {
        let mut field_mapping = leadflow_core::model::FieldMapping::new();
        field_mapping.insert("email".to_string(), vec!["email".to_string()]);
        field_mapping.insert("phone".to_string(), vec!["phone".to_string(), "mobile".to_string()]);

        LeadSource {
            id: Uuid::new_v4(),
            tenant_id: Uuid::new_v4(),
            slug: "zillow".to_string(),
            display_name: "Zillow".to_string(),
            csv_config: CsvConfig::default(),
            field_mapping,
            validation_rules: ValidationRules {
                required_fields: vec!["email".to_string()],
                email_regex: Some(r"^[^@]+@[^@]+\.[^@]+$".to_string()),
            },
        }
    }

    #[test]
    fn valid_recipe_passes() {
        assert!(validate_recipe(&valid_source()).is_ok());
    }

    #[test]
    fn empty_slug_is_rejected() {
        let mut source = valid_source();
        source.slug = "  ".to_string();
        let errors = validate_recipe(&source).unwrap_err();
        assert!(errors.contains(&RecipeError::EmptySlug));
    }

    #[test]
    fn required_field_must_be_mapped() {
        let mut source = valid_source();
        source.validation_rules.required_fields.push("last_name".to_string());
        let errors = validate_recipe(&source).unwrap_err();
        assert!(errors
            .iter()
            .any(|e| matches!(e, RecipeError::RequiredFieldNotMapped(f) if f == "last_name")));
    }

    #[test]
    fn invalid_email_regex_is_rejected() {
        let mut source = valid_source();
        source.validation_rules.email_regex = Some("(".to_string());
        let errors = validate_recipe(&source).unwrap_err();
        assert!(errors
            .iter()
            .any(|e| matches!(e, RecipeError::InvalidEmailRegex(_))));
    }

    #[test]
    fn empty_candidate_list_is_rejected() {
        let mut source = valid_source();
        source.field_mapping.insert("address".to_string(), vec![]);
        let errors = validate_recipe(&source).unwrap_err();
        assert!(errors
            .iter()
            .any(|e| matches!(e, RecipeError::EmptyCandidateList(f) if f == "address")));
    }
}
