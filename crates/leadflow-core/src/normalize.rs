//! Pure, deterministic, idempotent normalization of identity fields.
//!
//! Every function here satisfies `f(f(x)) == f(x)`. They run on both sides
//! of every comparison in the Scorer, so any drift between two calls would
//! silently break matching.

/// `trim + lowercase`; an empty result normalizes to `None`.
pub fn normalize_email(raw: &str) -> Option<String> {
    let trimmed = raw.trim().to_lowercase();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed)
    }
}

/// Strip everything but ASCII digits. The result is still stored even when
/// it is too short to serve as a match key (see [`phone_match_key`]).
pub fn normalize_phone(raw: &str) -> String {
    raw.chars().filter(|c| c.is_ascii_digit()).collect()
}

/// A normalized phone only usable as a match key once trimming has produced
/// at least 10 digits. Shorter results are "no match key" but the
/// normalized digits are still persisted on the row.
pub fn phone_match_key(normalized_phone: &str) -> Option<&str> {
    if normalized_phone.len() >= 10 {
        Some(normalized_phone)
    } else {
        None
    }
}

const ADDRESS_ABBREVIATIONS: &[(&str, &str)] = &[
    ("street", "st"),
    ("avenue", "ave"),
    ("boulevard", "blvd"),
    ("drive", "dr"),
    ("road", "rd"),
    ("lane", "ln"),
    ("court", "ct"),
    ("apartment", "apt"),
    ("suite", "ste"),
    ("north", "n"),
    ("south", "s"),
    ("east", "e"),
    ("west", "w"),
];

/// Lowercase, trim, expand full-token abbreviations on word boundaries, then
/// collapse runs of whitespace to a single space.
pub fn normalize_address(raw: &str) -> Option<String> {
    let lowered = raw.trim().to_lowercase();
    if lowered.is_empty() {
        return None;
    }

    let tokens: Vec<String> = lowered
        .split_whitespace()
        .map(|word| {
            // Strip trailing punctuation (commas, periods) so "Street," and
            // "street." both match the whole-word table; leading punctuation
            // is left untouched since it never appears in practice.
            let core = word.trim_end_matches(|c: char| !c.is_alphanumeric());
            let suffix = &word[core.len()..];
            let replaced = ADDRESS_ABBREVIATIONS
                .iter()
                .find(|(full, _)| *full == core)
                .map(|(_, abbrev)| (*abbrev).to_string())
                .unwrap_or_else(|| core.to_string());
            format!("{replaced}{suffix}")
        })
        .collect();

    let collapsed = tokens.join(" ");
    if collapsed.is_empty() {
        None
    } else {
        Some(collapsed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn email_trims_and_lowercases() {
        assert_eq!(
            normalize_email(" John.Smith@Example.COM "),
            Some("john.smith@example.com".to_string())
        );
    }

    #[test]
    fn email_empty_is_none() {
        assert_eq!(normalize_email("   "), None);
    }

    #[test]
    fn email_idempotent() {
        let once = normalize_email(" Foo@Bar.com ").unwrap();
        let twice = normalize_email(&once).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn phone_strips_non_digits() {
        assert_eq!(normalize_phone("(555) 123-4567"), "5551234567");
    }

    #[test]
    fn phone_short_has_no_match_key() {
        let normalized = normalize_phone("555-1234");
        assert_eq!(normalized, "5551234");
        assert_eq!(phone_match_key(&normalized), None);
    }

    #[test]
    fn phone_idempotent() {
        let once = normalize_phone("(555) 123-4567");
        let twice = normalize_phone(&once);
        assert_eq!(once, twice);
    }

    #[test]
    fn address_expands_abbreviations_and_collapses_whitespace() {
        assert_eq!(
            normalize_address("123   Main  Street, Apartment 4B").unwrap(),
            "123 main st, apt 4b"
        );
    }

    #[test]
    fn address_directional_tokens() {
        assert_eq!(
            normalize_address("456 North Oak Avenue").unwrap(),
            "456 n oak ave"
        );
    }

    #[test]
    fn address_empty_is_none() {
        assert_eq!(normalize_address("   "), None);
    }

    #[test]
    fn address_idempotent() {
        let once = normalize_address("456 North Oak Avenue").unwrap();
        let twice = normalize_address(&once).unwrap();
        assert_eq!(once, twice);
    }
}
