//! The CRM Puller's change-detection hash: "a stable hash
//! over `{email, phone, first_name, last_name, stage, assigned_user_id,
//! updated_at}`" - fed verbatim into [`leadflow_db::crm_leads::upsert`] as
//! `sync_hash` so an unchanged upstream record is a no-op update.

use sha2::{Digest, Sha256};

#[derive(Debug, Default)]
pub struct SyncHashInput<'a> {
    pub email: Option<&'a str>,
    pub phone: Option<&'a str>,
    pub first_name: Option<&'a str>,
    pub last_name: Option<&'a str>,
    pub stage: Option<&'a str>,
    pub assigned_user_id: Option<&'a str>,
    pub updated_at: Option<&'a str>,
}

/// A field-separated digest, hex-encoded. Fields are joined with `\u{1f}`
/// (unit separator) so e.g. `("ab", "c")` and `("a", "bc")` never collide.
pub fn compute(input: &SyncHashInput) -> String {
    let joined = [
        input.email,
        input.phone,
        input.first_name,
        input.last_name,
        input.stage,
        input.assigned_user_id,
        input.updated_at,
    ]
    .iter()
    .map(|f| f.unwrap_or(""))
    .collect::<Vec<_>>()
    .join("\u{1f}");

    hex::encode(Sha256::digest(joined.as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deterministic_for_the_same_fields() {
        let input = SyncHashInput {
            email: Some("a@b.com"),
            phone: Some("5551234567"),
            ..Default::default()
        };
        assert_eq!(compute(&input), compute(&input));
    }

    #[test]
    fn differs_when_any_field_changes() {
        let base = SyncHashInput {
            stage: Some("lead"),
            ..Default::default()
        };
        let changed = SyncHashInput {
            stage: Some("contract"),
            ..Default::default()
        };
        assert_ne!(compute(&base), compute(&changed));
    }

    #[test]
    fn separator_prevents_field_boundary_collisions() {
        let a = SyncHashInput {
            first_name: Some("ab"),
            last_name: Some("c"),
            ..Default::default()
        };
        let b = SyncHashInput {
            first_name: Some("a"),
            last_name: Some("bc"),
            ..Default::default()
        };
        assert_ne!(compute(&a), compute(&b));
    }
}
