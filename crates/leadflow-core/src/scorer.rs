//! The Match Scorer: stateless, pure scoring of one canonical lead
//! against a tenant's CRM lead corpus.

use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

use crate::model::CrmLead;
use crate::normalize::phone_match_key;
use crate::thresholds::{
    ADDRESS_FUZZY_MIN, DEFAULT_MAX_CANDIDATES, EMAIL_EXACT_CONFIDENCE, PHONE_EXACT_CONFIDENCE,
};

/// The kind of signal that produced a match, in decreasing priority order.
/// `Ord` follows declaration order so ties break toward the earlier variant,
/// so ties between signal types break toward the earlier variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum MatchType {
    EmailExact,
    PhoneExact,
    AddressFuzzy,
}

impl std::fmt::Display for MatchType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            MatchType::EmailExact => "email_exact",
            MatchType::PhoneExact => "phone_exact",
            MatchType::AddressFuzzy => "address_fuzzy",
        };
        write!(f, "{s}")
    }
}

impl std::str::FromStr for MatchType {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "email_exact" => Ok(Self::EmailExact),
            "phone_exact" => Ok(Self::PhoneExact),
            "address_fuzzy" => Ok(Self::AddressFuzzy),
            other => Err(format!("unknown match type: {other}")),
        }
    }
}

/// The normalized fields of the canonical lead being scored. Taken by value
/// rather than by reference to the full `CanonicalLead` so this module has
/// no dependency on the rest of `model` beyond `CrmLead`.
#[derive(Debug, Clone, Default)]
pub struct ScoringInput {
    pub email_normalized: Option<String>,
    pub phone_normalized: Option<String>,
    pub address_normalized: Option<String>,
}

/// One scored candidate CRM lead for a canonical lead.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchSignal {
    pub crm_lead_id: Uuid,
    pub match_type: MatchType,
    pub confidence: f64,
    pub details: serde_json::Value,
}

/// Character-trigram Jaccard similarity. `0.0` if either input has fewer
/// than 3 characters (no trigrams to compare).
fn trigram_similarity(a: &str, b: &str) -> f64 {
    let trigrams = |s: &str| -> std::collections::HashSet<String> {
        let chars: Vec<char> = s.chars().collect();
        if chars.len() < 3 {
            return std::collections::HashSet::new();
        }
        chars
            .windows(3)
            .map(|w| w.iter().collect::<String>())
            .collect()
    };

    let ta = trigrams(a);
    let tb = trigrams(b);
    if ta.is_empty() || tb.is_empty() {
        return 0.0;
    }

    let intersection = ta.intersection(&tb).count();
    let union = ta.union(&tb).count();
    if union == 0 {
        0.0
    } else {
        intersection as f64 / union as f64
    }
}

fn score_one(input: &ScoringInput, candidate: &CrmLead) -> Option<MatchSignal> {
    let mut best: Option<MatchSignal> = None;

    let mut consider = |signal: MatchSignal| {
        let is_better = match &best {
            None => true,
            Some(current) => {
                signal.confidence > current.confidence
                    || (signal.confidence == current.confidence
                        && signal.match_type < current.match_type)
            }
        };
        if is_better {
            best = Some(signal);
        }
    };

    if let (Some(lhs), Some(rhs)) = (&input.email_normalized, &candidate.email_normalized) {
        if !lhs.is_empty() && !rhs.is_empty() && lhs == rhs {
            consider(MatchSignal {
                crm_lead_id: candidate.id,
                match_type: MatchType::EmailExact,
                confidence: EMAIL_EXACT_CONFIDENCE,
                details: json!({ "left_email": lhs, "right_email": rhs }),
            });
        }
    }

    if let (Some(lhs), Some(rhs)) = (&input.phone_normalized, &candidate.phone_normalized) {
        if let (Some(lhs_key), Some(rhs_key)) = (phone_match_key(lhs), phone_match_key(rhs)) {
            if lhs_key == rhs_key {
                consider(MatchSignal {
                    crm_lead_id: candidate.id,
                    match_type: MatchType::PhoneExact,
                    confidence: PHONE_EXACT_CONFIDENCE,
                    details: json!({ "left_phone": lhs_key, "right_phone": rhs_key }),
                });
            }
        }
    }

    if let (Some(lhs), Some(rhs)) = (&input.address_normalized, &candidate.address_normalized) {
        if !lhs.is_empty() && !rhs.is_empty() {
            let similarity = trigram_similarity(lhs, rhs);
            if similarity > ADDRESS_FUZZY_MIN {
                consider(MatchSignal {
                    crm_lead_id: candidate.id,
                    match_type: MatchType::AddressFuzzy,
                    confidence: similarity,
                    details: json!({
                        "left_address": lhs,
                        "right_address": rhs,
                        "trigram_similarity": similarity,
                    }),
                });
            }
        }
    }

    best
}

/// Score `input` against every candidate in `corpus`, returning at most
/// `max_candidates` results sorted by confidence descending (ties broken by
/// [`MatchType`] priority).
pub fn score_candidates(
    input: &ScoringInput,
    corpus: &[CrmLead],
    max_candidates: usize,
) -> Vec<MatchSignal> {
    let mut signals: Vec<MatchSignal> = corpus.iter().filter_map(|c| score_one(input, c)).collect();

    signals.sort_by(|a, b| {
        b.confidence
            .partial_cmp(&a.confidence)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.match_type.cmp(&b.match_type))
    });

    signals.truncate(max_candidates);
    signals
}

/// Convenience wrapper using [`DEFAULT_MAX_CANDIDATES`].
pub fn score_candidates_default(input: &ScoringInput, corpus: &[CrmLead]) -> Vec<MatchSignal> {
    score_candidates(input, corpus, DEFAULT_MAX_CANDIDATES)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::CrmLead;
    use chrono::Utc;

    fn crm_lead(id: Uuid, email: Option<&str>, phone: Option<&str>, address: Option<&str>) -> CrmLead {
        CrmLead {
            id,
            tenant_id: Uuid::nil(),
            crm_connection_id: Uuid::nil(),
            external_id: id.to_string(),
            first_name: None,
            last_name: None,
            email: email.map(|s| s.to_string()),
            email_normalized: email.map(|s| s.to_string()),
            phone: phone.map(|s| s.to_string()),
            phone_normalized: phone.map(|s| s.to_string()),
            address: address.map(|s| s.to_string()),
            address_normalized: address.map(|s| s.to_string()),
            assigned_user_id: None,
            assigned_user_name: None,
            stage: None,
            source: None,
            tags: vec![],
            sync_hash: "h".to_string(),
            embedding: None,
            last_synced_at: Utc::now(),
        }
    }

    #[test]
    fn email_exact_scores_100() {
        let id = Uuid::new_v4();
        let corpus = vec![crm_lead(id, Some("john@example.com"), None, None)];
        let input = ScoringInput {
            email_normalized: Some("john@example.com".to_string()),
            ..Default::default()
        };
        let results = score_candidates_default(&input, &corpus);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].match_type, MatchType::EmailExact);
        assert_eq!(results[0].confidence, 1.00);
    }

    #[test]
    fn phone_exact_scores_95() {
        let id = Uuid::new_v4();
        let corpus = vec![crm_lead(id, None, Some("5551234567"), None)];
        let input = ScoringInput {
            phone_normalized: Some("5551234567".to_string()),
            ..Default::default()
        };
        let results = score_candidates_default(&input, &corpus);
        assert_eq!(results[0].match_type, MatchType::PhoneExact);
        assert_eq!(results[0].confidence, 0.95);
    }

    #[test]
    fn short_phone_never_matches() {
        let id = Uuid::new_v4();
        let corpus = vec![crm_lead(id, None, Some("555123"), None)];
        let input = ScoringInput {
            phone_normalized: Some("555123".to_string()),
            ..Default::default()
        };
        assert!(score_candidates_default(&input, &corpus).is_empty());
    }

    #[test]
    fn address_fuzzy_above_threshold() {
        let id = Uuid::new_v4();
        let corpus = vec![crm_lead(id, None, None, Some("456 oak avenue"))];
        let input = ScoringInput {
            address_normalized: Some("456 oak ave".to_string()),
            ..Default::default()
        };
        let results = score_candidates_default(&input, &corpus);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].match_type, MatchType::AddressFuzzy);
        assert!(results[0].confidence > ADDRESS_FUZZY_MIN);
    }

    #[test]
    fn address_fuzzy_below_threshold_is_discarded() {
        let id = Uuid::new_v4();
        let corpus = vec![crm_lead(id, None, None, Some("completely different place"))];
        let input = ScoringInput {
            address_normalized: Some("456 oak ave".to_string()),
            ..Default::default()
        };
        assert!(score_candidates_default(&input, &corpus).is_empty());
    }

    #[test]
    fn email_beats_address_when_both_present() {
        let id = Uuid::new_v4();
        let mut lead = crm_lead(id, Some("john@example.com"), None, Some("456 oak avenue"));
        lead.address_normalized = Some("456 oak avenue".to_string());
        let input = ScoringInput {
            email_normalized: Some("john@example.com".to_string()),
            address_normalized: Some("456 oak ave".to_string()),
            ..Default::default()
        };
        let results = score_candidates_default(&input, &[lead]);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].match_type, MatchType::EmailExact);
        assert_eq!(results[0].confidence, 1.00);
    }

    #[test]
    fn results_capped_at_max_candidates() {
        let corpus: Vec<CrmLead> = (0..10)
            .map(|_| crm_lead(Uuid::new_v4(), None, None, Some("456 oak avenue")))
            .collect();
        let input = ScoringInput {
            address_normalized: Some("456 oak ave".to_string()),
            ..Default::default()
        };
        let results = score_candidates(&input, &corpus, 3);
        assert_eq!(results.len(), 3);
    }

    #[test]
    fn sorted_by_confidence_descending() {
        let closer = crm_lead(Uuid::new_v4(), None, None, Some("456 oak ave"));
        let farther = crm_lead(Uuid::new_v4(), None, None, Some("456 pak avz"));
        let input = ScoringInput {
            address_normalized: Some("456 oak ave".to_string()),
            ..Default::default()
        };
        let results = score_candidates_default(&input, &[farther, closer.clone()]);
        assert_eq!(results[0].crm_lead_id, closer.id);
    }
}
