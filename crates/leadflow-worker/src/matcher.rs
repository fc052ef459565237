//! The Matcher: scores every `pending`/`review`/`multiple` canonical
//! lead against its tenant's CRM corpus and either auto-commits a `Match`
//! or opens/refreshes `MatchCandidate` rows for a human to review.
//!
//! Unlike the Parser and Transformer, claiming here is a read, not a
//! status flip - a lead already sitting in `review` is re-scored on every
//! pass so a newly-synced CRM record can turn a stale candidate into an
//! auto-match.

use std::collections::HashMap;

use leadflow_core::model::{CanonicalLead, MatchStatus};
use leadflow_core::scorer::{score_candidates_default, MatchSignal, ScoringInput};
use leadflow_core::thresholds::{AUTO, DEFAULT_CANDIDATE_TTL_DAYS, REVIEW_LOW};
use leadflow_db::matches::NewMatch;
use serde_json::json;
use sqlx::PgPool;
use uuid::Uuid;

use crate::attribution;

#[derive(Debug, Default)]
pub struct MatchStats {
    pub leads_scored: usize,
    pub auto_matched: usize,
    pub opened_for_review: usize,
    pub unmatched: usize,
}

/// Scores up to `limit` claimable canonical leads.
pub async fn run_once(
    pool: &PgPool,
    lineage: &leadflow_evidence::LineageRecorder,
    limit: i64,
) -> anyhow::Result<MatchStats> {
    let leads = leadflow_db::canonical_leads::claim_pending_for_match(pool, limit).await?;
    let mut stats = MatchStats::default();

    // Corpora are re-fetched per tenant as the leads stream by, not per
    // lead - a pass over a few hundred leads from one tenant does one
    // fetch, not a few hundred.
    let mut corpora: HashMap<Uuid, Vec<leadflow_core::model::CrmLead>> = HashMap::new();

    for lead in leads {
        let corpus = match corpora.get(&lead.tenant_id) {
            Some(c) => c,
            None => {
                let fetched =
                    leadflow_db::canonical_leads::crm_corpus_for_tenant(pool, lead.tenant_id)
                        .await?;
                corpora.entry(lead.tenant_id).or_insert(fetched)
            }
        };

        let outcome = match_one(pool, lineage, &lead, corpus).await?;
        stats.leads_scored += 1;
        match outcome {
            MatchOutcome::AutoMatched => stats.auto_matched += 1,
            MatchOutcome::OpenedForReview => stats.opened_for_review += 1,
            MatchOutcome::Unmatched => stats.unmatched += 1,
        }
    }

    Ok(stats)
}

enum MatchOutcome {
    AutoMatched,
    OpenedForReview,
    Unmatched,
}

async fn match_one(
    pool: &PgPool,
    lineage: &leadflow_evidence::LineageRecorder,
    lead: &CanonicalLead,
    corpus: &[leadflow_core::model::CrmLead],
) -> anyhow::Result<MatchOutcome> {
    // Safety net against a double-commit if two matcher passes raced on
    // this lead (e.g. a reaper-requeued pass overlapping the next poll).
    if leadflow_db::matches::active_for_canonical(pool, lead.id).await?.is_some() {
        return Ok(MatchOutcome::AutoMatched);
    }

    let input = ScoringInput {
        email_normalized: lead.email_normalized.clone(),
        phone_normalized: lead.phone_normalized.clone(),
        address_normalized: lead.address_normalized.clone(),
    };
    let signals = score_candidates_default(&input, corpus);

    let best = signals.first();
    match best {
        Some(signal) if signal.confidence >= AUTO => {
            commit_match(pool, lineage, lead, signal).await?;
            Ok(MatchOutcome::AutoMatched)
        }
        _ => {
            let review_signals: Vec<&MatchSignal> = signals
                .iter()
                .filter(|s| s.confidence >= REVIEW_LOW && s.confidence < AUTO)
                .collect();

            if review_signals.is_empty() {
                leadflow_db::match_candidates::expire_stale(pool, lead.id, &[]).await?;
                leadflow_db::canonical_leads::set_match_status(
                    pool,
                    lead.id,
                    MatchStatus::Unmatched,
                    None,
                )
                .await?;
                Ok(MatchOutcome::Unmatched)
            } else {
                open_for_review(pool, lead, &review_signals).await?;
                Ok(MatchOutcome::OpenedForReview)
            }
        }
    }
}

async fn commit_match(
    pool: &PgPool,
    lineage: &leadflow_evidence::LineageRecorder,
    lead: &CanonicalLead,
    signal: &MatchSignal,
) -> anyhow::Result<()> {
    let crm_lead = leadflow_db::crm_leads::get(pool, signal.crm_lead_id)
        .await?
        .ok_or_else(|| anyhow::anyhow!("crm lead {} vanished mid-match", signal.crm_lead_id))?;

    let attribution = attribution::resolve(pool, lead.tenant_id, crm_lead.assigned_user_id.as_deref())
        .await?;

    let new_match = NewMatch {
        canonical_lead_id: lead.id,
        crm_lead_id: signal.crm_lead_id,
        match_type: signal.match_type.to_string(),
        confidence: signal.confidence,
        match_details: signal.details.clone(),
        matched_by: leadflow_core::model::MatchedBy::System,
        matched_by_user_id: None,
        attribution,
    };
    let created = leadflow_db::matches::create(pool, &new_match).await?;

    leadflow_db::match_candidates::expire_stale(pool, lead.id, &[]).await?;
    leadflow_db::canonical_leads::set_match_status(
        pool,
        lead.id,
        MatchStatus::Matched,
        Some(signal.confidence),
    )
    .await?;

    lineage
        .record_update(
            lead.tenant_id,
            "canonical_leads",
            lead.id,
            "matches",
            created.id,
            "auto_match",
            json!({ "match_type": signal.match_type.to_string(), "confidence": signal.confidence }),
        )
        .await?;

    Ok(())
}

async fn open_for_review(
    pool: &PgPool,
    lead: &CanonicalLead,
    signals: &[&MatchSignal],
) -> anyhow::Result<()> {
    let expires_at = chrono::Utc::now() + chrono::Duration::days(DEFAULT_CANDIDATE_TTL_DAYS);
    let mut keep = Vec::with_capacity(signals.len());

    for signal in signals {
        leadflow_db::match_candidates::upsert_pending(
            pool,
            lead.id,
            signal.crm_lead_id,
            signal.confidence,
            &signal.details,
            expires_at,
        )
        .await?;
        keep.push(signal.crm_lead_id);
    }

    leadflow_db::match_candidates::expire_stale(pool, lead.id, &keep).await?;

    let status = if signals.len() > 1 {
        MatchStatus::Multiple
    } else {
        MatchStatus::Review
    };
    let top_confidence = signals.iter().map(|s| s.confidence).fold(0.0, f64::max);
    leadflow_db::canonical_leads::set_match_status(pool, lead.id, status, Some(top_confidence))
        .await?;

    Ok(())
}
