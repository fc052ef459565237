//! The Review Resolver: turns a human reviewer's approve/reject
//! decision on a `MatchCandidate` into a committed (or cleared) `Match`,
//! and sweeps candidates past their TTL.

use leadflow_core::model::{CandidateStatus, MatchStatus, MatchedBy};
use leadflow_db::matches::NewMatch;
use serde_json::json;
use sqlx::PgPool;
use uuid::Uuid;

use crate::attribution;

/// A manually-approved `Match`'s `match_type` - there is no original
/// scorer signal to carry forward once a human has made the call.
const MANUAL_MATCH_TYPE: &str = "manual";

/// Approves one candidate: commits a `Match`, rejects every other pending
/// candidate for the same lead, and marks the canonical lead `matched`.
/// Returns the new `Match`'s id.
pub async fn approve(
    pool: &PgPool,
    lineage: &leadflow_evidence::LineageRecorder,
    candidate_id: Uuid,
    reviewer: Uuid,
) -> anyhow::Result<Uuid> {
    let candidate = leadflow_db::match_candidates::get(pool, candidate_id)
        .await?
        .ok_or_else(|| anyhow::anyhow!("match candidate {candidate_id} not found"))?;

    if !matches!(candidate.status, CandidateStatus::Pending) {
        anyhow::bail!("match candidate {candidate_id} is not pending");
    }

    let canonical = leadflow_db::canonical_leads::get(pool, candidate.canonical_lead_id)
        .await?
        .ok_or_else(|| anyhow::anyhow!("canonical lead {} not found", candidate.canonical_lead_id))?;
    let crm_lead = leadflow_db::crm_leads::get(pool, candidate.crm_lead_id)
        .await?
        .ok_or_else(|| anyhow::anyhow!("crm lead {} not found", candidate.crm_lead_id))?;

    let attribution = attribution::resolve(
        pool,
        canonical.tenant_id,
        crm_lead.assigned_user_id.as_deref(),
    )
    .await?;

    let new_match = NewMatch {
        canonical_lead_id: candidate.canonical_lead_id,
        crm_lead_id: candidate.crm_lead_id,
        match_type: MANUAL_MATCH_TYPE.to_string(),
        confidence: candidate.confidence_score,
        match_details: candidate.match_reasons.clone(),
        matched_by: MatchedBy::Manual,
        matched_by_user_id: Some(reviewer),
        attribution,
    };
    let created = leadflow_db::matches::create(pool, &new_match).await?;

    leadflow_db::match_candidates::set_status(
        pool,
        candidate.id,
        CandidateStatus::Approved,
        Some(reviewer),
        Some(created.id),
    )
    .await?;
    leadflow_db::match_candidates::reject_other_pending(
        pool,
        candidate.canonical_lead_id,
        candidate.id,
        reviewer,
    )
    .await?;
    leadflow_db::canonical_leads::set_match_status(
        pool,
        candidate.canonical_lead_id,
        MatchStatus::Matched,
        Some(candidate.confidence_score),
    )
    .await?;

    lineage
        .record_update(
            canonical.tenant_id,
            "match_candidates",
            candidate.id,
            "matches",
            created.id,
            "manual_approve",
            json!({ "reviewer": reviewer }),
        )
        .await?;

    Ok(created.id)
}

/// Rejects one candidate. `notes` has no column of its own on
/// `match_candidates` - it is audit-only text, so it is folded into the
/// lineage entry's `details` instead of a schema change. Reverts the
/// canonical lead to `unmatched` if no other pending candidate or active
/// match remains for it.
pub async fn reject(
    pool: &PgPool,
    lineage: &leadflow_evidence::LineageRecorder,
    candidate_id: Uuid,
    reviewer: Uuid,
    notes: Option<String>,
) -> anyhow::Result<()> {
    let candidate = leadflow_db::match_candidates::get(pool, candidate_id)
        .await?
        .ok_or_else(|| anyhow::anyhow!("match candidate {candidate_id} not found"))?;

    if !matches!(candidate.status, CandidateStatus::Pending) {
        anyhow::bail!("match candidate {candidate_id} is not pending");
    }

    let canonical = leadflow_db::canonical_leads::get(pool, candidate.canonical_lead_id)
        .await?
        .ok_or_else(|| anyhow::anyhow!("canonical lead {} not found", candidate.canonical_lead_id))?;

    leadflow_db::match_candidates::set_status(
        pool,
        candidate.id,
        CandidateStatus::Rejected,
        Some(reviewer),
        None,
    )
    .await?;

    lineage
        .record_update(
            canonical.tenant_id,
            "match_candidates",
            candidate.id,
            "match_candidates",
            candidate.id,
            "manual_reject",
            json!({ "reviewer": reviewer, "notes": notes }),
        )
        .await?;

    revert_if_unresolved(pool, candidate.canonical_lead_id).await?;
    Ok(())
}

/// Expires every `MatchCandidate` past its TTL and reverts
/// each affected canonical lead to `unmatched` where nothing else is left
/// pending. Returns the count of leads reverted.
pub async fn ttl_sweep(pool: &PgPool) -> anyhow::Result<usize> {
    let touched = leadflow_db::match_candidates::expire_past_ttl(pool).await?;
    let mut reverted = 0usize;
    for canonical_lead_id in touched {
        if revert_if_unresolved(pool, canonical_lead_id).await? {
            reverted += 1;
        }
    }
    Ok(reverted)
}

/// Reverts a canonical lead to `unmatched` if it has no pending candidate
/// and no active match. Returns whether a revert happened.
async fn revert_if_unresolved(pool: &PgPool, canonical_lead_id: Uuid) -> anyhow::Result<bool> {
    let has_pending = leadflow_db::match_candidates::has_pending(pool, canonical_lead_id).await?;
    if has_pending {
        return Ok(false);
    }
    if leadflow_db::matches::active_for_canonical(pool, canonical_lead_id)
        .await?
        .is_some()
    {
        return Ok(false);
    }

    leadflow_db::canonical_leads::set_match_status(
        pool,
        canonical_lead_id,
        MatchStatus::Unmatched,
        None,
    )
    .await?;
    Ok(true)
}
