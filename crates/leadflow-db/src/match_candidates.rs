//! `MatchCandidate` rows - pending review items.

use chrono::{DateTime, Utc};
use leadflow_core::model::{CandidateStatus, MatchCandidate};
use serde_json::Value;
use sqlx::types::Json;
use sqlx::FromRow;
use sqlx::PgPool;
use uuid::Uuid;

#[derive(Debug, Clone, FromRow)]
struct MatchCandidateRow {
    id: Uuid,
    canonical_lead_id: Uuid,
    crm_lead_id: Uuid,
    confidence_score: f64,
    match_reasons: Json<Value>,
    status: String,
    expires_at: DateTime<Utc>,
    reviewed_by: Option<Uuid>,
    reviewed_at: Option<DateTime<Utc>>,
    lead_match_id: Option<Uuid>,
}

impl From<MatchCandidateRow> for MatchCandidate {
    fn from(row: MatchCandidateRow) -> Self {
        MatchCandidate {
            id: row.id,
            canonical_lead_id: row.canonical_lead_id,
            crm_lead_id: row.crm_lead_id,
            confidence_score: row.confidence_score,
            match_reasons: row.match_reasons.0,
            status: match row.status.as_str() {
                "approved" => CandidateStatus::Approved,
                "rejected" => CandidateStatus::Rejected,
                "expired" => CandidateStatus::Expired,
                _ => CandidateStatus::Pending,
            },
            expires_at: row.expires_at,
            reviewed_by: row.reviewed_by,
            reviewed_at: row.reviewed_at,
            lead_match_id: row.lead_match_id,
        }
    }
}

const SELECT_COLUMNS: &str = "id, canonical_lead_id, crm_lead_id, confidence_score, \
     match_reasons, status, expires_at, reviewed_by, reviewed_at, lead_match_id";

fn status_str(status: CandidateStatus) -> &'static str {
    match status {
        CandidateStatus::Pending => "pending",
        CandidateStatus::Approved => "approved",
        CandidateStatus::Rejected => "rejected",
        CandidateStatus::Expired => "expired",
    }
}

pub async fn get(pool: &PgPool, id: Uuid) -> sqlx::Result<Option<MatchCandidate>> {
    let row = sqlx::query_as::<_, MatchCandidateRow>(&format!(
        "SELECT {SELECT_COLUMNS} FROM match_candidates WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?;
    Ok(row.map(Into::into))
}

pub async fn pending_for_canonical(
    pool: &PgPool,
    canonical_lead_id: Uuid,
) -> sqlx::Result<Vec<MatchCandidate>> {
    let rows = sqlx::query_as::<_, MatchCandidateRow>(&format!(
        "SELECT {SELECT_COLUMNS} FROM match_candidates
         WHERE canonical_lead_id = $1 AND status = 'pending'
         ORDER BY confidence_score DESC"
    ))
    .bind(canonical_lead_id)
    .fetch_all(pool)
    .await?;
    Ok(rows.into_iter().map(Into::into).collect())
}

/// Upserts a candidate on `(canonical_lead_id, crm_lead_id)`, refreshing
/// score, reasons and expiry on each matcher pass.
pub async fn upsert_pending(
    pool: &PgPool,
    canonical_lead_id: Uuid,
    crm_lead_id: Uuid,
    confidence_score: f64,
    match_reasons: &Value,
    expires_at: DateTime<Utc>,
) -> sqlx::Result<MatchCandidate> {
    let row = sqlx::query_as::<_, MatchCandidateRow>(&format!(
        "INSERT INTO match_candidates (
             canonical_lead_id, crm_lead_id, confidence_score, match_reasons, expires_at
         ) VALUES ($1, $2, $3, $4, $5)
         ON CONFLICT (canonical_lead_id, crm_lead_id) DO UPDATE SET
             confidence_score = EXCLUDED.confidence_score,
             match_reasons = EXCLUDED.match_reasons,
             expires_at = EXCLUDED.expires_at,
             status = 'pending'
         RETURNING {SELECT_COLUMNS}"
    ))
    .bind(canonical_lead_id)
    .bind(crm_lead_id)
    .bind(confidence_score)
    .bind(Json(match_reasons))
    .bind(expires_at)
    .fetch_one(pool)
    .await?;
    Ok(row.into())
}

/// Reason folded into `match_reasons` when a re-scoring pass drops a
/// candidate that the previous pass had opened.
const SUPERSEDED_REASON: &str = "superseded";

/// Expires every `pending` candidate for a canonical not present in
/// `keep_crm_lead_ids` - stale candidates are expired (status `rejected`),
/// not deleted, and the drop is recorded in `match_reasons` so the audit
/// trail shows why rather than just that it happened.
pub async fn expire_stale(
    pool: &PgPool,
    canonical_lead_id: Uuid,
    keep_crm_lead_ids: &[Uuid],
) -> sqlx::Result<()> {
    sqlx::query(
        "UPDATE match_candidates SET status = 'rejected',
             match_reasons = match_reasons || jsonb_build_object('superseded_reason', $3::text)
         WHERE canonical_lead_id = $1 AND status = 'pending' AND NOT (crm_lead_id = ANY($2))",
    )
    .bind(canonical_lead_id)
    .bind(keep_crm_lead_ids)
    .bind(SUPERSEDED_REASON)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn set_status(
    pool: &PgPool,
    id: Uuid,
    status: CandidateStatus,
    reviewed_by: Option<Uuid>,
    lead_match_id: Option<Uuid>,
) -> sqlx::Result<()> {
    sqlx::query(
        "UPDATE match_candidates SET status = $2, reviewed_by = $3, reviewed_at = now(),
             lead_match_id = $4
         WHERE id = $1",
    )
    .bind(id)
    .bind(status_str(status))
    .bind(reviewed_by)
    .bind(lead_match_id)
    .execute(pool)
    .await?;
    Ok(())
}

/// Rejects every other `pending` candidate for a canonical once one is
/// approved.
pub async fn reject_other_pending(
    pool: &PgPool,
    canonical_lead_id: Uuid,
    except_id: Uuid,
    reviewed_by: Uuid,
) -> sqlx::Result<()> {
    sqlx::query(
        "UPDATE match_candidates SET status = 'rejected', reviewed_by = $3, reviewed_at = now()
         WHERE canonical_lead_id = $1 AND id != $2 AND status = 'pending'",
    )
    .bind(canonical_lead_id)
    .bind(except_id)
    .bind(reviewed_by)
    .execute(pool)
    .await?;
    Ok(())
}

/// TTL sweep: every expired-but-still-pending candidate becomes
/// `expired`. Returns the distinct canonical lead ids touched, so the
/// caller can re-check whether each one should revert to `unmatched`.
pub async fn expire_past_ttl(pool: &PgPool) -> sqlx::Result<Vec<Uuid>> {
    let ids: Vec<Uuid> = sqlx::query_scalar(
        "UPDATE match_candidates SET status = 'expired'
         WHERE status = 'pending' AND expires_at < now()
         RETURNING canonical_lead_id",
    )
    .fetch_all(pool)
    .await?;
    Ok(ids)
}

pub async fn has_pending(pool: &PgPool, canonical_lead_id: Uuid) -> sqlx::Result<bool> {
    let count: i64 = sqlx::query_scalar(
        "SELECT count(*) FROM match_candidates WHERE canonical_lead_id = $1 AND status = 'pending'",
    )
    .bind(canonical_lead_id)
    .fetch_one(pool)
    .await?;
    Ok(count > 0)
}
