//! Typed wrappers over the reporting views - one struct and one
//! query function per view, scoped to a single tenant.

use chrono::{DateTime, Utc};
use sqlx::FromRow;
use sqlx::PgPool;
use uuid::Uuid;

#[derive(Debug, Clone, FromRow, serde::Serialize)]
pub struct SourceSummaryRow {
    pub lead_source_id: Uuid,
    pub display_name: String,
    pub total_leads: i64,
    pub matched_leads: i64,
    pub review_leads: i64,
    pub unmatched_leads: i64,
}

pub async fn source_summary(pool: &PgPool, tenant_id: Uuid) -> sqlx::Result<Vec<SourceSummaryRow>> {
    sqlx::query_as::<_, SourceSummaryRow>(
        "SELECT lead_source_id, display_name, total_leads, matched_leads, review_leads, unmatched_leads
         FROM v_source_summary WHERE tenant_id = $1 ORDER BY display_name",
    )
    .bind(tenant_id)
    .fetch_all(pool)
    .await
}

#[derive(Debug, Clone, FromRow, serde::Serialize)]
pub struct TeamSummaryRow {
    pub team_id: Uuid,
    pub team_name: String,
    pub matched_leads: i64,
}

pub async fn team_summary(pool: &PgPool, tenant_id: Uuid) -> sqlx::Result<Vec<TeamSummaryRow>> {
    sqlx::query_as::<_, TeamSummaryRow>(
        "SELECT team_id, team_name, matched_leads
         FROM v_team_summary WHERE tenant_id = $1 ORDER BY team_name",
    )
    .bind(tenant_id)
    .fetch_all(pool)
    .await
}

#[derive(Debug, Clone, FromRow, serde::Serialize)]
pub struct AgentSummaryRow {
    pub agent_id: Uuid,
    pub agent_name: String,
    pub team_id: Option<Uuid>,
    pub matched_leads: i64,
}

pub async fn agent_summary(pool: &PgPool, tenant_id: Uuid) -> sqlx::Result<Vec<AgentSummaryRow>> {
    sqlx::query_as::<_, AgentSummaryRow>(
        "SELECT agent_id, agent_name, team_id, matched_leads
         FROM v_agent_summary WHERE tenant_id = $1 ORDER BY agent_name",
    )
    .bind(tenant_id)
    .fetch_all(pool)
    .await
}

#[derive(Debug, Clone, FromRow, serde::Serialize)]
pub struct IngestionSummaryRow {
    pub batch_id: Uuid,
    pub lead_source_id: Uuid,
    pub status: String,
    pub received_at: DateTime<Utc>,
    pub total_rows: i64,
    pub valid_rows: i64,
    pub duplicate_rows: i64,
    pub error_rows: i64,
}

pub async fn ingestion_summary(
    pool: &PgPool,
    tenant_id: Uuid,
    limit: i64,
) -> sqlx::Result<Vec<IngestionSummaryRow>> {
    sqlx::query_as::<_, IngestionSummaryRow>(
        "SELECT batch_id, lead_source_id, status, received_at, total_rows, valid_rows,
                duplicate_rows, error_rows
         FROM v_ingestion_summary WHERE tenant_id = $1
         ORDER BY received_at DESC LIMIT $2",
    )
    .bind(tenant_id)
    .bind(limit)
    .fetch_all(pool)
    .await
}

#[derive(Debug, Clone, FromRow, serde::Serialize)]
pub struct ReviewQueueRow {
    pub match_candidate_id: Uuid,
    pub canonical_lead_id: Uuid,
    pub crm_lead_id: Uuid,
    pub confidence_score: f64,
    pub status: String,
    pub expires_at: DateTime<Utc>,
}

pub async fn review_queue(
    pool: &PgPool,
    tenant_id: Uuid,
    limit: i64,
) -> sqlx::Result<Vec<ReviewQueueRow>> {
    sqlx::query_as::<_, ReviewQueueRow>(
        "SELECT match_candidate_id, canonical_lead_id, crm_lead_id, confidence_score, status, expires_at
         FROM v_review_queue WHERE tenant_id = $1
         ORDER BY confidence_score DESC LIMIT $2",
    )
    .bind(tenant_id)
    .bind(limit)
    .fetch_all(pool)
    .await
}
