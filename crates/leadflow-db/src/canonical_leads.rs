//! `CanonicalLead` rows - the normalized external lead.

use chrono::{DateTime, Utc};
use leadflow_core::model::{CanonicalLead, Embedding, MatchStatus};
use sqlx::types::Json;
use sqlx::FromRow;
use sqlx::PgPool;
use std::collections::BTreeMap;
use std::str::FromStr;
use uuid::Uuid;

#[derive(Debug, Clone, FromRow)]
struct CanonicalLeadRow {
    id: Uuid,
    tenant_id: Uuid,
    lead_source_id: Uuid,
    first_name: Option<String>,
    last_name: Option<String>,
    email: Option<String>,
    email_normalized: Option<String>,
    phone: Option<String>,
    phone_normalized: Option<String>,
    address: Option<String>,
    address_normalized: Option<String>,
    lead_type: Option<String>,
    source_record_id: Option<String>,
    source_created_at: Option<DateTime<Utc>>,
    match_status: String,
    match_confidence: Option<f64>,
    embedding: Option<Vec<f64>>,
    embedded_at: Option<DateTime<Utc>>,
    raw_data: Json<BTreeMap<String, String>>,
}

impl From<CanonicalLeadRow> for CanonicalLead {
    fn from(row: CanonicalLeadRow) -> Self {
        CanonicalLead {
            id: row.id,
            tenant_id: row.tenant_id,
            lead_source_id: row.lead_source_id,
            first_name: row.first_name,
            last_name: row.last_name,
            email: row.email,
            email_normalized: row.email_normalized,
            phone: row.phone,
            phone_normalized: row.phone_normalized,
            address: row.address,
            address_normalized: row.address_normalized,
            lead_type: row.lead_type,
            source_record_id: row.source_record_id,
            source_created_at: row.source_created_at,
            match_status: MatchStatus::from_str(&row.match_status).unwrap_or(MatchStatus::Pending),
            match_confidence: row.match_confidence,
            embedding: row.embedding.map(Embedding),
            embedded_at: row.embedded_at,
            raw_data: row.raw_data.0,
        }
    }
}

const SELECT_COLUMNS: &str = "id, tenant_id, lead_source_id, first_name, last_name, email, \
     email_normalized, phone, phone_normalized, address, address_normalized, lead_type, \
     source_record_id, source_created_at, match_status, match_confidence, embedding, \
     embedded_at, raw_data";

/// Everything the Transformer needs to insert one canonical lead.
pub struct NewCanonicalLead {
    pub tenant_id: Uuid,
    pub lead_source_id: Uuid,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub email_normalized: Option<String>,
    pub phone: Option<String>,
    pub phone_normalized: Option<String>,
    pub address: Option<String>,
    pub address_normalized: Option<String>,
    pub lead_type: Option<String>,
    pub source_record_id: Option<String>,
    pub source_created_at: Option<DateTime<Utc>>,
    pub raw_data: BTreeMap<String, String>,
}

pub async fn insert(pool: &PgPool, lead: &NewCanonicalLead) -> sqlx::Result<CanonicalLead> {
    let row = sqlx::query_as::<_, CanonicalLeadRow>(&format!(
        "INSERT INTO canonical_leads (
             tenant_id, lead_source_id, first_name, last_name, email, email_normalized,
             phone, phone_normalized, address, address_normalized, lead_type,
             source_record_id, source_created_at, raw_data
         ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
         RETURNING {SELECT_COLUMNS}"
    ))
    .bind(lead.tenant_id)
    .bind(lead.lead_source_id)
    .bind(&lead.first_name)
    .bind(&lead.last_name)
    .bind(&lead.email)
    .bind(&lead.email_normalized)
    .bind(&lead.phone)
    .bind(&lead.phone_normalized)
    .bind(&lead.address)
    .bind(&lead.address_normalized)
    .bind(&lead.lead_type)
    .bind(&lead.source_record_id)
    .bind(lead.source_created_at)
    .bind(Json(&lead.raw_data))
    .fetch_one(pool)
    .await?;
    Ok(row.into())
}

/// Dedup lookup: an existing canonical lead for this
/// `(tenant, source, email_normalized)`, if any.
pub async fn find_by_tenant_source_email(
    pool: &PgPool,
    tenant_id: Uuid,
    lead_source_id: Uuid,
    email_normalized: &str,
) -> sqlx::Result<Option<CanonicalLead>> {
    let row = sqlx::query_as::<_, CanonicalLeadRow>(&format!(
        "SELECT {SELECT_COLUMNS} FROM canonical_leads
         WHERE tenant_id = $1 AND lead_source_id = $2 AND email_normalized = $3
         ORDER BY created_at LIMIT 1"
    ))
    .bind(tenant_id)
    .bind(lead_source_id)
    .bind(email_normalized)
    .fetch_optional(pool)
    .await?;
    Ok(row.map(Into::into))
}

pub async fn get(pool: &PgPool, id: Uuid) -> sqlx::Result<Option<CanonicalLead>> {
    let row = sqlx::query_as::<_, CanonicalLeadRow>(&format!(
        "SELECT {SELECT_COLUMNS} FROM canonical_leads WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?;
    Ok(row.map(Into::into))
}

/// Canonical leads in `pending`, newly handed off from the Transformer to
/// the Matcher. Leads already in `review`/`multiple` are re-scored too, so
/// this is a read, not a claim - the Matcher does not hold these rows
/// exclusively while scoring.
pub async fn claim_pending_for_match(pool: &PgPool, limit: i64) -> sqlx::Result<Vec<CanonicalLead>> {
    let rows = sqlx::query_as::<_, CanonicalLeadRow>(&format!(
        "SELECT {SELECT_COLUMNS} FROM canonical_leads
         WHERE match_status IN ('pending', 'review', 'multiple')
         ORDER BY created_at LIMIT $1"
    ))
    .bind(limit)
    .fetch_all(pool)
    .await?;
    Ok(rows.into_iter().map(Into::into).collect())
}

/// CRM corpus for a tenant, passed to the Scorer.
pub async fn crm_corpus_for_tenant(
    pool: &PgPool,
    tenant_id: Uuid,
) -> sqlx::Result<Vec<leadflow_core::model::CrmLead>> {
    crate::crm_leads::list_for_tenant(pool, tenant_id).await
}

/// Writes a completed embedding task's result onto its owning row:
/// `embedding`, `embedded_at` and `embedding_text`.
pub async fn set_embedding(
    pool: &PgPool,
    id: Uuid,
    embedding: &[f64],
    embedding_text: &str,
) -> sqlx::Result<()> {
    sqlx::query(
        "UPDATE canonical_leads SET embedding = $2, embedding_text = $3, embedded_at = now()
         WHERE id = $1",
    )
    .bind(id)
    .bind(embedding)
    .bind(embedding_text)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn set_match_status(
    pool: &PgPool,
    id: Uuid,
    status: MatchStatus,
    confidence: Option<f64>,
) -> sqlx::Result<()> {
    sqlx::query("UPDATE canonical_leads SET match_status = $2, match_confidence = $3 WHERE id = $1")
        .bind(id)
        .bind(status.to_string())
        .bind(confidence)
        .execute(pool)
        .await?;
    Ok(())
}
