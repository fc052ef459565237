//! `CrmLead` rows - the mirrored CRM person.

use chrono::{DateTime, Utc};
use leadflow_core::model::{CrmLead, Embedding};
use sqlx::types::Json;
use sqlx::FromRow;
use sqlx::PgPool;
use uuid::Uuid;

#[derive(Debug, Clone, FromRow)]
struct CrmLeadRow {
    id: Uuid,
    tenant_id: Uuid,
    crm_connection_id: Uuid,
    external_id: String,
    first_name: Option<String>,
    last_name: Option<String>,
    email: Option<String>,
    email_normalized: Option<String>,
    phone: Option<String>,
    phone_normalized: Option<String>,
    address: Option<String>,
    address_normalized: Option<String>,
    assigned_user_id: Option<String>,
    assigned_user_name: Option<String>,
    stage: Option<String>,
    source: Option<String>,
    tags: Json<Vec<String>>,
    sync_hash: String,
    embedding: Option<Vec<f64>>,
    last_synced_at: DateTime<Utc>,
}

impl From<CrmLeadRow> for CrmLead {
    fn from(row: CrmLeadRow) -> Self {
        CrmLead {
            id: row.id,
            tenant_id: row.tenant_id,
            crm_connection_id: row.crm_connection_id,
            external_id: row.external_id,
            first_name: row.first_name,
            last_name: row.last_name,
            email: row.email,
            email_normalized: row.email_normalized,
            phone: row.phone,
            phone_normalized: row.phone_normalized,
            address: row.address,
            address_normalized: row.address_normalized,
            assigned_user_id: row.assigned_user_id,
            assigned_user_name: row.assigned_user_name,
            stage: row.stage,
            source: row.source,
            tags: row.tags.0,
            sync_hash: row.sync_hash,
            embedding: row.embedding.map(Embedding),
            last_synced_at: row.last_synced_at,
        }
    }
}

const SELECT_COLUMNS: &str = "id, tenant_id, crm_connection_id, external_id, first_name, \
     last_name, email, email_normalized, phone, phone_normalized, address, address_normalized, \
     assigned_user_id, assigned_user_name, stage, source, tags, sync_hash, embedding, \
     last_synced_at";

pub async fn list_for_tenant(pool: &PgPool, tenant_id: Uuid) -> sqlx::Result<Vec<CrmLead>> {
    let rows = sqlx::query_as::<_, CrmLeadRow>(&format!(
        "SELECT {SELECT_COLUMNS} FROM crm_leads WHERE tenant_id = $1"
    ))
    .bind(tenant_id)
    .fetch_all(pool)
    .await?;
    Ok(rows.into_iter().map(Into::into).collect())
}

pub async fn get(pool: &PgPool, id: Uuid) -> sqlx::Result<Option<CrmLead>> {
    let row = sqlx::query_as::<_, CrmLeadRow>(&format!(
        "SELECT {SELECT_COLUMNS} FROM crm_leads WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?;
    Ok(row.map(Into::into))
}

pub async fn find_by_external_id(
    pool: &PgPool,
    crm_connection_id: Uuid,
    external_id: &str,
) -> sqlx::Result<Option<CrmLead>> {
    let row = sqlx::query_as::<_, CrmLeadRow>(&format!(
        "SELECT {SELECT_COLUMNS} FROM crm_leads WHERE crm_connection_id = $1 AND external_id = $2"
    ))
    .bind(crm_connection_id)
    .bind(external_id)
    .fetch_optional(pool)
    .await?;
    Ok(row.map(Into::into))
}

/// One record as mapped from the CRM's wire shape, ready to upsert.
pub struct CrmLeadUpsert {
    pub tenant_id: Uuid,
    pub crm_connection_id: Uuid,
    pub external_id: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub email_normalized: Option<String>,
    pub phone: Option<String>,
    pub phone_normalized: Option<String>,
    pub address: Option<String>,
    pub address_normalized: Option<String>,
    pub assigned_user_id: Option<String>,
    pub assigned_user_name: Option<String>,
    pub stage: Option<String>,
    pub source: Option<String>,
    pub tags: Vec<String>,
    pub sync_hash: String,
}

/// The outcome of one upsert, used to decide whether to enqueue the row
/// for embedding.
pub enum UpsertOutcome {
    Inserted(CrmLead),
    Updated(CrmLead),
    Unchanged(CrmLead),
}

/// Upserts on `(crm_connection_id, external_id)`. Updates only apply when
/// the incoming `sync_hash` differs from the stored one - an unchanged
/// record is still returned (as `Unchanged`) so the caller can accumulate
/// `fetched` counts without re-touching the row.
pub async fn upsert(pool: &PgPool, rec: &CrmLeadUpsert) -> sqlx::Result<UpsertOutcome> {
    if let Some(existing) = find_by_external_id(pool, rec.crm_connection_id, &rec.external_id).await? {
        if existing.sync_hash == rec.sync_hash {
            return Ok(UpsertOutcome::Unchanged(existing));
        }
        let row = sqlx::query_as::<_, CrmLeadRow>(&format!(
            "UPDATE crm_leads SET
                 first_name = $2, last_name = $3, email = $4, email_normalized = $5,
                 phone = $6, phone_normalized = $7, address = $8, address_normalized = $9,
                 assigned_user_id = $10, assigned_user_name = $11, stage = $12, source = $13,
                 tags = $14, sync_hash = $15, last_synced_at = now()
             WHERE id = $1
             RETURNING {SELECT_COLUMNS}"
        ))
        .bind(existing.id)
        .bind(&rec.first_name)
        .bind(&rec.last_name)
        .bind(&rec.email)
        .bind(&rec.email_normalized)
        .bind(&rec.phone)
        .bind(&rec.phone_normalized)
        .bind(&rec.address)
        .bind(&rec.address_normalized)
        .bind(&rec.assigned_user_id)
        .bind(&rec.assigned_user_name)
        .bind(&rec.stage)
        .bind(&rec.source)
        .bind(Json(&rec.tags))
        .bind(&rec.sync_hash)
        .fetch_one(pool)
        .await?;
        return Ok(UpsertOutcome::Updated(row.into()));
    }

    let row = sqlx::query_as::<_, CrmLeadRow>(&format!(
        "INSERT INTO crm_leads (
             tenant_id, crm_connection_id, external_id, first_name, last_name, email,
             email_normalized, phone, phone_normalized, address, address_normalized,
             assigned_user_id, assigned_user_name, stage, source, tags, sync_hash
         ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17)
         RETURNING {SELECT_COLUMNS}"
    ))
    .bind(rec.tenant_id)
    .bind(rec.crm_connection_id)
    .bind(&rec.external_id)
    .bind(&rec.first_name)
    .bind(&rec.last_name)
    .bind(&rec.email)
    .bind(&rec.email_normalized)
    .bind(&rec.phone)
    .bind(&rec.phone_normalized)
    .bind(&rec.address)
    .bind(&rec.address_normalized)
    .bind(&rec.assigned_user_id)
    .bind(&rec.assigned_user_name)
    .bind(&rec.stage)
    .bind(&rec.source)
    .bind(Json(&rec.tags))
    .bind(&rec.sync_hash)
    .fetch_one(pool)
    .await?;

    Ok(UpsertOutcome::Inserted(row.into()))
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
        "UPDATE crm_leads SET embedding = $2, embedding_text = $3, embedded_at = now()
         WHERE id = $1",
    )
    .bind(id)
    .bind(embedding)
    .bind(embedding_text)
    .execute(pool)
    .await?;
    Ok(())
}
