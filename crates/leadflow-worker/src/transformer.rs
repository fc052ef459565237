//! The Transformer: claims batches in `parsed`, turns each valid
//! `RawRow` into a `CanonicalLead`, de-duplicates within `(tenant, source,
//! email)`, and enqueues the result for embedding.

use leadflow_core::model::BatchStatus;
use leadflow_db::canonical_leads::NewCanonicalLead;
use serde_json::json;
use sqlx::PgPool;
use uuid::Uuid;

use crate::date_parse::parse_source_created_at;

#[derive(Debug, Default)]
pub struct TransformStats {
    pub batches_processed: usize,
    pub leads_created: i64,
    pub duplicates: i64,
}

const EMBEDDING_TABLE: &str = "canonical_leads";

/// Claims up to `limit` batches in `parsed` and transforms each one.
pub async fn run_once(
    pool: &PgPool,
    lineage: &leadflow_evidence::LineageRecorder,
    limit: i64,
) -> anyhow::Result<TransformStats> {
    let batches = leadflow_db::batches::claim_parsed_for_transform(pool, limit).await?;
    let mut stats = TransformStats::default();

    for batch in batches {
        match transform_one(pool, lineage, &batch).await {
            Ok((created, duplicates, had_errors)) => {
                stats.batches_processed += 1;
                stats.leads_created += created;
                stats.duplicates += duplicates;

                let status = if had_errors {
                    BatchStatus::Partial
                } else {
                    BatchStatus::Completed
                };
                leadflow_db::batches::set_status(pool, batch.id, status).await?;
                leadflow_db::batches::append_log(
                    pool,
                    batch.id,
                    json!({ "event": "transformed", "created": created, "duplicates": duplicates }),
                )
                .await?;
            }
            Err(e) => {
                tracing::error!(batch_id = %batch.id, error = %e, "batch transform failed");
                leadflow_db::batches::append_error(
                    pool,
                    batch.id,
                    json!({ "event": "transform_failed", "error": e.to_string() }),
                )
                .await?;
                leadflow_db::batches::set_status(pool, batch.id, BatchStatus::Failed).await?;
            }
        }
    }

    Ok(stats)
}

async fn transform_one(
    pool: &PgPool,
    lineage: &leadflow_evidence::LineageRecorder,
    batch: &leadflow_core::model::Batch,
) -> anyhow::Result<(i64, i64, bool)> {
    let lead_source = leadflow_db::lead_sources::get(pool, batch.lead_source_id)
        .await?
        .ok_or_else(|| anyhow::anyhow!("lead source {} not found", batch.lead_source_id))?;

    let rows = leadflow_db::raw_rows::pending_for_transform(pool, batch.id).await?;

    let mut created = 0i64;
    let mut duplicates = 0i64;
    let mut had_errors = false;

    for row in rows {
        match transform_row(pool, lineage, batch.tenant_id, batch.lead_source_id, &lead_source, &row).await {
            Ok(TransformOutcome::Created) => created += 1,
            Ok(TransformOutcome::Duplicate) => {
                leadflow_db::batches::increment_duplicate(pool, batch.id).await?;
                duplicates += 1;
            }
            Err(e) => {
                tracing::warn!(row_id = %row.id, error = %e, "row transform failed");
                leadflow_db::batches::append_error(
                    pool,
                    batch.id,
                    json!({ "event": "row_transform_failed", "row_id": row.id, "error": e.to_string() }),
                )
                .await?;
                had_errors = true;
            }
        }
    }

    Ok((created, duplicates, had_errors))
}

enum TransformOutcome {
    Created,
    Duplicate,
}

async fn transform_row(
    pool: &PgPool,
    lineage: &leadflow_evidence::LineageRecorder,
    tenant_id: Uuid,
    lead_source_id: Uuid,
    lead_source: &leadflow_core::model::LeadSource,
    row: &leadflow_core::model::RawRow,
) -> anyhow::Result<TransformOutcome> {
    let mapped = &row.raw_data;

    let email = mapped.get("email").cloned();
    let email_normalized = email
        .as_deref()
        .and_then(leadflow_core::normalize::normalize_email);

    if let Some(normalized) = &email_normalized {
        if let Some(existing) = leadflow_db::canonical_leads::find_by_tenant_source_email(
            pool,
            tenant_id,
            lead_source_id,
            normalized,
        )
        .await?
        {
            leadflow_db::raw_rows::mark_duplicate(pool, row.id, existing.id).await?;
            return Ok(TransformOutcome::Duplicate);
        }
    }

    let phone = mapped.get("phone").cloned();
    let phone_normalized = phone
        .as_deref()
        .map(leadflow_core::normalize::normalize_phone);

    let address = mapped.get("address").cloned();
    let address_normalized = address
        .as_deref()
        .and_then(leadflow_core::normalize::normalize_address);

    let source_created_at = mapped
        .get("created_at")
        .and_then(|raw| parse_source_created_at(raw, &lead_source.csv_config.date_format));

    let new_lead = NewCanonicalLead {
        tenant_id,
        lead_source_id,
        first_name: mapped.get("first_name").cloned(),
        last_name: mapped.get("last_name").cloned(),
        email,
        email_normalized,
        phone,
        phone_normalized,
        address,
        address_normalized,
        lead_type: mapped.get("lead_type").cloned(),
        source_record_id: mapped.get("source_record_id").cloned(),
        source_created_at,
        raw_data: mapped.clone(),
    };

    let canonical = leadflow_db::canonical_leads::insert(pool, &new_lead).await?;

    lineage
        .record_create(
            tenant_id,
            "raw_rows",
            row.id,
            "canonical_leads",
            canonical.id,
            "normalize",
            json!({ "lead_source_id": lead_source_id }),
        )
        .await?;

    let embedding_text = embedding_text_for(&canonical);
    leadflow_db::embedding_tasks::enqueue(pool, EMBEDDING_TABLE, canonical.id, &embedding_text)
        .await?;
    leadflow_db::raw_rows::link_canonical(pool, row.id, canonical.id).await?;

    Ok(TransformOutcome::Created)
}

/// The text handed to the embedding provider for one canonical lead -
/// every identity field joined with a space, skipping absent ones.
fn embedding_text_for(lead: &leadflow_core::model::CanonicalLead) -> String {
    [
        lead.first_name.as_deref(),
        lead.last_name.as_deref(),
        lead.email.as_deref(),
        lead.phone.as_deref(),
        lead.address.as_deref(),
        lead.lead_type.as_deref(),
    ]
    .into_iter()
    .flatten()
    .collect::<Vec<_>>()
    .join(" ")
}
