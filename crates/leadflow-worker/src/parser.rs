//! The CSV row parser half of the pipeline: claims batches in
//! `pending`, reads the staged bytes back from blob storage, parses and
//! validates every row, and writes `raw_rows`.

use leadflow_connectors::blob::BlobStore;
use leadflow_connectors::csv_parser::parse_csv;
use leadflow_core::model::{Batch, BatchStatus};
use leadflow_db::raw_rows::NewRawRow;
use serde_json::json;
use sqlx::PgPool;

#[derive(Debug, Default)]
pub struct ParseStats {
    pub batches_processed: usize,
    pub rows_parsed: i64,
    pub rows_valid: i64,
    pub rows_invalid: i64,
}

/// Claims up to `limit` pending batches and parses each one in turn.
/// One batch's parse failure does not stop the others - it is recorded
/// on that batch and the loop continues.
pub async fn run_once(
    pool: &PgPool,
    blob_store: &dyn BlobStore,
    limit: i64,
) -> anyhow::Result<ParseStats> {
    let batches = leadflow_db::batches::claim_pending_for_parse(pool, limit).await?;
    let mut stats = ParseStats::default();

    for batch in batches {
        match parse_one(pool, blob_store, &batch).await {
            Ok((valid, invalid)) => {
                stats.batches_processed += 1;
                stats.rows_parsed += valid + invalid;
                stats.rows_valid += valid;
                stats.rows_invalid += invalid;
            }
            Err(e) => {
                tracing::error!(batch_id = %batch.id, error = %e, "batch parse failed");
                leadflow_db::batches::append_error(
                    pool,
                    batch.id,
                    json!({ "event": "parse_failed", "error": e.to_string() }),
                )
                .await?;
                leadflow_db::batches::set_status(pool, batch.id, BatchStatus::Failed).await?;
            }
        }
    }

    Ok(stats)
}

async fn parse_one(
    pool: &PgPool,
    blob_store: &dyn BlobStore,
    batch: &Batch,
) -> anyhow::Result<(i64, i64)> {
    let lead_source = leadflow_db::lead_sources::get(pool, batch.lead_source_id)
        .await?
        .ok_or_else(|| anyhow::anyhow!("lead source {} not found", batch.lead_source_id))?;

    let bytes = blob_store.get(&batch.file_ref).await?;
    let parsed_rows = parse_csv(&bytes, &lead_source.csv_config)?;

    let mut new_rows = Vec::with_capacity(parsed_rows.len());
    let mut valid_count: i64 = 0;
    let mut invalid_count: i64 = 0;

    for row in &parsed_rows {
        let mapped = leadflow_recipe::field_resolver::resolve_row_values(
            &lead_source.field_mapping,
            &row.columns,
        );
        let errors = leadflow_recipe::row_validation::validate_row(
            &mapped,
            &lead_source.validation_rules,
        );
        let is_valid = errors.is_empty();
        if is_valid {
            valid_count += 1;
        } else {
            invalid_count += 1;
        }

        new_rows.push(NewRawRow {
            row_number: row.row_number,
            raw_data: mapped,
            is_valid,
            validation_errors: errors,
        });
    }

    leadflow_db::raw_rows::insert_batch(pool, batch.id, &new_rows).await?;

    let total = new_rows.len() as i64;
    leadflow_db::batches::set_parse_counters(
        pool,
        batch.id,
        total,
        total,
        valid_count,
        invalid_count,
    )
    .await?;

    leadflow_db::batches::set_status(pool, batch.id, BatchStatus::Parsed).await?;
    leadflow_db::batches::append_log(
        pool,
        batch.id,
        json!({ "event": "parsed", "total": total, "valid": valid_count, "invalid": invalid_count }),
    )
    .await?;

    Ok((valid_count, invalid_count))
}
