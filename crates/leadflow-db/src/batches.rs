//! `Batch` rows - one received CSV and its processing state.

use chrono::{DateTime, Utc};
use leadflow_core::model::{Batch, BatchCounters, BatchStatus};
use serde_json::Value;
use sqlx::types::Json;
use sqlx::FromRow;
use sqlx::PgPool;
use std::str::FromStr;
use uuid::Uuid;

#[derive(Debug, Clone, FromRow)]
struct BatchRow {
    id: Uuid,
    tenant_id: Uuid,
    lead_source_id: Uuid,
    file_ref: String,
    file_hash: String,
    received_at: DateTime<Utc>,
    status: String,
    total_rows: i64,
    parsed_rows: i64,
    valid_rows: i64,
    duplicate_rows: i64,
    error_rows: i64,
    log: Json<Vec<Value>>,
    errors: Json<Vec<Value>>,
}

impl From<BatchRow> for Batch {
    fn from(row: BatchRow) -> Self {
        Batch {
            id: row.id,
            tenant_id: row.tenant_id,
            lead_source_id: row.lead_source_id,
            file_ref: row.file_ref,
            file_hash: row.file_hash,
            received_at: row.received_at,
            status: BatchStatus::from_str(&row.status).unwrap_or(BatchStatus::Pending),
            counters: BatchCounters {
                total: row.total_rows,
                parsed: row.parsed_rows,
                valid: row.valid_rows,
                duplicate: row.duplicate_rows,
                error: row.error_rows,
            },
            log: row.log.0,
            errors: row.errors.0,
        }
    }
}

const SELECT_COLUMNS: &str = "id, tenant_id, lead_source_id, file_ref, file_hash, received_at, \
     status, total_rows, parsed_rows, valid_rows, duplicate_rows, error_rows, log, errors";

/// Inserts a new batch in `pending`. Callers must first check
/// [`find_by_hash`] to preserve the idempotent-staging invariant -
/// this function does not itself enforce the `(tenant_id, file_hash)`
/// uniqueness beyond the database constraint.
pub async fn create(
    pool: &PgPool,
    tenant_id: Uuid,
    lead_source_id: Uuid,
    file_ref: &str,
    file_hash: &str,
) -> sqlx::Result<Batch> {
    let row = sqlx::query_as::<_, BatchRow>(&format!(
        "INSERT INTO batches (tenant_id, lead_source_id, file_ref, file_hash)
         VALUES ($1, $2, $3, $4)
         RETURNING {SELECT_COLUMNS}"
    ))
    .bind(tenant_id)
    .bind(lead_source_id)
    .bind(file_ref)
    .bind(file_hash)
    .fetch_one(pool)
    .await?;
    Ok(row.into())
}

/// The read half of idempotent staging: a batch already exists for this
/// `(tenant, file_hash)` pair, so staging it again is a pure read.
pub async fn find_by_hash(
    pool: &PgPool,
    tenant_id: Uuid,
    file_hash: &str,
) -> sqlx::Result<Option<Batch>> {
    let row = sqlx::query_as::<_, BatchRow>(&format!(
        "SELECT {SELECT_COLUMNS} FROM batches WHERE tenant_id = $1 AND file_hash = $2"
    ))
    .bind(tenant_id)
    .bind(file_hash)
    .fetch_optional(pool)
    .await?;
    Ok(row.map(Into::into))
}

pub async fn get(pool: &PgPool, id: Uuid) -> sqlx::Result<Option<Batch>> {
    let row = sqlx::query_as::<_, BatchRow>(&format!(
        "SELECT {SELECT_COLUMNS} FROM batches WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?;
    Ok(row.map(Into::into))
}

/// Claims up to `limit` batches in `pending` for the parse step.
pub async fn claim_pending_for_parse(pool: &PgPool, limit: i64) -> sqlx::Result<Vec<Batch>> {
    let rows: Vec<BatchRow> = crate::claim::claim_batch(
        pool,
        &crate::claim::ClaimSpec {
            table: "batches",
            status_column: "status",
            pending_value: "pending",
            claimed_value: "processing",
            extra_predicate: "true",
            order_by: "received_at",
            limit,
        },
    )
    .await?;
    Ok(rows.into_iter().map(Into::into).collect())
}

/// Claims up to `limit` batches in `parsed` for the transform step.
pub async fn claim_parsed_for_transform(pool: &PgPool, limit: i64) -> sqlx::Result<Vec<Batch>> {
    let rows: Vec<BatchRow> = crate::claim::claim_batch(
        pool,
        &crate::claim::ClaimSpec {
            table: "batches",
            status_column: "status",
            pending_value: "parsed",
            claimed_value: "transforming",
            extra_predicate: "true",
            order_by: "received_at",
            limit,
        },
    )
    .await?;
    Ok(rows.into_iter().map(Into::into).collect())
}

pub async fn set_status(pool: &PgPool, id: Uuid, status: BatchStatus) -> sqlx::Result<()> {
    let terminal = matches!(
        status,
        BatchStatus::Completed | BatchStatus::Failed | BatchStatus::Partial
    );
    sqlx::query(
        "UPDATE batches SET status = $2, updated_at = now(),
         completed_at = CASE WHEN $3 THEN now() ELSE completed_at END
         WHERE id = $1",
    )
    .bind(id)
    .bind(status.to_string())
    .bind(terminal)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn set_parse_counters(
    pool: &PgPool,
    id: Uuid,
    total: i64,
    parsed: i64,
    valid: i64,
    error: i64,
) -> sqlx::Result<()> {
    sqlx::query(
        "UPDATE batches SET total_rows = $2, parsed_rows = $3, valid_rows = $4, error_rows = $5,
         updated_at = now()
         WHERE id = $1",
    )
    .bind(id)
    .bind(total)
    .bind(parsed)
    .bind(valid)
    .bind(error)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn increment_duplicate(pool: &PgPool, id: Uuid) -> sqlx::Result<()> {
    sqlx::query("UPDATE batches SET duplicate_rows = duplicate_rows + 1, updated_at = now() WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(())
}

pub async fn append_log(pool: &PgPool, id: Uuid, entry: Value) -> sqlx::Result<()> {
    sqlx::query("UPDATE batches SET log = log || $2::jsonb, updated_at = now() WHERE id = $1")
        .bind(id)
        .bind(Json(vec![entry]))
        .execute(pool)
        .await?;
    Ok(())
}

pub async fn append_error(pool: &PgPool, id: Uuid, entry: Value) -> sqlx::Result<()> {
    sqlx::query("UPDATE batches SET errors = errors || $2::jsonb, updated_at = now() WHERE id = $1")
        .bind(id)
        .bind(Json(vec![entry]))
        .execute(pool)
        .await?;
    Ok(())
}

/// Reclaims batches stuck in `processing` or `transforming` past
/// `timeout_seconds`, returning them to the status they were claimed from
/// so the stage that owns it re-claims the work.
pub async fn reap_stale_processing(pool: &PgPool, timeout_seconds: i64) -> sqlx::Result<u64> {
    let reclaimed_parse = crate::claim::reap_stale(
        pool,
        "batches",
        "status",
        "processing",
        "pending",
        "updated_at",
        timeout_seconds,
    )
    .await?;
    let reclaimed_transform = crate::claim::reap_stale(
        pool,
        "batches",
        "status",
        "transforming",
        "parsed",
        "updated_at",
        timeout_seconds,
    )
    .await?;
    Ok(reclaimed_parse + reclaimed_transform)
}
