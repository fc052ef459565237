//! `RawRow` rows - one CSV row as originally received.

use leadflow_core::model::RawRow;
use serde_json::Value;
use sqlx::types::Json;
use sqlx::FromRow;
use sqlx::PgPool;
use std::collections::BTreeMap;
use uuid::Uuid;

#[derive(Debug, Clone, FromRow)]
struct RawRowRow {
    id: Uuid,
    batch_id: Uuid,
    row_number: i64,
    raw_data: Json<BTreeMap<String, String>>,
    is_valid: bool,
    validation_errors: Json<Vec<String>>,
    is_duplicate: bool,
    duplicate_of: Option<Uuid>,
    canonical_lead_id: Option<Uuid>,
}

impl From<RawRowRow> for RawRow {
    fn from(row: RawRowRow) -> Self {
        RawRow {
            id: row.id,
            batch_id: row.batch_id,
            row_number: row.row_number,
            raw_data: row.raw_data.0,
            is_valid: row.is_valid,
            validation_errors: row.validation_errors.0,
            is_duplicate: row.is_duplicate,
            duplicate_of: row.duplicate_of,
            canonical_lead_id: row.canonical_lead_id,
        }
    }
}

const SELECT_COLUMNS: &str = "id, batch_id, row_number, raw_data, is_valid, validation_errors, \
     is_duplicate, duplicate_of, canonical_lead_id";

/// One row parsed from a CSV, inserted during the parse step.
pub struct NewRawRow {
    pub row_number: i64,
    pub raw_data: BTreeMap<String, String>,
    pub is_valid: bool,
    pub validation_errors: Vec<String>,
}

/// Bulk-inserts every row of a parsed batch in one round trip. Rows are
/// `UNNEST`ed rather than inserted one at a time - the batch may have
/// thousands of rows and this is a one-shot write, not a claim loop.
pub async fn insert_batch(
    pool: &PgPool,
    batch_id: Uuid,
    rows: &[NewRawRow],
) -> sqlx::Result<Vec<RawRow>> {
    if rows.is_empty() {
        return Ok(vec![]);
    }

    let row_numbers: Vec<i64> = rows.iter().map(|r| r.row_number).collect();
    let raw_datas: Vec<Value> = rows
        .iter()
        .map(|r| serde_json::to_value(&r.raw_data).unwrap_or(Value::Null))
        .collect();
    let is_valids: Vec<bool> = rows.iter().map(|r| r.is_valid).collect();
    let validation_errors: Vec<Value> = rows
        .iter()
        .map(|r| serde_json::to_value(&r.validation_errors).unwrap_or(Value::Null))
        .collect();

    let out = sqlx::query_as::<_, RawRowRow>(&format!(
        "INSERT INTO raw_rows (batch_id, row_number, raw_data, is_valid, validation_errors)
         SELECT $1, * FROM UNNEST($2::bigint[], $3::jsonb[], $4::bool[], $5::jsonb[])
         RETURNING {SELECT_COLUMNS}"
    ))
    .bind(batch_id)
    .bind(&row_numbers)
    .bind(&raw_datas)
    .bind(&is_valids)
    .bind(&validation_errors)
    .fetch_all(pool)
    .await?;

    Ok(out.into_iter().map(Into::into).collect())
}

/// Rows of a batch still awaiting transform (`is_valid` and not yet
/// linked to a canonical lead), ordered by `row_number` to preserve
/// within-batch ordering.
pub async fn pending_for_transform(pool: &PgPool, batch_id: Uuid) -> sqlx::Result<Vec<RawRow>> {
    let rows = sqlx::query_as::<_, RawRowRow>(&format!(
        "SELECT {SELECT_COLUMNS} FROM raw_rows
         WHERE batch_id = $1 AND is_valid = true AND canonical_lead_id IS NULL
           AND is_duplicate = false
         ORDER BY row_number"
    ))
    .bind(batch_id)
    .fetch_all(pool)
    .await?;
    Ok(rows.into_iter().map(Into::into).collect())
}

pub async fn mark_duplicate(pool: &PgPool, id: Uuid, duplicate_of: Uuid) -> sqlx::Result<()> {
    sqlx::query("UPDATE raw_rows SET is_duplicate = true, duplicate_of = $2 WHERE id = $1")
        .bind(id)
        .bind(duplicate_of)
        .execute(pool)
        .await?;
    Ok(())
}

pub async fn link_canonical(pool: &PgPool, id: Uuid, canonical_lead_id: Uuid) -> sqlx::Result<()> {
    sqlx::query("UPDATE raw_rows SET canonical_lead_id = $2 WHERE id = $1")
        .bind(id)
        .bind(canonical_lead_id)
        .execute(pool)
        .await?;
    Ok(())
}
