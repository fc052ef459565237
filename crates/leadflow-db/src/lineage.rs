//! `LineageEntry` rows - the append-only transformation audit trail.

use chrono::{DateTime, Utc};
use leadflow_core::model::{LineageEntry, LineageOperation};
use serde_json::Value;
use sqlx::types::Json;
use sqlx::FromRow;
use sqlx::PgPool;
use uuid::Uuid;

#[derive(Debug, Clone, FromRow)]
struct LineageEntryRow {
    id: Uuid,
    tenant_id: Uuid,
    source_table: String,
    source_id: Uuid,
    target_table: String,
    target_id: Uuid,
    operation: String,
    transformation_type: String,
    performed_by: String,
    details: Json<Value>,
    created_at: DateTime<Utc>,
}

impl From<LineageEntryRow> for LineageEntry {
    fn from(row: LineageEntryRow) -> Self {
        LineageEntry {
            id: row.id,
            tenant_id: row.tenant_id,
            source_table: row.source_table,
            source_id: row.source_id,
            target_table: row.target_table,
            target_id: row.target_id,
            operation: match row.operation.as_str() {
                "update" => LineageOperation::Update,
                "merge" => LineageOperation::Merge,
                "split" => LineageOperation::Split,
                "derive" => LineageOperation::Derive,
                _ => LineageOperation::Create,
            },
            transformation_type: row.transformation_type,
            performed_by: row.performed_by,
            details: row.details.0,
            created_at: row.created_at,
        }
    }
}

const SELECT_COLUMNS: &str = "id, tenant_id, source_table, source_id, target_table, target_id, \
     operation, transformation_type, performed_by, details, created_at";

/// One lineage row as assembled by a pipeline stage, ready to append.
pub struct NewLineageEntry {
    pub tenant_id: Uuid,
    pub source_table: &'static str,
    pub source_id: Uuid,
    pub target_table: &'static str,
    pub target_id: Uuid,
    pub operation: LineageOperation,
    pub transformation_type: String,
    pub performed_by: String,
    pub details: Value,
}

pub async fn append(pool: &PgPool, entry: &NewLineageEntry) -> sqlx::Result<LineageEntry> {
    let row = sqlx::query_as::<_, LineageEntryRow>(&format!(
        "INSERT INTO lineage_entries (
             tenant_id, source_table, source_id, target_table, target_id,
             operation, transformation_type, performed_by, details
         ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
         RETURNING {SELECT_COLUMNS}"
    ))
    .bind(entry.tenant_id)
    .bind(entry.source_table)
    .bind(entry.source_id)
    .bind(entry.target_table)
    .bind(entry.target_id)
    .bind(entry.operation.to_string())
    .bind(&entry.transformation_type)
    .bind(&entry.performed_by)
    .bind(Json(&entry.details))
    .fetch_one(pool)
    .await?;
    Ok(row.into())
}

pub async fn for_source(
    pool: &PgPool,
    source_table: &str,
    source_id: Uuid,
) -> sqlx::Result<Vec<LineageEntry>> {
    let rows = sqlx::query_as::<_, LineageEntryRow>(&format!(
        "SELECT {SELECT_COLUMNS} FROM lineage_entries
         WHERE source_table = $1 AND source_id = $2
         ORDER BY created_at"
    ))
    .bind(source_table)
    .bind(source_id)
    .fetch_all(pool)
    .await?;
    Ok(rows.into_iter().map(Into::into).collect())
}

pub async fn for_target(
    pool: &PgPool,
    target_table: &str,
    target_id: Uuid,
) -> sqlx::Result<Vec<LineageEntry>> {
    let rows = sqlx::query_as::<_, LineageEntryRow>(&format!(
        "SELECT {SELECT_COLUMNS} FROM lineage_entries
         WHERE target_table = $1 AND target_id = $2
         ORDER BY created_at"
    ))
    .bind(target_table)
    .bind(target_id)
    .fetch_all(pool)
    .await?;
    Ok(rows.into_iter().map(Into::into).collect())
}
