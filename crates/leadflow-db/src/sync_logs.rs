//! `SyncLog` rows - one CRM Puller run.

use chrono::{DateTime, Utc};
use leadflow_core::model::{SyncLog, SyncStatus, SyncType};
use serde_json::Value;
use sqlx::types::Json;
use sqlx::FromRow;
use sqlx::PgPool;
use uuid::Uuid;

#[derive(Debug, Clone, FromRow)]
struct SyncLogRow {
    id: Uuid,
    crm_connection_id: Uuid,
    sync_type: String,
    started_at: DateTime<Utc>,
    completed_at: Option<DateTime<Utc>>,
    status: String,
    fetched: i64,
    created: i64,
    updated: i64,
    errors: Json<Vec<Value>>,
}

impl From<SyncLogRow> for SyncLog {
    fn from(row: SyncLogRow) -> Self {
        SyncLog {
            id: row.id,
            crm_connection_id: row.crm_connection_id,
            sync_type: if row.sync_type == "full" {
                SyncType::Full
            } else {
                SyncType::Incremental
            },
            started_at: row.started_at,
            completed_at: row.completed_at,
            status: match row.status.as_str() {
                "completed" => SyncStatus::Completed,
                "completed_with_errors" => SyncStatus::CompletedWithErrors,
                "failed" => SyncStatus::Failed,
                _ => SyncStatus::Running,
            },
            fetched: row.fetched,
            created: row.created,
            updated: row.updated,
            errors: row.errors.0,
        }
    }
}

const SELECT_COLUMNS: &str = "id, crm_connection_id, sync_type, started_at, completed_at, \
     status, fetched, created, updated, errors";

/// Opens a `running` log row at the top of a puller cycle.
pub async fn start(
    pool: &PgPool,
    crm_connection_id: Uuid,
    sync_type: SyncType,
    started_at: DateTime<Utc>,
) -> sqlx::Result<SyncLog> {
    let type_str = match sync_type {
        SyncType::Full => "full",
        SyncType::Incremental => "incremental",
    };
    let row = sqlx::query_as::<_, SyncLogRow>(&format!(
        "INSERT INTO sync_logs (crm_connection_id, sync_type, started_at)
         VALUES ($1, $2, $3)
         RETURNING {SELECT_COLUMNS}"
    ))
    .bind(crm_connection_id)
    .bind(type_str)
    .bind(started_at)
    .fetch_one(pool)
    .await?;
    Ok(row.into())
}

/// Closes a log row with final counts and a bounded error list.
pub async fn complete(
    pool: &PgPool,
    id: Uuid,
    status: SyncStatus,
    fetched: i64,
    created: i64,
    updated: i64,
    errors: &[Value],
) -> sqlx::Result<SyncLog> {
    let status_str = match status {
        SyncStatus::Running => "running",
        SyncStatus::Completed => "completed",
        SyncStatus::CompletedWithErrors => "completed_with_errors",
        SyncStatus::Failed => "failed",
    };
    let row = sqlx::query_as::<_, SyncLogRow>(&format!(
        "UPDATE sync_logs SET
             completed_at = now(), status = $2, fetched = $3, created = $4, updated = $5,
             errors = $6
         WHERE id = $1
         RETURNING {SELECT_COLUMNS}"
    ))
    .bind(id)
    .bind(status_str)
    .bind(fetched)
    .bind(created)
    .bind(updated)
    .bind(Json(errors))
    .fetch_one(pool)
    .await?;
    Ok(row.into())
}

pub async fn for_connection(
    pool: &PgPool,
    crm_connection_id: Uuid,
    limit: i64,
) -> sqlx::Result<Vec<SyncLog>> {
    let rows = sqlx::query_as::<_, SyncLogRow>(&format!(
        "SELECT {SELECT_COLUMNS} FROM sync_logs
         WHERE crm_connection_id = $1
         ORDER BY started_at DESC
         LIMIT $2"
    ))
    .bind(crm_connection_id)
    .bind(limit)
    .fetch_all(pool)
    .await?;
    Ok(rows.into_iter().map(Into::into).collect())
}
