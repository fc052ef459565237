//! `CrmConnection` rows - one configured CRM credential set.

use chrono::{DateTime, Utc};
use leadflow_core::model::CrmConnection;
use sqlx::FromRow;
use sqlx::PgPool;
use uuid::Uuid;

#[derive(Debug, Clone, FromRow)]
struct CrmConnectionRow {
    id: Uuid,
    tenant_id: Uuid,
    base_url: String,
    api_key: String,
    last_sync_at: Option<DateTime<Utc>>,
    last_sync_status: Option<String>,
}

impl From<CrmConnectionRow> for CrmConnection {
    fn from(row: CrmConnectionRow) -> Self {
        CrmConnection {
            id: row.id,
            tenant_id: row.tenant_id,
            base_url: row.base_url,
            api_key: row.api_key,
            last_sync_at: row.last_sync_at,
            last_sync_status: row.last_sync_status,
        }
    }
}

const SELECT_COLUMNS: &str =
    "id, tenant_id, base_url, api_key, last_sync_at, last_sync_status";

/// All `is_active` connections, polled once per puller cycle.
pub async fn list_active(pool: &PgPool) -> sqlx::Result<Vec<CrmConnection>> {
    let rows = sqlx::query_as::<_, CrmConnectionRow>(&format!(
        "SELECT {SELECT_COLUMNS} FROM crm_connections WHERE is_active = true"
    ))
    .fetch_all(pool)
    .await?;
    Ok(rows.into_iter().map(Into::into).collect())
}

pub async fn get(pool: &PgPool, id: Uuid) -> sqlx::Result<Option<CrmConnection>> {
    let row = sqlx::query_as::<_, CrmConnectionRow>(&format!(
        "SELECT {SELECT_COLUMNS} FROM crm_connections WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?;
    Ok(row.map(Into::into))
}

/// Records the result of one sync run. `sync_start` is the
/// timestamp captured at the top of the run, not `now()` - the run may
/// span minutes and `last_sync_at` must mark the cursor, not completion.
pub async fn record_sync_result(
    pool: &PgPool,
    id: Uuid,
    sync_start: DateTime<Utc>,
    status: &str,
) -> sqlx::Result<()> {
    sqlx::query(
        "UPDATE crm_connections SET last_sync_at = $2, last_sync_status = $3 WHERE id = $1",
    )
    .bind(id)
    .bind(sync_start)
    .bind(status)
    .execute(pool)
    .await?;
    Ok(())
}
