//! Generic claim-via-row-update primitive used by every worker loop.
//!
//! Each worker polls a table for rows in a pending status, atomically flips
//! them to a claimed status with `UPDATE ... WHERE id IN (SELECT ... FOR
//! UPDATE SKIP LOCKED) RETURNING *`, and hands the claimed rows to its own
//! handler. The table itself is the queue: there is no separate broker to
//! connect to or reconnect on restart.

use sqlx::postgres::PgRow;
use sqlx::{FromRow, PgPool};

/// Describes one claimable table.
pub struct ClaimSpec<'a> {
    pub table: &'a str,
    pub status_column: &'a str,
    pub pending_value: &'a str,
    pub claimed_value: &'a str,
    /// Extra `WHERE` clause ANDed onto the pending predicate, e.g. an
    /// attempts-below-max check. Use `"true"` when there is none.
    pub extra_predicate: &'a str,
    pub order_by: &'a str,
    pub limit: i64,
}

/// Atomically claims up to `spec.limit` rows and decodes them as `T`.
pub async fn claim_batch<T>(pool: &PgPool, spec: &ClaimSpec<'_>) -> sqlx::Result<Vec<T>>
where
    T: for<'r> FromRow<'r, PgRow> + Send + Unpin,
{
    let sql = format!(
        "UPDATE {table} SET {status_col} = $1
         WHERE id IN (
             SELECT id FROM {table}
             WHERE {status_col} = $2 AND ({predicate})
             ORDER BY {order_by}
             LIMIT $3
             FOR UPDATE SKIP LOCKED
         )
         RETURNING *",
        table = spec.table,
        status_col = spec.status_column,
        predicate = spec.extra_predicate,
        order_by = spec.order_by,
    );

    sqlx::query_as::<_, T>(&sql)
        .bind(spec.claimed_value)
        .bind(spec.pending_value)
        .bind(spec.limit)
        .fetch_all(pool)
        .await
}

/// Reclaims rows stuck in `claimed_value` past `timeout_seconds`, resetting
/// them to `pending_value`. Mirrors the worker pool's stale-job reaper, but
/// generalized across every claimable table instead of one `jobs` table.
pub async fn reap_stale<'a>(
    pool: &PgPool,
    table: &str,
    status_column: &str,
    claimed_value: &str,
    pending_value: &str,
    updated_at_column: &str,
    timeout_seconds: i64,
) -> sqlx::Result<u64> {
    let sql = format!(
        "UPDATE {table} SET {status_col} = $1
         WHERE {status_col} = $2
           AND {updated_col} < now() - ($3 || ' seconds')::interval",
        table = table,
        status_col = status_column,
        updated_col = updated_at_column,
    );

    let result = sqlx::query(&sql)
        .bind(pending_value)
        .bind(claimed_value)
        .bind(timeout_seconds.to_string())
        .execute(pool)
        .await?;
    Ok(result.rows_affected())
}
