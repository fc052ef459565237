//! `EmbeddingTask` rows - the embedding worker's queue.

use leadflow_core::model::{EmbeddingTask, EmbeddingTaskStatus};
use sqlx::FromRow;
use sqlx::PgPool;
use uuid::Uuid;

#[derive(Debug, Clone, FromRow)]
struct EmbeddingTaskRow {
    id: Uuid,
    table_name: String,
    record_id: Uuid,
    text_to_embed: String,
    status: String,
    attempts: i32,
    last_error: Option<String>,
}

impl From<EmbeddingTaskRow> for EmbeddingTask {
    fn from(row: EmbeddingTaskRow) -> Self {
        EmbeddingTask {
            id: row.id,
            table_name: row.table_name,
            record_id: row.record_id,
            text_to_embed: row.text_to_embed,
            status: match row.status.as_str() {
                "processing" => EmbeddingTaskStatus::Processing,
                "completed" => EmbeddingTaskStatus::Completed,
                "failed" => EmbeddingTaskStatus::Failed,
                _ => EmbeddingTaskStatus::Pending,
            },
            attempts: row.attempts,
            last_error: row.last_error,
        }
    }
}

const SELECT_COLUMNS: &str =
    "id, table_name, record_id, text_to_embed, status, attempts, last_error";

/// Enqueues `(table_name, record_id)` for embedding. Re-enqueuing an
/// already-pending task is a no-op; re-enqueuing a
/// completed one resets it to pending with the fresh text.
pub async fn enqueue(
    pool: &PgPool,
    table_name: &str,
    record_id: Uuid,
    text_to_embed: &str,
) -> sqlx::Result<EmbeddingTask> {
    let row = sqlx::query_as::<_, EmbeddingTaskRow>(&format!(
        "INSERT INTO embedding_tasks (table_name, record_id, text_to_embed)
         VALUES ($1, $2, $3)
         ON CONFLICT (table_name, record_id) DO UPDATE SET
             text_to_embed = EXCLUDED.text_to_embed,
             status = CASE WHEN embedding_tasks.status = 'pending'
                           THEN embedding_tasks.status ELSE 'pending' END,
             attempts = CASE WHEN embedding_tasks.status = 'pending'
                             THEN embedding_tasks.attempts ELSE 0 END,
             last_error = CASE WHEN embedding_tasks.status = 'pending'
                               THEN embedding_tasks.last_error ELSE NULL END,
             updated_at = now()
         RETURNING {SELECT_COLUMNS}"
    ))
    .bind(table_name)
    .bind(record_id)
    .bind(text_to_embed)
    .fetch_one(pool)
    .await?;
    Ok(row.into())
}

/// Claims up to `limit` pending tasks under `max_attempts`, flipping them
/// to `processing` in the same statement. Bypasses
/// [`crate::claim::claim_batch`] since the generic primitive's extra
/// predicate is a literal string with no slot for a bound `max_attempts`
/// parameter.
pub async fn claim_batch(
    pool: &PgPool,
    limit: i64,
    max_attempts: i32,
) -> sqlx::Result<Vec<EmbeddingTask>> {
    let rows = sqlx::query_as::<_, EmbeddingTaskRow>(&format!(
        "UPDATE embedding_tasks SET status = 'processing', updated_at = now()
         WHERE id IN (
             SELECT id FROM embedding_tasks
             WHERE status = 'pending' AND attempts < $2
             ORDER BY created_at
             LIMIT $1
             FOR UPDATE SKIP LOCKED
         )
         RETURNING {SELECT_COLUMNS}"
    ))
    .bind(limit)
    .bind(max_attempts)
    .fetch_all(pool)
    .await?;
    Ok(rows.into_iter().map(Into::into).collect())
}

pub async fn mark_completed(pool: &PgPool, id: Uuid) -> sqlx::Result<()> {
    sqlx::query(
        "UPDATE embedding_tasks SET status = 'completed', updated_at = now() WHERE id = $1",
    )
    .bind(id)
    .execute(pool)
    .await?;
    Ok(())
}

/// Reverts one task to `pending` after a per-record failure, or to
/// `failed` once `attempts` has reached `max_attempts`.
pub async fn revert_with_error(
    pool: &PgPool,
    id: Uuid,
    error: &str,
    max_attempts: i32,
) -> sqlx::Result<()> {
    sqlx::query(
        "UPDATE embedding_tasks SET
             attempts = attempts + 1,
             last_error = $2,
             status = CASE WHEN attempts + 1 >= $3 THEN 'failed' ELSE 'pending' END,
             updated_at = now()
         WHERE id = $1",
    )
    .bind(id)
    .bind(error)
    .bind(max_attempts)
    .execute(pool)
    .await?;
    Ok(())
}

/// Reclaims tasks stuck in `processing` past `timeout_seconds`. A task
/// whose incremented `attempts` reaches `max_attempts` goes straight to
/// `failed` instead, same as [`revert_with_error`]. Returns the number of
/// rows reclaimed (pending or failed), not just the ones returned to the
/// pool.
pub async fn reap_stale(
    pool: &PgPool,
    timeout_seconds: i64,
    max_attempts: i32,
) -> sqlx::Result<u64> {
    let result = sqlx::query(
        "UPDATE embedding_tasks SET
             attempts = attempts + 1,
             last_error = 'reaped: stuck in processing past timeout',
             status = CASE WHEN attempts + 1 >= $2 THEN 'failed' ELSE 'pending' END,
             updated_at = now()
         WHERE status = 'processing'
           AND updated_at < now() - make_interval(secs => $1)",
    )
    .bind(timeout_seconds as f64)
    .bind(max_attempts)
    .execute(pool)
    .await?;
    Ok(result.rows_affected())
}

pub async fn counts(pool: &PgPool) -> sqlx::Result<(i64, i64)> {
    let pending: i64 =
        sqlx::query_scalar("SELECT count(*) FROM embedding_tasks WHERE status = 'pending'")
            .fetch_one(pool)
            .await?;
    let failed: i64 =
        sqlx::query_scalar("SELECT count(*) FROM embedding_tasks WHERE status = 'failed'")
            .fetch_one(pool)
            .await?;
    Ok((pending, failed))
}
