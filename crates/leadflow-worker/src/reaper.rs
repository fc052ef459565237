//! The Reaper: a periodic sweep, not a claim loop - it reclaims rows
//! stuck past a claim timeout and expires `MatchCandidate`s past their TTL.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use sqlx::PgPool;
use tracing::{error, info};

use crate::review_resolver;

/// Result of one stale-claim reap pass, for callers that want to log or
/// expose the counts via metrics.
#[derive(Debug, Default)]
pub struct ReapStats {
    pub batches_reclaimed: u64,
    pub embedding_tasks_reclaimed: u64,
}

/// One pass: reclaims batches stuck in `processing`/`transforming` and
/// embedding tasks stuck in `processing`, both past `timeout_seconds`.
pub async fn reap_once(
    pool: &PgPool,
    timeout_seconds: i64,
    max_embedding_attempts: i32,
) -> anyhow::Result<ReapStats> {
    let batches_reclaimed =
        leadflow_db::batches::reap_stale_processing(pool, timeout_seconds).await?;
    let embedding_tasks_reclaimed =
        leadflow_db::embedding_tasks::reap_stale(pool, timeout_seconds, max_embedding_attempts)
            .await?;

    Ok(ReapStats {
        batches_reclaimed,
        embedding_tasks_reclaimed,
    })
}

/// Runs the stale-claim reaper on a fixed interval until `shutdown` flips.
pub async fn run_reap_loop(
    pool: PgPool,
    interval: Duration,
    timeout_seconds: i64,
    max_embedding_attempts: i32,
    shutdown: Arc<AtomicBool>,
) {
    info!("reaper loop started");
    while !shutdown.load(Ordering::Relaxed) {
        match reap_once(&pool, timeout_seconds, max_embedding_attempts).await {
            Ok(stats) if stats.batches_reclaimed > 0 || stats.embedding_tasks_reclaimed > 0 => {
                info!(
                    batches_reclaimed = stats.batches_reclaimed,
                    embedding_tasks_reclaimed = stats.embedding_tasks_reclaimed,
                    "reclaimed stale work"
                );
            }
            Ok(_) => {}
            Err(e) => error!(error = %e, "reap pass failed"),
        }
        tokio::time::sleep(interval).await;
    }
    info!("reaper loop stopped");
}

/// Runs the `MatchCandidate` TTL sweep on a fixed interval until
/// `shutdown` flips. Kept as a separate loop from [`run_reap_loop`] since
/// its cadence has nothing to do with claim
/// timeouts.
pub async fn run_ttl_sweep_loop(pool: PgPool, interval: Duration, shutdown: Arc<AtomicBool>) {
    info!("ttl sweep loop started");
    while !shutdown.load(Ordering::Relaxed) {
        match review_resolver::ttl_sweep(&pool).await {
            Ok(reverted) if reverted > 0 => {
                info!(reverted, "ttl sweep reverted canonical leads to unmatched");
            }
            Ok(_) => {}
            Err(e) => error!(error = %e, "ttl sweep failed"),
        }
        tokio::time::sleep(interval).await;
    }
    info!("ttl sweep loop stopped");
}
