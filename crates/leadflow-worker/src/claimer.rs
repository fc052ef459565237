//! The generic poll loop every pipeline stage runs on top of.
//!
//! Each stage (stager excluded - it runs synchronously inside an HTTP
//! request) claims a batch of rows, processes them, and either moves on
//! immediately or sleeps if there was nothing to do. `run_stage_loop` factors
//! that shape out once instead of repeating it per stage; each stage's own
//! `run_once` already knows how to claim and process its one kind of row, so
//! the loop only needs to know how many items it handled.

use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use sqlx::PgPool;
use tracing::{error, info};

type StepFuture = Pin<Box<dyn Future<Output = anyhow::Result<usize>> + Send>>;

/// Runs `step` repeatedly until `shutdown` flips to `true`. `step` claims
/// and processes one batch for a stage and returns how many items it
/// touched; the loop sleeps for `poll_interval` only when a pass comes back
/// empty, so a busy stage keeps draining its queue without idling.
pub async fn run_stage_loop(
    name: &'static str,
    poll_interval: Duration,
    pool: PgPool,
    shutdown: Arc<AtomicBool>,
    step: impl Fn(PgPool) -> StepFuture + Send + Sync + 'static,
) {
    info!(stage = name, "stage loop started");
    while !shutdown.load(Ordering::Relaxed) {
        match step(pool.clone()).await {
            Ok(0) => {
                tokio::time::sleep(poll_interval).await;
            }
            Ok(_) => {
                tokio::task::yield_now().await;
            }
            Err(e) => {
                error!(stage = name, error = %e, "stage pass failed");
                tokio::time::sleep(poll_interval).await;
            }
        }
    }
    info!(stage = name, "stage loop stopped");
}

/// Flips to `true` on SIGINT, or on SIGTERM where the platform supports it.
/// Every stage loop checks this between passes rather than being aborted
/// mid-batch.
pub fn spawn_shutdown_listener() -> Arc<AtomicBool> {
    let flag = Arc::new(AtomicBool::new(false));
    let ctrl_c_flag = flag.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("received ctrl-c, shutting down");
            ctrl_c_flag.store(true, Ordering::Relaxed);
        }
    });

    #[cfg(unix)]
    {
        let term_flag = flag.clone();
        tokio::spawn(async move {
            use tokio::signal::unix::{signal, SignalKind};
            if let Ok(mut term) = signal(SignalKind::terminate()) {
                term.recv().await;
                info!("received sigterm, shutting down");
                term_flag.store(true, Ordering::Relaxed);
            }
        });
    }

    flag
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[tokio::test]
    async fn stops_as_soon_as_shutdown_flag_is_set() {
        let calls = Arc::new(AtomicUsize::new(0));
        let calls_in_step = calls.clone();
        let shutdown = Arc::new(AtomicBool::new(true));
        let pool = sqlx::PgPool::connect_lazy("postgres://localhost/does-not-matter").unwrap();

        run_stage_loop(
            "test",
            Duration::from_millis(1),
            pool,
            shutdown,
            move |_pool| {
                calls_in_step.fetch_add(1, Ordering::Relaxed);
                Box::pin(async { Ok(0) })
            },
        )
        .await;

        assert_eq!(calls.load(Ordering::Relaxed), 0);
    }
}
