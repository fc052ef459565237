//! leadflowd - unified lead-pipeline daemon.
//!
//! Replaces running `leadflow-server` and a separate worker process
//! side by side with one binary that exposes `server`, `worker`, and `all`
//! subcommands, so an operator can deploy the HTTP front door and the
//! pipeline's claim loops as independently scaled processes or as one.

use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use leadflow_connectors::blob::LocalBlobStore;
use leadflow_connectors::EmbeddingClient;
use leadflow_evidence::LineageRecorder;
use leadflow_worker::claimer::{run_stage_loop, spawn_shutdown_listener};
use leadflow_worker::health::{health_router, HealthState};
use leadflow_worker::metrics::WorkerMetrics;
use leadflow_worker::{crm_puller, embedder, matcher, parser, reaper, transformer, WorkerConfig};

#[derive(Parser)]
#[command(name = "leadflowd", about = "Unified lead pipeline daemon")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP surface only (stage-csv, approve/reject, admin kick endpoints)
    Server,
    /// Run the pipeline's claim loops only (parser, transformer, matcher,
    /// embedder, CRM puller, reaper, review TTL sweep)
    Worker,
    /// Run both in one process
    All,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let subscriber = FmtSubscriber::builder().with_max_level(Level::INFO).finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let cli = Cli::parse();

    match cli.command {
        Commands::Server => leadflow_server::run().await?,
        Commands::Worker => run_worker().await?,
        Commands::All => {
            tokio::try_join!(leadflow_server::run(), run_worker())?;
        }
    }

    Ok(())
}

/// Runs every claim-based stage loop plus the interval-based reaper, TTL
/// sweep, and CRM puller loops, and the health/metrics HTTP endpoint. Blocks
/// until a shutdown signal is received.
async fn run_worker() -> anyhow::Result<()> {
    let config = WorkerConfig::from_env()?;
    info!(worker_id = %config.worker_id, "starting leadflowd worker");

    let pool: PgPool = PgPoolOptions::new()
        .max_connections(10)
        .connect(&config.database_url)
        .await?;

    let metrics = WorkerMetrics::new();
    let ready = Arc::new(AtomicBool::new(true));
    let health_state = Arc::new(HealthState {
        metrics,
        ready: ready.clone(),
    });

    let metrics_port = config.metrics_port;
    tokio::spawn(async move {
        let addr = format!("0.0.0.0:{metrics_port}");
        info!("health/metrics server listening on {addr}");
        match tokio::net::TcpListener::bind(&addr).await {
            Ok(listener) => {
                if let Err(e) = axum::serve(listener, health_router(health_state)).await {
                    tracing::error!(error = %e, "health server exited");
                }
            }
            Err(e) => tracing::error!(error = %e, "failed to bind health server"),
        }
    });

    let shutdown = spawn_shutdown_listener();
    let poll_interval = Duration::from_secs(config.poll_interval_secs);
    let lineage = LineageRecorder::new(pool.clone(), "worker");
    let blob_store = Arc::new(LocalBlobStore::new(config.blob_root.clone()));

    let parse_limit = config.parse_batch_size;
    let parser_pool = pool.clone();
    let parser_shutdown = shutdown.clone();
    let parser_blob_store = blob_store.clone();
    let parser_task = tokio::spawn(async move {
        run_stage_loop(
            "parser",
            poll_interval,
            parser_pool,
            parser_shutdown,
            move |pool| {
                let blob_store = parser_blob_store.clone();
                Box::pin(async move {
                    let stats = parser::run_once(&pool, blob_store.as_ref(), parse_limit).await?;
                    Ok(stats.batches_processed)
                })
            },
        )
        .await;
    });

    let transform_limit = config.transform_batch_size;
    let transformer_pool = pool.clone();
    let transformer_shutdown = shutdown.clone();
    let transformer_lineage = lineage.clone();
    let transformer_task = tokio::spawn(async move {
        run_stage_loop(
            "transformer",
            poll_interval,
            transformer_pool,
            transformer_shutdown,
            move |pool| {
                let lineage = transformer_lineage.clone();
                Box::pin(async move {
                    let stats = transformer::run_once(&pool, &lineage, transform_limit).await?;
                    Ok(stats.batches_processed)
                })
            },
        )
        .await;
    });

    let match_limit = config.match_batch_size;
    let matcher_pool = pool.clone();
    let matcher_shutdown = shutdown.clone();
    let matcher_lineage = lineage.clone();
    let matcher_task = tokio::spawn(async move {
        run_stage_loop(
            "matcher",
            poll_interval,
            matcher_pool,
            matcher_shutdown,
            move |pool| {
                let lineage = matcher_lineage.clone();
                Box::pin(async move {
                    let stats = matcher::run_once(&pool, &lineage, match_limit).await?;
                    Ok(stats.leads_scored)
                })
            },
        )
        .await;
    });

    let embedding_limit = config.embedding_batch_size;
    let max_embedding_attempts = config.max_embedding_attempts;
    let embedding_client = Arc::new(EmbeddingClient::new(
        &config.embedding_provider_url,
        &config.embedding_provider_api_key,
        &config.embedding_model,
    ));
    let embedder_pool = pool.clone();
    let embedder_shutdown = shutdown.clone();
    let embedder_task = tokio::spawn(async move {
        run_stage_loop(
            "embedder",
            poll_interval,
            embedder_pool,
            embedder_shutdown,
            move |pool| {
                let client = embedding_client.clone();
                Box::pin(async move {
                    let stats = embedder::run_once(
                        &pool,
                        client.as_ref(),
                        embedding_limit,
                        max_embedding_attempts,
                    )
                    .await?;
                    Ok(stats.embedded + stats.failed)
                })
            },
        )
        .await;
    });

    let reaper_task = tokio::spawn(reaper::run_reap_loop(
        pool.clone(),
        Duration::from_secs(config.reaper_interval_secs),
        config.reaper_timeout_secs,
        config.max_embedding_attempts,
        shutdown.clone(),
    ));

    let ttl_sweep_task = tokio::spawn(reaper::run_ttl_sweep_loop(
        pool.clone(),
        Duration::from_secs(config.review_ttl_sweep_interval_secs),
        shutdown.clone(),
    ));

    let crm_pull_task = tokio::spawn(crm_puller::run_pull_loop(
        pool.clone(),
        Duration::from_secs(config.crm_pull_interval_secs),
        shutdown.clone(),
    ));

    let _ = tokio::join!(
        parser_task,
        transformer_task,
        matcher_task,
        embedder_task,
        reaper_task,
        ttl_sweep_task,
        crm_pull_task,
    );

    Ok(())
}
