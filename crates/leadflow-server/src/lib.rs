//! Leadflow Server - the HTTP surface: CSV staging, candidate review,
//! and administrative kick endpoints for workers that would otherwise run
//! on cron.
//!
//! Exposed as a library so [`run`] can be driven either by this crate's own
//! `main.rs` or embedded in `leadflowd`'s `server`/`all` subcommands.

use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::post;
use axum::{Json, Router};
use base64::Engine;
use serde::{Deserialize, Serialize};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tower_http::trace::TraceLayer;
use tracing::info;
use uuid::Uuid;

use leadflow_connectors::blob::{BlobStore, LocalBlobStore};
use leadflow_connectors::EmbeddingClient;
use leadflow_evidence::LineageRecorder;
use leadflow_worker::health::{health_router, HealthState};
use leadflow_worker::metrics::WorkerMetrics;
use leadflow_worker::WorkerConfig;

struct AppState {
    pool: PgPool,
    blob_store: Arc<dyn BlobStore>,
    lineage: LineageRecorder,
    config: WorkerConfig,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

fn internal_error(e: anyhow::Error) -> (StatusCode, Json<ErrorBody>) {
    tracing::error!(error = %e, "request failed");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorBody { error: e.to_string() }),
    )
}

/// Builds the pool and router from the environment and serves until the
/// process is killed. Callers own `tracing_subscriber` setup - this does
/// not install a global subscriber, so `leadflowd` can run this alongside
/// worker loops under one subscriber.
pub async fn run() -> anyhow::Result<()> {
    let config = WorkerConfig::from_env()?;
    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(&config.database_url)
        .await?;

    let blob_store: Arc<dyn BlobStore> = Arc::new(LocalBlobStore::new(config.blob_root.clone()));
    let lineage = LineageRecorder::new(pool.clone(), "server");

    let state = Arc::new(AppState {
        pool: pool.clone(),
        blob_store,
        lineage,
        config,
    });

    let health_state = Arc::new(HealthState {
        metrics: WorkerMetrics::new(),
        ready: Arc::new(AtomicBool::new(true)),
    });

    let app = Router::new()
        .route("/api/stage-csv", post(stage_csv))
        .route("/api/approve-candidate", post(approve_candidate))
        .route("/api/reject-candidate", post(reject_candidate))
        .route("/api/run-matcher", post(run_matcher))
        .route("/api/run-transformer", post(run_transformer))
        .route("/api/run-embeddings", post(run_embeddings))
        .route("/api/run-crm-sync", post(run_crm_sync))
        .with_state(state)
        .merge(health_router(health_state))
        .layer(TraceLayer::new_for_http());

    let addr = std::env::var("SERVER_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".to_string());
    info!("starting leadflow server on {addr}");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

#[derive(Deserialize)]
struct StageCsvRequest {
    tenant_id: Uuid,
    source_slug: String,
    filename: String,
    bytes_base64: String,
    #[serde(default)]
    #[allow(dead_code)]
    origin: Option<String>,
}

#[derive(Serialize)]
struct StageCsvResponse {
    batch_id: Uuid,
    deduplicated: bool,
}

async fn stage_csv(
    State(state): State<Arc<AppState>>,
    Json(req): Json<StageCsvRequest>,
) -> Result<Json<StageCsvResponse>, (StatusCode, Json<ErrorBody>)> {
    let lead_source = leadflow_db::lead_sources::get_by_slug(&state.pool, req.tenant_id, &req.source_slug)
        .await
        .map_err(|e| internal_error(e.into()))?
        .ok_or_else(|| {
            (
                StatusCode::NOT_FOUND,
                Json(ErrorBody {
                    error: format!("lead source '{}' not found", req.source_slug),
                }),
            )
        })?;

    let bytes = base64::engine::general_purpose::STANDARD
        .decode(&req.bytes_base64)
        .map_err(|e| {
            (
                StatusCode::BAD_REQUEST,
                Json(ErrorBody {
                    error: format!("invalid base64: {e}"),
                }),
            )
        })?;

    let received_at_ms = chrono::Utc::now().timestamp_millis();
    let outcome = leadflow_worker::stager::stage_csv(
        &state.pool,
        state.blob_store.as_ref(),
        req.tenant_id,
        lead_source.id,
        &req.filename,
        &bytes,
        received_at_ms,
    )
    .await
    .map_err(|e| internal_error(e.into()))?;

    Ok(Json(StageCsvResponse {
        batch_id: outcome.batch.id,
        deduplicated: outcome.deduplicated,
    }))
}

#[derive(Deserialize)]
struct CandidateDecisionRequest {
    candidate_id: Uuid,
    reviewer_id: Uuid,
    #[serde(default)]
    notes: Option<String>,
}

#[derive(Serialize)]
struct ApproveResponse {
    match_id: Uuid,
}

async fn approve_candidate(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CandidateDecisionRequest>,
) -> Result<Json<ApproveResponse>, (StatusCode, Json<ErrorBody>)> {
    let match_id = leadflow_worker::review_resolver::approve(
        &state.pool,
        &state.lineage,
        req.candidate_id,
        req.reviewer_id,
    )
    .await
    .map_err(conflict_or_internal)?;

    Ok(Json(ApproveResponse { match_id }))
}

#[derive(Serialize)]
struct OkResponse {
    ok: bool,
}

async fn reject_candidate(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CandidateDecisionRequest>,
) -> Result<Json<OkResponse>, (StatusCode, Json<ErrorBody>)> {
    leadflow_worker::review_resolver::reject(
        &state.pool,
        &state.lineage,
        req.candidate_id,
        req.reviewer_id,
        req.notes,
    )
    .await
    .map_err(conflict_or_internal)?;

    Ok(Json(OkResponse { ok: true }))
}

/// A candidate that is not `pending` is a `409`; anything else is a `500`.
/// The resolver only ever bails with a plain string for that one case, so
/// the text is matched rather than carrying a typed variant through
/// `anyhow`.
fn conflict_or_internal(e: anyhow::Error) -> (StatusCode, Json<ErrorBody>) {
    let message = e.to_string();
    if message.contains("is not pending") {
        (StatusCode::CONFLICT, Json(ErrorBody { error: message }))
    } else {
        internal_error(e)
    }
}

#[derive(Serialize)]
struct RunMatcherResponse {
    leads_scored: usize,
    auto_matched: usize,
    opened_for_review: usize,
    unmatched: usize,
}

async fn run_matcher(
    State(state): State<Arc<AppState>>,
) -> Result<Json<RunMatcherResponse>, (StatusCode, Json<ErrorBody>)> {
    let stats = leadflow_worker::matcher::run_once(&state.pool, &state.lineage, state.config.match_batch_size)
        .await
        .map_err(internal_error)?;

    Ok(Json(RunMatcherResponse {
        leads_scored: stats.leads_scored,
        auto_matched: stats.auto_matched,
        opened_for_review: stats.opened_for_review,
        unmatched: stats.unmatched,
    }))
}

#[derive(Serialize)]
struct RunTransformerResponse {
    batches_processed: usize,
    leads_created: i64,
    duplicates: i64,
}

async fn run_transformer(
    State(state): State<Arc<AppState>>,
) -> Result<Json<RunTransformerResponse>, (StatusCode, Json<ErrorBody>)> {
    let stats = leadflow_worker::transformer::run_once(
        &state.pool,
        &state.lineage,
        state.config.transform_batch_size,
    )
    .await
    .map_err(internal_error)?;

    Ok(Json(RunTransformerResponse {
        batches_processed: stats.batches_processed,
        leads_created: stats.leads_created,
        duplicates: stats.duplicates,
    }))
}

#[derive(Serialize)]
struct RunEmbeddingsResponse {
    embedded: usize,
    failed: usize,
}

async fn run_embeddings(
    State(state): State<Arc<AppState>>,
) -> Result<Json<RunEmbeddingsResponse>, (StatusCode, Json<ErrorBody>)> {
    let client = EmbeddingClient::new(
        &state.config.embedding_provider_url,
        &state.config.embedding_provider_api_key,
        &state.config.embedding_model,
    );

    let stats = leadflow_worker::embedder::run_once(
        &state.pool,
        &client,
        state.config.embedding_batch_size,
        state.config.max_embedding_attempts,
    )
    .await
    .map_err(internal_error)?;

    Ok(Json(RunEmbeddingsResponse {
        embedded: stats.embedded,
        failed: stats.failed,
    }))
}

#[derive(Deserialize, Default)]
struct RunCrmSyncRequest {
    #[serde(default)]
    force_full: bool,
}

#[derive(Serialize)]
struct RunCrmSyncResponse {
    connections_synced: usize,
    fetched: i64,
    created: i64,
    updated: i64,
}

async fn run_crm_sync(
    State(state): State<Arc<AppState>>,
    Json(req): Json<RunCrmSyncRequest>,
) -> Result<Json<RunCrmSyncResponse>, (StatusCode, Json<ErrorBody>)> {
    let stats = leadflow_worker::crm_puller::run_all(&state.pool, req.force_full)
        .await
        .map_err(internal_error)?;

    Ok(Json(RunCrmSyncResponse {
        connections_synced: stats.connections_synced,
        fetched: stats.fetched,
        created: stats.created,
        updated: stats.updated,
    }))
}
