//! Leadflow CLI - operator tooling for the lead pipeline: validate a
//! `LeadSource` recipe, stage a CSV from disk, approve or reject a review
//! candidate, and print batch/sync-run status.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use leadflow_core::model::LeadSource;
use leadflow_evidence::LineageRecorder;
use leadflow_recipe::validate_recipe;
use sqlx::postgres::PgPoolOptions;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;
use uuid::Uuid;

#[derive(Parser)]
#[command(name = "leadflow")]
#[command(about = "Operator CLI for the lead ingestion and matching pipeline")]
#[command(version)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate a `LeadSource` recipe JSON file without persisting it
    ValidateRecipe {
        /// Path to the recipe JSON file
        path: PathBuf,
    },

    /// Stage a CSV file from disk, as if it had been uploaded
    StageCsv {
        #[arg(long)]
        tenant_id: Uuid,
        #[arg(long)]
        source_slug: String,
        /// Path to the CSV file on disk
        path: PathBuf,
    },

    /// Approve a pending match candidate, committing a manual `Match`
    Approve {
        #[arg(long)]
        candidate_id: Uuid,
        #[arg(long)]
        reviewer_id: Uuid,
    },

    /// Reject a pending match candidate
    Reject {
        #[arg(long)]
        candidate_id: Uuid,
        #[arg(long)]
        reviewer_id: Uuid,
        #[arg(long)]
        notes: Option<String>,
    },

    /// Print one batch's status and counters
    BatchStatus {
        #[arg(long)]
        batch_id: Uuid,
    },

    /// Print a CRM connection's recent sync runs
    SyncStatus {
        #[arg(long)]
        crm_connection_id: Uuid,
        #[arg(long, default_value_t = 10)]
        limit: i64,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder().with_max_level(level).finish();
    tracing::subscriber::set_global_default(subscriber)?;

    match cli.command {
        Commands::ValidateRecipe { path } => validate_recipe_file(&path)?,
        Commands::StageCsv { tenant_id, source_slug, path } => {
            stage_csv(tenant_id, &source_slug, &path).await?
        }
        Commands::Approve { candidate_id, reviewer_id } => approve(candidate_id, reviewer_id).await?,
        Commands::Reject { candidate_id, reviewer_id, notes } => {
            reject(candidate_id, reviewer_id, notes).await?
        }
        Commands::BatchStatus { batch_id } => batch_status(batch_id).await?,
        Commands::SyncStatus { crm_connection_id, limit } => {
            sync_status(crm_connection_id, limit).await?
        }
    }

    Ok(())
}

fn validate_recipe_file(path: &PathBuf) -> Result<()> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("reading recipe file {}", path.display()))?;
    let source: LeadSource = serde_json::from_str(&content)
        .with_context(|| format!("parsing recipe file {}", path.display()))?;

    match validate_recipe(&source) {
        Ok(()) => {
            println!("recipe '{}' is valid", source.slug);
            Ok(())
        }
        Err(errors) => {
            for error in &errors {
                eprintln!("error: {error}");
            }
            anyhow::bail!("recipe validation failed with {} error(s)", errors.len());
        }
    }
}

async fn connect_pool() -> Result<sqlx::PgPool> {
    let database_url = std::env::var("DATABASE_URL").context("DATABASE_URL required")?;
    PgPoolOptions::new()
        .max_connections(5)
        .connect(&database_url)
        .await
        .context("connecting to database")
}

async fn stage_csv(tenant_id: Uuid, source_slug: &str, path: &PathBuf) -> Result<()> {
    let pool = connect_pool().await?;
    let blob_root = std::env::var("BLOB_ROOT").unwrap_or_else(|_| "./blobs".to_string());
    let blob_store = leadflow_connectors::LocalBlobStore::new(blob_root);

    let lead_source = leadflow_db::lead_sources::get_by_slug(&pool, tenant_id, source_slug)
        .await?
        .with_context(|| format!("lead source '{source_slug}' not found for tenant {tenant_id}"))?;

    let bytes = std::fs::read(path).with_context(|| format!("reading {}", path.display()))?;
    let filename = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("upload.csv");

    let outcome = leadflow_worker::stager::stage_csv(
        &pool,
        &blob_store,
        tenant_id,
        lead_source.id,
        filename,
        &bytes,
        chrono::Utc::now().timestamp_millis(),
    )
    .await?;

    if outcome.deduplicated {
        println!("already staged as batch {} (deduplicated by content hash)", outcome.batch.id);
    } else {
        println!("staged batch {}", outcome.batch.id);
    }
    Ok(())
}

async fn approve(candidate_id: Uuid, reviewer_id: Uuid) -> Result<()> {
    let pool = connect_pool().await?;
    let lineage = LineageRecorder::new(pool.clone(), "cli");
    let match_id = leadflow_worker::review_resolver::approve(&pool, &lineage, candidate_id, reviewer_id).await?;
    println!("approved candidate {candidate_id} -> match {match_id}");
    Ok(())
}

async fn reject(candidate_id: Uuid, reviewer_id: Uuid, notes: Option<String>) -> Result<()> {
    let pool = connect_pool().await?;
    let lineage = LineageRecorder::new(pool.clone(), "cli");
    leadflow_worker::review_resolver::reject(&pool, &lineage, candidate_id, reviewer_id, notes).await?;
    println!("rejected candidate {candidate_id}");
    Ok(())
}

async fn batch_status(batch_id: Uuid) -> Result<()> {
    let pool = connect_pool().await?;
    let batch = leadflow_db::batches::get(&pool, batch_id)
        .await?
        .with_context(|| format!("batch {batch_id} not found"))?;

    println!("batch {}", batch.id);
    println!("  status:     {}", batch.status);
    println!("  total:      {}", batch.counters.total);
    println!("  valid:      {}", batch.counters.valid);
    println!("  duplicate:  {}", batch.counters.duplicate);
    println!("  error:      {}", batch.counters.error);
    if !batch.errors.is_empty() {
        println!("  errors:");
        for error in &batch.errors {
            println!("    - {error}");
        }
    }
    Ok(())
}

async fn sync_status(crm_connection_id: Uuid, limit: i64) -> Result<()> {
    let pool = connect_pool().await?;
    let recorder = leadflow_evidence::SyncLogRecorder::new(pool);
    let logs = recorder.recent_for(crm_connection_id, limit).await?;

    if logs.is_empty() {
        println!("no sync runs recorded for connection {crm_connection_id}");
        return Ok(());
    }

    for log in logs {
        info!(sync_log_id = %log.id, "");
        println!(
            "{} | {:?} | fetched={} created={} updated={} errors={}",
            log.started_at,
            log.status,
            log.fetched,
            log.created,
            log.updated,
            log.errors.len(),
        );
    }
    Ok(())
}
