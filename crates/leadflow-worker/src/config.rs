//! Worker configuration from environment variables.

use anyhow::{Context, Result};

#[derive(Debug, Clone)]
pub struct WorkerConfig {
    pub worker_id: String,
    pub database_url: String,
    pub metrics_port: u16,
    // Staging
    pub blob_root: String,
    // Batch sizes
    pub parse_batch_size: i64,
    pub transform_batch_size: i64,
    pub match_batch_size: i64,
    pub embedding_batch_size: i64,
    pub max_embedding_attempts: i32,
    // Polling / reaping
    pub poll_interval_secs: u64,
    pub reaper_interval_secs: u64,
    pub reaper_timeout_secs: i64,
    pub review_ttl_sweep_interval_secs: u64,
    pub crm_pull_interval_secs: u64,
    // Outgoing connectors
    pub embedding_provider_url: String,
    pub embedding_provider_api_key: String,
    pub embedding_model: String,
}

impl WorkerConfig {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            worker_id: std::env::var("WORKER_ID")
                .unwrap_or_else(|_| uuid::Uuid::new_v4().to_string()),
            database_url: std::env::var("DATABASE_URL").context("DATABASE_URL required")?,
            metrics_port: env_parse("METRICS_PORT", "9090")?,
            blob_root: std::env::var("BLOB_ROOT").unwrap_or_else(|_| "./blobs".to_string()),
            parse_batch_size: env_parse("PARSE_BATCH_SIZE", "500")?,
            transform_batch_size: env_parse("TRANSFORM_BATCH_SIZE", "500")?,
            match_batch_size: env_parse("MATCH_BATCH_SIZE", "200")?,
            embedding_batch_size: env_parse(
                "EMBEDDING_BATCH_SIZE",
                &leadflow_core::thresholds::DEFAULT_EMBEDDING_BATCH_SIZE.to_string(),
            )?,
            max_embedding_attempts: env_parse(
                "MAX_EMBEDDING_ATTEMPTS",
                &leadflow_core::thresholds::DEFAULT_MAX_ATTEMPTS.to_string(),
            )?,
            poll_interval_secs: env_parse("POLL_INTERVAL_SECS", "5")?,
            reaper_interval_secs: env_parse("REAPER_INTERVAL_SECS", "60")?,
            reaper_timeout_secs: env_parse("REAPER_TIMEOUT_SECS", "600")?,
            review_ttl_sweep_interval_secs: env_parse("REVIEW_TTL_SWEEP_INTERVAL_SECS", "300")?,
            crm_pull_interval_secs: env_parse("CRM_PULL_INTERVAL_SECS", "900")?,
            embedding_provider_url: std::env::var("EMBEDDING_PROVIDER_URL")
                .context("EMBEDDING_PROVIDER_URL required")?,
            embedding_provider_api_key: std::env::var("EMBEDDING_PROVIDER_API_KEY")
                .unwrap_or_default(),
            embedding_model: std::env::var("EMBEDDING_MODEL")
                .unwrap_or_else(|_| "text-embedding-3-small".to_string()),
        })
    }
}

/// Parses an environment variable with a fallback default, attaching the
/// variable name to the error on failure - collapses the
/// `.unwrap_or_else(...).parse().context(...)` chain that would otherwise
/// repeat per field to one call site.
fn env_parse<T>(key: &str, default: &str) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    let raw = std::env::var(key).unwrap_or_else(|_| default.to_string());
    raw.parse::<T>()
        .map_err(|e| anyhow::anyhow!("invalid {key}={raw:?}: {e}"))
}
