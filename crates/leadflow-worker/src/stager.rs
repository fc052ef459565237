//! The Ingestion Stager: accepts one uploaded CSV, de-duplicates it
//! by content hash, and opens a `Batch` for the Parser to pick up.
//!
//! Unlike the other stages, staging isn't a polling claim loop - it runs
//! synchronously inside the HTTP request that uploaded the file.

use leadflow_connectors::blob::{ingestion_key, BlobStore};
use leadflow_connectors::hashing::file_hash;
use leadflow_core::error::{Error, Result};
use leadflow_core::model::Batch;
use serde_json::json;
use sqlx::PgPool;
use uuid::Uuid;

/// The outcome of staging one upload.
pub struct StageOutcome {
    pub batch: Batch,
    /// `true` when this upload's bytes matched a batch already on file -
    /// `batch` is the pre-existing one, and no new row was written.
    pub deduplicated: bool,
}

/// Stages one CSV upload. `received_at_ms` is the epoch
/// milliseconds used to build the blob key; callers pass it rather than
/// this function calling a clock directly, keeping staging pure-ish and
/// testable with a fixed timestamp.
pub async fn stage_csv(
    pool: &PgPool,
    blob_store: &dyn BlobStore,
    tenant_id: Uuid,
    lead_source_id: Uuid,
    filename: &str,
    bytes: &[u8],
    received_at_ms: i64,
) -> Result<StageOutcome> {
    let hash = file_hash(bytes);

    if let Some(existing) = leadflow_db::batches::find_by_hash(pool, tenant_id, &hash)
        .await
        .map_err(|e| Error::Database(e.to_string()))?
    {
        return Ok(StageOutcome {
            batch: existing,
            deduplicated: true,
        });
    }

    let key = ingestion_key(received_at_ms, filename);
    blob_store.put(&key, bytes).await?;

    let batch = leadflow_db::batches::create(pool, tenant_id, lead_source_id, &key, &hash)
        .await
        .map_err(|e| Error::Database(e.to_string()))?;

    leadflow_db::batches::append_log(
        pool,
        batch.id,
        json!({ "event": "staged", "filename": filename, "bytes": bytes.len() }),
    )
    .await
    .map_err(|e| Error::Database(e.to_string()))?;

    Ok(StageOutcome {
        batch,
        deduplicated: false,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingBlobStore {
        puts: Mutex<Vec<(String, Vec<u8>)>>,
    }

    #[async_trait]
    impl BlobStore for RecordingBlobStore {
        async fn put(&self, key: &str, bytes: &[u8]) -> leadflow_connectors::Result<()> {
            self.puts
                .lock()
                .unwrap()
                .push((key.to_string(), bytes.to_vec()));
            Ok(())
        }

        async fn get(&self, key: &str) -> leadflow_connectors::Result<Vec<u8>> {
            let puts = self.puts.lock().unwrap();
            puts.iter()
                .find(|(k, _)| k == key)
                .map(|(_, v)| v.clone())
                .ok_or_else(|| leadflow_connectors::ConnectorError::Io("not found".into()))
        }
    }

    #[test]
    fn blob_key_uses_upload_timestamp_and_filename() {
        let store = RecordingBlobStore::default();
        let _ = &store;
        assert_eq!(
            ingestion_key(1_700_000_000_000, "leads.csv"),
            "ingestions/1700000000000_leads.csv"
        );
    }
}
