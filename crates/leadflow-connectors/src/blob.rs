//! Content-addressed blob storage: uploaded CSV bytes are
//! written once under `ingestions/<epoch_ms>_<filename>` and never
//! rewritten. Identical uploads are coalesced upstream by `file_hash`,
//! not by this trait, which only knows how to put and get bytes.

use async_trait::async_trait;

use crate::error::Result;

#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Writes `bytes` at `key`, overwriting nothing that already exists.
    /// The blob store is write-once; callers are expected to pick a key
    /// that is unique per logical upload (see [`ingestion_key`]).
    async fn put(&self, key: &str, bytes: &[u8]) -> Result<()>;

    async fn get(&self, key: &str) -> Result<Vec<u8>>;
}

/// Builds the `ingestions/<epoch_ms>_<filename>` key used by the Ingestion
/// Stager.
pub fn ingestion_key(epoch_ms: i64, filename: &str) -> String {
    format!("ingestions/{epoch_ms}_{filename}")
}

/// A local-filesystem-backed [`BlobStore`], used outside of a deployment
/// with real object storage (tests, single-box installs).
pub struct LocalBlobStore {
    base_dir: std::path::PathBuf,
}

impl LocalBlobStore {
    pub fn new(base_dir: impl Into<std::path::PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    fn full_path(&self, key: &str) -> std::path::PathBuf {
        self.base_dir.join(key)
    }
}

#[async_trait]
impl BlobStore for LocalBlobStore {
    async fn put(&self, key: &str, bytes: &[u8]) -> Result<()> {
        let path = self.full_path(key);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(path, bytes).await?;
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Vec<u8>> {
        let bytes = tokio::fs::read(self.full_path(key)).await?;
        Ok(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ConnectorError;

    #[test]
    fn ingestion_key_matches_the_documented_shape() {
        assert_eq!(
            ingestion_key(1_700_000_000_000, "leads.csv"),
            "ingestions/1700000000000_leads.csv"
        );
    }

    #[tokio::test]
    async fn local_store_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalBlobStore::new(dir.path());
        store.put("ingestions/1_a.csv", b"hello").await.unwrap();
        let read_back = store.get("ingestions/1_a.csv").await.unwrap();
        assert_eq!(read_back, b"hello");
    }

    #[tokio::test]
    async fn missing_key_is_an_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalBlobStore::new(dir.path());
        let err = store.get("ingestions/missing.csv").await.unwrap_err();
        assert!(matches!(err, ConnectorError::Io(_)));
    }
}
