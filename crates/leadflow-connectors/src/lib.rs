//! Outbound connectors: CSV parsing, the CRM and embedding-provider HTTP
//! clients, content-addressed blob storage, and file hashing.

pub mod blob;
pub mod crm_client;
pub mod csv_parser;
pub mod embedding_client;
pub mod error;
pub mod hashing;

pub use blob::{BlobStore, LocalBlobStore};
pub use crm_client::CrmClient;
pub use embedding_client::EmbeddingClient;
pub use error::{ConnectorError, Result};
