//! Typed errors shared across the lead pipeline crates.

use thiserror::Error;

/// Errors that can occur anywhere in the lead pipeline.
///
/// Workers and the HTTP surface collapse this into a log line / status code
/// at their boundary; internal plumbing always propagates it with `?`.
#[derive(Debug, Error)]
pub enum Error {
    /// A single row or request failed validation. Never fatal to a batch.
    #[error("validation failed: {0}")]
    Validation(String),

    /// An infrastructure call failed in a way that is expected to resolve on
    /// retry (provider 5xx, CRM rate limit, DB deadlock).
    #[error("transient infrastructure error: {0}")]
    TransientInfra(String),

    /// An infrastructure call failed in a way retries cannot fix (bad
    /// credentials, malformed response after exhausting retries).
    #[error("permanent infrastructure error: {0}")]
    PermanentInfra(String),

    /// A data invariant that must hold was violated. This should never
    /// happen; when it does, the operation aborts and the event is logged
    /// for human attention rather than silently "fixed".
    #[error("invariant violation: {0}")]
    InvariantViolation(String),

    /// A database operation failed. Carries the underlying driver message
    /// rather than the driver's error type so this crate stays I/O-free.
    #[error("database error: {0}")]
    Database(String),

    /// Wraps a serialization error.
    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

/// Convenience alias used throughout the pipeline crates.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// `true` if the failed operation is expected to succeed if retried
    /// later without any code or data change.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::TransientInfra(_) | Error::Database(_))
    }
}
