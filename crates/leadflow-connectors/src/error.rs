//! Typed errors for the connectors crate.

use std::fmt;

/// Errors that can occur in the pipeline's outbound connectors.
#[derive(Debug)]
pub enum ConnectorError {
    /// The blob store or CSV source could not be read or written.
    Io(String),
    /// The CRM or embedding provider returned a response this client could
    /// not parse (bad JSON shape, missing field).
    MalformedResponse(String),
    /// The CRM or embedding provider rejected the request with a
    /// retry-worthy status (429, 5xx) or a network-level failure.
    Transient(String),
    /// The CRM or embedding provider rejected the request in a way retries
    /// cannot fix (401, 403, 404).
    Permanent(String),
}

impl fmt::Display for ConnectorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectorError::Io(msg) => write!(f, "io error: {msg}"),
            ConnectorError::MalformedResponse(msg) => write!(f, "malformed response: {msg}"),
            ConnectorError::Transient(msg) => write!(f, "transient error: {msg}"),
            ConnectorError::Permanent(msg) => write!(f, "permanent error: {msg}"),
        }
    }
}

impl std::error::Error for ConnectorError {}

impl From<std::io::Error> for ConnectorError {
    fn from(e: std::io::Error) -> Self {
        ConnectorError::Io(e.to_string())
    }
}

impl From<reqwest::Error> for ConnectorError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() || e.is_connect() {
            ConnectorError::Transient(e.to_string())
        } else {
            ConnectorError::MalformedResponse(e.to_string())
        }
    }
}

impl From<ConnectorError> for leadflow_core::error::Error {
    fn from(e: ConnectorError) -> Self {
        match e {
            ConnectorError::Io(m) => leadflow_core::error::Error::PermanentInfra(m),
            ConnectorError::MalformedResponse(m) => leadflow_core::error::Error::PermanentInfra(m),
            ConnectorError::Transient(m) => leadflow_core::error::Error::TransientInfra(m),
            ConnectorError::Permanent(m) => leadflow_core::error::Error::PermanentInfra(m),
        }
    }
}

pub type Result<T> = std::result::Result<T, ConnectorError>;
