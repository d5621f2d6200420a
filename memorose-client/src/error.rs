//! Error types for the Memorose client.

use crate::transport::TransportError;
use thiserror::Error;

/// Errors that can occur when using the Memorose client.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The underlying HTTP client could not be built.
    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    /// A transport failure that is not a routing signal (e.g. a read timeout).
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// Server returned an error response.
    #[error("API error (status {status}): {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Error message from server.
        message: String,
    },

    /// Every attempt in the retry budget hit a routing signal.
    #[error("All {endpoints} nodes in the cluster are unreachable or failed after {attempts} attempts")]
    ClusterUnreachable {
        /// Number of attempts made.
        attempts: usize,
        /// Size of the endpoint set.
        endpoints: usize,
    },

    /// The caller cancelled the operation.
    #[error("Operation cancelled after {attempts} attempts")]
    Cancelled {
        /// Attempts completed before cancellation was observed.
        attempts: usize,
    },

    /// Failed to encode a request body or decode a response body.
    #[error("JSON error: {0}")]
    Deserialize(#[from] serde_json::Error),

    /// Invalid URL provided.
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// Invalid client configuration.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl ClientError {
    /// Whether this is the cluster-exhausted failure.
    pub fn is_cluster_unreachable(&self) -> bool {
        matches!(self, ClientError::ClusterUnreachable { .. })
    }
}

/// Result type for client operations.
pub type Result<T> = std::result::Result<T, ClientError>;
