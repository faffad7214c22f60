//! Error types for the reelscout engine
//!
//! Provides a single error enum with human-readable messages
//! and string serialization for JSON error envelopes.

use serde::{Serialize, Serializer};
use thiserror::Error;

/// Error type for all reelscout operations
///
/// Implements Display for human-readable messages and Serialize
/// so handlers can embed the message directly in a JSON body.
#[derive(Error, Debug)]
pub enum ReelscoutError {
    /// HTTP request failed at the transport level
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    /// Server answered with a non-success status code
    #[error("Failed to fetch {url}: {status}")]
    Status {
        /// HTTP status code returned by the server
        status: u16,
        /// URL that was requested
        url: String,
    },

    /// Request did not complete within the configured timeout
    #[error("Request timed out: {0}")]
    Timeout(String),

    /// Redirect chain exceeded the configured limit
    #[error("Too many redirects for {0}")]
    TooManyRedirects(String),

    /// Every header profile was tried and none succeeded
    #[error("All fetch attempts failed for {0}")]
    FetchFailed(String),

    /// Failed to parse HTML or an upstream payload
    #[error("Failed to parse: {0}")]
    ParseError(String),

    /// Invalid URL format
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// Search query missing or blank
    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    /// Upstream collaborator (webhook or download service) misbehaved
    #[error("Upstream service error: {0}")]
    Upstream(String),

    /// Workflow webhook acknowledged the request without producing results
    #[error("Workflow incomplete")]
    WorkflowIncomplete,
}

impl ReelscoutError {
    /// Maps a reqwest error to `Timeout` when it is one, `HttpError` otherwise
    pub(crate) fn from_request(url: &str, error: reqwest::Error) -> Self {
        if error.is_timeout() {
            ReelscoutError::Timeout(url.to_string())
        } else {
            ReelscoutError::HttpError(error)
        }
    }
}

impl Serialize for ReelscoutError {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

/// Result type alias for reelscout operations
pub type Result<T> = std::result::Result<T, ReelscoutError>;
