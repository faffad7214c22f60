//! Server error types
//!
//! `ServerError` covers startup failures. `ApiError` is the JSON error
//! envelope every handler returns on failure.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use thiserror::Error;

/// Startup errors
#[derive(Error, Debug)]
pub enum ServerError {
    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("HTTP client setup failed: {0}")]
    Client(#[from] reelscout_core::ReelscoutError),
}

/// Error returned by request handlers
#[derive(Error, Debug)]
pub enum ApiError {
    /// A required parameter is missing or blank
    #[error("{0}")]
    BadRequest(String),

    /// The route exists but does not accept the method
    #[error("Method not allowed")]
    MethodNotAllowed,

    /// The operation failed after validation
    #[error("{error}: {message}")]
    Internal {
        /// Short description of the failed operation
        error: String,
        /// Underlying cause
        message: String,
    },

    /// A listing scrape failed; the body names the source
    #[error("Failed to scrape {source_name}: {message}")]
    Listing {
        source_name: String,
        message: String,
    },
}

impl ApiError {
    pub fn missing(param: &str) -> Self {
        ApiError::BadRequest(format!("{} parameter is required", param))
    }

    pub fn internal(error: impl Into<String>, cause: impl std::fmt::Display) -> Self {
        ApiError::Internal {
            error: error.into(),
            message: cause.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match &self {
            ApiError::BadRequest(error) => (StatusCode::BAD_REQUEST, json!({ "error": error })),
            ApiError::MethodNotAllowed => (
                StatusCode::METHOD_NOT_ALLOWED,
                json!({ "error": "Method not allowed" }),
            ),
            ApiError::Internal { error, message } => (
                StatusCode::INTERNAL_SERVER_ERROR,
                json!({ "error": error, "message": message }),
            ),
            ApiError::Listing {
                source_name,
                message,
            } => (
                StatusCode::INTERNAL_SERVER_ERROR,
                json!({
                    "success": false,
                    "error": format!("Failed to scrape {}", source_name),
                    "message": message,
                    "source": source_name,
                }),
            ),
        };

        if status.is_server_error() {
            tracing::warn!(error = %self, "request failed");
        }
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(ApiError::missing("URL").into_response().status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            ApiError::MethodNotAllowed.into_response().status(),
            StatusCode::METHOD_NOT_ALLOWED
        );
        assert_eq!(
            ApiError::internal("Failed to fetch movies", "boom").into_response().status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_missing_message() {
        assert_eq!(ApiError::missing("Query").to_string(), "Query parameter is required");
    }

    #[test]
    fn test_listing_display() {
        let error = ApiError::Listing {
            source_name: "moviezwap.care".to_string(),
            message: "timeout".to_string(),
        };
        assert_eq!(error.to_string(), "Failed to scrape moviezwap.care: timeout");
    }
}
