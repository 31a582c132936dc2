use std::sync::Arc;
use thiserror::Error;

use crate::models::AVAILABLE_CATEGORIES;

/// Type alias for Result with StatsError
pub type Result<T> = std::result::Result<T, StatsError>;

/// Error types for the playlist statistics pipeline
#[derive(Error, Debug)]
pub enum StatsError {
    /// YouTube API returned an error
    #[error("YouTube API error: {0}")]
    ApiError(String),

    /// Rate limit exceeded - upstream asked us to come back later
    #[error("Rate limit exceeded, retry after {retry_after} seconds")]
    RateLimitExceeded { retry_after: u64 },

    /// Network-related error (connection issues, timeouts, etc.)
    #[error("Network error: {0}")]
    NetworkError(String),

    /// Server returned 5xx error
    #[error("Server error (HTTP {status}): {message}")]
    ServerError { status: u16, message: String },

    /// Bad request (400)
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Forbidden (403), usually an invalid or restricted API key
    #[error("Access forbidden: {0}")]
    Forbidden(String),

    /// Playlist not found (404)
    #[error("Playlist not found: {0}")]
    PlaylistNotFound(String),

    /// Upstream response did not have the expected shape
    #[error("Invalid response format: {0}")]
    InvalidResponse(String),

    /// Upstream kept returning continuation tokens past the configured cap
    #[error("Pagination limit exceeded: upstream returned more than {max_pages} pages")]
    PaginationLimitExceeded { max_pages: usize },

    /// Category lookup with an identifier that names no category
    #[error("Unknown category '{requested}': available categories are: {}", AVAILABLE_CATEGORIES.as_str())]
    UnknownCategory { requested: String },

    /// Known category that no video matched in a sparse report
    #[error("No videos in category '{category}': available categories are: {}", AVAILABLE_CATEGORIES.as_str())]
    EmptyCategory { category: String },

    /// IO error (file operations, sockets, etc.)
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Failure of an aggregation run shared by several cache callers
    #[error("{0}")]
    Shared(Arc<StatsError>),
}

impl StatsError {
    /// Check if the error is transient and a later run might succeed
    pub fn is_transient(&self) -> bool {
        match self {
            StatsError::RateLimitExceeded { .. }
            | StatsError::ServerError { .. }
            | StatsError::NetworkError(_) => true,
            StatsError::Shared(inner) => inner.is_transient(),
            _ => false,
        }
    }

    /// Check if the error is permanent and should not be retried
    pub fn is_permanent(&self) -> bool {
        !self.is_transient()
    }

    /// Check if the error was caused by client input rather than a system fault
    pub fn is_client_error(&self) -> bool {
        match self {
            StatsError::UnknownCategory { .. } | StatsError::EmptyCategory { .. } => true,
            StatsError::Shared(inner) => inner.is_client_error(),
            _ => false,
        }
    }

    /// Map a non-success HTTP status from the YouTube API to an error.
    ///
    /// `retry_after` is the raw `Retry-After` header value, if any, and `body`
    /// is the response body used to extract the API's own error message.
    pub fn from_status(status: u16, retry_after: Option<&str>, body: &str) -> Self {
        let message = api_error_message(body)
            .unwrap_or_else(|| format!("HTTP {}", status));

        match status {
            429 => StatsError::RateLimitExceeded {
                retry_after: parse_retry_after(retry_after),
            },
            404 => StatsError::PlaylistNotFound(message),
            400 => StatsError::BadRequest(message),
            403 => StatsError::Forbidden(message),
            500..=599 => StatsError::ServerError { status, message },
            _ => StatsError::ApiError(message),
        }
    }
}

/// Parse a `Retry-After` header given in delay-seconds.
///
/// Returns a default of 5 seconds if the header is missing or not an integer.
fn parse_retry_after(value: Option<&str>) -> u64 {
    const DEFAULT_RETRY_AFTER: u64 = 5;

    value
        .and_then(|v| v.trim().parse::<u64>().ok())
        .unwrap_or(DEFAULT_RETRY_AFTER)
}

/// Extract `error.message` from a Google API error body
fn api_error_message(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    value
        .get("error")?
        .get("message")?
        .as_str()
        .map(|s| s.to_string())
}

impl From<reqwest::Error> for StatsError {
    fn from(error: reqwest::Error) -> Self {
        // The request URL carries the API key as a query parameter
        let error = error.without_url();

        if error.is_timeout() {
            StatsError::NetworkError(format!("Request timed out: {}", error))
        } else if error.is_connect() {
            StatsError::NetworkError(format!("Connection error: {}", error))
        } else if error.is_decode() {
            StatsError::InvalidResponse(error.to_string())
        } else if let Some(status) = error.status() {
            StatsError::from_status(status.as_u16(), None, "")
        } else {
            StatsError::NetworkError(error.to_string())
        }
    }
}
