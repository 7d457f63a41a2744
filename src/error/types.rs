//! Main error type for the tutoring stream core.

use std::time::Duration;
use thiserror::Error;
use super::categories::*;

/// Result type alias for tutor operations.
pub type TutorResult<T> = Result<T, TutorError>;

/// Top-level error type.
#[derive(Error, Debug, Clone)]
pub enum TutorError {
    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    #[error("Authentication error: {0}")]
    Authentication(#[from] AuthenticationError),

    #[error("Request error: {0}")]
    Request(#[from] RequestError),

    #[error("Rate limit error: {0}")]
    RateLimit(#[from] RateLimitError),

    #[error("Network error: {0}")]
    Network(#[from] NetworkError),

    #[error("Server error: {0}")]
    Server(#[from] ServerError),

    #[error("Response error: {0}")]
    Response(#[from] ResponseError),

    #[error("Content error: {0}")]
    Content(#[from] ContentError),

    #[error("Schema error: {0}")]
    Schema(#[from] SchemaError),
}

impl TutorError {
    /// Returns true if this error is retryable.
    ///
    /// Streamers never retry on their own; callers that have not yet relayed
    /// any event may use this to decide whether to start a new session.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            TutorError::RateLimit(_)
                | TutorError::Network(NetworkError::Timeout { .. })
                | TutorError::Network(NetworkError::ConnectionFailed { .. })
                | TutorError::Server(ServerError::ServiceUnavailable { .. })
                | TutorError::Server(ServerError::ModelOverloaded { .. })
        )
    }

    /// Returns the retry-after duration if available.
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            TutorError::RateLimit(e) => e.retry_after(),
            TutorError::Server(ServerError::ServiceUnavailable { retry_after }) => *retry_after,
            _ => None,
        }
    }

    /// Returns true for errors raised by setup validation rather than upstream.
    pub fn is_validation(&self) -> bool {
        matches!(self, TutorError::Request(_) | TutorError::Schema(_))
    }
}

impl From<reqwest::Error> for TutorError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            TutorError::Network(NetworkError::Timeout {
                duration: Duration::from_secs(0), // Unknown actual duration
            })
        } else {
            TutorError::Network(NetworkError::ConnectionFailed {
                message: err.to_string(),
            })
        }
    }
}

impl From<serde_json::Error> for TutorError {
    fn from(err: serde_json::Error) -> Self {
        TutorError::Response(ResponseError::DeserializationError {
            message: err.to_string(),
        })
    }
}

impl From<url::ParseError> for TutorError {
    fn from(err: url::ParseError) -> Self {
        TutorError::Configuration(ConfigurationError::InvalidBaseUrl {
            url: err.to_string(),
        })
    }
}

impl From<std::io::Error> for TutorError {
    fn from(err: std::io::Error) -> Self {
        TutorError::Request(RequestError::ValidationError {
            message: format!("Failed to read input: {}", err),
            details: Vec::new(),
        })
    }
}
