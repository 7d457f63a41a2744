//! Transport layer error types.

use std::time::Duration;

use crate::error::{NetworkError, TutorError};
use super::http::HttpResponse;
use super::response::ResponseParser;

/// Transport error.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("Connection error: {0}")]
    Connection(String),
    #[error("Timed out after {0:?}")]
    Timeout(Duration),
    #[error("Request error: {0}")]
    Request(String),
    #[error("HTTP error {}", .0.status)]
    Status(HttpResponse),
}

impl From<TransportError> for TutorError {
    fn from(err: TransportError) -> Self {
        match err {
            TransportError::Connection(message) => {
                TutorError::Network(NetworkError::ConnectionFailed { message })
            }
            TransportError::Timeout(duration) => {
                TutorError::Network(NetworkError::Timeout { duration })
            }
            TransportError::Request(message) => {
                TutorError::Network(NetworkError::StreamInterrupted { message })
            }
            TransportError::Status(response) => ResponseParser::parse_error_response(response),
        }
    }
}
