//! Error mapping utilities for HTTP status codes and Gemini error envelopes.

use std::time::Duration;
use serde::Deserialize;
use super::categories::*;
use super::types::TutorError;

/// Structured API error response from Gemini.
#[derive(Debug, Deserialize)]
pub struct ApiErrorResponse {
    pub error: ApiErrorDetail,
}

/// Detailed error information from API.
#[derive(Debug, Deserialize)]
pub struct ApiErrorDetail {
    #[serde(default)]
    pub code: i32,
    pub message: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub details: Vec<serde_json::Value>,
}

/// Maps HTTP status codes and response body to appropriate `TutorError` variants.
///
/// The body is parsed as a Gemini error envelope when possible; otherwise the
/// raw text is used as the message.
pub fn map_http_status_with_body(status: u16, body: &[u8]) -> TutorError {
    let (message, error_details) = match serde_json::from_slice::<ApiErrorResponse>(body) {
        Ok(error_response) => (error_response.error.message.clone(), Some(error_response.error)),
        Err(_) => (String::from_utf8_lossy(body).to_string(), None),
    };

    match status {
        400 => {
            let details = error_details
                .as_ref()
                .map(|e| parse_validation_details(&e.details))
                .unwrap_or_default();

            TutorError::Request(RequestError::ValidationError { message, details })
        }

        401 => TutorError::Authentication(AuthenticationError::InvalidApiKey),

        403 => {
            let permission_denied = error_details
                .as_ref()
                .is_some_and(|d| d.status.eq_ignore_ascii_case("PERMISSION_DENIED"));

            if message.to_lowercase().contains("quota") || permission_denied {
                TutorError::Authentication(AuthenticationError::QuotaExceeded)
            } else {
                TutorError::Authentication(AuthenticationError::InvalidApiKey)
            }
        }

        404 => TutorError::Request(RequestError::InvalidModel {
            model: extract_resource_name(&message),
        }),

        413 => {
            let (size, max_size) = extract_size_info(&message);
            TutorError::Request(RequestError::PayloadTooLarge { size, max_size })
        }

        415 => TutorError::Request(RequestError::UnsupportedMediaType {
            mime_type: extract_mime_type(&message),
        }),

        // retry_after is filled in from headers by the response parser
        429 => {
            if error_details.as_ref().is_some_and(|d| d.status == "RESOURCE_EXHAUSTED")
                && message.to_lowercase().contains("quota")
            {
                TutorError::RateLimit(RateLimitError::QuotaExceeded { retry_after: None })
            } else {
                TutorError::RateLimit(RateLimitError::TooManyRequests { retry_after: None })
            }
        }

        500 => TutorError::Server(ServerError::InternalError { message }),

        503 => {
            if message.to_lowercase().contains("overload") {
                TutorError::Server(ServerError::ModelOverloaded {
                    model: extract_resource_name(&message),
                })
            } else {
                TutorError::Server(ServerError::ServiceUnavailable { retry_after: None })
            }
        }

        _ => TutorError::Server(ServerError::InternalError {
            message: format!("HTTP {}: {}", status, message),
        }),
    }
}

/// Maps a status code and plain message.
pub fn map_http_status(status: u16, message: &str) -> TutorError {
    map_http_status_with_body(status, message.as_bytes())
}

/// Maps a Gemini `status` string (e.g. `RESOURCE_EXHAUSTED`) to an error.
pub fn map_api_error(error_type: &str, message: String) -> TutorError {
    match error_type {
        "INVALID_ARGUMENT" | "FAILED_PRECONDITION" => {
            TutorError::Request(RequestError::ValidationError {
                message,
                details: vec![],
            })
        }
        "UNAUTHENTICATED" => TutorError::Authentication(AuthenticationError::InvalidApiKey),
        "PERMISSION_DENIED" => TutorError::Authentication(AuthenticationError::QuotaExceeded),
        "NOT_FOUND" => TutorError::Request(RequestError::InvalidModel {
            model: extract_resource_name(&message),
        }),
        "RESOURCE_EXHAUSTED" => TutorError::RateLimit(RateLimitError::QuotaExceeded {
            retry_after: Some(Duration::from_secs(60)),
        }),
        "UNAVAILABLE" => TutorError::Server(ServerError::ServiceUnavailable {
            retry_after: Some(Duration::from_secs(30)),
        }),
        "DEADLINE_EXCEEDED" => TutorError::Network(NetworkError::Timeout {
            duration: Duration::from_secs(30),
        }),
        _ => TutorError::Server(ServerError::InternalError {
            message: format!("{}: {}", error_type, message),
        }),
    }
}

/// Extracts a resource name from an error message (simple heuristic).
fn extract_resource_name(message: &str) -> String {
    if let Some(found) = message
        .split_whitespace()
        .find(|s| s.starts_with("models/"))
    {
        return found
            .trim_matches(|c: char| !c.is_alphanumeric() && c != '/' && c != '-' && c != '_' && c != '.')
            .to_string();
    }

    for quote in ['\'', '"'] {
        if let Some(start) = message.find(quote) {
            if let Some(end) = message[start + 1..].find(quote) {
                return message[start + 1..start + 1 + end].to_string();
            }
        }
    }

    "unknown".to_string()
}

/// Extracts size information from error message.
fn extract_size_info(message: &str) -> (usize, usize) {
    let numbers: Vec<usize> = message
        .split_whitespace()
        .filter_map(|s| s.trim_matches(|c: char| !c.is_numeric()).parse().ok())
        .collect();

    match numbers.as_slice() {
        [] => (0, 0),
        [size] => (*size, 0),
        [size, max, ..] => (*size, *max),
    }
}

/// Extracts MIME type from error message.
fn extract_mime_type(message: &str) -> String {
    message
        .split_whitespace()
        .map(|word| word.trim_matches(|c: char| !c.is_alphanumeric() && c != '/'))
        .find(|word| word.parse::<mime::Mime>().is_ok() && word.contains('/'))
        .map_or_else(|| "unknown".to_string(), str::to_string)
}

/// Parses validation details from error response details array.
fn parse_validation_details(details: &[serde_json::Value]) -> Vec<ValidationDetail> {
    details
        .iter()
        .filter_map(|detail| detail.as_object())
        .filter_map(|obj| {
            let field = obj
                .get("field")
                .or_else(|| obj.get("fieldPath"))
                .and_then(|v| v.as_str())
                .unwrap_or("unknown");

            let description = obj
                .get("description")
                .or_else(|| obj.get("message"))
                .and_then(|v| v.as_str())
                .unwrap_or("");

            (!description.is_empty()).then(|| ValidationDetail {
                field: field.to_string(),
                description: description.to_string(),
            })
        })
        .collect()
}
