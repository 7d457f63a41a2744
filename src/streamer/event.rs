//! Events produced by the streamers.

use serde_json::Value;

/// Value carried by the terminal [`StreamEvent::Complete`].
#[derive(Debug, Clone, PartialEq)]
pub enum CompletionValue {
    /// The accumulated text parsed as JSON.
    Parsed(Value),
    /// Raw accumulated text; for structured streams this means the JSON did
    /// not parse and the result is degraded.
    Text(String),
}

impl CompletionValue {
    /// Parse `raw` as JSON, falling back to the raw text.
    pub fn from_accumulated(raw: String) -> Self {
        match serde_json::from_str::<Value>(&raw) {
            Ok(value) => CompletionValue::Parsed(value),
            Err(_) => CompletionValue::Text(raw),
        }
    }

    /// Whether this is the raw-text fallback.
    pub fn is_fallback(&self) -> bool {
        matches!(self, CompletionValue::Text(_))
    }

    /// Convert into a JSON value (text becomes a JSON string).
    pub fn into_json(self) -> Value {
        match self {
            CompletionValue::Parsed(value) => value,
            CompletionValue::Text(text) => Value::String(text),
        }
    }
}

/// A unit of streamed progress.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent {
    /// A string field gained `text_delta` since its last emission.
    Partial {
        /// Field name.
        field: String,
        /// Newly decoded characters.
        text_delta: String,
    },
    /// Current items of the array field; replaces any earlier update.
    ArrayUpdate {
        /// Field name.
        field: String,
        /// All items understood so far.
        items: Vec<String>,
    },
    /// A boolean field's value, reported once.
    BooleanDetected {
        /// Field name.
        field: String,
        /// Detected literal.
        value: bool,
    },
    /// One upstream delta of a conversational turn.
    TextDelta {
        /// Delta text, unmodified.
        content: String,
    },
    /// Terminal success.
    Complete {
        /// Final value.
        value: CompletionValue,
    },
    /// Terminal upstream failure.
    Error {
        /// Failure description.
        message: String,
    },
}

impl StreamEvent {
    /// Whether no events follow this one.
    pub fn is_terminal(&self) -> bool {
        matches!(self, StreamEvent::Complete { .. } | StreamEvent::Error { .. })
    }

    /// Wire type tag.
    pub fn type_tag(&self) -> &'static str {
        match self {
            StreamEvent::Partial { .. } => "partial",
            StreamEvent::ArrayUpdate { .. } => "array",
            StreamEvent::BooleanDetected { .. } => "boolean",
            StreamEvent::TextDelta { .. } => "text",
            StreamEvent::Complete { .. } => "complete",
            StreamEvent::Error { .. } => "error",
        }
    }

    /// Field the event refers to, for field-level events.
    pub fn field(&self) -> Option<&str> {
        match self {
            StreamEvent::Partial { field, .. }
            | StreamEvent::ArrayUpdate { field, .. }
            | StreamEvent::BooleanDetected { field, .. } => Some(field),
            _ => None,
        }
    }

    pub(crate) fn partial(field: &str, text_delta: impl Into<String>) -> Self {
        StreamEvent::Partial {
            field: field.to_string(),
            text_delta: text_delta.into(),
        }
    }
}
