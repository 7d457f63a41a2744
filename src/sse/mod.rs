//! Server-Sent Events framing for stream events.
//!
//! Each event becomes one `data: <json>\n\n` record where `<json>` is
//! `{type, field?, content, is_complete}`.

use bytes::Bytes;
use futures::{Stream, StreamExt};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::TutorResult;
use crate::streamer::StreamEvent;

/// Response headers a transport should send with an event stream.
pub const SSE_HEADERS: [(&str, &str); 3] = [
    ("Content-Type", "text/event-stream"),
    ("Cache-Control", "no-cache"),
    ("X-Accel-Buffering", "no"),
];

/// Field reported on the terminal `complete` record of a structured stream.
pub const COMPLETE_FIELD: &str = "all";

/// Field reported on the terminal `error` record of a structured stream.
pub const ERROR_FIELD: &str = "error";

/// JSON payload of one SSE record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WireEvent {
    /// `partial`, `array`, `boolean`, `text`, `complete` or `error`.
    #[serde(rename = "type")]
    pub kind: String,
    /// Field name, omitted on conversational records.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    /// Event payload.
    pub content: Value,
    /// True on the terminal record.
    pub is_complete: bool,
}

/// Which record layout to produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SseMode {
    /// Structured streams: terminal records carry `field` `"all"` / `"error"`.
    Fields,
    /// Conversational streams: no `field` at all.
    Chat,
}

/// Encodes [`StreamEvent`]s as SSE records.
///
/// ```
/// use integrations_tutor::sse::SseEncoder;
/// use integrations_tutor::streamer::StreamEvent;
///
/// let encoder = SseEncoder::fields();
/// let frame = encoder
///     .frame(&StreamEvent::BooleanDetected { field: "is_correct".into(), value: true })
///     .unwrap();
/// assert_eq!(
///     &frame[..],
///     &b"data: {\"type\":\"boolean\",\"field\":\"is_correct\",\"content\":true,\"is_complete\":false}\n\n"[..]
/// );
/// ```
#[derive(Debug, Clone, Copy)]
pub struct SseEncoder {
    mode: SseMode,
}

impl SseEncoder {
    /// Encoder for the given mode.
    pub fn new(mode: SseMode) -> Self {
        Self { mode }
    }

    /// Encoder for structured streams.
    pub fn fields() -> Self {
        Self::new(SseMode::Fields)
    }

    /// Encoder for conversational streams.
    pub fn chat() -> Self {
        Self::new(SseMode::Chat)
    }

    /// Wire payload for `event`.
    pub fn encode(&self, event: &StreamEvent) -> WireEvent {
        let (field, content) = match event {
            StreamEvent::Partial { field, text_delta } => (Some(field.clone()), Value::String(text_delta.clone())),
            StreamEvent::ArrayUpdate { field, items } => (
                Some(field.clone()),
                Value::Array(items.iter().cloned().map(Value::String).collect()),
            ),
            StreamEvent::BooleanDetected { field, value } => (Some(field.clone()), Value::Bool(*value)),
            StreamEvent::TextDelta { content } => (None, Value::String(content.clone())),
            StreamEvent::Complete { value } => {
                (self.terminal_field(COMPLETE_FIELD), value.clone().into_json())
            }
            StreamEvent::Error { message } => (self.terminal_field(ERROR_FIELD), Value::String(message.clone())),
        };

        let field = match self.mode {
            SseMode::Fields => field,
            SseMode::Chat => None,
        };

        WireEvent {
            kind: event.type_tag().to_string(),
            field,
            content,
            is_complete: event.is_terminal(),
        }
    }

    fn terminal_field(&self, name: &str) -> Option<String> {
        (self.mode == SseMode::Fields).then(|| name.to_string())
    }

    /// Full `data: ...\n\n` record for `event`.
    pub fn frame(&self, event: &StreamEvent) -> TutorResult<Bytes> {
        let json = serde_json::to_string(&self.encode(event))?;
        Ok(Bytes::from(format!("data: {}\n\n", json)))
    }
}

/// Frames every event of `events` as an SSE record.
pub fn encode_sse<S>(events: S, encoder: SseEncoder) -> impl Stream<Item = TutorResult<Bytes>> + Send
where
    S: Stream<Item = StreamEvent> + Send,
{
    events.map(move |event| encoder.frame(&event))
}

/// Parses one `data: ...` record back into its payload.
pub fn parse_frame(frame: &[u8]) -> TutorResult<WireEvent> {
    let text = String::from_utf8_lossy(frame);
    let data = text
        .lines()
        .filter_map(|line| line.strip_prefix("data:"))
        .map(str::trim_start)
        .collect::<Vec<_>>()
        .join("\n");
    Ok(serde_json::from_str(&data)?)
}
