//! Free-form conversational turns.

use futures::{ready, Stream};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use uuid::Uuid;

use super::event::StreamEvent;
use super::session::{error_event, text_complete, StreamKind, Telemetry, Upstream};
use crate::observability::Observability;
use crate::services::ContentService;
use crate::types::{Content, GenerateContentRequest, Part, Role};

/// One prior turn, as received from a client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Free-form role tag; see [`normalize_role`].
    #[serde(default = "default_role")]
    pub role: String,
    /// Turn text.
    #[serde(default)]
    pub content: String,
}

fn default_role() -> String {
    "user".to_string()
}

impl ChatMessage {
    /// A turn with the given role tag.
    pub fn new(role: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            content: content.into(),
        }
    }
}

/// `"assistant"` and `"model"` map to the model role; anything else is the user.
///
/// ```
/// use integrations_tutor::streamer::normalize_role;
/// use integrations_tutor::types::Role;
///
/// assert_eq!(normalize_role("assistant"), Role::Model);
/// assert_eq!(normalize_role("model"), Role::Model);
/// assert_eq!(normalize_role("system"), Role::User);
/// ```
pub fn normalize_role(role: &str) -> Role {
    match role {
        "assistant" | "model" => Role::Model,
        _ => Role::User,
    }
}

/// History in order, followed by `message` as the final user turn.
pub fn build_contents(history: &[ChatMessage], message: &str) -> Vec<Content> {
    history
        .iter()
        .map(|turn| Content::with_role(normalize_role(&turn.role), vec![Part::text(turn.content.clone())]))
        .chain(std::iter::once(Content::user_text(message)))
        .collect()
}

/// Streams chat replies as text deltas.
#[derive(Clone)]
pub struct ConversationalStreamer {
    service: Arc<dyn ContentService>,
    model: String,
    obs: Observability,
}

impl ConversationalStreamer {
    /// Create a streamer over `service`, generating with `model`.
    pub fn new(service: Arc<dyn ContentService>, model: impl Into<String>, obs: Observability) -> Self {
        Self {
            service,
            model: model.into(),
            obs,
        }
    }

    /// Model used for generation.
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Start a turn. Nothing is sent until the stream is first polled.
    pub fn stream(&self, system_instruction: &str, history: &[ChatMessage], message: &str) -> ChatEventStream {
        let request = GenerateContentRequest {
            contents: build_contents(history, message),
            system_instruction: Some(Content::instruction(system_instruction)),
            generation_config: None,
        };
        let telemetry = Telemetry::start(
            StreamKind::Chat,
            &self.model,
            self.obs.clone(),
            json!({ "history_len": history.len() }),
        );

        ChatEventStream {
            upstream: Upstream::connect(self.service.clone(), self.model.clone(), request),
            text: String::new(),
            done: false,
            telemetry,
        }
    }
}

/// Event stream of one conversational turn: `TextDelta`s, then `Complete`
/// carrying the whole reply, or `Error`.
pub struct ChatEventStream {
    upstream: Upstream,
    text: String,
    done: bool,
    telemetry: Telemetry,
}

impl ChatEventStream {
    /// Identifier used in this session's log records.
    pub fn session_id(&self) -> Uuid {
        self.telemetry.session_id()
    }
}

impl Stream for ChatEventStream {
    type Item = StreamEvent;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        if this.done {
            return Poll::Ready(None);
        }

        let event = loop {
            match ready!(this.upstream.poll_delta(cx)) {
                Some(Ok(delta)) if delta.is_empty() => continue,
                Some(Ok(delta)) => {
                    this.text.push_str(&delta);
                    break StreamEvent::TextDelta { content: delta };
                }
                Some(Err(e)) => {
                    this.done = true;
                    break error_event(&e);
                }
                None => {
                    this.done = true;
                    break text_complete(std::mem::take(&mut this.text));
                }
            }
        };

        this.telemetry.record(&event);
        Poll::Ready(Some(event))
    }
}
