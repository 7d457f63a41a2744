//! Upstream connection and bookkeeping shared by both streamers.

use futures::future::BoxFuture;
use futures::ready;
use serde_json::json;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Instant;
use uuid::Uuid;

use super::event::{CompletionValue, StreamEvent};
use crate::error::{ContentError, TutorError};
use crate::observability::{Observability, Span, SpanStatus};
use crate::services::{ContentService, ContentStream};
use crate::types::{GenerateContentRequest, GenerateContentResponse};

enum Phase {
    Connecting(BoxFuture<'static, Result<ContentStream, TutorError>>),
    Streaming(ContentStream),
    Done,
}

/// One lazily opened `generate_stream` call, read as text deltas.
///
/// The connection is opened on first poll. Reaching the end or an error drops
/// the upstream stream right away.
pub(crate) struct Upstream {
    phase: Phase,
}

impl Upstream {
    pub(crate) fn connect(
        service: Arc<dyn ContentService>,
        model: String,
        request: GenerateContentRequest,
    ) -> Self {
        let connect = async move { service.generate_stream(&model, request).await };
        Self {
            phase: Phase::Connecting(Box::pin(connect)),
        }
    }

    /// Next text delta; `None` once upstream has ended normally.
    pub(crate) fn poll_delta(&mut self, cx: &mut Context<'_>) -> Poll<Option<Result<String, TutorError>>> {
        loop {
            match &mut self.phase {
                Phase::Connecting(connect) => {
                    let opened = ready!(connect.as_mut().poll(cx));
                    match opened {
                        Ok(stream) => self.phase = Phase::Streaming(stream),
                        Err(e) => {
                            self.phase = Phase::Done;
                            return Poll::Ready(Some(Err(e)));
                        }
                    }
                }
                Phase::Streaming(stream) => {
                    let item = ready!(stream.as_mut().poll_next(cx));
                    match item.map(|chunk| chunk.and_then(chunk_text)) {
                        Some(Ok(text)) => return Poll::Ready(Some(Ok(text))),
                        other => {
                            self.phase = Phase::Done;
                            return Poll::Ready(other);
                        }
                    }
                }
                Phase::Done => return Poll::Ready(None),
            }
        }
    }
}

/// Text of a chunk, or an error if the prompt was blocked mid-stream.
fn chunk_text(chunk: GenerateContentResponse) -> Result<String, TutorError> {
    if let Some(reason) = chunk.prompt_feedback.as_ref().and_then(|f| f.block_reason.as_ref()) {
        return Err(ContentError::SafetyBlocked {
            reason: format!("prompt blocked: {:?}", reason),
        }
        .into());
    }
    Ok(chunk.text())
}

/// Which streamer a session belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum StreamKind {
    Fields,
    Chat,
}

impl StreamKind {
    fn name(self) -> &'static str {
        match self {
            StreamKind::Fields => "fields",
            StreamKind::Chat => "chat",
        }
    }
}

enum Outcome<'a> {
    Complete,
    Fallback,
    Error(&'a str),
    Cancelled,
}

impl Outcome<'_> {
    fn label(&self) -> &'static str {
        match self {
            Outcome::Complete => "complete",
            Outcome::Fallback => "fallback",
            Outcome::Error(_) => "error",
            Outcome::Cancelled => "cancelled",
        }
    }
}

/// Logging, tracing and metrics for one session.
pub(crate) struct Telemetry {
    session_id: Uuid,
    kind: StreamKind,
    obs: Observability,
    span: Option<Box<dyn Span>>,
    started: Instant,
    events: usize,
}

impl Telemetry {
    pub(crate) fn start(kind: StreamKind, model: &str, obs: Observability, extra: serde_json::Value) -> Self {
        let session_id = Uuid::new_v4();
        let mut span = obs.tracer.start_span(&format!("tutor.stream.{}", kind.name()));
        span.set_attribute("session_id", &session_id.to_string());
        span.set_attribute("model", model);

        let mut fields = json!({ "session_id": session_id.to_string(), "model": model });
        if let (Some(target), Some(extra)) = (fields.as_object_mut(), extra.as_object()) {
            target.extend(extra.clone());
        }
        obs.logger.debug("Stream session created", fields);

        Self {
            session_id,
            kind,
            obs,
            span: Some(span),
            started: Instant::now(),
            events: 0,
        }
    }

    pub(crate) fn session_id(&self) -> Uuid {
        self.session_id
    }

    /// Count an event about to be handed to the consumer.
    pub(crate) fn record(&mut self, event: &StreamEvent) {
        self.events += 1;
        self.obs.metrics.record_stream_event(self.kind.name(), event.type_tag());

        match event {
            StreamEvent::Complete { value } if value.is_fallback() && self.kind == StreamKind::Fields => {
                self.finish(Outcome::Fallback);
            }
            StreamEvent::Complete { .. } => self.finish(Outcome::Complete),
            StreamEvent::Error { message } => self.finish(Outcome::Error(message)),
            _ => {}
        }
    }

    fn finish(&mut self, outcome: Outcome<'_>) {
        let Some(mut span) = self.span.take() else {
            return;
        };
        let duration_ms = u64::try_from(self.started.elapsed().as_millis()).unwrap_or(u64::MAX);
        self.obs
            .metrics
            .record_stream_outcome(self.kind.name(), outcome.label(), duration_ms, self.events);

        let mut fields = json!({
            "session_id": self.session_id.to_string(),
            "stream": self.kind.name(),
            "outcome": outcome.label(),
            "events": self.events,
            "duration_ms": duration_ms,
        });

        match outcome {
            Outcome::Complete => {
                self.obs.logger.info("Stream completed", fields);
                span.set_status(SpanStatus::Ok);
            }
            Outcome::Fallback => {
                self.obs.logger.warn("Stream completed without valid JSON", fields);
                span.set_status(SpanStatus::Ok);
            }
            Outcome::Error(message) => {
                fields["error"] = json!(message);
                self.obs.logger.warn("Stream ended with upstream error", fields);
                span.set_status(SpanStatus::Error(message.to_string()));
            }
            Outcome::Cancelled => {
                self.obs.logger.debug("Stream dropped before its terminal event", fields);
                span.set_status(SpanStatus::Error("cancelled".to_string()));
            }
        }
        span.end();
    }
}

impl Drop for Telemetry {
    fn drop(&mut self) {
        self.finish(Outcome::Cancelled);
    }
}

/// Terminal event for an upstream failure.
pub(crate) fn error_event(error: &TutorError) -> StreamEvent {
    StreamEvent::Error {
        message: error.to_string(),
    }
}

/// Terminal event for a conversational turn.
pub(crate) fn text_complete(text: String) -> StreamEvent {
    StreamEvent::Complete {
        value: CompletionValue::Text(text),
    }
}
