//! Structured generation streamed field by field.

use futures::{ready, Stream};
use serde_json::json;
use std::collections::VecDeque;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use uuid::Uuid;

use super::event::StreamEvent;
use super::scanner::FieldScanner;
use super::session::{error_event, StreamKind, Telemetry, Upstream};
use crate::observability::Observability;
use crate::schema::ResponseSchema;
use crate::services::ContentService;
use crate::types::{Content, GenerateContentRequest, GenerationConfig, Part, Role};

/// Streams a JSON-constrained generation as typed field events.
///
/// Each call to [`stream`](Self::stream) opens exactly one upstream
/// connection, on the first poll of the returned stream.
///
/// ```no_run
/// use std::sync::Arc;
/// use futures::StreamExt;
/// use integrations_tutor::observability::create_noop_stack;
/// use integrations_tutor::schema::ResponseSchema;
/// use integrations_tutor::services::ContentService;
/// use integrations_tutor::streamer::IncrementalJsonFieldStreamer;
/// use integrations_tutor::types::Part;
///
/// # async fn run(service: Arc<dyn ContentService>) {
/// let streamer = IncrementalJsonFieldStreamer::new(service, "gemini-2.0-flash-exp", create_noop_stack("tutor"));
/// let mut events = streamer.stream(
///     "You are a tutor.",
///     vec![Part::text("Problem: ..."), Part::text("Attempt: ...")],
///     ResponseSchema::analysis(),
/// );
/// while let Some(event) = events.next().await {
///     println!("{:?}", event);
/// }
/// # }
/// ```
#[derive(Clone)]
pub struct IncrementalJsonFieldStreamer {
    service: Arc<dyn ContentService>,
    model: String,
    obs: Observability,
}

impl IncrementalJsonFieldStreamer {
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

    /// Start a session. Nothing is sent until the stream is first polled.
    pub fn stream(
        &self,
        system_instruction: &str,
        prompt: Vec<Part>,
        schema: ResponseSchema,
    ) -> FieldEventStream {
        let request = structured_request(system_instruction, prompt, &schema);
        let telemetry = Telemetry::start(
            StreamKind::Fields,
            &self.model,
            self.obs.clone(),
            json!({ "fields": schema.fields().iter().map(|f| f.name.as_str()).collect::<Vec<_>>() }),
        );

        FieldEventStream {
            upstream: Upstream::connect(self.service.clone(), self.model.clone(), request),
            scanner: Some(FieldScanner::new(schema)),
            pending: VecDeque::new(),
            telemetry,
        }
    }
}

/// Request asking for JSON output conforming to `schema`.
pub fn structured_request(
    system_instruction: &str,
    prompt: Vec<Part>,
    schema: &ResponseSchema,
) -> GenerateContentRequest {
    GenerateContentRequest {
        contents: vec![Content::with_role(Role::User, prompt)],
        system_instruction: Some(Content::instruction(system_instruction)),
        generation_config: Some(GenerationConfig::json_output(schema.to_gemini_schema())),
    }
}

/// Event stream of one structured session.
///
/// Yields zero or more field events followed by exactly one `Complete` or
/// `Error`, then ends. Dropping it closes the upstream connection.
pub struct FieldEventStream {
    upstream: Upstream,
    scanner: Option<FieldScanner>,
    pending: VecDeque<StreamEvent>,
    telemetry: Telemetry,
}

impl FieldEventStream {
    /// Identifier used in this session's log records.
    pub fn session_id(&self) -> Uuid {
        self.telemetry.session_id()
    }
}

impl Stream for FieldEventStream {
    type Item = StreamEvent;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();

        loop {
            if let Some(event) = this.pending.pop_front() {
                this.telemetry.record(&event);
                return Poll::Ready(Some(event));
            }

            // terminal event already handed out
            let Some(scanner) = this.scanner.as_mut() else {
                return Poll::Ready(None);
            };

            match ready!(this.upstream.poll_delta(cx)) {
                Some(Ok(delta)) => this.pending.extend(scanner.push(&delta)),
                Some(Err(e)) => {
                    this.scanner = None;
                    this.pending.push_back(error_event(&e));
                }
                None => {
                    if let Some(scanner) = this.scanner.take() {
                        this.pending.push_back(scanner.finish());
                    }
                }
            }
        }
    }
}
