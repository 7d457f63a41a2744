//! Integration tests for SSE framing of stream events.

use std::sync::Arc;

use bytes::Bytes;
use futures::{stream, StreamExt};
use integrations_tutor::error::TutorResult;
use integrations_tutor::mocks::{Script, ScriptedContentService};
use integrations_tutor::observability::create_noop_stack;
use integrations_tutor::schema::ResponseSchema;
use integrations_tutor::sse::{encode_sse, parse_frame, SseEncoder, WireEvent, SSE_HEADERS};
use integrations_tutor::streamer::{CompletionValue, ConversationalStreamer, IncrementalJsonFieldStreamer, StreamEvent};
use integrations_tutor::types::Part;
use pretty_assertions::assert_eq;
use serde_json::json;

async fn frames<S>(events: S, encoder: SseEncoder) -> Vec<Bytes>
where
    S: futures::Stream<Item = StreamEvent> + Send,
{
    let results: Vec<TutorResult<Bytes>> = encode_sse(events, encoder).collect().await;
    results.into_iter().map(|r| r.unwrap()).collect()
}

fn wire(frames: &[Bytes]) -> Vec<WireEvent> {
    frames.iter().map(|f| parse_frame(f).unwrap()).collect()
}

#[test]
fn test_event_stream_headers() {
    assert!(SSE_HEADERS.contains(&("Content-Type", "text/event-stream")));
    assert!(SSE_HEADERS.contains(&("Cache-Control", "no-cache")));
    assert!(SSE_HEADERS.contains(&("X-Accel-Buffering", "no")));
}

#[tokio::test]
async fn test_structured_stream_as_sse() {
    let service = ScriptedContentService::new(vec![Script::deltas([
        r#"{"is_correct": false, "feedback": "Check"#,
        r#" the sign"}"#,
    ])]);
    let streamer = IncrementalJsonFieldStreamer::new(Arc::new(service), "m", create_noop_stack("test"));
    let events = streamer.stream("s", vec![Part::text("p")], ResponseSchema::gym());

    let frames = frames(events, SseEncoder::fields()).await;
    for frame in &frames {
        assert!(frame.starts_with(b"data: "));
        assert!(frame.ends_with(b"\n\n"));
    }

    let records: Vec<_> = wire(&frames)
        .into_iter()
        .map(|w| serde_json::to_value(w).unwrap())
        .collect();
    assert_eq!(
        records,
        vec![
            json!({"type": "partial", "field": "feedback", "content": "Check", "is_complete": false}),
            json!({"type": "boolean", "field": "is_correct", "content": false, "is_complete": false}),
            json!({"type": "partial", "field": "feedback", "content": " the sign", "is_complete": false}),
            json!({
                "type": "complete",
                "field": "all",
                "content": {"is_correct": false, "feedback": "Check the sign"},
                "is_complete": true
            }),
        ]
    );
}

#[tokio::test]
async fn test_chat_stream_as_sse() {
    let service = ScriptedContentService::new(vec![Script::interrupted(["Hel", "lo"], "reset")]);
    let streamer = ConversationalStreamer::new(Arc::new(service), "m", create_noop_stack("test"));

    let records = wire(&frames(streamer.stream("s", &[], "hi"), SseEncoder::chat()).await);

    assert_eq!(records.len(), 3);
    assert!(records.iter().all(|r| r.field.is_none()));
    assert_eq!(records[0].kind, "text");
    assert_eq!(records[1].content, json!("lo"));
    assert_eq!(records[2].kind, "error");
    assert!(records[2].is_complete);
}

#[tokio::test]
async fn test_fallback_completion_content_is_string() {
    let events = stream::iter(vec![StreamEvent::Complete {
        value: CompletionValue::Text("not valid json{".into()),
    }]);

    let records = wire(&frames(events, SseEncoder::fields()).await);
    assert_eq!(records[0].content, json!("not valid json{"));
    assert_eq!(records[0].field.as_deref(), Some("all"));
}

#[tokio::test]
async fn test_error_record_field() {
    let events = stream::iter(vec![StreamEvent::Error { message: "Network error: boom".into() }]);

    let records = wire(&frames(events, SseEncoder::fields()).await);
    assert_eq!(records[0].field.as_deref(), Some("error"));
    assert_eq!(records[0].content, json!("Network error: boom"));
}
