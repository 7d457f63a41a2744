//! Integration tests for conversational streaming and the chat flow.

use std::sync::Arc;

use futures::StreamExt;
use integrations_tutor::fixtures::load_deltas;
use integrations_tutor::mocks::{RecordingMetricsRecorder, Script, ScriptedContentService};
use integrations_tutor::observability::{create_noop_stack, NoopLogger, NoopTracer, Observability, TutorMetrics};
use integrations_tutor::streamer::{
    build_contents, ChatMessage, CompletionValue, ConversationalStreamer, IncrementalJsonFieldStreamer, StreamEvent,
};
use integrations_tutor::tutor::{prompts, AnalysisContext, ChatRequest, TutorService};
use integrations_tutor::types::Role;
use pretty_assertions::assert_eq;

fn chat_streamer(service: &ScriptedContentService) -> ConversationalStreamer {
    ConversationalStreamer::new(Arc::new(service.clone()), "gemini-2.5-flash", create_noop_stack("test"))
}

fn tutor(service: &ScriptedContentService) -> TutorService {
    let obs = create_noop_stack("test");
    TutorService::new(
        IncrementalJsonFieldStreamer::new(Arc::new(service.clone()), "gemini-2.0-flash-exp", obs.clone()),
        chat_streamer(service),
        obs,
    )
}

#[test]
fn test_history_order_is_preserved() {
    let history = vec![ChatMessage::new("user", "hi"), ChatMessage::new("assistant", "hello")];

    let contents = build_contents(&history, "bye");
    let roles: Vec<_> = contents.iter().map(|c| c.role).collect();
    let texts: Vec<_> = contents.iter().map(|c| c.text()).collect();

    assert_eq!(roles, vec![Some(Role::User), Some(Role::Model), Some(Role::User)]);
    assert_eq!(texts, vec!["hi", "hello", "bye"]);
}

#[test]
fn test_role_matching_is_case_sensitive() {
    let history = vec![ChatMessage::new("Assistant", "a"), ChatMessage::new("MODEL", "b")];
    let roles: Vec<_> = build_contents(&history, "c").iter().map(|c| c.role).collect();
    assert_eq!(roles, vec![Some(Role::User); 3]);
}

#[tokio::test]
async fn test_recorded_chat_stream() {
    let deltas = load_deltas("chat");
    let service = ScriptedContentService::new(vec![Script::Deltas(deltas.clone())]);

    let events: Vec<_> = chat_streamer(&service).stream("Be Socratic.", &[], "What is a derivative?").collect().await;

    let (last, text_events) = events.split_last().unwrap();
    let relayed: Vec<_> = text_events
        .iter()
        .map(|e| match e {
            StreamEvent::TextDelta { content } => content.clone(),
            other => panic!("unexpected event {:?}", other),
        })
        .collect();
    assert_eq!(relayed, deltas);
    assert_eq!(last, &StreamEvent::Complete { value: CompletionValue::Text(deltas.concat()) });
}

#[tokio::test]
async fn test_chat_flow_sends_history_and_context() {
    let service = ScriptedContentService::new(vec![Script::deltas(["Think about slopes."])]);
    let request = ChatRequest::new("bye")
        .with_history(vec![ChatMessage::new("user", "hi"), ChatMessage::new("assistant", "hello")])
        .with_analysis_context(AnalysisContext {
            problem: Some("d/dx x^2".into()),
            tags: vec!["Calculus".into()],
            ..AnalysisContext::default()
        });

    let events: Vec<_> = tutor(&service).chat(&request).unwrap().collect().await;
    assert_eq!(events.len(), 2);

    let (model, sent) = service.requests().remove(0);
    assert_eq!(model, "gemini-2.5-flash");
    assert_eq!(sent.contents.len(), 3);
    assert_eq!(sent.contents[1].role, Some(Role::Model));

    let system = sent.system_instruction.unwrap().text();
    assert!(system.starts_with(prompts::CHAT_SYSTEM_PROMPT));
    assert!(system.contains("Problem: d/dx x^2"));
    assert!(system.contains("Student Attempt: N/A"));
    assert!(system.contains("Tags: Calculus"));
}

#[tokio::test]
async fn test_chat_flow_rejects_empty_message_without_connecting() {
    let service = ScriptedContentService::new(vec![]);
    assert!(tutor(&service).chat(&ChatRequest::new("")).is_err());
    assert!(service.requests().is_empty());
}

#[tokio::test]
async fn test_chat_connect_failure_is_single_error() {
    let service = ScriptedContentService::new(vec![]);
    let events: Vec<_> = chat_streamer(&service).stream("s", &[], "hi").collect().await;

    assert_eq!(events.len(), 1);
    assert_eq!(events[0].type_tag(), "error");
}

#[tokio::test]
async fn test_dropping_running_chat_closes_upstream() {
    let service = ScriptedContentService::new(vec![Script::stalled(["Hel"])]);
    let recorder = RecordingMetricsRecorder::new();
    let obs = Observability {
        logger: Arc::new(NoopLogger),
        tracer: Arc::new(NoopTracer),
        metrics: Arc::new(TutorMetrics::new("tutor", Box::new(recorder.clone()))),
    };
    let mut events = ConversationalStreamer::new(Arc::new(service.clone()), "gemini-2.5-flash", obs).stream("s", &[], "hi");

    assert_eq!(events.next().await, Some(StreamEvent::TextDelta { content: "Hel".into() }));
    assert_eq!(service.open_streams(), 1);

    drop(events);

    assert_eq!(service.open_streams(), 0);
    assert_eq!(recorder.counter_with_label("tutor_stream_sessions_total", "outcome", "cancelled"), 1);
    assert_eq!(recorder.counter_total("tutor_stream_sessions_total"), 1);
    assert_eq!(recorder.counter_with_label("tutor_stream_events_total", "type", "complete"), 0);
}
