//! Integration tests for the incremental JSON field streamer.

use std::sync::Arc;

use futures::StreamExt;
use integrations_tutor::drafts::{AnalysisDraft, GymDraft, StreamDraft};
use integrations_tutor::fixtures::load_deltas;
use integrations_tutor::mocks::{RecordingMetricsRecorder, Script, ScriptedContentService};
use integrations_tutor::observability::{create_noop_stack, NoopLogger, NoopTracer, Observability, TutorMetrics};
use integrations_tutor::schema::{FieldSchema, ResponseSchema};
use integrations_tutor::streamer::{
    scan, CompletionValue, FieldScanner, IncrementalJsonFieldStreamer, ScanCursors, StreamEvent,
};
use integrations_tutor::types::Part;
use pretty_assertions::assert_eq;
use serde_json::{json, Value};

fn streamer(service: &ScriptedContentService) -> IncrementalJsonFieldStreamer {
    IncrementalJsonFieldStreamer::new(Arc::new(service.clone()), "gemini-2.0-flash-exp", create_noop_stack("test"))
}

fn derivatives_schema() -> ResponseSchema {
    ResponseSchema::new(vec![
        FieldSchema::string("title"),
        FieldSchema::string_array("tags"),
        FieldSchema::boolean("is_correct"),
    ])
    .unwrap()
}

fn partials(events: &[StreamEvent], field: &str) -> Vec<String> {
    events
        .iter()
        .filter_map(|event| match event {
            StreamEvent::Partial { field: f, text_delta } if f == field => Some(text_delta.clone()),
            _ => None,
        })
        .collect()
}

fn array_updates(events: &[StreamEvent]) -> Vec<Vec<String>> {
    events
        .iter()
        .filter_map(|event| match event {
            StreamEvent::ArrayUpdate { items, .. } => Some(items.clone()),
            _ => None,
        })
        .collect()
}

async fn run(deltas: Vec<String>, schema: ResponseSchema) -> Vec<StreamEvent> {
    let service = ScriptedContentService::new(vec![Script::Deltas(deltas)]);
    streamer(&service)
        .stream("system", vec![Part::text("prompt")], schema)
        .collect()
        .await
}

#[tokio::test]
async fn test_derivatives_session() {
    let events = run(
        vec![
            r#"{"title": "Der"#.into(),
            r#"ivatives", "tags": ["Calc"#.into(),
            r#"ulus","Chain"], "is_correct": tru"#.into(),
            "e}".into(),
        ],
        derivatives_schema(),
    )
    .await;

    assert_eq!(
        events,
        vec![
            StreamEvent::Partial { field: "title".into(), text_delta: "Der".into() },
            StreamEvent::Partial { field: "title".into(), text_delta: "ivatives".into() },
            StreamEvent::ArrayUpdate { field: "tags".into(), items: vec!["Calc".into()] },
            StreamEvent::ArrayUpdate { field: "tags".into(), items: vec!["Calculus".into(), "Chain".into()] },
            StreamEvent::BooleanDetected { field: "is_correct".into(), value: true },
            StreamEvent::Complete {
                value: CompletionValue::Parsed(json!({
                    "title": "Derivatives",
                    "tags": ["Calculus", "Chain"],
                    "is_correct": true
                }))
            },
        ]
    );
}

#[tokio::test]
async fn test_interrupted_session_has_no_complete() {
    let service = ScriptedContentService::new(vec![Script::interrupted([r#"{"title": "Der"#], "connection reset")]);
    let events: Vec<_> = streamer(&service)
        .stream("system", vec![Part::text("prompt")], derivatives_schema())
        .collect()
        .await;

    assert_eq!(events.len(), 2);
    assert_eq!(events[0], StreamEvent::Partial { field: "title".into(), text_delta: "Der".into() });
    assert!(matches!(&events[1], StreamEvent::Error { .. }));
    assert!(!events.iter().any(|e| matches!(e, StreamEvent::Complete { .. })));
}

#[tokio::test]
async fn test_invalid_json_completes_with_raw_text() {
    let events = run(vec!["not valid json{".into()], derivatives_schema()).await;

    assert_eq!(
        events,
        vec![StreamEvent::Complete { value: CompletionValue::Text("not valid json{".into()) }]
    );
}

#[tokio::test]
async fn test_recorded_analysis_stream() {
    let deltas = load_deltas("analysis");
    let expected: Value = serde_json::from_str(&deltas.concat()).unwrap();

    let events = run(deltas, ResponseSchema::analysis()).await;

    assert_eq!(partials(&events, "title"), vec!["The Miss", "ing Inner Gear"]);
    // the backslash of "\\sin" arrives split across two deltas
    assert_eq!(partials(&events, "praise"), vec!["You differentiated $", "\\sin$ correctly."]);
    assert_eq!(
        array_updates(&events),
        vec![
            vec!["Calc".to_string()],
            vec!["Calculus".to_string(), "Chain Rule".to_string()],
        ]
    );

    for field in ["title", "praise", "diagnosis", "explanation", "practice_problem"] {
        assert_eq!(partials(&events, field).concat(), expected[field].as_str().unwrap(), "field {}", field);
    }

    let last = events.last().unwrap();
    assert_eq!(last, &StreamEvent::Complete { value: CompletionValue::Parsed(expected.clone()) });

    let mut draft = AnalysisDraft::default();
    draft.apply_all(&events);
    assert_eq!(draft.title, "The Missing Inner Gear");
    assert_eq!(draft.tags, vec!["Calculus", "Chain Rule"]);
    assert_eq!(draft.practice_problem, "Differentiate $\\cos(3x^2)$.");
}

#[tokio::test]
async fn test_recorded_gym_stream() {
    let events = run(load_deltas("gym"), ResponseSchema::gym()).await;

    let booleans: Vec<_> = events
        .iter()
        .filter(|e| matches!(e, StreamEvent::BooleanDetected { .. }))
        .collect();
    assert_eq!(booleans, vec![&StreamEvent::BooleanDetected { field: "is_correct".into(), value: true }]);

    let mut draft = GymDraft::default();
    draft.apply_all(&events);
    assert_eq!(draft.is_correct, Some(true));
    assert_eq!(draft.solution, "$$\\frac{d}{dx}x^2 = 2x$$");
    assert_eq!(draft.next_question, "Differentiate $x^3$.");
}

#[tokio::test]
async fn test_exactly_one_terminal_event() {
    for script in [
        Script::deltas([r#"{"title": "x"}"#]),
        Script::deltas(["garbage"]),
        Script::interrupted(["{"], "reset"),
        Script::Deltas(vec![]),
    ] {
        let service = ScriptedContentService::new(vec![script]);
        let events: Vec<_> = streamer(&service)
            .stream("s", vec![Part::text("p")], derivatives_schema())
            .collect()
            .await;

        assert_eq!(events.iter().filter(|e| e.is_terminal()).count(), 1);
        assert!(events.last().unwrap().is_terminal());
    }
}

#[tokio::test]
async fn test_dropping_running_session_closes_upstream() {
    let service = ScriptedContentService::new(vec![Script::stalled([r#"{"title": "Der"#])]);
    let recorder = RecordingMetricsRecorder::new();
    let obs = Observability {
        logger: Arc::new(NoopLogger),
        tracer: Arc::new(NoopTracer),
        metrics: Arc::new(TutorMetrics::new("tutor", Box::new(recorder.clone()))),
    };
    let mut events = IncrementalJsonFieldStreamer::new(Arc::new(service.clone()), "gemini-2.0-flash-exp", obs)
        .stream("system", vec![Part::text("prompt")], derivatives_schema());

    let first = events.next().await;
    assert_eq!(first, Some(StreamEvent::Partial { field: "title".into(), text_delta: "Der".into() }));
    assert_eq!(service.open_streams(), 1);

    drop(events);

    assert_eq!(service.open_streams(), 0);
    assert_eq!(recorder.counter_with_label("tutor_stream_sessions_total", "outcome", "cancelled"), 1);
    assert_eq!(recorder.counter_total("tutor_stream_sessions_total"), 1);
    assert_eq!(recorder.counter_with_label("tutor_stream_events_total", "type", "complete"), 0);
    assert_eq!(recorder.histogram_values("tutor_stream_duration_ms").len(), 1);
}

#[tokio::test]
async fn test_empty_upstream_completes_with_empty_text() {
    let events = run(vec![], derivatives_schema()).await;
    assert_eq!(events, vec![StreamEvent::Complete { value: CompletionValue::Text(String::new()) }]);
}

#[test]
fn test_scan_is_pure_and_resumable() {
    let schema = derivatives_schema();
    let text = r#"{"title": "Derivatives", "tags": ["Calculus"], "is_correct": false}"#;

    let (first, cursors) = scan(text, &schema, &ScanCursors::default());
    let (again, same_cursors) = scan(text, &schema, &ScanCursors::default());
    assert_eq!(first, again);
    assert_eq!(cursors, same_cursors);

    let (nothing_new, _) = scan(text, &schema, &cursors);
    assert!(nothing_new.is_empty());
    assert_eq!(cursors.emitted("title"), "Derivatives".chars().count());
    assert!(cursors.boolean_fired("is_correct"));
}

#[test]
fn test_scanner_matches_one_shot_scan_for_any_split() {
    let schema = derivatives_schema();
    let body = r#"{"title": "Chain \"rule\" é", "tags": ["a,b", "c]"], "is_correct": false}"#;
    let expected: Value = serde_json::from_str(body).unwrap();

    let chars: Vec<char> = body.chars().collect();
    for split in 0..=chars.len() {
        let (head, tail): (String, String) = (chars[..split].iter().collect(), chars[split..].iter().collect());
        let mut scanner = FieldScanner::new(schema.clone());
        let mut events = scanner.push(&head);
        events.extend(scanner.push(&tail));

        assert_eq!(partials(&events, "title").concat(), expected["title"].as_str().unwrap());
        assert_eq!(
            array_updates(&events).last().cloned().unwrap_or_default(),
            vec!["a,b".to_string(), "c]".to_string()],
            "split at {}",
            split
        );
        assert_eq!(
            scanner.finish(),
            StreamEvent::Complete { value: CompletionValue::Parsed(expected.clone()) }
        );
    }
}
