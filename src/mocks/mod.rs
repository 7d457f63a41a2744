//! Mock implementations for testing.
//!
//! Transport, auth and content-service doubles so the streamers can be
//! exercised without a network connection.

use async_trait::async_trait;
use bytes::Bytes;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use futures::{stream, StreamExt};

use crate::auth::AuthManager;
use crate::error::{NetworkError, TutorError};
use crate::observability::MetricsRecorder;
use crate::services::{ContentService, ContentStream};
use crate::transport::{ChunkedStream, HttpMethod, HttpRequest, HttpResponse, HttpTransport, TransportError};
use crate::types::{Candidate, Content, GenerateContentRequest, GenerateContentResponse};

/// Mock HTTP transport for testing.
///
/// Responses are enqueued up front and handed out in order; every request is
/// recorded for later assertions.
///
/// ```
/// use integrations_tutor::mocks::MockHttpTransport;
/// use integrations_tutor::transport::{HttpTransport, HttpRequest, HttpMethod};
/// use std::collections::HashMap;
///
/// # tokio_test::block_on(async {
/// let transport = MockHttpTransport::new();
/// transport.enqueue_json_response(200, r#"{"status": "ok"}"#);
///
/// let request = HttpRequest {
///     method: HttpMethod::Get,
///     url: "https://example.com".to_string(),
///     headers: HashMap::new(),
///     body: None,
/// };
///
/// let response = transport.send(request).await.unwrap();
/// assert_eq!(response.status, 200);
/// transport.verify_request_count(1);
/// # });
/// ```
pub struct MockHttpTransport {
    responses: Arc<Mutex<VecDeque<Result<HttpResponse, TransportError>>>>,
    streaming_responses: Arc<Mutex<VecDeque<Result<Vec<Result<Bytes, TransportError>>, TransportError>>>>,
    requests: Arc<Mutex<Vec<HttpRequest>>>,
}

impl MockHttpTransport {
    /// Create a new mock HTTP transport.
    pub fn new() -> Self {
        Self {
            responses: Arc::new(Mutex::new(VecDeque::new())),
            streaming_responses: Arc::new(Mutex::new(VecDeque::new())),
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Enqueue a response to be returned by the next request.
    pub fn enqueue_response(&self, response: Result<HttpResponse, TransportError>) {
        self.responses.lock().unwrap().push_back(response);
    }

    /// Enqueue a JSON response with the given status code and body.
    pub fn enqueue_json_response(&self, status: u16, body: &str) {
        let mut headers = HashMap::new();
        headers.insert("content-type".to_string(), "application/json".to_string());

        self.enqueue_response(Ok(HttpResponse {
            status,
            body: Bytes::from(body.to_string()),
            headers,
        }));
    }

    /// Enqueue an error response.
    pub fn enqueue_error(&self, error: TransportError) {
        self.enqueue_response(Err(error));
    }

    /// Enqueue a streaming response with multiple chunks.
    pub fn enqueue_streaming_response(&self, chunks: Vec<Bytes>) {
        self.streaming_responses
            .lock()
            .unwrap()
            .push_back(Ok(chunks.into_iter().map(Ok).collect()));
    }

    /// Enqueue a streaming response that fails with `error` after `chunks`.
    pub fn enqueue_interrupted_stream(&self, chunks: Vec<Bytes>, error: TransportError) {
        let mut items: Vec<Result<Bytes, TransportError>> = chunks.into_iter().map(Ok).collect();
        items.push(Err(error));
        self.streaming_responses.lock().unwrap().push_back(Ok(items));
    }

    /// Enqueue a failure to open a stream.
    pub fn enqueue_streaming_error(&self, error: TransportError) {
        self.streaming_responses.lock().unwrap().push_back(Err(error));
    }

    /// All requests made so far.
    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().unwrap().clone()
    }

    /// The most recent request.
    pub fn last_request(&self) -> Option<HttpRequest> {
        self.requests.lock().unwrap().last().cloned()
    }

    /// Verify that exactly `expected` requests were made.
    pub fn verify_request_count(&self, expected: usize) {
        let actual = self.requests.lock().unwrap().len();
        assert_eq!(actual, expected, "Expected {} requests, got {}", expected, actual);
    }

    /// Verify that a request was made with the expected method and URL fragment.
    pub fn verify_request(&self, index: usize, method: HttpMethod, url_contains: &str) {
        let requests = self.requests.lock().unwrap();
        assert!(index < requests.len(), "No request at index {}", index);

        let request = &requests[index];
        assert_eq!(request.method, method, "Expected method {:?}, got {:?}", method, request.method);
        assert!(
            request.url.contains(url_contains),
            "Expected URL to contain '{}', got '{}'",
            url_contains,
            request.url
        );
    }

    /// Verify that a request carried a specific header.
    pub fn verify_header(&self, index: usize, header_name: &str, header_value: &str) {
        let requests = self.requests.lock().unwrap();
        assert!(index < requests.len(), "No request at index {}", index);

        let actual_value = requests[index].headers.get(header_name);
        assert_eq!(
            actual_value,
            Some(&header_value.to_string()),
            "Expected header '{}' to be '{}', got {:?}",
            header_name,
            header_value,
            actual_value
        );
    }
}

impl Default for MockHttpTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl HttpTransport for MockHttpTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        self.requests.lock().unwrap().push(request);

        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| {
                Err(TransportError::Connection(
                    "No response configured in MockHttpTransport".to_string(),
                ))
            })
    }

    async fn send_streaming(&self, request: HttpRequest) -> Result<ChunkedStream, TransportError> {
        self.requests.lock().unwrap().push(request);

        let items = self
            .streaming_responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| {
                Err(TransportError::Connection(
                    "No streaming response configured in MockHttpTransport".to_string(),
                ))
            })?;

        Ok(Box::pin(stream::iter(items)))
    }
}

/// Mock authentication manager for testing.
///
/// ```
/// use integrations_tutor::mocks::MockAuthManager;
/// use integrations_tutor::auth::AuthManager;
///
/// let auth = MockAuthManager::new("test-api-key");
/// assert_eq!(
///     auth.auth_header(),
///     Some(("x-goog-api-key".to_string(), "test-api-key".to_string()))
/// );
/// ```
#[derive(Clone)]
pub struct MockAuthManager {
    api_key: String,
    use_header: bool,
}

impl MockAuthManager {
    /// Header-authenticating mock.
    pub fn new(api_key: &str) -> Self {
        Self {
            api_key: api_key.to_string(),
            use_header: true,
        }
    }

    /// Query-parameter-authenticating mock.
    pub fn with_query_param(api_key: &str) -> Self {
        Self {
            api_key: api_key.to_string(),
            use_header: false,
        }
    }
}

impl AuthManager for MockAuthManager {
    fn auth_header(&self) -> Option<(String, String)> {
        self.use_header
            .then(|| ("x-goog-api-key".to_string(), self.api_key.clone()))
    }

    fn auth_query_param(&self) -> Option<(String, String)> {
        (!self.use_header).then(|| ("key".to_string(), self.api_key.clone()))
    }

    fn clone_box(&self) -> Box<dyn AuthManager> {
        Box::new(self.clone())
    }
}

#[derive(Default)]
struct RecordedMetrics {
    counters: Vec<(String, Vec<(String, String)>)>,
    histograms: Vec<(String, f64)>,
    gauges: Vec<(String, f64)>,
}

/// Metrics recorder that keeps everything in memory.
///
/// Clones share storage, so a test can hand one clone to [`TutorMetrics`]
/// and inspect another.
///
/// [`TutorMetrics`]: crate::observability::TutorMetrics
#[derive(Clone, Default)]
pub struct RecordingMetricsRecorder {
    inner: Arc<Mutex<RecordedMetrics>>,
}

impl RecordingMetricsRecorder {
    /// Create an empty recorder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of increments of counter `name`, across all labels.
    pub fn counter_total(&self, name: &str) -> usize {
        self.inner
            .lock()
            .unwrap()
            .counters
            .iter()
            .filter(|(n, _)| n == name)
            .count()
    }

    /// Number of increments of counter `name` carrying label `key=value`.
    pub fn counter_with_label(&self, name: &str, key: &str, value: &str) -> usize {
        self.inner
            .lock()
            .unwrap()
            .counters
            .iter()
            .filter(|(n, labels)| n == name && labels.iter().any(|(k, v)| k == key && v == value))
            .count()
    }

    /// Values recorded for histogram `name`, in order.
    pub fn histogram_values(&self, name: &str) -> Vec<f64> {
        self.inner
            .lock()
            .unwrap()
            .histograms
            .iter()
            .filter(|(n, _)| n == name)
            .map(|(_, v)| *v)
            .collect()
    }

    /// Last value set for gauge `name`.
    pub fn gauge_value(&self, name: &str) -> Option<f64> {
        self.inner
            .lock()
            .unwrap()
            .gauges
            .iter()
            .rev()
            .find(|(n, _)| n == name)
            .map(|(_, v)| *v)
    }
}

fn owned_labels(labels: &[(&str, &str)]) -> Vec<(String, String)> {
    labels.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
}

impl MetricsRecorder for RecordingMetricsRecorder {
    fn increment_counter(&self, name: &str, labels: &[(&str, &str)]) {
        self.inner
            .lock()
            .unwrap()
            .counters
            .push((name.to_string(), owned_labels(labels)));
    }

    fn record_histogram(&self, name: &str, value: f64, _labels: &[(&str, &str)]) {
        self.inner.lock().unwrap().histograms.push((name.to_string(), value));
    }

    fn record_gauge(&self, name: &str, value: f64, _labels: &[(&str, &str)]) {
        self.inner.lock().unwrap().gauges.push((name.to_string(), value));
    }
}

/// One scripted reply of a [`ScriptedContentService`].
#[derive(Debug, Clone)]
pub enum Script {
    /// Stream these text deltas, then end normally.
    Deltas(Vec<String>),
    /// Fail to open the stream.
    ConnectFailure(TutorError),
    /// Stream these deltas, then fail with the error.
    FailAfter(Vec<String>, TutorError),
    /// Stream these deltas, then stay pending until dropped.
    Stall(Vec<String>),
    /// Reply to a non-streaming `generate` call.
    Response(GenerateContentResponse),
}

impl Script {
    /// Stream the given deltas and end normally.
    pub fn deltas<I, S>(deltas: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Script::Deltas(deltas.into_iter().map(Into::into).collect())
    }

    /// Stream the given deltas, then drop the connection.
    pub fn interrupted<I, S>(deltas: I, message: &str) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Script::FailAfter(
            deltas.into_iter().map(Into::into).collect(),
            NetworkError::StreamInterrupted { message: message.to_string() }.into(),
        )
    }

    /// Stream the given deltas, then never produce another item.
    pub fn stalled<I, S>(deltas: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Script::Stall(deltas.into_iter().map(Into::into).collect())
    }

    /// Reply to `generate` with a single candidate carrying `text`.
    pub fn text_response(text: &str) -> Self {
        Script::Response(response_with_text(text))
    }
}

/// Content service that replays scripted replies in order.
///
/// ```
/// use futures::StreamExt;
/// use integrations_tutor::mocks::{Script, ScriptedContentService};
/// use integrations_tutor::services::ContentService;
/// use integrations_tutor::types::{Content, GenerateContentRequest};
///
/// # tokio_test::block_on(async {
/// let service = ScriptedContentService::new(vec![Script::deltas(["Hel", "lo"])]);
/// let request = GenerateContentRequest {
///     contents: vec![Content::user_text("hi")],
///     ..Default::default()
/// };
/// let stream = service.generate_stream("gemini-2.5-flash", request).await.unwrap();
/// let texts: Vec<String> = stream.map(|r| r.unwrap().text()).collect().await;
/// assert_eq!(texts, vec!["Hel", "lo"]);
/// # });
/// ```
#[derive(Clone, Default)]
pub struct ScriptedContentService {
    scripts: Arc<Mutex<VecDeque<Script>>>,
    requests: Arc<Mutex<Vec<(String, GenerateContentRequest)>>>,
    open_streams: Arc<AtomicUsize>,
}

/// Decrements the open-stream count when the stream holding it is dropped.
struct OpenStream(Arc<AtomicUsize>);

impl OpenStream {
    fn new(count: &Arc<AtomicUsize>) -> Self {
        count.fetch_add(1, Ordering::SeqCst);
        Self(Arc::clone(count))
    }
}

impl Drop for OpenStream {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl ScriptedContentService {
    /// Create a service that will play `scripts` in order.
    pub fn new(scripts: Vec<Script>) -> Self {
        Self {
            scripts: Arc::new(Mutex::new(scripts.into())),
            requests: Arc::new(Mutex::new(Vec::new())),
            open_streams: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Streams handed out by `generate_stream` that have not been dropped yet.
    pub fn open_streams(&self) -> usize {
        self.open_streams.load(Ordering::SeqCst)
    }

    /// Append another script.
    pub fn push(&self, script: Script) {
        self.scripts.lock().unwrap().push_back(script);
    }

    /// `(model, request)` pairs received so far.
    pub fn requests(&self) -> Vec<(String, GenerateContentRequest)> {
        self.requests.lock().unwrap().clone()
    }

    /// The most recent request.
    pub fn last_request(&self) -> Option<GenerateContentRequest> {
        self.requests.lock().unwrap().last().map(|(_, r)| r.clone())
    }

    fn next_script(&self, model: &str, request: GenerateContentRequest) -> Result<Script, TutorError> {
        self.requests.lock().unwrap().push((model.to_string(), request));
        self.scripts.lock().unwrap().pop_front().ok_or_else(|| {
            NetworkError::ConnectionFailed {
                message: "No script configured in ScriptedContentService".to_string(),
            }
            .into()
        })
    }
}

#[async_trait]
impl ContentService for ScriptedContentService {
    async fn generate(
        &self,
        model: &str,
        request: GenerateContentRequest,
    ) -> Result<GenerateContentResponse, TutorError> {
        match self.next_script(model, request)? {
            Script::Response(response) => Ok(response),
            Script::Deltas(deltas) | Script::Stall(deltas) => Ok(response_with_text(&deltas.concat())),
            Script::ConnectFailure(error) | Script::FailAfter(_, error) => Err(error),
        }
    }

    async fn generate_stream(
        &self,
        model: &str,
        request: GenerateContentRequest,
    ) -> Result<ContentStream, TutorError> {
        let script = self.next_script(model, request)?;
        let stall = matches!(script, Script::Stall(_));
        let items: Vec<Result<GenerateContentResponse, TutorError>> = match script {
            Script::ConnectFailure(error) => return Err(error),
            Script::Deltas(deltas) | Script::Stall(deltas) => {
                deltas.iter().map(|d| Ok(response_with_text(d))).collect()
            }
            Script::FailAfter(deltas, error) => deltas
                .iter()
                .map(|d| Ok(response_with_text(d)))
                .chain(std::iter::once(Err(error)))
                .collect(),
            Script::Response(response) => vec![Ok(response)],
        };

        let tail = if stall {
            stream::pending().left_stream()
        } else {
            stream::empty().right_stream()
        };
        let inner: ContentStream = Box::pin(stream::iter(items).chain(tail));
        let guard = OpenStream::new(&self.open_streams);

        Ok(Box::pin(stream::unfold((inner, guard), |(mut inner, guard)| async move {
            let item = inner.next().await?;
            Some((item, (inner, guard)))
        })))
    }
}

/// A response whose single candidate carries `text`.
pub fn response_with_text(text: &str) -> GenerateContentResponse {
    GenerateContentResponse {
        candidates: Some(vec![Candidate {
            content: Some(Content::model_text(text)),
            finish_reason: None,
            index: Some(0),
        }]),
        ..GenerateContentResponse::default()
    }
}

/// Encodes deltas as a `streamGenerateContent` body, one chunk per delta.
///
/// The first chunk opens the JSON array and the last one closes it, matching
/// what the API sends on the wire.
pub fn gemini_stream_body<S: AsRef<str>>(deltas: &[S]) -> Vec<Bytes> {
    let count = deltas.len();
    if count == 0 {
        return vec![Bytes::from_static(b"[]")];
    }

    deltas
        .iter()
        .enumerate()
        .map(|(i, delta)| {
            let object = serde_json::to_string(&response_with_text(delta.as_ref())).unwrap();
            let prefix = if i == 0 { "[" } else { ",\r\n" };
            let suffix = if i + 1 == count { "]" } else { "" };
            Bytes::from(format!("{}{}{}", prefix, object, suffix))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;

    fn request(url: &str) -> HttpRequest {
        HttpRequest {
            method: HttpMethod::Post,
            url: url.to_string(),
            headers: HashMap::new(),
            body: None,
        }
    }

    #[tokio::test]
    async fn test_mock_transport_multiple_responses() {
        let transport = MockHttpTransport::new();
        transport.enqueue_json_response(200, r#"{"id": 1}"#);
        transport.enqueue_json_response(201, r#"{"id": 2}"#);

        let response1 = transport.send(request("https://example.com/1")).await.unwrap();
        let response2 = transport.send(request("https://example.com/2")).await.unwrap();

        assert_eq!(response1.status, 200);
        assert_eq!(response2.status, 201);
        transport.verify_request_count(2);
        assert_eq!(transport.last_request().unwrap().url, "https://example.com/2");
    }

    #[tokio::test]
    async fn test_mock_transport_unconfigured_is_error() {
        let transport = MockHttpTransport::new();
        let result = transport.send(request("https://example.com")).await;
        assert!(matches!(result, Err(TransportError::Connection(_))));
    }

    #[tokio::test]
    async fn test_mock_transport_interrupted_stream() {
        let transport = MockHttpTransport::new();
        transport.enqueue_interrupted_stream(
            vec![Bytes::from("chunk1")],
            TransportError::Request("reset".to_string()),
        );

        let items: Vec<_> = transport
            .send_streaming(request("https://example.com/stream"))
            .await
            .unwrap()
            .collect()
            .await;

        assert_eq!(items.len(), 2);
        assert!(items[0].is_ok());
        assert!(items[1].is_err());
    }

    #[test]
    fn test_mock_auth_manager_query_param() {
        let auth = MockAuthManager::with_query_param("test-key");

        assert!(auth.auth_header().is_none());
        assert_eq!(auth.auth_query_param(), Some(("key".to_string(), "test-key".to_string())));
    }

    #[test]
    fn test_recording_metrics_recorder() {
        let recorder = RecordingMetricsRecorder::new();
        let shared = recorder.clone();

        shared.increment_counter("events", &[("type", "partial")]);
        shared.increment_counter("events", &[("type", "array")]);
        shared.record_gauge("open_streams", 2.0, &[]);
        shared.record_gauge("open_streams", 1.0, &[]);

        assert_eq!(recorder.counter_total("events"), 2);
        assert_eq!(recorder.counter_with_label("events", "type", "array"), 1);
        assert_eq!(recorder.gauge_value("open_streams"), Some(1.0));
    }

    #[tokio::test]
    async fn test_scripted_service_failures() {
        let service = ScriptedContentService::new(vec![
            Script::ConnectFailure(NetworkError::ConnectionFailed { message: "down".into() }.into()),
            Script::interrupted(["a"], "reset"),
        ]);

        let first = service.generate_stream("m", GenerateContentRequest::default()).await;
        assert!(first.is_err());

        let items: Vec<_> = service
            .generate_stream("m", GenerateContentRequest::default())
            .await
            .unwrap()
            .collect()
            .await;
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].as_ref().unwrap().text(), "a");
        assert!(items[1].is_err());
        assert_eq!(service.requests().len(), 2);
    }

    #[test]
    fn test_gemini_stream_body_framing() {
        let chunks = gemini_stream_body(&["a", "b"]);
        let body: Vec<u8> = chunks.iter().flat_map(|c| c.to_vec()).collect();
        let parsed: Vec<GenerateContentResponse> = serde_json::from_slice(&body).unwrap();

        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed[1].text(), "b");
    }
}
