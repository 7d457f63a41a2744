//! Metrics recording for requests and streaming sessions.

use std::collections::HashMap;

/// Metrics sink.
pub trait MetricsRecorder: Send + Sync {
    /// Increment a counter metric.
    fn increment_counter(&self, name: &str, labels: &[(&str, &str)]);

    /// Record a histogram value.
    fn record_histogram(&self, name: &str, value: f64, labels: &[(&str, &str)]);

    /// Record a gauge value.
    fn record_gauge(&self, name: &str, value: f64, labels: &[(&str, &str)]);
}

/// Domain-level metrics on top of a [`MetricsRecorder`].
///
/// Metric names are prefixed, e.g. `tutor_stream_events_total`.
pub struct TutorMetrics {
    prefix: String,
    recorder: Box<dyn MetricsRecorder>,
}

impl TutorMetrics {
    /// Create a new metrics wrapper.
    pub fn new(prefix: &str, recorder: Box<dyn MetricsRecorder>) -> Self {
        Self {
            prefix: prefix.to_string(),
            recorder,
        }
    }

    fn name(&self, metric: &str) -> String {
        format!("{}_{}", self.prefix, metric)
    }

    /// Record a completed upstream request with status and duration.
    pub fn record_request(&self, service: &str, method: &str, status: u16, duration_ms: u64) {
        let status_str = status.to_string();
        let labels = [("service", service), ("method", method), ("status", status_str.as_str())];

        self.recorder.increment_counter(&self.name("requests_total"), &labels);
        self.recorder.record_histogram(
            &self.name("request_duration_ms"),
            duration_ms as f64,
            &[("service", service), ("method", method)],
        );

        if status >= 400 {
            self.recorder.increment_counter(&self.name("errors_total"), &labels);
        }
    }

    /// Record token usage reported by the model.
    pub fn record_tokens(&self, service: &str, prompt_tokens: i32, completion_tokens: i32) {
        let labels = [("service", service)];
        self.recorder.record_histogram(&self.name("prompt_tokens"), f64::from(prompt_tokens), &labels);
        self.recorder.record_histogram(&self.name("completion_tokens"), f64::from(completion_tokens), &labels);
        self.recorder.record_histogram(
            &self.name("total_tokens"),
            f64::from(prompt_tokens + completion_tokens),
            &labels,
        );
    }

    /// Record one emitted stream event of the given kind (`partial`, `array`, ...).
    pub fn record_stream_event(&self, stream: &str, kind: &str) {
        self.recorder.increment_counter(
            &self.name("stream_events_total"),
            &[("stream", stream), ("type", kind)],
        );
    }

    /// Record how a streaming session ended (`complete`, `fallback`, `error`, `cancelled`).
    pub fn record_stream_outcome(&self, stream: &str, outcome: &str, duration_ms: u64, events: usize) {
        let labels = [("stream", stream), ("outcome", outcome)];
        self.recorder.increment_counter(&self.name("stream_sessions_total"), &labels);
        self.recorder.record_histogram(&self.name("stream_duration_ms"), duration_ms as f64, &labels);
        self.recorder.record_histogram(&self.name("stream_event_count"), events as f64, &labels);
    }

    /// Record a response blocked by the safety filter.
    pub fn record_safety_block(&self, service: &str, reason: &str) {
        self.recorder.increment_counter(
            &self.name("safety_blocks_total"),
            &[("service", service), ("reason", reason)],
        );
    }

    /// Record a request rejected before reaching the model.
    pub fn record_validation_failure(&self, operation: &str) {
        self.recorder.increment_counter(
            &self.name("validation_failures_total"),
            &[("operation", operation)],
        );
    }
}

/// Recorder that emits metrics as `tracing` events.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingMetricsRecorder;

impl TracingMetricsRecorder {
    /// Create a new tracing metrics recorder.
    pub fn new() -> Self {
        Self
    }
}

impl MetricsRecorder for TracingMetricsRecorder {
    fn increment_counter(&self, name: &str, labels: &[(&str, &str)]) {
        let labels_map: HashMap<&str, &str> = labels.iter().copied().collect();
        tracing::debug!(
            metric_type = "counter",
            metric_name = name,
            metric_value = 1,
            labels = ?labels_map,
            "Counter incremented"
        );
    }

    fn record_histogram(&self, name: &str, value: f64, labels: &[(&str, &str)]) {
        let labels_map: HashMap<&str, &str> = labels.iter().copied().collect();
        tracing::debug!(
            metric_type = "histogram",
            metric_name = name,
            metric_value = value,
            labels = ?labels_map,
            "Histogram recorded"
        );
    }

    fn record_gauge(&self, name: &str, value: f64, labels: &[(&str, &str)]) {
        let labels_map: HashMap<&str, &str> = labels.iter().copied().collect();
        tracing::debug!(
            metric_type = "gauge",
            metric_name = name,
            metric_value = value,
            labels = ?labels_map,
            "Gauge recorded"
        );
    }
}

/// Recorder that discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopMetricsRecorder;

impl MetricsRecorder for NoopMetricsRecorder {
    fn increment_counter(&self, _name: &str, _labels: &[(&str, &str)]) {}
    fn record_histogram(&self, _name: &str, _value: f64, _labels: &[(&str, &str)]) {}
    fn record_gauge(&self, _name: &str, _value: f64, _labels: &[(&str, &str)]) {}
}
