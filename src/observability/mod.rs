//! Observability: structured logging, spans and metrics.
//!
//! Everything is trait-based so tests and embedders can swap in their own
//! sinks. The defaults emit `tracing` events; install a subscriber to see them.
//!
//! ```rust
//! use integrations_tutor::observability::{create_default_stack, SpanStatus};
//! use integrations_tutor::config::LogLevel;
//! use serde_json::json;
//!
//! let obs = create_default_stack("tutor", LogLevel::Info);
//! obs.logger.info("Stream opened", json!({"model": "gemini-2.5-flash"}));
//!
//! let mut span = obs.tracer.start_span("tutor.stream.chat");
//! span.set_status(SpanStatus::Ok);
//! span.end();
//!
//! obs.metrics.record_stream_event("chat", "text");
//! ```

pub mod logging;
pub mod metrics;
pub mod tracing;

use std::sync::Arc;

use crate::config::LogLevel;

pub use logging::{Logger, NoopLogger, StructuredLogger};
pub use metrics::{MetricsRecorder, NoopMetricsRecorder, TracingMetricsRecorder, TutorMetrics};
pub use tracing::{NoopTracer, Span, SpanStatus, Tracer, TracingSpan, TracingTracer};

/// Shared logger, tracer and metrics handles.
///
/// Cheap to clone; streams keep a clone for their whole lifetime.
#[derive(Clone)]
pub struct Observability {
    /// Structured logger.
    pub logger: Arc<dyn Logger>,
    /// Span factory.
    pub tracer: Arc<dyn Tracer>,
    /// Metrics.
    pub metrics: Arc<TutorMetrics>,
}

/// Create the default observability stack backed by `tracing`.
pub fn create_default_stack(service_name: &str, level: LogLevel) -> Observability {
    Observability {
        logger: Arc::new(StructuredLogger::new(service_name).with_level(level)),
        tracer: Arc::new(TracingTracer::new(service_name)),
        metrics: Arc::new(TutorMetrics::new(service_name, Box::new(TracingMetricsRecorder::new()))),
    }
}

/// Create a stack that records nothing.
pub fn create_noop_stack(service_name: &str) -> Observability {
    Observability {
        logger: Arc::new(NoopLogger),
        tracer: Arc::new(NoopTracer),
        metrics: Arc::new(TutorMetrics::new(service_name, Box::new(NoopMetricsRecorder))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_create_default_stack() {
        let obs = create_default_stack("test", LogLevel::Debug);
        obs.logger.info("test", json!({}));
        obs.tracer.start_span("test").end();
        obs.metrics.record_stream_event("fields", "partial");
    }

    #[test]
    fn test_create_noop_stack() {
        let obs = create_noop_stack("test");
        let cloned = obs.clone();
        cloned.logger.error("test", json!({}));
        cloned.tracer.start_span("test").end();
    }
}
