//! Builder for creating tutoring client instances.

use secrecy::SecretString;
use std::sync::Arc;

use crate::auth::{ApiKeyAuthManager, AuthManager};
use crate::config::{api_key_from_env, TutorConfig};
use crate::error::{ConfigurationError, NetworkError, TutorError};
use crate::observability::{
    Logger, MetricsRecorder, NoopMetricsRecorder, NoopTracer, Observability, StructuredLogger, TracingMetricsRecorder,
    TracingTracer, Tracer, TutorMetrics,
};
use crate::services::{ContentService, ContentServiceImpl};
use crate::transport::{HttpTransport, ReqwestTransport};

use super::client::TutorClientImpl;

const SERVICE_NAME: &str = "tutor";

/// Builder for [`TutorClientImpl`].
///
/// ```no_run
/// use integrations_tutor::client::TutorClientBuilder;
/// use secrecy::SecretString;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let client = TutorClientBuilder::new()
///     .api_key(SecretString::new("your-api-key".into()))
///     .build()?;
/// # Ok(())
/// # }
/// ```
#[derive(Default)]
pub struct TutorClientBuilder {
    config: Option<TutorConfig>,
    api_key: Option<SecretString>,

    // Injectable dependencies for testing
    transport: Option<Arc<dyn HttpTransport>>,
    content_service: Option<Arc<dyn ContentService>>,
    observability: Option<Observability>,
    logger: Option<Arc<dyn Logger>>,
    tracer: Option<Arc<dyn Tracer>>,
    metrics: Option<Box<dyn MetricsRecorder>>,
}

impl TutorClientBuilder {
    /// Creates a new builder with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a builder from an existing configuration.
    pub fn from_config(config: TutorConfig) -> Self {
        Self {
            config: Some(config),
            ..Self::default()
        }
    }

    /// Sets the API key. Ignored when a full configuration was given.
    pub fn api_key(mut self, key: SecretString) -> Self {
        self.api_key = Some(key);
        self
    }

    /// Sets a custom HTTP transport.
    pub fn transport(mut self, transport: Arc<dyn HttpTransport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Replaces the Gemini content service entirely.
    pub fn content_service(mut self, service: Arc<dyn ContentService>) -> Self {
        self.content_service = Some(service);
        self
    }

    /// Sets a complete observability stack.
    pub fn observability(mut self, obs: Observability) -> Self {
        self.observability = Some(obs);
        self
    }

    /// Sets a custom logger.
    pub fn logger(mut self, logger: Arc<dyn Logger>) -> Self {
        self.logger = Some(logger);
        self
    }

    /// Sets a custom tracer.
    pub fn tracer(mut self, tracer: Arc<dyn Tracer>) -> Self {
        self.tracer = Some(tracer);
        self
    }

    /// Sets a custom metrics recorder.
    pub fn metrics(mut self, recorder: Box<dyn MetricsRecorder>) -> Self {
        self.metrics = Some(recorder);
        self
    }

    /// Builds the client.
    ///
    /// # Errors
    ///
    /// Fails when no API key is available, the configuration is invalid, or
    /// the HTTP transport cannot be created.
    pub fn build(self) -> Result<TutorClientImpl, TutorError> {
        let config = match self.config {
            Some(config) => config,
            None => {
                let api_key = self
                    .api_key
                    .or_else(api_key_from_env)
                    .ok_or(ConfigurationError::MissingApiKey)?;
                TutorConfig::builder().api_key(api_key).build()?
            }
        };

        let obs = match self.observability {
            Some(obs) => obs,
            None => Observability {
                logger: self
                    .logger
                    .unwrap_or_else(|| Arc::new(StructuredLogger::new(SERVICE_NAME).with_level(config.log_level))),
                tracer: self.tracer.unwrap_or_else(|| -> Arc<dyn Tracer> {
                    if config.enable_tracing {
                        Arc::new(TracingTracer::new(SERVICE_NAME))
                    } else {
                        Arc::new(NoopTracer)
                    }
                }),
                metrics: Arc::new(TutorMetrics::new(
                    SERVICE_NAME,
                    self.metrics.unwrap_or_else(|| -> Box<dyn MetricsRecorder> {
                        if config.enable_metrics {
                            Box::new(TracingMetricsRecorder::new())
                        } else {
                            Box::new(NoopMetricsRecorder)
                        }
                    }),
                )),
            },
        };

        let content: Arc<dyn ContentService> = match self.content_service {
            Some(service) => service,
            None => {
                let transport: Arc<dyn HttpTransport> = match self.transport {
                    Some(t) => t,
                    None => Arc::new(ReqwestTransport::from_config(&config).map_err(|e| {
                        NetworkError::ConnectionFailed {
                            message: format!("Failed to create HTTP transport: {}", e),
                        }
                    })?),
                };
                let auth_manager: Box<dyn AuthManager> = Box::new(ApiKeyAuthManager::from_config(&config));
                Arc::new(ContentServiceImpl::new(&config, transport, auth_manager, obs.clone()))
            }
        };

        obs.logger.info(
            "Tutor client initialized",
            serde_json::json!({
                "base_url": config.base_url.as_str(),
                "api_version": config.api_version,
                "auth_method": format!("{:?}", config.auth_method),
                "analysis_model": config.models.analysis,
                "chat_model": config.models.chat,
            }),
        );

        Ok(TutorClientImpl::from_parts(config, content, obs))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::TutorClient;
    use crate::mocks::{gemini_stream_body, MockHttpTransport, RecordingMetricsRecorder};
    use crate::streamer::StreamEvent;
    use futures::StreamExt;
    use pretty_assertions::assert_eq;

    fn key() -> SecretString {
        SecretString::new("test-key".into())
    }

    #[test]
    fn test_explicit_config_wins_over_api_key() {
        let config = TutorConfig::builder()
            .api_key(key())
            .api_version("v1")
            .build()
            .unwrap();
        let client = TutorClientBuilder::from_config(config)
            .api_key(SecretString::new("other".into()))
            .build()
            .unwrap();

        assert_eq!(client.config().api_version, "v1");
    }

    #[tokio::test]
    async fn test_injected_transport_and_metrics() {
        let transport = Arc::new(MockHttpTransport::new());
        transport.enqueue_streaming_response(gemini_stream_body(&["Hello", " there"]));
        let recorder = RecordingMetricsRecorder::new();

        let client = TutorClientBuilder::new()
            .api_key(key())
            .transport(transport.clone())
            .metrics(Box::new(recorder.clone()))
            .build()
            .unwrap();

        let events: Vec<_> = client.chat_streamer().stream("sys", &[], "hi").collect().await;

        assert_eq!(events[0], StreamEvent::TextDelta { content: "Hello".into() });
        assert_eq!(events.len(), 3);
        transport.verify_request_count(1);
        assert!(transport.requests()[0].url.contains(":streamGenerateContent"));
        assert_eq!(recorder.counter_with_label("tutor_stream_events_total", "type", "text"), 2);
    }
}
