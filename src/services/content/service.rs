//! Gemini-backed implementation of [`ContentService`].

use std::sync::Arc;
use std::time::Instant;
use async_trait::async_trait;
use futures::StreamExt;
use serde_json::json;

use super::{ContentService, ContentStream};
use super::validation::{validate_generate_request, validate_model_name};
use crate::auth::AuthManager;
use crate::config::TutorConfig;
use crate::error::{ContentError, TutorError};
use crate::observability::{Observability, SpanStatus};
use crate::streaming::GeminiChunkParser;
use crate::transport::{HttpTransport, HttpMethod, RequestBuilder, ResponseParser, endpoints};
use crate::types::{BlockReason, FinishReason, GenerateContentRequest, GenerateContentResponse};

/// Content service over an [`HttpTransport`].
pub struct ContentServiceImpl {
    transport: Arc<dyn HttpTransport>,
    request_builder: RequestBuilder,
    obs: Observability,
}

impl ContentServiceImpl {
    /// Create a new content service.
    pub fn new(
        config: &TutorConfig,
        transport: Arc<dyn HttpTransport>,
        auth_manager: Box<dyn AuthManager>,
        obs: Observability,
    ) -> Self {
        let request_builder = RequestBuilder::new(
            config.base_url.clone(),
            config.api_version.clone(),
            auth_manager,
        );

        Self {
            transport,
            request_builder,
            obs,
        }
    }

    /// Reject responses the safety filter blocked, either at the prompt or on the first candidate.
    fn check_safety_blocks(&self, response: &GenerateContentResponse) -> Result<(), TutorError> {
        if let Some(block_reason) = response
            .prompt_feedback
            .as_ref()
            .and_then(|f| f.block_reason.as_ref())
        {
            tracing::warn!(block_reason = ?block_reason, "Prompt blocked");
            return Err(match block_reason {
                BlockReason::Blocklist | BlockReason::ProhibitedContent => ContentError::ProhibitedContent,
                BlockReason::Safety | BlockReason::Other => ContentError::SafetyBlocked {
                    reason: format!("prompt blocked: {:?}", block_reason),
                },
            }
            .into());
        }

        match response.finish_reason() {
            Some(FinishReason::Safety) => Err(ContentError::SafetyBlocked {
                reason: "candidate stopped by safety filter".to_string(),
            }
            .into()),
            Some(FinishReason::Recitation) => Err(ContentError::SafetyBlocked {
                reason: "candidate stopped for recitation".to_string(),
            }
            .into()),
            Some(FinishReason::ProhibitedContent | FinishReason::Blocklist | FinishReason::Spii) => {
                Err(ContentError::ProhibitedContent.into())
            }
            _ => Ok(()),
        }
    }
}

#[async_trait]
impl ContentService for ContentServiceImpl {
    async fn generate(
        &self,
        model: &str,
        request: GenerateContentRequest,
    ) -> Result<GenerateContentResponse, TutorError> {
        let mut span = self.obs.tracer.start_span("tutor.content.generate");
        span.set_attribute("model", model);

        let start = Instant::now();

        self.obs.logger.debug("Starting content generation", json!({
            "model": model,
            "contents_count": request.contents.len(),
            "has_generation_config": request.generation_config.is_some(),
        }));

        validate_model_name(model)?;
        validate_generate_request(&request)?;

        let path = endpoints::generate_content(model.trim_start_matches("models/"));
        let http_request = self.request_builder.build_request(
            HttpMethod::Post,
            &path,
            Some(&request),
            None,
        )?;

        let http_response = match self.transport.send(http_request).await {
            Ok(response) => response,
            Err(e) => {
                let error = TutorError::from(e);
                self.obs.logger.error("Network error during content generation", json!({
                    "error": error.to_string(),
                    "model": model,
                }));
                span.set_status(SpanStatus::Error(error.to_string()));
                span.end();
                return Err(error);
            }
        };

        let status_code = http_response.status;
        let duration_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX);
        self.obs.metrics.record_request("content", "generate", status_code, duration_ms);

        let checked = ResponseParser::parse_response::<GenerateContentResponse>(http_response)
            .and_then(|response| self.check_safety_blocks(&response).map(|()| response));

        let response = match checked {
            Ok(response) => response,
            Err(e) => {
                if let TutorError::Content(content_error) = &e {
                    self.obs.metrics.record_safety_block("content", &content_error.to_string());
                }
                self.obs.logger.warn("Content generation failed", json!({
                    "error": e.to_string(),
                    "model": model,
                    "status": status_code,
                    "duration_ms": duration_ms,
                }));
                span.set_status(SpanStatus::Error(e.to_string()));
                span.end();
                return Err(e);
            }
        };

        if let Some(usage) = &response.usage_metadata {
            self.obs.metrics.record_tokens(
                "content",
                usage.prompt_token_count,
                usage.candidates_token_count.unwrap_or(0),
            );
        }

        self.obs.logger.info("Content generation completed", json!({
            "model": model,
            "duration_ms": duration_ms,
            "candidates": response.candidates.as_ref().map_or(0, Vec::len),
            "total_tokens": response.usage_metadata.as_ref().map(|u| u.total_token_count),
        }));

        span.set_status(SpanStatus::Ok);
        span.end();

        Ok(response)
    }

    async fn generate_stream(
        &self,
        model: &str,
        request: GenerateContentRequest,
    ) -> Result<ContentStream, TutorError> {
        let mut span = self.obs.tracer.start_span("tutor.content.generate_stream");
        span.set_attribute("model", model);

        let start = Instant::now();

        self.obs.logger.debug("Starting streaming content generation", json!({
            "model": model,
            "contents_count": request.contents.len(),
            "has_generation_config": request.generation_config.is_some(),
        }));

        validate_model_name(model)?;
        validate_generate_request(&request)?;

        let path = endpoints::stream_generate_content(model.trim_start_matches("models/"));
        let http_request = self.request_builder.build_streaming_request(&path, &request)?;

        let chunk_stream = match self.transport.send_streaming(http_request).await {
            Ok(stream) => stream,
            Err(e) => {
                let error = TutorError::from(e);
                self.obs.logger.error("Failed to open content stream", json!({
                    "error": error.to_string(),
                    "model": model,
                }));
                span.set_status(SpanStatus::Error(error.to_string()));
                span.end();
                return Err(error);
            }
        };

        self.obs.metrics.record_request(
            "content",
            "generate_stream",
            200,
            u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX),
        );
        self.obs.logger.info("Content stream opened", json!({ "model": model }));

        span.set_status(SpanStatus::Ok);
        span.end();

        let byte_stream = chunk_stream.map(|chunk| chunk.map_err(TutorError::from));
        Ok(Box::pin(GeminiChunkParser::new(Box::pin(byte_stream))))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{AuthenticationError, RequestError};
    use crate::mocks::{MockAuthManager, MockHttpTransport};
    use crate::observability::create_noop_stack;
    use crate::transport::TransportError;
    use crate::types::Content;
    use bytes::Bytes;
    use secrecy::SecretString;

    fn service(transport: Arc<MockHttpTransport>) -> ContentServiceImpl {
        let config = TutorConfig::builder()
            .api_key(SecretString::new("test-key".into()))
            .build()
            .unwrap();
        ContentServiceImpl::new(
            &config,
            transport,
            Box::new(MockAuthManager::new("test-key")),
            create_noop_stack("test"),
        )
    }

    fn hello_request() -> GenerateContentRequest {
        GenerateContentRequest {
            contents: vec![Content::user_text("Hello")],
            ..GenerateContentRequest::default()
        }
    }

    #[tokio::test]
    async fn test_generate_posts_to_model_endpoint() {
        let transport = Arc::new(MockHttpTransport::new());
        transport.enqueue_json_response(
            200,
            r#"{"candidates":[{"content":{"role":"model","parts":[{"text":"Hi there"}]},"finishReason":"STOP"}]}"#,
        );

        let response = service(transport.clone())
            .generate("models/gemini-2.5-flash", hello_request())
            .await
            .unwrap();

        assert_eq!(response.text(), "Hi there");
        transport.verify_request_count(1);
        transport.verify_request(0, HttpMethod::Post, "/v1beta/models/gemini-2.5-flash:generateContent");
        transport.verify_header(0, "x-goog-api-key", "test-key");
    }

    #[tokio::test]
    async fn test_generate_rejects_invalid_request_without_calling_upstream() {
        let transport = Arc::new(MockHttpTransport::new());
        let err = service(transport.clone())
            .generate("gemini-2.5-flash", GenerateContentRequest::default())
            .await
            .unwrap_err();

        assert!(matches!(err, TutorError::Request(RequestError::ValidationError { .. })));
        transport.verify_request_count(0);
    }

    #[tokio::test]
    async fn test_generate_safety_block() {
        let transport = Arc::new(MockHttpTransport::new());
        transport.enqueue_json_response(200, r#"{"promptFeedback":{"blockReason":"SAFETY"}}"#);

        let err = service(transport).generate("gemini-2.5-flash", hello_request()).await.unwrap_err();
        assert!(matches!(err, TutorError::Content(ContentError::SafetyBlocked { .. })));
    }

    #[tokio::test]
    async fn test_generate_maps_http_errors() {
        let transport = Arc::new(MockHttpTransport::new());
        transport.enqueue_json_response(401, r#"{"error":{"code":401,"message":"API key not valid"}}"#);

        let err = service(transport).generate("gemini-2.5-flash", hello_request()).await.unwrap_err();
        assert!(matches!(err, TutorError::Authentication(AuthenticationError::InvalidApiKey)));
    }

    #[tokio::test]
    async fn test_generate_stream_parses_chunks() {
        let transport = Arc::new(MockHttpTransport::new());
        transport.enqueue_streaming_response(vec![
            Bytes::from_static(br#"[{"candidates":[{"content":{"parts":[{"text":"Hel"}]}}]}"#),
            Bytes::from_static(br#",{"candidates":[{"content":{"parts":[{"text":"lo"}]}}]}]"#),
        ]);

        let stream = service(transport.clone())
            .generate_stream("gemini-2.5-flash", hello_request())
            .await
            .unwrap();
        let texts: Vec<String> = stream.map(|r| r.unwrap().text()).collect().await;

        assert_eq!(texts, vec!["Hel", "lo"]);
        transport.verify_request(0, HttpMethod::Post, ":streamGenerateContent");
    }

    #[tokio::test]
    async fn test_generate_stream_open_failure() {
        let transport = Arc::new(MockHttpTransport::new());
        transport.enqueue_streaming_error(TransportError::Connection("refused".to_string()));

        let result = service(transport).generate_stream("gemini-2.5-flash", hello_request()).await;
        assert!(matches!(result, Err(TutorError::Network(_))));
    }
}
