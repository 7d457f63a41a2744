//! Content generation service.

mod service;
mod validation;

use async_trait::async_trait;
use crate::error::TutorError;
use crate::types::{GenerateContentRequest, GenerateContentResponse};
use std::pin::Pin;
use futures::Stream;

pub use service::ContentServiceImpl;
pub use validation::{validate_generate_request, validate_generation_config, validate_model_name};

/// Stream of response chunks from `streamGenerateContent`.
pub type ContentStream = Pin<Box<dyn Stream<Item = Result<GenerateContentResponse, TutorError>> + Send>>;

/// Content generation with Gemini models.
///
/// This is the seam the streamers are written against; tests substitute a
/// scripted or mocked implementation.
#[async_trait]
pub trait ContentService: Send + Sync {
    /// Generate content (non-streaming).
    async fn generate(
        &self,
        model: &str,
        request: GenerateContentRequest,
    ) -> Result<GenerateContentResponse, TutorError>;

    /// Open a streaming generation. Errors here mean the stream never started.
    async fn generate_stream(
        &self,
        model: &str,
        request: GenerateContentRequest,
    ) -> Result<ContentStream, TutorError>;
}
