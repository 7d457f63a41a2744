//! Handwriting transcription.
//!
//! An uploaded image is sent inline, base64-encoded, together with a fixed
//! instruction asking for LaTeX/Markdown text only.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use bytes::Bytes;
use mime::Mime;
use serde_json::json;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use crate::error::{ContentError, RequestError, TutorError, TutorResult};
use crate::observability::{Observability, SpanStatus};
use crate::services::ContentService;
use crate::types::{Content, GenerateContentRequest, Part, Role};

/// Instruction sent alongside the image.
pub const TRANSCRIPTION_INSTRUCTION: &str =
    "Transcribe the handwritten maths in this image to LaTex/Markdown. Return ONLY the text, no explanations.";

/// Largest image accepted for inline upload (20 MiB).
pub const MAX_INLINE_IMAGE_BYTES: usize = 20 * 1024 * 1024;

const MISSING_INPUT: &str = "You must input at least an image or text";

/// Image bytes with their MIME type.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageInput {
    data: Bytes,
    mime_type: Mime,
}

impl ImageInput {
    /// Wrap raw image bytes.
    pub fn from_bytes(data: impl Into<Bytes>, mime_type: Mime) -> Self {
        Self {
            data: data.into(),
            mime_type,
        }
    }

    /// Read an image file, taking the MIME type from its extension.
    pub async fn from_path(path: impl AsRef<Path>) -> TutorResult<Self> {
        let path = path.as_ref();
        let mime_type = guess_image_mime(path).ok_or_else(|| RequestError::UnsupportedMediaType {
            mime_type: path
                .extension()
                .map(|ext| ext.to_string_lossy().into_owned())
                .unwrap_or_default(),
        })?;
        let data = tokio::fs::read(path).await?;
        Ok(Self::from_bytes(data, mime_type))
    }

    /// Raw bytes.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// MIME type.
    pub fn mime_type(&self) -> &Mime {
        &self.mime_type
    }

    fn to_part(&self) -> TutorResult<Part> {
        if self.data.len() > MAX_INLINE_IMAGE_BYTES {
            return Err(RequestError::PayloadTooLarge {
                size: self.data.len(),
                max_size: MAX_INLINE_IMAGE_BYTES,
            }
            .into());
        }
        Ok(Part::inline_data(self.mime_type.essence_str(), STANDARD.encode(&self.data)))
    }
}

/// MIME type for an image path, by extension. `None` for anything that is
/// not a supported image format.
pub fn guess_image_mime(path: &Path) -> Option<Mime> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    match ext.as_str() {
        "png" => Some(mime::IMAGE_PNG),
        "jpg" | "jpeg" => Some(mime::IMAGE_JPEG),
        "gif" => Some(mime::IMAGE_GIF),
        "webp" | "heic" | "heif" => format!("image/{}", ext).parse().ok(),
        _ => None,
    }
}

/// Turns handwritten work into text.
#[derive(Clone)]
pub struct ImageTranscriber {
    service: Arc<dyn ContentService>,
    model: String,
    obs: Observability,
}

impl ImageTranscriber {
    /// Create a transcriber generating with `model`.
    pub fn new(service: Arc<dyn ContentService>, model: impl Into<String>, obs: Observability) -> Self {
        Self {
            service,
            model: model.into(),
            obs,
        }
    }

    /// Transcribe `image`.
    ///
    /// Without an image the fallback text is returned as is; with neither the
    /// call fails. An empty model reply also yields the fallback (or `""`).
    /// Upstream failures come back as [`ContentError::TranscriptionFailed`].
    pub async fn transcribe(&self, image: Option<ImageInput>, fallback: Option<&str>) -> TutorResult<String> {
        let fallback = fallback.filter(|text| !text.is_empty());
        let Some(image) = image else {
            return match fallback {
                Some(text) => Ok(text.to_string()),
                None => {
                    self.obs.metrics.record_validation_failure("transcribe");
                    Err(RequestError::missing("image", MISSING_INPUT).into())
                }
            };
        };

        let mut span = self.obs.tracer.start_span("tutor.transcribe");
        span.set_attribute("model", &self.model);
        span.set_attribute("mime_type", image.mime_type.essence_str());
        let started = Instant::now();

        let result = self.request_text(&image).await;
        let duration_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);

        match result {
            Ok(text) if text.is_empty() => {
                self.obs
                    .logger
                    .warn("Transcription returned no text", json!({ "has_fallback": fallback.is_some() }));
                span.set_status(SpanStatus::Ok);
                span.end();
                Ok(fallback.unwrap_or_default().to_string())
            }
            Ok(text) => {
                self.obs.logger.info(
                    "Transcription complete",
                    json!({ "chars": text.chars().count(), "duration_ms": duration_ms }),
                );
                span.set_status(SpanStatus::Ok);
                span.end();
                Ok(text)
            }
            Err(e) => {
                self.obs
                    .logger
                    .error("Transcription failed", json!({ "error": e.to_string() }));
                span.set_status(SpanStatus::Error(e.to_string()));
                span.end();
                Err(ContentError::TranscriptionFailed { message: e.to_string() }.into())
            }
        }
    }

    async fn request_text(&self, image: &ImageInput) -> Result<String, TutorError> {
        let request = GenerateContentRequest {
            contents: vec![Content::with_role(
                Role::User,
                vec![Part::text(TRANSCRIPTION_INSTRUCTION), image.to_part()?],
            )],
            ..GenerateContentRequest::default()
        };
        let response = self.service.generate(&self.model, request).await?;
        Ok(response.text())
    }
}
