//! Client trait definitions.

use crate::config::TutorConfig;
use crate::services::ContentService;
use crate::streamer::{ConversationalStreamer, IncrementalJsonFieldStreamer};
use crate::transcription::ImageTranscriber;
use crate::tutor::TutorService;

/// Access to every tutoring component built over one Gemini connection.
pub trait TutorClient: Send + Sync {
    /// Client configuration.
    fn config(&self) -> &TutorConfig;

    /// Raw content generation.
    fn content(&self) -> &dyn ContentService;

    /// Structured field streamer, on the analysis model.
    fn field_streamer(&self) -> &IncrementalJsonFieldStreamer;

    /// Conversational streamer, on the chat model.
    fn chat_streamer(&self) -> &ConversationalStreamer;

    /// Analysis, gym and chat flows.
    fn tutor(&self) -> &TutorService;

    /// Handwriting transcription, on the transcription model.
    fn transcriber(&self) -> &ImageTranscriber;
}
