//! Gemini request and response types used by the tutoring flows.

pub mod content;
pub mod generation;

pub use content::{Blob, Content, Part, Role};

pub use generation::{
    BlockReason, Candidate, FinishReason, GenerateContentRequest, GenerateContentResponse,
    GenerationConfig, PromptFeedback, UsageMetadata,
};
