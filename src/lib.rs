//! # Tutoring stream core
//!
//! Streaming tutoring backend over the Google Gemini API.
//!
//! ## Features
//!
//! - Incremental JSON field streaming: string, array and boolean fields are
//!   reported while the model's JSON is still incomplete
//! - Conversational streaming with role normalization
//! - Analysis, gym evaluation and chat flows with validated inputs
//! - Handwriting transcription from images
//! - SSE framing of stream events
//! - Structured logging, spans and metrics
//! - Secure credential handling with `SecretString`
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use integrations_tutor::{create_client, SseEncoder, TutorConfig};
//! use futures::StreamExt;
//! use secrecy::SecretString;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = TutorConfig::builder()
//!         .api_key(SecretString::new("your-api-key".into()))
//!         .build()?;
//!     let client = create_client(config)?;
//!
//!     let encoder = SseEncoder::fields();
//!     let mut events = client.tutor().analyze("d/dx sin(x^2)", "cos(x^2)")?;
//!     while let Some(event) = events.next().await {
//!         let frame = encoder.frame(&event)?;
//!         print!("{}", String::from_utf8_lossy(&frame));
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Module Organization
//!
//! - `client` - Client interface, builder and factory functions
//! - `config` - Configuration types and builder
//! - `auth` - API key management
//! - `transport` - HTTP transport layer
//! - `streaming` - Incremental parsing of the Gemini streaming body
//! - `services` - Content generation service
//! - `schema` - Response schemas driving the field streamer
//! - `streamer` - Field and conversational streamers
//! - `drafts` - Typed accumulation of stream events
//! - `sse` - Server-Sent Events framing
//! - `tutor` - Analysis, gym and chat flows
//! - `transcription` - Image transcription
//! - `error` - Error types and taxonomy
//! - `types` - Gemini request and response types

#![warn(missing_docs)]
#![warn(clippy::all)]

// Public modules
pub mod auth;
pub mod client;
pub mod config;
pub mod drafts;
pub mod error;
pub mod observability;
pub mod schema;
pub mod services;
pub mod sse;
pub mod streamer;
pub mod streaming;
pub mod transcription;
pub mod transport;
pub mod tutor;
pub mod types;

// Development/testing modules - always available for integration tests
pub mod mocks;
pub mod fixtures;

// Re-exports for convenience
pub use auth::{ApiKeyAuthManager, AuthManager};
pub use client::{create_client, create_client_from_env, TutorClient, TutorClientBuilder, TutorClientImpl};
pub use config::{
    AuthMethod, LogLevel, ModelConfig, TutorConfig, TutorConfigBuilder, DEFAULT_API_VERSION, DEFAULT_BASE_URL,
    DEFAULT_TIMEOUT_SECS,
};
pub use error::{
    // Main error types
    TutorError,
    TutorResult,
    // Error categories
    AuthenticationError,
    ConfigurationError,
    ContentError,
    NetworkError,
    RateLimitError,
    RequestError,
    ResponseError,
    SchemaError,
    ServerError,
    // Error mapping utilities
    map_http_status,
    map_http_status_with_body,
};
pub use transport::{HttpMethod, HttpRequest, HttpResponse, HttpTransport, ReqwestTransport, TransportError};

// Type re-exports
pub use types::{
    Blob, Candidate, Content, FinishReason, GenerateContentRequest, GenerateContentResponse, GenerationConfig,
    Part, Role, UsageMetadata,
};

// Service re-exports
pub use services::{ContentService, ContentServiceImpl, ContentStream};

// Streaming re-exports
pub use schema::{FieldKind, FieldSchema, ResponseSchema};
pub use streamer::{
    ChatEventStream, ChatMessage, CompletionValue, ConversationalStreamer, FieldEventStream,
    IncrementalJsonFieldStreamer, StreamEvent,
};
pub use drafts::{AnalysisDraft, FieldDraft, GymDraft, StreamDraft};
pub use sse::{encode_sse, SseEncoder, SseMode};

// Flow re-exports
pub use tutor::{AnalysisContext, ChatRequest, TutorService};
pub use transcription::{ImageInput, ImageTranscriber};

// Observability re-exports
pub use observability::{
    create_default_stack, create_noop_stack, Logger, MetricsRecorder, Observability, Span, SpanStatus,
    StructuredLogger, Tracer, TracingMetricsRecorder, TracingTracer, TutorMetrics,
};
