//! Main client implementation.

use once_cell::sync::OnceCell;
use std::sync::Arc;

use crate::config::TutorConfig;
use crate::error::TutorError;
use crate::observability::Observability;
use crate::services::ContentService;
use crate::streamer::{ConversationalStreamer, IncrementalJsonFieldStreamer};
use crate::transcription::ImageTranscriber;
use crate::tutor::TutorService;

use super::builder::TutorClientBuilder;
use super::traits::TutorClient;

/// Implementation of [`TutorClient`].
///
/// Components are created on first access and share one content service and
/// one observability stack.
///
/// ```no_run
/// use integrations_tutor::client::{TutorClient, TutorClientImpl};
/// use futures::StreamExt;
/// use secrecy::SecretString;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let client = TutorClientImpl::builder()
///     .api_key(SecretString::new("your-api-key".into()))
///     .build()?;
///
/// let mut events = client.tutor().analyze("d/dx sin(x^2)", "cos(x^2)")?;
/// while let Some(event) = events.next().await {
///     println!("{:?}", event);
/// }
/// # Ok(())
/// # }
/// ```
pub struct TutorClientImpl {
    config: TutorConfig,
    content: Arc<dyn ContentService>,
    obs: Observability,

    field_streamer: OnceCell<IncrementalJsonFieldStreamer>,
    chat_streamer: OnceCell<ConversationalStreamer>,
    tutor: OnceCell<TutorService>,
    transcriber: OnceCell<ImageTranscriber>,
}

impl TutorClientImpl {
    /// Creates a new client builder.
    pub fn builder() -> TutorClientBuilder {
        TutorClientBuilder::new()
    }

    /// Creates a client from environment variables; see [`TutorConfig::from_env`].
    pub fn from_env() -> Result<Self, TutorError> {
        Self::new(TutorConfig::from_env()?)
    }

    /// Creates a client from a configuration object.
    pub fn new(config: TutorConfig) -> Result<Self, TutorError> {
        TutorClientBuilder::from_config(config).build()
    }

    pub(super) fn from_parts(config: TutorConfig, content: Arc<dyn ContentService>, obs: Observability) -> Self {
        Self {
            config,
            content,
            obs,
            field_streamer: OnceCell::new(),
            chat_streamer: OnceCell::new(),
            tutor: OnceCell::new(),
            transcriber: OnceCell::new(),
        }
    }

    /// Shared observability stack.
    pub fn observability(&self) -> &Observability {
        &self.obs
    }
}

impl TutorClient for TutorClientImpl {
    fn config(&self) -> &TutorConfig {
        &self.config
    }

    fn content(&self) -> &dyn ContentService {
        self.content.as_ref()
    }

    fn field_streamer(&self) -> &IncrementalJsonFieldStreamer {
        self.field_streamer.get_or_init(|| {
            IncrementalJsonFieldStreamer::new(
                Arc::clone(&self.content),
                self.config.models.analysis.clone(),
                self.obs.clone(),
            )
        })
    }

    fn chat_streamer(&self) -> &ConversationalStreamer {
        self.chat_streamer.get_or_init(|| {
            ConversationalStreamer::new(
                Arc::clone(&self.content),
                self.config.models.chat.clone(),
                self.obs.clone(),
            )
        })
    }

    fn tutor(&self) -> &TutorService {
        self.tutor.get_or_init(|| {
            TutorService::new(
                self.field_streamer().clone(),
                self.chat_streamer().clone(),
                self.obs.clone(),
            )
        })
    }

    fn transcriber(&self) -> &ImageTranscriber {
        self.transcriber.get_or_init(|| {
            ImageTranscriber::new(
                Arc::clone(&self.content),
                self.config.models.transcription.clone(),
                self.obs.clone(),
            )
        })
    }
}

impl std::fmt::Debug for TutorClientImpl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TutorClientImpl")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// Create a client from configuration.
pub fn create_client(config: TutorConfig) -> Result<Arc<dyn TutorClient>, TutorError> {
    let client = TutorClientImpl::new(config)?;
    Ok(Arc::new(client))
}

/// Create a client from environment variables.
pub fn create_client_from_env() -> Result<Arc<dyn TutorClient>, TutorError> {
    create_client(TutorConfig::from_env()?)
}
