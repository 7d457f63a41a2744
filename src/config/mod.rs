//! Configuration types for the tutoring client.

use secrecy::SecretString;
use std::time::Duration;
use url::Url;
use crate::error::{TutorError, ConfigurationError};

/// Default Gemini API base URL.
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";

/// Default API version.
pub const DEFAULT_API_VERSION: &str = "v1beta";

/// Default request timeout (120 seconds).
pub const DEFAULT_TIMEOUT_SECS: u64 = 120;

/// Default connect timeout (30 seconds).
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 30;

/// Model used for structured analysis and gym evaluation.
pub const DEFAULT_ANALYSIS_MODEL: &str = "gemini-2.0-flash-exp";

/// Model used for conversational turns.
pub const DEFAULT_CHAT_MODEL: &str = "gemini-2.5-flash";

/// Model used for handwriting transcription.
pub const DEFAULT_TRANSCRIPTION_MODEL: &str = "gemini-2.5-flash";

/// Environment variables consulted for the API key, in order.
pub const API_KEY_ENV_VARS: [&str; 3] = ["GEMINI_API_KEY", "FEYNMAN_GEMINI_API_KEY", "GOOGLE_API_KEY"];

/// Authentication method for API key.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum AuthMethod {
    /// Use x-goog-api-key header (recommended).
    #[default]
    Header,
    /// Use ?key= query parameter.
    QueryParam,
}

/// Log level for the client.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum LogLevel {
    /// Error level - only errors.
    Error,
    /// Warning level - errors and warnings.
    Warn,
    /// Info level - general information.
    #[default]
    Info,
    /// Debug level - detailed information.
    Debug,
    /// Trace level - very detailed information.
    Trace,
}

impl LogLevel {
    /// Parse a level name such as `"debug"`, case-insensitively.
    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "error" => Some(LogLevel::Error),
            "warn" | "warning" => Some(LogLevel::Warn),
            "info" => Some(LogLevel::Info),
            "debug" => Some(LogLevel::Debug),
            "trace" => Some(LogLevel::Trace),
            _ => None,
        }
    }
}

/// Model names used by the tutoring flows.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ModelConfig {
    /// Model for analysis and gym streams.
    pub analysis: String,
    /// Model for chat streams.
    pub chat: String,
    /// Model for image transcription.
    pub transcription: String,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            analysis: DEFAULT_ANALYSIS_MODEL.to_string(),
            chat: DEFAULT_CHAT_MODEL.to_string(),
            transcription: DEFAULT_TRANSCRIPTION_MODEL.to_string(),
        }
    }
}

/// Configuration for the tutoring client.
#[derive(Clone)]
pub struct TutorConfig {
    /// API key (required).
    pub api_key: SecretString,
    /// Base URL for the API.
    pub base_url: Url,
    /// API version.
    pub api_version: String,
    /// Default timeout for requests.
    pub timeout: Duration,
    /// Connect timeout.
    pub connect_timeout: Duration,
    /// Models per flow.
    pub models: ModelConfig,
    /// Enable tracing spans.
    pub enable_tracing: bool,
    /// Enable metrics.
    pub enable_metrics: bool,
    /// Log level.
    pub log_level: LogLevel,
    /// Authentication method.
    pub auth_method: AuthMethod,
}

impl std::fmt::Debug for TutorConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TutorConfig")
            .field("api_key", &"<redacted>")
            .field("base_url", &self.base_url.as_str())
            .field("api_version", &self.api_version)
            .field("models", &self.models)
            .field("auth_method", &self.auth_method)
            .finish_non_exhaustive()
    }
}

impl TutorConfig {
    /// Create a new configuration builder.
    pub fn builder() -> TutorConfigBuilder {
        TutorConfigBuilder::default()
    }

    /// Create configuration from environment variables.
    ///
    /// Reads:
    /// - `GEMINI_API_KEY`, `FEYNMAN_GEMINI_API_KEY` or `GOOGLE_API_KEY` (required)
    /// - `GEMINI_BASE_URL`, `GEMINI_API_VERSION`, `GEMINI_TIMEOUT_SECS` (optional)
    /// - `TUTOR_ANALYSIS_MODEL`, `TUTOR_CHAT_MODEL`, `TUTOR_TRANSCRIPTION_MODEL` (optional)
    /// - `TUTOR_LOG_LEVEL` (optional)
    pub fn from_env() -> Result<Self, TutorError> {
        let api_key = api_key_from_env().ok_or(ConfigurationError::MissingApiKey)?;

        let base_url = std::env::var("GEMINI_BASE_URL")
            .unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());

        let timeout_secs: u64 = std::env::var("GEMINI_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(DEFAULT_TIMEOUT_SECS);

        let api_version = std::env::var("GEMINI_API_VERSION")
            .unwrap_or_else(|_| DEFAULT_API_VERSION.to_string());

        let defaults = ModelConfig::default();
        let models = ModelConfig {
            analysis: std::env::var("TUTOR_ANALYSIS_MODEL").unwrap_or(defaults.analysis),
            chat: std::env::var("TUTOR_CHAT_MODEL").unwrap_or(defaults.chat),
            transcription: std::env::var("TUTOR_TRANSCRIPTION_MODEL").unwrap_or(defaults.transcription),
        };

        let log_level = std::env::var("TUTOR_LOG_LEVEL")
            .ok()
            .and_then(|s| LogLevel::parse(&s))
            .unwrap_or_default();

        Self::builder()
            .api_key(api_key)
            .base_url(&base_url)?
            .api_version(&api_version)
            .timeout(Duration::from_secs(timeout_secs))
            .models(models)
            .log_level(log_level)
            .build()
    }
}

/// Resolve the API key from the environment, honouring [`API_KEY_ENV_VARS`] order.
pub fn api_key_from_env() -> Option<SecretString> {
    API_KEY_ENV_VARS
        .iter()
        .find_map(|name| std::env::var(name).ok().filter(|v| !v.is_empty()))
        .map(SecretString::new)
}

/// Builder for `TutorConfig`.
#[derive(Default)]
pub struct TutorConfigBuilder {
    api_key: Option<SecretString>,
    base_url: Option<Url>,
    api_version: Option<String>,
    timeout: Option<Duration>,
    connect_timeout: Option<Duration>,
    models: Option<ModelConfig>,
    enable_tracing: Option<bool>,
    enable_metrics: Option<bool>,
    log_level: Option<LogLevel>,
    auth_method: Option<AuthMethod>,
}

impl TutorConfigBuilder {
    /// Set the API key.
    pub fn api_key(mut self, api_key: SecretString) -> Self {
        self.api_key = Some(api_key);
        self
    }

    /// Set the base URL.
    pub fn base_url(mut self, base_url: &str) -> Result<Self, TutorError> {
        self.base_url = Some(Url::parse(base_url)?);
        Ok(self)
    }

    /// Set the API version.
    pub fn api_version(mut self, version: &str) -> Self {
        self.api_version = Some(version.to_string());
        self
    }

    /// Set the request timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Set the connect timeout.
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self
    }

    /// Set all model names at once.
    pub fn models(mut self, models: ModelConfig) -> Self {
        self.models = Some(models);
        self
    }

    /// Override the analysis model.
    pub fn analysis_model(mut self, model: &str) -> Self {
        self.models.get_or_insert_with(ModelConfig::default).analysis = model.to_string();
        self
    }

    /// Override the chat model.
    pub fn chat_model(mut self, model: &str) -> Self {
        self.models.get_or_insert_with(ModelConfig::default).chat = model.to_string();
        self
    }

    /// Enable or disable tracing.
    pub fn enable_tracing(mut self, enable: bool) -> Self {
        self.enable_tracing = Some(enable);
        self
    }

    /// Enable or disable metrics.
    pub fn enable_metrics(mut self, enable: bool) -> Self {
        self.enable_metrics = Some(enable);
        self
    }

    /// Set the log level.
    pub fn log_level(mut self, level: LogLevel) -> Self {
        self.log_level = Some(level);
        self
    }

    /// Set the authentication method.
    pub fn auth_method(mut self, method: AuthMethod) -> Self {
        self.auth_method = Some(method);
        self
    }

    /// Build the configuration.
    pub fn build(self) -> Result<TutorConfig, TutorError> {
        let api_key = self.api_key
            .ok_or(ConfigurationError::MissingApiKey)?;

        let base_url = match self.base_url {
            Some(url) => url,
            None => Url::parse(DEFAULT_BASE_URL)?,
        };

        let timeout = self.timeout.unwrap_or(Duration::from_secs(DEFAULT_TIMEOUT_SECS));
        if timeout.is_zero() {
            return Err(ConfigurationError::InvalidConfiguration {
                message: "timeout must be greater than zero".to_string(),
            }
            .into());
        }

        Ok(TutorConfig {
            api_key,
            base_url,
            api_version: self.api_version.unwrap_or_else(|| DEFAULT_API_VERSION.to_string()),
            timeout,
            connect_timeout: self.connect_timeout.unwrap_or(Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS)),
            models: self.models.unwrap_or_default(),
            enable_tracing: self.enable_tracing.unwrap_or(true),
            enable_metrics: self.enable_metrics.unwrap_or(true),
            log_level: self.log_level.unwrap_or_default(),
            auth_method: self.auth_method.unwrap_or_default(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = TutorConfig::builder()
            .api_key(SecretString::new("test-key".into()))
            .build()
            .unwrap();

        assert_eq!(config.base_url.as_str(), "https://generativelanguage.googleapis.com/");
        assert_eq!(config.api_version, "v1beta");
        assert_eq!(config.timeout, Duration::from_secs(120));
        assert_eq!(config.auth_method, AuthMethod::Header);
        assert_eq!(config.models.analysis, "gemini-2.0-flash-exp");
        assert_eq!(config.models.chat, "gemini-2.5-flash");
    }

    #[test]
    fn test_custom_config() {
        let config = TutorConfig::builder()
            .api_key(SecretString::new("test-key".into()))
            .api_version("v1")
            .timeout(Duration::from_secs(60))
            .auth_method(AuthMethod::QueryParam)
            .chat_model("gemini-pro")
            .build()
            .unwrap();

        assert_eq!(config.api_version, "v1");
        assert_eq!(config.timeout, Duration::from_secs(60));
        assert_eq!(config.auth_method, AuthMethod::QueryParam);
        assert_eq!(config.models.chat, "gemini-pro");
        assert_eq!(config.models.analysis, DEFAULT_ANALYSIS_MODEL);
    }

    #[test]
    fn test_missing_api_key() {
        let result = TutorConfig::builder().build();
        assert!(matches!(
            result,
            Err(TutorError::Configuration(ConfigurationError::MissingApiKey))
        ));
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let result = TutorConfig::builder()
            .api_key(SecretString::new("test-key".into()))
            .timeout(Duration::ZERO)
            .build();
        assert!(result.is_err());
    }

    #[test]
    fn test_invalid_base_url() {
        let result = TutorConfig::builder().base_url("not a url");
        assert!(matches!(
            result,
            Err(TutorError::Configuration(ConfigurationError::InvalidBaseUrl { .. }))
        ));
    }

    #[test]
    fn test_debug_redacts_api_key() {
        let config = TutorConfig::builder()
            .api_key(SecretString::new("super-secret".into()))
            .build()
            .unwrap();
        let rendered = format!("{:?}", config);
        assert!(!rendered.contains("super-secret"));
        assert!(rendered.contains("<redacted>"));
    }

    #[test]
    fn test_log_level_parse() {
        assert_eq!(LogLevel::parse("DEBUG"), Some(LogLevel::Debug));
        assert_eq!(LogLevel::parse("warning"), Some(LogLevel::Warn));
        assert_eq!(LogLevel::parse("loud"), None);
    }
}
