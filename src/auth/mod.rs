//! API key authentication for Gemini requests.

use crate::config::{TutorConfig, AuthMethod};
use secrecy::{SecretString, ExposeSecret};

/// Supplies credentials for outgoing requests.
pub trait AuthManager: Send + Sync {
    /// Header carrying the credential, if header auth is used.
    fn auth_header(&self) -> Option<(String, String)>;

    /// Query parameter carrying the credential, if query auth is used.
    fn auth_query_param(&self) -> Option<(String, String)>;

    /// Clone into a boxed trait object.
    fn clone_box(&self) -> Box<dyn AuthManager>;
}

/// Authenticates with a Gemini API key.
#[derive(Clone)]
pub struct ApiKeyAuthManager {
    api_key: SecretString,
    auth_method: AuthMethod,
}

impl ApiKeyAuthManager {
    /// Create a new API key auth manager.
    pub fn new(api_key: SecretString, auth_method: AuthMethod) -> Self {
        Self { api_key, auth_method }
    }

    /// Create from config.
    pub fn from_config(config: &TutorConfig) -> Self {
        Self::new(config.api_key.clone(), config.auth_method)
    }

    /// The configured authentication method.
    pub fn method(&self) -> AuthMethod {
        self.auth_method
    }
}

impl std::fmt::Debug for ApiKeyAuthManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiKeyAuthManager")
            .field("api_key", &"<redacted>")
            .field("auth_method", &self.auth_method)
            .finish()
    }
}

impl AuthManager for ApiKeyAuthManager {
    fn auth_header(&self) -> Option<(String, String)> {
        (self.auth_method == AuthMethod::Header).then(|| {
            ("x-goog-api-key".to_string(), self.api_key.expose_secret().to_string())
        })
    }

    fn auth_query_param(&self) -> Option<(String, String)> {
        (self.auth_method == AuthMethod::QueryParam).then(|| {
            ("key".to_string(), self.api_key.expose_secret().to_string())
        })
    }

    fn clone_box(&self) -> Box<dyn AuthManager> {
        Box::new(self.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_auth() {
        let manager = ApiKeyAuthManager::new(
            SecretString::new("test-key".into()),
            AuthMethod::Header,
        );

        let (name, value) = manager.auth_header().unwrap();
        assert_eq!(name, "x-goog-api-key");
        assert_eq!(value, "test-key");
        assert!(manager.auth_query_param().is_none());
    }

    #[test]
    fn test_query_param_auth() {
        let manager = ApiKeyAuthManager::new(
            SecretString::new("test-key".into()),
            AuthMethod::QueryParam,
        );

        assert!(manager.auth_header().is_none());
        let (name, value) = manager.auth_query_param().unwrap();
        assert_eq!(name, "key");
        assert_eq!(value, "test-key");
    }

    #[test]
    fn test_debug_hides_key() {
        let manager = ApiKeyAuthManager::new(
            SecretString::new("hunter2".into()),
            AuthMethod::Header,
        );
        assert!(!format!("{:?}", manager).contains("hunter2"));
    }
}
