use crate::error::{RestError, Result};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::time::Duration;
use url::Url;

/// Authentication scheme
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthType {
    Basic,
    Digest,
    #[serde(rename = "oauth2")]
    OAuth2,
}

impl AuthType {
    fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "basic" => Some(AuthType::Basic),
            "digest" => Some(AuthType::Digest),
            "oauth2" => Some(AuthType::OAuth2),
            _ => None,
        }
    }
}

/// Unknown scheme names leave authentication unconfigured
fn lenient_auth_type<'de, D>(deserializer: D) -> std::result::Result<Option<AuthType>, D::Error>
where
    D: Deserializer<'de>,
{
    let name: Option<String> = Option::deserialize(deserializer)?;
    Ok(name.and_then(|name| {
        let auth_type = AuthType::from_name(&name);
        if auth_type.is_none() {
            tracing::warn!(auth_type = %name, "unknown authentication type, requests stay unauthenticated");
        }
        auth_type
    }))
}

/// Credentials for the remote API.
///
/// For OAuth2, `username`/`password` are the client id and secret.
#[derive(Clone, Default, Serialize, Deserialize)]
pub struct AuthConfig {
    #[serde(rename = "type", default, deserialize_with = "lenient_auth_type")]
    pub auth_type: Option<AuthType>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    /// OAuth2 token endpoint
    #[serde(default)]
    pub token_url: Option<String>,
    /// OAuth2 scope, space separated
    #[serde(default)]
    pub scope: Option<String>,
}

impl AuthConfig {
    pub fn new(auth_type: AuthType, username: impl Into<String>, password: impl Into<String>) -> Self {
        AuthConfig {
            auth_type: Some(auth_type),
            username: Some(username.into()),
            password: Some(password.into()),
            token_url: None,
            scope: None,
        }
    }

    pub fn basic(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self::new(AuthType::Basic, username, password)
    }

    pub fn digest(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self::new(AuthType::Digest, username, password)
    }

    pub fn oauth2(
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        token_url: impl Into<String>,
    ) -> Self {
        AuthConfig {
            token_url: Some(token_url.into()),
            ..Self::new(AuthType::OAuth2, client_id, client_secret)
        }
    }

    pub fn with_scope(mut self, scope: impl Into<String>) -> Self {
        self.scope = Some(scope.into());
        self
    }

    /// Type, username and password, when all three are present and non-empty
    pub fn credentials(&self) -> Option<(AuthType, &str, &str)> {
        let auth_type = self.auth_type?;
        let username = self.username.as_deref().filter(|s| !s.is_empty())?;
        let password = self.password.as_deref().filter(|s| !s.is_empty())?;
        Some((auth_type, username, password))
    }
}

// Implement Debug manually to avoid exposing the password
impl fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthConfig")
            .field("auth_type", &self.auth_type)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("token_url", &self.token_url)
            .field("scope", &self.scope)
            .finish()
    }
}

/// Options for the underlying HTTP client
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TransportConfig {
    /// Total request timeout in seconds
    pub timeout_secs: u64,
    pub connect_timeout_secs: u64,
    pub pool_max_idle_per_host: usize,
    /// Keep idle connections for reuse
    pub keepalive: bool,
    pub user_agent: Option<String>,
}

impl Default for TransportConfig {
    fn default() -> Self {
        TransportConfig {
            timeout_secs: 300, // 5 minutes
            connect_timeout_secs: 10,
            pool_max_idle_per_host: 50,
            keepalive: true,
            user_agent: None,
        }
    }
}

impl TransportConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }
}

fn default_accept() -> String {
    "application/json".to_string()
}

/// Configuration for the REST client
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Prefix every request path is resolved against
    pub base_url: String,
    #[serde(default)]
    pub authentication: Option<AuthConfig>,
    #[serde(default)]
    pub http_client: TransportConfig,
    /// Value of the `Accept` header sent with every request
    #[serde(default = "default_accept")]
    pub accept: String,
}

impl ClientConfig {
    /// Create a new configuration for the given base URL
    pub fn new(base_url: impl Into<String>) -> Self {
        ClientConfig {
            base_url: base_url.into(),
            authentication: None,
            http_client: TransportConfig::default(),
            accept: default_accept(),
        }
    }

    pub fn with_authentication(mut self, auth: AuthConfig) -> Self {
        self.authentication = Some(auth);
        self
    }

    pub fn with_transport(mut self, transport: TransportConfig) -> Self {
        self.http_client = transport;
        self
    }

    pub fn with_accept(mut self, accept: impl Into<String>) -> Self {
        self.accept = accept.into();
        self
    }

    /// Load a configuration from a JSON document
    pub fn from_json(json: &str) -> Result<Self> {
        let config: ClientConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Check that the base URL parses and that complete OAuth2 credentials
    /// come with a token endpoint
    pub fn validate(&self) -> Result<()> {
        Url::parse(&self.base_url)
            .map_err(|e| RestError::Config(format!("invalid base_url {:?}: {}", self.base_url, e)))?;

        // Incomplete credentials register no hook, so there is nothing to check
        let oauth2 = self
            .authentication
            .as_ref()
            .filter(|auth| matches!(auth.credentials(), Some((AuthType::OAuth2, _, _))));

        if let Some(auth) = oauth2 {
            let token_url = auth
                .token_url
                .as_deref()
                .ok_or_else(|| RestError::Config("oauth2 requires token_url".to_string()))?;
            Url::parse(token_url)
                .map_err(|e| RestError::Config(format!("invalid token_url: {}", e)))?;
        }

        Ok(())
    }
}
