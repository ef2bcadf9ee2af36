//! Configuration types.
//!
//! - `HttpConfig`: transport knobs for the backend client
//! - `RagClientConfig`: base URL, bearer token and endpoint paths
//! - `StreamOptions`: SSE payload field name and terminal sentinel
//! - `CitationLabels`: strings used when synthesizing citation labels and the trailer

use crate::error::RagError;
use secrecy::{ExposeSecret, SecretString};
use std::collections::HashMap;
use std::time::Duration;

pub const ENV_BASE_URL: &str = "RAGSTREAM_BASE_URL";
pub const ENV_API_TOKEN: &str = "RAGSTREAM_API_TOKEN";
pub const ENV_TIMEOUT_SECS: &str = "RAGSTREAM_TIMEOUT_SECS";

/// HTTP configuration
#[derive(Debug, Clone)]
pub struct HttpConfig {
    /// Request timeout. Applies to the whole response, including streamed bodies.
    pub timeout: Option<Duration>,
    /// Connection timeout
    pub connect_timeout: Option<Duration>,
    /// Custom headers
    pub headers: HashMap<String, String>,
    /// User agent
    pub user_agent: Option<String>,
    /// Send `Accept-Encoding: identity` on streaming requests so proxies do not
    /// buffer the event stream behind a compressor.
    pub stream_disable_compression: bool,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout: None,
            connect_timeout: Some(Duration::from_secs(10)),
            headers: HashMap::new(),
            user_agent: Some(format!("ragstream/{}", env!("CARGO_PKG_VERSION"))),
            stream_disable_compression: true,
        }
    }
}

impl HttpConfig {
    pub fn builder() -> HttpConfigBuilder {
        HttpConfigBuilder::default()
    }
}

/// Builder for `HttpConfig`
#[derive(Debug, Clone, Default)]
pub struct HttpConfigBuilder {
    timeout: Option<Duration>,
    connect_timeout: Option<Duration>,
    headers: HashMap<String, String>,
    user_agent: Option<String>,
    stream_disable_compression: Option<bool>,
}

impl HttpConfigBuilder {
    pub fn timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }
    pub fn connect_timeout(mut self, connect_timeout: Option<Duration>) -> Self {
        self.connect_timeout = connect_timeout;
        self
    }
    pub fn user_agent<S: Into<String>>(mut self, user_agent: Option<S>) -> Self {
        self.user_agent = user_agent.map(|s| s.into());
        self
    }
    pub fn header<K: Into<String>, V: Into<String>>(mut self, key: K, value: V) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }
    pub fn stream_disable_compression(mut self, val: bool) -> Self {
        self.stream_disable_compression = Some(val);
        self
    }

    pub fn build(self) -> HttpConfig {
        let defaults = HttpConfig::default();
        HttpConfig {
            timeout: self.timeout,
            connect_timeout: self.connect_timeout.or(defaults.connect_timeout),
            headers: self.headers,
            user_agent: self.user_agent.or(defaults.user_agent),
            stream_disable_compression: self
                .stream_disable_compression
                .unwrap_or(defaults.stream_disable_compression),
        }
    }
}

/// Endpoint paths of the chat backend, relative to the base URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointPaths {
    /// Conversational streaming answer (`POST`, SSE).
    pub chat: String,
    /// Knowledge search summary (`POST`, SSE).
    pub search: String,
    /// Conversation history (`GET`, JSON).
    pub history: String,
}

impl Default for EndpointPaths {
    fn default() -> Self {
        Self {
            chat: "/chat/rag".to_string(),
            search: "/chat/search".to_string(),
            history: "/chat/rag/msg/list".to_string(),
        }
    }
}

/// Configuration for [`crate::client::RagClient`].
#[derive(Clone)]
pub struct RagClientConfig {
    pub base_url: String,
    /// Bearer token sent as `Authorization: Bearer <token>`.
    pub api_token: Option<SecretString>,
    pub http_config: HttpConfig,
    pub paths: EndpointPaths,
}

impl std::fmt::Debug for RagClientConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RagClientConfig")
            .field("base_url", &self.base_url)
            .field("has_api_token", &self.api_token.is_some())
            .field("http_config", &self.http_config)
            .field("paths", &self.paths)
            .finish()
    }
}

impl RagClientConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            api_token: None,
            http_config: HttpConfig::default(),
            paths: EndpointPaths::default(),
        }
    }

    /// Build from `RAGSTREAM_BASE_URL`, `RAGSTREAM_API_TOKEN` and
    /// `RAGSTREAM_TIMEOUT_SECS`.
    pub fn from_env() -> Result<Self, RagError> {
        let base_url = std::env::var(ENV_BASE_URL).map_err(|_| {
            RagError::ConfigurationError(format!("{ENV_BASE_URL} is not set"))
        })?;
        let mut config = Self::new(base_url);
        if let Ok(token) = std::env::var(ENV_API_TOKEN)
            && !token.trim().is_empty()
        {
            config = config.with_api_token(token);
        }
        if let Ok(raw) = std::env::var(ENV_TIMEOUT_SECS) {
            let secs = raw.trim().parse::<u64>().map_err(|e| {
                RagError::ConfigurationError(format!("{ENV_TIMEOUT_SECS}={raw:?}: {e}"))
            })?;
            config.http_config.timeout = Some(Duration::from_secs(secs));
        }
        config.validate()?;
        Ok(config)
    }

    pub fn with_api_token(mut self, token: impl Into<String>) -> Self {
        self.api_token = Some(SecretString::from(token.into()));
        self
    }

    pub fn with_http_config(mut self, http_config: HttpConfig) -> Self {
        self.http_config = http_config;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.http_config.timeout = Some(timeout);
        self
    }

    pub fn with_paths(mut self, paths: EndpointPaths) -> Self {
        self.paths = paths;
        self
    }

    pub(crate) fn bearer(&self) -> Option<String> {
        self.api_token
            .as_ref()
            .map(|t| format!("Bearer {}", t.expose_secret()))
    }

    /// Join the base URL and an endpoint path without doubling slashes.
    pub fn url(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    pub fn validate(&self) -> Result<(), RagError> {
        let base = self.base_url.trim();
        if base.is_empty() {
            return Err(RagError::ConfigurationError(
                "base_url cannot be empty".to_string(),
            ));
        }
        if !(base.starts_with("http://") || base.starts_with("https://")) {
            return Err(RagError::ConfigurationError(format!(
                "base_url must be an http(s) URL, got {base:?}"
            )));
        }
        if let Some(token) = &self.api_token
            && token.expose_secret().trim().is_empty()
        {
            return Err(RagError::ConfigurationError(
                "api_token cannot be blank".to_string(),
            ));
        }
        Ok(())
    }
}

/// Tunables of the SSE payload format.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamOptions {
    /// JSON field carrying the answer fragment.
    pub answer_field: String,
    /// JSON field carrying the per-frame source bundle.
    pub reference_field: String,
    /// Answer value that ends the turn.
    pub done_marker: String,
}

impl Default for StreamOptions {
    fn default() -> Self {
        Self {
            answer_field: "answer".to_string(),
            reference_field: "reference".to_string(),
            done_marker: "[DONE]".to_string(),
        }
    }
}

/// Strings used when labelling citations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CitationLabels {
    /// Text placed before the marker list in the citation trailer.
    pub trailer_prefix: String,
    /// Stem of the synthesized knowledge base name: `"{stem} {id}"`.
    pub knowledge_base: String,
    /// Stem of the synthesized file label: `"{stem} {id}"`.
    pub document: String,
}

impl Default for CitationLabels {
    fn default() -> Self {
        Self {
            trailer_prefix: "Sources: ".to_string(),
            knowledge_base: "Knowledge base".to_string(),
            document: "Document".to_string(),
        }
    }
}
