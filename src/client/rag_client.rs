use super::{AnswerRequest, ByteStream, ChatBackend};
use crate::config::{HttpConfig, RagClientConfig};
use crate::error::RagError;
use crate::types::ConversationPayload;
use async_trait::async_trait;
use futures_util::StreamExt;
use reqwest::header::{ACCEPT, ACCEPT_ENCODING, AUTHORIZATION, HeaderMap, HeaderName, HeaderValue};
use serde_json::Value;
use std::time::Instant;

/// HTTP client for the RAG chat backend.
#[derive(Debug, Clone)]
pub struct RagClient {
    config: RagClientConfig,
    http: reqwest::Client,
}

impl RagClient {
    pub fn new(config: RagClientConfig) -> Result<Self, RagError> {
        config.validate()?;
        let http = build_http_client(&config.http_config)?;
        Ok(Self { config, http })
    }

    /// Use a caller-provided `reqwest::Client`; `http_config` is then only
    /// consulted for per-request flags.
    pub fn with_http_client(config: RagClientConfig, http: reqwest::Client) -> Result<Self, RagError> {
        config.validate()?;
        Ok(Self { config, http })
    }

    pub fn from_env() -> Result<Self, RagError> {
        Self::new(RagClientConfig::from_env()?)
    }

    pub fn config(&self) -> &RagClientConfig {
        &self.config
    }

    fn auth_headers(&self) -> Result<HeaderMap, RagError> {
        let mut headers = HeaderMap::new();
        if let Some(bearer) = self.config.bearer() {
            let value = HeaderValue::from_str(&bearer).map_err(|e| {
                RagError::ConfigurationError(format!("Invalid api token header value: {e}"))
            })?;
            headers.insert(AUTHORIZATION, value);
        }
        Ok(headers)
    }
}

fn build_http_client(cfg: &HttpConfig) -> Result<reqwest::Client, RagError> {
    let mut builder = reqwest::Client::builder();

    if let Some(timeout) = cfg.timeout {
        builder = builder.timeout(timeout);
    }
    if let Some(connect_timeout) = cfg.connect_timeout {
        builder = builder.connect_timeout(connect_timeout);
    }
    if let Some(user_agent) = &cfg.user_agent {
        builder = builder.user_agent(user_agent);
    }

    if !cfg.headers.is_empty() {
        let mut headers = HeaderMap::new();
        for (k, v) in &cfg.headers {
            let name = HeaderName::from_bytes(k.as_bytes()).map_err(|e| {
                RagError::ConfigurationError(format!("Invalid header name '{k}': {e}"))
            })?;
            let value = HeaderValue::from_str(v).map_err(|e| {
                RagError::ConfigurationError(format!("Invalid header value for '{k}': {e}"))
            })?;
            headers.insert(name, value);
        }
        builder = builder.default_headers(headers);
    }

    builder
        .build()
        .map_err(|e| RagError::ConfigurationError(format!("Failed to build HTTP client: {e}")))
}

/// Turn a non-2xx response into `ApiError` with its body.
async fn check_status(resp: reqwest::Response) -> Result<reqwest::Response, RagError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().await.unwrap_or_default();
    tracing::debug!(target: "ragstream::http", status = status.as_u16(), body = %body, "request failed");
    let message = if body.trim().is_empty() {
        status
            .canonical_reason()
            .unwrap_or("request failed")
            .to_string()
    } else {
        body
    };
    Err(RagError::api_error(status.as_u16(), message))
}

/// Unwrap `{ success, data }` / `{ code, data }` envelopes.
fn unwrap_envelope(status: u16, value: Value) -> Result<Value, RagError> {
    let Value::Object(mut map) = value else {
        return Ok(value);
    };
    let message = |map: &serde_json::Map<String, Value>| {
        map.get("message")
            .or_else(|| map.get("msg"))
            .and_then(Value::as_str)
            .unwrap_or("backend reported failure")
            .to_string()
    };

    if let Some(success) = map.get("success").and_then(Value::as_bool) {
        if !success {
            return Err(RagError::api_error(status, message(&map)));
        }
        return Ok(map.remove("data").unwrap_or(Value::Null));
    }
    if map.contains_key("data")
        && let Some(code) = map.get("code")
    {
        let ok = match code {
            Value::Number(n) => matches!(n.as_i64(), Some(0 | 200)),
            Value::String(s) => matches!(s.as_str(), "0" | "200"),
            _ => false,
        };
        if !ok {
            return Err(RagError::api_error(status, message(&map)));
        }
        return Ok(map.remove("data").unwrap_or(Value::Null));
    }
    Ok(Value::Object(map))
}

#[async_trait]
impl ChatBackend for RagClient {
    async fn open_answer_stream(&self, request: &AnswerRequest) -> Result<ByteStream, RagError> {
        request.validate()?;
        let path = match request {
            AnswerRequest::Chat { .. } => &self.config.paths.chat,
            AnswerRequest::Search { .. } => &self.config.paths.search,
        };
        let url = self.config.url(path);

        let mut rb = self
            .http
            .post(&url)
            .headers(self.auth_headers()?)
            .header(ACCEPT, "text/event-stream")
            .json(&request.body());
        if self.config.http_config.stream_disable_compression {
            rb = rb.header(ACCEPT_ENCODING, "identity");
        }

        let started = Instant::now();
        tracing::debug!(target: "ragstream::http", %url, "opening answer stream");
        let resp = check_status(rb.send().await?).await?;
        tracing::debug!(
            target: "ragstream::http",
            %url,
            status = resp.status().as_u16(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "answer stream opened"
        );

        let stream = resp.bytes_stream().map(|chunk| {
            chunk.map_err(|e| {
                if e.is_timeout() {
                    RagError::from(e)
                } else {
                    RagError::StreamError(e.to_string())
                }
            })
        });
        Ok(Box::pin(stream))
    }

    async fn load_conversation(
        &self,
        conversation_id: &str,
    ) -> Result<ConversationPayload, RagError> {
        if conversation_id.trim().is_empty() {
            return Err(RagError::InvalidInput(
                "conversation id cannot be empty".to_string(),
            ));
        }
        let url = self.config.url(&self.config.paths.history);
        tracing::debug!(target: "ragstream::http", %url, conversation_id, "loading conversation");

        let resp = self
            .http
            .get(&url)
            .headers(self.auth_headers()?)
            .header(ACCEPT, "application/json")
            .query(&[("conversationId", conversation_id)])
            .send()
            .await?;
        let resp = check_status(resp).await?;
        let status = resp.status().as_u16();
        let value: Value = resp.json().await?;

        match unwrap_envelope(status, value)? {
            Value::Null => Ok(ConversationPayload::default()),
            data => Ok(serde_json::from_value(data)?),
        }
    }
}
