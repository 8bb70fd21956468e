use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde_json::Value as JsonValue;

use crate::config::ReasoningConfig;
use crate::error::Error;

/// One JSON-mode chat completion.
#[derive(Debug, Clone, PartialEq)]
pub struct ReasoningRequest {
    pub system: String,
    pub user: String,
    pub seed: Option<u64>,
    pub temperature: f32,
}

impl ReasoningRequest {
    /// Zero-temperature request pinned to `seed`.
    pub fn deterministic(system: impl Into<String>, user: impl Into<String>, seed: u64) -> Self {
        Self {
            system: system.into(),
            user: user.into(),
            seed: Some(seed),
            temperature: 0.0,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ReasoningError {
    #[error("reasoning service rate limit reached")]
    RateLimited,

    #[error("reasoning service returned {status}: {message}")]
    Api { status: u16, message: String },

    #[error("reasoning service unreachable: {0}")]
    Network(String),

    #[error("reasoning service did not answer in time")]
    Timeout,

    #[error("reasoning service sent an unreadable response: {0}")]
    Parse(String),

    #[error("reasoning service is not configured")]
    NotConfigured,
}

impl ReasoningError {
    /// Rate limits and timeouts are retried; everything else fails the call.
    pub fn is_transient(&self) -> bool {
        matches!(self, ReasoningError::RateLimited | ReasoningError::Timeout)
    }
}

impl From<ReasoningError> for Error {
    fn from(err: ReasoningError) -> Self {
        Error::ExternalService(err.to_string())
    }
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ReasoningClient: Send + Sync {
    /// Sends the request and returns the JSON object the model produced.
    async fn complete_json(&self, request: ReasoningRequest) -> Result<JsonValue, ReasoningError>;
}

/// OpenAI-compatible chat completions client.
#[derive(Clone)]
pub struct OpenAiClient {
    client: Client,
    api_key: Option<String>,
    api_url: String,
    model: String,
}

impl OpenAiClient {
    pub fn new(config: &ReasoningConfig, client: Client) -> Self {
        Self {
            client,
            api_key: config.api_key.clone(),
            api_url: config.api_url.clone(),
            model: config.model.clone(),
        }
    }

    fn payload(&self, request: &ReasoningRequest) -> JsonValue {
        let mut payload = serde_json::json!({
            "model": self.model,
            "messages": [
                {"role": "system", "content": request.system},
                {"role": "user", "content": request.user}
            ],
            "response_format": { "type": "json_object" },
            "temperature": request.temperature
        });
        if let Some(seed) = request.seed {
            payload["seed"] = serde_json::json!(seed);
        }
        payload
    }
}

#[async_trait]
impl ReasoningClient for OpenAiClient {
    async fn complete_json(&self, request: ReasoningRequest) -> Result<JsonValue, ReasoningError> {
        let api_key = self.api_key.as_deref().ok_or(ReasoningError::NotConfigured)?;

        let res = self
            .client
            .post(&self.api_url)
            .bearer_auth(api_key)
            .json(&self.payload(&request))
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ReasoningError::Timeout
                } else {
                    ReasoningError::Network(e.to_string())
                }
            })?;

        let status = res.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(ReasoningError::RateLimited);
        }
        if !status.is_success() {
            let message = res.text().await.unwrap_or_default();
            return Err(ReasoningError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let body: JsonValue = res
            .json()
            .await
            .map_err(|e| ReasoningError::Parse(e.to_string()))?;

        let content = body
            .get("choices")
            .and_then(|c| c.get(0))
            .and_then(|c| c.get("message"))
            .and_then(|m| m.get("content"))
            .and_then(|c| c.as_str())
            .ok_or_else(|| ReasoningError::Parse("missing choices[0].message.content".into()))?;

        serde_json::from_str(content).map_err(|e| ReasoningError::Parse(e.to_string()))
    }
}
