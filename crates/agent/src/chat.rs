use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use serde_json::Value;
use tanya_core::config::{LlmConfig, VisionConfig};
use tanya_core::retry::RetryPolicy;
use tracing::debug;

use crate::llm::{ChatMessage, ChatRequest, LlmClient, LlmError};

/// Chat-completions client for an OpenAI-compatible endpoint.
#[derive(Clone)]
pub struct HttpChatClient {
    client: Client,
    api_url: String,
    api_key: SecretString,
    model: String,
    max_tokens: u32,
    retry: RetryPolicy,
}

#[derive(Serialize)]
struct CompletionBody<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_p: Option<f32>,
}

impl HttpChatClient {
    pub fn new(
        api_url: impl Into<String>,
        api_key: SecretString,
        model: impl Into<String>,
        max_tokens: u32,
        timeout: Duration,
    ) -> Result<Self, LlmError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|error| LlmError::Client(error.to_string()))?;
        Ok(Self {
            client,
            api_url: api_url.into(),
            api_key,
            model: model.into(),
            max_tokens,
            retry: RetryPolicy::default(),
        })
    }

    pub fn from_llm_config(config: &LlmConfig) -> Result<Self, LlmError> {
        let api_key = config
            .api_key
            .clone()
            .ok_or_else(|| LlmError::NotConfigured("llm.api_key is not set".to_string()))?;
        Ok(Self::new(
            &config.api_url,
            api_key,
            &config.model,
            config.max_tokens,
            Duration::from_secs(config.timeout_secs),
        )?
        .with_retry(RetryPolicy::with_max_retries(config.max_retries)))
    }

    /// `Ok(None)` when no vision endpoint is configured.
    pub fn from_vision_config(config: &VisionConfig) -> Result<Option<Self>, LlmError> {
        if !config.is_configured() {
            return Ok(None);
        }
        let (Some(api_url), Some(api_key)) = (config.api_url.as_ref(), config.api_key.clone())
        else {
            return Ok(None);
        };
        Self::new(
            api_url,
            api_key,
            &config.model,
            config.max_tokens,
            Duration::from_secs(config.timeout_secs),
        )
        .map(Some)
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    async fn post_once(&self, body: &CompletionBody<'_>) -> Result<String, LlmError> {
        let response = self
            .client
            .post(&self.api_url)
            .bearer_auth(self.api_key.expose_secret())
            .json(body)
            .send()
            .await
            .map_err(|error| LlmError::Transport {
                retryable: error.is_timeout() || error.is_connect(),
                message: error.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(LlmError::Status {
                status: status.as_u16(),
                body: body.chars().take(500).collect(),
            });
        }

        let payload: Value = response
            .json()
            .await
            .map_err(|error| LlmError::MalformedResponse(error.to_string()))?;
        extract_content(&payload)
    }
}

impl std::fmt::Debug for HttpChatClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpChatClient")
            .field("api_url", &self.api_url)
            .field("model", &self.model)
            .field("max_tokens", &self.max_tokens)
            .finish_non_exhaustive()
    }
}

/// Reads `choices[0].message.content`.
fn extract_content(payload: &Value) -> Result<String, LlmError> {
    payload
        .pointer("/choices/0/message/content")
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| {
            let detail: String = payload.to_string().chars().take(300).collect();
            LlmError::MalformedResponse(detail)
        })
}

#[async_trait]
impl LlmClient for HttpChatClient {
    async fn complete(&self, request: ChatRequest) -> Result<String, LlmError> {
        let body = CompletionBody {
            model: &self.model,
            messages: &request.messages,
            max_tokens: self.max_tokens,
            temperature: request.sampling.map(|sampling| sampling.temperature),
            top_p: request.sampling.map(|sampling| sampling.top_p),
        };
        debug!(
            model = %self.model,
            message_count = request.messages.len(),
            "sending language model request"
        );
        self.retry.run("llm.complete", || self.post_once(&body)).await
    }
}
