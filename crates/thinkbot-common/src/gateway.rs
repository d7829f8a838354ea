use std::fmt;
use std::time::Duration;

use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::GatewayError;

#[derive(Clone, Debug)]
pub struct GatewayConfig {
    pub base_url: String,
    pub model: String,
    pub default_timeout: Duration,
    /// Total number of attempts per request, including the first.
    pub max_retries: u32,
    /// Backoff unit. Content and rate-limit failures wait `unit * 2^attempt`,
    /// transport failures wait a flat `unit`.
    pub backoff_unit: Duration,
    pub max_error_body_bytes: usize,
    pub referer: Option<String>,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            base_url: "https://openrouter.ai/api/v1".to_string(),
            model: "mistralai/mistral-7b-instruct".to_string(),
            default_timeout: Duration::from_secs(60),
            max_retries: 3,
            backoff_unit: Duration::from_secs(1),
            max_error_body_bytes: 8 * 1024,
            referer: None,
        }
    }
}

impl GatewayConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let base_url = std::env::var("THINKBOT_LLM_BASE_URL").unwrap_or(defaults.base_url);

        let model = std::env::var("THINKBOT_LLM_MODEL")
            .ok()
            .filter(|s| !s.trim().is_empty())
            .unwrap_or(defaults.model);

        let default_timeout = std::env::var("THINKBOT_LLM_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .map(Duration::from_secs)
            .unwrap_or(defaults.default_timeout);

        let max_retries = std::env::var("THINKBOT_LLM_MAX_RETRIES")
            .ok()
            .and_then(|s| s.parse::<u32>().ok())
            .filter(|&n| n > 0)
            .unwrap_or(defaults.max_retries);

        let backoff_unit = std::env::var("THINKBOT_LLM_BACKOFF_MS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .map(Duration::from_millis)
            .unwrap_or(defaults.backoff_unit);

        let max_error_body_bytes = std::env::var("THINKBOT_LLM_MAX_ERROR_BODY_BYTES")
            .ok()
            .and_then(|s| s.parse::<usize>().ok())
            .unwrap_or(defaults.max_error_body_bytes);

        let referer = std::env::var("THINKBOT_LLM_REFERER")
            .ok()
            .filter(|s| !s.trim().is_empty());

        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            model,
            default_timeout,
            max_retries,
            backoff_unit,
            max_error_body_bytes,
            referer,
        }
    }
}

/// Caller-supplied provider credential. Held for the duration of one pipeline run.
#[derive(Clone)]
pub struct ApiKey(String);

impl ApiKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into().trim().to_string())
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ApiKey(<redacted>)")
    }
}

/// One system + user prompt pair sent as a single chat request.
#[derive(Debug, Clone)]
pub struct ChatPrompt {
    pub system: String,
    pub user: String,
    pub temperature: Option<f32>,
}

impl ChatPrompt {
    pub fn new(system: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            system: system.into(),
            user: user.into(),
            temperature: None,
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }
}

#[derive(Clone)]
pub struct Gateway {
    config: GatewayConfig,
    http: reqwest::Client,
}

impl Gateway {
    pub fn new(config: GatewayConfig) -> Result<Self, GatewayError> {
        let http = reqwest::Client::builder()
            .user_agent("thinkbot/gateway")
            .build()?;
        Ok(Self { config, http })
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    /// Send a prompt and return the model's raw message content.
    pub async fn send(&self, api_key: &ApiKey, prompt: &ChatPrompt) -> Result<String, GatewayError> {
        self.send_with(api_key, prompt, |content| Ok(content.to_string()))
            .await
    }

    /// Send a prompt and hand the model's content to `accept`.
    ///
    /// A retryable error from `accept` consumes an attempt exactly like a
    /// transport or rate-limit failure, so response validation shares the
    /// gateway's retry budget. Terminal errors return immediately; exhausting
    /// the budget yields [`GatewayError::Exhausted`] with the last error.
    pub async fn send_with<T, F>(
        &self,
        api_key: &ApiKey,
        prompt: &ChatPrompt,
        mut accept: F,
    ) -> Result<T, GatewayError>
    where
        F: FnMut(&str) -> Result<T, GatewayError>,
    {
        let request = self.build_request(prompt);
        let attempts = self.config.max_retries.max(1);
        let mut last_error = String::from("no attempt was made");

        for attempt in 0..attempts {
            let result = match self.attempt(api_key, &request).await {
                Ok(content) => accept(&content),
                Err(e) => Err(e),
            };
            let err = match result {
                Ok(v) => return Ok(v),
                Err(e) if !e.is_retryable() => return Err(e),
                Err(e) => e,
            };

            let delay = retry_delay(&err, self.config.backoff_unit, attempt);
            warn!(
                attempt = attempt + 1,
                max_attempts = attempts,
                delay_ms = delay.as_millis(),
                error = %err,
                "chat request failed"
            );
            last_error = err.to_string();

            if attempt + 1 < attempts {
                tokio::time::sleep(delay).await;
            }
        }

        Err(GatewayError::Exhausted {
            attempts,
            last_error,
        })
    }

    fn build_request(&self, prompt: &ChatPrompt) -> ChatCompletionRequest {
        ChatCompletionRequest {
            model: self.config.model.clone(),
            messages: vec![
                Message {
                    role: "system".to_string(),
                    content: prompt.system.clone(),
                },
                Message {
                    role: "user".to_string(),
                    content: prompt.user.clone(),
                },
            ],
            temperature: prompt.temperature,
        }
    }

    async fn attempt(
        &self,
        api_key: &ApiKey,
        request: &ChatCompletionRequest,
    ) -> Result<String, GatewayError> {
        let url = format!("{}/chat/completions", self.config.base_url);
        let mut builder = self
            .http
            .post(&url)
            .timeout(self.config.default_timeout)
            .bearer_auth(api_key.expose())
            .json(request);
        if let Some(referer) = &self.config.referer {
            builder = builder.header("HTTP-Referer", referer);
        }
        let resp = builder.send().await?;

        let status = resp.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(GatewayError::RateLimited);
        }
        if !status.is_success() {
            let body = read_limited_text(resp, self.config.max_error_body_bytes).await;
            return Err(GatewayError::Provider { status, body });
        }

        let body = resp.text().await?;
        let parsed: ChatCompletionResponse = serde_json::from_str(&body)
            .map_err(|e| GatewayError::MalformedResponse(format!("invalid response body: {e}")))?;
        let content = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .unwrap_or_default();

        if content.trim().is_empty() {
            return Err(GatewayError::EmptyResponse);
        }
        debug!(bytes = content.len(), "received model content");
        Ok(content)
    }
}

fn retry_delay(err: &GatewayError, unit: Duration, attempt: u32) -> Duration {
    if err.is_transport() {
        return unit;
    }
    let mult = 1u32.checked_shl(attempt).unwrap_or(u32::MAX);
    unit.saturating_mul(mult)
}

async fn read_limited_text(resp: reqwest::Response, max_bytes: usize) -> String {
    match resp.bytes().await {
        Ok(b) => {
            let end = b.len().min(max_bytes);
            String::from_utf8_lossy(&b[..end]).to_string()
        }
        Err(e) => {
            warn!(error = %e, "failed to read provider error body");
            "<failed to read error body>".to_string()
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: String,
    pub content: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChatCompletionRequest {
    pub model: String,
    pub messages: Vec<Message>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChatCompletionResponse {
    pub choices: Vec<ChatCompletionChoice>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChatCompletionChoice {
    pub message: ChatCompletionMessage,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChatCompletionMessage {
    pub content: Option<String>,
}
