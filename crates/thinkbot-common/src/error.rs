//! Failures observed while talking to the chat-completions provider.
//!
//! The retry loop in [`crate::gateway::Gateway`] classifies these with
//! [`GatewayError::is_retryable`]. Validation failures raised by callers while
//! inspecting the model's text (`MalformedResponse`, `EmptyResponse`,
//! `InvalidScores`) flow through the same loop.

use reqwest::StatusCode;

#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("HTTP {status}: {body}")]
    Provider { status: StatusCode, body: String },

    #[error("Rate limit exceeded")]
    RateLimited,

    #[error("malformed response: {0}")]
    MalformedResponse(String),

    #[error("Empty response from API")]
    EmptyResponse,

    #[error("Invalid score values in response: {0}")]
    InvalidScores(String),

    #[error("Failed to get valid response after {attempts} attempts. Last error: {last_error}")]
    Exhausted { attempts: u32, last_error: String },
}

impl GatewayError {
    /// Whether another attempt may succeed. Non-2xx statuses other than 429 are terminal.
    pub fn is_retryable(&self) -> bool {
        match self {
            GatewayError::Transport(_)
            | GatewayError::RateLimited
            | GatewayError::MalformedResponse(_)
            | GatewayError::EmptyResponse
            | GatewayError::InvalidScores(_) => true,
            GatewayError::Provider { .. } | GatewayError::Exhausted { .. } => false,
        }
    }

    pub fn is_transport(&self) -> bool {
        matches!(self, GatewayError::Transport(_))
    }
}
