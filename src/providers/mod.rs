/*!
 * Chat provider implementations used by the LLM oracle.
 *
 * This module contains client implementations for various LLM providers:
 * - Ollama: Local LLM server
 * - OpenAI: OpenAI API integration, also used for LM Studio
 * - Anthropic: Anthropic API integration
 * - Mock: scripted responses for tests
 */

use async_trait::async_trait;
use std::fmt::Debug;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::app_config::{ProviderConfig, ProviderKind};
use crate::errors::ProviderError;

pub mod anthropic;
pub mod mock;
pub mod ollama;
pub mod openai;

pub use anthropic::Anthropic;
pub use mock::MockProvider;
pub use ollama::Ollama;
pub use openai::OpenAI;

/// One chat turn
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Role of the message sender (user or assistant)
    pub role: String,
    /// Content of the message
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: "assistant".to_string(),
            content: content.into(),
        }
    }
}

/// Provider-neutral chat completion request
#[derive(Debug, Clone, PartialEq)]
pub struct ChatRequest {
    pub model: String,
    pub system: Option<String>,
    pub messages: Vec<ChatMessage>,
    pub temperature: f32,
    pub max_tokens: u32,
}

impl ChatRequest {
    pub fn new(model: impl Into<String>, messages: Vec<ChatMessage>) -> Self {
        Self {
            model: model.into(),
            system: None,
            messages,
            temperature: 0.0,
            max_tokens: 1024,
        }
    }

    /// Set the system prompt
    pub fn system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }

    /// Set the temperature
    pub fn temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    /// Set the maximum answer length
    pub fn max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }
}

/// Provider-neutral chat completion response
#[derive(Debug, Clone, PartialEq)]
pub struct ChatResponse {
    /// The generated text
    pub text: String,
    pub prompt_tokens: Option<u64>,
    pub completion_tokens: Option<u64>,
}

/// Common trait for all LLM providers
///
/// This trait defines the interface that all provider implementations must follow,
/// allowing them to be used interchangeably by the oracle.
#[async_trait]
pub trait Provider: Send + Sync + Debug {
    /// Complete a chat request
    async fn complete(&self, request: ChatRequest) -> Result<ChatResponse, ProviderError>;

    /// Test the connection to the provider
    async fn test_connection(&self) -> Result<(), ProviderError>;
}

/// Build the client for `kind` from its settings
pub fn create_provider(kind: &ProviderKind, config: &ProviderConfig) -> Box<dyn Provider> {
    let timeout = Duration::from_secs(config.timeout_secs);
    match kind {
        ProviderKind::Ollama => Box::new(Ollama::new(&config.endpoint, timeout)),
        ProviderKind::OpenAI | ProviderKind::LMStudio => {
            Box::new(OpenAI::new(&config.endpoint, &config.api_key, &config.model, timeout))
        }
        ProviderKind::Anthropic => Box::new(Anthropic::new(&config.api_key, &config.endpoint, &config.model, timeout)),
    }
}

/// Map an unsuccessful HTTP status to a provider error
pub(crate) fn status_error(status: reqwest::StatusCode, body: String) -> ProviderError {
    match status.as_u16() {
        401 | 403 => ProviderError::AuthenticationError(body),
        429 => ProviderError::RateLimitExceeded(body),
        code => ProviderError::ApiError {
            status_code: code,
            message: body,
        },
    }
}

/// Map a transport failure to a provider error
pub(crate) fn transport_error(error: reqwest::Error) -> ProviderError {
    if error.is_connect() || error.is_timeout() {
        ProviderError::ConnectionError(error.to_string())
    } else {
        ProviderError::RequestFailed(error.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_statusError_shouldClassifyStatus() {
        assert!(matches!(
            status_error(reqwest::StatusCode::UNAUTHORIZED, "no".into()),
            ProviderError::AuthenticationError(_)
        ));
        assert!(matches!(
            status_error(reqwest::StatusCode::TOO_MANY_REQUESTS, "slow down".into()),
            ProviderError::RateLimitExceeded(_)
        ));
        assert!(matches!(
            status_error(reqwest::StatusCode::BAD_GATEWAY, "oops".into()),
            ProviderError::ApiError { status_code: 502, .. }
        ));
    }

    #[test]
    fn test_chatRequest_builder_shouldSetFields() {
        let request = ChatRequest::new("model", vec![ChatMessage::user("hi")])
            .system("be brief")
            .temperature(0.2)
            .max_tokens(64);

        assert_eq!(request.system.as_deref(), Some("be brief"));
        assert_eq!(request.temperature, 0.2);
        assert_eq!(request.max_tokens, 64);
    }
}
