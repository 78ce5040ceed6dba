//! LLM provider abstraction and trait definitions
//!
//! The pipeline treats inference as an opaque `invoke(prompt) -> text`
//! capability. This module defines that seam: a provider-agnostic request and
//! response shape plus the [`LlmProvider`] trait that concrete backends and
//! test doubles implement.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

/// A single message in a conversation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: MessageRole,
    pub content: String,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            content: content.into(),
        }
    }
}

/// Message roles in a conversation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    System,
    User,
    Assistant,
}

/// LLM completion request parameters
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    pub messages: Vec<Message>,
    pub model: String,
    pub max_tokens: Option<u32>,
    pub temperature: Option<f32>,
    pub top_p: Option<f32>,
    pub stop_sequences: Option<Vec<String>>,
    /// Free-form tags; the stage executor records the stage name under `stage`
    pub metadata: HashMap<String, String>,
}

impl CompletionRequest {
    /// Build a request from a system persona and a single user prompt
    pub fn new(
        model: impl Into<String>,
        system: impl Into<String>,
        prompt: impl Into<String>,
    ) -> Self {
        Self {
            messages: vec![Message::system(system), Message::user(prompt)],
            model: model.into(),
            max_tokens: None,
            temperature: None,
            top_p: None,
            stop_sequences: None,
            metadata: HashMap::new(),
        }
    }

    /// The last user message, which carries the stage instruction
    pub fn prompt(&self) -> &str {
        self.messages
            .iter()
            .rev()
            .find(|m| m.role == MessageRole::User)
            .map(|m| m.content.as_str())
            .unwrap_or("")
    }
}

/// LLM completion response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionResponse {
    pub content: Option<String>,
    pub model: String,
    pub usage: TokenUsage,
    pub finish_reason: FinishReason,
    pub metadata: HashMap<String, String>,
}

/// Token usage statistics
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TokenUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

/// Reason why completion finished
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FinishReason {
    Stop,
    Length,
    ContentFilter,
    Error,
}

/// LLM provider trait for dependency injection and testing
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Get the provider name (e.g., "openai", "anthropic")
    fn name(&self) -> &str;

    /// Generate a completion from the given request
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError>;

    /// Check if the provider is configured and ready
    async fn health_check(&self) -> Result<(), LlmError>;
}

/// LLM provider errors
#[derive(Debug, Clone, Error)]
pub enum LlmError {
    #[error("Provider not configured: {0}")]
    NotConfigured(String),
    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),
    #[error("Rate limit exceeded: {0}")]
    RateLimitExceeded(String),
    #[error("Request failed: {0}")]
    RequestFailed(String),
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
    #[error("Network error: {0}")]
    NetworkError(String),
    #[error("API error: {0}")]
    ApiError(String),
}

impl LlmError {
    /// Map a non-success HTTP status to the matching error kind
    pub fn from_status(provider: &str, status: reqwest::StatusCode, body: &str) -> Self {
        match status.as_u16() {
            401 | 403 => {
                Self::AuthenticationFailed(format!("{provider} rejected credentials: {status}"))
            }
            429 => Self::RateLimitExceeded(format!("{provider}: {body}")),
            _ => Self::ApiError(format!("{provider} API error: {status} - {body}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_completion_request_new_sets_persona_and_prompt() {
        let request = CompletionRequest::new("model-x", "You are a critic.", "Review this");

        assert_eq!(request.messages.len(), 2);
        assert_eq!(request.messages[0].role, MessageRole::System);
        assert_eq!(request.messages[0].content, "You are a critic.");
        assert_eq!(request.prompt(), "Review this");
        assert_eq!(request.model, "model-x");
        assert!(request.metadata.is_empty());
    }

    #[test]
    fn test_prompt_is_empty_without_user_message() {
        let mut request = CompletionRequest::new("m", "sys", "user");
        request.messages.truncate(1);
        assert_eq!(request.prompt(), "");
    }

    #[test]
    fn test_token_usage_default() {
        let usage = TokenUsage::default();
        assert_eq!(usage.prompt_tokens, 0);
        assert_eq!(usage.completion_tokens, 0);
        assert_eq!(usage.total_tokens, 0);
    }

    #[test]
    fn test_from_status_maps_auth_and_rate_limit() {
        assert!(matches!(
            LlmError::from_status("anthropic", reqwest::StatusCode::UNAUTHORIZED, ""),
            LlmError::AuthenticationFailed(_)
        ));
        assert!(matches!(
            LlmError::from_status("anthropic", reqwest::StatusCode::TOO_MANY_REQUESTS, "slow"),
            LlmError::RateLimitExceeded(_)
        ));
        assert!(matches!(
            LlmError::from_status("openai", reqwest::StatusCode::INTERNAL_SERVER_ERROR, "boom"),
            LlmError::ApiError(_)
        ));
    }

    #[test]
    fn test_message_role_serialization() {
        assert_eq!(serde_json::to_string(&MessageRole::System).unwrap(), "\"system\"");
        assert_eq!(serde_json::to_string(&MessageRole::User).unwrap(), "\"user\"");
        assert_eq!(
            serde_json::to_string(&MessageRole::Assistant).unwrap(),
            "\"assistant\""
        );
    }
}
