//! Base trait for completion providers

use async_trait::async_trait;
use cbt_assistant_core::{ChatMessage, Role};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;
use thiserror::Error;

/// Error type for provider operations
#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("JSON parsing failed: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("API error: {0}")]
    ApiError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Request timed out after {0:?}")]
    Timeout(Duration),
}

pub type ProviderResult<T> = Result<T, ProviderError>;

/// A message on the wire: role and content only, no timestamps.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    /// Create a user message
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    /// Create a system message
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    /// Create an assistant message
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

impl From<&ChatMessage> for Message {
    fn from(message: &ChatMessage) -> Self {
        Self {
            role: message.role,
            content: message.content.clone(),
        }
    }
}

/// Response from a completion provider
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LLMResponse {
    /// Assistant reply text
    pub content: String,
    /// Model that actually served the request, when reported
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default = "default_finish_reason")]
    pub finish_reason: String,
    #[serde(default)]
    pub usage: HashMap<String, i64>,
}

fn default_finish_reason() -> String {
    "stop".to_string()
}

/// Trait for completion providers
#[async_trait]
pub trait LLMProvider: Send + Sync {
    /// Send the ordered conversation and return the assistant reply.
    ///
    /// `model` falls back to [`LLMProvider::get_default_model`] when `None`.
    async fn chat(&self, messages: Vec<Message>, model: Option<String>)
        -> ProviderResult<LLMResponse>;

    /// Get the default model for this provider
    fn get_default_model(&self) -> String;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_message_drops_timestamp() {
        let chat = ChatMessage::new(Role::User, "I feel anxious");
        let wire = Message::from(&chat);
        let value = serde_json::to_value(&wire).unwrap();
        assert_eq!(
            value,
            serde_json::json!({"role": "user", "content": "I feel anxious"})
        );
    }

    #[test]
    fn test_constructors_set_roles() {
        assert_eq!(Message::system("s").role, Role::System);
        assert_eq!(Message::user("u").role, Role::User);
        assert_eq!(Message::assistant("a").role, Role::Assistant);
    }

    #[test]
    fn test_timeout_error_message() {
        let err = ProviderError::Timeout(Duration::from_secs(5));
        assert_eq!(err.to_string(), "Request timed out after 5s");
    }
}
