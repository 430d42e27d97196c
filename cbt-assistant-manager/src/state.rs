use cbt_assistant_agent::ChatOutcome;
use cbt_assistant_core::config::AppConfig;
use cbt_assistant_core::{CbtEvaluation, ChatMessage, Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};

/// Session used when a request does not name one.
pub const DEFAULT_SESSION_ID: &str = "default";

#[derive(Clone)]
pub struct AppState {
    pub api_tx: mpsc::Sender<ManagerCommand>,
    pub app: Arc<AppConfig>,
}

impl AppState {
    pub fn new(api_tx: mpsc::Sender<ManagerCommand>, app: AppConfig) -> Self {
        Self {
            api_tx,
            app: Arc::new(app),
        }
    }

    /// Route a command to the worker owning `session_id` and wait for its reply.
    pub async fn dispatch<T>(
        &self,
        session_id: String,
        build: impl FnOnce(oneshot::Sender<T>) -> SessionCommand,
    ) -> Result<T> {
        let (tx, rx) = oneshot::channel();
        self.api_tx
            .send(ManagerCommand {
                session_id,
                command: build(tx),
            })
            .await
            .map_err(|e| Error::Internal(format!("manager unavailable: {}", e)))?;

        rx.await
            .map_err(|e| Error::Internal(format!("session worker dropped request: {}", e)))
    }
}

/// A command addressed to one conversation
pub struct ManagerCommand {
    pub session_id: String,
    pub command: SessionCommand,
}

pub enum SessionCommand {
    Chat {
        message: String,
        reply: oneshot::Sender<Result<ChatOutcome>>,
    },
    Reset {
        reply: oneshot::Sender<()>,
    },
    Conversation {
        reply: oneshot::Sender<Vec<ChatMessage>>,
    },
}

/// `POST /chat` body
#[derive(Debug, Clone, Deserialize)]
pub struct UserMessage {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub session_id: Option<String>,
}

impl UserMessage {
    /// The message text; a missing or null value is a validation error.
    pub fn text(&self) -> Result<String> {
        self.message
            .clone()
            .ok_or_else(|| Error::Validation("field `message` is required".to_string()))
    }

    pub fn session_key(&self) -> String {
        session_key(self.session_id.as_deref())
    }
}

/// Query string accepted by `GET /reset` and `GET /conversation`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SessionQuery {
    #[serde(default)]
    pub session_id: Option<String>,
}

impl SessionQuery {
    pub fn session_key(&self) -> String {
        session_key(self.session_id.as_deref())
    }
}

fn session_key(session_id: Option<&str>) -> String {
    session_id
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .unwrap_or(DEFAULT_SESSION_ID)
        .to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatResponse {
    pub response: String,
    pub evaluation: CbtEvaluation,
    pub timestamp: DateTime<Utc>,
}

impl From<ChatOutcome> for ChatResponse {
    fn from(outcome: ChatOutcome) -> Self {
        Self {
            response: outcome.reply,
            evaluation: outcome.evaluation,
            timestamp: outcome.timestamp,
        }
    }
}

/// Shape shared by `/reset` and `/health`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusResponse {
    pub status: String,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationResponse {
    pub conversation_history: Vec<ChatMessage>,
    pub message_count: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_message_is_validation_error() {
        let body: UserMessage = serde_json::from_str(r#"{"message": null}"#).unwrap();
        assert!(matches!(body.text(), Err(Error::Validation(_))));

        let body: UserMessage = serde_json::from_str("{}").unwrap();
        assert!(matches!(body.text(), Err(Error::Validation(_))));
    }

    #[test]
    fn test_empty_message_is_accepted() {
        let body: UserMessage = serde_json::from_str(r#"{"message": ""}"#).unwrap();
        assert_eq!(body.text().unwrap(), "");
    }

    #[test]
    fn test_session_key_defaults() {
        let body: UserMessage = serde_json::from_str(r#"{"message": "hi"}"#).unwrap();
        assert_eq!(body.session_key(), DEFAULT_SESSION_ID);

        let query = SessionQuery {
            session_id: Some("  ".to_string()),
        };
        assert_eq!(query.session_key(), DEFAULT_SESSION_ID);

        let query = SessionQuery {
            session_id: Some("alice".to_string()),
        };
        assert_eq!(query.session_key(), "alice");
    }
}
