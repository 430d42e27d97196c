//! Chat orchestrator: one conversation turn end to end

use cbt_assistant_core::config::Config;
use cbt_assistant_core::{evaluate, CbtEvaluation, ChatMessage, ConversationSession, Error, Role};
use cbt_assistant_providers::{LLMProvider, ProviderError};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::context::build_messages;

/// What happens to the pending user turn when the provider call fails
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RollbackPolicy {
    /// Leave the unanswered user message in history
    #[default]
    KeepUserTurn,
    /// Truncate history back to where it was before the turn
    DiscardUserTurn,
}

impl RollbackPolicy {
    pub fn from_flag(rollback_on_failure: bool) -> Self {
        if rollback_on_failure {
            Self::DiscardUserTurn
        } else {
            Self::KeepUserTurn
        }
    }
}

/// Per-orchestrator knobs, fixed at construction
#[derive(Debug, Clone)]
pub struct OrchestratorSettings {
    /// Model identifier; the provider default applies when `None`
    pub model: Option<String>,
    /// Upper bound on one provider call
    pub timeout: Duration,
    pub rollback: RollbackPolicy,
}

impl Default for OrchestratorSettings {
    fn default() -> Self {
        Self {
            model: None,
            timeout: Duration::from_secs(120),
            rollback: RollbackPolicy::default(),
        }
    }
}

impl OrchestratorSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            model: Some(config.provider.model.clone()),
            timeout: Duration::from_secs(config.provider.timeout_secs),
            rollback: RollbackPolicy::from_flag(config.agent.rollback_on_failure),
        }
    }
}

/// Result of a successful turn
#[derive(Debug, Clone, Serialize)]
pub struct ChatOutcome {
    pub reply: String,
    pub evaluation: CbtEvaluation,
    pub timestamp: DateTime<Utc>,
}

/// Owns one conversation and drives it against a completion provider.
///
/// `send` takes `&mut self`, so a single orchestrator can only run one turn
/// at a time; callers sharing it across tasks must serialize access.
pub struct ChatOrchestrator {
    session: ConversationSession,
    provider: Arc<dyn LLMProvider>,
    settings: OrchestratorSettings,
}

impl ChatOrchestrator {
    /// Create an orchestrator with a fresh session seeded by `system_prompt`
    pub fn new(
        provider: Arc<dyn LLMProvider>,
        system_prompt: impl Into<String>,
        settings: OrchestratorSettings,
    ) -> Self {
        Self {
            session: ConversationSession::new(system_prompt),
            provider,
            settings,
        }
    }

    /// Run one turn: record the user message, ask the provider, record and
    /// score the reply.
    ///
    /// Provider failures (including the timeout) are not retried and surface
    /// as [`Error::Provider`]. Whether the user message survives a failure is
    /// governed by [`RollbackPolicy`].
    pub async fn send(
        &mut self,
        user_message: impl Into<String>,
    ) -> cbt_assistant_core::Result<ChatOutcome> {
        let turn_id = Uuid::new_v4();
        let pre_len = self.session.len();

        self.session.append(Role::User, user_message);
        let messages = build_messages(&self.session);
        debug!(
            "Turn {}: requesting completion with {} messages",
            turn_id,
            messages.len()
        );

        let call = self.provider.chat(messages, self.settings.model.clone());
        let result = match tokio::time::timeout(self.settings.timeout, call).await {
            Ok(result) => result,
            Err(_) => Err(ProviderError::Timeout(self.settings.timeout)),
        };

        let response = match result {
            Ok(response) => response,
            Err(e) => {
                warn!("Turn {}: completion failed: {}", turn_id, e);
                if self.settings.rollback == RollbackPolicy::DiscardUserTurn {
                    self.session.truncate_to(pre_len);
                }
                return Err(Error::Provider(e.to_string()));
            }
        };

        self.session.append(Role::Assistant, response.content.clone());
        let evaluation = evaluate(&response.content);
        info!(
            "Turn {}: reply of {} chars, evaluation {:?}",
            turn_id,
            response.content.len(),
            evaluation
        );

        Ok(ChatOutcome {
            reply: response.content,
            evaluation,
            timestamp: Utc::now(),
        })
    }

    /// Return the conversation to its freshly seeded state
    pub fn reset(&mut self) {
        self.session.reset();
        debug!("Conversation reset");
    }

    /// Owned copy of the history
    pub fn snapshot(&self) -> Vec<ChatMessage> {
        self.session.snapshot()
    }

    pub fn message_count(&self) -> usize {
        self.session.len()
    }

    pub fn session(&self) -> &ConversationSession {
        &self.session
    }
}
