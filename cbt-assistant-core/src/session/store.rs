//! Session data structures

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Who authored a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A chat message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Message role (system, user, assistant)
    pub role: Role,
    /// Message content
    pub content: String,
    /// When the message entered the session
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
}

impl ChatMessage {
    /// Create a new chat message stamped with the current time
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            timestamp: Some(Utc::now()),
        }
    }
}

/// The ordered history of one conversation.
///
/// `history[0]` is always the system message carrying the persona prompt.
/// Nothing here enforces user/assistant alternation; callers supply it.
#[derive(Debug, Clone)]
pub struct ConversationSession {
    system_prompt: String,
    history: Vec<ChatMessage>,
}

impl ConversationSession {
    /// Create a session seeded with the persona prompt
    pub fn new(system_prompt: impl Into<String>) -> Self {
        let system_prompt = system_prompt.into();
        let history = vec![ChatMessage::new(Role::System, system_prompt.clone())];
        Self {
            system_prompt,
            history,
        }
    }

    /// Add a message to the end of the history
    pub fn append(&mut self, role: Role, content: impl Into<String>) {
        self.history.push(ChatMessage::new(role, content));
    }

    /// Drop everything but the freshly seeded system message
    pub fn reset(&mut self) {
        self.history = vec![ChatMessage::new(Role::System, self.system_prompt.clone())];
    }

    /// Owned copy of the full history, in order
    pub fn snapshot(&self) -> Vec<ChatMessage> {
        self.history.clone()
    }

    /// Borrowed view of the history
    pub fn history(&self) -> &[ChatMessage] {
        &self.history
    }

    /// Shorten the history to `len` messages. The system message is never
    /// removed, so `len` is clamped to at least 1.
    pub fn truncate_to(&mut self, len: usize) {
        self.history.truncate(len.max(1));
    }

    pub fn last(&self) -> Option<&ChatMessage> {
        self.history.last()
    }

    pub fn len(&self) -> usize {
        self.history.len()
    }

    /// Always false: a session holds at least its system message.
    pub fn is_empty(&self) -> bool {
        self.history.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PROMPT: &str = "You are a CBT assistant.";

    #[test]
    fn test_new_session_is_seeded() {
        let session = ConversationSession::new(PROMPT);
        assert_eq!(session.len(), 1);
        assert_eq!(session.history()[0].role, Role::System);
        assert_eq!(session.history()[0].content, PROMPT);
        assert!(session.history()[0].timestamp.is_some());
    }

    #[test]
    fn test_append_grows_by_one() {
        let mut session = ConversationSession::new(PROMPT);
        session.append(Role::User, "Hello");
        assert_eq!(session.len(), 2);

        session.append(Role::Assistant, "Hi there!");
        assert_eq!(session.len(), 3);

        let last = session.last().unwrap();
        assert_eq!(last.role, Role::Assistant);
        assert_eq!(last.content, "Hi there!");
    }

    #[test]
    fn test_append_does_not_enforce_alternation() {
        let mut session = ConversationSession::new(PROMPT);
        session.append(Role::User, "one");
        session.append(Role::User, "two");
        session.append(Role::System, "three");
        assert_eq!(session.len(), 4);
    }

    #[test]
    fn test_reset_after_many_messages() {
        let mut session = ConversationSession::new(PROMPT);
        for i in 0..10 {
            let role = if i % 2 == 0 { Role::User } else { Role::Assistant };
            session.append(role, format!("Message {}", i));
        }
        assert_eq!(session.len(), 11);

        session.reset();
        assert_eq!(session.len(), 1);
        assert_eq!(session.history()[0].role, Role::System);
        assert_eq!(session.history()[0].content, PROMPT);
    }

    #[test]
    fn test_reset_on_fresh_session_is_idempotent() {
        let mut session = ConversationSession::new(PROMPT);
        session.reset();
        session.reset();
        assert_eq!(session.len(), 1);
    }

    #[test]
    fn test_snapshot_does_not_alias_history() {
        let mut session = ConversationSession::new(PROMPT);
        session.append(Role::User, "before");
        let snapshot = session.snapshot();

        session.append(Role::Assistant, "after");
        session.reset();

        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot[1].content, "before");
        assert_eq!(session.len(), 1);
    }

    #[test]
    fn test_truncate_never_drops_system_message() {
        let mut session = ConversationSession::new(PROMPT);
        session.append(Role::User, "pending");
        session.truncate_to(0);
        assert_eq!(session.len(), 1);
        assert_eq!(session.history()[0].role, Role::System);
    }

    #[test]
    fn test_role_serializes_lowercase() {
        let message = ChatMessage::new(Role::Assistant, "ok");
        let value = serde_json::to_value(&message).unwrap();
        assert_eq!(value["role"], "assistant");
        assert_eq!(Role::User.to_string(), "user");
    }
}
