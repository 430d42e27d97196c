//! Context builder for provider requests

use cbt_assistant_core::ConversationSession;
use cbt_assistant_providers::Message;

/// Build the provider payload from a session: the full ordered history,
/// role and content only.
pub fn build_messages(session: &ConversationSession) -> Vec<Message> {
    session.history().iter().map(Message::from).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use cbt_assistant_core::Role;

    #[test]
    fn test_build_messages_keeps_order_and_roles() {
        let mut session = ConversationSession::new("persona");
        session.append(Role::User, "hello");
        session.append(Role::Assistant, "hi");

        let messages = build_messages(&session);
        assert_eq!(
            messages,
            vec![
                Message::system("persona"),
                Message::user("hello"),
                Message::assistant("hi"),
            ]
        );
    }
}
