//! Conversation state
//!
//! A session is the ordered, role-tagged message history of one logical
//! conversation, always seeded with the persona prompt.

pub mod store;

pub use store::{ChatMessage, ConversationSession, Role};
