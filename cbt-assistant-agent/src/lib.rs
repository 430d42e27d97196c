//! Conversation orchestration for cbt-assistant
//!
//! Glues a [`ConversationSession`](cbt_assistant_core::ConversationSession)
//! to a completion provider and scores every reply.

pub mod context;
pub mod orchestrator;

pub use orchestrator::{ChatOrchestrator, ChatOutcome, OrchestratorSettings, RollbackPolicy};
