//! Core types and traits for cbt-assistant
//!
//! This crate provides the conversation session, the response evaluator,
//! configuration loading and logging used by all other cbt-assistant components.

pub mod config;
pub mod error;
pub mod evaluation;
pub mod logging;
pub mod session;

pub use error::{Error, Result};
pub use evaluation::{evaluate, CbtEvaluation};
pub use session::{ChatMessage, ConversationSession, Role};
