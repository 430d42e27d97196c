//! Completion provider integrations for cbt-assistant
//!
//! This crate defines the provider abstraction the conversation core talks to
//! and an implementation for a locally hosted Ollama runtime.

pub mod base;
pub mod ollama;

pub use base::{LLMProvider, LLMResponse, Message, ProviderError, ProviderResult};
pub use ollama::OllamaClient;
