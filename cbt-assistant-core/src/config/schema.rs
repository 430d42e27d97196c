//! Configuration schema definitions

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Persona prompt seeded as the first message of every conversation.
pub const DEFAULT_SYSTEM_PROMPT: &str = r#"
You are a compassionate and skilled CBT (Cognitive Behavioral Therapy) assistant. Your role is to help users explore their thoughts, feelings, and behaviors through guided questioning and CBT techniques.

Key principles:
1. Always ask thoughtful, open-ended questions to help users reflect
2. Use CBT techniques like thought challenging, behavioral activation, and mindfulness
3. Help users identify cognitive distortions and negative thought patterns
4. Guide them to find their own insights rather than giving direct advice
5. Be empathetic, non-judgmental, and supportive
6. Focus on the present moment and actionable steps
7. Encourage self-reflection and awareness

CBT techniques to use:
- Thought records and challenging negative thoughts
- Identifying cognitive distortions (catastrophizing, all-or-nothing thinking, etc.)
- Behavioral experiments and activity scheduling
- Mindfulness and grounding exercises
- Problem-solving strategies
- Goal setting and action planning

Always respond with questions that help users:
- Explore their thoughts and feelings
- Identify patterns in thinking or behavior
- Challenge unhelpful thoughts
- Develop coping strategies
- Set realistic goals

Remember: You're not providing therapy, but teaching CBT tools through guided self-exploration.
"#;

/// Root configuration for cbt-assistant
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Application metadata
    #[serde(default)]
    pub app: AppConfig,
    /// HTTP server configuration
    #[serde(default)]
    pub server: ServerConfig,
    /// Completion provider configuration
    #[serde(default)]
    pub provider: ProviderConfig,
    /// Conversation behaviour
    #[serde(default)]
    pub agent: AgentConfig,
    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Application metadata reported by the API
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub name: String,
    pub description: String,
    pub version: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            name: "CBT Therapy Assistant API".to_string(),
            description: "AI-powered cognitive behavioral therapy assistant".to_string(),
            version: "1.0.0".to_string(),
        }
    }
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Bind address
    #[serde(default = "default_host")]
    pub host: String,
    /// Bind port
    #[serde(default = "default_port")]
    pub port: u16,
    /// Origins accepted by the CORS layer
    #[serde(default = "default_allowed_origins")]
    pub allowed_origins: Vec<String>,
    /// Seconds a conversation may sit idle before its worker is evicted
    #[serde(default = "default_session_idle_secs")]
    pub session_idle_secs: u64,
    /// Upper bound on conversations held in memory at once
    #[serde(default = "default_max_sessions")]
    pub max_sessions: usize,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8000
}

fn default_allowed_origins() -> Vec<String> {
    vec!["http://localhost:3000".to_string()]
}

fn default_session_idle_secs() -> u64 {
    1800
}

fn default_max_sessions() -> usize {
    1024
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            allowed_origins: default_allowed_origins(),
            session_idle_secs: default_session_idle_secs(),
            max_sessions: default_max_sessions(),
        }
    }
}

impl ServerConfig {
    /// `host:port` string suitable for binding
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Completion provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Base URL of the Ollama runtime
    #[serde(default = "default_api_base")]
    pub api_base: String,
    /// Model identifier sent with every request
    #[serde(default = "default_model")]
    pub model: String,
    /// Upper bound on a single completion call
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Sampling temperature; the runtime default applies when unset
    #[serde(default)]
    pub temperature: Option<f32>,
}

fn default_api_base() -> String {
    "http://localhost:11434".to_string()
}

fn default_model() -> String {
    "mistral:latest".to_string()
}

fn default_timeout_secs() -> u64 {
    120
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            api_base: default_api_base(),
            model: default_model(),
            timeout_secs: default_timeout_secs(),
            temperature: None,
        }
    }
}

/// Conversation behaviour
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Persona prompt used to seed and reset sessions
    #[serde(default = "default_system_prompt")]
    pub system_prompt: String,
    /// Drop the pending user turn when the provider call fails
    #[serde(default)]
    pub rollback_on_failure: bool,
}

fn default_system_prompt() -> String {
    DEFAULT_SYSTEM_PROMPT.to_string()
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            system_prompt: default_system_prompt(),
            rollback_on_failure: false,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Log format (text, json)
    #[serde(default = "default_log_format")]
    pub format: String,
    /// Directory for log files
    #[serde(default = "default_log_dir")]
    pub dir: String,
    /// Module-specific overrides
    #[serde(default)]
    pub overrides: HashMap<String, String>,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "text".to_string()
}

fn default_log_dir() -> String {
    "logs".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            dir: default_log_dir(),
            overrides: HashMap::new(),
        }
    }
}
