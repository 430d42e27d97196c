//! Ollama HTTP client (native `/api/chat` endpoint)

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;
use tracing::debug;

use crate::base::{LLMProvider, LLMResponse, Message, ProviderError, ProviderResult};

const DEFAULT_API_BASE: &str = "http://localhost:11434";
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Ollama chat request format
#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [Message],
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    options: Option<RequestOptions>,
}

#[derive(Debug, Serialize)]
struct RequestOptions {
    temperature: f32,
}

/// Ollama chat response format (non-streaming)
#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    model: Option<String>,
    #[serde(default)]
    message: Option<ResponseMessage>,
    #[serde(default)]
    done_reason: Option<String>,
    #[serde(default)]
    prompt_eval_count: Option<i64>,
    #[serde(default)]
    eval_count: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: String,
}

/// Client for a locally hosted Ollama runtime
pub struct OllamaClient {
    client: Client,
    api_base: String,
    default_model: String,
    temperature: Option<f32>,
}

impl OllamaClient {
    /// Create a new Ollama client. `api_base` defaults to the local runtime.
    pub fn new(api_base: Option<String>, default_model: impl Into<String>) -> Self {
        let api_base = api_base
            .filter(|base| !base.trim().is_empty())
            .map(|base| normalize_base_url(&base))
            .unwrap_or_else(|| DEFAULT_API_BASE.to_string());

        Self {
            client: Client::builder()
                .connect_timeout(CONNECT_TIMEOUT)
                .build()
                .unwrap_or_else(|_| Client::new()),
            api_base,
            default_model: default_model.into(),
            temperature: None,
        }
    }

    /// Set the sampling temperature sent with every request
    pub fn with_temperature(mut self, temperature: Option<f32>) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn api_base(&self) -> &str {
        &self.api_base
    }

    /// Parse an Ollama response into our standard format
    fn parse_response(response: ChatResponse) -> ProviderResult<LLMResponse> {
        let content = response
            .message
            .and_then(|message| message.content)
            .ok_or_else(|| {
                ProviderError::InvalidResponse("No message content in response".to_string())
            })?;

        let mut usage = HashMap::new();
        if let Some(prompt) = response.prompt_eval_count {
            usage.insert("prompt_tokens".to_string(), prompt);
        }
        if let Some(completion) = response.eval_count {
            usage.insert("completion_tokens".to_string(), completion);
        }
        if let (Some(prompt), Some(completion)) =
            (response.prompt_eval_count, response.eval_count)
        {
            usage.insert("total_tokens".to_string(), prompt + completion);
        }

        Ok(LLMResponse {
            content,
            model: response.model,
            finish_reason: response.done_reason.unwrap_or_else(|| "stop".to_string()),
            usage,
        })
    }

    fn api_error(status: reqwest::StatusCode, body: &str) -> ProviderError {
        let detail = serde_json::from_str::<ErrorBody>(body)
            .map(|e| e.error)
            .unwrap_or_else(|_| {
                if body.trim().is_empty() {
                    "Unknown error".to_string()
                } else {
                    body.to_string()
                }
            });
        ProviderError::ApiError(format!("HTTP {}: {}", status, detail))
    }
}

/// Strip trailing slashes and add a scheme when `OLLAMA_HOST`-style
/// `host:port` values are given.
fn normalize_base_url(url: &str) -> String {
    let url = url.trim().trim_end_matches('/');
    if url.contains("://") {
        url.to_string()
    } else {
        format!("http://{}", url)
    }
}

#[async_trait]
impl LLMProvider for OllamaClient {
    async fn chat(
        &self,
        messages: Vec<Message>,
        model: Option<String>,
    ) -> ProviderResult<LLMResponse> {
        let model = model.unwrap_or_else(|| self.default_model.clone());
        let request = ChatRequest {
            model: &model,
            messages: &messages,
            stream: false,
            options: self.temperature.map(|temperature| RequestOptions { temperature }),
        };

        debug!(
            "Sending chat request to {} with model {} ({} messages)",
            self.api_base,
            model,
            messages.len()
        );

        let url = format!("{}/api/chat", self.api_base);
        let response = self.client.post(&url).json(&request).send().await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(Self::api_error(status, &body));
        }

        let parsed: ChatResponse = serde_json::from_str(&body)?;
        Self::parse_response(parsed)
    }

    fn get_default_model(&self) -> String {
        self.default_model.clone()
    }
}
