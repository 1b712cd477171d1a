// src/provider/openai_compat.rs — Generic OpenAI-compatible provider
//
// Works against any /chat/completions endpoint: OpenAI, Groq, DeepSeek,
// Together, or a local Ollama in compatibility mode.

use async_trait::async_trait;
use std::time::Duration;

use super::{ChatRequest, ChatResponse, Message, ModelProvider, StopReason, TokenUsage};
use crate::infra::config::ProviderConfig;
use crate::infra::errors::ScrutineerError;

const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

pub struct OpenAICompatProvider {
    id: String,
    name: String,
    api_key: String,
    base_url: String,
    default_model: String,
    request_timeout: Duration,
    client: reqwest::Client,
}

impl OpenAICompatProvider {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        api_key: String,
        base_url: String,
        default_model: String,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            api_key,
            base_url,
            default_model,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            client: reqwest::Client::new(),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Build from the `[provider]` config section. The API key is read
    /// from the configured environment variable; an absent key is allowed
    /// (local endpoints don't check it).
    pub fn from_config(cfg: &ProviderConfig) -> Self {
        let api_key = std::env::var(&cfg.api_key_env).unwrap_or_default();
        Self::new(
            "openai-compat",
            "OpenAI-compatible",
            api_key,
            cfg.base_url.clone(),
            cfg.model.clone(),
        )
        .with_timeout(Duration::from_secs(cfg.request_timeout_seconds))
    }

    fn build_messages(messages: &[Message]) -> Vec<serde_json::Value> {
        messages
            .iter()
            .map(|m| serde_json::json!({ "role": m.role, "content": m.content }))
            .collect()
    }
}

#[async_trait]
impl ModelProvider for OpenAICompatProvider {
    fn id(&self) -> &str {
        &self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn default_model(&self) -> &str {
        &self.default_model
    }

    async fn chat(&self, request: ChatRequest) -> Result<ChatResponse, ScrutineerError> {
        let model = if request.model.is_empty() {
            self.default_model.as_str()
        } else {
            request.model.as_str()
        };

        let mut body = serde_json::json!({
            "model": model,
            "messages": Self::build_messages(&request.messages),
        });
        if let Some(max_tokens) = request.max_tokens {
            body["max_tokens"] = serde_json::json!(max_tokens);
        }
        if let Some(temp) = request.temperature {
            body["temperature"] = serde_json::json!(temp);
        }

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header(
                "User-Agent",
                format!("scrutineer/{}", env!("CARGO_PKG_VERSION")),
            )
            .timeout(self.request_timeout)
            .json(&body)
            .send()
            .await
            .map_err(|e| ScrutineerError::Provider {
                provider: self.id.clone(),
                message: e.to_string(),
                retriable: e.is_timeout() || e.is_connect(),
            })?;

        let status = response.status();

        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let retry_after_ms = response
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse::<u64>().ok())
                .map(|secs| secs * 1000)
                .unwrap_or(1_000);
            return Err(ScrutineerError::RateLimited {
                provider: self.id.clone(),
                retry_after_ms,
            });
        }

        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            return Err(ScrutineerError::Provider {
                provider: self.id.clone(),
                message: format!("HTTP {status}: {error_body}"),
                retriable: status.is_server_error(),
            });
        }

        let resp: serde_json::Value =
            response.json().await.map_err(|e| ScrutineerError::Provider {
                provider: self.id.clone(),
                message: e.to_string(),
                retriable: false,
            })?;

        let content = resp["choices"][0]["message"]["content"]
            .as_str()
            .unwrap_or("")
            .to_string();

        let usage = TokenUsage {
            input_tokens: resp["usage"]["prompt_tokens"].as_u64().unwrap_or(0) as u32,
            output_tokens: resp["usage"]["completion_tokens"].as_u64().unwrap_or(0) as u32,
        };

        let stop_reason = match resp["choices"][0]["finish_reason"].as_str() {
            Some("stop") => StopReason::EndTurn,
            Some("length") => StopReason::MaxTokens,
            _ => StopReason::Unknown,
        };

        Ok(ChatResponse {
            content,
            usage,
            stop_reason,
        })
    }
}
