//! OpenAI-compatible generation provider.
//!
//! Supports vLLM, Ollama, OpenAI, and any endpoint that follows the OpenAI
//! chat completions API format. Reasoning-mode models that emit
//! `<think>...</think>` blocks have the block stripped before the text is
//! returned.

use super::GenerationProvider;
use crate::config::LlmConfig;
use crate::error::LlmError;
use crate::types::Message;
use reqwest::{Client, StatusCode};
use serde_json::{Value, json};
use std::time::Duration;
use tracing::{debug, warn};

/// Generation provider for OpenAI-compatible chat completion endpoints.
pub struct OpenAiCompatProvider {
    client: Client,
    base_url: String,
    api_key: String,
    model: String,
    temperature: f32,
    max_tokens: u32,
    timeout_secs: u64,
}

impl std::fmt::Debug for OpenAiCompatProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiCompatProvider")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .finish()
    }
}

impl OpenAiCompatProvider {
    /// Create a provider from configuration.
    ///
    /// Reads the API key from the environment variable named in
    /// `config.api_key_env`. Local endpoints (localhost) fall back to a dummy
    /// bearer token when no key is set.
    pub fn new(config: &LlmConfig) -> Result<Self, LlmError> {
        let is_local =
            config.base_url.contains("localhost") || config.base_url.contains("127.0.0.1");

        let api_key = std::env::var(&config.api_key_env)
            .ok()
            .or_else(|| {
                if is_local {
                    debug!("No API key set for local endpoint; using dummy bearer token");
                    Some("local".to_string())
                } else {
                    None
                }
            })
            .ok_or_else(|| LlmError::AuthFailed {
                provider: format!("env var '{}' not set", config.api_key_env),
            })?;

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| LlmError::Connection {
                message: format!("Failed to build HTTP client: {e}"),
            })?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key,
            model: config.model.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            timeout_secs: config.timeout_secs,
        })
    }

    /// Probe the backend health endpoint. Never errors; unreachable means false.
    pub async fn health_check(&self) -> bool {
        let base = self.base_url.trim_end_matches("/v1");
        let url = format!("{base}/health");
        match self
            .client
            .get(&url)
            .timeout(Duration::from_secs(5))
            .send()
            .await
        {
            Ok(resp) => resp.status().is_success(),
            Err(e) => {
                warn!(error = %e, "Generation backend health check failed");
                false
            }
        }
    }

    fn messages_to_json(messages: &[Message]) -> Value {
        let items: Vec<Value> = messages
            .iter()
            .map(|m| json!({ "role": m.role.to_string(), "content": m.content }))
            .collect();
        Value::Array(items)
    }

    fn map_http_error(status: StatusCode, body: &str, retry_after: Option<u64>) -> LlmError {
        if status == StatusCode::TOO_MANY_REQUESTS {
            return LlmError::RateLimited {
                retry_after_secs: retry_after.unwrap_or(30),
            };
        }
        if status.is_server_error() {
            return LlmError::Connection {
                message: format!("upstream {status}: {}", truncate(body, 200)),
            };
        }
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return LlmError::AuthFailed {
                provider: format!("upstream rejected credentials ({status})"),
            };
        }
        LlmError::ApiRequest {
            message: format!("upstream {status}: {}", truncate(body, 200)),
        }
    }

    fn parse_response(json: &Value) -> Result<String, LlmError> {
        let content = json
            .pointer("/choices/0/message/content")
            .and_then(Value::as_str)
            .ok_or_else(|| LlmError::ResponseParse {
                message: "missing choices[0].message.content".to_string(),
            })?;
        Ok(strip_reasoning_block(content))
    }
}

/// Strip a leading `<think>...</think>` reasoning block if present.
fn strip_reasoning_block(content: &str) -> String {
    if let Some((_, tail)) = content.split_once("</think>") {
        return tail.trim().to_string();
    }
    content.trim().to_string()
}

fn truncate(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

#[async_trait::async_trait]
impl GenerationProvider for OpenAiCompatProvider {
    async fn complete(&self, messages: &[Message]) -> Result<String, LlmError> {
        let url = format!("{}/chat/completions", self.base_url);

        let body = json!({
            "model": self.model,
            "messages": Self::messages_to_json(messages),
            "temperature": self.temperature,
            "max_tokens": self.max_tokens,
            "stream": false,
        });

        debug!(url = %url, model = %self.model, turns = messages.len(), "Sending completion request");

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    LlmError::Timeout {
                        timeout_secs: self.timeout_secs,
                    }
                } else {
                    LlmError::Connection {
                        message: format!("Request failed: {e}"),
                    }
                }
            })?;

        let status = response.status();
        let retry_after = response
            .headers()
            .get("retry-after")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<u64>().ok());

        let response_body = response.text().await.map_err(|e| LlmError::Connection {
            message: format!("Failed to read response body: {e}"),
        })?;

        if !status.is_success() {
            return Err(Self::map_http_error(status, &response_body, retry_after));
        }

        let json: Value =
            serde_json::from_str(&response_body).map_err(|e| LlmError::ResponseParse {
                message: format!("Invalid JSON: {e}"),
            })?;

        Self::parse_response(&json)
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}
