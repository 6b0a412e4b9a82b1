//! LLM capability: the trait the orchestrator calls, a Claude-backed
//! implementation, and a deterministic stub for tests.
//!
//! Transport-level retries (rate limits, timeouts) live here; the
//! orchestrator itself never retries.

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::{InsightError, InsightResult};

const ANTHROPIC_API_URL: &str = "https://api.anthropic.com/v1/messages";
const ANTHROPIC_VERSION: &str = "2023-06-01";
const DEFAULT_MODEL: &str = "claude-3-haiku-20240307";
const SONNET_MODEL: &str = "claude-3-5-sonnet-20241022";
const MAX_TRANSPORT_ATTEMPTS: u32 = 3;

/// Token usage reported by the model.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TokenUsage {
    pub input_tokens: u64,
    pub output_tokens: u64,
}

/// Outcome of one LLM call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmResponse {
    pub success: bool,
    pub response_text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub usage: Option<TokenUsage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl LlmResponse {
    pub fn ok(text: impl Into<String>, usage: Option<TokenUsage>) -> Self {
        Self { success: true, response_text: text.into(), usage, error: None }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self { success: false, response_text: String::new(), usage: None, error: Some(error.into()) }
    }
}

/// Key/value call context attached for logging and persistence.
pub type CallContext = BTreeMap<String, String>;

/// The capability the orchestrator consumes.
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Send one prompt. Implementations own transport retries; a returned
    /// `Err` is terminal for the call.
    async fn send_prompt(
        &self,
        prompt: &str,
        context: &CallContext,
        timeout: Duration,
    ) -> InsightResult<LlmResponse>;
}

/// Anthropic Messages API request/response shapes.
#[derive(Debug, Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    messages: Vec<Message<'a>>,
}

#[derive(Debug, Serialize)]
struct Message<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    content: Vec<ContentBlock>,
    #[serde(default)]
    usage: Option<UsageBlock>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(default)]
    text: String,
}

#[derive(Debug, Deserialize)]
struct UsageBlock {
    #[serde(default)]
    input_tokens: u64,
    #[serde(default)]
    output_tokens: u64,
}

/// Claude-backed LLM client.
pub struct ClaudeClient {
    api_key: String,
    model: String,
    client: Client,
}

impl ClaudeClient {
    /// Create a client with an explicit key and model.
    pub fn new(api_key: impl Into<String>, use_sonnet: bool) -> InsightResult<Self> {
        let api_key = api_key.into();
        if api_key.is_empty() {
            return Err(InsightError::config("CLAUDE_API_KEY is empty"));
        }
        Ok(Self {
            api_key,
            model: if use_sonnet { SONNET_MODEL.to_string() } else { DEFAULT_MODEL.to_string() },
            client: Client::new(),
        })
    }

    /// Create from `CLAUDE_API_KEY` and `USE_CLAUDE_SONNET`.
    pub fn from_env() -> InsightResult<Self> {
        let api_key = std::env::var("CLAUDE_API_KEY")
            .map_err(|_| InsightError::config("CLAUDE_API_KEY not set"))?;
        let use_sonnet = std::env::var("USE_CLAUDE_SONNET")
            .map(|v| v.to_lowercase() == "true")
            .unwrap_or(false);
        Self::new(api_key, use_sonnet)
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    async fn call_once(&self, prompt: &str, timeout: Duration) -> InsightResult<LlmResponse> {
        let request = MessagesRequest {
            model: &self.model,
            max_tokens: 4000,
            messages: vec![Message { role: "user", content: prompt }],
        };

        let response = self
            .client
            .post(ANTHROPIC_API_URL)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .timeout(timeout)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    InsightError::Timeout(timeout.as_secs())
                } else {
                    InsightError::transport(format!("request failed: {}", e))
                }
            })?;

        let status = response.status();
        if status.as_u16() == 429 {
            return Err(InsightError::transport("rate limited"));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(InsightError::transport(format!("API returned {}: {}", status, body)));
        }

        let parsed: MessagesResponse = response
            .json()
            .await
            .map_err(|e| InsightError::transport(format!("failed to parse response: {}", e)))?;

        let text = parsed
            .content
            .first()
            .map(|c| c.text.clone())
            .ok_or_else(|| InsightError::transport("empty response content"))?;

        Ok(LlmResponse::ok(
            text,
            parsed.usage.map(|u| TokenUsage {
                input_tokens: u.input_tokens,
                output_tokens: u.output_tokens,
            }),
        ))
    }
}

#[async_trait]
impl LlmClient for ClaudeClient {
    async fn send_prompt(
        &self,
        prompt: &str,
        context: &CallContext,
        timeout: Duration,
    ) -> InsightResult<LlmResponse> {
        let size_kb = prompt.len() / 1024;
        info!(model = %self.model, size_kb, ?context, "Sending prompt");
        if prompt.len() > 200 * 1024 {
            warn!(size_kb, "Prompt exceeds the 200 KB payload guideline");
        }

        let mut last_error = None;
        for attempt in 0..MAX_TRANSPORT_ATTEMPTS {
            match self.call_once(prompt, timeout).await {
                Ok(response) => {
                    debug!(attempt, "Prompt succeeded");
                    return Ok(response);
                }
                Err(e @ (InsightError::Transport(_) | InsightError::Timeout(_))) => {
                    warn!(attempt, error = %e, "LLM call attempt failed");
                    last_error = Some(e);
                    if attempt + 1 < MAX_TRANSPORT_ATTEMPTS {
                        tokio::time::sleep(Duration::from_secs(1 << attempt)).await;
                    }
                }
                Err(e) => return Err(e),
            }
        }
        Err(last_error.unwrap_or_else(|| InsightError::transport("all attempts failed")))
    }
}

/// Deterministic stub returning a fixed six-block response. Used in tests
/// and dry runs.
pub struct StubLlmClient {
    response_text: String,
}

impl StubLlmClient {
    /// Stub answering every call with a complete six-block object, all
    /// confidences at 0.5.
    pub fn complete() -> Self {
        let blocks: Vec<String> = crate::prompts::CANONICAL_BLOCKS
            .iter()
            .map(|b| format!("\"{}\":{{\"confidence\":0.5}}", b))
            .collect();
        Self { response_text: format!("{{{}}}", blocks.join(",")) }
    }

    /// Stub returning an arbitrary fixed response.
    pub fn with_response(response_text: impl Into<String>) -> Self {
        Self { response_text: response_text.into() }
    }
}

#[async_trait]
impl LlmClient for StubLlmClient {
    async fn send_prompt(
        &self,
        _prompt: &str,
        _context: &CallContext,
        _timeout: Duration,
    ) -> InsightResult<LlmResponse> {
        Ok(LlmResponse::ok(self.response_text.clone(), None))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_key_rejected() {
        assert!(ClaudeClient::new("", false).is_err());
    }

    #[test]
    fn test_model_selection() {
        let haiku = ClaudeClient::new("key", false).unwrap();
        assert_eq!(haiku.model(), DEFAULT_MODEL);
        let sonnet = ClaudeClient::new("key", true).unwrap();
        assert_eq!(sonnet.model(), SONNET_MODEL);
    }

    #[tokio::test]
    async fn test_stub_returns_six_blocks() {
        let stub = StubLlmClient::complete();
        let response = stub
            .send_prompt("ignored", &CallContext::new(), Duration::from_secs(1))
            .await
            .unwrap();
        assert!(response.success);
        let parsed: serde_json::Value = serde_json::from_str(&response.response_text).unwrap();
        for block in crate::prompts::CANONICAL_BLOCKS {
            assert_eq!(parsed[block]["confidence"], 0.5);
        }
    }
}
