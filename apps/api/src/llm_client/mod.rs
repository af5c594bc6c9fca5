/// LLM Client: the single point of entry for all Claude API calls in the service.
///
/// ARCHITECTURAL RULE: No other module may call the Anthropic API directly.
/// All LLM interactions MUST go through this module.
///
/// Model: claude-sonnet-4-5 (hardcoded, do not make configurable to prevent drift)
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

pub mod prompts;
pub mod retry;

pub use retry::RetryPolicy;

const ANTHROPIC_API_URL: &str = "https://api.anthropic.com/v1/messages";
const ANTHROPIC_VERSION: &str = "2023-06-01";
/// The model used for all LLM calls.
/// This is intentionally hardcoded to prevent accidental drift.
pub const MODEL: &str = "claude-sonnet-4-5";
const DEFAULT_MAX_TOKENS: u32 = 4096;
const PING_MAX_TOKENS: u32 = 10;

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("LLM returned empty content")]
    EmptyContent,

    #[error("LLM attempt timed out after {0:?}")]
    Timeout(Duration),

    #[error("LLM still failing after {attempts} attempts: {last}")]
    Exhausted { attempts: u32, last: Box<LlmError> },

    #[error("LLM call exceeded its deadline of {0:?}")]
    Deadline(Duration),
}

impl LlmError {
    /// Rate limits, overload, server errors and timeouts are worth retrying.
    pub fn is_transient(&self) -> bool {
        match self {
            LlmError::Http(e) => e.is_timeout() || e.is_connect(),
            LlmError::Api { status, .. } => *status == 429 || *status >= 500,
            LlmError::Timeout(_) => true,
            _ => false,
        }
    }

    /// The service could not be reached in time (as opposed to rejecting the request).
    pub fn is_unavailable(&self) -> bool {
        matches!(
            self,
            LlmError::Exhausted { .. } | LlmError::Timeout(_) | LlmError::Deadline(_)
        )
    }
}

/// Per-call generation knobs.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GenerationParams {
    pub temperature: Option<f32>,
    pub max_tokens: u32,
}

impl Default for GenerationParams {
    fn default() -> Self {
        Self {
            temperature: None,
            max_tokens: DEFAULT_MAX_TOKENS,
        }
    }
}

#[derive(Debug, Serialize)]
struct AnthropicRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    system: &'a str,
    messages: Vec<AnthropicMessage<'a>>,
}

#[derive(Debug, Serialize)]
struct AnthropicMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
pub struct LlmResponse {
    pub content: Vec<ContentBlock>,
    pub usage: Usage,
}

#[derive(Debug, Deserialize)]
pub struct ContentBlock {
    #[serde(rename = "type")]
    pub block_type: String,
    pub text: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct Usage {
    pub input_tokens: u32,
    pub output_tokens: u32,
}

impl LlmResponse {
    /// Extracts the text content from the first text block.
    pub fn text(&self) -> Option<&str> {
        self.content
            .iter()
            .find(|b| b.block_type == "text")
            .and_then(|b| b.text.as_deref())
    }
}

#[derive(Debug, Deserialize)]
struct AnthropicError {
    error: AnthropicErrorBody,
}

#[derive(Debug, Deserialize)]
struct AnthropicErrorBody {
    message: String,
}

/// The single LLM client used by the service.
/// Wraps the Anthropic Messages API with a bounded retry policy.
#[derive(Clone)]
pub struct LlmClient {
    client: Client,
    api_key: String,
    retry: RetryPolicy,
}

impl LlmClient {
    pub fn new(api_key: String, retry: RetryPolicy) -> Result<Self, LlmError> {
        let client = Client::builder().timeout(retry.attempt_timeout).build()?;
        Ok(Self {
            client,
            api_key,
            retry,
        })
    }

    /// Makes a call to the Claude API under the client's retry policy,
    /// returning the full response object.
    pub async fn call(
        &self,
        prompt: &str,
        system: &str,
        params: &GenerationParams,
    ) -> Result<LlmResponse, LlmError> {
        let request_body = AnthropicRequest {
            model: MODEL,
            max_tokens: params.max_tokens,
            temperature: params.temperature,
            system,
            messages: vec![AnthropicMessage {
                role: "user",
                content: prompt,
            }],
        };

        self.retry
            .run(|attempt| {
                let request_body = &request_body;
                async move {
                    if attempt > 1 {
                        debug!("LLM call attempt {attempt}");
                    }
                    self.send(request_body).await
                }
            })
            .await
    }

    /// One HTTP round trip, no retry.
    async fn send(&self, request_body: &AnthropicRequest<'_>) -> Result<LlmResponse, LlmError> {
        let response = self
            .client
            .post(ANTHROPIC_API_URL)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("content-type", "application/json")
            .json(request_body)
            .send()
            .await?;

        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            if status.as_u16() == 429 || status.is_server_error() {
                warn!("LLM API returned {}: {}", status, body);
            }
            // Try to parse error message
            let message = serde_json::from_str::<AnthropicError>(&body)
                .map(|e| e.error.message)
                .unwrap_or(body);
            return Err(LlmError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let llm_response: LlmResponse = response.json().await?;

        debug!(
            "LLM call succeeded: input_tokens={}, output_tokens={}",
            llm_response.usage.input_tokens, llm_response.usage.output_tokens
        );

        Ok(llm_response)
    }

    /// Calls the LLM and returns its plain-text reply with any Markdown code
    /// fence removed.
    pub async fn call_text(
        &self,
        prompt: &str,
        system: &str,
        params: &GenerationParams,
    ) -> Result<String, LlmError> {
        let response = self.call(prompt, system, params).await?;
        let text = response.text().ok_or(LlmError::EmptyContent)?;
        Ok(strip_code_fences(text).to_string())
    }

    /// Sends a tiny prompt once (no retry) to verify the API key and
    /// connectivity. Returns the model's reply.
    pub async fn ping(&self) -> Result<String, LlmError> {
        let request_body = AnthropicRequest {
            model: MODEL,
            max_tokens: PING_MAX_TOKENS,
            temperature: None,
            system: prompts::PING_SYSTEM,
            messages: vec![AnthropicMessage {
                role: "user",
                content: prompts::PING_PROMPT,
            }],
        };
        let response = self.send(&request_body).await?;
        response
            .text()
            .map(|t| t.trim().to_string())
            .ok_or(LlmError::EmptyContent)
    }
}

/// Strips a ```lang ... ``` fence wrapping the whole reply. Unfenced replies
/// only lose surrounding blank lines; leading indentation on the first line
/// is kept.
fn strip_code_fences(text: &str) -> &str {
    let trimmed = text.trim();
    if let Some(rest) = trimmed.strip_prefix("```") {
        let body = match rest.find('\n') {
            Some(i) => &rest[i + 1..],
            None => rest,
        };
        return body.strip_suffix("```").unwrap_or(body).trim_end();
    }
    text.trim_matches(|c| c == '\n' || c == '\r')
        .trim_end()
}
