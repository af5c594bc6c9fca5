//! Text rewriting boundary: pluggable, trait-based.
//!
//! Default: `LlmClient` (Claude via the Messages API, retries inside the client).
//! Tests swap in a scripted implementation.
//!
//! `AppState` holds an `Arc<dyn TextRewriter>`.

use async_trait::async_trait;

use crate::llm_client::{GenerationParams, LlmClient, LlmError};
use crate::tailoring::prompts::build_rewrite_prompt;

/// Everything the rewriting service gets to see.
#[derive(Debug, Clone)]
pub struct RewriteRequest<'a> {
    pub system: &'a str,
    pub snapshot: &'a str,
    pub job_description: &'a str,
    pub params: GenerationParams,
}

/// Prompt in, revised plain text out. Implementations own their retry policy;
/// callers never retry.
#[async_trait]
pub trait TextRewriter: Send + Sync {
    async fn rewrite(&self, request: &RewriteRequest<'_>) -> Result<String, LlmError>;
}

#[async_trait]
impl TextRewriter for LlmClient {
    async fn rewrite(&self, request: &RewriteRequest<'_>) -> Result<String, LlmError> {
        let prompt = build_rewrite_prompt(request.snapshot, request.job_description);
        self.call_text(&prompt, request.system, &request.params)
            .await
    }
}
