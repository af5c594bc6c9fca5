use std::sync::Arc;

use crate::config::Config;
use crate::llm_client::LlmClient;
use crate::tailoring::TextRewriter;

/// Shared application state injected into all route handlers via Axum extractors.
/// Read-only: every request parses and owns its own document.
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    /// Direct client handle, used for the key/connectivity check.
    pub llm: LlmClient,
    /// Pluggable rewriting backend. Default: the same `LlmClient`.
    pub rewriter: Arc<dyn TextRewriter>,
}
