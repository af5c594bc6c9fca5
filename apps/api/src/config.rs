use std::str::FromStr;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};

use crate::docx::package::DEFAULT_MAX_PART_BYTES;
use crate::llm_client::{GenerationParams, RetryPolicy};
use crate::tailoring::pipeline::DEFAULT_SNAPSHOT_CHAR_LIMIT;
use crate::tailoring::{SlotPolicy, TailorOptions};

const DEFAULT_MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;
const DEFAULT_TEMPERATURE: f32 = 0.4;

/// Application configuration loaded from environment variables.
/// Startup fails if required variables are missing or unparsable.
#[derive(Debug, Clone)]
pub struct Config {
    pub anthropic_api_key: String,
    pub port: u16,
    pub rust_log: String,
    pub snapshot_char_limit: usize,
    pub max_upload_bytes: usize,
    /// Cap on the uncompressed size of each part inside an uploaded archive.
    pub max_part_bytes: u64,
    pub slot_policy: SlotPolicy,
    pub llm_max_attempts: u32,
    pub llm_backoff_base: Duration,
    pub llm_backoff_max: Duration,
    pub llm_attempt_timeout: Duration,
    /// Whole-call budget across retries. Unset means attempts alone bound the call.
    pub llm_deadline: Option<Duration>,
    pub llm_temperature: f32,
    pub llm_max_tokens: u32,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from any key lookup. `from_env` passes the process env.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let llm_max_attempts: u32 = parse_or(&lookup, "LLM_MAX_ATTEMPTS", 5)?;
        if llm_max_attempts == 0 {
            return Err(anyhow!("LLM_MAX_ATTEMPTS must be at least 1"));
        }
        let llm_deadline = match lookup("LLM_DEADLINE_SECS") {
            Some(raw) => Some(Duration::from_secs(
                raw.trim()
                    .parse::<u64>()
                    .context("LLM_DEADLINE_SECS must be a whole number of seconds")?,
            )),
            None => None,
        };

        Ok(Config {
            anthropic_api_key: require(&lookup, "ANTHROPIC_API_KEY")?,
            port: parse_or(&lookup, "PORT", 8080)?,
            rust_log: lookup("RUST_LOG").unwrap_or_else(|| "info".to_string()),
            snapshot_char_limit: parse_or(
                &lookup,
                "SNAPSHOT_CHAR_LIMIT",
                DEFAULT_SNAPSHOT_CHAR_LIMIT,
            )?,
            max_upload_bytes: parse_or(&lookup, "MAX_UPLOAD_BYTES", DEFAULT_MAX_UPLOAD_BYTES)?,
            max_part_bytes: parse_or(&lookup, "MAX_PART_BYTES", DEFAULT_MAX_PART_BYTES)?,
            slot_policy: match lookup("SLOT_POLICY") {
                Some(raw) => raw.parse().map_err(|e| anyhow!("SLOT_POLICY: {e}"))?,
                None => SlotPolicy::default(),
            },
            llm_max_attempts,
            llm_backoff_base: Duration::from_millis(parse_or(&lookup, "LLM_BACKOFF_BASE_MS", 1000)?),
            llm_backoff_max: Duration::from_millis(parse_or(&lookup, "LLM_BACKOFF_MAX_MS", 16_000)?),
            llm_attempt_timeout: Duration::from_secs(parse_or(
                &lookup,
                "LLM_ATTEMPT_TIMEOUT_SECS",
                120,
            )?),
            llm_deadline,
            llm_temperature: parse_or(&lookup, "LLM_TEMPERATURE", DEFAULT_TEMPERATURE)?,
            llm_max_tokens: parse_or(&lookup, "LLM_MAX_TOKENS", GenerationParams::default().max_tokens)?,
        })
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.llm_max_attempts,
            base_delay: self.llm_backoff_base,
            max_delay: self.llm_backoff_max,
            attempt_timeout: self.llm_attempt_timeout,
            deadline: self.llm_deadline,
        }
    }

    pub fn tailor_options(&self) -> TailorOptions {
        TailorOptions {
            snapshot_char_limit: self.snapshot_char_limit,
            max_part_bytes: self.max_part_bytes,
            slot_policy: self.slot_policy,
            params: GenerationParams {
                temperature: Some(self.llm_temperature),
                max_tokens: self.llm_max_tokens,
            },
        }
    }

    #[cfg(test)]
    pub fn for_tests() -> Self {
        Self::from_lookup(|key| (key == "ANTHROPIC_API_KEY").then(|| "test-key".to_string()))
            .expect("defaults are valid")
    }
}

fn require(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Result<String> {
    lookup(key)
        .filter(|v| !v.trim().is_empty())
        .with_context(|| format!("Required environment variable '{key}' is not set"))
}

fn parse_or<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .with_context(|| format!("{key} has an invalid value '{raw}'")),
        None => Ok(default),
    }
}
