// Shared prompt constants and prompt-building utilities.
// Each service that needs LLM calls defines its own prompts.rs alongside it.
// This file contains cross-cutting prompt fragments.

/// Instruction that keeps the reply aligned line-for-line with its input.
pub const LINE_ALIGNMENT_INSTRUCTION: &str = "\
    CRITICAL: The input is a list of lines. Return EXACTLY the same number of lines, \
    in the same order, one output line per input line. Never merge, split, add or drop lines. \
    If a line should stay as it is, repeat it unchanged. \
    Lines containing ' | ' are table rows: keep the same number of ' | ' separators.";

/// Connectivity check used by `LlmClient::ping`.
pub const PING_SYSTEM: &str = "You are a connectivity check. Reply with one short word.";
pub const PING_PROMPT: &str = "Say hello";
