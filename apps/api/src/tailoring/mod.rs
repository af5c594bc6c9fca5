// Resume tailoring: snapshot a .docx, rewrite it for a job description,
// and write the revised lines back without touching the template.
// All LLM calls go through llm_client via the TextRewriter trait.

pub mod handlers;
pub mod pipeline;
pub mod prompts;
pub mod reinject;
pub mod rewriter;
pub mod snapshot;

// Re-export the public API consumed by other modules (state, config).
pub use pipeline::TailorOptions;
pub use reinject::SlotPolicy;
pub use rewriter::TextRewriter;
