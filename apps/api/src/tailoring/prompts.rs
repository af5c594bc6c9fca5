// All LLM prompt constants for the tailoring module.
// Reuses cross-cutting fragments from llm_client::prompts.

/// System prompt for resume rewriting.
pub const REWRITE_SYSTEM: &str = "You are an expert resume writer. \
    You rewrite the text of an existing resume so it speaks directly to a target job description, \
    while keeping every fact truthful to the original. \
    Do NOT invent employers, titles, dates, degrees, metrics or technologies that are not in the resume. \
    You MUST respond with plain text only. \
    Do NOT use markdown, code fences, headings or bullet glyphs. \
    Do NOT include explanations, greetings or apologies.";

/// Rewrite prompt template.
/// Replace: {alignment_instruction}, {job_description}, {snapshot}
pub const REWRITE_PROMPT_TEMPLATE: &str = r#"{alignment_instruction}

TARGET JOB DESCRIPTION:
{job_description}

RESUME LINES (rewrite these):
{snapshot}

Rewrite the resume lines above to fit the target job:
1. Keep names, contact details, employers, dates and section headings recognisable
2. Reword summaries and bullets to foreground the experience and keywords the job asks for
3. Prefer strong, specific verbs and keep any numbers exactly as given
4. Keep each line roughly the length of the line it replaces so the layout still fits
5. Output only the rewritten lines"#;

/// Fills the rewrite template in one pass, so placeholder text inside the
/// inputs is left as written.
pub fn build_rewrite_prompt(snapshot: &str, job_description: &str) -> String {
    let values = [
        (
            "{alignment_instruction}",
            crate::llm_client::prompts::LINE_ALIGNMENT_INSTRUCTION,
        ),
        ("{job_description}", job_description.trim()),
        ("{snapshot}", snapshot),
    ];

    let mut out = String::with_capacity(REWRITE_PROMPT_TEMPLATE.len() + snapshot.len());
    let mut rest = REWRITE_PROMPT_TEMPLATE;
    'scan: while let Some(start) = rest.find('{') {
        out.push_str(&rest[..start]);
        rest = &rest[start..];
        for (placeholder, value) in values {
            if let Some(after) = rest.strip_prefix(placeholder) {
                out.push_str(value);
                rest = after;
                continue 'scan;
            }
        }
        out.push('{');
        rest = &rest[1..];
    }
    out.push_str(rest);
    out
}
