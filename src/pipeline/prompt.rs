//! Prompt building: source text + question counts → provider prompt.
//!
//! Pure functions only. The same inputs always render the same prompt, which
//! keeps provider behaviour reproducible and lets tests compare prompts
//! byte for byte.

use crate::model::GenerationRequest;
use crate::prompts::{
    GENERATION_PROMPT, MCQ_COUNT_SLOT, SHORT_COUNT_SLOT, SOURCE_TEXT_SLOT, TRUNCATION_NOTICE,
};

/// Cut `text` to at most `max_chars` characters.
///
/// Returns the (possibly shortened) text and whether it was cut. When cut,
/// [`TRUNCATION_NOTICE`] is appended so the model knows the notes continue.
pub fn truncate_source(text: &str, max_chars: usize) -> (String, bool) {
    match text.char_indices().nth(max_chars) {
        None => (text.to_string(), false),
        Some((byte_idx, _)) => {
            let mut out = String::with_capacity(byte_idx + TRUNCATION_NOTICE.len());
            out.push_str(&text[..byte_idx]);
            out.push_str(TRUNCATION_NOTICE);
            (out, true)
        }
    }
}

impl GenerationRequest {
    /// Build a request, truncating `source_text` to `max_chars`.
    pub fn new(
        source_text: &str,
        desired_mcq_count: usize,
        desired_short_count: usize,
        topic_override: Option<String>,
        max_chars: usize,
    ) -> Self {
        let (source_text, truncated) = truncate_source(source_text, max_chars);
        Self {
            source_text,
            desired_mcq_count,
            desired_short_count,
            topic_override,
            truncated,
        }
    }

    /// Render the full prompt for this request.
    pub fn prompt(&self) -> String {
        render_prompt(
            &self.source_text,
            self.desired_mcq_count,
            self.desired_short_count,
        )
    }
}

/// Truncate `source_text` and render the generation prompt.
pub fn build_prompt(
    source_text: &str,
    desired_mcq_count: usize,
    desired_short_count: usize,
    max_chars: usize,
) -> String {
    let (text, _) = truncate_source(source_text, max_chars);
    render_prompt(&text, desired_mcq_count, desired_short_count)
}

/// Substitute counts first and the source text last, so placeholder-looking
/// text inside the notes is never expanded.
fn render_prompt(source_text: &str, mcq_count: usize, short_count: usize) -> String {
    GENERATION_PROMPT
        .replace(MCQ_COUNT_SLOT, &mcq_count.to_string())
        .replace(SHORT_COUNT_SLOT, &short_count.to_string())
        .replace(SOURCE_TEXT_SLOT, source_text)
}
