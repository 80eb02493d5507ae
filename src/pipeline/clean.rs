//! Whitespace cleanup applied to every extractor's raw output.
//!
//! Parsers disagree wildly about whitespace: pdfium emits a newline per text
//! line with trailing spaces, DOCX paragraphs carry indentation runs, and
//! plain-text files arrive with CRLF endings and blank-line padding. This
//! module reduces all of that to one canonical shape so the prompt budget is
//! spent on words, and the minimum-length check counts content rather than
//! padding.
//!
//! ## Rule Order
//!
//! Lines are trimmed before blank-line runs are collapsed. Trimming first
//! turns whitespace-only lines into empty lines, so the collapse sees every
//! run; the reverse order would leave `"a\n \n \nb"` with three newlines
//! and a second pass would change it again.

use once_cell::sync::Lazy;
use regex::Regex;

/// Apply all cleanup rules to raw extracted text.
///
/// Rules (applied in order):
/// 1. Trim leading/trailing whitespace on every line (also drops `\r`)
/// 2. Collapse 3+ consecutive newlines down to exactly 2
/// 3. Collapse 2+ consecutive spaces down to 1
/// 4. Trim the whole result
///
/// The output is a fixed point: `clean_text(&clean_text(x)) == clean_text(x)`.
pub fn clean_text(input: &str) -> String {
    let s = trim_lines(input);
    let s = collapse_newlines(&s);
    let s = collapse_spaces(&s);
    s.trim().to_string()
}

// ── Rule 1: Trim every line ──────────────────────────────────────────────────

fn trim_lines(input: &str) -> String {
    input.split('\n').map(str::trim).collect::<Vec<_>>().join("\n")
}

// ── Rule 2: Collapse blank-line runs ─────────────────────────────────────────

static RE_NEWLINE_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n{3,}").unwrap());

fn collapse_newlines(input: &str) -> String {
    RE_NEWLINE_RUN.replace_all(input, "\n\n").into_owned()
}

// ── Rule 3: Collapse space runs ──────────────────────────────────────────────

static RE_SPACE_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r" {2,}").unwrap());

fn collapse_spaces(input: &str) -> String {
    RE_SPACE_RUN.replace_all(input, " ").into_owned()
}

// ── Tests ────────────────────────────────────────────────────────────────────
