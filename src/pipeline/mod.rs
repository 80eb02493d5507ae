//! Pipeline stages for question generation.
//!
//! Each submodule implements exactly one transformation step, so each can
//! be tested without the others.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ extract ──▶ clean ──▶ prompt ──▶ llm ──▶ normalize
//! (path/URL) (pdfium,    (whitespace) (template) (provider) (JSON salvage)
//!            docx-rs)
//! ```
//!
//! 1. [`input`]: resolve a local path or URL to a `Document`
//! 2. [`extract`]: format-specific text extraction; runs in `spawn_blocking`
//!    because pdfium and docx parsing are CPU-bound
//! 3. [`clean`]: deterministic whitespace cleanup shared by all formats
//! 4. [`prompt`]: truncate to the character budget and render the prompt
//! 5. [`llm`]: the one provider call; the only stage with network I/O
//! 6. [`normalize`]: recover and validate the question payload

pub mod clean;
pub mod extract;
pub mod input;
pub mod llm;
pub mod normalize;
pub mod prompt;
