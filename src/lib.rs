//! # quizify
//!
//! Turn study notes (PDF, DOCX, TXT) into exam questions with a Large
//! Language Model.
//!
//! ## Pipeline Overview
//!
//! ```text
//! document bytes
//!  │
//!  ├─ 1. Extract    pdfium / docx-rs / UTF-8 (Latin-1 fallback)
//!  ├─ 2. Clean      whitespace normalisation, identical for every format
//!  ├─ 3. Check      fewer than 50 characters → rejected, no provider call
//!  ├─ 4. Prompt     truncate to 30 000 characters, render the JSON schema prompt
//!  ├─ 5. Generate   exactly one provider call, bounded by a timeout
//!  ├─ 6. Normalize  strip fences → locate payload → parse → validate entries
//!  └─ 7. Persist    upload status + flattened question rows
//! ```
//!
//! Stages 1–6 hold no shared state. Persistence goes through the
//! [`store::QuestionStore`] capability, with SQLite and in-memory backends
//! selected at startup.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use quizify::{Document, QuestionGenerator, QuizConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Provider auto-detected from GEMINI_API_KEY / OPENAI_API_KEY / …
//!     let generator = QuestionGenerator::from_config(QuizConfig::default())?;
//!     let bytes = std::fs::read("lecture.pdf")?;
//!     let document = Document::from_filename(bytes, "lecture.pdf")?;
//!     let (_text, questions) = quizify::generate_for_document(&generator, &document).await?;
//!     println!("{}: {} questions", questions.topic, questions.total_questions());
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature  | Default | Description |
//! |----------|---------|-------------|
//! | `cli`    | on      | Enables the `quizify` binary (clap + anyhow + tracing-subscriber) |
//! | `server` | on      | Local web server (axum + tower-http) |
//!
//! Disable both when using only the library:
//! ```toml
//! quizify = { version = "0.3", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod driver;
pub mod error;
pub mod event;
pub mod generate;
pub mod model;
pub mod objects;
pub mod pipeline;
pub mod prompts;
#[cfg(feature = "server")]
pub mod server;
pub mod store;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{QuizConfig, QuizConfigBuilder, StoreBackend};
pub use driver::{check_content_length, generate_for_document, Pipeline, PipelineOutput};
pub use error::{ErrorKind, QuizError, StoreError};
pub use event::{handle_storage_event, EventOutcome, StorageEvent};
pub use generate::QuestionGenerator;
pub use model::{
    Difficulty, Document, DocumentFormat, ExtractedText, GenerationRequest, Mcq, QuestionSet,
    ShortQuestion,
};
pub use objects::{LocalObjectStore, ObjectStore};
pub use pipeline::clean::clean_text;
pub use pipeline::extract::{extract, extract_text};
pub use pipeline::llm::{Completion, CompletionBackend};
pub use pipeline::normalize::normalize;
pub use pipeline::prompt::build_prompt;
pub use store::{open_store, QuestionStore, StoredQuestion, Upload, UploadStatus};
