//! Error types for the quizify library.
//!
//! Two error types reflect two layers:
//!
//! * [`QuizError`]: everything that can stop one document's pipeline run:
//!   unreadable input, an extraction that yields nothing, a provider that
//!   cannot be reached, or a reply that cannot be salvaged. Every variant is
//!   terminal for that document and none is retried inside the library.
//!
//! * [`StoreError`]: failures of the persistence collaborator. They surface
//!   through [`QuizError::Storage`] when they happen mid-pipeline.
//!
//! The `Display` text of a [`QuizError`] is written for end users: it is what
//! the driver stores as an upload's `error_message` and what the server
//! returns in its JSON error body.

use serde::Serialize;
use std::path::PathBuf;
use thiserror::Error;

/// Longest excerpt of a raw provider reply embedded in an error message.
pub const RESPONSE_EXCERPT_CHARS: usize = 500;

/// All errors a pipeline run can end with.
#[derive(Debug, Error)]
pub enum QuizError {
    // ── Extraction errors ────────────────────────────────────────────────
    /// File extension is not one of pdf, docx, doc, txt.
    #[error("Unsupported file type: '{extension}'. Supported: pdf, docx, doc, txt")]
    UnsupportedFormat { extension: String },

    /// The parser produced no usable text, or could not run at all.
    #[error("Could not extract text from {format} document: {reason}")]
    ExtractionFailed { format: String, reason: String },

    /// Extracted text is below the minimum accepted length.
    #[error(
        "Extracted text is too short ({chars} characters, minimum {min}). \
Please upload a document with more content."
    )]
    InsufficientContent { chars: usize, min: usize },

    // ── Provider errors ──────────────────────────────────────────────────
    /// No provider client could be initialised (missing API key etc.).
    #[error("Question generator '{provider}' is not configured.\n{hint}")]
    ProviderUnavailable { provider: String, hint: String },

    /// The remote call failed: network, quota, bad request or timeout.
    #[error("Question generation request failed: {message}")]
    ProviderError { message: String },

    /// No structured payload could be recovered from the reply.
    #[error("Failed to parse the generated questions: {detail}\nResponse: {excerpt}")]
    MalformedResponse { detail: String, excerpt: String },

    /// The reply parsed but every question entry was unusable.
    #[error("No valid questions were generated")]
    NoQuestionsGenerated,

    // ── Input errors ─────────────────────────────────────────────────────
    #[error("File not found: '{path}'")]
    FileNotFound { path: PathBuf },

    #[error("Permission denied reading '{path}'")]
    PermissionDenied { path: PathBuf },

    /// The input string is neither a readable path nor an HTTP(S) URL.
    #[error("Invalid input '{input}': {reason}")]
    InvalidInput { input: String, reason: String },

    #[error("Failed to download '{url}': {reason}")]
    DownloadFailed { url: String, reason: String },

    #[error("Download timed out after {secs}s for '{url}'")]
    DownloadTimeout { url: String, secs: u64 },

    // ── Config errors ────────────────────────────────────────────────────
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Collaborator errors ──────────────────────────────────────────────
    #[error("Storage error: {0}")]
    Storage(#[from] StoreError),
}

/// Stable, copyable classification of a [`QuizError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    UnsupportedFormat,
    ExtractionFailed,
    InsufficientContent,
    ProviderUnavailable,
    ProviderError,
    MalformedResponse,
    NoQuestionsGenerated,
    InvalidInput,
    InvalidConfig,
    Storage,
}

impl ErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::UnsupportedFormat => "unsupported_format",
            ErrorKind::ExtractionFailed => "extraction_failed",
            ErrorKind::InsufficientContent => "insufficient_content",
            ErrorKind::ProviderUnavailable => "provider_unavailable",
            ErrorKind::ProviderError => "provider_error",
            ErrorKind::MalformedResponse => "malformed_response",
            ErrorKind::NoQuestionsGenerated => "no_questions_generated",
            ErrorKind::InvalidInput => "invalid_input",
            ErrorKind::InvalidConfig => "invalid_config",
            ErrorKind::Storage => "storage",
        }
    }
}

impl QuizError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            QuizError::UnsupportedFormat { .. } => ErrorKind::UnsupportedFormat,
            QuizError::ExtractionFailed { .. } => ErrorKind::ExtractionFailed,
            QuizError::InsufficientContent { .. } => ErrorKind::InsufficientContent,
            QuizError::ProviderUnavailable { .. } => ErrorKind::ProviderUnavailable,
            QuizError::ProviderError { .. } => ErrorKind::ProviderError,
            QuizError::MalformedResponse { .. } => ErrorKind::MalformedResponse,
            QuizError::NoQuestionsGenerated => ErrorKind::NoQuestionsGenerated,
            QuizError::FileNotFound { .. }
            | QuizError::PermissionDenied { .. }
            | QuizError::InvalidInput { .. }
            | QuizError::DownloadFailed { .. }
            | QuizError::DownloadTimeout { .. } => ErrorKind::InvalidInput,
            QuizError::InvalidConfig(_) => ErrorKind::InvalidConfig,
            QuizError::Storage(_) => ErrorKind::Storage,
        }
    }

    /// Message suitable for display and for an upload's `error_message`.
    pub fn user_message(&self) -> String {
        self.to_string()
    }

    /// Build a [`QuizError::MalformedResponse`], keeping only a short
    /// prefix of the raw reply.
    pub fn malformed(detail: impl Into<String>, raw_response: &str) -> Self {
        QuizError::MalformedResponse {
            detail: detail.into(),
            excerpt: raw_response.chars().take(RESPONSE_EXCERPT_CHARS).collect(),
        }
    }

    /// Build a [`QuizError::ProviderError`] from a provider's failure text,
    /// bounded like the malformed-reply excerpt.
    pub fn provider_error(message: impl AsRef<str>) -> Self {
        let message = message.as_ref();
        let mut bounded: String = message.chars().take(RESPONSE_EXCERPT_CHARS).collect();
        if bounded.len() < message.len() {
            bounded.push('…');
        }
        QuizError::ProviderError { message: bounded }
    }
}

/// Errors returned by a [`crate::store::QuestionStore`] or
/// [`crate::objects::ObjectStore`] implementation.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Upload not found: {upload_id}")]
    UploadNotFound { upload_id: String },

    #[error("Upload already exists: {upload_id}")]
    UploadExists { upload_id: String },

    #[error("Object not found: {bucket}/{key}")]
    ObjectNotFound { bucket: String, key: String },

    #[error("Invalid object key '{key}'")]
    InvalidKey { key: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Store lock poisoned")]
    LockPoisoned,
}
