//! Value types that flow through one pipeline run.
//!
//! Nothing here outlives the invocation that created it; durable identifiers
//! are assigned by the persistence collaborator in [`crate::store`].

use crate::error::QuizError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Topic used when neither the caller nor the provider names one.
pub const DEFAULT_TOPIC: &str = "General";

/// Input formats the extractor understands.
///
/// `.doc` files are accepted and parsed as DOCX; legacy binary Word files
/// therefore fail extraction rather than being rejected up front.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentFormat {
    Pdf,
    Docx,
    Txt,
}

impl DocumentFormat {
    /// Every extension accepted at the upload boundary.
    pub const EXTENSIONS: [&'static str; 4] = ["pdf", "docx", "doc", "txt"];

    /// Resolve a bare extension, case-insensitively.
    pub fn from_extension(ext: &str) -> Result<Self, QuizError> {
        match ext.to_ascii_lowercase().as_str() {
            "pdf" => Ok(DocumentFormat::Pdf),
            "docx" | "doc" => Ok(DocumentFormat::Docx),
            "txt" => Ok(DocumentFormat::Txt),
            other => Err(QuizError::UnsupportedFormat {
                extension: other.to_string(),
            }),
        }
    }

    /// Resolve the format from the text after the last `.` of a filename.
    pub fn from_filename(filename: &str) -> Result<Self, QuizError> {
        Self::from_extension(file_extension(filename))
    }

    /// MIME type used when storing the raw upload.
    pub fn content_type(self) -> &'static str {
        match self {
            DocumentFormat::Pdf => "application/pdf",
            DocumentFormat::Docx => {
                "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
            }
            DocumentFormat::Txt => "text/plain",
        }
    }
}

impl FromStr for DocumentFormat {
    type Err = QuizError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_extension(s)
    }
}

impl fmt::Display for DocumentFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DocumentFormat::Pdf => "PDF",
            DocumentFormat::Docx => "DOCX",
            DocumentFormat::Txt => "TXT",
        };
        f.write_str(name)
    }
}

/// Text after the last `.` of `filename`, or `""` when there is none.
pub fn file_extension(filename: &str) -> &str {
    match filename.rsplit_once('.') {
        Some((_, ext)) => ext,
        None => "",
    }
}

/// Raw uploaded bytes plus the format declared by their filename.
#[derive(Clone)]
pub struct Document {
    pub bytes: Vec<u8>,
    pub format: DocumentFormat,
    pub filename: String,
}

impl Document {
    /// Build a document, deriving its format from `filename`.
    pub fn from_filename(bytes: Vec<u8>, filename: impl Into<String>) -> Result<Self, QuizError> {
        let filename = filename.into();
        let format = DocumentFormat::from_filename(&filename)?;
        Ok(Self {
            bytes,
            format,
            filename,
        })
    }
}

impl fmt::Debug for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Document")
            .field("filename", &self.filename)
            .field("format", &self.format)
            .field("bytes", &self.bytes.len())
            .finish()
    }
}

/// Cleaned plain text produced by the extractor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedText {
    pub content: String,
}

impl ExtractedText {
    /// Length in characters, the unit every threshold is expressed in.
    pub fn char_count(&self) -> usize {
        self.content.chars().count()
    }
}

/// Everything the prompt builder needs for one provider call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationRequest {
    /// Source text, already truncated to the character budget.
    pub source_text: String,
    pub desired_mcq_count: usize,
    pub desired_short_count: usize,
    pub topic_override: Option<String>,
    /// Whether `source_text` was cut and carries the truncation notice.
    pub truncated: bool,
}

/// A multiple-choice question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mcq {
    pub question: String,
    pub options: Vec<String>,
    pub correct_answer: String,
    pub explanation: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    #[default]
    Medium,
    Hard,
}

impl Difficulty {
    pub fn as_str(self) -> &'static str {
        match self {
            Difficulty::Easy => "easy",
            Difficulty::Medium => "medium",
            Difficulty::Hard => "hard",
        }
    }

    /// Lenient parse: surrounding whitespace and case are ignored.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "easy" => Some(Difficulty::Easy),
            "medium" => Some(Difficulty::Medium),
            "hard" => Some(Difficulty::Hard),
            _ => None,
        }
    }
}

/// A short-answer question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShortQuestion {
    pub question: String,
    pub expected_points: Vec<String>,
    #[serde(default)]
    pub difficulty: Difficulty,
}

/// The validated output of one generation call.
///
/// Constructed only by the normalizer, which guarantees that at least one
/// of the two lists is non-empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionSet {
    pub topic: String,
    pub mcqs: Vec<Mcq>,
    pub short_questions: Vec<ShortQuestion>,
}

impl QuestionSet {
    pub fn total_questions(&self) -> usize {
        self.mcqs.len() + self.short_questions.len()
    }
}
