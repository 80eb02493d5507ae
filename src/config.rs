//! Configuration types for question generation.
//!
//! Every pipeline knob lives in [`QuizConfig`], built via its
//! [`QuizConfigBuilder`]. One struct makes it easy to share a config between
//! the server's request handlers, log it at startup, and compare two runs.
//!
//! Which persistence backend to open is a deployment decision, so it is
//! described separately by [`StoreBackend`] and consumed by
//! [`crate::store::open_store`].

use crate::error::QuizError;
use edgequake_llm::LLMProvider;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

/// Configuration for extraction, prompt building and the provider call.
///
/// # Example
/// ```rust
/// use quizify::QuizConfig;
///
/// let config = QuizConfig::builder()
///     .mcq_count(10)
///     .short_count(3)
///     .model("gemini-2.5-flash")
///     .build()
///     .unwrap();
/// assert_eq!(config.max_source_chars, 30_000);
/// ```
#[derive(Clone)]
pub struct QuizConfig {
    /// Multiple-choice questions requested per document. Default: 5.
    pub mcq_count: usize,

    /// Short-answer questions requested per document. Default: 5.
    pub short_count: usize,

    /// Maximum characters of source text forwarded to the provider. Default: 30 000.
    ///
    /// Longer text is cut and a visible truncation notice is appended to the
    /// prompt. The notice is never stored with the document.
    pub max_source_chars: usize,

    /// Minimum characters of extracted text before a provider call is made. Default: 50.
    ///
    /// Shorter documents fail with [`QuizError::InsufficientContent`]
    /// without spending a model call.
    pub min_text_chars: usize,

    /// LLM model identifier, e.g. "gemini-2.5-flash", "gpt-4.1-mini".
    /// If None, gemini and openai use a built-in default; other named
    /// providers need one.
    pub model: Option<String>,

    /// LLM provider name (e.g. "gemini", "openai", "anthropic", "ollama").
    /// If None along with `provider`, the provider is resolved from the environment.
    pub provider_name: Option<String>,

    /// Pre-constructed LLM provider. Takes precedence over `provider_name`.
    pub provider: Option<Arc<dyn LLMProvider>>,

    /// Sampling temperature. Default: 0.3.
    ///
    /// Some variety helps distractor options read naturally; much higher
    /// values make the model drift from the JSON schema.
    pub temperature: f32,

    /// Maximum tokens the provider may generate. Default: 8192.
    ///
    /// Ten questions with explanations fit comfortably; a lower cap risks a
    /// reply cut off mid-JSON, which then fails as a malformed response.
    pub max_tokens: usize,

    /// Timeout for the single provider call, in seconds. Default: 120.
    ///
    /// Expiry is reported as [`QuizError::ProviderError`].
    pub api_timeout_secs: u64,

    /// Download timeout for URL inputs in seconds. Default: 120.
    pub download_timeout_secs: u64,

    /// Location of the pdfium shared library (file or directory).
    /// If None, the working directory and then the system library path are tried.
    pub pdfium_lib_path: Option<PathBuf>,
}

impl Default for QuizConfig {
    fn default() -> Self {
        Self {
            mcq_count: 5,
            short_count: 5,
            max_source_chars: 30_000,
            min_text_chars: 50,
            model: None,
            provider_name: None,
            provider: None,
            temperature: 0.3,
            max_tokens: 8192,
            api_timeout_secs: 120,
            download_timeout_secs: 120,
            pdfium_lib_path: None,
        }
    }
}

impl fmt::Debug for QuizConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QuizConfig")
            .field("mcq_count", &self.mcq_count)
            .field("short_count", &self.short_count)
            .field("max_source_chars", &self.max_source_chars)
            .field("min_text_chars", &self.min_text_chars)
            .field("model", &self.model)
            .field("provider_name", &self.provider_name)
            .field("provider", &self.provider.as_ref().map(|_| "<dyn LLMProvider>"))
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("api_timeout_secs", &self.api_timeout_secs)
            .field("pdfium_lib_path", &self.pdfium_lib_path)
            .finish()
    }
}

impl QuizConfig {
    /// Create a new builder for `QuizConfig`.
    pub fn builder() -> QuizConfigBuilder {
        QuizConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`QuizConfig`].
#[derive(Debug)]
pub struct QuizConfigBuilder {
    config: QuizConfig,
}

impl QuizConfigBuilder {
    pub fn mcq_count(mut self, n: usize) -> Self {
        self.config.mcq_count = n;
        self
    }

    pub fn short_count(mut self, n: usize) -> Self {
        self.config.short_count = n;
        self
    }

    pub fn max_source_chars(mut self, n: usize) -> Self {
        self.config.max_source_chars = n;
        self
    }

    pub fn min_text_chars(mut self, n: usize) -> Self {
        self.config.min_text_chars = n;
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = Some(model.into());
        self
    }

    pub fn provider_name(mut self, name: impl Into<String>) -> Self {
        self.config.provider_name = Some(name.into());
        self
    }

    pub fn provider(mut self, provider: Arc<dyn LLMProvider>) -> Self {
        self.config.provider = Some(provider);
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.temperature = t.clamp(0.0, 2.0);
        self
    }

    pub fn max_tokens(mut self, n: usize) -> Self {
        self.config.max_tokens = n;
        self
    }

    pub fn api_timeout_secs(mut self, secs: u64) -> Self {
        self.config.api_timeout_secs = secs;
        self
    }

    pub fn download_timeout_secs(mut self, secs: u64) -> Self {
        self.config.download_timeout_secs = secs;
        self
    }

    pub fn pdfium_lib_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.pdfium_lib_path = Some(path.into());
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<QuizConfig, QuizError> {
        let c = &self.config;
        if c.mcq_count == 0 && c.short_count == 0 {
            return Err(QuizError::InvalidConfig(
                "At least one MCQ or short question must be requested".into(),
            ));
        }
        if c.max_source_chars < c.min_text_chars {
            return Err(QuizError::InvalidConfig(format!(
                "max_source_chars ({}) must be ≥ min_text_chars ({})",
                c.max_source_chars, c.min_text_chars
            )));
        }
        if c.api_timeout_secs == 0 {
            return Err(QuizError::InvalidConfig(
                "API timeout must be ≥ 1 second".into(),
            ));
        }
        Ok(self.config)
    }
}

// ── Enums ────────────────────────────────────────────────────────────────

/// Persistence backend selected at startup.
///
/// Both variants implement the same [`crate::store::QuestionStore`]
/// capability; nothing downstream inspects which one is active.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum StoreBackend {
    /// Embedded SQLite database at the given path (created if missing).
    Sqlite(PathBuf),
    /// Process-local key-value tables; contents are lost on exit.
    Memory,
}

impl Default for StoreBackend {
    fn default() -> Self {
        StoreBackend::Sqlite(PathBuf::from("quizify.db"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let c = QuizConfig::default();
        assert_eq!(c.mcq_count, 5);
        assert_eq!(c.short_count, 5);
        assert_eq!(c.max_source_chars, 30_000);
        assert_eq!(c.min_text_chars, 50);
    }

    #[test]
    fn build_rejects_zero_questions() {
        let err = QuizConfig::builder()
            .mcq_count(0)
            .short_count(0)
            .build()
            .unwrap_err();
        assert!(matches!(err, QuizError::InvalidConfig(_)));
    }

    #[test]
    fn build_rejects_budget_below_minimum() {
        assert!(QuizConfig::builder()
            .max_source_chars(10)
            .min_text_chars(50)
            .build()
            .is_err());
    }

    #[test]
    fn temperature_is_clamped() {
        let c = QuizConfig::builder().temperature(9.0).build().unwrap();
        assert_eq!(c.temperature, 2.0);
    }

    #[test]
    fn debug_hides_provider() {
        let dbg = format!("{:?}", QuizConfig::default());
        assert!(dbg.contains("mcq_count"));
    }
}
