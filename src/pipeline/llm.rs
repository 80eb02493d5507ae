//! Provider interaction: one prompt in, one raw reply out.
//!
//! The orchestrator talks to a [`CompletionBackend`] rather than to
//! `edgequake_llm` directly. Production code wraps an [`LLMProvider`] in a
//! [`ProviderBackend`]; tests substitute a scripted backend and count calls.
//!
//! Nothing here retries. A failed call is reported once as
//! [`QuizError::ProviderError`] and the caller decides what to do.

use crate::config::QuizConfig;
use crate::error::QuizError;
use edgequake_llm::{ChatMessage, CompletionOptions, LLMProvider, ProviderFactory};
use futures::future::BoxFuture;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Provider used when only `GEMINI_API_KEY` is present.
pub const GEMINI_PROVIDER: &str = "gemini";
pub const GEMINI_DEFAULT_MODEL: &str = "gemini-2.5-flash";

pub const OPENAI_PROVIDER: &str = "openai";
pub const OPENAI_DEFAULT_MODEL: &str = "gpt-4.1-mini";

/// Model used when a provider is named without one.
///
/// Only providers whose catalogue is stable get a default; for the rest
/// (local servers, deployments) the model must be given explicitly.
pub fn default_model(provider: &str) -> Option<&'static str> {
    match provider.to_ascii_lowercase().as_str() {
        GEMINI_PROVIDER => Some(GEMINI_DEFAULT_MODEL),
        OPENAI_PROVIDER => Some(OPENAI_DEFAULT_MODEL),
        _ => None,
    }
}

/// Raw provider reply plus token accounting.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Completion {
    pub content: String,
    pub input_tokens: usize,
    pub output_tokens: usize,
}

/// Anything that can turn a prompt into a raw text reply.
pub trait CompletionBackend: Send + Sync {
    /// Short label for logs, e.g. `"gemini"`.
    fn name(&self) -> &str;

    /// Send `prompt` and return the unparsed reply.
    fn complete<'a>(&'a self, prompt: &'a str) -> BoxFuture<'a, Result<Completion, QuizError>>;
}

// ── Provider adapter ─────────────────────────────────────────────────────────

/// [`CompletionBackend`] over an `edgequake_llm` provider.
pub struct ProviderBackend {
    provider: Arc<dyn LLMProvider>,
    label: String,
    options: CompletionOptions,
}

impl ProviderBackend {
    pub fn new(provider: Arc<dyn LLMProvider>, label: impl Into<String>, config: &QuizConfig) -> Self {
        Self {
            provider,
            label: label.into(),
            options: build_options(config),
        }
    }
}

impl CompletionBackend for ProviderBackend {
    fn name(&self) -> &str {
        &self.label
    }

    fn complete<'a>(&'a self, prompt: &'a str) -> BoxFuture<'a, Result<Completion, QuizError>> {
        Box::pin(async move {
            let start = Instant::now();
            let messages = vec![ChatMessage::user(prompt)];

            let response = self
                .provider
                .chat(&messages, Some(&self.options))
                .await
                .map_err(|e| {
                    warn!(provider = %self.label, error = %e, "Provider call failed");
                    QuizError::provider_error(e.to_string())
                })?;

            debug!(
                "{}: {} input tokens, {} output tokens, {:?}",
                self.label,
                response.prompt_tokens,
                response.completion_tokens,
                start.elapsed()
            );

            Ok(Completion {
                content: response.content,
                input_tokens: response.prompt_tokens,
                output_tokens: response.completion_tokens,
            })
        })
    }
}

// ── Unconfigured backend ─────────────────────────────────────────────────────

/// Stand-in used when no provider could be resolved.
///
/// Lets a server start without credentials; every generation attempt then
/// fails with [`QuizError::ProviderUnavailable`] and the upload is marked
/// failed with that message.
pub struct UnconfiguredBackend {
    provider: String,
    hint: String,
}

impl UnconfiguredBackend {
    pub fn new(provider: impl Into<String>, hint: impl Into<String>) -> Self {
        Self {
            provider: provider.into(),
            hint: hint.into(),
        }
    }

    /// Keep the details of a failed resolution for later reporting.
    pub fn from_error(err: &QuizError) -> Self {
        match err {
            QuizError::ProviderUnavailable { provider, hint } => Self::new(provider, hint),
            other => Self::new("auto", other.to_string()),
        }
    }
}

impl CompletionBackend for UnconfiguredBackend {
    fn name(&self) -> &str {
        &self.provider
    }

    fn complete<'a>(&'a self, _prompt: &'a str) -> BoxFuture<'a, Result<Completion, QuizError>> {
        Box::pin(async move {
            Err(QuizError::ProviderUnavailable {
                provider: self.provider.clone(),
                hint: self.hint.clone(),
            })
        })
    }
}

// ── Provider resolution ──────────────────────────────────────────────────────

/// Resolve a backend from the config and environment, most specific first:
///
/// 1. pre-built `config.provider`
/// 2. `config.provider_name` + `config.model`, or the provider's [`default_model`]
/// 3. `EDGEQUAKE_LLM_PROVIDER` + `EDGEQUAKE_MODEL`, both non-empty
/// 4. `GEMINI_API_KEY` set → gemini with [`GEMINI_DEFAULT_MODEL`] unless a model is given
/// 5. `ProviderFactory::from_env` auto-detection
pub fn resolve_backend(config: &QuizConfig) -> Result<ProviderBackend, QuizError> {
    let (provider, label) = resolve_provider(config)?;
    info!("Using LLM provider: {label}");
    Ok(ProviderBackend::new(provider, label, config))
}

fn resolve_provider(config: &QuizConfig) -> Result<(Arc<dyn LLMProvider>, String), QuizError> {
    if let Some(ref provider) = config.provider {
        return Ok((Arc::clone(provider), "custom".to_string()));
    }

    if let Some(ref name) = config.provider_name {
        let model = config
            .model
            .as_deref()
            .or_else(|| default_model(name))
            .ok_or_else(|| QuizError::ProviderUnavailable {
                provider: name.clone(),
                hint: format!(
                    "No default model for provider '{name}'. \
                    Pass --model or set EDGEQUAKE_MODEL."
                ),
            })?;
        return create_provider(name, model);
    }

    if let (Some(prov), Some(model)) = (
        non_empty_env("EDGEQUAKE_LLM_PROVIDER"),
        non_empty_env("EDGEQUAKE_MODEL"),
    ) {
        return create_provider(&prov, &model);
    }

    if non_empty_env("GEMINI_API_KEY").is_some() {
        let model = config.model.as_deref().unwrap_or(GEMINI_DEFAULT_MODEL);
        return create_provider(GEMINI_PROVIDER, model);
    }

    let (provider, _embedding) =
        ProviderFactory::from_env().map_err(|e| QuizError::ProviderUnavailable {
            provider: "auto".to_string(),
            hint: format!(
                "No LLM provider could be auto-detected from environment.\n\
                Set GEMINI_API_KEY, OPENAI_API_KEY, or pass --provider.\n\
                Error: {e}"
            ),
        })?;
    Ok((provider, "auto".to_string()))
}

fn create_provider(name: &str, model: &str) -> Result<(Arc<dyn LLMProvider>, String), QuizError> {
    let provider = ProviderFactory::create_llm_provider(name, model).map_err(|e| {
        QuizError::ProviderUnavailable {
            provider: name.to_string(),
            hint: e.to_string(),
        }
    })?;
    Ok((provider, format!("{name}/{model}")))
}

fn non_empty_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.is_empty())
}

/// Build `CompletionOptions` from the generation config.
fn build_options(config: &QuizConfig) -> CompletionOptions {
    CompletionOptions {
        temperature: Some(config.temperature),
        max_tokens: Some(config.max_tokens),
        ..Default::default()
    }
}
