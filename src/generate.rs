//! Generation orchestrator: prompt → one provider call → normalized questions.
//!
//! [`QuestionGenerator::generate`] makes exactly one outbound call per
//! invocation and never retries. The call is bounded by
//! `QuizConfig::api_timeout_secs`; expiry is reported as
//! [`QuizError::ProviderError`].

use crate::config::QuizConfig;
use crate::error::QuizError;
use crate::model::{GenerationRequest, QuestionSet};
use crate::pipeline::llm::{self, CompletionBackend, UnconfiguredBackend};
use crate::pipeline::normalize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{info, warn};

/// Turns source text into a [`QuestionSet`] through a [`CompletionBackend`].
#[derive(Clone)]
pub struct QuestionGenerator {
    backend: Arc<dyn CompletionBackend>,
    config: QuizConfig,
}

impl QuestionGenerator {
    pub fn new(backend: Arc<dyn CompletionBackend>, config: QuizConfig) -> Self {
        Self { backend, config }
    }

    /// Resolve the provider from `config` and the environment.
    ///
    /// Fails with [`QuizError::ProviderUnavailable`] when nothing can be
    /// initialised.
    pub fn from_config(config: QuizConfig) -> Result<Self, QuizError> {
        let backend = llm::resolve_backend(&config)?;
        Ok(Self::new(Arc::new(backend), config))
    }

    /// Like [`from_config`](Self::from_config), but an unresolvable provider
    /// is deferred: every later `generate` call fails with
    /// [`QuizError::ProviderUnavailable`] instead.
    pub fn from_config_lenient(config: QuizConfig) -> Self {
        match llm::resolve_backend(&config) {
            Ok(backend) => Self::new(Arc::new(backend), config),
            Err(e) => {
                warn!("LLM provider unavailable: {e}");
                Self::new(Arc::new(UnconfiguredBackend::from_error(&e)), config)
            }
        }
    }

    pub fn config(&self) -> &QuizConfig {
        &self.config
    }

    pub fn backend_name(&self) -> &str {
        self.backend.name()
    }

    /// Generate with the configured default counts and no topic override.
    pub async fn generate_default(&self, source_text: &str) -> Result<QuestionSet, QuizError> {
        self.generate(
            source_text,
            self.config.mcq_count,
            self.config.short_count,
            None,
        )
        .await
    }

    /// Build the prompt, call the provider once, and normalize the reply.
    pub async fn generate(
        &self,
        source_text: &str,
        desired_mcq_count: usize,
        desired_short_count: usize,
        topic_override: Option<&str>,
    ) -> Result<QuestionSet, QuizError> {
        let request = GenerationRequest::new(
            source_text,
            desired_mcq_count,
            desired_short_count,
            topic_override.map(str::to_string),
            self.config.max_source_chars,
        );
        if request.truncated {
            info!(
                "Source text truncated to {} characters",
                self.config.max_source_chars
            );
        }
        self.generate_request(&request).await
    }

    /// Run one prepared [`GenerationRequest`].
    pub async fn generate_request(
        &self,
        request: &GenerationRequest,
    ) -> Result<QuestionSet, QuizError> {
        let prompt = request.prompt();
        let start = Instant::now();
        let timeout = Duration::from_secs(self.config.api_timeout_secs);

        info!(
            "Requesting {} MCQs and {} short questions from {}",
            request.desired_mcq_count,
            request.desired_short_count,
            self.backend.name()
        );

        let completion = tokio::time::timeout(timeout, self.backend.complete(&prompt))
            .await
            .map_err(|_| QuizError::ProviderError {
                message: format!(
                    "no response within {}s",
                    self.config.api_timeout_secs
                ),
            })??;

        info!(
            "Provider replied in {:?} ({} input tokens, {} output tokens)",
            start.elapsed(),
            completion.input_tokens,
            completion.output_tokens
        );

        normalize::normalize(&completion.content, request.topic_override.as_deref())
    }
}
