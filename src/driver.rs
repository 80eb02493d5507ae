//! Pipeline driver: extraction → generation → persistence for one upload.
//!
//! The driver only sequences stages. It never retries; on failure it marks
//! the upload as failed with the error's user message and hands the error
//! back so the caller can map it to a transport status.

use crate::error::QuizError;
use crate::generate::QuestionGenerator;
use crate::model::{Document, ExtractedText, QuestionSet};
use crate::pipeline::extract;
use crate::store::{QuestionStore, UploadStatus};
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info, warn};

/// Result of a successful [`Pipeline::run`].
#[derive(Debug, Clone)]
pub struct PipelineOutput {
    pub upload_id: String,
    pub questions: QuestionSet,
    /// Rows written to the store.
    pub saved_count: usize,
    /// Characters of cleaned text the questions were generated from.
    pub extracted_chars: usize,
    pub duration_ms: u64,
}

/// Reject text shorter than `min_chars` before any provider call.
pub fn check_content_length(text: &ExtractedText, min_chars: usize) -> Result<(), QuizError> {
    let chars = text.char_count();
    if chars < min_chars {
        return Err(QuizError::InsufficientContent {
            chars,
            min: min_chars,
        });
    }
    Ok(())
}

/// Extract, check the length threshold, and generate with default counts.
///
/// Nothing is persisted. Shared by [`Pipeline::run`] and the CLI's one-shot
/// mode.
pub async fn generate_for_document(
    generator: &QuestionGenerator,
    document: &Document,
) -> Result<(ExtractedText, QuestionSet), QuizError> {
    let config = generator.config();

    let text = extract::extract(document, config).await?;
    info!(
        "Extracted {} characters from {} ({})",
        text.char_count(),
        document.filename,
        document.format
    );
    check_content_length(&text, config.min_text_chars)?;

    let set = generator.generate_default(&text.content).await?;
    info!(
        "Generated {} MCQs and {} short questions on '{}'",
        set.mcqs.len(),
        set.short_questions.len(),
        set.topic
    );
    Ok((text, set))
}

/// Sequences the stages for uploads already recorded in the store.
#[derive(Clone)]
pub struct Pipeline {
    generator: QuestionGenerator,
    store: Arc<dyn QuestionStore>,
}

impl Pipeline {
    pub fn new(generator: QuestionGenerator, store: Arc<dyn QuestionStore>) -> Self {
        Self { generator, store }
    }

    pub fn store(&self) -> &Arc<dyn QuestionStore> {
        &self.store
    }

    pub fn generator(&self) -> &QuestionGenerator {
        &self.generator
    }

    /// Run every stage for `upload_id`. The upload must already exist.
    ///
    /// Leaves the upload status untouched on failure; see
    /// [`process_upload`](Self::process_upload).
    pub async fn run(&self, upload_id: &str, document: &Document) -> Result<PipelineOutput, QuizError> {
        let start = Instant::now();
        let (text, questions) = generate_for_document(&self.generator, document).await?;

        let saved = self
            .store
            .complete_upload(upload_id, &document.filename, &questions)?;

        let duration_ms = start.elapsed().as_millis() as u64;
        info!(
            "Upload {upload_id} completed: {} questions saved in {duration_ms}ms",
            saved.len()
        );

        Ok(PipelineOutput {
            upload_id: upload_id.to_string(),
            questions,
            saved_count: saved.len(),
            extracted_chars: text.char_count(),
            duration_ms,
        })
    }

    /// [`run`](Self::run), marking the upload failed on any error.
    pub async fn process_upload(
        &self,
        upload_id: &str,
        document: &Document,
    ) -> Result<PipelineOutput, QuizError> {
        match self.run(upload_id, document).await {
            Ok(output) => Ok(output),
            Err(e) => {
                error!("Upload {upload_id} failed ({}): {e}", e.kind().as_str());
                if let Err(store_err) = self.store.update_upload_status(
                    upload_id,
                    UploadStatus::Failed,
                    None,
                    Some(&e.user_message()),
                ) {
                    warn!("Could not mark upload {upload_id} as failed: {store_err}");
                }
                Err(e)
            }
        }
    }
}
