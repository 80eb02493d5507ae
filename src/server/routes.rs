//! HTTP handlers.

use super::error::ApiError;
use super::AppState;
use crate::model::{file_extension, Document, DocumentFormat};
use crate::objects::upload_key;
use crate::store::{QuestionKind, StoredQuestion, Upload, UploadStatus, DEFAULT_LIST_LIMIT};
use axum::extract::{Multipart, Path, Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

/// `GET /health`
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "healthy" })
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UploadResponse {
    pub success: bool,
    pub upload_id: String,
    pub topic: String,
    pub questions_count: usize,
    pub message: String,
}

/// `POST /upload` with multipart field `file`.
///
/// Stores the raw bytes, records the upload and runs the pipeline inline.
/// A pipeline failure marks the upload failed and is returned as an error.
pub async fn upload(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, ApiError> {
    let mut file: Option<(String, Vec<u8>)> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(format!("Malformed multipart body: {e}")))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let filename = field.file_name().unwrap_or_default().to_string();
        let bytes = field
            .bytes()
            .await
            .map_err(|e| ApiError::BadRequest(format!("Failed to read file data: {e}")))?;
        file = Some((filename, bytes.to_vec()));
    }

    let (raw_name, bytes) = file.ok_or_else(|| ApiError::BadRequest("No file provided".into()))?;
    if raw_name.is_empty() {
        return Err(ApiError::BadRequest("No file selected".into()));
    }
    let filename = sanitize_filename(&raw_name)
        .ok_or_else(|| ApiError::BadRequest(format!("Invalid filename '{raw_name}'")))?;
    if DocumentFormat::from_filename(&filename).is_err() {
        return Err(ApiError::BadRequest(format!(
            "Invalid file type '{}'. Allowed: {}",
            file_extension(&filename),
            DocumentFormat::EXTENSIONS.join(", ")
        )));
    }

    let upload_id = Uuid::new_v4().to_string();
    let key = upload_key(&upload_id, &filename);
    state.objects.put_object(&state.bucket, &key, &bytes)?;

    let store = state.pipeline.store();
    store.save_upload(&upload_id, &filename, Some(&key))?;
    info!("Upload {upload_id}: {filename} ({} bytes)", bytes.len());

    let document = Document::from_filename(bytes, filename)?;
    let output = state.pipeline.process_upload(&upload_id, &document).await?;

    Ok(Json(UploadResponse {
        success: true,
        upload_id,
        topic: output.questions.topic,
        questions_count: output.saved_count,
        message: "Questions generated successfully".into(),
    }))
}

#[derive(Debug, Serialize, Deserialize)]
pub struct QuestionsResponse {
    pub upload_id: String,
    pub status: UploadStatus,
    pub filename: String,
    pub topic: Option<String>,
    pub error: Option<String>,
    pub mcqs: Vec<StoredQuestion>,
    pub short_questions: Vec<StoredQuestion>,
    pub total_questions: usize,
}

/// `GET /questions/:upload_id`
pub async fn questions(
    State(state): State<AppState>,
    Path(upload_id): Path<String>,
) -> Result<Json<QuestionsResponse>, ApiError> {
    let store = state.pipeline.store();
    let upload = store
        .get_upload(&upload_id)?
        .ok_or_else(|| ApiError::NotFound("Upload not found".into()))?;

    let (mcqs, short_questions): (Vec<_>, Vec<_>) = store
        .get_questions_by_upload(&upload_id)?
        .into_iter()
        .partition(|q| q.kind == QuestionKind::Mcq);
    let total_questions = mcqs.len() + short_questions.len();

    Ok(Json(QuestionsResponse {
        upload_id,
        status: upload.status,
        filename: upload.filename,
        topic: upload.topic,
        error: upload.error_message,
        mcqs,
        short_questions,
        total_questions,
    }))
}

#[derive(Debug, Deserialize)]
pub struct ListParams {
    pub limit: Option<usize>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UploadsResponse {
    pub uploads: Vec<Upload>,
    pub count: usize,
}

/// `GET /uploads?limit=N`
pub async fn uploads(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> Result<Json<UploadsResponse>, ApiError> {
    let limit = params.limit.unwrap_or(DEFAULT_LIST_LIMIT);
    let uploads = state.pipeline.store().list_uploads(limit)?;
    Ok(Json(UploadsResponse {
        count: uploads.len(),
        uploads,
    }))
}

/// Reduce a client-supplied filename to a safe basename.
///
/// Directory parts are dropped, whitespace becomes `_`, and anything other
/// than ASCII letters, digits, `.`, `-` and `_` is removed. Leading dots and
/// underscores are stripped so the result is never hidden or relative.
pub fn sanitize_filename(raw: &str) -> Option<String> {
    let base = raw.rsplit(['/', '\\']).next().unwrap_or(raw);
    let cleaned: String = base
        .chars()
        .filter_map(|c| match c {
            c if c.is_whitespace() => Some('_'),
            c if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') => Some(c),
            _ => None,
        })
        .collect();
    let trimmed = cleaned.trim_start_matches(['.', '_']);
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}
