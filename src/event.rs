//! Object-storage notification handling (the serverless deployment shape).
//!
//! A notification names one stored object. Keys shaped
//! `uploads/{upload_id}/{filename}` are recorded as uploads and run through
//! the [`Pipeline`]; anything else is skipped.

use crate::driver::Pipeline;
use crate::error::QuizError;
use crate::model::Document;
use crate::objects::{parse_upload_key, ObjectStore};
use crate::store::UploadStatus;
use percent_encoding::percent_decode_str;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// Event source value of object-storage notifications.
pub const S3_EVENT_SOURCE: &str = "aws:s3";

#[derive(Debug, Clone, Deserialize)]
pub struct StorageEvent {
    #[serde(rename = "Records", default)]
    pub records: Vec<EventRecord>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EventRecord {
    #[serde(rename = "eventSource", default)]
    pub event_source: String,
    pub s3: Option<S3Entity>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct S3Entity {
    pub bucket: BucketEntity,
    pub object: ObjectEntity,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BucketEntity {
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ObjectEntity {
    /// URL-encoded with `+` for spaces, as delivered by the notification.
    pub key: String,
}

/// What happened to the notified object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum EventOutcome {
    Processed {
        upload_id: String,
        questions_count: usize,
    },
    Skipped {
        key: String,
    },
}

/// Decode a form-encoded key: `+` becomes a space, then `%XX` escapes are
/// decoded. Malformed escapes are kept literally.
pub fn unquote_plus(s: &str) -> String {
    percent_decode_str(&s.replace('+', " "))
        .decode_utf8_lossy()
        .into_owned()
}

/// Process the first record of a storage notification.
pub async fn handle_storage_event(
    event: &StorageEvent,
    objects: &dyn ObjectStore,
    pipeline: &Pipeline,
) -> Result<EventOutcome, QuizError> {
    let record = event
        .records
        .first()
        .filter(|r| r.event_source == S3_EVENT_SOURCE)
        .ok_or_else(|| QuizError::InvalidInput {
            input: "event".into(),
            reason: format!("expected a '{S3_EVENT_SOURCE}' record"),
        })?;
    let s3 = record.s3.as_ref().ok_or_else(|| QuizError::InvalidInput {
        input: "event".into(),
        reason: "record has no 's3' entity".into(),
    })?;

    let bucket = &s3.bucket.name;
    let key = unquote_plus(&s3.object.key);
    info!("Processing object {bucket}/{key}");

    let Some((upload_id, filename)) = parse_upload_key(&key) else {
        info!("Skipping non-upload object: {key}");
        return Ok(EventOutcome::Skipped { key: key.clone() });
    };

    let store = pipeline.store();
    store.save_upload(upload_id, filename, Some(&key))?;

    let document = match load_document(objects, bucket, &key, filename) {
        Ok(doc) => doc,
        Err(e) => {
            if let Err(store_err) =
                store.update_upload_status(upload_id, UploadStatus::Failed, None, Some(&e.user_message()))
            {
                warn!("Could not mark upload {upload_id} as failed: {store_err}");
            }
            return Err(e);
        }
    };

    let output = pipeline.process_upload(upload_id, &document).await?;
    Ok(EventOutcome::Processed {
        upload_id: output.upload_id,
        questions_count: output.saved_count,
    })
}

fn load_document(
    objects: &dyn ObjectStore,
    bucket: &str,
    key: &str,
    filename: &str,
) -> Result<Document, QuizError> {
    let bytes = objects.get_object(bucket, key)?;
    Document::from_filename(bytes, filename)
}
