//! In-memory [`QuestionStore`] keyed by upload id.

use super::types::{flatten_question_set, StoredQuestion, Upload, UploadStatus};
use super::QuestionStore;
use crate::error::StoreError;
use crate::model::QuestionSet;
use std::collections::HashMap;
use std::sync::RwLock;

#[derive(Default)]
struct Tables {
    uploads: HashMap<String, Upload>,
    /// Upload ids in insertion order; breaks `created_at` ties when listing.
    upload_order: Vec<String>,
    questions: HashMap<String, Vec<StoredQuestion>>,
}

/// Process-local store. Contents are lost when it is dropped.
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl QuestionStore for MemoryStore {
    fn save_upload(
        &self,
        upload_id: &str,
        filename: &str,
        source_key: Option<&str>,
    ) -> Result<Upload, StoreError> {
        let upload = Upload::new(upload_id, filename, source_key.map(str::to_string));
        let mut tables = self.tables.write().map_err(|_| StoreError::LockPoisoned)?;
        if tables.uploads.contains_key(upload_id) {
            return Err(StoreError::UploadExists {
                upload_id: upload_id.to_string(),
            });
        }
        tables.uploads.insert(upload_id.to_string(), upload.clone());
        tables.upload_order.push(upload_id.to_string());
        Ok(upload)
    }

    fn update_upload_status(
        &self,
        upload_id: &str,
        status: UploadStatus,
        topic: Option<&str>,
        error: Option<&str>,
    ) -> Result<(), StoreError> {
        let mut tables = self.tables.write().map_err(|_| StoreError::LockPoisoned)?;
        let upload = tables
            .uploads
            .get_mut(upload_id)
            .ok_or_else(|| StoreError::UploadNotFound {
                upload_id: upload_id.to_string(),
            })?;
        upload.apply_status(status, topic, error);
        Ok(())
    }

    fn save_questions(
        &self,
        upload_id: &str,
        filename: &str,
        set: &QuestionSet,
    ) -> Result<Vec<StoredQuestion>, StoreError> {
        let rows = flatten_question_set(upload_id, filename, set);
        let mut tables = self.tables.write().map_err(|_| StoreError::LockPoisoned)?;
        tables
            .questions
            .entry(upload_id.to_string())
            .or_default()
            .extend(rows.iter().cloned());
        Ok(rows)
    }

    fn complete_upload(
        &self,
        upload_id: &str,
        filename: &str,
        set: &QuestionSet,
    ) -> Result<Vec<StoredQuestion>, StoreError> {
        let rows = flatten_question_set(upload_id, filename, set);
        let mut tables = self.tables.write().map_err(|_| StoreError::LockPoisoned)?;
        let upload = tables
            .uploads
            .get_mut(upload_id)
            .ok_or_else(|| StoreError::UploadNotFound {
                upload_id: upload_id.to_string(),
            })?;
        upload.apply_status(UploadStatus::Completed, Some(&set.topic), None);
        tables
            .questions
            .entry(upload_id.to_string())
            .or_default()
            .extend(rows.iter().cloned());
        Ok(rows)
    }

    fn get_questions_by_upload(&self, upload_id: &str) -> Result<Vec<StoredQuestion>, StoreError> {
        let tables = self.tables.read().map_err(|_| StoreError::LockPoisoned)?;
        Ok(tables.questions.get(upload_id).cloned().unwrap_or_default())
    }

    fn get_upload(&self, upload_id: &str) -> Result<Option<Upload>, StoreError> {
        let tables = self.tables.read().map_err(|_| StoreError::LockPoisoned)?;
        Ok(tables.uploads.get(upload_id).cloned())
    }

    fn list_uploads(&self, limit: usize) -> Result<Vec<Upload>, StoreError> {
        let tables = self.tables.read().map_err(|_| StoreError::LockPoisoned)?;
        let mut uploads: Vec<(usize, &Upload)> = tables
            .upload_order
            .iter()
            .enumerate()
            .filter_map(|(seq, id)| tables.uploads.get(id).map(|u| (seq, u)))
            .collect();
        uploads.sort_by(|(sa, a), (sb, b)| b.created_at.cmp(&a.created_at).then(sb.cmp(sa)));
        Ok(uploads
            .into_iter()
            .take(limit)
            .map(|(_, u)| u.clone())
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::conformance;

    #[test]
    fn conformance_round_trip() {
        conformance::round_trip(&MemoryStore::new());
    }

    #[test]
    fn conformance_status_updates() {
        conformance::status_updates(&MemoryStore::new());
    }

    #[test]
    fn conformance_completion() {
        conformance::completion(&MemoryStore::new());
    }

    #[test]
    fn conformance_listing() {
        conformance::listing(&MemoryStore::new());
    }

    #[test]
    fn duplicate_upload_id_is_rejected() {
        let store = MemoryStore::new();
        store.save_upload("dup", "a.txt", None).unwrap();
        assert!(matches!(
            store.save_upload("dup", "b.txt", None),
            Err(StoreError::UploadExists { .. })
        ));
        assert_eq!(store.get_upload("dup").unwrap().unwrap().filename, "a.txt");
    }
}
