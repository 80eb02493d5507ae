//! Persistence of uploads and generated questions.
//!
//! [`QuestionStore`] is the capability the driver, the event handler and the
//! server depend on. Two implementations exist and are chosen once at
//! startup through [`StoreBackend`]:
//!
//! * [`SqliteStore`]: embedded relational database, durable across restarts
//! * [`MemoryStore`]: process-local key-value tables, used by tests and
//!   throwaway runs
//!
//! Calls are synchronous. They are short and local; async callers invoke them
//! directly, the same way the server's handlers use the connection.

mod memory;
mod sqlite;
mod types;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;
pub use types::{flatten_question_set, QuestionKind, StoredQuestion, Upload, UploadStatus};

use crate::config::StoreBackend;
use crate::error::StoreError;
use crate::model::QuestionSet;
use std::sync::Arc;
use tracing::info;

/// Default page size for [`QuestionStore::list_uploads`].
pub const DEFAULT_LIST_LIMIT: usize = 50;

/// Save, update and query uploads and their questions.
pub trait QuestionStore: Send + Sync {
    /// Record a new upload in the `processing` state.
    fn save_upload(
        &self,
        upload_id: &str,
        filename: &str,
        source_key: Option<&str>,
    ) -> Result<Upload, StoreError>;

    /// Move an upload to `status`. `topic` and `error` only overwrite the
    /// stored values when supplied.
    ///
    /// Fails with [`StoreError::UploadNotFound`] for an unknown id.
    fn update_upload_status(
        &self,
        upload_id: &str,
        status: UploadStatus,
        topic: Option<&str>,
        error: Option<&str>,
    ) -> Result<(), StoreError>;

    /// Persist every question of `set`, MCQs first, and return the rows.
    fn save_questions(
        &self,
        upload_id: &str,
        filename: &str,
        set: &QuestionSet,
    ) -> Result<Vec<StoredQuestion>, StoreError>;

    /// Persist the questions of `set` and mark the upload `completed` with
    /// the set's topic, as one unit.
    ///
    /// Fails with [`StoreError::UploadNotFound`] for an unknown id, in which
    /// case nothing is written.
    fn complete_upload(
        &self,
        upload_id: &str,
        filename: &str,
        set: &QuestionSet,
    ) -> Result<Vec<StoredQuestion>, StoreError>;

    /// Questions of one upload in insertion order.
    fn get_questions_by_upload(&self, upload_id: &str) -> Result<Vec<StoredQuestion>, StoreError>;

    fn get_upload(&self, upload_id: &str) -> Result<Option<Upload>, StoreError>;

    /// Up to `limit` uploads, newest first.
    fn list_uploads(&self, limit: usize) -> Result<Vec<Upload>, StoreError>;
}

/// Open the configured backend.
pub fn open_store(backend: &StoreBackend) -> Result<Arc<dyn QuestionStore>, StoreError> {
    match backend {
        StoreBackend::Sqlite(path) => {
            info!("Opening SQLite store at {}", path.display());
            Ok(Arc::new(SqliteStore::open(path)?))
        }
        StoreBackend::Memory => {
            info!("Using in-memory store");
            Ok(Arc::new(MemoryStore::new()))
        }
    }
}
