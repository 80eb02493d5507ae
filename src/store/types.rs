//! Persisted entities: uploads and the questions generated for them.

use crate::model::{Difficulty, QuestionSet};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Processing state of an upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UploadStatus {
    Processing,
    Completed,
    Failed,
}

impl UploadStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            UploadStatus::Processing => "processing",
            UploadStatus::Completed => "completed",
            UploadStatus::Failed => "failed",
        }
    }
}

impl FromStr for UploadStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "processing" => Ok(UploadStatus::Processing),
            "completed" => Ok(UploadStatus::Completed),
            "failed" => Ok(UploadStatus::Failed),
            other => Err(format!("unknown upload status '{other}'")),
        }
    }
}

impl fmt::Display for UploadStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One user-submitted document and its processing state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Upload {
    pub upload_id: String,
    pub filename: String,
    /// Object-storage key of the raw bytes, when they were stored.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_key: Option<String>,
    pub status: UploadStatus,
    pub topic: Option<String>,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Upload {
    /// A fresh upload in the `processing` state.
    pub fn new(upload_id: impl Into<String>, filename: impl Into<String>, source_key: Option<String>) -> Self {
        let now = Utc::now();
        Self {
            upload_id: upload_id.into(),
            filename: filename.into(),
            source_key,
            status: UploadStatus::Processing,
            topic: None,
            error_message: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Apply a status transition; `topic` and `error` only overwrite when given.
    pub fn apply_status(&mut self, status: UploadStatus, topic: Option<&str>, error: Option<&str>) {
        self.status = status;
        if let Some(t) = topic {
            self.topic = Some(t.to_string());
        }
        if let Some(e) = error {
            self.error_message = Some(e.to_string());
        }
        self.updated_at = Utc::now();
    }
}

/// Discriminates the two stored question shapes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum QuestionKind {
    #[serde(rename = "MCQ")]
    Mcq,
    #[serde(rename = "SHORT")]
    Short,
}

impl QuestionKind {
    pub fn as_str(self) -> &'static str {
        match self {
            QuestionKind::Mcq => "MCQ",
            QuestionKind::Short => "SHORT",
        }
    }
}

impl FromStr for QuestionKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "MCQ" => Ok(QuestionKind::Mcq),
            "SHORT" => Ok(QuestionKind::Short),
            other => Err(format!("unknown question type '{other}'")),
        }
    }
}

/// A single persisted question, flattened from a [`QuestionSet`].
///
/// MCQ-only fields are `None`/empty on short questions and vice versa.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredQuestion {
    pub question_id: String,
    pub upload_id: String,
    #[serde(rename = "type")]
    pub kind: QuestionKind,
    pub topic: String,
    pub question: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub correct_answer: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub expected_points: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub difficulty: Option<Difficulty>,
    pub filename: String,
    pub created_at: DateTime<Utc>,
}

/// Flatten a question set into rows, MCQs first, each with a fresh id.
pub fn flatten_question_set(upload_id: &str, filename: &str, set: &QuestionSet) -> Vec<StoredQuestion> {
    let now = Utc::now();
    let mcqs = set.mcqs.iter().map(|mcq| StoredQuestion {
        question_id: Uuid::new_v4().to_string(),
        upload_id: upload_id.to_string(),
        kind: QuestionKind::Mcq,
        topic: set.topic.clone(),
        question: mcq.question.clone(),
        options: mcq.options.clone(),
        correct_answer: Some(mcq.correct_answer.clone()),
        explanation: Some(mcq.explanation.clone()),
        expected_points: Vec::new(),
        difficulty: None,
        filename: filename.to_string(),
        created_at: now,
    });
    let shorts = set.short_questions.iter().map(|sq| StoredQuestion {
        question_id: Uuid::new_v4().to_string(),
        upload_id: upload_id.to_string(),
        kind: QuestionKind::Short,
        topic: set.topic.clone(),
        question: sq.question.clone(),
        options: Vec::new(),
        correct_answer: None,
        explanation: None,
        expected_points: sq.expected_points.clone(),
        difficulty: Some(sq.difficulty),
        filename: filename.to_string(),
        created_at: now,
    });
    mcqs.chain(shorts).collect()
}
