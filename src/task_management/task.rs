use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

/// Public state of a validation task, as returned by `GET /status/<task_id>`.
///
/// Serialized with a `status` tag:
/// - `{"status": "processing"}`
/// - `{"status": "complete", "result": {...}}`
/// - `{"status": "failed", "error": "..."}`
/// - `{"status": "not_found"}` for ids the server does not know
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum TaskState {
    Processing,
    Complete { result: TaskResult },
    Failed { error: String },
    NotFound,
}

/// Result of a completed validation.
///
/// `error` carries the grouped error list, `success` the name of the JSON export under
/// `/download/`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum TaskResult {
    Error {
        errors: Vec<String>,
        nombre_corto: String,
    },
    Success {
        download_file: String,
        nombre_corto: String,
    },
}

/// Bookkeeping entry of the task registry.
#[derive(Debug, Clone)]
pub struct Task {
    pub id: Uuid,
    pub state: TaskState,
    pub created_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl Task {
    pub fn new(id: Uuid) -> Self {
        Self {
            id,
            state: TaskState::Processing,
            created_at: Utc::now(),
            finished_at: None,
        }
    }

    pub fn is_finished(&self) -> bool {
        self.finished_at.is_some()
    }

    /// Error list and short name when the task completed with validation errors.
    pub fn errors(&self) -> Option<(&[String], &str)> {
        match &self.state {
            TaskState::Complete {
                result:
                    TaskResult::Error {
                        errors,
                        nombre_corto,
                    },
            } => Some((errors.as_slice(), nombre_corto.as_str())),
            _ => None,
        }
    }

    pub fn download_file(&self) -> Option<&str> {
        match &self.state {
            TaskState::Complete {
                result: TaskResult::Success { download_file, .. },
            } => Some(download_file.as_str()),
            _ => None,
        }
    }
}
