use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, PoisonError, RwLock};

use chrono::{DateTime, Duration, Utc};
use log::{debug, info, warn};
use uuid::Uuid;

use crate::error_handling::types::TaskError;
use crate::storage::storage_trait::Storage;

use super::processor::process_upload;
use super::task::{Task, TaskResult, TaskState};

/// Registry of validation tasks.
///
/// Uploads are validated on the blocking pool while the registry keeps the state clients
/// poll through `/status`. Finished tasks stay queryable until the retention sweep drops
/// them, together with their export.
///
/// # Fields Overview
///
/// - `tasks`: every known task by id
/// - `storage`: where uploads are read from and exports are written to
/// - `task_ttl`: how long a finished task is kept, `None` keeps them forever
pub struct TaskManager {
    tasks: RwLock<HashMap<Uuid, Task>>,
    storage: Arc<dyn Storage>,
    task_ttl: Option<Duration>,
}

impl TaskManager {
    pub fn new(storage: Arc<dyn Storage>, task_ttl_secs: u64) -> Self {
        let task_ttl = match task_ttl_secs {
            0 => None,
            secs => i64::try_from(secs).ok().and_then(Duration::try_seconds),
        };
        Self {
            tasks: RwLock::new(HashMap::new()),
            storage,
            task_ttl,
        }
    }

    pub fn storage(&self) -> &Arc<dyn Storage> {
        &self.storage
    }

    /// Registers a new task for the upload at `upload` and starts validating it in the
    /// background. Returns immediately with the task id.
    ///
    /// Must be called from within a tokio runtime.
    pub fn submit(self: &Arc<Self>, upload: PathBuf) -> Uuid {
        let task_id = self.register();
        let manager = Arc::clone(self);

        tokio::spawn(async move {
            let storage = Arc::clone(&manager.storage);
            let outcome = tokio::task::spawn_blocking(move || {
                process_upload(&*storage, task_id, &upload)
            })
            .await
            .unwrap_or_else(|e| Err(TaskError::Join(e.to_string())));
            manager.finish(task_id, outcome);
        });

        task_id
    }

    /// Adds a task in the `processing` state.
    pub fn register(&self) -> Uuid {
        let task_id = Uuid::new_v4();
        self.tasks
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(task_id, Task::new(task_id));
        debug!("[{}] Task registered", task_id);
        task_id
    }

    /// Records the outcome of a task.
    pub fn finish(&self, task_id: Uuid, outcome: Result<TaskResult, TaskError>) {
        self.finish_at(task_id, outcome, Utc::now());
    }

    fn finish_at(
        &self,
        task_id: Uuid,
        outcome: Result<TaskResult, TaskError>,
        at: DateTime<Utc>,
    ) {
        let state = match outcome {
            Ok(result) => TaskState::Complete { result },
            Err(e) => TaskState::Failed {
                error: e.to_string(),
            },
        };

        let mut tasks = self.tasks.write().unwrap_or_else(PoisonError::into_inner);
        match tasks.get_mut(&task_id) {
            Some(task) => {
                task.state = state;
                task.finished_at = Some(at);
            }
            None => warn!("[{}] Finished task was not registered", task_id),
        }
    }

    /// Current state of `task_id`. Unknown or malformed ids are `not_found`.
    pub fn status(&self, task_id: &str) -> TaskState {
        let Ok(id) = Uuid::parse_str(task_id) else {
            return TaskState::NotFound;
        };
        self.tasks
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&id)
            .map_or(TaskState::NotFound, |task| task.state.clone())
    }

    /// Grouped errors and short name of a task that completed with validation errors.
    pub fn errors(&self, task_id: &str) -> Option<(Vec<String>, String)> {
        let id = Uuid::parse_str(task_id).ok()?;
        let tasks = self.tasks.read().unwrap_or_else(PoisonError::into_inner);
        tasks
            .get(&id)?
            .errors()
            .map(|(errors, nombre_corto)| (errors.to_vec(), nombre_corto.to_string()))
    }

    pub fn task_count(&self) -> usize {
        self.tasks
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Drops tasks finished longer than the retention period ago, deletes their exports and
    /// any export file older than that period. Returns the number of tasks dropped.
    pub fn cleanup_expired(&self, now: DateTime<Utc>) -> usize {
        let Some(ttl) = self.task_ttl else {
            return 0;
        };
        let Some(cutoff) = now.checked_sub_signed(ttl) else {
            debug!("Retention period reaches before the earliest date, nothing to drop");
            return 0;
        };

        let expired: Vec<Task> = {
            let mut tasks = self.tasks.write().unwrap_or_else(PoisonError::into_inner);
            let ids: Vec<Uuid> = tasks
                .values()
                .filter(|task| task.finished_at.is_some_and(|at| at < cutoff))
                .map(|task| task.id)
                .collect();
            ids.iter().filter_map(|id| tasks.remove(id)).collect()
        };

        for task in &expired {
            if let Some(file_name) = task.download_file() {
                if let Err(e) = self.storage.remove_download(file_name) {
                    warn!("[{}] Export {} not removed: {}", task.id, file_name, e);
                }
            }
        }
        if let Err(e) = self.storage.cleanup_downloads(cutoff) {
            warn!("Download sweep failed: {}", e);
        }

        if !expired.is_empty() {
            info!("Dropped {} expired task(s)", expired.len());
        }
        expired.len()
    }
}
