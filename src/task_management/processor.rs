//! Runs one validation task from an uploaded file to a [`TaskResult`].

use std::fs;
use std::path::Path;
use std::time::Instant;

use log::{error, info, warn};
use uuid::Uuid;

use crate::error_handling::types::TaskError;
use crate::storage::storage_trait::Storage;
use crate::validation::{load_sheet, validate, ValidationOutcome};

use super::task::TaskResult;

/// Validates the upload at `path` and always deletes it afterwards.
///
/// A file with errors produces [`TaskResult::Error`]; a clean file has its export written
/// through `storage` and produces [`TaskResult::Success`]. Every finished task logs one
/// summary line; unexpected failures are logged and returned.
pub fn process_upload(
    storage: &dyn Storage,
    task_id: Uuid,
    path: &Path,
) -> Result<TaskResult, TaskError> {
    let result = run(storage, task_id, path);

    if let Err(e) = &result {
        error!("[{}] Error inesperado: {}", task_id, e);
    }
    if let Err(e) = storage.remove_upload(path) {
        warn!("[{}] Upload {} not removed: {}", task_id, path.display(), e);
    }
    result
}

fn run(storage: &dyn Storage, task_id: Uuid, path: &Path) -> Result<TaskResult, TaskError> {
    let started = Instant::now();
    let size_mb = fs::metadata(path)
        .map(|m| m.len() as f64 / (1024.0 * 1024.0))
        .unwrap_or(0.0);
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    let sheet = load_sheet(path)?;
    let outcome = validate(&sheet);
    let error_count = outcome.error_count();

    let result = match outcome {
        ValidationOutcome::Invalid {
            errors,
            nombre_corto,
        } => TaskResult::Error {
            errors,
            nombre_corto,
        },
        ValidationOutcome::Valid {
            export,
            nombre_corto,
        } => {
            let download_file = storage.save_export(task_id, &export)?;
            TaskResult::Success {
                download_file,
                nombre_corto,
            }
        }
    };

    let (nombre_corto, estado) = match &result {
        TaskResult::Error { nombre_corto, .. } => (nombre_corto, "ERROR"),
        TaskResult::Success { nombre_corto, .. } => (nombre_corto, "OK"),
    };
    info!(
        "[{}] Archivo: {} | Nombre Corto: {} | Tamaño: {:.2} MB | Errores: {} | Tiempo: {:.1}s | Estado: {}",
        task_id,
        file_name,
        nombre_corto,
        size_mb,
        error_count,
        started.elapsed().as_secs_f64(),
        estado
    );

    Ok(result)
}
