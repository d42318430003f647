use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use log::{debug, error, info};
use uuid::Uuid;

use crate::configuration::config::Config;
use crate::error_handling::types::StorageError;
use crate::storage::storage_trait::Storage;
use crate::validation::types::FormatExport;

const FALLBACK_FILE_NAME: &str = "archivo";

/// Filesystem-backed [`Storage`] over the upload, download and static directories.
pub struct FileStorage {
    upload_dir: PathBuf,
    download_dir: PathBuf,
    static_dir: PathBuf,
}

impl FileStorage {
    pub fn new<P: AsRef<Path>>(
        upload_dir: P,
        download_dir: P,
        static_dir: P,
    ) -> Result<Self, StorageError> {
        let upload_dir = upload_dir.as_ref().to_path_buf();
        let download_dir = download_dir.as_ref().to_path_buf();
        let static_dir = static_dir.as_ref().to_path_buf();

        for dir in [&upload_dir, &download_dir, &static_dir] {
            fs::create_dir_all(dir).map_err(|e| {
                error!("Failed to create directory {}: {}", dir.display(), e);
                StorageError::WriteFailed(dir.display().to_string())
            })?;
        }
        info!(
            "FileStorage initialized (uploads: {}, downloads: {}, static: {})",
            upload_dir.display(),
            download_dir.display(),
            static_dir.display()
        );

        Ok(Self {
            upload_dir,
            download_dir,
            static_dir,
        })
    }

    pub fn from_config(config: &Config) -> Result<Self, StorageError> {
        Self::new(&config.upload_dir, &config.download_dir, &config.static_dir)
    }

    pub fn upload_dir(&self) -> &Path {
        &self.upload_dir
    }

    pub fn download_dir(&self) -> &Path {
        &self.download_dir
    }

    pub fn export_file_name(task_id: Uuid) -> String {
        format!("{}.json", task_id)
    }

    fn read_named(dir: &Path, file_name: &str) -> Result<Vec<u8>, StorageError> {
        check_plain_name(file_name)?;
        let path = dir.join(file_name);
        if !path.is_file() {
            debug!("Requested file {} does not exist", path.display());
            return Err(StorageError::NotFound(file_name.to_string()));
        }
        fs::read(&path).map_err(|e| {
            error!("Read failed {}: {}", path.display(), e);
            StorageError::ReadFailed(file_name.to_string())
        })
    }
}

impl Storage for FileStorage {
    fn save_upload(&self, original_name: &str, data: &[u8]) -> Result<PathBuf, StorageError> {
        let name = format!("{}_{}", Uuid::new_v4(), sanitize_file_name(original_name));
        let path = self.upload_dir.join(name);
        fs::write(&path, data).map_err(|e| {
            error!("Failed to write upload {}: {}", path.display(), e);
            StorageError::WriteFailed(path.display().to_string())
        })?;
        debug!("Stored upload of {} byte(s) at {}", data.len(), path.display());
        Ok(path)
    }

    fn remove_upload(&self, path: &Path) -> Result<(), StorageError> {
        if !path.starts_with(&self.upload_dir) {
            return Err(StorageError::InvalidName(path.display().to_string()));
        }
        match fs::remove_file(path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => {
                error!("Failed to remove upload {}: {}", path.display(), e);
                Err(StorageError::WriteFailed(path.display().to_string()))
            }
        }
    }

    fn save_export(&self, task_id: Uuid, export: &FormatExport) -> Result<String, StorageError> {
        let file_name = Self::export_file_name(task_id);
        let path = self.download_dir.join(&file_name);
        let write_failed = |e: &dyn std::fmt::Display| {
            error!("Failed to write export {}: {}", path.display(), e);
            StorageError::WriteFailed(file_name.clone())
        };

        let file = File::create(&path).map_err(|e| write_failed(&e))?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, export).map_err(|e| write_failed(&e))?;
        writer.flush().map_err(|e| write_failed(&e))?;

        debug!("Export for task {} written to {}", task_id, path.display());
        Ok(file_name)
    }

    fn read_download(&self, file_name: &str) -> Result<Vec<u8>, StorageError> {
        Self::read_named(&self.download_dir, file_name)
    }

    fn remove_download(&self, file_name: &str) -> Result<(), StorageError> {
        check_plain_name(file_name)?;
        let path = self.download_dir.join(file_name);
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => {
                error!("Failed to remove download {}: {}", path.display(), e);
                Err(StorageError::WriteFailed(file_name.to_string()))
            }
        }
    }

    fn read_static(&self, file_name: &str) -> Result<Vec<u8>, StorageError> {
        Self::read_named(&self.static_dir, file_name)
    }

    fn cleanup_downloads(&self, older_than: DateTime<Utc>) -> Result<usize, StorageError> {
        let mut removed = 0usize;
        let entries = fs::read_dir(&self.download_dir).map_err(|e| {
            error!(
                "Failed to read downloads dir {}: {}",
                self.download_dir.display(),
                e
            );
            StorageError::ReadFailed(self.download_dir.display().to_string())
        })?;
        for entry in entries.flatten() {
            let path = entry.path();
            if !path.is_file() {
                continue;
            }
            let Ok(modified) = entry.metadata().and_then(|m| m.modified()) else {
                continue;
            };
            if DateTime::<Utc>::from(modified) < older_than && fs::remove_file(&path).is_ok() {
                removed += 1;
            }
        }
        if removed > 0 {
            info!(
                "Removed {} old download(s) (cutoff: {})",
                removed,
                older_than.to_rfc3339()
            );
        }
        Ok(removed)
    }
}

/// Keeps the last path component of a client file name and replaces anything that is not
/// alphanumeric, `.`, `-` or `_` by `_`.
pub fn sanitize_file_name(name: &str) -> String {
    let base = name.rsplit(['/', '\\']).next().unwrap_or_default();
    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();
    let cleaned = cleaned.trim_start_matches('.');
    if cleaned.is_empty() {
        FALLBACK_FILE_NAME.to_string()
    } else {
        cleaned.to_string()
    }
}

fn check_plain_name(file_name: &str) -> Result<(), StorageError> {
    if file_name.is_empty()
        || file_name.contains(['/', '\\'])
        || file_name == "."
        || file_name.contains("..")
    {
        return Err(StorageError::InvalidName(file_name.to_string()));
    }
    Ok(())
}
