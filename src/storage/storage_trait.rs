//! Storage Trait
//!
//! This module defines the `Storage` trait, the interface over the working directories the
//! validator exchanges files through.
//!
//! Implementors of this trait are responsible for:
//! - Spooling uploaded files until their validation task is done
//! - Writing JSON exports and serving them back for download
//! - Serving static assets (logo, stylesheets)
//! - Cleaning up old exports
//!
//! All methods return a `Result` to handle potential storage errors.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error_handling::types::StorageError;
use crate::validation::types::FormatExport;

/// The `Storage` trait defines the interface for upload, download and static file storage.
pub trait Storage: Send + Sync {
    /// Stores an uploaded file and returns where it was written.
    ///
    /// - `original_name` - The client-side file name; it is sanitized and prefixed with a
    ///   random identifier so concurrent uploads never collide.
    fn save_upload(&self, original_name: &str, data: &[u8]) -> Result<PathBuf, StorageError>;

    /// Deletes a spooled upload.
    fn remove_upload(&self, path: &Path) -> Result<(), StorageError>;

    /// Writes the export of a task and returns the file name it can be downloaded under.
    fn save_export(&self, task_id: Uuid, export: &FormatExport) -> Result<String, StorageError>;

    /// Reads a downloadable file by name.
    fn read_download(&self, file_name: &str) -> Result<Vec<u8>, StorageError>;

    /// Deletes a downloadable file by name.
    fn remove_download(&self, file_name: &str) -> Result<(), StorageError>;

    /// Reads a static asset by name.
    fn read_static(&self, file_name: &str) -> Result<Vec<u8>, StorageError>;

    /// Removes downloadable files last modified before `older_than`.
    fn cleanup_downloads(&self, older_than: DateTime<Utc>) -> Result<usize, StorageError>;
}
