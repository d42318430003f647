//! Storage subsystem
//!
//! This module provides the abstraction and the filesystem implementation for the files the
//! validator exchanges with its clients.
//!
//! Components:
//! - `storage_trait`: the Storage trait defining a uniform API.
//! - `file_storage`: implementation over `temp_uploads`, `temp_downloads` and `static`.

pub mod file_storage;
pub mod storage_trait;

pub use file_storage::FileStorage;
pub use storage_trait::Storage;
