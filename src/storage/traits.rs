//! Storage trait and error types

use crate::storage::{DatasetRecord, DatasetSummary};
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Trait for dataset storage backends
///
/// Rows are plain serializable data; implementations must round-trip a saved
/// dataset without loss.
pub trait DatasetStore {
    /// Saves a dataset, replacing any existing dataset with the same ID
    fn save_dataset(&mut self, record: &DatasetRecord) -> StorageResult<()>;

    /// Loads a complete dataset by ID
    fn get_dataset(&self, id: &str) -> StorageResult<Option<DatasetRecord>>;

    /// Lists all saved datasets, newest first, without row payloads
    fn list_datasets(&self) -> StorageResult<Vec<DatasetSummary>>;

    /// Deletes a dataset; returns false when no such dataset exists
    fn delete_dataset(&mut self, id: &str) -> StorageResult<bool>;

    /// Renames a dataset and bumps its last-modified time; returns false
    /// when no such dataset exists
    fn rename_dataset(&mut self, id: &str, name: &str) -> StorageResult<bool>;
}
