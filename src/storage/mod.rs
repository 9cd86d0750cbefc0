//! Storage module for persisting aggregated datasets
//!
//! A dataset is one complete pipeline run: the merged rows plus metadata
//! describing the window and configuration that produced them. Datasets are
//! stored under time-based IDs and round-trip losslessly.

mod schema;
mod sqlite;
mod traits;

pub use sqlite::{init_database, SqliteStore};
pub use traits::{DatasetStore, StorageError, StorageResult};

use crate::model::Row;
use chrono::Utc;
use serde::{Deserialize, Serialize};

/// Metadata describing how a dataset was produced
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatasetMetadata {
    /// Inclusive window start (YYYY-MM-DD), when one was configured
    pub from_date: Option<String>,

    /// Inclusive window end (YYYY-MM-DD), when one was configured
    pub to_date: Option<String>,

    /// Bid limit in effect during the run
    pub bid_limit: Option<u32>,

    /// Number of rows in the dataset
    pub row_count: u64,

    /// When the dataset was first saved (RFC 3339)
    pub saved_at: String,

    /// When the dataset was last written or renamed (RFC 3339)
    pub last_modified: String,

    /// SHA-256 of the configuration file that drove the run
    pub config_hash: String,
}

/// A complete saved dataset
#[derive(Debug, Clone, PartialEq)]
pub struct DatasetRecord {
    /// Time-based unique ID
    pub id: String,

    /// Human-chosen dataset name
    pub name: String,

    pub metadata: DatasetMetadata,

    pub rows: Vec<Row>,
}

/// Dataset listing entry, without the row payload
#[derive(Debug, Clone, PartialEq)]
pub struct DatasetSummary {
    pub id: String,
    pub name: String,
    pub metadata: DatasetMetadata,
}

/// Generates a time-based dataset ID
pub fn generate_dataset_id() -> String {
    format!("ds-{}", Utc::now().timestamp_millis())
}
