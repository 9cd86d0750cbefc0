//! SQLite storage implementation
//!
//! This module provides a SQLite-based implementation of the DatasetStore
//! trait. Rows are stored as a JSON blob per dataset; metadata lives in
//! dedicated columns so listing never deserializes row payloads.

use crate::model::Row;
use crate::storage::schema::initialize_schema;
use crate::storage::traits::{DatasetStore, StorageError, StorageResult};
use crate::storage::{DatasetMetadata, DatasetRecord, DatasetSummary};
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;

/// Opens or creates a dataset database at the given path
pub fn init_database(path: &Path) -> StorageResult<SqliteStore> {
    SqliteStore::new(path)
}

/// SQLite dataset storage backend
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    /// Creates a new SqliteStore instance
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the SQLite database file
    ///
    /// # Returns
    ///
    /// * `Ok(SqliteStore)` - Successfully opened/created database
    /// * `Err(StorageError)` - Failed to open database
    pub fn new(path: &Path) -> StorageResult<Self> {
        let conn = Connection::open(path)?;

        // Configure SQLite for better performance
        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA temp_store = MEMORY;
        ",
        )?;

        // Initialize schema
        initialize_schema(&conn)?;

        Ok(Self { conn })
    }

    /// Creates an in-memory database (for testing)
    #[cfg(test)]
    pub fn new_in_memory() -> StorageResult<Self> {
        let conn = Connection::open_in_memory()?;
        initialize_schema(&conn)?;
        Ok(Self { conn })
    }
}

impl DatasetStore for SqliteStore {
    fn save_dataset(&mut self, record: &DatasetRecord) -> StorageResult<()> {
        let rows_json = serde_json::to_string(&record.rows)
            .map_err(|e| StorageError::Serialization(e.to_string()))?;

        self.conn.execute(
            "INSERT OR REPLACE INTO datasets
                (id, name, from_date, to_date, bid_limit, row_count,
                 saved_at, last_modified, config_hash, rows)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                record.id,
                record.name,
                record.metadata.from_date,
                record.metadata.to_date,
                record.metadata.bid_limit,
                record.metadata.row_count,
                record.metadata.saved_at,
                record.metadata.last_modified,
                record.metadata.config_hash,
                rows_json,
            ],
        )?;

        Ok(())
    }

    fn get_dataset(&self, id: &str) -> StorageResult<Option<DatasetRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, name, from_date, to_date, bid_limit, row_count,
                    saved_at, last_modified, config_hash, rows
             FROM datasets WHERE id = ?1",
        )?;

        let found = stmt
            .query_row(params![id], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    read_metadata(row)?,
                    row.get::<_, String>(9)?,
                ))
            })
            .optional()?;

        match found {
            Some((id, name, metadata, rows_json)) => {
                let rows: Vec<Row> = serde_json::from_str(&rows_json)
                    .map_err(|e| StorageError::Serialization(e.to_string()))?;
                Ok(Some(DatasetRecord {
                    id,
                    name,
                    metadata,
                    rows,
                }))
            }
            None => Ok(None),
        }
    }

    fn list_datasets(&self) -> StorageResult<Vec<DatasetSummary>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, name, from_date, to_date, bid_limit, row_count,
                    saved_at, last_modified, config_hash
             FROM datasets ORDER BY saved_at DESC, id DESC",
        )?;

        let summaries = stmt
            .query_map([], |row| {
                Ok(DatasetSummary {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    metadata: read_metadata(row)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(summaries)
    }

    fn delete_dataset(&mut self, id: &str) -> StorageResult<bool> {
        let affected = self
            .conn
            .execute("DELETE FROM datasets WHERE id = ?1", params![id])?;
        Ok(affected > 0)
    }

    fn rename_dataset(&mut self, id: &str, name: &str) -> StorageResult<bool> {
        let now = Utc::now().to_rfc3339();
        let affected = self.conn.execute(
            "UPDATE datasets SET name = ?1, last_modified = ?2 WHERE id = ?3",
            params![name, now, id],
        )?;
        Ok(affected > 0)
    }
}

/// Reads the metadata columns shared by the get and list queries
///
/// Column order: from_date=2, to_date=3, bid_limit=4, row_count=5,
/// saved_at=6, last_modified=7, config_hash=8.
fn read_metadata(row: &rusqlite::Row<'_>) -> rusqlite::Result<DatasetMetadata> {
    Ok(DatasetMetadata {
        from_date: row.get(2)?,
        to_date: row.get(3)?,
        bid_limit: row.get(4)?,
        row_count: row.get(5)?,
        saved_at: row.get(6)?,
        last_modified: row.get(7)?,
        config_hash: row.get(8)?,
    })
}
