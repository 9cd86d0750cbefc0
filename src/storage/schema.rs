//! Database schema definitions
//!
//! This module contains all SQL schema definitions for the Bidscope database.

/// SQL schema for the database
pub const SCHEMA_SQL: &str = r#"
-- Saved datasets: one complete aggregation run each
CREATE TABLE IF NOT EXISTS datasets (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    from_date TEXT,
    to_date TEXT,
    bid_limit INTEGER,
    row_count INTEGER NOT NULL,
    saved_at TEXT NOT NULL,
    last_modified TEXT NOT NULL,
    config_hash TEXT NOT NULL,
    rows TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_datasets_name ON datasets(name);
CREATE INDEX IF NOT EXISTS idx_datasets_saved_at ON datasets(saved_at);
"#;

/// Initializes the database schema
pub fn initialize_schema(conn: &rusqlite::Connection) -> rusqlite::Result<()> {
    conn.execute_batch(SCHEMA_SQL)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_initializes_on_fresh_database() {
        let conn = rusqlite::Connection::open_in_memory().unwrap();
        initialize_schema(&conn).unwrap();

        // Idempotent: running again must not fail
        initialize_schema(&conn).unwrap();

        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM datasets", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 0);
    }
}
