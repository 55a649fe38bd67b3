use rusqlite::{Connection, Result};
use std::path::Path;

/// Opens the database file for the duration of a single store call.
pub fn establish_connection(db_path: &Path) -> Result<Connection> {
    let conn = Connection::open(db_path)?;
    conn.execute_batch("PRAGMA foreign_keys = ON")?;
    Ok(conn)
}

#[cfg(test)]
pub fn test_db_path() -> (tempfile::TempDir, std::path::PathBuf) {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let path = dir.path().join("bookkeeper_test.db");
    (dir, path)
}
