//! Database connection management
//!
//! This module provides the SQLite connection wrapper used by the builder and
//! the installer.

use std::path::Path;

use rusqlite::Connection;

use crate::error::Result;

/// Core database connection wrapper
///
/// `DatabaseConn` wraps a SQLite connection and applies a consistent set of
/// pragmas for application use.
pub struct DatabaseConn {
    pub conn: Connection,
}

impl DatabaseConn {
    /// Open a database at the specified path
    ///
    /// The database is configured with WAL journaling, which is what
    /// long-lived application connections use.
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;
        let db = DatabaseConn { conn };
        db.configure()?;
        Ok(db)
    }

    /// Open a database without changing its journal mode
    ///
    /// Used for short-lived handles that must leave the file as a single,
    /// self-contained database.
    pub fn open_plain(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;
        Ok(DatabaseConn { conn })
    }

    /// Create an in-memory database
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let db = DatabaseConn { conn };
        db.configure()?;
        Ok(db)
    }

    fn configure(&self) -> Result<()> {
        // in-memory databases answer "memory" here
        let _: String = self
            .conn
            .query_row("PRAGMA journal_mode=WAL", [], |row| row.get(0))?;

        self.conn.execute_batch(
            "PRAGMA synchronous=NORMAL;
             PRAGMA temp_store=MEMORY;
             PRAGMA foreign_keys=ON;",
        )?;

        Ok(())
    }

    /// Names of all user tables, excluding SQLite's internal ones
    pub fn user_tables(&self) -> Result<Vec<String>> {
        let mut stmt = self.conn.prepare(
            "SELECT name FROM sqlite_master \
             WHERE type='table' AND name NOT LIKE 'sqlite_%' ORDER BY name",
        )?;
        let names = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(names)
    }

    /// Get the row count for a table
    pub fn table_count(&self, table_name: &str) -> Result<u64> {
        let query = format!("SELECT COUNT(*) FROM \"{}\"", table_name.replace('"', "\"\""));
        let count: u64 = self.conn.query_row(&query, [], |row| row.get(0))?;
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_in_memory() {
        let db = DatabaseConn::open_in_memory();
        assert!(db.is_ok());
    }

    #[test]
    fn test_user_tables_and_count() {
        let db = DatabaseConn::open_in_memory().unwrap();
        db.conn
            .execute_batch(
                "CREATE TABLE b_items (id INTEGER PRIMARY KEY AUTOINCREMENT);
                 CREATE TABLE a_users (id INTEGER PRIMARY KEY);
                 INSERT INTO a_users (id) VALUES (1), (2), (3);",
            )
            .unwrap();

        // sqlite_sequence is created by AUTOINCREMENT and must be hidden
        assert_eq!(db.user_tables().unwrap(), vec!["a_users", "b_items"]);
        assert_eq!(db.table_count("a_users").unwrap(), 3);
    }

    #[test]
    fn test_open_plain_keeps_journal_mode() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("plain.db");
        let db = DatabaseConn::open_plain(&path).unwrap();
        let mode: String = db
            .conn
            .query_row("PRAGMA journal_mode", [], |row| row.get(0))
            .unwrap();
        assert_eq!(mode, "delete");
    }
}
