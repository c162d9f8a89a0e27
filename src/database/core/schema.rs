//! Database schema management
//!
//! Schema types describe how to create a database from scratch and which
//! tables an opened database must contain. `SchemaManager` tracks the
//! version stamp, checks the schema status and performs destructive resets.

use rusqlite::Connection;
use tracing::debug;

use crate::error::{AssetDbError, Result};

/// Schema bound to a database builder
///
/// `create` runs when a database is opened for the first time or after a
/// destructive reset. Statements should use `IF NOT EXISTS` so they are safe
/// against a pre-populated asset.
pub trait DatabaseSchema {
    /// Create all tables, indexes and views of the schema
    fn create(conn: &Connection) -> rusqlite::Result<()>;

    /// Tables that must exist once the database is open
    fn required_tables() -> &'static [&'static str] {
        &[]
    }
}

/// Schema for databases whose structure comes entirely from the bundled asset
pub struct BundledSchema;

impl DatabaseSchema for BundledSchema {
    fn create(_conn: &Connection) -> rusqlite::Result<()> {
        Ok(())
    }
}

/// Schema manager for an opened database
///
/// Handles version stamping, status checks and destructive resets.
pub struct SchemaManager<'a> {
    conn: &'a Connection,
}

impl<'a> SchemaManager<'a> {
    /// Create a new schema manager for the given connection
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Current `user_version` of the database
    pub fn version(&self) -> Result<u32> {
        let version: i64 = self
            .conn
            .query_row("PRAGMA user_version", [], |row| row.get(0))?;
        Ok(u32::try_from(version).unwrap_or(0))
    }

    /// Stamp the database with a version
    pub fn set_version(&self, version: u32) -> Result<()> {
        self.conn
            .execute_batch(&format!("PRAGMA user_version = {}", version))?;
        Ok(())
    }

    /// Create the schema and stamp the version
    pub fn initialize<S: DatabaseSchema>(&self, version: u32) -> Result<()> {
        S::create(self.conn)?;
        self.set_version(version)
    }

    /// Check the schema status against the expected version
    pub fn check_status(&self, expected: u32) -> Result<SchemaStatus> {
        let current = self.version()?;

        if current == 0 {
            Ok(SchemaStatus::NotInitialized)
        } else if current == expected {
            Ok(SchemaStatus::Current)
        } else if current < expected {
            Ok(SchemaStatus::NeedsMigration {
                from: current,
                to: expected,
            })
        } else {
            Ok(SchemaStatus::Incompatible {
                database_version: current,
                required_version: expected,
            })
        }
    }

    /// Verify that every table the schema requires exists
    pub fn verify<S: DatabaseSchema>(&self) -> Result<()> {
        let mut missing = Vec::new();
        for table in S::required_tables() {
            let exists: i32 = self.conn.query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name=?1",
                [table],
                |row| row.get(0),
            )?;
            if exists == 0 {
                missing.push(table.to_string());
            }
        }

        if missing.is_empty() {
            Ok(())
        } else {
            Err(AssetDbError::MissingTables(missing))
        }
    }

    /// Reset the database by dropping all user objects
    ///
    /// Views and triggers go first, then tables (which take their indexes
    /// with them). Foreign key enforcement is suspended for the duration.
    pub fn reset(&self) -> Result<()> {
        let fk_enabled: i32 = self
            .conn
            .query_row("PRAGMA foreign_keys", [], |row| row.get(0))?;
        self.conn.execute_batch("PRAGMA foreign_keys=OFF")?;

        let result = self.drop_all();

        if fk_enabled != 0 {
            self.conn.execute_batch("PRAGMA foreign_keys=ON")?;
        }
        result
    }

    fn drop_all(&self) -> Result<()> {
        for kind in ["view", "trigger", "table"] {
            let mut stmt = self.conn.prepare(
                "SELECT name FROM sqlite_master WHERE type=?1 AND name NOT LIKE 'sqlite_%'",
            )?;
            let names = stmt
                .query_map([kind], |row| row.get::<_, String>(0))?
                .collect::<rusqlite::Result<Vec<_>>>()?;

            for name in names {
                debug!("Dropping {} {}", kind, name);
                self.conn.execute_batch(&format!(
                    "DROP {} IF EXISTS \"{}\"",
                    kind.to_uppercase(),
                    name.replace('"', "\"\"")
                ))?;
            }
        }
        Ok(())
    }
}

/// Status of the database schema relative to a requested version
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchemaStatus {
    /// Database carries no version stamp (fresh database)
    NotInitialized,

    /// Database is at the requested version
    Current,

    /// Schema needs migration from an older version
    NeedsMigration { from: u32, to: u32 },

    /// Database is from a newer version
    Incompatible {
        database_version: u32,
        required_version: u32,
    },
}
