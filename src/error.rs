//! Error types for asset database installation and opening

use std::path::PathBuf;

/// Result alias used throughout the library
pub type Result<T> = std::result::Result<T, AssetDbError>;

/// Errors raised while installing, configuring or opening an asset database
#[derive(Debug, thiserror::Error)]
pub enum AssetDbError {
    /// Database versions lie in 1..=i32::MAX
    #[error("invalid database version {0}: versions range from 1 to 2147483647")]
    InvalidVersion(u32),

    /// Database names are plain file names
    #[error("invalid database name '{0}'")]
    InvalidName(String),

    /// The bundled asset file is missing or unreadable
    #[error("bundled asset {path:?} is not available: {source}")]
    AssetUnavailable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A file system operation on the installed database failed
    #[error("I/O error on {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// No registered migration path and no destructive fallback allowed
    #[error("a migration from {from} to {to} was required but not found")]
    MissingMigration { from: u32, to: u32 },

    /// The installed file is newer than the requested version
    #[error("cannot downgrade database '{name}' from v{installed} to v{requested}")]
    Downgrade {
        name: String,
        installed: u32,
        requested: u32,
    },

    /// Tables the schema requires are absent after opening
    #[error("database is missing required tables: {}", .0.join(", "))]
    MissingTables(Vec<String>),

    /// The preference file backing the version marker is unusable
    #[error("preference store {path:?}: {message}")]
    Preferences { path: PathBuf, message: String },
}

impl AssetDbError {
    /// Whether the error originated from the file system
    pub fn is_io(&self) -> bool {
        matches!(
            self,
            AssetDbError::AssetUnavailable { .. } | AssetDbError::Io { .. }
        )
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        AssetDbError::Io {
            path: path.into(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_io() {
        let err = AssetDbError::AssetUnavailable {
            path: PathBuf::from("/assets/app.db"),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "missing"),
        };
        assert!(err.is_io());
        assert!(!AssetDbError::InvalidVersion(0).is_io());
    }

    #[test]
    fn test_display() {
        let err = AssetDbError::MissingMigration { from: 2, to: 4 };
        assert_eq!(
            err.to_string(),
            "a migration from 2 to 4 was required but not found"
        );

        let err = AssetDbError::MissingTables(vec!["users".to_string(), "items".to_string()]);
        assert_eq!(
            err.to_string(),
            "database is missing required tables: users, items"
        );
    }
}
