//! Migrations between database versions

use std::fmt;
use std::sync::Arc;

use rusqlite::Connection;
use tracing::warn;

type MigrationFn = Arc<dyn Fn(&Connection) -> rusqlite::Result<()> + Send + Sync>;

/// Transformation from `start_version` to `end_version`
#[derive(Clone)]
pub struct Migration {
    pub start_version: u32,
    pub end_version: u32,
    action: MigrationFn,
}

impl Migration {
    pub fn new<F>(start_version: u32, end_version: u32, action: F) -> Self
    where
        F: Fn(&Connection) -> rusqlite::Result<()> + Send + Sync + 'static,
    {
        Self {
            start_version,
            end_version,
            action: Arc::new(action),
        }
    }

    /// Migration that changes nothing
    ///
    /// Registered only to satisfy the rule that every version step has a
    /// migration. Schema changes between the two versions are not applied.
    pub fn noop(start_version: u32, end_version: u32) -> Self {
        Self::new(start_version, end_version, move |_conn: &Connection| {
            warn!(
                "instantiated: no-op migration {} -> {}",
                start_version, end_version
            );
            Ok(())
        })
    }

    pub fn migrate(&self, conn: &Connection) -> rusqlite::Result<()> {
        (self.action)(conn)
    }
}

impl fmt::Debug for Migration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Migration")
            .field("start_version", &self.start_version)
            .field("end_version", &self.end_version)
            .finish_non_exhaustive()
    }
}

/// One no-op migration per step `(i-1, i)` for `i` in `2..=version`
pub fn noop_migrations(version: u32) -> Vec<Migration> {
    (2..=version).map(|i| Migration::noop(i - 1, i)).collect()
}

/// Pick migrations leading from `from` up to `to`
///
/// From each version the migration reaching furthest without passing `to` is
/// taken. Returns `None` when the chain breaks before reaching `to`.
pub fn find_migration_path(migrations: &[Migration], from: u32, to: u32) -> Option<Vec<&Migration>> {
    let mut path = Vec::new();
    let mut current = from;

    while current < to {
        let next = migrations
            .iter()
            .filter(|m| m.start_version == current && m.end_version > current && m.end_version <= to)
            .max_by_key(|m| m.end_version)?;
        path.push(next);
        current = next.end_version;
    }

    Some(path)
}
