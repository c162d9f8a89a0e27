//! Database builder
//!
//! `DatabaseBuilder` collects the opening policy for an installed database:
//! registered migrations, destructive fallbacks and a connection hook. Nothing
//! touches the file until `build()` is called.

use std::collections::BTreeSet;
use std::fmt;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};

use rusqlite::Connection;
use tracing::{debug, info, warn};

use super::installer::{CursorFactory, MAX_VERSION};
use super::migration::{find_migration_path, Migration};
use crate::database::core::{DatabaseConn, DatabaseSchema, SchemaManager, SchemaStatus};
use crate::error::{AssetDbError, Result};

/// Unopened database configuration bound to schema `S`
pub struct DatabaseBuilder<S: DatabaseSchema> {
    name: String,
    path: PathBuf,
    version: u32,
    migrations: Vec<Migration>,
    destructive_fallback: bool,
    destructive_from: BTreeSet<u32>,
    destructive_on_downgrade: bool,
    cursor_factory: Option<CursorFactory>,
    _schema: PhantomData<fn() -> S>,
}

impl<S: DatabaseSchema> fmt::Debug for DatabaseBuilder<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DatabaseBuilder")
            .field("name", &self.name)
            .field("path", &self.path)
            .field("version", &self.version)
            .field("migrations", &self.migrations)
            .field("destructive_fallback", &self.destructive_fallback)
            .field("destructive_from", &self.destructive_from)
            .field("destructive_on_downgrade", &self.destructive_on_downgrade)
            .field("cursor_factory", &self.cursor_factory.is_some())
            .finish()
    }
}

impl<S: DatabaseSchema> DatabaseBuilder<S> {
    pub fn new(name: impl Into<String>, path: impl Into<PathBuf>, version: u32) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            version,
            migrations: Vec::new(),
            destructive_fallback: false,
            destructive_from: BTreeSet::new(),
            destructive_on_downgrade: false,
            cursor_factory: None,
            _schema: PhantomData,
        }
    }

    pub fn add_migrations(mut self, migrations: impl IntoIterator<Item = Migration>) -> Self {
        self.migrations.extend(migrations);
        self
    }

    /// Drop and recreate everything when no migration path exists
    pub fn fallback_to_destructive_migration(mut self) -> Self {
        self.destructive_fallback = true;
        self
    }

    /// Allow destructive recreation only when starting from these versions
    pub fn fallback_to_destructive_migration_from(mut self, versions: &[u32]) -> Self {
        self.destructive_from.extend(versions.iter().copied());
        self
    }

    /// Drop and recreate everything when the file is newer than requested
    pub fn fallback_to_destructive_migration_on_downgrade(mut self) -> Self {
        self.destructive_on_downgrade = true;
        self
    }

    pub fn cursor_factory(mut self, factory: Option<CursorFactory>) -> Self {
        self.cursor_factory = factory;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn version(&self) -> u32 {
        self.version
    }

    pub fn migrations(&self) -> &[Migration] {
        &self.migrations
    }

    pub fn is_destructive_fallback(&self) -> bool {
        self.destructive_fallback
    }

    /// Open the database, bringing it to the configured version
    pub fn build(self) -> Result<AssetDatabase<S>> {
        if !(1..=MAX_VERSION).contains(&self.version) {
            return Err(AssetDbError::InvalidVersion(self.version));
        }
        let db = DatabaseConn::open(&self.path)?;
        if let Some(factory) = &self.cursor_factory {
            factory(&db.conn)?;
        }

        let schema = SchemaManager::new(&db.conn);
        match schema.check_status(self.version)? {
            SchemaStatus::Current => {
                debug!("Database '{}' is at v{}", self.name, self.version);
            }
            SchemaStatus::NotInitialized => {
                info!("Creating database '{}' at v{}", self.name, self.version);
                schema.initialize::<S>(self.version)?;
            }
            SchemaStatus::NeedsMigration { from, to } => {
                match find_migration_path(&self.migrations, from, to) {
                    Some(path) => self.run_migrations(&db.conn, &path)?,
                    None if self.destructive_fallback || self.destructive_from.contains(&from) => {
                        warn!(
                            "No migration from v{} to v{} for '{}', recreating it",
                            from, to, self.name
                        );
                        self.recreate(&schema)?;
                    }
                    None => return Err(AssetDbError::MissingMigration { from, to }),
                }
            }
            SchemaStatus::Incompatible {
                database_version,
                required_version,
            } => {
                if self.destructive_fallback || self.destructive_on_downgrade {
                    warn!(
                        "Database '{}' is at v{}, newer than v{}, recreating it",
                        self.name, database_version, required_version
                    );
                    self.recreate(&schema)?;
                } else {
                    return Err(AssetDbError::MissingMigration {
                        from: database_version,
                        to: required_version,
                    });
                }
            }
        }

        schema.verify::<S>()?;

        Ok(AssetDatabase {
            db,
            name: self.name,
            path: self.path,
            _schema: PhantomData,
        })
    }

    fn run_migrations(&self, conn: &Connection, path: &[&Migration]) -> Result<()> {
        let tx = conn.unchecked_transaction()?;
        for migration in path {
            info!(
                "Migrating '{}' from v{} to v{}",
                self.name, migration.start_version, migration.end_version
            );
            migration.migrate(&tx)?;
        }
        SchemaManager::new(&tx).set_version(self.version)?;
        tx.commit()?;
        Ok(())
    }

    fn recreate(&self, schema: &SchemaManager<'_>) -> Result<()> {
        schema.reset()?;
        schema.initialize::<S>(self.version)
    }
}

/// Opened database produced by `DatabaseBuilder::build`
pub struct AssetDatabase<S: DatabaseSchema> {
    db: DatabaseConn,
    name: String,
    path: PathBuf,
    _schema: PhantomData<fn() -> S>,
}

impl<S: DatabaseSchema> AssetDatabase<S> {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Get the underlying database connection
    pub fn connection(&self) -> &Connection {
        &self.db.conn
    }

    pub fn version(&self) -> Result<u32> {
        SchemaManager::new(&self.db.conn).version()
    }

    /// Close the connection, reporting any error SQLite raises
    pub fn close(self) -> Result<()> {
        self.db
            .conn
            .close()
            .map_err(|(_, e)| AssetDbError::Sqlite(e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::core::BundledSchema;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct ItemsSchema;

    impl DatabaseSchema for ItemsSchema {
        fn create(conn: &Connection) -> rusqlite::Result<()> {
            conn.execute_batch(
                "CREATE TABLE IF NOT EXISTS items (id INTEGER PRIMARY KEY, label TEXT NOT NULL);",
            )
        }

        fn required_tables() -> &'static [&'static str] {
            &["items"]
        }
    }

    fn seeded_file(dir: &Path, version: u32) -> PathBuf {
        let path = dir.join("app.db");
        let conn = Connection::open(&path).unwrap();
        ItemsSchema::create(&conn).unwrap();
        conn.execute("INSERT INTO items (label) VALUES ('seed')", [])
            .unwrap();
        SchemaManager::new(&conn).set_version(version).unwrap();
        path
    }

    fn item_count(db: &AssetDatabase<ItemsSchema>) -> i64 {
        db.connection()
            .query_row("SELECT COUNT(*) FROM items", [], |row| row.get(0))
            .unwrap()
    }

    #[test]
    fn test_build_fresh_database_creates_schema() {
        let dir = tempfile::tempdir().unwrap();
        let db = DatabaseBuilder::<ItemsSchema>::new("app.db", dir.path().join("app.db"), 2)
            .build()
            .unwrap();

        assert_eq!(db.version().unwrap(), 2);
        assert_eq!(item_count(&db), 0);
        db.close().unwrap();
    }

    #[test]
    fn test_build_current_database_keeps_data() {
        let dir = tempfile::tempdir().unwrap();
        let path = seeded_file(dir.path(), 3);

        let db = DatabaseBuilder::<ItemsSchema>::new("app.db", &path, 3)
            .build()
            .unwrap();
        assert_eq!(item_count(&db), 1);
    }

    #[test]
    fn test_build_runs_migrations_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = seeded_file(dir.path(), 1);

        let db = DatabaseBuilder::<ItemsSchema>::new("app.db", &path, 3)
            .add_migrations(vec![
                Migration::new(1, 2, |conn: &Connection| {
                    conn.execute("INSERT INTO items (label) VALUES ('v2')", [])
                        .map(|_| ())
                }),
                Migration::new(2, 3, |conn: &Connection| {
                    conn.execute("INSERT INTO items (label) VALUES ('v3')", [])
                        .map(|_| ())
                }),
            ])
            .build()
            .unwrap();

        assert_eq!(db.version().unwrap(), 3);
        let labels: Vec<String> = {
            let mut stmt = db
                .connection()
                .prepare("SELECT label FROM items ORDER BY id")
                .unwrap();
            let rows = stmt
                .query_map([], |row| row.get(0))
                .unwrap()
                .collect::<rusqlite::Result<Vec<String>>>()
                .unwrap();
            rows
        };
        assert_eq!(labels, vec!["seed", "v2", "v3"]);
    }

    #[test]
    fn test_failed_migration_rolls_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = seeded_file(dir.path(), 1);

        let result = DatabaseBuilder::<ItemsSchema>::new("app.db", &path, 3)
            .add_migrations(vec![
                Migration::new(1, 2, |conn: &Connection| {
                    conn.execute("INSERT INTO items (label) VALUES ('v2')", [])
                        .map(|_| ())
                }),
                Migration::new(2, 3, |conn: &Connection| {
                    conn.execute_batch("INSERT INTO no_such_table VALUES (1)")
                }),
            ])
            .build();
        assert!(matches!(result, Err(AssetDbError::Sqlite(_))));

        let conn = Connection::open(&path).unwrap();
        assert_eq!(SchemaManager::new(&conn).version().unwrap(), 1);
        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM items", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 1);
    }

    #[test]
    fn test_missing_migration_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = seeded_file(dir.path(), 1);

        let result = DatabaseBuilder::<ItemsSchema>::new("app.db", &path, 3)
            .add_migrations(vec![Migration::noop(1, 2)])
            .build();
        assert!(matches!(
            result,
            Err(AssetDbError::MissingMigration { from: 1, to: 3 })
        ));
    }

    #[test]
    fn test_destructive_fallback_recreates() {
        let dir = tempfile::tempdir().unwrap();
        let path = seeded_file(dir.path(), 1);

        let db = DatabaseBuilder::<ItemsSchema>::new("app.db", &path, 4)
            .fallback_to_destructive_migration()
            .build()
            .unwrap();

        assert_eq!(db.version().unwrap(), 4);
        assert_eq!(item_count(&db), 0);
    }

    #[test]
    fn test_destructive_fallback_from_specific_versions() {
        let dir = tempfile::tempdir().unwrap();
        let path = seeded_file(dir.path(), 2);

        let denied = DatabaseBuilder::<ItemsSchema>::new("app.db", &path, 3)
            .fallback_to_destructive_migration_from(&[1])
            .build();
        assert!(denied.is_err());

        let db = DatabaseBuilder::<ItemsSchema>::new("app.db", &path, 3)
            .fallback_to_destructive_migration_from(&[1, 2])
            .build()
            .unwrap();
        assert_eq!(item_count(&db), 0);
    }

    #[test]
    fn test_downgrade_requires_fallback() {
        let dir = tempfile::tempdir().unwrap();
        let path = seeded_file(dir.path(), 5);

        let denied = DatabaseBuilder::<ItemsSchema>::new("app.db", &path, 3).build();
        assert!(matches!(
            denied,
            Err(AssetDbError::MissingMigration { from: 5, to: 3 })
        ));

        let db = DatabaseBuilder::<ItemsSchema>::new("app.db", &path, 3)
            .fallback_to_destructive_migration_on_downgrade()
            .build()
            .unwrap();
        assert_eq!(db.version().unwrap(), 3);
    }

    #[test]
    fn test_missing_required_tables() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("other.db");
        {
            let conn = Connection::open(&path).unwrap();
            conn.execute_batch("CREATE TABLE unrelated (id INTEGER); PRAGMA user_version = 1;")
                .unwrap();
        }

        let result = DatabaseBuilder::<ItemsSchema>::new("other.db", &path, 1).build();
        assert!(matches!(result, Err(AssetDbError::MissingTables(_))));
    }

    #[test]
    fn test_bundled_schema_destructive_leaves_empty_database() {
        let dir = tempfile::tempdir().unwrap();
        let path = seeded_file(dir.path(), 1);

        let db = DatabaseBuilder::<BundledSchema>::new("app.db", &path, 2)
            .fallback_to_destructive_migration()
            .build()
            .unwrap();
        let tables: i64 = db
            .connection()
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type='table'",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(tables, 0);
    }

    #[test]
    fn test_cursor_factory_runs_on_build() {
        let dir = tempfile::tempdir().unwrap();
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let factory: CursorFactory = Arc::new(move |conn: &Connection| {
            counter.fetch_add(1, Ordering::SeqCst);
            conn.execute_batch("CREATE TEMP TABLE IF NOT EXISTS session_marker (id INTEGER)")
        });

        let db = DatabaseBuilder::<ItemsSchema>::new("app.db", dir.path().join("app.db"), 1)
            .cursor_factory(Some(factory))
            .build()
            .unwrap();

        let marker: i64 = db
            .connection()
            .query_row(
                "SELECT COUNT(*) FROM sqlite_temp_master WHERE name = 'session_marker'",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(marker, 1);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_debug_output_hides_hook() {
        let factory: CursorFactory = Arc::new(|_conn: &Connection| Ok(()));
        let builder = DatabaseBuilder::<ItemsSchema>::new("app.db", "/tmp/app.db", 3)
            .add_migrations(crate::database::asset::noop_migrations(3))
            .fallback_to_destructive_migration_from(&[1])
            .cursor_factory(Some(factory));

        let text = format!("{:?}", builder);
        assert!(text.starts_with("DatabaseBuilder"));
        assert!(text.contains("version: 3"));
        assert!(text.contains("destructive_from: {1}"));
        assert!(text.contains("cursor_factory: true"));
    }

    #[test]
    fn test_build_rejects_unstampable_version() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("app.db");
        let result =
            DatabaseBuilder::<ItemsSchema>::new("app.db", &path, MAX_VERSION + 1).build();

        assert!(matches!(result, Err(AssetDbError::InvalidVersion(_))));
        assert!(!path.exists());
    }
}
