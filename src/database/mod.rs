//! Database module
//!
//! This module provides all database functionality for assetdb, organized into:
//!
//! - **core**: SQLite connections and schema management
//! - **asset**: Installing bundled asset databases and configuring builders
//!
//! # Architecture
//!
//! ```text
//! database/
//! ├── core/              # Foundation
//! │   ├── connection     # SQLite DatabaseConn wrapper
//! │   └── schema         # DatabaseSchema trait, SchemaManager
//! │
//! └── asset/             # Bundled databases
//!     ├── version_store  # Persisted installed-version marker
//!     ├── gate           # Reinstall decision
//!     ├── installer      # Asset copy into storage
//!     ├── migration      # Migration steps and path finding
//!     └── builder        # DatabaseBuilder / AssetDatabase
//! ```

pub mod asset;
pub mod core;

pub use self::core::{BundledSchema, DatabaseConn, DatabaseSchema, SchemaManager, SchemaStatus};

pub use asset::{
    database_builder, delete_database, find_migration_path, noop_migrations, should_reinstall,
    AssetContext, AssetDatabase, AssetInstaller, AssetVariant, BuilderOptions, CursorFactory,
    DatabaseBuilder, InstallStrategy, InstalledDatabase, MemoryVersionStore, Migration,
    PreferenceVersionStore, VersionGate, VersionStore, MAX_VERSION, VERSION_MARKER_KEY,
};
