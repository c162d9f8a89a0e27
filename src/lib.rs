#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]

//! assetdb - Bundled SQLite databases for applications
//!
//! assetdb lets an application ship a pre-built SQLite database next to its
//! binary, install it into writable storage and open it through a configured
//! builder. A persisted version marker decides when the bundled file has to
//! be copied again.
//!
//! # Feature Flags
//!
//! | Feature | Description | Key Dependencies |
//! |---------|-------------|------------------|
//! | (none) | Library: installer, version gate, builder | `rusqlite` |
//! | `display` | `Tabled` derives on [`TableInfo`] for table output | `tabled` |
//! | `cli` | `assetdb` binary | All above + `clap` |
//!
//! # Architecture
//!
//! - **[`database`]**: All database functionality
//!   - `core`: SQLite connection management and schema handling
//!   - `asset`: Version gate, asset installer and database builder
//!
//! - **[`config`]**: Configuration management
//!
//! - **[`error`]**: Library error type
//!
//! - **[`output`]**: Output formats for the command-line interface
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use assetdb::{database_builder, AssetDbConfig, BuilderOptions, BundledSchema};
//! use assetdb::PreferenceVersionStore;
//!
//! let config = AssetDbConfig::new(&None)?;
//! let mut store = PreferenceVersionStore::open(config.preferences_path())?;
//!
//! // Installs assets/databases/catalog.db on first run or when 3 is new
//! let db = database_builder::<BundledSchema>(
//!     &config.context(),
//!     &mut store,
//!     "catalog.db",
//!     3,
//!     BuilderOptions::default(),
//! )?
//! .build()?;
//!
//! let count: i64 = db
//!     .connection()
//!     .query_row("SELECT COUNT(*) FROM products", [], |row| row.get(0))?;
//! ```

pub mod config;
pub mod database;
pub mod error;
pub mod output;

// =============================================================================
// Configuration
// =============================================================================

pub use self::config::AssetDbConfig;

pub use self::config::{format_size, get_database_info, InstalledDatabaseInfo, TableInfo};

// =============================================================================
// Database Module - Re-export commonly used types
// =============================================================================

// Core database types
pub use database::{BundledSchema, DatabaseConn, DatabaseSchema, SchemaManager, SchemaStatus};

// Asset installation and builder configuration
pub use database::{
    database_builder, should_reinstall, AssetContext, AssetDatabase, AssetInstaller,
    AssetVariant, BuilderOptions, CursorFactory, DatabaseBuilder, InstallStrategy,
    InstalledDatabase, Migration, VersionGate, MAX_VERSION,
};

// Version marker storage
pub use database::{MemoryVersionStore, PreferenceVersionStore, VersionStore, VERSION_MARKER_KEY};

pub use error::{AssetDbError, Result};

pub use output::OutputFormat;
