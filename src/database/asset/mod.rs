//! Bundled asset databases
//!
//! An application ships a pre-built SQLite file in its assets directory.
//! [`database_builder`] makes sure the installed copy matches the requested
//! version and returns an unopened [`DatabaseBuilder`]:
//!
//! ```text
//! version store --> gate --(fires)--> installer --> marker = version
//!                     |                                  |
//!                     +------------(shut)----------------+--> builder
//! ```
//!
//! Two variants exist:
//!
//! - [`AssetVariant::Recopy`] deletes the installed file and copies the asset
//!   every time the gate fires, then registers one no-op migration per
//!   version step.
//! - [`AssetVariant::ForcedUpgrade`] (default) replaces the installed file
//!   only when its stamp is older, and opens with a destructive fallback.
//!
//! Both variants discard data written locally when the version is bumped.
//!
//! ```rust,ignore
//! use assetdb::database::{database_builder, AssetContext, BuilderOptions, BundledSchema};
//! use assetdb::database::PreferenceVersionStore;
//!
//! let context = AssetContext::new("assets/databases", "/var/lib/app/databases");
//! let mut store = PreferenceVersionStore::open("/var/lib/app/preferences.json")?;
//!
//! let db = database_builder::<BundledSchema>(
//!     &context,
//!     &mut store,
//!     "catalog.db",
//!     3,
//!     BuilderOptions::default(),
//! )?
//! .build()?;
//! ```

mod builder;
mod gate;
mod installer;
mod migration;
mod version_store;

pub use builder::{AssetDatabase, DatabaseBuilder};
pub use gate::{should_reinstall, VersionGate};
pub use installer::{
    delete_database, AssetInstaller, CursorFactory, InstallStrategy, InstalledDatabase,
    MAX_VERSION,
};
pub use migration::{find_migration_path, noop_migrations, Migration};
pub use version_store::{
    MemoryVersionStore, PreferenceVersionStore, VersionStore, VERSION_MARKER_KEY,
};

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::database::core::DatabaseSchema;
use crate::error::Result;
use installer::validate_identity;

/// Where bundled assets are read from and databases are written to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetContext {
    pub assets_dir: PathBuf,
    pub database_dir: PathBuf,
}

impl AssetContext {
    pub fn new(assets_dir: impl Into<PathBuf>, database_dir: impl Into<PathBuf>) -> Self {
        Self {
            assets_dir: assets_dir.into(),
            database_dir: database_dir.into(),
        }
    }
}

/// Install and migration behavior
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AssetVariant {
    /// Delete and recopy on every install, register no-op migrations
    Recopy,
    /// Replace only older files, fall back to destructive migration
    #[default]
    ForcedUpgrade,
}

impl AssetVariant {
    pub fn install_strategy(&self) -> InstallStrategy {
        match self {
            AssetVariant::Recopy => InstallStrategy::DeleteThenCopy,
            AssetVariant::ForcedUpgrade => InstallStrategy::ForceUpgrade,
        }
    }
}

impl std::fmt::Display for AssetVariant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AssetVariant::Recopy => write!(f, "recopy"),
            AssetVariant::ForcedUpgrade => write!(f, "forced-upgrade"),
        }
    }
}

impl std::str::FromStr for AssetVariant {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "recopy" | "a" => Ok(AssetVariant::Recopy),
            "forced-upgrade" | "force-upgrade" | "b" => Ok(AssetVariant::ForcedUpgrade),
            _ => Err(format!(
                "Unknown variant '{}'. Valid variants: recopy, forced-upgrade",
                s
            )),
        }
    }
}

/// Optional overrides for [`database_builder`]
#[derive(Clone, Default)]
pub struct BuilderOptions {
    /// Directory for the installed file instead of the context's database dir
    pub storage_directory: Option<PathBuf>,
    /// Hook run on every connection opened for this database
    pub cursor_factory: Option<CursorFactory>,
    pub variant: AssetVariant,
}

impl std::fmt::Debug for BuilderOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BuilderOptions")
            .field("storage_directory", &self.storage_directory)
            .field("cursor_factory", &self.cursor_factory.is_some())
            .field("variant", &self.variant)
            .finish()
    }
}

impl BuilderOptions {
    pub fn storage_dir<'a>(&'a self, context: &'a AssetContext) -> &'a Path {
        self.storage_directory
            .as_deref()
            .unwrap_or(&context.database_dir)
    }
}

/// Ensure the installed copy of `name` matches `version` and configure a builder
///
/// The bundled asset is (re)installed when `version` is newer than the marker
/// held by `store`, after which the marker is set to `version`. A failed
/// install leaves the marker untouched. The returned builder is unopened.
pub fn database_builder<S: DatabaseSchema>(
    context: &AssetContext,
    store: &mut dyn VersionStore,
    name: &str,
    version: u32,
    options: BuilderOptions,
) -> Result<DatabaseBuilder<S>> {
    validate_identity(name, version)?;

    let storage_dir = options.storage_dir(context).to_path_buf();
    let installer = AssetInstaller::new(
        &context.assets_dir,
        &storage_dir,
        options.variant.install_strategy(),
    )
    .with_cursor_factory(options.cursor_factory.clone());

    let mut gate = VersionGate::new(store);
    if gate.ensure(version, || installer.install(name, version))?.is_none() {
        debug!("Asset database '{}' already installed at v{}", name, version);
    }

    let builder = DatabaseBuilder::<S>::new(name, installer.database_path(name), version)
        .cursor_factory(options.cursor_factory);

    Ok(match options.variant {
        AssetVariant::Recopy => builder.add_migrations(noop_migrations(version)),
        AssetVariant::ForcedUpgrade => builder.fallback_to_destructive_migration(),
    })
}
