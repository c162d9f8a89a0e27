//! Asset installer
//!
//! Copies the bundled database into writable storage and stamps it with the
//! requested version. The copy lands in a temporary file first and is renamed
//! over the target, so a failed install never leaves a half-written database
//! behind.

use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use rusqlite::Connection;
use tracing::{debug, info, warn};

use crate::database::core::{DatabaseConn, SchemaManager};
use crate::error::{AssetDbError, Result};

/// Hook run on every connection the installer and the builder open
///
/// Use it to register SQL functions, collations or per-connection pragmas.
pub type CursorFactory = Arc<dyn Fn(&Connection) -> rusqlite::Result<()> + Send + Sync>;

/// Files SQLite keeps next to a database
const SIDECAR_SUFFIXES: &[&str] = &["-journal", "-wal", "-shm"];

/// How an existing installed file is treated when the gate fires
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstallStrategy {
    /// Delete any installed file, then copy the asset
    DeleteThenCopy,
    /// Replace the installed file only when its stamp is older than requested
    ForceUpgrade,
}

/// Handle to an installed database file, closed and ready to open
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstalledDatabase {
    pub path: PathBuf,
    pub version: u32,
    /// Whether the asset was copied during this install
    pub replaced: bool,
}

/// Copies bundled asset databases into a storage directory
pub struct AssetInstaller {
    assets_dir: PathBuf,
    storage_dir: PathBuf,
    strategy: InstallStrategy,
    cursor_factory: Option<CursorFactory>,
}

impl AssetInstaller {
    pub fn new(
        assets_dir: impl Into<PathBuf>,
        storage_dir: impl Into<PathBuf>,
        strategy: InstallStrategy,
    ) -> Self {
        Self {
            assets_dir: assets_dir.into(),
            storage_dir: storage_dir.into(),
            strategy,
            cursor_factory: None,
        }
    }

    /// Run `factory` on the connection used to stamp the installed file
    pub fn with_cursor_factory(mut self, factory: Option<CursorFactory>) -> Self {
        self.cursor_factory = factory;
        self
    }

    pub fn asset_path(&self, name: &str) -> PathBuf {
        self.assets_dir.join(name)
    }

    pub fn database_path(&self, name: &str) -> PathBuf {
        self.storage_dir.join(name)
    }

    /// Install the bundled asset `name` at `version`
    pub fn install(&self, name: &str, version: u32) -> Result<InstalledDatabase> {
        validate_identity(name, version)?;

        let asset = self.asset_path(name);
        let target = self.database_path(name);

        fs::create_dir_all(&self.storage_dir)
            .map_err(|e| AssetDbError::io(&self.storage_dir, e))?;

        let replaced = match self.strategy {
            InstallStrategy::DeleteThenCopy => {
                // Variant A: local writes are discarded on every install
                let source = open_asset(&asset)?;
                if target.exists() {
                    warn!("Deleting installed database {:?} before copying asset", target);
                }
                delete_database(&target)?;
                self.copy_asset(source, &asset, &target, version)?;
                true
            }
            InstallStrategy::ForceUpgrade => match installed_version(&target) {
                None => {
                    self.copy_asset(open_asset(&asset)?, &asset, &target, version)?;
                    true
                }
                Some(installed) if installed < version => {
                    info!(
                        "Forcing upgrade of {:?} from v{} to v{}",
                        target, installed, version
                    );
                    self.copy_asset(open_asset(&asset)?, &asset, &target, version)?;
                    true
                }
                Some(installed) if installed == version => {
                    debug!("{:?} already at v{}, keeping it", target, version);
                    false
                }
                Some(installed) => {
                    return Err(AssetDbError::Downgrade {
                        name: name.to_string(),
                        installed,
                        requested: version,
                    })
                }
            },
        };

        info!("Asset database '{}' is ready at v{}", name, version);
        Ok(InstalledDatabase {
            path: target,
            version,
            replaced,
        })
    }

    fn copy_asset(
        &self,
        mut source: File,
        asset: &Path,
        target: &Path,
        version: u32,
    ) -> Result<()> {
        let file_name = target
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        let tmp = self.storage_dir.join(format!("{}.assetdb-tmp", file_name));

        let copied = File::create(&tmp)
            .and_then(|mut dest| io::copy(&mut source, &mut dest).map(|_| ()))
            .map_err(|e| AssetDbError::io(&tmp, e))
            .and_then(|_| self.materialize(&tmp, version));

        if let Err(e) = copied {
            let _ = fs::remove_file(&tmp);
            return Err(e);
        }

        delete_database(target)?;
        fs::rename(&tmp, target).map_err(|e| AssetDbError::io(target, e))?;
        debug!("Copied asset {:?} to {:?}", asset, target);
        Ok(())
    }

    /// Open the copied file, stamp it and close it again
    fn materialize(&self, path: &Path, version: u32) -> Result<()> {
        let db = DatabaseConn::open_plain(path)?;
        if let Some(factory) = &self.cursor_factory {
            factory(&db.conn)?;
        }
        SchemaManager::new(&db.conn).set_version(version)?;
        db.conn.close().map_err(|(_, e)| AssetDbError::Sqlite(e))?;
        Ok(())
    }
}

fn open_asset(path: &Path) -> Result<File> {
    let unavailable = |source| AssetDbError::AssetUnavailable {
        path: path.to_path_buf(),
        source,
    };

    let meta = fs::metadata(path).map_err(unavailable)?;
    if !meta.is_file() {
        return Err(unavailable(io::Error::new(
            io::ErrorKind::InvalidInput,
            "asset is not a regular file",
        )));
    }
    File::open(path).map_err(unavailable)
}

/// Version stamp of an installed file, `None` when absent or unreadable
fn installed_version(path: &Path) -> Option<u32> {
    if !path.is_file() {
        return None;
    }
    let db = DatabaseConn::open_plain(path).ok()?;
    match SchemaManager::new(&db.conn).version() {
        Ok(v) => Some(v),
        Err(e) => {
            warn!("Installed database {:?} is unreadable ({}), replacing it", path, e);
            None
        }
    }
}

/// Remove a database file and its sidecars, ignoring files that do not exist
pub fn delete_database(path: &Path) -> Result<()> {
    let mut candidates = vec![path.to_path_buf()];
    for suffix in SIDECAR_SUFFIXES {
        let mut p = path.as_os_str().to_owned();
        p.push(suffix);
        candidates.push(PathBuf::from(p));
    }

    for candidate in candidates {
        match fs::remove_file(&candidate) {
            Ok(()) => debug!("Removed {:?}", candidate),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => return Err(AssetDbError::io(candidate, e)),
        }
    }
    Ok(())
}

/// Largest version `PRAGMA user_version` can hold, it is a signed 32-bit field
pub const MAX_VERSION: u32 = i32::MAX as u32;

/// Names must be plain file names and versions lie in `1..=MAX_VERSION`
pub(crate) fn validate_identity(name: &str, version: u32) -> Result<()> {
    if !(1..=MAX_VERSION).contains(&version) {
        return Err(AssetDbError::InvalidVersion(version));
    }
    let plain = Path::new(name)
        .file_name()
        .map(|n| n == name)
        .unwrap_or(false);
    if name.is_empty() || !plain || name.contains(['/', '\\']) {
        return Err(AssetDbError::InvalidName(name.to_string()));
    }
    Ok(())
}
