//! Persisted version marker
//!
//! The marker records the last asset version installed on this machine. It is
//! kept behind the `VersionStore` trait so the gate can be driven by an
//! in-memory store in tests and by a preference file in applications.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::debug;

use crate::error::{AssetDbError, Result};

/// Preference key under which the installed version is stored
pub const VERSION_MARKER_KEY: &str = "instantiatedversion";

/// Storage for the installed-version marker
pub trait VersionStore {
    /// Last installed version, 0 when nothing was ever installed
    fn get(&self) -> Result<u32>;

    /// Record a successfully installed version
    fn set(&mut self, version: u32) -> Result<()>;
}

/// Process-local version store
#[derive(Debug, Default, Clone)]
pub struct MemoryVersionStore {
    version: Option<u32>,
    writes: usize,
}

impl MemoryVersionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-seeded with a marker
    pub fn with_version(version: u32) -> Self {
        Self {
            version: Some(version),
            writes: 0,
        }
    }

    /// Number of `set` calls seen so far
    pub fn writes(&self) -> usize {
        self.writes
    }
}

impl VersionStore for MemoryVersionStore {
    fn get(&self) -> Result<u32> {
        Ok(self.version.unwrap_or(0))
    }

    fn set(&mut self, version: u32) -> Result<()> {
        self.version = Some(version);
        self.writes += 1;
        Ok(())
    }
}

/// Version store backed by a JSON key-value preference file
///
/// The file holds a flat JSON object. Keys other than the version marker are
/// preserved across writes, so the file can be shared with other settings.
/// Writes go through a temporary file and a rename.
#[derive(Debug)]
pub struct PreferenceVersionStore {
    path: PathBuf,
    entries: BTreeMap<String, Value>,
}

impl PreferenceVersionStore {
    /// Open the preference file, treating a missing file as empty
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let entries = if path.exists() {
            let content = fs::read_to_string(&path).map_err(|e| AssetDbError::io(&path, e))?;
            if content.trim().is_empty() {
                BTreeMap::new()
            } else {
                serde_json::from_str(&content).map_err(|e| AssetDbError::Preferences {
                    path: path.clone(),
                    message: format!("invalid preference file: {}", e),
                })?
            }
        } else {
            BTreeMap::new()
        };

        Ok(Self { path, entries })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self, entries: &BTreeMap<String, Value>) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|e| AssetDbError::io(parent, e))?;
            }
        }

        let content = serde_json::to_string_pretty(entries).map_err(|e| {
            AssetDbError::Preferences {
                path: self.path.clone(),
                message: format!("failed to serialize preferences: {}", e),
            }
        })?;

        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, content).map_err(|e| AssetDbError::io(&tmp, e))?;
        fs::rename(&tmp, &self.path).map_err(|e| AssetDbError::io(&self.path, e))?;
        Ok(())
    }
}

impl VersionStore for PreferenceVersionStore {
    fn get(&self) -> Result<u32> {
        match self.entries.get(VERSION_MARKER_KEY) {
            None => Ok(0),
            Some(value) => value
                .as_u64()
                .and_then(|v| u32::try_from(v).ok())
                .ok_or_else(|| AssetDbError::Preferences {
                    path: self.path.clone(),
                    message: format!("'{}' is not a version number: {}", VERSION_MARKER_KEY, value),
                }),
        }
    }

    fn set(&mut self, version: u32) -> Result<()> {
        // only keep the new marker once it is on disk
        let mut entries = self.entries.clone();
        entries.insert(VERSION_MARKER_KEY.to_string(), Value::from(version));
        self.persist(&entries)?;
        self.entries = entries;
        debug!("Recorded {}={} in {:?}", VERSION_MARKER_KEY, version, self.path);
        Ok(())
    }
}
