//! Version gate deciding whether the bundled asset must be (re)installed

use tracing::info;

use super::version_store::VersionStore;
use crate::error::Result;

/// True exactly when the requested version is newer than the stored one
///
/// A missing marker reads as 0, so any valid version triggers the first
/// install. Requests at or below the stored version never fire.
pub fn should_reinstall(stored: u32, requested: u32) -> bool {
    requested > stored
}

/// Check-then-act sequence over a version store
///
/// The sequence is not atomic. Callers must serialize concurrent use.
pub struct VersionGate<'a> {
    store: &'a mut dyn VersionStore,
}

impl<'a> VersionGate<'a> {
    pub fn new(store: &'a mut dyn VersionStore) -> Self {
        Self { store }
    }

    /// Whether `requested` requires an install
    pub fn check(&self, requested: u32) -> Result<bool> {
        Ok(should_reinstall(self.store.get()?, requested))
    }

    /// Run `install` if the gate fires, then record `requested`
    ///
    /// The marker is only written after `install` succeeds. Returns `Some`
    /// with the install result when it ran, `None` when the gate stayed shut.
    pub fn ensure<T, F>(&mut self, requested: u32, install: F) -> Result<Option<T>>
    where
        F: FnOnce() -> Result<T>,
    {
        let stored = self.store.get()?;
        if !should_reinstall(stored, requested) {
            return Ok(None);
        }

        info!(
            "Installed asset version {} is older than {}, reinstalling",
            stored, requested
        );
        let installed = install()?;
        self.store.set(requested)?;
        Ok(Some(installed))
    }
}
