//! File-backed saved state, surviving process restarts.

use super::saved::SavedState;
use crate::error::{BillingError, Result};
use fs2::FileExt;
use std::fs::{self, File, OpenOptions};
use std::io::{ErrorKind, Read, Write};
use std::path::{Path, PathBuf};
use tracing::debug;

/// A saved state stored at a fixed path.
#[derive(Clone, Debug)]
pub struct StateFile {
    path: PathBuf,
}

impl StateFile {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write `state`, replacing the previous contents.
    ///
    /// Fails with [`BillingError::Locked`] if another writer holds the file.
    pub fn save(&self, state: &SavedState) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        let encoded = state.encode()?;

        let mut file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(false)
            .open(&self.path)?;
        file.try_lock_exclusive().map_err(|_| BillingError::Locked)?;

        // Truncate only once the lock is held
        file.set_len(0)?;
        file.write_all(&encoded)?;
        file.sync_all()?;
        FileExt::unlock(&file)?;

        debug!(path = %self.path.display(), bytes = encoded.len(), "Saved state written");
        Ok(())
    }

    /// Read the saved state. A missing file yields `None`.
    pub fn load(&self) -> Result<Option<SavedState>> {
        let mut file = match File::open(&self.path) {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        FileExt::lock_shared(&file)?;
        let mut bytes = Vec::new();
        let read = file.read_to_end(&mut bytes);
        FileExt::unlock(&file)?;
        read?;

        SavedState::decode(&bytes).map(Some)
    }

    /// Remove the file if present.
    pub fn clear(&self) -> Result<()> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
