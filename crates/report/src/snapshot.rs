//! On-disk cache of rolled trees
//!
//! Building and rolling a tree over a large key space is the slow part of a
//! report, so the result is kept as a bincode blob at
//! `<dir>/<name>.<variant>.bin` until the caller asks for a regeneration.

use crate::rollup::RolledTree;
use keylens_core::{Error, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// Directory of report snapshots
#[derive(Debug, Clone)]
pub struct SnapshotCache {
    dir: PathBuf,
}

impl SnapshotCache {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// File backing the snapshot `name` of `variant`
    pub fn path(&self, name: &str, variant: &str) -> Result<PathBuf> {
        validate_name(name)?;
        Ok(self.dir.join(format!("{name}.{variant}.bin")))
    }

    /// Load a snapshot; `None` when absent or unreadable
    ///
    /// A blob that no longer decodes is treated as missing so that the next
    /// run rebuilds it.
    pub fn load<S: DeserializeOwned>(&self, name: &str, variant: &str) -> Result<Option<RolledTree<S>>> {
        let path = self.path(name, variant)?;
        let bytes = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(Error::file_system(&path, "read snapshot", e)),
        };

        match bincode::deserialize(&bytes) {
            Ok(rolled) => {
                tracing::debug!(path = %path.display(), "loaded report snapshot");
                Ok(Some(rolled))
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "discarding unreadable snapshot");
                Ok(None)
            }
        }
    }

    /// Write a snapshot, replacing any previous one
    pub fn save<S: Serialize>(&self, name: &str, variant: &str, rolled: &RolledTree<S>) -> Result<PathBuf> {
        let path = self.path(name, variant)?;
        fs::create_dir_all(&self.dir)
            .map_err(|e| Error::file_system(&self.dir, "create snapshot directory", e))?;

        let bytes = bincode::serialize(rolled)
            .map_err(|e| Error::snapshot(name, "encoded", e.to_string()))?;

        // Write then rename so a reader never sees a half-written blob
        let staging = path.with_extension("bin.tmp");
        fs::write(&staging, bytes).map_err(|e| Error::file_system(&staging, "write snapshot", e))?;
        fs::rename(&staging, &path).map_err(|e| Error::file_system(&path, "replace snapshot", e))?;

        tracing::debug!(path = %path.display(), "saved report snapshot");
        Ok(path)
    }

    /// Remove a snapshot; returns whether one existed
    pub fn invalidate(&self, name: &str, variant: &str) -> Result<bool> {
        let path = self.path(name, variant)?;
        match fs::remove_file(&path) {
            Ok(()) => {
                tracing::info!(path = %path.display(), "removed report snapshot");
                Ok(true)
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(Error::file_system(&path, "remove snapshot", e)),
        }
    }
}

fn validate_name(name: &str) -> Result<()> {
    let valid = !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_'));
    if valid {
        Ok(())
    } else {
        Err(Error::snapshot(
            name,
            "named",
            "names may only contain letters, digits, '-' and '_'",
        ))
    }
}
