//! Working directory setup and ownership.
//!
//! Each extraction writes into `<bundle>-entitlements`. The directory is
//! wiped and recreated at the start of every attempt, and a process-wide
//! registry keeps two extractions from sharing it at the same time.

use crate::{Error, Result};
use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, OnceLock, PoisonError};

fn in_flight() -> &'static Mutex<HashSet<PathBuf>> {
    static IN_FLIGHT: OnceLock<Mutex<HashSet<PathBuf>>> = OnceLock::new();
    IN_FLIGHT.get_or_init(|| Mutex::new(HashSet::new()))
}

/// Exclusive claim on a working directory for the lifetime of one request.
///
/// Released when dropped.
#[derive(Debug)]
pub struct WorkdirLock {
    path: PathBuf,
}

impl WorkdirLock {
    /// Claim `path`, failing with [`Error::InProgress`] if another request holds it.
    pub fn acquire(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let mut held = in_flight().lock().unwrap_or_else(PoisonError::into_inner);
        if !held.insert(path.clone()) {
            return Err(Error::InProgress(path));
        }
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for WorkdirLock {
    fn drop(&mut self) {
        in_flight()
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.path);
    }
}

/// Delete `dir` if it exists and create it again, empty.
///
/// A missing directory is not an error. Any other removal failure is logged
/// and ignored; creation failure is fatal.
pub fn recreate_dir(dir: impl AsRef<Path>) -> Result<()> {
    recreate_with(dir.as_ref(), remove_dir)
}

fn recreate_with(dir: &Path, remove: impl FnOnce(&Path) -> Result<()>) -> Result<()> {
    if let Err(e) = remove(dir) {
        tracing::warn!(error = %e, "continuing with stale working directory");
    }

    fs::create_dir_all(dir).map_err(|source| Error::DirectoryCreate {
        path: dir.to_path_buf(),
        source,
    })?;

    tracing::debug!(dir = %dir.display(), "working directory ready");
    Ok(())
}

fn remove_dir(dir: &Path) -> Result<()> {
    let removed = match fs::symlink_metadata(dir) {
        Ok(meta) if meta.is_dir() => fs::remove_dir_all(dir),
        Ok(_) => fs::remove_file(dir),
        Err(e) => Err(e),
    };

    match removed {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(source) => Err(Error::DirectoryDelete {
            path: dir.to_path_buf(),
            source,
        }),
    }
}
