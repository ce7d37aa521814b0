//! Exclusive lock serializing mutating commands against one install root.
//!
//! The lock file is a sibling of the install root (`<root>.lock`), so taking
//! the lock never creates anything inside the root itself. It is held with
//! `flock(LOCK_EX)` until the guard is dropped.

use anyhow::{Context, Result};
use fs2::FileExt;
use log::{debug, info, warn};
use std::fs::{self, File, OpenOptions};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

pub struct InstallLock {
    file: File,
    path: PathBuf,
}

/// Returns: `<parent>/<root name>.lock`
pub fn lock_path(root: &Path) -> PathBuf {
    match root.file_name() {
        Some(name) => {
            let mut file_name = name.to_os_string();
            file_name.push(".lock");
            root.with_file_name(file_name)
        }
        None => root.join(".dapi.lock"),
    }
}

impl InstallLock {
    /// Take the lock for `root`, waiting if another process holds it.
    pub fn acquire(root: &Path) -> Result<Self> {
        let path = lock_path(root);

        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory {:?}", parent))?;
        }

        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(&path)
            .with_context(|| format!("Failed to open lock file {:?}", path))?;

        match file.try_lock_exclusive() {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::WouldBlock => {
                warn!(
                    "Another dapi process is using {:?}, waiting for it to finish...",
                    root
                );
                file.lock_exclusive()
                    .with_context(|| format!("Failed to acquire install lock {:?}", path))?;
            }
            Err(e) => {
                return Err(e).with_context(|| format!("Failed to acquire install lock {:?}", path));
            }
        }

        debug!("Acquired install lock at {:?}", path);
        Ok(Self { file, path })
    }

    /// Take the lock only if it is free right now.
    #[cfg(test)]
    fn try_acquire(root: &Path) -> Result<Option<Self>> {
        let path = lock_path(root);
        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(&path)
            .with_context(|| format!("Failed to open lock file {:?}", path))?;

        match file.try_lock_exclusive() {
            Ok(()) => Ok(Some(Self { file, path })),
            Err(e) if e.kind() == ErrorKind::WouldBlock => Ok(None),
            Err(e) => Err(e).with_context(|| format!("Failed to acquire install lock {:?}", path)),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for InstallLock {
    fn drop(&mut self) {
        if let Err(e) = FileExt::unlock(&self.file) {
            warn!("Failed to release install lock {:?}: {}", self.path, e);
        } else {
            info!("Released install lock at {:?}", self.path);
        }
    }
}
