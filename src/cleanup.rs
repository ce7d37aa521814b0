use log::debug;
use std::path::{Path, PathBuf};

use anyhow::Result;

use crate::runtime::Runtime;

/// Private scratch paths owned by one operation.
///
/// Every directory created through [`ScratchDirs::create`] or path tracked
/// with [`ScratchDirs::add`] is removed when the guard is dropped, unless it
/// was released with [`ScratchDirs::keep`]. Removal is best effort: failures
/// are logged and otherwise ignored.
pub struct ScratchDirs<'a, R: Runtime> {
    runtime: &'a R,
    paths: Vec<PathBuf>,
}

impl<'a, R: Runtime> ScratchDirs<'a, R> {
    pub fn new(runtime: &'a R) -> Self {
        Self {
            runtime,
            paths: Vec::new(),
        }
    }

    /// Create a fresh directory under the system temp dir and track it.
    pub fn create(&mut self, prefix: &str) -> Result<PathBuf> {
        let path = self.runtime.create_temp_dir(prefix)?;
        debug!("Created scratch directory {:?}", path);
        self.paths.push(path.clone());
        Ok(path)
    }

    /// Track an existing path for removal.
    pub fn add(&mut self, path: PathBuf) {
        self.paths.push(path);
    }

    /// Stop tracking a path, leaving it in place.
    pub fn keep(&mut self, path: &Path) {
        self.paths.retain(|p| p != path);
    }

    /// Remove all tracked paths now.
    pub fn cleanup(&mut self) {
        for path in self.paths.drain(..) {
            debug!("Cleaning up: {:?}", path);
            let result = if self.runtime.is_dir(&path) {
                self.runtime.remove_dir_all(&path)
            } else if self.runtime.exists(&path) {
                self.runtime.remove_file(&path)
            } else {
                Ok(())
            };
            if let Err(e) = result {
                debug!("Failed to clean up {:?}: {}", path, e);
            }
        }
    }
}

impl<R: Runtime> Drop for ScratchDirs<'_, R> {
    fn drop(&mut self) {
        self.cleanup();
    }
}
