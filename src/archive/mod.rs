mod dap;

use crate::package::DapMeta;
use crate::runtime::Runtime;
use anyhow::Result;
use std::path::{Path, PathBuf};

pub use dap::{DapFile, DapOpener};

/// Top-level entries a dap may carry besides its metadata.
pub const PAYLOAD_DIRS: [&str; 5] = ["assistants", "files", "icons", "snippets", "doc"];

/// Name of the metadata file at the top of a dap.
pub const META_FILE: &str = "meta.yaml";

/// An opened package archive.
pub trait DapArchive: Send + Sync {
    /// Metadata read from the archive's `meta.yaml`.
    fn meta(&self) -> &DapMeta;

    /// Everything wrong with the archive; empty when it is installable.
    fn problems(&self) -> Vec<String>;

    fn self_check(&self) -> bool {
        self.problems().is_empty()
    }

    /// Extract into `dest`, returning the package directory
    /// (`<dest>/<name>-<version>`).
    fn extract(&self, runtime: &dyn Runtime, dest: &Path) -> Result<PathBuf>;
}

/// Opens archives from local paths.
pub trait ArchiveOpener: Send + Sync {
    fn open(&self, runtime: &dyn Runtime, path: &Path) -> Result<Box<dyn DapArchive>>;
}
