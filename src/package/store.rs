//! Read access to the daps installed under an install root.
//!
//! Nothing is cached: every call looks at the filesystem again, so the store
//! always reflects the last completed install or uninstall.

use anyhow::Result;
use log::debug;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use crate::error::DapError;
use crate::runtime::Runtime;

use super::{InstalledRecord, META_EXT, Manifest};

/// Directory under the install root holding one metadata record per dap.
pub const META_DIR: &str = "meta";

const MANIFEST_SUFFIX: &str = ".manifest.json";

/// An installed dap as recorded in `<root>/meta/<name>.yaml`.
#[derive(Debug, Clone, PartialEq)]
pub struct InstalledPackage {
    pub name: String,
    pub version: String,
    pub dependencies: Vec<String>,
}

pub struct InstallStateStore<'a, R: Runtime> {
    runtime: &'a R,
    root: PathBuf,
}

impl<'a, R: Runtime> InstallStateStore<'a, R> {
    pub fn new(runtime: &'a R, root: PathBuf) -> Self {
        Self { runtime, root }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Returns: `<root>/meta`
    pub fn meta_dir(&self) -> PathBuf {
        self.root.join(META_DIR)
    }

    /// Returns: `<root>/meta/<name>.yaml`
    pub fn meta_path(&self, name: &str) -> PathBuf {
        self.meta_dir().join(format!("{}.{}", name, META_EXT))
    }

    /// Returns: `<root>/meta/<name>.manifest.json`
    pub fn manifest_path(&self, name: &str) -> PathBuf {
        self.meta_dir().join(format!("{}{}", name, MANIFEST_SUFFIX))
    }

    pub fn is_installed(&self, name: &str) -> bool {
        self.runtime.is_file(&self.meta_path(name))
    }

    /// Names of all installed daps, sorted.
    #[tracing::instrument(skip(self))]
    pub fn installed_names(&self) -> Result<BTreeSet<String>> {
        let mut names = BTreeSet::new();
        let meta_dir = self.meta_dir();
        if !self.runtime.is_dir(&meta_dir) {
            return Ok(names);
        }

        for path in self.runtime.read_dir(&meta_dir)? {
            if path.extension().and_then(|e| e.to_str()) != Some(META_EXT) {
                continue;
            }
            let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            if stem.starts_with('.') || !self.runtime.is_file(&path) {
                continue;
            }
            names.insert(stem.to_string());
        }

        debug!("Found {} installed daps in {:?}", names.len(), self.root);
        Ok(names)
    }

    /// Load the record of an installed dap, or `None` if it is not installed.
    #[tracing::instrument(skip(self))]
    pub fn load(&self, name: &str) -> Result<Option<InstalledPackage>> {
        let path = self.meta_path(name);
        if !self.runtime.is_file(&path) {
            return Ok(None);
        }
        let record = InstalledRecord::load(self.runtime, &path)?;
        Ok(Some(InstalledPackage {
            name: name.to_string(),
            version: record.version,
            dependencies: record.dependencies.unwrap_or_default(),
        }))
    }

    pub fn load_required(&self, name: &str) -> Result<InstalledPackage> {
        self.load(name)?.ok_or_else(|| {
            DapError::NotInstalled {
                name: name.to_string(),
                root: self.root.clone(),
            }
            .into()
        })
    }

    pub fn installed_version_of(&self, name: &str) -> Result<Option<String>> {
        Ok(self.load(name)?.map(|p| p.version))
    }

    /// Dependency constraints recorded for an installed dap.
    pub fn dependencies_of(&self, name: &str) -> Result<Vec<String>> {
        Ok(self.load_required(name)?.dependencies)
    }

    /// Every installed dap, sorted by name.
    pub fn list(&self) -> Result<Vec<InstalledPackage>> {
        let mut packages = Vec::new();
        for name in self.installed_names()? {
            if let Some(package) = self.load(&name)? {
                packages.push(package);
            }
        }
        Ok(packages)
    }

    /// The manifest written when the dap was installed, if there is one.
    pub fn load_manifest(&self, name: &str) -> Result<Option<Manifest>> {
        let path = self.manifest_path(name);
        if !self.runtime.is_file(&path) {
            return Ok(None);
        }
        Manifest::load(self.runtime, &path).map(Some)
    }

    pub fn save_manifest(&self, name: &str, manifest: &Manifest) -> Result<()> {
        let meta_dir = self.meta_dir();
        if !self.runtime.is_dir(&meta_dir) {
            self.runtime.create_dir_all(&meta_dir)?;
        }
        manifest.save(self.runtime, &self.manifest_path(name))
    }
}
