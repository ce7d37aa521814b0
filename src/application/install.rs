//! Install use case - orchestrates fetching a dap and merging it into the
//! install root.
//!
//! The flow per invocation:
//! - resolve the release in the catalog
//! - guard against reinstalling, missing packages and version regressions
//! - download into a scratch directory and verify its SHA-256
//! - self-check and extract the archive into a second scratch directory
//! - when updating, stash the installed version
//! - merge into the install root, recording a manifest
//!
//! Nothing in the install root changes before the merge step. A failed merge
//! removes what it wrote and puts a stashed version back.

use std::path::{Path, PathBuf};

use anyhow::Result;
use log::{debug, info, warn};

use crate::archive::{ArchiveOpener, META_FILE};
use crate::catalog::{self, Catalog, Release};
use crate::cleanup::ScratchDirs;
use crate::download::Downloader;
use crate::error::DapError;
use crate::integrity::verify_sha256;
use crate::package::{DapVersion, InstallStateStore, META_DIR, META_EXT, Manifest};
use crate::runtime::Runtime;

use super::Uninstaller;

/// Outcome of a successful install or update.
#[derive(Debug, Clone, PartialEq)]
pub struct Installed {
    pub name: String,
    pub version: String,
    /// Version that was replaced, for updates.
    pub previous: Option<String>,
}

pub struct Installer<'a, R: Runtime> {
    runtime: &'a R,
    catalog: &'a dyn Catalog,
    downloader: &'a dyn Downloader,
    opener: &'a dyn ArchiveOpener,
    store: InstallStateStore<'a, R>,
    uninstaller: Uninstaller<'a, R>,
}

impl<'a, R: Runtime> Installer<'a, R> {
    pub fn new(
        runtime: &'a R,
        catalog: &'a dyn Catalog,
        downloader: &'a dyn Downloader,
        opener: &'a dyn ArchiveOpener,
        install_root: PathBuf,
    ) -> Self {
        Self {
            runtime,
            catalog,
            downloader,
            opener,
            store: InstallStateStore::new(runtime, install_root.clone()),
            uninstaller: Uninstaller::new(runtime, install_root),
        }
    }

    /// Install `name` from the catalog, or update it when `update` is set.
    ///
    /// Without a version the latest stable release is used, falling back to
    /// the latest one.
    #[tracing::instrument(skip(self))]
    pub async fn install(&self, name: &str, version: Option<&str>, update: bool) -> Result<Installed> {
        let release = catalog::resolve(self.catalog, name, version).await?;
        let available = DapVersion::parse(&release.version)?;
        self.guard(name, &available, update)?;

        let mut scratch = ScratchDirs::new(self.runtime);
        let download_dir = scratch.create("dapi-download-")?;
        let artifact = self.fetch(name, &release, &download_dir).await?;

        self.deploy(&mut scratch, &artifact, Some(name), update)
    }

    /// Install a local `.dap` file. No catalog lookup and no checksum.
    #[tracing::instrument(skip(self))]
    pub fn install_from_path(&self, path: &Path, update: bool) -> Result<Installed> {
        let mut scratch = ScratchDirs::new(self.runtime);
        self.deploy(&mut scratch, path, None, update)
    }

    /// Download and verify a release into `dir` without installing it.
    #[tracing::instrument(skip(self))]
    pub async fn download(&self, name: &str, version: Option<&str>, dir: &Path) -> Result<PathBuf> {
        let release = catalog::resolve(self.catalog, name, version).await?;
        if !self.runtime.is_dir(dir) {
            self.runtime.create_dir_all(dir)?;
        }
        self.fetch(name, &release, dir).await
    }

    async fn fetch(&self, name: &str, release: &Release, dir: &Path) -> Result<PathBuf> {
        let not_installable = |missing| DapError::NotInstallable {
            name: name.to_string(),
            version: release.version.clone(),
            missing,
        };
        let url = release
            .download
            .as_deref()
            .ok_or_else(|| not_installable("download URL"))?;
        let digest = release
            .sha256sum
            .as_deref()
            .ok_or_else(|| not_installable("sha256sum"))?;

        let artifact = dir.join(artifact_file_name(url, name, &release.version));
        let mut partial = ScratchDirs::new(self.runtime);
        partial.add(artifact.clone());
        self.downloader.download(url, &artifact).await?;
        verify_sha256(self.runtime, digest, &artifact)?;
        partial.keep(&artifact);

        debug!("Downloaded and verified {:?}", artifact);
        Ok(artifact)
    }

    /// Checks that must pass before the install root is touched.
    fn guard(&self, name: &str, available: &DapVersion, update: bool) -> Result<()> {
        let current = self.store.installed_version_of(name)?;

        match (current, update) {
            (Some(_), false) => {
                return Err(DapError::AlreadyInstalled {
                    name: name.to_string(),
                }
                .into());
            }
            (None, true) => {
                return Err(DapError::NotInstalled {
                    name: name.to_string(),
                    root: self.store.root().to_path_buf(),
                }
                .into());
            }
            (Some(current), true) => {
                let installed = DapVersion::parse(&current)?;
                if *available == installed {
                    return Err(DapError::AlreadySame {
                        name: name.to_string(),
                        current,
                    }
                    .into());
                }
                if *available < installed {
                    return Err(DapError::VersionRegression {
                        name: name.to_string(),
                        current,
                        available: available.to_string(),
                    }
                    .into());
                }
            }
            (None, false) => {}
        }

        let root = self.store.root();
        if self.runtime.exists(root) && !self.runtime.is_dir(root) {
            return Err(DapError::InstallRootIsFile {
                root: root.to_path_buf(),
            }
            .into());
        }
        Ok(())
    }

    fn deploy(
        &self,
        scratch: &mut ScratchDirs<'_, R>,
        artifact: &Path,
        expected_name: Option<&str>,
        update: bool,
    ) -> Result<Installed> {
        let label = expected_name
            .map(str::to_string)
            .or_else(|| artifact.file_stem().map(|s| s.to_string_lossy().into_owned()))
            .unwrap_or_default();

        let archive = self
            .opener
            .open(self.runtime, artifact)
            .map_err(|e| DapError::PackageInvalid {
                name: label.clone(),
                reason: format!("{:#}", e),
            })?;
        let meta = archive.meta().clone();
        let name = meta.package_name.clone();

        if let Some(expected) = expected_name
            && expected != name
        {
            return Err(DapError::PackageInvalid {
                name: label,
                reason: format!("the archive contains {}", name),
            }
            .into());
        }

        let problems = archive.problems();
        if !problems.is_empty() {
            return Err(DapError::PackageInvalid {
                name,
                reason: problems.join("; "),
            }
            .into());
        }

        let version = DapVersion::parse(&meta.version)?;
        self.guard(&name, &version, update)?;

        let staging = scratch.create("dapi-staging-")?;
        let package_dir = archive.extract(self.runtime, &staging)?;

        let previous = if update {
            self.store.installed_version_of(&name)?
        } else {
            None
        };
        let stash = if update {
            Some(self.uninstaller.stash(&name)?)
        } else {
            None
        };

        let mut manifest = Manifest::new();
        let merged = self
            .merge(&package_dir, &name, &mut manifest)
            .and_then(|_| self.store.save_manifest(&name, &manifest));

        if let Err(e) = merged {
            warn!("Installing {} failed, rolling back", name);
            self.rollback(&name, &manifest);
            if let Some(stash) = stash
                && let Err(restore_err) = self.uninstaller.restore(stash)
            {
                warn!("Failed to restore the previous version of {}: {}", name, restore_err);
            }
            return Err(e);
        }

        if let Some(stash) = stash {
            self.uninstaller.discard(stash);
        }

        info!("Installed {}-{}", name, meta.version);
        Ok(Installed {
            name,
            version: meta.version,
            previous,
        })
    }

    /// Move the extracted metadata into place and copy every top-level entry
    /// of `package_dir` into the install root.
    fn merge(&self, package_dir: &Path, name: &str, manifest: &mut Manifest) -> Result<()> {
        let root = self.store.root();
        if !self.runtime.is_dir(root) {
            self.runtime.create_dir_all(root)?;
        }

        let staged_meta_dir = package_dir.join(META_DIR);
        self.runtime.create_dir_all(&staged_meta_dir)?;
        self.runtime.rename(
            &package_dir.join(META_FILE),
            &staged_meta_dir.join(format!("{}.{}", name, META_EXT)),
        )?;

        let mut entries = self.runtime.read_dir(package_dir)?;
        entries.sort();
        for entry in entries {
            let Some(file_name) = entry.file_name() else {
                continue;
            };
            let relative = PathBuf::from(file_name);
            self.copy_tree(&entry, &root.join(&relative), relative, manifest)?;
        }
        Ok(())
    }

    fn copy_tree(
        &self,
        src: &Path,
        dst: &Path,
        relative: PathBuf,
        manifest: &mut Manifest,
    ) -> Result<()> {
        if self.runtime.is_dir(src) {
            if !self.runtime.is_dir(dst) {
                self.runtime.create_dir_all(dst)?;
                manifest.record_dir(relative.clone());
            }
            let mut children = self.runtime.read_dir(src)?;
            children.sort();
            for child in children {
                let Some(file_name) = child.file_name() else {
                    continue;
                };
                self.copy_tree(
                    &child,
                    &dst.join(file_name),
                    relative.join(file_name),
                    manifest,
                )?;
            }
        } else {
            self.runtime.copy(src, dst)?;
            manifest.record_file(relative);
        }
        Ok(())
    }

    /// Best-effort removal of whatever a failed merge wrote.
    fn rollback(&self, name: &str, manifest: &Manifest) {
        let root = self.store.root();
        for file in manifest.files.iter().rev() {
            if let Err(e) = self.runtime.remove_file(&root.join(file)) {
                debug!("Rollback could not remove {:?}: {}", file, e);
            }
        }
        let manifest_path = self.store.manifest_path(name);
        if self.runtime.exists(&manifest_path) {
            let _ = self.runtime.remove_file(&manifest_path);
        }
        let dirs: Vec<PathBuf> = manifest.dirs.iter().rev().map(|d| root.join(d)).collect();
        self.uninstaller.prune(&dirs);
    }
}

/// Last path segment of the download URL, or `<name>-<version>.dap`.
fn artifact_file_name(url: &str, name: &str, version: &str) -> String {
    let path = url.split(['?', '#']).next().unwrap_or_default();
    match path.rsplit('/').next() {
        Some(segment) if !segment.is_empty() => segment.to_string(),
        _ => format!("{}-{}.dap", name, version),
    }
}
