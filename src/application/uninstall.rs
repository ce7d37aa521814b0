//! Uninstall use case - computes and removes the files owned by a dap.
//!
//! A dap owns every path matching its name:
//! - `{assistants,files,icons}/*/<name>.*` and `{assistants,files,icons}/*/<name>`
//! - `{snippets,doc}/<name>.yaml` and `{snippets,doc}/<name>`
//!
//! plus whatever the manifest written at install time lists.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use log::{debug, info, warn};

use crate::error::DapError;
use crate::package::{InstallStateStore, META_EXT};
use crate::runtime::Runtime;

/// Categories whose payload lives one directory level below the category.
const NESTED_CATEGORIES: [&str; 3] = ["assistants", "files", "icons"];
/// Categories whose payload lives directly in the category directory.
const FLAT_CATEGORIES: [&str; 2] = ["snippets", "doc"];

const STASH_PREFIX: &str = ".dapi-stash-";

/// Paths to delete for one dap, in deletion order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RemovalPlan {
    pub paths: Vec<PathBuf>,
    /// Directories to remove afterwards if they ended up empty.
    pub prune_dirs: Vec<PathBuf>,
}

/// An installed version moved aside during an update.
#[derive(Debug)]
pub struct Stash {
    dir: PathBuf,
    moved: Vec<(PathBuf, PathBuf)>,
    prune_dirs: Vec<PathBuf>,
}

pub struct Uninstaller<'a, R: Runtime> {
    runtime: &'a R,
    store: InstallStateStore<'a, R>,
}

impl<'a, R: Runtime> Uninstaller<'a, R> {
    pub fn new(runtime: &'a R, install_root: PathBuf) -> Self {
        Self {
            runtime,
            store: InstallStateStore::new(runtime, install_root),
        }
    }

    pub fn store(&self) -> &InstallStateStore<'a, R> {
        &self.store
    }

    /// Compute everything that belongs to `name`.
    #[tracing::instrument(skip(self))]
    pub fn removal_plan(&self, name: &str) -> Result<RemovalPlan> {
        if !self.store.is_installed(name) {
            return Err(DapError::NotInstalled {
                name: name.to_string(),
                root: self.store.root().to_path_buf(),
            }
            .into());
        }

        let root = self.store.root();
        let mut plan = RemovalPlan {
            paths: vec![self.store.meta_path(name)],
            prune_dirs: Vec::new(),
        };

        // Pattern matches come first so whole directories go before the
        // manifest files inside them.
        for path in self.pattern_matches(name)? {
            if !plan.paths.contains(&path) {
                plan.paths.push(path);
            }
        }

        if let Some(manifest) = self.store.load_manifest(name)? {
            debug!("Adding install manifest of {}", name);
            for file in &manifest.files {
                let path = root.join(file);
                if !plan.paths.contains(&path) && self.runtime.exists(&path) {
                    plan.paths.push(path);
                }
            }
            plan.paths.push(self.store.manifest_path(name));
            plan.prune_dirs = manifest.dirs.iter().rev().map(|d| root.join(d)).collect();
        }

        Ok(plan)
    }

    fn pattern_matches(&self, name: &str) -> Result<Vec<PathBuf>> {
        let root = self.store.root();
        let with_ext = glob::Pattern::new(&format!("{}.*", glob::Pattern::escape(name)))
            .context("Invalid dap name pattern")?;
        let mut found = Vec::new();

        for category in NESTED_CATEGORIES {
            let category_dir = root.join(category);
            if !self.runtime.is_dir(&category_dir) {
                continue;
            }
            for sub in self.sorted_entries(&category_dir)? {
                if is_hidden(&sub) || !self.runtime.is_dir(&sub) {
                    continue;
                }
                for entry in self.sorted_entries(&sub)? {
                    let Some(file_name) = entry.file_name().and_then(|n| n.to_str()) else {
                        continue;
                    };
                    if file_name == name || with_ext.matches(file_name) {
                        found.push(entry);
                    }
                }
            }
        }

        for category in FLAT_CATEGORIES {
            let category_dir = root.join(category);
            for candidate in [
                category_dir.join(format!("{}.{}", name, META_EXT)),
                category_dir.join(name),
            ] {
                if self.runtime.exists(&candidate) {
                    found.push(candidate);
                }
            }
        }

        Ok(found)
    }

    fn sorted_entries(&self, dir: &Path) -> Result<Vec<PathBuf>> {
        let mut entries = self.runtime.read_dir(dir)?;
        entries.sort();
        Ok(entries)
    }

    /// Remove `name`, asking first when `confirm` is set.
    ///
    /// Returns `false` if the user declined; nothing is removed then.
    #[tracing::instrument(skip(self))]
    pub fn uninstall(&self, name: &str, confirm: bool) -> Result<bool> {
        let plan = self.removal_plan(name)?;

        if confirm {
            println!("The following files and directories will be removed:");
            for path in &plan.paths {
                println!("    {}", path.display());
            }
            if !self.runtime.confirm("Is that OK?")? {
                println!("Aborting");
                return Ok(false);
            }
        }

        self.remove(&plan)?;
        info!("Uninstalled {}", name);
        Ok(true)
    }

    /// Delete every planned path, then prune emptied directories.
    pub fn remove(&self, plan: &RemovalPlan) -> Result<()> {
        for path in &plan.paths {
            if !self.runtime.exists(path) {
                continue;
            }
            debug!("Removing {:?}", path);
            if let Err(e) = self.runtime.remove_file(path) {
                if !self.runtime.is_dir(path) {
                    return Err(e);
                }
                self.runtime.remove_dir_all(path)?;
            }
        }
        self.prune(&plan.prune_dirs);
        Ok(())
    }

    /// Remove directories that are empty, in the given order.
    pub fn prune(&self, dirs: &[PathBuf]) {
        for dir in dirs {
            if !self.runtime.is_dir(dir) {
                continue;
            }
            match self.runtime.read_dir(dir) {
                Ok(entries) if entries.is_empty() => {
                    if let Err(e) = self.runtime.remove_dir(dir) {
                        debug!("Failed to prune {:?}: {}", dir, e);
                    }
                }
                _ => {}
            }
        }
    }

    /// Move the files of an installed dap into a private directory inside
    /// the install root, so they can be put back if the update fails.
    #[tracing::instrument(skip(self))]
    pub fn stash(&self, name: &str) -> Result<Stash> {
        let plan = self.removal_plan(name)?;
        let root = self.store.root();
        let dir = self.runtime.create_temp_dir_in(root, STASH_PREFIX)?;
        let mut stash = Stash {
            dir,
            moved: Vec::new(),
            prune_dirs: plan.prune_dirs.clone(),
        };

        for path in &plan.paths {
            if !self.runtime.exists(path) {
                continue;
            }
            let relative = match path.strip_prefix(root) {
                Ok(relative) => relative.to_path_buf(),
                Err(_) => PathBuf::from(path.file_name().unwrap_or_default()),
            };
            let target = stash.dir.join(&relative);

            let moved = target
                .parent()
                .map_or(Ok(()), |parent| self.runtime.create_dir_all(parent))
                .and_then(|_| self.runtime.rename(path, &target));
            if let Err(e) = moved {
                warn!("Failed to stash {:?}, putting back what was moved", path);
                self.restore(stash)?;
                return Err(e);
            }
            stash.moved.push((path.clone(), target));
        }

        self.prune(&plan.prune_dirs);
        debug!("Stashed {} paths of {} in {:?}", stash.moved.len(), name, stash.dir);
        Ok(stash)
    }

    /// Put stashed files back where they were.
    pub fn restore(&self, stash: Stash) -> Result<()> {
        for (original, stashed) in stash.moved.iter().rev() {
            if let Some(parent) = original.parent()
                && !self.runtime.is_dir(parent)
            {
                self.runtime.create_dir_all(parent)?;
            }
            self.runtime
                .rename(stashed, original)
                .with_context(|| format!("Failed to restore {:?}", original))?;
        }
        self.runtime.remove_dir_all(&stash.dir)?;
        Ok(())
    }

    /// Drop the stashed files for good.
    pub fn discard(&self, stash: Stash) {
        if let Err(e) = self.runtime.remove_dir_all(&stash.dir) {
            warn!("Failed to remove {:?}: {}", stash.dir, e);
        }
        self.prune(&stash.prune_dirs);
    }
}

fn is_hidden(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| n.starts_with('.'))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::package::Manifest;
    use crate::runtime::{MockRuntime, RealRuntime};
    use crate::test_utils::test_root;
    use mockall::predicate::eq;
    use std::fs;
    use tempfile::tempdir;

    fn touch(root: &Path, relative: &str) {
        let path = root.join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, relative).unwrap();
    }

    fn legacy_install(root: &Path) {
        touch(root, "meta/bar.yaml");
        touch(root, "meta/barista.yaml");
        touch(root, "assistants/crt/bar.yaml");
        touch(root, "assistants/crt/bar/sub.yaml");
        touch(root, "assistants/crt/barista.yaml");
        touch(root, "assistants/.hidden/bar.yaml");
        touch(root, "files/crt/bar/data.txt");
        touch(root, "icons/crt/bar.svg");
        touch(root, "snippets/bar.yaml");
        touch(root, "snippets/barista.yaml");
        touch(root, "doc/bar/README");
    }

    #[test]
    fn test_not_installed() {
        let dir = tempdir().unwrap();
        let runtime = RealRuntime;
        let uninstaller = Uninstaller::new(&runtime, dir.path().to_path_buf());

        let err = uninstaller.uninstall("bar", false).unwrap_err();
        assert_eq!(
            DapError::of(&err),
            Some(&DapError::NotInstalled {
                name: "bar".into(),
                root: dir.path().to_path_buf(),
            })
        );
    }

    #[test]
    fn test_pattern_plan() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        legacy_install(root);

        let runtime = RealRuntime;
        let uninstaller = Uninstaller::new(&runtime, root.to_path_buf());
        let plan = uninstaller.removal_plan("bar").unwrap();

        assert_eq!(
            plan.paths,
            vec![
                root.join("meta/bar.yaml"),
                root.join("assistants/crt/bar"),
                root.join("assistants/crt/bar.yaml"),
                root.join("files/crt/bar"),
                root.join("icons/crt/bar.svg"),
                root.join("snippets/bar.yaml"),
                root.join("doc/bar"),
            ]
        );
        assert!(plan.prune_dirs.is_empty());
    }

    #[test]
    fn test_uninstall_leaves_other_daps() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        legacy_install(root);

        let runtime = RealRuntime;
        let uninstaller = Uninstaller::new(&runtime, root.to_path_buf());
        assert!(uninstaller.uninstall("bar", false).unwrap());

        assert!(!uninstaller.store().is_installed("bar"));
        assert!(uninstaller.store().is_installed("barista"));
        assert!(!root.join("assistants/crt/bar").exists());
        assert!(!root.join("doc/bar").exists());
        assert!(root.join("assistants/crt/barista.yaml").exists());
        assert!(root.join("snippets/barista.yaml").exists());
        assert!(root.join("assistants/.hidden/bar.yaml").exists());
    }

    #[test_log::test]
    fn test_manifest_plan_and_pruning() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        touch(root, "meta/foo.yaml");
        touch(root, "files/foo/a.txt");
        touch(root, "doc/foo.yaml");
        touch(root, "doc/other.yaml");

        let runtime = RealRuntime;
        let uninstaller = Uninstaller::new(&runtime, root.to_path_buf());
        let mut manifest = Manifest::new();
        manifest.record_dir("files".into());
        manifest.record_dir("files/foo".into());
        manifest.record_file("files/foo/a.txt".into());
        manifest.record_file("files/foo/gone.txt".into());
        manifest.record_file("doc/foo.yaml".into());
        manifest.record_file("meta/foo.yaml".into());
        uninstaller.store().save_manifest("foo", &manifest).unwrap();

        let plan = uninstaller.removal_plan("foo").unwrap();
        assert_eq!(
            plan.paths,
            vec![
                root.join("meta/foo.yaml"),
                root.join("doc/foo.yaml"),
                root.join("files/foo/a.txt"),
                root.join("meta/foo.manifest.json"),
            ]
        );
        assert_eq!(plan.prune_dirs, vec![root.join("files/foo"), root.join("files")]);

        uninstaller.remove(&plan).unwrap();
        assert!(!root.join("files").exists());
        assert!(root.join("doc/other.yaml").exists());
        assert!(!root.join("meta/foo.manifest.json").exists());
    }

    #[test]
    fn test_declined_confirmation_removes_nothing() {
        let root = test_root();
        let mut runtime = MockRuntime::new();

        runtime
            .expect_is_file()
            .with(eq(root.join("meta").join("bar.yaml")))
            .returning(|_| true);
        runtime
            .expect_is_file()
            .with(eq(root.join("meta").join("bar.manifest.json")))
            .returning(|_| false);
        runtime.expect_is_dir().returning(|_| false);
        runtime
            .expect_exists()
            .with(eq(root.join("snippets").join("bar.yaml")))
            .returning(|_| true);
        runtime.expect_exists().returning(|_| false);
        runtime
            .expect_confirm()
            .with(eq("Is that OK?"))
            .times(1)
            .returning(|_| Ok(false));
        // No remove_* expectations: any deletion would panic.

        let uninstaller = Uninstaller::new(&runtime, root);
        assert!(!uninstaller.uninstall("bar", true).unwrap());
    }

    #[test]
    fn test_accepted_confirmation_removes() {
        let root = test_root();
        let meta = root.join("meta").join("bar.yaml");
        let mut runtime = MockRuntime::new();

        runtime
            .expect_is_file()
            .with(eq(meta.clone()))
            .returning(|_| true);
        runtime.expect_is_file().returning(|_| false);
        runtime.expect_is_dir().returning(|_| false);
        runtime
            .expect_exists()
            .with(eq(meta.clone()))
            .returning(|_| true);
        runtime.expect_exists().returning(|_| false);
        runtime.expect_confirm().returning(|_| Ok(true));
        runtime
            .expect_remove_file()
            .with(eq(meta))
            .times(1)
            .returning(|_| Ok(()));

        let uninstaller = Uninstaller::new(&runtime, root);
        assert!(uninstaller.uninstall("bar", true).unwrap());
    }

    #[test_log::test]
    fn test_stash_restore_and_discard() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        legacy_install(root);

        let runtime = RealRuntime;
        let uninstaller = Uninstaller::new(&runtime, root.to_path_buf());

        let stash = uninstaller.stash("bar").unwrap();
        assert!(!uninstaller.store().is_installed("bar"));
        assert!(!root.join("files/crt/bar").exists());
        assert!(uninstaller.store().is_installed("barista"));

        uninstaller.restore(stash).unwrap();
        assert!(uninstaller.store().is_installed("bar"));
        assert_eq!(
            fs::read_to_string(root.join("files/crt/bar/data.txt")).unwrap(),
            "files/crt/bar/data.txt"
        );

        let stash = uninstaller.stash("bar").unwrap();
        uninstaller.discard(stash);
        assert!(!uninstaller.store().is_installed("bar"));
        let leftovers: Vec<_> = fs::read_dir(root)
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().starts_with(STASH_PREFIX))
            .collect();
        assert!(leftovers.is_empty());
    }
}
