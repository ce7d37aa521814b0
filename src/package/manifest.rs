use anyhow::{Context, Result};
use log::warn;
use serde::{Deserialize, Serialize};
use std::path::{Component, Path, PathBuf};

use crate::runtime::Runtime;

/// Files written and directories created by one merge into the install root.
///
/// Paths are relative to the install root. `dirs` is in creation order, so
/// pruning walks it backwards to reach children before their parents.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct Manifest {
    #[serde(default)]
    pub files: Vec<PathBuf>,
    #[serde(default)]
    pub dirs: Vec<PathBuf>,
}

impl Manifest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_file(&mut self, relative: PathBuf) {
        if !self.files.contains(&relative) {
            self.files.push(relative);
        }
    }

    pub fn record_dir(&mut self, relative: PathBuf) {
        if !self.dirs.contains(&relative) {
            self.dirs.push(relative);
        }
    }

    #[tracing::instrument(skip(runtime))]
    pub fn load<R: Runtime>(runtime: &R, path: &Path) -> Result<Self> {
        let content = runtime.read_to_string(path)?;
        let mut manifest: Self = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse install manifest {:?}", path))?;

        for list in [&mut manifest.files, &mut manifest.dirs] {
            list.retain(|entry| {
                let inside = is_inside_root(entry);
                if !inside {
                    warn!("Ignoring {:?} in {:?}: not inside the install root", entry, path);
                }
                inside
            });
        }
        Ok(manifest)
    }

    #[tracing::instrument(skip(self, runtime))]
    pub fn save<R: Runtime>(&self, runtime: &R, path: &Path) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        runtime
            .write(path, content.as_bytes())
            .with_context(|| format!("Failed to save install manifest to {:?}", path))
    }
}

/// Relative paths made only of normal components.
fn is_inside_root(relative: &Path) -> bool {
    relative.components().next().is_some()
        && relative
            .components()
            .all(|c| matches!(c, Component::Normal(_)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::MockRuntime;
    use mockall::predicate::eq;

    #[test]
    fn test_record_skips_duplicates() {
        let mut manifest = Manifest::new();
        manifest.record_file("doc/foo.yaml".into());
        manifest.record_file("doc/foo.yaml".into());
        manifest.record_dir("doc".into());
        manifest.record_dir("doc".into());
        assert_eq!(manifest.files.len(), 1);
        assert_eq!(manifest.dirs.len(), 1);
    }

    #[test]
    fn test_load_and_save() {
        let path = PathBuf::from("/root/meta/foo.manifest.json");
        let mut manifest = Manifest::new();
        manifest.record_file("files/crt/foo.txt".into());
        manifest.record_dir("files/crt".into());
        let saved = serde_json::to_string_pretty(&manifest).unwrap();

        let mut runtime = MockRuntime::new();
        runtime
            .expect_write()
            .withf(move |p, c| p == Path::new("/root/meta/foo.manifest.json") && c == saved.as_bytes())
            .returning(|_, _| Ok(()));
        let content = serde_json::to_string(&manifest).unwrap();
        runtime
            .expect_read_to_string()
            .with(eq(path.clone()))
            .returning(move |_| Ok(content.clone()));

        manifest.save(&runtime, &path).unwrap();
        assert_eq!(Manifest::load(&runtime, &path).unwrap(), manifest);
    }

    #[test]
    fn test_load_tolerates_missing_keys() {
        let mut runtime = MockRuntime::new();
        runtime
            .expect_read_to_string()
            .returning(|_| Ok(r#"{"files": ["doc/foo.yaml"]}"#.into()));

        let manifest = Manifest::load(&runtime, Path::new("/m.json")).unwrap();
        assert_eq!(manifest.files, vec![PathBuf::from("doc/foo.yaml")]);
        assert!(manifest.dirs.is_empty());
    }

    #[test]
    fn test_load_drops_entries_outside_root() {
        let mut runtime = MockRuntime::new();
        runtime.expect_read_to_string().returning(|_| {
            Ok(r#"{"files": ["doc/foo.yaml", "/etc/passwd", "doc/../../x", ""], "dirs": ["doc", ".."]}"#.into())
        });

        let manifest = Manifest::load(&runtime, Path::new("/m.json")).unwrap();
        assert_eq!(manifest.files, vec![PathBuf::from("doc/foo.yaml")]);
        assert_eq!(manifest.dirs, vec![PathBuf::from("doc")]);
    }
}
