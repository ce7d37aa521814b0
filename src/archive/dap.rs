use crate::package::{DapMeta, is_valid_name, version};
use crate::runtime::Runtime;
use anyhow::{Context, Result, anyhow};
use flate2::read::GzDecoder;
use log::debug;
use std::io::{Read, Write};
use std::path::{Component, Path, PathBuf};
use tar::EntryType;

use super::{ArchiveOpener, DapArchive, META_FILE, PAYLOAD_DIRS};

#[derive(Debug, Clone, PartialEq)]
enum EntryKind {
    Dir,
    File,
    Other(String),
}

#[derive(Debug, Clone)]
struct Entry {
    path: PathBuf,
    kind: EntryKind,
    mode: Option<u32>,
    data: Vec<u8>,
}

/// A `.dap` file read into memory: a gzip compressed tarball whose entries
/// all live under `<name>-<version>/`.
#[derive(Debug)]
pub struct DapFile {
    meta: DapMeta,
    entries: Vec<Entry>,
}

impl DapFile {
    /// Parse a `.dap` from any reader.
    pub fn from_reader<T: Read>(reader: T) -> Result<Self> {
        let mut archive = tar::Archive::new(GzDecoder::new(reader));
        let mut entries = Vec::new();

        for entry in archive.entries().context("Failed to read dap archive")? {
            let mut entry = entry.context("Failed to read dap archive entry")?;
            let path = entry
                .path()
                .context("Invalid entry path in dap archive")?
                .into_owned();
            let mode = entry.header().mode().ok();

            let kind = match entry.header().entry_type() {
                EntryType::Directory => EntryKind::Dir,
                EntryType::Regular | EntryType::Continuous => EntryKind::File,
                other => EntryKind::Other(format!("{:?}", other)),
            };

            let mut data = Vec::new();
            if kind == EntryKind::File {
                entry
                    .read_to_end(&mut data)
                    .with_context(|| format!("Failed to read {:?} from dap archive", path))?;
            }

            entries.push(Entry {
                path,
                kind,
                mode,
                data,
            });
        }

        let meta_entry = entries
            .iter()
            .find(|e| {
                e.kind == EntryKind::File
                    && e.path.components().count() == 2
                    && e.path.file_name().is_some_and(|n| n == META_FILE)
            })
            .ok_or_else(|| anyhow!("The dap archive has no top-level {}", META_FILE))?;

        let content = std::str::from_utf8(&meta_entry.data)
            .with_context(|| format!("{} is not valid UTF-8", META_FILE))?;
        let meta = DapMeta::from_yaml(content)?;

        debug!(
            "Read dap {} with {} entries",
            meta.dir_name(),
            entries.len()
        );
        Ok(Self { meta, entries })
    }

    /// Top directory and the entry directly below it; `None` for a path that
    /// would escape the extraction directory.
    fn split(path: &Path) -> Option<(String, Option<String>)> {
        let mut normal = Vec::new();
        for component in path.components() {
            match component {
                Component::Normal(part) => normal.push(part.to_string_lossy().into_owned()),
                Component::CurDir => {}
                Component::ParentDir | Component::RootDir | Component::Prefix(_) => return None,
            }
        }
        let mut parts = normal.into_iter();
        let top = parts.next()?;
        Some((top, parts.next()))
    }

    fn depth(path: &Path) -> usize {
        path.components()
            .filter(|c| matches!(c, Component::Normal(_)))
            .count()
    }
}

impl DapArchive for DapFile {
    fn meta(&self) -> &DapMeta {
        &self.meta
    }

    fn problems(&self) -> Vec<String> {
        let mut problems = Vec::new();

        if !is_valid_name(&self.meta.package_name) {
            problems.push(format!(
                "package_name '{}' is not a valid dap name",
                self.meta.package_name
            ));
        }
        if !version::is_valid(&self.meta.version) {
            problems.push(format!(
                "version '{}' is not a valid dap version",
                self.meta.version
            ));
        }

        let top_dir = self.meta.dir_name();
        for entry in &self.entries {
            if let EntryKind::Other(kind) = &entry.kind {
                problems.push(format!("{:?} has unsupported type {}", entry.path, kind));
                continue;
            }
            match Self::split(&entry.path) {
                None => problems.push(format!("{:?} escapes the archive", entry.path)),
                Some((top, _)) if top != top_dir => problems.push(format!(
                    "{:?} is outside the top-level directory {}",
                    entry.path, top_dir
                )),
                Some((_, Some(child)))
                    if child != META_FILE && !PAYLOAD_DIRS.contains(&child.as_str()) =>
                {
                    problems.push(format!("{:?} is not an allowed top-level entry", entry.path))
                }
                Some((_, Some(child))) if child == META_FILE && entry.kind == EntryKind::Dir => {
                    problems.push(format!("{} must be a file", META_FILE))
                }
                Some((_, Some(child)))
                    if child != META_FILE
                        && entry.kind == EntryKind::File
                        && Self::depth(&entry.path) == 2 =>
                {
                    problems.push(format!("{} must be a directory", child))
                }
                _ => {}
            }
        }

        problems
    }

    #[tracing::instrument(skip(self, runtime))]
    fn extract(&self, runtime: &dyn Runtime, dest: &Path) -> Result<PathBuf> {
        debug!("Extracting {} to {:?}...", self.meta.dir_name(), dest);

        for entry in &self.entries {
            if Self::split(&entry.path).is_none() {
                return Err(anyhow!("Refusing to extract {:?}", entry.path));
            }
            let full_path = dest.join(&entry.path);
            match entry.kind {
                EntryKind::Dir => runtime.create_dir_all(&full_path)?,
                EntryKind::File => {
                    if let Some(parent) = full_path.parent() {
                        runtime.create_dir_all(parent)?;
                    }
                    let mut file = runtime.create_file(&full_path)?;
                    file.write_all(&entry.data)
                        .with_context(|| format!("Failed to extract file {:?}", full_path))?;
                    drop(file);

                    if let Some(mode) = entry.mode
                        && let Err(e) = runtime.set_permissions(&full_path, mode & 0o777)
                    {
                        debug!("Failed to set permissions on {:?}: {}", full_path, e);
                    }
                }
                EntryKind::Other(_) => debug!("Skipping {:?}", entry.path),
            }
        }

        Ok(dest.join(self.meta.dir_name()))
    }
}

/// Opens `.dap` files through the runtime.
#[derive(Debug, Default, Clone, Copy)]
pub struct DapOpener;

impl ArchiveOpener for DapOpener {
    #[tracing::instrument(skip(self, runtime))]
    fn open(&self, runtime: &dyn Runtime, path: &Path) -> Result<Box<dyn DapArchive>> {
        let reader = runtime
            .open(path)
            .with_context(|| format!("Failed to open archive at {:?}", path))?;
        let dap = DapFile::from_reader(reader)
            .with_context(|| format!("Failed to read dap {:?}", path))?;
        Ok(Box::new(dap))
    }
}
