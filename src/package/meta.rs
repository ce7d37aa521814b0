use anyhow::{Context, Result};
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};
use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;

use crate::runtime::Runtime;

static NAME_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([a-z][a-z0-9\-_]*[a-z0-9]|[a-z])$").expect("name pattern is a valid regex")
});

/// Extension of metadata records, both inside a dap and in the install root.
pub const META_EXT: &str = "yaml";

/// Accept a version written as a YAML string or a bare integer.
///
/// Unquoted decimals are refused: `1.10` would silently read back as `1.1`.
pub(crate) fn version_text<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    match serde_yaml::Value::deserialize(deserializer)? {
        serde_yaml::Value::String(s) => Ok(s),
        serde_yaml::Value::Number(n) if n.is_i64() || n.is_u64() => Ok(n.to_string()),
        serde_yaml::Value::Number(n) => Err(D::Error::custom(format!(
            "version {} must be quoted, e.g. version: '{}'",
            n, n
        ))),
        other => Err(D::Error::custom(format!(
            "expected a version string, found {:?}",
            other
        ))),
    }
}

/// Check a package name against the dap naming rules.
pub fn is_valid_name(name: &str) -> bool {
    NAME_PATTERN.is_match(name)
}

/// Metadata carried by a dap archive (`<name>-<version>/meta.yaml`).
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct DapMeta {
    pub package_name: String,
    #[serde(deserialize_with = "version_text")]
    pub version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub license: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dependencies: Option<Vec<String>>,
}

impl DapMeta {
    pub fn from_yaml(content: &str) -> Result<Self> {
        serde_yaml::from_str(content).context("Failed to parse dap metadata")
    }

    /// Name of the single top-level directory inside the archive.
    pub fn dir_name(&self) -> String {
        format!("{}-{}", self.package_name, self.version)
    }
}

/// The record kept at `<root>/meta/<name>.yaml` for an installed dap.
///
/// It is the archive's `meta.yaml` moved into place; only the keys the
/// client relies on are read.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct InstalledRecord {
    #[serde(deserialize_with = "version_text")]
    pub version: String,
    #[serde(default)]
    pub dependencies: Option<Vec<String>>,
}

impl InstalledRecord {
    #[tracing::instrument(skip(runtime, path))]
    pub fn load<R: Runtime>(runtime: &R, path: &Path) -> Result<Self> {
        let content = runtime.read_to_string(path)?;
        serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse installed metadata {:?}", path))
    }
}
