//! Dap version parsing and ordering.
//!
//! A version is one or more dot separated non-negative integers without
//! leading zeros, optionally followed by a `dev`, `a` or `b` suffix
//! (`1`, `0.10.3`, `2.0dev`, `1.1b`).
//!
//! Ordering has one source of truth, [`compare`]. `PartialEq`, `Ord` and
//! `Hash` on [`DapVersion`] all go through the same normalized key, so
//! `1.0` and `1.0.0` are equal and hash identically.

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;

use crate::error::DapError;

static VERSION_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([0-9]|[1-9][0-9]*)(\.([0-9]|[1-9][0-9]*))*(dev|a|b)?$")
        .expect("version pattern is a valid regex")
});

/// Pre-release stage, ordered from least to most mature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
enum Stage {
    Dev,
    Alpha,
    Beta,
    Final,
}

/// A validated dap version.
#[derive(Debug, Clone)]
pub struct DapVersion {
    raw: String,
    /// Numeric components with trailing zeros removed.
    release: Vec<String>,
    stage: Stage,
}

impl DapVersion {
    /// Parse and validate a version string.
    pub fn parse(version: &str) -> Result<Self, DapError> {
        if !is_valid(version) {
            return Err(DapError::InvalidVersion {
                version: version.to_string(),
            });
        }

        let (numbers, stage) = if let Some(rest) = version.strip_suffix("dev") {
            (rest, Stage::Dev)
        } else if let Some(rest) = version.strip_suffix('a') {
            (rest, Stage::Alpha)
        } else if let Some(rest) = version.strip_suffix('b') {
            (rest, Stage::Beta)
        } else {
            (version, Stage::Final)
        };

        let mut release: Vec<String> = numbers.split('.').map(str::to_string).collect();
        while release.len() > 1 && release.last().is_some_and(|c| c == "0") {
            release.pop();
        }

        Ok(Self {
            raw: version.to_string(),
            release,
            stage,
        })
    }

    /// The version exactly as it was written.
    pub fn as_str(&self) -> &str {
        &self.raw
    }
}

/// Check a string against the version grammar without building a version.
pub fn is_valid(version: &str) -> bool {
    VERSION_PATTERN.is_match(version)
}

/// Total order over dap versions.
///
/// Numeric components compare as integers, missing trailing components
/// count as zero, and the suffix breaks ties: `dev` < `a` < `b` < none.
pub fn compare(a: &DapVersion, b: &DapVersion) -> Ordering {
    for (x, y) in a.release.iter().zip(&b.release) {
        let ord = compare_component(x, y);
        if ord != Ordering::Equal {
            return ord;
        }
    }
    a.release
        .len()
        .cmp(&b.release.len())
        .then(a.stage.cmp(&b.stage))
}

/// Compare two digit strings without leading zeros as integers of any size.
fn compare_component(x: &str, y: &str) -> Ordering {
    x.len().cmp(&y.len()).then_with(|| x.cmp(y))
}

impl PartialEq for DapVersion {
    fn eq(&self, other: &Self) -> bool {
        compare(self, other) == Ordering::Equal
    }
}

impl Eq for DapVersion {}

impl PartialOrd for DapVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for DapVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        compare(self, other)
    }
}

impl Hash for DapVersion {
    fn hash<H: Hasher>(&self, state: &mut H) {
        // Exactly the fields `compare` looks at, so equal versions hash equally.
        self.release.hash(state);
        self.stage.hash(state);
    }
}

impl fmt::Display for DapVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl FromStr for DapVersion {
    type Err = DapError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}
