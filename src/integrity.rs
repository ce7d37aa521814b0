//! SHA-256 verification of downloaded artifacts.

use anyhow::{Context, Result};
use log::{debug, warn};
use sha2::{Digest, Sha256};
use std::io::Read;
use std::path::Path;

use crate::error::DapError;
use crate::runtime::Runtime;

/// Hex encoded SHA-256 of a file, read in 64KB chunks.
pub fn sha256_file<R: Runtime>(runtime: &R, path: &Path) -> Result<String> {
    let mut reader = runtime.open(path)?;
    let mut hasher = Sha256::new();
    let mut buffer = [0u8; 65536];

    loop {
        let read = reader
            .read(&mut buffer)
            .with_context(|| format!("Failed to read {:?} for hashing", path))?;
        if read == 0 {
            break;
        }
        hasher.update(&buffer[..read]);
    }

    Ok(hex::encode(hasher.finalize()))
}

/// Check `path` against the `expected` hex digest.
///
/// On a mismatch the file is deleted and [`DapError::IntegrityError`] is
/// returned with both digests. A matching file is left untouched.
#[tracing::instrument(skip(runtime))]
pub fn verify_sha256<R: Runtime>(runtime: &R, expected: &str, path: &Path) -> Result<()> {
    let actual = sha256_file(runtime, path)?;

    if actual.eq_ignore_ascii_case(expected.trim()) {
        debug!("Checksum of {:?} matches {}", path, actual);
        return Ok(());
    }

    warn!("Checksum mismatch for {:?}, removing it", path);
    if let Err(e) = runtime.remove_file(path) {
        warn!("Failed to remove {:?}: {}", path, e);
    }
    Err(DapError::IntegrityError {
        expected: expected.to_string(),
        actual,
    }
    .into())
}
