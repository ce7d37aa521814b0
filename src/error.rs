//! Failure kinds for catalog, install and uninstall operations.
//!
//! Every operation returns `anyhow::Result`; callers that need to react to a
//! specific kind use `err.downcast_ref::<DapError>()`.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DapError {
    #[error("{what} not found")]
    NotFound { what: String },

    #[error("{name} has no versions")]
    NoVersions { name: String },

    #[error("{name} is already installed, won't override it")]
    AlreadyInstalled { name: String },

    #[error("{name} is not installed in {}", root.display())]
    NotInstalled { name: String, root: PathBuf },

    #[error("Currently installed version {current} of {name} is the same as the available one")]
    AlreadySame { name: String, current: String },

    #[error("Currently installed version {current} of {name} is newer than available version {available}")]
    VersionRegression {
        name: String,
        current: String,
        available: String,
    },

    #[error("{} is a file, not a directory", root.display())]
    InstallRootIsFile { root: PathBuf },

    #[error("Downloaded file has incorrect sha256sum (expected: {expected}, downloaded: {actual})")]
    IntegrityError { expected: String, actual: String },

    #[error("The dap {name} has errors, won't install it: {reason}")]
    PackageInvalid { name: String, reason: String },

    #[error("Invalid dap version: '{version}'")]
    InvalidVersion { version: String },

    #[error("Release {name}-{version} has no {missing} and cannot be installed")]
    NotInstallable {
        name: String,
        version: String,
        missing: &'static str,
    },

    #[error("Operation cancelled by user")]
    ConfirmationDeclined,

    #[error("Response of the server was {status} for {url}")]
    UnexpectedStatus { status: u16, url: String },
}

impl DapError {
    /// Extract the failure kind from an `anyhow` chain, if there is one.
    pub fn of(err: &anyhow::Error) -> Option<&DapError> {
        err.chain().find_map(|e| e.downcast_ref::<DapError>())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Context;

    #[test]
    fn test_display_includes_both_digests() {
        let err = DapError::IntegrityError {
            expected: "aaa".into(),
            actual: "bbb".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("aaa"));
        assert!(msg.contains("bbb"));
    }

    #[test]
    fn test_unexpected_status_embeds_code() {
        let err = DapError::UnexpectedStatus {
            status: 500,
            url: "https://dapi.example/api/users/".into(),
        };
        assert!(err.to_string().contains("500"));
    }

    #[test]
    fn test_of_finds_kind_behind_context() {
        let err: anyhow::Error = Err::<(), _>(DapError::NoVersions { name: "foo".into() })
            .context("Failed to resolve foo")
            .unwrap_err();
        assert_eq!(
            DapError::of(&err),
            Some(&DapError::NoVersions { name: "foo".into() })
        );
    }

    #[test]
    fn test_of_returns_none_for_foreign_errors() {
        let err = anyhow::anyhow!("something else");
        assert!(DapError::of(&err).is_none());
    }
}
