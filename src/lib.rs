pub mod application;
pub mod archive;
pub mod catalog;
pub mod cleanup;
pub mod commands;
pub mod download;
pub mod error;
pub mod http;
pub mod integrity;
pub mod lock;
pub mod package;
pub mod runtime;

/// Test utilities for cross-platform path handling and fixture archives.
#[cfg(test)]
pub mod test_utils {
    use crate::runtime::MockRuntime;
    use flate2::{Compression, write::GzEncoder};
    use mockall::predicate::eq;
    use sha2::{Digest, Sha256};
    use std::path::PathBuf;

    /// Returns the default install root for [`test_home`].
    /// - Unix: `/home/user/.devassistant`
    /// - Windows: `C:\Users\user\.devassistant`
    pub fn test_root() -> PathBuf {
        test_home().join(".devassistant")
    }

    /// Returns a test home directory path based on the platform.
    /// - Unix: `/home/user`
    /// - Windows: `C:\Users\user`
    pub fn test_home() -> PathBuf {
        #[cfg(not(windows))]
        {
            PathBuf::from("/home/user")
        }
        #[cfg(windows)]
        {
            PathBuf::from(r"C:\Users\user")
        }
    }

    /// Build a `.dap` (gzip compressed tarball) in memory.
    ///
    /// Paths ending with `/` become directories; everything else is a file
    /// with the given content.
    pub fn build_dap(entries: &[(&str, &str)]) -> Vec<u8> {
        let encoder = GzEncoder::new(Vec::new(), Compression::default());
        let mut builder = tar::Builder::new(encoder);

        for (path, content) in entries {
            let mut header = tar::Header::new_gnu();
            if path.ends_with('/') {
                header.set_entry_type(tar::EntryType::Directory);
                header.set_mode(0o755);
                header.set_size(0);
                header.set_cksum();
                builder
                    .append_data(&mut header, path, std::io::empty())
                    .unwrap();
            } else {
                header.set_entry_type(tar::EntryType::Regular);
                header.set_mode(0o644);
                header.set_size(content.len() as u64);
                header.set_cksum();
                builder
                    .append_data(&mut header, path, content.as_bytes())
                    .unwrap();
            }
        }

        builder.into_inner().unwrap().finish().unwrap()
    }

    /// Hex SHA-256 of `bytes`.
    pub fn sha256_hex(bytes: &[u8]) -> String {
        hex::encode(Sha256::digest(bytes))
    }

    /// Configure a mock runtime with common defaults for tests.
    /// - home dir set to [`test_home`]
    /// - DAPI_FAKE_DATA absent
    /// - not privileged
    pub fn configure_mock_runtime_basics(runtime: &mut MockRuntime) {
        runtime.expect_home_dir().returning(|| Some(test_home()));

        runtime
            .expect_env_var()
            .with(eq("DAPI_FAKE_DATA"))
            .returning(|_| Err(std::env::VarError::NotPresent));

        runtime.expect_is_privileged().returning(|| false);
    }
}
