//! Package management module
//!
//! Dap metadata, version ordering, and read access to the daps installed
//! under an install root.

mod manifest;
mod meta;
mod store;
pub mod version;

pub use manifest::Manifest;
pub use meta::{DapMeta, InstalledRecord, META_EXT, is_valid_name};
pub(crate) use meta::version_text;
pub use store::{InstallStateStore, InstalledPackage, META_DIR};
pub use version::DapVersion;
