//! Application layer - Use cases that coordinate the catalog, archives and
//! the install root.
//!
//! This layer sits between the CLI commands and the lower level modules.

mod install;
mod repository;
mod uninstall;

pub use install::{Installed, Installer};
pub use repository::{DependencyRepository, PackageDescriptor, RepositoryViewBuilder};
pub use uninstall::{RemovalPlan, Stash, Uninstaller};
