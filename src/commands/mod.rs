//! CLI entry points. Each command resolves its [`config::Config`], builds
//! services and runs one use case.

mod browse;
pub mod config;
mod deps;
mod install;
mod list;
pub mod services;
mod show;
mod uninstall;

pub use browse::{daps, render_users, users};
pub use config::{Config, ConfigOverrides};
pub use deps::deps;
pub use install::{download, install, install_file, update};
pub use list::list;
pub use show::{render_detail, show};
pub use uninstall::uninstall;
