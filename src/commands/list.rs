use anyhow::Result;
use log::debug;

use crate::{package::InstallStateStore, runtime::Runtime};

use super::config::{Config, ConfigOverrides};

/// List all installed daps
#[tracing::instrument(skip(runtime, overrides))]
pub fn list<R: Runtime>(runtime: R, overrides: ConfigOverrides) -> Result<()> {
    let config = Config::load(&runtime, overrides)?;
    debug!("Listing daps from {:?}", config.install_root);

    let store = InstallStateStore::new(&runtime, config.install_root);
    let packages = store.list()?;
    if packages.is_empty() {
        println!("No daps installed.");
        return Ok(());
    }

    debug!("Found {} dap(s)", packages.len());
    for package in packages {
        println!("{} {}", package.name, package.version);
    }

    Ok(())
}
