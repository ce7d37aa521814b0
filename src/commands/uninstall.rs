use anyhow::Result;
use log::debug;

use crate::application::Uninstaller;
use crate::error::DapError;
use crate::lock::InstallLock;
use crate::runtime::Runtime;

use super::config::{Config, ConfigOverrides};

/// Remove an installed dap. Without `yes` the removal plan is shown and the
/// user is asked first.
#[tracing::instrument(skip(runtime, overrides))]
pub fn uninstall<R: Runtime>(
    runtime: R,
    name: &str,
    yes: bool,
    overrides: ConfigOverrides,
) -> Result<()> {
    let config = Config::load(&runtime, overrides)?;
    debug!("Using install root: {:?}", config.install_root);
    let _lock = InstallLock::acquire(&config.install_root)?;

    let uninstaller = Uninstaller::new(&runtime, config.install_root.clone());
    if !uninstaller.uninstall(name, !yes)? {
        return Err(DapError::ConfirmationDeclined.into());
    }

    println!("Uninstalled {}", name);
    Ok(())
}
