use anyhow::Result;
use log::debug;
use std::path::Path;

use crate::application::{Installed, Installer};
use crate::lock::InstallLock;
use crate::runtime::Runtime;

use super::config::{Config, ConfigOverrides};
use super::services::Services;

fn installer<'a, R: Runtime + Clone>(
    runtime: &'a R,
    services: &'a Services<R>,
    config: &Config,
) -> Installer<'a, R> {
    Installer::new(
        runtime,
        &services.catalog,
        &services.downloader,
        &services.opener,
        config.install_root.clone(),
    )
}

fn report(installed: &Installed) {
    match &installed.previous {
        Some(previous) => println!(
            "Updated {} from {} to {}",
            installed.name, previous, installed.version
        ),
        None => println!("Installed {}-{}", installed.name, installed.version),
    }
}

/// Install a dap from the catalog
#[tracing::instrument(skip(runtime, overrides))]
pub async fn install<R: Runtime + Clone>(
    runtime: R,
    name: &str,
    version: Option<&str>,
    overrides: ConfigOverrides,
) -> Result<()> {
    let config = Config::load(&runtime, overrides)?;
    let services = Services::from_config(&runtime, &config)?;
    let _lock = InstallLock::acquire(&config.install_root)?;

    let installed = installer(&runtime, &services, &config)
        .install(name, version, false)
        .await?;
    report(&installed);
    Ok(())
}

/// Update an installed dap to the catalog's default release
#[tracing::instrument(skip(runtime, overrides))]
pub async fn update<R: Runtime + Clone>(
    runtime: R,
    name: &str,
    overrides: ConfigOverrides,
) -> Result<()> {
    let config = Config::load(&runtime, overrides)?;
    let services = Services::from_config(&runtime, &config)?;
    let _lock = InstallLock::acquire(&config.install_root)?;

    let installed = installer(&runtime, &services, &config)
        .install(name, None, true)
        .await?;
    report(&installed);
    Ok(())
}

/// Install (or update from) a local `.dap` file
#[tracing::instrument(skip(runtime, overrides))]
pub fn install_file<R: Runtime + Clone>(
    runtime: R,
    path: &Path,
    update: bool,
    overrides: ConfigOverrides,
) -> Result<()> {
    let config = Config::load(&runtime, overrides)?;
    let services = Services::from_config(&runtime, &config)?;
    let _lock = InstallLock::acquire(&config.install_root)?;

    let installed = installer(&runtime, &services, &config).install_from_path(path, update)?;
    report(&installed);
    Ok(())
}

/// Download and verify a dap without installing it
#[tracing::instrument(skip(runtime, overrides))]
pub async fn download<R: Runtime + Clone>(
    runtime: R,
    name: &str,
    version: Option<&str>,
    dir: Option<&Path>,
    overrides: ConfigOverrides,
) -> Result<()> {
    let config = Config::load(&runtime, overrides)?;
    let services = Services::from_config(&runtime, &config)?;
    let dir = dir.unwrap_or(Path::new("."));
    debug!("Downloading {} into {:?}", name, dir);

    let path = installer(&runtime, &services, &config)
        .download(name, version, dir)
        .await?;
    println!("Downloaded {}", path.display());
    Ok(())
}
