//! Read-only listings of what the catalog offers.

use anyhow::{Result, bail};
use log::debug;

use crate::catalog::{Catalog, Metadap, Page, User};
use crate::runtime::Runtime;

use super::config::{Config, ConfigOverrides};
use super::services::Services;

/// Print one page of catalog users
#[tracing::instrument(skip(runtime, overrides))]
pub async fn users<R: Runtime + Clone>(
    runtime: R,
    page: Option<u32>,
    overrides: ConfigOverrides,
) -> Result<()> {
    let config = Config::load(&runtime, overrides)?;
    let services = Services::from_config(&runtime, &config)?;

    let users = services.catalog.users(page).await?;
    print!("{}", render_users(users.as_ref())?);
    Ok(())
}

/// `username (full name)` per user.
pub fn render_users(page: Option<&Page<User>>) -> Result<String> {
    let Some(page) = page.filter(|p| p.count > 0 && !p.results.is_empty()) else {
        bail!("No users found");
    };

    let mut out = String::new();
    for user in &page.results {
        out.push_str(&user.username);
        if let Some(full_name) = user.full_name.as_deref().filter(|n| !n.is_empty()) {
            out.push_str(&format!(" ({})", full_name));
        }
        out.push('\n');
    }
    Ok(out)
}

/// Print one page of daps with the summary of their default release
#[tracing::instrument(skip(runtime, overrides))]
pub async fn daps<R: Runtime + Clone>(
    runtime: R,
    page: Option<u32>,
    overrides: ConfigOverrides,
) -> Result<()> {
    let config = Config::load(&runtime, overrides)?;
    let services = Services::from_config(&runtime, &config)?;

    let Some(metadaps) = services.catalog.metadaps(page).await? else {
        match page {
            Some(page) => bail!("Page {} of daps not found", page),
            None => {
                println!("Could not find any daps");
                return Ok(());
            }
        }
    };

    for metadap in &metadaps.results {
        println!("{}", describe(&services.catalog, metadap).await?);
    }
    Ok(())
}

/// `name - summary`, or just the name for a dap without releases.
async fn describe(catalog: &dyn Catalog, metadap: &Metadap) -> Result<String> {
    let Some(url) = metadap.default_release_url() else {
        return Ok(metadap.package_name.clone());
    };
    debug!("Fetching summary of {}", metadap.package_name);

    let summary = catalog
        .release_at(url)
        .await?
        .and_then(|release| release.summary)
        .unwrap_or_default();
    Ok(format!("{} - {}", metadap.package_name, summary))
}
