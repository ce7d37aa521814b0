//! Remote catalog of daps.

mod client;
mod types;

use anyhow::Result;
use async_trait::async_trait;
use log::debug;

use crate::error::DapError;

pub use client::DapiCatalog;
pub use types::{Metadap, Page, Release, User};

/// Structured fetches against the catalog service.
///
/// Every lookup returns `Ok(None)` when the service has no such record.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Catalog: Send + Sync {
    async fn metadap(&self, name: &str) -> Result<Option<Metadap>>;
    async fn dap(&self, name: &str, version: &str) -> Result<Option<Release>>;
    /// Fetch a release by the URL a metadap points at.
    async fn release_at(&self, url: &str) -> Result<Option<Release>>;
    async fn users(&self, page: Option<u32>) -> Result<Option<Page<User>>>;
    async fn user(&self, username: &str) -> Result<Option<User>>;
    async fn metadaps(&self, page: Option<u32>) -> Result<Option<Page<Metadap>>>;
    async fn daps(&self, page: Option<u32>) -> Result<Option<Page<Release>>>;
    /// Lines of the `name-version[; depends (...)]` feed.
    async fn dependency_metadata(&self) -> Result<Vec<String>>;
}

/// Look up a metadap and the release selected by `version`.
///
/// An explicit version must exist. Without one the latest stable release
/// is used, then the latest one; the release is `None` when the metadap has
/// neither.
#[tracing::instrument(skip(catalog))]
pub async fn fetch_metadap_release(
    catalog: &dyn Catalog,
    name: &str,
    version: Option<&str>,
) -> Result<(Metadap, Option<Release>)> {
    let metadap = catalog
        .metadap(name)
        .await?
        .ok_or_else(|| DapError::NotFound {
            what: name.to_string(),
        })?;

    let release = match version {
        Some(version) => Some(catalog.dap(name, version).await?.ok_or_else(|| {
            DapError::NotFound {
                what: format!("{} version {}", name, version),
            }
        })?),
        None => match metadap.default_release_url() {
            Some(url) => {
                debug!("Resolving default release of {} at {}", name, url);
                catalog.release_at(url).await?
            }
            None => None,
        },
    };

    Ok((metadap, release))
}

/// Resolve the release to install.
///
/// Fails with [`DapError::NotFound`] for an unknown name or version and with
/// [`DapError::NoVersions`] when the dap has no release to default to.
pub async fn resolve(catalog: &dyn Catalog, name: &str, version: Option<&str>) -> Result<Release> {
    let (_, release) = fetch_metadap_release(catalog, name, version).await?;
    release.ok_or_else(|| {
        DapError::NoVersions {
            name: name.to_string(),
        }
        .into()
    })
}
