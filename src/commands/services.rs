//! Service factory for building application dependencies.
//!
//! Services are built from configuration values but are not part of the
//! configuration itself.

use anyhow::Result;
use reqwest::Client;

use crate::{
    archive::DapOpener,
    catalog::DapiCatalog,
    download::HttpDownloader,
    http::HttpClient,
    runtime::Runtime,
};

use super::config::Config;

const USER_AGENT: &str = "dapi-cli";

/// Build the HTTP client shared by the catalog and the downloader
pub fn build_http_client() -> Result<HttpClient> {
    let client = Client::builder().user_agent(USER_AGENT).build()?;
    Ok(HttpClient::new(client))
}

/// Build a catalog client from configuration
pub fn build_catalog(config: &Config, http: HttpClient) -> DapiCatalog {
    DapiCatalog::new(http, config.api_url.clone(), config.fake_data.clone())
}

/// Everything a use case needs to talk to the outside world.
pub struct Services<R: Runtime> {
    pub catalog: DapiCatalog,
    pub downloader: HttpDownloader<R>,
    pub opener: DapOpener,
}

impl<R: Runtime + Clone> Services<R> {
    pub fn from_config(runtime: &R, config: &Config) -> Result<Self> {
        let http = build_http_client()?;
        Ok(Self {
            catalog: build_catalog(config, http.clone()),
            downloader: HttpDownloader::new(runtime.clone(), http),
            opener: DapOpener,
        })
    }
}
