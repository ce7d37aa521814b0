use anyhow::{Context, Result};
use async_trait::async_trait;
use log::debug;
use serde::de::DeserializeOwned;

use crate::http::HttpClient;

use super::Catalog;
use super::types::{Metadap, Page, Release, User};

/// Catalog backed by the dapi HTTP service.
pub struct DapiCatalog {
    http: HttpClient,
    api_url: String,
    fake_data: Option<String>,
}

impl DapiCatalog {
    /// `api_url` must end with `/`; endpoint paths are appended to it.
    #[tracing::instrument(skip(http, fake_data))]
    pub fn new(http: HttpClient, api_url: String, fake_data: Option<String>) -> Self {
        Self {
            http,
            api_url,
            fake_data,
        }
    }

    pub fn api_url(&self) -> &str {
        &self.api_url
    }

    fn paginated_url(&self, what: &str, page: Option<u32>) -> String {
        match page {
            Some(page) => format!("{}{}/?page={}", self.api_url, what, page),
            None => format!("{}{}/", self.api_url, what),
        }
    }

    /// Fetch a structured record, `None` when the service has nothing there.
    #[tracing::instrument(skip(self))]
    async fn data<T: DeserializeOwned>(&self, url: &str) -> Result<Option<T>> {
        let body = match &self.fake_data {
            Some(fake) => {
                debug!("Using fake data instead of fetching {}", url);
                fake.clone()
            }
            None => match self.http.get_text(url).await? {
                Some(body) => body,
                None => return Ok(None),
            },
        };

        if body.trim().is_empty() {
            return Ok(None);
        }
        serde_yaml::from_str(&body).with_context(|| format!("Failed to decode response of {}", url))
    }
}

#[async_trait]
impl Catalog for DapiCatalog {
    async fn metadap(&self, name: &str) -> Result<Option<Metadap>> {
        self.data(&format!("{}metadaps/{}/", self.api_url, name))
            .await
    }

    async fn dap(&self, name: &str, version: &str) -> Result<Option<Release>> {
        self.data(&format!("{}daps/{}-{}/", self.api_url, name, version))
            .await
    }

    async fn release_at(&self, url: &str) -> Result<Option<Release>> {
        self.data(url).await
    }

    async fn users(&self, page: Option<u32>) -> Result<Option<Page<User>>> {
        self.data(&self.paginated_url("users", page)).await
    }

    async fn user(&self, username: &str) -> Result<Option<User>> {
        self.data(&format!("{}users/{}/", self.api_url, username))
            .await
    }

    async fn metadaps(&self, page: Option<u32>) -> Result<Option<Page<Metadap>>> {
        self.data(&self.paginated_url("metadaps", page)).await
    }

    async fn daps(&self, page: Option<u32>) -> Result<Option<Page<Release>>> {
        self.data(&self.paginated_url("daps", page)).await
    }

    #[tracing::instrument(skip(self))]
    async fn dependency_metadata(&self) -> Result<Vec<String>> {
        let url = format!("{}meta.txt", self.api_url);
        let body = self.http.get_text(&url).await?.unwrap_or_default();
        Ok(body
            .lines()
            .map(str::trim_end)
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect())
    }
}
