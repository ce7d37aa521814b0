//! HTTP client for the catalog service and artifact downloads.
//!
//! There is no retry logic: a failed request is reported to the caller,
//! who re-invokes the command.

use anyhow::{Context, Result};
use log::debug;
use reqwest::{Client, StatusCode};
use std::io::Write;

use crate::error::DapError;

#[derive(Clone)]
pub struct HttpClient {
    client: Client,
}

impl HttpClient {
    /// Creates a new HTTP client wrapping the given reqwest Client.
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// GET a URL and return its body.
    ///
    /// `404` is an absent result (`Ok(None)`); any other status besides
    /// `200` is a [`DapError::UnexpectedStatus`].
    #[tracing::instrument(skip(self))]
    pub async fn get_text(&self, url: &str) -> Result<Option<String>> {
        debug!("GET {}...", url);

        let response = self
            .client
            .get(url)
            .send()
            .await
            .with_context(|| format!("Failed to send request to {}", url))?;

        match response.status() {
            StatusCode::OK => {
                let body = response
                    .text()
                    .await
                    .with_context(|| format!("Failed to read response body from {}", url))?;
                Ok(Some(body))
            }
            StatusCode::NOT_FOUND => {
                debug!("{} answered 404", url);
                Ok(None)
            }
            status => Err(DapError::UnexpectedStatus {
                status: status.as_u16(),
                url: url.to_string(),
            }
            .into()),
        }
    }

    /// Stream the body of `url` into the writer produced by `create_writer`.
    ///
    /// The writer is only created once the server has answered `200`, so a
    /// failed request leaves nothing behind.
    #[tracing::instrument(skip(self, create_writer))]
    pub async fn download_file<W, F>(&self, url: &str, create_writer: F) -> Result<u64>
    where
        W: Write,
        F: FnOnce() -> Result<W>,
    {
        debug!("Downloading file from {}...", url);

        let mut response = self
            .client
            .get(url)
            .send()
            .await
            .context("Failed to start download request")?;

        if response.status() != StatusCode::OK {
            return Err(DapError::UnexpectedStatus {
                status: response.status().as_u16(),
                url: url.to_string(),
            }
            .into());
        }

        let mut writer = create_writer()?;
        let mut downloaded_bytes: u64 = 0;

        while let Some(chunk) = response
            .chunk()
            .await
            .context("Failed to read chunk from download stream")?
        {
            writer
                .write_all(&chunk)
                .context("Failed to write chunk to file")?;
            downloaded_bytes += chunk.len() as u64;
        }
        writer.flush().context("Failed to flush downloaded file")?;

        debug!(
            "Downloaded {:.2} MB",
            downloaded_bytes as f64 / (1024.0 * 1024.0)
        );

        Ok(downloaded_bytes)
    }
}
