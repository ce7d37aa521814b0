use crate::http::HttpClient;
use crate::runtime::Runtime;
use anyhow::{Context, Result};
use async_trait::async_trait;
use log::info;
use std::path::Path;

/// Fetches an artifact to a local path.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Downloader: Send + Sync {
    /// Download `url` into `dest`, returning the number of bytes written.
    async fn download(&self, url: &str, dest: &Path) -> Result<u64>;
}

/// Downloads a file from a URL to `dest`, writing through the runtime.
#[tracing::instrument(skip(runtime, dest, http_client))]
pub async fn download_file<R: Runtime>(
    runtime: &R,
    url: &str,
    dest: &Path,
    http_client: &HttpClient,
) -> Result<u64> {
    info!("Downloading {}...", url);

    let bytes = http_client
        .download_file(url, || {
            runtime
                .create_file(dest)
                .with_context(|| format!("Failed to create file at {:?}", dest))
        })
        .await?;

    info!("Download complete.");
    Ok(bytes)
}

/// [`Downloader`] backed by the HTTP client.
pub struct HttpDownloader<R: Runtime> {
    runtime: R,
    http: HttpClient,
}

impl<R: Runtime> HttpDownloader<R> {
    pub fn new(runtime: R, http: HttpClient) -> Self {
        Self { runtime, http }
    }
}

#[async_trait]
impl<R: Runtime> Downloader for HttpDownloader<R> {
    async fn download(&self, url: &str, dest: &Path) -> Result<u64> {
        download_file(&self.runtime, url, dest, &self.http).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DapError;
    use crate::runtime::MockRuntime;
    use reqwest::Client;

    #[tokio::test]
    async fn test_download_file() {
        // --- Setup Mock Server ---
        let mut server = mockito::Server::new_async().await;
        let url = server.url();

        let mock = server
            .mock("GET", "/download/foo-1.0.dap")
            .with_status(200)
            .with_body("dap bytes")
            .create_async()
            .await;

        // --- Setup Runtime ---
        let mut runtime = MockRuntime::new();

        // Create file: foo-1.0.dap -> returns sink (discards content)
        runtime
            .expect_create_file()
            .with(mockall::predicate::eq(
                Path::new("/tmp/dl/foo-1.0.dap").to_path_buf(),
            ))
            .returning(|_| Ok(Box::new(std::io::sink())));

        // --- Execute ---
        let downloader = HttpDownloader::new(runtime, HttpClient::new(Client::new()));
        let bytes = downloader
            .download(
                &format!("{}/download/foo-1.0.dap", url),
                Path::new("/tmp/dl/foo-1.0.dap"),
            )
            .await
            .unwrap();

        // --- Verify ---
        mock.assert_async().await;
        assert_eq!(bytes, 9);
    }

    #[tokio::test]
    async fn test_download_file_not_found() {
        // --- Setup Mock Server ---
        let mut server = mockito::Server::new_async().await;
        let url = server.url();

        let mock = server
            .mock("GET", "/download/foo-1.0.dap")
            .with_status(404)
            .create_async()
            .await;

        // No expectations = strict mode (panics if any method called)
        let runtime = MockRuntime::new();

        // --- Execute ---
        let http_client = HttpClient::new(Client::new());
        let result = download_file(
            &runtime,
            &format!("{}/download/foo-1.0.dap", url),
            Path::new("/tmp/dl/foo-1.0.dap"),
            &http_client,
        )
        .await;

        // --- Verify ---
        mock.assert_async().await;
        let err = result.unwrap_err();
        assert!(matches!(
            DapError::of(&err),
            Some(DapError::UnexpectedStatus { status: 404, .. })
        ));
    }
}
