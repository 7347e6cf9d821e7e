//! Generic HTTP(S) asset download.

use std::path::Path;

use tokio::io::AsyncWriteExt;

use crate::error::CloudError;

/// Downloads files over HTTP, following redirects.
#[derive(Debug, Clone)]
pub struct HttpDownloader {
    client: reqwest::Client,
}

impl HttpDownloader {
    pub fn new() -> Self {
        Self::with_client(reqwest::Client::new())
    }

    /// Reuse an existing [`reqwest::Client`] for connection pooling.
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }

    /// GET `url` and stream the body to `dest`, creating parent directories.
    ///
    /// Any status >= 400 after redirects is an error.
    pub async fn download(&self, url: &str, dest: &Path) -> Result<u64, CloudError> {
        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let mut response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(CloudError::HttpStatus {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        let mut file = tokio::fs::File::create(dest).await?;
        let mut written: u64 = 0;
        while let Some(chunk) = response.chunk().await? {
            file.write_all(&chunk).await?;
            written += chunk.len() as u64;
        }
        file.flush().await?;

        tracing::debug!(url, dest = %dest.display(), bytes = written, "Downloaded asset");
        Ok(written)
    }
}

impl Default for HttpDownloader {
    fn default() -> Self {
        Self::new()
    }
}
