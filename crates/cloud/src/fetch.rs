use std::path::{Path, PathBuf};

use aeflow_core::collaborators::AssetFetcher;
use aeflow_core::config::DEFAULT_S3_REGION;
use aeflow_core::types::{Credentials, Resource};
use aeflow_core::EngineError;
use async_trait::async_trait;

use crate::error::CloudError;
use crate::http::HttpDownloader;
use crate::s3;

/// Dispatches asset downloads on the resource's `fetchMethod`.
#[derive(Debug, Clone)]
pub struct AssetDownloader {
    http: HttpDownloader,
    region: String,
}

impl AssetDownloader {
    pub fn new(http: HttpDownloader, region: impl Into<String>) -> Self {
        Self {
            http,
            region: region.into(),
        }
    }
}

impl Default for AssetDownloader {
    fn default() -> Self {
        Self::new(HttpDownloader::default(), DEFAULT_S3_REGION)
    }
}

#[async_trait]
impl AssetFetcher for AssetDownloader {
    async fn download(
        &self,
        resource: &Resource,
        credentials: &[Credentials],
        destination: &Path,
    ) -> Result<PathBuf, EngineError> {
        match resource {
            Resource::Http(http) => {
                self.http
                    .download(&http.url, destination)
                    .await
                    .map_err(CloudError::into_download)?;
            }
            Resource::S3(object) => {
                let creds = object.credentials.resolve(credentials).ok_or_else(|| {
                    CloudError::MissingCredentials(format!(
                        "no credentials for s3://{}/{}",
                        object.bucket, object.key
                    ))
                    .into_download()
                })?;
                let client = s3::client(&creds, object.endpoint.as_deref(), &self.region).await;
                s3::get_object(&client, &object.bucket, &object.key, destination)
                    .await
                    .map_err(CloudError::into_download)?;
            }
        }
        Ok(destination.to_path_buf())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
