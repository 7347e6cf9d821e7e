//! S3-compatible object storage: asset GET and artifact PUT with explicit
//! per-job credentials and endpoint.

use std::path::Path;

use aeflow_core::collaborators::ArtifactStore;
use aeflow_core::config::DEFAULT_S3_REGION;
use aeflow_core::types::{Credentials, UploadTarget};
use aeflow_core::EngineError;
use async_trait::async_trait;
use aws_config::{BehaviorVersion, Region};
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::primitives::ByteStream;

use crate::error::CloudError;

const CREDENTIALS_PROVIDER_NAME: &str = "aeflow-job";

/// Prefix a bare host with `https://`.
pub fn endpoint_url(endpoint: &str) -> String {
    if endpoint.starts_with("http://") || endpoint.starts_with("https://") {
        endpoint.to_string()
    } else {
        format!("https://{endpoint}")
    }
}

/// Build a client for one credentials/endpoint pair.
///
/// Path-style addressing is forced when a custom endpoint is given, which
/// most S3-compatible providers require.
pub async fn client(
    credentials: &Credentials,
    endpoint: Option<&str>,
    region: &str,
) -> aws_sdk_s3::Client {
    let provider = aws_credential_types::Credentials::new(
        credentials.access_key_id.clone(),
        credentials.secret_access_key.clone(),
        None,
        None,
        CREDENTIALS_PROVIDER_NAME,
    );

    let shared = aws_config::defaults(BehaviorVersion::latest())
        .region(Region::new(region.to_string()))
        .credentials_provider(provider)
        .load()
        .await;

    let mut builder = aws_sdk_s3::config::Builder::from(&shared);
    if let Some(endpoint) = endpoint.filter(|e| !e.is_empty()) {
        builder = builder.endpoint_url(endpoint_url(endpoint)).force_path_style(true);
    }
    aws_sdk_s3::Client::from_conf(builder.build())
}

/// Download `bucket/key` into `dest`.
pub async fn get_object(
    client: &aws_sdk_s3::Client,
    bucket: &str,
    key: &str,
    dest: &Path,
) -> Result<u64, CloudError> {
    let s3_err = |message: String| CloudError::S3 {
        operation: "GetObject",
        bucket: bucket.to_string(),
        key: key.to_string(),
        message,
    };

    let output = client
        .get_object()
        .bucket(bucket)
        .key(key)
        .send()
        .await
        .map_err(|e| s3_err(DisplayErrorContext(&e).to_string()))?;

    let data = output
        .body
        .collect()
        .await
        .map_err(|e| s3_err(e.to_string()))?
        .into_bytes();

    if let Some(parent) = dest.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(dest, &data).await?;

    tracing::debug!(bucket, key, dest = %dest.display(), bytes = data.len(), "Downloaded object");
    Ok(data.len() as u64)
}

/// Upload `local` to `bucket/key`.
pub async fn put_object(
    client: &aws_sdk_s3::Client,
    local: &Path,
    bucket: &str,
    key: &str,
) -> Result<(), CloudError> {
    let s3_err = |message: String| CloudError::S3 {
        operation: "PutObject",
        bucket: bucket.to_string(),
        key: key.to_string(),
        message,
    };

    let body = ByteStream::from_path(local)
        .await
        .map_err(|e| s3_err(e.to_string()))?;

    client
        .put_object()
        .bucket(bucket)
        .key(key)
        .body(body)
        .send()
        .await
        .map_err(|e| s3_err(DisplayErrorContext(&e).to_string()))?;
    Ok(())
}

/// [`ArtifactStore`] writing to S3-compatible storage.
#[derive(Debug, Clone)]
pub struct S3ArtifactStore {
    region: String,
}

impl S3ArtifactStore {
    pub fn new(region: impl Into<String>) -> Self {
        Self {
            region: region.into(),
        }
    }
}

impl Default for S3ArtifactStore {
    fn default() -> Self {
        Self::new(DEFAULT_S3_REGION)
    }
}

#[async_trait]
impl ArtifactStore for S3ArtifactStore {
    async fn upload(
        &self,
        local: &Path,
        credentials: &Credentials,
        target: &UploadTarget,
    ) -> Result<String, EngineError> {
        let client = client(credentials, target.endpoint.as_deref(), &self.region).await;
        put_object(&client, local, &target.bucket, &target.key)
            .await
            .map_err(CloudError::into_upload)?;

        tracing::info!(
            local = %local.display(),
            bucket = %target.bucket,
            key = %target.key,
            "Uploaded artifact",
        );
        Ok(target.key.clone())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_host_gets_https() {
        assert_eq!(
            endpoint_url("ams3.digitaloceanspaces.com"),
            "https://ams3.digitaloceanspaces.com"
        );
    }

    #[test]
    fn explicit_scheme_is_kept() {
        assert_eq!(endpoint_url("http://localhost:9000"), "http://localhost:9000");
    }

    #[tokio::test]
    async fn missing_local_file_fails_before_network() {
        let creds = Credentials {
            access_key_id: "AK".into(),
            secret_access_key: "SK".into(),
        };
        let store = S3ArtifactStore::default();
        let target = UploadTarget {
            endpoint: Some("http://127.0.0.1:9".into()),
            bucket: "b".into(),
            key: "t1/Out.mov".into(),
        };
        let err = store
            .upload(Path::new("/nonexistent/Out.mov"), &creds, &target)
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::Upload(msg) if msg.contains("PutObject")));
    }
}
