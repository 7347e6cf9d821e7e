//! Boundaries to the I/O collaborators the orchestrators depend on.
//!
//! Implementations live in `aeflow-cloud` (sync, download, upload) and in
//! [`crate::ffmpeg`] (transcode). Tests substitute recording stubs.

use std::path::{Path, PathBuf};

use async_trait::async_trait;

use crate::error::EngineError;
use crate::types::{Credentials, Resource, UploadTarget};

/// Mirrors a remote template tree to local disk.
#[async_trait]
pub trait TemplateSource: Send + Sync {
    /// Sync `template_path` (relative to the template root) and return the
    /// local directory. The preview folder is never synced.
    async fn sync(&self, template_path: &str) -> Result<PathBuf, EngineError>;
}

/// Fetches a single asset to a local path.
#[async_trait]
pub trait AssetFetcher: Send + Sync {
    /// `credentials` are the job-level credentials, used when the resource
    /// does not carry its own.
    async fn download(
        &self,
        resource: &Resource,
        credentials: &[Credentials],
        destination: &Path,
    ) -> Result<PathBuf, EngineError>;
}

/// Uploads finished artifacts.
#[async_trait]
pub trait ArtifactStore: Send + Sync {
    /// Upload `local` and return the remote locator (the object key).
    async fn upload(
        &self,
        local: &Path,
        credentials: &Credentials,
        target: &UploadTarget,
    ) -> Result<String, EngineError>;
}

/// Converts an intermediate codec render into a broadly compatible file.
#[async_trait]
pub trait Transcoder: Send + Sync {
    async fn to_broadly_compatible(&self, input: &Path) -> Result<PathBuf, EngineError>;
}
