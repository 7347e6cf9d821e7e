use aeflow_core::host::subprocess::ProcessError;
use aeflow_core::EngineError;

/// Errors from the storage and transfer adapters.
#[derive(Debug, thiserror::Error)]
pub enum CloudError {
    /// The HTTP request itself failed (network, DNS, TLS, redirects).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The server answered with a non-2xx status.
    #[error("HTTP {status} fetching {url}")]
    HttpStatus { status: u16, url: String },

    /// An object storage call failed.
    #[error("S3 {operation} s3://{bucket}/{key} failed: {message}")]
    S3 {
        operation: &'static str,
        bucket: String,
        key: String,
        message: String,
    },

    /// No usable credentials were supplied or configured.
    #[error("Missing credentials: {0}")]
    MissingCredentials(String),

    /// A required storage setting is absent.
    #[error("Storage not configured: {0}")]
    NotConfigured(&'static str),

    /// The sync tool exited unsuccessfully.
    #[error("rclone exited with code {exit_code}: {stderr}")]
    SyncFailed { exit_code: i32, stderr: String },

    /// The sync tool could not be spawned or waited on.
    #[error("rclone could not run: {0}")]
    Process(#[from] ProcessError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl CloudError {
    pub fn into_download(self) -> EngineError {
        EngineError::Download(self.to_string())
    }

    pub fn into_upload(self) -> EngineError {
        EngineError::Upload(self.to_string())
    }

    pub fn into_sync(self) -> EngineError {
        EngineError::Sync(self.to_string())
    }
}
