//! Storage and transfer collaborators: template sync, asset download and
//! artifact upload against S3-compatible storage and plain HTTP.

pub mod error;
pub mod fetch;
pub mod http;
pub mod s3;
pub mod sync;

pub use error::CloudError;
pub use fetch::AssetDownloader;
pub use http::HttpDownloader;
pub use s3::S3ArtifactStore;
pub use sync::RcloneTemplateSource;
