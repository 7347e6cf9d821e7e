use std::path::{Path, PathBuf};
use std::sync::Arc;

use aeflow_core::collaborators::{ArtifactStore, AssetFetcher, TemplateSource, Transcoder};
use aeflow_core::config::{EngineConfig, DEFAULT_PREVIEW_FOLDER_NAME};
use aeflow_core::host::HostApplication;
use aeflow_core::scripting::{ScriptBuilder, ScriptContext};
use aeflow_core::types::Credentials;

/// Storage receiving template previews.
#[derive(Debug, Clone)]
pub struct PreviewStorage {
    pub credentials: Credentials,
    pub endpoint: Option<String>,
    pub bucket: String,
}

/// Settings shared by all orchestrators.
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    /// Root for per-job output directories.
    pub workplace: PathBuf,
    pub script_includes: Vec<String>,
    pub chat_host: Option<String>,
    pub preview_folder_name: String,
    /// `None` when the storage variables are not configured; preview jobs
    /// then fail before rendering.
    pub preview_storage: Option<PreviewStorage>,
}

impl PipelineSettings {
    pub fn new(workplace: impl Into<PathBuf>) -> Self {
        Self {
            workplace: workplace.into(),
            script_includes: Vec::new(),
            chat_host: None,
            preview_folder_name: DEFAULT_PREVIEW_FOLDER_NAME.to_string(),
            preview_storage: None,
        }
    }

    pub fn from_config(config: &EngineConfig) -> Self {
        let storage = &config.templates.storage;
        let preview_storage = match (
            &storage.access_key_id,
            &storage.secret_access_key,
            &storage.bucket,
        ) {
            (Some(access_key_id), Some(secret_access_key), Some(bucket)) => Some(PreviewStorage {
                credentials: Credentials {
                    access_key_id: access_key_id.clone(),
                    secret_access_key: secret_access_key.clone(),
                },
                endpoint: storage.endpoint.clone(),
                bucket: bucket.clone(),
            }),
            _ => None,
        };

        Self {
            workplace: config.workplace.clone(),
            script_includes: config.host.script_includes.clone(),
            chat_host: config.host.chat_host.clone(),
            preview_folder_name: config.templates.preview_folder_name.clone(),
            preview_storage,
        }
    }
}

/// Everything an orchestrator needs: settings plus collaborators.
pub struct JobContext {
    pub settings: PipelineSettings,
    pub host: Arc<dyn HostApplication>,
    pub templates: Arc<dyn TemplateSource>,
    pub fetcher: Arc<dyn AssetFetcher>,
    pub store: Arc<dyn ArtifactStore>,
    pub transcoder: Arc<dyn Transcoder>,
}

impl JobContext {
    /// A script builder writing its files into `dir`.
    pub fn script_builder(&self, dir: &Path) -> ScriptBuilder {
        let mut context = ScriptContext::in_dir(dir);
        context.host = self.settings.chat_host.clone();
        ScriptBuilder::new(context).with_includes(self.settings.script_includes.iter().cloned())
    }
}

/// Join a template-relative path (usually starting with `/`) under `root`.
pub fn join_relative(root: &Path, relative: &str) -> PathBuf {
    root.join(relative.trim_start_matches(['/', '\\']))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relative_paths_stay_under_root() {
        assert_eq!(
            join_relative(Path::new("/w/render/t1"), "/(Footage)/logo.png"),
            PathBuf::from("/w/render/t1/(Footage)/logo.png")
        );
        assert_eq!(
            join_relative(Path::new("/w/render/t1"), "logo.png"),
            PathBuf::from("/w/render/t1/logo.png")
        );
    }

    #[test]
    fn preview_storage_requires_all_vars() {
        let lookup = |pairs: &'static [(&'static str, &'static str)]| {
            move |key: &str| {
                pairs
                    .iter()
                    .find(|(k, _)| *k == key)
                    .map(|(_, v)| v.to_string())
            }
        };

        let partial = EngineConfig::from_lookup(lookup(&[
            ("WORKPLACE", "/w"),
            ("S3_ACCESS_KEY_ID", "AK"),
        ]))
        .expect("config");
        assert!(PipelineSettings::from_config(&partial).preview_storage.is_none());

        let full = EngineConfig::from_lookup(lookup(&[
            ("WORKPLACE", "/w"),
            ("S3_ACCESS_KEY_ID", "AK"),
            ("S3_SECRET_ACCESS_KEY", "SK"),
            ("S3_BUCKET_NAME", "templates"),
            ("S3_ENDPOINT", "ams3.example.com"),
        ]))
        .expect("config");
        let settings = PipelineSettings::from_config(&full);
        let storage = settings.preview_storage.expect("storage");
        assert_eq!(storage.bucket, "templates");
        assert_eq!(settings.workplace, PathBuf::from("/w"));
    }
}
