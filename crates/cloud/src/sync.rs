//! Template synchronization through `rclone`.
//!
//! The remote is configured purely through `RCLONE_CONFIG_<NAME>_*`
//! environment variables on the child process, so no rclone config file is
//! read or written. Each sync uses a fresh remote name.

use std::path::PathBuf;

use aeflow_core::collaborators::TemplateSource;
use aeflow_core::config::TemplateConfig;
use aeflow_core::host::subprocess;
use aeflow_core::EngineError;
use async_trait::async_trait;

use crate::error::CloudError;

const DEFAULT_PROVIDER: &str = "Other";

/// [`TemplateSource`] mirroring `<bucket>/<template path>` to
/// `<local templates>/<template path>`.
#[derive(Debug, Clone)]
pub struct RcloneTemplateSource {
    binary: String,
    templates: TemplateConfig,
}

impl RcloneTemplateSource {
    pub fn new(binary: impl Into<String>, templates: TemplateConfig) -> Self {
        Self {
            binary: binary.into(),
            templates,
        }
    }

    /// Environment defining remote `remote`.
    pub fn remote_env(&self, remote: &str) -> Result<Vec<(String, String)>, CloudError> {
        let storage = &self.templates.storage;
        let access_key_id = storage
            .access_key_id
            .clone()
            .ok_or(CloudError::NotConfigured("S3_ACCESS_KEY_ID"))?;
        let secret_access_key = storage
            .secret_access_key
            .clone()
            .ok_or(CloudError::NotConfigured("S3_SECRET_ACCESS_KEY"))?;

        let prefix = format!("RCLONE_CONFIG_{}", remote.to_uppercase());
        let mut env = vec![
            (format!("{prefix}_TYPE"), "s3".to_string()),
            (
                format!("{prefix}_PROVIDER"),
                storage
                    .provider
                    .clone()
                    .unwrap_or_else(|| DEFAULT_PROVIDER.to_string()),
            ),
            (format!("{prefix}_ACCESS_KEY_ID"), access_key_id),
            (format!("{prefix}_SECRET_ACCESS_KEY"), secret_access_key),
            (format!("{prefix}_REGION"), storage.region.clone()),
        ];
        if let Some(endpoint) = &storage.endpoint {
            env.push((format!("{prefix}_ENDPOINT"), endpoint.clone()));
        }
        Ok(env)
    }

    /// Arguments of `rclone sync` for `template_path`.
    pub fn sync_args(
        &self,
        remote: &str,
        template_path: &str,
        local: &std::path::Path,
    ) -> Result<Vec<String>, CloudError> {
        let bucket = self
            .templates
            .storage
            .bucket
            .as_deref()
            .ok_or(CloudError::NotConfigured("S3_BUCKET_NAME"))?;
        Ok(vec![
            "sync".to_string(),
            "--exclude".to_string(),
            format!("{}/**", self.templates.preview_folder_name),
            format!("{remote}:{bucket}/{}", template_path.trim_matches('/')),
            local.to_string_lossy().into_owned(),
        ])
    }

    async fn run(&self, template_path: &str) -> Result<PathBuf, CloudError> {
        let local = self.templates.local_path.join(template_path.trim_matches('/'));
        tokio::fs::create_dir_all(&local).await?;

        let remote = format!("aeflow{}", uuid::Uuid::new_v4().simple());
        let mut cmd = tokio::process::Command::new(&self.binary);
        cmd.args(self.sync_args(&remote, template_path, &local)?)
            .envs(self.remote_env(&remote)?);

        let output = subprocess::run_command(&mut cmd, None).await?;
        if !output.success() {
            return Err(CloudError::SyncFailed {
                exit_code: output.exit_code,
                stderr: output.stderr.trim().to_string(),
            });
        }

        tracing::info!(
            template = template_path,
            local = %local.display(),
            duration_ms = output.duration_ms,
            "Template synced",
        );
        Ok(local)
    }
}

#[async_trait]
impl TemplateSource for RcloneTemplateSource {
    async fn sync(&self, template_path: &str) -> Result<PathBuf, EngineError> {
        self.run(template_path).await.map_err(CloudError::into_sync)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
