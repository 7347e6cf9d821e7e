//! Engine configuration loaded from environment variables.
//!
//! All fields have defaults suitable for a workstation with the host
//! application installed. In production, override via environment variables
//! (a `.env` file is loaded by the worker binary before this runs).

use std::path::PathBuf;
use std::time::Duration;

use crate::error::EngineError;
use crate::host::command::HostPlatform;

/// Default name of the reserved preview folder inside every template.
pub const DEFAULT_PREVIEW_FOLDER_NAME: &str = "_preview";

/// Default region handed to S3-compatible endpoints that ignore it.
pub const DEFAULT_S3_REGION: &str = "us-east-1";

/// Variables that must be present when `APP_ENV=production`.
pub const REQUIRED_PRODUCTION_VARS: &[&str] = &[
    "S3_ACCESS_KEY_ID",
    "S3_BUCKET_NAME",
    "S3_ENDPOINT",
    "S3_PROVIDER",
    "S3_SECRET_ACCESS_KEY",
];

/// Top-level engine configuration.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Root directory for scripts, logs and rendered output.
    pub workplace: PathBuf,
    pub templates: TemplateConfig,
    pub host: HostConfig,
    /// Transcoder binary (default: `ffmpeg`).
    pub ffmpeg_path: String,
    /// Template sync binary (default: `rclone`).
    pub rclone_path: String,
}

/// Where templates live remotely and locally.
#[derive(Debug, Clone)]
pub struct TemplateConfig {
    /// Local mirror of the remote template tree.
    pub local_path: PathBuf,
    /// Reserved folder holding uploaded previews; never synced down.
    pub preview_folder_name: String,
    pub storage: StorageConfig,
}

/// S3-compatible storage holding the template tree and preview uploads.
#[derive(Debug, Clone, Default)]
pub struct StorageConfig {
    pub access_key_id: Option<String>,
    pub secret_access_key: Option<String>,
    pub bucket: Option<String>,
    pub endpoint: Option<String>,
    /// rclone provider name (e.g. `AWS`, `DigitalOcean`).
    pub provider: Option<String>,
    pub region: String,
}

/// How the host application is invoked.
#[derive(Debug, Clone)]
pub struct HostConfig {
    pub platform: HostPlatform,
    /// Headless render binary.
    pub render_engine: String,
    /// Interactive binary used by the Windows script command form.
    pub interactive_binary: String,
    /// Marker file switching the host into render-only mode.
    pub render_only_marker: PathBuf,
    /// Extra files `@include`d ahead of the embedded library.
    pub script_includes: Vec<String>,
    /// Host the live log listener binds to; `None` disables it.
    pub chat_host: Option<String>,
    /// Kill timeout for host invocations; `None` waits indefinitely.
    pub timeout: Option<Duration>,
}

impl EngineConfig {
    /// Load configuration from the process environment.
    ///
    /// | Env Var                        | Default                        |
    /// |--------------------------------|--------------------------------|
    /// | `WORKPLACE`                    | `$HOME/engine`                 |
    /// | `TEMPLATES_LOCAL_PATH`         | `$WORKPLACE/templates`         |
    /// | `TEMPLATE_PREVIEW_FOLDER_NAME` | `_preview`                     |
    /// | `S3_REGION`                    | `us-east-1`                    |
    /// | `AERENDER_PATH`                | platform render binary name    |
    /// | `AFTERFX_PATH`                 | `afterfx`                      |
    /// | `AE_RENDER_ONLY_MARKER`        | platform marker path           |
    /// | `AE_SCRIPT_INCLUDES`           | (none)                         |
    /// | `AE_CHAT_HOST`                 | (disabled)                     |
    /// | `AE_TIMEOUT_SECS`              | (no timeout)                   |
    /// | `FFMPEG_PATH`                  | `ffmpeg`                       |
    /// | `RCLONE_PATH`                  | `rclone`                       |
    pub fn from_env() -> Result<Self, EngineError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, EngineError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let workplace = match var("WORKPLACE") {
            Some(dir) => PathBuf::from(dir),
            None => {
                let home = var("HOME").or_else(|| var("USERPROFILE")).ok_or_else(|| {
                    EngineError::Config("WORKPLACE is unset and no home directory found".into())
                })?;
                PathBuf::from(home).join("engine")
            }
        };

        let local_path = var("TEMPLATES_LOCAL_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|| workplace.join("templates"));

        let storage = StorageConfig {
            access_key_id: var("S3_ACCESS_KEY_ID"),
            secret_access_key: var("S3_SECRET_ACCESS_KEY"),
            bucket: var("S3_BUCKET_NAME"),
            endpoint: var("S3_ENDPOINT"),
            provider: var("S3_PROVIDER"),
            region: var("S3_REGION").unwrap_or_else(|| DEFAULT_S3_REGION.to_string()),
        };

        let templates = TemplateConfig {
            local_path,
            preview_folder_name: var("TEMPLATE_PREVIEW_FOLDER_NAME")
                .unwrap_or_else(|| DEFAULT_PREVIEW_FOLDER_NAME.to_string()),
            storage,
        };

        let platform = HostPlatform::detect();

        let timeout = match var("AE_TIMEOUT_SECS") {
            Some(raw) => {
                let secs: u64 = raw.trim().parse().map_err(|_| {
                    EngineError::Config(format!("AE_TIMEOUT_SECS must be a valid u64, got '{raw}'"))
                })?;
                Some(Duration::from_secs(secs))
            }
            None => None,
        };

        let script_includes = var("AE_SCRIPT_INCLUDES")
            .map(|raw| {
                raw.split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect()
            })
            .unwrap_or_default();

        let host = HostConfig {
            platform,
            render_engine: var("AERENDER_PATH")
                .unwrap_or_else(|| platform.render_engine_file_name().to_string()),
            interactive_binary: var("AFTERFX_PATH").unwrap_or_else(|| "afterfx".to_string()),
            render_only_marker: var("AE_RENDER_ONLY_MARKER")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(platform.render_only_marker_path())),
            script_includes,
            chat_host: var("AE_CHAT_HOST"),
            timeout,
        };

        Ok(Self {
            workplace,
            templates,
            host,
            ffmpeg_path: var("FFMPEG_PATH").unwrap_or_else(|| "ffmpeg".to_string()),
            rclone_path: var("RCLONE_PATH").unwrap_or_else(|| "rclone".to_string()),
        })
    }

    /// Directory holding the compiled script, log and result files.
    pub fn scripts_dir(&self) -> PathBuf {
        self.workplace.join("engine")
    }
}

/// Fail if any production-required variable is missing.
///
/// Only enforced when `APP_ENV` is `production`.
pub fn check_required_vars<F>(lookup: F) -> Result<(), EngineError>
where
    F: Fn(&str) -> Option<String>,
{
    if lookup("APP_ENV").as_deref() != Some("production") {
        return Ok(());
    }
    for name in REQUIRED_PRODUCTION_VARS {
        if lookup(name).filter(|v| !v.is_empty()).is_none() {
            return Err(EngineError::Config(format!(
                "Missing '{name}' required environment variable"
            )));
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use assert_matches::assert_matches;

    use super::*;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_derive_from_home() {
        let config = EngineConfig::from_lookup(lookup(&[("HOME", "/home/ae")])).expect("config");
        assert_eq!(config.workplace, PathBuf::from("/home/ae/engine"));
        assert_eq!(
            config.templates.local_path,
            PathBuf::from("/home/ae/engine/templates")
        );
        assert_eq!(config.templates.preview_folder_name, "_preview");
        assert_eq!(config.templates.storage.region, "us-east-1");
        assert_eq!(config.host.timeout, None);
        assert!(config.host.chat_host.is_none());
        assert_eq!(config.ffmpeg_path, "ffmpeg");
    }

    #[test]
    fn overrides_are_applied() {
        let config = EngineConfig::from_lookup(lookup(&[
            ("WORKPLACE", "/srv/work"),
            ("AE_TIMEOUT_SECS", "600"),
            ("AE_SCRIPT_INCLUDES", "/opt/aeq.jsx, ,/opt/extra.jsx"),
            ("AE_CHAT_HOST", "127.0.0.1"),
            ("AERENDER_PATH", "/Applications/aerender"),
        ]))
        .expect("config");
        assert_eq!(config.scripts_dir(), PathBuf::from("/srv/work/engine"));
        assert_eq!(config.host.timeout, Some(Duration::from_secs(600)));
        assert_eq!(
            config.host.script_includes,
            vec!["/opt/aeq.jsx".to_string(), "/opt/extra.jsx".to_string()]
        );
        assert_eq!(config.host.chat_host.as_deref(), Some("127.0.0.1"));
        assert_eq!(config.host.render_engine, "/Applications/aerender");
    }

    #[test]
    fn invalid_timeout_is_rejected() {
        let result = EngineConfig::from_lookup(lookup(&[
            ("WORKPLACE", "/srv/work"),
            ("AE_TIMEOUT_SECS", "soon"),
        ]));
        assert_matches!(result, Err(EngineError::Config(_)));
    }

    #[test]
    fn missing_home_and_workplace_is_rejected() {
        let result = EngineConfig::from_lookup(lookup(&[]));
        assert_matches!(result, Err(EngineError::Config(_)));
    }

    #[test]
    fn production_requires_storage_vars() {
        let result = check_required_vars(lookup(&[
            ("APP_ENV", "production"),
            ("S3_ACCESS_KEY_ID", "key"),
        ]));
        assert_matches!(result, Err(EngineError::Config(msg)) if msg.contains("S3_BUCKET_NAME"));
    }

    #[test]
    fn development_skips_required_vars() {
        assert!(check_required_vars(lookup(&[])).is_ok());
    }
}
