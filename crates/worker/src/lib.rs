//! Command line front end: parse a job file, wire the real collaborators
//! and run exactly one job.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use aeflow_cloud::{AssetDownloader, HttpDownloader, RcloneTemplateSource, S3ArtifactStore};
use aeflow_core::config::EngineConfig;
use aeflow_core::ffmpeg::FfmpegTranscoder;
use aeflow_core::host::HostGate;
use aeflow_core::types::{AnalyzeRequest, PreviewRequest, RenderRequest};
use aeflow_pipeline::{Analyzer, JobContext, PipelineSettings, Previewer, Renderer};
use anyhow::Context as _;
use clap::{Parser, Subcommand, ValueEnum};
use serde::de::DeserializeOwned;

/// Log filter used when `RUST_LOG` is unset. `aeflow::host` carries the
/// lines streamed live from running scripts.
pub const DEFAULT_LOG_FILTER: &str =
    "aeflow_worker=info,aeflow_pipeline=info,aeflow_core=info,aeflow_cloud=info,aeflow::host=info";

#[derive(Parser, Debug)]
#[command(name = "aeflow-worker", version, about = "Run one After Effects automation job")]
pub struct Cli {
    #[command(subcommand)]
    pub cmd: Command,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Command {
    /// Extract composition metadata from every project of a template.
    Analyze { job: PathBuf },
    /// Parametrize a template project and render it.
    Render { job: PathBuf },
    /// Render and upload template previews.
    Preview { job: PathBuf },
    /// Toggle the host's render-only mode.
    RenderOnly { state: Toggle },
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Toggle {
    On,
    Off,
}

/// Outcome of one invocation, ready to be printed.
#[derive(Debug)]
pub struct Report {
    pub json: serde_json::Value,
    pub failed: bool,
}

/// Build a job context backed by the host application, rclone, S3 and ffmpeg.
pub fn build_context(config: &EngineConfig) -> Arc<JobContext> {
    let region = config.templates.storage.region.clone();
    Arc::new(JobContext {
        settings: PipelineSettings::from_config(config),
        host: Arc::new(HostGate::new(config.host.clone())),
        templates: Arc::new(RcloneTemplateSource::new(
            config.rclone_path.clone(),
            config.templates.clone(),
        )),
        fetcher: Arc::new(AssetDownloader::new(HttpDownloader::new(), region.clone())),
        store: Arc::new(S3ArtifactStore::new(region)),
        transcoder: Arc::new(
            FfmpegTranscoder::new(config.ffmpeg_path.clone()).with_timeout(config.host.timeout),
        ),
    })
}

pub async fn run(cli: Cli, config: &EngineConfig) -> anyhow::Result<Report> {
    match cli.cmd {
        Command::Analyze { job } => {
            let req: AnalyzeRequest = read_job(&job).await?;
            let outcome = Analyzer::new(build_context(config)).analyze(&req).await;
            report(outcome.is_completed(), &outcome)
        }
        Command::Render { job } => {
            let req: RenderRequest = read_job(&job).await?;
            let outcome = Renderer::new(build_context(config)).render(&req).await;
            report(outcome.is_completed(), &outcome)
        }
        Command::Preview { job } => {
            let req: PreviewRequest = read_job(&job).await?;
            let outcome = Previewer::new(build_context(config)).preview(&req).await;
            report(outcome.is_completed(), &outcome)
        }
        Command::RenderOnly { state } => {
            let enabled = state == Toggle::On;
            HostGate::new(config.host.clone())
                .set_render_only_mode(enabled)
                .await?;
            tracing::info!(enabled, marker = %config.host.render_only_marker.display(), "Render-only mode updated");
            Ok(Report {
                json: serde_json::json!({ "renderOnly": enabled }),
                failed: false,
            })
        }
    }
}

/// Read and parse a JSON job description.
pub async fn read_job<T: DeserializeOwned>(path: &Path) -> anyhow::Result<T> {
    let raw = tokio::fs::read(path)
        .await
        .with_context(|| format!("failed to read job file {}", path.display()))?;
    serde_json::from_slice(&raw)
        .with_context(|| format!("invalid job description in {}", path.display()))
}

fn report<T: serde::Serialize>(completed: bool, outcome: &T) -> anyhow::Result<Report> {
    Ok(Report {
        json: serde_json::to_value(outcome)?,
        failed: !completed,
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn job_subcommands_take_a_path() {
        let cli = Cli::try_parse_from(["aeflow-worker", "render", "job.json"]).expect("parse");
        assert_eq!(
            cli.cmd,
            Command::Render {
                job: PathBuf::from("job.json")
            }
        );
        let cli = Cli::try_parse_from(["aeflow-worker", "preview", "/tmp/p.json"]).expect("parse");
        assert_eq!(
            cli.cmd,
            Command::Preview {
                job: PathBuf::from("/tmp/p.json")
            }
        );
    }

    #[test]
    fn render_only_accepts_on_and_off() {
        let cli = Cli::try_parse_from(["aeflow-worker", "render-only", "off"]).expect("parse");
        assert_eq!(cli.cmd, Command::RenderOnly { state: Toggle::Off });
        assert!(Cli::try_parse_from(["aeflow-worker", "render-only", "maybe"]).is_err());
    }

    #[test]
    fn default_filter_enables_host_and_cloud_logs() {
        tracing_subscriber::EnvFilter::try_new(DEFAULT_LOG_FILTER).expect("valid filter");
        let directives: Vec<&str> = DEFAULT_LOG_FILTER.split(',').collect();
        assert!(directives.contains(&"aeflow::host=info"));
        assert!(directives.contains(&"aeflow_cloud=info"));
    }

    #[test]
    fn missing_job_path_is_rejected() {
        assert!(Cli::try_parse_from(["aeflow-worker", "analyze"]).is_err());
    }

    #[tokio::test]
    async fn job_files_are_parsed() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("analyze.json");
        std::fs::write(&path, r#"{"id": "a1", "template": {"path": "User/T"}}"#).expect("write");

        let req: AnalyzeRequest = read_job(&path).await.expect("job");
        assert_eq!(req.id, "a1");
        assert_eq!(req.template.path, "User/T");

        std::fs::write(&path, "{").expect("write");
        let err = read_job::<AnalyzeRequest>(&path).await.expect_err("invalid");
        assert!(err.to_string().contains("invalid job description"));
    }

    #[tokio::test]
    async fn render_only_toggles_the_marker() {
        let dir = tempfile::tempdir().expect("tempdir");
        let marker = dir.path().join("ae_render_only_node.txt");
        let mut config = EngineConfig::from_lookup(|key| match key {
            "WORKPLACE" => Some(dir.path().to_string_lossy().into_owned()),
            _ => None,
        })
        .expect("config");
        config.host.render_only_marker = marker.clone();

        let on = Cli::try_parse_from(["aeflow-worker", "render-only", "on"]).expect("parse");
        let report = run(on, &config).await.expect("run");
        assert!(!report.failed);
        assert!(marker.exists());

        let off = Cli::try_parse_from(["aeflow-worker", "render-only", "off"]).expect("parse");
        run(off, &config).await.expect("run");
        assert!(!marker.exists());
    }
}
