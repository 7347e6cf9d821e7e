//! Analyze orchestration: extract composition metadata from every project
//! file of a template.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use aeflow_core::scripting::{self, CloseOption, PurgeTarget};
use aeflow_core::types::{AnalyzeRequest, CompositionMetadata, ProjectAnalysis};
use aeflow_core::EngineError;
use serde::Deserialize;
use walkdir::WalkDir;

use crate::context::JobContext;
use crate::outcome::JobOutcome;

/// Project file extension.
pub const PROJECT_EXTENSION: &str = "aep";

const RESULT_FIELD: &str = "compositions";

#[derive(Debug, Deserialize)]
struct Extraction {
    #[serde(default)]
    compositions: Vec<CompositionMetadata>,
}

pub struct Analyzer {
    ctx: Arc<JobContext>,
}

impl Analyzer {
    pub fn new(ctx: Arc<JobContext>) -> Self {
        Self { ctx }
    }

    /// Run the job. Failures are returned as data.
    pub async fn analyze(&self, req: &AnalyzeRequest) -> JobOutcome<Vec<ProjectAnalysis>> {
        let result = self.run(req).await;
        JobOutcome::from_result("analyze", &req.id, result)
    }

    async fn run(&self, req: &AnalyzeRequest) -> Result<Vec<ProjectAnalysis>, EngineError> {
        self.ctx.host.ensure_free()?;
        req.template.extract_options.validate()?;

        let output_dir = self.ctx.settings.workplace.join("analyzes").join(&req.id);
        tokio::fs::create_dir_all(&output_dir).await?;

        let template_dir = self.ctx.templates.sync(&req.template.path).await?;
        let walk_root = template_dir.clone();
        let projects = tokio::task::spawn_blocking(move || discover_projects(&walk_root))
            .await
            .map_err(|e| EngineError::Io(std::io::Error::other(e)))??;
        tracing::info!(
            job_id = %req.id,
            template = %req.template.path,
            projects = projects.len(),
            "Analyzing template",
        );

        let mut analyses = Vec::with_capacity(projects.len());
        for project in projects {
            let full_path = template_dir.join(project.trim_start_matches('/'));
            let compositions = self
                .extract(req, &output_dir, &template_dir, &full_path)
                .await?;
            tracing::debug!(project = %project, compositions = compositions.len(), "Project analyzed");
            analyses.push(ProjectAnalysis {
                project,
                compositions,
            });
        }
        Ok(analyses)
    }

    async fn extract(
        &self,
        req: &AnalyzeRequest,
        output_dir: &Path,
        template_dir: &Path,
        project_path: &Path,
    ) -> Result<Vec<CompositionMetadata>, EngineError> {
        let builder = self
            .ctx
            .script_builder(output_dir)
            .begin_suppress_dialogs()
            .close_project(CloseOption::DoNotSaveChanges)
            .purge(PurgeTarget::AllCaches)
            .set_template_path(template_dir)
            .open_project(project_path.to_string_lossy())
            .extract_metadata(&req.template.extract_options)?
            .save_result_as(Some(RESULT_FIELD))?
            .close_project(CloseOption::DoNotSaveChanges)
            .end_suppress_dialogs(false);

        let value = scripting::execute(builder, self.ctx.host.as_ref()).await?;
        let extraction: Extraction = serde_json::from_value(value).map_err(|e| {
            EngineError::MissingOutput(format!(
                "unexpected extraction result for {}: {e}",
                project_path.display()
            ))
        })?;
        Ok(extraction.compositions)
    }
}

/// Every project file under `root`, as sorted `/`-separated paths relative
/// to `root` with a leading `/`.
pub fn discover_projects(root: &Path) -> Result<Vec<String>, EngineError> {
    let mut projects = Vec::new();
    for entry in WalkDir::new(root).follow_links(true) {
        let entry = entry.map_err(|e| {
            EngineError::Io(
                e.into_io_error()
                    .unwrap_or_else(|| std::io::Error::other("filesystem loop in template tree")),
            )
        })?;
        let path = entry.path();
        let is_project = entry.file_type().is_file()
            && path
                .extension()
                .is_some_and(|ext| ext.eq_ignore_ascii_case(PROJECT_EXTENSION));
        if is_project {
            projects.push(relative_project_path(root, path));
        }
    }
    projects.sort();
    Ok(projects)
}

fn relative_project_path(root: &Path, path: &Path) -> String {
    let relative: PathBuf = path.strip_prefix(root).unwrap_or(path).to_path_buf();
    let parts: Vec<String> = relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();
    format!("/{}", parts.join("/"))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
