//! Render orchestration: parametrize a template, render one composition
//! headlessly and upload the result.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use aeflow_core::host::HeadlessRenderParams;
use aeflow_core::scripting::{self, CloseOption, PurgeTarget};
use aeflow_core::types::{Credentials, Layer, RenderRequest, RenderResult, UploadTarget};
use aeflow_core::EngineError;
use futures::future::try_join_all;

use crate::context::{join_relative, JobContext};
use crate::outcome::JobOutcome;

/// Container of the rendered file. The host applies the `Lossless` output
/// module, which writes QuickTime.
pub const RENDER_EXTENSION: &str = "mov";

pub struct Renderer {
    ctx: Arc<JobContext>,
}

/// Paths derived from one request.
struct RenderPaths {
    output_dir: PathBuf,
    output_path: PathBuf,
    upload_key: String,
}

impl RenderPaths {
    fn new(workplace: &Path, req: &RenderRequest) -> Self {
        let output_dir = workplace.join("render").join(&req.id);
        let file_name = format!("{}.{RENDER_EXTENSION}", req.output.name);
        let upload_key = req
            .upload
            .key
            .clone()
            .unwrap_or_else(|| format!("{}/{file_name}", req.id));
        Self {
            output_path: output_dir.join(&file_name),
            output_dir,
            upload_key,
        }
    }
}

impl Renderer {
    pub fn new(ctx: Arc<JobContext>) -> Self {
        Self { ctx }
    }

    /// Run the job. Failures are returned as data.
    pub async fn render(&self, req: &RenderRequest) -> JobOutcome<RenderResult> {
        let result = self.run(req).await;
        JobOutcome::from_result("render", &req.id, result)
    }

    async fn run(&self, req: &RenderRequest) -> Result<RenderResult, EngineError> {
        self.ctx.host.ensure_free()?;

        let credentials = req
            .upload
            .credentials
            .resolve(&req.credentials)
            .ok_or_else(|| EngineError::Upload("no credentials for the upload target".to_string()))?;
        let paths = RenderPaths::new(&self.ctx.settings.workplace, req);

        tracing::info!(
            job_id = %req.id,
            template = %req.template.path,
            composition = %req.template.composition,
            "Starting render",
        );

        let (template_dir, assets) = self.prepare(req, &paths).await?;
        let project_path = template_dir.join(&req.template.aep_name);

        self.parametrize(req, &paths, &template_dir, &project_path, &assets)
            .await?;

        let params = HeadlessRenderParams {
            project_path,
            composition_name: req.template.composition.clone(),
            output_path: paths.output_path.clone(),
            ..Default::default()
        };
        self.ctx.host.run_headless(&params).await?;

        if !tokio::fs::try_exists(&paths.output_path).await? {
            return Err(EngineError::MissingOutput(format!(
                "render produced no file at {}",
                paths.output_path.display()
            )));
        }

        let uri = self.upload(req, &paths, &credentials).await?;
        Ok(RenderResult { uri })
    }

    /// Sync the template, clear the previous output and download every asset.
    ///
    /// Returns the local template directory and `(relative path, local file)`
    /// pairs for the asset layers.
    async fn prepare(
        &self,
        req: &RenderRequest,
        paths: &RenderPaths,
    ) -> Result<(PathBuf, Vec<(String, PathBuf)>), EngineError> {
        tokio::fs::create_dir_all(&paths.output_dir).await?;
        match tokio::fs::remove_file(&paths.output_path).await {
            Ok(()) => tracing::debug!(output = %paths.output_path.display(), "Removed previous output"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }

        let template_dir = self.ctx.templates.sync(&req.template.path).await?;

        let downloads = req.layers.iter().filter_map(|layer| match layer {
            Layer::Asset(asset) => asset.resource.as_ref().map(|resource| {
                let dest = join_relative(&paths.output_dir, &asset.relative_path);
                async move {
                    if let Some(parent) = dest.parent() {
                        tokio::fs::create_dir_all(parent).await?;
                    }
                    let local = self
                        .ctx
                        .fetcher
                        .download(resource, &req.credentials, &dest)
                        .await?;
                    Ok::<_, EngineError>((asset.relative_path.clone(), local))
                }
            }),
            Layer::Text(_) => None,
        });
        let assets = try_join_all(downloads).await?;

        tracing::debug!(job_id = %req.id, assets = assets.len(), "Assets downloaded");
        Ok((template_dir, assets))
    }

    /// Apply the layer replacements and queue the composition, saving the
    /// project for the headless render.
    async fn parametrize(
        &self,
        req: &RenderRequest,
        paths: &RenderPaths,
        template_dir: &Path,
        project_path: &Path,
        assets: &[(String, PathBuf)],
    ) -> Result<(), EngineError> {
        let mut builder = self
            .ctx
            .script_builder(&paths.output_dir)
            .begin_suppress_dialogs()
            .close_project(CloseOption::DoNotSaveChanges)
            .purge(PurgeTarget::AllCaches)
            .open_project(project_path.to_string_lossy())
            .set_template_path(template_dir);

        for (relative_path, local) in assets {
            builder = builder.replace_asset(relative_path.as_str(), local.to_string_lossy());
        }
        for layer in &req.layers {
            if let Layer::Text(text) = layer {
                builder = builder.replace_text(text.name.as_str(), text.value.as_str());
            }
        }

        builder = builder
            .add_to_render_queue(req.template.composition.as_str())
            .set_output_path(paths.output_path.to_string_lossy());
        if let Some(resolution) = req.output.resolution.filter(|r| r.is_positive()) {
            builder = builder.set_resize_to(resolution.width, resolution.height);
        }
        let builder = builder
            .save_project()
            .close_project(CloseOption::SaveChanges)
            .end_suppress_dialogs(false);

        scripting::execute(builder, self.ctx.host.as_ref()).await?;
        Ok(())
    }

    async fn upload(
        &self,
        req: &RenderRequest,
        paths: &RenderPaths,
        credentials: &Credentials,
    ) -> Result<String, EngineError> {
        let target = UploadTarget {
            endpoint: req.upload.endpoint.clone(),
            bucket: req.upload.bucket.clone(),
            key: paths.upload_key.clone(),
        };
        self.ctx
            .store
            .upload(&paths.output_path, credentials, &target)
            .await
    }
}
