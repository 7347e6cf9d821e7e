//! Preview orchestration: render every requested composition output at
//! every requested resolution, normalize intermediate codecs and upload the
//! results under the template's preview folder.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use aeflow_core::host::HeadlessRenderParams;
use aeflow_core::types::{
    PreviewAep, PreviewComposition, PreviewEntry, PreviewOutput, PreviewRequest, UploadTarget,
};
use aeflow_core::EngineError;
use futures::future::try_join_all;

use crate::context::{JobContext, PreviewStorage};
use crate::outcome::JobOutcome;

/// Output module templates previews can be rendered with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputModule {
    CineForm,
    AppleProRes,
    Jpeg,
}

impl OutputModule {
    pub fn parse(template: &str) -> Result<Self, EngineError> {
        match template {
            "CineForm" => Ok(Self::CineForm),
            "AppleProRes" => Ok(Self::AppleProRes),
            "JPEG" => Ok(Self::Jpeg),
            other => Err(EngineError::ScriptBuild(format!(
                "unsupported output module template '{other}'"
            ))),
        }
    }

    /// Appended to `<height>x<width>` to form the output file name.
    pub fn file_suffix(self) -> &'static str {
        match self {
            Self::CineForm | Self::AppleProRes => ".mov",
            Self::Jpeg => "_[####].jpg",
        }
    }

    /// CineForm is an intermediate codec most players cannot decode.
    pub fn needs_transcode(self) -> bool {
        matches!(self, Self::CineForm)
    }
}

pub struct Previewer {
    ctx: Arc<JobContext>,
}

impl Previewer {
    pub fn new(ctx: Arc<JobContext>) -> Self {
        Self { ctx }
    }

    /// Run the job. Failures are returned as data.
    pub async fn preview(&self, req: &PreviewRequest) -> JobOutcome<Vec<PreviewEntry>> {
        let job_id = req.id.as_deref().unwrap_or(req.template.path.as_str());
        let result = self.run(req).await;
        JobOutcome::from_result("preview", job_id, result)
    }

    async fn run(&self, req: &PreviewRequest) -> Result<Vec<PreviewEntry>, EngineError> {
        self.ctx.host.ensure_free()?;

        for aep in &req.template.aeps {
            for composition in &aep.compositions {
                for output in &composition.outputs {
                    OutputModule::parse(&output.om_template)?;
                }
            }
        }
        let storage = self.ctx.settings.preview_storage.clone().ok_or_else(|| {
            EngineError::Upload("preview storage credentials are not configured".to_string())
        })?;

        let template_dir = self.ctx.templates.sync(&req.template.path).await?;
        tracing::info!(
            template = %req.template.path,
            projects = req.template.aeps.len(),
            resolutions = req.resolutions.len(),
            "Starting preview",
        );

        let mut entries = Vec::new();
        for aep in &req.template.aeps {
            for composition in &aep.compositions {
                let entry = self
                    .preview_composition(req, &template_dir, aep, composition, &storage)
                    .await?;
                entries.push(entry);
            }
        }
        Ok(entries)
    }

    async fn preview_composition(
        &self,
        req: &PreviewRequest,
        template_dir: &Path,
        aep: &PreviewAep,
        composition: &PreviewComposition,
        storage: &PreviewStorage,
    ) -> Result<PreviewEntry, EngineError> {
        let out_dir = self
            .ctx
            .settings
            .workplace
            .join("preview")
            .join(req.template.path.trim_matches('/'))
            .join(&composition.name);
        reset_dir(&out_dir).await?;

        let project_path = template_dir.join(&aep.file_name);
        for output in &composition.outputs {
            self.render_output(req, &project_path, composition, output, &out_dir)
                .await?;
        }

        let previews = self
            .upload_dir(req, composition, &out_dir, storage)
            .await?;
        Ok(PreviewEntry {
            project: aep.file_name.clone(),
            name: composition.name.clone(),
            previews,
        })
    }

    async fn render_output(
        &self,
        req: &PreviewRequest,
        project_path: &Path,
        composition: &PreviewComposition,
        output: &PreviewOutput,
        out_dir: &Path,
    ) -> Result<(), EngineError> {
        let module = OutputModule::parse(&output.om_template)?;

        for resolution in &req.resolutions {
            let stem = format!("{}x{}", resolution.height, resolution.width);
            let output_path = out_dir.join(format!("{stem}{}", module.file_suffix()));
            let params = HeadlessRenderParams {
                project_path: project_path.to_path_buf(),
                composition_name: composition.name.clone(),
                output_path: output_path.clone(),
                start_frame: output.start_frame,
                end_frame: output.end_frame,
                increment: output.increment,
                output_template_name: Some(output.om_template.clone()),
                ..Default::default()
            };
            self.ctx.host.run_headless(&params).await?;

            if !has_artifact(out_dir, &stem, module).await? {
                return Err(EngineError::MissingOutput(format!(
                    "{} render of '{}' at {stem} produced no file in {}",
                    output.om_template,
                    composition.name,
                    out_dir.display()
                )));
            }
            if module.needs_transcode() {
                self.ctx.transcoder.to_broadly_compatible(&output_path).await?;
                tokio::fs::remove_file(&output_path).await?;
            }
        }
        Ok(())
    }

    /// Upload every file in `out_dir`, returning the keys in file name order.
    async fn upload_dir(
        &self,
        req: &PreviewRequest,
        composition: &PreviewComposition,
        out_dir: &Path,
        storage: &PreviewStorage,
    ) -> Result<Vec<String>, EngineError> {
        let files = list_files(out_dir).await?;

        let uploads = files.iter().map(|(name, path)| {
            let target = UploadTarget {
                endpoint: storage.endpoint.clone(),
                bucket: storage.bucket.clone(),
                key: format!(
                    "{}/{}/{}/{}",
                    req.template.path.trim_matches('/'),
                    self.ctx.settings.preview_folder_name,
                    composition.name,
                    name
                ),
            };
            async move {
                self.ctx
                    .store
                    .upload(path, &storage.credentials, &target)
                    .await
            }
        });
        try_join_all(uploads).await
    }
}

/// Remove and recreate `dir` so only this run's artifacts are uploaded.
async fn reset_dir(dir: &Path) -> Result<(), EngineError> {
    match tokio::fs::remove_dir_all(dir).await {
        Ok(()) => {}
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => return Err(e.into()),
    }
    tokio::fs::create_dir_all(dir).await?;
    Ok(())
}

/// Whether `dir` holds the file (or, for image sequences, at least one
/// frame) rendered for `stem` with `module`.
async fn has_artifact(dir: &Path, stem: &str, module: OutputModule) -> Result<bool, EngineError> {
    match module {
        OutputModule::CineForm | OutputModule::AppleProRes => {
            Ok(tokio::fs::try_exists(dir.join(format!("{stem}.mov"))).await?)
        }
        OutputModule::Jpeg => {
            let frame_prefix = format!("{stem}_");
            Ok(list_files(dir)
                .await?
                .iter()
                .any(|(name, _)| name.starts_with(&frame_prefix) && name.ends_with(".jpg")))
        }
    }
}

/// Regular files directly inside `dir`, sorted by name.
async fn list_files(dir: &Path) -> Result<Vec<(String, PathBuf)>, EngineError> {
    let mut files = Vec::new();
    let mut entries = tokio::fs::read_dir(dir).await?;
    while let Some(entry) = entries.next_entry().await? {
        if entry.file_type().await?.is_file() {
            files.push((entry.file_name().to_string_lossy().into_owned(), entry.path()));
        }
    }
    files.sort();
    Ok(files)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn output_modules_map_to_suffixes() {
        assert_eq!(OutputModule::parse("CineForm").expect("cineform").file_suffix(), ".mov");
        assert_eq!(OutputModule::parse("AppleProRes").expect("prores").file_suffix(), ".mov");
        assert_eq!(OutputModule::parse("JPEG").expect("jpeg").file_suffix(), "_[####].jpg");
    }

    #[test]
    fn only_cineform_is_transcoded() {
        assert!(OutputModule::CineForm.needs_transcode());
        assert!(!OutputModule::AppleProRes.needs_transcode());
        assert!(!OutputModule::Jpeg.needs_transcode());
    }

    #[test]
    fn unknown_module_is_rejected() {
        assert_matches!(
            OutputModule::parse("H.264"),
            Err(EngineError::ScriptBuild(msg)) if msg.contains("H.264")
        );
    }

    #[tokio::test]
    async fn artifacts_are_matched_per_module() {
        let dir = tempfile::tempdir().expect("tempdir");
        std::fs::write(dir.path().join("1080x1920_0000.jpg"), b"x").expect("write");

        assert!(has_artifact(dir.path(), "1080x1920", OutputModule::Jpeg).await.expect("jpeg"));
        assert!(!has_artifact(dir.path(), "1080x1920", OutputModule::CineForm).await.expect("mov"));
        assert!(!has_artifact(dir.path(), "1920x1080", OutputModule::Jpeg).await.expect("other"));
    }

    #[tokio::test]
    async fn reset_dir_clears_previous_artifacts() {
        let dir = tempfile::tempdir().expect("tempdir");
        let out = dir.path().join("preview/User/T/Main");
        std::fs::create_dir_all(&out).expect("mkdir");
        std::fs::write(out.join("stale.jpg"), b"x").expect("write");

        reset_dir(&out).await.expect("reset");

        assert!(out.exists());
        assert!(list_files(&out).await.expect("list").is_empty());
    }
}
