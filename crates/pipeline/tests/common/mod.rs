//! Recording stubs for the orchestrator integration tests.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use aeflow_core::collaborators::{ArtifactStore, AssetFetcher, TemplateSource, Transcoder};
use aeflow_core::host::{HeadlessRenderParams, HostApplication, HostLock};
use aeflow_core::types::{Credentials, Resource, UploadTarget};
use aeflow_core::EngineError;
use aeflow_pipeline::{JobContext, PipelineSettings, PreviewStorage};
use async_trait::async_trait;
use serde_json::{json, Value};

// ---------------------------------------------------------------------------
// Host
// ---------------------------------------------------------------------------

/// Host that never launches anything.
///
/// Interactive runs write the next queued payload (or an empty success)
/// to `result.json` next to the script. Headless runs create the output
/// file, expanding a `[####]` frame pattern to frame `0000`.
#[derive(Default)]
pub struct StubHost {
    lock: HostLock,
    pub headless: Mutex<Vec<HeadlessRenderParams>>,
    pub scripts: Mutex<Vec<String>>,
    payloads: Mutex<VecDeque<Value>>,
    headless_failure: Mutex<Option<String>>,
    skip_output: Mutex<bool>,
}

impl StubHost {
    pub fn queue_payload(&self, payload: Value) {
        self.payloads.lock().unwrap().push_back(payload);
    }

    pub fn fail_headless_with(&self, line: &str) {
        *self.headless_failure.lock().unwrap() = Some(line.to_string());
    }

    /// Headless runs succeed but write no output file.
    pub fn skip_output(&self) {
        *self.skip_output.lock().unwrap() = true;
    }

    pub fn headless_calls(&self) -> Vec<HeadlessRenderParams> {
        self.headless.lock().unwrap().clone()
    }

    pub fn script_texts(&self) -> Vec<String> {
        self.scripts.lock().unwrap().clone()
    }
}

#[async_trait]
impl HostApplication for StubHost {
    fn lock(&self) -> &HostLock {
        &self.lock
    }

    async fn run_headless(&self, params: &HeadlessRenderParams) -> Result<String, EngineError> {
        let _guard = self.lock.try_acquire()?;
        self.headless.lock().unwrap().push(params.clone());

        if let Some(line) = self.headless_failure.lock().unwrap().clone() {
            return Err(EngineError::HostRenderFailure(line));
        }

        if *self.skip_output.lock().unwrap() {
            return Ok("PROGRESS: done".to_string());
        }
        let output = params.output_path.to_string_lossy().replace("[####]", "0000");
        std::fs::write(&output, b"frames").expect("write stub render output");
        Ok("PROGRESS: done".to_string())
    }

    async fn run_interactive_script(&self, script_path: &Path) -> Result<(), EngineError> {
        let _guard = self.lock.try_acquire()?;
        let text = std::fs::read_to_string(script_path).expect("script written before run");
        self.scripts.lock().unwrap().push(text);

        let payload = self
            .payloads
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| json!({"error": null, "result": {}, "logs": []}));
        let dir = script_path.parent().expect("script dir");
        std::fs::write(dir.join("result.json"), payload.to_string()).expect("write payload");
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Collaborators
// ---------------------------------------------------------------------------

/// Serves templates from a local directory, recording each sync.
pub struct StubTemplates {
    pub root: PathBuf,
    pub synced: Mutex<Vec<String>>,
}

#[async_trait]
impl TemplateSource for StubTemplates {
    async fn sync(&self, template_path: &str) -> Result<PathBuf, EngineError> {
        self.synced.lock().unwrap().push(template_path.to_string());
        let local = self.root.join(template_path);
        std::fs::create_dir_all(&local)?;
        Ok(local)
    }
}

#[derive(Default)]
pub struct StubFetcher {
    pub downloads: Mutex<Vec<(Resource, PathBuf)>>,
}

#[async_trait]
impl AssetFetcher for StubFetcher {
    async fn download(
        &self,
        resource: &Resource,
        _credentials: &[Credentials],
        destination: &Path,
    ) -> Result<PathBuf, EngineError> {
        std::fs::write(destination, b"asset")?;
        self.downloads
            .lock()
            .unwrap()
            .push((resource.clone(), destination.to_path_buf()));
        Ok(destination.to_path_buf())
    }
}

#[derive(Default)]
pub struct StubStore {
    pub uploads: Mutex<Vec<(PathBuf, Credentials, UploadTarget)>>,
}

impl StubStore {
    pub fn keys(&self) -> Vec<String> {
        self.uploads
            .lock()
            .unwrap()
            .iter()
            .map(|(_, _, target)| target.key.clone())
            .collect()
    }
}

#[async_trait]
impl ArtifactStore for StubStore {
    async fn upload(
        &self,
        local: &Path,
        credentials: &Credentials,
        target: &UploadTarget,
    ) -> Result<String, EngineError> {
        if !local.exists() {
            return Err(EngineError::Upload(format!("{} does not exist", local.display())));
        }
        self.uploads
            .lock()
            .unwrap()
            .push((local.to_path_buf(), credentials.clone(), target.clone()));
        Ok(target.key.clone())
    }
}

#[derive(Default)]
pub struct StubTranscoder {
    pub inputs: Mutex<Vec<PathBuf>>,
}

#[async_trait]
impl Transcoder for StubTranscoder {
    async fn to_broadly_compatible(&self, input: &Path) -> Result<PathBuf, EngineError> {
        let output = input.with_extension("mp4");
        std::fs::write(&output, b"h264")?;
        self.inputs.lock().unwrap().push(input.to_path_buf());
        Ok(output)
    }
}

// ---------------------------------------------------------------------------
// Harness
// ---------------------------------------------------------------------------

pub struct Harness {
    pub dir: tempfile::TempDir,
    pub ctx: Arc<JobContext>,
    pub host: Arc<StubHost>,
    pub templates: Arc<StubTemplates>,
    pub fetcher: Arc<StubFetcher>,
    pub store: Arc<StubStore>,
    pub transcoder: Arc<StubTranscoder>,
}

impl Harness {
    pub fn workplace(&self) -> PathBuf {
        self.dir.path().join("workplace")
    }

    pub fn template_root(&self) -> PathBuf {
        self.dir.path().join("templates")
    }
}

pub fn preview_credentials() -> Credentials {
    Credentials {
        access_key_id: "PREVIEW_AK".to_string(),
        secret_access_key: "PREVIEW_SK".to_string(),
    }
}

pub fn harness() -> Harness {
    let dir = tempfile::tempdir().expect("tempdir");
    let host = Arc::new(StubHost::default());
    let templates = Arc::new(StubTemplates {
        root: dir.path().join("templates"),
        synced: Mutex::new(Vec::new()),
    });
    let fetcher = Arc::new(StubFetcher::default());
    let store = Arc::new(StubStore::default());
    let transcoder = Arc::new(StubTranscoder::default());

    let mut settings = PipelineSettings::new(dir.path().join("workplace"));
    settings.preview_storage = Some(PreviewStorage {
        credentials: preview_credentials(),
        endpoint: Some("ams3.example.com".to_string()),
        bucket: "templates".to_string(),
    });

    let ctx = Arc::new(JobContext {
        settings,
        host: host.clone(),
        templates: templates.clone(),
        fetcher: fetcher.clone(),
        store: store.clone(),
        transcoder: transcoder.clone(),
    });

    Harness {
        dir,
        ctx,
        host,
        templates,
        fetcher,
        store,
        transcoder,
    }
}
