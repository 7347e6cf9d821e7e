//! The only path through which the host application is invoked.
//!
//! [`HostGate`] holds the process-wide [`HostLock`] for the whole duration of
//! every headless render and interactive script run. Orchestrators depend on
//! the [`HostApplication`] trait so tests can substitute a stub host.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;

use crate::classifier::{OutputClassifier, SignatureClassifier};
use crate::config::HostConfig;
use crate::error::EngineError;
use crate::host::command::{self, HeadlessRenderParams};
use crate::host::lock::HostLock;
use crate::host::subprocess::{self, ProcessError, ProcessOutput};

/// Operations the orchestrators need from the host application.
#[async_trait]
pub trait HostApplication: Send + Sync {
    /// The lock guarding this host.
    fn lock(&self) -> &HostLock;

    fn is_busy(&self) -> bool {
        self.lock().is_busy()
    }

    /// Fail with [`EngineError::Busy`] if another invocation is in flight.
    fn ensure_free(&self) -> Result<(), EngineError> {
        self.lock().ensure_free()
    }

    /// Run a headless render and return its raw stdout.
    ///
    /// Fails when a failure signature appears in the output, whatever the
    /// exit code.
    async fn run_headless(&self, params: &HeadlessRenderParams) -> Result<String, EngineError>;

    /// Ask the host to execute a script file and wait for it to finish.
    ///
    /// Output is not interpreted; the script's own result file is
    /// authoritative.
    async fn run_interactive_script(&self, script_path: &Path) -> Result<(), EngineError>;
}

/// Real host application driven through subprocesses.
pub struct HostGate {
    config: HostConfig,
    lock: HostLock,
    classifier: Arc<dyn OutputClassifier>,
}

impl HostGate {
    /// Gate using the process-wide lock and the built-in failure signatures.
    pub fn new(config: HostConfig) -> Self {
        Self::with_parts(
            config,
            HostLock::process(),
            Arc::new(SignatureClassifier::default()),
        )
    }

    pub fn with_parts(
        config: HostConfig,
        lock: HostLock,
        classifier: Arc<dyn OutputClassifier>,
    ) -> Self {
        Self {
            config,
            lock,
            classifier,
        }
    }

    /// Create (`enabled`) or remove the render-only marker file.
    ///
    /// Removing an already absent marker is not an error.
    pub async fn set_render_only_mode(&self, enabled: bool) -> Result<(), EngineError> {
        set_render_only_marker(&self.config.render_only_marker, enabled).await
    }
}

#[async_trait]
impl HostApplication for HostGate {
    fn lock(&self) -> &HostLock {
        &self.lock
    }

    async fn run_headless(&self, params: &HeadlessRenderParams) -> Result<String, EngineError> {
        let _guard = self.lock.try_acquire()?;

        let cmdline = command::headless_command(&self.config.render_engine, params);
        tracing::info!(
            project = %params.project_path.display(),
            composition = %params.composition_name,
            output = %params.output_path.display(),
            "Starting headless render",
        );

        let output = subprocess::run_command(&mut cmdline.to_command(), self.config.timeout)
            .await
            .map_err(host_error)?;

        self.classifier.classify(&output.combined())?;
        if !output.success() {
            return Err(exit_failure("headless render", &output));
        }

        tracing::info!(
            exit_code = output.exit_code,
            duration_ms = output.duration_ms,
            "Headless render finished",
        );
        Ok(output.stdout)
    }

    async fn run_interactive_script(&self, script_path: &Path) -> Result<(), EngineError> {
        let _guard = self.lock.try_acquire()?;

        let cmdline = command::interactive_command(
            self.config.platform,
            &self.config.interactive_binary,
            script_path,
        );
        tracing::info!(script = %script_path.display(), "Running host script");

        let output = subprocess::run_command(&mut cmdline.to_command(), self.config.timeout)
            .await
            .map_err(host_error)?;

        if !output.success() {
            return Err(exit_failure("host script command", &output));
        }
        Ok(())
    }
}

/// Toggle the marker file at `marker`.
pub async fn set_render_only_marker(marker: &Path, enabled: bool) -> Result<(), EngineError> {
    if enabled {
        if let Some(parent) = marker.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(marker, b"").await?;
        tracing::info!(marker = %marker.display(), "Render-only mode enabled");
    } else {
        match tokio::fs::remove_file(marker).await {
            Ok(()) => tracing::info!(marker = %marker.display(), "Render-only mode disabled"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => {
                tracing::warn!(marker = %marker.display(), error = %e, "Failed to remove render-only marker");
            }
        }
    }
    Ok(())
}

/// Lines of stderr kept in a non-zero exit error.
const STDERR_TAIL_LINES: usize = 5;

fn exit_failure(what: &str, output: &ProcessOutput) -> EngineError {
    let lines: Vec<&str> = output
        .stderr
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect();
    let tail = lines[lines.len().saturating_sub(STDERR_TAIL_LINES)..].join("\n");
    tracing::warn!(exit_code = output.exit_code, stderr = %tail, "{what} exited with non-zero status");
    if tail.is_empty() {
        EngineError::HostRenderFailure(format!("{what} exited with code {}", output.exit_code))
    } else {
        EngineError::HostRenderFailure(format!(
            "{what} exited with code {}: {tail}",
            output.exit_code
        ))
    }
}

fn host_error(err: ProcessError) -> EngineError {
    match err {
        ProcessError::Spawn { source, .. } | ProcessError::Wait(source) => EngineError::Io(source),
        ProcessError::Timeout { elapsed_ms } => EngineError::HostRenderFailure(format!(
            "host invocation killed after {elapsed_ms}ms timeout"
        )),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[tokio::test]
    async fn render_only_marker_toggles() {
        let dir = tempfile::tempdir().expect("tempdir");
        let marker = dir.path().join("Adobe").join("ae_render_only_node.txt");

        set_render_only_marker(&marker, true).await.expect("enable");
        assert!(marker.exists());
        assert_eq!(std::fs::read(&marker).expect("read marker").len(), 0);

        set_render_only_marker(&marker, false).await.expect("disable");
        assert!(!marker.exists());

        // Already absent.
        set_render_only_marker(&marker, false)
            .await
            .expect("disable twice");
    }

    #[test]
    fn timeout_maps_to_host_failure() {
        let err = host_error(ProcessError::Timeout { elapsed_ms: 1500 });
        assert_matches!(err, EngineError::HostRenderFailure(msg) if msg.contains("1500ms"));
    }

    #[test]
    fn non_zero_exit_keeps_stderr_tail() {
        let output = ProcessOutput {
            stdout: String::new(),
            stderr: "one\ntwo\nthree\nfour\nfive\nsix\n".to_string(),
            exit_code: 2,
            duration_ms: 10,
        };
        assert_matches!(
            exit_failure("headless render", &output),
            EngineError::HostRenderFailure(msg)
                if msg == "headless render exited with code 2: two\nthree\nfour\nfive\nsix"
        );
    }
}
