//! FFmpeg transcoding.
//!
//! Intermediate codec renders (CineForm `.mov`) are converted to H.264 `.mp4`
//! next to the input file.

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;

use crate::collaborators::Transcoder;
use crate::error::EngineError;
use crate::host::subprocess::{self, ProcessError};

/// Error type for FFmpeg operations.
#[derive(Debug, thiserror::Error)]
pub enum FfmpegError {
    #[error("ffmpeg binary not found: {0}")]
    NotFound(std::io::Error),

    #[error("ffmpeg execution failed (exit code {exit_code}): {stderr}")]
    ExecutionFailed { exit_code: i32, stderr: String },

    #[error("ffmpeg killed after {elapsed_ms}ms timeout")]
    Timeout { elapsed_ms: u64 },

    #[error("I/O error while waiting for ffmpeg: {0}")]
    Io(std::io::Error),

    #[error("input file not found: {0}")]
    InputNotFound(String),
}

impl From<ProcessError> for FfmpegError {
    fn from(err: ProcessError) -> Self {
        match err {
            ProcessError::Spawn { source, .. } => FfmpegError::NotFound(source),
            ProcessError::Wait(source) => FfmpegError::Io(source),
            ProcessError::Timeout { elapsed_ms } => FfmpegError::Timeout { elapsed_ms },
        }
    }
}

impl From<FfmpegError> for EngineError {
    fn from(err: FfmpegError) -> Self {
        EngineError::Transcode(err.to_string())
    }
}

/// `input` with its extension replaced by `.mp4`.
pub fn h264_output_path(input: &Path) -> PathBuf {
    input.with_extension("mp4")
}

/// Transcode `input` to H.264, overwriting any existing output.
///
/// `timeout = None` waits for ffmpeg indefinitely.
pub async fn transcode_to_h264(
    ffmpeg: &str,
    input: &Path,
    output: &Path,
    timeout: Option<Duration>,
) -> Result<(), FfmpegError> {
    if !input.exists() {
        return Err(FfmpegError::InputNotFound(
            input.to_string_lossy().to_string(),
        ));
    }

    let mut cmd = Command::new(ffmpeg);
    cmd.arg("-i")
        .arg(input)
        .args(["-c:v", "h264", "-y"])
        .arg(output);
    let result = subprocess::run_command(&mut cmd, timeout).await?;

    if !result.success() {
        return Err(FfmpegError::ExecutionFailed {
            exit_code: result.exit_code,
            stderr: result.stderr.trim().to_string(),
        });
    }
    tracing::debug!(duration_ms = result.duration_ms, "ffmpeg finished");
    Ok(())
}

/// [`Transcoder`] backed by an ffmpeg binary.
#[derive(Debug, Clone)]
pub struct FfmpegTranscoder {
    binary: String,
    timeout: Option<Duration>,
}

impl FfmpegTranscoder {
    pub fn new(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
            timeout: None,
        }
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }
}

impl Default for FfmpegTranscoder {
    fn default() -> Self {
        Self::new("ffmpeg")
    }
}

#[async_trait]
impl Transcoder for FfmpegTranscoder {
    async fn to_broadly_compatible(&self, input: &Path) -> Result<PathBuf, EngineError> {
        let output = h264_output_path(input);
        tracing::info!(input = %input.display(), output = %output.display(), "Transcoding to H.264");
        transcode_to_h264(&self.binary, input, &output, self.timeout).await?;
        Ok(output)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
