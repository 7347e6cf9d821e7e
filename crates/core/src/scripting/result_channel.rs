//! File-based result exchange with the embedded script environment.
//!
//! The script writes `{"error", "result", "logs"}` as JSON to the result file
//! in its `finally` block. [`ResultChannel::prepare`] sets up the files
//! before the host runs; [`ResultChannel::read_result`] consumes the payload
//! afterwards.

use std::path::{Path, PathBuf};

use serde::Deserialize;
use serde_json::Value;

use super::context::ScriptContext;
use crate::error::EngineError;

/// Remote stack trace, as a frame list or a single string.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum RemoteStack {
    Frames(Vec<String>),
    Text(String),
}

impl RemoteStack {
    fn joined(&self) -> String {
        match self {
            Self::Frames(frames) => frames.join("\n"),
            Self::Text(text) => text.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RemoteError {
    pub message: String,
    #[serde(default)]
    pub stack: Option<RemoteStack>,
}

/// Payload written by the script.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ResultPayload {
    #[serde(default)]
    pub error: Option<RemoteError>,
    #[serde(default)]
    pub result: Value,
    #[serde(default)]
    pub logs: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct ResultChannel {
    log_path: PathBuf,
    result_path: PathBuf,
    script_path: PathBuf,
}

impl ResultChannel {
    pub fn new(context: &ScriptContext) -> Self {
        Self {
            log_path: context.log_path.clone(),
            result_path: context.result_path.clone(),
            script_path: context.script_path.clone(),
        }
    }

    pub fn script_path(&self) -> &Path {
        &self.script_path
    }

    /// Create the log file if missing, truncate the result file and write the
    /// script text.
    pub async fn prepare(&self, script: &str) -> Result<(), EngineError> {
        for path in [&self.log_path, &self.result_path, &self.script_path] {
            if let Some(parent) = path.parent() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.log_path)
            .await?;
        tokio::fs::write(&self.result_path, b"").await?;
        tokio::fs::write(&self.script_path, script).await?;

        tracing::debug!(
            script = %self.script_path.display(),
            bytes = script.len(),
            "Script written",
        );
        Ok(())
    }

    /// Log text written by the script, empty when the file is unreadable.
    pub async fn read_log(&self) -> String {
        tokio::fs::read_to_string(&self.log_path)
            .await
            .unwrap_or_default()
    }

    /// Consume the payload: the remote error if one was recorded, the result
    /// slot otherwise.
    pub async fn read_result(&self) -> Result<Value, EngineError> {
        let payload = self.read_payload().await?;
        match payload.error {
            Some(err) => Err(EngineError::ScriptExecution {
                message: err.message,
                stack: err.stack.map(|s| s.joined()).unwrap_or_default(),
            }),
            None => Ok(payload.result),
        }
    }

    pub async fn read_payload(&self) -> Result<ResultPayload, EngineError> {
        let path = self.result_path.display();
        let text = tokio::fs::read_to_string(&self.result_path)
            .await
            .map_err(|e| EngineError::MissingOutput(format!("cannot read {path}: {e}")))?;
        if text.trim().is_empty() {
            return Err(EngineError::MissingOutput(format!("{path} is empty")));
        }
        serde_json::from_str(&text)
            .map_err(|e| EngineError::MissingOutput(format!("{path} is not a valid payload: {e}")))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
