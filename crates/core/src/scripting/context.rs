use std::path::{Path, PathBuf};

use serde_json::{json, Value};

pub const LOG_FILE_NAME: &str = "log.log";
pub const RESULT_FILE_NAME: &str = "result.json";
pub const SCRIPT_FILE_NAME: &str = "script.jsx";

/// Paths and connection details injected into a generated script.
#[derive(Debug, Clone, PartialEq)]
pub struct ScriptContext {
    /// Live log listener address; both set or both unset.
    pub host: Option<String>,
    pub port: Option<u16>,
    pub log_path: PathBuf,
    pub result_path: PathBuf,
    pub script_path: PathBuf,
    /// Template root, stripped from reported layer paths.
    pub template_path: Option<PathBuf>,
}

impl ScriptContext {
    /// Context with the log, result and script files placed in `dir`.
    pub fn in_dir(dir: &Path) -> Self {
        Self {
            host: None,
            port: None,
            log_path: dir.join(LOG_FILE_NAME),
            result_path: dir.join(RESULT_FILE_NAME),
            script_path: dir.join(SCRIPT_FILE_NAME),
            template_path: None,
        }
    }

    pub fn with_chat(mut self, host: impl Into<String>, port: u16) -> Self {
        self.host = Some(host.into());
        self.port = Some(port);
        self
    }

    /// The context object assigned to `Lab.ctx`.
    pub fn to_value(&self) -> Value {
        json!({
            "host": self.host,
            "port": self.port,
            "logPath": self.log_path.to_string_lossy(),
            "resultPath": self.result_path.to_string_lossy(),
            "scriptPath": self.script_path.to_string_lossy(),
            "templatePath": self.template_path.as_ref().map(|p| p.to_string_lossy()),
        })
    }
}
