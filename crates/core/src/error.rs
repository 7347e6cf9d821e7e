use serde::Serialize;

/// Error taxonomy shared by every layer of the automation engine.
///
/// Orchestrators never propagate these past the job boundary; they are
/// converted into [`ErrorKind`] + message pairs and returned as data.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// The host application is already running another invocation.
    #[error("Host busy: {0}")]
    Busy(String),

    /// Parameters supplied to the script builder are invalid.
    #[error("Script build failed: {0}")]
    ScriptBuild(String),

    /// The script raised an error inside the host's embedded environment.
    #[error("Script execution failed: {message}")]
    ScriptExecution { message: String, stack: String },

    /// A failure signature was found in headless render output.
    #[error("Host render failure: {0}")]
    HostRenderFailure(String),

    /// The result file was absent, empty or unreadable after execution.
    #[error("Missing script output: {0}")]
    MissingOutput(String),

    #[error("Template sync failed: {0}")]
    Sync(String),

    #[error("Download failed: {0}")]
    Download(String),

    #[error("Upload failed: {0}")]
    Upload(String),

    #[error("Transcode failed: {0}")]
    Transcode(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Serializable discriminant of [`EngineError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Busy,
    ScriptBuild,
    ScriptExecution,
    HostRenderFailure,
    MissingOutput,
    Sync,
    Download,
    Upload,
    Transcode,
    Config,
    Io,
}

impl EngineError {
    /// Classify this error for result records and logs.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Busy(_) => ErrorKind::Busy,
            Self::ScriptBuild(_) => ErrorKind::ScriptBuild,
            Self::ScriptExecution { .. } => ErrorKind::ScriptExecution,
            Self::HostRenderFailure(_) => ErrorKind::HostRenderFailure,
            Self::MissingOutput(_) => ErrorKind::MissingOutput,
            Self::Sync(_) => ErrorKind::Sync,
            Self::Download(_) => ErrorKind::Download,
            Self::Upload(_) => ErrorKind::Upload,
            Self::Transcode(_) => ErrorKind::Transcode,
            Self::Config(_) => ErrorKind::Config,
            Self::Io(_) => ErrorKind::Io,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
