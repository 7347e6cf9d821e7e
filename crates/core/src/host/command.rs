//! Platform-specific command construction for host invocations.
//!
//! Commands are built as an argv vector and spawned directly, never through
//! a shell, so paths and composition names need no shell quoting.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Bundle identifier used to address a running host instance on macOS.
const MACOS_BUNDLE_ID: &str = "com.adobe.aftereffects";

/// Operating system family the host application runs on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostPlatform {
    Windows,
    MacOs,
}

impl HostPlatform {
    /// Platform of the current build target. Non-Windows targets use the
    /// macOS command forms.
    pub fn detect() -> Self {
        if cfg!(windows) {
            Self::Windows
        } else {
            Self::MacOs
        }
    }

    pub fn render_engine_file_name(self) -> &'static str {
        match self {
            Self::Windows => "aerender.exe",
            Self::MacOs => "aerender",
        }
    }

    /// Location of the render-only marker file. Its mere presence switches
    /// the host into render-only mode.
    pub fn render_only_marker_path(self) -> &'static str {
        match self {
            Self::Windows => r"C:\Users\Public\Documents\Adobe\ae_render_only_node.txt",
            Self::MacOs => "/Users/Shared/Adobe/ae_render_only_node.txt",
        }
    }
}

/// Parameters of one headless render.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HeadlessRenderParams {
    pub project_path: PathBuf,
    pub composition_name: String,
    pub output_path: PathBuf,
    pub start_frame: Option<u32>,
    pub end_frame: Option<u32>,
    pub increment: Option<u32>,
    /// Output module template name.
    pub output_template_name: Option<String>,
    /// Render settings template name.
    pub render_settings_template_name: Option<String>,
    pub log_path: Option<PathBuf>,
}

/// A program plus its arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandLine {
    pub program: String,
    pub args: Vec<String>,
}

impl CommandLine {
    /// Convert into a spawnable tokio command.
    pub fn to_command(&self) -> tokio::process::Command {
        let mut cmd = tokio::process::Command::new(&self.program);
        cmd.args(&self.args);
        cmd
    }
}

/// Build the headless render command line.
///
/// Always forces "do not save on close", multiprocessing, queue reuse and
/// "continue on missing footage". Frame arguments are only emitted when
/// greater than zero.
pub fn headless_command(render_engine: &str, params: &HeadlessRenderParams) -> CommandLine {
    let mut args = vec![
        "-project".to_string(),
        path_arg(&params.project_path),
        "-comp".to_string(),
        params.composition_name.clone(),
        "-output".to_string(),
        path_arg(&params.output_path),
    ];

    let frames = [
        ("-s", params.start_frame),
        ("-e", params.end_frame),
        ("-i", params.increment),
    ];
    for (flag, value) in frames {
        if let Some(n) = value.filter(|n| *n > 0) {
            args.push(flag.to_string());
            args.push(n.to_string());
        }
    }

    if let Some(template) = params.output_template_name.as_deref().filter(|t| !t.is_empty()) {
        args.push("-OMtemplate".to_string());
        args.push(template.to_string());
    }
    if let Some(template) = params
        .render_settings_template_name
        .as_deref()
        .filter(|t| !t.is_empty())
    {
        args.push("-RStemplate".to_string());
        args.push(template.to_string());
    }
    if let Some(log) = &params.log_path {
        args.push("-log".to_string());
        args.push(path_arg(log));
    }

    args.extend(
        [
            "-close",
            "DO_NOT_SAVE_CHANGES",
            "-mp",
            "-reuse",
            "-continueOnMissingFootage",
        ]
        .map(String::from),
    );

    CommandLine {
        program: render_engine.to_string(),
        args,
    }
}

/// Build the command asking the host to execute a script file.
///
/// Windows launches the interactive binary with `-r`; macOS activates the
/// running instance through AppleScript and asks it to run the file.
pub fn interactive_command(
    platform: HostPlatform,
    interactive_binary: &str,
    script_path: &Path,
) -> CommandLine {
    match platform {
        HostPlatform::Windows => CommandLine {
            program: interactive_binary.to_string(),
            args: vec!["-r".to_string(), path_arg(script_path)],
        },
        HostPlatform::MacOs => CommandLine {
            program: "osascript".to_string(),
            args: vec![
                "-e".to_string(),
                format!(
                    "tell application id \"{MACOS_BUNDLE_ID}\" to activate DoScriptFile \"{}\"",
                    escape_applescript(&path_arg(script_path))
                ),
            ],
        },
    }
}

fn path_arg(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

/// Escape a value for use inside an AppleScript string literal.
fn escape_applescript(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
