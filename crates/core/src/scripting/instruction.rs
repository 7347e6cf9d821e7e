//! Typed instruction set for generated scripts.
//!
//! Each [`Instruction`] renders to a single call expression against the
//! embedded library (or the host's `app` object). All argument encoding goes
//! through [`literal`](super::literal).

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::literal::{call, ScriptArg};
use crate::error::EngineError;

/// Regex flags understood by the host scripting engine.
pub const SUPPORTED_REGEX_FLAGS: &[char] = &['i', 'm', 'g'];

/// What to do with unsaved changes when closing a project.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CloseOption {
    #[default]
    DoNotSaveChanges,
    PromptToSaveChanges,
    SaveChanges,
}

impl CloseOption {
    pub fn as_script(self) -> &'static str {
        match self {
            Self::DoNotSaveChanges => "CloseOptions.DO_NOT_SAVE_CHANGES",
            Self::PromptToSaveChanges => "CloseOptions.PROMPT_TO_SAVE_CHANGES",
            Self::SaveChanges => "CloseOptions.SAVE_CHANGES",
        }
    }
}

/// Which host caches to purge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PurgeTarget {
    ImageCaches,
    SnapshotCaches,
    UndoCaches,
    #[default]
    AllCaches,
}

impl PurgeTarget {
    pub fn as_script(self) -> &'static str {
        match self {
            Self::ImageCaches => "PurgeTarget.IMAGE_CACHES",
            Self::SnapshotCaches => "PurgeTarget.SNAPSHOT_CACHES",
            Self::UndoCaches => "PurgeTarget.UNDO_CACHES",
            Self::AllCaches => "PurgeTarget.ALL_CACHES",
        }
    }
}

/// Caller-facing metadata extraction options, as they arrive in a job.
///
/// `folder_filter` is kept as a raw value so a non-string filter can be
/// rejected with a build error instead of a deserialization failure.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractOptions {
    #[serde(default, alias = "folderRegExp")]
    pub folder_filter: Option<Value>,
    #[serde(default)]
    pub flags: Option<String>,
    #[serde(default, alias = "onlyUnused")]
    pub only_unused_compositions: bool,
}

/// Validated folder filter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FolderFilter {
    pub pattern: String,
    pub flags: Option<String>,
}

/// Validated extraction options.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractSpec {
    pub folder_filter: Option<FolderFilter>,
    /// Flags given without a pattern still get validated and forwarded.
    pub flags: Option<String>,
    pub only_unused_compositions: bool,
}

impl ExtractOptions {
    /// Validate the options before any script text is produced.
    pub fn validate(&self) -> Result<ExtractSpec, EngineError> {
        if let Some(flags) = &self.flags {
            validate_regex_flags(flags)?;
        }

        let pattern = match &self.folder_filter {
            None | Some(Value::Null) => None,
            Some(Value::String(s)) if s.is_empty() => None,
            Some(Value::String(s)) => Some(s.clone()),
            Some(other) => {
                return Err(EngineError::ScriptBuild(format!(
                    "'folderFilter' must be a string, got {}",
                    json_type_name(other)
                )))
            }
        };

        Ok(ExtractSpec {
            folder_filter: pattern.map(|pattern| FolderFilter {
                pattern,
                flags: self.flags.clone(),
            }),
            flags: self.flags.clone(),
            only_unused_compositions: self.only_unused_compositions,
        })
    }
}

/// Reject any flag outside [`SUPPORTED_REGEX_FLAGS`], naming the first offender.
pub fn validate_regex_flags(flags: &str) -> Result<(), EngineError> {
    match flags.chars().find(|c| !SUPPORTED_REGEX_FLAGS.contains(c)) {
        Some(bad) => Err(EngineError::ScriptBuild(format!(
            "the flag '{bad}' is not supported by the host scripting engine"
        ))),
        None => Ok(()),
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// One step of a generated script.
#[derive(Debug, Clone, PartialEq)]
pub enum Instruction {
    OpenProject { path: String },
    CloseProject(CloseOption),
    SaveProject,
    BeginSuppressDialogs,
    EndSuppressDialogs { alert: bool },
    Purge(PurgeTarget),
    ReplaceText { layer_name: String, value: String },
    ReplaceAsset { match_path: String, new_path: String },
    AddToRenderQueue { composition: String },
    SetOutputPath { path: String },
    SetResizeTo { width: u32, height: u32 },
    ExtractMetadata(ExtractSpec),
    Render,
    /// Trusted raw fragment.
    Code(String),
    /// Evaluate `inner` and store its value in the export object.
    SaveResultAs {
        inner: Box<Instruction>,
        field: Option<String>,
    },
}

impl Instruction {
    /// The call expression this instruction evaluates, or `None` for raw code.
    fn expression(&self) -> Option<String> {
        let expr = match self {
            Self::OpenProject { path } => call("Lab.openProject", &[path.as_str().into()]),
            Self::CloseProject(option) => format!("Lab.closeProject({})", option.as_script()),
            Self::SaveProject => "Lab.saveProject()".to_string(),
            Self::BeginSuppressDialogs => "app.beginSuppressDialogs()".to_string(),
            Self::EndSuppressDialogs { alert } => call("app.endSuppressDialogs", &[(*alert).into()]),
            Self::Purge(target) => format!("app.purge({})", target.as_script()),
            Self::ReplaceText { layer_name, value } => call(
                "Lab.replaceText",
                &[layer_name.as_str().into(), value.as_str().into()],
            ),
            Self::ReplaceAsset {
                match_path,
                new_path,
            } => call(
                "Lab.replaceAsset",
                &[match_path.as_str().into(), new_path.as_str().into()],
            ),
            Self::AddToRenderQueue { composition } => {
                call("Lab.addToRenderQueue", &[composition.as_str().into()])
            }
            Self::SetOutputPath { path } => call("Lab.setOutputPath", &[path.as_str().into()]),
            Self::SetResizeTo { width, height } => {
                call("Lab.setResizeTo", &[(*width).into(), (*height).into()])
            }
            Self::ExtractMetadata(spec) => call(
                "Lab.extractMeta",
                &[
                    ScriptArg::optional(spec.folder_filter.as_ref().map(|f| f.pattern.clone())),
                    ScriptArg::optional(spec.flags.clone()),
                    spec.only_unused_compositions.into(),
                ],
            ),
            Self::Render => "app.project.renderQueue.render()".to_string(),
            Self::Code(_) => return None,
            Self::SaveResultAs { inner, field } => format!(
                "Lab.saveAs({}, {})",
                inner.value_block(),
                ScriptArg::optional(field.clone()).encode()
            ),
        };
        Some(expr)
    }

    /// Render as a top-level statement.
    pub fn render(&self) -> String {
        match self {
            Self::Code(code) => normalize_code(code),
            other => format!("{};", other.expression().unwrap_or_default()),
        }
    }

    /// Render as an immediately invoked block yielding the instruction's value.
    pub fn value_block(&self) -> String {
        match self {
            Self::Code(code) => format!("(function () {{\n{}\n}})()", normalize_code(code)),
            other => format!(
                "(function () {{ return {}; }})()",
                other.expression().unwrap_or_default()
            ),
        }
    }
}

/// Prefix fragments starting with `(` so they cannot be parsed as a call on
/// the previous statement.
fn normalize_code(code: &str) -> String {
    if code.starts_with('(') {
        format!(";{code}")
    } else {
        code.to_string()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use serde_json::json;

    use super::*;

    #[test]
    fn supported_flags_pass() {
        assert!(validate_regex_flags("igm").is_ok());
        assert!(validate_regex_flags("").is_ok());
    }

    #[test]
    fn unsupported_flag_is_named() {
        assert_matches!(
            validate_regex_flags("x"),
            Err(EngineError::ScriptBuild(msg)) if msg.contains("'x'")
        );
        assert_matches!(
            validate_regex_flags("gy"),
            Err(EngineError::ScriptBuild(msg)) if msg.contains("'y'")
        );
    }

    #[test]
    fn non_string_folder_filter_rejected() {
        let opts = ExtractOptions {
            folder_filter: Some(json!(42)),
            ..Default::default()
        };
        assert_matches!(
            opts.validate(),
            Err(EngineError::ScriptBuild(msg)) if msg.contains("number")
        );
    }

    #[test]
    fn extract_options_accept_legacy_field_names() {
        let opts: ExtractOptions = serde_json::from_value(json!({
            "folderRegExp": "^Out",
            "flags": "i",
            "onlyUnused": true
        }))
        .expect("deserialize");
        let spec = opts.validate().expect("valid");
        assert_eq!(
            spec.folder_filter,
            Some(FolderFilter {
                pattern: "^Out".to_string(),
                flags: Some("i".to_string())
            })
        );
        assert!(spec.only_unused_compositions);
    }

    #[test]
    fn extract_renders_omitted_filter_as_sentinel() {
        let spec = ExtractOptions::default().validate().expect("valid");
        assert_eq!(
            Instruction::ExtractMetadata(spec).render(),
            "Lab.extractMeta(undefined, undefined, false);"
        );
    }

    #[test]
    fn replace_text_encodes_hostile_values() {
        let instr = Instruction::ReplaceText {
            layer_name: "Title".to_string(),
            value: "\"); app.quit(); (\"".to_string(),
        };
        assert_eq!(
            instr.render(),
            r#"Lab.replaceText("Title", "\"); app.quit(); (\"");"#
        );
    }

    #[test]
    fn save_result_wraps_inner_expression() {
        let inner = Instruction::Render;
        let wrapped = Instruction::SaveResultAs {
            inner: Box::new(inner),
            field: Some("out".to_string()),
        };
        assert_eq!(
            wrapped.render(),
            "Lab.saveAs((function () { return app.project.renderQueue.render(); })(), \"out\");"
        );
    }

    #[test]
    fn save_result_without_field_passes_sentinel() {
        let wrapped = Instruction::SaveResultAs {
            inner: Box::new(Instruction::Code("return 1".to_string())),
            field: None,
        };
        assert_eq!(
            wrapped.render(),
            "Lab.saveAs((function () {\nreturn 1\n})(), undefined);"
        );
    }

    #[test]
    fn code_starting_with_paren_is_guarded() {
        assert_eq!(Instruction::Code("(x)()".into()).render(), ";(x)()");
    }

    #[test]
    fn enum_script_names() {
        assert_eq!(
            Instruction::CloseProject(CloseOption::SaveChanges).render(),
            "Lab.closeProject(CloseOptions.SAVE_CHANGES);"
        );
        assert_eq!(
            Instruction::Purge(PurgeTarget::default()).render(),
            "app.purge(PurgeTarget.ALL_CACHES);"
        );
    }
}
