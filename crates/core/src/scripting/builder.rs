//! Fluent script builder.
//!
//! A [`ScriptBuilder`] accumulates [`Instruction`]s and serializes them into
//! one program for the host's embedded scripting environment. The serialized
//! program always inlines the runtime library and wraps the instructions in a
//! `try/catch/finally` that writes the log and result files, which is the
//! only way a failure inside the host becomes visible to this process.

use std::path::PathBuf;

use super::context::ScriptContext;
use super::instruction::{CloseOption, ExtractOptions, Instruction, PurgeTarget};
use super::literal::encode_literal;
use crate::error::EngineError;

/// Runtime library inlined ahead of every program.
pub const LAB_LIBRARY: &str = include_str!("lab.jsx");

#[derive(Debug, Clone)]
pub struct ScriptBuilder {
    context: ScriptContext,
    includes: Vec<String>,
    instructions: Vec<Instruction>,
}

impl ScriptBuilder {
    pub fn new(context: ScriptContext) -> Self {
        Self {
            context,
            includes: Vec::new(),
            instructions: Vec::new(),
        }
    }

    /// Extra files pulled in with `#include` ahead of the library.
    pub fn with_includes(mut self, includes: impl IntoIterator<Item = String>) -> Self {
        self.includes.extend(includes);
        self
    }

    pub fn context(&self) -> &ScriptContext {
        &self.context
    }

    pub fn context_mut(&mut self) -> &mut ScriptContext {
        &mut self.context
    }

    pub fn instructions(&self) -> &[Instruction] {
        &self.instructions
    }

    fn push(mut self, instruction: Instruction) -> Self {
        self.instructions.push(instruction);
        self
    }

    pub fn set_template_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.context.template_path = Some(path.into());
        self
    }

    pub fn open_project(self, path: impl Into<String>) -> Self {
        self.push(Instruction::OpenProject { path: path.into() })
    }

    pub fn close_project(self, option: CloseOption) -> Self {
        self.push(Instruction::CloseProject(option))
    }

    pub fn save_project(self) -> Self {
        self.push(Instruction::SaveProject)
    }

    pub fn begin_suppress_dialogs(self) -> Self {
        self.push(Instruction::BeginSuppressDialogs)
    }

    pub fn end_suppress_dialogs(self, alert: bool) -> Self {
        self.push(Instruction::EndSuppressDialogs { alert })
    }

    pub fn purge(self, target: PurgeTarget) -> Self {
        self.push(Instruction::Purge(target))
    }

    pub fn replace_text(self, layer_name: impl Into<String>, value: impl Into<String>) -> Self {
        self.push(Instruction::ReplaceText {
            layer_name: layer_name.into(),
            value: value.into(),
        })
    }

    pub fn replace_asset(self, match_path: impl Into<String>, new_path: impl Into<String>) -> Self {
        self.push(Instruction::ReplaceAsset {
            match_path: match_path.into(),
            new_path: new_path.into(),
        })
    }

    /// Queue the first composition named exactly `composition`. The script
    /// throws at run time when no composition matches.
    pub fn add_to_render_queue(self, composition: impl Into<String>) -> Self {
        self.push(Instruction::AddToRenderQueue {
            composition: composition.into(),
        })
    }

    pub fn set_output_path(self, path: impl Into<String>) -> Self {
        self.push(Instruction::SetOutputPath { path: path.into() })
    }

    pub fn set_resize_to(self, width: u32, height: u32) -> Self {
        self.push(Instruction::SetResizeTo { width, height })
    }

    /// Append a metadata extraction. Invalid options fail here, before any
    /// script text exists.
    pub fn extract_metadata(self, options: &ExtractOptions) -> Result<Self, EngineError> {
        let spec = options.validate()?;
        Ok(self.push(Instruction::ExtractMetadata(spec)))
    }

    pub fn render(self) -> Self {
        self.push(Instruction::Render)
    }

    /// Append a trusted raw fragment.
    pub fn run_code(self, code: impl Into<String>) -> Self {
        self.push(Instruction::Code(code.into()))
    }

    /// Re-wrap the last instruction so its value lands in the result export,
    /// under `field` or as the whole result when `field` is `None`.
    pub fn save_result_as(mut self, field: Option<&str>) -> Result<Self, EngineError> {
        let inner = self.instructions.pop().ok_or_else(|| {
            EngineError::ScriptBuild("saveResultAs requires a preceding instruction".to_string())
        })?;
        Ok(self.push(Instruction::SaveResultAs {
            inner: Box::new(inner),
            field: field.map(str::to_string),
        }))
    }

    /// Produce the complete program text.
    pub fn serialize(&self) -> String {
        let mut out = String::new();

        for include in &self.includes {
            out.push_str("#include ");
            out.push_str(&encode_literal(&include.as_str().into()));
            out.push('\n');
        }
        out.push_str(LAB_LIBRARY);
        out.push('\n');

        out.push_str("try {\n");
        out.push_str("  Lab.ctx = ");
        out.push_str(&encode_literal(&self.context.to_value()));
        out.push_str(";\n");
        out.push_str("  Lab.connect();\n");
        for instruction in &self.instructions {
            for line in instruction.render().lines() {
                out.push_str("  ");
                out.push_str(line);
                out.push('\n');
            }
        }
        out.push_str("} catch (err) {\n");
        out.push_str("  Lab.setError(err);\n");
        out.push_str("} finally {\n");
        out.push_str("  Lab.writeLog();\n");
        out.push_str("  Lab.writeResult();\n");
        out.push_str("}\n");
        out
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
