//! Literal encoding for generated scripts.
//!
//! Every caller-supplied value reaches the script as a data literal produced
//! here, never through string interpolation. JSON literals are valid in the
//! host dialect except for U+2028/U+2029, which it treats as line
//! terminators inside string literals; those are escaped as well.

use serde_json::Value;

/// Source text of the "parameter omitted" sentinel.
pub const OMITTED: &str = "undefined";

/// One positional argument of a generated call.
#[derive(Debug, Clone, PartialEq)]
pub enum ScriptArg {
    Value(Value),
    /// Rendered as `undefined` so the callee sees a missing parameter.
    Omitted,
}

impl ScriptArg {
    /// `Omitted` for `None`, the wrapped value otherwise.
    pub fn optional<T: Into<Value>>(value: Option<T>) -> Self {
        match value {
            Some(v) => Self::Value(v.into()),
            None => Self::Omitted,
        }
    }

    pub fn encode(&self) -> String {
        match self {
            Self::Value(v) => encode_literal(v),
            Self::Omitted => OMITTED.to_string(),
        }
    }
}

macro_rules! impl_from_value {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for ScriptArg {
                fn from(value: $ty) -> Self {
                    Self::Value(Value::from(value))
                }
            }
        )*
    };
}

impl_from_value!(&str, String, bool, u32, i64, f64);

impl From<Value> for ScriptArg {
    fn from(value: Value) -> Self {
        Self::Value(value)
    }
}

/// Encode a value as a literal of the host scripting dialect.
pub fn encode_literal(value: &Value) -> String {
    value
        .to_string()
        .replace('\u{2028}', "\\u2028")
        .replace('\u{2029}', "\\u2029")
}

/// Render `callee(arg, arg, ...)`.
pub fn call(callee: &str, args: &[ScriptArg]) -> String {
    let rendered: Vec<String> = args.iter().map(ScriptArg::encode).collect();
    format!("{callee}({})", rendered.join(", "))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    /// Decode a string literal the way the host's literal decoder would.
    fn decode(literal: &str) -> String {
        serde_json::from_str(literal).expect("literal must decode")
    }

    #[test]
    fn quotes_and_newlines_round_trip() {
        let values = [
            "plain",
            "say \"hi\"",
            "it's",
            "line one\nline two\r\n",
            "back\\slash",
            "\"); app.quit(); (\"",
            "*/ } catch (e) {} /*",
            "tab\there",
        ];
        for original in values {
            let literal = encode_literal(&Value::from(original));
            assert!(!literal.contains('\n'), "raw newline leaked: {literal}");
            assert_eq!(decode(&literal), original);
        }
    }

    #[test]
    fn line_separators_are_escaped() {
        let original = "a\u{2028}b\u{2029}c";
        let literal = encode_literal(&Value::from(original));
        assert_eq!(literal, "\"a\\u2028b\\u2029c\"");
        assert_eq!(decode(&literal), original);
    }

    #[test]
    fn omitted_is_distinct_from_empty_string() {
        assert_eq!(ScriptArg::Omitted.encode(), "undefined");
        assert_eq!(ScriptArg::from("").encode(), "\"\"");
        assert_eq!(ScriptArg::optional(None::<String>), ScriptArg::Omitted);
    }

    #[test]
    fn call_renders_positional_arguments() {
        let rendered = call(
            "Lab.extractMeta",
            &[ScriptArg::Omitted, ScriptArg::from("ig"), ScriptArg::from(true)],
        );
        assert_eq!(rendered, "Lab.extractMeta(undefined, \"ig\", true)");
    }

    #[test]
    fn numbers_render_bare() {
        assert_eq!(call("Lab.setResizeTo", &[1920u32.into(), 1080u32.into()]), "Lab.setResizeTo(1920, 1080)");
    }
}
