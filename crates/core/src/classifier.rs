//! Failure detection for headless render output.
//!
//! The headless render command reports failures only as text, often with a
//! zero exit code. [`SignatureClassifier`] scans the combined stdout+stderr
//! line by line against a versioned list of failure signatures.

use regex::Regex;

use crate::error::EngineError;

/// Failure signatures, version 1. Order matters only for which pattern is
/// reported in logs; any match on any line is fatal.
pub const FAILURE_SIGNATURES_V1: &[&str] = &[
    r".*aerender ERROR:.*",
    r".*After Effects error:[^\r\n]+",
    r".*logged one error.*",
    r".*Rendering error while writing to file",
    r"aerender ERROR",
    r"Unable to obtain a license",
];

/// Decides whether process output describes a failed run.
pub trait OutputClassifier: Send + Sync {
    /// Return `Err(HostRenderFailure)` carrying the offending line, or `Ok(())`
    /// when the output is clean.
    fn classify(&self, output: &str) -> Result<(), EngineError>;
}

/// Regex-based classifier over a fixed signature list.
#[derive(Debug, Clone)]
pub struct SignatureClassifier {
    patterns: Vec<Regex>,
}

impl SignatureClassifier {
    /// Compile a classifier from raw signature patterns.
    pub fn new(signatures: &[&str]) -> Result<Self, regex::Error> {
        let patterns = signatures
            .iter()
            .map(|s| Regex::new(s))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { patterns })
    }
}

impl Default for SignatureClassifier {
    fn default() -> Self {
        Self::new(FAILURE_SIGNATURES_V1).expect("built-in failure signatures must compile")
    }
}

impl OutputClassifier for SignatureClassifier {
    fn classify(&self, output: &str) -> Result<(), EngineError> {
        for line in output.split('\n') {
            let line = line.trim_end_matches('\r');
            if let Some(pattern) = self.patterns.iter().find(|p| p.is_match(line)) {
                tracing::debug!(pattern = pattern.as_str(), line, "Failure signature matched");
                return Err(EngineError::HostRenderFailure(line.to_string()));
            }
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
