//! The diagnostic types shared by the semantic analyzer and the `--json`
//! CLI output path (`SPEC_FULL.md` ADDED-2). Plain hand-rolled
//! `Display`, no `thiserror`/`anyhow`, matching the rest of this
//! workspace.

use serde::{Deserialize, Serialize};
use std::fmt;

/// One analyzer finding: a source line and a human-readable message.
/// Code generator diagnostics are plain `String`s instead (section 6:
/// "Code generator diagnostics carry no line — they reference symbolic
/// entities").
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub line: u32,
    pub message: String,
}

impl Diagnostic {
    pub fn new(line: u32, message: impl Into<String>) -> Self {
        Diagnostic {
            line,
            message: message.into(),
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}: {}", self.line, self.message)
    }
}

/// Renders a diagnostic list as `--json` does: a top-level array,
/// empty array when there is nothing to report.
pub fn to_json(diagnostics: &[Diagnostic]) -> String {
    serde_json::to_string_pretty(diagnostics).unwrap_or_else(|_| "[]".to_string())
}
