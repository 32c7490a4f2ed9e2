//! Compiler configuration (`SPEC_FULL.md` ADDED-2), mirroring the
//! teacher workspace's builder-pattern `CompilerConfig`.
//!
//! # Example
//!
//! ```
//! use turkc_compiler::CompilerConfig;
//!
//! let config = CompilerConfig::new()
//!     .with_entry_function("ana")
//!     .with_diagnostic_cap(100)
//!     .with_trace_codegen(false);
//! ```

/// The name of the source language's conventional entry point.
pub const DEFAULT_ENTRY_FUNCTION: &str = "ana";

/// The reference diagnostic cap from `SPEC_FULL.md` §4.2: excess
/// diagnostics beyond this count are silently dropped.
pub const DEFAULT_DIAGNOSTIC_CAP: usize = 100;

/// Compiler-wide knobs. All three stages (analyzer, generator, VM
/// front end) read from one `CompilerConfig` rather than threading
/// separate flags through each constructor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompilerConfig {
    /// The function name that becomes `main_entry` once compiled.
    /// Always `"ana"` for this source language, but kept configurable
    /// the way the teacher's `CompilerConfig` stays extensible for
    /// downstream consumers.
    pub entry_function: String,
    /// Maximum analyzer diagnostics collected before the rest are
    /// silently dropped.
    pub diagnostic_cap: usize,
    /// Whether `turkcc build`/`exec` should print the generator's
    /// function table and instruction stream (a `Disassembler`
    /// rendering) after code generation.
    pub trace_codegen: bool,
    /// Whether the VM should trace every executed instruction to
    /// stderr while running.
    pub trace_run: bool,
}

impl Default for CompilerConfig {
    fn default() -> Self {
        CompilerConfig {
            entry_function: DEFAULT_ENTRY_FUNCTION.to_string(),
            diagnostic_cap: DEFAULT_DIAGNOSTIC_CAP,
            trace_codegen: false,
            trace_run: false,
        }
    }
}

impl CompilerConfig {
    pub fn new() -> Self {
        CompilerConfig::default()
    }

    pub fn with_entry_function(mut self, name: impl Into<String>) -> Self {
        self.entry_function = name.into();
        self
    }

    pub fn with_diagnostic_cap(mut self, cap: usize) -> Self {
        self.diagnostic_cap = cap;
        self
    }

    pub fn with_trace_codegen(mut self, trace: bool) -> Self {
        self.trace_codegen = trace;
        self
    }

    pub fn with_trace_run(mut self, trace: bool) -> Self {
        self.trace_run = trace;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_uses_reference_constants() {
        let config = CompilerConfig::default();
        assert_eq!(config.entry_function, "ana");
        assert_eq!(config.diagnostic_cap, 100);
        assert!(!config.trace_codegen);
        assert!(!config.trace_run);
    }

    #[test]
    fn builder_overrides_each_field() {
        let config = CompilerConfig::new()
            .with_entry_function("main")
            .with_diagnostic_cap(10)
            .with_trace_codegen(true)
            .with_trace_run(true);
        assert_eq!(config.entry_function, "main");
        assert_eq!(config.diagnostic_cap, 10);
        assert!(config.trace_codegen);
        assert!(config.trace_run);
    }
}
