//! TurkC Compiler: lexer, parser, symbol table, semantic analyzer, and
//! code generator for the source language (`SPEC_FULL.md` ADDED-4),
//! plus the `turkcc` CLI binary (`src/main.rs`).
//!
//! # Pipeline
//!
//! ```text
//! source text -> (lexer + parser) -> AST
//!             -> (analyzer)       -> symbol table + diagnostics
//!             -> (codegen)        -> bytecode Program
//! ```
//!
//! [`compile`] runs the whole pipeline and stops at the first stage
//! that fails, matching the strictly-pipelined control flow section 2
//! describes ("no stage re-enters an earlier one").

pub mod analyzer;
pub mod codegen;
pub mod config;
pub mod diagnostics;
pub mod lexer;
pub mod parser;
pub mod symbol_table;

pub use analyzer::{analyze, AnalysisResult};
pub use codegen::{generate, GenResult};
pub use config::CompilerConfig;
pub use diagnostics::Diagnostic;
pub use parser::{parse, ParseError};
pub use symbol_table::SymbolTable;

use std::fmt;
use turkc_core::bytecode::Program;

/// Everything [`compile`] produces on success: the bytecode program
/// and any non-fatal code generator warnings.
pub struct CompileOutput {
    pub program: Program,
    pub warnings: Vec<String>,
}

/// Everything that can make the compiler pipeline fail before a
/// `Program` exists. Each variant carries what that stage itself
/// produces (section 7's propagation table): a single [`ParseError`],
/// or the analyzer's full diagnostic list.
#[derive(Debug, Clone, PartialEq)]
pub enum CompileError {
    Parse(ParseError),
    Analysis(Vec<Diagnostic>),
}

impl fmt::Display for CompileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CompileError::Parse(e) => write!(f, "parse error: {e}"),
            CompileError::Analysis(diags) => {
                writeln!(f, "{} analysis error(s):", diags.len())?;
                for d in diags {
                    writeln!(f, "  {d}")?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for CompileError {}

impl From<ParseError> for CompileError {
    fn from(e: ParseError) -> Self {
        CompileError::Parse(e)
    }
}

/// Runs the full compiler pipeline (parse -> analyze -> codegen) over
/// `source`, stopping at the first stage that fails.
pub fn compile(source: &str, config: &CompilerConfig) -> Result<CompileOutput, CompileError> {
    let ast = parse(source)?;
    let analysis = analyze(&ast, config);
    if !analysis.success {
        return Err(CompileError::Analysis(analysis.diagnostics));
    }
    let gen = generate(&ast, &analysis.symbols, config);
    Ok(CompileOutput {
        program: gen.program,
        warnings: gen.warnings,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compile_rejects_parse_errors_before_analysis_runs() {
        let result = compile("int ana( { return 1; }", &CompilerConfig::default());
        assert!(matches!(result, Err(CompileError::Parse(_))));
    }

    #[test]
    fn compile_rejects_semantic_errors_before_codegen_runs() {
        let result = compile("int ana() { int x = 1; int x = 2; return x; }", &CompilerConfig::default());
        assert!(matches!(result, Err(CompileError::Analysis(_))));
    }

    #[test]
    fn compile_succeeds_on_a_well_typed_program() {
        let result = compile("int ana() { return 42; }", &CompilerConfig::default()).unwrap();
        assert!(result.program.is_executable());
    }
}
