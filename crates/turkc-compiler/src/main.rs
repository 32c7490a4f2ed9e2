//! `turkcc`: the command-line front end for the TurkC toolchain
//! (`SPEC_FULL.md` ADDED-7).

use clap::{CommandFactory, Parser as ClapParser, Subcommand};
use clap_complete::{generate, Shell};
use std::fs;
use std::io;
use std::path::PathBuf;
use std::process;
use turkc_compiler::{compile, CompileError, CompilerConfig};
use turkc_core::bytecode::Program;
use turkc_core::disasm;
use turkc_vm::vm::Vm;

#[derive(ClapParser)]
#[command(name = "turkcc")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "TurkC compiler and virtual machine", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse, analyze, generate, and serialize a .tc source file to a
    /// .tkbc bytecode file.
    Build {
        input: PathBuf,
        #[arg(short, long)]
        output: PathBuf,
        /// Print the generator's function table and instruction stream.
        #[arg(long)]
        trace_codegen: bool,
        /// Print diagnostics as JSON instead of plain text.
        #[arg(long)]
        json: bool,
    },
    /// Deserialize and execute a .tkbc bytecode file.
    Run {
        program: PathBuf,
        /// Trace every executed instruction to stderr.
        #[arg(long)]
        trace: bool,
    },
    /// Build then run in one step, without touching disk.
    Exec {
        input: PathBuf,
        #[arg(long)]
        trace_codegen: bool,
        #[arg(long)]
        trace: bool,
        #[arg(long)]
        json: bool,
    },
    /// Print a disassembly of a compiled .tkbc file.
    Disasm { program: PathBuf },
    /// Generate shell completion scripts.
    Completions {
        #[arg(value_enum)]
        shell: Shell,
    },
}

fn main() {
    let cli = Cli::parse();
    let code = match cli.command {
        Commands::Build {
            input,
            output,
            trace_codegen,
            json,
        } => run_build(&input, &output, trace_codegen, json),
        Commands::Run { program, trace } => run_run(&program, trace),
        Commands::Exec {
            input,
            trace_codegen,
            trace,
            json,
        } => run_exec(&input, trace_codegen, trace, json),
        Commands::Disasm { program } => run_disasm(&program),
        Commands::Completions { shell } => {
            run_completions(shell);
            0
        }
    };
    process::exit(code);
}

fn run_completions(shell: Shell) {
    let mut cmd = Cli::command();
    generate(shell, &mut cmd, "turkcc", &mut io::stdout());
}

fn read_source(path: &PathBuf) -> Result<String, i32> {
    fs::read_to_string(path).map_err(|e| {
        eprintln!("error: failed to read {}: {e}", path.display());
        1
    })
}

fn build_config(trace_codegen: bool, trace_run: bool) -> CompilerConfig {
    CompilerConfig::new().with_trace_codegen(trace_codegen).with_trace_run(trace_run)
}

/// Compiles `source`, printing diagnostics (plain or JSON) on
/// failure. Returns the compiled program on success.
fn compile_or_report(source: &str, config: &CompilerConfig, json: bool) -> Result<Program, i32> {
    match compile(source, config) {
        Ok(output) => {
            for warning in &output.warnings {
                eprintln!("warning: {warning}");
            }
            if config.trace_codegen {
                eprint!("{}", disasm::render(&output.program));
            }
            Ok(output.program)
        }
        Err(CompileError::Parse(e)) => {
            if json {
                println!("{}", serde_json::json!([{"line": e.line, "message": e.message}]));
            } else {
                eprintln!("{e}");
            }
            Err(1)
        }
        Err(CompileError::Analysis(diagnostics)) => {
            if json {
                println!("{}", turkc_compiler::diagnostics::to_json(&diagnostics));
            } else {
                for d in &diagnostics {
                    eprintln!("{d}");
                }
            }
            Err(1)
        }
    }
}

fn run_build(input: &PathBuf, output: &PathBuf, trace_codegen: bool, json: bool) -> i32 {
    let source = match read_source(input) {
        Ok(s) => s,
        Err(code) => return code,
    };
    let config = build_config(trace_codegen, false);
    let program = match compile_or_report(&source, &config, json) {
        Ok(p) => p,
        Err(code) => return code,
    };
    if let Err(e) = fs::write(output, program.to_bytes()) {
        eprintln!("error: failed to write {}: {e}", output.display());
        return 1;
    }
    println!("Compiled {} -> {}", input.display(), output.display());
    0
}

fn run_run(path: &PathBuf, trace: bool) -> i32 {
    let bytes = match fs::read(path) {
        Ok(b) => b,
        Err(e) => {
            eprintln!("error: failed to read {}: {e}", path.display());
            return 1;
        }
    };
    let program = match Program::from_bytes(&bytes) {
        Ok(p) => p,
        Err(e) => {
            eprintln!("error: {e}");
            return 1;
        }
    };
    execute_program(&program, trace)
}

fn run_exec(input: &PathBuf, trace_codegen: bool, trace: bool, json: bool) -> i32 {
    let source = match read_source(input) {
        Ok(s) => s,
        Err(code) => return code,
    };
    let config = build_config(trace_codegen, trace);
    let program = match compile_or_report(&source, &config, json) {
        Ok(p) => p,
        Err(code) => return code,
    };
    execute_program(&program, trace)
}

fn execute_program(program: &Program, trace: bool) -> i32 {
    match Vm::new(program) {
        Ok(mut vm) => {
            vm.trace = trace;
            vm.run()
        }
        Err(e) => {
            eprintln!("error: {e}");
            1
        }
    }
}

fn run_disasm(path: &PathBuf) -> i32 {
    let bytes = match fs::read(path) {
        Ok(b) => b,
        Err(e) => {
            eprintln!("error: failed to read {}: {e}", path.display());
            return 1;
        }
    };
    match Program::from_bytes(&bytes) {
        Ok(program) => {
            print!("{}", disasm::render(&program));
            0
        }
        Err(e) => {
            eprintln!("error: {e}");
            1
        }
    }
}
