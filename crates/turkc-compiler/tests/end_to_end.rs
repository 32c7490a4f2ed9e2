//! Integration tests exercising the full pipeline — parse, analyze,
//! generate, execute — the way `turkcc exec` drives it. These are the
//! literal end-to-end scenarios from `SPEC_FULL.md` §8.

use turkc_compiler::{analyze, compile, generate, parse, CompileError, CompilerConfig};
use turkc_core::bytecode::Program;
use turkc_vm::vm::execute;

fn run(source: &str) -> i32 {
    let output = compile(source, &CompilerConfig::default()).expect("pipeline should succeed");
    execute(&output.program, false).expect("program should have an ana entry point")
}

#[test]
fn scenario_1_return_constant() {
    assert_eq!(run("int ana() { return 42; }"), 42);
}

#[test]
fn scenario_2_arithmetic() {
    assert_eq!(run("int ana() { return (3 + 4) * 2 - 1; }"), 13);
}

#[test]
fn scenario_3_branching() {
    assert_eq!(run("int ana() { int x = 10; if (x > 5) return 1; else return 0; }"), 1);
    assert_eq!(run("int ana() { int x = 10; if (x > 50) return 1; else return 0; }"), 0);
}

#[test]
fn scenario_4_while_loop_sums_one_through_ten() {
    let source = "int ana() { int sum = 0; int i = 1; while (i <= 10) { sum = sum + i; i = i + 1; } return sum; }";
    assert_eq!(run(source), 55);
}

#[test]
fn scenario_5_function_call_with_parameters() {
    let source = "int topla(int a, int b) { return a + b; } int ana() { return topla(20, 22); }";
    assert_eq!(run(source), 42);
}

#[test]
fn scenario_6_scoping_error_is_one_diagnostic_and_execution_is_not_attempted() {
    let source = "int ana() { int x = 1; int x = 2; return x; }";
    match compile(source, &CompilerConfig::default()) {
        Err(CompileError::Analysis(diagnostics)) => {
            assert_eq!(diagnostics.len(), 1);
            assert!(diagnostics[0].message.contains("already declared"));
        }
        other => panic!("expected an analysis failure, got {other:?}"),
    }
}

#[test]
fn scenario_7_arity_mismatch_halts_before_codegen() {
    let source = "int topla(int a, int b) { return a + b; } int ana() { return topla(1, 2, 3); }";
    match compile(source, &CompilerConfig::default()) {
        Err(CompileError::Analysis(diagnostics)) => {
            assert!(diagnostics.iter().any(|d| d.message.contains("expects 2 argument")));
        }
        other => panic!("expected an analysis failure, got {other:?}"),
    }
}

#[test]
fn scenario_8_division_trap_returns_negative_one() {
    assert_eq!(run("int ana() { return 10 / 0; }"), -1);
}

#[test]
fn bytecode_round_trips_through_a_file() {
    let output = compile("int ana() { return 7; }", &CompilerConfig::default()).unwrap();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("program.tkbc");
    std::fs::write(&path, output.program.to_bytes()).unwrap();

    let bytes = std::fs::read(&path).unwrap();
    let decoded = Program::from_bytes(&bytes).unwrap();
    assert_eq!(decoded, output.program);
    assert_eq!(execute(&decoded, false), Ok(7));
}

#[test]
fn analyzer_is_idempotent_on_a_program_with_zero_diagnostics() {
    let source = "int ana() { return 1 + 2; }";
    let ast = parse(source).unwrap();
    let config = CompilerConfig::default();

    let first = analyze(&ast, &config);
    assert!(first.success);
    let second = analyze(&ast, &config);
    assert!(second.success);
    assert!(second.diagnostics.is_empty());
}

#[test]
fn running_the_same_bytecode_twice_is_deterministic() {
    let source = "int topla(int a, int b) { return a + b; } int ana() { return topla(3, 4); }";
    let output = compile(source, &CompilerConfig::default()).unwrap();
    assert_eq!(execute(&output.program, false), execute(&output.program, false));
}

#[test]
fn mutually_recursive_functions_compile_and_run() {
    let source = "int even(int n) { if (n == 0) return 1; return odd(n - 1); } \
                  int odd(int n) { if (n == 0) return 0; return even(n - 1); } \
                  int ana() { return even(10); }";
    assert_eq!(run(source), 1);
}

#[test]
fn no_ana_function_means_no_entry_point() {
    let ast = parse("int helper() { return 1; }").unwrap();
    let config = CompilerConfig::default();
    let analysis = analyze(&ast, &config);
    assert!(analysis.success);
    let gen = generate(&ast, &analysis.symbols, &config);
    assert!(!gen.program.is_executable());
    assert!(turkc_vm::Vm::new(&gen.program).is_err());
}

#[test]
fn parse_error_aborts_before_analysis() {
    let source = "int ana() { return }";
    match compile(source, &CompilerConfig::default()) {
        Err(CompileError::Parse(_)) => {}
        other => panic!("expected a parse error, got {other:?}"),
    }
}
