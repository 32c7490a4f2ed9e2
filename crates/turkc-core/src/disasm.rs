//! Human-readable rendering of a compiled [`Program`], shared by the
//! `turkcc disasm` subcommand and the VM's trace mode. Revives the
//! original implementation's step-debug output as ambient tooling
//! rather than a language feature (`SPEC_FULL.md` §ADDED-6).

use crate::bytecode::{Instruction, Program};
use std::fmt::Write as _;

/// Renders a full program: the function table, the `main_entry`, and
/// one line per instruction as `address: OPCODE operand`.
pub fn render(program: &Program) -> String {
    let mut out = String::new();
    writeln!(out, "; functions").ok();
    for f in &program.functions {
        writeln!(
            out,
            ";   {:<16} entry={:<5} params={:<3} locals={}",
            f.name, f.entry, f.param_count, f.local_count
        )
        .ok();
    }
    writeln!(out, "; main_entry = {}", program.main_entry).ok();
    writeln!(out, "; code").ok();
    for (addr, instr) in program.code.iter().enumerate() {
        writeln!(out, "{:>5}: {}", addr, render_instruction(instr)).ok();
    }
    out
}

/// Renders a single instruction the same way [`render`] does, without
/// an address prefix. Used by the VM's trace mode to format the
/// instruction about to execute.
pub fn render_instruction(instr: &Instruction) -> String {
    format!("{:<12} {}", instr.opcode.mnemonic(), instr.operand)
}
