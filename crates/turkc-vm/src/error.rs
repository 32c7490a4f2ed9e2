//! VM trap and setup error types. Hand-rolled `Display` + `Error`
//! impls, matching the teacher workspace's compiler crate (no
//! `thiserror`/`anyhow` anywhere in this workspace).

use std::fmt;

/// A runtime trap: a condition the VM detects during execution that
/// immediately halts the program with exit code `-1`.
///
/// Unknown-opcode is conspicuously absent from this enum: the
/// in-memory [`turkc_core::Opcode`] is a closed Rust enum, so an
/// "unknown opcode" can only ever arise while *decoding* a bytecode
/// file, where it is rejected by `Program::from_bytes` as a
/// [`turkc_core::BytecodeError`] long before the VM ever sees it. That
/// is the "reject impossible combinations at the type level" design
/// note from `SPEC_FULL.md` §9 paying off directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trap {
    StackOverflow,
    StackUnderflow,
    InvalidLocalAddress { addr: i64 },
    InvalidFunctionIndex { index: i32 },
    CallStackOverflow,
    DivisionByZero,
}

impl fmt::Display for Trap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Trap::StackOverflow => write!(f, "operand stack overflow"),
            Trap::StackUnderflow => write!(f, "operand stack underflow"),
            Trap::InvalidLocalAddress { addr } => write!(f, "invalid local address {addr}"),
            Trap::InvalidFunctionIndex { index } => write!(f, "invalid function index {index}"),
            Trap::CallStackOverflow => write!(f, "call frame stack overflow"),
            Trap::DivisionByZero => write!(f, "division by zero"),
        }
    }
}

impl std::error::Error for Trap {}

/// A failure setting up a VM before it can run at all. Distinct from
/// [`Trap`] because it is detected before a single instruction
/// executes, not mid-execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VmError {
    /// The program's `main_entry` is the `NO_MAIN` sentinel: there is
    /// no `ana` function to run.
    NoEntryPoint,
}

impl fmt::Display for VmError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VmError::NoEntryPoint => write!(f, "program has no `ana` entry point"),
        }
    }
}

impl std::error::Error for VmError {}
