//! TurkC VM: the stack-based interpreter that executes a compiled
//! [`turkc_core::bytecode::Program`].
//!
//! Owns the operand stack and call-frame stack described in
//! `SPEC_FULL.md` §4.4: explicit call frames, a fixed calling
//! convention for argument/return-value handoff, and bounds-checked
//! local access. Every error the VM can hit during execution is a
//! [`error::Trap`]; a [`error::VmError`] covers the one failure mode
//! that can be detected before a single instruction runs (no `ana`
//! entry point).

pub mod error;
pub mod vm;

pub use error::{Trap, VmError};
pub use vm::{execute, CallFrame, Vm};
