//! The stack-based virtual machine: an operand stack, a call-frame
//! stack, and a fetch-decode-execute loop over a [`Program`].

use crate::error::{Trap, VmError};
use turkc_core::bytecode::{Instruction, Opcode, Program};
use turkc_core::disasm;

/// Soft threshold for the operand stack. Exceeding it is a trap, not a
/// hard allocation ceiling — the stack itself is a growable `Vec`, per
/// the Design Notes in `SPEC_FULL.md` §9.
const DEFAULT_STACK_CAPACITY: usize = 1024;

/// Soft threshold for the call-frame stack.
const DEFAULT_FRAME_CAPACITY: usize = 64;

/// A runtime call record: where to resume the caller, where this
/// frame's locals begin in the operand stack, and which function is
/// executing (so `RETVAL`/`RET` can recover its parameter count).
///
/// `func_idx` of `-1` marks the sentinel top-level frame the VM starts
/// in before any `CALL` has executed — it was never called, so there
/// is no function-table entry to look its parameter count up in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallFrame {
    pub return_addr: usize,
    pub base_ptr: usize,
    pub func_idx: i32,
}

/// The virtual machine. Borrows the [`Program`] it executes; nothing
/// about running a program mutates the program itself.
pub struct Vm<'p> {
    program: &'p Program,
    stack: Vec<i32>,
    frames: Vec<CallFrame>,
    pc: usize,
    running: bool,
    exit_code: i32,
    stack_capacity: usize,
    frame_capacity: usize,
    /// When set, every executed instruction is traced to stderr along
    /// with the operand stack, reviving the original implementation's
    /// step-debug output (`SPEC_FULL.md` §ADDED-6).
    pub trace: bool,
}

impl<'p> Vm<'p> {
    /// Builds a VM ready to execute `program`, or fails if the program
    /// has no `ana` entry point.
    pub fn new(program: &'p Program) -> Result<Self, VmError> {
        if !program.is_executable() {
            return Err(VmError::NoEntryPoint);
        }
        Ok(Vm {
            program,
            stack: Vec::new(),
            frames: vec![CallFrame {
                return_addr: program.code.len(),
                base_ptr: 0,
                func_idx: -1,
            }],
            pc: program.main_entry as usize,
            running: true,
            exit_code: 0,
            stack_capacity: DEFAULT_STACK_CAPACITY,
            frame_capacity: DEFAULT_FRAME_CAPACITY,
            trace: false,
        })
    }

    pub fn with_trace(mut self, trace: bool) -> Self {
        self.trace = trace;
        self
    }

    pub fn with_stack_capacity(mut self, capacity: usize) -> Self {
        self.stack_capacity = capacity;
        self
    }

    pub fn with_frame_capacity(mut self, capacity: usize) -> Self {
        self.frame_capacity = capacity;
        self
    }

    /// Runs until `HALT`, a top-level `RET`/`RETVAL`, or a trap.
    /// Traps are diagnosed to stderr with the current `pc` and resolve
    /// to exit code `-1`, matching `SPEC_FULL.md` §4.4 exactly — they
    /// are not propagated as a `Result` because, by the time the VM is
    /// executing at all, "exit code -1" *is* the documented outcome of
    /// a trap, not a distinct failure mode the caller must branch on.
    pub fn run(&mut self) -> i32 {
        while self.running {
            if let Err(trap) = self.step() {
                eprintln!("trap at pc={}: {trap}", self.pc);
                self.running = false;
                self.exit_code = -1;
            }
        }
        self.exit_code
    }

    fn current_frame(&self) -> CallFrame {
        *self.frames.last().expect("at least the top-level frame is always present")
    }

    fn fetch(&mut self) -> Instruction {
        let instr = self.program.code[self.pc];
        if self.trace {
            eprintln!(
                "{:>5}: {:<28} stack={:?}",
                self.pc,
                disasm::render_instruction(&instr),
                self.stack
            );
        }
        self.pc += 1;
        instr
    }

    fn push(&mut self, value: i32) -> Result<(), Trap> {
        if self.stack.len() >= self.stack_capacity {
            return Err(Trap::StackOverflow);
        }
        self.stack.push(value);
        Ok(())
    }

    fn pop(&mut self) -> Result<i32, Trap> {
        self.stack.pop().ok_or(Trap::StackUnderflow)
    }

    fn peek(&self) -> Result<i32, Trap> {
        self.stack.last().copied().ok_or(Trap::StackUnderflow)
    }

    fn ensure_reserved(&mut self, up_to: usize) -> Result<(), Trap> {
        if up_to > self.stack_capacity {
            return Err(Trap::StackOverflow);
        }
        if self.stack.len() < up_to {
            self.stack.resize(up_to, 0);
        }
        Ok(())
    }

    fn local_address(&self, slot: i32) -> Result<usize, Trap> {
        let addr = self.current_frame().base_ptr as i64 + i64::from(slot);
        if addr < 0 || addr as usize >= self.stack_capacity {
            return Err(Trap::InvalidLocalAddress { addr });
        }
        Ok(addr as usize)
    }

    fn global_address(&self, addr: i32) -> Result<usize, Trap> {
        if addr < 0 || addr as usize >= self.stack_capacity {
            return Err(Trap::InvalidLocalAddress { addr: addr as i64 });
        }
        Ok(addr as usize)
    }

    fn load_at(&self, addr: usize) -> Result<i32, Trap> {
        self.stack
            .get(addr)
            .copied()
            .ok_or(Trap::InvalidLocalAddress { addr: addr as i64 })
    }

    fn store_at(&mut self, addr: usize, value: i32) -> Result<(), Trap> {
        match self.stack.get_mut(addr) {
            Some(slot) => {
                *slot = value;
                Ok(())
            }
            None => Err(Trap::InvalidLocalAddress { addr: addr as i64 }),
        }
    }

    fn step(&mut self) -> Result<(), Trap> {
        let instr = self.fetch();
        match instr.opcode {
            Opcode::Nop => {}
            Opcode::Push => self.push(instr.operand)?,
            Opcode::Pop => {
                self.pop()?;
            }
            Opcode::Dup => {
                let top = self.peek()?;
                self.push(top)?;
            }
            Opcode::Load => {
                let addr = self.local_address(instr.operand)?;
                let value = self.load_at(addr)?;
                self.push(value)?;
            }
            Opcode::Store => {
                let addr = self.local_address(instr.operand)?;
                let value = self.pop()?;
                self.store_at(addr, value)?;
            }
            Opcode::LoadGlobal => {
                let addr = self.global_address(instr.operand)?;
                let value = self.load_at(addr)?;
                self.push(value)?;
            }
            Opcode::StoreGlobal => {
                let addr = self.global_address(instr.operand)?;
                let value = self.pop()?;
                self.store_at(addr, value)?;
            }
            Opcode::Add => self.binary_op(|a, b| Ok(a.wrapping_add(b)))?,
            Opcode::Sub => self.binary_op(|a, b| Ok(a.wrapping_sub(b)))?,
            Opcode::Mul => self.binary_op(|a, b| Ok(a.wrapping_mul(b)))?,
            Opcode::Div => self.binary_op(|a, b| {
                if b == 0 {
                    Err(Trap::DivisionByZero)
                } else {
                    Ok(a.wrapping_div(b))
                }
            })?,
            Opcode::Mod => self.binary_op(|a, b| {
                if b == 0 {
                    Err(Trap::DivisionByZero)
                } else {
                    Ok(a.wrapping_rem(b))
                }
            })?,
            Opcode::Neg => {
                let a = self.pop()?;
                self.push(a.wrapping_neg())?;
            }
            Opcode::Eq => self.binary_op(|a, b| Ok((a == b) as i32))?,
            Opcode::Neq => self.binary_op(|a, b| Ok((a != b) as i32))?,
            Opcode::Lt => self.binary_op(|a, b| Ok((a < b) as i32))?,
            Opcode::Gt => self.binary_op(|a, b| Ok((a > b) as i32))?,
            Opcode::Leq => self.binary_op(|a, b| Ok((a <= b) as i32))?,
            Opcode::Geq => self.binary_op(|a, b| Ok((a >= b) as i32))?,
            Opcode::Jmp => self.pc = instr.operand as usize,
            Opcode::Jz => {
                let cond = self.pop()?;
                if cond == 0 {
                    self.pc = instr.operand as usize;
                }
            }
            Opcode::Jnz => {
                let cond = self.pop()?;
                if cond != 0 {
                    self.pc = instr.operand as usize;
                }
            }
            Opcode::Call => self.do_call(instr.operand)?,
            Opcode::Ret => self.do_return(None)?,
            Opcode::Retval => {
                let value = self.pop()?;
                self.do_return(Some(value))?;
            }
            Opcode::Enter => self.do_enter(instr.operand)?,
            Opcode::Print => {
                let value = self.pop()?;
                println!("{value}");
            }
            Opcode::PrintStr => {
                let value = self.pop()?;
                println!("{value}");
            }
            Opcode::Halt => {
                self.running = false;
                if let Some(&top) = self.stack.last() {
                    self.exit_code = top;
                }
            }
        }
        Ok(())
    }

    fn binary_op(&mut self, f: impl FnOnce(i32, i32) -> Result<i32, Trap>) -> Result<(), Trap> {
        // Operands pop right-then-left: `b` (pushed last) comes off
        // the stack first, then `a`.
        let b = self.pop()?;
        let a = self.pop()?;
        let result = f(a, b)?;
        self.push(result)
    }

    /// `ENTER n` is the callee's prologue. For a frame that was
    /// reached via `CALL`, `CALL` has already reserved all `n` slots,
    /// so this is a no-op (it still fetches and traces, for diagnostic
    /// symmetry with the original implementation). Only the top-level
    /// frame — entered directly by [`Vm::new`], never `CALL`ed — needs
    /// its locals reserved here.
    fn do_enter(&mut self, n: i32) -> Result<(), Trap> {
        if self.frames.len() == 1 {
            let base = self.current_frame().base_ptr;
            self.ensure_reserved(base + n.max(0) as usize)?;
        }
        Ok(())
    }

    fn do_call(&mut self, fn_idx: i32) -> Result<(), Trap> {
        let entry = self
            .program
            .functions
            .get(usize::try_from(fn_idx).map_err(|_| Trap::InvalidFunctionIndex { index: fn_idx })?)
            .ok_or(Trap::InvalidFunctionIndex { index: fn_idx })?;

        let param_count = entry.param_count.max(0) as usize;
        if self.stack.len() < param_count {
            return Err(Trap::StackUnderflow);
        }
        if self.frames.len() >= self.frame_capacity {
            return Err(Trap::CallStackOverflow);
        }

        let base_ptr = self.stack.len() - param_count;
        self.frames.push(CallFrame {
            return_addr: self.pc,
            base_ptr,
            func_idx: fn_idx,
        });
        self.ensure_reserved(base_ptr + entry.local_count.max(0) as usize)?;
        self.pc = entry.entry as usize;
        Ok(())
    }

    /// Unwinds the current frame back to the caller. `frame.base_ptr`
    /// already marks the stack position *before* the caller pushed
    /// this call's arguments (`CALL` computed it as
    /// `sp_at_call_time - param_count`), so truncating to `base_ptr`
    /// removes the callee's locals *and* the caller's arguments in one
    /// step — there is nothing left to additionally subtract.
    ///
    /// Note: the original implementation's `OP_RETVAL` handler
    /// subtracts `param_count` a second time here
    /// (`sp = old_base - param_count`), while its `OP_RET` handler
    /// (no return value) correctly uses `sp = old_base`. Applied to
    /// the canonical `topla(20, 22)` call from a frame with nothing
    /// else on the stack, the `RETVAL` formula drives the stack
    /// pointer negative. That is a bug in the source, not a
    /// calling-convention requirement worth preserving, so both `RET`
    /// and `RETVAL` unwind to `base_ptr` here.
    fn do_return(&mut self, value: Option<i32>) -> Result<(), Trap> {
        if self.frames.len() <= 1 {
            self.running = false;
            self.exit_code = value.unwrap_or(0);
            return Ok(());
        }

        let frame = self.frames.pop().expect("checked len() > 1 above");
        self.stack.truncate(frame.base_ptr);
        self.pc = frame.return_addr;
        if let Some(v) = value {
            self.push(v)?;
        }
        Ok(())
    }
}

/// Convenience wrapper: builds a VM over `program` and runs it to
/// completion, returning its exit code. Fails only if the program has
/// no `ana` entry point.
pub fn execute(program: &Program, trace: bool) -> Result<i32, VmError> {
    let mut vm = Vm::new(program)?.with_trace(trace);
    Ok(vm.run())
}

#[cfg(test)]
mod tests {
    use super::*;
    use turkc_core::bytecode::{FunctionEntry, Instruction, Opcode};

    fn program_from(code: Vec<Instruction>, locals: i32) -> Program {
        Program {
            functions: vec![FunctionEntry {
                name: "ana".to_string(),
                entry: 0,
                param_count: 0,
                local_count: locals,
            }],
            main_entry: 0,
            code,
        }
    }

    #[test]
    fn returns_a_constant() {
        let program = program_from(
            vec![
                Instruction::new(Opcode::Enter, 0),
                Instruction::new(Opcode::Push, 42),
                Instruction::new(Opcode::Retval, 0),
            ],
            0,
        );
        assert_eq!(execute(&program, false), Ok(42));
    }

    #[test]
    fn arithmetic_precedence_is_left_to_right_on_the_stack() {
        // (3 + 4) * 2 - 1 == 13
        let program = program_from(
            vec![
                Instruction::new(Opcode::Enter, 0),
                Instruction::new(Opcode::Push, 3),
                Instruction::new(Opcode::Push, 4),
                Instruction::new(Opcode::Add, 0),
                Instruction::new(Opcode::Push, 2),
                Instruction::new(Opcode::Mul, 0),
                Instruction::new(Opcode::Push, 1),
                Instruction::new(Opcode::Sub, 0),
                Instruction::new(Opcode::Retval, 0),
            ],
            0,
        );
        assert_eq!(execute(&program, false), Ok(13));
    }

    #[test]
    fn division_by_zero_traps_with_exit_code_negative_one() {
        let program = program_from(
            vec![
                Instruction::new(Opcode::Enter, 0),
                Instruction::new(Opcode::Push, 10),
                Instruction::new(Opcode::Push, 0),
                Instruction::new(Opcode::Div, 0),
                Instruction::new(Opcode::Retval, 0),
            ],
            0,
        );
        assert_eq!(execute(&program, false), Ok(-1));
    }

    #[test]
    fn ret_with_no_value_exits_zero_at_top_level() {
        let program = program_from(
            vec![Instruction::new(Opcode::Enter, 0), Instruction::new(Opcode::Ret, 0)],
            0,
        );
        assert_eq!(execute(&program, false), Ok(0));
    }

    #[test]
    fn function_call_places_arguments_and_returns_their_sum() {
        // int topla(int a, int b) { return a + b; }
        // int ana() { return topla(20, 22); }
        let program = Program {
            functions: vec![
                FunctionEntry {
                    name: "topla".to_string(),
                    entry: 0,
                    param_count: 2,
                    local_count: 2,
                },
                FunctionEntry {
                    name: "ana".to_string(),
                    entry: 4,
                    param_count: 0,
                    local_count: 0,
                },
            ],
            main_entry: 4,
            code: vec![
                // topla: slots 0,1 are a,b
                Instruction::new(Opcode::Enter, 2), // 0
                Instruction::new(Opcode::Load, 0),  // 1
                Instruction::new(Opcode::Load, 1),  // 2
                Instruction::new(Opcode::Add, 0),   // (folded into RETVAL path)
                // ana:
                Instruction::new(Opcode::Enter, 0), // 4
                Instruction::new(Opcode::Push, 20), // 5
                Instruction::new(Opcode::Push, 22), // 6
                Instruction::new(Opcode::Call, 0),  // 7 -> topla
                Instruction::new(Opcode::Retval, 0),
            ],
        };
        // topla's body needs RETVAL after ADD; patch indices so it's contiguous.
        let mut program = program;
        program.code = vec![
            Instruction::new(Opcode::Enter, 2), // 0: topla entry
            Instruction::new(Opcode::Load, 0),  // 1
            Instruction::new(Opcode::Load, 1),  // 2
            Instruction::new(Opcode::Add, 0),   // 3
            Instruction::new(Opcode::Retval, 0), // 4
            Instruction::new(Opcode::Enter, 0), // 5: ana entry
            Instruction::new(Opcode::Push, 20), // 6
            Instruction::new(Opcode::Push, 22), // 7
            Instruction::new(Opcode::Call, 0),  // 8 -> topla at 0
            Instruction::new(Opcode::Retval, 0), // 9
        ];
        program.functions[0].entry = 0;
        program.functions[1].entry = 5;
        program.main_entry = 5;

        assert_eq!(execute(&program, false), Ok(42));
    }

    #[test]
    fn no_entry_point_is_rejected_before_running() {
        let mut program = program_from(vec![], 0);
        program.main_entry = turkc_core::bytecode::NO_MAIN;
        assert_eq!(Vm::new(&program).unwrap_err(), VmError::NoEntryPoint);
    }

    #[test]
    fn running_the_same_bytecode_twice_is_deterministic() {
        let program = program_from(
            vec![
                Instruction::new(Opcode::Enter, 0),
                Instruction::new(Opcode::Push, 7),
                Instruction::new(Opcode::Retval, 0),
            ],
            0,
        );
        assert_eq!(execute(&program, false), execute(&program, false));
    }
}
