//! The bytecode instruction set, the compiled program representation,
//! and the `"TKBC"` file format (`SPEC_FULL.md` §6).

#[cfg(feature = "json")]
use serde::{Deserialize, Serialize};

use std::fmt;

/// Magic header of a serialized bytecode file.
pub const MAGIC: [u8; 4] = *b"TKBC";

/// Sentinel `main_entry` value meaning "no `ana` function — not
/// executable".
pub const NO_MAIN: i32 = -1;

/// A single bytecode instruction: an opcode plus one integer operand.
/// Instructions that don't use an operand (e.g. `POP`, `ADD`) still
/// carry the field, set to `0`, to keep the instruction stream a
/// uniform `(opcode, operand)` pair as the file format requires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "json", derive(Serialize, Deserialize))]
#[repr(i32)]
pub enum Opcode {
    Nop = 0,
    Push,
    Pop,
    Dup,
    Load,
    Store,
    LoadGlobal,
    StoreGlobal,
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Neg,
    Eq,
    Neq,
    Lt,
    Gt,
    Leq,
    Geq,
    Jmp,
    Jz,
    Jnz,
    Call,
    Ret,
    Retval,
    Enter,
    Print,
    PrintStr,
    Halt,
}

impl Opcode {
    /// All variants, in declaration (and wire-format) order.
    const ALL: [Opcode; 30] = [
        Opcode::Nop,
        Opcode::Push,
        Opcode::Pop,
        Opcode::Dup,
        Opcode::Load,
        Opcode::Store,
        Opcode::LoadGlobal,
        Opcode::StoreGlobal,
        Opcode::Add,
        Opcode::Sub,
        Opcode::Mul,
        Opcode::Div,
        Opcode::Mod,
        Opcode::Neg,
        Opcode::Eq,
        Opcode::Neq,
        Opcode::Lt,
        Opcode::Gt,
        Opcode::Leq,
        Opcode::Geq,
        Opcode::Jmp,
        Opcode::Jz,
        Opcode::Jnz,
        Opcode::Call,
        Opcode::Ret,
        Opcode::Retval,
        Opcode::Enter,
        Opcode::Print,
        Opcode::PrintStr,
        Opcode::Halt,
    ];

    pub fn from_i32(code: i32) -> Option<Opcode> {
        Opcode::ALL.get(usize::try_from(code).ok()?).copied()
    }

    pub fn mnemonic(self) -> &'static str {
        match self {
            Opcode::Nop => "NOP",
            Opcode::Push => "PUSH",
            Opcode::Pop => "POP",
            Opcode::Dup => "DUP",
            Opcode::Load => "LOAD",
            Opcode::Store => "STORE",
            Opcode::LoadGlobal => "LOAD_GLOBAL",
            Opcode::StoreGlobal => "STORE_GLOBAL",
            Opcode::Add => "ADD",
            Opcode::Sub => "SUB",
            Opcode::Mul => "MUL",
            Opcode::Div => "DIV",
            Opcode::Mod => "MOD",
            Opcode::Neg => "NEG",
            Opcode::Eq => "EQ",
            Opcode::Neq => "NEQ",
            Opcode::Lt => "LT",
            Opcode::Gt => "GT",
            Opcode::Leq => "LEQ",
            Opcode::Geq => "GEQ",
            Opcode::Jmp => "JMP",
            Opcode::Jz => "JZ",
            Opcode::Jnz => "JNZ",
            Opcode::Call => "CALL",
            Opcode::Ret => "RET",
            Opcode::Retval => "RETVAL",
            Opcode::Enter => "ENTER",
            Opcode::Print => "PRINT",
            Opcode::PrintStr => "PRINT_STR",
            Opcode::Halt => "HALT",
        }
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.mnemonic())
    }
}

/// One emitted instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "json", derive(Serialize, Deserialize))]
pub struct Instruction {
    pub opcode: Opcode,
    pub operand: i32,
}

impl Instruction {
    pub fn new(opcode: Opcode, operand: i32) -> Self {
        Instruction { opcode, operand }
    }
}

/// An entry in the function table: everything the VM needs to set up
/// and tear down a call to this function, and everything the
/// disassembler needs to label it.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "json", derive(Serialize, Deserialize))]
pub struct FunctionEntry {
    pub name: String,
    pub entry: i32,
    pub param_count: i32,
    pub local_count: i32,
}

/// A fully compiled program: a function table, the program's entry
/// point (if any), and a flat instruction stream.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "json", derive(Serialize, Deserialize))]
pub struct Program {
    pub functions: Vec<FunctionEntry>,
    pub main_entry: i32,
    pub code: Vec<Instruction>,
}

impl Program {
    pub fn new() -> Self {
        Program {
            functions: Vec::new(),
            main_entry: NO_MAIN,
            code: Vec::new(),
        }
    }

    pub fn is_executable(&self) -> bool {
        self.main_entry != NO_MAIN
    }

    pub fn find_function(&self, name: &str) -> Option<(usize, &FunctionEntry)> {
        self.functions.iter().enumerate().find(|(_, f)| f.name == name)
    }

    /// Serializes this program to the `"TKBC"` wire format described in
    /// `SPEC_FULL.md` §6. Integers are written in the host's native
    /// byte order and width, as the format specifies.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(&MAGIC);
        push_i32(&mut out, self.functions.len() as i32);
        for f in &self.functions {
            push_i32(&mut out, f.name.len() as i32);
            out.extend_from_slice(f.name.as_bytes());
            push_i32(&mut out, f.entry);
            push_i32(&mut out, f.param_count);
            push_i32(&mut out, f.local_count);
        }
        push_i32(&mut out, self.main_entry);
        push_i32(&mut out, self.code.len() as i32);
        for instr in &self.code {
            push_i32(&mut out, instr.opcode as i32);
            push_i32(&mut out, instr.operand);
        }
        out
    }

    /// Parses a program from the `"TKBC"` wire format. See
    /// [`Program::to_bytes`] for the inverse.
    pub fn from_bytes(bytes: &[u8]) -> Result<Program, BytecodeError> {
        let mut cur = Cursor { bytes, pos: 0 };
        let magic = cur.take(4)?;
        if magic != MAGIC {
            return Err(BytecodeError::BadMagic);
        }

        let function_count = cur.read_i32()?;
        if function_count < 0 {
            return Err(BytecodeError::Malformed("negative function count"));
        }
        let mut functions = Vec::with_capacity(function_count as usize);
        for _ in 0..function_count {
            let name_len = cur.read_i32()?;
            if name_len < 0 {
                return Err(BytecodeError::Malformed("negative function-name length"));
            }
            let name_bytes = cur.take(name_len as usize)?;
            let name = String::from_utf8(name_bytes.to_vec())
                .map_err(|_| BytecodeError::Malformed("function name is not valid UTF-8"))?;
            let entry = cur.read_i32()?;
            let param_count = cur.read_i32()?;
            let local_count = cur.read_i32()?;
            functions.push(FunctionEntry {
                name,
                entry,
                param_count,
                local_count,
            });
        }

        let main_entry = cur.read_i32()?;
        let code_size = cur.read_i32()?;
        if code_size < 0 {
            return Err(BytecodeError::Malformed("negative code size"));
        }
        let mut code = Vec::with_capacity(code_size as usize);
        for _ in 0..code_size {
            let opcode_raw = cur.read_i32()?;
            let operand = cur.read_i32()?;
            let opcode = Opcode::from_i32(opcode_raw)
                .ok_or(BytecodeError::Malformed("unknown opcode in instruction stream"))?;
            code.push(Instruction::new(opcode, operand));
        }

        Ok(Program {
            functions,
            main_entry,
            code,
        })
    }
}

fn push_i32(out: &mut Vec<u8>, value: i32) {
    out.extend_from_slice(&value.to_ne_bytes());
}

struct Cursor<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn take(&mut self, len: usize) -> Result<&'a [u8], BytecodeError> {
        let end = self.pos.checked_add(len).ok_or(BytecodeError::UnexpectedEof)?;
        let slice = self.bytes.get(self.pos..end).ok_or(BytecodeError::UnexpectedEof)?;
        self.pos = end;
        Ok(slice)
    }

    fn read_i32(&mut self) -> Result<i32, BytecodeError> {
        let slice = self.take(4)?;
        let arr: [u8; 4] = slice.try_into().expect("take(4) yields a 4-byte slice");
        Ok(i32::from_ne_bytes(arr))
    }
}

/// Everything that can go wrong parsing a `"TKBC"` file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BytecodeError {
    BadMagic,
    UnexpectedEof,
    Malformed(&'static str),
}

impl fmt::Display for BytecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BytecodeError::BadMagic => write!(f, "not a TKBC bytecode file (bad magic header)"),
            BytecodeError::UnexpectedEof => write!(f, "truncated bytecode file"),
            BytecodeError::Malformed(reason) => write!(f, "malformed bytecode file: {reason}"),
        }
    }
}

impl std::error::Error for BytecodeError {}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_program() -> Program {
        Program {
            functions: vec![FunctionEntry {
                name: "ana".to_string(),
                entry: 0,
                param_count: 0,
                local_count: 0,
            }],
            main_entry: 0,
            code: vec![
                Instruction::new(Opcode::Enter, 0),
                Instruction::new(Opcode::Push, 42),
                Instruction::new(Opcode::Retval, 0),
                Instruction::new(Opcode::Halt, 0),
            ],
        }
    }

    #[test]
    fn round_trips_through_bytes() {
        let program = sample_program();
        let bytes = program.to_bytes();
        let decoded = Program::from_bytes(&bytes).expect("valid bytecode");
        assert_eq!(decoded, program);
    }

    #[test]
    fn rejects_bad_magic() {
        let mut bytes = sample_program().to_bytes();
        bytes[0] = b'X';
        assert_eq!(Program::from_bytes(&bytes), Err(BytecodeError::BadMagic));
    }

    #[test]
    fn rejects_truncated_file() {
        let bytes = sample_program().to_bytes();
        let truncated = &bytes[..bytes.len() - 2];
        assert_eq!(Program::from_bytes(truncated), Err(BytecodeError::UnexpectedEof));
    }

    #[test]
    fn opcode_round_trips_through_i32() {
        for op in Opcode::ALL {
            assert_eq!(Opcode::from_i32(op as i32), Some(op));
        }
        assert_eq!(Opcode::from_i32(999), None);
    }

    #[test]
    fn no_main_sentinel_means_not_executable() {
        let mut program = sample_program();
        program.main_entry = NO_MAIN;
        assert!(!program.is_executable());
    }
}
