//! Code generator (`SPEC_FULL.md` §4.3): a single pass over the
//! analyzed AST that emits a linear instruction stream and a function
//! table, resolving forward jumps by label patching and assigning
//! each local a stack slot offset.
//!
//! The generator trusts the analyzer completely and never re-validates
//! (section 7) — every "unknown identifier" / "unknown function" path
//! below is unreachable on an AST that passed [`crate::analyzer`], and
//! exists only as the documented fallback behavior for a
//! hand-assembled or adversarial AST.

use crate::config::CompilerConfig;
use crate::symbol_table::SymbolTable;
use std::collections::HashMap;
use turkc_core::ast::{Node, NodeKind};
use turkc_core::bytecode::{FunctionEntry, Instruction, Opcode, Program, NO_MAIN};

/// A symbolic jump target. Starts unresolved (`-1` in the label
/// table) and is bound to an instruction address exactly once; an
/// emitted jump to an unresolved label registers a fixup that
/// [`CodeGenerator::finalize`] rewrites once the label is bound.
type Label = usize;

/// The result of code generation: always a complete [`Program`], plus
/// any warnings raised along the way (section 7: "generator ... always
/// returns a bytecode [program]").
pub struct GenResult {
    pub program: Program,
    pub warnings: Vec<String>,
}

/// Generates bytecode for `program` (a [`NodeKind::Program`] root)
/// using the symbol table an earlier, successful analysis produced.
pub fn generate(program: &Node, symbols: &SymbolTable, config: &CompilerConfig) -> GenResult {
    let mut gen = CodeGenerator::new(config);
    gen.generate_program(program, symbols);
    gen.finalize()
}

struct CodeGenerator<'c> {
    config: &'c CompilerConfig,
    program: Program,
    warnings: Vec<String>,
    labels: Vec<i32>,
    pending: Vec<(usize, Label)>,
    /// The function currently being generated: name -> slot. Reset at
    /// the start of every function; flat and non-scope-aware, unlike
    /// the analyzer's [`SymbolTable`] (section 9's "shared symbol
    /// table ownership" note — this is deliberately a second,
    /// independent table).
    locals: HashMap<String, i32>,
    next_slot: i32,
}

impl<'c> CodeGenerator<'c> {
    fn new(config: &'c CompilerConfig) -> Self {
        CodeGenerator {
            config,
            program: Program::new(),
            warnings: Vec::new(),
            labels: Vec::new(),
            pending: Vec::new(),
            locals: HashMap::new(),
            next_slot: 0,
        }
    }

    fn warn(&mut self, message: impl Into<String>) {
        let message = message.into();
        eprintln!("warning: {message}");
        self.warnings.push(message);
    }

    fn new_label(&mut self) -> Label {
        self.labels.push(-1);
        self.labels.len() - 1
    }

    fn bind_label(&mut self, label: Label, addr: i32) {
        self.labels[label] = addr;
    }

    fn emit(&mut self, opcode: Opcode, operand: i32) -> usize {
        self.program.code.push(Instruction::new(opcode, operand));
        self.program.code.len() - 1
    }

    fn emit_jump(&mut self, opcode: Opcode, label: Label) {
        let target = self.labels[label];
        let pc = self.emit(opcode, target);
        if target < 0 {
            self.pending.push((pc, label));
        }
    }

    fn finalize(mut self) -> GenResult {
        for (pc, label) in &self.pending {
            let addr = self.labels[*label];
            if addr < 0 {
                self.warnings.push(format!("unresolved label {label} (left as -1)"));
                eprintln!("warning: unresolved label {label} (left as -1)");
            }
            self.program.code[*pc].operand = addr;
        }
        GenResult {
            program: self.program,
            warnings: self.warnings,
        }
    }

    // ---- Program / function structure -------------------------------

    fn generate_program(&mut self, program: &Node, symbols: &SymbolTable) {
        debug_assert_eq!(program.kind, NodeKind::Program);

        // Pre-populate the function table so a call to a function
        // defined later in the file (or the other half of a mutually
        // recursive pair) still resolves by name during that earlier
        // function's own generation.
        for func in &program.children {
            let name = func.text.clone().unwrap_or_default();
            let param_count = symbols
                .function_signature(&name)
                .map(|sig| sig.params.len() as i32)
                .unwrap_or(func.children[0].children.len() as i32);
            self.program.functions.push(FunctionEntry {
                name,
                entry: -1,
                param_count,
                local_count: 0,
            });
        }

        for (idx, func) in program.children.iter().enumerate() {
            self.generate_function(idx, func);
        }

        self.emit(Opcode::Halt, 0);
    }

    fn generate_function(&mut self, idx: usize, func: &Node) {
        let name = func.text.clone().unwrap_or_default();
        let params = &func.children[0];
        let body = &func.children[1];

        self.locals = HashMap::new();
        self.next_slot = 0;
        for param in &params.children {
            self.get_or_add_local(param.text.as_deref().unwrap_or(""));
        }
        collect_locals(body, &mut self.locals, &mut self.next_slot);
        let local_count = self.next_slot;

        let entry_addr = self.program.code.len() as i32;
        self.program.functions[idx].entry = entry_addr;
        self.program.functions[idx].local_count = local_count;
        if name == self.config.entry_function {
            self.program.main_entry = entry_addr;
        }

        self.emit(Opcode::Enter, local_count);
        for stmt in &body.children {
            self.generate_statement(stmt);
        }
        // Default fall-through tail, in case the body doesn't return
        // on every path.
        self.emit(Opcode::Push, 0);
        self.emit(Opcode::Retval, 0);
    }

    fn get_or_add_local(&mut self, name: &str) -> i32 {
        if let Some(&slot) = self.locals.get(name) {
            return slot;
        }
        let slot = self.next_slot;
        self.next_slot += 1;
        self.locals.insert(name.to_string(), slot);
        slot
    }

    // ---- Statements ---------------------------------------------------

    fn generate_statement(&mut self, node: &Node) {
        match node.kind {
            NodeKind::Block => {
                for stmt in &node.children {
                    self.generate_statement(stmt);
                }
            }
            NodeKind::VarDecl => {
                if let Some(init) = node.children.first() {
                    self.generate_expression(init);
                    let slot = self.get_or_add_local(node.text.as_deref().unwrap_or(""));
                    self.emit(Opcode::Store, slot);
                } else {
                    self.get_or_add_local(node.text.as_deref().unwrap_or(""));
                }
            }
            NodeKind::ExprStatement => {
                self.generate_expression(&node.children[0]);
                self.emit(Opcode::Pop, 0);
            }
            NodeKind::If => {
                self.generate_expression(&node.children[0]);
                let end = self.new_label();
                self.emit_jump(Opcode::Jz, end);
                self.generate_statement(&node.children[1]);
                let addr = self.program.code.len() as i32;
                self.bind_label(end, addr);
            }
            NodeKind::IfElse => {
                self.generate_expression(&node.children[0]);
                let else_label = self.new_label();
                self.emit_jump(Opcode::Jz, else_label);
                self.generate_statement(&node.children[1]);
                let endif = self.new_label();
                self.emit_jump(Opcode::Jmp, endif);
                let else_addr = self.program.code.len() as i32;
                self.bind_label(else_label, else_addr);
                self.generate_statement(&node.children[2]);
                let endif_addr = self.program.code.len() as i32;
                self.bind_label(endif, endif_addr);
            }
            NodeKind::While => {
                let start = self.new_label();
                let start_addr = self.program.code.len() as i32;
                self.bind_label(start, start_addr);
                self.generate_expression(&node.children[0]);
                let end = self.new_label();
                self.emit_jump(Opcode::Jz, end);
                self.generate_statement(&node.children[1]);
                self.emit_jump(Opcode::Jmp, start);
                let end_addr = self.program.code.len() as i32;
                self.bind_label(end, end_addr);
            }
            NodeKind::For => self.generate_for(node),
            NodeKind::Return => {
                if let Some(expr) = node.children.first() {
                    self.generate_expression(expr);
                    self.emit(Opcode::Retval, 0);
                } else {
                    self.emit(Opcode::Ret, 0);
                }
            }
            NodeKind::Empty => {}
            other => unreachable!("{other:?} is not a statement node"),
        }
    }

    fn generate_for(&mut self, node: &Node) {
        // init is Empty, VarDecl, or an ExprStatement-wrapped expression;
        // generate_statement already unwraps all three correctly.
        self.generate_statement(&node.children[0]);

        let start = self.new_label();
        let start_addr = self.program.code.len() as i32;
        self.bind_label(start, start_addr);

        let end = self.new_label();
        let cond = &node.children[1];
        if !cond.is_empty_slot() {
            self.generate_expression(cond);
            self.emit_jump(Opcode::Jz, end);
        }

        self.generate_statement(&node.children[3]);

        let update = &node.children[2];
        if !update.is_empty_slot() {
            self.generate_expression(update);
            self.emit(Opcode::Pop, 0);
        }

        self.emit_jump(Opcode::Jmp, start);
        let end_addr = self.program.code.len() as i32;
        self.bind_label(end, end_addr);
    }

    // ---- Expressions ----------------------------------------------

    fn generate_expression(&mut self, node: &Node) {
        match node.kind {
            NodeKind::NumberLiteral => {
                let text = node.text.as_deref().unwrap_or("0");
                let value: i32 = text.parse().unwrap_or_else(|_| {
                    self.warn(format!("malformed integer literal '{text}', using 0"));
                    0
                });
                self.emit(Opcode::Push, value);
            }
            // No string runtime; see the placeholder note on
            // `NodeKind::StringLiteral`.
            NodeKind::StringLiteral => {
                self.emit(Opcode::Push, 0);
            }
            NodeKind::Identifier => {
                let name = node.text.as_deref().unwrap_or("");
                match self.locals.get(name).copied() {
                    Some(slot) => {
                        self.emit(Opcode::Load, slot);
                    }
                    None => {
                        self.warn(format!("unknown identifier '{name}' in code generation"));
                        self.emit(Opcode::Push, 0);
                    }
                }
            }
            NodeKind::Assignment => {
                self.generate_expression(&node.children[1]);
                self.emit(Opcode::Dup, 0);
                let name = node.children[0].text.as_deref().unwrap_or("");
                let slot = self.get_or_add_local(name);
                self.emit(Opcode::Store, slot);
            }
            NodeKind::BinaryExpr => {
                self.generate_expression(&node.children[0]);
                self.generate_expression(&node.children[1]);
                match node.text.as_deref().unwrap_or("") {
                    "+" => {
                        self.emit(Opcode::Add, 0);
                    }
                    "-" => {
                        self.emit(Opcode::Sub, 0);
                    }
                    "*" => {
                        self.emit(Opcode::Mul, 0);
                    }
                    "/" => {
                        self.emit(Opcode::Div, 0);
                    }
                    "%" => {
                        self.emit(Opcode::Mod, 0);
                    }
                    "==" => {
                        self.emit(Opcode::Eq, 0);
                    }
                    "!=" => {
                        self.emit(Opcode::Neq, 0);
                    }
                    "<" => {
                        self.emit(Opcode::Lt, 0);
                    }
                    ">" => {
                        self.emit(Opcode::Gt, 0);
                    }
                    "<=" => {
                        self.emit(Opcode::Leq, 0);
                    }
                    ">=" => {
                        self.emit(Opcode::Geq, 0);
                    }
                    other => self.warn(format!("unknown binary operator '{other}'")),
                }
            }
            NodeKind::UnaryExpr => {
                self.generate_expression(&node.children[0]);
                match node.text.as_deref().unwrap_or("") {
                    "-" => {
                        self.emit(Opcode::Neg, 0);
                    }
                    other => self.warn(format!("unknown unary operator '{other}'")),
                }
            }
            NodeKind::FunctionCall => {
                let name = node.text.as_deref().unwrap_or("");
                for arg in &node.children[0].children {
                    self.generate_expression(arg);
                }
                match self.program.find_function(name) {
                    Some((fn_idx, _)) => {
                        self.emit(Opcode::Call, fn_idx as i32);
                    }
                    None => {
                        self.warn(format!("call to unknown function '{name}'"));
                        self.emit(Opcode::Push, 0);
                    }
                }
            }
            other => unreachable!("{other:?} is not an expression node"),
        }
    }
}

/// Flat, non-scope-aware walk of a function body collecting every
/// `VAR_DECL` name into `locals`, assigning the next slot exactly once
/// per distinct name — nested blocks continue the same counter rather
/// than starting their own, matching the symbol table's slot
/// inheritance (section 4.1) and yielding `ENTER`'s exact operand
/// (`SPEC_FULL.md` ADDED-5) as `locals.len()` once parameters are
/// pre-registered.
fn collect_locals(node: &Node, locals: &mut HashMap<String, i32>, next_slot: &mut i32) {
    match node.kind {
        NodeKind::Block => {
            for child in &node.children {
                collect_locals(child, locals, next_slot);
            }
        }
        NodeKind::VarDecl => {
            let name = node.text.as_deref().unwrap_or("");
            locals.entry(name.to_string()).or_insert_with(|| {
                let slot = *next_slot;
                *next_slot += 1;
                slot
            });
        }
        NodeKind::If => collect_locals(&node.children[1], locals, next_slot),
        NodeKind::IfElse => {
            collect_locals(&node.children[1], locals, next_slot);
            collect_locals(&node.children[2], locals, next_slot);
        }
        NodeKind::While => collect_locals(&node.children[1], locals, next_slot),
        NodeKind::For => {
            collect_locals(&node.children[0], locals, next_slot);
            collect_locals(&node.children[3], locals, next_slot);
        }
        NodeKind::Return | NodeKind::ExprStatement | NodeKind::Empty => {}
        other => unreachable!("{other:?} is not a statement node"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::analyze;
    use crate::parser::parse;
    use turkc_vm::vm::execute;

    fn compile(src: &str) -> Program {
        let ast = parse(src).unwrap();
        let config = CompilerConfig::default();
        let analysis = analyze(&ast, &config);
        assert!(analysis.success, "{:?}", analysis.diagnostics);
        generate(&ast, &analysis.symbols, &config).program
    }

    #[test]
    fn returns_constant_emits_push_then_retval_tail() {
        let program = compile("int ana() { return 42; }");
        assert_eq!(execute(&program, false), Ok(42));
        let tail = &program.code[program.code.len() - 2..];
        assert_eq!(tail[0].opcode, Opcode::Push);
        assert_eq!(tail[0].operand, 42);
        assert_eq!(tail[1].opcode, Opcode::Retval);
    }

    #[test]
    fn arithmetic_precedence() {
        let program = compile("int ana() { return (3 + 4) * 2 - 1; }");
        assert_eq!(execute(&program, false), Ok(13));
    }

    #[test]
    fn branching_selects_the_then_branch() {
        let program = compile("int ana() { int x = 10; if (x > 5) return 1; else return 0; }");
        assert_eq!(execute(&program, false), Ok(1));
    }

    #[test]
    fn branching_selects_the_else_branch_when_condition_flips() {
        let program = compile("int ana() { int x = 10; if (x > 50) return 1; else return 0; }");
        assert_eq!(execute(&program, false), Ok(0));
    }

    #[test]
    fn while_loop_sums_one_through_ten() {
        let program = compile(
            "int ana() { int sum = 0; int i = 1; while (i <= 10) { sum = sum + i; i = i + 1; } return sum; }",
        );
        assert_eq!(execute(&program, false), Ok(55));
    }

    #[test]
    fn function_call_with_parameters() {
        let program =
            compile("int topla(int a, int b) { return a + b; } int ana() { return topla(20, 22); }");
        assert_eq!(execute(&program, false), Ok(42));
    }

    #[test]
    fn division_by_zero_traps() {
        let program = compile("int ana() { return 10 / 0; }");
        assert_eq!(execute(&program, false), Ok(-1));
    }

    #[test]
    fn for_loop_counts_to_ten() {
        let program = compile("int ana() { int sum = 0; for (int i = 1; i <= 10; i = i + 1) { sum = sum + i; } return sum; }");
        assert_eq!(execute(&program, false), Ok(55));
    }

    #[test]
    fn enter_operand_counts_params_plus_locals_exactly() {
        let program = compile("int f(int a) { int b = 1; int c = 2; return a + b + c; }");
        let entry = program.functions.iter().find(|f| f.name == "f").unwrap();
        assert_eq!(entry.local_count, 3); // a, b, c
    }

    #[test]
    fn every_jump_resolves_to_a_non_negative_in_bounds_address() {
        let program = compile(
            "int ana() { int i = 0; while (i < 3) { if (i == 1) { i = i + 1; } else { i = i + 2; } } return i; }",
        );
        for instr in &program.code {
            if matches!(instr.opcode, Opcode::Jmp | Opcode::Jz | Opcode::Jnz) {
                assert!(instr.operand >= 0 && (instr.operand as usize) < program.code.len());
            }
        }
    }

    #[test]
    fn no_main_entry_when_there_is_no_ana_function() {
        let ast = parse("int f() { return 0; }").unwrap();
        let config = CompilerConfig::default();
        let analysis = analyze(&ast, &config);
        let result = generate(&ast, &analysis.symbols, &config);
        assert_eq!(result.program.main_entry, NO_MAIN);
    }
}
