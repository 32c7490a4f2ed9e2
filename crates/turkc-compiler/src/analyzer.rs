//! Semantic analyzer (`SPEC_FULL.md` §4.2): a two-pass traversal of the
//! `Program` root that produces a populated [`SymbolTable`] and a
//! diagnostic list, without ever being fatal on its own — analysis
//! always runs to completion (up to the diagnostic cap) so the caller
//! can see as many problems as possible in one pass.

use crate::config::CompilerConfig;
use crate::diagnostics::Diagnostic;
use crate::symbol_table::{SymbolKind, SymbolTable};
use turkc_core::ast::{Node, NodeKind};
use turkc_core::types::{types_compatible, DataType};

/// Everything the code generator needs from a successful analysis:
/// the populated symbol table (moved, not shared, per the design
/// notes) and, for completeness, the diagnostics that were collected
/// even on a successful run (there are none, by definition of
/// success, but the field stays so callers don't need a separate
/// success-path type).
pub struct AnalysisResult {
    pub symbols: SymbolTable,
    pub diagnostics: Vec<Diagnostic>,
    pub success: bool,
}

/// Runs both analyzer passes over `program` and returns the result.
/// `program` must be a [`NodeKind::Program`] root.
pub fn analyze(program: &Node, config: &CompilerConfig) -> AnalysisResult {
    let mut analyzer = SemanticAnalyzer::new(config);
    analyzer.run(program);
    let success = analyzer.diagnostics.is_empty();
    AnalysisResult {
        symbols: analyzer.symbols,
        diagnostics: analyzer.diagnostics,
        success,
    }
}

struct SemanticAnalyzer<'c> {
    config: &'c CompilerConfig,
    symbols: SymbolTable,
    diagnostics: Vec<Diagnostic>,
    current_return_type: DataType,
    /// Parallel to `program.children`: `true` for a `Function` node
    /// whose name collided with an earlier one in pass 1. Pass 2 skips
    /// analyzing its body — the duplicate was already diagnosed and
    /// re-analyzing it would only cascade more noise.
    skip_function: Vec<bool>,
}

impl<'c> SemanticAnalyzer<'c> {
    fn new(config: &'c CompilerConfig) -> Self {
        SemanticAnalyzer {
            config,
            symbols: SymbolTable::new(),
            diagnostics: Vec::new(),
            current_return_type: DataType::Void,
            skip_function: Vec::new(),
        }
    }

    fn report(&mut self, line: u32, message: impl Into<String>) {
        if self.diagnostics.len() < self.config.diagnostic_cap {
            self.diagnostics.push(Diagnostic::new(line, message));
        }
    }

    fn run(&mut self, program: &Node) {
        assert_eq!(program.kind, NodeKind::Program, "analyzer expects a Program root");
        self.harvest_functions(program);
        self.analyze_functions(program);
    }

    // ---- Pass 1: function harvest --------------------------------

    fn harvest_functions(&mut self, program: &Node) {
        self.skip_function = vec![false; program.children.len()];
        for (idx, func) in program.children.iter().enumerate() {
            debug_assert_eq!(func.kind, NodeKind::Function);
            let name = func.text.as_deref().unwrap_or("");
            let return_type = DataType::from_annotation(func.declared_type.as_deref().unwrap_or(""));

            match self.symbols.declare_function(name, return_type, func.line) {
                Some(_) => {
                    let params = &func.children[0];
                    for param in &params.children {
                        let param_name = param.text.as_deref().unwrap_or("");
                        let param_type = DataType::from_annotation(param.declared_type.as_deref().unwrap_or(""));
                        if !self.symbols.add_parameter(name, param_name, param_type) {
                            self.report(
                                func.line,
                                format!(
                                    "function '{name}' has more than {} parameters; extras were dropped",
                                    crate::symbol_table::MAX_PARAMETERS
                                ),
                            );
                        }
                    }
                }
                None => {
                    let prior_line = self.symbols.lookup(name).map(|s| s.line).unwrap_or(func.line);
                    self.report(func.line, format!("function '{name}' is already declared (first declared on line {prior_line})"));
                    self.skip_function[idx] = true;
                }
            }
        }
    }

    // ---- Pass 2: full analysis ------------------------------------

    fn analyze_functions(&mut self, program: &Node) {
        for (idx, func) in program.children.iter().enumerate() {
            if self.skip_function[idx] {
                continue;
            }
            self.analyze_function(func);
        }
    }

    fn analyze_function(&mut self, func: &Node) {
        let name = func.text.as_deref().unwrap_or("");
        self.current_return_type = DataType::from_annotation(func.declared_type.as_deref().unwrap_or(""));

        self.symbols.enter_scope();

        let params = &func.children[0];
        for param in &params.children {
            let param_name = param.text.as_deref().unwrap_or("");
            let param_type = DataType::from_annotation(param.declared_type.as_deref().unwrap_or(""));
            if self
                .symbols
                .declare(param_name, SymbolKind::Parameter, param_type, param.line)
                .is_none()
            {
                self.report(param.line, format!("duplicate parameter name '{param_name}' in function '{name}'"));
            }
        }

        let body = &func.children[1];
        debug_assert_eq!(body.kind, NodeKind::Block);
        // The function scope *is* the outer block scope: analyze the
        // body's statements directly rather than recursing into
        // `analyze_statement`, which would open a second nested scope.
        for stmt in &body.children {
            self.analyze_statement(stmt);
        }

        self.symbols.exit_scope();
    }

    fn analyze_statement(&mut self, node: &Node) {
        match node.kind {
            NodeKind::Block => {
                self.symbols.enter_scope();
                for stmt in &node.children {
                    self.analyze_statement(stmt);
                }
                self.symbols.exit_scope();
            }
            NodeKind::VarDecl => self.analyze_var_decl(node),
            NodeKind::If => {
                self.check_condition(&node.children[0]);
                self.analyze_statement(&node.children[1]);
            }
            NodeKind::IfElse => {
                self.check_condition(&node.children[0]);
                self.analyze_statement(&node.children[1]);
                self.analyze_statement(&node.children[2]);
            }
            NodeKind::While => {
                self.check_condition(&node.children[0]);
                self.analyze_statement(&node.children[1]);
            }
            NodeKind::For => self.analyze_for(node),
            NodeKind::Return => self.analyze_return(node),
            NodeKind::ExprStatement => {
                self.analyze_expression(&node.children[0]);
            }
            NodeKind::Empty => {}
            other => unreachable!("{other:?} is not a statement node"),
        }
    }

    fn check_condition(&mut self, cond: &Node) {
        let ty = self.analyze_expression(cond);
        if ty == DataType::Void {
            self.report(cond.line, "condition must not be void".to_string());
        }
    }

    fn analyze_for(&mut self, node: &Node) {
        // FOR opens one scope enclosing init/cond/update/body, so an
        // init declaration is local to the loop (section 4.2).
        self.symbols.enter_scope();

        // init is Empty, VarDecl, or an ExprStatement-wrapped expression
        // (the parser wraps a bare init expression the same way it
        // wraps one anywhere else a statement is expected).
        self.analyze_statement(&node.children[0]);

        let cond = &node.children[1];
        if !cond.is_empty_slot() {
            self.check_condition(cond);
        }

        let update = &node.children[2];
        if !update.is_empty_slot() {
            self.analyze_expression(update);
        }

        self.analyze_statement(&node.children[3]);
        self.symbols.exit_scope();
    }

    fn analyze_var_decl(&mut self, node: &Node) {
        let name = node.text.as_deref().unwrap_or("");
        let declared = DataType::from_annotation(node.declared_type.as_deref().unwrap_or(""));

        if declared == DataType::Void {
            self.report(node.line, format!("variable '{name}' cannot be declared void"));
        }

        if let Some(prior) = self.symbols.lookup_current_scope(name) {
            self.report(node.line, format!("'{name}' is already declared in this scope (first declared on line {})", prior.line));
            // Still analyze the initializer for its side effects
            // (further undeclared-identifier diagnostics), but don't
            // re-declare over the existing symbol.
            if let Some(init) = node.children.first() {
                self.analyze_expression(init);
            }
            return;
        }

        let stored_type = if declared == DataType::Void { DataType::Error } else { declared };
        self.symbols.declare(name, SymbolKind::Variable, stored_type, node.line);

        if let Some(init) = node.children.first() {
            let init_type = self.analyze_expression(init);
            if stored_type != DataType::Error && !types_compatible(stored_type, init_type) {
                self.report(
                    node.line,
                    format!("cannot initialize '{name}' of type {declared} with a value of type {init_type}"),
                );
            }
        }
    }

    fn analyze_return(&mut self, node: &Node) {
        match node.children.first() {
            None => {
                if self.current_return_type != DataType::Void {
                    self.report(node.line, format!("function must return {}", self.current_return_type));
                }
            }
            Some(expr) => {
                if self.current_return_type == DataType::Void {
                    self.report(node.line, "void function cannot return a value".to_string());
                    self.analyze_expression(expr);
                    return;
                }
                let expr_type = self.analyze_expression(expr);
                if !types_compatible(self.current_return_type, expr_type) {
                    self.report(
                        node.line,
                        format!("return type mismatch: expected {}, got {expr_type}", self.current_return_type),
                    );
                }
            }
        }
    }

    // ---- Expression typing ------------------------------------------

    fn analyze_expression(&mut self, node: &Node) -> DataType {
        match node.kind {
            NodeKind::NumberLiteral => DataType::Int,
            // Placeholder: string literals type-check as INT with no
            // string runtime backing them (section 9 / ADDED-5).
            NodeKind::StringLiteral => DataType::Int,
            NodeKind::Identifier => self.analyze_identifier(node),
            NodeKind::Assignment => self.analyze_assignment(node),
            NodeKind::BinaryExpr => self.analyze_binary(node),
            NodeKind::UnaryExpr => self.analyze_unary(node),
            NodeKind::FunctionCall => self.analyze_call(node),
            other => unreachable!("{other:?} is not an expression node"),
        }
    }

    fn analyze_identifier(&mut self, node: &Node) -> DataType {
        let name = node.text.as_deref().unwrap_or("");
        match self.symbols.lookup(name) {
            None => {
                self.report(node.line, format!("undeclared identifier '{name}'"));
                DataType::Error
            }
            Some(sym) if sym.kind == SymbolKind::Function => {
                self.report(node.line, format!("'{name}' is a function, not a variable"));
                DataType::Error
            }
            Some(sym) => sym.data_type,
        }
    }

    fn analyze_assignment(&mut self, node: &Node) -> DataType {
        let target = &node.children[0];
        debug_assert_eq!(target.kind, NodeKind::Identifier);
        let name = target.text.as_deref().unwrap_or("");

        let target_type = match self.symbols.lookup(name) {
            None => {
                self.report(target.line, format!("undeclared identifier '{name}'"));
                DataType::Error
            }
            Some(sym) if sym.kind == SymbolKind::Function => {
                self.report(target.line, format!("'{name}' is a function, not a variable"));
                DataType::Error
            }
            Some(sym) => sym.data_type,
        };

        let value_type = self.analyze_expression(&node.children[1]);
        if target_type != DataType::Error && !types_compatible(target_type, value_type) {
            self.report(
                node.line,
                format!("cannot assign value of type {value_type} to '{name}' of type {target_type}"),
            );
        }
        target_type
    }

    fn analyze_binary(&mut self, node: &Node) -> DataType {
        let left_type = self.analyze_expression(&node.children[0]);
        let right_type = self.analyze_expression(&node.children[1]);
        let op = node.text.as_deref().unwrap_or("");

        if left_type == DataType::Void || right_type == DataType::Void {
            self.report(node.line, format!("operator '{op}' cannot operate on a void value"));
            return DataType::Error;
        }
        if left_type == DataType::Error || right_type == DataType::Error {
            return DataType::Error;
        }
        if !types_compatible(left_type, right_type) {
            self.report(node.line, format!("incompatible operand types for '{op}': {left_type} and {right_type}"));
            return DataType::Error;
        }

        match op {
            "==" | "!=" | "<" | ">" | "<=" | ">=" => DataType::Int,
            _ => left_type,
        }
    }

    fn analyze_unary(&mut self, node: &Node) -> DataType {
        let operand_type = self.analyze_expression(&node.children[0]);
        if operand_type == DataType::Void {
            self.report(node.line, "unary operator cannot operate on a void value".to_string());
            return DataType::Error;
        }
        operand_type
    }

    fn analyze_call(&mut self, node: &Node) -> DataType {
        let name = node.text.as_deref().unwrap_or("");
        let args = &node.children[0];

        // Analyze every argument regardless of whether the callee
        // resolves, so undeclared identifiers inside the call are
        // still reported.
        let arg_types: Vec<DataType> = args.children.iter().map(|a| self.analyze_expression(a)).collect();

        let Some(symbol) = self.symbols.lookup(name) else {
            self.report(node.line, format!("call to undeclared function '{name}'"));
            return DataType::Error;
        };
        if symbol.kind != SymbolKind::Function {
            self.report(node.line, format!("'{name}' is not a function"));
            return DataType::Error;
        }
        let signature = symbol.signature.clone().unwrap_or_default();

        if arg_types.len() != signature.params.len() {
            self.report(
                node.line,
                format!(
                    "'{name}' expects {} argument(s), got {}",
                    signature.params.len(),
                    arg_types.len()
                ),
            );
            return signature.return_type.unwrap_or(DataType::Error);
        }

        for (arg_type, param) in arg_types.iter().zip(signature.params.iter()) {
            if *arg_type != DataType::Error && !types_compatible(*arg_type, param.ty) {
                self.report(
                    node.line,
                    format!("argument '{}' of '{name}' expects {}, got {arg_type}", param.name, param.ty),
                );
            }
        }

        signature.return_type.unwrap_or(DataType::Error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;

    fn analyze_source(src: &str) -> AnalysisResult {
        let ast = parse(src).unwrap();
        analyze(&ast, &CompilerConfig::default())
    }

    #[test]
    fn clean_program_has_no_diagnostics() {
        let result = analyze_source("int ana() { return 42; }");
        assert!(result.success);
        assert!(result.diagnostics.is_empty());
    }

    #[test]
    fn duplicate_declaration_in_same_scope_is_one_diagnostic() {
        let result = analyze_source("int ana() { int x = 1; int x = 2; return x; }");
        assert_eq!(result.diagnostics.len(), 1);
        assert!(result.diagnostics[0].message.contains("already declared"));
    }

    #[test]
    fn arity_mismatch_is_diagnosed() {
        let result = analyze_source(
            "int topla(int a, int b) { return a + b; } int ana() { return topla(1, 2, 3); }",
        );
        assert!(!result.success);
        assert!(result.diagnostics.iter().any(|d| d.message.contains("expects 2 argument")));
    }

    #[test]
    fn mutual_recursion_is_allowed_without_forward_declarations() {
        let result = analyze_source(
            "int even(int n) { if (n == 0) return 1; return odd(n - 1); } \
             int odd(int n) { if (n == 0) return 0; return even(n - 1); } \
             int ana() { return even(10); }",
        );
        assert!(result.success, "{:?}", result.diagnostics);
    }

    #[test]
    fn for_loop_init_is_scoped_to_the_loop() {
        let result = analyze_source("int ana() { for (int i = 0; i < 10; i = i + 1) { } return i; }");
        assert!(!result.success);
        assert!(result.diagnostics.iter().any(|d| d.message.contains("undeclared identifier 'i'")));
    }

    #[test]
    fn void_function_returning_a_value_is_an_error() {
        let result = analyze_source("void f() { return 1; } int ana() { f(); return 0; }");
        assert!(result.diagnostics.iter().any(|d| d.message.contains("void function cannot return")));
    }

    #[test]
    fn function_missing_its_return_value_is_an_error() {
        let result = analyze_source("int f() { return; } int ana() { return f(); }");
        assert!(result.diagnostics.iter().any(|d| d.message.contains("must return int")));
    }

    #[test]
    fn comparison_always_yields_int() {
        let result = analyze_source("int ana() { int x = 10; if (x > 5) return 1; return 0; }");
        assert!(result.success, "{:?}", result.diagnostics);
    }
}
