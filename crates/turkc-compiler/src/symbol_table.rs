//! Scope-stacked symbol table (`SPEC_FULL.md` §4.1). Built by the
//! semantic analyzer, handed by value to the code generator — there is
//! no shared mutable ownership between the two stages (the "Shared
//! symbol table ownership across analyzer and generator" design note
//! in section 9).
//!
//! The source's DJB2-over-external-chaining hash table is replaced
//! with `std::collections::HashMap` keyed by name, each bucket holding
//! every shadowed declaration for that name so `lookup` can still walk
//! the full chain and tie-break on scope level; this keeps the
//! algorithmic shape the design notes ask to retain while dropping the
//! hand-rolled hashing.

use std::collections::HashMap;
use turkc_core::types::DataType;

/// Maximum parameters a function signature may record; extra
/// parameters are dropped with a warning rather than rejected outright
/// (section 4.1, `add_parameter`).
pub const MAX_PARAMETERS: usize = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SymbolKind {
    Variable,
    Parameter,
    Function,
}

/// One parameter in a function's signature.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParamSignature {
    pub name: String,
    pub ty: DataType,
}

/// A function's full signature: return type plus ordered parameters.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Signature {
    pub return_type: Option<DataType>,
    pub params: Vec<ParamSignature>,
}

/// A declaration recorded in the symbol table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Symbol {
    pub name: String,
    pub kind: SymbolKind,
    pub data_type: DataType,
    pub scope_level: u32,
    /// Meaningful only for `Variable`/`Parameter`.
    pub slot: i32,
    pub line: u32,
    /// Present only for `Function` symbols.
    pub signature: Option<Signature>,
}

struct Scope {
    level: u32,
    next_slot: i32,
}

/// The scope-stacked symbol table. The global scope (level 0) is
/// pushed at construction and can never be popped.
pub struct SymbolTable {
    /// name -> every symbol declared under that name, across all live
    /// scopes, in declaration order (shadowing is resolved at lookup
    /// time by picking the highest `scope_level`).
    symbols: HashMap<String, Vec<Symbol>>,
    scopes: Vec<Scope>,
}

impl Default for SymbolTable {
    fn default() -> Self {
        Self::new()
    }
}

impl SymbolTable {
    pub fn new() -> Self {
        SymbolTable {
            symbols: HashMap::new(),
            scopes: vec![Scope { level: 0, next_slot: 0 }],
        }
    }

    pub fn current_level(&self) -> u32 {
        self.scopes.last().expect("global scope is never popped").level
    }

    /// Pushes a new scope inheriting its parent's next-slot counter so
    /// an inner declaration gets a fresh, non-overlapping slot.
    pub fn enter_scope(&mut self) {
        let next_slot = self.scopes.last().expect("global scope is never popped").next_slot;
        let level = self.current_level() + 1;
        self.scopes.push(Scope { level, next_slot });
    }

    /// Pops the current scope, removing every symbol declared at that
    /// level. Popping the global scope (level 0) is a silent no-op,
    /// not a crash, per section 4.1.
    pub fn exit_scope(&mut self) {
        if self.scopes.len() <= 1 {
            return;
        }
        let popped = self.scopes.pop().expect("checked len() > 1 above");
        for bucket in self.symbols.values_mut() {
            bucket.retain(|s| s.scope_level != popped.level);
        }
    }

    fn alloc_slot(&mut self) -> i32 {
        let scope = self.scopes.last_mut().expect("global scope is never popped");
        let slot = scope.next_slot;
        scope.next_slot += 1;
        slot
    }

    /// Inserts a variable or parameter declaration if no symbol with
    /// the same name exists at the current scope level. Returns
    /// `None` on a duplicate-at-this-level (the caller reports it).
    pub fn declare(&mut self, name: &str, kind: SymbolKind, data_type: DataType, line: u32) -> Option<Symbol> {
        debug_assert!(kind != SymbolKind::Function, "use declare_function for FUNCTION symbols");
        if self.lookup_current_scope(name).is_some() {
            return None;
        }
        let slot = self.alloc_slot();
        let symbol = Symbol {
            name: name.to_string(),
            kind,
            data_type,
            scope_level: self.current_level(),
            slot,
            line,
            signature: None,
        };
        self.symbols.entry(name.to_string()).or_default().push(symbol.clone());
        Some(symbol)
    }

    /// Inserts a function declaration with an empty signature, again
    /// only if no symbol with the same name exists at the current
    /// (always global, in practice) scope level.
    pub fn declare_function(&mut self, name: &str, return_type: DataType, line: u32) -> Option<Symbol> {
        if self.lookup_current_scope(name).is_some() {
            return None;
        }
        let symbol = Symbol {
            name: name.to_string(),
            kind: SymbolKind::Function,
            data_type: return_type,
            scope_level: self.current_level(),
            slot: -1,
            line,
            signature: Some(Signature {
                return_type: Some(return_type),
                params: Vec::new(),
            }),
        };
        self.symbols.entry(name.to_string()).or_default().push(symbol.clone());
        Some(symbol)
    }

    /// Extends a function symbol's signature with another parameter.
    /// Caps silently at [`MAX_PARAMETERS`] (the caller may choose to
    /// warn); returns `true` iff the parameter was recorded.
    pub fn add_parameter(&mut self, func_name: &str, param_name: &str, ty: DataType) -> bool {
        let Some(bucket) = self.symbols.get_mut(func_name) else {
            return false;
        };
        let Some(func) = bucket.iter_mut().rev().find(|s| s.kind == SymbolKind::Function) else {
            return false;
        };
        let sig = func.signature.get_or_insert_with(Signature::default);
        if sig.params.len() >= MAX_PARAMETERS {
            return false;
        }
        sig.params.push(ParamSignature {
            name: param_name.to_string(),
            ty,
        });
        true
    }

    /// Returns a function's current signature, if declared.
    pub fn function_signature(&self, name: &str) -> Option<&Signature> {
        self.lookup(name).and_then(|_| {
            self.symbols
                .get(name)
                .and_then(|bucket| bucket.iter().rev().find(|s| s.kind == SymbolKind::Function))
                .and_then(|s| s.signature.as_ref())
        })
    }

    /// Returns the symbol with the greatest scope level matching
    /// `name` (the deepest shadow), or `None`.
    pub fn lookup(&self, name: &str) -> Option<&Symbol> {
        self.symbols
            .get(name)?
            .iter()
            .max_by_key(|s| s.scope_level)
    }

    /// Returns a match only if it was declared at the current scope
    /// level.
    pub fn lookup_current_scope(&self, name: &str) -> Option<&Symbol> {
        let level = self.current_level();
        self.symbols.get(name)?.iter().find(|s| s.scope_level == level)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inner_scope_slots_continue_the_parents_numbering() {
        let mut table = SymbolTable::new();
        table.declare("a", SymbolKind::Variable, DataType::Int, 1);
        table.enter_scope();
        let b = table.declare("b", SymbolKind::Variable, DataType::Int, 2).unwrap();
        assert_eq!(b.slot, 1);
    }

    #[test]
    fn shadowing_resolves_to_the_deepest_scope() {
        let mut table = SymbolTable::new();
        table.declare("x", SymbolKind::Variable, DataType::Int, 1);
        table.enter_scope();
        table.declare("x", SymbolKind::Variable, DataType::Int, 2);
        let found = table.lookup("x").unwrap();
        assert_eq!(found.scope_level, 1);
    }

    #[test]
    fn exit_scope_removes_shadowed_symbol_and_restores_outer_one() {
        let mut table = SymbolTable::new();
        table.declare("x", SymbolKind::Variable, DataType::Int, 1);
        table.enter_scope();
        table.declare("x", SymbolKind::Variable, DataType::Int, 2);
        table.exit_scope();
        let found = table.lookup("x").unwrap();
        assert_eq!(found.scope_level, 0);
    }

    #[test]
    fn exiting_global_scope_is_a_silent_no_op() {
        let mut table = SymbolTable::new();
        table.exit_scope();
        assert_eq!(table.current_level(), 0);
    }

    #[test]
    fn duplicate_declaration_in_same_scope_is_rejected() {
        let mut table = SymbolTable::new();
        table.declare("x", SymbolKind::Variable, DataType::Int, 1);
        assert!(table.declare("x", SymbolKind::Variable, DataType::Int, 2).is_none());
    }

    #[test]
    fn function_signature_accumulates_parameters_in_order() {
        let mut table = SymbolTable::new();
        table.declare_function("topla", DataType::Int, 1);
        table.add_parameter("topla", "a", DataType::Int);
        table.add_parameter("topla", "b", DataType::Int);
        let sig = table.function_signature("topla").unwrap();
        assert_eq!(sig.params.len(), 2);
        assert_eq!(sig.params[0].name, "a");
    }

    #[test]
    fn add_parameter_caps_silently_at_max() {
        let mut table = SymbolTable::new();
        table.declare_function("f", DataType::Void, 1);
        for i in 0..MAX_PARAMETERS {
            assert!(table.add_parameter("f", &format!("p{i}"), DataType::Int));
        }
        assert!(!table.add_parameter("f", "overflow", DataType::Int));
        assert_eq!(table.function_signature("f").unwrap().params.len(), MAX_PARAMETERS);
    }

    #[test]
    fn lookup_current_scope_rejects_outer_match() {
        let mut table = SymbolTable::new();
        table.declare("x", SymbolKind::Variable, DataType::Int, 1);
        table.enter_scope();
        assert!(table.lookup_current_scope("x").is_none());
        assert!(table.lookup("x").is_some());
    }
}
