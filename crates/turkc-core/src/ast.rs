//! Abstract syntax tree for the source language.
//!
//! Every node is a tagged [`NodeKind`] plus an ordered, owned list of
//! children. Child order is positional and significant — see the
//! doc comment on each [`NodeKind`] variant for what its children mean.
//! This replaces the original implementation's singly-linked
//! "first child / next sibling" pointer chain with a plain `Vec`, which
//! is both cache-friendlier and side-steps manual list traversal.

#[cfg(feature = "json")]
use serde::{Deserialize, Serialize};

/// The kind of an AST node. Corresponds 1:1 to the node kinds of the
/// source grammar; see `SPEC_FULL.md` §ADDED-1 for the concrete syntax
/// each of these is produced from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "json", derive(Serialize, Deserialize))]
pub enum NodeKind {
    /// Root node. Children are zero or more [`NodeKind::Function`].
    Program,
    /// Children: `[ParamList, Block]`. `text` is the function name,
    /// `declared_type` is its return type (`"int"` or `"void"`).
    Function,
    /// Children are zero or more [`NodeKind::Param`].
    ParamList,
    /// Leaf. `text` is the parameter name, `declared_type` its type.
    Param,
    /// Children are the statements of the block, in order.
    Block,
    /// Children: `[]` or `[initializer]`. `text` is the variable name,
    /// `declared_type` its declared type.
    VarDecl,
    /// Leaf. `text` is the identifier's name.
    Identifier,
    /// Leaf. `text` is the literal's source lexeme.
    NumberLiteral,
    /// Leaf. `text` is the literal's source lexeme, quotes stripped.
    /// Evaluates to the placeholder integer `0` (see `SPEC_FULL.md`
    /// §ADDED-5) — there is no string runtime.
    StringLiteral,
    /// Children: `[target, value]`. `target` is always an `Identifier`.
    Assignment,
    /// Children: `[left, right]`. `text` is the operator spelling.
    BinaryExpr,
    /// Children: `[operand]`. `text` is the operator spelling.
    UnaryExpr,
    /// Children: `[condition, then]`.
    If,
    /// Children: `[condition, then, else]`.
    IfElse,
    /// Children: `[condition, body]`.
    While,
    /// Children: `[init, cond, update, body]`; any of the first three
    /// may be [`NodeKind::Empty`].
    For,
    /// Children: `[]` or `[value]`.
    Return,
    /// Children: `[expression]`.
    ExprStatement,
    /// Children: `[ArgumentList]`. `text` is the callee's name.
    FunctionCall,
    /// Children are the call's argument expressions, in order.
    ArgumentList,
    /// Sentinel for an absent optional child (e.g. a `for` loop with
    /// no initializer). Carries no payload and no children.
    Empty,
}

/// A node in the abstract syntax tree. Immutable after construction by
/// convention: nothing downstream of the parser mutates a `Node` in
/// place, though nothing in the type itself enforces that.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "json", derive(Serialize, Deserialize))]
pub struct Node {
    pub kind: NodeKind,
    /// 1-based source line the node was parsed from.
    pub line: u32,
    /// Identifier name, literal lexeme, or operator spelling, depending
    /// on `kind`.
    pub text: Option<String>,
    /// Declared type annotation (`"int"` or `"void"`), present on
    /// `Function`, `Param`, and `VarDecl`.
    pub declared_type: Option<String>,
    pub children: Vec<Node>,
}

impl Node {
    pub fn new(kind: NodeKind, line: u32) -> Self {
        Node {
            kind,
            line,
            text: None,
            declared_type: None,
            children: Vec::new(),
        }
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    pub fn with_declared_type(mut self, ty: impl Into<String>) -> Self {
        self.declared_type = Some(ty.into());
        self
    }

    pub fn with_children(mut self, children: Vec<Node>) -> Self {
        self.children = children;
        self
    }

    pub fn push_child(mut self, child: Node) -> Self {
        self.children.push(child);
        self
    }

    pub fn empty(line: u32) -> Self {
        Node::new(NodeKind::Empty, line)
    }

    /// `true` for the [`NodeKind::Empty`] sentinel used in optional
    /// `for`-loop clauses.
    pub fn is_empty_slot(&self) -> bool {
        self.kind == NodeKind::Empty
    }
}
