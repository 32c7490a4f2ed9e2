//! Recursive-descent parser over the token stream, building the
//! `turkc_core` AST directly (`SPEC_FULL.md` ADDED-1). The grammar is
//! the minimum needed to construct every [`NodeKind`] the analyzer,
//! code generator, and VM already define.

use crate::lexer::{self, lex, Token, TokenKind};
use std::fmt;
use turkc_core::ast::{Node, NodeKind};

/// A syntax error: the parser hit a token the grammar didn't expect.
/// Aborts the pipeline before the analyzer ever runs, the way a
/// flex/bison syntax error would have aborted the original's
/// `yyparse()`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseError {
    pub line: u32,
    pub message: String,
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}: {}", self.line, self.message)
    }
}

impl std::error::Error for ParseError {}

impl From<lexer::LexError> for ParseError {
    fn from(e: lexer::LexError) -> Self {
        ParseError {
            line: e.line,
            message: e.message,
        }
    }
}

/// Parses a complete source file into a `Program` root node.
pub fn parse(source: &str) -> Result<Node, ParseError> {
    let tokens = lex(source)?;
    let mut parser = Parser { tokens, pos: 0 };
    parser.parse_program()
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> &Token {
        &self.tokens[self.pos]
    }

    fn line(&self) -> u32 {
        self.peek().line
    }

    fn advance(&mut self) -> Token {
        let tok = self.tokens[self.pos].clone();
        if self.pos + 1 < self.tokens.len() {
            self.pos += 1;
        }
        tok
    }

    fn check(&self, kind: &TokenKind) -> bool {
        &self.peek().kind == kind
    }

    fn expect(&mut self, kind: TokenKind) -> Result<Token, ParseError> {
        if self.check(&kind) {
            Ok(self.advance())
        } else {
            Err(ParseError {
                line: self.line(),
                message: format!(
                    "expected {}, found {}",
                    lexer::describe(&kind),
                    lexer::describe(&self.peek().kind)
                ),
            })
        }
    }

    fn expect_ident(&mut self) -> Result<(String, u32), ParseError> {
        let line = self.line();
        match self.advance().kind {
            TokenKind::Ident(name) => Ok((name, line)),
            other => Err(ParseError {
                line,
                message: format!("expected identifier, found {}", lexer::describe(&other)),
            }),
        }
    }

    fn expect_type(&mut self) -> Result<(String, u32), ParseError> {
        let line = self.line();
        match self.advance().kind {
            TokenKind::KwInt => Ok(("int".to_string(), line)),
            TokenKind::KwVoid => Ok(("void".to_string(), line)),
            other => Err(ParseError {
                line,
                message: format!("expected a type (`int` or `void`), found {}", lexer::describe(&other)),
            }),
        }
    }

    fn parse_program(&mut self) -> Result<Node, ParseError> {
        let line = self.line();
        let mut node = Node::new(NodeKind::Program, line);
        while !self.check(&TokenKind::Eof) {
            node.children.push(self.parse_function()?);
        }
        Ok(node)
    }

    fn parse_function(&mut self) -> Result<Node, ParseError> {
        let (return_type, line) = self.expect_type()?;
        let (name, _) = self.expect_ident()?;
        self.expect(TokenKind::LParen)?;
        let params = self.parse_param_list()?;
        self.expect(TokenKind::RParen)?;
        let body = self.parse_block()?;

        Ok(Node::new(NodeKind::Function, line)
            .with_text(name)
            .with_declared_type(return_type)
            .push_child(params)
            .push_child(body))
    }

    fn parse_param_list(&mut self) -> Result<Node, ParseError> {
        let line = self.line();
        let mut node = Node::new(NodeKind::ParamList, line);
        if self.check(&TokenKind::RParen) {
            return Ok(node);
        }
        loop {
            let (ty, param_line) = self.expect_type()?;
            let (name, _) = self.expect_ident()?;
            node.children
                .push(Node::new(NodeKind::Param, param_line).with_text(name).with_declared_type(ty));
            if self.check(&TokenKind::Comma) {
                self.advance();
                continue;
            }
            break;
        }
        Ok(node)
    }

    fn parse_block(&mut self) -> Result<Node, ParseError> {
        let line = self.line();
        self.expect(TokenKind::LBrace)?;
        let mut node = Node::new(NodeKind::Block, line);
        while !self.check(&TokenKind::RBrace) {
            node.children.push(self.parse_statement()?);
        }
        self.expect(TokenKind::RBrace)?;
        Ok(node)
    }

    fn parse_statement(&mut self) -> Result<Node, ParseError> {
        match &self.peek().kind {
            TokenKind::LBrace => self.parse_block(),
            TokenKind::KwIf => self.parse_if(),
            TokenKind::KwWhile => self.parse_while(),
            TokenKind::KwFor => self.parse_for(),
            TokenKind::KwReturn => self.parse_return(),
            TokenKind::KwInt | TokenKind::KwVoid => {
                let decl = self.parse_var_decl()?;
                self.expect(TokenKind::Semicolon)?;
                Ok(decl)
            }
            _ => {
                let line = self.line();
                let expr = self.parse_expr()?;
                self.expect(TokenKind::Semicolon)?;
                Ok(Node::new(NodeKind::ExprStatement, line).push_child(expr))
            }
        }
    }

    fn parse_var_decl(&mut self) -> Result<Node, ParseError> {
        let (ty, line) = self.expect_type()?;
        let (name, _) = self.expect_ident()?;
        let mut node = Node::new(NodeKind::VarDecl, line).with_text(name).with_declared_type(ty);
        if self.check(&TokenKind::Assign) {
            self.advance();
            node.children.push(self.parse_expr()?);
        }
        Ok(node)
    }

    fn parse_if(&mut self) -> Result<Node, ParseError> {
        let line = self.line();
        self.advance();
        self.expect(TokenKind::LParen)?;
        let cond = self.parse_expr()?;
        self.expect(TokenKind::RParen)?;
        let then_branch = self.parse_statement()?;
        if self.check(&TokenKind::KwElse) {
            self.advance();
            let else_branch = self.parse_statement()?;
            Ok(Node::new(NodeKind::IfElse, line).push_child(cond).push_child(then_branch).push_child(else_branch))
        } else {
            Ok(Node::new(NodeKind::If, line).push_child(cond).push_child(then_branch))
        }
    }

    fn parse_while(&mut self) -> Result<Node, ParseError> {
        let line = self.line();
        self.advance();
        self.expect(TokenKind::LParen)?;
        let cond = self.parse_expr()?;
        self.expect(TokenKind::RParen)?;
        let body = self.parse_statement()?;
        Ok(Node::new(NodeKind::While, line).push_child(cond).push_child(body))
    }

    fn parse_for(&mut self) -> Result<Node, ParseError> {
        let line = self.line();
        self.advance();
        self.expect(TokenKind::LParen)?;

        let init = if self.check(&TokenKind::Semicolon) {
            Node::empty(self.line())
        } else if matches!(self.peek().kind, TokenKind::KwInt | TokenKind::KwVoid) {
            self.parse_var_decl()?
        } else {
            let expr_line = self.line();
            let expr = self.parse_expr()?;
            Node::new(NodeKind::ExprStatement, expr_line).push_child(expr)
        };
        self.expect(TokenKind::Semicolon)?;

        let cond = if self.check(&TokenKind::Semicolon) {
            Node::empty(self.line())
        } else {
            self.parse_expr()?
        };
        self.expect(TokenKind::Semicolon)?;

        let update = if self.check(&TokenKind::RParen) {
            Node::empty(self.line())
        } else {
            self.parse_expr()?
        };
        self.expect(TokenKind::RParen)?;

        let body = self.parse_statement()?;
        Ok(Node::new(NodeKind::For, line)
            .push_child(init)
            .push_child(cond)
            .push_child(update)
            .push_child(body))
    }

    fn parse_return(&mut self) -> Result<Node, ParseError> {
        let line = self.line();
        self.advance();
        let mut node = Node::new(NodeKind::Return, line);
        if !self.check(&TokenKind::Semicolon) {
            node.children.push(self.parse_expr()?);
        }
        self.expect(TokenKind::Semicolon)?;
        Ok(node)
    }

    fn parse_expr(&mut self) -> Result<Node, ParseError> {
        self.parse_assignment()
    }

    fn parse_assignment(&mut self) -> Result<Node, ParseError> {
        // `IDENT "=" assignment | equality` — look ahead two tokens to
        // disambiguate an assignment from an identifier that merely
        // starts an equality/comparison/call expression.
        if let TokenKind::Ident(name) = &self.peek().kind {
            let name = name.clone();
            let line = self.line();
            if matches!(self.tokens.get(self.pos + 1).map(|t| &t.kind), Some(TokenKind::Assign)) {
                self.advance();
                self.advance();
                let value = self.parse_assignment()?;
                let target = Node::new(NodeKind::Identifier, line).with_text(name);
                return Ok(Node::new(NodeKind::Assignment, line).push_child(target).push_child(value));
            }
        }
        self.parse_equality()
    }

    fn parse_equality(&mut self) -> Result<Node, ParseError> {
        let mut node = self.parse_comparison()?;
        loop {
            let op = match &self.peek().kind {
                TokenKind::EqEq => "==",
                TokenKind::Neq => "!=",
                _ => break,
            };
            let line = self.line();
            self.advance();
            let right = self.parse_comparison()?;
            node = Node::new(NodeKind::BinaryExpr, line).with_text(op).push_child(node).push_child(right);
        }
        Ok(node)
    }

    fn parse_comparison(&mut self) -> Result<Node, ParseError> {
        let mut node = self.parse_additive()?;
        loop {
            let op = match &self.peek().kind {
                TokenKind::Lt => "<",
                TokenKind::Gt => ">",
                TokenKind::Leq => "<=",
                TokenKind::Geq => ">=",
                _ => break,
            };
            let line = self.line();
            self.advance();
            let right = self.parse_additive()?;
            node = Node::new(NodeKind::BinaryExpr, line).with_text(op).push_child(node).push_child(right);
        }
        Ok(node)
    }

    fn parse_additive(&mut self) -> Result<Node, ParseError> {
        let mut node = self.parse_multiplicative()?;
        loop {
            let op = match &self.peek().kind {
                TokenKind::Plus => "+",
                TokenKind::Minus => "-",
                _ => break,
            };
            let line = self.line();
            self.advance();
            let right = self.parse_multiplicative()?;
            node = Node::new(NodeKind::BinaryExpr, line).with_text(op).push_child(node).push_child(right);
        }
        Ok(node)
    }

    fn parse_multiplicative(&mut self) -> Result<Node, ParseError> {
        let mut node = self.parse_unary()?;
        loop {
            let op = match &self.peek().kind {
                TokenKind::Star => "*",
                TokenKind::Slash => "/",
                TokenKind::Percent => "%",
                _ => break,
            };
            let line = self.line();
            self.advance();
            let right = self.parse_unary()?;
            node = Node::new(NodeKind::BinaryExpr, line).with_text(op).push_child(node).push_child(right);
        }
        Ok(node)
    }

    fn parse_unary(&mut self) -> Result<Node, ParseError> {
        if self.check(&TokenKind::Minus) {
            let line = self.line();
            self.advance();
            let operand = self.parse_unary()?;
            return Ok(Node::new(NodeKind::UnaryExpr, line).with_text("-").push_child(operand));
        }
        self.parse_primary()
    }

    fn parse_primary(&mut self) -> Result<Node, ParseError> {
        let line = self.line();
        match self.peek().kind.clone() {
            TokenKind::Int(text) => {
                self.advance();
                Ok(Node::new(NodeKind::NumberLiteral, line).with_text(text))
            }
            TokenKind::Str(text) => {
                self.advance();
                Ok(Node::new(NodeKind::StringLiteral, line).with_text(text))
            }
            TokenKind::Ident(name) => {
                self.advance();
                if self.check(&TokenKind::LParen) {
                    self.advance();
                    let args = self.parse_argument_list()?;
                    self.expect(TokenKind::RParen)?;
                    Ok(Node::new(NodeKind::FunctionCall, line).with_text(name).push_child(args))
                } else {
                    Ok(Node::new(NodeKind::Identifier, line).with_text(name))
                }
            }
            TokenKind::LParen => {
                self.advance();
                let expr = self.parse_expr()?;
                self.expect(TokenKind::RParen)?;
                Ok(expr)
            }
            other => Err(ParseError {
                line,
                message: format!("expected an expression, found {}", lexer::describe(&other)),
            }),
        }
    }

    fn parse_argument_list(&mut self) -> Result<Node, ParseError> {
        let line = self.line();
        let mut node = Node::new(NodeKind::ArgumentList, line);
        if self.check(&TokenKind::RParen) {
            return Ok(node);
        }
        loop {
            node.children.push(self.parse_expr()?);
            if self.check(&TokenKind::Comma) {
                self.advance();
                continue;
            }
            break;
        }
        Ok(node)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_return_constant() {
        let ast = parse("int ana() { return 42; }").unwrap();
        assert_eq!(ast.kind, NodeKind::Program);
        let func = &ast.children[0];
        assert_eq!(func.kind, NodeKind::Function);
        assert_eq!(func.text.as_deref(), Some("ana"));
        assert_eq!(func.declared_type.as_deref(), Some("int"));
        let block = &func.children[1];
        assert_eq!(block.kind, NodeKind::Block);
        let ret = &block.children[0];
        assert_eq!(ret.kind, NodeKind::Return);
        assert_eq!(ret.children[0].kind, NodeKind::NumberLiteral);
    }

    #[test]
    fn parses_if_else_children_positionally() {
        let ast = parse("int ana() { if (x > 5) return 1; else return 0; }").unwrap();
        let stmt = &ast.children[0].children[1].children[0];
        assert_eq!(stmt.kind, NodeKind::IfElse);
        assert_eq!(stmt.children.len(), 3);
        assert_eq!(stmt.children[0].kind, NodeKind::BinaryExpr);
    }

    #[test]
    fn parses_for_with_empty_clauses() {
        let ast = parse("int ana() { for (;;) { } }").unwrap();
        let stmt = &ast.children[0].children[1].children[0];
        assert_eq!(stmt.kind, NodeKind::For);
        assert!(stmt.children[0].is_empty_slot());
        assert!(stmt.children[1].is_empty_slot());
        assert!(stmt.children[2].is_empty_slot());
    }

    #[test]
    fn parses_function_call_arguments_in_order() {
        let ast = parse("int ana() { return topla(20, 22); }").unwrap();
        let ret = &ast.children[0].children[1].children[0];
        let call = &ret.children[0];
        assert_eq!(call.kind, NodeKind::FunctionCall);
        assert_eq!(call.text.as_deref(), Some("topla"));
        let args = &call.children[0];
        assert_eq!(args.children.len(), 2);
        assert_eq!(args.children[0].text.as_deref(), Some("20"));
    }

    #[test]
    fn reports_line_number_on_syntax_error() {
        let err = parse("int ana() {\n  return\n}").unwrap_err();
        assert_eq!(err.line, 3);
    }

    #[test]
    fn assignment_disambiguated_from_equality() {
        let ast = parse("int ana() { x = 1; return x == 1; }").unwrap();
        let block = &ast.children[0].children[1];
        let assign_stmt = &block.children[0].children[0];
        assert_eq!(assign_stmt.kind, NodeKind::Assignment);
        let cmp_stmt = &block.children[1].children[0];
        assert_eq!(cmp_stmt.kind, NodeKind::BinaryExpr);
        assert_eq!(cmp_stmt.text.as_deref(), Some("=="));
    }
}
