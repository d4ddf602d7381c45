//! Statement parsing: assignment, annotated assignment, procedural
//! definitions, and bare call statements.

use smol_str::SmolStr;

use crate::ast::{ExprKind, ProceduralDef, ReturnValue, Spanned, Stmt, StmtKind};
use crate::lexer::token::TokenKind;
use crate::parser::Parser;

impl<'source> Parser<'source> {
    /// `stmt := assign | ann_assign | proc_def | expr_stmt`
    pub(crate) fn parse_stmt(&mut self) -> Option<Stmt> {
        if self.at(&TokenKind::At) {
            return self.parse_procedural_def();
        }

        if let TokenKind::Ident(name) = self.peek_kind() {
            let next = self.tokens.get(self.current + 1).map(|t| &t.kind).cloned();
            match next {
                Some(TokenKind::Equals) => return self.parse_assign(name),
                Some(TokenKind::Colon) => return self.parse_ann_assign(name),
                _ => {}
            }
        }

        self.parse_expr_stmt()
    }

    /// `assign := IDENT '=' expr NEWLINE`
    fn parse_assign(&mut self, target: String) -> Option<Stmt> {
        let start = self.peek().span.start;
        self.advance();
        self.expect(&TokenKind::Equals, "'='")?;
        let value = self.parse_expr()?;
        let end = value.span.end;
        self.consume_newline();
        Some(Spanned::new(
            StmtKind::Assign {
                target: SmolStr::new(&target),
                value,
            },
            start..end,
        ))
    }

    /// `ann_assign := IDENT ':' IDENT '=' expr NEWLINE`
    fn parse_ann_assign(&mut self, target: String) -> Option<Stmt> {
        let start = self.peek().span.start;
        self.advance();
        self.expect(&TokenKind::Colon, "':'")?;
        let annotation = self.expect_ident("a type annotation")?;
        self.expect(&TokenKind::Equals, "'='")?;
        let value = self.parse_expr()?;
        let end = value.span.end;
        self.consume_newline();
        Some(Spanned::new(
            StmtKind::AnnAssign {
                target: SmolStr::new(&target),
                annotation: SmolStr::new(&annotation),
                value,
            },
            start..end,
        ))
    }

    /// `expr_stmt := call_expr NEWLINE`
    fn parse_expr_stmt(&mut self) -> Option<Stmt> {
        let value = self.parse_expr()?;
        let span = value.span.clone();
        self.consume_newline();
        Some(Spanned::new(StmtKind::ExprStmt(value), span))
    }

    /// `proc_def := '@' 'procedural' NEWLINE 'def' IDENT '(' params? ')' ':' NEWLINE`
    /// `           INDENT stmt_body+ return_stmt DEDENT`
    fn parse_procedural_def(&mut self) -> Option<Stmt> {
        let start = self.peek().span.start;
        self.advance();

        match self.expect_ident("'procedural'") {
            Some(name) if name == "procedural" => {}
            Some(other) => {
                self.error(
                    start..start,
                    format!("expected decorator 'procedural', found '{other}'"),
                );
                return None;
            }
            None => return None,
        }
        self.consume_newline();

        self.expect(&TokenKind::Def, "'def'")?;
        let name = self.expect_ident("a function name")?;
        self.expect(&TokenKind::LParen, "'('")?;

        let mut params = Vec::new();
        if !self.at(&TokenKind::RParen) {
            loop {
                let param = self.expect_ident("a parameter name")?;
                params.push(SmolStr::new(&param));
                if self.at(&TokenKind::Comma) {
                    self.advance();
                } else {
                    break;
                }
            }
        }
        self.expect(&TokenKind::RParen, "')'")?;
        self.expect(&TokenKind::Colon, "':'")?;
        self.consume_newline();
        self.expect(&TokenKind::Indent, "an indented block")?;

        let mut body = Vec::new();
        let mut returns = None;
        let mut return_count = 0;

        while !self.at(&TokenKind::Dedent) && !self.is_eof() {
            if self.at(&TokenKind::Newline) {
                self.advance();
                continue;
            }
            if self.at(&TokenKind::Return) {
                let return_span = self.peek().span.clone();
                let parsed = self.parse_return_stmt();
                return_count += 1;
                if return_count == 1 {
                    returns = parsed;
                } else {
                    self.error(
                        return_span,
                        format!("procedural block '{name}' has more than one return statement"),
                    );
                }
                continue;
            }
            match self.parse_stmt() {
                Some(stmt) => body.push(stmt),
                None => self.synchronize(),
            }
        }

        let end_tok = self.expect(&TokenKind::Dedent, "end of the procedural block")?;

        let returns = returns.or_else(|| {
            self.error(
                start..end_tok.span.end,
                "procedural block has no 'return' statement",
            );
            None
        })?;

        Some(Spanned::new(
            StmtKind::ProceduralDef(ProceduralDef {
                name: SmolStr::new(&name),
                params,
                body,
                returns,
                span: start..end_tok.span.end,
            }),
            start..end_tok.span.end,
        ))
    }

    /// `return_stmt := 'return' (IDENT | literal) NEWLINE`
    ///
    /// A bare identifier names a value computed inside the block; an
    /// int/float/bool literal is returned as-is, with no dependency on
    /// the block's body. Anything else is rejected with a diagnostic.
    fn parse_return_stmt(&mut self) -> Option<ReturnValue> {
        self.advance();
        let value = self.parse_expr()?;
        self.consume_newline();

        match value.node {
            ExprKind::Name(name) => Some(ReturnValue::Name(name)),
            ExprKind::Int(_) | ExprKind::Float(_) | ExprKind::Bool(_) => {
                Some(ReturnValue::Literal(value))
            }
            _ => {
                self.error(
                    value.span,
                    "a procedural block must return a bare variable name or a literal",
                );
                None
            }
        }
    }

    fn consume_newline(&mut self) {
        if self.at(&TokenKind::Newline) {
            self.advance();
        }
    }
}
