//! Expression parsing: precedence-climbing arithmetic, calls, subscripts.

use smol_str::SmolStr;

use crate::ast::{BinOp, Expr, ExprKind, Span, Spanned, UnaryOp};
use crate::lexer::token::TokenKind;
use crate::parser::Parser;

impl<'source> Parser<'source> {
    /// `expr := term (('+'|'-') term)*`
    pub(crate) fn parse_expr(&mut self) -> Option<Expr> {
        let mut lhs = self.parse_term()?;

        loop {
            let op = match self.peek_kind() {
                TokenKind::Plus => BinOp::Add,
                TokenKind::Minus => BinOp::Sub,
                _ => break,
            };
            self.advance();
            let rhs = self.parse_term()?;
            let span = lhs.span.start..rhs.span.end;
            lhs = Spanned::new(ExprKind::Binary(op, Box::new(lhs), Box::new(rhs)), span);
        }

        Some(lhs)
    }

    /// `term := factor (('*'|'/'|'//'|'%') factor)*`
    fn parse_term(&mut self) -> Option<Expr> {
        let mut lhs = self.parse_factor()?;

        loop {
            let op = match self.peek_kind() {
                TokenKind::Star => BinOp::Mul,
                TokenKind::Slash => BinOp::Div,
                TokenKind::DoubleSlash => BinOp::FloorDiv,
                TokenKind::Percent => BinOp::Mod,
                _ => break,
            };
            self.advance();
            let rhs = self.parse_factor()?;
            let span = lhs.span.start..rhs.span.end;
            lhs = Spanned::new(ExprKind::Binary(op, Box::new(lhs), Box::new(rhs)), span);
        }

        Some(lhs)
    }

    /// `factor := power | unary`
    fn parse_factor(&mut self) -> Option<Expr> {
        let op = match self.peek_kind() {
            TokenKind::Minus => Some(UnaryOp::Neg),
            TokenKind::Plus => Some(UnaryOp::Pos),
            _ => None,
        };

        match op {
            Some(op) => {
                let start = self.peek().span.start;
                self.advance();
                let operand = self.parse_factor()?;
                let span = start..operand.span.end;
                Some(Spanned::new(
                    ExprKind::Unary(op, Box::new(operand)),
                    span,
                ))
            }
            None => self.parse_power(),
        }
    }

    /// `power := primary ('**' factor)?`
    fn parse_power(&mut self) -> Option<Expr> {
        let base = self.parse_postfix()?;

        if self.at(&TokenKind::DoubleStar) {
            self.advance();
            let exponent = self.parse_factor()?;
            let span = base.span.start..exponent.span.end;
            return Some(Spanned::new(
                ExprKind::Binary(BinOp::Pow, Box::new(base), Box::new(exponent)),
                span,
            ));
        }

        Some(base)
    }

    /// `primary ('[' expr ']')*` — subscripts chain onto any primary.
    fn parse_postfix(&mut self) -> Option<Expr> {
        let mut value = self.parse_primary()?;

        while self.at(&TokenKind::LBracket) {
            self.advance();
            let index = self.parse_expr()?;
            let end_tok = self.expect(&TokenKind::RBracket, "']'")?;
            let span = value.span.start..end_tok.span.end;
            value = Spanned::new(ExprKind::Subscript(Box::new(value), Box::new(index)), span);
        }

        Some(value)
    }

    /// `primary := NUMBER | BOOL | IDENT | call_expr | '(' expr ')'`
    fn parse_primary(&mut self) -> Option<Expr> {
        let token = self.peek().clone();
        match token.kind {
            TokenKind::Int(value) => {
                self.advance();
                Some(Spanned::new(ExprKind::Int(value), token.span))
            }
            TokenKind::Float(value) => {
                self.advance();
                Some(Spanned::new(ExprKind::Float(value), token.span))
            }
            TokenKind::Bool(value) => {
                self.advance();
                Some(Spanned::new(ExprKind::Bool(value), token.span))
            }
            TokenKind::Ident(name) => {
                self.advance();
                if self.at(&TokenKind::LParen) {
                    self.parse_call(SmolStr::new(&name), token.span.start)
                } else {
                    Some(Spanned::new(ExprKind::Name(SmolStr::new(&name)), token.span))
                }
            }
            TokenKind::LParen => {
                self.advance();
                let inner = self.parse_expr()?;
                self.expect(&TokenKind::RParen, "')'")?;
                Some(inner)
            }
            _ => {
                self.error(token.span.clone(), format!("expected an expression, found {:?}", token.kind));
                None
            }
        }
    }

    /// `call_expr := IDENT '(' arg_list? ')'`, called with the callee
    /// already consumed.
    fn parse_call(&mut self, callee: SmolStr, start: usize) -> Option<Expr> {
        self.expect(&TokenKind::LParen, "'('")?;

        let mut args = Vec::new();
        let mut keywords = Vec::new();

        if !self.at(&TokenKind::RParen) {
            loop {
                self.parse_arg(&mut args, &mut keywords)?;
                if self.at(&TokenKind::Comma) {
                    self.advance();
                } else {
                    break;
                }
            }
        }

        let close = self.expect(&TokenKind::RParen, "')'")?;
        let span: Span = start..close.span.end;
        Some(Spanned::new(
            ExprKind::Call {
                callee,
                args,
                keywords,
            },
            span,
        ))
    }

    /// `arg := expr | IDENT '=' expr`
    fn parse_arg(&mut self, args: &mut Vec<Expr>, keywords: &mut Vec<(SmolStr, Expr)>) -> Option<()> {
        if let TokenKind::Ident(name) = self.peek_kind() {
            if matches!(
                self.tokens.get(self.current + 1).map(|t| &t.kind),
                Some(TokenKind::Equals)
            ) {
                self.advance();
                self.advance();
                let value = self.parse_expr()?;
                keywords.push((SmolStr::new(&name), value));
                return Some(());
            }
        }

        let value = self.parse_expr()?;
        args.push(value);
        Some(())
    }
}
