//! Token navigation and consumption primitives.

use crate::diag::Diag;
use crate::lexer::token::{Token, TokenKind};
use crate::parser::Parser;

impl<'source> Parser<'source> {
    /// Returns a reference to the current token without consuming it.
    pub(crate) fn peek(&self) -> &Token {
        self.tokens.get(self.current).unwrap_or_else(|| {
            self.tokens
                .last()
                .expect("token stream should never be empty")
        })
    }

    /// Returns the kind of the current token.
    pub(crate) fn peek_kind(&self) -> TokenKind {
        self.peek().kind.clone()
    }

    /// Consumes the current token and advances to the next.
    pub(crate) fn advance(&mut self) -> Token {
        let token = self.peek().clone();
        if !matches!(token.kind, TokenKind::Eof) {
            self.current += 1;
        }
        token
    }

    /// Checks if the current token matches the given kind.
    pub(crate) fn at(&self, kind: &TokenKind) -> bool {
        &self.peek_kind() == kind
    }

    /// Checks if we're at the end of the token stream.
    pub(crate) fn is_eof(&self) -> bool {
        self.at(&TokenKind::Eof)
    }

    /// Consumes the current token if it matches the expected kind,
    /// otherwise records a diagnostic and returns `None`.
    pub(crate) fn expect(&mut self, kind: &TokenKind, what: &str) -> Option<Token> {
        if self.at(kind) {
            Some(self.advance())
        } else {
            let span = self.peek().span.clone();
            self.diagnostics.push(
                Diag::error(format!("expected {what}, found {:?}", self.peek_kind()))
                    .with_primary_label(span, "here")
                    .with_code("P001"),
            );
            None
        }
    }

    /// Consumes an identifier token, returning its name.
    pub(crate) fn expect_ident(&mut self, what: &str) -> Option<String> {
        match self.peek_kind() {
            TokenKind::Ident(name) => {
                self.advance();
                Some(name)
            }
            _ => {
                let span = self.peek().span.clone();
                self.diagnostics.push(
                    Diag::error(format!("expected {what}, found {:?}", self.peek_kind()))
                        .with_primary_label(span, "here")
                        .with_code("P001"),
                );
                None
            }
        }
    }

    pub(crate) fn error(&mut self, span: crate::ast::Span, message: impl Into<String>) {
        self.diagnostics.push(
            Diag::error(message)
                .with_primary_label(span, "here")
                .with_code("P002"),
        );
    }
}
