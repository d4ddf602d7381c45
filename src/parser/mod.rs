//! Parser infrastructure for section-body syntax.
//!
//! The parser consumes a token stream produced by the lexer and constructs
//! a [`Section`] AST, recovering at statement boundaries (skipping to the
//! next `NEWLINE`) rather than stopping at the first error.

mod expr;
pub(crate) mod primitives;
mod stmt;

use crate::ast::Section;
use crate::diag::{Diag, DiagSeverity, SourceFile, convert_diagnostics_to_reports};
use crate::lexer::token::{Token, TokenKind};
use miette::Report;

/// Result of parsing a section body.
#[derive(Debug)]
pub struct ParseResult {
    /// The parsed section. Populated even when `had_error` is set, since
    /// recovery keeps whatever statements parsed cleanly around the bad
    /// one; callers that require a fully clean parse must check
    /// `had_error` themselves rather than treating `Some` as success.
    pub section: Option<Section>,
    /// Whether any diagnostic reached `Error` severity. A recovered parse
    /// can still produce `section: Some(..)` with this set — the body is
    /// only a partial, synchronized reconstruction in that case.
    pub had_error: bool,
    /// All collected diagnostics rendered as miette reports.
    pub diagnostics: Vec<Report>,
}

/// Section-body parser with statement-boundary error recovery.
pub struct Parser<'source> {
    tokens: Vec<Token>,
    current: usize,
    diagnostics: Vec<Diag>,
    source: &'source str,
}

impl<'source> Parser<'source> {
    /// Creates a new parser from a token stream.
    pub fn new(mut tokens: Vec<Token>, source: &'source str) -> Self {
        if tokens.is_empty() {
            tokens.push(Token::new(TokenKind::Eof, 0..0));
        } else if !matches!(tokens.last().map(|t| &t.kind), Some(TokenKind::Eof)) {
            let eof_pos = tokens.last().map(|t| t.span.end).unwrap_or(0);
            tokens.push(Token::new(TokenKind::Eof, eof_pos..eof_pos));
        }

        Self {
            tokens,
            current: 0,
            diagnostics: Vec::new(),
            source,
        }
    }

    /// Parses the token stream into a section AST.
    pub fn parse(mut self) -> ParseResult {
        let mut body = Vec::new();

        while !self.is_eof() {
            if self.at(&TokenKind::Newline) {
                self.advance();
                continue;
            }
            match self.parse_stmt() {
                Some(stmt) => body.push(stmt),
                None => self.synchronize(),
            }
        }

        let has_error = self
            .diagnostics
            .iter()
            .any(|diag| diag.severity == DiagSeverity::Error);
        let section = if has_error && body.is_empty() {
            None
        } else {
            Some(Section { body })
        };

        let source = SourceFile::new(self.source);
        let reports = convert_diagnostics_to_reports(&self.diagnostics, &source);

        ParseResult {
            section,
            had_error,
            diagnostics: reports,
        }
    }

    /// Merges lexer diagnostics ahead of parser diagnostics.
    pub fn with_lexer_diagnostics(mut self, lex_diags: Vec<Diag>) -> Self {
        let mut all_diags = lex_diags;
        all_diags.append(&mut self.diagnostics);
        self.diagnostics = all_diags;
        self
    }

    /// Skips tokens until the next `NEWLINE` or `EOF`, for statement-level
    /// error recovery.
    fn synchronize(&mut self) {
        while !self.is_eof() && !self.at(&TokenKind::Newline) {
            self.advance();
        }
        if self.at(&TokenKind::Newline) {
            self.advance();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::tokenize;

    fn parse(source: &str) -> ParseResult {
        let lexed = tokenize(source);
        Parser::new(lexed.tokens, source)
            .with_lexer_diagnostics(lexed.diagnostics)
            .parse()
    }

    #[test]
    fn parses_empty_section() {
        let result = parse("");
        assert!(result.section.is_some());
        assert!(result.section.unwrap().body.is_empty());
    }

    #[test]
    fn parses_simple_assignment() {
        let result = parse("x = 1\n");
        let section = result.section.expect("section");
        assert_eq!(section.body.len(), 1);
    }

    #[test]
    fn recovers_after_a_bad_statement_but_flags_the_error() {
        let result = parse("x = &\ny = 2\n");
        let section = result.section.expect("section");
        assert_eq!(section.body.len(), 1);
        assert!(!result.diagnostics.is_empty());
        assert!(result.had_error, "a synchronized partial parse must still report had_error");
    }

    #[test]
    fn a_bad_statement_among_good_ones_still_sets_had_error() {
        let result = parse("x = 1\ny = &\nz = 2\n");
        let section = result.section.expect("section");
        assert_eq!(section.body.len(), 2);
        assert!(result.had_error);
    }
}
