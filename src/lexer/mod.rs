//! Lexical analysis for section-body source text.
//!
//! This is a hand-rolled, error-tolerant, indentation-aware scanner in the
//! same style as the parser this crate's pipeline is built around: it never
//! stops at the first bad character, accumulating diagnostics instead so a
//! caller can see every problem in one pass. Indentation is tracked the way
//! a Python tokenizer tracks it — a stack of column widths, with `Indent`/
//! `Dedent` tokens synthesized as the stack grows and shrinks — because
//! `@procedural def` bodies are the one place this grammar needs blocks.

pub mod keywords;
pub mod token;

use crate::diag::Diag;
use token::{Token, TokenKind};

/// Result of lexical analysis.
#[derive(Debug, Clone, PartialEq)]
pub struct LexerResult {
    /// The tokens produced, including a trailing `Eof` token.
    pub tokens: Vec<Token>,
    /// Diagnostics (errors) encountered during lexing.
    pub diagnostics: Vec<Diag>,
}

/// A lexical analyzer for section-body source text.
pub struct Lexer<'a> {
    source: &'a str,
    pos: usize,
    tokens: Vec<Token>,
    diagnostics: Vec<Diag>,
    indent_stack: Vec<usize>,
    at_line_start: bool,
}

impl<'a> Lexer<'a> {
    /// Creates a new lexer for the given source text.
    pub fn new(source: &'a str) -> Self {
        Self {
            source,
            pos: 0,
            tokens: Vec::new(),
            diagnostics: Vec::new(),
            indent_stack: vec![0],
            at_line_start: true,
        }
    }

    /// Tokenizes the source text and returns the result.
    pub fn tokenize(mut self) -> LexerResult {
        loop {
            if self.at_line_start {
                let indent = self.measure_indent();

                if self.is_at_end() {
                    break;
                }

                if self.peek() == '\n' || self.peek() == '#' {
                    self.skip_comment();
                    if self.peek() == '\n' {
                        self.advance();
                    }
                    continue;
                }

                self.apply_indent(indent);
                self.at_line_start = false;
            }

            self.skip_inline_whitespace();

            if self.is_at_end() {
                break;
            }

            match self.peek() {
                '\n' => {
                    let start = self.pos;
                    self.advance();
                    self.add_token(TokenKind::Newline, start);
                    self.at_line_start = true;
                }
                '#' => self.skip_comment(),
                _ => self.scan_token(),
            }
        }

        self.finish()
    }

    fn finish(&mut self) {
        if !matches!(
            self.tokens.last().map(|t| &t.kind),
            Some(TokenKind::Newline) | Some(TokenKind::Indent) | Some(TokenKind::Dedent) | None
        ) {
            self.add_token(TokenKind::Newline, self.pos);
        }

        while self.indent_stack.len() > 1 {
            self.indent_stack.pop();
            self.add_token(TokenKind::Dedent, self.pos);
        }

        self.add_token(TokenKind::Eof, self.pos);
    }

    /// Counts leading-space columns at a line start, advancing past them.
    /// A tab in indentation is an error; it is consumed and counted as a
    /// single column so scanning can continue.
    fn measure_indent(&mut self) -> usize {
        let mut columns = 0;
        loop {
            match self.peek() {
                ' ' => {
                    columns += 1;
                    self.advance();
                }
                '\t' => {
                    self.error(self.pos, "tabs are not allowed in indentation");
                    columns += 1;
                    self.advance();
                }
                _ => break,
            }
        }
        columns
    }

    /// Reconciles the indent stack with a newly measured column width,
    /// emitting `Indent`/`Dedent` tokens for the difference.
    fn apply_indent(&mut self, indent: usize) {
        let top = *self.indent_stack.last().unwrap();
        if indent > top {
            self.indent_stack.push(indent);
            self.add_token(TokenKind::Indent, self.pos);
        } else if indent < top {
            while indent < *self.indent_stack.last().unwrap() {
                self.indent_stack.pop();
                self.add_token(TokenKind::Dedent, self.pos);
            }
            if *self.indent_stack.last().unwrap() != indent {
                self.error(self.pos, "inconsistent indentation");
                self.indent_stack.push(indent);
            }
        }
    }

    fn skip_comment(&mut self) {
        if self.peek() == '#' {
            while self.peek() != '\n' && !self.is_at_end() {
                self.advance();
            }
        }
    }

    fn skip_inline_whitespace(&mut self) {
        while matches!(self.peek(), ' ' | '\t' | '\r') {
            self.advance();
        }
    }

    fn scan_token(&mut self) {
        let start = self.pos;
        let ch = self.advance();

        match ch {
            '(' => self.add_token(TokenKind::LParen, start),
            ')' => self.add_token(TokenKind::RParen, start),
            '[' => self.add_token(TokenKind::LBracket, start),
            ']' => self.add_token(TokenKind::RBracket, start),
            ',' => self.add_token(TokenKind::Comma, start),
            ':' => self.add_token(TokenKind::Colon, start),
            '@' => self.add_token(TokenKind::At, start),
            '=' => self.add_token(TokenKind::Equals, start),
            '+' => self.add_token(TokenKind::Plus, start),
            '-' => self.add_token(TokenKind::Minus, start),
            '%' => self.add_token(TokenKind::Percent, start),
            '*' => {
                if self.match_char('*') {
                    self.add_token(TokenKind::DoubleStar, start);
                } else {
                    self.add_token(TokenKind::Star, start);
                }
            }
            '/' => {
                if self.match_char('/') {
                    self.add_token(TokenKind::DoubleSlash, start);
                } else {
                    self.add_token(TokenKind::Slash, start);
                }
            }
            '0'..='9' => self.scan_number(start),
            'a'..='z' | 'A'..='Z' | '_' => self.scan_identifier_or_keyword(start),
            _ => {
                self.error(start, &format!("unexpected character '{ch}'"));
            }
        }
    }

    fn scan_identifier_or_keyword(&mut self, start: usize) {
        while matches!(self.peek(), 'a'..='z' | 'A'..='Z' | '0'..='9' | '_') {
            self.advance();
        }

        let text = &self.source[start..self.pos];
        match keywords::lookup_keyword(text) {
            Some(kind) => self.add_token(kind, start),
            None => self.add_token(TokenKind::Ident(text.to_string()), start),
        }
    }

    fn scan_number(&mut self, start: usize) {
        while self.peek().is_ascii_digit() {
            self.advance();
        }

        let mut is_float = false;

        if self.peek() == '.' && self.peek_next().is_ascii_digit() {
            is_float = true;
            self.advance();
            while self.peek().is_ascii_digit() {
                self.advance();
            }
        }

        if matches!(self.peek(), 'e' | 'E') {
            is_float = true;
            self.advance();
            if matches!(self.peek(), '+' | '-') {
                self.advance();
            }
            while self.peek().is_ascii_digit() {
                self.advance();
            }
        }

        let text = &self.source[start..self.pos];
        if is_float {
            match text.parse::<f64>() {
                Ok(value) => self.add_token(TokenKind::Float(value), start),
                Err(_) => self.error(start, &format!("invalid float literal '{text}'")),
            }
        } else {
            match text.parse::<i64>() {
                Ok(value) => self.add_token(TokenKind::Int(value), start),
                Err(_) => self.error(start, &format!("invalid integer literal '{text}'")),
            }
        }
    }

    fn add_token(&mut self, kind: TokenKind, start: usize) {
        let span = start..self.pos;
        self.tokens.push(Token::new(kind, span));
    }

    fn error(&mut self, pos: usize, message: &str) {
        let span = pos..pos.saturating_add(1).min(self.source.len());
        self.diagnostics.push(
            Diag::error(message)
                .with_primary_label(span, "here")
                .with_code("L001"),
        );
    }

    fn peek(&self) -> char {
        self.source[self.pos..].chars().next().unwrap_or('\0')
    }

    fn peek_next(&self) -> char {
        let mut chars = self.source[self.pos..].chars();
        chars.next();
        chars.next().unwrap_or('\0')
    }

    fn advance(&mut self) -> char {
        let ch = self.peek();
        if ch != '\0' {
            self.pos += ch.len_utf8();
        }
        ch
    }

    fn match_char(&mut self, expected: char) -> bool {
        if self.peek() == expected {
            self.advance();
            true
        } else {
            false
        }
    }

    fn is_at_end(&self) -> bool {
        self.pos >= self.source.len()
    }
}

/// Tokenizes source text.
pub fn tokenize(source: &str) -> LexerResult {
    Lexer::new(source).tokenize()
}
