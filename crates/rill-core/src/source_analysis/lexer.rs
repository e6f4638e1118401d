// Copyright 2026 James Casey
// SPDX-License-Identifier: Apache-2.0

//! The Rill lexer.
//!
//! Produces one token per [`Lexer::next_token`] call from a byte stream.
//! The lexer keeps the current byte and one byte of lookahead together with
//! their character classes, and owns the one-based line counter, publishing
//! it to [`Diagnostics`] on every newline so every diagnostic snapshots the
//! right line.
//!
//! # Error recovery
//!
//! The lexer never fails completely:
//! - an invalid byte is reported and produces the synthetic invalid token,
//!   which the parser's scan loop discards;
//! - a string left open at end of input is reported and treated as closed;
//! - a block comment left open at end of input is a warning and is treated
//!   as closed.
//!
//! Identifiers are case-insensitive: the lexer folds upper-case letters to
//! lower-case while scanning, then asks the environment whether the lexeme
//! is reserved.

use ecow::EcoString;

use crate::diagnostics::Diagnostics;
use crate::semantic_analysis::Environment;

use super::{CharClass, CharTable, Token, TokenKind};

/// A lexer over one source file.
#[derive(Debug)]
pub struct Lexer<'src> {
    bytes: &'src [u8],
    /// Index of the next unread byte.
    pos: usize,
    curr: Option<u8>,
    curr_class: CharClass,
    next: Option<u8>,
    next_class: CharClass,
    table: CharTable,
    line: u32,
}

impl<'src> Lexer<'src> {
    /// Creates a lexer over the given source text.
    #[must_use]
    pub fn new(source: &'src str) -> Self {
        let bytes = source.as_bytes();
        let table = CharTable::new();
        let next = bytes.first().copied();
        let next_class = table.classify(next);
        Self {
            bytes,
            pos: 0,
            curr: None,
            curr_class: CharClass::Eof,
            next,
            next_class,
            table,
            line: 1,
        }
    }

    /// The current one-based line number.
    #[must_use]
    pub fn line(&self) -> u32 {
        self.line
    }

    /// Scans the next token.
    pub fn next_token(&mut self, env: &Environment, diags: &mut Diagnostics) -> Token {
        self.advance(diags);
        loop {
            if self.curr_class == CharClass::Whitespace {
                self.eat_whitespace(diags);
            } else if self.at_line_comment() {
                self.eat_line_comment(diags);
            } else if self.at_block_comment() {
                self.eat_block_comment(diags);
            } else {
                break;
            }
        }

        let token = match self.curr_class {
            CharClass::Upper | CharClass::Lower | CharClass::Underscore => {
                self.scan_word(env, diags)
            }
            CharClass::Digit => self.scan_number(diags),
            CharClass::Quote => self.scan_string(diags),
            CharClass::ExprOp => self.single_char(TokenKind::ExprOp),
            CharClass::ArithOp => self.single_char(TokenKind::ArithOp),
            CharClass::TermOp => self.single_char(TokenKind::TermOp),
            CharClass::RelationOp => self.scan_relation(diags),
            CharClass::Colon => self.scan_colon_or_assign(diags),
            CharClass::Period => self.single_char(TokenKind::Period),
            CharClass::Comma => self.single_char(TokenKind::Comma),
            CharClass::Semicolon => self.single_char(TokenKind::Semicolon),
            CharClass::LeftParen => self.single_char(TokenKind::LeftParen),
            CharClass::RightParen => self.single_char(TokenKind::RightParen),
            CharClass::LeftBracket => self.single_char(TokenKind::LeftBracket),
            CharClass::RightBracket => self.single_char(TokenKind::RightBracket),
            CharClass::Eof => Token::eof(),
            CharClass::Invalid | CharClass::Whitespace => {
                diags.error(format!(
                    "invalid character {:?} in input",
                    self.curr.map_or('\u{fffd}', char::from)
                ));
                Token::invalid()
            }
        };
        tracing::trace!(line = self.line, token = %token, "scanned");
        token
    }

    /// Shifts the lookahead byte into the current position and reads one
    /// more. Crossing a newline bumps the line counter and publishes it.
    fn advance(&mut self, diags: &mut Diagnostics) {
        if self.curr == Some(b'\n') {
            self.line += 1;
            diags.set_line(self.line);
        }
        self.curr = self.next;
        self.curr_class = self.next_class;
        if self.curr.is_some() {
            self.pos += 1;
        }
        self.next = self.bytes.get(self.pos).copied();
        self.next_class = self.table.classify(self.next);
    }

    fn at_line_comment(&self) -> bool {
        self.curr == Some(b'/') && self.next == Some(b'/')
    }

    fn at_block_comment(&self) -> bool {
        self.curr == Some(b'/') && self.next == Some(b'*')
    }

    fn at_block_end(&self) -> bool {
        self.curr == Some(b'*') && self.next == Some(b'/')
    }

    fn eat_whitespace(&mut self, diags: &mut Diagnostics) {
        while self.curr_class == CharClass::Whitespace {
            self.advance(diags);
        }
    }

    /// Consumes `// ...` up to (and including) the end of the line.
    fn eat_line_comment(&mut self, diags: &mut Diagnostics) {
        while self.curr.is_some() && self.curr != Some(b'\n') {
            self.advance(diags);
        }
    }

    /// Consumes a block comment. Block comments nest to arbitrary depth;
    /// end of input at depth > 0 is a warning and the comment is treated
    /// as closed.
    fn eat_block_comment(&mut self, diags: &mut Diagnostics) {
        let mut depth = 0u32;
        loop {
            if self.at_block_comment() {
                depth += 1;
                self.advance(diags);
                self.advance(diags);
            } else if self.at_block_end() {
                depth = depth.saturating_sub(1);
                self.advance(diags);
                self.advance(diags);
                if depth == 0 {
                    break;
                }
            } else if self.curr.is_none() {
                diags.warn("end of input before block comment termination, assuming closed");
                break;
            } else {
                self.advance(diags);
            }
        }
    }

    /// Scans an identifier or reserved word. Upper-case letters fold to
    /// lower-case; reserved-word detection goes through the environment.
    fn scan_word(&mut self, env: &Environment, diags: &mut Diagnostics) -> Token {
        let mut lexeme = EcoString::new();
        loop {
            let b = self.curr.unwrap_or(0).to_ascii_lowercase();
            lexeme.push(char::from(b));
            match self.next_class {
                CharClass::Upper | CharClass::Lower | CharClass::Digit | CharClass::Underscore => {
                    self.advance(diags);
                }
                _ => break,
            }
        }
        match env.reserved_kind(&lexeme) {
            Some(kind) => Token::new(kind, lexeme),
            None => Token::new(TokenKind::Identifier, lexeme),
        }
    }

    /// Scans a numeric literal: digits, underscores, and at most one
    /// period. Underscores are dropped from the lexeme; a period makes the
    /// literal a float.
    fn scan_number(&mut self, diags: &mut Diagnostics) -> Token {
        let mut lexeme = EcoString::new();
        let mut seen_period = false;
        loop {
            if self.curr_class != CharClass::Underscore {
                lexeme.push(char::from(self.curr.unwrap_or(0)));
            }
            if self.curr_class == CharClass::Period {
                seen_period = true;
            }
            match self.next_class {
                CharClass::Digit | CharClass::Underscore => self.advance(diags),
                CharClass::Period if !seen_period => self.advance(diags),
                _ => break,
            }
        }

        if lexeme.contains('.') {
            match lexeme.parse::<f32>() {
                Ok(value) => Token::float_literal(value, lexeme),
                Err(_) => {
                    diags.error(format!("invalid float literal `{lexeme}`"));
                    Token::float_literal(0.0, lexeme)
                }
            }
        } else {
            match lexeme.parse::<i32>() {
                Ok(value) => Token::int_literal(value, lexeme),
                Err(_) => {
                    diags.error(format!("integer literal `{lexeme}` out of range"));
                    Token::int_literal(0, lexeme)
                }
            }
        }
    }

    /// Scans a string literal. No escapes; end of input before the closing
    /// quote is an error and the string is treated as closed.
    fn scan_string(&mut self, diags: &mut Diagnostics) -> Token {
        let mut contents = EcoString::new();
        loop {
            self.advance(diags);
            match self.curr_class {
                CharClass::Quote => break,
                CharClass::Eof => {
                    diags.error("end of input before string termination, assuming closed");
                    break;
                }
                _ => contents.push(char::from(self.curr.unwrap_or(0))),
            }
        }
        let mut lexeme = EcoString::from("\"");
        lexeme.push_str(&contents);
        lexeme.push('"');
        Token::string_literal(contents, lexeme)
    }

    /// Scans a relational operator: one relation character optionally
    /// followed by `=`.
    fn scan_relation(&mut self, diags: &mut Diagnostics) -> Token {
        let mut lexeme = EcoString::new();
        lexeme.push(char::from(self.curr.unwrap_or(0)));
        if self.next == Some(b'=') {
            self.advance(diags);
            lexeme.push('=');
        }
        Token::new(TokenKind::RelationOp, lexeme)
    }

    /// Scans `:` or `:=`.
    fn scan_colon_or_assign(&mut self, diags: &mut Diagnostics) -> Token {
        if self.next == Some(b'=') {
            self.advance(diags);
            Token::new(TokenKind::Assign, ":=")
        } else {
            Token::new(TokenKind::Colon, ":")
        }
    }

    fn single_char(&self, kind: TokenKind) -> Token {
        let mut lexeme = EcoString::new();
        lexeme.push(char::from(self.curr.unwrap_or(0)));
        Token::new(kind, lexeme)
    }
}
