// Copyright 2026 James Casey
// SPDX-License-Identifier: Apache-2.0

//! Lexical analysis for Rill source code.
//!
//! This module contains the character classifier, the token model, and the
//! lexer. The lexer produces one token per call and never surfaces the
//! synthetic `Invalid` token to the grammar: the parser's scan loop discards
//! invalid tokens and retries, so lexical errors degrade into diagnostics
//! rather than parse failures.

mod char_class;
mod lexer;
mod token;

// Property-based tests for the lexer round-trip guarantee.
#[cfg(test)]
mod lexer_property_tests;

pub use char_class::{CharClass, CharTable};
pub use lexer::Lexer;
pub use token::{Token, TokenKind, TokenValue, TypeMark};
