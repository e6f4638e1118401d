// Copyright 2026 James Casey
// SPDX-License-Identifier: Apache-2.0

//! Property-based tests for the lexer.
//!
//! The core round-trip guarantee: lexing a token stream, re-serializing
//! the lexemes with separators, and re-lexing the concatenation yields the
//! same token kinds in the same order.

use proptest::prelude::*;

use crate::diagnostics::Diagnostics;
use crate::semantic_analysis::Environment;

use super::{Lexer, Token, TokenKind};

fn lex_kinds(source: &str) -> Vec<TokenKind> {
    let env = Environment::new();
    let mut diags = Diagnostics::new();
    let mut lexer = Lexer::new(source);
    let mut kinds = Vec::new();
    loop {
        let token = lexer.next_token(&env, &mut diags);
        if token.is_eof() {
            break;
        }
        kinds.push(token.kind());
    }
    kinds
}

fn lex_tokens(source: &str) -> Vec<Token> {
    let env = Environment::new();
    let mut diags = Diagnostics::new();
    let mut lexer = Lexer::new(source);
    let mut tokens = Vec::new();
    loop {
        let token = lexer.next_token(&env, &mut diags);
        if token.is_eof() {
            break;
        }
        tokens.push(token);
    }
    tokens
}

/// One well-formed lexeme from each token family. Identifiers are drawn
/// away from the reserved words so their kind is stable under re-lexing.
fn arb_lexeme() -> impl Strategy<Value = String> {
    prop_oneof![
        // Identifiers (lower-case, cannot collide with reserved words
        // because of the trailing digit-free shape plus the `v_` prefix).
        "[a-z][a-z0-9_]{0,8}".prop_map(|s| format!("v_{s}")),
        // Reserved words.
        prop_oneof![
            Just("program".to_string()),
            Just("procedure".to_string()),
            Just("variable".to_string()),
            Just("begin".to_string()),
            Just("end".to_string()),
            Just("if".to_string()),
            Just("for".to_string()),
            Just("return".to_string()),
            Just("not".to_string()),
            Just("true".to_string()),
            Just("false".to_string()),
        ],
        // Numbers.
        "[0-9]{1,6}",
        "[0-9]{1,4}\\.[0-9]{1,4}",
        // Strings (no quotes or backslashes inside).
        "\"[a-zA-Z0-9 ]{0,10}\"",
        // Operators and punctuation.
        prop_oneof![
            Just(":=".to_string()),
            Just(":".to_string()),
            Just(";".to_string()),
            Just(",".to_string()),
            Just(".".to_string()),
            Just("(".to_string()),
            Just(")".to_string()),
            Just("[".to_string()),
            Just("]".to_string()),
            Just("&".to_string()),
            Just("|".to_string()),
            Just("+".to_string()),
            Just("-".to_string()),
            Just("*".to_string()),
            Just("<".to_string()),
            Just("<=".to_string()),
            Just(">".to_string()),
            Just(">=".to_string()),
            Just("==".to_string()),
            Just("!=".to_string()),
        ],
    ]
}

proptest! {
    /// Lex, re-serialize the lexemes, re-lex: same kinds in same order.
    #[test]
    fn relexing_serialized_lexemes_is_stable(lexemes in prop::collection::vec(arb_lexeme(), 0..40)) {
        let source = lexemes.join(" ");
        let first = lex_tokens(&source);
        let serialized = first
            .iter()
            .map(|t| t.lexeme().as_str())
            .collect::<Vec<_>>()
            .join(" ");
        let second = lex_kinds(&serialized);
        let first_kinds: Vec<TokenKind> = first.iter().map(Token::kind).collect();
        prop_assert_eq!(first_kinds, second);
    }

    /// The lexer terminates and never panics on arbitrary ASCII input.
    #[test]
    fn lexer_total_on_ascii_soup(source in "[ -~\\n\\t]{0,200}") {
        let _ = lex_kinds(&source);
    }

    /// Whitespace between tokens never changes the kind sequence.
    #[test]
    fn whitespace_is_insignificant(lexemes in prop::collection::vec(arb_lexeme(), 1..20)) {
        let tight = lexemes.join(" ");
        let loose = lexemes.join("  \n\t ");
        prop_assert_eq!(lex_kinds(&tight), lex_kinds(&loose));
    }

    /// Line comments swallow everything to the end of the line.
    #[test]
    fn line_comments_are_invisible(junk in "[a-z0-9 :=<>&|+*-]{0,40}") {
        let source = format!("alpha // {junk}\nomega");
        let kinds = lex_kinds(&source);
        prop_assert_eq!(kinds, vec![TokenKind::Identifier, TokenKind::Identifier]);
    }
}
