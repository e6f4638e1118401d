// Copyright 2026 James Casey
// SPDX-License-Identifier: Apache-2.0

//! Recursive descent parser for Rill.
//!
//! The parser is a single pass over the token stream with one token of
//! lookahead. Semantic analysis happens inline: names resolve against the
//! environment as they are read, the type checker runs at every operator,
//! and the emitter is driven directly, so there is no AST.
//!
//! # Grammar
//!
//! ```text
//! program           ::= program_header program_body '.'
//! program_header    ::= 'program' identifier 'is'
//! program_body      ::= declarations 'begin' statements 'end' 'program'
//! declarations      ::= (declaration ';')*
//! statements        ::= (statement ';')*
//! ```
//!
//! Declaration and statement productions live in the [`declarations`] and
//! [`statements`] submodules; expression productions (factored into
//! head/`_prime` pairs to stay left-associative without left recursion)
//! live in [`expressions`].
//!
//! # Error recovery
//!
//! The parser uses panic mode. An unexpected token is reported once and
//! sets the panicking flag; while the flag is set, further `expect`
//! failures are silent. Recovery consumes tokens to the next semicolon or
//! end of input, and the declaration/statement loops clear the flag before
//! every iteration.

mod declarations;
mod expressions;
mod statements;

use crate::codegen::CodeGen;
use crate::diagnostics::Diagnostics;
use crate::semantic_analysis::{Environment, Symbol, SymbolId};
use crate::source_analysis::{Lexer, Token, TokenKind, TypeMark};

/// A value produced by an expression non-terminal: its type mark, its
/// shape (0 for scalars, the element count for arrays), and the emitted
/// operand that holds it.
#[derive(Debug, Clone)]
pub(crate) struct Value {
    pub mark: TypeMark,
    pub shape: u32,
    pub operand: String,
}

/// The parser state.
pub struct Parser<'src> {
    lexer: Lexer<'src>,
    env: Environment,
    gen: CodeGen,
    diags: Diagnostics,
    /// The single token of lookahead.
    tok: Token,
    /// Procedures whose bodies are being parsed, innermost last. The
    /// synthetic program entry sits at the bottom.
    function_stack: Vec<SymbolId>,
    panicking: bool,
}

impl<'src> Parser<'src> {
    /// Creates a parser over the given source text with the first token
    /// already scanned.
    #[must_use]
    pub fn new(source: &'src str) -> Self {
        let mut parser = Self {
            lexer: Lexer::new(source),
            env: Environment::new(),
            gen: CodeGen::new(),
            diags: Diagnostics::new(),
            tok: Token::invalid(),
            function_stack: Vec::new(),
            panicking: false,
        };
        parser.scan();
        parser
    }

    /// Parses one program. Returns `true` when no error-severity
    /// diagnostic was produced.
    pub fn parse(&mut self) -> bool {
        tracing::debug!("begin parsing");
        let main = self.program_header();
        self.program_body(main);
        let _ = self.expect(TokenKind::Period);
        // One scan past the period so trailing lexical junk (an unclosed
        // comment or string) still gets reported.
        self.scan();
        tracing::debug!("done parsing");
        !self.diags.has_errored()
    }

    /// Consumes the parser, returning the emitted module text and the
    /// collected diagnostics.
    #[must_use]
    pub fn finish(self) -> (String, Diagnostics) {
        (self.gen.emit_code(), self.diags)
    }

    // ========================================================================
    // Program structure
    // ========================================================================

    //  program_header ::= 'program' identifier 'is'
    //
    // The program's identifier doubles as the synthetic entry point: it is
    // typed as an integer-returning procedure and sits at the bottom of
    // the procedure stack so that top-level `return` statements check
    // against it.
    fn program_header(&mut self) -> SymbolId {
        let _ = self.expect_scan(TokenKind::Program);
        let id = self.declare_identifier();
        {
            let arena = self.env.arena_mut();
            arena[id].set_type_mark(TypeMark::Int);
            arena[id].set_procedure(true);
        }
        self.function_stack.push(id);
        let _ = self.expect_scan(TokenKind::Is);
        id
    }

    //  program_body ::= declarations 'begin' statements 'end' 'program'
    fn program_body(&mut self, main: SymbolId) {
        self.declarations(true);
        tracing::debug!("done parsing global declarations");
        self.gen
            .begin_program(self.env.arena_mut(), main, &mut self.diags);
        let _ = self.expect_scan(TokenKind::Begin);
        self.statements();
        let _ = self.expect_scan(TokenKind::End);
        let _ = self.expect_scan(TokenKind::Program);
        self.gen.close_function(self.env.arena(), &mut self.diags);
        self.function_stack.pop();
    }

    // ========================================================================
    // Token management
    // ========================================================================

    /// Scans the next token, discarding invalid ones; the grammar never
    /// sees the synthetic invalid token.
    pub(crate) fn scan(&mut self) {
        loop {
            self.tok = self.lexer.next_token(&self.env, &mut self.diags);
            if !self.tok.is_invalid() {
                break;
            }
        }
    }

    /// Checks the lookahead token against a kind.
    pub(crate) fn check(&self, kind: TokenKind) -> bool {
        self.tok.kind() == kind
    }

    /// Expects the lookahead token to be of the given kind. A mismatch is
    /// reported once and raises the panic flag; while panicking, further
    /// failures are silent.
    pub(crate) fn expect(&mut self, kind: TokenKind) -> bool {
        if self.check(kind) {
            return true;
        }
        if !self.panicking {
            self.diags
                .error(format!("expected {}, got {}", kind.name(), self.tok));
            self.panicking = true;
        }
        false
    }

    /// Like [`Parser::expect`], advancing past the token when it matches.
    pub(crate) fn expect_scan(&mut self, kind: TokenKind) -> bool {
        let matched = self.expect(kind);
        if matched {
            self.scan();
        }
        matched
    }

    /// Panic-mode recovery: consumes tokens up to and including the next
    /// semicolon (or up to end of input) and clears the panic flag.
    pub(crate) fn resynchronize(&mut self) {
        tracing::debug!("panic mode: scanning for `;` or end of input");
        while !self.check(TokenKind::Semicolon) && !self.check(TokenKind::Eof) {
            self.scan();
        }
        if self.check(TokenKind::Semicolon) {
            self.scan();
        }
        self.panicking = false;
    }

    // ========================================================================
    // Scope management
    // ========================================================================

    /// Opens a procedure's scope and re-inserts the procedure into it so
    /// the body can recurse.
    pub(crate) fn push_scope(&mut self, id: SymbolId) {
        self.env.push();
        self.function_stack.push(id);
        if !self.env.arena()[id].is_invalid() {
            let name = self.env.arena()[id].name().clone();
            self.env.insert(&name, id, false);
        }
    }

    /// Closes the current procedure's scope.
    pub(crate) fn pop_scope(&mut self) {
        self.env.pop(&mut self.diags);
        if self.function_stack.pop().is_none() {
            self.diags.error("cannot pop an empty procedure stack");
        }
    }

    // ========================================================================
    // Identifiers
    // ========================================================================

    /// Parses an identifier being declared, allocating its symbol record.
    /// A parse failure yields the invalid hole record so downstream code
    /// stays balanced.
    pub(crate) fn declare_identifier(&mut self) -> SymbolId {
        if self.expect(TokenKind::Identifier) {
            let name = self.tok.lexeme().clone();
            self.scan();
            self.env.arena_mut().alloc(Symbol::identifier(name))
        } else {
            self.env.arena_mut().alloc(Symbol::invalid())
        }
    }

    /// Inserts a freshly declared symbol into the environment, reporting
    /// reserved-word collisions and duplicates distinctly.
    pub(crate) fn insert_declaration(&mut self, id: SymbolId, is_global: bool) {
        if self.env.arena()[id].is_invalid() {
            return;
        }
        let name = self.env.arena()[id].name().clone();
        if !self.env.insert(&name, id, is_global) {
            if self.env.is_reserved(&name) {
                self.diags
                    .error(format!("cannot declare `{name}`: reserved word"));
            } else {
                self.diags.error(format!("duplicate declaration of `{name}`"));
            }
        }
    }
}
