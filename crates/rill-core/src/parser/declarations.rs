// Copyright 2026 James Casey
// SPDX-License-Identifier: Apache-2.0

//! Declaration parsing: procedures, variables, parameters, and bounds.
//!
//! Top-level declarations are global whether or not they say so; inside a
//! procedure body the `global` keyword routes the insertion to the global
//! table. A procedure header opens a fresh scope holding the procedure's
//! own name (so the body can recurse) and its parameters; the matching end
//! of the declaration closes it.

use crate::semantic_analysis::SymbolId;
use crate::source_analysis::{TokenKind, TokenValue, TypeMark};

use super::Parser;

impl Parser<'_> {
    //  declarations ::= (declaration ';')*
    //
    // FIRST(declaration) = { 'global', 'procedure', 'variable' }.
    pub(super) fn declarations(&mut self, is_global: bool) {
        loop {
            self.panicking = false;
            if !(self.check(TokenKind::Global)
                || self.check(TokenKind::Procedure)
                || self.check(TokenKind::Variable))
            {
                break;
            }
            let ok = self.declaration(is_global);
            if !ok || !self.expect_scan(TokenKind::Semicolon) {
                self.resynchronize();
            }
        }
    }

    //  declaration ::= ['global'] (procedure_declaration | variable_declaration)
    fn declaration(&mut self, mut is_global: bool) -> bool {
        if self.check(TokenKind::Global) {
            is_global = true;
            self.scan();
        }
        if self.check(TokenKind::Procedure) {
            self.procedure_declaration(is_global)
        } else if self.check(TokenKind::Variable) {
            self.variable_declaration(is_global, false).is_some()
        } else {
            self.diags.error(format!(
                "unexpected token {}; expected `procedure` or `variable`",
                self.tok
            ));
            self.panicking = true;
            false
        }
    }

    //  procedure_declaration ::= procedure_header procedure_body
    fn procedure_declaration(&mut self, is_global: bool) -> bool {
        let id = self.procedure_header(is_global);
        let body_ok = self.procedure_body();
        self.gen.close_function(self.env.arena(), &mut self.diags);
        self.pop_scope();
        body_ok && !self.env.arena()[id].is_invalid()
    }

    //  procedure_header ::= 'procedure' identifier ':' type_mark '(' [parameter_list] ')'
    //
    // The procedure is inserted into the enclosing scope first, then into
    // its own fresh scope for recursion. The function frame opens only
    // after the parameter list is complete; from that point the parameter
    // list is read-only.
    fn procedure_header(&mut self, is_global: bool) -> SymbolId {
        let _ = self.expect_scan(TokenKind::Procedure);
        let id = self.declare_identifier();
        self.insert_declaration(id, is_global);
        let _ = self.expect_scan(TokenKind::Colon);
        let mark = self.type_mark();
        {
            let arena = self.env.arena_mut();
            arena[id].set_type_mark(mark);
            arena[id].set_procedure(true);
        }
        self.push_scope(id);
        let _ = self.expect_scan(TokenKind::LeftParen);
        if self.check(TokenKind::Variable) {
            self.parameter_list(id);
        }
        let _ = self.expect_scan(TokenKind::RightParen);
        self.gen
            .add_function(self.env.arena_mut(), id, &mut self.diags);
        id
    }

    //  parameter_list ::= parameter (',' parameter)*
    //  parameter      ::= variable_declaration
    fn parameter_list(&mut self, proc: SymbolId) {
        loop {
            match self.variable_declaration(false, true) {
                Some(param) => {
                    self.env
                        .arena_mut()
                        .add_param(proc, param, &mut self.diags);
                }
                None => self.diags.warn("ill-formed parameter; skipping"),
            }
            if self.check(TokenKind::Comma) {
                self.scan();
            } else {
                break;
            }
        }
    }

    //  procedure_body ::= declarations 'begin' statements 'end' 'procedure'
    fn procedure_body(&mut self) -> bool {
        self.declarations(false);
        if !self.expect_scan(TokenKind::Begin) {
            return false;
        }
        self.statements();
        self.expect_scan(TokenKind::End) && self.expect_scan(TokenKind::Procedure)
    }

    //  variable_declaration ::= 'variable' identifier ':' type_mark ['[' bound ']']
    //
    // Parameters skip storage emission here: their stack slots are
    // allocated by the function frame once the header completes.
    pub(super) fn variable_declaration(
        &mut self,
        is_global: bool,
        is_param: bool,
    ) -> Option<SymbolId> {
        let _ = self.expect_scan(TokenKind::Variable);
        let id = self.declare_identifier();
        if self.env.arena()[id].is_invalid() {
            return None;
        }
        self.insert_declaration(id, is_global);
        let _ = self.expect_scan(TokenKind::Colon);
        let mark = self.type_mark();
        {
            let arena = self.env.arena_mut();
            arena[id].set_type_mark(mark);
            arena[id].set_procedure(false);
        }
        if self.check(TokenKind::LeftBracket) {
            self.scan();
            self.bound(id);
            let _ = self.expect_scan(TokenKind::RightBracket);
        }
        if !is_param {
            self.gen
                .declare_variable(self.env.arena_mut(), id, is_global, &mut self.diags);
        }
        tracing::debug!(name = %self.env.arena()[id].name(), "declared variable");
        Some(id)
    }

    //  type_mark ::= 'integer' | 'float' | 'string' | 'bool'
    pub(super) fn type_mark(&mut self) -> TypeMark {
        let mark = match self.tok.kind() {
            TokenKind::Integer => TypeMark::Int,
            TokenKind::Float => TypeMark::Flt,
            TokenKind::String => TypeMark::Str,
            TokenKind::Bool => TypeMark::Bool,
            _ => {
                if !self.panicking {
                    self.diags
                        .error(format!("expected a type mark, got {}", self.tok));
                    self.panicking = true;
                }
                return TypeMark::None;
            }
        };
        self.scan();
        mark
    }

    //  bound ::= number        (must be >= 1)
    //
    // A bad bound is replaced with 1 after the diagnostic so parsing and
    // emission continue with a well-formed array.
    fn bound(&mut self, id: SymbolId) {
        let bound_tok = self.tok.clone();
        if !self.expect_scan(TokenKind::Number) {
            return;
        }
        #[allow(clippy::cast_possible_truncation)]
        let n = match bound_tok.value() {
            TokenValue::Int(v) => i64::from(*v),
            TokenValue::Float(v) => *v as i64,
            _ => 0,
        };
        let n = if n < 1 {
            self.diags
                .error(format!("array bound must be at least 1, got {n}; using 1"));
            1
        } else {
            n
        };
        self.env.arena_mut()[id].set_num_elements(n);
    }
}
