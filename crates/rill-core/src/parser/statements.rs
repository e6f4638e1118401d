// Copyright 2026 James Casey
// SPDX-License-Identifier: Apache-2.0

//! Statement parsing: assignment, if/else, counted loops, and returns.
//!
//! Control-flow statements keep the emitter's label stacks balanced on
//! every parse path: once `if_stmt`/`for_label` has been emitted, the
//! matching `end_if`/`end_for` is emitted even when the statement's tail
//! fails to parse. The else path is always driven so the conditional
//! branch always has both targets.

use crate::semantic_analysis::{type_checker, SymbolId};
use crate::source_analysis::{Token, TokenKind, TypeMark};

use super::{Parser, Value};

/// An assignment target: the resolved symbol and, for `a[i]`, the emitted
/// index operand.
pub(super) struct Dest {
    pub id: SymbolId,
    pub mark: TypeMark,
    pub index: Option<String>,
}

impl Parser<'_> {
    //  statements ::= (statement ';')*
    //
    // FIRST(statement) = { identifier, 'if', 'for', 'return' }.
    pub(super) fn statements(&mut self) {
        loop {
            self.panicking = false;
            if !(self.check(TokenKind::Identifier)
                || self.check(TokenKind::If)
                || self.check(TokenKind::For)
                || self.check(TokenKind::Return))
            {
                break;
            }
            let ok = self.statement();
            if !ok || !self.expect_scan(TokenKind::Semicolon) {
                self.resynchronize();
            }
        }
    }

    //  statement ::= assignment_statement | if_statement | loop_statement
    //              | return_statement
    fn statement(&mut self) -> bool {
        match self.tok.kind() {
            TokenKind::Identifier => self.assignment_statement(),
            TokenKind::If => self.if_statement(),
            TokenKind::For => self.loop_statement(),
            TokenKind::Return => self.return_statement(),
            _ => {
                self.diags
                    .error(format!("unexpected token {}; expected a statement", self.tok));
                self.panicking = true;
                false
            }
        }
    }

    //  assignment_statement ::= destination ':=' expression
    pub(super) fn assignment_statement(&mut self) -> bool {
        let Some(dest) = self.destination() else {
            return false;
        };
        let assign_tok = self.tok.clone();
        if !self.expect_scan(TokenKind::Assign) {
            return false;
        }
        let Some(value) = self.expression() else {
            return false;
        };

        // An indexed destination is a scalar slot regardless of the
        // variable's declared length.
        let dest_shape = if dest.index.is_some() {
            0
        } else {
            self.env.arena()[dest.id].num_elements()
        };
        let types_ok =
            type_checker::check_operation(&assign_tok, dest.mark, value.mark, &mut self.diags);
        let shapes_ok = type_checker::check_array_size(dest_shape, value.shape, &mut self.diags);
        if types_ok && shapes_ok {
            let operand = self.shaped(&value, dest.mark, dest_shape);
            match &dest.index {
                Some(index) => self.gen.store_element(
                    self.env.arena(),
                    dest.id,
                    index,
                    &operand,
                    &mut self.diags,
                ),
                None => {
                    self.gen
                        .store_var(self.env.arena(), dest.id, &operand, &mut self.diags);
                }
            }
        }
        true
    }

    //  destination ::= identifier ['[' expression ']']
    pub(super) fn destination(&mut self) -> Option<Dest> {
        if !self.expect(TokenKind::Identifier) {
            return None;
        }
        let name = self.tok.lexeme().clone();
        let Some(id) = self.env.lookup(&name, true, &mut self.diags) else {
            self.scan();
            return None;
        };
        if self.env.arena()[id].is_procedure() {
            self.diags
                .error(format!("`{name}` is a procedure, expected a variable"));
            self.scan();
            return None;
        }
        self.resolved_destination(id)
    }

    /// The index-handling tail of `destination`, shared with `name` in the
    /// expression grammar. The identifier token is still the lookahead.
    pub(super) fn resolved_destination(&mut self, id: SymbolId) -> Option<Dest> {
        self.scan();
        let mark = self.env.arena()[id].type_mark();
        let mut index = None;
        if self.check(TokenKind::LeftBracket) {
            self.scan();
            let idx = self.expression()?;
            if self.env.arena()[id].num_elements() == 0 {
                self.diags.error(format!(
                    "`{}` is not an array and cannot be indexed",
                    self.env.arena()[id].name()
                ));
            }
            type_checker::check_array_index(idx.mark, &mut self.diags);
            if idx.shape != 0 {
                self.diags.error("array index must be a scalar");
            }
            let _ = self.expect_scan(TokenKind::RightBracket);
            index = Some(idx.operand);
        }
        Some(Dest { id, mark, index })
    }

    //  if_statement ::= 'if' '(' expression ')' 'then' statements
    //                   ['else' statements] 'end' 'if'
    fn if_statement(&mut self) -> bool {
        let if_tok = self.tok.clone();
        if !self.expect_scan(TokenKind::If) || !self.expect_scan(TokenKind::LeftParen) {
            return false;
        }
        let Some(cond) = self.expression() else {
            return false;
        };
        if !self.expect_scan(TokenKind::RightParen) || !self.expect_scan(TokenKind::Then) {
            return false;
        }

        let cond_operand = self.condition_operand(&if_tok, cond);
        self.gen.if_stmt(&cond_operand, &mut self.diags);
        self.statements();
        if self.check(TokenKind::Else) {
            self.scan();
            self.gen.else_stmt(&mut self.diags);
            self.statements();
        } else {
            self.gen.else_stmt(&mut self.diags);
        }
        let _ = self.expect_scan(TokenKind::End);
        let _ = self.expect_scan(TokenKind::If);
        self.gen.end_if(&mut self.diags);
        true
    }

    //  loop_statement ::= 'for' '(' assignment_statement ';' expression ')'
    //                     statements 'end' 'for'
    //
    // The header's assignment and condition sit inside the loop: they
    // re-run on every iteration.
    fn loop_statement(&mut self) -> bool {
        let for_tok = self.tok.clone();
        if !self.expect_scan(TokenKind::For) || !self.expect_scan(TokenKind::LeftParen) {
            return false;
        }
        self.gen.for_label(&mut self.diags);

        if !self.assignment_statement() || !self.expect_scan(TokenKind::Semicolon) {
            self.abandon_loop();
            return false;
        }
        let Some(cond) = self.expression() else {
            self.abandon_loop();
            return false;
        };
        let _ = self.expect_scan(TokenKind::RightParen);

        let cond_operand = self.condition_operand(&for_tok, cond);
        self.gen.for_stmt(&cond_operand, &mut self.diags);
        self.statements();
        let _ = self.expect_scan(TokenKind::End);
        let _ = self.expect_scan(TokenKind::For);
        self.gen.end_for(&mut self.diags);
        true
    }

    /// Closes an abandoned loop so the label stack stays balanced after a
    /// parse failure inside the header.
    fn abandon_loop(&mut self) {
        self.gen.for_stmt("false", &mut self.diags);
        self.gen.end_for(&mut self.diags);
    }

    //  return_statement ::= 'return' expression
    //
    // The expected type comes from the top of the procedure stack. Arrays
    // may not be returned.
    fn return_statement(&mut self) -> bool {
        let ret_tok = self.tok.clone();
        if !self.expect_scan(TokenKind::Return) {
            return false;
        }
        let Some(value) = self.expression() else {
            return false;
        };
        let Some(&proc) = self.function_stack.last() else {
            self.diags.error("`return` outside of any procedure");
            return true;
        };
        let expected = self.env.arena()[proc].type_mark();
        type_checker::check_operation(&ret_tok, value.mark, expected, &mut self.diags);
        if value.shape != 0 {
            self.diags.error("arrays may not be returned from a procedure");
            return true;
        }
        self.gen
            .return_stmt(self.env.arena(), &value.operand, value.mark, &mut self.diags);
        true
    }

    /// Checks a condition against `bool`, requires it scalar, and converts
    /// it to `i1`. A condition that failed its checks branches on `true`
    /// so emission stays well-formed.
    fn condition_operand(&mut self, stmt_tok: &Token, cond: Value) -> String {
        let mut ok =
            type_checker::check_operation(stmt_tok, cond.mark, TypeMark::Bool, &mut self.diags);
        if cond.shape != 0 {
            self.diags.error("condition must be a scalar value");
            ok = false;
        }
        if ok {
            self.gen
                .convert(&cond.operand, cond.mark, TypeMark::Bool, 0, &mut self.diags)
        } else {
            "true".to_string()
        }
    }
}
