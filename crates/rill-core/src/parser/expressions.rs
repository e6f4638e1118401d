// Copyright 2026 James Casey
// SPDX-License-Identifier: Apache-2.0

//! Expression parsing.
//!
//! Every non-terminal is factored into a head and a `_prime` tail so the
//! grammar stays LL(1) without left recursion; the tails loop on their
//! operator class, which keeps every binary operator left-associative.
//! Precedence, loosest to tightest: `&`/`|`, `+`/`-`, relations, `*`/`/`.
//!
//! Each production returns a [`Value`]: the inferred type mark, the shape
//! (0 for scalars, the element count for arrays), and the emitted operand.
//! Operands are converted to a common compute mark, and scalars broadcast
//! against array operands, before the opcode is emitted.

use crate::codegen::float_constant;
use crate::semantic_analysis::{type_checker, SymbolId};
use crate::source_analysis::{Token, TokenKind, TokenValue, TypeMark};

use super::{Parser, Value};

impl Parser<'_> {
    //  expression ::= ['not'] arith_op expression_prime
    pub(super) fn expression(&mut self) -> Option<Value> {
        let not_tok = self.tok.clone();
        let has_not = self.check(TokenKind::Not);
        if has_not {
            self.scan();
        }
        let mut lhs = self.arith_op()?;
        if has_not {
            let ok =
                type_checker::check_operation(&not_tok, lhs.mark, lhs.mark, &mut self.diags);
            if ok {
                lhs.operand =
                    self.gen
                        .unary_not(&lhs.operand, lhs.mark, lhs.shape, &mut self.diags);
            }
        }
        self.expression_prime(lhs)
    }

    //  expression_prime ::= ('&' | '|') arith_op expression_prime | epsilon
    fn expression_prime(&mut self, mut lhs: Value) -> Option<Value> {
        while self.check(TokenKind::ExprOp) {
            let op = self.tok.clone();
            self.scan();
            let rhs = self.arith_op()?;
            lhs = self.combine_binary(&op, lhs, rhs);
        }
        Some(lhs)
    }

    //  arith_op ::= relation arith_op_prime
    fn arith_op(&mut self) -> Option<Value> {
        let lhs = self.relation()?;
        self.arith_op_prime(lhs)
    }

    //  arith_op_prime ::= ('+' | '-') relation arith_op_prime | epsilon
    fn arith_op_prime(&mut self, mut lhs: Value) -> Option<Value> {
        while self.check(TokenKind::ArithOp) {
            let op = self.tok.clone();
            self.scan();
            let rhs = self.relation()?;
            lhs = self.combine_binary(&op, lhs, rhs);
        }
        Some(lhs)
    }

    //  relation ::= term relation_prime
    fn relation(&mut self) -> Option<Value> {
        let lhs = self.term()?;
        self.relation_prime(lhs)
    }

    //  relation_prime ::= ('<'|'>'|'<='|'>='|'=='|'!=') term relation_prime
    //                   | epsilon
    fn relation_prime(&mut self, mut lhs: Value) -> Option<Value> {
        while self.check(TokenKind::RelationOp) {
            let op = self.tok.clone();
            self.scan();
            let rhs = self.term()?;
            lhs = self.combine_binary(&op, lhs, rhs);
        }
        Some(lhs)
    }

    //  term ::= factor term_prime
    fn term(&mut self) -> Option<Value> {
        let lhs = self.factor()?;
        self.term_prime(lhs)
    }

    //  term_prime ::= ('*' | '/') factor term_prime | epsilon
    fn term_prime(&mut self, mut lhs: Value) -> Option<Value> {
        while self.check(TokenKind::TermOp) {
            let op = self.tok.clone();
            self.scan();
            let rhs = self.factor()?;
            lhs = self.combine_binary(&op, lhs, rhs);
        }
        Some(lhs)
    }

    //  factor ::= '(' expression ')' | procedure_call
    //           | ['-'] name | ['-'] number
    //           | string | 'true' | 'false'
    fn factor(&mut self) -> Option<Value> {
        // The minus sign may only prefix a name or a number.
        if self.check(TokenKind::ArithOp) && self.tok.lexeme() == "-" {
            self.scan();
            return self.negated_factor();
        }

        match self.tok.kind() {
            TokenKind::LeftParen => {
                self.scan();
                let value = self.expression();
                let _ = self.expect_scan(TokenKind::RightParen);
                value
            }
            TokenKind::Identifier => {
                let name = self.tok.lexeme().clone();
                let id = self.env.lookup(&name, true, &mut self.diags)?;
                if self.env.arena()[id].is_procedure() {
                    self.procedure_call(id)
                } else {
                    self.name(id)
                }
            }
            TokenKind::Number => Some(self.number_literal()),
            TokenKind::StringLiteral => {
                let text = match self.tok.value() {
                    TokenValue::Str(s) => s.clone(),
                    _ => Default::default(),
                };
                self.scan();
                let operand = self.gen.string_pointer(&text, &mut self.diags);
                Some(Value {
                    mark: TypeMark::Str,
                    shape: 0,
                    operand,
                })
            }
            TokenKind::True => {
                self.scan();
                Some(Value {
                    mark: TypeMark::Bool,
                    shape: 0,
                    operand: "true".to_string(),
                })
            }
            TokenKind::False => {
                self.scan();
                Some(Value {
                    mark: TypeMark::Bool,
                    shape: 0,
                    operand: "false".to_string(),
                })
            }
            _ => {
                if !self.panicking {
                    self.diags
                        .error(format!("unexpected token {} in expression", self.tok));
                    self.panicking = true;
                }
                None
            }
        }
    }

    /// The `-`-prefixed arm of `factor`. Number literals fold their sign;
    /// names negate at runtime.
    fn negated_factor(&mut self) -> Option<Value> {
        if self.check(TokenKind::Identifier) {
            let name = self.tok.lexeme().clone();
            let id = self.env.lookup(&name, true, &mut self.diags)?;
            if self.env.arena()[id].is_procedure() {
                self.diags
                    .error(format!("`{name}` is a procedure, expected a variable"));
                return None;
            }
            let value = self.name(id)?;
            if matches!(value.mark, TypeMark::Int | TypeMark::Flt) {
                let operand =
                    self.gen
                        .negate(&value.operand, value.mark, value.shape, &mut self.diags);
                Some(Value { operand, ..value })
            } else {
                self.diags
                    .error(format!("cannot negate a `{}` value", value.mark.name()));
                Some(value)
            }
        } else if self.check(TokenKind::Number) {
            let folded = match self.tok.value() {
                TokenValue::Int(v) => Value {
                    mark: TypeMark::Int,
                    shape: 0,
                    operand: (-i64::from(*v)).to_string(),
                },
                TokenValue::Float(v) => Value {
                    mark: TypeMark::Flt,
                    shape: 0,
                    operand: float_constant(-*v),
                },
                _ => Value {
                    mark: TypeMark::Int,
                    shape: 0,
                    operand: "0".to_string(),
                },
            };
            self.scan();
            Some(folded)
        } else {
            self.diags.error(format!(
                "minus sign must be followed by a name or a number, got {}",
                self.tok
            ));
            None
        }
    }

    //  name ::= identifier ['[' expression ']']
    //
    // Same shape as `destination`, plus the load: indexing yields the
    // scalar element, a bare name yields the whole value (the aggregate,
    // for arrays).
    fn name(&mut self, id: SymbolId) -> Option<Value> {
        let dest = self.resolved_destination(id)?;
        let value = match &dest.index {
            Some(index) => Value {
                mark: dest.mark,
                shape: 0,
                operand: self
                    .gen
                    .load_element(self.env.arena(), dest.id, index, &mut self.diags),
            },
            None => Value {
                mark: dest.mark,
                shape: self.env.arena()[dest.id].num_elements(),
                operand: self.gen.load_var(self.env.arena(), dest.id, &mut self.diags),
            },
        };
        Some(value)
    }

    //  procedure_call ::= identifier '(' [argument_list] ')'
    //  argument_list  ::= expression (',' expression)*
    //
    // Each argument checks against the matching parameter: compatible type
    // and identical element count. Too few, too many, and mismatched
    // arguments are distinct diagnostics.
    fn procedure_call(&mut self, id: SymbolId) -> Option<Value> {
        self.scan();
        let proc_name = self.env.arena()[id].name().clone();
        if !self.expect_scan(TokenKind::LeftParen) {
            self.diags.warn("skipping procedure call");
            return None;
        }
        self.gen.call_begin(self.env.arena(), id, &mut self.diags);
        let params: Vec<SymbolId> = self.env.arena()[id].params().to_vec();

        let mut arg_count = 0usize;
        if !self.check(TokenKind::RightParen) {
            loop {
                let Some(arg) = self.expression() else {
                    // Flush the staged call so later calls stay paired.
                    let _ = self.gen.call_end(&mut self.diags);
                    return None;
                };
                if let Some(&param) = params.get(arg_count) {
                    let expected_mark = self.env.arena()[param].type_mark();
                    let expected_shape = self.env.arena()[param].num_elements();
                    if !type_checker::compatible(arg.mark, expected_mark) {
                        self.diags.error(format!(
                            "argument {} to `{proc_name}`: expected `{}`, got `{}`",
                            arg_count + 1,
                            expected_mark.name(),
                            arg.mark.name()
                        ));
                    } else if arg.shape != expected_shape {
                        self.diags.error(format!(
                            "argument {} to `{proc_name}`: expected {expected_shape} \
                             element(s), got {}",
                            arg_count + 1,
                            arg.shape
                        ));
                    } else {
                        let operand = self.shaped(&arg, expected_mark, expected_shape);
                        self.gen
                            .call_arg(expected_mark, expected_shape, &operand, &mut self.diags);
                    }
                }
                arg_count += 1;
                if self.check(TokenKind::Comma) {
                    self.scan();
                } else {
                    break;
                }
            }
        }
        if arg_count < params.len() {
            self.diags.error(format!(
                "too few arguments to `{proc_name}`: expected {}, got {arg_count}",
                params.len()
            ));
        } else if arg_count > params.len() {
            self.diags.error(format!(
                "too many arguments to `{proc_name}`: expected {}, got {arg_count}",
                params.len()
            ));
        }
        let _ = self.expect_scan(TokenKind::RightParen);

        let operand = self.gen.call_end(&mut self.diags);
        Some(Value {
            mark: self.env.arena()[id].type_mark(),
            shape: 0,
            operand,
        })
    }

    //  number ::= [0-9][0-9_]*[.[0-9_]*]
    //
    // The lexer already parsed the value; the narrower type is kept.
    fn number_literal(&mut self) -> Value {
        let value = match self.tok.value() {
            TokenValue::Int(v) => Value {
                mark: TypeMark::Int,
                shape: 0,
                operand: v.to_string(),
            },
            TokenValue::Float(v) => Value {
                mark: TypeMark::Flt,
                shape: 0,
                operand: float_constant(*v),
            },
            _ => Value {
                mark: TypeMark::Int,
                shape: 0,
                operand: "0".to_string(),
            },
        };
        self.scan();
        value
    }

    // ========================================================================
    // Operand shaping and combination
    // ========================================================================

    /// Checks a binary operation, shapes both operands onto the common
    /// compute mark and shape, and emits the opcode. When a check fails
    /// the left operand passes through under the would-be result type so
    /// the expression chain can continue.
    pub(super) fn combine_binary(&mut self, op: &Token, lhs: Value, rhs: Value) -> Value {
        let types_ok = type_checker::check_operation(op, lhs.mark, rhs.mark, &mut self.diags);
        let shapes_ok = type_checker::check_array_size(lhs.shape, rhs.shape, &mut self.diags);
        let shape = type_checker::merged_shape(lhs.shape, rhs.shape);
        let result = type_checker::binary_result(op, lhs.mark, rhs.mark);
        if !(types_ok && shapes_ok) {
            return Value {
                mark: result,
                shape,
                operand: lhs.operand,
            };
        }

        let compute = type_checker::compute_mark(op, lhs.mark, rhs.mark);
        let left = self.shaped(&lhs, compute, shape);
        let right = self.shaped(&rhs, compute, shape);
        let operand = self
            .gen
            .binary_op(op, &left, &right, compute, shape, &mut self.diags);
        Value {
            mark: result,
            shape,
            operand,
        }
    }

    /// Converts a value to a target mark and broadcasts a scalar up to a
    /// target shape.
    pub(super) fn shaped(&mut self, value: &Value, mark: TypeMark, shape: u32) -> String {
        let converted =
            self.gen
                .convert(&value.operand, value.mark, mark, value.shape, &mut self.diags);
        if value.shape == 0 && shape > 0 {
            self.gen.broadcast(&converted, mark, shape, &mut self.diags)
        } else {
            converted
        }
    }
}
