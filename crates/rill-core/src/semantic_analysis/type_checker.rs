// Copyright 2026 James Casey
// SPDX-License-Identifier: Apache-2.0

//! Type compatibility checking.
//!
//! Pure functions over [`TypeMark`]s; callers pass the operator token to
//! get the context-sensitive rules. Every violation produces a diagnostic
//! and a `false` return; the checker never aborts compilation, the parser
//! decides how to continue.
//!
//! The base compatibility matrix:
//!
//! | left  | compatible with        |
//! |-------|------------------------|
//! | `int` | `int`, `float`, `bool` |
//! | `float` | `float`, `int`       |
//! | `bool` | `bool`, `int`         |
//! | `string` | `string`            |
//! | `none` | nothing               |

use crate::diagnostics::Diagnostics;
use crate::source_analysis::{Token, TokenKind, TypeMark};

/// The base compatibility matrix. Symmetric except that `none` matches
/// nothing, not even itself.
#[must_use]
pub fn compatible(lhs: TypeMark, rhs: TypeMark) -> bool {
    match lhs {
        TypeMark::Int => matches!(rhs, TypeMark::Int | TypeMark::Flt | TypeMark::Bool),
        TypeMark::Flt => matches!(rhs, TypeMark::Flt | TypeMark::Int),
        TypeMark::Bool => matches!(rhs, TypeMark::Bool | TypeMark::Int),
        TypeMark::Str => rhs == TypeMark::Str,
        TypeMark::None => false,
    }
}

/// Checks an operation for operand compatibility, keyed on the operator
/// token.
///
/// `if` and `for` conditions pass the condition mark as `lhs` (the `rhs`
/// is ignored); `not` passes its single operand as both sides.
pub fn check_operation(
    op: &Token,
    lhs: TypeMark,
    rhs: TypeMark,
    diags: &mut Diagnostics,
) -> bool {
    let ok = match op.kind() {
        // `if` and `for` require the condition to resolve to bool.
        TokenKind::If | TokenKind::For => compatible(lhs, TypeMark::Bool),

        // `return` only requires the value to match the declared type.
        TokenKind::Return | TokenKind::Assign => compatible(lhs, rhs),

        // `&`, `|`, and `not`: both operands identical, both int or both
        // bool.
        TokenKind::ExprOp | TokenKind::Not => {
            lhs == rhs && matches!(lhs, TypeMark::Int | TypeMark::Bool)
        }

        // Arithmetic: compatible operands, neither bool.
        TokenKind::ArithOp | TokenKind::TermOp => {
            compatible(lhs, rhs) && lhs != TypeMark::Bool && rhs != TypeMark::Bool
        }

        // Relations: compatible operands; strings only for `==` and `!=`.
        TokenKind::RelationOp => {
            if lhs == TypeMark::Str || rhs == TypeMark::Str {
                lhs == TypeMark::Str
                    && rhs == TypeMark::Str
                    && matches!(op.lexeme().as_str(), "==" | "!=")
            } else {
                compatible(lhs, rhs)
            }
        }

        _ => false,
    };

    if !ok {
        diags.error(format!(
            "incompatible operands for {op}: `{}` and `{}`",
            lhs.name(),
            rhs.name()
        ));
    }
    ok
}

/// The result mark of a binary operation whose operands checked out.
///
/// Arithmetic promotes to `float` when either operand is `float`;
/// relations always produce `bool`; `&`/`|` keep their operand type.
#[must_use]
pub fn binary_result(op: &Token, lhs: TypeMark, rhs: TypeMark) -> TypeMark {
    match op.kind() {
        TokenKind::ArithOp | TokenKind::TermOp => {
            if lhs == TypeMark::Flt || rhs == TypeMark::Flt {
                TypeMark::Flt
            } else {
                TypeMark::Int
            }
        }
        TokenKind::RelationOp => TypeMark::Bool,
        _ => lhs,
    }
}

/// The mark both operands are converted to before the opcode is emitted.
///
/// Strings stay strings (the emitter compares interned pointers); anything
/// touching a float computes in float; bool pairs widen to int so the
/// integer opcodes apply.
#[must_use]
pub fn compute_mark(op: &Token, lhs: TypeMark, rhs: TypeMark) -> TypeMark {
    match op.kind() {
        TokenKind::ExprOp => lhs,
        _ if lhs == TypeMark::Str || rhs == TypeMark::Str => TypeMark::Str,
        _ if lhs == TypeMark::Flt || rhs == TypeMark::Flt => TypeMark::Flt,
        TokenKind::RelationOp if lhs == TypeMark::Bool && rhs == TypeMark::Bool => TypeMark::Int,
        _ => TypeMark::Int,
    }
}

/// An array index expression must have type `int`, exactly.
pub fn check_array_index(index: TypeMark, diags: &mut Diagnostics) -> bool {
    if index == TypeMark::Int {
        true
    } else {
        diags.error(format!(
            "array index must be `integer`, got `{}`",
            index.name()
        ));
        false
    }
}

/// Shape compatibility: two shapes match when both are scalar, both are
/// arrays of equal length, or one is scalar (a scalar broadcasts into an
/// array of any length). Mismatched nonzero lengths are an error.
pub fn check_array_size(lhs: u32, rhs: u32, diags: &mut Diagnostics) -> bool {
    if lhs == 0 || rhs == 0 || lhs == rhs {
        true
    } else {
        diags.error(format!(
            "mismatched array sizes: {lhs} and {rhs} elements"
        ));
        false
    }
}

/// The shape of a value combined from two compatible shapes.
#[must_use]
pub fn merged_shape(lhs: u32, rhs: u32) -> u32 {
    lhs.max(rhs)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn op(kind: TokenKind, lexeme: &str) -> Token {
        Token::new(kind, lexeme)
    }

    #[test]
    fn matrix() {
        use TypeMark::{Bool, Flt, Int, None, Str};
        assert!(compatible(Int, Int));
        assert!(compatible(Int, Flt));
        assert!(compatible(Int, Bool));
        assert!(compatible(Flt, Int));
        assert!(!compatible(Flt, Bool));
        assert!(compatible(Bool, Int));
        assert!(!compatible(Bool, Flt));
        assert!(compatible(Str, Str));
        assert!(!compatible(Str, Int));
        assert!(!compatible(None, None));
    }

    #[test]
    fn conditions_must_be_boolish() {
        let mut diags = Diagnostics::new();
        let if_tok = op(TokenKind::If, "if");
        assert!(check_operation(&if_tok, TypeMark::Bool, TypeMark::Bool, &mut diags));
        assert!(check_operation(&if_tok, TypeMark::Int, TypeMark::Bool, &mut diags));
        assert!(!check_operation(&if_tok, TypeMark::Flt, TypeMark::Bool, &mut diags));
        assert!(!check_operation(&if_tok, TypeMark::Str, TypeMark::Bool, &mut diags));
        assert!(diags.has_errored());
    }

    #[test]
    fn arithmetic_excludes_bool() {
        let mut diags = Diagnostics::new();
        let plus = op(TokenKind::ArithOp, "+");
        assert!(check_operation(&plus, TypeMark::Int, TypeMark::Flt, &mut diags));
        assert!(!check_operation(&plus, TypeMark::Bool, TypeMark::Int, &mut diags));
        assert!(!check_operation(&plus, TypeMark::Int, TypeMark::Bool, &mut diags));
    }

    #[test]
    fn logic_wants_identical_int_or_bool() {
        let mut diags = Diagnostics::new();
        let and = op(TokenKind::ExprOp, "&");
        assert!(check_operation(&and, TypeMark::Int, TypeMark::Int, &mut diags));
        assert!(check_operation(&and, TypeMark::Bool, TypeMark::Bool, &mut diags));
        assert!(!check_operation(&and, TypeMark::Int, TypeMark::Bool, &mut diags));
        assert!(!check_operation(&and, TypeMark::Flt, TypeMark::Flt, &mut diags));
    }

    #[test]
    fn string_relations_are_equality_only() {
        let mut diags = Diagnostics::new();
        let eq = op(TokenKind::RelationOp, "==");
        let lt = op(TokenKind::RelationOp, "<");
        assert!(check_operation(&eq, TypeMark::Str, TypeMark::Str, &mut diags));
        assert!(!check_operation(&lt, TypeMark::Str, TypeMark::Str, &mut diags));
        assert!(!check_operation(&eq, TypeMark::Str, TypeMark::Int, &mut diags));
    }

    #[test]
    fn arithmetic_promotes_to_float() {
        let plus = op(TokenKind::ArithOp, "+");
        assert_eq!(
            binary_result(&plus, TypeMark::Int, TypeMark::Flt),
            TypeMark::Flt
        );
        assert_eq!(
            binary_result(&plus, TypeMark::Flt, TypeMark::Int),
            TypeMark::Flt
        );
        assert_eq!(
            binary_result(&plus, TypeMark::Int, TypeMark::Int),
            TypeMark::Int
        );
    }

    #[test]
    fn relations_always_produce_bool() {
        let lt = op(TokenKind::RelationOp, "<");
        for mark in [TypeMark::Int, TypeMark::Flt, TypeMark::Bool] {
            assert_eq!(binary_result(&lt, mark, mark), TypeMark::Bool);
        }
    }

    #[test]
    fn array_index_must_be_int() {
        let mut diags = Diagnostics::new();
        assert!(check_array_index(TypeMark::Int, &mut diags));
        assert!(!check_array_index(TypeMark::Flt, &mut diags));
        assert!(!check_array_index(TypeMark::Bool, &mut diags));
    }

    #[test]
    fn scalar_broadcasts_into_arrays() {
        let mut diags = Diagnostics::new();
        assert!(check_array_size(0, 0, &mut diags));
        assert!(check_array_size(4, 4, &mut diags));
        assert!(check_array_size(0, 8, &mut diags));
        assert!(check_array_size(8, 0, &mut diags));
        assert!(!check_array_size(4, 8, &mut diags));
        assert_eq!(merged_shape(0, 8), 8);
        assert_eq!(merged_shape(3, 0), 3);
    }
}
