// Copyright 2026 James Casey
// SPDX-License-Identifier: Apache-2.0

//! Value emission: loads, stores, conversions, operators, calls, and
//! string literals.
//!
//! Array values travel as first-class aggregates. A bare array name loads
//! the whole `[n x T]`; element-wise operations unroll over
//! `extractvalue`/`insertvalue` (array bounds are compile-time literals,
//! so the unrolled length is always known); a scalar broadcasts into an
//! array by replication. This keeps every emitted instruction well-typed
//! without materializing temporary allocas.

use crate::diagnostics::Diagnostics;
use crate::semantic_analysis::{SymbolArena, SymbolId};
use crate::source_analysis::{Token, TypeMark};

use super::{array_type, llvm_type, CodeGen, PendingCall, BAD_REG};

impl CodeGen {
    // ========================================================================
    // Loads and stores
    // ========================================================================

    /// Loads a whole variable: the scalar for scalars, the aggregate for
    /// arrays. Returns the result register.
    pub fn load_var(
        &mut self,
        arena: &SymbolArena,
        id: SymbolId,
        diags: &mut Diagnostics,
    ) -> String {
        let handle = arena[id].handle().clone();
        if handle.is_empty() {
            diags.error(format!("`{}` has no storage to load from", arena[id].name()));
            return BAD_REG.to_string();
        }
        let ty = array_type(arena[id].type_mark(), arena[id].num_elements());
        let reg = self.next_reg(diags);
        self.emit_line(&format!("{reg} = load {ty}, {ty}* {handle}"), diags);
        reg
    }

    /// Loads one element of an array variable through a `getelementptr`.
    pub fn load_element(
        &mut self,
        arena: &SymbolArena,
        id: SymbolId,
        index: &str,
        diags: &mut Diagnostics,
    ) -> String {
        let ptr = self.element_pointer(arena, id, index, diags);
        let elem = llvm_type(arena[id].type_mark());
        let reg = self.next_reg(diags);
        self.emit_line(&format!("{reg} = load {elem}, {elem}* {ptr}"), diags);
        reg
    }

    /// Stores a value (already converted to the variable's type and shape)
    /// into a variable.
    pub fn store_var(
        &mut self,
        arena: &SymbolArena,
        id: SymbolId,
        value: &str,
        diags: &mut Diagnostics,
    ) {
        let handle = arena[id].handle().clone();
        if handle.is_empty() {
            diags.error(format!("`{}` has no storage to store into", arena[id].name()));
            return;
        }
        let ty = array_type(arena[id].type_mark(), arena[id].num_elements());
        self.emit_line(&format!("store {ty} {value}, {ty}* {handle}"), diags);
    }

    /// Stores a scalar value into one element of an array variable.
    pub fn store_element(
        &mut self,
        arena: &SymbolArena,
        id: SymbolId,
        index: &str,
        value: &str,
        diags: &mut Diagnostics,
    ) {
        let ptr = self.element_pointer(arena, id, index, diags);
        let elem = llvm_type(arena[id].type_mark());
        self.emit_line(&format!("store {elem} {value}, {elem}* {ptr}"), diags);
    }

    fn element_pointer(
        &mut self,
        arena: &SymbolArena,
        id: SymbolId,
        index: &str,
        diags: &mut Diagnostics,
    ) -> String {
        let handle = arena[id].handle().clone();
        if handle.is_empty() {
            diags.error(format!("`{}` has no storage to index", arena[id].name()));
            return BAD_REG.to_string();
        }
        let ty = array_type(arena[id].type_mark(), arena[id].num_elements());
        let reg = self.next_reg(diags);
        self.emit_line(
            &format!("{reg} = getelementptr inbounds {ty}, {ty}* {handle}, i32 0, i32 {index}"),
            diags,
        );
        reg
    }

    // ========================================================================
    // Conversions and shaping
    // ========================================================================

    /// Converts a value between type marks. Supported pairs are
    /// `int`/`float` and `int`/`bool`; anything else is a diagnostic and
    /// the value passes through unchanged. Arrays convert element-wise.
    pub fn convert(
        &mut self,
        value: &str,
        from: TypeMark,
        to: TypeMark,
        shape: u32,
        diags: &mut Diagnostics,
    ) -> String {
        if from == to {
            return value.to_string();
        }
        if shape == 0 {
            return self.convert_scalar(value, from, to, diags);
        }
        self.emit_elementwise(shape, from, to, value, None, diags, |gen, a, _, diags| {
            gen.convert_scalar(a, from, to, diags)
        })
    }

    fn convert_scalar(
        &mut self,
        value: &str,
        from: TypeMark,
        to: TypeMark,
        diags: &mut Diagnostics,
    ) -> String {
        let line = match (from, to) {
            (TypeMark::Int, TypeMark::Flt) => format!("sitofp i32 {value} to float"),
            (TypeMark::Flt, TypeMark::Int) => format!("fptosi float {value} to i32"),
            (TypeMark::Bool, TypeMark::Int) => format!("zext i1 {value} to i32"),
            (TypeMark::Int, TypeMark::Bool) => format!("icmp ne i32 {value}, 0"),
            _ => {
                diags.error(format!(
                    "unsupported conversion from `{}` to `{}`",
                    from.name(),
                    to.name()
                ));
                return value.to_string();
            }
        };
        let reg = self.next_reg(diags);
        self.emit_line(&format!("{reg} = {line}"), diags);
        reg
    }

    /// Replicates a scalar into an `[n x T]` aggregate.
    pub fn broadcast(
        &mut self,
        value: &str,
        mark: TypeMark,
        n: u32,
        diags: &mut Diagnostics,
    ) -> String {
        let elem = llvm_type(mark);
        let ty = array_type(mark, n);
        let mut acc = "undef".to_string();
        for i in 0..n {
            let reg = self.next_reg(diags);
            self.emit_line(
                &format!("{reg} = insertvalue {ty} {acc}, {elem} {value}, {i}"),
                diags,
            );
            acc = reg;
        }
        acc
    }

    // ========================================================================
    // Operators
    // ========================================================================

    /// Emits a binary operation. Both operands have already been converted
    /// to `mark` and broadcast to `shape` by the caller; the opcode is
    /// keyed on the operator token's lexeme and the operand mark.
    pub fn binary_op(
        &mut self,
        op: &Token,
        lhs: &str,
        rhs: &str,
        mark: TypeMark,
        shape: u32,
        diags: &mut Diagnostics,
    ) -> String {
        let Some(opcode) = opcode_for(op.lexeme(), mark) else {
            diags.error(format!("no opcode for operator {op} on `{}`", mark.name()));
            return BAD_REG.to_string();
        };
        if shape == 0 {
            return self.binary_scalar(opcode, lhs, rhs, mark, diags);
        }
        let result = result_elem_mark(opcode, mark);
        self.emit_elementwise(shape, mark, result, lhs, Some(rhs), diags, |gen, a, b, diags| {
            gen.binary_scalar(opcode, a, b.unwrap_or(BAD_REG), mark, diags)
        })
    }

    fn binary_scalar(
        &mut self,
        opcode: &str,
        lhs: &str,
        rhs: &str,
        mark: TypeMark,
        diags: &mut Diagnostics,
    ) -> String {
        let ty = llvm_type(mark);
        let reg = self.next_reg(diags);
        self.emit_line(&format!("{reg} = {opcode} {ty} {lhs}, {rhs}"), diags);
        reg
    }

    /// Emits arithmetic negation.
    pub fn negate(
        &mut self,
        value: &str,
        mark: TypeMark,
        shape: u32,
        diags: &mut Diagnostics,
    ) -> String {
        if shape == 0 {
            return self.negate_scalar(value, mark, diags);
        }
        self.emit_elementwise(shape, mark, mark, value, None, diags, |gen, a, _, diags| {
            gen.negate_scalar(a, mark, diags)
        })
    }

    fn negate_scalar(&mut self, value: &str, mark: TypeMark, diags: &mut Diagnostics) -> String {
        let reg = self.next_reg(diags);
        let line = if mark == TypeMark::Flt {
            format!("{reg} = fneg float {value}")
        } else {
            format!("{reg} = sub i32 0, {value}")
        };
        self.emit_line(&line, diags);
        reg
    }

    /// Emits bitwise/logical `not`: all-ones xor for `int`, `true` xor for
    /// `bool`.
    pub fn unary_not(
        &mut self,
        value: &str,
        mark: TypeMark,
        shape: u32,
        diags: &mut Diagnostics,
    ) -> String {
        if shape == 0 {
            return self.not_scalar(value, mark, diags);
        }
        self.emit_elementwise(shape, mark, mark, value, None, diags, |gen, a, _, diags| {
            gen.not_scalar(a, mark, diags)
        })
    }

    fn not_scalar(&mut self, value: &str, mark: TypeMark, diags: &mut Diagnostics) -> String {
        let reg = self.next_reg(diags);
        let line = if mark == TypeMark::Bool {
            format!("{reg} = xor i1 {value}, true")
        } else {
            format!("{reg} = xor i32 {value}, -1")
        };
        self.emit_line(&line, diags);
        reg
    }

    /// Unrolls an element-wise operation over aggregate operands.
    fn emit_elementwise(
        &mut self,
        n: u32,
        operand_mark: TypeMark,
        result_mark: TypeMark,
        lhs: &str,
        rhs: Option<&str>,
        diags: &mut Diagnostics,
        mut scalar_op: impl FnMut(&mut Self, &str, Option<&str>, &mut Diagnostics) -> String,
    ) -> String {
        let src_ty = array_type(operand_mark, n);
        let dst_ty = array_type(result_mark, n);
        let dst_elem = llvm_type(result_mark);
        let mut acc = "undef".to_string();
        for i in 0..n {
            let a = self.next_reg(diags);
            self.emit_line(&format!("{a} = extractvalue {src_ty} {lhs}, {i}"), diags);
            let b = rhs.map(|rhs| {
                let b = self.next_reg(diags);
                self.emit_line(&format!("{b} = extractvalue {src_ty} {rhs}, {i}"), diags);
                b
            });
            let r = scalar_op(self, &a, b.as_deref(), diags);
            let out = self.next_reg(diags);
            self.emit_line(
                &format!("{out} = insertvalue {dst_ty} {acc}, {dst_elem} {r}, {i}"),
                diags,
            );
            acc = out;
        }
        acc
    }

    // ========================================================================
    // Staged procedure calls
    // ========================================================================

    /// Starts staging a call to a resolved procedure. Calls nest; each
    /// `call_begin` must be matched by one `call_end`.
    pub fn call_begin(&mut self, arena: &SymbolArena, id: SymbolId, diags: &mut Diagnostics) {
        let mut handle = arena[id].handle().clone();
        if handle.is_empty() {
            diags.error(format!("`{}` has no emitted function", arena[id].name()));
            handle = BAD_REG.into();
        }
        let ret_type = llvm_type(arena[id].type_mark()).to_string();
        let Some(frame) = self.frames.last_mut() else {
            diags.error("procedure call staged with no open function");
            return;
        };
        frame.calls.push(PendingCall {
            handle,
            ret_type,
            args: Vec::new(),
        });
    }

    /// Stages one argument, already converted to the parameter's mark and
    /// shape.
    pub fn call_arg(&mut self, mark: TypeMark, shape: u32, value: &str, diags: &mut Diagnostics) {
        let ty = array_type(mark, shape);
        let Some(call) = self.frames.last_mut().and_then(|f| f.calls.last_mut()) else {
            diags.error("argument staged with no open call");
            return;
        };
        call.args.push(format!("{ty} {value}"));
    }

    /// Finishes the staged call and returns its result register.
    pub fn call_end(&mut self, diags: &mut Diagnostics) -> String {
        let Some(call) = self.frames.last_mut().and_then(|f| f.calls.pop()) else {
            diags.error("call finished with no open call");
            return BAD_REG.to_string();
        };
        let reg = self.next_reg(diags);
        self.emit_line(
            &format!(
                "{reg} = call {} {}({})",
                call.ret_type,
                call.handle,
                call.args.join(", ")
            ),
            diags,
        );
        reg
    }

    // ========================================================================
    // String literals
    // ========================================================================

    /// Materializes a pointer to an interned string literal. The first
    /// occurrence of a payload emits the constant; identical payloads
    /// reuse the handle.
    pub fn string_pointer(&mut self, text: &str, diags: &mut Diagnostics) -> String {
        let handle = self.intern_string(text);
        let len = text.len() + 1;
        let reg = self.next_reg(diags);
        self.emit_line(
            &format!(
                "{reg} = getelementptr inbounds [{len} x i8], [{len} x i8]* {handle}, i32 0, i32 0"
            ),
            diags,
        );
        reg
    }

    fn intern_string(&mut self, text: &str) -> String {
        if let Some(handle) = self.string_handles.get(text) {
            return handle.to_string();
        }
        let handle = format!("@.str.{}", self.string_count);
        self.string_count += 1;

        let len = text.len() + 1;
        let mut encoded = String::with_capacity(3 * len);
        for byte in text.bytes() {
            encoded.push_str(&format!("\\{byte:02X}"));
        }
        encoded.push_str("\\00");
        self.string_literals
            .push_str(&format!("{handle} = constant [{len} x i8] c\"{encoded}\"\n"));
        self.string_handles.insert(text.into(), handle.clone().into());
        handle
    }
}

/// Selects the opcode for an operator lexeme and operand mark.
fn opcode_for(lexeme: &str, mark: TypeMark) -> Option<&'static str> {
    let flt = mark == TypeMark::Flt;
    let op = match lexeme {
        "+" => {
            if flt {
                "fadd"
            } else {
                "add"
            }
        }
        "-" => {
            if flt {
                "fsub"
            } else {
                "sub"
            }
        }
        "*" => {
            if flt {
                "fmul"
            } else {
                "mul"
            }
        }
        "/" => {
            if flt {
                "fdiv"
            } else {
                "sdiv"
            }
        }
        "&" => "and",
        "|" => "or",
        "==" => {
            if flt {
                "fcmp oeq"
            } else {
                "icmp eq"
            }
        }
        "!=" => {
            if flt {
                "fcmp one"
            } else {
                "icmp ne"
            }
        }
        "<" => {
            if flt {
                "fcmp olt"
            } else {
                "icmp slt"
            }
        }
        ">" => {
            if flt {
                "fcmp ogt"
            } else {
                "icmp sgt"
            }
        }
        "<=" => {
            if flt {
                "fcmp ole"
            } else {
                "icmp sle"
            }
        }
        ">=" => {
            if flt {
                "fcmp oge"
            } else {
                "icmp sge"
            }
        }
        _ => return None,
    };
    Some(op)
}

/// Comparisons produce `bool` elements; everything else keeps the operand
/// element mark.
fn result_elem_mark(opcode: &str, mark: TypeMark) -> TypeMark {
    if opcode.starts_with("icmp") || opcode.starts_with("fcmp") {
        TypeMark::Bool
    } else {
        mark
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::semantic_analysis::Symbol;
    use crate::source_analysis::TokenKind;

    fn in_function() -> (CodeGen, SymbolArena, Diagnostics, SymbolId) {
        let mut gen = CodeGen::new();
        let mut arena = SymbolArena::new();
        let mut diags = Diagnostics::new();
        let main = arena.alloc(Symbol::identifier("p"));
        arena[main].set_type_mark(TypeMark::Int);
        arena[main].set_procedure(true);
        gen.begin_program(&mut arena, main, &mut diags);
        (gen, arena, diags, main)
    }

    fn finished(mut gen: CodeGen, arena: &SymbolArena, diags: &mut Diagnostics) -> String {
        gen.close_function(arena, diags);
        gen.emit_code()
    }

    #[test]
    fn scalar_load_and_store() {
        let (mut gen, mut arena, mut diags, _) = in_function();
        let x = arena.alloc(Symbol::identifier("x"));
        arena[x].set_type_mark(TypeMark::Int);
        gen.declare_variable(&mut arena, x, true, &mut diags);

        let loaded = gen.load_var(&arena, x, &mut diags);
        gen.store_var(&arena, x, &loaded, &mut diags);

        let out = finished(gen, &arena, &mut diags);
        assert!(out.contains("%1 = load i32, i32* @x"));
        assert!(out.contains("store i32 %1, i32* @x"));
        assert!(!diags.has_errored());
    }

    #[test]
    fn element_access_uses_getelementptr() {
        let (mut gen, mut arena, mut diags, _) = in_function();
        let a = arena.alloc(Symbol::identifier("a"));
        arena[a].set_type_mark(TypeMark::Int);
        arena[a].set_num_elements(4);
        gen.declare_variable(&mut arena, a, true, &mut diags);

        gen.store_element(&arena, a, "0", "1", &mut diags);
        let out = finished(gen, &arena, &mut diags);
        assert!(out
            .contains("%1 = getelementptr inbounds [4 x i32], [4 x i32]* @a, i32 0, i32 0"));
        assert!(out.contains("store i32 1, i32* %1"));
    }

    #[test]
    fn conversions() {
        let (mut gen, arena, mut diags, _) = in_function();
        let a = gen.convert("true", TypeMark::Bool, TypeMark::Int, 0, &mut diags);
        let b = gen.convert("3", TypeMark::Int, TypeMark::Flt, 0, &mut diags);
        let c = gen.convert(&b, TypeMark::Flt, TypeMark::Int, 0, &mut diags);
        let d = gen.convert("5", TypeMark::Int, TypeMark::Bool, 0, &mut diags);
        assert_eq!((a.as_str(), b.as_str()), ("%1", "%2"));
        assert_eq!((c.as_str(), d.as_str()), ("%3", "%4"));

        let out = finished(gen, &arena, &mut diags);
        assert!(out.contains("%1 = zext i1 true to i32"));
        assert!(out.contains("%2 = sitofp i32 3 to float"));
        assert!(out.contains("%3 = fptosi float %2 to i32"));
        assert!(out.contains("%4 = icmp ne i32 5, 0"));
        assert!(!diags.has_errored());
    }

    #[test]
    fn identity_conversion_is_free() {
        let (mut gen, _, mut diags, _) = in_function();
        let v = gen.convert("%9", TypeMark::Int, TypeMark::Int, 0, &mut diags);
        assert_eq!(v, "%9");
    }

    #[test]
    fn unsupported_conversion_reports_and_passes_through() {
        let (mut gen, _, mut diags, _) = in_function();
        let v = gen.convert("%1", TypeMark::Flt, TypeMark::Bool, 0, &mut diags);
        assert_eq!(v, "%1");
        assert!(diags.has_errored());
    }

    #[test]
    fn binary_opcodes() {
        let (mut gen, arena, mut diags, _) = in_function();
        let plus = Token::new(TokenKind::ArithOp, "+");
        let div = Token::new(TokenKind::TermOp, "/");
        let less = Token::new(TokenKind::RelationOp, "<");

        gen.binary_op(&plus, "3", "4", TypeMark::Int, 0, &mut diags);
        gen.binary_op(&plus, "%1", "%1", TypeMark::Flt, 0, &mut diags);
        gen.binary_op(&div, "8", "2", TypeMark::Int, 0, &mut diags);
        gen.binary_op(&less, "%1", "%2", TypeMark::Flt, 0, &mut diags);

        let out = finished(gen, &arena, &mut diags);
        assert!(out.contains("%1 = add i32 3, 4"));
        assert!(out.contains("%2 = fadd float %1, %1"));
        assert!(out.contains("%3 = sdiv i32 8, 2"));
        assert!(out.contains("%4 = fcmp olt float %1, %2"));
    }

    #[test]
    fn unknown_operator_yields_sentinel() {
        let (mut gen, _, mut diags, _) = in_function();
        let bad = Token::new(TokenKind::RelationOp, "=");
        let reg = gen.binary_op(&bad, "1", "2", TypeMark::Int, 0, &mut diags);
        assert_eq!(reg, BAD_REG);
        assert!(diags.has_errored());
    }

    #[test]
    fn negate_and_not() {
        let (mut gen, arena, mut diags, _) = in_function();
        gen.negate("7", TypeMark::Int, 0, &mut diags);
        gen.negate("%1", TypeMark::Flt, 0, &mut diags);
        gen.unary_not("%1", TypeMark::Int, 0, &mut diags);
        gen.unary_not("true", TypeMark::Bool, 0, &mut diags);

        let out = finished(gen, &arena, &mut diags);
        assert!(out.contains("%1 = sub i32 0, 7"));
        assert!(out.contains("%2 = fneg float %1"));
        assert!(out.contains("%3 = xor i32 %1, -1"));
        assert!(out.contains("%4 = xor i1 true, true"));
    }

    #[test]
    fn elementwise_binary_unrolls() {
        let (mut gen, arena, mut diags, _) = in_function();
        let plus = Token::new(TokenKind::ArithOp, "+");
        let result = gen.binary_op(&plus, "%1", "%2", TypeMark::Int, 2, &mut diags);

        let out = finished(gen, &arena, &mut diags);
        assert!(out.contains("extractvalue [2 x i32] %1, 0"));
        assert!(out.contains("extractvalue [2 x i32] %2, 0"));
        assert!(out.contains("extractvalue [2 x i32] %1, 1"));
        assert!(out.contains("insertvalue [2 x i32] undef"));
        // The last insert produces the result aggregate.
        assert!(result.starts_with('%'));
    }

    #[test]
    fn broadcast_replicates_scalar() {
        let (mut gen, arena, mut diags, _) = in_function();
        let result = gen.broadcast("7", TypeMark::Int, 3, &mut diags);
        let out = finished(gen, &arena, &mut diags);
        assert!(out.contains("%1 = insertvalue [3 x i32] undef, i32 7, 0"));
        assert!(out.contains("%2 = insertvalue [3 x i32] %1, i32 7, 1"));
        assert!(out.contains("%3 = insertvalue [3 x i32] %2, i32 7, 2"));
        assert_eq!(result, "%3");
    }

    #[test]
    fn staged_call_with_args() {
        let (mut gen, mut arena, mut diags, _) = in_function();
        let f = arena.alloc(Symbol::identifier("putinteger"));
        arena[f].set_type_mark(TypeMark::Bool);
        arena[f].set_procedure(true);
        arena[f].set_handle("@putinteger");

        gen.call_begin(&arena, f, &mut diags);
        gen.call_arg(TypeMark::Int, 0, "42", &mut diags);
        let reg = gen.call_end(&mut diags);
        assert_eq!(reg, "%1");

        let out = finished(gen, &arena, &mut diags);
        assert!(out.contains("%1 = call i1 @putinteger(i32 42)"));
    }

    #[test]
    fn nested_calls_stage_independently() {
        let (mut gen, mut arena, mut diags, _) = in_function();
        let f = arena.alloc(Symbol::identifier("f"));
        arena[f].set_type_mark(TypeMark::Int);
        arena[f].set_procedure(true);
        arena[f].set_handle("@f");

        gen.call_begin(&arena, f, &mut diags);
        // Argument is itself a call: f(f()).
        gen.call_begin(&arena, f, &mut diags);
        let inner = gen.call_end(&mut diags);
        gen.call_arg(TypeMark::Int, 0, &inner, &mut diags);
        let outer = gen.call_end(&mut diags);

        let out = finished(gen, &arena, &mut diags);
        assert!(out.contains("%1 = call i32 @f()"));
        assert!(out.contains("%2 = call i32 @f(i32 %1)"));
        assert_eq!(outer, "%2");
    }

    #[test]
    fn string_literals_are_interned() {
        let (mut gen, arena, mut diags, _) = in_function();
        let a = gen.string_pointer("hi", &mut diags);
        let b = gen.string_pointer("hi", &mut diags);
        let c = gen.string_pointer("ho", &mut diags);
        assert_ne!(a, b); // Distinct pointers...
        assert_ne!(b, c);

        let out = finished(gen, &arena, &mut diags);
        // ...but one constant for the duplicate payload, two in total.
        assert!(out.contains("@.str.0 = constant [3 x i8] c\"\\68\\69\\00\""));
        assert!(out.contains("@.str.1 = constant [3 x i8] c\"\\68\\6F\\00\""));
        assert!(!out.contains("@.str.2"));
        assert!(out
            .contains("getelementptr inbounds [3 x i8], [3 x i8]* @.str.0, i32 0, i32 0"));
    }

    #[test]
    fn ops_outside_a_function_yield_sentinels() {
        let mut gen = CodeGen::new();
        let mut diags = Diagnostics::new();
        let reg = gen.next_reg(&mut diags);
        assert_eq!(reg, BAD_REG);
        assert!(diags.has_errored());

        let reg = gen.call_end(&mut diags);
        assert_eq!(reg, BAD_REG);
    }
}
