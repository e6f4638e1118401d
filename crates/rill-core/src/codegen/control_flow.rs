// Copyright 2026 James Casey
// SPDX-License-Identifier: Apache-2.0

//! Control-flow emission: conditionals, counted loops, and returns.
//!
//! Label discipline: `if` statements own `.then.N` / `.else.N` /
//! `.endif.N` triples and loops own `.for.N` / `.body.N` / `.endfor.N`
//! triples, with `N` drawn from per-function counters and tracked on the
//! frame's if/loop stacks so nesting unwinds in order. Every block is
//! closed with exactly one terminator before the next label is emitted;
//! the parser always drives the else path, so the two-target conditional
//! branch is well-formed even when the source has no `else`.

use crate::diagnostics::Diagnostics;
use crate::semantic_analysis::SymbolArena;
use crate::source_analysis::TypeMark;

use super::{llvm_type, CodeGen};

impl CodeGen {
    // ========================================================================
    // If / else
    // ========================================================================

    /// Opens an `if` statement: branches on the condition (already a
    /// scalar `i1`) to `.then.N` or `.else.N` and starts the then-block.
    pub fn if_stmt(&mut self, cond: &str, diags: &mut Diagnostics) {
        let Some(frame) = self.frames.last_mut() else {
            diags.error("`if` emitted with no open function");
            return;
        };
        let n = frame.if_count;
        frame.if_count += 1;
        frame.if_stack.push(n);
        self.emit_line(
            &format!("br i1 {cond}, label %.then.{n}, label %.else.{n}"),
            diags,
        );
        self.start_block(&format!(".then.{n}"));
    }

    /// Switches to the else-block: closes the then-block with a branch to
    /// `.endif.N` if it is still open, then opens `.else.N`.
    pub fn else_stmt(&mut self, diags: &mut Diagnostics) {
        let Some(&n) = self.frames.last().and_then(|f| f.if_stack.last()) else {
            diags.error("`else` emitted with no open `if`");
            return;
        };
        self.close_block(&format!("br label %.endif.{n}"));
        self.start_block(&format!(".else.{n}"));
    }

    /// Ends the `if`: closes whichever side is open and emits the
    /// `.endif.N` join label, popping the if-stack.
    pub fn end_if(&mut self, diags: &mut Diagnostics) {
        let Some(n) = self.frames.last_mut().and_then(|f| f.if_stack.pop()) else {
            diags.error("`end if` emitted with no open `if`");
            return;
        };
        self.close_block(&format!("br label %.endif.{n}"));
        self.start_block(&format!(".endif.{n}"));
    }

    // ========================================================================
    // Counted loops
    // ========================================================================

    /// Opens the loop header block `.for.N`. The loop's assignment and
    /// condition re-run here on every iteration.
    pub fn for_label(&mut self, diags: &mut Diagnostics) {
        let Some(frame) = self.frames.last_mut() else {
            diags.error("`for` emitted with no open function");
            return;
        };
        let n = frame.loop_count;
        frame.loop_count += 1;
        frame.loop_stack.push(n);
        self.close_block(&format!("br label %.for.{n}"));
        self.start_block(&format!(".for.{n}"));
    }

    /// Branches on the loop condition (already a scalar `i1`) into
    /// `.body.N` or out to `.endfor.N`, and starts the body block.
    pub fn for_stmt(&mut self, cond: &str, diags: &mut Diagnostics) {
        let Some(&n) = self.frames.last().and_then(|f| f.loop_stack.last()) else {
            diags.error("loop condition emitted with no open loop");
            return;
        };
        self.emit_line(
            &format!("br i1 {cond}, label %.body.{n}, label %.endfor.{n}"),
            diags,
        );
        self.start_block(&format!(".body.{n}"));
    }

    /// Ends the loop body: jumps back to the header and emits the
    /// `.endfor.N` exit label, popping the loop-stack.
    pub fn end_for(&mut self, diags: &mut Diagnostics) {
        let Some(n) = self.frames.last_mut().and_then(|f| f.loop_stack.pop()) else {
            diags.error("`end for` emitted with no open loop");
            return;
        };
        self.close_block(&format!("br label %.for.{n}"));
        self.start_block(&format!(".endfor.{n}"));
    }

    // ========================================================================
    // Returns
    // ========================================================================

    /// Emits `ret`, converting the value to the enclosing procedure's
    /// declared return type when the marks differ, and closes the block.
    pub fn return_stmt(
        &mut self,
        arena: &SymbolArena,
        value: &str,
        from: TypeMark,
        diags: &mut Diagnostics,
    ) {
        let Some(frame) = self.frames.last() else {
            diags.error("`return` emitted with no open function");
            return;
        };
        let to = arena[frame.sym].type_mark();
        let value = self.convert(value, from, to, 0, diags);
        self.emit_line(&format!("ret {} {value}", llvm_type(to)), diags);
        if let Some(frame) = self.frames.last_mut() {
            frame.block_open = false;
        }
    }

    // ========================================================================
    // Block helpers
    // ========================================================================

    /// Terminates the open block, if any.
    fn close_block(&mut self, terminator: &str) {
        if let Some(frame) = self.frames.last_mut() {
            if frame.block_open {
                frame.code.push_str(terminator);
                frame.code.push('\n');
                frame.block_open = false;
            }
        }
    }

    /// Emits a label, opening a fresh block.
    fn start_block(&mut self, label: &str) {
        if let Some(frame) = self.frames.last_mut() {
            frame.code.push_str(label);
            frame.code.push_str(":\n");
            frame.block_open = true;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::semantic_analysis::{Symbol, SymbolId};

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

    #[test]
    fn if_else_labels_and_branches() {
        let (mut gen, arena, mut diags, _) = in_function();
        gen.if_stmt("true", &mut diags);
        gen.else_stmt(&mut diags);
        gen.end_if(&mut diags);
        gen.close_function(&arena, &mut diags);

        let out = gen.emit_code();
        assert!(out.contains("br i1 true, label %.then.0, label %.else.0"));
        assert!(out.contains(".then.0:\nbr label %.endif.0\n.else.0:"));
        assert!(out.contains("br label %.endif.0\n.endif.0:"));
        assert!(!diags.has_errored());
    }

    #[test]
    fn nested_ifs_unwind_in_order() {
        let (mut gen, arena, mut diags, _) = in_function();
        gen.if_stmt("true", &mut diags);
        gen.if_stmt("false", &mut diags);
        gen.else_stmt(&mut diags);
        gen.end_if(&mut diags);
        gen.else_stmt(&mut diags);
        gen.end_if(&mut diags);
        gen.close_function(&arena, &mut diags);

        let out = gen.emit_code();
        assert!(out.contains("%.then.1"));
        assert!(out.contains(".endif.1:"));
        assert!(out.contains(".endif.0:"));
        // The inner if joins before the outer else is opened.
        assert!(out.find(".endif.1:").unwrap() < out.find(".else.0:").unwrap());
    }

    #[test]
    fn loop_shape() {
        let (mut gen, arena, mut diags, _) = in_function();
        gen.for_label(&mut diags);
        gen.for_stmt("%1", &mut diags);
        gen.end_for(&mut diags);
        gen.close_function(&arena, &mut diags);

        let out = gen.emit_code();
        assert!(out.contains("br label %.for.0\n.for.0:"));
        assert!(out.contains("br i1 %1, label %.body.0, label %.endfor.0"));
        assert!(out.contains(".body.0:\nbr label %.for.0\n.endfor.0:"));
    }

    #[test]
    fn return_converts_to_declared_type() {
        let (mut gen, arena, mut diags, _) = in_function();
        gen.return_stmt(&arena, "true", TypeMark::Bool, &mut diags);
        gen.close_function(&arena, &mut diags);

        let out = gen.emit_code();
        // bool widens to the declared i32 return type.
        assert!(out.contains("%1 = zext i1 true to i32"));
        assert!(out.contains("ret i32 %1"));
    }

    #[test]
    fn code_after_return_lands_in_a_fresh_block() {
        let (mut gen, mut arena, mut diags, _) = in_function();
        gen.return_stmt(&arena, "0", TypeMark::Int, &mut diags);
        let x = arena.alloc(Symbol::identifier("x"));
        arena[x].set_type_mark(TypeMark::Int);
        gen.declare_variable(&mut arena, x, true, &mut diags);
        gen.load_var(&arena, x, &mut diags);
        gen.close_function(&arena, &mut diags);

        let out = gen.emit_code();
        assert!(out.contains("ret i32 0\n.dead.0:"));
    }

    #[test]
    fn control_flow_outside_a_function_is_reported() {
        let mut gen = CodeGen::new();
        let mut diags = Diagnostics::new();
        gen.if_stmt("true", &mut diags);
        gen.end_for(&mut diags);
        assert!(diags.has_errored());
    }
}
