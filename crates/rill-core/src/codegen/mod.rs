// Copyright 2026 James Casey
// SPDX-License-Identifier: Apache-2.0

//! LLVM-style IR emission for Rill.
//!
//! The emitter streams text: the parser calls an operation, the operation
//! appends instructions to the current function frame and hands back the
//! operand string (`%3`, `7`, `@.str.0`) the caller threads into the next
//! operation. The emitter never parses and never type-checks; it trusts
//! the parser's decisions.
//!
//! # Module layout
//!
//! Output is assembled from five append-only buffers, concatenated in
//! order: header, global definitions, string literal constants, runtime
//! declarations, and the function bodies. A function's code is held in its
//! frame until the function closes; only then does it flush to the body
//! buffer, so function definitions never interleave.
//!
//! # Failure modes
//!
//! Misuse (no open function where one is required, an invalid symbol)
//! produces a diagnostic and a sentinel string (`BAD_REG`, `BAD_TYPE`)
//! that is visibly wrong in the output rather than silently absent.

mod control_flow;
mod expressions;

use std::collections::HashMap;

use ecow::EcoString;

use crate::diagnostics::Diagnostics;
use crate::semantic_analysis::{SymbolArena, SymbolId};
use crate::source_analysis::TypeMark;

/// Sentinel operand injected when no register can be produced.
pub const BAD_REG: &str = "BAD_REG";

/// Sentinel type string injected for an unusable type mark.
pub const BAD_TYPE: &str = "BAD_TYPE";

/// Maps a type mark to its IR scalar type. Strings are pointers.
#[must_use]
pub fn llvm_type(mark: TypeMark) -> &'static str {
    match mark {
        TypeMark::Int => "i32",
        TypeMark::Flt => "float",
        TypeMark::Str => "i8*",
        TypeMark::Bool => "i1",
        TypeMark::None => BAD_TYPE,
    }
}

/// Maps a type mark and element count to an IR type: the scalar type for
/// count 0, `[n x T]` otherwise.
#[must_use]
pub fn array_type(mark: TypeMark, num_elements: u32) -> String {
    if num_elements == 0 {
        llvm_type(mark).to_string()
    } else {
        format!("[{num_elements} x {}]", llvm_type(mark))
    }
}

/// Renders a float literal the way LLVM's textual format wants it: eight
/// hex bytes holding the double-precision bit pattern of the value.
#[must_use]
pub fn float_constant(value: f32) -> String {
    format!("0x{:016X}", f64::from(value).to_bits())
}

/// A staged call being assembled by `call_begin` / `call_arg` / `call_end`.
#[derive(Debug)]
struct PendingCall {
    handle: EcoString,
    ret_type: String,
    args: Vec<String>,
}

/// Per-function emission state.
#[derive(Debug)]
struct Frame {
    /// The symbol being defined.
    sym: SymbolId,
    /// This function's instruction text; flushed to the body on close.
    code: String,
    /// Next unnamed register number. Starts past the positional parameter
    /// registers and the implicit entry block label.
    reg_count: u32,
    if_count: u32,
    loop_count: u32,
    /// Open `if` label numbers, innermost last.
    if_stack: Vec<u32>,
    /// Open loop label numbers, innermost last.
    loop_stack: Vec<u32>,
    /// Whether the emission point sits inside an open basic block.
    block_open: bool,
    /// Labels synthesized for instructions emitted after a terminator.
    orphan_count: u32,
    /// Calls currently being staged; nested calls stack.
    calls: Vec<PendingCall>,
}

impl Frame {
    fn new(sym: SymbolId, num_params: u32) -> Self {
        Self {
            sym,
            code: String::new(),
            // Parameters take %0..%n-1 and the implicit entry block takes
            // %n, so the first instruction result is %n+1.
            reg_count: num_params + 1,
            if_count: 0,
            loop_count: 0,
            if_stack: Vec::new(),
            loop_stack: Vec::new(),
            block_open: true,
            orphan_count: 0,
            calls: Vec::new(),
        }
    }
}

/// The streaming IR emitter.
#[derive(Debug)]
pub struct CodeGen {
    header: String,
    globals: String,
    string_literals: String,
    declarations: String,
    body: String,
    frames: Vec<Frame>,
    /// Per-name suffixes disambiguating same-named functions from nested
    /// scopes. `main` is reserved for the synthetic entry point.
    function_counter: HashMap<EcoString, u32>,
    /// Interned string literals: payload to `@.str.<n>` handle.
    string_handles: HashMap<EcoString, EcoString>,
    string_count: u32,
}

impl CodeGen {
    /// Creates an emitter with the section headers and the runtime
    /// declarations already in place.
    #[must_use]
    pub fn new() -> Self {
        let mut gen = Self {
            header: String::from("; Rill compiler output\n"),
            globals: String::from("\n; Global definitions\n"),
            string_literals: String::from("\n; String literal definitions\n"),
            declarations: String::from("\n; Runtime declarations\n"),
            body: String::from("\n; Program body\n"),
            frames: Vec::new(),
            function_counter: HashMap::new(),
            string_handles: HashMap::new(),
            string_count: 0,
        };
        // The synthetic entry point owns the bare `@main` handle; user
        // procedures named `main` get suffixed.
        gen.function_counter.insert("main".into(), 1);
        for line in [
            "declare i1 @getbool()",
            "declare i32 @getinteger()",
            "declare float @getfloat()",
            "declare i8* @getstring()",
            "declare i1 @putbool(i1)",
            "declare i1 @putinteger(i32)",
            "declare i1 @putfloat(float)",
            "declare i1 @putstring(i8*)",
            "declare float @altsqrt(i32)",
        ] {
            gen.declarations.push_str(line);
            gen.declarations.push('\n');
        }
        gen
    }

    /// Concatenates the finished module text.
    #[must_use]
    pub fn emit_code(&self) -> String {
        let mut out = String::with_capacity(
            self.header.len()
                + self.globals.len()
                + self.string_literals.len()
                + self.declarations.len()
                + self.body.len(),
        );
        out.push_str(&self.header);
        out.push_str(&self.globals);
        out.push_str(&self.string_literals);
        out.push_str(&self.declarations);
        out.push_str(&self.body);
        out
    }

    /// Emits storage for a declared variable and records the chosen handle
    /// on its symbol: a global `zeroinitializer` for globals, a stack
    /// allocation in the current function for locals.
    pub fn declare_variable(
        &mut self,
        arena: &mut SymbolArena,
        id: SymbolId,
        is_global: bool,
        diags: &mut Diagnostics,
    ) {
        if arena[id].is_invalid() {
            diags.error("attempted to declare an invalid variable");
            return;
        }
        let ty = array_type(arena[id].type_mark(), arena[id].num_elements());
        if is_global {
            let handle = format!("@{}", arena[id].name());
            self.globals
                .push_str(&format!("{handle} = global {ty} zeroinitializer\n"));
            arena[id].set_handle(handle);
        } else {
            let Some(frame) = self.frames.last_mut() else {
                diags.error("cannot declare a local variable: no open function");
                return;
            };
            let handle = format!("%{}", arena[id].name());
            frame.code.push_str(&format!("{handle} = alloca {ty}\n"));
            arena[id].set_handle(handle);
        }
    }

    /// Opens a new function frame for a procedure: emits the `define` line
    /// with bare positional parameter types, allocates stack slots for the
    /// parameters, and stores the incoming registers into them.
    pub fn add_function(&mut self, arena: &mut SymbolArena, id: SymbolId, diags: &mut Diagnostics) {
        if arena[id].is_invalid() || !arena[id].is_procedure() {
            diags.error("attempted to add an invalid function");
            return;
        }
        let count = {
            let entry = self.function_counter.entry(arena[id].name().clone()).or_insert(0);
            let current = *entry;
            *entry += 1;
            current
        };
        let handle = if count == 0 {
            format!("@{}", arena[id].name())
        } else {
            format!("@{}{count}", arena[id].name())
        };
        arena[id].set_handle(handle.clone());
        self.open_frame(arena, id, &handle, diags);
    }

    /// Opens the synthetic entry point for the program body. The bare
    /// `@main` handle is reserved for it at construction.
    pub fn begin_program(&mut self, arena: &mut SymbolArena, id: SymbolId, diags: &mut Diagnostics) {
        arena[id].set_handle("@main");
        self.open_frame(arena, id, "@main", diags);
    }

    fn open_frame(
        &mut self,
        arena: &mut SymbolArena,
        id: SymbolId,
        handle: &str,
        diags: &mut Diagnostics,
    ) {
        let params: Vec<SymbolId> = arena[id].params().to_vec();
        let ret = llvm_type(arena[id].type_mark());

        let mut define = format!("define {ret} {handle}(");
        for (i, &param) in params.iter().enumerate() {
            if i > 0 {
                define.push_str(", ");
            }
            define.push_str(&array_type(
                arena[param].type_mark(),
                arena[param].num_elements(),
            ));
        }
        define.push_str("){\n");

        let num_params = u32::try_from(params.len()).unwrap_or(u32::MAX);
        let mut frame = Frame::new(id, num_params);
        frame.code.push_str(&define);
        self.frames.push(frame);

        // Parameters are mutable: give each one a stack slot and store the
        // incoming positional register into it.
        for (i, &param) in params.iter().enumerate() {
            self.declare_variable(arena, param, false, diags);
            let ty = array_type(arena[param].type_mark(), arena[param].num_elements());
            let handle = arena[param].handle().clone();
            if handle.is_empty() {
                continue;
            }
            if let Some(frame) = self.frames.last_mut() {
                frame
                    .code
                    .push_str(&format!("store {ty} %{i}, {ty}* {handle}\n"));
            }
        }
    }

    /// Closes the top function frame: appends the type-appropriate blank
    /// return if the final block is still open, closes the brace, and
    /// flushes the frame's code to the body buffer.
    pub fn close_function(&mut self, arena: &SymbolArena, diags: &mut Diagnostics) {
        let Some(frame) = self.frames.last() else {
            diags.error("attempt to pop an empty function stack");
            return;
        };
        if frame.block_open {
            let ret = blank_return(arena[frame.sym].type_mark());
            let frame = self.frames.last_mut().expect("frame checked above");
            frame.code.push_str(&ret);
            frame.code.push('\n');
        }
        let frame = self.frames.pop().expect("frame checked above");
        self.body.push_str(&frame.code);
        self.body.push_str("}\n");
    }

    /// Depth of the function frame stack.
    #[must_use]
    pub fn frame_depth(&self) -> usize {
        self.frames.len()
    }

    // ========================================================================
    // Frame plumbing shared by the emission submodules
    // ========================================================================

    /// Appends one instruction line to the open function, synthesizing a
    /// fresh labelled block first if the previous one was terminated.
    fn emit_line(&mut self, line: &str, diags: &mut Diagnostics) {
        self.ensure_open_block();
        let Some(frame) = self.frames.last_mut() else {
            diags.error("no open function to emit into");
            return;
        };
        frame.code.push_str(line);
        frame.code.push('\n');
    }

    /// Instructions emitted after a terminator open a fresh unreachable
    /// block so every labelled block still ends in exactly one terminator.
    fn ensure_open_block(&mut self) {
        if let Some(frame) = self.frames.last_mut() {
            if !frame.block_open {
                let label = format!(".dead.{}:\n", frame.orphan_count);
                frame.orphan_count += 1;
                frame.code.push_str(&label);
                frame.block_open = true;
            }
        }
    }

    /// Hands out the next unnamed register of the open function.
    fn next_reg(&mut self, diags: &mut Diagnostics) -> String {
        match self.frames.last_mut() {
            Some(frame) => {
                let reg = frame.reg_count;
                frame.reg_count += 1;
                format!("%{reg}")
            }
            None => {
                diags.error("register requested with no open function");
                BAD_REG.to_string()
            }
        }
    }
}

impl Default for CodeGen {
    fn default() -> Self {
        Self::new()
    }
}

/// The zero-valued return for a function that fell off its end.
fn blank_return(mark: TypeMark) -> String {
    match mark {
        TypeMark::Flt => "ret float 0.0".to_string(),
        TypeMark::Bool => "ret i1 false".to_string(),
        TypeMark::Str => "ret i8* null".to_string(),
        // `int` and the error mark both return zero so the output stays
        // loadable.
        TypeMark::Int | TypeMark::None => "ret i32 0".to_string(),
    }
}
