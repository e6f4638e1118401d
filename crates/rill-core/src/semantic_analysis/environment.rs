// Copyright 2026 James Casey
// SPDX-License-Identifier: Apache-2.0

//! The lexically-scoped symbol environment.
//!
//! One global table plus a stack of local tables. Lookups consult the top
//! local frame first, then the global table. The environment is seeded at
//! construction with the reserved words (which the lexer consults to turn
//! identifier lexemes into reserved-word tokens) and with the built-in
//! runtime procedures, whose back-end handles pre-resolve to the externally
//! linked symbols.

use std::collections::HashMap;

use ecow::EcoString;

use crate::diagnostics::Diagnostics;
use crate::source_analysis::{TokenKind, TypeMark};

use super::{Symbol, SymbolArena, SymbolId};

/// A single scope's name table.
///
/// Duplicate insertion is a failure, not an overwrite: the first
/// declaration of a name wins and the caller reports the conflict.
#[derive(Debug, Default)]
pub struct SymbolTable {
    entries: HashMap<EcoString, SymbolId>,
}

impl SymbolTable {
    /// Creates an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    /// Looks up a name.
    #[must_use]
    pub fn lookup(&self, name: &str) -> Option<SymbolId> {
        self.entries.get(name).copied()
    }

    /// Inserts a name. Returns `false` if the name is already present.
    pub fn insert(&mut self, name: EcoString, id: SymbolId) -> bool {
        match self.entries.entry(name) {
            std::collections::hash_map::Entry::Occupied(_) => false,
            std::collections::hash_map::Entry::Vacant(slot) => {
                slot.insert(id);
                true
            }
        }
    }

    /// Number of names in this table.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` when the table holds no names.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// The reserved words, paired with their token kinds.
const RESERVED_WORDS: &[(&str, TokenKind)] = &[
    ("program", TokenKind::Program),
    ("is", TokenKind::Is),
    ("begin", TokenKind::Begin),
    ("end", TokenKind::End),
    ("global", TokenKind::Global),
    ("procedure", TokenKind::Procedure),
    ("variable", TokenKind::Variable),
    ("integer", TokenKind::Integer),
    ("float", TokenKind::Float),
    ("string", TokenKind::String),
    ("bool", TokenKind::Bool),
    ("if", TokenKind::If),
    ("then", TokenKind::Then),
    ("else", TokenKind::Else),
    ("for", TokenKind::For),
    ("return", TokenKind::Return),
    ("not", TokenKind::Not),
    ("true", TokenKind::True),
    ("false", TokenKind::False),
];

/// Built-in runtime procedures: name, return mark, parameter marks, and the
/// externally linked handle. `sqrt` resolves to the runtime's `altsqrt`.
const BUILTINS: &[(&str, TypeMark, &[TypeMark], &str)] = &[
    ("getbool", TypeMark::Bool, &[], "@getbool"),
    ("getinteger", TypeMark::Int, &[], "@getinteger"),
    ("getfloat", TypeMark::Flt, &[], "@getfloat"),
    ("getstring", TypeMark::Str, &[], "@getstring"),
    ("putbool", TypeMark::Bool, &[TypeMark::Bool], "@putbool"),
    ("putinteger", TypeMark::Bool, &[TypeMark::Int], "@putinteger"),
    ("putfloat", TypeMark::Bool, &[TypeMark::Flt], "@putfloat"),
    ("putstring", TypeMark::Bool, &[TypeMark::Str], "@putstring"),
    ("sqrt", TypeMark::Flt, &[TypeMark::Int], "@altsqrt"),
];

/// The symbol environment: a global table plus a stack of local tables.
#[derive(Debug)]
pub struct Environment {
    arena: SymbolArena,
    global: SymbolTable,
    locals: Vec<SymbolTable>,
}

impl Environment {
    /// Creates an environment seeded with the reserved words and the
    /// built-in procedures.
    #[must_use]
    pub fn new() -> Self {
        let mut arena = SymbolArena::new();
        let mut global = SymbolTable::new();

        for &(word, kind) in RESERVED_WORDS {
            let id = arena.alloc(Symbol::reserved(word, kind));
            global.insert(word.into(), id);
        }

        let mut diags = Diagnostics::new();
        for &(name, ret, params, handle) in BUILTINS {
            let id = arena.alloc(Symbol::identifier(name));
            arena[id].set_type_mark(ret);
            arena[id].set_procedure(true);
            arena[id].set_handle(handle);
            for (i, &mark) in params.iter().enumerate() {
                let param = arena.alloc(Symbol::identifier(format!("arg{i}")));
                arena[param].set_type_mark(mark);
                arena.add_param(id, param, &mut diags);
            }
            global.insert(name.into(), id);
        }
        debug_assert!(!diags.has_errored(), "builtin seeding must not fail");

        Self {
            arena,
            global,
            locals: Vec::new(),
        }
    }

    /// The symbol arena.
    #[must_use]
    pub fn arena(&self) -> &SymbolArena {
        &self.arena
    }

    /// Mutable access to the symbol arena.
    pub fn arena_mut(&mut self) -> &mut SymbolArena {
        &mut self.arena
    }

    /// Resolves a name: top local frame first, then the global table.
    ///
    /// When `must_exist` is set, absence is reported at error severity.
    pub fn lookup(
        &self,
        name: &str,
        must_exist: bool,
        diags: &mut Diagnostics,
    ) -> Option<SymbolId> {
        let found = self
            .locals
            .last()
            .and_then(|table| table.lookup(name))
            .or_else(|| self.global.lookup(name));
        if found.is_none() && must_exist {
            diags.error(format!("`{name}` is not declared in this scope"));
        }
        found
    }

    /// Inserts a name into the global table or the top local frame.
    ///
    /// Fails when the name is reserved, when no local frame exists and
    /// `is_global` is false, or when the target table already holds the
    /// name. The caller decides what to report.
    pub fn insert(&mut self, name: &str, id: SymbolId, is_global: bool) -> bool {
        if self.is_reserved(name) {
            return false;
        }
        if is_global {
            self.global.insert(name.into(), id)
        } else {
            match self.locals.last_mut() {
                Some(table) => table.insert(name.into(), id),
                None => false,
            }
        }
    }

    /// Returns `true` iff the global table holds a reserved-word record
    /// under this name.
    #[must_use]
    pub fn is_reserved(&self, name: &str) -> bool {
        self.global
            .lookup(name)
            .is_some_and(|id| self.arena[id].kind().is_reserved_word())
    }

    /// For the lexer: the reserved-word kind of a lexeme, if it is one.
    #[must_use]
    pub fn reserved_kind(&self, lexeme: &str) -> Option<TokenKind> {
        self.global
            .lookup(lexeme)
            .map(|id| self.arena[id].kind())
            .filter(|kind| kind.is_reserved_word())
    }

    /// Pushes a fresh local scope.
    pub fn push(&mut self) {
        self.locals.push(SymbolTable::new());
    }

    /// Pops the top local scope. Popping with no local scope open is a
    /// diagnostic, not a crash.
    pub fn pop(&mut self, diags: &mut Diagnostics) {
        if self.locals.pop().is_none() {
            diags.warn("attempt to pop an empty scope stack");
        }
    }

    /// Depth of the local scope stack.
    #[must_use]
    pub fn scope_depth(&self) -> usize {
        self.locals.len()
    }
}

impl Default for Environment {
    fn default() -> Self {
        Self::new()
    }
}
