// Copyright 2026 James Casey
// SPDX-License-Identifier: Apache-2.0

//! The symbol arena.
//!
//! Identifier metadata is stored in an arena of [`Symbol`] records keyed by
//! numeric [`SymbolId`]. The environment's tables map names to ids, and the
//! parser and emitter mutate records through the arena. This keeps one
//! owner for every record: there are no shared token pointers to fall out
//! of sync, and the fields written after declaration are exactly the ones
//! the parser and emitter agree on (type mark, procedure flag, parameter
//! list during the header parse, element count during the variable parse,
//! back-end handle during emission).

use ecow::EcoString;

use crate::diagnostics::Diagnostics;
use crate::source_analysis::{TokenKind, TypeMark};

/// Index of a [`Symbol`] in the arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SymbolId(u32);

/// One named entity: a reserved word, a variable, or a procedure.
#[derive(Debug, Clone)]
pub struct Symbol {
    name: EcoString,
    kind: TokenKind,
    mark: TypeMark,
    /// 0 for scalars; the array length for arrays. For procedures this is
    /// the parameter count, kept in lockstep by [`SymbolArena::add_param`].
    num_elements: u32,
    is_procedure: bool,
    params: Vec<SymbolId>,
    /// Back-end handle (`@name`, `%name`); assigned at emission time.
    handle: EcoString,
}

impl Symbol {
    /// Creates a reserved-word record.
    #[must_use]
    pub fn reserved(name: impl Into<EcoString>, kind: TokenKind) -> Self {
        Self {
            name: name.into(),
            kind,
            mark: TypeMark::None,
            num_elements: 0,
            is_procedure: false,
            params: Vec::new(),
            handle: EcoString::new(),
        }
    }

    /// Creates an identifier record for a declared name.
    #[must_use]
    pub fn identifier(name: impl Into<EcoString>) -> Self {
        Self {
            name: name.into(),
            kind: TokenKind::Identifier,
            mark: TypeMark::None,
            num_elements: 0,
            is_procedure: false,
            params: Vec::new(),
            handle: EcoString::new(),
        }
    }

    /// Creates the hole record used when an identifier failed to parse.
    /// It reports itself as invalid and never matches anything.
    #[must_use]
    pub fn invalid() -> Self {
        Self {
            name: EcoString::new(),
            kind: TokenKind::Invalid,
            mark: TypeMark::None,
            num_elements: 0,
            is_procedure: false,
            params: Vec::new(),
            handle: EcoString::new(),
        }
    }

    /// The declared name, already case-folded by the lexer.
    #[must_use]
    pub fn name(&self) -> &EcoString {
        &self.name
    }

    /// The token kind this record was created with.
    #[must_use]
    pub fn kind(&self) -> TokenKind {
        self.kind
    }

    /// Returns `true` if this record is the invalid hole.
    #[must_use]
    pub fn is_invalid(&self) -> bool {
        self.kind == TokenKind::Invalid
    }

    /// The declared type mark.
    #[must_use]
    pub fn type_mark(&self) -> TypeMark {
        self.mark
    }

    /// Sets the declared type mark.
    pub fn set_type_mark(&mut self, mark: TypeMark) {
        self.mark = mark;
    }

    /// Element count: 0 for scalars, the length for arrays, the parameter
    /// count for procedures.
    #[must_use]
    pub fn num_elements(&self) -> u32 {
        self.num_elements
    }

    /// Declares this symbol as an array of `n` elements.
    ///
    /// Fails for `n < 1`; a positive count means "array of that length".
    pub fn set_num_elements(&mut self, n: i64) -> bool {
        if n < 1 {
            return false;
        }
        self.num_elements = u32::try_from(n).unwrap_or(u32::MAX);
        true
    }

    /// Whether this name resolves to a procedure.
    #[must_use]
    pub fn is_procedure(&self) -> bool {
        self.is_procedure
    }

    /// Sets the procedure flag.
    pub fn set_procedure(&mut self, is_procedure: bool) {
        self.is_procedure = is_procedure;
    }

    /// Ordered parameter list. Frozen once the procedure header is parsed.
    #[must_use]
    pub fn params(&self) -> &[SymbolId] {
        &self.params
    }

    /// The back-end handle, or an empty string before emission.
    #[must_use]
    pub fn handle(&self) -> &EcoString {
        &self.handle
    }

    /// Records the back-end handle chosen at emission time.
    pub fn set_handle(&mut self, handle: impl Into<EcoString>) {
        self.handle = handle.into();
    }
}

/// Arena of symbol records.
#[derive(Debug, Default)]
pub struct SymbolArena {
    records: Vec<Symbol>,
}

impl SymbolArena {
    /// Creates an empty arena.
    #[must_use]
    pub fn new() -> Self {
        Self {
            records: Vec::new(),
        }
    }

    /// Stores a record and returns its id.
    pub fn alloc(&mut self, symbol: Symbol) -> SymbolId {
        let id = SymbolId(u32::try_from(self.records.len()).expect("symbol arena overflow"));
        self.records.push(symbol);
        id
    }

    /// Appends a parameter to a procedure.
    ///
    /// Fails with an error diagnostic when `proc` is not flagged as a
    /// procedure or `param` is the invalid hole. A successful append also
    /// increments the procedure's element count, so the count and the
    /// parameter list never diverge.
    pub fn add_param(&mut self, proc: SymbolId, param: SymbolId, diags: &mut Diagnostics) -> bool {
        if self[param].is_invalid() {
            diags.error("cannot add an invalid parameter to a procedure");
            return false;
        }
        if !self[proc].is_procedure() {
            diags.error(format!(
                "cannot add parameter to `{}`: not a procedure",
                self[proc].name()
            ));
            return false;
        }
        let record = &mut self.records[proc.0 as usize];
        record.params.push(param);
        record.num_elements += 1;
        true
    }

    /// Fetches the `index`-th parameter of a procedure.
    ///
    /// Out-of-range indices are reported at error severity and return
    /// `None`.
    pub fn param(
        &self,
        proc: SymbolId,
        index: usize,
        diags: &mut Diagnostics,
    ) -> Option<SymbolId> {
        let record = &self[proc];
        match record.params.get(index) {
            Some(id) => Some(*id),
            None => {
                diags.error(format!(
                    "parameter index {index} out of range for `{}` ({} declared)",
                    record.name(),
                    record.params.len()
                ));
                None
            }
        }
    }

    /// Number of records stored.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Returns `true` when no records are stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl std::ops::Index<SymbolId> for SymbolArena {
    type Output = Symbol;

    fn index(&self, id: SymbolId) -> &Symbol {
        &self.records[id.0 as usize]
    }
}

impl std::ops::IndexMut<SymbolId> for SymbolArena {
    fn index_mut(&mut self, id: SymbolId) -> &mut Symbol {
        &mut self.records[id.0 as usize]
    }
}
