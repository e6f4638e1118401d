// Copyright 2026 James Casey
// SPDX-License-Identifier: Apache-2.0

//! Semantic analysis for Rill.
//!
//! This module owns name resolution and type compatibility:
//! - The [`SymbolArena`] stores one record per declared name; everything
//!   else (environment, parser, emitter) holds [`SymbolId`]s.
//! - The [`Environment`] layers a stack of local symbol tables over one
//!   global table and is the single authority for name resolution and for
//!   procedure-vs-variable disambiguation.
//! - The type checker is a set of pure predicates over type marks.

mod environment;
mod symbol;
pub mod type_checker;

pub use environment::{Environment, SymbolTable};
pub use symbol::{Symbol, SymbolArena, SymbolId};
