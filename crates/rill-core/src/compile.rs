// Copyright 2026 James Casey
// SPDX-License-Identifier: Apache-2.0

//! The compile pipeline.
//!
//! One call compiles one source file start to finish: environment, lexer,
//! parser, and emitter are wired together, the parser drives the pass, and
//! the emitted module plus the collected diagnostics come back. Source
//! defects never surface as `Err`; they are diagnostics on the
//! [`Compilation`]. `Err` is reserved for the driver-level failures
//! (unreadable input).

use std::path::Path;

use miette::Diagnostic;
use thiserror::Error;

use crate::diagnostics::Diagnostics;
use crate::parser::Parser;

/// Driver-level failures.
#[derive(Debug, Error, Diagnostic)]
pub enum CompileError {
    /// The source file could not be read.
    #[error("failed to read source file `{path}`")]
    #[diagnostic(help("make sure the file exists and you have read permission"))]
    ReadSource {
        /// The offending path.
        path: String,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },
}

/// The result of compiling one source text.
#[derive(Debug)]
pub struct Compilation {
    /// The emitted LLVM-style module text.
    pub module: String,
    /// Everything the compiler had to say, in source order.
    pub diagnostics: Diagnostics,
}

impl Compilation {
    /// Returns `true` when no error-severity diagnostic was produced.
    #[must_use]
    pub fn succeeded(&self) -> bool {
        !self.diagnostics.has_errored()
    }
}

/// Compiles one source text.
#[must_use]
pub fn compile_source(source: &str) -> Compilation {
    let mut parser = Parser::new(source);
    parser.parse();
    let (module, diagnostics) = parser.finish();
    Compilation {
        module,
        diagnostics,
    }
}

/// Reads and compiles one source file.
///
/// # Errors
///
/// Returns [`CompileError::ReadSource`] when the file cannot be read.
/// Defects in the source program are diagnostics, not errors.
pub fn compile_file(path: &Path) -> Result<Compilation, CompileError> {
    tracing::info!(path = %path.display(), "compiling");
    let source = std::fs::read_to_string(path).map_err(|source| CompileError::ReadSource {
        path: path.display().to_string(),
        source,
    })?;
    Ok(compile_source(&source))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compile_source_round_trips() {
        let result = compile_source("program p is begin end program.");
        assert!(result.succeeded());
        assert!(result.module.contains("define i32 @main(){"));
    }

    #[test]
    fn source_errors_are_diagnostics_not_errs() {
        let result = compile_source("program p is begin x := 1; end program.");
        assert!(!result.succeeded());
        assert!(result.diagnostics.has_errored());
    }

    #[test]
    fn missing_file_is_an_error() {
        let err = compile_file(Path::new("/no/such/file.src")).unwrap_err();
        assert!(matches!(err, CompileError::ReadSource { .. }));
    }
}
