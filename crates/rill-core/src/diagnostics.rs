// Copyright 2026 James Casey
// SPDX-License-Identifier: Apache-2.0

//! Diagnostic collection for the compiler front-end.
//!
//! All phases report through one [`Diagnostics`] value that is passed
//! explicitly to the lexer, parser, type checker, and emitter. The lexer
//! owns the one-based source line counter and publishes it here on every
//! newline; each record snapshots the line that was current when it was
//! reported.
//!
//! Errors are additive: they set a module-wide "has errored" flag and never
//! abort compilation. Every record is mirrored as a `tracing` event so the
//! driver's verbosity and log-file settings apply uniformly.

use ecow::EcoString;

/// Diagnostic severity level.
///
/// The driver maps its `-v` flag onto this ladder: 0 = Debug, 1 = Info,
/// 2 = Warn (the default), 3 = Error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Severity {
    /// Phase-by-phase narration, useful when debugging the compiler itself.
    Debug,
    /// Progress messages.
    Info,
    /// Something suspicious that does not fail the compile.
    Warn,
    /// A defect in the source program; the compile will exit nonzero.
    Error,
}

impl Severity {
    /// Returns the lower-case label used when rendering a record.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warning",
            Self::Error => "error",
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// A single diagnostic record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    /// How serious the report is.
    pub severity: Severity,
    /// Human-readable message.
    pub message: EcoString,
    /// One-based source line that was current when the record was made.
    pub line: u32,
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: line {}: {}", self.severity, self.line, self.message)
    }
}

/// Collects diagnostics in source order.
///
/// Records arrive in source order because the lexer publishes line numbers
/// as they are crossed and every phase reports through the same collector.
#[derive(Debug)]
pub struct Diagnostics {
    records: Vec<Diagnostic>,
    line: u32,
    has_errored: bool,
}

impl Diagnostics {
    /// Creates an empty collector positioned at line one.
    #[must_use]
    pub fn new() -> Self {
        Self {
            records: Vec::new(),
            line: 1,
            has_errored: false,
        }
    }

    /// Publishes the current source line. Called by the lexer on newlines.
    pub fn set_line(&mut self, line: u32) {
        self.line = line;
    }

    /// The line subsequent records will snapshot.
    #[must_use]
    pub fn current_line(&self) -> u32 {
        self.line
    }

    /// Reports at debug severity.
    pub fn debug(&mut self, message: impl Into<EcoString>) {
        self.report(Severity::Debug, message.into());
    }

    /// Reports at info severity.
    pub fn info(&mut self, message: impl Into<EcoString>) {
        self.report(Severity::Info, message.into());
    }

    /// Reports at warning severity.
    pub fn warn(&mut self, message: impl Into<EcoString>) {
        self.report(Severity::Warn, message.into());
    }

    /// Reports at error severity and latches the module-wide error flag.
    pub fn error(&mut self, message: impl Into<EcoString>) {
        self.report(Severity::Error, message.into());
    }

    fn report(&mut self, severity: Severity, message: EcoString) {
        match severity {
            Severity::Debug => tracing::debug!(line = self.line, "{message}"),
            Severity::Info => tracing::info!(line = self.line, "{message}"),
            Severity::Warn => tracing::warn!(line = self.line, "{message}"),
            Severity::Error => tracing::error!(line = self.line, "{message}"),
        }
        if severity == Severity::Error {
            self.has_errored = true;
        }
        self.records.push(Diagnostic {
            severity,
            message,
            line: self.line,
        });
    }

    /// Returns `true` if any error-severity record was reported.
    #[must_use]
    pub fn has_errored(&self) -> bool {
        self.has_errored
    }

    /// All records, in source order.
    #[must_use]
    pub fn records(&self) -> &[Diagnostic] {
        &self.records
    }

    /// Count of error-severity records.
    #[must_use]
    pub fn error_count(&self) -> usize {
        self.records
            .iter()
            .filter(|d| d.severity == Severity::Error)
            .count()
    }

    /// Count of warning-severity records.
    #[must_use]
    pub fn warning_count(&self) -> usize {
        self.records
            .iter()
            .filter(|d| d.severity == Severity::Warn)
            .count()
    }
}

impl Default for Diagnostics {
    fn default() -> Self {
        Self::new()
    }
}
