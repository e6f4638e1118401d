// Copyright 2026 James Casey
// SPDX-License-Identifier: Apache-2.0

//! Rill compiler command-line driver.
//!
//! Thin glue around `rill-core`: argument parsing, log routing, diagnostic
//! printing, and writing the emitted module. Exit code is zero exactly
//! when the compile produced no error-severity diagnostics.

use std::fs::File;
use std::process::ExitCode;

use camino::Utf8PathBuf;
use clap::Parser;
use miette::{IntoDiagnostic, Result, WrapErr};
use rill_core::compile::compile_file;
use rill_core::diagnostics::Severity;
use tracing_subscriber::filter::LevelFilter;

/// Rill: a single-pass compiler for a small imperative language
#[derive(Debug, Parser)]
#[command(name = "rillc")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Source file to compile
    #[arg(short = 'i', value_name = "PATH")]
    input: Utf8PathBuf,

    /// Verbosity: 0 = debug, 1 = info, 2 = warnings, 3 = errors only
    #[arg(short = 'v', value_name = "N", default_value_t = 2)]
    verbosity: u8,

    /// Also append the log to this file
    #[arg(short = 'l', value_name = "PATH")]
    log_file: Option<Utf8PathBuf>,

    /// Suppress the welcome banner
    #[arg(short = 'w')]
    no_welcome: bool,

    /// Where to write the emitted module (default: input with `.ll`)
    #[arg(short = 'o', value_name = "PATH")]
    output: Option<Utf8PathBuf>,
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    let level = match cli.verbosity {
        0 => LevelFilter::DEBUG,
        1 => LevelFilter::INFO,
        2 => LevelFilter::WARN,
        _ => LevelFilter::ERROR,
    };
    init_logging(level, cli.log_file.as_ref())?;

    // Install miette's fancy handler for driver-level errors.
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .unicode(true)
                .build(),
        )
    }))?;

    if !cli.no_welcome {
        welcome();
    }

    let result = compile_file(cli.input.as_std_path())
        .wrap_err_with(|| format!("could not compile `{}`", cli.input))?;

    // Warnings and errors go to stderr in source order; the log routing
    // above already captured the full stream at the chosen verbosity.
    for diag in result.diagnostics.records() {
        if diag.severity >= Severity::Warn {
            eprintln!("{diag}");
        }
    }

    if !result.succeeded() {
        eprintln!(
            "compilation failed with {} error(s)",
            result.diagnostics.error_count()
        );
        return Ok(ExitCode::FAILURE);
    }

    let output = cli
        .output
        .unwrap_or_else(|| cli.input.with_extension("ll"));
    std::fs::write(&output, &result.module)
        .into_diagnostic()
        .wrap_err_with(|| format!("could not write `{output}`"))?;
    tracing::info!(%output, "module written");

    Ok(ExitCode::SUCCESS)
}

/// Routes tracing output to stderr, and to the `-l` file when given.
fn init_logging(level: LevelFilter, log_file: Option<&Utf8PathBuf>) -> Result<()> {
    match log_file {
        Some(path) => {
            let file = File::create(path)
                .into_diagnostic()
                .wrap_err_with(|| format!("cannot open log file `{path}` for writing"))?;
            tracing_subscriber::fmt()
                .with_max_level(level)
                .with_ansi(false)
                .with_writer(std::sync::Arc::new(file))
                .init();
        }
        None => {
            tracing_subscriber::fmt()
                .with_max_level(level)
                .with_writer(std::io::stderr)
                .init();
        }
    }
    Ok(())
}

fn welcome() {
    println!(
        " __________________________\n\
         < rillc: one pass, no AST >\n\
         \x20--------------------------\n\
         \x20      \\   ~\n\
         \x20       \\   ~~-__\n\
         \x20            ~~~~~~-----~~~\n"
    );
}
