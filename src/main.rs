//! `aldoc`: documentation diagnostics for AL source workspaces.

mod builder;
mod cache;
mod classify;
mod commands;
mod config;
mod diagnostics;
mod docblock;
mod document;
mod error;
mod findings;
mod signature;
mod synth;
mod types;
mod watch;
mod workspace;

use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use crate::commands::OutputFormat;

/// Environment variable holding the log filter.
const LOG_ENV: &str = "ALDOC_LOG";

/// Command-line arguments.
#[derive(Parser)]
#[command(name = "aldoc", about = "Documentation diagnostics and doc-comment scaffolding for AL sources")]
struct Cli {
    /// Subcommand to run.
    #[command(subcommand)]
    command: Commands,
    /// Log scan progress and per-file notes to stderr
    #[arg(short, long, global = true)]
    verbose: bool,
}

/// Subcommands.
#[derive(Subcommand)]
enum Commands {
    /// Scan the workspace and report incomplete documentation
    Check {
        /// Output format
        #[arg(long, value_enum, default_value = "text")]
        format: OutputFormat,
    },
    /// Print the documentation an inheritdoc on a procedure line refers to, as path:line
    Definition {
        /// Source file
        file: String,
        /// One-based line of the procedure signature
        line: usize,
    },
    /// Print the documentation of the declaration on a line
    Hover {
        /// Source file
        file: String,
        /// One-based line of the declaration
        line: usize,
    },
    /// Print the model built from one file
    Show {
        /// Source file
        file: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Print a documentation skeleton for the declaration below a `///` line
    Synth {
        /// Source file
        file: String,
        /// One-based line of the `///` cursor, or of the declaration itself
        line: usize,
        /// One-based cursor column
        #[arg(long, default_value_t = 1)]
        column: usize,
    },
    /// Check once, then re-check changed files until interrupted
    Watch {
        /// Output format
        #[arg(long, value_enum, default_value = "text")]
        format: OutputFormat,
    },
}

/// Send logs to stderr, filtered by `ALDOC_LOG`; `warn` unless set or `--verbose`.
fn init_logging(verbose: bool) {
    let fallback = if verbose { "aldoc=debug" } else { "warn" };
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| return EnvFilter::new(fallback));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

/// Run one subcommand; exit 2 on error, after printing it as markdown.
fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match cli.command {
        Commands::Check { format } => commands::check(format),
        Commands::Definition { file, line } => commands::definition(&file, line),
        Commands::Hover { file, line } => commands::hover(&file, line),
        Commands::Show { file, json } => commands::show(&file, json),
        Commands::Synth { file, line, column } => commands::synth(&file, line, column),
        Commands::Watch { format } => watch::run(format),
    };

    return match result {
        Ok(code) => code,
        Err(e) => {
            diagnostics::print_error(&e);
            return ExitCode::from(2);
        },
    };
}
