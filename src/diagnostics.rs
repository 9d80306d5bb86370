//! Terminal rendering: markdown error blocks and the markdown findings report.

use std::fmt::Write as _;

use crate::error::Error;
use crate::findings::Finding;

/// ANSI bold, used for headings.
const BOLD: &str = "\x1b[1m";
/// ANSI reset.
const RESET: &str = "\x1b[0m";

/// Render an error as valid markdown with bold headings and print to stderr.
pub fn print_error(e: &Error) {
    let md = render_error(e);
    for line in md.lines() {
        if line.starts_with('#') {
            eprintln!("{BOLD}{line}{RESET}");
        } else {
            eprintln!("{line}");
        }
    }
}

/// Render an error as a structured markdown diagnostic.
///
/// Each variant produces a block with what happened and, where the user can
/// do something about it, how to fix it.
pub fn render_error(e: &Error) -> String {
    return match e {
        Error::WorkspaceNotFound { start } => render_workspace_not_found(start),
        Error::NoDeclaration { file, line } => render_no_declaration(file, *line),
        Error::InvalidConfig { reason } => render_invalid_config(reason),
        _ => render_generic(e),
    };
}

/// Render findings grouped by file as a markdown report, one bullet per finding.
/// Lines are one-based.
pub fn render_findings(findings: &[Finding]) -> String {
    let mut out = String::new();
    let mut current: Option<&std::path::Path> = None;
    for finding in findings {
        if current != Some(finding.file.as_path()) {
            if current.is_some() {
                out.push('\n');
            }
            let _ = writeln!(out, "## {}\n", finding.file.display());
            current = Some(finding.file.as_path());
        }
        let _ = writeln!(
            out,
            "- line {}: `{}` {}",
            finding.range.start.line.saturating_add(1),
            finding.code,
            finding.message
        );
    }
    return out;
}

/// Heading and message for variants without a dedicated layout.
fn render_generic(e: &Error) -> String {
    return match e {
        Error::FileNotFound { path } => format!("\
# Error: File Not Found

`{}` does not exist.
", path.display()),

        Error::Io(e) => format!("\
# Error: I/O

{e}
"),
        Error::Json(e) => format!("\
# Error: JSON Output

{e}
"),
        Error::TomlDe(e) => format!("\
# Error: Invalid TOML

{e}

## Fix

Correct `.aldoc.toml` at the workspace root, or delete it to use the defaults.
"),
        Error::Watch { reason } => format!("\
# Error: Watch Failed

{reason}
"),
        // Laid out by render_error.
        Error::InvalidConfig { .. } | Error::NoDeclaration { .. } | Error::WorkspaceNotFound { .. } => format!("\
# Error

{e}
"),
    };
}

/// A config value out of range.
fn render_invalid_config(reason: &str) -> String {
    return format!("\
# Error: Invalid Config

{reason}

## Fix

Correct the value in `.aldoc.toml`.
");
}

/// A line that is neither an object nor a procedure header.
fn render_no_declaration(file: &std::path::Path, line: usize) -> String {
    return format!("\
# Error: No Declaration

Line {line} of `{}` is not an object or procedure header.

## Fix

Point at the header line itself, or at a `///` line directly above one.
", file.display());
}

/// No workspace root above the start directory.
fn render_workspace_not_found(start: &std::path::Path) -> String {
    return format!("\
# Error: Workspace Not Found

No `app.json` or `.aldoc.toml` in `{}` or any parent directory.

## Fix

Run aldoc from inside an app folder, or create an empty `.aldoc.toml` at its root:

    touch .aldoc.toml
", start.display());
}
