//! CLI commands for aldoc: check, show, synth, hover, definition.

use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::atomic::AtomicBool;

use crate::builder;
use crate::cache::{InheritedDocumentation, ObjectCache};
use crate::config::{Config, Settings};
use crate::diagnostics;
use crate::document::{SourceDocument, TextDocument};
use crate::error;
use crate::findings::{self, Finding};
use crate::synth;
use crate::types::{Declared, Documentation, Position, Procedure, SourceObject};
use crate::workspace;

/// A source file given on the command line, located inside its workspace.
struct LocatedFile {
    /// Workspace configuration.
    config: Config,
    /// Path relative to the workspace root; the document identity.
    relative: PathBuf,
    /// Workspace root.
    root: PathBuf,
}

impl LocatedFile {
    /// Read the file into a document.
    ///
    /// # Errors
    ///
    /// Returns `Error::FileNotFound` or `Error::Io` if the file cannot be read.
    fn document(&self) -> Result<TextDocument, error::Error> {
        return TextDocument::read(&self.root, &self.relative);
    }

    /// Build the file's object.
    ///
    /// # Errors
    ///
    /// Returns errors from reading the file.
    fn object(&self) -> Result<Option<SourceObject>, error::Error> {
        return workspace::analyze_file(&self.root, &self.relative, &self.config.settings);
    }
}

/// How `check` prints its findings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Pretty-printed JSON array.
    Json,
    /// Markdown report grouped by file.
    Markdown,
    /// One `path:line:col: severity[code] message` line per finding.
    Text,
}

/// Scan the workspace containing the current directory and report every finding.
/// Exit code 0 when clean, 1 when any finding was reported.
///
/// # Errors
///
/// Returns errors from root discovery, config loading, or JSON output.
pub fn check(format: OutputFormat) -> Result<ExitCode, error::Error> {
    let root = workspace_root()?;
    let config = Config::load(&root)?;
    let cache = ObjectCache::new();
    let report = workspace::scan(&root, &config, &cache, &AtomicBool::new(false));

    let findings = evaluate_cache(&cache, &config.settings);
    print_findings(&findings, format)?;

    let files = count_files(&findings);
    if cache.is_empty() {
        eprintln!("No objects found under {}", root.display());
    }
    if findings.is_empty() {
        eprintln!("All {} objects documented", report.built);
        return Ok(ExitCode::SUCCESS);
    }
    eprintln!("{} findings in {files} files ({} objects scanned)", findings.len(), report.built);
    return Ok(ExitCode::from(1));
}

/// Number of distinct files among `findings`.
fn count_files(findings: &[Finding]) -> usize {
    let mut files: Vec<&Path> = findings.iter().map(|f| return f.file.as_path()).collect();
    files.dedup();
    return files.len();
}

/// Print the procedure an `inheritdoc` on `line` (1-based) refers to, as `path:line`.
/// The line is the procedure signature, or a line of the comment above it.
///
/// # Errors
///
/// Returns `Error::NoDeclaration` if the line is not a procedure signature,
/// or errors from reading and scanning.
pub fn definition(file: &str, line: usize) -> Result<ExitCode, error::Error> {
    let located = locate(file)?;
    let object = require_object(&located, line)?;
    let index = line.saturating_sub(1);
    let on_comment = located
        .document()?
        .line(index)
        .is_some_and(crate::classify::is_structured_comment);
    let procedure = object
        .procedure_at_line(index)
        .or_else(|| return if on_comment { object.next_procedure_after(index) } else { None });
    let Some(procedure) = procedure else {
        return Err(no_declaration(&located, line));
    };

    match resolve_inherited(&located, &object, procedure) {
        Some(inherited) => {
            println!("{}:{}", located.root.join(&inherited.file).display(), inherited.line.saturating_add(1));
            return Ok(ExitCode::SUCCESS);
        },
        None => {
            eprintln!("`{}` does not inherit documentation from a known interface.", procedure.name);
            return Ok(ExitCode::from(1));
        },
    }
}

/// Evaluate every cached object, ordered by file.
pub fn evaluate_cache(cache: &ObjectCache, settings: &Settings) -> Vec<Finding> {
    return cache
        .paths()
        .iter()
        .filter_map(|path| return cache.get(path))
        .flat_map(|object| return findings::evaluate(&object, settings))
        .collect();
}

/// One `path:line:col: severity[code] message` line, one-based.
pub fn format_finding(finding: &Finding) -> String {
    return format!(
        "{}:{}:{}: {}[{}] {}",
        finding.file.display(),
        finding.range.start.line.saturating_add(1),
        finding.range.start.column.saturating_add(1),
        finding.severity,
        finding.code,
        finding.message
    );
}

/// Print the documentation of the declaration on `line` (1-based).
/// `inheritdoc` is followed through the workspace to the interface it names.
///
/// # Errors
///
/// Returns `Error::NoDeclaration` if the line is not a declaration,
/// or errors from reading and scanning.
pub fn hover(file: &str, line: usize) -> Result<ExitCode, error::Error> {
    let located = locate(file)?;
    let object = require_object(&located, line)?;
    let Some(declared) = object.declaration_at_line(line.saturating_sub(1)) else {
        return Err(no_declaration(&located, line));
    };

    let mut documentation = declared.documentation().clone();
    if let Declared::Procedure(procedure) = declared
        && let Some(inherited) = resolve_inherited(&located, &object, procedure)
    {
        println!(
            "<!-- inherited from {}.{} ({}:{}) -->",
            inherited.object,
            inherited.procedure,
            inherited.file.display(),
            inherited.line.saturating_add(1)
        );
        documentation = inherited.documentation;
    }

    if !documentation.exists {
        eprintln!("No documentation.");
        return Ok(ExitCode::from(1));
    }
    println!("{}", documentation.raw);
    return Ok(ExitCode::SUCCESS);
}

/// Resolve `file` against the current directory and find its workspace.
///
/// # Errors
///
/// Returns `Error::FileNotFound` if the file does not exist,
/// `Error::WorkspaceNotFound` if no workspace contains it,
/// or errors from loading the config.
fn locate(file: &str) -> Result<LocatedFile, error::Error> {
    let absolute = std::fs::canonicalize(file).map_err(|_err| return error::Error::FileNotFound {
        path: PathBuf::from(file),
    })?;
    let start = absolute.parent().unwrap_or(&absolute);
    let root = workspace::find_root(start)?;
    let relative = absolute.strip_prefix(&root).unwrap_or(&absolute).to_path_buf();
    let config = Config::load(&root)?;
    return Ok(LocatedFile { config, relative, root });
}

/// Error for a line that holds no usable declaration.
fn no_declaration(located: &LocatedFile, line: usize) -> error::Error {
    return error::Error::NoDeclaration { file: located.relative.clone(), line };
}

/// Print findings in the requested format.
///
/// # Errors
///
/// Returns `Error::Json` if serialization fails.
pub fn print_findings(findings: &[Finding], format: OutputFormat) -> Result<(), error::Error> {
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(findings)?),
        OutputFormat::Markdown => print!("{}", diagnostics::render_findings(findings)),
        OutputFormat::Text => {
            for finding in findings {
                println!("{}", format_finding(finding));
            }
        },
    }
    return Ok(());
}

/// Plain-text outline of an object, one-based lines.
fn render_object(object: &SourceObject) -> String {
    let mut out = String::new();
    let id = object.id.map(|id| return format!(" {id}")).unwrap_or_default();
    let _ = writeln!(
        out,
        "{}{id} \"{}\" (line {}) {}",
        object.kind_token.to_ascii_lowercase(),
        object.name,
        object.line.saturating_add(1),
        status(&object.documentation)
    );

    for procedure in &object.procedures {
        let keyword = match procedure.kind {
            crate::types::ProcedureKind::Procedure => "procedure",
            crate::types::ProcedureKind::Trigger => "trigger",
        };
        let _ = writeln!(
            out,
            "  {keyword} {} (line {}) {}",
            procedure.name,
            procedure.line.saturating_add(1),
            status(&procedure.documentation)
        );
        for parameter in &procedure.parameters {
            let var = if parameter.by_reference { "var " } else { "" };
            let _ = writeln!(
                out,
                "    param {var}{}: {} {}",
                parameter.name,
                parameter.data_type,
                status(&parameter.documentation)
            );
        }
        if let Some(ret) = &procedure.return_value {
            let _ = writeln!(out, "    returns {} {}", ret.data_type, status(&ret.documentation));
        }
    }
    return out;
}

/// Build the file's object, failing with `NoDeclaration` when there is none.
///
/// # Errors
///
/// Returns `Error::NoDeclaration` or errors from reading the file.
fn require_object(located: &LocatedFile, line: usize) -> Result<SourceObject, error::Error> {
    return located.object()?.ok_or_else(|| return no_declaration(located, line));
}

/// Scan the workspace and follow `inheritdoc` on `procedure`, if it has one.
fn resolve_inherited(
    located: &LocatedFile,
    owner: &SourceObject,
    procedure: &Procedure,
) -> Option<InheritedDocumentation> {
    if !procedure.documentation.raw.contains("inheritdoc") {
        return None;
    }
    let cache = ObjectCache::new();
    workspace::scan(&located.root, &located.config, &cache, &AtomicBool::new(false));
    return cache.resolve_inherited(owner, procedure);
}

/// Print the model built from one file: the object, its procedures and their elements.
///
/// # Errors
///
/// Returns errors from locating or reading the file, or from JSON output.
pub fn show(file: &str, json: bool) -> Result<ExitCode, error::Error> {
    let located = locate(file)?;
    let Some(object) = located.object()? else {
        eprintln!("`{}` declares no object.", located.relative.display());
        return Ok(ExitCode::from(1));
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&object)?);
    } else {
        print!("{}", render_object(&object));
    }
    return Ok(ExitCode::SUCCESS);
}

/// Documentation status label.
fn status(documentation: &Documentation) -> &'static str {
    return if documentation.exists { "documented" } else { "undocumented" };
}

/// Print the documentation skeleton for the declaration at `line` (1-based).
///
/// The line is either a bare `///` directly above a declaration, or the
/// declaration's own first line.
///
/// # Errors
///
/// Returns `Error::NoDeclaration` if neither applies,
/// or errors from locating or reading the file.
pub fn synth(file: &str, line: usize, column: usize) -> Result<ExitCode, error::Error> {
    let located = locate(file)?;
    let document = located.document()?;
    let index = line.saturating_sub(1);

    let cursor = Position { column: column.saturating_sub(1), line: index };
    if let Some(snippet) = synth::synthesize_at(&document, cursor) {
        println!("{}", snippet.text);
        return Ok(ExitCode::SUCCESS);
    }

    let Some(first) = document.line(index) else {
        return Err(no_declaration(&located, line));
    };
    let text = if crate::signature::is_procedure_start(first) {
        builder::accumulate_signature(&document, index).0
    } else {
        first.to_string()
    };
    let Some(declaration) = synth::parse_declaration(&text) else {
        return Err(no_declaration(&located, line));
    };
    let indent: String = first.chars().take_while(|c| return c.is_whitespace()).collect();
    for template_line in synth::synthesize(&declaration).lines() {
        println!("{indent}{template_line}");
    }
    return Ok(ExitCode::SUCCESS);
}

/// Workspace root above the current directory.
///
/// # Errors
///
/// Returns `Error::Io` if the current directory is unreadable,
/// or `Error::WorkspaceNotFound` if no workspace contains it.
pub fn workspace_root() -> Result<PathBuf, error::Error> {
    let cwd = std::env::current_dir()?;
    let cwd = std::fs::canonicalize(&cwd).unwrap_or(cwd);
    return workspace::find_root(&cwd);
}

#[cfg(test)]
#[allow(clippy::missing_panics_doc, reason = "tests")]
#[allow(clippy::unwrap_used, reason = "tests")]
mod tests {
    use super::*;
    use crate::findings::{FindingKind, FindingTarget};
    use crate::types::{Severity, SourceRange};

    #[test]
    fn finding_line_is_one_based() {
        let finding = Finding {
            code: "DOC0010,DOC0020".to_string(),
            file: PathBuf::from("src/A.al"),
            message: "Documentation for procedure 'Run' is incomplete: summary missing, parameter 'X' missing.".to_string(),
            missing: vec![FindingKind::SummaryMissing, FindingKind::ParameterMissing("X".to_string())],
            name: "Run".to_string(),
            range: SourceRange { end: Position { column: 30, line: 4 }, start: Position { column: 4, line: 4 } },
            severity: Severity::Warning,
            target: FindingTarget::Procedure,
        };
        assert_eq!(
            format_finding(&finding),
            "src/A.al:5:5: warning[DOC0010,DOC0020] Documentation for procedure 'Run' is incomplete: summary missing, parameter 'X' missing."
        );
    }

    #[test]
    fn evaluate_cache_orders_by_file() {
        let cache = ObjectCache::new();
        let settings = Settings::default();
        for (path, name) in [("src/b.al", "B"), ("src/a.al", "A")] {
            let text = format!("codeunit 1 {name}\n{{\n}}\n");
            cache.insert(builder::build_object(&TextDocument::new(path, &text), &settings).unwrap());
        }
        let names: Vec<String> = evaluate_cache(&cache, &settings).into_iter().map(|f| f.name).collect();
        assert_eq!(names, vec!["A".to_string(), "B".to_string()]);
    }

    #[test]
    fn outline_lists_elements() {
        let text = "codeunit 50100 Tools\n{\n    /// <summary>Runs.</summary>\n    procedure Run(var X: Integer): Boolean\n    begin\n    end;\n}\n";
        let object = builder::build_object(&TextDocument::new("a.al", text), &Settings::default()).unwrap();
        assert_eq!(
            render_object(&object),
            "codeunit 50100 \"Tools\" (line 1) undocumented\n  procedure Run (line 4) documented\n    param var X: Integer undocumented\n    returns Boolean undocumented\n"
        );
    }
}
