//! Core domain types for the source model.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Access level of an object or procedure. Procedures without a modifier are public.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AccessLevel {
    /// `internal`: visible inside the declaring app only.
    Internal,
    /// `local`: visible inside the declaring object only.
    Local,
    /// `protected`: visible to the object and its extensions.
    Protected,
    /// No modifier, or `Access = Public`.
    Public,
}

impl AccessLevel {
    /// Every access level, in declaration order of the enum.
    pub const ALL: [Self; 4] = [Self::Internal, Self::Local, Self::Protected, Self::Public];

    /// Parse an access modifier or `Access` property value, case-insensitively.
    pub fn from_token(token: &str) -> Option<Self> {
        return match token.to_ascii_lowercase().as_str() {
            "internal" => Some(Self::Internal),
            "local" => Some(Self::Local),
            "protected" => Some(Self::Protected),
            "public" => Some(Self::Public),
            _ => None,
        };
    }
}

/// A declaration found by line lookup.
#[derive(Debug, Clone, Copy)]
pub enum Declared<'a> {
    /// The object header.
    Object(&'a SourceObject),
    /// A procedure signature.
    Procedure(&'a Procedure),
}

impl Declared<'_> {
    /// Documentation of the declaration.
    pub fn documentation(&self) -> &Documentation {
        return match self {
            Declared::Object(o) => &o.documentation,
            Declared::Procedure(p) => &p.documentation,
        };
    }
}

/// Raw documentation attached to a declaration.
///
/// `raw` holds the structured-comment markup with the `///` markers removed.
/// Whether the markup is complete is decided by the findings engine, not here.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Documentation {
    /// At least one structured-comment line (or matching tag) was found.
    pub exists: bool,
    /// Markup text, lines joined with `\n`.
    pub raw: String,
}

impl Documentation {
    /// Documentation that is absent.
    pub fn missing() -> Self {
        return Self::default();
    }

    /// Documentation built from captured markup.
    pub fn present(raw: impl Into<String>) -> Self {
        return Self { exists: true, raw: raw.into() };
    }
}

/// How an object relates to the target named in its header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ExtensionKind {
    /// `tableextension 50100 X extends Customer`.
    Extends,
    /// `codeunit 50100 X implements IFoo, IBar`.
    Implements,
}

/// The `extends`/`implements` clause of an object header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExtensionRelation {
    /// Which keyword introduced the clause.
    pub kind: ExtensionKind,
    /// Target text as written, possibly a comma-separated list of quoted names.
    pub target: String,
}

impl ExtensionRelation {
    /// Individual target names with quotes removed.
    /// `"IFoo", IBar` yields `["IFoo", "IBar"]`.
    pub fn targets(&self) -> Vec<String> {
        return crate::signature::split_top_level(&self.target, ',')
            .into_iter()
            .map(|t| return crate::signature::unquote(t.trim()))
            .filter(|t| return !t.is_empty())
            .collect();
    }
}

/// The kind keyword of an object header.
/// Kinds the host language adds later still parse, as `Unknown`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ObjectKind {
    /// `codeunit`.
    Codeunit,
    /// `controladdin`, declared without an ID.
    ControlAddIn,
    /// `enum`.
    Enum,
    /// `enumextension`.
    EnumExtension,
    /// `interface`, declared without an ID.
    Interface,
    /// `page`.
    Page,
    /// `pageextension`.
    PageExtension,
    /// `query`.
    Query,
    /// `record`.
    Record,
    /// `report`.
    Report,
    /// `table`.
    Table,
    /// `tableextension`.
    TableExtension,
    /// Any other kind keyword.
    Unknown,
    /// `xmlport`.
    XmlPort,
}

impl ObjectKind {
    /// Map a header keyword to its kind, case-insensitively.
    pub fn from_token(token: &str) -> Self {
        return match token.to_ascii_lowercase().as_str() {
            "codeunit" => Self::Codeunit,
            "controladdin" => Self::ControlAddIn,
            "enum" => Self::Enum,
            "enumextension" => Self::EnumExtension,
            "interface" => Self::Interface,
            "page" => Self::Page,
            "pageextension" => Self::PageExtension,
            "query" => Self::Query,
            "record" => Self::Record,
            "report" => Self::Report,
            "table" => Self::Table,
            "tableextension" => Self::TableExtension,
            "xmlport" => Self::XmlPort,
            _ => Self::Unknown,
        };
    }
}

/// Obsolete marker on an object or procedure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Obsolete {
    /// Reason text from `ObsoleteReason` or the `[Obsolete]` attribute.
    pub reason: String,
    /// Lifecycle stage.
    pub state: ObsoleteState,
}

/// Lifecycle stage of an obsolete declaration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ObsoleteState {
    /// Still compiled, scheduled for removal.
    Pending,
    /// Kept only as a tombstone.
    Removed,
}

/// One declared parameter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Parameter {
    /// Declared with a leading `var`.
    pub by_reference: bool,
    /// Full type expression as written, e.g. `Record "Sales Header" temporary`.
    pub data_type: String,
    /// The matching `param` fragment from the procedure documentation.
    pub documentation: Documentation,
    /// Display name, quotes and `var` stripped.
    pub name: String,
    /// Type qualifier after the data-type word, e.g. `Sales Header`.
    pub subtype: Option<String>,
    /// Declared `temporary`.
    pub temporary: bool,
}

/// Zero-based line and column (in characters).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct Position {
    /// Column in characters.
    pub column: usize,
    /// Line index.
    pub line: usize,
}

/// One procedure or trigger declaration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Procedure {
    /// Declared access level, `Public` when no modifier is present.
    pub access: AccessLevel,
    /// Signature text, physical lines joined by single spaces.
    pub declaration: String,
    /// Structured comment above the declaration.
    pub documentation: Documentation,
    /// Marked `[TryFunction]`.
    pub is_try: bool,
    /// `procedure` or `trigger`.
    pub kind: ProcedureKind,
    /// Line index of the first signature line.
    pub line: usize,
    /// Name with quotes removed.
    pub name: String,
    /// `[Obsolete]` marker, if any.
    pub obsolete: Option<Obsolete>,
    /// Parameters in declaration order; empty for `()`.
    pub parameters: Vec<Parameter>,
    /// Span of the signature, from its first character to the end of its last line.
    pub range: SourceRange,
    /// Return clause, if declared.
    pub return_value: Option<Return>,
    /// Category derived from the attributes above the declaration.
    pub subtype: ProcedureSubtype,
}

/// Keyword that introduced a procedure declaration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ProcedureKind {
    /// `procedure`.
    Procedure,
    /// `trigger`.
    Trigger,
}

/// Category a procedure falls into, from its attributes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProcedureSubtype {
    /// `[IntegrationEvent]`, `[BusinessEvent]` or `[InternalEvent]`.
    EventPublisher,
    /// `[EventSubscriber]`.
    EventSubscriber,
    /// No categorising attribute.
    Normal,
    /// `[Test]`.
    Test,
}

/// Return clause of a procedure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Return {
    /// Declared type expression.
    pub data_type: String,
    /// The matching `returns` fragment from the procedure documentation.
    pub documentation: Documentation,
    /// Named result variable, if the clause is `Result: Type`.
    pub name: Option<String>,
}

/// Severity attached to findings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Fails editor builds that treat errors as blocking.
    Error,
    /// Shown as a faint hint only.
    Hint,
    /// Default level.
    #[default]
    Information,
    /// Shown as a warning.
    Warning,
}

impl std::fmt::Display for Severity {
    /// Lowercase label used in terminal output.
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Self::Error => "error",
            Self::Hint => "hint",
            Self::Information => "information",
            Self::Warning => "warning",
        };
        return f.write_str(label);
    }
}

/// One declared object and everything it owns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceObject {
    /// `Access` property, `Public` by default.
    pub access: AccessLevel,
    /// Structured comment above the header.
    pub documentation: Documentation,
    /// `extends`/`implements` clause.
    pub extension: Option<ExtensionRelation>,
    /// File the object was built from; the cache key.
    pub file: PathBuf,
    /// Numeric object ID. Interfaces and control add-ins have none.
    pub id: Option<u32>,
    /// Recognised kind.
    pub kind: ObjectKind,
    /// Kind keyword as written in the header.
    pub kind_token: String,
    /// Line index of the header.
    pub line: usize,
    /// Name with quotes removed.
    pub name: String,
    /// `ObsoleteState`/`ObsoleteReason` properties.
    pub obsolete: Option<Obsolete>,
    /// Procedures and triggers in file order.
    pub procedures: Vec<Procedure>,
}

impl SourceObject {
    /// Whether `line` is the object header or the signature of one of its procedures.
    pub fn declaration_at_line(&self, line: usize) -> Option<Declared<'_>> {
        if line == self.line {
            return Some(Declared::Object(self));
        }
        return self.procedure_at_line(line).map(Declared::Procedure);
    }

    /// The first procedure declared after `line`.
    /// Relies on procedures being stored in file order.
    pub fn next_procedure_after(&self, line: usize) -> Option<&Procedure> {
        let index = self.procedures.partition_point(|p| return p.line <= line);
        return self.procedures.get(index);
    }

    /// The procedure whose signature spans `line`.
    pub fn procedure_at_line(&self, line: usize) -> Option<&Procedure> {
        return self
            .procedures
            .iter()
            .find(|p| return p.range.start.line <= line && line <= p.range.end.line);
    }
}

/// Start and end of a declaration in the file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SourceRange {
    /// Position just past the last character.
    pub end: Position,
    /// Position of the first character.
    pub start: Position,
}


