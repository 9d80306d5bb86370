//! Single-pass construction of a [`SourceObject`] from a document.

use std::sync::LazyLock;

use regex::Regex;

use crate::classify::{self, ProcedureTraits};
use crate::config::Settings;
use crate::docblock::{self, DocTags};
use crate::document::SourceDocument;
use crate::signature::{self, ObjectHeader, ProcedureHeader};
use crate::types::{
    AccessLevel, Documentation, Obsolete, ObsoleteState, Parameter, Position, Procedure, Return,
    SourceObject, SourceRange,
};

/// Longest multi-line signature accumulated before giving up on it.
const MAX_SIGNATURE_LINES: usize = 64;

/// `Access = ...;`, `ObsoleteState = ...;`, `ObsoleteReason = ...;` at object level.
#[allow(clippy::expect_used, reason = "pattern is a compile-time constant")]
static OBJECT_PROPERTY: LazyLock<Regex> = LazyLock::new(|| {
    return Regex::new(r"(?i)^\s*(Access|ObsoleteState|ObsoleteReason)\s*=\s*(.+?)\s*;?\s*$")
        .expect("valid property regex");
});

/// Object-level properties seen before the first procedure.
#[derive(Default)]
struct ObjectProperties {
    /// `Access` value.
    access: Option<AccessLevel>,
    /// `ObsoleteReason` literal.
    obsolete_reason: Option<String>,
    /// `ObsoleteState` value; `No` leaves it unset.
    obsolete_state: Option<ObsoleteState>,
}

impl ObjectProperties {
    /// Record the property on `line`, if it is one of ours.
    fn absorb(&mut self, line: &str) {
        let Some(caps) = OBJECT_PROPERTY.captures(signature::strip_line_comment(line)) else {
            return;
        };
        let (Some(key), Some(value)) = (caps.get(1), caps.get(2)) else {
            return;
        };
        let value = value.as_str();
        match key.as_str().to_ascii_lowercase().as_str() {
            "access" => self.access = AccessLevel::from_token(value),
            "obsoletereason" => self.obsolete_reason = classify::first_quoted_literal(value),
            "obsoletestate" => {
                self.obsolete_state = match value.to_ascii_lowercase().as_str() {
                    "pending" => Some(ObsoleteState::Pending),
                    "removed" => Some(ObsoleteState::Removed),
                    _ => None,
                };
            },
            _ => {},
        }
    }

    /// Write the collected properties onto the object.
    fn apply(self, object: &mut SourceObject) {
        if let Some(access) = self.access {
            object.access = access;
        }
        if let Some(state) = self.obsolete_state {
            object.obsolete = Some(Obsolete {
                reason: self.obsolete_reason.unwrap_or_default(),
                state,
            });
        }
    }
}

/// Join a signature that may span several physical lines into one logical line.
/// Returns the text and the index of the last line consumed.
pub(crate) fn accumulate_signature<D: SourceDocument + ?Sized>(document: &D, first: usize) -> (String, usize) {
    let mut text = document
        .line(first)
        .map(|l| return signature::strip_line_comment(l).trim().to_string())
        .unwrap_or_default();
    let mut last = first;

    while !signature::parameters_closed(&text) && last.saturating_sub(first) < MAX_SIGNATURE_LINES {
        let next_index = last.saturating_add(1);
        let Some(next) = document.line(next_index) else {
            break;
        };
        if classify::is_block_boundary(next) {
            break;
        }
        let piece = signature::strip_line_comment(next).trim();
        if !piece.is_empty() {
            text.push(' ');
            text.push_str(piece);
        }
        last = next_index;
    }

    return (text, last);
}

/// Build the object declared in `document`.
///
/// Returns `None` when the text holds no object header, or when a bare
/// `begin`/`end` shows up before any declaration (a body-only fragment).
/// Only the first object of a file is modelled; scanning stops when its
/// closing brace is reached. Procedures filtered out by the settings'
/// subtype allow-list are skipped entirely.
pub fn build_object<D: SourceDocument + ?Sized>(document: &D, settings: &Settings) -> Option<SourceObject> {
    let mut object: Option<SourceObject> = None;
    let mut properties = ObjectProperties::default();
    let mut attributes: Vec<String> = Vec::new();
    let mut depth = 0_usize;
    let mut body_opened = false;
    let mut declaration_seen = false;
    let mut in_block_comment = false;
    let mut index = 0_usize;

    while index < document.line_count() {
        let Some(line) = document.line(index) else {
            break;
        };
        let current = index;
        index = index.saturating_add(1);
        let trimmed = line.trim();

        if in_block_comment {
            in_block_comment = !trimmed.contains("*/");
            continue;
        }
        if trimmed.starts_with("/*") {
            in_block_comment = !trimmed.contains("*/");
            continue;
        }
        if classify::is_blank(line) || classify::is_inline_comment(line) || classify::is_structured_comment(line) {
            continue;
        }
        if let Some((attribute, last)) = classify::read_attribute(document, current) {
            attributes.push(attribute);
            index = last.saturating_add(1);
            continue;
        }

        if signature::is_procedure_start(line) {
            let (text, last) = accumulate_signature(document, current);
            if let Some(header) = signature::parse_procedure_header(&text) {
                declaration_seen = true;
                index = last.saturating_add(1);
                if let Some(obj) = object.as_mut()
                    && classify::is_procedure_header(&text, &attributes, settings)
                {
                    let traits = classify::procedure_traits(&attributes);
                    let procedure = build_procedure(document, current, last, text, &header, traits);
                    obj.procedures.push(procedure);
                }
                attributes.clear();
                continue;
            }
        }
        attributes.clear();

        if let Some(obj) = object.as_ref() {
            if depth == 1 && obj.procedures.is_empty() {
                properties.absorb(trimmed);
            }
            track_braces(line, &mut depth, &mut body_opened);
            if body_opened && depth == 0 {
                break;
            }
            continue;
        }

        if !declaration_seen && classify::is_block_boundary(line) {
            tracing::debug!("{}: body before any declaration, not an object", document.path().display());
            return None;
        }
        if let Some(header) = signature::parse_object_header(line) {
            declaration_seen = true;
            object = Some(open_object(document, current, header));
            track_braces(line, &mut depth, &mut body_opened);
        }
    }

    let mut object = object?;
    properties.apply(&mut object);
    return Some(object);
}

/// Assemble a procedure and its parameters from a parsed header.
fn build_procedure<D: SourceDocument + ?Sized>(
    document: &D,
    first: usize,
    last: usize,
    declaration: String,
    header: &ProcedureHeader,
    traits: ProcedureTraits,
) -> Procedure {
    let documentation = docblock::read_preceding_documentation(document, first);
    let tags = if documentation.exists { docblock::parse_tags(&documentation.raw) } else { DocTags::default() };

    let parameters = header
        .parameters()
        .into_iter()
        .map(|p| {
            let documentation = tags
                .param(&p.name)
                .map_or_else(Documentation::missing, |t| return Documentation::present(t.markup.clone()));
            return Parameter {
                by_reference: p.by_reference,
                data_type: p.data_type,
                documentation,
                name: p.name,
                subtype: p.subtype,
                temporary: p.temporary,
            };
        })
        .collect();

    let return_value = header.return_clause().map(|r| {
        let documentation = tags
            .returns
            .as_ref()
            .map_or_else(Documentation::missing, |t| return Documentation::present(t.markup.clone()));
        return Return { data_type: r.data_type, documentation, name: r.name };
    });

    let first_line = document.line(first).unwrap_or_default();
    let last_line = document.line(last).unwrap_or_default();
    let range = SourceRange {
        end: Position { column: last_line.trim_end().chars().count(), line: last },
        start: Position { column: leading_whitespace(first_line), line: first },
    };

    let subtype = traits.subtype();
    return Procedure {
        access: header.access.unwrap_or(AccessLevel::Public),
        declaration,
        documentation,
        is_try: traits.is_try,
        kind: header.kind,
        line: first,
        name: header.name.clone(),
        obsolete: traits.obsolete,
        parameters,
        range,
        return_value,
        subtype,
    };
}

/// Number of leading whitespace characters.
fn leading_whitespace(line: &str) -> usize {
    return line.chars().take_while(|c| return c.is_whitespace()).count();
}

/// Start an object from its header line.
fn open_object<D: SourceDocument + ?Sized>(document: &D, line: usize, header: ObjectHeader) -> SourceObject {
    return SourceObject {
        access: AccessLevel::Public,
        documentation: docblock::read_preceding_documentation(document, line),
        extension: header.extension,
        file: document.path().to_path_buf(),
        id: header.id,
        kind: header.kind,
        kind_token: header.kind_token,
        line,
        name: header.name,
        obsolete: None,
        procedures: Vec::new(),
    };
}

/// Update the brace depth with the braces on `line` that sit outside strings and comments.
fn track_braces(line: &str, depth: &mut usize, body_opened: &mut bool) {
    let code = signature::strip_line_comment(line);
    let mut in_double = false;
    let mut in_single = false;
    for ch in code.chars() {
        match ch {
            '"' if !in_single => in_double = !in_double,
            '\'' if !in_double => in_single = !in_single,
            '{' if !in_double && !in_single => {
                *depth = depth.saturating_add(1);
                *body_opened = true;
            },
            '}' if !in_double && !in_single => *depth = depth.saturating_sub(1),
            _ => {},
        }
    }
}
