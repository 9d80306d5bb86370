//! Line classification, plus reading attributes that span several lines.
use std::sync::LazyLock;

use regex::Regex;

use crate::config::Settings;
use crate::document::SourceDocument;
use crate::signature;
use crate::types::{Obsolete, ObsoleteState, ProcedureSubtype};

/// Longest attribute, in lines, joined before giving up on it.
const MAX_ATTRIBUTE_LINES: usize = 32;

/// `[Name]` or `[Name(args)]`.
#[allow(clippy::expect_used, reason = "pattern is a compile-time constant")]
static ATTRIBUTE: LazyLock<Regex> = LazyLock::new(|| {
    return Regex::new(r"^\[\s*([A-Za-z_][A-Za-z0-9_]*)\s*(?:\((.*)\))?\s*\]$").expect("valid attribute regex");
});

/// A bare `begin` / `end` / `end;`.
#[allow(clippy::expect_used, reason = "pattern is a compile-time constant")]
static BLOCK_BOUNDARY: LazyLock<Regex> =
    LazyLock::new(|| return Regex::new(r"(?i)^\s*(?:begin|end;?)\s*$").expect("valid boundary regex"));

/// First single-quoted literal in an argument list; `''` escapes a quote.
#[allow(clippy::expect_used, reason = "pattern is a compile-time constant")]
static QUOTED_LITERAL: LazyLock<Regex> =
    LazyLock::new(|| return Regex::new(r"'((?:[^']|'')*)'").expect("valid literal regex"));

/// What the attributes above a procedure say about it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcedureTraits {
    /// `[TryFunction]` was present.
    pub is_try: bool,
    /// `[Obsolete('reason')]` was present.
    pub obsolete: Option<Obsolete>,
    /// Category from event/test attributes.
    pub subtype: Option<ProcedureSubtype>,
}

impl ProcedureTraits {
    /// Subtype, `Normal` when no categorising attribute was seen.
    pub fn subtype(&self) -> ProcedureSubtype {
        return self.subtype.unwrap_or(ProcedureSubtype::Normal);
    }
}

/// First line of the multi-line attribute whose last line is `last`.
pub fn attribute_ending_at<D: SourceDocument + ?Sized>(document: &D, last: usize) -> Option<usize> {
    let floor = last.saturating_sub(MAX_ATTRIBUTE_LINES);
    let mut index = last;
    while index > floor {
        index = index.saturating_sub(1);
        let line = document.line(index)?;
        if signature::strip_line_comment(line).trim().starts_with('[') {
            let (_, end) = read_attribute(document, index)?;
            return (end == last).then_some(index);
        }
    }
    return None;
}

/// Name and raw argument text of an attribute line.
fn attribute_parts(line: &str) -> Option<(&str, &str)> {
    let code = signature::strip_line_comment(line).trim();
    let caps = ATTRIBUTE.captures(code)?;
    let name = caps.get(1)?.as_str();
    let args = caps.get(2).map_or("", |m| return m.as_str());
    return Some((name, args));
}

/// Content of the first `'...'` literal in `text`.
pub fn first_quoted_literal(text: &str) -> Option<String> {
    let caps = QUOTED_LITERAL.captures(text)?;
    return Some(caps.get(1)?.as_str().replace("''", "'"));
}

/// Whether the line is a complete attribute annotation such as `[EventSubscriber(...)]`.
pub fn is_attribute(line: &str) -> bool {
    return attribute_parts(line).is_some();
}

/// Whether the line is empty or whitespace-only.
pub fn is_blank(line: &str) -> bool {
    return line.trim().is_empty();
}

/// Whether the line is a bare `begin`/`end;`, i.e. the edge of an executable body.
/// The keyword must be alone on the line, so comments mentioning it never match.
pub fn is_block_boundary(line: &str) -> bool {
    return BLOCK_BOUNDARY.is_match(signature::strip_line_comment(line));
}

/// Whether the line is a plain `//` comment (not a structured `///` one).
pub fn is_inline_comment(line: &str) -> bool {
    let trimmed = line.trim_start();
    return trimmed.starts_with("//") && !trimmed.starts_with("///");
}

/// Whether the line parses as an object header with a kind keyword.
pub fn is_object_header(line: &str) -> bool {
    return signature::parse_object_header(line).is_some_and(|h| return !h.kind_token.is_empty());
}

/// Whether `line` is a procedure header the caller is interested in.
///
/// `attributes` is the run of attributes directly above the header. An
/// attribute that categorises the procedure decides its subtype, and the
/// settings' subtype allow-list then decides whether that category is
/// recognised at all.
pub fn is_procedure_header<S: AsRef<str>>(line: &str, attributes: &[S], settings: &Settings) -> bool {
    if signature::parse_procedure_header(line).is_none() {
        return false;
    }
    let traits = procedure_traits(attributes);
    return settings.allows_procedure(traits.subtype(), traits.is_try);
}

/// Whether the line starts with the `///` structured-comment marker.
pub fn is_structured_comment(line: &str) -> bool {
    return line.trim_start().starts_with("///");
}

/// Fold the attributes above a procedure into its traits.
/// Entries that are not attributes are ignored.
pub fn procedure_traits<S: AsRef<str>>(attributes: &[S]) -> ProcedureTraits {
    let mut traits = ProcedureTraits::default();
    for attribute in attributes {
        let Some((name, args)) = attribute_parts(attribute.as_ref()) else {
            continue;
        };
        match name.to_ascii_lowercase().as_str() {
            "businessevent" | "integrationevent" | "internalevent" => {
                traits.subtype = Some(ProcedureSubtype::EventPublisher);
            },
            "eventsubscriber" => traits.subtype = Some(ProcedureSubtype::EventSubscriber),
            "obsolete" => {
                traits.obsolete = Some(Obsolete {
                    reason: first_quoted_literal(args).unwrap_or_default(),
                    state: ObsoleteState::Pending,
                });
            },
            "test" => traits.subtype = Some(ProcedureSubtype::Test),
            "tryfunction" => traits.is_try = true,
            _ => {},
        }
    }
    return traits;
}

/// Read the attribute opening on line `first`.
///
/// Lines are joined with single spaces until the square brackets balance
/// outside quotes. Returns the attribute as one line and the index of its
/// last line, or `None` when `first` does not open a complete attribute.
pub fn read_attribute<D: SourceDocument + ?Sized>(document: &D, first: usize) -> Option<(String, usize)> {
    if !signature::strip_line_comment(document.line(first)?).trim().starts_with('[') {
        return None;
    }
    let last_allowed = first.saturating_add(MAX_ATTRIBUTE_LINES);
    let mut text = String::new();
    let mut depth = 0_usize;
    let mut quote: Option<char> = None;
    let mut index = first;

    loop {
        let line = document.line(index)?;
        if index > first && (is_block_boundary(line) || is_structured_comment(line)) {
            return None;
        }
        let piece = signature::strip_line_comment(line).trim();
        if !piece.is_empty() {
            if !text.is_empty() {
                text.push(' ');
            }
            text.push_str(piece);
        }
        for ch in piece.chars() {
            match (quote, ch) {
                (Some(open), _) if ch == open => quote = None,
                (Some(_), _) => {},
                (None, '\'' | '"') => quote = Some(ch),
                (None, '[') => depth = depth.saturating_add(1),
                (None, ']') => depth = depth.saturating_sub(1),
                (None, _) => {},
            }
        }
        if depth == 0 {
            return is_attribute(&text).then_some((text, index));
        }
        if index >= last_allowed {
            return None;
        }
        index = index.saturating_add(1);
    }
}
