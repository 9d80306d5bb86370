//! Pattern-based extraction of object and procedure headers.
//!
//! Declarations in the analysed language are line-oriented and never nest,
//! so a handful of regexes plus a quote-aware scanner for parameter lists
//! recover every field the model needs without a grammar.

use std::sync::LazyLock;

use regex::Regex;

use crate::types::{AccessLevel, ExtensionKind, ExtensionRelation, ObjectKind, ProcedureKind};

/// `<kind> <id> <name> [extends|implements <target>] [{]`
#[allow(clippy::expect_used, reason = "pattern is a compile-time constant")]
static OBJECT_WITH_ID: LazyLock<Regex> = LazyLock::new(|| {
    return Regex::new(
        r#"(?i)^\s*([a-z][a-z0-9]*)\s+(\d+)\s+("(?:[^"]|"")+"|[a-z_][a-z0-9_]*)(?:\s+(extends|implements)\s+(.+?))?\s*(?:\{.*)?$"#,
    )
    .expect("valid object header regex");
});

/// `<kind> <name> [extends|implements <target>] [{]` for kinds without an ID.
#[allow(clippy::expect_used, reason = "pattern is a compile-time constant")]
static OBJECT_WITHOUT_ID: LazyLock<Regex> = LazyLock::new(|| {
    return Regex::new(
        r#"(?i)^\s*([a-z][a-z0-9]*)\s+("(?:[^"]|"")+"|[a-z_][a-z0-9_]*)(?:\s+(extends|implements)\s+(.+?))?\s*(?:\{.*)?$"#,
    )
    .expect("valid object header regex");
});

/// Everything up to and including the opening parenthesis of a procedure header.
#[allow(clippy::expect_used, reason = "pattern is a compile-time constant")]
static PROCEDURE_HEAD: LazyLock<Regex> = LazyLock::new(|| {
    return Regex::new(
        r#"(?i)^\s*(?:(local|internal|protected)\s+)?(procedure|trigger)\s+("(?:[^"]|"")+"|[a-z_][a-z0-9_]*)\s*\("#,
    )
    .expect("valid procedure header regex");
});

/// `: Type` or `Name: Type` after the parameter list.
#[allow(clippy::expect_used, reason = "pattern is a compile-time constant")]
static RETURN_CLAUSE: LazyLock<Regex> = LazyLock::new(|| {
    return Regex::new(r#"(?i)^(?:("(?:[^"]|"")+"|[a-z_][a-z0-9_]*)\s*)?:\s*(.+?)$"#)
        .expect("valid return clause regex");
});

/// Trailing `temporary` on a record type.
#[allow(clippy::expect_used, reason = "pattern is a compile-time constant")]
static TEMPORARY_SUFFIX: LazyLock<Regex> =
    LazyLock::new(|| return Regex::new(r"(?i)^(.*?)\s+temporary$").expect("valid temporary regex"));

/// Leading `var` on a parameter name.
#[allow(clippy::expect_used, reason = "pattern is a compile-time constant")]
static VAR_PREFIX: LazyLock<Regex> =
    LazyLock::new(|| return Regex::new(r"(?i)^var\s+(.+)$").expect("valid var regex"));

/// Fields recovered from an object header line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectHeader {
    /// `extends`/`implements` clause.
    pub extension: Option<ExtensionRelation>,
    /// Numeric ID, absent for interfaces and control add-ins.
    pub id: Option<u32>,
    /// Recognised kind, `Unknown` for keywords the model does not list.
    pub kind: ObjectKind,
    /// Kind keyword exactly as written.
    pub kind_token: String,
    /// Name with quotes removed.
    pub name: String,
}

/// One parameter split out of a raw parameter list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedParameter {
    /// Leading `var` was present.
    pub by_reference: bool,
    /// Type expression as written, trimmed.
    pub data_type: String,
    /// Name with `var` and quotes removed.
    pub name: String,
    /// Type qualifier after the data-type word.
    pub subtype: Option<String>,
    /// Trailing `temporary` was present.
    pub temporary: bool,
}

/// A parsed `: Type` / `Name: Type` clause.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedReturn {
    /// Type expression.
    pub data_type: String,
    /// Named result variable.
    pub name: Option<String>,
}

/// Fields recovered from a (possibly multi-line) procedure header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcedureHeader {
    /// Explicit access modifier, if any.
    pub access: Option<AccessLevel>,
    /// `procedure` or `trigger`.
    pub kind: ProcedureKind,
    /// Name with quotes removed.
    pub name: String,
    /// Text between the balanced parentheses.
    pub raw_parameters: String,
    /// Text after the closing parenthesis, e.g. `: Boolean`, when it is a return clause.
    pub raw_return: Option<String>,
}

impl ProcedureHeader {
    /// Split the raw parameter list into individual parameters.
    pub fn parameters(&self) -> Vec<ParsedParameter> {
        return split_parameters(&self.raw_parameters);
    }

    /// Parse the raw return clause.
    pub fn return_clause(&self) -> Option<ParsedReturn> {
        return self.raw_return.as_deref().and_then(parse_return_clause);
    }
}

/// Build the extension relation from the keyword and target captures.
fn extension_from(
    keyword: Option<regex::Match<'_>>,
    target: Option<regex::Match<'_>>,
) -> Option<ExtensionRelation> {
    let keyword = keyword?.as_str().to_ascii_lowercase();
    let target = target?.as_str().trim();
    let kind = if keyword == "extends" { ExtensionKind::Extends } else { ExtensionKind::Implements };
    return Some(ExtensionRelation { kind, target: target.to_string() });
}

/// Byte index of the parenthesis closing the one opened just before `from`.
/// Quoted text is skipped, so `Rec: Record "A (B)"` does not confuse the count.
fn find_closing_parenthesis(text: &str, from: usize) -> Option<usize> {
    let mut depth = 1_usize;
    let mut in_double = false;
    let mut in_single = false;
    for (offset, ch) in text.get(from..)?.char_indices() {
        match ch {
            '"' if !in_single => in_double = !in_double,
            '\'' if !in_double => in_single = !in_single,
            '(' if !in_double && !in_single => depth = depth.saturating_add(1),
            ')' if !in_double && !in_single => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    return Some(from.saturating_add(offset));
                }
            },
            _ => {},
        }
    }
    return None;
}

/// `procedure` and `trigger` start declarations of their own, never objects.
fn is_procedure_keyword(token: &str) -> bool {
    return token.eq_ignore_ascii_case("procedure") || token.eq_ignore_ascii_case("trigger");
}

/// Whether `text` starts a procedure or trigger header, complete or not.
pub fn is_procedure_start(text: &str) -> bool {
    return PROCEDURE_HEAD.is_match(strip_line_comment(text));
}

/// Whether the parameter list opened in `text` has been closed.
/// Used to decide when a multi-line signature is complete.
pub fn parameters_closed(text: &str) -> bool {
    let Some(head) = PROCEDURE_HEAD.find(text) else {
        return false;
    };
    return find_closing_parenthesis(text, head.end()).is_some();
}

/// Parse an object header line. Returns `None` when the line is not one.
///
/// The ID-bearing shape is tried first; the ID-less shape (interfaces,
/// control add-ins) is only a fallback, so `table 50100 X` never reads as a
/// table named `50100`.
pub fn parse_object_header(text: &str) -> Option<ObjectHeader> {
    let code = strip_line_comment(text);

    if let Some(caps) = OBJECT_WITH_ID.captures(code) {
        let kind_token = caps.get(1)?.as_str();
        if is_procedure_keyword(kind_token) {
            return None;
        }
        let id = caps.get(2)?.as_str().parse::<u32>().ok()?;
        return Some(ObjectHeader {
            extension: extension_from(caps.get(4), caps.get(5)),
            id: Some(id),
            kind: ObjectKind::from_token(kind_token),
            kind_token: kind_token.to_string(),
            name: unquote(caps.get(3)?.as_str()),
        });
    }

    let caps = OBJECT_WITHOUT_ID.captures(code)?;
    let kind_token = caps.get(1)?.as_str();
    if is_procedure_keyword(kind_token) {
        return None;
    }
    return Some(ObjectHeader {
        extension: extension_from(caps.get(3), caps.get(4)),
        id: None,
        kind: ObjectKind::from_token(kind_token),
        kind_token: kind_token.to_string(),
        name: unquote(caps.get(2)?.as_str()),
    });
}

/// Split one `name: type` piece of a parameter list.
fn parse_parameter(piece: &str) -> Option<ParsedParameter> {
    let piece = piece.trim();
    if piece.is_empty() {
        return None;
    }

    let (raw_name, raw_type) = match split_top_level(piece, ':').as_slice() {
        [name] => (*name, ""),
        [name, ..] => {
            let offset = name.len().saturating_add(1);
            (*name, piece.get(offset..).unwrap_or("").trim_start())
        },
        [] => return None,
    };

    let raw_name = raw_name.trim();
    let (by_reference, name) = match VAR_PREFIX.captures(raw_name).and_then(|c| return c.get(1)) {
        Some(rest) => (true, unquote(rest.as_str().trim())),
        None => (false, unquote(raw_name)),
    };

    let data_type = raw_type.trim().to_string();
    let (temporary, base_type) = match TEMPORARY_SUFFIX.captures(&data_type).and_then(|c| return c.get(1)) {
        Some(base) => (true, base.as_str().trim().to_string()),
        None => (false, data_type.clone()),
    };
    let subtype = base_type
        .split_once(char::is_whitespace)
        .map(|(_, rest)| return unquote(rest.trim()))
        .filter(|s| return !s.is_empty());

    return Some(ParsedParameter { by_reference, data_type, name, subtype, temporary });
}

/// Parse a procedure or trigger header. `text` is one logical line; callers
/// join multi-line signatures first. Returns `None` when the text is not a
/// header or its parameter list is unbalanced.
pub fn parse_procedure_header(text: &str) -> Option<ProcedureHeader> {
    let code = strip_line_comment(text);
    let caps = PROCEDURE_HEAD.captures(code)?;
    let open_end = caps.get(0)?.end();
    let close = find_closing_parenthesis(code, open_end)?;

    let access = caps.get(1).and_then(|m| return AccessLevel::from_token(m.as_str()));
    let kind = if caps.get(2)?.as_str().eq_ignore_ascii_case("trigger") {
        ProcedureKind::Trigger
    } else {
        ProcedureKind::Procedure
    };

    let raw_parameters = code.get(open_end..close)?.trim().to_string();
    let tail = code.get(close.saturating_add(1)..)?.trim();
    let tail = tail.strip_suffix(';').unwrap_or(tail).trim();
    let raw_return = (!tail.is_empty() && RETURN_CLAUSE.is_match(tail)).then(|| return tail.to_string());

    return Some(ProcedureHeader {
        access,
        kind,
        name: unquote(caps.get(3)?.as_str()),
        raw_parameters,
        raw_return,
    });
}

/// Parse `: Type` or `Name: Type`.
pub fn parse_return_clause(raw: &str) -> Option<ParsedReturn> {
    let caps = RETURN_CLAUSE.captures(raw.trim())?;
    let data_type = caps.get(2)?.as_str().trim().to_string();
    if data_type.is_empty() {
        return None;
    }
    return Some(ParsedReturn {
        data_type,
        name: caps.get(1).map(|m| return unquote(m.as_str())),
    });
}

/// Split a raw parameter list on top-level `;`. An empty list yields no parameters.
pub fn split_parameters(raw: &str) -> Vec<ParsedParameter> {
    return split_top_level(raw, ';').into_iter().filter_map(parse_parameter).collect();
}

/// Split on `separator` outside quotes, parentheses and brackets.
pub fn split_top_level(text: &str, separator: char) -> Vec<&str> {
    let mut pieces = Vec::new();
    let mut depth = 0_usize;
    let mut in_double = false;
    let mut in_single = false;
    let mut start = 0_usize;

    for (index, ch) in text.char_indices() {
        match ch {
            '"' if !in_single => in_double = !in_double,
            '\'' if !in_double => in_single = !in_single,
            '(' | '[' if !in_double && !in_single => depth = depth.saturating_add(1),
            ')' | ']' if !in_double && !in_single => depth = depth.saturating_sub(1),
            c if c == separator && depth == 0 && !in_double && !in_single => {
                pieces.push(text.get(start..index).unwrap_or(""));
                start = index.saturating_add(c.len_utf8());
            },
            _ => {},
        }
    }
    pieces.push(text.get(start..).unwrap_or(""));

    if pieces.iter().all(|p| return p.trim().is_empty()) {
        return Vec::new();
    }
    return pieces;
}

/// Drop a trailing `//` comment that is not inside a quoted string.
pub fn strip_line_comment(line: &str) -> &str {
    let mut in_double = false;
    let mut in_single = false;
    let mut previous_slash = false;

    for (index, ch) in line.char_indices() {
        match ch {
            '"' if !in_single => in_double = !in_double,
            '\'' if !in_double => in_single = !in_single,
            '/' if !in_double && !in_single => {
                if previous_slash {
                    return line.get(..index.saturating_sub(1)).unwrap_or(line);
                }
                previous_slash = true;
                continue;
            },
            _ => {},
        }
        previous_slash = false;
    }
    return line;
}

/// Remove surrounding double quotes and collapse escaped `""` pairs.
pub fn unquote(name: &str) -> String {
    let name = name.trim();
    if name.len() >= 2 && name.starts_with('"') && name.ends_with('"') {
        let inner = name.get(1..name.len().saturating_sub(1)).unwrap_or("");
        return inner.replace("\"\"", "\"");
    }
    return name.to_string();
}

#[cfg(test)]
#[allow(clippy::missing_panics_doc, reason = "tests")]
#[allow(clippy::unwrap_used, reason = "tests")]
mod tests {
    use super::*;

    #[test]
    fn object_header_with_id() {
        let header = parse_object_header(r#"table 50100 "My Table""#).unwrap();
        assert_eq!(header.kind, ObjectKind::Table);
        assert_eq!(header.id, Some(50100));
        assert_eq!(header.name, "My Table");
        assert_eq!(header.extension, None);
    }

    #[test]
    fn object_header_keeps_unknown_kinds() {
        let header = parse_object_header("permissionset 50100 AllPerms").unwrap();
        assert_eq!(header.kind, ObjectKind::Unknown);
        assert_eq!(header.kind_token, "permissionset");
        assert_eq!(header.name, "AllPerms");
    }

    #[test]
    fn object_header_with_extension_and_brace() {
        let header = parse_object_header(r#"tableextension 50101 "Cust. Ext" extends Customer {"#).unwrap();
        assert_eq!(header.kind, ObjectKind::TableExtension);
        let extension = header.extension.unwrap();
        assert_eq!(extension.kind, ExtensionKind::Extends);
        assert_eq!(extension.target, "Customer");
    }

    #[test]
    fn object_header_with_implements_list() {
        let header = parse_object_header(r#"codeunit 50102 Impl implements "I Foo", IBar"#).unwrap();
        let extension = header.extension.unwrap();
        assert_eq!(extension.kind, ExtensionKind::Implements);
        assert_eq!(extension.targets(), vec!["I Foo".to_string(), "IBar".to_string()]);
    }

    #[test]
    fn object_header_without_id() {
        let header = parse_object_header(r#"interface "IPayment Provider""#).unwrap();
        assert_eq!(header.kind, ObjectKind::Interface);
        assert_eq!(header.id, None);
        assert_eq!(header.name, "IPayment Provider");
    }

    #[test]
    fn quoted_name_with_escaped_quotes() {
        let header = parse_object_header(r#"codeunit 50103 "Say ""Hi"" Mgt.""#).unwrap();
        assert_eq!(header.name, r#"Say "Hi" Mgt."#);
    }

    #[test]
    fn quoted_name_containing_extension_keyword() {
        let header = parse_object_header(r#"table 50104 "Item extends Things""#).unwrap();
        assert_eq!(header.name, "Item extends Things");
        assert_eq!(header.extension, None);
    }

    #[test]
    fn statements_are_not_object_headers() {
        assert!(parse_object_header("procedure DoWork").is_none());
        assert!(parse_object_header("exit(true);").is_none());
        assert!(parse_object_header("namespace Contoso.Sales;").is_none());
        assert!(parse_object_header("Customer: Record Customer;").is_none());
    }

    #[test]
    fn procedure_header_fields() {
        let header = parse_procedure_header("    local procedure DoWork(var Input: Integer): Boolean").unwrap();
        assert_eq!(header.access, Some(AccessLevel::Local));
        assert_eq!(header.kind, ProcedureKind::Procedure);
        assert_eq!(header.name, "DoWork");
        assert_eq!(header.raw_parameters, "var Input: Integer");
        assert_eq!(header.raw_return.as_deref(), Some(": Boolean"));
    }

    #[test]
    fn procedure_header_named_return_and_quoted_name() {
        let header = parse_procedure_header(r#"procedure "Get Amount"() Result: Decimal;"#).unwrap();
        assert_eq!(header.name, "Get Amount");
        let ret = header.return_clause().unwrap();
        assert_eq!(ret.name.as_deref(), Some("Result"));
        assert_eq!(ret.data_type, "Decimal");
    }

    #[test]
    fn trigger_header() {
        let header = parse_procedure_header("trigger OnRun()").unwrap();
        assert_eq!(header.kind, ProcedureKind::Trigger);
        assert!(header.parameters().is_empty());
        assert_eq!(header.raw_return, None);
    }

    #[test]
    fn parenthesis_inside_quoted_type() {
        let header = parse_procedure_header(r#"procedure Post(Rec: Record "Sales (Temp)"; Qty: Decimal)"#).unwrap();
        let params = header.parameters();
        assert_eq!(params.len(), 2);
        assert_eq!(params[0].data_type, r#"Record "Sales (Temp)""#);
        assert_eq!(params[0].subtype.as_deref(), Some("Sales (Temp)"));
    }

    #[test]
    fn unbalanced_header_is_not_parsed() {
        assert!(parse_procedure_header("procedure DoWork(A: Integer;").is_none());
        assert!(!parameters_closed("procedure DoWork(A: Integer;"));
        assert!(parameters_closed("procedure DoWork(A: Integer; B: Text)"));
    }

    #[test]
    fn splits_var_and_temporary_parameters() {
        let params = split_parameters(r#"var "Sales Line": Record "Sales Line" temporary; Code: Code[20]"#);
        assert_eq!(params.len(), 2);
        assert!(params[0].by_reference);
        assert_eq!(params[0].name, "Sales Line");
        assert!(params[0].temporary);
        assert_eq!(params[0].subtype.as_deref(), Some("Sales Line"));
        assert!(!params[1].by_reference);
        assert_eq!(params[1].data_type, "Code[20]");
        assert_eq!(params[1].subtype, None);
    }

    #[test]
    fn empty_parameter_list_yields_nothing() {
        assert!(split_parameters("").is_empty());
        assert!(split_parameters("   ").is_empty());
    }

    #[test]
    fn line_comment_outside_quotes_is_stripped() {
        assert_eq!(strip_line_comment("procedure A() // note"), "procedure A() ");
        assert_eq!(strip_line_comment("Url := 'http://x';"), "Url := 'http://x';");
    }
}
