//! Documentation skeletons for object and procedure headers.
//!
//! Every free-text body is wrapped in a numbered `${n:default}` placeholder.
//! Numbering starts at 1 and advances once per tag: summary, then each
//! parameter in declared order, then the return value.

use crate::builder;
use crate::classify;
use crate::document::SourceDocument;
use crate::signature::{self, ObjectHeader, ProcedureHeader};
use crate::types::{ObjectKind, Position};

/// Suffix shared by the extension object kinds' keywords.
const EXTENSION_SUFFIX: &str = "extension";

/// A header the synthesizer can document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Declaration {
    /// An object header.
    Object(ObjectHeader),
    /// A procedure or trigger header.
    Procedure(ProcedureHeader),
}

/// Text that replaces the `///` line the cursor sits on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snippet {
    /// Zero-based line to replace.
    pub line: usize,
    /// Replacement, one `///` line per template line, indented like the cursor line.
    pub text: String,
}

/// Accumulates template lines and hands out placeholder indices.
struct Template {
    /// Lines without the `///` marker.
    lines: Vec<String>,
    /// Next placeholder index.
    next_index: usize,
}

impl Template {
    /// Empty template; the first placeholder is `${1:...}`.
    fn new() -> Self {
        return Self { lines: Vec::new(), next_index: 1 };
    }

    /// Wrap `default_text` in the next placeholder.
    fn placeholder(&mut self, default_text: &str) -> String {
        let index = self.next_index;
        self.next_index = self.next_index.saturating_add(1);
        return format!("${{{index}:{}}}", escape_placeholder(&escape_markup(default_text)));
    }

    /// Add a `summary` tag spanning three lines.
    fn push_summary(&mut self, default_text: &str) {
        let body = self.placeholder(default_text);
        self.lines.push("<summary>".to_string());
        self.lines.push(body);
        self.lines.push("</summary>".to_string());
    }

    /// Render with `///` markers and the given indentation.
    fn render(&self, indent: &str) -> String {
        return self
            .lines
            .iter()
            .map(|l| return format!("{indent}/// {l}"))
            .collect::<Vec<_>>()
            .join("\n");
    }
}

/// Escape characters that would break the markup.
fn escape_markup(text: &str) -> String {
    return text
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;");
}

/// Escape characters with meaning inside a `${n:...}` placeholder.
fn escape_placeholder(text: &str) -> String {
    return text.replace('\\', "\\\\").replace('$', "\\$").replace('}', "\\}");
}

/// Prefix every line of a rendered template with `indent`.
fn indent_lines(text: &str, indent: &str) -> String {
    return text.lines().map(|l| return format!("{indent}{l}")).collect::<Vec<_>>().join("\n");
}

/// Human label for an object kind: `codeunit` → `Codeunit`,
/// `tableextension` → `Table extension`.
fn kind_label(header: &ObjectHeader) -> String {
    let token = header.kind_token.to_ascii_lowercase();
    let is_extension = matches!(
        header.kind,
        ObjectKind::EnumExtension | ObjectKind::PageExtension | ObjectKind::TableExtension
    ) || (token.len() > EXTENSION_SUFFIX.len() && token.ends_with(EXTENSION_SUFFIX));

    if is_extension {
        let base = token.strip_suffix(EXTENSION_SUFFIX).unwrap_or(&token);
        return format!("{} extension", title_case(base));
    }
    return title_case(&token);
}

/// Parse a logical line as a procedure header, else as an object header.
pub fn parse_declaration(text: &str) -> Option<Declaration> {
    if let Some(header) = signature::parse_procedure_header(text) {
        return Some(Declaration::Procedure(header));
    }
    return signature::parse_object_header(text).map(Declaration::Object);
}

/// Skeleton for any declaration.
pub fn synthesize(declaration: &Declaration) -> String {
    return match declaration {
        Declaration::Object(header) => synthesize_object(header),
        Declaration::Procedure(header) => synthesize_procedure(header),
    };
}

/// Skeleton for the declaration following a bare `///` cursor line.
///
/// Returns `None` unless the cursor line is exactly `///` (after trimming),
/// the line above it is not already documentation, and the next line after
/// any blank or attribute lines is an object or procedure header.
pub fn synthesize_at<D: SourceDocument + ?Sized>(document: &D, cursor: Position) -> Option<Snippet> {
    let line = document.line(cursor.line)?;
    if line.trim() != "///" {
        return None;
    }
    if let Some(above) = cursor.line.checked_sub(1).and_then(|i| return document.line(i))
        && classify::is_structured_comment(above)
    {
        return None;
    }

    let mut index = cursor.line.saturating_add(1);
    while let Some(next) = document.line(index) {
        if let Some((_, last)) = classify::read_attribute(document, index) {
            index = last.saturating_add(1);
            continue;
        }
        if !classify::is_blank(next) {
            break;
        }
        index = index.saturating_add(1);
    }

    let next = document.line(index)?;
    let text = if signature::is_procedure_start(next) {
        builder::accumulate_signature(document, index).0
    } else if classify::is_object_header(next) {
        next.to_string()
    } else {
        return None;
    };

    let declaration = parse_declaration(&text)?;
    let indent: String = line.chars().take_while(|c| return c.is_whitespace()).collect();
    return Some(Snippet {
        line: cursor.line,
        text: indent_lines(&synthesize(&declaration), &indent),
    });
}

/// Skeleton for an object header: one summary naming kind, name and ID.
pub fn synthesize_object(header: &ObjectHeader) -> String {
    let id = header.id.map(|id| return format!(" (ID {id})")).unwrap_or_default();
    let summary = format!("{} {}{id}.", kind_label(header), header.name);

    let mut template = Template::new();
    template.push_summary(&summary);
    return template.render("");
}

/// Skeleton for a procedure header: summary, one `param` per parameter, `returns` if declared.
pub fn synthesize_procedure(header: &ProcedureHeader) -> String {
    let mut template = Template::new();
    template.push_summary(&format!("{}.", header.name));

    for parameter in header.parameters() {
        let body = template.placeholder(&format!("{}.", parameter.data_type));
        template
            .lines
            .push(format!("<param name=\"{}\">{body}</param>", escape_markup(&parameter.name)));
    }

    if let Some(ret) = header.return_clause() {
        let text = match &ret.name {
            Some(name) => format!("Return variable {name} of type {}.", ret.data_type),
            None => format!("Return value of type {}.", ret.data_type),
        };
        let body = template.placeholder(&text);
        template.lines.push(format!("<returns>{body}</returns>"));
    }

    return template.render("");
}

/// Upper-case the first letter, lower-case the rest.
fn title_case(word: &str) -> String {
    let mut chars = word.chars();
    return match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    };
}

#[cfg(test)]
#[allow(clippy::missing_panics_doc, reason = "tests")]
#[allow(clippy::unwrap_used, reason = "tests")]
mod tests {
    use super::*;
    use crate::document::TextDocument;

    fn procedure(text: &str) -> ProcedureHeader {
        return signature::parse_procedure_header(text).unwrap();
    }

    fn object(text: &str) -> ObjectHeader {
        return signature::parse_object_header(text).unwrap();
    }

    #[test]
    fn procedure_template_numbers_each_tag() {
        let template = synthesize_procedure(&procedure("procedure DoWork(var Input: Integer): Boolean"));
        assert_eq!(
            template,
            "/// <summary>\n/// ${1:DoWork.}\n/// </summary>\n/// <param name=\"Input\">${2:Integer.}</param>\n/// <returns>${3:Return value of type Boolean.}</returns>"
        );
    }

    #[test]
    fn named_return_and_no_parameters() {
        let template = synthesize_procedure(&procedure("procedure GetTotal() Total: Decimal"));
        assert!(template.contains("${1:GetTotal.}"));
        assert!(template.contains("<returns>${2:Return variable Total of type Decimal.}</returns>"));
        assert!(!template.contains("<param"));
    }

    #[test]
    fn no_return_tag_without_return_clause() {
        let template = synthesize_procedure(&procedure("procedure Reset(A: Integer; B: Text)"));
        assert!(template.contains("<param name=\"A\">${2:Integer.}</param>"));
        assert!(template.contains("<param name=\"B\">${3:Text.}</param>"));
        assert!(!template.contains("<returns>"));
    }

    #[test]
    fn markup_characters_are_escaped() {
        let template = synthesize_procedure(&procedure(r#"procedure A("Say ""Hi""": Text)"#));
        assert!(template.contains("<param name=\"Say &quot;Hi&quot;\">"));
    }

    #[test]
    fn object_template_title_cases_kind() {
        assert_eq!(
            synthesize_object(&object(r#"codeunit 50100 "Sales Mgt.""#)),
            "/// <summary>\n/// ${1:Codeunit Sales Mgt. (ID 50100).}\n/// </summary>"
        );
        assert!(synthesize_object(&object("TABLE 50100 Item2")).contains("${1:Table Item2 (ID 50100).}"));
        assert!(synthesize_object(&object("interface IPayment")).contains("${1:Interface IPayment.}"));
    }

    #[test]
    fn extension_kinds_render_as_extension() {
        let header = object(r#"tableextension 50101 "Cust. Ext" extends Customer"#);
        assert!(synthesize_object(&header).contains("${1:Table extension Cust. Ext (ID 50101).}"));
        let header = object("reportextension 50102 SalesExt extends \"Sales Invoice\"");
        assert!(synthesize_object(&header).contains("${1:Report extension SalesExt (ID 50102).}"));
    }

    #[test]
    fn synthesis_is_idempotent() {
        let text = "procedure Post(var Rec: Record \"Sales Header\" temporary; Qty: Decimal): Boolean";
        let declaration = parse_declaration(text).unwrap();
        assert_eq!(synthesize(&declaration), synthesize(&declaration));
        assert_eq!(synthesize(&parse_declaration(text).unwrap()), synthesize(&declaration));
    }

    #[test]
    fn cursor_on_bare_marker_above_procedure() {
        let doc = TextDocument::new(
            "a.al",
            "codeunit 1 C\n{\n    ///\n    [TryFunction]\n    procedure Check(\n        Amount: Decimal): Boolean\n    begin\n    end;\n}\n",
        );
        let snippet = synthesize_at(&doc, Position { column: 7, line: 2 }).unwrap();
        assert_eq!(snippet.line, 2);
        assert_eq!(
            snippet.text,
            "    /// <summary>\n    /// ${1:Check.}\n    /// </summary>\n    /// <param name=\"Amount\">${2:Decimal.}</param>\n    /// <returns>${3:Return value of type Boolean.}</returns>"
        );
    }

    #[test]
    fn cursor_above_object_header() {
        let doc = TextDocument::new("a.al", "///\npage 50100 \"Item Card Ext\"\n{\n}\n");
        let snippet = synthesize_at(&doc, Position { column: 3, line: 0 }).unwrap();
        assert!(snippet.text.contains("${1:Page Item Card Ext (ID 50100).}"));
    }

    #[test]
    fn no_snippet_when_already_documented_or_not_a_marker() {
        let doc = TextDocument::new("a.al", "/// <summary>x</summary>\n///\nprocedure A()\n");
        assert_eq!(synthesize_at(&doc, Position { column: 3, line: 1 }), None);

        let doc = TextDocument::new("a.al", "// note\nprocedure A()\n");
        assert_eq!(synthesize_at(&doc, Position { column: 0, line: 0 }), None);

        let doc = TextDocument::new("a.al", "///\nMessage('hi');\n");
        assert_eq!(synthesize_at(&doc, Position { column: 3, line: 0 }), None);
    }

    #[test]
    fn cursor_above_multi_line_attribute() {
        let doc = TextDocument::new(
            "a.al",
            "    ///\n    [EventSubscriber(ObjectType::Codeunit, Codeunit::\"Sales-Post\",\n        'OnAfterPost', '', false, false)]\n    local procedure OnAfterPost(var Rec: Record Customer)\n",
        );
        let snippet = synthesize_at(&doc, Position { column: 7, line: 0 }).unwrap();
        assert!(snippet.text.starts_with("    /// <summary>\n    /// ${1:OnAfterPost.}"));
        assert!(snippet.text.contains("<param name=\"Rec\">${2:Record Customer.}</param>"));
    }
}
