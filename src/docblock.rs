//! Structured-comment blocks: collecting them from source and reading their tags.
//!
//! Documentation is prose first and markup second, so the reader is
//! forgiving. A bare `&` or a `<` that does not open a documentation tag is
//! escaped before parsing, and a block that still fails to parse loses its
//! tags instead of failing the analysis.

use std::sync::LazyLock;

use regex::Regex;
use roxmltree::Node;

use crate::classify;
use crate::document::SourceDocument;
use crate::types::Documentation;

/// Name of the synthetic element wrapped around a block before parsing.
const ROOT_ELEMENT: &str = "doc";

/// A well-formed character or entity reference.
#[allow(clippy::expect_used, reason = "pattern is a compile-time constant")]
static ENTITY: LazyLock<Regex> = LazyLock::new(|| {
    return Regex::new(r"^&(?:amp|lt|gt|quot|apos|#[0-9]+|#x[0-9A-Fa-f]+);").expect("valid entity regex");
});

/// Opening, closing or empty documentation tag, comment or CDATA section.
#[allow(clippy::expect_used, reason = "pattern is a compile-time constant")]
static TAG_START: LazyLock<Regex> = LazyLock::new(|| {
    return Regex::new(
        r"^<(?:!--|!\[CDATA\[|/?(?i:b|br|c|code|description|example|exception|i|inheritdoc|item|list|listheader|para|param|paramref|remarks|returns|see|seealso|summary|term|typeparam|typeparamref|u|value)(?:[\s/][^<>]*)?>)",
    )
    .expect("valid tag regex");
});

/// Tags extracted from a documentation block.
/// `param` is always a sequence, whether the block holds zero, one or many.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DocTags {
    /// `example` tags, in order.
    pub examples: Vec<TagText>,
    /// `inheritdoc` tag, if present.
    pub inheritdoc: Option<InheritDoc>,
    /// The block failed to parse; every other field is empty.
    pub malformed: bool,
    /// `param` tags, in order.
    pub params: Vec<ParamTag>,
    /// First `remarks` tag.
    pub remarks: Option<TagText>,
    /// First `returns` tag.
    pub returns: Option<TagText>,
    /// First `summary` tag.
    pub summary: Option<TagText>,
}

impl DocTags {
    /// The `param` tag documenting `name`. Identifiers compare case-insensitively.
    pub fn param(&self, name: &str) -> Option<&ParamTag> {
        return self.params.iter().find(|p| return p.name.eq_ignore_ascii_case(name));
    }
}

/// A block with its stray markup characters escaped.
struct EscapedBlock {
    /// Each escape as (offset in `text`, bytes it added).
    escapes: Vec<(usize, usize)>,
    /// Text ready for the XML parser.
    text: String,
}

impl EscapedBlock {
    /// Offset in the block as written that corresponds to `offset` in `text`.
    fn original_offset(&self, offset: usize) -> usize {
        let added: usize = self
            .escapes
            .iter()
            .take_while(|(at, _)| return *at < offset)
            .map(|(_, extra)| return *extra)
            .sum();
        return offset.saturating_sub(added);
    }
}

/// `<inheritdoc cref="..."/>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InheritDoc {
    /// Referenced `Interface.Procedure`, if given.
    pub cref: Option<String>,
}

/// One `<param name="...">` tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParamTag {
    /// The element as written.
    pub markup: String,
    /// Value of the `name` attribute, quotes removed.
    pub name: String,
    /// Normalised body text.
    pub text: String,
}

/// Body and markup of a single tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagText {
    /// The element as written.
    pub markup: String,
    /// Normalised body text.
    pub text: String,
}

/// Concatenate every text node below `node`, then normalise.
fn element_text(node: Node<'_, '_>) -> String {
    let text: String = node
        .descendants()
        .filter(Node::is_text)
        .filter_map(|n| return n.text())
        .collect();
    return normalize_text(&text);
}

/// Escape every `&` that does not start a reference and every `<` that does
/// not start a documentation tag.
fn escape_stray_markup(raw: &str) -> EscapedBlock {
    let mut block = EscapedBlock { escapes: Vec::new(), text: String::with_capacity(raw.len()) };
    for (offset, ch) in raw.char_indices() {
        let rest = raw.get(offset..).unwrap_or_default();
        let escaped = match ch {
            '&' if !ENTITY.is_match(rest) => "&amp;",
            '<' if !TAG_START.is_match(rest) => "&lt;",
            _ => {
                block.text.push(ch);
                continue;
            },
        };
        block.escapes.push((block.text.len(), escaped.len().saturating_sub(ch.len_utf8())));
        block.text.push_str(escaped);
    }
    return block;
}

/// Trim every line and drop blank lines at either end.
fn normalize_text(text: &str) -> String {
    let lines: Vec<&str> = text.lines().map(str::trim).collect();
    let first = lines.iter().position(|l| return !l.is_empty());
    let last = lines.iter().rposition(|l| return !l.is_empty());
    return match (first, last) {
        (Some(first), Some(last)) => lines.get(first..=last).unwrap_or_default().join("\n"),
        _ => String::new(),
    };
}

/// Parse a raw block into its tags.
///
/// Stray `&` and `<` in the prose are escaped, then the block is wrapped in
/// a synthetic root element and handed to the XML parser. Documentation
/// that still does not parse yields empty tags with `malformed` set;
/// analysis carries on regardless. Markup is reported as written.
pub fn parse_tags(raw: &str) -> DocTags {
    let block = escape_stray_markup(raw);
    let open = format!("<{ROOT_ELEMENT}>");
    let wrapped = format!("{open}{}</{ROOT_ELEMENT}>", block.text);
    let parsed = match roxmltree::Document::parse(&wrapped) {
        Ok(d) => d,
        Err(e) => {
            tracing::debug!("malformed documentation ignored: {e}");
            return DocTags { malformed: true, ..DocTags::default() };
        },
    };

    let mut tags = DocTags::default();
    for node in parsed.root_element().children().filter(Node::is_element) {
        let range = node.range();
        let start = block.original_offset(range.start.saturating_sub(open.len()));
        let end = block.original_offset(range.end.saturating_sub(open.len()));
        let markup = raw.get(start..end).unwrap_or_default().to_string();
        let tag = TagText { markup, text: element_text(node) };
        match node.tag_name().name().to_ascii_lowercase().as_str() {
            "example" => tags.examples.push(tag),
            "inheritdoc" => {
                tags.inheritdoc = Some(InheritDoc {
                    cref: node.attribute("cref").map(|c| return c.trim().to_string()),
                });
            },
            "param" => {
                let Some(name) = node.attribute("name") else {
                    continue;
                };
                tags.params.push(ParamTag {
                    markup: tag.markup,
                    name: crate::signature::unquote(name),
                    text: tag.text,
                });
            },
            "remarks" => {
                tags.remarks.get_or_insert(tag);
            },
            "returns" => {
                tags.returns.get_or_insert(tag);
            },
            "summary" => {
                tags.summary.get_or_insert(tag);
            },
            _ => {},
        }
    }
    return tags;
}

/// Collect the structured comment directly above `declaration` (a line index).
///
/// Walks upward: `///` lines are captured, blank lines and attributes (also
/// those spanning several lines) are stepped over, and anything else (code,
/// another declaration, a `begin`/`end`) ends the walk. The markers are
/// stripped, lines keep their order.
pub fn read_preceding_documentation<D: SourceDocument + ?Sized>(
    document: &D,
    declaration: usize,
) -> Documentation {
    let mut captured: Vec<&str> = Vec::new();
    let mut index = declaration;

    while index > 0 {
        index = index.saturating_sub(1);
        let Some(line) = document.line(index) else {
            break;
        };
        let trimmed = line.trim();

        if let Some(rest) = trimmed.strip_prefix("///") {
            captured.push(rest.strip_prefix(' ').unwrap_or(rest));
            continue;
        }
        if trimmed.is_empty() || classify::is_attribute(trimmed) {
            continue;
        }
        if let Some(first) = classify::attribute_ending_at(document, index) {
            index = first;
            continue;
        }
        break;
    }

    if captured.is_empty() {
        return Documentation::missing();
    }
    captured.reverse();
    return Documentation::present(captured.join("\n"));
}

#[cfg(test)]
#[allow(clippy::missing_panics_doc, reason = "tests")]
#[allow(clippy::unwrap_used, reason = "tests")]
mod tests {
    use super::*;
    use crate::document::TextDocument;

    #[test]
    fn reads_block_above_attributes() {
        let doc = TextDocument::new(
            "a.al",
            "    end;\n\n    /// <summary>\n    /// Posts it.\n    /// </summary>\n    [TryFunction]\n\n    procedure Post()",
        );
        let documentation = read_preceding_documentation(&doc, 7);
        assert!(documentation.exists);
        assert_eq!(documentation.raw, "<summary>\nPosts it.\n</summary>");
    }

    #[test]
    fn stops_at_code() {
        let doc = TextDocument::new("a.al", "    /// <summary>Other</summary>\n    end;\n    procedure Post()");
        assert!(!read_preceding_documentation(&doc, 2).exists);
        assert!(!read_preceding_documentation(&doc, 0).exists);
    }

    #[test]
    fn plain_comments_are_not_documentation() {
        let doc = TextDocument::new("a.al", "    // just a note\n    procedure Post()");
        assert_eq!(read_preceding_documentation(&doc, 1), Documentation::missing());
    }

    #[test]
    fn extracts_tags() {
        let tags = parse_tags(
            "<summary>\nDoes work.\n</summary>\n<param name=\"Input\">The input.</param>\n<param name=\"Other\"></param>\n<returns>True on success.</returns>\n<remarks>Slow.</remarks>\n<example><code>DoWork(1);</code></example>",
        );
        assert!(!tags.malformed);
        assert_eq!(tags.summary.as_ref().unwrap().text, "Does work.");
        assert_eq!(tags.params.len(), 2);
        assert_eq!(tags.param("input").unwrap().text, "The input.");
        assert_eq!(tags.param("Input").unwrap().markup, "<param name=\"Input\">The input.</param>");
        assert_eq!(tags.param("Other").unwrap().text, "");
        assert_eq!(tags.returns.as_ref().unwrap().text, "True on success.");
        assert_eq!(tags.remarks.as_ref().unwrap().text, "Slow.");
        assert_eq!(tags.examples[0].text, "DoWork(1);");
    }

    #[test]
    fn single_param_is_still_a_sequence() {
        let tags = parse_tags("<param name=\"Only\">x</param>");
        assert_eq!(tags.params.len(), 1);
        assert!(parse_tags("<summary>x</summary>").params.is_empty());
    }

    #[test]
    fn malformed_markup_yields_no_tags() {
        let tags = parse_tags("<summary>Unclosed\n<param name=\"A\">x</param>");
        assert!(tags.malformed);
        assert_eq!(tags.summary, None);
        assert!(tags.params.is_empty());
    }

    #[test]
    fn ampersand_and_less_than_in_prose() {
        let tags = parse_tags("<summary>Adds A & B.</summary>\n<param name=\"X\">True when A < B.</param>");
        assert!(!tags.malformed);
        assert_eq!(tags.summary.as_ref().unwrap().text, "Adds A & B.");
        assert_eq!(tags.summary.as_ref().unwrap().markup, "<summary>Adds A & B.</summary>");
        let param = tags.param("X").unwrap();
        assert_eq!(param.text, "True when A < B.");
        assert_eq!(param.markup, "<param name=\"X\">True when A < B.</param>");
    }

    #[test]
    fn entities_and_known_inline_tags_are_kept() {
        let tags = parse_tags("<summary>Uses <c>Qty</c> &amp; <see cref=\"Post\"/>; A<B.</summary>\n<returns>x</returns>");
        assert!(!tags.malformed);
        assert_eq!(tags.summary.unwrap().text, "Uses Qty & ; A<B.");
        assert_eq!(tags.returns.unwrap().markup, "<returns>x</returns>");
    }

    #[test]
    fn reads_block_above_multi_line_attribute() {
        let doc = TextDocument::new(
            "a.al",
            "    /// <summary>Reacts.</summary>\n    [EventSubscriber(ObjectType::Codeunit, Codeunit::\"Sales-Post\",\n        'OnAfterPost', '', false, false)]\n    local procedure OnAfterPost()",
        );
        let documentation = read_preceding_documentation(&doc, 3);
        assert_eq!(documentation.raw, "<summary>Reacts.</summary>");
    }

    #[test]
    fn inheritdoc_with_cref() {
        let tags = parse_tags("<inheritdoc cref=\"IPayment.Pay\"/>");
        assert_eq!(tags.inheritdoc.unwrap().cref.as_deref(), Some("IPayment.Pay"));
    }

    #[test]
    fn summary_survives_read_then_parse() {
        let written = "Calculates the net amount for the line.";
        let source = format!("/// <summary>\n/// {written}\n/// </summary>\nprocedure Calc()");
        let doc = TextDocument::new("a.al", &source);
        let documentation = read_preceding_documentation(&doc, 3);
        let tags = parse_tags(&documentation.raw);
        assert_eq!(tags.summary.unwrap().text, written);
    }
}
