//! Documentation findings: what a built object is missing, per declaration.
//!
//! One finding per declaration. When documentation is absent altogether the
//! finding says only that; otherwise every missing or superfluous element
//! is merged into a single message with a comma-joined code.

use serde::Serialize;

use crate::config::Settings;
use crate::docblock::{self, DocTags};
use crate::types::{
    Documentation, Position, Procedure, ProcedureKind, Severity, SourceObject, SourceRange,
};

/// One diagnostic unit for one declaration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Finding {
    /// Comma-joined codes of `missing`, in first-seen order, without repeats.
    pub code: String,
    /// File the declaration lives in.
    pub file: std::path::PathBuf,
    /// Human-readable summary of every element below.
    pub message: String,
    /// Elements missing or superfluous, in reporting order.
    pub missing: Vec<FindingKind>,
    /// Object or procedure name.
    pub name: String,
    /// Where to put the diagnostic.
    pub range: SourceRange,
    /// From the settings.
    pub severity: Severity,
    /// Whether the object or one of its procedures is affected.
    pub target: FindingTarget,
}

/// What is wrong with a declaration's documentation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum FindingKind {
    /// No structured comment at all.
    DocumentationMissing,
    /// A declared parameter has no non-empty `param` tag.
    ParameterMissing(String),
    /// A `param` tag names no declared parameter.
    ParameterUnnecessary(String),
    /// A return clause has no non-empty `returns` tag.
    ReturnTypeMissing,
    /// A `returns` tag on a procedure without a return clause.
    ReturnTypeUnnecessary,
    /// `summary` absent or empty.
    SummaryMissing,
}

impl FindingKind {
    /// Stable code used to match quick fixes.
    pub fn code(&self) -> &'static str {
        return match self {
            Self::DocumentationMissing => "DOC0001",
            Self::ParameterMissing(_) => "DOC0020",
            Self::ParameterUnnecessary(_) => "DOC0021",
            Self::ReturnTypeMissing => "DOC0030",
            Self::ReturnTypeUnnecessary => "DOC0031",
            Self::SummaryMissing => "DOC0010",
        };
    }

    /// Fragment used inside a merged message.
    fn describe(&self) -> String {
        return match self {
            Self::DocumentationMissing => "documentation missing".to_string(),
            Self::ParameterMissing(name) => format!("parameter '{name}' missing"),
            Self::ParameterUnnecessary(name) => format!("parameter '{name}' unnecessary"),
            Self::ReturnTypeMissing => "return value missing".to_string(),
            Self::ReturnTypeUnnecessary => "return value unnecessary".to_string(),
            Self::SummaryMissing => "summary missing".to_string(),
        };
    }
}

/// Which declaration a finding belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum FindingTarget {
    /// The object header.
    Object,
    /// A procedure or trigger.
    Procedure,
}

/// Evaluate every declaration of `object` against the settings.
/// Pure: the object is only read.
pub fn evaluate(object: &SourceObject, settings: &Settings) -> Vec<Finding> {
    let mut findings = Vec::new();

    if let Some(finding) = evaluate_object(object, settings) {
        findings.push(finding);
    }

    if settings.check_procedure_documentation {
        findings.extend(
            object
                .procedures
                .iter()
                .filter_map(|p| return evaluate_procedure(object, p, settings)),
        );
    }

    return findings;
}

/// Object-level finding: documentation missing or summary missing.
fn evaluate_object(object: &SourceObject, settings: &Settings) -> Option<Finding> {
    if !settings.check_object_documentation
        || !settings.requires_documentation(object.access)
        || (object.obsolete.is_some() && !settings.check_obsolete)
    {
        return None;
    }

    let missing = if object.documentation.exists {
        let tags = tags_of(&object.documentation);
        if tags.inheritdoc.is_some() || has_text(tags.summary.as_ref()) {
            return None;
        }
        vec![FindingKind::SummaryMissing]
    } else {
        vec![FindingKind::DocumentationMissing]
    };

    let label = format!("{} '{}'", object.kind_token.to_ascii_lowercase(), object.name);
    let range = SourceRange {
        end: Position { column: 0, line: object.line.saturating_add(1) },
        start: Position { column: 0, line: object.line },
    };
    return Some(finding(object, FindingTarget::Object, &label, &object.name, range, missing, settings));
}

/// Element-level comparison of one procedure's documentation with its signature.
fn evaluate_procedure(object: &SourceObject, procedure: &Procedure, settings: &Settings) -> Option<Finding> {
    if !settings.requires_documentation(procedure.access)
        || (procedure.kind == ProcedureKind::Trigger && !settings.check_triggers)
        || (procedure.obsolete.is_some() && !settings.check_obsolete)
    {
        return None;
    }

    let keyword = match procedure.kind {
        ProcedureKind::Procedure => "procedure",
        ProcedureKind::Trigger => "trigger",
    };
    let label = format!("{keyword} '{}'", procedure.name);

    if !procedure.documentation.exists {
        let missing = vec![FindingKind::DocumentationMissing];
        return Some(finding(object, FindingTarget::Procedure, &label, &procedure.name, procedure.range, missing, settings));
    }

    let missing = missing_elements(procedure, &tags_of(&procedure.documentation));
    if missing.is_empty() {
        return None;
    }
    return Some(finding(object, FindingTarget::Procedure, &label, &procedure.name, procedure.range, missing, settings));
}

/// Assemble a finding with its merged message and code.
fn finding(
    object: &SourceObject,
    target: FindingTarget,
    label: &str,
    name: &str,
    range: SourceRange,
    missing: Vec<FindingKind>,
    settings: &Settings,
) -> Finding {
    return Finding {
        code: merged_code(&missing),
        file: object.file.clone(),
        message: merged_message(label, &missing),
        missing,
        name: name.to_string(),
        range,
        severity: settings.severity,
        target,
    };
}

/// Whether an optional tag is present with a non-empty body.
fn has_text(tag: Option<&docblock::TagText>) -> bool {
    return tag.is_some_and(|t| return !t.text.is_empty());
}

/// Comma-joined codes without repeats, in first-seen order.
pub fn merged_code(missing: &[FindingKind]) -> String {
    let mut codes: Vec<&str> = Vec::new();
    for kind in missing {
        let code = kind.code();
        if !codes.contains(&code) {
            codes.push(code);
        }
    }
    return codes.join(",");
}

/// One sentence covering every element.
///
/// `Documentation for procedure 'X' is missing.` when nothing is documented,
/// otherwise `Documentation for procedure 'X' is incomplete: summary missing, parameter 'A' missing.`
pub fn merged_message(label: &str, missing: &[FindingKind]) -> String {
    if missing.iter().any(|k| return *k == FindingKind::DocumentationMissing) {
        return format!("Documentation for {label} is missing.");
    }
    let parts: Vec<String> = missing.iter().map(FindingKind::describe).collect();
    return format!("Documentation for {label} is incomplete: {}.", parts.join(", "));
}

/// Compare parsed tags with the signature.
/// `inheritdoc` defers to the referenced documentation, so nothing is reported.
fn missing_elements(procedure: &Procedure, tags: &DocTags) -> Vec<FindingKind> {
    let mut missing = Vec::new();
    if tags.inheritdoc.is_some() {
        return missing;
    }

    if !has_text(tags.summary.as_ref()) {
        missing.push(FindingKind::SummaryMissing);
    }

    for parameter in &procedure.parameters {
        let documented = tags.param(&parameter.name).is_some_and(|t| return !t.text.is_empty());
        if !documented {
            missing.push(FindingKind::ParameterMissing(parameter.name.clone()));
        }
    }

    let returns_documented = has_text(tags.returns.as_ref());
    if procedure.return_value.is_some() && !returns_documented {
        missing.push(FindingKind::ReturnTypeMissing);
    }

    for tag in &tags.params {
        let declared = procedure
            .parameters
            .iter()
            .any(|p| return p.name.eq_ignore_ascii_case(&tag.name));
        if !declared {
            missing.push(FindingKind::ParameterUnnecessary(tag.name.clone()));
        }
    }

    if procedure.return_value.is_none() && tags.returns.is_some() {
        missing.push(FindingKind::ReturnTypeUnnecessary);
    }

    return missing;
}

/// Parse documentation tags, or empty tags when there is no documentation.
fn tags_of(documentation: &Documentation) -> DocTags {
    if !documentation.exists {
        return DocTags::default();
    }
    return docblock::parse_tags(&documentation.raw);
}
