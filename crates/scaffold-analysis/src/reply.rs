//! Lenient interpretation of model replies
//!
//! Models answer in many shapes: a bare JSON array, an object wrapping the
//! list, JSON embedded in prose or a fenced block. Whatever can be read is
//! validated against the project; everything else becomes a diagnostic.

use scaffold_model::{
    Diagnostic, DiagnosticKind, FileSummary, ProjectModel, QualifiedName, RiskCategory, RiskFinding, Severity,
};
use serde_json::{Map, Value};

use crate::adapter::{ModelReply, SuggestedFinding};

const LIST_KEYS: [&str; 4] = ["findings", "risks", "issues", "results"];
const SYMBOL_KEYS: [&str; 4] = ["symbol", "name", "function", "target"];
const CATEGORY_KEYS: [&str; 4] = ["category", "type", "risk", "kind"];
const RATIONALE_KEYS: [&str; 4] = ["rationale", "reason", "explanation", "description"];

/// Reply that yields nothing usable
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ReplyError {
    /// No text at all
    #[error("model returned an empty reply")]
    Empty,

    /// Text without any parseable JSON
    #[error("no JSON object or array found in reply")]
    NoJson,

    /// JSON that is not a list of findings
    #[error("reply JSON is not a list of findings: {0}")]
    Shape(String),
}

/// Findings read from a reply, plus the items that had to be dropped
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedReply {
    /// Well-formed suggestions
    pub findings: Vec<SuggestedFinding>,
    /// Why each dropped item was dropped
    pub rejected: Vec<String>,
}

/// Read suggestions out of a reply
///
/// # Errors
/// Returns [`ReplyError`] when the reply holds no findings list at all
pub fn parse_reply(reply: &ModelReply) -> Result<ParsedReply, ReplyError> {
    match reply {
        ModelReply::Empty => Err(ReplyError::Empty),
        ModelReply::Findings(findings) => Ok(ParsedReply {
            findings: findings.clone(),
            rejected: Vec::new(),
        }),
        ModelReply::Text(text) => {
            if text.trim().is_empty() {
                return Err(ReplyError::Empty);
            }
            let value = extract_json(text).ok_or(ReplyError::NoJson)?;
            from_value(value)
        }
    }
}

/// First JSON object or array in `text`
fn extract_json(text: &str) -> Option<Value> {
    let trimmed = text.trim();
    if let Ok(value) = serde_json::from_str::<Value>(trimmed) {
        if value.is_object() || value.is_array() {
            return Some(value);
        }
    }
    let mut offset = 0;
    while let Some(found) = text[offset..].find(['{', '[']) {
        let start = offset + found;
        if let Some(end) = balanced_end(&text[start..]) {
            if let Ok(value) = serde_json::from_str::<Value>(&text[start..start + end]) {
                return Some(value);
            }
        }
        offset = start + 1;
    }
    None
}

/// Length of the bracketed span opening at the start of `text`
fn balanced_end(text: &str) -> Option<usize> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;
    for (i, c) in text.char_indices() {
        if in_string {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '{' | '[' => depth += 1,
            '}' | ']' => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return Some(i + 1);
                }
            }
            _ => {}
        }
    }
    None
}

fn from_value(value: Value) -> Result<ParsedReply, ReplyError> {
    let items = match value {
        Value::Array(items) => items,
        Value::Object(mut object) => {
            if let Some(key) = LIST_KEYS.into_iter().find(|k| object.get(*k).is_some_and(Value::is_array)) {
                match object.remove(key) {
                    Some(Value::Array(items)) => items,
                    _ => Vec::new(),
                }
            } else if first_string(&object, &SYMBOL_KEYS).is_some() {
                vec![Value::Object(object)]
            } else {
                let keys: Vec<&str> = object.keys().map(String::as_str).collect();
                return Err(ReplyError::Shape(format!("object with keys [{}]", keys.join(", "))));
            }
        }
        other => return Err(ReplyError::Shape(other.to_string())),
    };

    let mut parsed = ParsedReply::default();
    for item in items {
        match suggestion(&item) {
            Ok(finding) => parsed.findings.push(finding),
            Err(reason) => parsed.rejected.push(reason),
        }
    }
    Ok(parsed)
}

fn first_string(object: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter()
        .filter_map(|k| object.get(*k).and_then(Value::as_str))
        .map(str::trim)
        .find(|s| !s.is_empty())
        .map(str::to_string)
}

fn suggestion(item: &Value) -> Result<SuggestedFinding, String> {
    let object = item.as_object().ok_or_else(|| format!("finding is not an object: {item}"))?;
    let symbol = first_string(object, &SYMBOL_KEYS).ok_or_else(|| format!("finding has no symbol: {item}"))?;
    let category = first_string(object, &CATEGORY_KEYS).ok_or_else(|| format!("finding has no category: {item}"))?;
    Ok(SuggestedFinding {
        symbol,
        category,
        rationale: first_string(object, &RATIONALE_KEYS).unwrap_or_default(),
    })
}

/// Resolve a model's symbol text against the queried file
#[must_use]
pub fn resolve_symbol(model: &ProjectModel, file: &FileSummary, text: &str) -> Option<QualifiedName> {
    let text = text.trim().trim_end_matches("()");
    if let Ok(name) = text.parse::<QualifiedName>() {
        if model.index().contains(&name) {
            return Some(name);
        }
    }

    let module_prefix = format!("{}.", file.module);
    let relative = text.strip_prefix(&module_prefix).unwrap_or(text);
    let segments: Vec<&str> = relative.split(['.', '#', ':']).filter(|s| !s.is_empty()).collect();
    if segments.is_empty() {
        return None;
    }
    let candidate = QualifiedName::new(file.module.clone(), segments.iter().copied());
    if model.index().contains(&candidate) {
        return Some(candidate);
    }
    match segments.as_slice() {
        [name] => model
            .index()
            .named_in_module(&file.module, name)
            .into_iter()
            .next()
            .map(|(qn, _)| qn),
        _ => None,
    }
}

/// Turn a reply for `file` into model findings and diagnostics
#[must_use]
pub fn interpret(reply: &ModelReply, file: &FileSummary, model: &ProjectModel) -> (Vec<RiskFinding>, Vec<Diagnostic>) {
    let mut findings = Vec::new();
    let mut diagnostics = Vec::new();
    let diagnostic = |severity, kind, message: String| {
        Diagnostic::new(severity, kind, message)
            .at_path(&file.path)
            .in_stage("aggregate")
    };

    let parsed = match parse_reply(reply) {
        Ok(parsed) => parsed,
        Err(ReplyError::Empty) => {
            tracing::debug!(file = %file.path.display(), "model reply empty");
            diagnostics.push(diagnostic(
                Severity::Info,
                DiagnosticKind::MalformedReply,
                ReplyError::Empty.to_string(),
            ));
            return (findings, diagnostics);
        }
        Err(e) => {
            tracing::warn!(file = %file.path.display(), error = %e, "model reply skipped");
            diagnostics.push(diagnostic(Severity::Warning, DiagnosticKind::MalformedReply, e.to_string()));
            return (findings, diagnostics);
        }
    };

    for reason in parsed.rejected {
        tracing::warn!(file = %file.path.display(), %reason, "model finding dropped");
        diagnostics.push(diagnostic(Severity::Warning, DiagnosticKind::MalformedReply, reason));
    }

    for suggested in parsed.findings {
        let category: RiskCategory = match suggested.category.parse() {
            Ok(category) => category,
            Err(raw) => {
                tracing::warn!(file = %file.path.display(), category = %raw, "unknown model category");
                diagnostics.push(diagnostic(
                    Severity::Warning,
                    DiagnosticKind::UnknownCategory,
                    format!("unknown category '{raw}' for '{}'", suggested.symbol),
                ));
                continue;
            }
        };
        let Some(name) = resolve_symbol(model, file, &suggested.symbol) else {
            tracing::warn!(file = %file.path.display(), symbol = %suggested.symbol, "unresolved model symbol");
            diagnostics.push(diagnostic(
                Severity::Warning,
                DiagnosticKind::UnresolvedSymbol,
                format!("'{}' does not name a symbol in {}", suggested.symbol, file.module),
            ));
            continue;
        };

        let error_type = if category == RiskCategory::UntestedBranch {
            model.symbol(&name).and_then(|s| s.primary_error_type()).map(str::to_string)
        } else {
            None
        };
        let rationale = if suggested.rationale.is_empty() {
            format!("model flagged {category}")
        } else {
            suggested.rationale
        };
        findings.push(RiskFinding::model(name, category, rationale).with_error_type(error_type));
    }
    (findings, diagnostics)
}
