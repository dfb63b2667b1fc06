//! Text helpers shared by the emitters

use scaffold_model::{FindingRef, ScenarioSpec, TestPlanUnit};

/// `name` made safe to use as a local variable
#[must_use]
pub fn identifier(name: &str) -> String {
    let mut out: String = name
        .chars()
        .map(|c| if c.is_alphanumeric() || c == '_' { c } else { '_' })
        .collect();
    if out.is_empty() || out.starts_with(|c: char| c.is_ascii_digit()) {
        out.insert(0, '_');
    }
    out
}

/// String literal in double quotes with C-style escapes
#[must_use]
pub fn double_quoted(text: &str) -> String {
    format!("\"{}\"", escape(text, '"'))
}

/// String literal in single quotes with C-style escapes
#[must_use]
pub fn single_quoted(text: &str) -> String {
    format!("'{}'", escape(text, '\''))
}

fn escape(text: &str, quote: char) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c == quote => {
                out.push('\\');
                out.push(c);
            }
            c => out.push(c),
        }
    }
    out
}

/// `add_happy_path_2` → `addHappyPath2`
#[must_use]
pub fn camel_case(snake: &str) -> String {
    let mut out = String::with_capacity(snake.len());
    let mut upper = false;
    for c in snake.chars() {
        if c == '_' {
            upper = !out.is_empty();
        } else if upper {
            out.extend(c.to_uppercase());
            upper = false;
        } else {
            out.push(c);
        }
    }
    out
}

/// Collapse whitespace so text fits on one comment line
#[must_use]
pub fn one_line(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Traceability lines placed above each rendered scenario
#[must_use]
pub fn trace_lines(unit: &TestPlanUnit, scenario: &ScenarioSpec) -> Vec<String> {
    let mut lines = vec![format!("{} ({})", unit.target, scenario.intent)];
    if let Some(FindingRef {
        category,
        confidence,
        rationale,
    }) = &scenario.finding
    {
        lines.push(format!("{category} [{confidence}]: {}", one_line(rationale)));
    }
    lines
}

/// Per column, whether the scenario passes a mock there
#[must_use]
pub fn mock_columns(scenario: &ScenarioSpec) -> Vec<bool> {
    scenario
        .inputs
        .first()
        .map(|row| row.iter().map(scaffold_model::Value::is_mock).collect())
        .unwrap_or_default()
}
