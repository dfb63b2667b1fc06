//! Jest emitter for JavaScript and TypeScript
//!
//! One `__tests__/<dir>/<stem>.test.{js,ts}` per source file. The subject is
//! imported the way the source exports it; imported modules the subject calls
//! are replaced with `jest.mock`.

use std::path::{Component, Path, PathBuf};

use scaffold_model::{
    EmittedTestFile, ExportStyle, Framework, Injection, Language, MockBehavior, MockSpec, OutcomeKind, ScenarioSpec,
    SourceRef, SymbolKind, TestPlanUnit, Value,
};

use crate::emitter::{check_units, directory_parts, LanguageEmitter};
use crate::error::Result;
use crate::render::{identifier, mock_columns, single_quoted, trace_lines};
use crate::writer::SourceWriter;

const BUILTIN_ERRORS: &[&str] = &[
    "Error",
    "TypeError",
    "RangeError",
    "ReferenceError",
    "SyntaxError",
    "EvalError",
    "URIError",
];

const THROWING: &str = "jest.fn(() => { throw new Error('simulated failure'); })";

/// Renders Jest suites
#[derive(Debug, Clone, Copy, Default)]
pub struct JestEmitter;

impl LanguageEmitter for JestEmitter {
    fn languages(&self) -> &'static [Language] {
        &[Language::JavaScript, Language::TypeScript]
    }

    fn framework(&self) -> Framework {
        Framework::Jest
    }

    fn test_path(&self, source: &SourceRef) -> PathBuf {
        let stem = source.path.file_stem().and_then(|s| s.to_str()).unwrap_or("module");
        let mut path = PathBuf::from("__tests__");
        path.extend(directory_parts(&source.path));
        path.push(format!("{stem}.test.{}", extension(source.language)));
        path
    }

    fn emit_file(&self, source: &SourceRef, units: &[&TestPlanUnit]) -> Result<EmittedTestFile> {
        check_units(source, units)?;
        let dialect = Dialect {
            typescript: source.language == Language::TypeScript,
            depth: directory_parts(&source.path).len() + 1,
        };
        let mut w = SourceWriter::new("  ");
        header(&mut w, source, units, &dialect);
        for unit in units {
            for scenario in &unit.scenarios {
                w.blank();
                w.begin_scenario(&scenario.name);
                render_scenario(&mut w, unit, scenario, &dialect);
                w.end_scenario();
            }
        }
        let (text, scenarios) = w.finish();
        Ok(EmittedTestFile {
            language: source.language,
            framework: Framework::Jest,
            path: self.test_path(source),
            origin: source.path.clone(),
            source: text,
            scenarios,
        })
    }
}

fn extension(language: Language) -> &'static str {
    if language == Language::TypeScript {
        "ts"
    } else {
        "js"
    }
}

struct Dialect {
    typescript: bool,
    /// Directories between the test file and the repository root
    depth: usize,
}

impl Dialect {
    /// Import path of a repository-relative file, extension dropped
    fn import_path(&self, path: &Path) -> String {
        let without_ext = path.with_extension("");
        let parts: Vec<String> = without_ext
            .components()
            .filter_map(|c| match c {
                Component::Normal(s) => s.to_str().map(str::to_string),
                _ => None,
            })
            .collect();
        format!("{}{}", "../".repeat(self.depth), parts.join("/"))
    }

    /// Module specifier as seen from the test file
    fn specifier(&self, source: &SourceRef, specifier: &str) -> String {
        if !specifier.starts_with('.') {
            return specifier.to_string();
        }
        let mut parts = directory_parts(&source.path);
        for segment in specifier.split('/') {
            match segment {
                "." | "" => {}
                ".." => {
                    parts.pop();
                }
                other => parts.push(other.to_string()),
            }
        }
        format!("{}{}", "../".repeat(self.depth), parts.join("/"))
    }

    fn any(&self) -> &'static str {
        if self.typescript {
            ": any"
        } else {
            ""
        }
    }

    fn untyped(&self, expr: &str) -> String {
        if self.typescript {
            format!("({expr} as any)")
        } else {
            expr.to_string()
        }
    }
}

fn header(w: &mut SourceWriter, source: &SourceRef, units: &[&TestPlanUnit], dialect: &Dialect) {
    w.line(format!("// Generated Jest scaffolding for {}.", source.path.display()))
        .line("// Each test names the analyzed symbol it exercises and the finding behind it.");

    let mut modules: Vec<(&str, &str)> = Vec::new();
    for spec in units.iter().flat_map(|u| u.mocks()) {
        if let Injection::Module { specifier } = &spec.injection {
            if !modules.iter().any(|(name, _)| *name == spec.dependency) {
                modules.push((spec.dependency.as_str(), specifier.as_str()));
            }
        }
    }

    let mut specifiers: Vec<String> = Vec::new();
    for (_, specifier) in &modules {
        let rebased = dialect.specifier(source, specifier);
        if !specifiers.contains(&rebased) {
            specifiers.push(rebased);
        }
    }
    if !specifiers.is_empty() {
        w.blank();
        for specifier in &specifiers {
            w.line(format!("jest.mock({});", single_quoted(specifier)));
        }
    }

    w.blank();
    let path = single_quoted(&dialect.import_path(&source.path));
    let fallback = if dialect.typescript {
        ExportStyle::EsModule
    } else {
        ExportStyle::CommonJs
    };
    let mut named_es: Vec<&str> = Vec::new();
    let mut named_cjs: Vec<&str> = Vec::new();
    let mut defaults: Vec<(ExportStyle, &str)> = Vec::new();
    for unit in units {
        let name = unit.subject.import_name();
        let style = match unit.subject.export {
            ExportStyle::None => fallback,
            other => other,
        };
        match style {
            ExportStyle::EsModule | ExportStyle::None => push_unique(&mut named_es, name),
            ExportStyle::CommonJs => push_unique(&mut named_cjs, name),
            ExportStyle::EsDefault | ExportStyle::CommonJsDefault => {
                if !defaults.iter().any(|(_, n)| *n == name) {
                    defaults.push((style, name));
                }
            }
        }
    }
    for (style, name) in &defaults {
        if *style == ExportStyle::EsDefault {
            w.line(format!("import {name} from {path};"));
        } else {
            w.line(format!("const {name} = require({path});"));
        }
    }
    if !named_es.is_empty() {
        w.line(format!("import {{ {} }} from {path};", named_es.join(", ")));
    }
    if !named_cjs.is_empty() {
        w.line(format!("const {{ {} }} = require({path});", named_cjs.join(", ")));
    }
    for (name, specifier) in &modules {
        let specifier = single_quoted(&dialect.specifier(source, specifier));
        if dialect.typescript {
            w.line(format!("import * as {} from {specifier};", identifier(name)));
        } else {
            w.line(format!("const {} = require({specifier});", identifier(name)));
        }
    }

    if !modules.is_empty() {
        w.blank()
            .line("beforeEach(() => {")
            .indent()
            .line("jest.resetAllMocks();")
            .dedent()
            .line("});");
    }
}

fn push_unique<'a>(names: &mut Vec<&'a str>, name: &'a str) {
    if !names.contains(&name) {
        names.push(name);
    }
}

fn literal(value: &Value, dialect: &Dialect) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Int(n) => n.to_string(),
        Value::Float(f) => format!("{f:?}"),
        Value::Text(s) => single_quoted(s),
        Value::List(items) => format!(
            "[{}]",
            items.iter().map(|v| literal(v, dialect)).collect::<Vec<_>>().join(", ")
        ),
        Value::Map(entries) if entries.is_empty() => "{}".to_string(),
        Value::Map(entries) => format!(
            "{{ {} }}",
            entries
                .iter()
                .map(|(k, v)| format!("{}: {}", single_quoted(k), literal(v, dialect)))
                .collect::<Vec<_>>()
                .join(", ")
        ),
        Value::Mock(name) => identifier(name),
        Value::Stub(_) => dialect.untyped("{}"),
    }
}

/// `{ charge: jest.fn(), refund: jest.fn() }`, nesting dotted members
fn mock_object(members: &[(&str, &str)]) -> String {
    let mut groups: Vec<(&str, Vec<(&str, &str)>)> = Vec::new();
    for &(member, function) in members {
        let (head, rest) = member.split_once('.').unwrap_or((member, ""));
        let index = match groups.iter().position(|(h, _)| *h == head) {
            Some(index) => index,
            None => {
                groups.push((head, Vec::new()));
                groups.len() - 1
            }
        };
        groups[index].1.push((rest, function));
    }
    let fields: Vec<String> = groups
        .iter()
        .map(|(head, nested)| {
            let deeper: Vec<(&str, &str)> = nested.iter().copied().filter(|(rest, _)| !rest.is_empty()).collect();
            let value = match (deeper.is_empty(), nested.first()) {
                (true, Some((_, function))) => (*function).to_string(),
                _ => mock_object(&deeper),
            };
            format!("{head}: {value}")
        })
        .collect();
    format!("{{ {} }}", fields.join(", "))
}

/// Every member the subject calls on `spec`'s dependency, the failing one throwing
fn mock_members(spec: &MockSpec) -> Vec<(&str, &'static str)> {
    let mut members: Vec<&str> = spec.members.iter().map(String::as_str).collect();
    if !members.contains(&spec.interaction.as_str()) {
        members.insert(0, &spec.interaction);
    }
    members
        .into_iter()
        .map(|member| {
            let fails = spec.behavior == MockBehavior::Fail && member == spec.interaction;
            (member, if fails { THROWING } else { "jest.fn()" })
        })
        .collect()
}

fn render_scenario(w: &mut SourceWriter, unit: &TestPlanUnit, scenario: &ScenarioSpec, dialect: &Dialect) {
    let subject = &unit.subject;
    for line in trace_lines(unit, scenario) {
        w.line(format!("// {line}"));
    }

    let columns = mock_columns(scenario);
    let parametrized = scenario.inputs.len() > 1 && columns.iter().any(|is_mock| !is_mock);
    let asynchronous = if subject.is_async { "async " } else { "" };
    if parametrized {
        let names: Vec<String> = subject
            .parameters
            .iter()
            .zip(&columns)
            .filter(|(_, is_mock)| !**is_mock)
            .map(|(p, _)| format!("{}{}", identifier(&p.name), dialect.any()))
            .collect();
        w.line("test.each([").indent();
        for row in &scenario.inputs {
            let values: Vec<String> = row
                .iter()
                .zip(&columns)
                .filter(|(_, is_mock)| !**is_mock)
                .map(|(v, _)| literal(v, dialect))
                .collect();
            w.line(format!("[{}],", values.join(", ")));
        }
        w.dedent().line(format!(
            "])({}, {asynchronous}({}) => {{",
            single_quoted(&format!("{} #%#", scenario.name)),
            names.join(", ")
        ));
    } else {
        w.line(format!(
            "test({}, {asynchronous}() => {{",
            single_quoted(&scenario.name)
        ));
    }
    w.indent();

    for spec in &scenario.mocks {
        let var = identifier(&spec.dependency);
        match &spec.injection {
            Injection::Module { .. } => {
                if spec.behavior == MockBehavior::Fail {
                    w.line(format!(
                        "{}.mockImplementation(() => {{ throw new Error('simulated failure'); }});",
                        dialect.untyped(&format!("{var}.{}", spec.interaction))
                    ));
                }
            }
            Injection::Argument { .. } | Injection::Attribute => {
                w.line(format!("const {var} = {};", mock_object(&mock_members(spec))));
            }
        }
    }

    let row = scenario.inputs.first().cloned().unwrap_or_default();
    let args: Vec<String> = subject
        .parameters
        .iter()
        .enumerate()
        .map(|(i, p)| {
            if parametrized && !columns.get(i).copied().unwrap_or(false) {
                identifier(&p.name)
            } else {
                row.get(i).map_or_else(|| "undefined".to_string(), |v| literal(v, dialect))
            }
        })
        .collect();
    let args = args.join(", ");

    let call = if subject.kind == SymbolKind::Class {
        format!("new {}({args})", subject.name)
    } else if let Some(receiver) = &subject.receiver {
        let ctor_args: Vec<String> = receiver
            .parameters
            .iter()
            .zip(&receiver.arguments)
            .map(|(p, v)| attribute_mock(&scenario.mocks, &p.name).map_or_else(|| literal(v, dialect), identifier))
            .collect();
        w.line(format!("const instance = new {}({});", receiver.class, ctor_args.join(", ")));
        for spec in scenario.mocks.iter().filter(|m| m.injection == Injection::Attribute) {
            w.line(format!(
                "{}.{} = {};",
                dialect.untyped("instance"),
                spec.dependency.trim_start_matches('#'),
                identifier(&spec.dependency)
            ));
        }
        format!("instance.{}({args})", subject.name)
    } else if let Some(owner) = &subject.static_owner {
        format!("{owner}.{}({args})", subject.name)
    } else {
        format!("{}({args})", subject.name)
    };
    let awaited = if subject.is_async { "await " } else { "" };

    match scenario.expected.kind {
        OutcomeKind::ReturnValue => {
            w.line(format!("const result = {awaited}{call};"));
            if subject.kind == SymbolKind::Class {
                w.line(format!("expect(result).toBeInstanceOf({});", subject.name));
            } else if scenario.expected.returns_value {
                w.line("expect(result).toBeDefined();");
            } else {
                w.line("expect(result).toBeUndefined();");
            }
        }
        OutcomeKind::RaisedError => {
            let error = scenario
                .expected
                .error_type
                .as_deref()
                .filter(|t| BUILTIN_ERRORS.contains(t))
                .unwrap_or("");
            if subject.is_async {
                w.line(format!("await expect({call}).rejects.toThrow({error});"));
            } else {
                w.line(format!("expect(() => {call}).toThrow({error});"));
            }
        }
        OutcomeKind::StateMutation if subject.receiver.is_some() => {
            w.line("const before = { ...instance };");
            w.line(format!("{awaited}{call};"));
            w.line("expect({ ...instance }).not.toEqual(before);");
        }
        OutcomeKind::StateMutation => {
            w.line(format!("{awaited}{call};"));
        }
        OutcomeKind::ExternalCall => {
            w.line(format!("{awaited}{call};"));
            if let Some((dependency, member)) = &scenario.expected.interaction {
                if scenario.mocks.iter().any(|m| &m.dependency == dependency) {
                    w.line(format!("expect({}.{member}).toHaveBeenCalled();", identifier(dependency)));
                }
            }
        }
    }

    w.dedent().line("});");
}

fn attribute_mock<'a>(mocks: &'a [MockSpec], parameter: &str) -> Option<&'a str> {
    mocks
        .iter()
        .find(|m| m.injection == Injection::Attribute && m.dependency.trim_start_matches('#') == parameter)
        .map(|m| m.dependency.as_str())
}
