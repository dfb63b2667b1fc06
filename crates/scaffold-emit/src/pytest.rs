//! pytest emitter
//!
//! One `tests/<dir>/test_<stem>.py` per Python source file. Mocks come from
//! `unittest.mock`; multi-row scenarios become `pytest.mark.parametrize`.

use std::path::PathBuf;

use scaffold_model::{
    EmittedTestFile, Framework, Injection, Language, MockBehavior, MockSpec, OutcomeKind, ScenarioSpec, SourceRef,
    SymbolKind, TestPlanUnit, Value,
};

use crate::emitter::{check_units, directory_parts, LanguageEmitter};
use crate::error::Result;
use crate::render::{double_quoted, identifier, mock_columns, trace_lines};
use crate::writer::SourceWriter;

const BUILTIN_ERRORS: &[&str] = &[
    "Exception",
    "ArithmeticError",
    "AssertionError",
    "AttributeError",
    "ConnectionError",
    "FileNotFoundError",
    "IndexError",
    "KeyError",
    "LookupError",
    "NotImplementedError",
    "OSError",
    "IOError",
    "PermissionError",
    "RuntimeError",
    "StopIteration",
    "TimeoutError",
    "TypeError",
    "ValueError",
    "ZeroDivisionError",
];

/// Renders pytest modules
#[derive(Debug, Clone, Copy, Default)]
pub struct PytestEmitter;

impl LanguageEmitter for PytestEmitter {
    fn languages(&self) -> &'static [Language] {
        &[Language::Python]
    }

    fn framework(&self) -> Framework {
        Framework::Pytest
    }

    fn test_path(&self, source: &SourceRef) -> PathBuf {
        let mut path = PathBuf::from("tests");
        path.extend(directory_parts(&source.path));
        path.push(format!("test_{}.py", stem(source)));
        path
    }

    fn emit_file(&self, source: &SourceRef, units: &[&TestPlanUnit]) -> Result<EmittedTestFile> {
        check_units(source, units)?;
        let mut w = SourceWriter::new("    ");
        header(&mut w, source, units);
        for unit in units {
            for scenario in &unit.scenarios {
                w.blank().blank();
                w.begin_scenario(&scenario.name);
                render_scenario(&mut w, source, unit, scenario);
                w.end_scenario();
            }
        }
        let (text, scenarios) = w.finish();
        Ok(EmittedTestFile {
            language: source.language,
            framework: Framework::Pytest,
            path: self.test_path(source),
            origin: source.path.clone(),
            source: text,
            scenarios,
        })
    }
}

fn stem(source: &SourceRef) -> String {
    let stem = source
        .path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("module");
    if stem == "__init__" {
        directory_parts(&source.path)
            .pop()
            .unwrap_or_else(|| "package".to_string())
    } else {
        stem.to_string()
    }
}

fn header(w: &mut SourceWriter, source: &SourceRef, units: &[&TestPlanUnit]) {
    let depth = directory_parts(&source.path).len();
    w.line(format!("\"\"\"Generated pytest scaffolding for {}.", source.path.display()))
        .blank()
        .line("Each test names the analyzed symbol it exercises and the finding behind it.")
        .line("\"\"\"")
        .line("import pathlib")
        .line("import sys")
        .blank()
        .line(format!(
            "sys.path.insert(0, str(pathlib.Path(__file__).resolve().parents[{}]))",
            depth + 1
        ))
        .blank()
        .line("from unittest import mock")
        .blank()
        .line("import pytest")
        .blank();

    let mut names: Vec<&str> = Vec::new();
    for unit in units {
        let name = unit.subject.import_name();
        if !names.contains(&name) {
            names.push(name);
        }
    }
    w.line(format!("from {} import {}", source.module, names.join(", ")));
}

fn literal(value: &Value) -> String {
    match value {
        Value::Null => "None".to_string(),
        Value::Bool(true) => "True".to_string(),
        Value::Bool(false) => "False".to_string(),
        Value::Int(n) => n.to_string(),
        Value::Float(f) => format!("{f:?}"),
        Value::Text(s) => double_quoted(s),
        Value::List(items) => format!("[{}]", items.iter().map(literal).collect::<Vec<_>>().join(", ")),
        Value::Map(entries) => format!(
            "{{{}}}",
            entries
                .iter()
                .map(|(k, v)| format!("{}: {}", double_quoted(k), literal(v)))
                .collect::<Vec<_>>()
                .join(", ")
        ),
        Value::Mock(name) => identifier(name),
        Value::Stub(class) => format!("mock.Mock(name={})", double_quoted(class)),
    }
}

fn render_scenario(w: &mut SourceWriter, source: &SourceRef, unit: &TestPlanUnit, scenario: &ScenarioSpec) {
    let subject = &unit.subject;
    for line in trace_lines(unit, scenario) {
        w.line(format!("# {line}"));
    }

    let columns = mock_columns(scenario);
    let parametrized = scenario.inputs.len() > 1 && columns.iter().any(|is_mock| !is_mock);
    let mut test_params = Vec::new();
    if parametrized {
        let names: Vec<String> = subject
            .parameters
            .iter()
            .zip(&columns)
            .filter(|(_, is_mock)| !**is_mock)
            .map(|(p, _)| identifier(&p.name))
            .collect();
        let rows: Vec<String> = scenario
            .inputs
            .iter()
            .map(|row| {
                let values: Vec<String> = row
                    .iter()
                    .zip(&columns)
                    .filter(|(_, is_mock)| !**is_mock)
                    .map(|(v, _)| literal(v))
                    .collect();
                if values.len() == 1 {
                    values.join("")
                } else {
                    format!("({})", values.join(", "))
                }
            })
            .collect();
        w.line(format!(
            "@pytest.mark.parametrize({}, [{}])",
            double_quoted(&names.join(", ")),
            rows.join(", ")
        ));
        test_params = names;
    }
    if subject.is_async {
        w.line("@pytest.mark.asyncio");
    }
    let def = if subject.is_async { "async def" } else { "def" };
    w.line(format!("{def} test_{}({}):", scenario.name, test_params.join(", ")));
    w.indent();

    let mock_factory = if subject.is_async { "mock.AsyncMock" } else { "mock.Mock" };
    let mut patched = 0;
    for spec in &scenario.mocks {
        let var = identifier(&spec.dependency);
        match &spec.injection {
            Injection::Module { .. } => {
                let extra = if subject.is_async { ", new_callable=mock.AsyncMock" } else { "" };
                w.line(format!(
                    "with mock.patch({}{extra}) as {var}:",
                    double_quoted(&format!("{}.{}", source.module, spec.dependency))
                ));
                w.indent();
                patched += 1;
            }
            Injection::Argument { .. } | Injection::Attribute => {
                w.line(format!("{var} = {mock_factory}()"));
            }
        }
        if spec.behavior == MockBehavior::Fail {
            w.line(format!(
                "{var}.{}.side_effect = RuntimeError(\"simulated failure\")",
                spec.interaction
            ));
        }
    }

    let row = scenario.inputs.first().cloned().unwrap_or_default();
    let args: Vec<String> = subject
        .parameters
        .iter()
        .enumerate()
        .map(|(i, p)| {
            let value = if parametrized && !columns.get(i).copied().unwrap_or(false) {
                identifier(&p.name)
            } else {
                row.get(i).map_or_else(|| "None".to_string(), literal)
            };
            if p.keyword_only {
                format!("{}={value}", p.name)
            } else {
                value
            }
        })
        .collect();

    let callee = if let Some(receiver) = &subject.receiver {
        let ctor_args: Vec<String> = receiver
            .parameters
            .iter()
            .zip(&receiver.arguments)
            .map(|(p, v)| {
                attribute_mock(&scenario.mocks, &p.name).map_or_else(|| literal(v), |m| identifier(&m.dependency))
            })
            .collect();
        w.line(format!("instance = {}({})", receiver.class, ctor_args.join(", ")));
        for spec in scenario.mocks.iter().filter(|m| m.injection == Injection::Attribute) {
            w.line(format!("instance.{} = {}", spec.dependency, identifier(&spec.dependency)));
        }
        format!("instance.{}", subject.name)
    } else if let Some(owner) = &subject.static_owner {
        format!("{owner}.{}", subject.name)
    } else {
        subject.name.clone()
    };
    let awaited = if subject.is_async { "await " } else { "" };
    let call = format!("{awaited}{callee}({})", args.join(", "));

    match scenario.expected.kind {
        OutcomeKind::ReturnValue => {
            w.line(format!("result = {call}"));
            if subject.kind == SymbolKind::Class {
                w.line(format!("assert isinstance(result, {})", subject.name));
            } else if scenario.expected.returns_value {
                w.line("assert result is not None");
            } else {
                w.line("assert result is None");
            }
        }
        OutcomeKind::RaisedError => {
            let declared = scenario.expected.error_type.as_deref();
            let error = declared.filter(|t| BUILTIN_ERRORS.contains(t)).unwrap_or("Exception");
            if let Some(other) = declared.filter(|t| !BUILTIN_ERRORS.contains(t)) {
                w.line(format!("# raises {other}"));
            }
            w.line(format!("with pytest.raises({error}):"));
            w.indent().line(call).dedent();
        }
        OutcomeKind::StateMutation if subject.receiver.is_some() => {
            w.line("before = dict(vars(instance))");
            w.line(call);
            w.line("assert vars(instance) != before");
        }
        OutcomeKind::StateMutation => {
            w.line(call);
        }
        OutcomeKind::ExternalCall => {
            w.line(call);
            if let Some((dependency, member)) = &scenario.expected.interaction {
                if scenario.mocks.iter().any(|m| &m.dependency == dependency) {
                    w.line(format!("{}.{member}.assert_called()", identifier(dependency)));
                }
            }
        }
    }

    for _ in 0..patched {
        w.dedent();
    }
    w.dedent();
}

fn attribute_mock<'a>(mocks: &'a [MockSpec], parameter: &str) -> Option<&'a MockSpec> {
    mocks
        .iter()
        .find(|m| m.injection == Injection::Attribute && m.dependency == parameter)
}
