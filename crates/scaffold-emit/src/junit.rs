//! JUnit 5 + Mockito emitter
//!
//! One `src/test/java/<package>/<Stem>Test.java` per Java source file, in the
//! source's own package. Literals are typed from the declared parameter types;
//! each input row runs in its own block.

use std::path::PathBuf;

use scaffold_model::{
    EmittedTestFile, Framework, Injection, Language, MockBehavior, MockSpec, OutcomeKind, Parameter, ScenarioSpec,
    SourceRef, SymbolKind, TestPlanUnit, Value,
};

use crate::emitter::{check_units, LanguageEmitter};
use crate::error::Result;
use crate::render::{camel_case, double_quoted, identifier, trace_lines};
use crate::writer::SourceWriter;

const BASE_IMPORTS: &[&str] = &[
    "java.util.List",
    "java.util.Map",
    "java.util.Optional",
    "java.util.Set",
    "org.junit.jupiter.api.Test",
    "org.junit.jupiter.api.extension.ExtendWith",
    "org.mockito.MockedStatic",
    "org.mockito.junit.jupiter.MockitoExtension",
    "org.mockito.junit.jupiter.MockitoSettings",
    "org.mockito.quality.Strictness",
];

const IO_ERRORS: &[&str] = &["IOException", "UncheckedIOException", "FileNotFoundException"];

/// Renders JUnit 5 test classes
#[derive(Debug, Clone, Copy, Default)]
pub struct JUnitEmitter;

impl LanguageEmitter for JUnitEmitter {
    fn languages(&self) -> &'static [Language] {
        &[Language::Java]
    }

    fn framework(&self) -> Framework {
        Framework::JUnit5
    }

    fn test_path(&self, source: &SourceRef) -> PathBuf {
        let mut path = PathBuf::from("src/test/java");
        if let Some(package) = &source.namespace {
            path.extend(package.split('.'));
        }
        path.push(format!("{}.java", test_class(source)));
        path
    }

    fn emit_file(&self, source: &SourceRef, units: &[&TestPlanUnit]) -> Result<EmittedTestFile> {
        check_units(source, units)?;
        let mut w = SourceWriter::new("    ");
        header(&mut w, source, units);
        w.line("@ExtendWith(MockitoExtension.class)")
            .line("@MockitoSettings(strictness = Strictness.LENIENT)")
            .line(format!("class {} {{", test_class(source)))
            .indent();
        for unit in units {
            for scenario in &unit.scenarios {
                w.blank();
                w.begin_scenario(&scenario.name);
                render_scenario(&mut w, unit, scenario);
                w.end_scenario();
            }
        }
        w.dedent().line("}");
        let (text, scenarios) = w.finish();
        Ok(EmittedTestFile {
            language: source.language,
            framework: Framework::JUnit5,
            path: self.test_path(source),
            origin: source.path.clone(),
            source: text,
            scenarios,
        })
    }
}

fn test_class(source: &SourceRef) -> String {
    let stem = source.path.file_stem().and_then(|s| s.to_str()).unwrap_or("Generated");
    format!("{stem}Test")
}

fn header(w: &mut SourceWriter, source: &SourceRef, units: &[&TestPlanUnit]) {
    w.line(format!(
        "// Generated JUnit 5 + Mockito scaffolding for {}.",
        source.path.display()
    ))
    .line("// Each test names the analyzed symbol it exercises and the finding behind it.");
    if let Some(package) = &source.namespace {
        w.line(format!("package {package};"));
    }
    w.blank()
        .line("import static org.junit.jupiter.api.Assertions.*;")
        .line("import static org.mockito.Mockito.*;")
        .blank();

    let carried: Vec<&str> = source
        .imports
        .iter()
        .map(String::as_str)
        .filter(|import| import.rsplit_once('.').map(|(package, _)| package) != source.namespace.as_deref())
        .collect();
    let mut imports: Vec<String> = BASE_IMPORTS
        .iter()
        .filter(|base| !carried.iter().any(|c| simple_name(c) == simple_name(base)))
        .map(|s| s.to_string())
        .collect();
    imports.extend(carried.iter().map(|c| c.to_string()));
    for spec in units.iter().flat_map(|u| u.mocks()) {
        if let Injection::Module { specifier } = &spec.injection {
            let package = specifier.rsplit_once('.').map(|(p, _)| p);
            if package.is_some() && package != source.namespace.as_deref() {
                imports.push(specifier.clone());
            }
        }
    }
    for unit in units {
        for scenario in &unit.scenarios {
            if let Some(error) = scenario.expected.error_type.as_deref() {
                if IO_ERRORS.contains(&error) {
                    imports.push(format!("java.io.{error}"));
                }
            }
        }
    }
    imports.sort();
    imports.dedup();
    for import in &imports {
        w.line(format!("import {import};"));
    }
    w.blank();
}

/// `java.util.List` → `List`
fn simple_name(import: &str) -> &str {
    import.rsplit('.').next().unwrap_or(import)
}

/// `Map<String, List<Integer>>` → `Map`
fn base_type(ty: &str) -> &str {
    let ty = ty.trim();
    ty.split(|c: char| c == '<' || c == '[').next().unwrap_or(ty).trim()
}

/// Top-level generic arguments: `Map<String, List<Integer>>` → `["String", "List<Integer>"]`
fn generic_args(ty: &str) -> Vec<&str> {
    let Some(open) = ty.find('<') else {
        return Vec::new();
    };
    let Some(close) = ty.rfind('>') else {
        return Vec::new();
    };
    if close <= open {
        return Vec::new();
    }
    let inner = &ty[open + 1..close];
    let mut args = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;
    for (i, c) in inner.char_indices() {
        match c {
            '<' => depth += 1,
            '>' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => {
                args.push(inner[start..i].trim());
                start = i + 1;
            }
            _ => {}
        }
    }
    args.push(inner[start..].trim());
    args
}

fn primitive_default(ty: &str) -> Option<&'static str> {
    Some(match ty {
        "int" | "short" | "byte" => "0",
        "long" => "0L",
        "double" => "0.0",
        "float" => "0.0f",
        "boolean" => "false",
        "char" => "'\\0'",
        _ => return None,
    })
}

fn literal(value: &Value, ty: Option<&str>) -> String {
    let ty = ty.map(str::trim).filter(|t| !t.is_empty());
    let base = ty.map(base_type).unwrap_or("");

    if base == "Optional" {
        let inner = ty.map(generic_args).and_then(|a| a.first().copied());
        return match value {
            Value::Null => "Optional.empty()".to_string(),
            other => format!("Optional.of({})", literal(other, inner)),
        };
    }

    match value {
        Value::Null => primitive_default(base).unwrap_or("null").to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Int(n) => match base {
            "long" | "Long" => format!("{n}L"),
            "double" | "Double" => format!("{n}.0"),
            "float" | "Float" => format!("{n}.0f"),
            "short" | "byte" | "char" => format!("({base}) {n}"),
            "BigInteger" | "BigDecimal" => format!("java.math.{base}.valueOf({n})"),
            _ => n.to_string(),
        },
        Value::Float(f) => match base {
            "float" | "Float" => format!("{f:?}f"),
            _ => format!("{f:?}"),
        },
        Value::Text(s) => match base {
            "char" | "Character" => format!("'{}'", s.chars().next().unwrap_or('a')),
            _ => double_quoted(s),
        },
        Value::List(items) => {
            if let Some(element) = ty.and_then(|t| t.strip_suffix("[]")) {
                let element = element.trim();
                if items.is_empty() {
                    return format!("new {element}[0]");
                }
                let values: Vec<String> = items.iter().map(|v| literal(v, Some(element))).collect();
                return format!("new {element}[]{{{}}}", values.join(", "));
            }
            let element = ty.map(generic_args).and_then(|a| a.first().copied());
            let values: Vec<String> = items.iter().map(|v| literal(v, element)).collect();
            let set = base.ends_with("Set");
            let factory = if set { "Set.of" } else { "List.of" };
            let created = format!("{factory}({})", values.join(", "));
            match base {
                "ArrayList" | "LinkedList" | "HashSet" | "LinkedHashSet" | "TreeSet" => {
                    format!("new java.util.{base}<>({created})")
                }
                _ => created,
            }
        }
        Value::Map(entries) => {
            let args = ty.map(generic_args).unwrap_or_default();
            let key_type = args.first().copied();
            let value_type = args.get(1).copied();
            let pairs: Vec<String> = entries
                .iter()
                .map(|(k, v)| format!("{}, {}", literal(&Value::Text(k.clone()), key_type), literal(v, value_type)))
                .collect();
            let created = format!("Map.of({})", pairs.join(", "));
            match base {
                "HashMap" | "LinkedHashMap" | "TreeMap" => format!("new java.util.{base}<>({created})"),
                _ => created,
            }
        }
        Value::Mock(name) => identifier(name),
        Value::Stub(class) => format!("mock({}.class)", base_type(class)),
    }
}

fn lower_first(name: &str) -> String {
    let mut chars = name.chars();
    chars
        .next()
        .map(|c| c.to_lowercase().chain(chars).collect())
        .unwrap_or_default()
}

fn mock_var(spec: &MockSpec) -> String {
    match spec.injection {
        Injection::Module { .. } => format!("{}Mock", lower_first(&identifier(&spec.dependency))),
        _ => identifier(&spec.dependency),
    }
}

fn mock_type(spec: &MockSpec) -> String {
    match spec.injection {
        Injection::Module { .. } => spec.dependency.clone(),
        _ => spec
            .type_hint
            .as_deref()
            .map_or_else(|| "Object".to_string(), |t| base_type(t).to_string()),
    }
}

/// Argument matcher for a parameter of the given static type
fn matcher(ty: Option<&str>) -> &'static str {
    match ty.map(base_type) {
        Some("int" | "Integer") => "anyInt()",
        Some("long" | "Long") => "anyLong()",
        Some("double" | "Double") => "anyDouble()",
        Some("float" | "Float") => "anyFloat()",
        Some("boolean" | "Boolean") => "anyBoolean()",
        Some("short" | "Short") => "anyShort()",
        Some("byte" | "Byte") => "anyByte()",
        Some("char" | "Character") => "anyChar()",
        Some("String") => "anyString()",
        _ => "any()",
    }
}

/// One matcher per argument of the mocked interaction
fn matchers(spec: &MockSpec) -> String {
    (0..spec.arg_count)
        .map(|i| matcher(spec.arg_types.get(i).and_then(Option::as_deref)))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Constructor argument for a receiver parameter, reusing a mock of the same name or type
fn receiver_argument(parameter: &Parameter, value: &Value, mocks: &[MockSpec]) -> String {
    let annotation = parameter.annotation.as_deref().map(base_type);
    mocks
        .iter()
        .filter(|m| !matches!(m.injection, Injection::Module { .. }))
        .find(|m| m.dependency == parameter.name)
        .or_else(|| {
            mocks.iter().find(|m| {
                !matches!(m.injection, Injection::Module { .. })
                    && annotation.is_some()
                    && m.type_hint.as_deref().map(base_type) == annotation
            })
        })
        .map_or_else(|| literal(value, parameter.annotation.as_deref()), mock_var)
}

fn render_scenario(w: &mut SourceWriter, unit: &TestPlanUnit, scenario: &ScenarioSpec) {
    for line in trace_lines(unit, scenario) {
        w.line(format!("// {line}"));
    }
    w.line("@Test")
        .line(format!("void {}() throws Exception {{", camel_case(&scenario.name)))
        .indent();

    let mut statics = 0;
    for spec in &scenario.mocks {
        let var = mock_var(spec);
        let ty = mock_type(spec);
        let fail = spec.behavior == MockBehavior::Fail;
        match spec.injection {
            Injection::Module { .. } => {
                w.line(format!("try (MockedStatic<{ty}> {var} = mockStatic({ty}.class)) {{"));
                w.indent();
                statics += 1;
                if fail {
                    w.line(format!(
                        "{var}.when(() -> {ty}.{}({})).thenThrow(new RuntimeException(\"simulated failure\"));",
                        spec.interaction,
                        matchers(spec)
                    ));
                }
            }
            Injection::Argument { .. } | Injection::Attribute => {
                w.line(format!("{ty} {var} = mock({ty}.class);"));
                if fail {
                    w.line(format!(
                        "doThrow(new RuntimeException(\"simulated failure\")).when({var}).{}({});",
                        spec.interaction,
                        matchers(spec)
                    ));
                }
            }
        }
    }

    let blocks = scenario.inputs.len() > 1;
    for row in &scenario.inputs {
        if blocks {
            w.line("{").indent();
        }
        render_row(w, unit, scenario, row);
        if blocks {
            w.dedent().line("}");
        }
    }

    if let (OutcomeKind::ExternalCall, Some((dependency, member))) =
        (scenario.expected.kind, &scenario.expected.interaction)
    {
        if let Some(spec) = scenario.mocks.iter().find(|m| &m.dependency == dependency) {
            let var = mock_var(spec);
            let args = matchers(spec);
            if matches!(spec.injection, Injection::Module { .. }) {
                w.line(format!(
                    "{var}.verify(() -> {}.{member}({args}), atLeastOnce());",
                    mock_type(spec)
                ));
            } else {
                w.line(format!("verify({var}, atLeastOnce()).{member}({args});"));
            }
        }
    }

    for _ in 0..statics {
        w.dedent().line("}");
    }
    w.dedent().line("}");
}

fn render_row(w: &mut SourceWriter, unit: &TestPlanUnit, scenario: &ScenarioSpec, row: &[Value]) {
    let subject = &unit.subject;
    let args: Vec<String> = subject
        .parameters
        .iter()
        .enumerate()
        .map(|(i, p)| {
            row.get(i)
                .map_or_else(|| "null".to_string(), |v| literal(v, p.annotation.as_deref()))
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
            .map(|(p, v)| receiver_argument(p, v, &scenario.mocks))
            .collect();
        w.line(format!("var instance = new {}({});", receiver.class, ctor_args.join(", ")));
        format!("instance.{}({args})", subject.name)
    } else if let Some(owner) = &subject.static_owner {
        format!("{owner}.{}({args})", subject.name)
    } else {
        format!("{}({args})", subject.name)
    };

    match scenario.expected.kind {
        OutcomeKind::ReturnValue if scenario.expected.returns_value || subject.kind == SymbolKind::Class => {
            w.line(format!("var result = {call};"));
            w.line("assertNotNull(result);");
        }
        OutcomeKind::ReturnValue => {
            w.line(format!("assertDoesNotThrow(() -> {call});"));
        }
        OutcomeKind::RaisedError => {
            let error = scenario.expected.error_type.as_deref().unwrap_or("RuntimeException");
            w.line(format!("assertThrows({error}.class, () -> {call});"));
        }
        OutcomeKind::StateMutation if subject.receiver.is_some() => {
            w.line(format!("{call};"));
            w.line("// instance state is expected to change");
            w.line("assertNotNull(instance);");
        }
        OutcomeKind::StateMutation | OutcomeKind::ExternalCall => {
            w.line(format!("{call};"));
        }
    }
}
