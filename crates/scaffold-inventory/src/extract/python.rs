//! Python extraction (tree-sitter-python)

use std::collections::{HashMap, HashSet};

use once_cell::sync::Lazy;
use scaffold_model::{
    Dependency, ErrorPath, Import, Injection, Language, Parameter, QualifiedName, SideEffect, SymbolDescriptor,
    SymbolKind, Visibility,
};
use tree_sitter::Node;

use super::syntax::{body_nodes, field_text, has_token, line, named_children, parse, push_unique, text};
use super::{is_value_type, Extraction, Extractor, SourceFile};
use crate::error::ExtractError;

/// Builtins that talk to the outside world
const IO_BUILTINS: &[&str] = &["open", "print", "input"];

/// Top-level packages whose calls perform I/O
static IO_MODULES: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "os", "shutil", "subprocess", "requests", "socket", "urllib", "http", "httpx", "aiohttp", "sqlite3",
        "pathlib", "io", "ftplib", "smtplib", "boto3", "psycopg2", "pymongo", "redis", "glob", "tempfile",
    ]
    .into_iter()
    .collect()
});

/// Members of I/O packages that only manipulate strings
const PURE_IO_MEMBERS: &[&str] = &[
    "path.join", "path.basename", "path.dirname", "path.splitext", "path.abspath", "path.normpath",
    "path.relpath", "path.split", "getenv", "environ.get", "sep", "linesep",
];

/// Standard-library modules that are never worth mocking
static PURE_MODULES: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "json", "re", "math", "typing", "collections", "itertools", "functools", "dataclasses", "datetime",
        "enum", "abc", "copy", "string", "logging", "uuid", "hashlib", "base64", "decimal", "fractions",
        "statistics", "operator", "textwrap", "pprint", "sys", "random", "time", "warnings", "inspect",
        "contextlib", "types", "numbers", "heapq", "bisect", "struct", "secrets",
    ]
    .into_iter()
    .collect()
});

/// Methods of str/list/dict/set, never a collaborator interaction
const VALUE_METHODS: &[&str] = &[
    "append", "extend", "insert", "pop", "remove", "clear", "update", "add", "discard", "setdefault", "popitem",
    "sort", "reverse", "get", "items", "keys", "values", "copy", "count", "index", "strip", "lstrip", "rstrip",
    "split", "rsplit", "join", "lower", "upper", "title", "replace", "startswith", "endswith", "format",
    "encode", "decode", "find", "isdigit", "isalpha", "splitlines", "zfill", "union", "intersection",
];

/// Methods that change the container they are called on
const MUTATING_METHODS: &[&str] = &[
    "append", "extend", "insert", "pop", "remove", "clear", "update", "add", "discard", "setdefault", "popitem",
    "sort", "reverse",
];

/// Method names that read or write a stream
const IO_METHODS: &[&str] = &[
    "read", "write", "readline", "readlines", "writelines", "read_text", "write_text", "read_bytes",
    "write_bytes", "send", "sendall", "recv", "urlopen",
];

const BRANCH_KINDS: &[&str] = &[
    "if_statement", "elif_clause", "for_statement", "while_statement", "except_clause", "conditional_expression",
    "boolean_operator", "case_clause", "if_clause",
];

fn is_scope(kind: &str) -> bool {
    matches!(kind, "function_definition" | "class_definition" | "lambda" | "decorated_definition")
}

/// Python extractor
#[derive(Debug, Clone, Copy, Default)]
pub struct PythonExtractor;

impl Extractor for PythonExtractor {
    fn languages(&self) -> &'static [Language] {
        &[Language::Python]
    }

    fn extract(&self, file: &SourceFile<'_>) -> Result<Extraction, ExtractError> {
        let tree = parse(file.text, &tree_sitter_python::LANGUAGE.into())?;
        let root = tree.root_node();
        let ctx = FileCtx {
            source: file.text,
            module: file.module,
            imports: collect_imports(root, file.text),
        };

        let mut symbols = Vec::new();
        for node in named_children(root) {
            let (def, decorators) = unwrap_decorated(node, file.text);
            match def.kind() {
                "function_definition" => symbols.extend(function_symbol(&ctx, def, &decorators, None)),
                "class_definition" => symbols.extend(class_symbols(&ctx, def)),
                _ => {}
            }
        }

        Ok(Extraction {
            symbols,
            imports: ctx.imports,
            namespace: None,
            module: None,
        })
    }
}

struct FileCtx<'s> {
    source: &'s str,
    module: &'s str,
    imports: Vec<Import>,
}

impl FileCtx<'_> {
    fn import_binding(&self, name: &str) -> Option<&Import> {
        self.imports.iter().find(|i| i.bindings.iter().any(|b| b == name))
    }
}

struct ClassCtx {
    name: QualifiedName,
    collaborators: HashMap<String, Option<String>>,
}

struct FnCtx<'a> {
    params: &'a [Parameter],
    receiver: Option<&'a str>,
    class: Option<&'a ClassCtx>,
    is_constructor: bool,
}

fn unwrap_decorated<'t>(node: Node<'t>, source: &str) -> (Node<'t>, Vec<String>) {
    if node.kind() != "decorated_definition" {
        return (node, Vec::new());
    }
    let decorators = named_children(node)
        .into_iter()
        .filter(|c| c.kind() == "decorator")
        .map(|d| {
            let raw = text(d, source).trim_start_matches('@');
            raw.split('(').next().unwrap_or(raw).trim().to_string()
        })
        .collect();
    let def = node.child_by_field_name("definition").unwrap_or(node);
    (def, decorators)
}

fn collect_imports(root: Node<'_>, source: &str) -> Vec<Import> {
    let mut imports: Vec<Import> = Vec::new();
    let mut add = |import: Import| {
        if let Some(existing) = imports.iter_mut().find(|i| i.specifier == import.specifier) {
            for binding in import.bindings {
                push_unique(&mut existing.bindings, binding);
            }
        } else {
            imports.push(import);
        }
    };

    for node in body_nodes(root, |_| false) {
        match node.kind() {
            "import_statement" => {
                let mut cursor = node.walk();
                for name in node.children_by_field_name("name", &mut cursor) {
                    match name.kind() {
                        "aliased_import" => {
                            let module = field_text(name, "name", source).unwrap_or_default();
                            let alias = field_text(name, "alias", source).unwrap_or(module);
                            add(Import::new(module, [alias]));
                        }
                        _ => {
                            let module = text(name, source);
                            let root = module.split('.').next().unwrap_or(module);
                            add(Import::new(module, [root]));
                        }
                    }
                }
            }
            "import_from_statement" => {
                let Some(module) = field_text(node, "module_name", source) else {
                    continue;
                };
                let mut bindings = Vec::new();
                let mut cursor = node.walk();
                for name in node.children_by_field_name("name", &mut cursor) {
                    let binding = if name.kind() == "aliased_import" {
                        field_text(name, "alias", source)
                    } else {
                        Some(text(name, source))
                    };
                    if let Some(binding) = binding {
                        bindings.push(binding.rsplit('.').next().unwrap_or(binding).to_string());
                    }
                }
                add(Import::new(module, bindings));
            }
            _ => {}
        }
    }
    imports
}

/// Declared parameters, receivers and variadics excluded by the caller
fn parameters(node: Node<'_>, source: &str) -> Vec<Parameter> {
    let mut params = Vec::new();
    let mut keyword_only = false;
    for child in named_children(node) {
        let param = match child.kind() {
            "identifier" => Some(Parameter::new(text(child, source))),
            "typed_parameter" => {
                let name = named_children(child).into_iter().next();
                match name {
                    Some(n) if n.kind() == "identifier" => {
                        let mut p = Parameter::new(text(n, source));
                        p.annotation = field_text(child, "type", source).map(str::to_string);
                        Some(p)
                    }
                    Some(n) if n.kind() == "list_splat_pattern" => {
                        keyword_only = true;
                        None
                    }
                    _ => None,
                }
            }
            "default_parameter" | "typed_default_parameter" => field_text(child, "name", source).map(|name| {
                let mut p = Parameter::new(name);
                p.annotation = field_text(child, "type", source).map(str::to_string);
                p.default = field_text(child, "value", source).map(str::to_string);
                p
            }),
            "list_splat_pattern" | "keyword_separator" => {
                keyword_only = true;
                None
            }
            _ => None,
        };
        if let Some(mut p) = param {
            p.keyword_only = keyword_only;
            params.push(p);
        }
    }
    params
}

fn is_collaborator_param(param: &Parameter) -> bool {
    param.annotation.as_deref().map_or(true, |a| !is_value_type(a))
}

/// Attributes assigned a collaborator in `__init__`: a parameter or a freshly constructed object
fn collaborators(init: Node<'_>, params: &[Parameter], receiver: &str, source: &str) -> HashMap<String, Option<String>> {
    let mut found = HashMap::new();
    let Some(body) = init.child_by_field_name("body") else {
        return found;
    };
    for node in body_nodes(body, is_scope) {
        if node.kind() != "assignment" {
            continue;
        }
        let Some(attr) = node.child_by_field_name("left").and_then(|l| receiver_attribute(l, receiver, source)) else {
            continue;
        };
        let Some(right) = node.child_by_field_name("right") else {
            continue;
        };
        let source_expr = if right.kind() == "boolean_operator" {
            right.child_by_field_name("left").unwrap_or(right)
        } else {
            right
        };
        match source_expr.kind() {
            "identifier" => {
                let name = text(source_expr, source);
                if let Some(param) = params.iter().find(|p| p.name == name) {
                    if is_collaborator_param(param) {
                        found.insert(attr.to_string(), param.annotation.clone());
                    }
                }
            }
            "call" => {
                let callee = field_text(source_expr, "function", source).unwrap_or_default();
                if callee.chars().next().is_some_and(char::is_uppercase) {
                    found.insert(attr.to_string(), Some(callee.to_string()));
                }
            }
            _ => {}
        }
    }
    found
}

/// `self.attr` → `attr`
fn receiver_attribute<'s>(node: Node<'_>, receiver: &str, source: &'s str) -> Option<&'s str> {
    if node.kind() != "attribute" {
        return None;
    }
    let object = node.child_by_field_name("object")?;
    (object.kind() == "identifier" && text(object, source) == receiver)
        .then(|| field_text(node, "attribute", source))
        .flatten()
}

/// Root expression of an attribute chain and the attribute names after it
fn attribute_chain<'t, 's>(node: Node<'t>, source: &'s str) -> (Node<'t>, Vec<&'s str>) {
    let mut segments = Vec::new();
    let mut current = node;
    while current.kind() == "attribute" {
        if let Some(attr) = field_text(current, "attribute", source) {
            segments.push(attr);
        }
        match current.child_by_field_name("object") {
            Some(object) => current = object,
            None => break,
        }
    }
    segments.reverse();
    (current, segments)
}

fn function_symbol(ctx: &FileCtx<'_>, def: Node<'_>, decorators: &[String], class: Option<&ClassCtx>) -> Option<SymbolDescriptor> {
    let source = ctx.source;
    let name = field_text(def, "name", source)?;
    let is_staticmethod = decorators.iter().any(|d| d == "staticmethod");
    let is_classmethod = decorators.iter().any(|d| d == "classmethod");
    let is_property = decorators
        .iter()
        .any(|d| d == "property" || d.ends_with(".setter") || d.ends_with(".deleter"));

    let mut params = def
        .child_by_field_name("parameters")
        .map(|p| parameters(p, source))
        .unwrap_or_default();
    let receiver = if class.is_some() && !is_staticmethod && !params.is_empty() {
        Some(params.remove(0).name)
    } else {
        None
    };

    let (kind, qualified) = match class {
        Some(c) => (SymbolKind::Method, c.name.child(name)),
        None => (SymbolKind::Function, QualifiedName::top_level(ctx.module, name)),
    };
    let mut symbol = SymbolDescriptor::new(kind, qualified).at_line(line(def));
    symbol.visibility = if name.starts_with('_') || is_property {
        Visibility::Private
    } else {
        Visibility::Public
    };
    symbol.return_annotation = field_text(def, "return_type", source).map(str::to_string);
    symbol.is_async = has_token(def, "async");
    symbol.is_static = is_staticmethod || is_classmethod;

    if let Some(body) = def.child_by_field_name("body") {
        let fn_ctx = FnCtx {
            params: &params,
            receiver: receiver.as_deref(),
            class,
            is_constructor: false,
        };
        analyze_body(ctx, &fn_ctx, body, &mut symbol);
    }
    if symbol.return_annotation.as_deref().is_some_and(|a| a != "None" && a != "NoReturn") {
        symbol.returns_value = true;
    }
    symbol.parameters = params;
    Some(symbol)
}

fn class_symbols(ctx: &FileCtx<'_>, def: Node<'_>) -> Vec<SymbolDescriptor> {
    let source = ctx.source;
    let Some(name) = field_text(def, "name", source) else {
        return Vec::new();
    };
    let qualified = QualifiedName::top_level(ctx.module, name);
    let members: Vec<(Node<'_>, Vec<String>)> = def
        .child_by_field_name("body")
        .map(|body| {
            named_children(body)
                .into_iter()
                .map(|n| unwrap_decorated(n, source))
                .filter(|(n, _)| n.kind() == "function_definition")
                .collect()
        })
        .unwrap_or_default();

    let init = members
        .iter()
        .find(|(n, _)| field_text(*n, "name", source) == Some("__init__"))
        .map(|(n, _)| *n);
    let mut init_params = init
        .and_then(|n| n.child_by_field_name("parameters"))
        .map(|p| parameters(p, source))
        .unwrap_or_default();
    let receiver = if init_params.is_empty() {
        "self".to_string()
    } else {
        init_params.remove(0).name
    };

    let class_ctx = ClassCtx {
        name: qualified.clone(),
        collaborators: init
            .map(|n| collaborators(n, &init_params, &receiver, source))
            .unwrap_or_default(),
    };

    let mut class_symbol = SymbolDescriptor::new(SymbolKind::Class, qualified).at_line(line(def));
    class_symbol.visibility = if name.starts_with('_') {
        Visibility::Private
    } else {
        Visibility::Public
    };
    class_symbol.bases = def
        .child_by_field_name("superclasses")
        .map(named_children)
        .unwrap_or_default()
        .into_iter()
        .filter(|base| matches!(base.kind(), "identifier" | "attribute"))
        .map(|base| text(base, source).to_string())
        .collect();
    if let Some(body) = init.and_then(|n| n.child_by_field_name("body")) {
        let fn_ctx = FnCtx {
            params: &init_params,
            receiver: Some(&receiver),
            class: Some(&class_ctx),
            is_constructor: true,
        };
        analyze_body(ctx, &fn_ctx, body, &mut class_symbol);
        class_symbol.returns_value = false;
    }
    class_symbol.parameters = init_params;

    let mut symbols = vec![class_symbol];
    for (member, decorators) in &members {
        if Some(*member) == init {
            continue;
        }
        symbols.extend(function_symbol(ctx, *member, decorators, Some(&class_ctx)));
    }
    symbols
}

fn analyze_body(ctx: &FileCtx<'_>, fn_ctx: &FnCtx<'_>, body: Node<'_>, symbol: &mut SymbolDescriptor) {
    let source = ctx.source;
    for node in body_nodes(body, is_scope) {
        let kind = node.kind();
        if BRANCH_KINDS.contains(&kind) {
            symbol.branch_count += 1;
        }
        match kind {
            "return_statement" if node.named_child_count() > 0 => symbol.returns_value = true,
            "yield" => symbol.returns_value = true,
            "try_statement" => symbol.handles_errors = true,
            "raise_statement" => {
                if let Some(raised) = named_children(node).into_iter().next() {
                    let error_type = match raised.kind() {
                        "call" => field_text(raised, "function", source),
                        "identifier" | "attribute" => Some(text(raised, source)),
                        _ => None,
                    };
                    push_unique(&mut symbol.error_paths, ErrorPath::raised(error_type.map(str::to_string)));
                }
            }
            "global_statement" | "nonlocal_statement" => {
                for name in named_children(node) {
                    push_unique(
                        &mut symbol.side_effects,
                        SideEffect::MutatesSharedState {
                            target: text(name, source).to_string(),
                        },
                    );
                }
            }
            "assignment" | "augmented_assignment" if !fn_ctx.is_constructor => {
                if let (Some(left), Some(receiver)) = (node.child_by_field_name("left"), fn_ctx.receiver) {
                    record_mutation(left, receiver, source, symbol);
                }
            }
            "call" => analyze_call(ctx, fn_ctx, node, symbol),
            _ => {}
        }
    }
}

fn record_mutation(target: Node<'_>, receiver: &str, source: &str, symbol: &mut SymbolDescriptor) {
    match target.kind() {
        "attribute" => {
            let (root, segments) = attribute_chain(target, source);
            if root.kind() == "identifier" && text(root, source) == receiver {
                if let Some(first) = segments.first() {
                    push_unique(
                        &mut symbol.side_effects,
                        SideEffect::MutatesSharedState {
                            target: format!("{receiver}.{first}"),
                        },
                    );
                }
            }
        }
        "subscript" => {
            if let Some(value) = target.child_by_field_name("value") {
                record_mutation(value, receiver, source, symbol);
            }
        }
        "pattern_list" | "tuple_pattern" | "list_pattern" => {
            for child in named_children(target) {
                record_mutation(child, receiver, source, symbol);
            }
        }
        _ => {}
    }
}

fn analyze_call(ctx: &FileCtx<'_>, fn_ctx: &FnCtx<'_>, call: Node<'_>, symbol: &mut SymbolDescriptor) {
    let source = ctx.source;
    let Some(function) = call.child_by_field_name("function") else {
        return;
    };
    let arg_count = call
        .child_by_field_name("arguments")
        .map_or(0, |args| named_children(args).iter().filter(|a| a.kind() != "comment").count());

    match function.kind() {
        "identifier" => {
            let name = text(function, source);
            push_unique(&mut symbol.calls, name.to_string());
            let imported_io = ctx
                .import_binding(name)
                .is_some_and(|i| IO_MODULES.contains(package_root(&i.specifier)));
            if IO_BUILTINS.contains(&name) || imported_io {
                push_unique(&mut symbol.side_effects, SideEffect::PerformsIo { call: name.to_string() });
            }
        }
        "attribute" => {
            let (root, segments) = attribute_chain(function, source);
            let Some(last) = segments.last().copied() else {
                return;
            };
            push_unique(&mut symbol.calls, last.to_string());
            if IO_METHODS.contains(&last) {
                push_unique(
                    &mut symbol.side_effects,
                    SideEffect::PerformsIo {
                        call: text(function, source).to_string(),
                    },
                );
            }
            if root.kind() != "identifier" {
                return;
            }
            let root_name = text(root, source);
            if fn_ctx.receiver == Some(root_name) {
                receiver_call(fn_ctx, root_name, &segments, arg_count, symbol);
            } else if let Some(index) = fn_ctx.params.iter().position(|p| p.name == root_name) {
                let param = &fn_ctx.params[index];
                if is_collaborator_param(param) && !VALUE_METHODS.contains(&segments[0]) {
                    push_unique(
                        &mut symbol.side_effects,
                        SideEffect::ExternalCall(Dependency {
                            name: root_name.to_string(),
                            member: segments.join("."),
                            arg_count,
                            injection: Injection::Argument { index },
                            type_hint: param.annotation.clone(),
                            arg_types: Vec::new(),
                        }),
                    );
                }
            } else if let Some(import) = ctx.import_binding(root_name) {
                let package = package_root(&import.specifier);
                let member = segments.join(".");
                if IO_MODULES.contains(package) && !PURE_IO_MEMBERS.contains(&member.as_str()) {
                    push_unique(
                        &mut symbol.side_effects,
                        SideEffect::PerformsIo {
                            call: format!("{root_name}.{member}"),
                        },
                    );
                }
                let is_class_ref = root_name.chars().next().is_some_and(char::is_uppercase);
                if !PURE_MODULES.contains(package) && !is_class_ref {
                    push_unique(
                        &mut symbol.side_effects,
                        SideEffect::ExternalCall(Dependency {
                            name: root_name.to_string(),
                            member,
                            arg_count,
                            injection: Injection::Module {
                                specifier: import.specifier.clone(),
                            },
                            type_hint: None,
                            arg_types: Vec::new(),
                        }),
                    );
                }
            }
        }
        _ => {}
    }
}

/// `self.client.charge(...)`, `self.items.append(...)`, `self.helper()`
fn receiver_call(fn_ctx: &FnCtx<'_>, receiver: &str, segments: &[&str], arg_count: usize, symbol: &mut SymbolDescriptor) {
    if segments.len() < 2 {
        return;
    }
    let attr = segments[0];
    let member = segments[1..].join(".");
    let collaborator = fn_ctx.class.and_then(|c| c.collaborators.get(attr));
    match collaborator {
        Some(type_hint) if !VALUE_METHODS.contains(&segments[1]) => push_unique(
            &mut symbol.side_effects,
            SideEffect::ExternalCall(Dependency {
                name: attr.to_string(),
                member,
                arg_count,
                injection: Injection::Attribute,
                type_hint: type_hint.clone(),
                arg_types: Vec::new(),
            }),
        ),
        _ if segments.len() == 2 && MUTATING_METHODS.contains(&segments[1]) && !fn_ctx.is_constructor => push_unique(
            &mut symbol.side_effects,
            SideEffect::MutatesSharedState {
                target: format!("{receiver}.{attr}"),
            },
        ),
        _ => {}
    }
}

/// `os.path` → `os`; relative specifiers have no package root
fn package_root(specifier: &str) -> &str {
    if specifier.starts_with('.') {
        return "";
    }
    specifier.split('.').next().unwrap_or(specifier)
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use super::*;
    use pretty_assertions::assert_eq;

    fn extract(source: &str) -> Extraction {
        let file = SourceFile {
            path: Path::new("src/api.py"),
            language: Language::Python,
            module: "src.api",
            text: source,
        };
        PythonExtractor.extract(&file).expect("parses")
    }

    fn symbol<'a>(extraction: &'a Extraction, name: &str) -> &'a SymbolDescriptor {
        extraction
            .symbols
            .iter()
            .find(|s| s.name.to_string() == name)
            .unwrap_or_else(|| panic!("{name} not extracted"))
    }

    const API: &str = r#"
from typing import Dict, List, Optional
from .core import ConfigManager, initialize_app
import requests as http


class APIError(Exception):
    def __init__(self, message: str, code: int = 400):
        super().__init__(message)
        self.code = code


class API:
    def __init__(self, config: Optional[ConfigManager] = None):
        self.config = config or initialize_app()
        self.users: Dict[str, str] = {}

    def register_user(self, name: str, email: str, roles: List[str] = None) -> str:
        if email in self.users:
            raise APIError(f"User {email} exists", 409)
        self.users[email] = name
        return name

    def reload(self):
        self.config.load()

    @staticmethod
    def version() -> str:
        return "1.0"

    @property
    def size(self):
        return len(self.users)

    def _internal(self):
        pass


def fetch(url, *, timeout=5):
    return http.get(url, timeout=timeout)


async def notify(paymentClient, amount: int):
    await paymentClient.charge(amount)
"#;

    #[test]
    fn classes_and_methods_in_declaration_order() {
        let extraction = extract(API);
        let names: Vec<String> = extraction.symbols.iter().map(|s| s.name.to_string()).collect();
        assert_eq!(
            names,
            vec![
                "src.api:APIError",
                "src.api:API",
                "src.api:API.register_user",
                "src.api:API.reload",
                "src.api:API.version",
                "src.api:API.size",
                "src.api:API._internal",
                "src.api:fetch",
                "src.api:notify",
            ]
        );
    }

    #[test]
    fn constructor_parameters_belong_to_class() {
        let extraction = extract(API);
        let api = symbol(&extraction, "src.api:API");
        assert_eq!(api.kind, SymbolKind::Class);
        assert_eq!(api.parameters.len(), 1);
        assert_eq!(api.parameters[0].annotation.as_deref(), Some("Optional[ConfigManager]"));
        assert_eq!(api.parameters[0].default.as_deref(), Some("None"));
        assert!(!api.mutates_state());
        assert!(api.bases.is_empty());
        assert_eq!(symbol(&extraction, "src.api:APIError").bases, vec!["Exception"]);
    }

    #[test]
    fn superclasses_skip_keyword_arguments() {
        let extraction = extract("class Model(base.Model, Mixin, metaclass=Meta):\n    pass\n");
        assert_eq!(symbol(&extraction, "src.api:Model").bases, vec!["base.Model", "Mixin"]);
    }

    #[test]
    fn method_facts() {
        let extraction = extract(API);
        let register = symbol(&extraction, "src.api:API.register_user");
        assert_eq!(register.arity(), 3);
        assert!(register.returns_value);
        assert_eq!(register.primary_error_type(), Some("APIError"));
        assert!(register.mutates_state());
        assert_eq!(register.branch_count, 1);

        let reload = symbol(&extraction, "src.api:API.reload");
        let deps = reload.dependencies();
        assert_eq!(deps.len(), 1);
        assert_eq!(deps[0].name, "config");
        assert_eq!(deps[0].injection, Injection::Attribute);

        assert!(symbol(&extraction, "src.api:API.version").is_static);
        assert_eq!(symbol(&extraction, "src.api:API.size").visibility, Visibility::Private);
        assert_eq!(symbol(&extraction, "src.api:API._internal").visibility, Visibility::Private);
    }

    #[test]
    fn module_dependency_and_io() {
        let extraction = extract(API);
        let fetch = symbol(&extraction, "src.api:fetch");
        assert!(fetch.performs_io());
        assert_eq!(fetch.parameters[1].name, "timeout");
        assert!(fetch.parameters[1].keyword_only);
        let deps = fetch.dependencies();
        assert_eq!(deps[0].name, "http");
        assert_eq!(
            deps[0].injection,
            Injection::Module {
                specifier: "requests".into()
            }
        );
    }

    #[test]
    fn argument_dependency() {
        let extraction = extract(API);
        let notify = symbol(&extraction, "src.api:notify");
        assert!(notify.is_async);
        let deps = notify.dependencies();
        assert_eq!(deps.len(), 1);
        assert_eq!(deps[0].name, "paymentClient");
        assert_eq!(deps[0].member, "charge");
        assert_eq!(deps[0].injection, Injection::Argument { index: 0 });
    }

    #[test]
    fn imports_and_bindings() {
        let extraction = extract(API);
        let specifiers: Vec<&str> = extraction.imports.iter().map(|i| i.specifier.as_str()).collect();
        assert_eq!(specifiers, vec!["typing", ".core", "requests"]);
        assert_eq!(extraction.imports[1].bindings, vec!["ConfigManager", "initialize_app"]);
        assert_eq!(extraction.imports[2].bindings, vec!["http"]);
    }

    #[test]
    fn unparseable_source_is_an_error() {
        let file = SourceFile {
            path: Path::new("bad.py"),
            language: Language::Python,
            module: "bad",
            text: "def broken(:\n    pass\n",
        };
        assert!(matches!(PythonExtractor.extract(&file), Err(ExtractError::Syntax { .. })));
    }
}
