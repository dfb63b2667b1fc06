//! JavaScript and TypeScript extraction (tree-sitter-typescript)
//!
//! Plain JavaScript is parsed with the TypeScript grammar, which accepts it;
//! files using JSX are retried with the TSX grammar.

use std::collections::HashMap;

use scaffold_model::{
    Dependency, ErrorPath, ExportStyle, Import, Injection, Language, Parameter, QualifiedName, SideEffect,
    SymbolDescriptor, SymbolKind, Visibility,
};
use tree_sitter::{Language as Grammar, Node, Tree};

use super::syntax::{
    body_nodes, children, field_text, has_token, line, named_children, parse, push_unique, text, unquote,
};
use super::{is_value_type, Extraction, Extractor, SourceFile};
use crate::error::ExtractError;

/// Modules and globals whose calls perform I/O
const IO_MODULES: &[&str] = &[
    "fs", "fs/promises", "node:fs", "node:fs/promises", "http", "https", "node:http", "node:https", "net",
    "child_process", "node:child_process", "axios", "node-fetch", "readline", "dgram", "got", "superagent",
];
const IO_GLOBALS: &[&str] = &["console", "process"];
const IO_FUNCTIONS: &[&str] = &["fetch", "readFileSync", "writeFileSync", "readFile", "writeFile", "exec", "spawn"];

/// Modules never worth mocking
const PURE_MODULES: &[&str] = &["path", "node:path", "util", "node:util", "url", "lodash", "underscore", "assert"];

/// Methods of arrays, strings, maps and sets
const VALUE_METHODS: &[&str] = &[
    "push", "pop", "shift", "unshift", "splice", "slice", "concat", "map", "filter", "forEach", "reduce", "find",
    "findIndex", "some", "every", "includes", "indexOf", "join", "split", "trim", "toLowerCase", "toUpperCase",
    "replace", "startsWith", "endsWith", "keys", "values", "entries", "get", "set", "has", "delete", "add",
    "clear", "sort", "reverse", "toString", "toFixed", "padStart", "padEnd", "flat", "flatMap", "at",
];

const MUTATING_METHODS: &[&str] = &[
    "push", "pop", "shift", "unshift", "splice", "set", "delete", "add", "clear", "sort", "reverse",
];

const BRANCH_KINDS: &[&str] = &[
    "if_statement", "for_statement", "for_in_statement", "while_statement", "do_statement", "switch_case",
    "catch_clause", "ternary_expression",
];

/// Nested declarations whose bodies belong to another symbol
fn is_declaration_scope(kind: &str) -> bool {
    matches!(
        kind,
        "function_declaration" | "generator_function_declaration" | "class_declaration" | "class"
            | "abstract_class_declaration" | "method_definition"
    )
}

/// Any nested function, including callbacks
fn is_function_scope(kind: &str) -> bool {
    is_declaration_scope(kind)
        || matches!(kind, "arrow_function" | "function_expression" | "function" | "generator_function")
}

/// JavaScript/TypeScript extractor
#[derive(Debug, Clone, Copy, Default)]
pub struct JavaScriptExtractor;

impl JavaScriptExtractor {
    fn parse_tree(file: &SourceFile<'_>) -> Result<Tree, ExtractError> {
        let ext = file.path.extension().and_then(|e| e.to_str()).unwrap_or_default();
        let tsx: Grammar = tree_sitter_typescript::LANGUAGE_TSX.into();
        if matches!(ext, "tsx" | "jsx") {
            return parse(file.text, &tsx);
        }
        let typescript: Grammar = tree_sitter_typescript::LANGUAGE_TYPESCRIPT.into();
        match parse(file.text, &typescript) {
            Err(ExtractError::Syntax { .. }) if file.language == Language::JavaScript => parse(file.text, &tsx),
            other => other,
        }
    }
}

impl Extractor for JavaScriptExtractor {
    fn languages(&self) -> &'static [Language] {
        &[Language::JavaScript, Language::TypeScript]
    }

    fn extract(&self, file: &SourceFile<'_>) -> Result<Extraction, ExtractError> {
        let tree = Self::parse_tree(file)?;
        let root = tree.root_node();
        let ctx = FileCtx {
            source: file.text,
            module: file.module,
            imports: collect_imports(root, file.text),
        };

        let mut symbols = Vec::new();
        let mut exports: HashMap<String, ExportStyle> = HashMap::new();
        for node in named_children(root) {
            match node.kind() {
                "export_statement" => {
                    let style = if has_token(node, "default") {
                        ExportStyle::EsDefault
                    } else {
                        ExportStyle::EsModule
                    };
                    if let Some(decl) = node.child_by_field_name("declaration") {
                        for symbol in declaration_symbols(&ctx, decl) {
                            if !symbol.name.is_member() {
                                exports.insert(symbol.name.name().to_string(), style);
                            }
                            symbols.push(symbol);
                        }
                    } else if let Some(value) = node.child_by_field_name("value") {
                        if value.kind() == "identifier" {
                            exports.insert(text(value, file.text).to_string(), ExportStyle::EsDefault);
                        } else {
                            for symbol in declaration_symbols(&ctx, value) {
                                if !symbol.name.is_member() {
                                    exports.insert(symbol.name.name().to_string(), ExportStyle::EsDefault);
                                }
                                symbols.push(symbol);
                            }
                        }
                    } else if node.child_by_field_name("source").is_none() {
                        for clause in named_children(node).into_iter().filter(|c| c.kind() == "export_clause") {
                            for spec in named_children(clause) {
                                let name = field_text(spec, "name", file.text);
                                let alias = field_text(spec, "alias", file.text);
                                match (name, alias) {
                                    (Some(name), None) => {
                                        exports.insert(name.to_string(), ExportStyle::EsModule);
                                    }
                                    (Some(name), Some("default")) => {
                                        exports.insert(name.to_string(), ExportStyle::EsDefault);
                                    }
                                    _ => {}
                                }
                            }
                        }
                    }
                }
                "expression_statement" => {
                    commonjs_export(&ctx, node, &mut symbols, &mut exports);
                }
                _ => symbols.extend(declaration_symbols(&ctx, node)),
            }
        }

        for symbol in &mut symbols {
            let top = &symbol.name.segments()[0];
            if let Some(style) = exports.get(top) {
                symbol.export = *style;
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
    class: Option<&'a ClassCtx>,
    is_constructor: bool,
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
                let Some(specifier) = field_text(node, "source", source).map(unquote) else {
                    continue;
                };
                let mut bindings = Vec::new();
                for clause in named_children(node).into_iter().filter(|c| c.kind() == "import_clause") {
                    for part in named_children(clause) {
                        match part.kind() {
                            "identifier" => bindings.push(text(part, source).to_string()),
                            "namespace_import" => bindings.extend(
                                named_children(part)
                                    .into_iter()
                                    .filter(|n| n.kind() == "identifier")
                                    .map(|n| text(n, source).to_string()),
                            ),
                            "named_imports" => {
                                for spec in named_children(part).into_iter().filter(|n| n.kind() == "import_specifier") {
                                    let binding = field_text(spec, "alias", source).or_else(|| field_text(spec, "name", source));
                                    bindings.extend(binding.map(str::to_string));
                                }
                            }
                            _ => {}
                        }
                    }
                }
                add(Import::new(specifier, bindings));
            }
            "call_expression" => {
                let is_require = field_text(node, "function", source) == Some("require");
                let specifier = node
                    .child_by_field_name("arguments")
                    .and_then(|args| named_children(args).into_iter().next())
                    .filter(|arg| arg.kind() == "string")
                    .map(|arg| unquote(text(arg, source)));
                if let (true, Some(specifier)) = (is_require, specifier) {
                    let bindings = node
                        .parent()
                        .filter(|p| p.kind() == "variable_declarator")
                        .and_then(|p| p.child_by_field_name("name"))
                        .map(|name| pattern_bindings(name, source))
                        .unwrap_or_default();
                    add(Import::new(specifier, bindings));
                }
            }
            _ => {}
        }
    }
    imports
}

fn pattern_bindings(pattern: Node<'_>, source: &str) -> Vec<String> {
    match pattern.kind() {
        "identifier" => vec![text(pattern, source).to_string()],
        "object_pattern" => named_children(pattern)
            .into_iter()
            .filter_map(|p| match p.kind() {
                "shorthand_property_identifier_pattern" => Some(text(p, source).to_string()),
                "pair_pattern" => field_text(p, "value", source).map(str::to_string),
                _ => None,
            })
            .collect(),
        _ => Vec::new(),
    }
}

/// Symbols introduced by a top-level declaration
fn declaration_symbols(ctx: &FileCtx<'_>, node: Node<'_>) -> Vec<SymbolDescriptor> {
    let source = ctx.source;
    match node.kind() {
        "function_declaration" | "generator_function_declaration" | "function_expression" | "function" => field_text(node, "name", source)
            .map(|name| vec![function_symbol(ctx, name, node, None, line(node))])
            .unwrap_or_default(),
        "class_declaration" | "abstract_class_declaration" | "class" => class_symbols(ctx, node),
        "lexical_declaration" | "variable_declaration" => named_children(node)
            .into_iter()
            .filter(|d| d.kind() == "variable_declarator")
            .filter_map(|d| {
                let name = d.child_by_field_name("name").filter(|n| n.kind() == "identifier")?;
                let value = d.child_by_field_name("value")?;
                match value.kind() {
                    "arrow_function" | "function_expression" | "function" => {
                        Some(vec![function_symbol(ctx, text(name, source), value, None, line(d))])
                    }
                    "class" => Some(class_symbols(ctx, value)),
                    _ => None,
                }
            })
            .flatten()
            .collect(),
        _ => Vec::new(),
    }
}

/// `module.exports = ...`, `exports.name = ...`, `module.exports.name = ...`
fn commonjs_export(
    ctx: &FileCtx<'_>,
    statement: Node<'_>,
    symbols: &mut Vec<SymbolDescriptor>,
    exports: &mut HashMap<String, ExportStyle>,
) {
    let source = ctx.source;
    let Some(assignment) = named_children(statement)
        .into_iter()
        .find(|n| n.kind() == "assignment_expression")
    else {
        return;
    };
    let (Some(left), Some(right)) = (
        assignment.child_by_field_name("left"),
        assignment.child_by_field_name("right"),
    ) else {
        return;
    };
    let target = text(left, source);

    if target == "module.exports" {
        match right.kind() {
            "identifier" => {
                exports.insert(text(right, source).to_string(), ExportStyle::CommonJsDefault);
            }
            "object" => {
                for prop in named_children(right) {
                    match prop.kind() {
                        "shorthand_property_identifier" => {
                            exports.insert(text(prop, source).to_string(), ExportStyle::CommonJs);
                        }
                        "pair" => {
                            let key = field_text(prop, "key", source);
                            let value = field_text(prop, "value", source);
                            if key.is_some() && key == value {
                                exports.insert(key.unwrap_or_default().to_string(), ExportStyle::CommonJs);
                            }
                        }
                        _ => {}
                    }
                }
            }
            "class" => {
                for symbol in class_symbols(ctx, right) {
                    if !symbol.name.is_member() {
                        exports.insert(symbol.name.name().to_string(), ExportStyle::CommonJsDefault);
                    }
                    symbols.push(symbol);
                }
            }
            _ => {}
        }
        return;
    }

    let export_name = target
        .strip_prefix("module.exports.")
        .or_else(|| target.strip_prefix("exports."))
        .filter(|name| !name.contains('.'));
    let Some(name) = export_name else {
        return;
    };
    match right.kind() {
        "identifier" if text(right, source) == name => {
            exports.insert(name.to_string(), ExportStyle::CommonJs);
        }
        "arrow_function" | "function_expression" | "function" => {
            symbols.push(function_symbol(ctx, name, right, None, line(statement)));
            exports.insert(name.to_string(), ExportStyle::CommonJs);
        }
        _ => {}
    }
}

/// Parameters; the second value lists TypeScript parameter properties
fn parameters(node: Node<'_>, source: &str) -> (Vec<Parameter>, Vec<(String, Option<String>)>) {
    let mut params = Vec::new();
    let mut properties = Vec::new();
    let list = if node.kind() == "formal_parameters" {
        named_children(node)
    } else {
        vec![node]
    };
    for child in list {
        let (pattern, annotation, default) = match child.kind() {
            "required_parameter" | "optional_parameter" => {
                let annotation = field_text(child, "type", source)
                    .map(|t| t.trim_start_matches(':').trim().to_string());
                let default = field_text(child, "value", source)
                    .map(str::to_string)
                    .or_else(|| (child.kind() == "optional_parameter").then(|| "undefined".to_string()));
                (child.child_by_field_name("pattern"), annotation, default)
            }
            "assignment_pattern" => (
                child.child_by_field_name("left"),
                None,
                field_text(child, "right", source).map(str::to_string),
            ),
            _ => (Some(child), None, None),
        };
        let Some(pattern) = pattern else {
            continue;
        };
        let name = match pattern.kind() {
            "identifier" => text(pattern, source).to_string(),
            "object_pattern" => "options".to_string(),
            "array_pattern" => "items".to_string(),
            _ => continue,
        };
        let is_property = named_children(child)
            .iter()
            .any(|c| c.kind() == "accessibility_modifier")
            || has_token(child, "readonly");
        if is_property && annotation.as_deref().map_or(true, |a| !is_value_type(a)) {
            properties.push((name.clone(), annotation.clone()));
        }
        params.push(Parameter {
            name,
            annotation,
            default,
            keyword_only: false,
        });
    }
    (params, properties)
}

fn function_symbol(
    ctx: &FileCtx<'_>,
    name: &str,
    node: Node<'_>,
    class: Option<&ClassCtx>,
    declared_at: usize,
) -> SymbolDescriptor {
    let source = ctx.source;
    let (kind, qualified) = match class {
        Some(c) => (SymbolKind::Method, c.name.child(name)),
        None => (SymbolKind::Function, QualifiedName::top_level(ctx.module, name)),
    };
    let params = node
        .child_by_field_name("parameters")
        .or_else(|| node.child_by_field_name("parameter"))
        .map(|p| parameters(p, source).0)
        .unwrap_or_default();

    let mut symbol = SymbolDescriptor::new(kind, qualified).at_line(declared_at);
    symbol.visibility = member_visibility(node, name);
    symbol.is_async = has_token(node, "async");
    symbol.is_static = has_token(node, "static");
    symbol.return_annotation = field_text(node, "return_type", source).map(|t| t.trim_start_matches(':').trim().to_string());

    if let Some(body) = node.child_by_field_name("body") {
        if body.kind() == "statement_block" || body.kind() == "class_body" {
            let fn_ctx = FnCtx {
                params: &params,
                class,
                is_constructor: false,
            };
            analyze_body(ctx, &fn_ctx, body, &mut symbol);
        } else {
            // expression-bodied arrow function
            symbol.returns_value = true;
            let fn_ctx = FnCtx {
                params: &params,
                class,
                is_constructor: false,
            };
            analyze_expression(ctx, &fn_ctx, body, &mut symbol);
        }
    }
    let annotated_value = symbol
        .return_annotation
        .as_deref()
        .is_some_and(|a| !matches!(a, "void" | "Promise<void>" | "never" | "undefined"));
    symbol.returns_value |= annotated_value;
    symbol.parameters = params;
    symbol
}

fn member_visibility(node: Node<'_>, name: &str) -> Visibility {
    let restricted = named_children(node).iter().any(|c| {
        c.kind() == "accessibility_modifier"
            && children(*c).iter().any(|t| matches!(t.kind(), "private" | "protected"))
    });
    let accessor = has_token(node, "get") || has_token(node, "set");
    let private_name = node
        .child_by_field_name("name")
        .is_some_and(|n| n.kind() == "private_property_identifier");
    if restricted || accessor || private_name || name.starts_with('_') || name.starts_with('#') {
        Visibility::Private
    } else {
        Visibility::Public
    }
}

/// `extends` values and `implements` types of a class
fn heritage(class: Node<'_>, source: &str) -> Vec<String> {
    let mut bases = Vec::new();
    for clause in named_children(class)
        .into_iter()
        .filter(|c| c.kind() == "class_heritage")
        .flat_map(named_children)
    {
        match clause.kind() {
            "extends_clause" => {
                let mut cursor = clause.walk();
                bases.extend(
                    clause
                        .children_by_field_name("value", &mut cursor)
                        .map(|value| text(value, source).to_string()),
                );
            }
            "implements_clause" => {
                bases.extend(named_children(clause).into_iter().map(|ty| text(ty, source).to_string()));
            }
            _ => {}
        }
    }
    bases
}

fn class_symbols(ctx: &FileCtx<'_>, node: Node<'_>) -> Vec<SymbolDescriptor> {
    let source = ctx.source;
    let Some(name) = field_text(node, "name", source) else {
        return Vec::new();
    };
    let qualified = QualifiedName::top_level(ctx.module, name);
    let members: Vec<Node<'_>> = node
        .child_by_field_name("body")
        .map(named_children)
        .unwrap_or_default();

    let constructor = members
        .iter()
        .copied()
        .find(|m| m.kind() == "method_definition" && field_text(*m, "name", source) == Some("constructor"));
    let (ctor_params, properties) = constructor
        .and_then(|c| c.child_by_field_name("parameters"))
        .map(|p| parameters(p, source))
        .unwrap_or_default();

    let mut collaborators: HashMap<String, Option<String>> = properties.into_iter().collect();
    for field in members.iter().filter(|m| m.kind() == "public_field_definition") {
        let annotation = field_text(*field, "type", source).map(|t| t.trim_start_matches(':').trim().to_string());
        if let (Some(field_name), Some(annotation)) = (field_text(*field, "name", source), annotation) {
            if !is_value_type(&annotation) {
                collaborators.insert(field_name.trim_start_matches('#').to_string(), Some(annotation));
            }
        }
    }
    if let Some(body) = constructor.and_then(|c| c.child_by_field_name("body")) {
        constructor_collaborators(body, &ctor_params, source, &mut collaborators);
    }

    let class_ctx = ClassCtx {
        name: qualified.clone(),
        collaborators,
    };

    let mut class_symbol = SymbolDescriptor::new(SymbolKind::Class, qualified).at_line(line(node));
    class_symbol.visibility = if name.starts_with('_') {
        Visibility::Private
    } else {
        Visibility::Public
    };
    class_symbol.bases = heritage(node, source);
    if let Some(body) = constructor.and_then(|c| c.child_by_field_name("body")) {
        let fn_ctx = FnCtx {
            params: &ctor_params,
            class: Some(&class_ctx),
            is_constructor: true,
        };
        analyze_body(ctx, &fn_ctx, body, &mut class_symbol);
        class_symbol.returns_value = false;
    }
    class_symbol.parameters = ctor_params;

    let mut symbols = vec![class_symbol];
    for member in members {
        if member.kind() != "method_definition" || Some(member) == constructor {
            continue;
        }
        let Some(member_name) = field_text(member, "name", source) else {
            continue;
        };
        symbols.push(function_symbol(ctx, member_name, member, Some(&class_ctx), line(member)));
    }
    symbols
}

fn constructor_collaborators(
    body: Node<'_>,
    params: &[Parameter],
    source: &str,
    collaborators: &mut HashMap<String, Option<String>>,
) {
    for node in body_nodes(body, is_function_scope) {
        if node.kind() != "assignment_expression" {
            continue;
        }
        let (Some(left), Some(right)) = (node.child_by_field_name("left"), node.child_by_field_name("right")) else {
            continue;
        };
        let (root, segments) = member_chain(left, source);
        if root.kind() != "this" || segments.len() != 1 {
            continue;
        }
        let attr = segments[0].trim_start_matches('#').to_string();
        let value = if right.kind() == "binary_expression" {
            right.child_by_field_name("left").unwrap_or(right)
        } else {
            right
        };
        match value.kind() {
            "identifier" => {
                let name = text(value, source);
                if let Some(param) = params.iter().find(|p| p.name == name) {
                    if param.annotation.as_deref().map_or(true, |a| !is_value_type(a)) {
                        collaborators.insert(attr, param.annotation.clone());
                    }
                }
            }
            "new_expression" => {
                let ty = field_text(value, "constructor", source).unwrap_or_default();
                if !matches!(ty, "Map" | "Set" | "Array" | "Date" | "Object" | "WeakMap" | "WeakSet") {
                    collaborators.insert(attr, Some(ty.to_string()));
                }
            }
            _ => {}
        }
    }
}

/// Root of a member-expression chain and the property names after it
fn member_chain<'t, 's>(node: Node<'t>, source: &'s str) -> (Node<'t>, Vec<&'s str>) {
    let mut segments = Vec::new();
    let mut current = node;
    while current.kind() == "member_expression" {
        if let Some(property) = field_text(current, "property", source) {
            segments.push(property);
        }
        match current.child_by_field_name("object") {
            Some(object) => current = object,
            None => break,
        }
    }
    segments.reverse();
    (current, segments)
}

fn analyze_body(ctx: &FileCtx<'_>, fn_ctx: &FnCtx<'_>, body: Node<'_>, symbol: &mut SymbolDescriptor) {
    let source = ctx.source;
    for node in body_nodes(body, is_function_scope) {
        let kind = node.kind();
        if BRANCH_KINDS.contains(&kind) {
            symbol.branch_count += 1;
        }
        match kind {
            "return_statement" if node.named_child_count() > 0 => symbol.returns_value = true,
            "try_statement" => symbol.handles_errors = true,
            "binary_expression" => {
                if matches!(field_text(node, "operator", source), Some("&&" | "||" | "??")) {
                    symbol.branch_count += 1;
                }
            }
            "throw_statement" => {
                if let Some(thrown) = named_children(node).into_iter().next() {
                    let error_type = match thrown.kind() {
                        "new_expression" => field_text(thrown, "constructor", source),
                        "identifier" => Some(text(thrown, source)),
                        _ => None,
                    };
                    push_unique(&mut symbol.error_paths, ErrorPath::raised(error_type.map(str::to_string)));
                }
            }
            _ => {}
        }
    }
    analyze_expression(ctx, fn_ctx, body, symbol);
}

/// Calls and mutations, including those inside callbacks
fn analyze_expression(ctx: &FileCtx<'_>, fn_ctx: &FnCtx<'_>, body: Node<'_>, symbol: &mut SymbolDescriptor) {
    let mut nodes = vec![body];
    nodes.extend(body_nodes(body, is_declaration_scope));
    for node in nodes {
        match node.kind() {
            "call_expression" => analyze_call(ctx, fn_ctx, node, symbol),
            "assignment_expression" | "augmented_assignment_expression" if !fn_ctx.is_constructor => {
                if let Some(left) = node.child_by_field_name("left") {
                    record_mutation(left, ctx.source, symbol);
                }
            }
            "update_expression" if !fn_ctx.is_constructor => {
                if let Some(argument) = node.child_by_field_name("argument") {
                    record_mutation(argument, ctx.source, symbol);
                }
            }
            _ => {}
        }
    }
}

fn record_mutation(target: Node<'_>, source: &str, symbol: &mut SymbolDescriptor) {
    let target = if target.kind() == "subscript_expression" {
        match target.child_by_field_name("object") {
            Some(object) => object,
            None => return,
        }
    } else {
        target
    };
    let (root, segments) = member_chain(target, source);
    if root.kind() == "this" {
        if let Some(first) = segments.first() {
            push_unique(
                &mut symbol.side_effects,
                SideEffect::MutatesSharedState {
                    target: format!("this.{}", first.trim_start_matches('#')),
                },
            );
        }
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
            if name == "require" {
                return;
            }
            push_unique(&mut symbol.calls, name.to_string());
            let imported_io = ctx
                .import_binding(name)
                .is_some_and(|i| IO_MODULES.contains(&i.specifier.as_str()));
            if IO_FUNCTIONS.contains(&name) || imported_io {
                push_unique(&mut symbol.side_effects, SideEffect::PerformsIo { call: name.to_string() });
            }
        }
        "member_expression" => {
            let (root, segments) = member_chain(function, source);
            let Some(last) = segments.last().copied() else {
                return;
            };
            push_unique(&mut symbol.calls, last.trim_start_matches('#').to_string());
            match root.kind() {
                "this" => this_call(fn_ctx, &segments, arg_count, symbol),
                "identifier" => {
                    let root_name = text(root, source);
                    if IO_GLOBALS.contains(&root_name) {
                        push_unique(
                            &mut symbol.side_effects,
                            SideEffect::PerformsIo {
                                call: text(function, source).to_string(),
                            },
                        );
                    } else if let Some(index) = fn_ctx.params.iter().position(|p| p.name == root_name) {
                        let param = &fn_ctx.params[index];
                        let collaborator = param.annotation.as_deref().map_or(true, |a| !is_value_type(a));
                        if collaborator && !VALUE_METHODS.contains(&segments[0]) {
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
                        let specifier = import.specifier.as_str();
                        if IO_MODULES.contains(&specifier) {
                            push_unique(
                                &mut symbol.side_effects,
                                SideEffect::PerformsIo {
                                    call: text(function, source).to_string(),
                                },
                            );
                        }
                        if !PURE_MODULES.contains(&specifier) {
                            push_unique(
                                &mut symbol.side_effects,
                                SideEffect::ExternalCall(Dependency {
                                    name: root_name.to_string(),
                                    member: segments.join("."),
                                    arg_count,
                                    injection: Injection::Module {
                                        specifier: specifier.to_string(),
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
        _ => {}
    }
}

fn this_call(fn_ctx: &FnCtx<'_>, segments: &[&str], arg_count: usize, symbol: &mut SymbolDescriptor) {
    if segments.len() < 2 {
        return;
    }
    let attr = segments[0].trim_start_matches('#');
    let collaborator = fn_ctx.class.and_then(|c| c.collaborators.get(attr));
    match collaborator {
        Some(type_hint) if !VALUE_METHODS.contains(&segments[1]) => push_unique(
            &mut symbol.side_effects,
            SideEffect::ExternalCall(Dependency {
                name: attr.to_string(),
                member: segments[1..].join("."),
                arg_count,
                injection: Injection::Attribute,
                type_hint: type_hint.clone(),
                arg_types: Vec::new(),
            }),
        ),
        _ if segments.len() == 2 && MUTATING_METHODS.contains(&segments[1]) && !fn_ctx.is_constructor => push_unique(
            &mut symbol.side_effects,
            SideEffect::MutatesSharedState {
                target: format!("this.{attr}"),
            },
        ),
        _ => {}
    }
}
