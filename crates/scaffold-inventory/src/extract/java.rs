//! Java extraction (tree-sitter-java)
//!
//! Top-level classes and their methods only; interfaces, enums, records and
//! nested types are not planned. A file's module is `<package>.<Stem>` so
//! qualified names match the fully qualified class names other files import.

use std::collections::HashMap;

use scaffold_model::{
    file_stem, Dependency, ErrorPath, Import, Injection, Language, Parameter, QualifiedName, SideEffect,
    SymbolDescriptor, SymbolKind, Visibility,
};
use tree_sitter::{Language as Grammar, Node};

use super::syntax::{body_nodes, children, field_text, has_token, line, named_children, parse, push_unique, text};
use super::{is_value_type, Extraction, Extractor, SourceFile};
use crate::error::ExtractError;

/// Classes whose static methods or construction perform I/O
const IO_TYPES: &[&str] = &[
    "Files", "File", "FileReader", "FileWriter", "FileInputStream", "FileOutputStream", "BufferedReader",
    "BufferedWriter", "PrintWriter", "Socket", "ServerSocket", "HttpClient", "URL", "RandomAccessFile",
];

const VALUE_METHODS: &[&str] = &[
    "add", "addAll", "get", "put", "putAll", "remove", "contains", "containsKey", "size", "isEmpty", "stream",
    "equals", "hashCode", "toString", "length", "charAt", "substring", "trim", "split", "format", "valueOf",
    "getOrDefault", "forEach", "iterator", "keySet", "values", "entrySet", "compareTo",
];

const MUTATING_METHODS: &[&str] = &["add", "addAll", "put", "putAll", "remove", "clear", "set", "offer", "push", "poll"];

const BRANCH_KINDS: &[&str] = &[
    "if_statement", "for_statement", "enhanced_for_statement", "while_statement", "do_statement", "switch_label",
    "catch_clause", "ternary_expression",
];

fn is_scope(kind: &str) -> bool {
    matches!(
        kind,
        "class_declaration" | "class_body" | "lambda_expression" | "interface_declaration" | "enum_declaration"
            | "record_declaration"
    )
}

/// Java extractor
#[derive(Debug, Clone, Copy, Default)]
pub struct JavaExtractor;

impl Extractor for JavaExtractor {
    fn languages(&self) -> &'static [Language] {
        &[Language::Java]
    }

    fn extract(&self, file: &SourceFile<'_>) -> Result<Extraction, ExtractError> {
        let grammar: Grammar = tree_sitter_java::LANGUAGE.into();
        let tree = parse(file.text, &grammar)?;
        let root = tree.root_node();
        let source = file.text;

        let mut namespace = None;
        let mut imports: Vec<Import> = Vec::new();
        for node in named_children(root) {
            match node.kind() {
                "package_declaration" => {
                    namespace = named_children(node)
                        .into_iter()
                        .find(|n| matches!(n.kind(), "scoped_identifier" | "identifier"))
                        .map(|n| text(n, source).to_string());
                }
                "import_declaration" => {
                    let Some(path) = named_children(node)
                        .into_iter()
                        .find(|n| matches!(n.kind(), "scoped_identifier" | "identifier"))
                        .map(|n| text(n, source))
                    else {
                        continue;
                    };
                    let wildcard = named_children(node).iter().any(|n| n.kind() == "asterisk");
                    let is_static = has_token(node, "static");
                    let import = match (is_static, wildcard) {
                        (true, true) => Import::new(path, Vec::<String>::new()).static_member(),
                        (true, false) => match path.rsplit_once('.') {
                            Some((class, member)) => Import::new(class, [member]).static_member(),
                            None => continue,
                        },
                        (false, true) => Import::new(format!("{path}.*"), Vec::<String>::new()),
                        (false, false) => Import::new(path, path.rsplit('.').next()),
                    };
                    match imports
                        .iter_mut()
                        .find(|i| i.specifier == import.specifier && i.is_static == import.is_static)
                    {
                        Some(existing) => {
                            for binding in import.bindings {
                                if !existing.bindings.contains(&binding) {
                                    existing.bindings.push(binding);
                                }
                            }
                        }
                        None => imports.push(import),
                    }
                }
                _ => {}
            }
        }

        let stem = file_stem(file.path);
        let module = match &namespace {
            Some(package) => format!("{package}.{stem}"),
            None => stem.to_string(),
        };

        let ctx = FileCtx {
            source,
            module: &module,
            imports: &imports,
        };
        let symbols = named_children(root)
            .into_iter()
            .filter(|n| n.kind() == "class_declaration")
            .flat_map(|class| class_symbols(&ctx, class))
            .collect();

        Ok(Extraction {
            symbols,
            imports,
            namespace,
            module: Some(module),
        })
    }
}

struct FileCtx<'a> {
    source: &'a str,
    module: &'a str,
    imports: &'a [Import],
}

struct ClassCtx<'a> {
    name: QualifiedName,
    fields: HashMap<String, String>,
    collaborators: &'a HashMap<String, String>,
}

struct FnCtx<'a> {
    params: &'a [Parameter],
    class: &'a ClassCtx<'a>,
    is_constructor: bool,
}

fn modifier_tokens<'s>(node: Node<'_>, source: &'s str) -> Vec<&'s str> {
    named_children(node)
        .into_iter()
        .filter(|c| c.kind() == "modifiers")
        .flat_map(children)
        .filter(|m| !m.is_named())
        .map(|m| text(m, source))
        .collect()
}

fn parameters(node: Option<Node<'_>>, source: &str) -> Vec<Parameter> {
    let Some(node) = node else {
        return Vec::new();
    };
    named_children(node)
        .into_iter()
        .filter(|p| p.kind() == "formal_parameter")
        .filter_map(|p| {
            let name = field_text(p, "name", source)?;
            let mut param = Parameter::new(name);
            param.annotation = field_text(p, "type", source).map(str::to_string);
            Some(param)
        })
        .collect()
}

fn class_symbols(ctx: &FileCtx<'_>, class: Node<'_>) -> Vec<SymbolDescriptor> {
    let source = ctx.source;
    let Some(name) = field_text(class, "name", source) else {
        return Vec::new();
    };
    let modifiers = modifier_tokens(class, source);
    let class_public = modifiers.contains(&"public") && !modifiers.contains(&"abstract");
    let qualified = QualifiedName::top_level(ctx.module, name);
    let members: Vec<Node<'_>> = class.child_by_field_name("body").map(named_children).unwrap_or_default();

    let mut fields = HashMap::new();
    let mut collaborators = HashMap::new();
    for field in members.iter().filter(|m| m.kind() == "field_declaration") {
        let Some(ty) = field_text(*field, "type", source) else {
            continue;
        };
        let mut cursor = field.walk();
        for declarator in field.children_by_field_name("declarator", &mut cursor) {
            if let Some(field_name) = field_text(declarator, "name", source) {
                fields.insert(field_name.to_string(), ty.to_string());
                if !is_value_type(ty) {
                    collaborators.insert(field_name.to_string(), ty.to_string());
                }
            }
        }
    }

    let constructor = members.iter().copied().find(|m| m.kind() == "constructor_declaration");
    let ctor_params = parameters(constructor.and_then(|c| c.child_by_field_name("parameters")), source);

    let class_ctx = ClassCtx {
        name: qualified.clone(),
        fields,
        collaborators: &collaborators,
    };

    let mut class_symbol = SymbolDescriptor::new(SymbolKind::Class, qualified)
        .at_line(line(class))
        .with_visibility(if class_public { Visibility::Public } else { Visibility::Private });
    class_symbol.bases = supertypes(class, source);
    if let Some(ctor) = constructor {
        declared_throws(ctor, source, &mut class_symbol);
        if let Some(body) = ctor.child_by_field_name("body") {
            let fn_ctx = FnCtx {
                params: &ctor_params,
                class: &class_ctx,
                is_constructor: true,
            };
            analyze_body(ctx, &fn_ctx, body, &mut class_symbol);
        }
    }
    class_symbol.parameters = ctor_params;

    let mut symbols = vec![class_symbol];
    for method in members.iter().copied().filter(|m| m.kind() == "method_declaration") {
        let Some(method_name) = field_text(method, "name", source) else {
            continue;
        };
        let modifiers = modifier_tokens(method, source);
        let params = parameters(method.child_by_field_name("parameters"), source);
        let return_type = field_text(method, "type", source).map(str::to_string);

        let mut symbol = SymbolDescriptor::new(SymbolKind::Method, class_ctx.name.child(method_name))
            .at_line(line(method))
            .with_visibility(if modifiers.contains(&"public") {
                Visibility::Public
            } else {
                Visibility::Private
            });
        symbol.is_static = modifiers.contains(&"static");
        symbol.returns_value = return_type.as_deref().is_some_and(|t| t != "void");
        symbol.return_annotation = return_type;
        declared_throws(method, source, &mut symbol);
        if let Some(body) = method.child_by_field_name("body") {
            let fn_ctx = FnCtx {
                params: &params,
                class: &class_ctx,
                is_constructor: false,
            };
            analyze_body(ctx, &fn_ctx, body, &mut symbol);
        }
        symbol.parameters = params;
        symbols.push(symbol);
    }
    symbols
}

/// `extends` class then `implements` interfaces, as written
fn supertypes(class: Node<'_>, source: &str) -> Vec<String> {
    let superclass = class.child_by_field_name("superclass").into_iter().flat_map(named_children);
    let interfaces = class
        .child_by_field_name("interfaces")
        .into_iter()
        .flat_map(named_children)
        .filter(|list| list.kind() == "type_list")
        .flat_map(named_children);
    superclass.chain(interfaces).map(|ty| text(ty, source).to_string()).collect()
}

fn declared_throws(node: Node<'_>, source: &str, symbol: &mut SymbolDescriptor) {
    for throws in named_children(node).into_iter().filter(|c| c.kind() == "throws") {
        for ty in named_children(throws) {
            push_unique(&mut symbol.error_paths, ErrorPath::declared(text(ty, source)));
        }
    }
}

fn analyze_body(ctx: &FileCtx<'_>, fn_ctx: &FnCtx<'_>, body: Node<'_>, symbol: &mut SymbolDescriptor) {
    let source = ctx.source;
    for node in body_nodes(body, is_scope) {
        let kind = node.kind();
        if BRANCH_KINDS.contains(&kind) {
            symbol.branch_count += 1;
        }
        match kind {
            "try_statement" | "try_with_resources_statement" => symbol.handles_errors = true,
            "binary_expression" => {
                if matches!(field_text(node, "operator", source), Some("&&" | "||")) {
                    symbol.branch_count += 1;
                }
            }
            "throw_statement" => {
                let thrown = named_children(node).into_iter().next();
                let error_type = thrown.and_then(|t| match t.kind() {
                    "object_creation_expression" => field_text(t, "type", source),
                    "identifier" => Some(text(t, source)),
                    _ => None,
                });
                push_unique(&mut symbol.error_paths, ErrorPath::raised(error_type.map(str::to_string)));
            }
            "object_creation_expression" => {
                if let Some(ty) = field_text(node, "type", source) {
                    if IO_TYPES.contains(&ty) {
                        push_unique(&mut symbol.side_effects, SideEffect::PerformsIo { call: format!("new {ty}") });
                    }
                }
            }
            "method_invocation" => analyze_call(ctx, fn_ctx, node, symbol),
            "assignment_expression" if !fn_ctx.is_constructor => {
                if let Some(left) = node.child_by_field_name("left") {
                    record_mutation(fn_ctx, left, source, symbol);
                }
            }
            "update_expression" if !fn_ctx.is_constructor => {
                if let Some(target) = named_children(node).into_iter().next() {
                    record_mutation(fn_ctx, target, source, symbol);
                }
            }
            _ => {}
        }
    }
}

/// Field a target expression names: `this.count`, or a bare field not shadowed by a parameter
fn field_target<'s>(fn_ctx: &FnCtx<'_>, target: Node<'_>, source: &'s str) -> Option<&'s str> {
    match target.kind() {
        "field_access" => {
            let object = target.child_by_field_name("object")?;
            (object.kind() == "this").then(|| field_text(target, "field", source)).flatten()
        }
        "identifier" => {
            let name = text(target, source);
            let shadowed = fn_ctx.params.iter().any(|p| p.name == name);
            (!shadowed && fn_ctx.class.fields.contains_key(name)).then_some(name)
        }
        _ => None,
    }
}

fn record_mutation(fn_ctx: &FnCtx<'_>, target: Node<'_>, source: &str, symbol: &mut SymbolDescriptor) {
    let target = if target.kind() == "array_access" {
        match target.child_by_field_name("array") {
            Some(array) => array,
            None => return,
        }
    } else {
        target
    };
    if let Some(field) = field_target(fn_ctx, target, source) {
        push_unique(
            &mut symbol.side_effects,
            SideEffect::MutatesSharedState {
                target: format!("this.{field}"),
            },
        );
    }
}

/// Static type of a call argument, when the expression makes it evident
fn argument_type(fn_ctx: &FnCtx<'_>, argument: Node<'_>, source: &str) -> Option<String> {
    let literal = text(argument, source);
    let has_suffix = |suffixes: &str| literal.ends_with(|c: char| suffixes.contains(c));
    let known = match argument.kind() {
        "decimal_integer_literal" | "hex_integer_literal" | "octal_integer_literal" | "binary_integer_literal" => {
            if has_suffix("lL") {
                "long"
            } else {
                "int"
            }
        }
        "decimal_floating_point_literal" | "hex_floating_point_literal" => {
            if has_suffix("fF") {
                "float"
            } else {
                "double"
            }
        }
        "string_literal" | "text_block" => "String",
        "character_literal" => "char",
        "true" | "false" => "boolean",
        "object_creation_expression" | "cast_expression" => return field_text(argument, "type", source).map(str::to_string),
        "identifier" => {
            return match fn_ctx.params.iter().find(|p| p.name == literal) {
                Some(param) => param.annotation.clone(),
                None => fn_ctx.class.fields.get(literal).cloned(),
            };
        }
        "field_access" => {
            let field = field_target(fn_ctx, argument, source)?;
            return fn_ctx.class.fields.get(field).cloned();
        }
        _ => return None,
    };
    Some(known.to_string())
}

fn analyze_call(ctx: &FileCtx<'_>, fn_ctx: &FnCtx<'_>, call: Node<'_>, symbol: &mut SymbolDescriptor) {
    let source = ctx.source;
    let Some(member) = field_text(call, "name", source) else {
        return;
    };
    push_unique(&mut symbol.calls, member.to_string());
    let Some(object) = call.child_by_field_name("object") else {
        return;
    };
    let arguments: Vec<Node<'_>> = call
        .child_by_field_name("arguments")
        .map(named_children)
        .unwrap_or_default()
        .into_iter()
        .filter(|a| !a.kind().ends_with("comment"))
        .collect();
    let arg_count = arguments.len();
    let arg_types = || -> Vec<Option<String>> {
        arguments
            .iter()
            .map(|a| argument_type(fn_ctx, *a, source))
            .collect()
    };
    let object_text = text(object, source);

    if matches!(object_text, "System.out" | "System.err" | "System.in") {
        push_unique(
            &mut symbol.side_effects,
            SideEffect::PerformsIo {
                call: format!("{object_text}.{member}"),
            },
        );
        return;
    }

    if let Some(field) = field_target(fn_ctx, object, source) {
        if let Some(ty) = fn_ctx.class.collaborators.get(field) {
            if !VALUE_METHODS.contains(&member) {
                push_unique(
                    &mut symbol.side_effects,
                    SideEffect::ExternalCall(Dependency {
                        name: field.to_string(),
                        member: member.to_string(),
                        arg_count,
                        injection: Injection::Attribute,
                        type_hint: Some(ty.clone()),
                        arg_types: arg_types(),
                    }),
                );
            }
        } else if MUTATING_METHODS.contains(&member) && !fn_ctx.is_constructor {
            push_unique(
                &mut symbol.side_effects,
                SideEffect::MutatesSharedState {
                    target: format!("this.{field}"),
                },
            );
        }
        return;
    }

    if object.kind() != "identifier" {
        return;
    }
    if let Some(index) = fn_ctx.params.iter().position(|p| p.name == object_text) {
        let param = &fn_ctx.params[index];
        let collaborator = param.annotation.as_deref().is_some_and(|a| !is_value_type(a));
        if collaborator && !VALUE_METHODS.contains(&member) {
            push_unique(
                &mut symbol.side_effects,
                SideEffect::ExternalCall(Dependency {
                    name: object_text.to_string(),
                    member: member.to_string(),
                    arg_count,
                    injection: Injection::Argument { index },
                    type_hint: param.annotation.clone(),
                    arg_types: arg_types(),
                }),
            );
        }
        return;
    }

    if IO_TYPES.contains(&object_text) {
        push_unique(
            &mut symbol.side_effects,
            SideEffect::PerformsIo {
                call: format!("{object_text}.{member}"),
            },
        );
        return;
    }
    let starts_upper = object_text.chars().next().is_some_and(char::is_uppercase);
    let imported = ctx
        .imports
        .iter()
        .find(|i| i.bindings.iter().any(|b| b == object_text))
        .filter(|i| !i.specifier.starts_with("java.") && !i.specifier.starts_with("javax."));
    if let (true, Some(import)) = (starts_upper, imported) {
        push_unique(
            &mut symbol.side_effects,
            SideEffect::ExternalCall(Dependency {
                name: object_text.to_string(),
                member: member.to_string(),
                arg_count,
                injection: Injection::Module {
                    specifier: import.specifier.clone(),
                },
                type_hint: Some(object_text.to_string()),
                arg_types: arg_types(),
            }),
        );
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use super::*;
    use pretty_assertions::assert_eq;

    const BILLING: &str = r#"
package com.acme.billing;

import java.util.List;
import java.io.IOException;
import com.acme.audit.AuditLog;
import com.acme.util.*;

public class BillingService {
    private final PaymentGateway gateway;
    private final List<String> history;
    private int charges;

    public BillingService(PaymentGateway gateway) {
        this.gateway = gateway;
        this.history = new java.util.ArrayList<>();
    }

    public Receipt charge(long amount, String currency) throws IOException {
        if (amount <= 0 || currency == null) {
            throw new IllegalArgumentException("amount");
        }
        Receipt receipt = gateway.charge(amount, currency);
        AuditLog.record(receipt);
        charges++;
        return receipt;
    }

    public void remember(String entry) {
        history.add(entry);
    }

    public static int add(int a, int b) {
        return a + b;
    }

    void internal() {
        System.out.println("x");
    }
}

interface Ignored {
    void nothing();
}
"#;

    fn extract() -> Extraction {
        let file = SourceFile {
            path: Path::new("src/main/java/com/acme/billing/BillingService.java"),
            language: Language::Java,
            module: "src.main.java.com.acme.billing.BillingService",
            text: BILLING,
        };
        JavaExtractor.extract(&file).expect("parses")
    }

    fn symbol<'a>(extraction: &'a Extraction, name: &str) -> &'a SymbolDescriptor {
        extraction
            .symbols
            .iter()
            .find(|s| s.name.to_string() == name)
            .unwrap_or_else(|| panic!("{name} not extracted"))
    }

    #[test]
    fn package_becomes_module() {
        let extraction = extract();
        assert_eq!(extraction.namespace.as_deref(), Some("com.acme.billing"));
        assert_eq!(extraction.module.as_deref(), Some("com.acme.billing.BillingService"));
        let names: Vec<String> = extraction.symbols.iter().map(|s| s.name.to_string()).collect();
        assert_eq!(
            names,
            vec![
                "com.acme.billing.BillingService:BillingService",
                "com.acme.billing.BillingService:BillingService.charge",
                "com.acme.billing.BillingService:BillingService.remember",
                "com.acme.billing.BillingService:BillingService.add",
                "com.acme.billing.BillingService:BillingService.internal",
            ]
        );
    }

    #[test]
    fn imports_bind_simple_names() {
        let extraction = extract();
        assert_eq!(extraction.imports[0], Import::new("java.util.List", ["List"]));
        assert_eq!(extraction.imports[3], Import::new("com.acme.util.*", Vec::<String>::new()));
    }

    #[test]
    fn method_facts() {
        let extraction = extract();
        let class = symbol(&extraction, "com.acme.billing.BillingService:BillingService");
        assert_eq!(class.arity(), 1);
        assert_eq!(class.parameters[0].annotation.as_deref(), Some("PaymentGateway"));
        assert!(!class.mutates_state());

        let charge = symbol(&extraction, "com.acme.billing.BillingService:BillingService.charge");
        assert!(charge.returns_value);
        assert_eq!(charge.branch_count, 2);
        assert_eq!(charge.error_paths[0], ErrorPath::declared("IOException"));
        assert_eq!(charge.error_paths[1], ErrorPath::raised(Some("IllegalArgumentException".into())));
        let deps = charge.dependencies();
        assert_eq!(deps.len(), 2);
        assert_eq!(deps[0].name, "gateway");
        assert_eq!(deps[0].injection, Injection::Attribute);
        assert_eq!(
            deps[1].injection,
            Injection::Module {
                specifier: "com.acme.audit.AuditLog".into()
            }
        );
        assert!(charge.mutates_state());
    }

    #[test]
    fn static_imports_name_their_class() {
        let source = "package a;\nimport static com.acme.Money.cents;\nimport static com.acme.Money.euros;\nimport static org.junit.Assert.*;\nclass A {}\n";
        let extraction = JavaExtractor
            .extract(&SourceFile {
                path: Path::new("a/A.java"),
                language: Language::Java,
                module: "a.A",
                text: source,
            })
            .expect("parses");
        assert_eq!(
            extraction.imports,
            vec![
                Import::new("com.acme.Money", ["cents", "euros"]).static_member(),
                Import::new("org.junit.Assert", Vec::<String>::new()).static_member(),
            ]
        );
    }

    #[test]
    fn call_arguments_carry_types() {
        let extraction = extract();
        let charge = symbol(&extraction, "com.acme.billing.BillingService:BillingService.charge");
        let deps = charge.dependencies();
        assert_eq!(deps[0].arg_types, vec![Some("long".to_string()), Some("String".to_string())]);
        assert_eq!(deps[1].arg_types, vec![None]);
    }

    #[test]
    fn supertypes_are_recorded() {
        let source = "package a;\npublic class Repo extends Base<User> implements Closeable, Store<User> {}\n";
        let extraction = JavaExtractor
            .extract(&SourceFile {
                path: Path::new("a/Repo.java"),
                language: Language::Java,
                module: "a.Repo",
                text: source,
            })
            .expect("parses");
        assert_eq!(extraction.symbols[0].bases, vec!["Base<User>", "Closeable", "Store<User>"]);
    }

    #[test]
    fn statics_and_visibility() {
        let extraction = extract();
        let remember = symbol(&extraction, "com.acme.billing.BillingService:BillingService.remember");
        assert!(remember.mutates_state());
        assert!(!remember.returns_value);

        let add = symbol(&extraction, "com.acme.billing.BillingService:BillingService.add");
        assert!(add.is_static);
        assert_eq!(add.parameters[0].annotation.as_deref(), Some("int"));

        let internal = symbol(&extraction, "com.acme.billing.BillingService:BillingService.internal");
        assert_eq!(internal.visibility, Visibility::Private);
        assert!(internal.performs_io());
    }
}
