//! Per-file structural summaries
//!
//! A [`FileSummary`] is everything the later stages know about a source file:
//! its declared symbols, their parameters and hints about what they do. No
//! syntax tree survives past the inventory.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::hash::ContentHash;
use crate::language::Language;
use crate::name::QualifiedName;

/// Kind of a declared symbol
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SymbolKind {
    /// Free function
    Function,
    /// Function declared inside a class
    Method,
    /// Class (or Java type)
    Class,
}

impl std::fmt::Display for SymbolKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            SymbolKind::Function => "function",
            SymbolKind::Method => "method",
            SymbolKind::Class => "class",
        })
    }
}

/// Declared visibility, before any language convention is applied
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    /// No marker restricting access
    #[default]
    Public,
    /// Explicitly or conventionally private (including protected/package)
    Private,
}

/// How a JavaScript/TypeScript symbol leaves its module
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ExportStyle {
    /// Not exported (or not applicable to the language)
    #[default]
    None,
    /// `export function f` / `export class C`
    EsModule,
    /// `export default`
    EsDefault,
    /// `exports.f = ...` / `module.exports = { f }`
    CommonJs,
    /// `module.exports = F`
    CommonJsDefault,
}

impl ExportStyle {
    /// Whether the symbol is visible to importers
    #[inline]
    #[must_use]
    pub fn is_exported(&self) -> bool {
        !matches!(self, ExportStyle::None)
    }
}

/// One declared parameter
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Parameter {
    /// Parameter name as declared
    pub name: String,
    /// Type annotation text, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub annotation: Option<String>,
    /// Default value source text, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,
    /// Must be passed by keyword (Python `*, name`)
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub keyword_only: bool,
}

impl Parameter {
    /// Untyped parameter
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            annotation: None,
            default: None,
            keyword_only: false,
        }
    }

    /// Attach a type annotation
    #[must_use]
    pub fn with_annotation(mut self, annotation: impl Into<String>) -> Self {
        self.annotation = Some(annotation.into());
        self
    }

    /// Attach a default value
    #[must_use]
    pub fn with_default(mut self, default: impl Into<String>) -> Self {
        self.default = Some(default.into());
        self
    }

    /// Mark as keyword-only
    #[must_use]
    pub fn keyword_only(mut self) -> Self {
        self.keyword_only = true;
        self
    }
}

/// A way the symbol can fail
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorPath {
    /// Exception/error type name, when it could be read from the source
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_type: Option<String>,
    /// Whether the error is declared (`throws`) rather than raised in the body
    #[serde(default)]
    pub declared: bool,
}

impl ErrorPath {
    /// Error raised/thrown in the body
    #[must_use]
    pub fn raised(error_type: Option<String>) -> Self {
        Self {
            error_type,
            declared: false,
        }
    }

    /// Error declared in the signature
    #[must_use]
    pub fn declared(error_type: impl Into<String>) -> Self {
        Self {
            error_type: Some(error_type.into()),
            declared: true,
        }
    }
}

/// How a dependency reaches the symbol
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "via", rename_all = "lowercase")]
pub enum Injection {
    /// Passed in as the parameter at `index`
    Argument {
        /// Zero-based parameter index
        index: usize,
    },
    /// Held as an attribute/field of the receiver (`self.client`, `this.client`)
    Attribute,
    /// Imported module binding
    Module {
        /// Import specifier the binding comes from
        specifier: String,
    },
}

/// A named collaborator the symbol calls into
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Dependency {
    /// Binding name, e.g. `paymentClient`
    pub name: String,
    /// Member invoked on it, e.g. `charge`
    pub member: String,
    /// Number of arguments passed at the call site
    pub arg_count: usize,
    /// Where the binding comes from
    pub injection: Injection,
    /// Declared type of the binding, if known
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub type_hint: Option<String>,
    /// Static type of each call-site argument, where the extractor could tell
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub arg_types: Vec<Option<String>>,
}

/// Hint about what a symbol does beyond computing a value
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "effect", rename_all = "kebab-case")]
pub enum SideEffect {
    /// Reads or writes files, sockets, processes or the console
    PerformsIo {
        /// Call that triggered the hint, e.g. `open`
        call: String,
    },
    /// Assigns to receiver or module-level state
    MutatesSharedState {
        /// Assigned target, e.g. `self.users`
        target: String,
    },
    /// Calls into a named dependency
    ExternalCall(Dependency),
}

impl SideEffect {
    /// The dependency behind an external call
    #[inline]
    #[must_use]
    pub fn dependency(&self) -> Option<&Dependency> {
        match self {
            SideEffect::ExternalCall(dep) => Some(dep),
            _ => None,
        }
    }
}

/// One declared symbol
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SymbolDescriptor {
    /// Function, method or class
    pub kind: SymbolKind,
    /// Fully qualified name
    pub name: QualifiedName,
    /// 1-based declaration line
    pub line: usize,
    /// Declared visibility
    #[serde(default)]
    pub visibility: Visibility,
    /// Export style (JavaScript/TypeScript only)
    #[serde(default)]
    pub export: ExportStyle,
    /// Parameters, receivers and variadics excluded. For classes, the constructor's.
    #[serde(default)]
    pub parameters: Vec<Parameter>,
    /// Return annotation text
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub return_annotation: Option<String>,
    /// Body returns a value on some path
    #[serde(default)]
    pub returns_value: bool,
    /// `async def` / `async function`
    #[serde(default)]
    pub is_async: bool,
    /// `static`, `@staticmethod`, `@classmethod`
    #[serde(default)]
    pub is_static: bool,
    /// Declared and raised error types
    #[serde(default)]
    pub error_paths: Vec<ErrorPath>,
    /// Body contains a try/except or try/catch
    #[serde(default)]
    pub handles_errors: bool,
    /// Side-effect hints
    #[serde(default)]
    pub side_effects: Vec<SideEffect>,
    /// Bare names of called functions and methods
    #[serde(default)]
    pub calls: Vec<String>,
    /// Number of decision points in the body
    #[serde(default)]
    pub branch_count: u32,
    /// Classes extended and interfaces implemented, as written (classes only)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub bases: Vec<String>,
}

impl SymbolDescriptor {
    /// Descriptor with no parameters or hints
    #[must_use]
    pub fn new(kind: SymbolKind, name: QualifiedName) -> Self {
        Self {
            kind,
            name,
            line: 1,
            visibility: Visibility::Public,
            export: ExportStyle::None,
            parameters: Vec::new(),
            return_annotation: None,
            returns_value: false,
            is_async: false,
            is_static: false,
            error_paths: Vec::new(),
            handles_errors: false,
            side_effects: Vec::new(),
            calls: Vec::new(),
            branch_count: 0,
            bases: Vec::new(),
        }
    }

    /// Builder: declaration line
    #[must_use]
    pub fn at_line(mut self, line: usize) -> Self {
        self.line = line;
        self
    }

    /// Builder: parameters
    #[must_use]
    pub fn with_parameters(mut self, parameters: impl IntoIterator<Item = Parameter>) -> Self {
        self.parameters = parameters.into_iter().collect();
        self
    }

    /// Builder: visibility
    #[must_use]
    pub fn with_visibility(mut self, visibility: Visibility) -> Self {
        self.visibility = visibility;
        self
    }

    /// Builder: export style
    #[must_use]
    pub fn with_export(mut self, export: ExportStyle) -> Self {
        self.export = export;
        self
    }

    /// Builder: add a side-effect hint
    #[must_use]
    pub fn with_side_effect(mut self, effect: SideEffect) -> Self {
        self.side_effects.push(effect);
        self
    }

    /// Builder: add an error path
    #[must_use]
    pub fn with_error_path(mut self, path: ErrorPath) -> Self {
        self.error_paths.push(path);
        self
    }

    /// Builder: branch count
    #[must_use]
    pub fn with_branches(mut self, branch_count: u32) -> Self {
        self.branch_count = branch_count;
        self
    }

    /// Builder: add a base class or implemented interface
    #[must_use]
    pub fn with_base(mut self, base: impl Into<String>) -> Self {
        self.bases.push(base.into());
        self
    }

    /// Builder: mark as returning a value
    #[must_use]
    pub fn returning(mut self) -> Self {
        self.returns_value = true;
        self
    }

    /// Number of arguments a call must supply
    #[inline]
    #[must_use]
    pub fn arity(&self) -> usize {
        self.parameters.len()
    }

    /// Dependencies called through, in first-call order, one per binding name
    #[must_use]
    pub fn dependencies(&self) -> Vec<&Dependency> {
        let mut seen: Vec<&Dependency> = Vec::new();
        for dep in self.side_effects.iter().filter_map(SideEffect::dependency) {
            if !seen.iter().any(|d| d.name == dep.name) {
                seen.push(dep);
            }
        }
        seen
    }

    /// Every member called on the dependency bound to `name`, in first-call order
    #[must_use]
    pub fn members_called(&self, name: &str) -> Vec<&str> {
        let mut members: Vec<&str> = Vec::new();
        for dep in self.side_effects.iter().filter_map(SideEffect::dependency) {
            if dep.name == name && !members.contains(&dep.member.as_str()) {
                members.push(&dep.member);
            }
        }
        members
    }

    /// Whether any side-effect hint marks direct I/O
    #[must_use]
    pub fn performs_io(&self) -> bool {
        self.side_effects
            .iter()
            .any(|e| matches!(e, SideEffect::PerformsIo { .. }))
    }

    /// Whether the symbol assigns to state it does not own locally
    #[must_use]
    pub fn mutates_state(&self) -> bool {
        self.side_effects
            .iter()
            .any(|e| matches!(e, SideEffect::MutatesSharedState { .. }))
    }

    /// First raised or declared error type
    #[must_use]
    pub fn primary_error_type(&self) -> Option<&str> {
        self.error_paths.iter().find_map(|p| p.error_type.as_deref())
    }
}

/// An import statement, normalised
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Import {
    /// Module specifier as written (`os.path`, `.core`, `./db`, `java.util.List`)
    pub specifier: String,
    /// Local names the import binds
    #[serde(default)]
    pub bindings: Vec<String>,
    /// Java `import static`; the specifier is the owning class
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub is_static: bool,
}

impl Import {
    /// Import binding the given names
    #[must_use]
    pub fn new<I, S>(specifier: impl Into<String>, bindings: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            specifier: specifier.into(),
            bindings: bindings.into_iter().map(Into::into).collect(),
            is_static: false,
        }
    }

    /// Builder: mark as a static import
    #[must_use]
    pub fn static_member(mut self) -> Self {
        self.is_static = true;
        self
    }
}

const LANGUAGE_SCOPE: char = '@';

/// Structural summary of one source file. Immutable once produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileSummary {
    /// Path relative to the repository root
    pub path: PathBuf,
    /// Dotted module path
    pub module: String,
    /// Detected language
    pub language: Language,
    /// Java package, when declared
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    /// Hash of the file's bytes
    pub content_hash: ContentHash,
    /// Number of lines in the file
    #[serde(default)]
    pub line_count: usize,
    /// Declared symbols in declaration order
    #[serde(default)]
    pub symbols: Vec<SymbolDescriptor>,
    /// Imports in first-seen order, unique by specifier
    #[serde(default)]
    pub imports: Vec<Import>,
    /// Structural parsing failed; `symbols` is empty
    #[serde(default)]
    pub parse_failed: bool,
    /// Why parsing failed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parse_error: Option<String>,
    /// Bounded source prefix for model queries
    #[serde(skip)]
    pub excerpt: String,
}

impl FileSummary {
    /// Empty, successfully parsed summary
    #[must_use]
    pub fn new(path: impl Into<PathBuf>, language: Language, content_hash: ContentHash) -> Self {
        let path = path.into();
        let module = module_path(&path);
        Self {
            path,
            module,
            language,
            namespace: None,
            content_hash,
            line_count: 0,
            symbols: Vec::new(),
            imports: Vec::new(),
            parse_failed: false,
            parse_error: None,
            excerpt: String::new(),
        }
    }

    /// Summary of a file that could not be parsed
    #[must_use]
    pub fn failed(
        path: impl Into<PathBuf>,
        language: Language,
        content_hash: ContentHash,
        reason: impl Into<String>,
    ) -> Self {
        let mut summary = Self::new(path, language, content_hash);
        summary.parse_failed = true;
        summary.parse_error = Some(reason.into());
        summary
    }

    /// Builder: override the module path
    #[must_use]
    pub fn with_module(mut self, module: impl Into<String>) -> Self {
        self.module = module.into();
        self
    }

    /// Builder: add a symbol
    #[must_use]
    pub fn with_symbol(mut self, symbol: SymbolDescriptor) -> Self {
        self.symbols.push(symbol);
        self
    }

    /// Builder: add an import, merging bindings of a repeated specifier
    #[must_use]
    pub fn with_import(mut self, import: Import) -> Self {
        self.add_import(import);
        self
    }

    /// Add an import, merging bindings of a repeated specifier
    pub fn add_import(&mut self, import: Import) {
        if let Some(existing) = self.imports.iter_mut().find(|i| i.specifier == import.specifier) {
            for binding in import.bindings {
                if !existing.bindings.contains(&binding) {
                    existing.bindings.push(binding);
                }
            }
        } else {
            self.imports.push(import);
        }
    }

    /// Find a symbol declared in this file
    #[must_use]
    pub fn symbol(&self, name: &QualifiedName) -> Option<&SymbolDescriptor> {
        self.symbols.iter().find(|s| &s.name == name)
    }

    /// Import that binds `name` locally
    #[must_use]
    pub fn import_binding(&self, name: &str) -> Option<&Import> {
        self.imports
            .iter()
            .find(|i| i.bindings.iter().any(|b| b == name))
    }

    /// Module path importers use, without any language scope added by
    /// [`FileSummary::scope_to_language`]
    #[must_use]
    pub fn import_module(&self) -> &str {
        self.module
            .split_once(LANGUAGE_SCOPE)
            .map_or(self.module.as_str(), |(module, _)| module)
    }

    /// Move the file and its symbols to `<module>@<language>` so it can sit
    /// next to a file of another language mapping to the same module
    pub fn scope_to_language(&mut self) {
        let scoped = format!("{}{LANGUAGE_SCOPE}{}", self.import_module(), self.language.as_str());
        for symbol in &mut self.symbols {
            symbol.name = symbol.name.with_module(scoped.clone());
        }
        self.module = scoped;
    }

    /// File name without extension(s), e.g. `api` for `src/api.test.ts`
    #[must_use]
    pub fn stem(&self) -> &str {
        file_stem(&self.path)
    }
}

/// Tag repeated declarations with overload ordinals so every symbol of a file
/// has its own name: the second `Calc.add` becomes `Calc.add#2`. Members of a
/// repeated class follow the class's new name.
pub fn number_overloads(symbols: &mut [SymbolDescriptor]) {
    let mut seen: HashMap<QualifiedName, u32> = HashMap::new();
    let mut latest: HashMap<QualifiedName, QualifiedName> = HashMap::new();
    for symbol in symbols {
        let declared = symbol.name.clone();
        let mut name = match declared.owner().and_then(|owner| latest.get(&owner)) {
            Some(owner) => owner.child(declared.segments().last().cloned().unwrap_or_default()),
            None => declared.clone(),
        };
        let count = seen.entry(name.clone()).or_insert(0);
        *count += 1;
        if *count > 1 {
            name = name.with_overload(*count);
        }
        latest.insert(declared, name.clone());
        symbol.name = name;
    }
}

/// File name without any extension
#[must_use]
pub fn file_stem(path: &Path) -> &str {
    let name = path.file_name().and_then(|n| n.to_str()).unwrap_or_default();
    name.split('.').next().unwrap_or(name)
}

/// Dotted module path for a repository-relative file path
///
/// `src/api.py` becomes `src.api`; `pkg/__init__.py` and `lib/index.js`
/// collapse to their directory.
#[must_use]
pub fn module_path(path: &Path) -> String {
    let mut parts: Vec<String> = path
        .parent()
        .into_iter()
        .flat_map(Path::components)
        .filter_map(|c| match c {
            std::path::Component::Normal(s) => s.to_str().map(str::to_string),
            _ => None,
        })
        .collect();
    let stem = file_stem(path);
    if !(matches!(stem, "__init__" | "index") && !parts.is_empty()) {
        parts.push(stem.to_string());
    }
    parts.join(".")
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn module_paths() {
        assert_eq!(module_path(Path::new("src/api.py")), "src.api");
        assert_eq!(module_path(Path::new("main.py")), "main");
        assert_eq!(module_path(Path::new("pkg/__init__.py")), "pkg");
        assert_eq!(module_path(Path::new("lib/util/index.ts")), "lib.util");
        assert_eq!(module_path(Path::new("index.js")), "index");
        assert_eq!(module_path(Path::new("./src/db.d.ts")), "src.db");
    }

    #[test]
    fn imports_merge_by_specifier() {
        let summary = FileSummary::new("a.py", Language::Python, ContentHash::of(b""))
            .with_import(Import::new("os", ["os"]))
            .with_import(Import::new(".core", ["Engine"]))
            .with_import(Import::new(".core", ["Engine", "run"]));
        assert_eq!(summary.imports.len(), 2);
        assert_eq!(summary.imports[1].bindings, vec!["Engine", "run"]);
        assert_eq!(summary.import_binding("run").map(|i| i.specifier.as_str()), Some(".core"));
    }

    #[test]
    fn dependencies_are_unique_by_binding() {
        let dep = |member: &str| Dependency {
            name: "paymentClient".into(),
            member: member.into(),
            arg_count: 1,
            injection: Injection::Argument { index: 0 },
            type_hint: None,
            arg_types: Vec::new(),
        };
        let symbol = SymbolDescriptor::new(SymbolKind::Function, QualifiedName::top_level("m", "pay"))
            .with_side_effect(SideEffect::ExternalCall(dep("charge")))
            .with_side_effect(SideEffect::ExternalCall(dep("refund")))
            .with_side_effect(SideEffect::ExternalCall(dep("charge")));
        let deps = symbol.dependencies();
        assert_eq!(deps.len(), 1);
        assert_eq!(deps[0].member, "charge");
        assert_eq!(symbol.members_called("paymentClient"), vec!["charge", "refund"]);
        assert!(symbol.members_called("ledger").is_empty());
    }

    #[test]
    fn repeated_declarations_are_numbered() {
        let calc = QualifiedName::top_level("calc", "Calc");
        let mut symbols = vec![
            SymbolDescriptor::new(SymbolKind::Class, calc.clone()),
            SymbolDescriptor::new(SymbolKind::Method, calc.child("add")),
            SymbolDescriptor::new(SymbolKind::Method, calc.child("add")),
            SymbolDescriptor::new(SymbolKind::Method, calc.child("sub")),
            SymbolDescriptor::new(SymbolKind::Method, calc.child("add")),
            SymbolDescriptor::new(SymbolKind::Class, calc.clone()),
            SymbolDescriptor::new(SymbolKind::Method, calc.child("add")),
        ];
        number_overloads(&mut symbols);
        let names: Vec<String> = symbols.iter().map(|s| s.name.to_string()).collect();
        assert_eq!(
            names,
            vec![
                "calc:Calc",
                "calc:Calc.add",
                "calc:Calc.add#2",
                "calc:Calc.sub",
                "calc:Calc.add#3",
                "calc:Calc#2",
                "calc:Calc#2.add",
            ]
        );
    }

    #[test]
    fn language_scope_renames_symbols() {
        let mut summary = FileSummary::new("tools/build.py", Language::Python, ContentHash::of(b""))
            .with_symbol(SymbolDescriptor::new(SymbolKind::Function, QualifiedName::top_level("tools.build", "bundle")));
        assert_eq!(summary.import_module(), "tools.build");
        summary.scope_to_language();
        assert_eq!(summary.module, "tools.build@python");
        assert_eq!(summary.import_module(), "tools.build");
        assert_eq!(summary.symbols[0].name.to_string(), "tools.build@python:bundle");
    }

    #[test]
    fn failed_summary_has_no_symbols() {
        let summary = FileSummary::failed("bad.py", Language::Python, ContentHash::of(b"def"), "syntax error");
        assert!(summary.parse_failed);
        assert!(summary.symbols.is_empty());
        assert_eq!(summary.parse_error.as_deref(), Some("syntax error"));
    }
}
