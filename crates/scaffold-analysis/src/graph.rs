//! In-project module graph and structural insights
//!
//! Import specifiers are resolved against the modules the inventory found.
//! Anything that does not resolve is external to the project.

use std::collections::{HashMap, HashSet};

use petgraph::algo::tarjan_scc;
use petgraph::graphmap::DiGraphMap;
use scaffold_model::{
    CentralModule, FileSummary, ImportEdge, InheritanceEdge, Language, ModuleGraph, ProjectInsights, ProjectStats,
    QualifiedName, SymbolKind,
};

/// How many central modules the insights keep
pub const CENTRAL_MODULES: usize = 10;

/// Resolves import specifiers to in-project modules
#[derive(Debug, Clone, Default)]
pub struct ModuleResolver {
    /// Import path to the project modules answering to it, one per language
    modules: HashMap<String, Vec<(Language, String)>>,
}

impl ModuleResolver {
    /// Resolver over the modules of `files`
    #[must_use]
    pub fn new<'a>(files: impl IntoIterator<Item = &'a FileSummary>) -> Self {
        let mut modules: HashMap<String, Vec<(Language, String)>> = HashMap::new();
        for file in files {
            modules
                .entry(file.import_module().to_string())
                .or_default()
                .push((file.language, file.module.clone()));
        }
        Self { modules }
    }

    /// Whether a module exists in the project
    #[inline]
    #[must_use]
    pub fn contains(&self, module: &str) -> bool {
        self.modules.contains_key(module)
    }

    /// Project module behind an import path, as seen from `file`: the same
    /// language first, then the same test framework family (JS/TS)
    fn pick(&self, file: &FileSummary, import_path: &str) -> Option<String> {
        let candidates = self.modules.get(import_path)?;
        candidates
            .iter()
            .find(|(language, _)| *language == file.language)
            .or_else(|| {
                candidates
                    .iter()
                    .find(|(language, _)| language.framework() == file.language.framework())
            })
            .map(|(_, module)| module.clone())
    }

    /// In-project module an import specifier in `file` refers to
    #[must_use]
    pub fn resolve(&self, file: &FileSummary, specifier: &str) -> Option<String> {
        match file.language {
            Language::Python => self.resolve_python(file, specifier),
            Language::JavaScript | Language::TypeScript => self.resolve_relative_path(file, specifier),
            Language::Java => self.pick(file, specifier),
        }
    }

    /// Modules an import statement reaches, including `from pkg import submodule`
    #[must_use]
    pub fn resolve_import(&self, file: &FileSummary, specifier: &str, bindings: &[String]) -> Vec<String> {
        let mut found = Vec::new();
        if let Some(module) = self.resolve(file, specifier) {
            found.push(module);
        }
        if file.language == Language::Python {
            let base = specifier.trim_end_matches('.');
            for binding in bindings {
                let joined = if base.is_empty() {
                    format!("{specifier}{binding}")
                } else {
                    format!("{base}.{binding}")
                };
                if let Some(module) = self.resolve_python(file, &joined) {
                    if !found.contains(&module) {
                        found.push(module);
                    }
                }
            }
        }
        found
    }

    fn resolve_python(&self, file: &FileSummary, specifier: &str) -> Option<String> {
        let dots = specifier.chars().take_while(|c| *c == '.').count();
        if dots == 0 {
            if let Some(module) = self.pick(file, specifier) {
                return Some(module);
            }
            let suffix = format!(".{specifier}");
            let mut matches = self
                .modules
                .keys()
                .filter(|m| m.ends_with(&suffix))
                .filter_map(|m| self.pick(file, m));
            let first = matches.next()?;
            return matches.next().is_none().then_some(first);
        }

        let is_package = file.stem() == "__init__";
        let mut base: Vec<&str> = file.import_module().split('.').filter(|s| !s.is_empty()).collect();
        if !is_package {
            base.pop();
        }
        for _ in 1..dots {
            base.pop()?;
        }
        let rest = &specifier[dots..];
        if !rest.is_empty() {
            base.extend(rest.split('.'));
        }
        self.pick(file, &base.join("."))
    }

    fn resolve_relative_path(&self, file: &FileSummary, specifier: &str) -> Option<String> {
        if !(specifier.starts_with("./") || specifier.starts_with("../")) {
            return None;
        }
        let mut segments: Vec<String> = file
            .path
            .parent()
            .into_iter()
            .flat_map(|p| p.components())
            .filter_map(|c| match c {
                std::path::Component::Normal(s) => s.to_str().map(str::to_string),
                _ => None,
            })
            .collect();
        for part in specifier.split('/') {
            match part {
                "" | "." => {}
                ".." => {
                    segments.pop()?;
                }
                other => segments.push(other.to_string()),
            }
        }
        if let Some(last) = segments.last_mut() {
            if let Some((stem, ext)) = last.rsplit_once('.') {
                if Language::from_extension(ext).is_some() {
                    *last = stem.to_string();
                }
            }
            if *last == "index" && segments.len() > 1 {
                segments.pop();
            }
        }
        self.pick(file, &segments.join("."))
    }
}

/// Unique in-project import edges, in discovery order
#[must_use]
pub fn build_graph<'a>(files: impl IntoIterator<Item = &'a FileSummary>, resolver: &ModuleResolver) -> ModuleGraph {
    let mut edges: Vec<ImportEdge> = Vec::new();
    for file in files {
        for import in &file.imports {
            for target in resolver.resolve_import(file, &import.specifier, &import.bindings) {
                let edge = ImportEdge {
                    from: file.module.clone(),
                    to: target,
                };
                if edge.from != edge.to && !edges.contains(&edge) {
                    edges.push(edge);
                }
            }
        }
    }
    ModuleGraph {
        edges,
        inherits: Vec::new(),
    }
}

/// `base.Model<T>` → `(Some("base"), "Model")`
fn split_base(base: &str) -> (Option<&str>, &str) {
    let base = base.split('<').next().unwrap_or(base).trim();
    match base.rsplit_once('.') {
        Some((qualifier, name)) => (Some(qualifier), name),
        None => (None, base),
    }
}

/// Top-level class `name` declared in `file`
fn class_in<'a>(file: &'a FileSummary, name: &str) -> Option<&'a QualifiedName> {
    file.symbols
        .iter()
        .find(|s| s.kind == SymbolKind::Class && s.name.segments().len() == 1 && s.name.name() == name)
        .map(|s| &s.name)
}

/// In-project base class of one written base, by class name: the same
/// module, then the module its import binding resolves to, then any class
/// of that name in the same language family (preferring the same package).
/// Imports that leave the project yield nothing.
fn resolve_base<'a>(
    file: &FileSummary,
    written: &str,
    files: &[&'a FileSummary],
    by_module: &HashMap<&str, &'a FileSummary>,
    resolver: &ModuleResolver,
) -> Option<&'a QualifiedName> {
    let (qualifier, name) = split_base(written);
    if qualifier.is_none() {
        if let Some(local) = by_module.get(file.module.as_str()).copied().and_then(|f| class_in(f, name)) {
            return Some(local);
        }
    }
    let binding = qualifier.map_or(name, |q| q.split('.').next().unwrap_or(q));
    if let Some(import) = file.import_binding(binding) {
        return resolver
            .resolve_import(file, &import.specifier, &import.bindings)
            .iter()
            .filter_map(|module| by_module.get(module.as_str()).copied())
            .find_map(|target| class_in(target, name));
    }
    let family = file.language.framework();
    let mut candidates = files
        .iter()
        .copied()
        .filter(|other| other.language.framework() == family)
        .filter_map(|other| class_in(other, name).map(|class| (other, class)));
    let first = candidates.next()?;
    let preferred = std::iter::once(first)
        .chain(candidates)
        .find(|(other, _)| other.namespace.is_some() && other.namespace == file.namespace);
    Some(preferred.unwrap_or(first).1)
}

/// Resolved class-to-base edges over every class that names a base
#[must_use]
pub fn inheritance(files: &[&FileSummary], resolver: &ModuleResolver) -> Vec<InheritanceEdge> {
    let by_module: HashMap<&str, &FileSummary> = files.iter().map(|f| (f.module.as_str(), *f)).collect();
    let mut edges: Vec<InheritanceEdge> = Vec::new();
    for file in files {
        for class in file.symbols.iter().filter(|s| s.kind == SymbolKind::Class) {
            for written in &class.bases {
                let Some(base) = resolve_base(file, written, files, &by_module, resolver) else {
                    continue;
                };
                let edge = InheritanceEdge {
                    class: class.name.clone(),
                    base: base.clone(),
                };
                if edge.class != edge.base && !edges.contains(&edge) {
                    edges.push(edge);
                }
            }
        }
    }
    edges
}

/// Counts, central modules, cycles and notes
#[must_use]
pub fn insights(files: &[&FileSummary], graph: &ModuleGraph) -> ProjectInsights {
    let mut stats = ProjectStats::collect(files.iter().copied());
    stats.inheritance_relationships = graph.inherits.len();
    let order: HashMap<&str, usize> = files.iter().enumerate().map(|(i, f)| (f.module.as_str(), i)).collect();

    let mut in_degree: HashMap<&str, usize> = HashMap::new();
    for edge in &graph.edges {
        *in_degree.entry(edge.to.as_str()).or_default() += 1;
    }
    let mut central: Vec<CentralModule> = in_degree
        .into_iter()
        .map(|(module, importers)| CentralModule {
            module: module.to_string(),
            importers,
        })
        .collect();
    central.sort_by(|a, b| b.importers.cmp(&a.importers).then_with(|| a.module.cmp(&b.module)));
    central.truncate(CENTRAL_MODULES);

    let mut digraph: DiGraphMap<&str, ()> = DiGraphMap::new();
    for edge in &graph.edges {
        digraph.add_edge(edge.from.as_str(), edge.to.as_str(), ());
    }
    let rank = |m: &str| order.get(m).copied().unwrap_or(usize::MAX);
    let mut cycles: Vec<Vec<String>> = tarjan_scc(&digraph)
        .into_iter()
        .filter(|component| component.len() > 1)
        .map(|mut component| {
            component.sort_by_key(|m| rank(*m));
            component.into_iter().map(str::to_string).collect()
        })
        .collect();
    cycles.sort_by_key(|cycle: &Vec<String>| cycle.first().map_or(usize::MAX, |m| rank(m)));

    let notes = notes(&stats, &central, &cycles);
    ProjectInsights {
        stats,
        central_modules: central,
        cycles,
        notes,
    }
}

#[allow(clippy::cast_precision_loss)]
fn ratio(count: usize, files: usize) -> f64 {
    count as f64 / files as f64
}

fn notes(stats: &ProjectStats, central: &[CentralModule], cycles: &[Vec<String>]) -> Vec<String> {
    let mut notes = Vec::new();
    if stats.files > 0 {
        if ratio(stats.classes, stats.files) > 3.0 {
            notes.push("High class-to-file ratio: files tend to hold several classes".to_string());
        }
        if ratio(stats.functions + stats.methods, stats.files) > 10.0 {
            notes.push("Files contain many functions; splitting them would ease testing".to_string());
        }
        if ratio(stats.imports, stats.files) > 5.0 {
            notes.push("High average import count suggests tight coupling between modules".to_string());
        }
    }
    if let Some(top) = central.first() {
        notes.push(format!("Most central module is {} ({} importers)", top.module, top.importers));
        if central.len() > 3 {
            let key: Vec<&str> = central[..3].iter().map(|c| c.module.as_str()).collect();
            notes.push(format!("Key modules to understand: {}", key.join(", ")));
        }
    }
    if let Some(first) = cycles.first() {
        notes.push(format!("Found {} import cycle(s)", cycles.len()));
        let example: Vec<&str> = first.iter().take(3).map(String::as_str).collect();
        notes.push(format!("Example cycle: {} → {}", example.join(" → "), first[0]));
    }
    if stats.inheritance_relationships > 0 {
        notes.push(format!("Found {} inheritance relationships", stats.inheritance_relationships));
    }
    if stats.parse_failures > 0 {
        notes.push(format!("{} file(s) could not be parsed and were skipped", stats.parse_failures));
    }
    if !stats.languages.is_empty() {
        let mix: Vec<String> = stats
            .languages
            .iter()
            .map(|(language, count)| format!("{} ({count})", language.as_str()))
            .collect();
        notes.push(format!("Languages: {}", mix.join(", ")));
    }
    notes
}
