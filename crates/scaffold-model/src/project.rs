//! Project-level model
//!
//! [`ProjectModel`] is the aggregated view of one run: every file summary keyed
//! by module, the public surface, risk findings, the module import graph and
//! derived insights. References between these parts are qualified names,
//! validated against the symbol index when they are attached.

use std::collections::{BTreeMap, HashSet};
use std::path::PathBuf;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::{ModelError, Result};
use crate::finding::RiskFinding;
use crate::index::{SymbolIndex, SymbolPosition};
use crate::language::Language;
use crate::name::QualifiedName;
use crate::summary::{FileSummary, SymbolDescriptor, SymbolKind};

/// One in-project import edge
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ImportEdge {
    /// Importing module
    pub from: String,
    /// Imported module
    pub to: String,
}

/// A class extending or implementing another in-project class
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct InheritanceEdge {
    /// Derived class
    pub class: QualifiedName,
    /// Base class or interface
    pub base: QualifiedName,
}

/// In-project import edges in discovery order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleGraph {
    /// Unique edges
    pub edges: Vec<ImportEdge>,
    /// Resolved inheritance, in declaration order
    #[serde(default)]
    pub inherits: Vec<InheritanceEdge>,
}

impl ModuleGraph {
    /// Modules imported by `module`
    pub fn imports_of<'a>(&'a self, module: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.edges
            .iter()
            .filter(move |e| e.from == module)
            .map(|e| e.to.as_str())
    }

    /// Modules importing `module`
    pub fn importers_of<'a>(&'a self, module: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.edges
            .iter()
            .filter(move |e| e.to == module)
            .map(|e| e.from.as_str())
    }
}

/// Symbol and file counts
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectStats {
    /// Summarized files
    pub files: usize,
    /// Files whose structure could not be parsed
    pub parse_failures: usize,
    /// Declared classes
    pub classes: usize,
    /// Free functions
    pub functions: usize,
    /// Methods
    pub methods: usize,
    /// Import statements (unique per file)
    pub imports: usize,
    /// Resolved in-project inheritance edges
    #[serde(default)]
    pub inheritance_relationships: usize,
    /// Files per language
    pub languages: BTreeMap<Language, usize>,
}

impl ProjectStats {
    /// Count over a set of summaries
    #[must_use]
    pub fn collect<'a>(files: impl IntoIterator<Item = &'a FileSummary>) -> Self {
        let mut stats = Self::default();
        for file in files {
            stats.files += 1;
            stats.parse_failures += usize::from(file.parse_failed);
            stats.imports += file.imports.len();
            *stats.languages.entry(file.language).or_default() += 1;
            for symbol in &file.symbols {
                match symbol.kind {
                    SymbolKind::Class => stats.classes += 1,
                    SymbolKind::Function => stats.functions += 1,
                    SymbolKind::Method => stats.methods += 1,
                }
            }
        }
        stats
    }
}

/// A module ranked by how many others import it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CentralModule {
    /// Module path
    pub module: String,
    /// Number of importing modules
    pub importers: usize,
}

/// Derived observations about the project's structure
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectInsights {
    /// Counts
    pub stats: ProjectStats,
    /// Most imported modules, highest first
    pub central_modules: Vec<CentralModule>,
    /// Import cycles, each listed in module order
    pub cycles: Vec<Vec<String>>,
    /// Human-readable observations
    pub notes: Vec<String>,
}

/// Aggregated project view owned by a single pipeline run
#[derive(Debug, Serialize)]
pub struct ProjectModel {
    files: IndexMap<String, FileSummary>,
    public_surface: Vec<QualifiedName>,
    findings: Vec<RiskFinding>,
    graph: ModuleGraph,
    insights: ProjectInsights,
    #[serde(skip)]
    shadowed: Vec<PathBuf>,
    #[serde(skip)]
    index: SymbolIndex,
}

impl ProjectModel {
    /// Key summaries by module and index their symbols. A later file mapping
    /// to a module already taken by a file of the same language is set aside
    /// and listed by [`ProjectModel::shadowed`]; one of another language is
    /// kept under a language-scoped module (`tools.build@python`).
    #[must_use]
    pub fn from_files(summaries: impl IntoIterator<Item = FileSummary>) -> Self {
        let mut files: IndexMap<String, FileSummary> = IndexMap::new();
        let mut taken: HashSet<(Language, String)> = HashSet::new();
        let mut shadowed = Vec::new();
        for mut summary in summaries {
            if !taken.insert((summary.language, summary.import_module().to_string())) {
                shadowed.push(summary.path);
                continue;
            }
            if files.contains_key(&summary.module) {
                summary.scope_to_language();
            }
            files.insert(summary.module.clone(), summary);
        }

        let mut index = SymbolIndex::new();
        for (file_idx, file) in files.values().enumerate() {
            for (symbol_idx, symbol) in file.symbols.iter().enumerate() {
                index.insert(
                    &symbol.name,
                    SymbolPosition {
                        file: file_idx,
                        symbol: symbol_idx,
                    },
                );
            }
        }

        Self {
            files,
            public_surface: Vec::new(),
            findings: Vec::new(),
            graph: ModuleGraph::default(),
            insights: ProjectInsights::default(),
            shadowed,
            index,
        }
    }

    /// Attach the public surface
    ///
    /// # Errors
    /// Returns [`ModelError::DanglingReference`] if any name does not resolve
    pub fn with_public_surface(mut self, surface: Vec<QualifiedName>) -> Result<Self> {
        if let Some(missing) = surface.iter().find(|name| !self.index.contains(name)) {
            return Err(ModelError::dangling(missing.clone(), "public surface"));
        }
        self.public_surface = surface;
        Ok(self)
    }

    /// Attach risk findings
    ///
    /// # Errors
    /// Returns [`ModelError::DanglingReference`] if any finding's symbol does not resolve
    pub fn with_findings(mut self, findings: Vec<RiskFinding>) -> Result<Self> {
        if let Some(missing) = findings.iter().find(|f| !self.index.contains(&f.symbol)) {
            return Err(ModelError::dangling(missing.symbol.clone(), "finding"));
        }
        self.findings = findings;
        Ok(self)
    }

    /// Attach the module graph and insights
    #[must_use]
    pub fn with_structure(mut self, graph: ModuleGraph, insights: ProjectInsights) -> Self {
        self.graph = graph;
        self.insights = insights;
        self
    }

    /// Summaries in discovery order
    pub fn files(&self) -> impl Iterator<Item = &FileSummary> {
        self.files.values()
    }

    /// Number of files
    #[inline]
    #[must_use]
    pub fn file_count(&self) -> usize {
        self.files.len()
    }

    /// Summary for a module
    #[must_use]
    pub fn file(&self, module: &str) -> Option<&FileSummary> {
        self.files.get(module)
    }

    /// Files set aside because their module was already taken
    #[must_use]
    pub fn shadowed(&self) -> &[PathBuf] {
        &self.shadowed
    }

    /// Resolve a name to its file and descriptor
    #[must_use]
    pub fn resolve(&self, name: &QualifiedName) -> Option<(&FileSummary, &SymbolDescriptor)> {
        self.index.get(name).and_then(|pos| self.at(pos))
    }

    /// Descriptor for a name
    #[must_use]
    pub fn symbol(&self, name: &QualifiedName) -> Option<&SymbolDescriptor> {
        self.resolve(name).map(|(_, symbol)| symbol)
    }

    /// File and descriptor at an index position
    #[must_use]
    pub fn at(&self, pos: SymbolPosition) -> Option<(&FileSummary, &SymbolDescriptor)> {
        let (_, file) = self.files.get_index(pos.file)?;
        file.symbols.get(pos.symbol).map(|symbol| (file, symbol))
    }

    /// Direct members of a class
    #[must_use]
    pub fn members(&self, owner: &QualifiedName) -> Vec<&SymbolDescriptor> {
        self.index
            .members(owner)
            .into_iter()
            .filter_map(|(_, pos)| self.at(pos).map(|(_, s)| s))
            .collect()
    }

    /// Symbol index
    #[inline]
    #[must_use]
    pub fn index(&self) -> &SymbolIndex {
        &self.index
    }

    /// Public surface in declaration order
    #[inline]
    #[must_use]
    pub fn public_surface(&self) -> &[QualifiedName] {
        &self.public_surface
    }

    /// All findings: heuristic ones first, then model-suggested ones
    #[inline]
    #[must_use]
    pub fn findings(&self) -> &[RiskFinding] {
        &self.findings
    }

    /// Findings for one symbol, in order
    pub fn findings_for<'a>(&'a self, name: &'a QualifiedName) -> impl Iterator<Item = &'a RiskFinding> + 'a {
        self.findings.iter().filter(move |f| &f.symbol == name)
    }

    /// Module import graph
    #[inline]
    #[must_use]
    pub fn graph(&self) -> &ModuleGraph {
        &self.graph
    }

    /// Derived insights
    #[inline]
    #[must_use]
    pub fn insights(&self) -> &ProjectInsights {
        &self.insights
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::finding::RiskCategory;
    use crate::hash::ContentHash;

    fn file(path: &str, symbols: &[&str]) -> FileSummary {
        let mut summary = FileSummary::new(path, Language::Python, ContentHash::of(path.as_bytes()));
        for name in symbols {
            let qn = QualifiedName::new(summary.module.clone(), name.split('.'));
            let kind = if qn.is_member() { SymbolKind::Method } else { SymbolKind::Function };
            summary = summary.with_symbol(SymbolDescriptor::new(kind, qn));
        }
        summary
    }

    #[test]
    fn resolves_across_files() {
        let model = ProjectModel::from_files([file("a.py", &["f", "C", "C.m"]), file("b.py", &["g"])]);
        let (summary, symbol) = model.resolve(&"b:g".parse().unwrap()).unwrap();
        assert_eq!(summary.module, "b");
        assert_eq!(symbol.name.name(), "g");
        assert_eq!(model.members(&"a:C".parse().unwrap()).len(), 1);
    }

    #[test]
    fn dangling_finding_is_rejected() {
        let model = ProjectModel::from_files([file("a.py", &["f"])]);
        let finding = RiskFinding::heuristic("a:missing".parse().unwrap(), RiskCategory::HighComplexity, "x");
        let err = model.with_findings(vec![finding]).unwrap_err();
        assert!(matches!(err, ModelError::DanglingReference { context: "finding", .. }));
    }

    #[test]
    fn dangling_surface_is_rejected() {
        let model = ProjectModel::from_files([file("a.py", &["f"])]);
        assert!(model.with_public_surface(vec!["b:f".parse().unwrap()]).is_err());
    }

    #[test]
    fn duplicate_modules_are_shadowed() {
        let model = ProjectModel::from_files([file("pkg/__init__.py", &["f"]), file("pkg.py", &["g"])]);
        assert_eq!(model.file_count(), 1);
        assert_eq!(model.shadowed(), &[PathBuf::from("pkg.py")]);
    }

    #[test]
    fn same_module_in_another_language_is_kept() {
        let mut js = file("tools/build.js", &[]);
        js.language = Language::JavaScript;
        js = js.with_symbol(SymbolDescriptor::new(
            SymbolKind::Function,
            QualifiedName::top_level("tools.build", "bundle"),
        ));
        let py = file("tools/build.py", &["bundle"]);
        let again = file("tools/build/__init__.py", &["other"]);

        let model = ProjectModel::from_files([js, py, again]);
        assert_eq!(model.file_count(), 2);
        assert_eq!(model.shadowed(), &[PathBuf::from("tools/build/__init__.py")]);

        let python = model.file("tools.build@python").unwrap();
        assert_eq!(python.import_module(), "tools.build");
        let (file, _) = model.resolve(&"tools.build@python:bundle".parse().unwrap()).unwrap();
        assert_eq!(file.path, PathBuf::from("tools/build.py"));
        let (file, _) = model.resolve(&"tools.build:bundle".parse().unwrap()).unwrap();
        assert_eq!(file.language, Language::JavaScript);
    }

    #[test]
    fn stats_count_kinds() {
        let stats = ProjectStats::collect(&[file("a.py", &["f", "C.m"]), file("b.py", &[])]);
        assert_eq!(stats.files, 2);
        assert_eq!(stats.functions, 1);
        assert_eq!(stats.methods, 1);
        assert_eq!(stats.languages.get(&Language::Python), Some(&2));
    }
}
