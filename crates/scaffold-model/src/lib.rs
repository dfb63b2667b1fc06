//! Scaffold data model
//!
//! Values passed between the pipeline stages. Every stage output is an
//! immutable value handed forward; no stage mutates what an earlier stage
//! produced.
//!
//! - [`FileSummary`] / [`SymbolDescriptor`]: per-file structure from the inventory
//! - [`ProjectModel`]: aggregated view with public surface and [`RiskFinding`]s
//! - [`TestPlanUnit`] / [`ScenarioSpec`] / [`MockSpec`]: language-neutral plans
//! - [`EmittedTestFile`]: rendered test source with scenario line ranges
//!
//! # Example
//!
//! ```rust
//! use scaffold_model::{ContentHash, FileSummary, Language, ProjectModel, QualifiedName, SymbolDescriptor, SymbolKind};
//!
//! let summary = FileSummary::new("calc.py", Language::Python, ContentHash::of(b"def add(a, b): ..."))
//!     .with_symbol(SymbolDescriptor::new(SymbolKind::Function, QualifiedName::top_level("calc", "add")));
//! let model = ProjectModel::from_files([summary]);
//! assert!(model.symbol(&"calc:add".parse().unwrap()).is_some());
//! ```

pub mod diagnostic;
pub mod emitted;
pub mod error;
pub mod finding;
pub mod hash;
pub mod index;
pub mod language;
pub mod name;
pub mod plan;
pub mod project;
pub mod summary;

pub use diagnostic::{Diagnostic, DiagnosticKind, Severity};
pub use emitted::{EmittedTestFile, LineRange};
pub use error::ModelError;
pub use finding::{Confidence, RiskCategory, RiskFinding};
pub use hash::ContentHash;
pub use index::{SymbolIndex, SymbolPosition};
pub use language::{Framework, Language, UnknownLanguage};
pub use name::QualifiedName;
pub use plan::{
    ExpectedOutcome, FindingRef, MockBehavior, MockSpec, OutcomeKind, Receiver, ScenarioIntent, ScenarioSpec,
    SourceRef, Subject, TestPlanUnit, Value,
};
pub use project::{
    CentralModule, ImportEdge, InheritanceEdge, ModuleGraph, ProjectInsights, ProjectModel, ProjectStats,
};
pub use summary::{
    file_stem, module_path, number_overloads, Dependency, ErrorPath, ExportStyle, FileSummary, Import, Injection,
    Parameter, SideEffect, SymbolDescriptor, SymbolKind, Visibility,
};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
