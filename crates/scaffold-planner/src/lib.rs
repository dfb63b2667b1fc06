//! Scaffold test planner
//!
//! Derives language-neutral [`TestPlanUnit`](scaffold_model::TestPlanUnit)s
//! from an aggregated [`ProjectModel`](scaffold_model::ProjectModel). Each
//! public symbol gets a happy-path scenario plus one scenario per risk
//! finding, with input rows drawn from a fixed value table and one mock per
//! named dependency.
//!
//! # Example
//!
//! ```rust
//! use scaffold_model::{ContentHash, FileSummary, Language, Parameter, ProjectModel, QualifiedName, SymbolDescriptor, SymbolKind};
//! use scaffold_planner::ScaffoldPlanner;
//!
//! let add = SymbolDescriptor::new(SymbolKind::Function, QualifiedName::top_level("calc", "add"))
//!     .with_parameters([Parameter::new("a"), Parameter::new("b")])
//!     .returning();
//! let file = FileSummary::new("calc.py", Language::Python, ContentHash::of(b"")).with_symbol(add);
//! let model = ProjectModel::from_files([file])
//!     .with_public_surface(vec![QualifiedName::top_level("calc", "add")])
//!     .unwrap();
//!
//! let units = ScaffoldPlanner::new().plan(&model).unwrap();
//! assert_eq!(units[0].scenarios[0].name, "add_happy_path");
//! ```

pub mod error;
pub mod naming;
pub mod planner;
pub mod values;

pub use error::{PlanConstructionError, Result};
pub use naming::{snake_case, ScenarioNamer};
pub use planner::{io_error_type, validate, ScaffoldPlanner};
pub use values::{classify, ValueClass};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
