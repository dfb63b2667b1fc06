//! Scaffold analysis aggregation
//!
//! Turns the inventory's file summaries into a
//! [`ProjectModel`](scaffold_model::ProjectModel): the public surface by
//! language convention, heuristic risk findings, the in-project module graph
//! with structural insights, and optionally findings suggested by a language
//! model through the [`ModelAdapter`] boundary.
//!
//! # Example
//!
//! ```rust,no_run
//! use scaffold_analysis::{AggregatorConfig, AnalysisAggregator, HttpModelAdapter, ModelAdapter};
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn run(summaries: Vec<scaffold_model::FileSummary>) -> scaffold_analysis::Result<()> {
//! let aggregator = AnalysisAggregator::new(AggregatorConfig::default().with_concurrency(2));
//! let model = HttpModelAdapter::new(HttpModelAdapter::DEFAULT_ENDPOINT, "codellama");
//! let out = aggregator
//!     .aggregate(summaries, Some(&model as &dyn ModelAdapter), &CancellationToken::new())
//!     .await?;
//! println!("{} findings", out.model.findings().len());
//! # Ok(())
//! # }
//! ```

pub mod adapter;
pub mod aggregator;
pub mod error;
pub mod graph;
pub mod reply;
pub mod rules;
pub mod surface;

pub use adapter::{HeuristicOnly, HttpModelAdapter, ModelAdapter, ModelQuery, ModelReply, SuggestedFinding};
pub use aggregator::{AggregatorConfig, Aggregation, AnalysisAggregator};
pub use error::{AnalysisError, ModelUnavailable, Result};
pub use graph::{build_graph, inheritance, insights, ModuleResolver};
pub use reply::{interpret, parse_reply, resolve_symbol, ParsedReply, ReplyError};
pub use rules::{Rule, RuleConfig, RuleContext, RuleSet};
pub use surface::{file_surface, is_public, public_surface};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
