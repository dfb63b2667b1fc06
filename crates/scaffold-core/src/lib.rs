//! Scaffold pipeline
//!
//! Drives a repository through acquisition, inventory, aggregation, planning
//! and emission, then writes generated test files, JSON exports and a
//! traceability report. The `scaffold` binary is a thin command-line shell
//! over [`Pipeline`].
//!
//! # Example
//!
//! ```rust,no_run
//! use scaffold_core::{Pipeline, PipelineConfig, RepositorySource};
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let config = PipelineConfig::default()
//!     .with_output_dir("scaffold-out")
//!     .with_targets(["python"]);
//! let source = RepositorySource::parse("path/to/repo", None)?;
//! let outcome = Pipeline::new(config).run(source, &CancellationToken::new()).await?;
//! println!("report at {}", outcome.report_path.display());
//! # Ok(())
//! # }
//! ```

pub mod acquire;
pub mod config;
pub mod diagnostics;
pub mod error;
pub mod pipeline;
pub mod report;
pub mod stage;

pub use acquire::{acquire, AcquiredRepository, RepositorySource};
pub use config::{ModelConfig, PipelineConfig};
pub use diagnostics::Diagnostics;
pub use error::{AcquisitionError, ConfigError, PipelineError, ReportError, Result, StageError};
pub use pipeline::{Pipeline, RunFailure, RunOutcome};
pub use report::{render_report, ReportInput, ReportWriter, RunSummary};
pub use stage::{allowed_transitions, validate_transition, Stage, StageTracker};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
