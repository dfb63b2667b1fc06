//! Error taxonomy for a pipeline run
//!
//! Per-stage errors compose into [`PipelineError`], which knows the process
//! exit code it maps to. Recoverable problems never become errors; they are
//! recorded as diagnostics instead.

use std::path::PathBuf;

use scaffold_analysis::AnalysisError;
use scaffold_emit::EmitError;
use scaffold_inventory::InventoryError;
use scaffold_planner::PlanConstructionError;

use crate::stage::Stage;

/// Repository could not be made available locally
#[derive(Debug, thiserror::Error)]
pub enum AcquisitionError {
    /// Reference is neither an existing directory nor a clonable URL
    #[error("repository not found: {}", .0.display())]
    NotFound(PathBuf),

    /// `git` could not be started
    #[error("failed to run git: {0}")]
    Spawn(#[source] std::io::Error),

    /// `git clone` exited unsuccessfully
    #[error("git clone of {url} failed ({status}): {stderr}")]
    Clone {
        /// Repository URL
        url: String,
        /// Exit status as reported by the OS
        status: String,
        /// Captured standard error, trimmed
        stderr: String,
    },

    /// Temporary checkout directory could not be created
    #[error("failed to create checkout directory: {0}")]
    Workspace(#[source] std::io::Error),

    /// Acquisition was cancelled
    #[error("acquisition cancelled")]
    Cancelled,
}

/// Configuration file problems
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// File could not be read
    #[error("cannot read {}: {source}", path.display())]
    Read {
        /// Config file path
        path: PathBuf,
        /// Underlying I/O error
        source: std::io::Error,
    },

    /// File is not valid configuration TOML
    #[error("invalid configuration: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Report or test files could not be written
#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    /// Filesystem write failed
    #[error("cannot write {}: {source}", path.display())]
    Io {
        /// Path being written
        path: PathBuf,
        /// Underlying I/O error
        source: std::io::Error,
    },

    /// JSON export failed
    #[error("serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),
}

impl ReportError {
    /// Wrap an I/O error with the path it concerns
    pub(crate) fn io(path: impl Into<PathBuf>) -> impl FnOnce(std::io::Error) -> Self {
        let path = path.into();
        move |source| ReportError::Io { path, source }
    }
}

/// Illegal stage transition
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("illegal stage transition {from} -> {to}")]
pub struct StageError {
    /// Current stage
    pub from: Stage,
    /// Requested stage
    pub to: Stage,
}

/// Fatal failure of a pipeline run
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// Repository acquisition failed
    #[error("acquisition failed: {0}")]
    Acquisition(#[from] AcquisitionError),

    /// Inventory could not walk the repository
    #[error("inventory failed: {0}")]
    Inventory(InventoryError),

    /// Aggregation failed
    #[error("analysis failed: {0}")]
    Analysis(AnalysisError),

    /// A plan unit violated its invariants
    #[error("plan construction failed: {0}")]
    PlanConstruction(#[from] PlanConstructionError),

    /// A requested target has no emitter
    #[error("unsupported target language: {0}")]
    UnsupportedLanguage(String),

    /// An emitter failed
    #[error("emission failed: {0}")]
    Emit(EmitError),

    /// Output could not be written
    #[error("report failed: {0}")]
    Report(#[from] ReportError),

    /// Configuration could not be loaded
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Stage machine violation
    #[error(transparent)]
    Stage(#[from] StageError),

    /// Run was cancelled
    #[error("run cancelled")]
    Cancelled,
}

impl From<InventoryError> for PipelineError {
    fn from(err: InventoryError) -> Self {
        match err {
            InventoryError::Cancelled => PipelineError::Cancelled,
            other => PipelineError::Inventory(other),
        }
    }
}

impl From<AnalysisError> for PipelineError {
    fn from(err: AnalysisError) -> Self {
        match err {
            AnalysisError::Cancelled => PipelineError::Cancelled,
            other => PipelineError::Analysis(other),
        }
    }
}

impl From<EmitError> for PipelineError {
    fn from(err: EmitError) -> Self {
        match err {
            EmitError::UnsupportedLanguage(language) => PipelineError::UnsupportedLanguage(language),
            other => PipelineError::Emit(other),
        }
    }
}

impl PipelineError {
    /// Process exit code for this failure
    #[must_use]
    pub fn exit_code(&self) -> u8 {
        match self {
            PipelineError::Acquisition(AcquisitionError::Cancelled) | PipelineError::Cancelled => 130,
            PipelineError::Acquisition(_) => 2,
            PipelineError::Inventory(_) | PipelineError::Analysis(_) | PipelineError::PlanConstruction(_) => 3,
            PipelineError::UnsupportedLanguage(_) | PipelineError::Emit(_) | PipelineError::Report(_) => 4,
            PipelineError::Config(_) | PipelineError::Stage(_) => 1,
        }
    }

    /// Whether the failure ends the whole run rather than one target
    #[inline]
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        !matches!(self, PipelineError::UnsupportedLanguage(_))
    }

    /// Whether the run was cancelled
    #[inline]
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        matches!(
            self,
            PipelineError::Cancelled | PipelineError::Acquisition(AcquisitionError::Cancelled)
        )
    }
}

/// Result alias for pipeline operations
pub type Result<T> = std::result::Result<T, PipelineError>;
