//! Plan construction errors

use scaffold_model::{ModelError, QualifiedName};

/// A plan that would break its own invariants
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PlanConstructionError {
    /// An input row or receiver does not match the parameter count
    #[error("arity mismatch in scenario '{scenario}' of {target}: expected {expected} argument(s), found {found}")]
    ArityMismatch {
        /// Planned symbol
        target: QualifiedName,
        /// Offending scenario, or `<receiver>` for constructor arguments
        scenario: String,
        /// Parameter count
        expected: usize,
        /// Values supplied
        found: usize,
    },

    /// A surface entry or method owner is missing from the model
    #[error(transparent)]
    DanglingReference(#[from] ModelError),
}

/// Result alias for planning
pub type Result<T> = std::result::Result<T, PlanConstructionError>;
