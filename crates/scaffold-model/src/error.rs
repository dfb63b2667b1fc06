//! Model construction errors

use crate::name::QualifiedName;

/// Invariant violations while assembling a [`ProjectModel`](crate::ProjectModel)
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ModelError {
    /// A finding or public-surface entry names a symbol no file declares
    #[error("dangling {context} reference: {name}")]
    DanglingReference {
        /// Unresolved name
        name: QualifiedName,
        /// What held the reference (`finding`, `public surface`)
        context: &'static str,
    },
}

impl ModelError {
    /// Create a dangling-reference error
    #[must_use]
    pub fn dangling(name: QualifiedName, context: &'static str) -> Self {
        Self::DanglingReference { name, context }
    }
}

/// Result alias for model construction
pub type Result<T> = std::result::Result<T, ModelError>;
