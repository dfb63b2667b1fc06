//! Emission errors

use std::path::PathBuf;

/// Failure to render tests for one language or file
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EmitError {
    /// No emitter handles the requested target
    #[error("unsupported target language: {0}")]
    UnsupportedLanguage(String),

    /// Units handed to one file emission come from different sources
    #[error("unit for {found} passed with units for {expected}")]
    MixedSources {
        /// Source the file is being emitted for
        expected: PathBuf,
        /// Source of the stray unit
        found: PathBuf,
    },

    /// Nothing to render for a file
    #[error("no plan units for {0}")]
    NoUnits(PathBuf),
}

impl EmitError {
    /// Whether this is a lookup failure rather than a rendering failure
    #[inline]
    #[must_use]
    pub fn is_unsupported(&self) -> bool {
        matches!(self, EmitError::UnsupportedLanguage(_))
    }
}

/// Result alias for emission
pub type Result<T> = std::result::Result<T, EmitError>;
