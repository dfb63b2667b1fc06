//! Error types for the source inventory

use std::path::PathBuf;

use scaffold_model::Language;

/// Failure to extract structure from one file. Never aborts a run: the
/// inventory turns it into a summary flagged `parse_failed`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ExtractError {
    /// No extractor registered for the language
    #[error("no extractor registered for {0}")]
    NoExtractor(Language),

    /// Grammar could not be loaded into the parser
    #[error("parser initialisation failed: {0}")]
    ParserInit(String),

    /// Parser produced no tree
    #[error("parser produced no syntax tree")]
    NoTree,

    /// Tree contains error or missing nodes
    #[error("syntax error at line {line}")]
    Syntax {
        /// 1-based line of the first error node
        line: usize,
    },

    /// File content is not UTF-8
    #[error("file is not valid UTF-8")]
    NotUtf8,

    /// File exceeds the configured size limit
    #[error("file is {size} bytes, limit is {limit}")]
    TooLarge {
        /// File size
        size: u64,
        /// Configured limit
        limit: u64,
    },

    /// File could not be read
    #[error("read failed: {0}")]
    Read(String),
}

/// Errors that stop the inventory stage
#[derive(Debug, thiserror::Error)]
pub enum InventoryError {
    /// Root is missing or not a directory
    #[error("source root not found: {}", .0.display())]
    RootNotFound(PathBuf),

    /// Directory traversal failed
    #[error("walk failed: {0}")]
    Walk(#[from] walkdir::Error),

    /// Run was cancelled
    #[error("inventory cancelled")]
    Cancelled,
}

/// Result alias for inventory operations
pub type Result<T> = std::result::Result<T, InventoryError>;
