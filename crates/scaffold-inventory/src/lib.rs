//! Scaffold source inventory
//!
//! Walks a repository, classifies files by language and turns each one into
//! an immutable [`FileSummary`](scaffold_model::FileSummary) using tree-sitter
//! grammars. Files that cannot be read or parsed are kept as summaries flagged
//! `parse_failed` so a run never stops on one bad file.
//!
//! # Example
//!
//! ```rust,no_run
//! use scaffold_inventory::{InventoryConfig, SourceInventory};
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn run() -> Result<(), scaffold_inventory::InventoryError> {
//! let inventory = SourceInventory::new(InventoryConfig::default().with_concurrency(4));
//! let summaries = inventory.summarize("path/to/repo".as_ref(), &CancellationToken::new()).await?;
//! for summary in &summaries {
//!     println!("{} {} symbols", summary.path.display(), summary.symbols.len());
//! }
//! # Ok(())
//! # }
//! ```

pub mod cache;
pub mod classify;
pub mod error;
pub mod extract;
pub mod inventory;

pub use cache::{CacheStats, SummaryCache, SummaryKey};
pub use classify::{classify, classify_extension, classify_shebang, is_test_file};
pub use error::{ExtractError, InventoryError, Result};
pub use extract::{
    default_extractors, Extraction, Extractor, ExtractorRegistry, JavaExtractor, JavaScriptExtractor, PythonExtractor,
    SourceFile,
};
pub use inventory::{DiscoveredFile, InventoryConfig, SourceInventory};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
