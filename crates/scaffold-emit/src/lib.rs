//! Scaffold language emitters
//!
//! Renders [`TestPlanUnit`](scaffold_model::TestPlanUnit)s as test source
//! files: pytest for Python, Jest for JavaScript and TypeScript, JUnit 5 with
//! Mockito for Java. Emitters are pure and stateless; the
//! [`EmitterRegistry`] selects one per language and reports
//! [`EmitError::UnsupportedLanguage`] instead of substituting another.
//!
//! # Example
//!
//! ```rust
//! use scaffold_emit::EmitterRegistry;
//! use scaffold_model::Language;
//!
//! let registry = EmitterRegistry::default();
//! assert!(registry.find(Language::Java).is_some());
//! assert!(registry.emit_target(&[], "cobol").unwrap_err().is_unsupported());
//! ```

pub mod emitter;
pub mod error;
pub mod jest;
pub mod junit;
pub mod pytest;
pub mod render;
pub mod writer;

pub use emitter::{default_emitters, EmitterRegistry, LanguageEmitter};
pub use error::{EmitError, Result};
pub use jest::JestEmitter;
pub use junit::JUnitEmitter;
pub use pytest::PytestEmitter;
pub use writer::SourceWriter;

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
