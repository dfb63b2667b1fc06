//! Structural extractors
//!
//! One [`Extractor`] per language family turns source text into symbols and
//! imports. Extractors are stateless; the registry picks one by language,
//! highest priority first.

use std::path::Path;

use scaffold_model::{number_overloads, Import, Language, SymbolDescriptor};

use crate::error::ExtractError;

mod java;
mod javascript;
mod python;
mod syntax;

pub use java::JavaExtractor;
pub use javascript::JavaScriptExtractor;
pub use python::PythonExtractor;

/// Source text handed to an extractor
#[derive(Debug, Clone, Copy)]
pub struct SourceFile<'a> {
    /// Repository-relative path
    pub path: &'a Path,
    /// Classified language
    pub language: Language,
    /// Dotted module path symbols are qualified with
    pub module: &'a str,
    /// File contents
    pub text: &'a str,
}

/// What an extractor found in one file
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Extraction {
    /// Symbols in declaration order
    pub symbols: Vec<SymbolDescriptor>,
    /// Imports in first-seen order
    pub imports: Vec<Import>,
    /// Declared package (Java)
    pub namespace: Option<String>,
    /// Module path the file declares for itself, replacing the path-derived one
    pub module: Option<String>,
}

/// Language-specific structure extraction
pub trait Extractor: Send + Sync + 'static {
    /// Languages this extractor handles
    fn languages(&self) -> &'static [Language];

    /// Extract symbols and imports
    ///
    /// # Errors
    /// Returns [`ExtractError`] when the file cannot be parsed structurally
    fn extract(&self, file: &SourceFile<'_>) -> Result<Extraction, ExtractError>;

    /// Higher priority wins when two extractors claim a language
    fn priority(&self) -> i32 {
        0
    }
}

/// Registry of extractors
pub struct ExtractorRegistry {
    extractors: Vec<Box<dyn Extractor>>,
}

impl std::fmt::Debug for ExtractorRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExtractorRegistry")
            .field("languages", &self.languages())
            .finish()
    }
}

impl Default for ExtractorRegistry {
    fn default() -> Self {
        default_extractors()
    }
}

impl ExtractorRegistry {
    /// Empty registry
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self {
            extractors: Vec::new(),
        }
    }

    /// Register an extractor
    pub fn register<E: Extractor>(&mut self, extractor: E) {
        self.extractors.push(Box::new(extractor));
        self.extractors.sort_by_key(|e| std::cmp::Reverse(e.priority()));
    }

    /// Extractor for a language
    #[must_use]
    pub fn find(&self, language: Language) -> Option<&dyn Extractor> {
        self.extractors
            .iter()
            .find(|e| e.languages().contains(&language))
            .map(|e| &**e)
    }

    /// Every language with a registered extractor
    #[must_use]
    pub fn languages(&self) -> Vec<Language> {
        let mut langs: Vec<Language> = self.extractors.iter().flat_map(|e| e.languages()).copied().collect();
        langs.sort();
        langs.dedup();
        langs
    }

    /// Extract with whichever extractor handles the file's language.
    /// Repeated declarations (overloads) come back with distinct names.
    ///
    /// # Errors
    /// [`ExtractError::NoExtractor`] if none is registered, otherwise the extractor's error
    pub fn extract(&self, file: &SourceFile<'_>) -> Result<Extraction, ExtractError> {
        let mut extraction = self
            .find(file.language)
            .ok_or(ExtractError::NoExtractor(file.language))?
            .extract(file)?;
        number_overloads(&mut extraction.symbols);
        Ok(extraction)
    }
}

/// Registry with the built-in Python, JavaScript/TypeScript and Java extractors
#[must_use]
pub fn default_extractors() -> ExtractorRegistry {
    let mut registry = ExtractorRegistry::new();
    registry.register(PythonExtractor);
    registry.register(JavaScriptExtractor);
    registry.register(JavaExtractor);
    registry
}

fn strip_optional(annotation: &str) -> Option<&str> {
    ["Optional[", "typing.Optional[", "Optional<"]
        .iter()
        .find_map(|prefix| annotation.strip_prefix(*prefix))
        .and_then(|rest| rest.strip_suffix(']').or_else(|| rest.strip_suffix('>')))
}

/// Lowercase base name of a type annotation: `Optional[List[str]]` → `list`
pub(crate) fn annotation_base(annotation: &str) -> String {
    let mut current = annotation.trim().trim_start_matches(':').trim();
    while let Some(inner) = strip_optional(current) {
        current = inner.trim();
    }
    let current = current.split('|').next().unwrap_or(current).trim();
    let base = current
        .split(['[', '<', '('])
        .next()
        .unwrap_or(current)
        .trim()
        .trim_end_matches("[]");
    base.rsplit('.').next().unwrap_or(base).to_ascii_lowercase()
}

/// Whether an annotation names a plain data type rather than a collaborator
pub(crate) fn is_value_type(annotation: &str) -> bool {
    let base = annotation_base(annotation);
    let trimmed = annotation.trim().trim_start_matches(':').trim();
    trimmed.ends_with("[]")
        || matches!(
            base.as_str(),
            "int" | "float" | "str" | "bool" | "bytes" | "complex" | "list" | "dict" | "set"
                | "frozenset" | "tuple" | "sequence" | "mapping" | "iterable" | "any" | "none"
                | "number" | "string" | "boolean" | "bigint" | "array" | "record" | "object"
                | "unknown" | "date" | "map" | "readonlyarray"
                | "byte" | "short" | "long" | "double" | "char" | "integer" | "character"
                | "collection" | "hashmap" | "arraylist" | "localdate"
                | "localdatetime" | "instant" | "bigdecimal" | "biginteger" | "uuid"
        )
}
