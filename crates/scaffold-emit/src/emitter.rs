//! Emitter capability and registry
//!
//! Each [`LanguageEmitter`] renders every unit planned for one source file
//! into one test file. The registry picks an emitter by language and never
//! substitutes another one when the lookup fails.

use std::path::{Component, Path, PathBuf};

use indexmap::IndexMap;
use scaffold_model::{EmittedTestFile, Framework, Language, SourceRef, TestPlanUnit};
use tracing::{debug, info};

use crate::error::{EmitError, Result};
use crate::junit::JUnitEmitter;
use crate::jest::JestEmitter;
use crate::pytest::PytestEmitter;

/// Renders plans for one language family
pub trait LanguageEmitter: Send + Sync + 'static {
    /// Source languages this emitter renders tests for
    fn languages(&self) -> &'static [Language];

    /// Test framework of the rendered files
    fn framework(&self) -> Framework;

    /// Test file path for a source file, relative to the language output directory
    fn test_path(&self, source: &SourceRef) -> PathBuf;

    /// Render every unit of one source file
    ///
    /// # Errors
    /// Returns [`EmitError`] when `units` is empty or mixes source files
    fn emit_file(&self, source: &SourceRef, units: &[&TestPlanUnit]) -> Result<EmittedTestFile>;

    /// Higher priority wins when two emitters claim a language
    fn priority(&self) -> i32 {
        0
    }
}

/// Check that `units` all belong to `source`
///
/// # Errors
/// [`EmitError::NoUnits`] or [`EmitError::MixedSources`]
pub fn check_units(source: &SourceRef, units: &[&TestPlanUnit]) -> Result<()> {
    if units.is_empty() {
        return Err(EmitError::NoUnits(source.path.clone()));
    }
    if let Some(stray) = units.iter().find(|u| u.source.path != source.path) {
        return Err(EmitError::MixedSources {
            expected: source.path.clone(),
            found: stray.source.path.clone(),
        });
    }
    Ok(())
}

/// Directory components of a repository-relative path
#[must_use]
pub fn directory_parts(path: &Path) -> Vec<String> {
    path.parent()
        .into_iter()
        .flat_map(Path::components)
        .filter_map(|c| match c {
            Component::Normal(s) => s.to_str().map(str::to_string),
            _ => None,
        })
        .collect()
}

/// Registry of emitters
pub struct EmitterRegistry {
    emitters: Vec<Box<dyn LanguageEmitter>>,
}

impl std::fmt::Debug for EmitterRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmitterRegistry")
            .field("languages", &self.languages())
            .finish()
    }
}

impl Default for EmitterRegistry {
    fn default() -> Self {
        default_emitters()
    }
}

impl EmitterRegistry {
    /// Empty registry
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self { emitters: Vec::new() }
    }

    /// Register an emitter
    pub fn register<E: LanguageEmitter>(&mut self, emitter: E) {
        self.emitters.push(Box::new(emitter));
        self.emitters.sort_by_key(|e| std::cmp::Reverse(e.priority()));
    }

    /// Emitter for a language
    #[must_use]
    pub fn find(&self, language: Language) -> Option<&dyn LanguageEmitter> {
        self.emitters
            .iter()
            .find(|e| e.languages().contains(&language))
            .map(|e| &**e)
    }

    /// Every language with a registered emitter
    #[must_use]
    pub fn languages(&self) -> Vec<Language> {
        let mut langs: Vec<Language> = self.emitters.iter().flat_map(|e| e.languages()).copied().collect();
        langs.sort();
        langs.dedup();
        langs
    }

    /// Render the units of `language`, one file per source file in plan order
    ///
    /// # Errors
    /// [`EmitError::UnsupportedLanguage`] when no emitter handles `language`
    pub fn emit(&self, units: &[TestPlanUnit], language: Language) -> Result<Vec<EmittedTestFile>> {
        let emitter = self
            .find(language)
            .ok_or_else(|| EmitError::UnsupportedLanguage(language.as_str().to_string()))?;

        let mut groups: IndexMap<&Path, (&SourceRef, Vec<&TestPlanUnit>)> = IndexMap::new();
        for unit in units.iter().filter(|u| u.source.language == language) {
            groups
                .entry(unit.source.path.as_path())
                .or_insert_with(|| (&unit.source, Vec::new()))
                .1
                .push(unit);
        }

        let files = groups
            .into_values()
            .map(|(source, units)| {
                let file = emitter.emit_file(source, &units)?;
                debug!(path = %file.path.display(), scenarios = file.scenarios.len(), "test file rendered");
                Ok(file)
            })
            .collect::<Result<Vec<_>>>()?;
        info!(language = language.as_str(), framework = %emitter.framework(), files = files.len(), "emitted");
        Ok(files)
    }

    /// Like [`EmitterRegistry::emit`] for a target named on the command line
    ///
    /// # Errors
    /// [`EmitError::UnsupportedLanguage`] when the name is unknown or unhandled
    pub fn emit_target(&self, units: &[TestPlanUnit], target: &str) -> Result<Vec<EmittedTestFile>> {
        let language: Language = target
            .parse()
            .map_err(|_| EmitError::UnsupportedLanguage(target.trim().to_string()))?;
        self.emit(units, language)
    }
}

/// Registry with the pytest, Jest and JUnit 5 emitters
#[must_use]
pub fn default_emitters() -> EmitterRegistry {
    let mut registry = EmitterRegistry::new();
    registry.register(PytestEmitter);
    registry.register(JestEmitter);
    registry.register(JUnitEmitter);
    registry
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_covers_every_language() {
        let registry = default_emitters();
        assert_eq!(registry.languages(), Language::ALL.to_vec());
        assert_eq!(registry.find(Language::TypeScript).map(|e| e.framework()), Some(Framework::Jest));
    }

    #[test]
    fn unknown_targets_are_unsupported() {
        let registry = default_emitters();
        assert_eq!(
            registry.emit_target(&[], "ruby"),
            Err(EmitError::UnsupportedLanguage("ruby".to_string()))
        );
        assert_eq!(
            EmitterRegistry::new().emit(&[], Language::Java),
            Err(EmitError::UnsupportedLanguage("java".to_string()))
        );
        assert_eq!(registry.emit(&[], Language::Java), Ok(Vec::new()));
    }

    #[test]
    fn directory_parts_skip_the_file() {
        assert_eq!(directory_parts(Path::new("app/core/users.py")), vec!["app", "core"]);
        assert!(directory_parts(Path::new("calc.py")).is_empty());
    }
}
