//! Rendered test files

use std::path::PathBuf;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::language::{Framework, Language};

/// Inclusive, 1-based line span in a rendered file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineRange {
    /// First line
    pub start: usize,
    /// Last line
    pub end: usize,
}

impl LineRange {
    /// Number of lines covered
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.end + 1 - self.start
    }

    /// Never true: a range covers at least its first line
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        false
    }
}

impl std::fmt::Display for LineRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.start == self.end {
            write!(f, "{}", self.start)
        } else {
            write!(f, "{}-{}", self.start, self.end)
        }
    }
}

/// One test source file produced by an emitter
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmittedTestFile {
    /// Language of the tested source
    pub language: Language,
    /// Test framework the file targets
    pub framework: Framework,
    /// Output path, relative to the language's output directory
    pub path: PathBuf,
    /// Source file the tests exercise
    pub origin: PathBuf,
    /// Rendered text
    pub source: String,
    /// Scenario name to the lines rendering it
    pub scenarios: IndexMap<String, LineRange>,
}

impl EmittedTestFile {
    /// Text of the lines rendering a scenario
    #[must_use]
    pub fn scenario_text(&self, scenario: &str) -> Option<String> {
        let range = self.scenarios.get(scenario)?;
        let lines: Vec<&str> = self
            .source
            .lines()
            .skip(range.start - 1)
            .take(range.len())
            .collect();
        Some(lines.join("\n"))
    }
}
