//! Risk findings

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::name::QualifiedName;

/// Category of a flagged pattern
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RiskCategory {
    /// Calls something that can fail without handling or declaring the failure
    MissingErrorHandling,
    /// Many decision points
    HighComplexity,
    /// Raises on a branch that deserves its own test
    UntestedBranch,
    /// Reaches outside the project through an imported module
    ExternalDependency,
    /// Name breaks the language's naming convention
    NamingInconsistency,
}

impl RiskCategory {
    /// All categories, in rule evaluation order
    pub const ALL: [RiskCategory; 5] = [
        RiskCategory::MissingErrorHandling,
        RiskCategory::HighComplexity,
        RiskCategory::UntestedBranch,
        RiskCategory::ExternalDependency,
        RiskCategory::NamingInconsistency,
    ];

    /// Kebab-case identifier
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskCategory::MissingErrorHandling => "missing-error-handling",
            RiskCategory::HighComplexity => "high-complexity",
            RiskCategory::UntestedBranch => "untested-branch",
            RiskCategory::ExternalDependency => "external-dependency",
            RiskCategory::NamingInconsistency => "naming-inconsistency",
        }
    }
}

impl fmt::Display for RiskCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RiskCategory {
    type Err = String;

    /// Accepts kebab, snake and space separated spellings in any case
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace(['_', ' '], "-");
        Self::ALL
            .into_iter()
            .find(|c| c.as_str() == normalized)
            .ok_or_else(|| s.to_string())
    }
}

/// Where a finding came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Confidence {
    /// Fixed structural rule
    Heuristic,
    /// Language model reply
    ModelSuggested,
}

impl fmt::Display for Confidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Confidence::Heuristic => "heuristic",
            Confidence::ModelSuggested => "model-suggested",
        })
    }
}

/// A flagged pattern on one symbol
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskFinding {
    /// Flagged symbol
    pub symbol: QualifiedName,
    /// Pattern category
    pub category: RiskCategory,
    /// Source of the finding
    pub confidence: Confidence,
    /// Human-readable explanation
    pub rationale: String,
    /// Error type the finding concerns, when one is known
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_type: Option<String>,
}

impl RiskFinding {
    /// Finding produced by a structural rule
    #[must_use]
    pub fn heuristic(symbol: QualifiedName, category: RiskCategory, rationale: impl Into<String>) -> Self {
        Self {
            symbol,
            category,
            confidence: Confidence::Heuristic,
            rationale: rationale.into(),
            error_type: None,
        }
    }

    /// Finding suggested by a language model
    #[must_use]
    pub fn model(symbol: QualifiedName, category: RiskCategory, rationale: impl Into<String>) -> Self {
        Self {
            confidence: Confidence::ModelSuggested,
            ..Self::heuristic(symbol, category, rationale)
        }
    }

    /// Builder: error type hint
    #[must_use]
    pub fn with_error_type(mut self, error_type: Option<String>) -> Self {
        self.error_type = error_type;
        self
    }
}
