//! Recorded degradations
//!
//! Anything a run recovers from (an unparseable file, a model timeout, a
//! reply naming an unknown symbol) is recorded as a [`Diagnostic`] and
//! surfaced in the report instead of aborting.

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::name::QualifiedName;

/// How serious a diagnostic is
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Informational
    Info,
    /// Output is degraded but usable
    Warning,
    /// Part of the output is missing
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Severity::Info => "info",
            Severity::Warning => "warning",
            Severity::Error => "error",
        })
    }
}

/// What went wrong
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DiagnosticKind {
    /// A file's structure could not be extracted
    ParseDegradation,
    /// A file shares its module path with an earlier one and was set aside
    ShadowedModule,
    /// The model could not be reached or timed out
    ModelUnavailable,
    /// The model reply could not be interpreted
    MalformedReply,
    /// A model finding named a symbol that does not exist
    UnresolvedSymbol,
    /// A model finding used a category outside the allowed set
    UnknownCategory,
    /// No emitter is registered for a requested language
    UnsupportedLanguage,
}

impl fmt::Display for DiagnosticKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            DiagnosticKind::ParseDegradation => "parse-degradation",
            DiagnosticKind::ShadowedModule => "shadowed-module",
            DiagnosticKind::ModelUnavailable => "model-unavailable",
            DiagnosticKind::MalformedReply => "malformed-reply",
            DiagnosticKind::UnresolvedSymbol => "unresolved-symbol",
            DiagnosticKind::UnknownCategory => "unknown-category",
            DiagnosticKind::UnsupportedLanguage => "unsupported-language",
        })
    }
}

/// One recorded degradation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    /// Severity
    pub severity: Severity,
    /// Kind
    pub kind: DiagnosticKind,
    /// Pipeline stage that recorded it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stage: Option<String>,
    /// File concerned
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
    /// Symbol concerned
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub symbol: Option<QualifiedName>,
    /// Explanation
    pub message: String,
}

impl Diagnostic {
    /// Diagnostic with the given severity
    #[must_use]
    pub fn new(severity: Severity, kind: DiagnosticKind, message: impl Into<String>) -> Self {
        Self {
            severity,
            kind,
            stage: None,
            path: None,
            symbol: None,
            message: message.into(),
        }
    }

    /// Warning-level diagnostic
    #[must_use]
    pub fn warning(kind: DiagnosticKind, message: impl Into<String>) -> Self {
        Self::new(Severity::Warning, kind, message)
    }

    /// Error-level diagnostic
    #[must_use]
    pub fn error(kind: DiagnosticKind, message: impl Into<String>) -> Self {
        Self::new(Severity::Error, kind, message)
    }

    /// Builder: file
    #[must_use]
    pub fn at_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.path = Some(path.into());
        self
    }

    /// Builder: symbol
    #[must_use]
    pub fn for_symbol(mut self, symbol: QualifiedName) -> Self {
        self.symbol = Some(symbol);
        self
    }

    /// Builder: stage
    #[must_use]
    pub fn in_stage(mut self, stage: impl Into<String>) -> Self {
        self.stage = Some(stage.into());
        self
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.severity, self.kind)?;
        if let Some(path) = &self.path {
            write!(f, " {}", path.display())?;
        }
        if let Some(symbol) = &self.symbol {
            write!(f, " {symbol}")?;
        }
        write!(f, ": {}", self.message)
    }
}
