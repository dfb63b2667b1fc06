//! Source languages and their test frameworks

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Source language recognised by the inventory
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    /// Python 3
    Python,
    /// JavaScript (CommonJS or ES modules, JSX included)
    JavaScript,
    /// TypeScript (TSX included)
    TypeScript,
    /// Java
    Java,
}

impl Language {
    /// Every supported language, in reporting order
    pub const ALL: [Language; 4] = [
        Language::Python,
        Language::JavaScript,
        Language::TypeScript,
        Language::Java,
    ];

    /// File extensions (without dot) mapped to this language
    #[inline]
    #[must_use]
    pub fn extensions(&self) -> &'static [&'static str] {
        match self {
            Language::Python => &["py", "pyw"],
            Language::JavaScript => &["js", "mjs", "cjs", "jsx"],
            Language::TypeScript => &["ts", "mts", "cts", "tsx"],
            Language::Java => &["java"],
        }
    }

    /// Detect language from a file extension
    #[must_use]
    pub fn from_extension(ext: &str) -> Option<Self> {
        let ext = ext.trim_start_matches('.');
        Self::ALL
            .into_iter()
            .find(|lang| lang.extensions().iter().any(|e| e.eq_ignore_ascii_case(ext)))
    }

    /// Detect language from a shebang interpreter name such as `python3.11` or `node`
    #[must_use]
    pub fn from_interpreter(interpreter: &str) -> Option<Self> {
        let name = interpreter.rsplit('/').next().unwrap_or(interpreter);
        if name.starts_with("python") || name == "pypy" || name == "pypy3" {
            Some(Language::Python)
        } else if matches!(name, "node" | "nodejs" | "bun") {
            Some(Language::JavaScript)
        } else if matches!(name, "deno" | "ts-node" | "tsx") {
            Some(Language::TypeScript)
        } else if name == "java" {
            Some(Language::Java)
        } else {
            None
        }
    }

    /// Stable lowercase identifier, used for output directories and config
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Language::Python => "python",
            Language::JavaScript => "javascript",
            Language::TypeScript => "typescript",
            Language::Java => "java",
        }
    }

    /// Test framework generated for this language
    #[inline]
    #[must_use]
    pub fn framework(&self) -> Framework {
        match self {
            Language::Python => Framework::Pytest,
            Language::JavaScript | Language::TypeScript => Framework::Jest,
            Language::Java => Framework::JUnit5,
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Language::Python => "Python",
            Language::JavaScript => "JavaScript",
            Language::TypeScript => "TypeScript",
            Language::Java => "Java",
        };
        f.write_str(name)
    }
}

/// A language name that no emitter or extractor understands
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown language: '{0}'")]
pub struct UnknownLanguage(pub String);

impl FromStr for Language {
    type Err = UnknownLanguage;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "python" | "py" => Ok(Language::Python),
            "javascript" | "js" | "node" => Ok(Language::JavaScript),
            "typescript" | "ts" => Ok(Language::TypeScript),
            "java" => Ok(Language::Java),
            _ => Err(UnknownLanguage(s.trim().to_string())),
        }
    }
}

/// Test framework family an emitter targets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Framework {
    /// pytest with `unittest.mock`
    Pytest,
    /// Jest
    Jest,
    /// JUnit 5 with Mockito
    #[serde(rename = "junit5")]
    JUnit5,
}

impl fmt::Display for Framework {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Framework::Pytest => "pytest",
            Framework::Jest => "jest",
            Framework::JUnit5 => "junit5+mockito",
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extension_lookup() {
        assert_eq!(Language::from_extension("py"), Some(Language::Python));
        assert_eq!(Language::from_extension(".tsx"), Some(Language::TypeScript));
        assert_eq!(Language::from_extension("cjs"), Some(Language::JavaScript));
        assert_eq!(Language::from_extension("JAVA"), Some(Language::Java));
        assert_eq!(Language::from_extension("rs"), None);
    }

    #[test]
    fn interpreter_lookup() {
        assert_eq!(Language::from_interpreter("/usr/bin/python3"), Some(Language::Python));
        assert_eq!(Language::from_interpreter("node"), Some(Language::JavaScript));
        assert_eq!(Language::from_interpreter("ts-node"), Some(Language::TypeScript));
        assert_eq!(Language::from_interpreter("bash"), None);
    }

    #[test]
    fn target_names() {
        assert_eq!("Python".parse::<Language>(), Ok(Language::Python));
        assert_eq!(" ts ".parse::<Language>(), Ok(Language::TypeScript));
        assert_eq!("rust".parse::<Language>(), Err(UnknownLanguage("rust".into())));
    }

    #[test]
    fn javascript_family_shares_jest() {
        assert_eq!(Language::JavaScript.framework(), Language::TypeScript.framework());
        assert_eq!(Language::Java.framework(), Framework::JUnit5);
    }
}
