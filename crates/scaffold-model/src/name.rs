//! Qualified symbol names
//!
//! A [`QualifiedName`] is the only way one pipeline value refers to a symbol
//! owned by another: risk findings, plan units and report rows all carry a
//! name and resolve it against the [`ProjectModel`](crate::ProjectModel) when
//! they need the descriptor.

use std::fmt;
use std::str::FromStr;

const OVERLOAD_SEPARATOR: char = '#';

/// `add#2` splits into `("add", 2)`. A leading `#` (private JS members) is part of the name.
fn split_overload(segment: &str) -> Option<(&str, u32)> {
    let (name, ordinal) = segment.rsplit_once(OVERLOAD_SEPARATOR)?;
    if name.is_empty() {
        return None;
    }
    ordinal.parse().ok().map(|ordinal| (name, ordinal))
}

/// Module path plus symbol segments, e.g. `src.api:API.register_user`
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct QualifiedName {
    module: String,
    segments: Vec<String>,
}

impl QualifiedName {
    /// Create a name from a dotted module path and symbol segments
    #[must_use]
    pub fn new<I, S>(module: impl Into<String>, segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            module: module.into(),
            segments: segments.into_iter().map(Into::into).collect(),
        }
    }

    /// Top-level symbol in a module
    #[inline]
    #[must_use]
    pub fn top_level(module: impl Into<String>, name: impl Into<String>) -> Self {
        Self::new(module, [name.into()])
    }

    /// Dotted module path
    #[inline]
    #[must_use]
    pub fn module(&self) -> &str {
        &self.module
    }

    /// Same symbol path under another module
    #[must_use]
    pub fn with_module(&self, module: impl Into<String>) -> Self {
        Self {
            module: module.into(),
            segments: self.segments.clone(),
        }
    }

    /// Symbol segments inside the module
    #[inline]
    #[must_use]
    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// Last segment without its overload ordinal (the symbol's own name)
    #[must_use]
    pub fn name(&self) -> &str {
        let last = self.segments.last().map_or("", String::as_str);
        split_overload(last).map_or(last, |(name, _)| name)
    }

    /// Ordinal of a repeated declaration: `2` for the second `add`, `None` for the first
    #[must_use]
    pub fn overload(&self) -> Option<u32> {
        self.segments
            .last()
            .and_then(|last| split_overload(last))
            .map(|(_, ordinal)| ordinal)
    }

    /// Same name tagged as the `ordinal`-th declaration, e.g. `Calc.add#2`
    #[must_use]
    pub fn with_overload(&self, ordinal: u32) -> Self {
        let mut segments = self.segments.clone();
        if let Some(last) = segments.last_mut() {
            let base = split_overload(last).map_or(last.as_str(), |(name, _)| name).to_string();
            *last = format!("{base}{OVERLOAD_SEPARATOR}{ordinal}");
        }
        Self {
            module: self.module.clone(),
            segments,
        }
    }

    /// Name of the enclosing symbol, if this is a member
    #[must_use]
    pub fn owner(&self) -> Option<Self> {
        if self.segments.len() < 2 {
            return None;
        }
        Some(Self {
            module: self.module.clone(),
            segments: self.segments[..self.segments.len() - 1].to_vec(),
        })
    }

    /// Name of a member of this symbol
    #[must_use]
    pub fn child(&self, segment: impl Into<String>) -> Self {
        let mut segments = self.segments.clone();
        segments.push(segment.into());
        Self {
            module: self.module.clone(),
            segments,
        }
    }

    /// Whether the symbol is nested inside another symbol
    #[inline]
    #[must_use]
    pub fn is_member(&self) -> bool {
        self.segments.len() > 1
    }

    /// Key used by the radix-tree index. Members of `A` share the prefix
    /// returned by [`QualifiedName::member_prefix`].
    #[must_use]
    pub fn trie_key(&self) -> String {
        format!("{}:{}", self.module, self.segments.join("/"))
    }

    /// Prefix shared by the trie keys of every member of this symbol
    #[must_use]
    pub fn member_prefix(&self) -> String {
        format!("{}/", self.trie_key())
    }

    /// Prefix shared by the trie keys of every symbol in `module`
    #[must_use]
    pub fn module_prefix(module: &str) -> String {
        format!("{module}:")
    }
}

impl fmt::Display for QualifiedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.module, self.segments.join("."))
    }
}

/// Malformed qualified name text
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("malformed qualified name '{0}': expected module:Symbol[.member]")]
pub struct NameParseError(pub String);

impl FromStr for QualifiedName {
    type Err = NameParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (module, symbol) = s
            .split_once(':')
            .ok_or_else(|| NameParseError(s.to_string()))?;
        let segments: Vec<String> = symbol.split('.').map(str::to_string).collect();
        if segments.iter().any(String::is_empty) {
            return Err(NameParseError(s.to_string()));
        }
        Ok(Self {
            module: module.to_string(),
            segments,
        })
    }
}

impl serde::Serialize for QualifiedName {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> serde::Deserialize<'de> for QualifiedName {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        text.parse().map_err(serde::de::Error::custom)
    }
}
