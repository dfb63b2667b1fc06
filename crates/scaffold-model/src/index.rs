//! Qualified-name index over a project's symbols
//!
//! Provides [`SymbolIndex`], a radix tree from [`QualifiedName::trie_key`] to
//! the symbol's position in the project, so lookups by name, by owning class
//! and by module do not scan every file.

use radix_trie::{Trie, TrieCommon};
use serde::{Deserialize, Serialize};

use crate::name::QualifiedName;

/// Position of a symbol: file index in discovery order, symbol index in declaration order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SymbolPosition {
    /// Index of the file in the project
    pub file: usize,
    /// Index of the symbol inside its file
    pub symbol: usize,
}

/// Radix-tree index keyed by qualified name
pub struct SymbolIndex {
    trie: Trie<String, (QualifiedName, SymbolPosition)>,
    len: usize,
}

impl std::fmt::Debug for SymbolIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SymbolIndex").field("len", &self.len).finish()
    }
}

impl Default for SymbolIndex {
    fn default() -> Self {
        Self::new()
    }
}

impl SymbolIndex {
    /// Empty index
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self {
            trie: Trie::new(),
            len: 0,
        }
    }

    /// Insert a symbol. The first declaration of a name wins; returns `false`
    /// for a later duplicate (overloads, redefinitions).
    pub fn insert(&mut self, name: &QualifiedName, position: SymbolPosition) -> bool {
        let key = name.trie_key();
        if self.trie.get(&key).is_some() {
            return false;
        }
        self.trie.insert(key, (name.clone(), position));
        self.len += 1;
        true
    }

    /// Exact lookup
    #[must_use]
    pub fn get(&self, name: &QualifiedName) -> Option<SymbolPosition> {
        self.trie.get(&name.trie_key()).map(|(_, pos)| *pos)
    }

    /// Whether a name resolves
    #[inline]
    #[must_use]
    pub fn contains(&self, name: &QualifiedName) -> bool {
        self.get(name).is_some()
    }

    /// Direct members of a class, in declaration order
    #[must_use]
    pub fn members(&self, owner: &QualifiedName) -> Vec<(QualifiedName, SymbolPosition)> {
        let depth = owner.segments().len() + 1;
        self.with_prefix(&owner.member_prefix())
            .into_iter()
            .filter(|(name, _)| name.segments().len() == depth)
            .collect()
    }

    /// Every symbol of a module, in declaration order
    #[must_use]
    pub fn in_module(&self, module: &str) -> Vec<(QualifiedName, SymbolPosition)> {
        self.with_prefix(&QualifiedName::module_prefix(module))
    }

    /// Symbols of `module` whose own name is `name`, top-level ones first
    #[must_use]
    pub fn named_in_module(&self, module: &str, name: &str) -> Vec<(QualifiedName, SymbolPosition)> {
        let mut found: Vec<_> = self
            .in_module(module)
            .into_iter()
            .filter(|(qn, _)| qn.name() == name)
            .collect();
        found.sort_by_key(|(qn, pos)| (qn.segments().len(), *pos));
        found
    }

    /// Number of indexed symbols
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether the index is empty
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    fn with_prefix(&self, prefix: &str) -> Vec<(QualifiedName, SymbolPosition)> {
        let key = prefix.to_string();
        let mut found: Vec<_> = self
            .trie
            .get_raw_descendant(&key)
            .map(|subtrie| {
                subtrie
                    .iter()
                    .filter(|(key, _)| key.starts_with(prefix))
                    .map(|(_, (name, pos))| (name.clone(), *pos))
                    .collect()
            })
            .unwrap_or_default();
        found.sort_by_key(|(_, pos)| *pos);
        found
    }
}
