//! Source discovery and bounded-parallel summarization

use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use futures::stream::{self, StreamExt};
use scaffold_model::{module_path, ContentHash, FileSummary, Language};
use tokio_util::sync::CancellationToken;
use walkdir::{DirEntry, WalkDir};

use crate::cache::{SummaryCache, SummaryKey};
use crate::classify::{classify, is_test_file, needs_shebang};
use crate::error::{ExtractError, InventoryError, Result};
use crate::extract::{ExtractorRegistry, SourceFile};

const SHEBANG_HEAD_BYTES: usize = 256;

/// Inventory settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InventoryConfig {
    /// Files summarized concurrently
    pub concurrency: usize,
    /// Larger files are recorded as parse failures
    pub max_file_bytes: u64,
    /// Source prefix kept for model queries
    pub max_excerpt_bytes: usize,
    /// Directory names never entered
    pub exclude_dirs: Vec<String>,
    /// Skip files that are tests by naming convention
    pub skip_test_files: bool,
}

impl Default for InventoryConfig {
    fn default() -> Self {
        Self {
            concurrency: 8,
            max_file_bytes: 1024 * 1024,
            max_excerpt_bytes: 4000,
            exclude_dirs: [".git", "node_modules", "venv", ".venv", "__pycache__", "target", "build", "dist"]
                .into_iter()
                .map(String::from)
                .collect(),
            skip_test_files: true,
        }
    }
}

impl InventoryConfig {
    /// With concurrency limit (at least 1)
    #[inline]
    #[must_use]
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    /// With file size limit
    #[inline]
    #[must_use]
    pub fn with_max_file_bytes(mut self, bytes: u64) -> Self {
        self.max_file_bytes = bytes;
        self
    }

    /// With excerpt size
    #[inline]
    #[must_use]
    pub fn with_max_excerpt_bytes(mut self, bytes: usize) -> Self {
        self.max_excerpt_bytes = bytes;
        self
    }

    /// With an additional excluded directory name
    #[must_use]
    pub fn exclude(mut self, dir: impl Into<String>) -> Self {
        self.exclude_dirs.push(dir.into());
        self
    }

    /// Whether to skip conventional test files
    #[inline]
    #[must_use]
    pub fn with_skip_test_files(mut self, skip: bool) -> Self {
        self.skip_test_files = skip;
        self
    }
}

/// A classified source file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredFile {
    /// Path on disk
    pub absolute: PathBuf,
    /// Path relative to the root
    pub relative: PathBuf,
    /// Classified language
    pub language: Language,
}

/// Turns a directory tree into file summaries
#[derive(Debug, Clone)]
pub struct SourceInventory {
    config: InventoryConfig,
    registry: Arc<ExtractorRegistry>,
    cache: SummaryCache,
}

impl Default for SourceInventory {
    fn default() -> Self {
        Self::new(InventoryConfig::default())
    }
}

impl SourceInventory {
    /// Inventory with the built-in extractors and a fresh cache
    #[must_use]
    pub fn new(config: InventoryConfig) -> Self {
        Self {
            config,
            registry: Arc::new(ExtractorRegistry::default()),
            cache: SummaryCache::default(),
        }
    }

    /// Share an existing cache
    #[must_use]
    pub fn with_cache(mut self, cache: SummaryCache) -> Self {
        self.cache = cache;
        self
    }

    /// Use a custom extractor registry
    #[must_use]
    pub fn with_registry(mut self, registry: ExtractorRegistry) -> Self {
        self.registry = Arc::new(registry);
        self
    }

    /// Settings
    #[inline]
    #[must_use]
    pub fn config(&self) -> &InventoryConfig {
        &self.config
    }

    /// Summary cache
    #[inline]
    #[must_use]
    pub fn cache(&self) -> &SummaryCache {
        &self.cache
    }

    fn is_skipped_dir(&self, entry: &DirEntry) -> bool {
        if entry.depth() == 0 || !entry.file_type().is_dir() {
            return false;
        }
        let name = entry.file_name().to_string_lossy();
        name.starts_with('.') || self.config.exclude_dirs.iter().any(|d| *d == name)
    }

    /// Classified source files under `root`, in deterministic order
    ///
    /// # Errors
    /// [`InventoryError::RootNotFound`] when `root` is not a directory,
    /// [`InventoryError::Walk`] when the root itself cannot be read
    pub fn discover(&self, root: &Path) -> Result<Vec<DiscoveredFile>> {
        if !root.is_dir() {
            return Err(InventoryError::RootNotFound(root.to_path_buf()));
        }

        let mut files = Vec::new();
        let walker = WalkDir::new(root)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| !self.is_skipped_dir(e));
        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) if e.depth() == 0 => return Err(e.into()),
                Err(e) => {
                    tracing::warn!(error = %e, "skipping unreadable entry");
                    continue;
                }
            };
            if !entry.file_type().is_file() {
                continue;
            }
            let absolute = entry.into_path();
            let relative = absolute.strip_prefix(root).unwrap_or(&absolute).to_path_buf();
            if self.config.skip_test_files && is_test_file(&relative) {
                tracing::trace!(path = %relative.display(), "skipping test file");
                continue;
            }
            let head = if needs_shebang(&relative) {
                read_head(&absolute)
            } else {
                None
            };
            if let Some(language) = classify(&relative, head.as_deref()) {
                files.push(DiscoveredFile {
                    absolute,
                    relative,
                    language,
                });
            }
        }
        tracing::debug!(files = files.len(), root = %root.display(), "discovered source files");
        Ok(files)
    }

    /// Summarize every source file under `root`
    ///
    /// Per-file failures never abort: they become summaries flagged
    /// `parse_failed`. Results keep discovery order.
    ///
    /// # Errors
    /// Discovery errors, or [`InventoryError::Cancelled`] when `cancel` fires
    pub async fn summarize(&self, root: &Path, cancel: &CancellationToken) -> Result<Vec<FileSummary>> {
        let files = self.discover(root)?;
        let total = files.len();

        let results: Vec<Option<FileSummary>> = stream::iter(files)
            .map(|file| async move {
                if cancel.is_cancelled() {
                    return None;
                }
                Some(self.summarize_file(file).await)
            })
            .buffered(self.config.concurrency.max(1))
            .collect()
            .await;

        if cancel.is_cancelled() {
            tracing::info!("inventory cancelled");
            return Err(InventoryError::Cancelled);
        }

        let summaries: Vec<FileSummary> = results.into_iter().flatten().collect();
        let failed = summaries.iter().filter(|s| s.parse_failed).count();
        tracing::info!("Summarized {} files ({} parse failures)", total, failed);
        Ok(summaries)
    }

    /// Summarize one file, degrading to a failed summary on any error
    pub async fn summarize_file(&self, file: DiscoveredFile) -> FileSummary {
        let DiscoveredFile {
            absolute,
            relative,
            language,
        } = file;

        let size = tokio::fs::metadata(&absolute).await.map(|m| m.len()).unwrap_or(0);
        if size > self.config.max_file_bytes {
            let reason = ExtractError::TooLarge {
                size,
                limit: self.config.max_file_bytes,
            };
            return degraded(relative, language, ContentHash::of(b""), &reason);
        }

        let bytes = match tokio::fs::read(&absolute).await {
            Ok(bytes) => bytes,
            Err(e) => return degraded(relative, language, ContentHash::of(b""), &ExtractError::Read(e.to_string())),
        };
        let hash = ContentHash::of(&bytes);
        let key = SummaryKey::new(hash, language, relative.clone());
        if let Some(cached) = self.cache.get(&key).await {
            tracing::trace!(path = %relative.display(), "summary cache hit");
            return (*cached).clone();
        }

        let summary = match String::from_utf8(bytes) {
            Ok(text) => self.extract(relative, language, hash, text).await,
            Err(_) => degraded(relative, language, hash, &ExtractError::NotUtf8),
        };
        self.cache.insert(key, Arc::new(summary.clone())).await;
        summary
    }

    async fn extract(&self, relative: PathBuf, language: Language, hash: ContentHash, text: String) -> FileSummary {
        let registry = Arc::clone(&self.registry);
        let module = module_path(&relative);
        let path = relative.clone();
        let task = tokio::task::spawn_blocking(move || {
            let file = SourceFile {
                path: &path,
                language,
                module: &module,
                text: &text,
            };
            let extraction = registry.extract(&file);
            (text, extraction)
        });

        let (text, extraction) = match task.await {
            Ok(done) => done,
            Err(e) => {
                return degraded(relative, language, hash, &ExtractError::Read(format!("extraction task failed: {e}")));
            }
        };

        let mut summary = match extraction {
            Ok(extraction) => {
                let mut summary = FileSummary::new(relative, language, hash);
                if let Some(module) = extraction.module {
                    summary.module = module;
                }
                summary.namespace = extraction.namespace;
                summary.symbols = extraction.symbols;
                for import in extraction.imports {
                    summary.add_import(import);
                }
                tracing::debug!(
                    path = %summary.path.display(),
                    symbols = summary.symbols.len(),
                    "extracted"
                );
                summary
            }
            Err(e) => degraded(relative, language, hash, &e),
        };
        summary.line_count = text.lines().count();
        summary.excerpt = excerpt(&text, self.config.max_excerpt_bytes);
        summary
    }
}

fn degraded(relative: PathBuf, language: Language, hash: ContentHash, reason: &ExtractError) -> FileSummary {
    tracing::warn!(path = %relative.display(), %language, reason = %reason, "structure unavailable");
    FileSummary::failed(relative, language, hash, reason.to_string())
}

fn read_head(path: &Path) -> Option<Vec<u8>> {
    let mut file = std::fs::File::open(path).ok()?;
    let mut head = vec![0; SHEBANG_HEAD_BYTES];
    let read = file.read(&mut head).ok()?;
    head.truncate(read);
    Some(head)
}

/// Prefix of at most `limit` bytes, cut on a character boundary
fn excerpt(text: &str, limit: usize) -> String {
    if text.len() <= limit {
        return text.to_string();
    }
    let mut end = limit;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    text[..end].to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn excerpt_respects_char_boundaries() {
        assert_eq!(excerpt("abc", 10), "abc");
        assert_eq!(excerpt("héllo", 2), "h");
        assert_eq!(excerpt("héllo", 3), "hé");
    }

    #[test]
    fn config_builders() {
        let config = InventoryConfig::default().with_concurrency(0).exclude("vendor");
        assert_eq!(config.concurrency, 1);
        assert!(config.exclude_dirs.iter().any(|d| d == "vendor"));
        assert!(config.skip_test_files);
    }
}
