//! Pipeline configuration
//!
//! Loaded from an optional TOML file; command-line flags are applied on top
//! through the `with_*` builders.

use std::path::{Path, PathBuf};
use std::time::Duration;

use scaffold_analysis::AggregatorConfig;
use scaffold_inventory::InventoryConfig;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Language model settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Model identifier passed to the endpoint
    pub id: String,
    /// Base URL of the generation endpoint
    pub endpoint: String,
    /// Per-query timeout in seconds
    pub timeout_secs: u64,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            id: String::new(),
            endpoint: scaffold_analysis::HttpModelAdapter::DEFAULT_ENDPOINT.to_string(),
            timeout_secs: 60,
        }
    }
}

/// Settings for one pipeline run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Directory receiving the report and generated tests
    pub output_dir: PathBuf,
    /// Target languages by name; empty means every language found
    pub targets: Vec<String>,
    /// Files summarized and model queries issued concurrently
    pub concurrency: usize,
    /// Branch or tag to check out when cloning
    pub revision: Option<String>,
    /// Branch threshold of the high-complexity rule
    pub complexity_threshold: u32,
    /// Larger files are recorded as parse failures
    pub max_file_bytes: u64,
    /// Extra directory names never entered
    pub exclude_dirs: Vec<String>,
    /// Skip conventional test files
    pub skip_test_files: bool,
    /// Model enrichment; heuristics only when absent
    pub model: Option<ModelConfig>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("scaffold-out"),
            targets: Vec::new(),
            concurrency: 4,
            revision: None,
            complexity_threshold: 10,
            max_file_bytes: 1024 * 1024,
            exclude_dirs: Vec::new(),
            skip_test_files: true,
            model: None,
        }
    }
}

impl PipelineConfig {
    /// Parse TOML text
    ///
    /// # Errors
    /// [`ConfigError::Parse`] on invalid TOML or unknown value types
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    /// Read and parse a TOML file
    ///
    /// # Errors
    /// [`ConfigError::Read`] or [`ConfigError::Parse`]
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    /// With output directory
    #[must_use]
    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = dir.into();
        self
    }

    /// With target language names
    #[must_use]
    pub fn with_targets<I, S>(mut self, targets: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.targets = targets.into_iter().map(Into::into).collect();
        self
    }

    /// With concurrency limit (at least 1)
    #[inline]
    #[must_use]
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    /// With revision to clone
    #[must_use]
    pub fn with_revision(mut self, revision: impl Into<String>) -> Self {
        self.revision = Some(revision.into());
        self
    }

    /// With model enrichment
    #[must_use]
    pub fn with_model(mut self, model: ModelConfig) -> Self {
        self.model = Some(model);
        self
    }

    /// With high-complexity threshold
    #[inline]
    #[must_use]
    pub fn with_complexity_threshold(mut self, threshold: u32) -> Self {
        self.complexity_threshold = threshold;
        self
    }

    /// Inventory settings derived from this configuration
    #[must_use]
    pub fn inventory(&self) -> InventoryConfig {
        let config = InventoryConfig::default()
            .with_concurrency(self.concurrency)
            .with_max_file_bytes(self.max_file_bytes)
            .with_skip_test_files(self.skip_test_files);
        self.exclude_dirs.iter().fold(config, |c, dir| c.exclude(dir.clone()))
    }

    /// Aggregator settings derived from this configuration
    #[must_use]
    pub fn aggregator(&self) -> AggregatorConfig {
        let timeout = self.model.as_ref().map_or(60, |m| m.timeout_secs);
        AggregatorConfig::default()
            .with_concurrency(self.concurrency)
            .with_model_timeout(Duration::from_secs(timeout))
            .with_complexity_threshold(self.complexity_threshold)
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn partial_files_keep_defaults() {
        let config = PipelineConfig::from_toml_str(
            r#"
            targets = ["python", "java"]
            concurrency = 2

            [model]
            id = "codellama"
            "#,
        )
        .unwrap();
        assert_eq!(config.targets, vec!["python", "java"]);
        assert_eq!(config.concurrency, 2);
        assert_eq!(config.output_dir, PathBuf::from("scaffold-out"));
        let model = config.model.unwrap();
        assert_eq!(model.id, "codellama");
        assert_eq!(model.endpoint, "http://localhost:11434");
        assert_eq!(model.timeout_secs, 60);
    }

    #[test]
    fn invalid_values_are_rejected() {
        assert!(matches!(
            PipelineConfig::from_toml_str("concurrency = \"many\""),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn builders_feed_stage_configs() {
        let config = PipelineConfig::default()
            .with_concurrency(0)
            .with_complexity_threshold(3)
            .with_model(ModelConfig {
                timeout_secs: 5,
                ..ModelConfig::default()
            });
        assert_eq!(config.concurrency, 1);
        assert_eq!(config.inventory().concurrency, 1);
        let aggregator = config.aggregator();
        assert_eq!(aggregator.model_timeout, Duration::from_secs(5));
        assert_eq!(aggregator.rules.high_complexity_threshold, 3);
    }
}
