//! Analysis aggregation
//!
//! Folds the inventory's summaries into one [`ProjectModel`]: public surface,
//! heuristic findings, module graph and insights, then model findings when a
//! [`ModelAdapter`] is supplied. Model failures never change the heuristic
//! output; they only add diagnostics.

use std::time::Duration;

use futures::stream::{self, StreamExt};
use scaffold_model::{
    Diagnostic, DiagnosticKind, FileSummary, ProjectModel, QualifiedName, RiskCategory, RiskFinding,
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::adapter::{ModelAdapter, ModelQuery, ModelReply};
use crate::error::{AnalysisError, ModelUnavailable, Result};
use crate::graph::{build_graph, inheritance, insights, ModuleResolver};
use crate::reply::interpret;
use crate::rules::{RuleConfig, RuleContext, RuleSet};
use crate::surface::{file_surface, public_surface};

/// Aggregation settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AggregatorConfig {
    /// Heuristic rule thresholds
    pub rules: RuleConfig,
    /// Model queries in flight at once
    pub concurrency: usize,
    /// Timeout for a single model query
    pub model_timeout: Duration,
}

impl Default for AggregatorConfig {
    fn default() -> Self {
        Self {
            rules: RuleConfig::default(),
            concurrency: 4,
            model_timeout: Duration::from_secs(60),
        }
    }
}

impl AggregatorConfig {
    /// Builder: model concurrency, at least one
    #[must_use]
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    /// Builder: per-query timeout
    #[must_use]
    pub fn with_model_timeout(mut self, timeout: Duration) -> Self {
        self.model_timeout = timeout;
        self
    }

    /// Builder: complexity threshold
    #[must_use]
    pub fn with_complexity_threshold(mut self, threshold: u32) -> Self {
        self.rules.high_complexity_threshold = threshold;
        self
    }
}

/// Output of one aggregation
#[derive(Debug)]
pub struct Aggregation {
    /// The aggregated model
    pub model: ProjectModel,
    /// Everything recovered from along the way
    pub diagnostics: Vec<Diagnostic>,
}

/// Builds the project model from file summaries
#[derive(Debug)]
pub struct AnalysisAggregator {
    config: AggregatorConfig,
    rules: RuleSet,
}

impl Default for AnalysisAggregator {
    fn default() -> Self {
        Self::new(AggregatorConfig::default())
    }
}

impl AnalysisAggregator {
    /// Aggregator running the standard rules
    #[must_use]
    pub fn new(config: AggregatorConfig) -> Self {
        let rules = RuleSet::standard(&config.rules);
        Self { config, rules }
    }

    /// Builder: replace the rule set
    #[must_use]
    pub fn with_rules(mut self, rules: RuleSet) -> Self {
        self.rules = rules;
        self
    }

    /// Current configuration
    #[inline]
    #[must_use]
    pub fn config(&self) -> &AggregatorConfig {
        &self.config
    }

    /// Aggregate `summaries` (in discovery order) into a project model
    ///
    /// # Errors
    /// Returns [`AnalysisError::Cancelled`] when `cancel` fires, or
    /// [`AnalysisError::Model`] if a finding fails to resolve
    pub async fn aggregate(
        &self,
        summaries: Vec<FileSummary>,
        adapter: Option<&dyn ModelAdapter>,
        cancel: &CancellationToken,
    ) -> Result<Aggregation> {
        if cancel.is_cancelled() {
            return Err(AnalysisError::Cancelled);
        }

        let mut diagnostics: Vec<Diagnostic> = summaries
            .iter()
            .filter(|file| file.parse_failed)
            .map(|file| {
                let reason = file.parse_error.as_deref().unwrap_or("file could not be parsed");
                Diagnostic::warning(DiagnosticKind::ParseDegradation, reason)
                    .at_path(&file.path)
                    .in_stage("inventory")
            })
            .collect();

        let base = ProjectModel::from_files(summaries);
        for path in base.shadowed() {
            warn!(path = %path.display(), "module path already taken, file skipped");
            diagnostics.push(
                Diagnostic::warning(
                    DiagnosticKind::ShadowedModule,
                    "maps to the same module as an earlier file of its language and was skipped",
                )
                .at_path(path)
                .in_stage("aggregate"),
            );
        }

        let resolver = ModuleResolver::new(base.files());
        let mut graph = build_graph(base.files(), &resolver);
        graph.inherits = {
            let files: Vec<&FileSummary> = base.files().collect();
            inheritance(&files, &resolver)
        };
        let surface = public_surface(base.files());
        let mut findings = self.heuristic_findings(&base, &resolver, &surface);
        let heuristic = findings.len();
        debug!(symbols = surface.len(), findings = heuristic, "heuristic rules evaluated");

        if let Some(adapter) = adapter {
            let (suggested, model_diagnostics) = self.model_findings(&base, adapter, cancel).await?;
            findings.extend(suggested);
            diagnostics.extend(model_diagnostics);
        }

        let insights = {
            let files: Vec<&FileSummary> = base.files().collect();
            insights(&files, &graph)
        };

        info!(
            files = base.file_count(),
            public = surface.len(),
            heuristic,
            suggested = findings.len() - heuristic,
            edges = graph.edges.len(),
            inherits = graph.inherits.len(),
            "analysis aggregated"
        );

        let model = base
            .with_public_surface(surface)?
            .with_findings(findings)?
            .with_structure(graph, insights);
        Ok(Aggregation { model, diagnostics })
    }

    fn heuristic_findings(
        &self,
        model: &ProjectModel,
        resolver: &ModuleResolver,
        surface: &[QualifiedName],
    ) -> Vec<RiskFinding> {
        surface
            .iter()
            .filter_map(|name| model.resolve(name))
            .flat_map(|(file, symbol)| {
                let ctx = RuleContext { file, model, resolver };
                self.rules.evaluate(&ctx, symbol)
            })
            .collect()
    }

    async fn model_findings(
        &self,
        model: &ProjectModel,
        adapter: &dyn ModelAdapter,
        cancel: &CancellationToken,
    ) -> Result<(Vec<RiskFinding>, Vec<Diagnostic>)> {
        let queries: Vec<(&FileSummary, ModelQuery)> = model
            .files()
            .filter(|file| !file.parse_failed)
            .filter_map(|file| {
                let names = file_surface(file);
                (!names.is_empty()).then(|| (file, self.query_for(file, &names)))
            })
            .collect();
        info!(queries = queries.len(), "querying model");

        let outcomes: Vec<(&FileSummary, Option<std::result::Result<ModelReply, ModelUnavailable>>)> =
            stream::iter(queries)
                .map(|(file, query)| async move {
                    if cancel.is_cancelled() {
                        return (file, None);
                    }
                    let limit = query.timeout;
                    let outcome = match tokio::time::timeout(limit, adapter.query(query)).await {
                        Ok(outcome) => outcome,
                        Err(_) => Err(ModelUnavailable::Timeout(limit)),
                    };
                    (file, Some(outcome))
                })
                .buffered(self.config.concurrency.max(1))
                .collect()
                .await;

        if cancel.is_cancelled() {
            return Err(AnalysisError::Cancelled);
        }

        let mut findings = Vec::new();
        let mut diagnostics = Vec::new();
        for (file, outcome) in outcomes {
            match outcome {
                Some(Ok(reply)) => {
                    let (suggested, notes) = interpret(&reply, file, model);
                    debug!(file = %file.path.display(), findings = suggested.len(), "model reply read");
                    findings.extend(suggested);
                    diagnostics.extend(notes);
                }
                Some(Err(e)) => {
                    warn!(file = %file.path.display(), error = %e, "model unavailable, keeping heuristic findings");
                    diagnostics.push(
                        Diagnostic::warning(DiagnosticKind::ModelUnavailable, e.to_string())
                            .at_path(&file.path)
                            .in_stage("aggregate"),
                    );
                }
                None => {}
            }
        }
        Ok((findings, diagnostics))
    }

    fn query_for(&self, file: &FileSummary, names: &[QualifiedName]) -> ModelQuery {
        let categories: Vec<&str> = RiskCategory::ALL.iter().map(RiskCategory::as_str).collect();
        let mut instructions = format!(
            "You review {} code for integration-testing risks.\n\
             Reply with JSON only: {{\"findings\": [{{\"symbol\": \"<symbol>\", \"category\": \"<category>\", \
             \"rationale\": \"<one sentence>\"}}]}}.\n\
             Allowed categories: {}.\n\
             Use only these symbols:\n",
            file.language,
            categories.join(", ")
        );
        for name in names {
            let line = file.symbol(name).map_or(0, |s| s.line);
            instructions.push_str(&format!("- {} (line {line})\n", name.segments().join(".")));
        }
        ModelQuery {
            file: file.path.clone(),
            module: file.module.clone(),
            excerpt: file.excerpt.clone(),
            instructions,
            timeout: self.config.model_timeout,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use mockall::predicate::always;
    use pretty_assertions::assert_eq;
    use scaffold_model::{Confidence, Language};
    use scaffold_test_utils::{add_summary, checkout_summary, function, summary};

    use super::*;
    use crate::adapter::{MockModelAdapter, SuggestedFinding};

    fn summaries() -> Vec<FileSummary> {
        vec![add_summary(), checkout_summary()]
    }

    fn suggested(symbol: &str, category: &str) -> SuggestedFinding {
        SuggestedFinding {
            symbol: symbol.to_string(),
            category: category.to_string(),
            rationale: "model says so".to_string(),
        }
    }

    #[tokio::test]
    async fn heuristics_alone() {
        let out = AnalysisAggregator::default()
            .aggregate(summaries(), None, &CancellationToken::new())
            .await
            .unwrap();
        let surface: Vec<String> = out.model.public_surface().iter().map(ToString::to_string).collect();
        assert_eq!(surface, vec!["calc:add", "shop:checkout"]);
        assert_eq!(out.model.findings().len(), 1);
        assert_eq!(out.model.findings()[0].category, RiskCategory::MissingErrorHandling);
        assert!(out.diagnostics.is_empty());
    }

    #[tokio::test]
    async fn model_findings_are_appended_without_dedup() {
        let mut adapter = MockModelAdapter::new();
        adapter.expect_query().with(always()).times(2).returning(|query| {
            Ok(if query.module == "shop" {
                ModelReply::Findings(vec![suggested("checkout", "missing-error-handling")])
            } else {
                ModelReply::Findings(vec![suggested("add", "high-complexity")])
            })
        });

        let plain = AnalysisAggregator::default()
            .aggregate(summaries(), None, &CancellationToken::new())
            .await
            .unwrap();
        let enriched = AnalysisAggregator::default()
            .aggregate(summaries(), Some(&adapter), &CancellationToken::new())
            .await
            .unwrap();

        let findings = enriched.model.findings();
        assert_eq!(&findings[..1], plain.model.findings());
        assert_eq!(findings.len(), 3);
        assert_eq!(findings[1].symbol.to_string(), "calc:add");
        assert_eq!(findings[1].confidence, Confidence::ModelSuggested);
        assert_eq!(findings[2].symbol.to_string(), "shop:checkout");
        assert_eq!(findings[2].category, findings[0].category);
    }

    #[tokio::test]
    async fn unavailable_model_only_adds_diagnostics() {
        let mut adapter = MockModelAdapter::new();
        adapter
            .expect_query()
            .returning(|_| Err(ModelUnavailable::Transport("connection refused".to_string())));

        let out = AnalysisAggregator::default()
            .aggregate(summaries(), Some(&adapter), &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(out.model.findings().len(), 1);
        assert_eq!(out.diagnostics.len(), 2);
        assert!(out.diagnostics.iter().all(|d| d.kind == DiagnosticKind::ModelUnavailable));
    }

    struct Stalled;

    #[async_trait::async_trait]
    impl ModelAdapter for Stalled {
        async fn query(&self, _query: ModelQuery) -> std::result::Result<ModelReply, ModelUnavailable> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok(ModelReply::Empty)
        }
    }

    #[tokio::test(start_paused = true)]
    async fn slow_model_times_out_softly() {
        let aggregator =
            AnalysisAggregator::new(AggregatorConfig::default().with_model_timeout(Duration::from_secs(5)));
        let out = aggregator
            .aggregate(summaries(), Some(&Stalled), &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(out.model.findings().len(), 1);
        assert_eq!(out.diagnostics[0].kind, DiagnosticKind::ModelUnavailable);
        assert!(out.diagnostics[0].message.contains("timed out"));
    }

    #[tokio::test]
    async fn degraded_and_shadowed_files_become_diagnostics() {
        let broken = FileSummary::failed(
            "broken.py",
            Language::Python,
            scaffold_model::ContentHash::of(b"def broken(:"),
            "syntax error at line 1",
        );
        let twin = summary("calc.pyw", Language::Python).with_symbol(function("calc", "other", &[]));
        let out = AnalysisAggregator::default()
            .aggregate(vec![add_summary(), broken, twin], None, &CancellationToken::new())
            .await
            .unwrap();

        let kinds: Vec<DiagnosticKind> = out.diagnostics.iter().map(|d| d.kind).collect();
        assert_eq!(kinds, vec![DiagnosticKind::ParseDegradation, DiagnosticKind::ShadowedModule]);
        assert_eq!(out.model.file_count(), 2);
        assert_eq!(out.model.insights().stats.parse_failures, 1);
    }

    #[tokio::test]
    async fn cancelled_before_start() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let err = AnalysisAggregator::default()
            .aggregate(summaries(), None, &cancel)
            .await
            .unwrap_err();
        assert_eq!(err, AnalysisError::Cancelled);
    }

    #[test]
    fn instructions_list_symbols_and_categories() {
        let file = checkout_summary();
        let names = file_surface(&file);
        let query = AnalysisAggregator::default().query_for(&file, &names);
        assert!(query.instructions.contains("- checkout (line 1)"));
        assert!(query.instructions.contains("missing-error-handling, high-complexity"));
        assert_eq!(query.module, "shop");
    }
}
