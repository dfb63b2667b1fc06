//! End-to-end pipeline orchestration
//!
//! One [`Pipeline::run`] drives a repository through every stage in order,
//! checking the cancellation token at each boundary. Recoverable problems
//! accumulate in [`Diagnostics`]; the first fatal error aborts the run and is
//! returned together with the last stage that completed. A run that fails
//! after aggregation still writes the analysis export, the plan export when
//! planning completed, and a report naming the failure.

use std::path::PathBuf;
use std::sync::Arc;

use chrono::Utc;
use scaffold_analysis::{AnalysisAggregator, HttpModelAdapter, ModelAdapter};
use scaffold_emit::{default_emitters, EmitterRegistry};
use scaffold_inventory::SourceInventory;
use scaffold_model::{Diagnostic, DiagnosticKind, EmittedTestFile, Language, ProjectModel, TestPlanUnit};
use scaffold_planner::ScaffoldPlanner;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, info_span, warn, Instrument};
use ulid::Ulid;

use crate::acquire::{acquire, RepositorySource};
use crate::config::PipelineConfig;
use crate::diagnostics::Diagnostics;
use crate::error::{PipelineError, Result};
use crate::report::{ReportInput, ReportWriter, RunSummary};
use crate::stage::{Stage, StageTracker};

/// Result of a run that reached the end
#[derive(Debug)]
pub struct RunOutcome {
    /// Unique run id
    pub run_id: Ulid,
    /// Last completed stage
    pub stage: Stage,
    /// Every degradation recorded
    pub diagnostics: Diagnostics,
    /// Requested targets that had no emitter
    pub unsupported: Vec<String>,
    /// Written test files
    pub test_files: Vec<PathBuf>,
    /// Written `REPORT.md`
    pub report_path: PathBuf,
}

impl RunOutcome {
    /// Whether every requested target was emitted
    #[inline]
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.unsupported.is_empty()
    }

    /// Process exit code: 4 when any requested target was unsupported
    #[must_use]
    pub fn exit_code(&self) -> u8 {
        match self.unsupported.first() {
            Some(target) => PipelineError::UnsupportedLanguage(target.clone()).exit_code(),
            None => 0,
        }
    }
}

/// A run aborted by a fatal error
#[derive(Debug, thiserror::Error)]
#[error("{error} (last completed stage: {stage})")]
pub struct RunFailure {
    /// Run id
    pub run_id: Ulid,
    /// Last completed stage
    pub stage: Stage,
    /// Cause
    #[source]
    pub error: PipelineError,
    /// Degradations recorded before the failure
    pub diagnostics: Diagnostics,
    /// Partial `REPORT.md`, written when the run got past aggregation
    pub report_path: Option<PathBuf>,
}

impl RunFailure {
    /// Process exit code of the cause
    #[inline]
    #[must_use]
    pub fn exit_code(&self) -> u8 {
        self.error.exit_code()
    }
}

/// Pipeline wiring for one configuration
pub struct Pipeline {
    config: PipelineConfig,
    inventory: SourceInventory,
    aggregator: AnalysisAggregator,
    planner: ScaffoldPlanner,
    emitters: EmitterRegistry,
    adapter: Option<Arc<dyn ModelAdapter>>,
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("config", &self.config)
            .field("emitters", &self.emitters)
            .field("model", &self.adapter.is_some())
            .finish_non_exhaustive()
    }
}

impl Pipeline {
    /// Pipeline with the standard emitters; a configured model becomes an
    /// [`HttpModelAdapter`]
    #[must_use]
    pub fn new(config: PipelineConfig) -> Self {
        let adapter = config.model.as_ref().map(|model| {
            let http = HttpModelAdapter::new(model.endpoint.clone(), model.id.clone());
            Arc::new(http) as Arc<dyn ModelAdapter>
        });
        Self {
            inventory: SourceInventory::new(config.inventory()),
            aggregator: AnalysisAggregator::new(config.aggregator()),
            planner: ScaffoldPlanner::new(),
            emitters: default_emitters(),
            adapter,
            config,
        }
    }

    /// Builder: replace the model adapter
    #[must_use]
    pub fn with_adapter(mut self, adapter: Arc<dyn ModelAdapter>) -> Self {
        self.adapter = Some(adapter);
        self
    }

    /// Builder: replace the emitter registry
    #[must_use]
    pub fn with_emitters(mut self, emitters: EmitterRegistry) -> Self {
        self.emitters = emitters;
        self
    }

    /// Current configuration
    #[inline]
    #[must_use]
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Run every stage for `source`
    ///
    /// # Errors
    /// [`RunFailure`] carrying the fatal [`PipelineError`] and the last
    /// completed stage
    pub async fn run(&self, source: RepositorySource, cancel: &CancellationToken) -> std::result::Result<RunOutcome, RunFailure> {
        let run_id = Ulid::new();
        let span = info_span!("run", %run_id, source = %source);
        let mut tracker = StageTracker::new();
        let mut diagnostics = Diagnostics::new();
        let mut progress = Progress {
            described: source.to_string(),
            ..Progress::default()
        };

        let result = self
            .run_stages(run_id, source, cancel, &mut tracker, &mut diagnostics, &mut progress)
            .instrument(span.clone())
            .await;
        match result {
            Ok((report_path, test_files, unsupported)) => {
                info!(%run_id, diagnostics = diagnostics.len(), "run complete");
                Ok(RunOutcome {
                    run_id,
                    stage: tracker.current(),
                    diagnostics,
                    unsupported,
                    test_files,
                    report_path,
                })
            }
            Err(err) => {
                error!(%run_id, stage = %tracker.current(), error = %err, "run aborted");
                let report_path = self
                    .write_partial(run_id, &tracker, &err, &diagnostics, progress)
                    .instrument(span)
                    .await;
                Err(RunFailure {
                    run_id,
                    stage: tracker.current(),
                    error: err,
                    diagnostics,
                    report_path,
                })
            }
        }
    }

    async fn run_stages(
        &self,
        run_id: Ulid,
        source: RepositorySource,
        cancel: &CancellationToken,
        tracker: &mut StageTracker,
        diagnostics: &mut Diagnostics,
        progress: &mut Progress,
    ) -> Result<(PathBuf, Vec<PathBuf>, Vec<String>)> {
        let repo = acquire(source, cancel).await?;
        tracker.advance(Stage::Acquired)?;

        checkpoint(cancel)?;
        let summaries = self.inventory.summarize(repo.root(), cancel).await?;
        info!(files = summaries.len(), "inventory complete");
        tracker.advance(Stage::Inventoried)?;

        checkpoint(cancel)?;
        let aggregation = self
            .aggregator
            .aggregate(summaries, self.adapter.as_deref(), cancel)
            .await?;
        diagnostics.extend(aggregation.diagnostics);
        let model: &ProjectModel = progress.model.insert(aggregation.model);
        tracker.advance(Stage::Aggregated)?;

        checkpoint(cancel)?;
        let units: &[TestPlanUnit] = progress.units.insert(self.planner.plan(model)?);
        tracker.advance(Stage::Planned)?;

        checkpoint(cancel)?;
        let languages: Vec<Language> = model.insights().stats.languages.keys().copied().collect();
        let emission = self.emit(units, &languages, cancel, diagnostics)?;
        tracker.advance(Stage::Emitted)?;

        checkpoint(cancel)?;
        let writer = ReportWriter::new(&self.config.output_dir);
        let test_files = writer.write_tests(&emission.files).await?;
        // the report describes the run as it stands once written
        let run = RunSummary {
            run_id,
            source: progress.described.clone(),
            stage: Stage::Reported,
            started_at: tracker.started_at(),
            finished_at: Utc::now(),
            emitted: emission.emitted,
            unsupported: emission.unsupported.clone(),
            failure: None,
        };
        let report_path = writer
            .write_report(ReportInput {
                run: &run,
                model,
                units,
                files: &emission.files,
                diagnostics: &*diagnostics,
            })
            .await?;
        tracker.advance(Stage::Reported)?;

        Ok((report_path, test_files, emission.unsupported))
    }

    /// Exports and report for a run that failed after aggregation
    async fn write_partial(
        &self,
        run_id: Ulid,
        tracker: &StageTracker,
        err: &PipelineError,
        diagnostics: &Diagnostics,
        progress: Progress,
    ) -> Option<PathBuf> {
        let model = progress.model?;
        let units = progress.units.unwrap_or_default();
        let run = RunSummary {
            run_id,
            source: progress.described,
            stage: tracker.current(),
            started_at: tracker.started_at(),
            finished_at: Utc::now(),
            emitted: Vec::new(),
            unsupported: Vec::new(),
            failure: Some(err.to_string()),
        };
        let written = ReportWriter::new(&self.config.output_dir)
            .write_report(ReportInput {
                run: &run,
                model: &model,
                units: &units,
                files: &[],
                diagnostics,
            })
            .await;
        match written {
            Ok(path) => {
                info!(path = %path.display(), stage = %run.stage, "partial report written");
                Some(path)
            }
            Err(report_err) => {
                warn!(error = %report_err, "partial report could not be written");
                None
            }
        }
    }

    fn emit(
        &self,
        units: &[TestPlanUnit],
        present: &[Language],
        cancel: &CancellationToken,
        diagnostics: &mut Diagnostics,
    ) -> Result<Emission> {
        let mut emission = Emission::default();

        if self.config.targets.is_empty() {
            for &language in present {
                if self.emitters.find(language).is_none() {
                    continue;
                }
                checkpoint(cancel)?;
                let files = self.emitters.emit(units, language)?;
                emission.record(language.as_str(), files);
            }
            return Ok(emission);
        }

        let mut seen: Vec<String> = Vec::new();
        for target in &self.config.targets {
            let key = target.parse::<Language>().map_or_else(|_| target.trim().to_string(), |l| l.as_str().to_string());
            if seen.contains(&key) {
                continue;
            }
            seen.push(key.clone());
            checkpoint(cancel)?;
            match self.emitters.emit_target(units, target) {
                Ok(files) => emission.record(&key, files),
                Err(err) if err.is_unsupported() => {
                    warn!(target = %key, "no emitter for target");
                    diagnostics.push(
                        Diagnostic::error(DiagnosticKind::UnsupportedLanguage, err.to_string()).in_stage(Stage::Emitted.as_str()),
                    );
                    emission.unsupported.push(key);
                }
                Err(err) => return Err(err.into()),
            }
        }
        Ok(emission)
    }
}

/// What a run produced before it stopped
#[derive(Debug, Default)]
struct Progress {
    described: String,
    model: Option<ProjectModel>,
    units: Option<Vec<TestPlanUnit>>,
}

#[derive(Debug, Default)]
struct Emission {
    files: Vec<EmittedTestFile>,
    emitted: Vec<String>,
    unsupported: Vec<String>,
}

impl Emission {
    fn record(&mut self, language: &str, files: Vec<EmittedTestFile>) {
        if !files.is_empty() {
            self.emitted.push(language.to_string());
        }
        self.files.extend(files);
    }
}

fn checkpoint(cancel: &CancellationToken) -> Result<()> {
    if cancel.is_cancelled() {
        Err(PipelineError::Cancelled)
    } else {
        Ok(())
    }
}
