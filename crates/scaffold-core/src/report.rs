//! Report and test file output
//!
//! Layout under the output directory:
//!
//! ```text
//! <out>/
//!   REPORT.md
//!   analysis.json
//!   plan.json
//!   python/tests/...
//!   typescript/__tests__/...
//!   java/src/test/java/...
//! ```

use std::collections::HashMap;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use chrono::{DateTime, SecondsFormat, Utc};
use scaffold_model::{EmittedTestFile, ProjectModel, ScenarioSpec, TestPlanUnit};
use serde::Serialize;
use tracing::{debug, info};
use ulid::Ulid;

use crate::diagnostics::Diagnostics;
use crate::error::ReportError;
use crate::stage::Stage;

/// Report file name
pub const REPORT_FILE: &str = "REPORT.md";
/// Project model export
pub const ANALYSIS_FILE: &str = "analysis.json";
/// Plan export
pub const PLAN_FILE: &str = "plan.json";

/// Identity and timing of one run
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    /// Unique run id
    pub run_id: Ulid,
    /// Repository reference as given
    pub source: String,
    /// Last completed stage
    pub stage: Stage,
    /// When the run started
    pub started_at: DateTime<Utc>,
    /// When the report was rendered
    pub finished_at: DateTime<Utc>,
    /// Languages test files were emitted for
    pub emitted: Vec<String>,
    /// Requested targets that have no emitter
    pub unsupported: Vec<String>,
    /// Fatal error that ended the run early
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<String>,
}

/// Everything a report is rendered from
#[derive(Debug, Clone, Copy)]
pub struct ReportInput<'a> {
    /// Run identity
    pub run: &'a RunSummary,
    /// Aggregated project
    pub model: &'a ProjectModel,
    /// Planned units
    pub units: &'a [TestPlanUnit],
    /// Rendered test files
    pub files: &'a [EmittedTestFile],
    /// Recorded degradations
    pub diagnostics: &'a Diagnostics,
}

/// Writes test files and the run report
#[derive(Debug, Clone)]
pub struct ReportWriter {
    output_dir: PathBuf,
}

impl ReportWriter {
    /// Writer rooted at `output_dir`
    #[must_use]
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    /// Output directory
    #[inline]
    #[must_use]
    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Where a rendered file lands
    #[must_use]
    pub fn test_file_path(&self, file: &EmittedTestFile) -> PathBuf {
        self.output_dir.join(file.language.as_str()).join(&file.path)
    }

    /// Write rendered test files, returning their paths
    ///
    /// # Errors
    /// [`ReportError::Io`] on the first file that cannot be written
    pub async fn write_tests(&self, files: &[EmittedTestFile]) -> Result<Vec<PathBuf>, ReportError> {
        let mut written = Vec::with_capacity(files.len());
        for file in files {
            let path = self.test_file_path(file);
            write_text(&path, &file.source).await?;
            debug!(path = %path.display(), "test file written");
            written.push(path);
        }
        Ok(written)
    }

    /// Write the JSON exports and `REPORT.md`, returning the report path.
    /// `plan.json` is only written once planning completed.
    ///
    /// # Errors
    /// [`ReportError`] when serialization or a write fails
    pub async fn write_report(&self, input: ReportInput<'_>) -> Result<PathBuf, ReportError> {
        let analysis = serde_json::to_string_pretty(input.model)?;
        write_text(&self.output_dir.join(ANALYSIS_FILE), &analysis).await?;
        if input.run.stage >= Stage::Planned {
            let plan = serde_json::to_string_pretty(input.units)?;
            write_text(&self.output_dir.join(PLAN_FILE), &plan).await?;
        }

        let path = self.output_dir.join(REPORT_FILE);
        write_text(&path, &render_report(&input, |file| self.test_file_path(file))).await?;
        info!(path = %path.display(), files = input.files.len(), "report written");
        Ok(path)
    }
}

async fn write_text(path: &Path, text: &str) -> Result<(), ReportError> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await.map_err(ReportError::io(parent))?;
    }
    tokio::fs::write(path, text).await.map_err(ReportError::io(path))
}

fn cell(text: &str) -> String {
    text.replace('|', "\\|").replace(['\n', '\r'], " ")
}

fn timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Secs, true)
}

fn or_none(items: &[String]) -> String {
    if items.is_empty() {
        "none".to_string()
    } else {
        items.join(", ")
    }
}

/// Render `REPORT.md`
///
/// `locate` maps a rendered file to the path shown in the traceability table.
#[must_use]
pub fn render_report(input: &ReportInput<'_>, locate: impl Fn(&EmittedTestFile) -> PathBuf) -> String {
    let mut out = String::new();
    summary_section(&mut out, input.run);
    statistics_section(&mut out, input.model, input.units, input.files);
    insights_section(&mut out, input.model);
    findings_section(&mut out, input.model);
    traceability_section(&mut out, input.units, input.files, locate);
    diagnostics_section(&mut out, input.diagnostics);
    out
}

fn summary_section(out: &mut String, run: &RunSummary) {
    let _ = writeln!(out, "# Test Scaffold Report\n");
    let _ = writeln!(out, "## Run Summary\n");
    let _ = writeln!(out, "| Field | Value |");
    let _ = writeln!(out, "|-------|-------|");
    let _ = writeln!(out, "| Run | `{}` |", run.run_id);
    let _ = writeln!(out, "| Source | `{}` |", cell(&run.source));
    let _ = writeln!(out, "| Stage reached | {} |", run.stage);
    let _ = writeln!(out, "| Started | {} |", timestamp(run.started_at));
    let _ = writeln!(out, "| Finished | {} |", timestamp(run.finished_at));
    let _ = writeln!(out, "| Emitted | {} |", or_none(&run.emitted));
    let _ = writeln!(out, "| Unsupported targets | {} |", or_none(&run.unsupported));
    if let Some(failure) = &run.failure {
        let _ = writeln!(out, "| Failure | {} |", cell(failure));
    }
    out.push('\n');
}

fn statistics_section(out: &mut String, model: &ProjectModel, units: &[TestPlanUnit], files: &[EmittedTestFile]) {
    let stats = &model.insights().stats;
    let scenarios: usize = units.iter().map(|u| u.scenarios.len()).sum();
    let _ = writeln!(out, "## Statistics\n");
    let _ = writeln!(out, "| Metric | Count |");
    let _ = writeln!(out, "|--------|-------|");
    let _ = writeln!(out, "| Files analyzed | {} |", stats.files);
    let _ = writeln!(out, "| Parse failures | {} |", stats.parse_failures);
    let _ = writeln!(out, "| Classes | {} |", stats.classes);
    let _ = writeln!(out, "| Functions | {} |", stats.functions);
    let _ = writeln!(out, "| Methods | {} |", stats.methods);
    let _ = writeln!(out, "| Imports | {} |", stats.imports);
    let _ = writeln!(out, "| Inheritance relationships | {} |", stats.inheritance_relationships);
    let _ = writeln!(out, "| Public symbols | {} |", model.public_surface().len());
    let _ = writeln!(out, "| Risk findings | {} |", model.findings().len());
    let _ = writeln!(out, "| Plan units | {} |", units.len());
    let _ = writeln!(out, "| Scenarios | {scenarios} |");
    let _ = writeln!(out, "| Test files | {} |", files.len());
    for (language, count) in &stats.languages {
        let _ = writeln!(out, "| {language} files | {count} |");
    }
    out.push('\n');
}

fn insights_section(out: &mut String, model: &ProjectModel) {
    let insights = model.insights();
    let _ = writeln!(out, "## Insights\n");
    let inherits = &model.graph().inherits;
    if insights.central_modules.is_empty() && insights.cycles.is_empty() && insights.notes.is_empty() && inherits.is_empty()
    {
        let _ = writeln!(out, "No structural observations.\n");
        return;
    }
    if !insights.central_modules.is_empty() {
        let _ = writeln!(out, "Most imported modules:\n");
        for central in &insights.central_modules {
            let _ = writeln!(out, "- `{}` ({} importers)", central.module, central.importers);
        }
        out.push('\n');
    }
    if !insights.cycles.is_empty() {
        let _ = writeln!(out, "Import cycles:\n");
        for cycle in &insights.cycles {
            let _ = writeln!(out, "- {}", cycle.join(" -> "));
        }
        out.push('\n');
    }
    if !inherits.is_empty() {
        let _ = writeln!(out, "Inheritance:\n");
        for edge in inherits {
            let _ = writeln!(out, "- `{}` extends `{}`", edge.class, edge.base);
        }
        out.push('\n');
    }
    for note in &insights.notes {
        let _ = writeln!(out, "- {note}");
    }
    if !insights.notes.is_empty() {
        out.push('\n');
    }
}

fn findings_section(out: &mut String, model: &ProjectModel) {
    let _ = writeln!(out, "## Risk Findings\n");
    if model.findings().is_empty() {
        let _ = writeln!(out, "No risk findings.\n");
        return;
    }
    let _ = writeln!(out, "| Symbol | Category | Confidence | Rationale |");
    let _ = writeln!(out, "|--------|----------|------------|-----------|");
    for finding in model.findings() {
        let _ = writeln!(
            out,
            "| `{}` | {} | {} | {} |",
            finding.symbol,
            finding.category,
            finding.confidence,
            cell(&finding.rationale)
        );
    }
    out.push('\n');
}

fn traceability_section(
    out: &mut String,
    units: &[TestPlanUnit],
    files: &[EmittedTestFile],
    locate: impl Fn(&EmittedTestFile) -> PathBuf,
) {
    let mut scenarios: HashMap<(&Path, &str), (&TestPlanUnit, &ScenarioSpec)> = HashMap::new();
    for unit in units {
        for scenario in &unit.scenarios {
            scenarios.insert((unit.source.path.as_path(), scenario.name.as_str()), (unit, scenario));
        }
    }

    let _ = writeln!(out, "## Traceability\n");
    if files.is_empty() {
        let _ = writeln!(out, "No test files were emitted.\n");
        return;
    }
    let _ = writeln!(out, "| Scenario | Test file | Symbol | Finding | Confidence |");
    let _ = writeln!(out, "|----------|-----------|--------|---------|------------|");
    for file in files {
        let shown = locate(file);
        for (name, lines) in &file.scenarios {
            let Some((unit, scenario)) = scenarios.get(&(file.origin.as_path(), name.as_str())) else {
                continue;
            };
            let (finding, confidence) = scenario.finding.as_ref().map_or_else(
                || (scenario.intent.to_string(), "-".to_string()),
                |f| (format!("{}: {}", f.category, cell(&f.rationale)), f.confidence.to_string()),
            );
            let _ = writeln!(
                out,
                "| `{name}` | `{}:{lines}` | `{}` | {finding} | {confidence} |",
                shown.display(),
                unit.target
            );
        }
    }
    out.push('\n');
}

fn diagnostics_section(out: &mut String, diagnostics: &Diagnostics) {
    let _ = writeln!(out, "## Diagnostics\n");
    if diagnostics.is_empty() {
        let _ = writeln!(out, "No degradations were recorded.");
        return;
    }
    let _ = writeln!(out, "| Severity | Kind | Stage | Location | Message |");
    let _ = writeln!(out, "|----------|------|-------|----------|---------|");
    for diagnostic in diagnostics.iter() {
        let location = match (&diagnostic.path, &diagnostic.symbol) {
            (_, Some(symbol)) => format!("`{symbol}`"),
            (Some(path), None) => format!("`{}`", path.display()),
            (None, None) => "-".to_string(),
        };
        let _ = writeln!(
            out,
            "| {} | {} | {} | {location} | {} |",
            diagnostic.severity,
            diagnostic.kind,
            diagnostic.stage.as_deref().unwrap_or("-"),
            cell(&diagnostic.message)
        );
    }
}

#[cfg(test)]
mod tests {
    use scaffold_analysis::AnalysisAggregator;
    use scaffold_emit::default_emitters;
    use scaffold_model::{Diagnostic, DiagnosticKind, Language};
    use scaffold_planner::ScaffoldPlanner;
    use scaffold_test_utils::checkout_summary;
    use tokio_util::sync::CancellationToken;

    use super::*;

    fn run() -> RunSummary {
        let now = Utc::now();
        RunSummary {
            run_id: Ulid::new(),
            source: "shop".into(),
            stage: Stage::Emitted,
            started_at: now,
            finished_at: now,
            emitted: vec!["python".into()],
            unsupported: vec!["ruby".into()],
            failure: None,
        }
    }

    #[tokio::test]
    async fn report_traces_scenarios_to_findings() {
        let aggregation = AnalysisAggregator::default()
            .aggregate(vec![checkout_summary()], None, &CancellationToken::new())
            .await
            .unwrap();
        let units = ScaffoldPlanner::new().plan(&aggregation.model).unwrap();
        let files = default_emitters().emit(&units, Language::Python).unwrap();
        let mut diagnostics = Diagnostics::new();
        diagnostics.push(Diagnostic::error(DiagnosticKind::UnsupportedLanguage, "no emitter for ruby").in_stage("emit"));

        let out = tempfile::tempdir().unwrap();
        let writer = ReportWriter::new(out.path());
        let written = writer.write_tests(&files).await.unwrap();
        assert_eq!(written.len(), 1);
        assert!(written[0].starts_with(out.path().join("python")));
        assert!(written[0].exists());

        let run = run();
        let report = writer
            .write_report(ReportInput {
                run: &run,
                model: &aggregation.model,
                units: &units,
                files: &files,
                diagnostics: &diagnostics,
            })
            .await
            .unwrap();
        assert!(out.path().join(ANALYSIS_FILE).exists());
        assert!(out.path().join(PLAN_FILE).exists());

        let text = std::fs::read_to_string(report).unwrap();
        assert!(text.contains(&run.run_id.to_string()));
        assert!(text.contains("| Unsupported targets | ruby |"));
        assert!(text.contains("missing-error-handling"));
        let happy = files[0].scenarios.keys().next().unwrap();
        assert!(text.contains(&format!("| `{happy}` |")));
        assert!(text.contains("| error | unsupported-language | emit | - | no emitter for ruby |"));
    }

    #[test]
    fn table_cells_are_escaped() {
        assert_eq!(cell("a | b\nc"), "a \\| b c");
        assert_eq!(or_none(&[]), "none");
    }

    #[tokio::test]
    async fn failed_run_reports_what_it_reached() {
        let aggregation = AnalysisAggregator::default()
            .aggregate(vec![checkout_summary()], None, &CancellationToken::new())
            .await
            .unwrap();
        let mut diagnostics = Diagnostics::new();
        diagnostics.push(Diagnostic::warning(DiagnosticKind::ModelUnavailable, "timed out").in_stage("aggregate"));
        let run = RunSummary {
            stage: Stage::Aggregated,
            emitted: Vec::new(),
            unsupported: Vec::new(),
            failure: Some("run cancelled".into()),
            ..run()
        };

        let out = tempfile::tempdir().unwrap();
        let report = ReportWriter::new(out.path())
            .write_report(ReportInput {
                run: &run,
                model: &aggregation.model,
                units: &[],
                files: &[],
                diagnostics: &diagnostics,
            })
            .await
            .unwrap();

        assert!(out.path().join(ANALYSIS_FILE).exists());
        assert!(!out.path().join(PLAN_FILE).exists());
        let text = std::fs::read_to_string(report).unwrap();
        assert!(text.contains("| Stage reached | aggregated |"));
        assert!(text.contains("| Failure | run cancelled |"));
        assert!(text.contains("| Inheritance relationships | 0 |"));
        assert!(text.contains("No test files were emitted."));
        assert!(text.contains("| warning | model-unavailable | aggregate | - | timed out |"));
    }
}
