//! Whole runs over an on-disk fixture project

use std::path::{Path, PathBuf};
use std::sync::Arc;

use pretty_assertions::assert_eq;
use scaffold_analysis::{ModelAdapter, ModelQuery, ModelReply, ModelUnavailable};
use scaffold_core::report::{ANALYSIS_FILE, PLAN_FILE, REPORT_FILE};
use scaffold_core::{ModelConfig, Pipeline, PipelineConfig, RepositorySource, Stage};
use scaffold_emit::{default_emitters, EmitError, LanguageEmitter, PytestEmitter};
use scaffold_model::{DiagnosticKind, EmittedTestFile, Framework, Language, SourceRef, TestPlanUnit};
use scaffold_test_utils::{sample_project, write_project};
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

struct Unreachable;

#[async_trait::async_trait]
impl ModelAdapter for Unreachable {
    async fn query(&self, _query: ModelQuery) -> Result<ModelReply, ModelUnavailable> {
        Err(ModelUnavailable::Transport("connection refused".into()))
    }
}

/// Renders pytest files, then cancels the run
struct CancelAfterRender {
    cancel: CancellationToken,
}

impl LanguageEmitter for CancelAfterRender {
    fn languages(&self) -> &'static [Language] {
        &[Language::Python]
    }

    fn framework(&self) -> Framework {
        Framework::Pytest
    }

    fn test_path(&self, source: &SourceRef) -> PathBuf {
        PytestEmitter.test_path(source)
    }

    fn emit_file(&self, source: &SourceRef, units: &[&TestPlanUnit]) -> Result<EmittedTestFile, EmitError> {
        self.cancel.cancel();
        PytestEmitter.emit_file(source, units)
    }

    fn priority(&self) -> i32 {
        1
    }
}

fn local(dir: &Path) -> RepositorySource {
    RepositorySource::Local(dir.to_path_buf())
}

#[tokio::test]
async fn full_run_writes_tests_exports_and_report() {
    let repo = sample_project();
    let out = tempfile::tempdir().unwrap();
    let pipeline = Pipeline::new(PipelineConfig::default().with_output_dir(out.path()));

    let outcome = pipeline.run(local(repo.path()), &CancellationToken::new()).await.unwrap();

    assert_eq!(outcome.stage, Stage::Reported);
    assert_eq!(outcome.exit_code(), 0);
    assert!(outcome.is_complete());
    assert_eq!(outcome.report_path, out.path().join(REPORT_FILE));
    assert!(out.path().join(ANALYSIS_FILE).exists());
    assert!(out.path().join(PLAN_FILE).exists());
    assert!(out.path().join("python/tests/app/test_calc.py").exists());
    assert!(out.path().join("python/tests/app/test_users.py").exists());
    assert!(out
        .path()
        .join("java/src/test/java/com/acme/billing/InvoiceTest.java")
        .exists());
    assert!(outcome.test_files.iter().all(|p| p.starts_with(out.path())));
    // test files and vendored code are never planned
    assert!(!out.path().join("python/tests/tests").exists());
    assert!(!out.path().join("javascript/__tests__/node_modules").exists());

    let report = std::fs::read_to_string(&outcome.report_path).unwrap();
    assert!(report.contains(&outcome.run_id.to_string()));
    assert!(report.contains("| Stage reached | reported |"));
    assert!(report.contains("## Traceability"));
    assert!(report.contains("`app.calc:add`"));

    let plan: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(out.path().join(PLAN_FILE)).unwrap()).unwrap();
    assert!(plan.as_array().is_some_and(|units| !units.is_empty()));
}

#[tokio::test]
async fn unsupported_target_leaves_other_output_intact() {
    let repo = sample_project();
    let out = tempfile::tempdir().unwrap();
    let config = PipelineConfig::default()
        .with_output_dir(out.path())
        .with_targets(["python", "ruby", "python"]);

    let outcome = Pipeline::new(config)
        .run(local(repo.path()), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(outcome.unsupported, vec!["ruby"]);
    assert_eq!(outcome.exit_code(), 4);
    assert_eq!(outcome.stage, Stage::Reported);
    assert_eq!(outcome.diagnostics.of_kind(DiagnosticKind::UnsupportedLanguage).count(), 1);
    assert!(out.path().join("python/tests/app/test_calc.py").exists());
    assert!(!out.path().join("java").exists());

    let report = std::fs::read_to_string(&outcome.report_path).unwrap();
    assert!(report.contains("| Unsupported targets | ruby |"));
    assert!(report.contains("unsupported-language"));
}

#[tokio::test]
async fn unreachable_model_degrades_to_heuristics() {
    let repo = sample_project();
    let out = tempfile::tempdir().unwrap();
    let pipeline = Pipeline::new(PipelineConfig::default().with_output_dir(out.path()).with_targets(["python"]))
        .with_adapter(Arc::new(Unreachable));

    let outcome = pipeline.run(local(repo.path()), &CancellationToken::new()).await.unwrap();

    assert_eq!(outcome.exit_code(), 0);
    assert!(outcome.diagnostics.of_kind(DiagnosticKind::ModelUnavailable).count() > 0);
    let report = std::fs::read_to_string(&outcome.report_path).unwrap();
    assert!(report.contains("model-unavailable"));
}

#[tokio::test]
async fn configured_model_endpoint_is_queried() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/generate"))
        .respond_with(ResponseTemplate::new(503))
        .expect(1..)
        .mount(&server)
        .await;

    let repo = sample_project();
    let out = tempfile::tempdir().unwrap();
    let config = PipelineConfig::default()
        .with_output_dir(out.path())
        .with_targets(["python"])
        .with_model(ModelConfig {
            id: "codellama".into(),
            endpoint: server.uri(),
            timeout_secs: 5,
        });

    let outcome = Pipeline::new(config)
        .run(local(repo.path()), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(outcome.stage, Stage::Reported);
    assert!(outcome
        .diagnostics
        .of_kind(DiagnosticKind::ModelUnavailable)
        .any(|d| d.message.contains("503")));
}

#[tokio::test]
async fn cancelled_run_stops_before_acquisition() {
    let repo = sample_project();
    let out = tempfile::tempdir().unwrap();
    let cancel = CancellationToken::new();
    cancel.cancel();

    let failure = Pipeline::new(PipelineConfig::default().with_output_dir(out.path()))
        .run(local(repo.path()), &cancel)
        .await
        .unwrap_err();

    assert_eq!(failure.stage, Stage::Pending);
    assert_eq!(failure.exit_code(), 130);
    assert!(failure.error.is_cancelled());
    assert!(!out.path().join(REPORT_FILE).exists());
}

#[tokio::test]
async fn missing_repository_fails_acquisition() {
    let out = tempfile::tempdir().unwrap();
    let failure = Pipeline::new(PipelineConfig::default().with_output_dir(out.path()))
        .run(local(&out.path().join("missing")), &CancellationToken::new())
        .await
        .unwrap_err();

    assert_eq!(failure.stage, Stage::Pending);
    assert_eq!(failure.exit_code(), 2);
}

#[tokio::test]
async fn cancellation_after_planning_still_writes_exports_and_report() {
    let repo = sample_project();
    let out = tempfile::tempdir().unwrap();
    let cancel = CancellationToken::new();
    let mut emitters = default_emitters();
    emitters.register(CancelAfterRender { cancel: cancel.clone() });
    let pipeline = Pipeline::new(PipelineConfig::default().with_output_dir(out.path()).with_targets(["python"]))
        .with_emitters(emitters)
        .with_adapter(Arc::new(Unreachable));

    let failure = pipeline.run(local(repo.path()), &cancel).await.unwrap_err();

    assert_eq!(failure.stage, Stage::Emitted);
    assert_eq!(failure.exit_code(), 130);
    assert!(failure.error.is_cancelled());
    assert_eq!(failure.report_path, Some(out.path().join(REPORT_FILE)));
    assert!(out.path().join(ANALYSIS_FILE).exists());
    assert!(out.path().join(PLAN_FILE).exists());
    assert!(!out.path().join("python").exists());

    let report = std::fs::read_to_string(out.path().join(REPORT_FILE)).unwrap();
    assert!(report.contains("| Stage reached | emitted |"));
    assert!(report.contains("| Failure |"));
    assert!(report.contains("model-unavailable"));
}

#[tokio::test]
async fn same_module_in_two_languages_gets_two_test_files() {
    let repo = write_project(&[
        ("tools/build.py", "def bundle(paths):\n    return list(paths)\n"),
        (
            "tools/build.js",
            "function bundle(files) {\n  return files.length;\n}\nmodule.exports = { bundle };\n",
        ),
    ]);
    let out = tempfile::tempdir().unwrap();
    let outcome = Pipeline::new(PipelineConfig::default().with_output_dir(out.path()))
        .run(local(repo.path()), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(outcome.exit_code(), 0);
    assert_eq!(outcome.diagnostics.of_kind(DiagnosticKind::ShadowedModule).count(), 0);
    let python = std::fs::read_to_string(out.path().join("python/tests/tools/test_build.py")).unwrap();
    assert!(python.contains("from tools.build import bundle"));
    assert!(out.path().join("javascript/__tests__/tools/build.test.js").exists());
}

#[tokio::test]
async fn java_overloads_get_their_own_tests() {
    let repo = write_project(&[(
        "src/main/java/calc/Calc.java",
        "package calc;\n\npublic class Calc {\n    public int add(int a, int b) {\n        return a + b;\n    }\n\n    public int add(int a, int b, int c) {\n        return a + b + c;\n    }\n}\n",
    )]);
    let out = tempfile::tempdir().unwrap();
    let outcome = Pipeline::new(PipelineConfig::default().with_output_dir(out.path()))
        .run(local(repo.path()), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(outcome.exit_code(), 0);
    let test = std::fs::read_to_string(out.path().join("java/src/test/java/calc/CalcTest.java")).unwrap();
    assert!(test.contains("void calcAddHappyPath() throws Exception {"));
    assert!(test.contains("void calcAddHappyPath2() throws Exception {"));
    assert!(test.contains("var result = instance.add(0, 0);"));
    assert!(test.contains("var result = instance.add(0, 0, 0);"));

    let plan = std::fs::read_to_string(out.path().join(PLAN_FILE)).unwrap();
    assert!(plan.contains("\"calc.Calc:Calc.add\""));
    assert!(plan.contains("\"calc.Calc:Calc.add#2\""));
}
