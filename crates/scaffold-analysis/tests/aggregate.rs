//! Aggregation over hand-built summaries with a model served over HTTP

use std::time::Duration;

use pretty_assertions::assert_eq;
use scaffold_analysis::{AggregatorConfig, AnalysisAggregator, HttpModelAdapter, ModelAdapter};
use scaffold_model::{
    Confidence, DiagnosticKind, ErrorPath, FileSummary, Import, Language, RiskCategory, SymbolKind, Visibility,
};
use scaffold_test_utils::{add_summary, checkout_summary, class, function, method, module_call, summary};
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{method as http_method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn project() -> Vec<FileSummary> {
    let users = summary("app/users.py", Language::Python)
        .with_import(Import::new(".storage", ["Database"]))
        .with_import(Import::new("requests", ["requests"]))
        .with_symbol(class("app.users", "UserStore", &["db"]))
        .with_symbol(
            method("app.users", "UserStore", "add_user", &["name"])
                .with_branches(1)
                .with_error_path(ErrorPath::raised(Some("ValueError".to_string())))
                .returning(),
        )
        .with_symbol(method("app.users", "UserStore", "_cache", &[]))
        .with_symbol(
            function("app.users", "fetchProfile", &["user_id"])
                .returning()
                .with_side_effect(module_call("requests", "get", "requests")),
        );
    let storage = summary("app/storage.py", Language::Python)
        .with_import(Import::new(".users", ["UserStore"]))
        .with_symbol(class("app.storage", "Database", &[]));
    vec![users, storage, add_summary(), checkout_summary()]
}

#[tokio::test]
async fn aggregates_surface_findings_and_structure() {
    let out = AnalysisAggregator::default()
        .aggregate(project(), None, &CancellationToken::new())
        .await
        .unwrap();
    let model = out.model;

    let surface: Vec<String> = model.public_surface().iter().map(ToString::to_string).collect();
    assert_eq!(
        surface,
        vec![
            "app.users:UserStore",
            "app.users:UserStore.add_user",
            "app.users:fetchProfile",
            "app.storage:Database",
            "calc:add",
            "shop:checkout",
        ]
    );

    let findings: Vec<(String, RiskCategory)> = model
        .findings()
        .iter()
        .map(|f| (f.symbol.to_string(), f.category))
        .collect();
    assert_eq!(
        findings,
        vec![
            ("app.users:UserStore.add_user".to_string(), RiskCategory::UntestedBranch),
            ("app.users:fetchProfile".to_string(), RiskCategory::MissingErrorHandling),
            ("app.users:fetchProfile".to_string(), RiskCategory::ExternalDependency),
            ("app.users:fetchProfile".to_string(), RiskCategory::NamingInconsistency),
            ("shop:checkout".to_string(), RiskCategory::MissingErrorHandling),
        ]
    );
    assert_eq!(model.findings()[0].error_type.as_deref(), Some("ValueError"));
    assert!(model.findings().iter().all(|f| f.confidence == Confidence::Heuristic));

    assert_eq!(model.graph().edges.len(), 2);
    assert_eq!(model.insights().cycles, vec![vec!["app.users".to_string(), "app.storage".to_string()]]);
    assert_eq!(model.insights().stats.files, 4);
    assert!(model.symbol(&"app.users:UserStore".parse().unwrap()).is_some_and(|s| s.kind == SymbolKind::Class));
    assert!(out.diagnostics.is_empty());
}

#[tokio::test]
async fn http_model_enriches_and_tolerates_noise() {
    let server = MockServer::start().await;
    let reply = "Here you go:\n{\"findings\": [\
        {\"symbol\": \"checkout\", \"category\": \"missing_error_handling\", \"rationale\": \"charge may fail\"},\
        {\"symbol\": \"refund\", \"category\": \"untested-branch\"},\
        {\"symbol\": \"checkout\", \"category\": \"flaky\"}]}";
    Mock::given(http_method("POST"))
        .and(path("/api/generate"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({ "response": reply })))
        .mount(&server)
        .await;

    let adapter = HttpModelAdapter::new(server.uri(), "codellama");
    let out = AnalysisAggregator::default()
        .aggregate(
            vec![checkout_summary()],
            Some(&adapter as &dyn ModelAdapter),
            &CancellationToken::new(),
        )
        .await
        .unwrap();

    let findings = out.model.findings();
    assert_eq!(findings.len(), 2);
    assert_eq!(findings[0].confidence, Confidence::Heuristic);
    assert_eq!(findings[1].confidence, Confidence::ModelSuggested);
    assert_eq!(findings[1].rationale, "charge may fail");

    let kinds: Vec<DiagnosticKind> = out.diagnostics.iter().map(|d| d.kind).collect();
    assert_eq!(kinds, vec![DiagnosticKind::UnresolvedSymbol, DiagnosticKind::UnknownCategory]);
}

#[tokio::test]
async fn unreachable_model_keeps_heuristic_output() {
    let server = MockServer::start().await;
    Mock::given(http_method("POST"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(5)))
        .mount(&server)
        .await;

    let aggregator = AnalysisAggregator::new(AggregatorConfig::default().with_model_timeout(Duration::from_millis(200)));
    let adapter = HttpModelAdapter::new(server.uri(), "codellama");
    let with_model = aggregator
        .aggregate(project(), Some(&adapter as &dyn ModelAdapter), &CancellationToken::new())
        .await
        .unwrap();
    let without = aggregator
        .aggregate(project(), None, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(with_model.model.findings(), without.model.findings());
    assert!(with_model
        .diagnostics
        .iter()
        .all(|d| d.kind == DiagnosticKind::ModelUnavailable));
    assert_eq!(with_model.diagnostics.len(), 4);
}

#[tokio::test]
async fn private_classes_hide_their_members() {
    let file = summary("web/api.ts", Language::TypeScript)
        .with_symbol(class("web.api", "Client", &[]).with_visibility(Visibility::Private))
        .with_symbol(method("web.api", "Client", "send", &[]));
    let out = AnalysisAggregator::default()
        .aggregate(vec![file], None, &CancellationToken::new())
        .await
        .unwrap();
    assert!(out.model.public_surface().is_empty());
    assert!(out.model.findings().is_empty());
}
