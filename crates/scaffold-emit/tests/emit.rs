//! Emission from planned units across the three frameworks

use pretty_assertions::assert_eq;
use scaffold_emit::{EmitError, EmitterRegistry, JestEmitter, LanguageEmitter, PytestEmitter};
use scaffold_model::{
    Dependency, EmittedTestFile, ErrorPath, ExportStyle, FileSummary, Import, Injection, Language, Parameter,
    ProjectModel, QualifiedName, RiskCategory, RiskFinding, SideEffect, SymbolDescriptor, SymbolKind, TestPlanUnit,
};
use scaffold_planner::ScaffoldPlanner;
use scaffold_test_utils::{
    add_summary, argument_call, checkout_summary, class, function, method, module_call, summary,
};

fn plan(files: Vec<FileSummary>, surface: &[&str], findings: Vec<RiskFinding>) -> Vec<TestPlanUnit> {
    let model = ProjectModel::from_files(files)
        .with_public_surface(surface.iter().map(|s| s.parse().unwrap()).collect())
        .unwrap()
        .with_findings(findings)
        .unwrap();
    ScaffoldPlanner::new().plan(&model).unwrap()
}

fn finding(symbol: &str, category: RiskCategory, rationale: &str) -> RiskFinding {
    RiskFinding::heuristic(symbol.parse::<QualifiedName>().unwrap(), category, rationale)
}

fn billing_summary() -> FileSummary {
    let mut file = summary("src/main/java/com/acme/billing/BillingService.java", Language::Java)
        .with_module("com.acme.billing.BillingService");
    file.namespace = Some("com.acme.billing".to_string());
    let module = file.module.clone();
    let service = SymbolDescriptor::new(SymbolKind::Class, QualifiedName::top_level(&module, "BillingService"))
        .with_parameters([Parameter::new("gateway").with_annotation("PaymentGateway")]);
    let charge = SymbolDescriptor::new(
        SymbolKind::Method,
        QualifiedName::top_level(&module, "BillingService").child("charge"),
    )
    .with_parameters([Parameter::new("amount").with_annotation("long")])
    .returning()
    .with_side_effect(SideEffect::ExternalCall(Dependency {
        name: "gateway".to_string(),
        member: "charge".to_string(),
        arg_count: 1,
        injection: Injection::Attribute,
        type_hint: Some("PaymentGateway".to_string()),
        arg_types: Vec::new(),
    }))
    .with_side_effect(module_call("AuditLog", "record", "com.acme.audit.AuditLog"));
    file.with_symbol(service).with_symbol(charge)
}

fn cart_summary() -> FileSummary {
    let mut checkout = method("src.cart", "Cart", "checkout", &["total"])
        .returning()
        .with_side_effect(module_call("axios", "post", "axios"));
    checkout.is_async = true;
    summary("src/cart.ts", Language::TypeScript)
        .with_symbol(class("src.cart", "Cart", &["store"]).with_export(ExportStyle::EsModule))
        .with_symbol(checkout)
}

fn assert_ranges_cover_scenarios(file: &EmittedTestFile, unit_scenarios: &[&str]) {
    for name in unit_scenarios {
        let text = file
            .scenario_text(name)
            .unwrap_or_else(|| panic!("{name} has no line range"));
        assert!(!text.trim().is_empty());
    }
}

#[test]
fn pure_function_renders_one_parametrized_test() {
    let units = plan(vec![add_summary()], &["calc:add"], Vec::new());
    let files = EmitterRegistry::default().emit(&units, Language::Python).unwrap();

    assert_eq!(files.len(), 1);
    let file = &files[0];
    assert_eq!(file.path.to_str(), Some("tests/test_calc.py"));
    assert_eq!(file.origin.to_str(), Some("calc.py"));
    assert_eq!(file.scenarios.keys().collect::<Vec<_>>(), vec!["add_happy_path"]);
    let text = file.scenario_text("add_happy_path").unwrap();
    assert!(text.contains("@pytest.mark.parametrize(\"a, b\", [(0, 0), (42, 42)])"));
    assert!(text.contains("def test_add_happy_path(a, b):"));
}

#[test]
fn failing_dependency_renders_a_side_effect_and_raises() {
    let units = plan(
        vec![checkout_summary()],
        &["shop:checkout"],
        vec![finding(
            "shop:checkout",
            RiskCategory::MissingErrorHandling,
            "calls paymentClient.charge without handling failures",
        )],
    );
    let file = PytestEmitter.emit_file(&units[0].source, &[&units[0]]);
    let file = match file {
        Ok(file) => file,
        Err(err) => panic!("emission failed: {err}"),
    };

    let happy = file.scenario_text("checkout_happy_path").unwrap();
    assert!(happy.contains("paymentClient = mock.Mock()"));
    assert!(!happy.contains("side_effect"));

    let failure = file.scenario_text("checkout_dependency_failure").unwrap();
    assert!(failure.contains("paymentClient = mock.Mock()"));
    assert!(failure.contains("paymentClient.charge.side_effect = RuntimeError(\"simulated failure\")"));
    assert!(failure.contains("with pytest.raises(Exception):"));
    assert!(failure.contains("checkout(42, paymentClient)"));
}

#[test]
fn unsupported_target_leaves_other_languages_untouched() {
    let mut units = plan(vec![add_summary()], &["calc:add"], Vec::new());
    units.extend(plan(
        vec![billing_summary()],
        &["com.acme.billing.BillingService:BillingService.charge"],
        Vec::new(),
    ));

    let full = EmitterRegistry::default();
    assert_eq!(
        full.emit_target(&units, "ruby"),
        Err(EmitError::UnsupportedLanguage("ruby".to_string()))
    );

    let mut partial = EmitterRegistry::new();
    partial.register(PytestEmitter);
    partial.register(JestEmitter);
    assert!(partial.emit(&units, Language::Java).unwrap_err().is_unsupported());
    assert_eq!(
        partial.emit(&units, Language::Python).unwrap(),
        full.emit(&units, Language::Python).unwrap()
    );
}

#[test]
fn jest_imports_match_the_export_style_and_mock_modules() {
    let units = plan(
        vec![cart_summary()],
        &["src.cart:Cart", "src.cart:Cart.checkout"],
        vec![finding("src.cart:Cart.checkout", RiskCategory::ExternalDependency, "calls axios.post")],
    );
    let files = EmitterRegistry::default().emit(&units, Language::TypeScript).unwrap();
    assert_eq!(files.len(), 1);
    let file = &files[0];

    assert_eq!(file.path.to_str(), Some("__tests__/src/cart.test.ts"));
    assert!(file.source.contains("jest.mock('axios');"));
    assert!(file.source.contains("import { Cart } from '../../src/cart';"));
    assert!(file.source.contains("import * as axios from 'axios';"));
    assert!(file.source.contains("jest.resetAllMocks();"));

    let external = file.scenario_text("cart_checkout_external_interaction").unwrap();
    assert!(external.contains("test('cart_checkout_external_interaction', async () => {"));
    assert!(external.contains("const instance = new Cart("));
    assert!(external.contains("await instance.checkout(42);"));
    assert!(external.contains("expect(axios.post).toHaveBeenCalled();"));

    assert_ranges_cover_scenarios(
        file,
        &["cart_happy_path", "cart_checkout_happy_path", "cart_checkout_external_interaction"],
    );
}

#[test]
fn junit_uses_mockito_for_fields_and_static_collaborators() {
    let charge = "com.acme.billing.BillingService:BillingService.charge";
    let units = plan(
        vec![billing_summary()],
        &["com.acme.billing.BillingService:BillingService", charge],
        vec![finding(charge, RiskCategory::MissingErrorHandling, "gateway failures propagate")],
    );
    let files = EmitterRegistry::default().emit(&units, Language::Java).unwrap();
    let file = &files[0];

    assert_eq!(
        file.path.to_str(),
        Some("src/test/java/com/acme/billing/BillingServiceTest.java")
    );
    assert!(file.source.contains("package com.acme.billing;"));
    assert!(file.source.contains("import com.acme.audit.AuditLog;"));
    assert!(file.source.contains("@ExtendWith(MockitoExtension.class)"));
    assert!(file.source.contains("class BillingServiceTest {"));

    let class_happy = file.scenario_text("billing_service_happy_path").unwrap();
    assert!(class_happy.contains("void billingServiceHappyPath() throws Exception {"));
    assert!(class_happy.contains("var result = new BillingService(mock(PaymentGateway.class));"));

    let happy = file.scenario_text("billing_service_charge_happy_path").unwrap();
    assert!(happy.contains("PaymentGateway gateway = mock(PaymentGateway.class);"));
    assert!(happy.contains("try (MockedStatic<AuditLog> auditLogMock = mockStatic(AuditLog.class)) {"));
    assert!(happy.contains("var instance = new BillingService(gateway);"));
    assert!(happy.contains("var result = instance.charge(0L);"));
    assert!(happy.contains("var result = instance.charge(42L);"));

    let failure = file.scenario_text("billing_service_charge_dependency_failure").unwrap();
    assert!(failure.contains("doThrow(new RuntimeException(\"simulated failure\")).when(gateway).charge(any());"));
    assert!(failure.contains("assertThrows(RuntimeException.class, () -> instance.charge(42L));"));
    assert!(file.source.trim_end().ends_with('}'));
}

/// `Billing(PaymentClient client)` whose `bill(long)` declares `SQLException`
fn payment_summary() -> FileSummary {
    let mut file = summary("src/main/java/com/acme/billing/Billing.java", Language::Java)
        .with_module("com.acme.billing.Billing")
        .with_import(Import::new("com.acme.pay.PaymentClient", ["PaymentClient"]))
        .with_import(Import::new("java.sql.SQLException", ["SQLException"]))
        .with_import(Import::new("com.acme.billing.Invoice", ["Invoice"]))
        .with_import(Import::new("com.acme.pay.Money", ["cents"]).static_member());
    file.namespace = Some("com.acme.billing".to_string());
    let billing = SymbolDescriptor::new(SymbolKind::Class, QualifiedName::top_level(&file.module, "Billing"))
        .with_parameters([Parameter::new("client").with_annotation("PaymentClient")]);
    let bill = SymbolDescriptor::new(
        SymbolKind::Method,
        QualifiedName::top_level(&file.module, "Billing").child("bill"),
    )
    .with_parameters([Parameter::new("amount").with_annotation("long")])
    .with_error_path(ErrorPath::declared("SQLException"))
    .with_side_effect(SideEffect::ExternalCall(Dependency {
        name: "client".to_string(),
        member: "charge".to_string(),
        arg_count: 2,
        injection: Injection::Attribute,
        type_hint: Some("PaymentClient".to_string()),
        arg_types: vec![Some("long".to_string()), Some("String".to_string())],
    }));
    file.with_symbol(billing).with_symbol(bill)
}

#[test]
fn junit_repeats_source_imports_and_types_its_matchers() {
    let bill = "com.acme.billing.Billing:Billing.bill";
    let units = plan(
        vec![payment_summary()],
        &[bill],
        vec![
            finding(bill, RiskCategory::MissingErrorHandling, "client failures propagate"),
            finding(bill, RiskCategory::UntestedBranch, "declares SQLException"),
        ],
    );
    let files = EmitterRegistry::default().emit(&units, Language::Java).unwrap();
    let file = &files[0];

    assert!(file.source.contains("import com.acme.pay.PaymentClient;"));
    assert!(file.source.contains("import java.sql.SQLException;"));
    assert!(!file.source.contains("import com.acme.billing.Invoice;"));
    assert!(!file.source.contains("com.acme.pay.Money"));

    let failure = file.scenario_text("billing_bill_dependency_failure").unwrap();
    assert!(failure.contains("PaymentClient client = mock(PaymentClient.class);"));
    assert!(failure.contains(".when(client).charge(anyLong(), anyString());"));
    let guard = file.scenario_text("billing_bill_guard_branch").unwrap();
    assert!(guard.contains("assertThrows(SQLException.class, () -> instance.bill(0L));"));
}

#[test]
fn jest_mocks_every_member_the_subject_calls() {
    let settle = "src.pay:settle";
    let file = summary("src/pay.js", Language::JavaScript).with_symbol(
        function("src.pay", "settle", &["client", "amount"])
            .with_export(ExportStyle::EsModule)
            .returning()
            .with_side_effect(argument_call("client", "authorize", 0))
            .with_side_effect(argument_call("client", "capture", 0)),
    );
    let units = plan(
        vec![file],
        &[settle],
        vec![finding(settle, RiskCategory::MissingErrorHandling, "client failures propagate")],
    );
    assert_eq!(units[0].mocks().len(), 1);
    let files = EmitterRegistry::default().emit(&units, Language::JavaScript).unwrap();
    let file = &files[0];

    let happy = file.scenario_text("settle_happy_path").unwrap();
    assert!(happy.contains("const client = { authorize: jest.fn(), capture: jest.fn() };"));
    let failure = file.scenario_text("settle_dependency_failure").unwrap();
    assert!(failure.contains(
        "const client = { authorize: jest.fn(() => { throw new Error('simulated failure'); }), capture: jest.fn() };"
    ));
}
