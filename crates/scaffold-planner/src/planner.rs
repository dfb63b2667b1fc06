//! Scenario derivation
//!
//! One [`TestPlanUnit`] per public symbol, in surface order: a happy path,
//! then one scenario per finding on the symbol in findings order. Planning
//! is pure; the same model always yields the same plan.

use scaffold_model::{
    Dependency, ExpectedOutcome, FileSummary, FindingRef, Injection, Language, MockBehavior, MockSpec, ModelError,
    ProjectModel, QualifiedName, Receiver, RiskCategory, RiskFinding, ScenarioIntent, ScenarioSpec, SourceRef,
    Subject, SymbolDescriptor, SymbolKind, TestPlanUnit, Value,
};
use tracing::{debug, info};

use crate::error::{PlanConstructionError, Result};
use crate::naming::ScenarioNamer;
use crate::values::{classify, ValueClass};

/// Error type a failing I/O call raises, per language
#[must_use]
pub fn io_error_type(language: Language) -> &'static str {
    match language {
        Language::Python => "OSError",
        Language::JavaScript | Language::TypeScript => "Error",
        Language::Java => "Exception",
    }
}

/// Rows of argument values for one symbol
#[derive(Debug, Clone)]
struct Rows {
    zero: Vec<Value>,
    representative: Vec<Value>,
    boundary: Vec<Value>,
}

impl Rows {
    fn new(classes: &[ValueClass]) -> Self {
        Self {
            zero: classes.iter().map(ValueClass::zero).collect(),
            representative: classes.iter().map(ValueClass::representative).collect(),
            boundary: classes.iter().map(ValueClass::boundary).collect(),
        }
    }

    fn happy(&self) -> Vec<Vec<Value>> {
        if self.zero == self.representative {
            vec![self.zero.clone()]
        } else {
            vec![self.zero.clone(), self.representative.clone()]
        }
    }
}

/// Builds test plans from a project model
#[derive(Debug, Clone, Copy, Default)]
pub struct ScaffoldPlanner;

impl ScaffoldPlanner {
    /// New planner
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Plan every public symbol of `model`
    ///
    /// # Errors
    /// Returns [`PlanConstructionError::DanglingReference`] when a surface
    /// entry or a method's owning class is missing, and
    /// [`PlanConstructionError::ArityMismatch`] when a planned row does not
    /// fit its subject
    pub fn plan(&self, model: &ProjectModel) -> Result<Vec<TestPlanUnit>> {
        let mut namer = ScenarioNamer::new();
        let mut units = Vec::with_capacity(model.public_surface().len());
        for name in model.public_surface() {
            let unit = self.plan_symbol(model, name, &mut namer)?;
            validate(&unit)?;
            debug!(target = %unit.target, scenarios = unit.scenarios.len(), "unit planned");
            units.push(unit);
        }
        info!(
            units = units.len(),
            scenarios = units.iter().map(|u| u.scenarios.len()).sum::<usize>(),
            "plan built"
        );
        Ok(units)
    }

    fn plan_symbol(
        &self,
        model: &ProjectModel,
        name: &QualifiedName,
        namer: &mut ScenarioNamer,
    ) -> Result<TestPlanUnit> {
        let (file, symbol) = model
            .resolve(name)
            .ok_or_else(|| ModelError::dangling(name.clone(), "public surface"))?;

        let dependencies = symbol.dependencies();
        let classes: Vec<ValueClass> = symbol
            .parameters
            .iter()
            .enumerate()
            .map(|(index, parameter)| {
                let mock = dependencies
                    .iter()
                    .find(|d| d.injection == Injection::Argument { index } || is_named_argument(d, &parameter.name))
                    .map(|d| d.name.as_str());
                classify(parameter, mock)
            })
            .collect();
        let rows = Rows::new(&classes);
        let mocks: Vec<MockSpec> = dependencies.iter().map(|d| mock_spec(d, symbol)).collect();
        let subject = subject(model, symbol)?;

        let owner = name.owner();
        let owner_name = owner.as_ref().map(QualifiedName::name);
        let mut scenario = |intent: ScenarioIntent,
                            finding: Option<&RiskFinding>,
                            inputs: Vec<Vec<Value>>,
                            mocks: Vec<MockSpec>,
                            expected: ExpectedOutcome| ScenarioSpec {
            name: namer.name(&file.path, owner_name, name.name(), intent.suffix()),
            intent,
            finding: finding.map(|f| FindingRef {
                category: f.category,
                confidence: f.confidence,
                rationale: f.rationale.clone(),
            }),
            inputs,
            mocks,
            expected,
        };

        let returns_value = symbol.kind == SymbolKind::Class || symbol.returns_value;
        let happy_expected = if returns_value {
            ExpectedOutcome::returns(true)
        } else if symbol.mutates_state() {
            ExpectedOutcome::mutates()
        } else if let Some(dep) = dependencies.first() {
            ExpectedOutcome::calls(&dep.name, &dep.member)
        } else {
            ExpectedOutcome::returns(false)
        };
        let mut scenarios = vec![scenario(
            ScenarioIntent::HappyPath,
            None,
            rows.happy(),
            mocks.clone(),
            happy_expected,
        )];

        for finding in model.findings_for(name) {
            let intent = ScenarioIntent::for_category(finding.category);
            let (inputs, scenario_mocks, expected) = match finding.category {
                RiskCategory::MissingErrorHandling => {
                    if mocks.is_empty() {
                        (
                            vec![rows.zero.clone()],
                            Vec::new(),
                            ExpectedOutcome::raises(Some(io_error_type(file.language).to_string())),
                        )
                    } else {
                        let mut failing = mocks.clone();
                        failing[0].behavior = MockBehavior::Fail;
                        (vec![rows.representative.clone()], failing, ExpectedOutcome::raises(None))
                    }
                }
                RiskCategory::HighComplexity => (
                    vec![rows.boundary.clone()],
                    mocks.clone(),
                    ExpectedOutcome::returns(returns_value),
                ),
                RiskCategory::UntestedBranch => {
                    let error_type = finding
                        .error_type
                        .clone()
                        .or_else(|| symbol.primary_error_type().map(str::to_string));
                    (vec![rows.zero.clone()], mocks.clone(), ExpectedOutcome::raises(error_type))
                }
                RiskCategory::ExternalDependency => {
                    let target = dependencies
                        .iter()
                        .find(|d| matches!(d.injection, Injection::Module { .. }))
                        .or_else(|| dependencies.first());
                    let expected = target.map_or(ExpectedOutcome::returns(returns_value), |d| {
                        ExpectedOutcome::calls(&d.name, &d.member)
                    });
                    (vec![rows.representative.clone()], mocks.clone(), expected)
                }
                RiskCategory::NamingInconsistency => (
                    vec![rows.representative.clone()],
                    mocks.clone(),
                    ExpectedOutcome::returns(returns_value),
                ),
            };
            scenarios.push(scenario(intent, Some(finding), inputs, scenario_mocks, expected));
        }

        Ok(TestPlanUnit {
            target: name.clone(),
            source: SourceRef {
                path: file.path.clone(),
                module: file.import_module().to_string(),
                language: file.language,
                namespace: file.namespace.clone(),
                imports: carried_imports(file),
            },
            subject,
            scenarios,
        })
    }
}

fn is_named_argument(dependency: &Dependency, parameter: &str) -> bool {
    matches!(dependency.injection, Injection::Argument { .. }) && dependency.name == parameter
}

/// Imports a Java test must repeat to name the types its subject uses
fn carried_imports(file: &FileSummary) -> Vec<String> {
    if file.language != Language::Java {
        return Vec::new();
    }
    file.imports
        .iter()
        .filter(|import| !import.is_static)
        .map(|import| import.specifier.clone())
        .collect()
}

fn mock_spec(dependency: &Dependency, symbol: &SymbolDescriptor) -> MockSpec {
    let type_hint = dependency.type_hint.clone().or_else(|| match dependency.injection {
        Injection::Argument { index } => symbol.parameters.get(index).and_then(|p| p.annotation.clone()),
        _ => None,
    });
    MockSpec {
        dependency: dependency.name.clone(),
        interaction: dependency.member.clone(),
        arg_count: dependency.arg_count,
        arg_types: dependency.arg_types.clone(),
        members: symbol
            .members_called(&dependency.name)
            .into_iter()
            .map(str::to_string)
            .collect(),
        injection: dependency.injection.clone(),
        type_hint,
        behavior: MockBehavior::Succeed,
    }
}

fn subject(model: &ProjectModel, symbol: &SymbolDescriptor) -> Result<Subject> {
    let mut subject = Subject {
        kind: symbol.kind,
        name: symbol.name.name().to_string(),
        parameters: symbol.parameters.clone(),
        receiver: None,
        static_owner: None,
        is_async: symbol.is_async,
        export: symbol.export,
    };
    let Some(owner) = symbol.name.owner() else {
        return Ok(subject);
    };
    let class = model
        .symbol(&owner)
        .ok_or_else(|| ModelError::dangling(owner.clone(), "method owner"))?;
    subject.export = class.export;
    if symbol.is_static {
        subject.static_owner = Some(owner.name().to_string());
    } else {
        subject.receiver = Some(Receiver {
            class: owner.name().to_string(),
            parameters: class.parameters.clone(),
            arguments: class
                .parameters
                .iter()
                .map(|p| classify(p, None).representative())
                .collect(),
        });
    }
    Ok(subject)
}

/// Check every row and the receiver against the subject's arity
///
/// # Errors
/// Returns [`PlanConstructionError::ArityMismatch`] on the first mismatch
pub fn validate(unit: &TestPlanUnit) -> Result<()> {
    let expected = unit.subject.arity();
    for scenario in &unit.scenarios {
        if let Some(row) = scenario.inputs.iter().find(|row| row.len() != expected) {
            return Err(PlanConstructionError::ArityMismatch {
                target: unit.target.clone(),
                scenario: scenario.name.clone(),
                expected,
                found: row.len(),
            });
        }
    }
    if let Some(receiver) = &unit.subject.receiver {
        if receiver.arguments.len() != receiver.parameters.len() {
            return Err(PlanConstructionError::ArityMismatch {
                target: unit.target.clone(),
                scenario: "<receiver>".to_string(),
                expected: receiver.parameters.len(),
                found: receiver.arguments.len(),
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use scaffold_model::{ErrorPath, ExportStyle, OutcomeKind, Parameter};
    use scaffold_test_utils::{class, method, summary};

    use super::*;

    fn planned(model: &ProjectModel) -> Vec<TestPlanUnit> {
        ScaffoldPlanner::new().plan(model).unwrap()
    }

    #[test]
    fn methods_get_a_receiver_built_from_the_constructor() {
        let file = summary("web/service.ts", Language::TypeScript)
            .with_symbol(
                class("web.service", "PaymentService", &[])
                    .with_parameters([Parameter::new("ledger").with_annotation("Ledger")])
                    .with_export(ExportStyle::EsModule),
            )
            .with_symbol(
                method("web.service", "PaymentService", "record", &["amount"])
                    .with_export(ExportStyle::EsModule)
                    .returning(),
            );
        let names = vec![
            "web.service:PaymentService".parse().unwrap(),
            "web.service:PaymentService.record".parse().unwrap(),
        ];
        let model = ProjectModel::from_files([file]).with_public_surface(names).unwrap();
        let units = planned(&model);

        assert_eq!(units[0].scenarios[0].name, "payment_service_happy_path");
        assert_eq!(units[0].scenarios[0].inputs, vec![vec![Value::Stub("Ledger".into())]]);
        assert_eq!(units[0].scenarios[0].expected.kind, OutcomeKind::ReturnValue);

        let receiver = units[1].subject.receiver.as_ref().unwrap();
        assert_eq!(receiver.class, "PaymentService");
        assert_eq!(receiver.arguments, vec![Value::Stub("Ledger".into())]);
        assert_eq!(units[1].subject.export, ExportStyle::EsModule);
        assert_eq!(units[1].scenarios[0].name, "payment_service_record_happy_path");
    }

    #[test]
    fn static_methods_name_their_class() {
        let mut helper = method("util", "Math", "clamp", &["value"]).returning();
        helper.is_static = true;
        let file = summary("util.py", Language::Python)
            .with_symbol(class("util", "Math", &["seed"]))
            .with_symbol(helper);
        let model = ProjectModel::from_files([file])
            .with_public_surface(vec!["util:Math.clamp".parse().unwrap()])
            .unwrap();
        let units = planned(&model);
        assert_eq!(units[0].subject.static_owner.as_deref(), Some("Math"));
        assert!(units[0].subject.receiver.is_none());
    }

    #[test]
    fn orphan_method_is_a_dangling_reference() {
        let file = summary("a.py", Language::Python).with_symbol(method("a", "Gone", "run", &[]));
        let model = ProjectModel::from_files([file])
            .with_public_surface(vec!["a:Gone.run".parse().unwrap()])
            .unwrap();
        let err = ScaffoldPlanner::new().plan(&model).unwrap_err();
        assert!(matches!(err, PlanConstructionError::DanglingReference(_)));
    }

    #[test]
    fn guard_branch_expects_the_declared_error() {
        let file = summary("app/users.py", Language::Python)
            .with_symbol(class("app.users", "UserStore", &[]))
            .with_symbol(
                method("app.users", "UserStore", "add_user", &["name"])
                    .with_branches(1)
                    .with_error_path(ErrorPath::raised(Some("ValueError".into()))),
            );
        let name: QualifiedName = "app.users:UserStore.add_user".parse().unwrap();
        let finding = RiskFinding::heuristic(name.clone(), RiskCategory::UntestedBranch, "raises on a branch");
        let model = ProjectModel::from_files([file])
            .with_public_surface(vec![name])
            .unwrap()
            .with_findings(vec![finding])
            .unwrap();
        let units = planned(&model);
        let guard = &units[0].scenarios[1];
        assert_eq!(guard.name, "user_store_add_user_guard_branch");
        assert_eq!(guard.inputs, vec![vec![Value::Text(String::new())]]);
        assert_eq!(guard.expected, ExpectedOutcome::raises(Some("ValueError".into())));
        assert_eq!(guard.finding.as_ref().unwrap().rationale, "raises on a branch");
    }

    #[test]
    fn io_without_mocks_expects_an_io_error() {
        let file = summary("files.py", Language::Python).with_symbol(
            scaffold_test_utils::function("files", "read_config", &["path"])
                .with_side_effect(scaffold_model::SideEffect::PerformsIo { call: "open".into() })
                .returning(),
        );
        let name: QualifiedName = "files:read_config".parse().unwrap();
        let finding = RiskFinding::heuristic(name.clone(), RiskCategory::MissingErrorHandling, "opens a file");
        let model = ProjectModel::from_files([file])
            .with_public_surface(vec![name])
            .unwrap()
            .with_findings(vec![finding])
            .unwrap();
        let failure = &planned(&model)[0].scenarios[1];
        assert!(failure.mocks.is_empty());
        assert_eq!(failure.inputs, vec![vec![Value::Text(String::new())]]);
        assert_eq!(failure.expected.error_type.as_deref(), Some("OSError"));
    }

    #[test]
    fn validate_rejects_short_rows() {
        let mut unit = planned(
            &ProjectModel::from_files([scaffold_test_utils::add_summary()])
                .with_public_surface(vec!["calc:add".parse().unwrap()])
                .unwrap(),
        )
        .remove(0);
        assert!(validate(&unit).is_ok());
        unit.scenarios[0].inputs.push(vec![Value::Int(1)]);
        assert_eq!(
            validate(&unit),
            Err(PlanConstructionError::ArityMismatch {
                target: "calc:add".parse().unwrap(),
                scenario: "add_happy_path".to_string(),
                expected: 2,
                found: 1,
            })
        );
    }
}
