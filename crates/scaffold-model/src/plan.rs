//! Language-neutral test plans
//!
//! A [`TestPlanUnit`] is the planner's closed output contract: emitters read
//! it and never reach back into the project model.

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::finding::{Confidence, RiskCategory};
use crate::language::Language;
use crate::name::QualifiedName;
use crate::summary::{ExportStyle, Injection, Parameter, SymbolKind};

/// Concrete argument value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "lowercase")]
pub enum Value {
    /// `None` / `null`
    Null,
    /// Boolean
    Bool(bool),
    /// Integer
    Int(i64),
    /// Floating point
    Float(f64),
    /// String
    Text(String),
    /// Ordered collection
    List(Vec<Value>),
    /// Key/value mapping with text keys, in insertion order
    Map(Vec<(String, Value)>),
    /// Mock standing in for the named dependency
    Mock(String),
    /// Placeholder object of the named type
    Stub(String),
}

impl Value {
    /// Whether this value is a mock
    #[inline]
    #[must_use]
    pub fn is_mock(&self) -> bool {
        matches!(self, Value::Mock(_))
    }
}

/// What a scenario sets out to show
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ScenarioIntent {
    /// Canonical inputs
    HappyPath,
    /// A dependency fails
    DependencyFailure,
    /// Boundary inputs for a branchy body
    ComplexInputs,
    /// The raising branch
    GuardBranch,
    /// Interaction with an external module
    ExternalInteraction,
    /// Symbol is reachable under its declared name
    DeclaredName,
}

impl ScenarioIntent {
    /// Scenario intent derived from a finding category
    #[must_use]
    pub fn for_category(category: RiskCategory) -> Self {
        match category {
            RiskCategory::MissingErrorHandling => ScenarioIntent::DependencyFailure,
            RiskCategory::HighComplexity => ScenarioIntent::ComplexInputs,
            RiskCategory::UntestedBranch => ScenarioIntent::GuardBranch,
            RiskCategory::ExternalDependency => ScenarioIntent::ExternalInteraction,
            RiskCategory::NamingInconsistency => ScenarioIntent::DeclaredName,
        }
    }

    /// Snake-case suffix used in scenario names
    #[must_use]
    pub fn suffix(&self) -> &'static str {
        match self {
            ScenarioIntent::HappyPath => "happy_path",
            ScenarioIntent::DependencyFailure => "dependency_failure",
            ScenarioIntent::ComplexInputs => "complex_inputs",
            ScenarioIntent::GuardBranch => "guard_branch",
            ScenarioIntent::ExternalInteraction => "external_interaction",
            ScenarioIntent::DeclaredName => "declared_name",
        }
    }
}

impl fmt::Display for ScenarioIntent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.suffix().replace('_', "-"))
    }
}

/// Kind of expected outcome
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OutcomeKind {
    /// The call returns
    ReturnValue,
    /// The call raises/throws
    RaisedError,
    /// The receiver's state changes
    StateMutation,
    /// A mocked dependency is called
    ExternalCall,
}

impl fmt::Display for OutcomeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            OutcomeKind::ReturnValue => "return-value",
            OutcomeKind::RaisedError => "raised-error",
            OutcomeKind::StateMutation => "state-mutation",
            OutcomeKind::ExternalCall => "external-call",
        })
    }
}

/// Expected outcome of the act step
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpectedOutcome {
    /// Outcome kind
    pub kind: OutcomeKind,
    /// For return values: whether a value (rather than nothing) is expected
    #[serde(default)]
    pub returns_value: bool,
    /// For raised errors: the error type, when known
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_type: Option<String>,
    /// For external calls: dependency and member expected to be called
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interaction: Option<(String, String)>,
}

impl ExpectedOutcome {
    /// Expect a return (with or without a value)
    #[must_use]
    pub fn returns(returns_value: bool) -> Self {
        Self {
            kind: OutcomeKind::ReturnValue,
            returns_value,
            error_type: None,
            interaction: None,
        }
    }

    /// Expect an error
    #[must_use]
    pub fn raises(error_type: Option<String>) -> Self {
        Self {
            kind: OutcomeKind::RaisedError,
            returns_value: false,
            error_type,
            interaction: None,
        }
    }

    /// Expect the receiver's state to change
    #[must_use]
    pub fn mutates() -> Self {
        Self {
            kind: OutcomeKind::StateMutation,
            ..Self::returns(false)
        }
    }

    /// Expect `dependency.member` to be called
    #[must_use]
    pub fn calls(dependency: impl Into<String>, member: impl Into<String>) -> Self {
        Self {
            kind: OutcomeKind::ExternalCall,
            interaction: Some((dependency.into(), member.into())),
            ..Self::returns(false)
        }
    }
}

/// How a mock behaves in a scenario
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MockBehavior {
    /// Returns a default value
    Succeed,
    /// Raises/throws when called
    Fail,
}

/// A dependency that must be substituted in a scenario
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MockSpec {
    /// Dependency binding name
    pub dependency: String,
    /// Member expected to be called
    pub interaction: String,
    /// Arguments passed at the call site
    pub arg_count: usize,
    /// Where the dependency is injected
    pub injection: Injection,
    /// Declared type, if known
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub type_hint: Option<String>,
    /// Static types of the interaction's arguments, where known
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub arg_types: Vec<Option<String>>,
    /// Every member the subject calls on the dependency, `interaction` first
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub members: Vec<String>,
    /// Behaviour in this scenario
    pub behavior: MockBehavior,
}

/// Link from a scenario back to the finding that motivated it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FindingRef {
    /// Finding category
    pub category: RiskCategory,
    /// Finding confidence
    pub confidence: Confidence,
    /// Finding rationale
    pub rationale: String,
}

/// One proposed test case
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioSpec {
    /// Snake-case name, unique within the originating source file
    pub name: String,
    /// Purpose of the scenario
    pub intent: ScenarioIntent,
    /// Motivating finding, absent for the happy path
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finding: Option<FindingRef>,
    /// Argument rows; each row supplies one value per parameter
    pub inputs: Vec<Vec<Value>>,
    /// Substituted dependencies
    #[serde(default)]
    pub mocks: Vec<MockSpec>,
    /// Expected outcome
    pub expected: ExpectedOutcome,
}

impl ScenarioSpec {
    /// Mocks set to fail
    pub fn failing_mocks(&self) -> impl Iterator<Item = &MockSpec> {
        self.mocks.iter().filter(|m| m.behavior == MockBehavior::Fail)
    }
}

/// Class instance a method is called on
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Receiver {
    /// Class name
    pub class: String,
    /// Constructor parameters
    pub parameters: Vec<Parameter>,
    /// Constructor arguments
    pub arguments: Vec<Value>,
}

/// The symbol under test, as emitters need to see it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subject {
    /// Function, method or class
    pub kind: SymbolKind,
    /// Symbol's own name
    pub name: String,
    /// Parameters in call order
    pub parameters: Vec<Parameter>,
    /// Receiver for instance methods
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub receiver: Option<Receiver>,
    /// Owning class of a static method
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub static_owner: Option<String>,
    /// Must be awaited
    #[serde(default)]
    pub is_async: bool,
    /// Export style of the top-level binding that exposes it
    #[serde(default)]
    pub export: ExportStyle,
}

impl Subject {
    /// Number of arguments
    #[inline]
    #[must_use]
    pub fn arity(&self) -> usize {
        self.parameters.len()
    }

    /// Top-level name that must be imported to reach the subject
    #[must_use]
    pub fn import_name(&self) -> &str {
        self.receiver
            .as_ref()
            .map(|r| r.class.as_str())
            .or(self.static_owner.as_deref())
            .unwrap_or(&self.name)
    }
}

/// Where the subject is declared
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceRef {
    /// Repository-relative path
    pub path: PathBuf,
    /// Dotted module path
    pub module: String,
    /// Language of the source file
    pub language: Language,
    /// Java package
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    /// Type imports of the declaring file, for test sources that name the
    /// same types (Java)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub imports: Vec<String>,
}

/// All scenarios proposed for one symbol
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestPlanUnit {
    /// Back-reference to the analyzed symbol
    pub target: QualifiedName,
    /// Declaring file
    pub source: SourceRef,
    /// Call shape of the symbol
    pub subject: Subject,
    /// Scenarios, never empty
    pub scenarios: Vec<ScenarioSpec>,
}

impl TestPlanUnit {
    /// Distinct mocks across every scenario, first occurrence wins
    #[must_use]
    pub fn mocks(&self) -> Vec<&MockSpec> {
        let mut seen: Vec<&MockSpec> = Vec::new();
        for mock in self.scenarios.iter().flat_map(|s| &s.mocks) {
            if !seen.iter().any(|m| m.dependency == mock.dependency) {
                seen.push(mock);
            }
        }
        seen
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn value_serialization_is_tagged() {
        let json = serde_json::to_string(&Value::List(vec![Value::Int(42), Value::Mock("db".into())])).unwrap();
        assert_eq!(
            json,
            r#"{"kind":"list","value":[{"kind":"int","value":42},{"kind":"mock","value":"db"}]}"#
        );
    }

    #[test]
    fn intents_follow_categories() {
        assert_eq!(
            ScenarioIntent::for_category(RiskCategory::MissingErrorHandling),
            ScenarioIntent::DependencyFailure
        );
        assert_eq!(ScenarioIntent::GuardBranch.to_string(), "guard-branch");
    }

    #[test]
    fn import_name_prefers_class() {
        let mut subject = Subject {
            kind: SymbolKind::Method,
            name: "pay".into(),
            parameters: vec![],
            receiver: None,
            static_owner: Some("Billing".into()),
            is_async: false,
            export: ExportStyle::None,
        };
        assert_eq!(subject.import_name(), "Billing");
        subject.static_owner = None;
        assert_eq!(subject.import_name(), "pay");
    }
}
