//! Heuristic risk rules
//!
//! Each [`Rule`] inspects one public symbol and may produce one finding. The
//! standard set runs in a fixed order so findings for a symbol always come out
//! in the same category order.

use once_cell::sync::Lazy;
use regex::Regex;
use scaffold_model::{
    FileSummary, Injection, Language, ProjectModel, QualifiedName, RiskCategory, RiskFinding, SymbolDescriptor,
    SymbolKind,
};

use crate::graph::ModuleResolver;

static SNAKE_CASE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^_*[a-z][a-z0-9]*(_[a-z0-9]+)*_*$").expect("valid regex"));
static CAMEL_CASE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[_$#]*[a-z][a-zA-Z0-9]*$").expect("valid regex"));
static PASCAL_CASE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^_*[A-Z][a-zA-Z0-9]*$").expect("valid regex"));

/// Rule thresholds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RuleConfig {
    /// Branch count at which a symbol is flagged as complex
    pub high_complexity_threshold: u32,
}

impl Default for RuleConfig {
    fn default() -> Self {
        Self {
            high_complexity_threshold: 10,
        }
    }
}

/// What a rule can see besides the symbol itself
#[derive(Debug, Clone, Copy)]
pub struct RuleContext<'a> {
    /// File declaring the symbol
    pub file: &'a FileSummary,
    /// Every summary, indexed
    pub model: &'a ProjectModel,
    /// Import resolution
    pub resolver: &'a ModuleResolver,
}

impl RuleContext<'_> {
    /// Resolve a bare callee name: same class, then same module, then an imported name
    #[must_use]
    pub fn resolve_call(&self, caller: &QualifiedName, callee: &str) -> Option<QualifiedName> {
        let index = self.model.index();
        if let Some(owner) = caller.owner() {
            let member = owner.child(callee);
            if index.contains(&member) {
                return Some(member);
            }
        }
        if let Some((name, _)) = index.named_in_module(caller.module(), callee).into_iter().next() {
            return Some(name);
        }
        let import = self.file.import_binding(callee)?;
        self.resolver
            .resolve_import(self.file, &import.specifier, &import.bindings)
            .into_iter()
            .find_map(|module| index.named_in_module(&module, callee).into_iter().next())
            .map(|(name, _)| name)
    }

    /// First in-project callee that performs I/O
    #[must_use]
    pub fn io_callee(&self, symbol: &SymbolDescriptor) -> Option<QualifiedName> {
        symbol.calls.iter().find_map(|callee| {
            let resolved = self.resolve_call(&symbol.name, callee)?;
            let target = self.model.symbol(&resolved)?;
            (resolved != symbol.name && target.performs_io()).then_some(resolved)
        })
    }
}

/// One heuristic
pub trait Rule: Send + Sync {
    /// Category of the findings this rule produces
    fn category(&self) -> RiskCategory;

    /// Finding for `symbol`, if the rule applies
    fn evaluate(&self, ctx: &RuleContext<'_>, symbol: &SymbolDescriptor) -> Option<RiskFinding>;
}

/// Fallible work with nothing to catch or declare the failure
#[derive(Debug, Clone, Copy, Default)]
pub struct MissingErrorHandling;

impl Rule for MissingErrorHandling {
    fn category(&self) -> RiskCategory {
        RiskCategory::MissingErrorHandling
    }

    fn evaluate(&self, ctx: &RuleContext<'_>, symbol: &SymbolDescriptor) -> Option<RiskFinding> {
        if !symbol.error_paths.is_empty() || symbol.handles_errors {
            return None;
        }
        let reason = if symbol.performs_io() {
            "performs I/O without handling or declaring failures".to_string()
        } else if let Some(dep) = symbol.dependencies().first() {
            format!("calls {}.{} without handling its failure", dep.name, dep.member)
        } else if let Some(callee) = ctx.io_callee(symbol) {
            format!("calls {callee}, which performs I/O, without handling failures")
        } else {
            return None;
        };
        Some(RiskFinding::heuristic(symbol.name.clone(), self.category(), reason))
    }
}

/// Many decision points
#[derive(Debug, Clone, Copy)]
pub struct HighComplexity {
    threshold: u32,
}

impl HighComplexity {
    /// Flag symbols with at least `threshold` branches
    #[must_use]
    pub fn new(threshold: u32) -> Self {
        Self { threshold }
    }
}

impl Rule for HighComplexity {
    fn category(&self) -> RiskCategory {
        RiskCategory::HighComplexity
    }

    fn evaluate(&self, _ctx: &RuleContext<'_>, symbol: &SymbolDescriptor) -> Option<RiskFinding> {
        (symbol.branch_count >= self.threshold).then(|| {
            RiskFinding::heuristic(
                symbol.name.clone(),
                self.category(),
                format!("{} decision points (threshold {})", symbol.branch_count, self.threshold),
            )
        })
    }
}

/// Raises on a guarded branch, or declares what it throws
#[derive(Debug, Clone, Copy, Default)]
pub struct UntestedBranch;

impl Rule for UntestedBranch {
    fn category(&self) -> RiskCategory {
        RiskCategory::UntestedBranch
    }

    fn evaluate(&self, _ctx: &RuleContext<'_>, symbol: &SymbolDescriptor) -> Option<RiskFinding> {
        let raised = symbol.error_paths.iter().find(|p| !p.declared);
        let declared = symbol.error_paths.iter().find(|p| p.declared);
        let path = match (raised, declared) {
            (Some(raised), _) if symbol.branch_count > 0 => raised,
            (_, Some(declared)) => declared,
            _ => return None,
        };
        let error_type = path.error_type.clone();
        let rationale = match (&error_type, path.declared) {
            (Some(ty), false) => format!("raises {ty} on a branch"),
            (Some(ty), true) => format!("declares {ty}"),
            (None, _) => "raises on a branch".to_string(),
        };
        Some(RiskFinding::heuristic(symbol.name.clone(), self.category(), rationale).with_error_type(error_type))
    }
}

/// Calls through a module outside the project
#[derive(Debug, Clone, Copy, Default)]
pub struct ExternalDependency;

impl Rule for ExternalDependency {
    fn category(&self) -> RiskCategory {
        RiskCategory::ExternalDependency
    }

    fn evaluate(&self, ctx: &RuleContext<'_>, symbol: &SymbolDescriptor) -> Option<RiskFinding> {
        symbol.dependencies().into_iter().find_map(|dep| {
            let Injection::Module { specifier } = &dep.injection else {
                return None;
            };
            let in_project = ctx.resolver.resolve(ctx.file, specifier).is_some();
            (!in_project).then(|| {
                RiskFinding::heuristic(
                    symbol.name.clone(),
                    self.category(),
                    format!("calls {}.{} from external module {specifier}", dep.name, dep.member),
                )
            })
        })
    }
}

/// Name breaks the language convention
#[derive(Debug, Clone, Copy, Default)]
pub struct NamingInconsistency;

impl NamingInconsistency {
    fn convention(language: Language, kind: SymbolKind) -> (&'static Lazy<Regex>, &'static str) {
        match (kind, language) {
            (SymbolKind::Class, _) => (&PASCAL_CASE, "PascalCase"),
            (_, Language::Python) => (&SNAKE_CASE, "snake_case"),
            _ => (&CAMEL_CASE, "camelCase"),
        }
    }
}

impl Rule for NamingInconsistency {
    fn category(&self) -> RiskCategory {
        RiskCategory::NamingInconsistency
    }

    fn evaluate(&self, ctx: &RuleContext<'_>, symbol: &SymbolDescriptor) -> Option<RiskFinding> {
        let name = symbol.name.name();
        if name.starts_with("__") && name.ends_with("__") {
            return None;
        }
        let (pattern, label) = Self::convention(ctx.file.language, symbol.kind);
        (!pattern.is_match(name)).then(|| {
            RiskFinding::heuristic(
                symbol.name.clone(),
                self.category(),
                format!("{} `{name}` is not {label}", symbol.kind),
            )
        })
    }
}

/// Ordered rule set
pub struct RuleSet {
    rules: Vec<Box<dyn Rule>>,
}

impl std::fmt::Debug for RuleSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let categories: Vec<RiskCategory> = self.rules.iter().map(|r| r.category()).collect();
        f.debug_struct("RuleSet").field("rules", &categories).finish()
    }
}

impl Default for RuleSet {
    fn default() -> Self {
        Self::standard(&RuleConfig::default())
    }
}

impl RuleSet {
    /// Empty set
    #[must_use]
    pub fn new() -> Self {
        Self { rules: Vec::new() }
    }

    /// The five standard rules in evaluation order
    #[must_use]
    pub fn standard(config: &RuleConfig) -> Self {
        let mut set = Self::new();
        set.push(MissingErrorHandling);
        set.push(HighComplexity::new(config.high_complexity_threshold));
        set.push(UntestedBranch);
        set.push(ExternalDependency);
        set.push(NamingInconsistency);
        set
    }

    /// Append a rule; it runs after those already present
    pub fn push<R: Rule + 'static>(&mut self, rule: R) {
        self.rules.push(Box::new(rule));
    }

    /// Every finding for `symbol`, in rule order
    #[must_use]
    pub fn evaluate(&self, ctx: &RuleContext<'_>, symbol: &SymbolDescriptor) -> Vec<RiskFinding> {
        self.rules.iter().filter_map(|rule| rule.evaluate(ctx, symbol)).collect()
    }
}

#[cfg(test)]
mod tests {
    use scaffold_model::{ErrorPath, Import, SideEffect};
    use scaffold_test_utils::{argument_call, function, method, module_call, summary};

    use super::*;

    fn run(files: Vec<FileSummary>, target: &str) -> Vec<RiskFinding> {
        let model = ProjectModel::from_files(files);
        let resolver = ModuleResolver::new(model.files());
        let name: QualifiedName = target.parse().unwrap();
        let (file, symbol) = model.resolve(&name).unwrap();
        let ctx = RuleContext {
            file,
            model: &model,
            resolver: &resolver,
        };
        RuleSet::default().evaluate(&ctx, symbol)
    }

    fn categories(findings: &[RiskFinding]) -> Vec<RiskCategory> {
        findings.iter().map(|f| f.category).collect()
    }

    #[test]
    fn pure_function_has_no_findings() {
        let file = summary("calc.py", Language::Python).with_symbol(function("calc", "add", &["a", "b"]).returning());
        assert!(run(vec![file], "calc:add").is_empty());
    }

    #[test]
    fn unguarded_dependency_call() {
        let findings = run(vec![scaffold_test_utils::checkout_summary()], "shop:checkout");
        assert_eq!(categories(&findings), vec![RiskCategory::MissingErrorHandling]);
        assert!(findings[0].rationale.contains("paymentClient.charge"));
    }

    #[test]
    fn handled_errors_suppress_missing_handling() {
        let mut symbol = function("shop", "checkout", &["client"]).with_side_effect(argument_call("client", "pay", 0));
        symbol.handles_errors = true;
        let file = summary("shop.py", Language::Python).with_symbol(symbol);
        assert!(run(vec![file], "shop:checkout").is_empty());
    }

    #[test]
    fn transitive_io_through_in_project_call() {
        let mut loader = function("store", "load", &["path"]);
        loader.side_effects.push(SideEffect::PerformsIo { call: "open".into() });
        loader.handles_errors = true;
        let mut caller = function("api", "fetch", &["path"]);
        caller.calls.push("load".into());
        let files = vec![
            summary("store.py", Language::Python).with_symbol(loader),
            summary("api.py", Language::Python)
                .with_import(Import::new("store", ["load"]))
                .with_symbol(caller),
        ];
        let findings = run(files, "api:fetch");
        assert_eq!(categories(&findings), vec![RiskCategory::MissingErrorHandling]);
        assert!(findings[0].rationale.contains("store:load"));
    }

    #[test]
    fn same_class_calls_resolve_first() {
        let mut io = method("svc", "Service", "write", &[]);
        io.side_effects.push(SideEffect::PerformsIo { call: "open".into() });
        let mut save = method("svc", "Service", "save", &[]);
        save.calls.push("write".into());
        let file = summary("svc.py", Language::Python)
            .with_symbol(scaffold_test_utils::class("svc", "Service", &[]))
            .with_symbol(io)
            .with_symbol(save);
        let findings = run(vec![file], "svc:Service.save");
        assert!(findings[0].rationale.contains("svc:Service.write"));
    }

    #[test]
    fn complexity_threshold_is_inclusive() {
        let file = summary("calc.py", Language::Python)
            .with_symbol(function("calc", "nine", &[]).with_branches(9))
            .with_symbol(function("calc", "ten", &[]).with_branches(10));
        assert!(run(vec![file.clone()], "calc:nine").is_empty());
        assert_eq!(categories(&run(vec![file], "calc:ten")), vec![RiskCategory::HighComplexity]);
    }

    #[test]
    fn raising_branch_carries_error_type() {
        let symbol = function("users", "add_user", &["name"])
            .with_branches(1)
            .with_error_path(ErrorPath::raised(Some("ValueError".into())));
        let file = summary("users.py", Language::Python).with_symbol(symbol);
        let findings = run(vec![file], "users:add_user");
        assert_eq!(categories(&findings), vec![RiskCategory::UntestedBranch]);
        assert_eq!(findings[0].error_type.as_deref(), Some("ValueError"));
    }

    #[test]
    fn only_external_modules_count() {
        let external = function("api", "rates", &["base"]).with_side_effect(module_call("requests", "get", "requests"));
        let internal = function("api", "store", &["item"]).with_side_effect(module_call("db", "save", "db"));
        let files = vec![
            summary("db.py", Language::Python),
            summary("api.py", Language::Python).with_symbol(external).with_symbol(internal),
        ];
        let ext = run(files.clone(), "api:rates");
        assert_eq!(
            categories(&ext),
            vec![RiskCategory::MissingErrorHandling, RiskCategory::ExternalDependency]
        );
        let int = run(files, "api:store");
        assert_eq!(categories(&int), vec![RiskCategory::MissingErrorHandling]);
    }

    #[test]
    fn argument_dependencies_are_not_external() {
        let findings = run(vec![scaffold_test_utils::checkout_summary()], "shop:checkout");
        assert!(!categories(&findings).contains(&RiskCategory::ExternalDependency));
    }

    #[test]
    fn naming_conventions_per_language() {
        let py = summary("users.py", Language::Python)
            .with_symbol(function("users", "getUser", &[]))
            .with_symbol(function("users", "get_user", &[]))
            .with_symbol(scaffold_test_utils::class("users", "user_store", &[]));
        assert_eq!(categories(&run(vec![py.clone()], "users:getUser")), vec![RiskCategory::NamingInconsistency]);
        assert!(run(vec![py.clone()], "users:get_user").is_empty());
        assert_eq!(categories(&run(vec![py], "users:user_store")), vec![RiskCategory::NamingInconsistency]);

        let js = summary("web/api.js", Language::JavaScript)
            .with_symbol(function("web.api", "get_user", &[]))
            .with_symbol(function("web.api", "getUser", &[]));
        assert_eq!(categories(&run(vec![js.clone()], "web.api:get_user")), vec![RiskCategory::NamingInconsistency]);
        assert!(run(vec![js], "web.api:getUser").is_empty());
    }
}
