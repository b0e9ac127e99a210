//! Adaptation of precedent reasoning paths to a new dilemma.
//!
//! The engine resolves a path's framework once, then runs an ordered chain of
//! [`AdaptationRule`]s. Each rule sees the output of the previous one. A rule
//! that fails is skipped and the chain continues from the state before it.

mod rewrite;
pub mod rules;

pub use rewrite::ArgumentRewriter;
pub use rules::builtin_rules;

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use tracing::{debug, warn};

use casebase::{AuditEvent, Dilemma, Framework, FrameworkRegistry, ReasoningPath};

use crate::types::{panic_message, RuleError};

/// Version of the builtin rule chain order.
pub const RULE_CHAIN_VERSION: &str = "1.0";

/// Audit location for adaptation events.
const LOCATION: &str = "adaptation";

/// Opening of every paragraph a rule appends.
pub(crate) const RULE_PARAGRAPH_PREFIX: &str = "Adaptation (";

/// The argument as reasoned, without rule paragraphs or the provenance note.
pub fn argued_text(argument: &str) -> String {
    argument
        .split("\n\n")
        .filter(|paragraph| {
            let paragraph = paragraph.trim_start();
            !paragraph.starts_with(RULE_PARAGRAPH_PREFIX)
                && !paragraph.starts_with(rewrite::PROVENANCE_PREFIX)
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// What a rule sees besides the path.
#[derive(Debug, Clone, Copy)]
pub struct AdaptationContext<'a> {
    /// The dilemma being reasoned about
    pub dilemma: &'a Dilemma,
    /// The precedent's dilemma the path was written for
    pub original: &'a Dilemma,
    /// The path's resolved framework
    pub framework: &'a Framework,
}

/// A single adaptation axis.
pub trait AdaptationRule: Send + Sync {
    /// Stable rule name.
    fn name(&self) -> &'static str;

    /// Adapt a path. `Ok(None)` means the rule does not apply.
    fn apply(
        &self,
        path: &ReasoningPath,
        ctx: &AdaptationContext<'_>,
    ) -> Result<Option<ReasoningPath>, RuleError>;
}

/// A rule that failed during a chain run.
#[derive(Debug, Clone, PartialEq)]
pub struct RuleFailure {
    pub rule: &'static str,
    pub message: String,
}

/// Full result of adapting one path.
#[derive(Debug, Clone)]
pub struct AdaptationReport {
    /// The adapted path
    pub path: ReasoningPath,
    /// Rules that changed the path, in order
    pub applied: Vec<&'static str>,
    /// Rules that failed and were skipped
    pub failures: Vec<RuleFailure>,
}

/// Runs the rule chain over reasoning paths.
pub struct AdaptationEngine {
    registry: Arc<FrameworkRegistry>,
    rules: Vec<Box<dyn AdaptationRule>>,
    max_rules: usize,
}

impl AdaptationEngine {
    /// Engine with the builtin chain.
    pub fn new(registry: Arc<FrameworkRegistry>) -> Self {
        Self::with_rules(registry, builtin_rules())
    }

    /// Engine with a custom chain.
    pub fn with_rules(
        registry: Arc<FrameworkRegistry>,
        rules: Vec<Box<dyn AdaptationRule>>,
    ) -> Self {
        Self {
            registry,
            rules,
            max_rules: usize::MAX,
        }
    }

    /// Builder: bound the chain length.
    pub fn max_rules(mut self, max_rules: usize) -> Self {
        self.max_rules = max_rules;
        self
    }

    /// Builder: append a rule after the existing chain.
    pub fn add_rule(mut self, rule: Box<dyn AdaptationRule>) -> Self {
        self.rules.push(rule);
        self
    }

    /// Names of the rules that will run, in order.
    pub fn rule_names(&self) -> Vec<&'static str> {
        self.rules
            .iter()
            .take(self.max_rules)
            .map(|r| r.name())
            .collect()
    }

    /// Adapt a path written for `original` to `dilemma`.
    pub fn adapt(
        &self,
        path: &ReasoningPath,
        dilemma: &Dilemma,
        original: &Dilemma,
    ) -> ReasoningPath {
        self.adapt_with_report(path, dilemma, original).path
    }

    /// Adapt a path and report which rules applied or failed.
    pub fn adapt_with_report(
        &self,
        path: &ReasoningPath,
        dilemma: &Dilemma,
        original: &Dilemma,
    ) -> AdaptationReport {
        let mut report = AdaptationReport {
            path: path.clone(),
            applied: Vec::new(),
            failures: Vec::new(),
        };

        if path.framework.trim().is_empty() {
            return report;
        }

        let framework = self.registry.resolve_at(&path.framework, LOCATION);
        let ctx = AdaptationContext {
            dilemma,
            original,
            framework: &framework,
        };

        for rule in self.rules.iter().take(self.max_rules) {
            let outcome = catch_unwind(AssertUnwindSafe(|| rule.apply(&report.path, &ctx)));
            match outcome {
                Ok(Ok(Some(adapted))) => {
                    debug!(rule = rule.name(), path_id = %path.id, "Adaptation rule applied");
                    report.path = adapted;
                    report.applied.push(rule.name());
                }
                Ok(Ok(None)) => {}
                Ok(Err(e)) => {
                    self.record_failure(&mut report, rule.name(), &path.id, e.to_string())
                }
                Err(payload) => self.record_failure(
                    &mut report,
                    rule.name(),
                    &path.id,
                    format!("rule panicked: {}", panic_message(&*payload)),
                ),
            }
        }

        report
    }

    fn record_failure(
        &self,
        report: &mut AdaptationReport,
        rule: &'static str,
        path_id: &str,
        message: String,
    ) {
        warn!(rule, path_id = %path_id, error = %message, "Adaptation rule failed, skipping");
        if let Some(sink) = self.registry.audit_sink() {
            sink.record(
                AuditEvent::failure(rule, LOCATION)
                    .with_context("path_id", path_id)
                    .with_context("error", message.clone()),
            );
        }
        report.failures.push(RuleFailure { rule, message });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use casebase::{AuditEventKind, MemoryAuditLog, Strength, StrengthLevel};

    struct FailingRule;

    impl AdaptationRule for FailingRule {
        fn name(&self) -> &'static str {
            "failing"
        }

        fn apply(
            &self,
            _: &ReasoningPath,
            _: &AdaptationContext<'_>,
        ) -> Result<Option<ReasoningPath>, RuleError> {
            Err(RuleError::InvalidParameter {
                name: "x".to_string(),
                value: "1".to_string(),
                reason: "always fails".to_string(),
            })
        }
    }

    struct PanickingRule;

    impl AdaptationRule for PanickingRule {
        fn name(&self) -> &'static str {
            "panicking"
        }

        fn apply(
            &self,
            _: &ReasoningPath,
            _: &AdaptationContext<'_>,
        ) -> Result<Option<ReasoningPath>, RuleError> {
            panic!("boom")
        }
    }

    fn dilemmas(old: u64, new: u64) -> (Dilemma, Dilemma) {
        (
            Dilemma::new("trolley_problem", "The Trolley Problem")
                .with_parameter("num_people_affected", old, ""),
            Dilemma::new("new", "New").with_parameter("num_people_affected", new, ""),
        )
    }

    fn utilitarian() -> ReasoningPath {
        ReasoningPath::new(
            "u",
            "Utilitarianism",
            "pull_lever",
            StrengthLevel::Moderate,
            "Save more lives.",
        )
    }

    #[test]
    fn test_chain_is_versioned_and_ordered() {
        let engine = AdaptationEngine::new(Arc::new(FrameworkRegistry::with_defaults()));
        assert_eq!(RULE_CHAIN_VERSION, "1.0");
        assert_eq!(engine.rule_names().len(), 10);
        assert_eq!(engine.rule_names()[0], "numberOfPeople");
        assert_eq!(engine.max_rules(3).rule_names().len(), 3);
    }

    #[test]
    fn test_adapt_does_not_mutate_input() {
        let engine = AdaptationEngine::new(Arc::new(FrameworkRegistry::with_defaults()));
        let (orig, new) = dilemmas(5, 20);
        let path = utilitarian();
        let adapted = engine.adapt(&path, &new, &orig);

        assert_eq!(path, utilitarian());
        assert_eq!(adapted.strength, Strength::Level(StrengthLevel::Strong));
    }

    #[test]
    fn test_failures_are_isolated() {
        let log = Arc::new(MemoryAuditLog::new());
        let registry = Arc::new(
            FrameworkRegistry::builder()
                .with_defaults()
                .audit_sink(log.clone())
                .build(),
        );
        let engine = AdaptationEngine::with_rules(
            registry,
            vec![Box::new(FailingRule), Box::new(PanickingRule)],
        )
        .add_rule(Box::new(rules::NumberOfPeopleRule));

        let (orig, new) = dilemmas(5, 20);
        let report = engine.adapt_with_report(&utilitarian(), &new, &orig);

        assert_eq!(report.applied, vec!["numberOfPeople"]);
        assert_eq!(report.failures.len(), 2);
        assert_eq!(report.failures[0].rule, "failing");
        assert!(report.failures[1].message.contains("boom"));
        assert_eq!(report.path.strength, Strength::Level(StrengthLevel::Strong));

        let failures = log.by_kind(AuditEventKind::Failure);
        assert_eq!(failures.len(), 2);
        assert!(failures.iter().all(|e| e.location == "adaptation"));
    }

    #[test]
    fn test_missing_framework_returns_input() {
        let engine = AdaptationEngine::new(Arc::new(FrameworkRegistry::with_defaults()));
        let (orig, new) = dilemmas(5, 20);
        let mut path = utilitarian();
        path.framework = String::new();

        let report = engine.adapt_with_report(&path, &new, &orig);
        assert_eq!(report.path, path);
        assert!(report.applied.is_empty());
    }

    #[test]
    fn test_argued_text_drops_generated_paragraphs() {
        let engine = AdaptationEngine::new(Arc::new(FrameworkRegistry::with_defaults()));
        let (orig, new) = dilemmas(5, 20);
        let adapted = engine.adapt(&utilitarian(), &new, &orig);
        let rewritten = ArgumentRewriter::new().rewrite(&adapted, &orig, &new);

        assert!(rewritten.argument.contains("increased number of people"));
        assert!(rewritten.argument.contains("The Trolley Problem"));
        assert_eq!(argued_text(&rewritten.argument), "Save more lives.");
    }
}
