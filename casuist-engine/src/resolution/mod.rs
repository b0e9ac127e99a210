//! Conflict resolution through named strategies.
//!
//! Strategy selection:
//!
//! 1. the caller's requested strategy, else the resolver default (`balance`)
//! 2. an unrecognised name resolves to `fallback`
//! 3. a strategy that errors or yields nothing is replaced by `fallback`
//!
//! Resolving never fails as a whole; skipped conflicts and strategy failures
//! are reported alongside the resolutions.

mod strategies;

pub use strategies::{
    BalanceStrategy, CompromiseStrategy, FallbackStrategy, PluralisticStrategy,
    StakeholderStrategy, BALANCED_ACTION, STAKEHOLDER_TERMS,
};

use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use tracing::{debug, info, warn};

use casebase::{
    AuditEvent, Conflict, Dilemma, FrameworkRegistry, ReasoningPath, Resolution, ResolutionContent,
};

use crate::types::{panic_message, StrategyError};

/// Name of the strategy used when nothing else produces output.
pub const FALLBACK_STRATEGY: &str = "fallback";

/// Default strategy name.
pub const DEFAULT_STRATEGY: &str = "balance";

/// Audit location for resolver events.
const LOCATION: &str = "conflict_resolution";

/// A named way of reconciling two conflicting paths.
pub trait ResolutionStrategy: Send + Sync {
    /// Name under which the strategy is registered.
    fn name(&self) -> &'static str;

    /// Reconcile `a` and `b`, or return `Ok(None)` when the strategy does not apply.
    fn resolve(
        &self,
        conflict: &Conflict,
        a: &ReasoningPath,
        b: &ReasoningPath,
        dilemma: &Dilemma,
    ) -> Result<Option<ResolutionContent>, StrategyError>;
}

/// Per-call resolver options.
#[derive(Debug, Clone, Default)]
pub struct ResolveOptions {
    /// Strategy to use; the resolver default when `None`
    pub strategy: Option<String>,
}

impl ResolveOptions {
    pub fn with_strategy(strategy: impl Into<String>) -> Self {
        Self {
            strategy: Some(strategy.into()),
        }
    }
}

/// A strategy that did not produce a usable resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StrategyFailure {
    pub strategy: String,
    /// Description of the conflict being resolved
    pub conflict: String,
    pub message: String,
}

/// Output of a resolver run.
#[derive(Debug, Clone, Default)]
pub struct ResolutionReport {
    pub resolutions: Vec<Resolution>,
    pub failures: Vec<StrategyFailure>,
    /// Descriptions of conflicts that could not be matched to two paths
    pub skipped: Vec<String>,
}

/// Resolves conflicts into resolutions using registered strategies.
pub struct ConflictResolver {
    registry: Arc<FrameworkRegistry>,
    strategies: HashMap<String, Box<dyn ResolutionStrategy>>,
    default_strategy: String,
}

impl ConflictResolver {
    /// Resolver with the builtin strategies.
    pub fn new(registry: Arc<FrameworkRegistry>) -> Self {
        let mut resolver = Self {
            registry: registry.clone(),
            strategies: HashMap::new(),
            default_strategy: DEFAULT_STRATEGY.to_string(),
        };
        resolver.register_strategy(Box::new(BalanceStrategy));
        resolver.register_strategy(Box::new(StakeholderStrategy::new(registry)));
        resolver.register_strategy(Box::new(CompromiseStrategy));
        resolver.register_strategy(Box::new(PluralisticStrategy));
        resolver.register_strategy(Box::new(FallbackStrategy));
        resolver
    }

    /// Builder: set the default strategy name.
    pub fn with_default_strategy(mut self, name: impl Into<String>) -> Self {
        self.default_strategy = name.into();
        self
    }

    /// Register a strategy, replacing any with the same name.
    pub fn register_strategy(&mut self, strategy: Box<dyn ResolutionStrategy>) {
        self.strategies.insert(strategy.name().to_string(), strategy);
    }

    /// Registered strategy names, sorted.
    pub fn strategy_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.strategies.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Resolve every conflict against the given paths.
    pub fn resolve(
        &self,
        conflicts: &[Conflict],
        paths: &[ReasoningPath],
        dilemma: &Dilemma,
        options: &ResolveOptions,
    ) -> ResolutionReport {
        let mut report = ResolutionReport::default();
        if conflicts.is_empty() || paths.is_empty() {
            return report;
        }

        let requested = options
            .strategy
            .as_deref()
            .unwrap_or(&self.default_strategy);
        let strategy_name = if self.strategies.contains_key(requested) {
            requested
        } else {
            warn!(strategy = %requested, "Unknown resolution strategy, using fallback");
            self.audit(
                AuditEvent::failure(requested, LOCATION).with_context("reason", "unknown strategy"),
            );
            report.failures.push(StrategyFailure {
                strategy: requested.to_string(),
                conflict: String::new(),
                message: "unknown strategy".to_string(),
            });
            FALLBACK_STRATEGY
        };

        for conflict in conflicts {
            let Some((a, b)) = self.match_paths(conflict, paths) else {
                warn!(
                    conflict = %conflict.description,
                    "Conflict does not match two paths, skipping"
                );
                self.audit(
                    AuditEvent::failure("unmatched_conflict", LOCATION)
                        .with_context("conflict", conflict.description.clone()),
                );
                report.skipped.push(conflict.description.clone());
                continue;
            };

            let resolved = self.resolve_one(strategy_name, conflict, a, b, dilemma, &mut report);
            if let Some(content) = resolved {
                report.resolutions.push(Resolution::synthesize(content));
            }
        }

        info!(
            conflicts = conflicts.len(),
            resolutions = report.resolutions.len(),
            failures = report.failures.len(),
            strategy = %strategy_name,
            "Conflict resolution complete"
        );
        report
    }

    /// Run one strategy, falling back when it produces nothing.
    fn resolve_one(
        &self,
        strategy_name: &str,
        conflict: &Conflict,
        a: &ReasoningPath,
        b: &ReasoningPath,
        dilemma: &Dilemma,
        report: &mut ResolutionReport,
    ) -> Option<ResolutionContent> {
        match self.run_strategy(strategy_name, conflict, a, b, dilemma) {
            Ok(Some(content)) => return Some(content),
            Ok(None) => {
                debug!(strategy = %strategy_name, "Strategy produced no resolution");
                report.failures.push(StrategyFailure {
                    strategy: strategy_name.to_string(),
                    conflict: conflict.description.clone(),
                    message: "no resolution produced".to_string(),
                });
            }
            Err(e) => {
                warn!(strategy = %strategy_name, error = %e, "Resolution strategy failed");
                report.failures.push(StrategyFailure {
                    strategy: strategy_name.to_string(),
                    conflict: conflict.description.clone(),
                    message: e.to_string(),
                });
            }
        }

        self.audit(
            AuditEvent::failure(strategy_name, LOCATION)
                .with_context("conflict", conflict.description.clone()),
        );
        if strategy_name == FALLBACK_STRATEGY {
            return None;
        }

        match self.run_strategy(FALLBACK_STRATEGY, conflict, a, b, dilemma) {
            Ok(content) => content,
            Err(e) => {
                warn!(error = %e, "Fallback strategy failed");
                report.failures.push(StrategyFailure {
                    strategy: FALLBACK_STRATEGY.to_string(),
                    conflict: conflict.description.clone(),
                    message: e.to_string(),
                });
                None
            }
        }
    }

    fn run_strategy(
        &self,
        name: &str,
        conflict: &Conflict,
        a: &ReasoningPath,
        b: &ReasoningPath,
        dilemma: &Dilemma,
    ) -> Result<Option<ResolutionContent>, StrategyError> {
        let Some(strategy) = self.strategies.get(name) else {
            return Ok(None);
        };

        catch_unwind(AssertUnwindSafe(|| strategy.resolve(conflict, a, b, dilemma))).unwrap_or_else(
            |payload| {
                Err(StrategyError::InvalidOutput {
                    strategy: name.to_string(),
                    reason: format!("strategy panicked: {}", panic_message(&*payload)),
                })
            },
        )
    }

    /// Find the two paths a conflict refers to: by path id, then by framework id.
    fn match_paths<'p>(
        &self,
        conflict: &Conflict,
        paths: &'p [ReasoningPath],
    ) -> Option<(&'p ReasoningPath, &'p ReasoningPath)> {
        let a = self.find_path(paths, &conflict.path_a, &conflict.framework_a.id, None)?;
        let b = self.find_path(paths, &conflict.path_b, &conflict.framework_b.id, Some(a))?;
        Some((&paths[a], &paths[b]))
    }

    fn find_path(
        &self,
        paths: &[ReasoningPath],
        path_id: &str,
        framework_id: &str,
        exclude: Option<usize>,
    ) -> Option<usize> {
        let candidates = || (0..paths.len()).filter(move |i| Some(*i) != exclude);

        candidates()
            .find(|i| !path_id.is_empty() && paths[*i].id == path_id)
            .or_else(|| {
                candidates().find(|i| {
                    self.registry.resolve_at(&paths[*i].framework, LOCATION).id == framework_id
                })
            })
    }

    fn audit(&self, event: AuditEvent) {
        if let Some(sink) = self.registry.audit_sink() {
            sink.record(event);
        }
    }
}
