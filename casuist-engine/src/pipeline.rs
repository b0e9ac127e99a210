//! Pipeline orchestrator.
//!
//! ```text
//! SEARCHING ──► NO_MATCH ──────┐
//!           ├─► PARTIAL_MATCH ─┤
//!           ├─► CLOSE_MATCH ───┼─► RESOLVED
//!           ├─► EXACT_MATCH ───┤
//!           └─► ERROR ─────────┘
//! ```
//!
//! A run scores every precedent, adapts the ones above threshold, detects
//! conflicts between the resulting paths and resolves them. Every failure,
//! panics included, ends as a structured [`PipelineOutcome`].

use chrono::{DateTime, Utc};
use futures::future::join_all;
use futures::FutureExt;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tracing::{debug, info, warn};

use casebase::{
    AuditEvent, Conflict, Dilemma, FrameworkRegistry, Precedent, ReasoningPath, Resolution,
    ResolutionContent,
};

use crate::adaptation::{AdaptationEngine, AdaptationRule, ArgumentRewriter, RuleFailure};
use crate::collaborators::{
    KeywordSimilarity, SimilarityScorer, SyntheticPathGenerator, TemplatePathGenerator,
};
use crate::config::EngineConfig;
use crate::conflict::ConflictDetector;
use crate::resolution::{ConflictResolver, ResolutionStrategy, ResolveOptions};
use crate::types::{panic_message, PipelineError, Result, ScorerError};

/// Audit location for pipeline stage events.
const LOCATION: &str = "pipeline";

/// How closely the best precedents matched the dilemma.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchCase {
    NoMatch,
    PartialMatch,
    CloseMatch,
    ExactMatch,
    Error,
}

impl MatchCase {
    pub fn as_str(&self) -> &'static str {
        match self {
            MatchCase::NoMatch => "no_match",
            MatchCase::PartialMatch => "partial_match",
            MatchCase::CloseMatch => "close_match",
            MatchCase::ExactMatch => "exact_match",
            MatchCase::Error => "error",
        }
    }
}

impl fmt::Display for MatchCase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Run state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Searching,
    Classified(MatchCase),
    Resolved,
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PipelineState::Searching => f.write_str("searching"),
            PipelineState::Classified(case) => write!(f, "classified:{}", case),
            PipelineState::Resolved => f.write_str("resolved"),
        }
    }
}

/// Stage at which a component degraded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Validation,
    Search,
    Adaptation,
    Synthesis,
    Resolution,
    Pipeline,
}

/// A component that failed without failing the run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Degradation {
    pub stage: Stage,
    /// Rule, strategy, precedent or collaborator name
    pub component: String,
    pub message: String,
}

/// A precedent that passed the similarity threshold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrecedentMatch {
    pub precedent_id: String,
    pub title: String,
    pub similarity: f64,
}

/// Per-call overrides of the engine configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineOptions {
    pub similarity_threshold: Option<f64>,
    pub max_results: Option<usize>,
    pub strategy: Option<String>,
}

impl PipelineOptions {
    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.similarity_threshold = Some(threshold);
        self
    }

    pub fn with_max_results(mut self, max_results: usize) -> Self {
        self.max_results = Some(max_results);
        self
    }

    pub fn with_strategy(mut self, strategy: impl Into<String>) -> Self {
        self.strategy = Some(strategy.into());
        self
    }
}

/// Structured result of a pipeline run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineOutcome {
    /// Opaque run identifier
    pub run_id: String,
    /// Opaque start timestamp
    pub started_at: DateTime<Utc>,
    pub match_case: MatchCase,
    pub reasoning_paths: Vec<ReasoningPath>,
    pub conflicts: Vec<Conflict>,
    pub resolutions: Vec<Resolution>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default)]
    pub matches: Vec<PrecedentMatch>,
    #[serde(default)]
    pub degradations: Vec<Degradation>,
}

impl PipelineOutcome {
    fn start() -> Self {
        Self {
            run_id: uuid::Uuid::new_v4().to_string(),
            started_at: Utc::now(),
            match_case: MatchCase::NoMatch,
            reasoning_paths: Vec::new(),
            conflicts: Vec::new(),
            resolutions: Vec::new(),
            error: None,
            matches: Vec::new(),
            degradations: Vec::new(),
        }
    }

    pub fn is_error(&self) -> bool {
        self.match_case == MatchCase::Error
    }

    /// SHA-256 over everything except run id, start time and resolution stamps.
    pub fn fingerprint(&self) -> String {
        #[derive(Serialize)]
        struct Reproducible<'a> {
            match_case: MatchCase,
            reasoning_paths: &'a [ReasoningPath],
            conflicts: &'a [Conflict],
            resolutions: Vec<&'a ResolutionContent>,
            error: &'a Option<String>,
            matches: &'a [PrecedentMatch],
            degradations: &'a [Degradation],
        }

        let reproducible = Reproducible {
            match_case: self.match_case,
            reasoning_paths: &self.reasoning_paths,
            conflicts: &self.conflicts,
            resolutions: self.resolutions.iter().map(|r| &r.content).collect(),
            error: &self.error,
            matches: &self.matches,
            degradations: &self.degradations,
        };
        let bytes = serde_json::to_vec(&reproducible).unwrap_or_default();
        hex::encode(Sha256::digest(&bytes))
    }

    fn degrade(&mut self, stage: Stage, component: impl Into<String>, message: impl Into<String>) {
        let degradation = Degradation {
            stage,
            component: component.into(),
            message: message.into(),
        };
        warn!(
            run_id = %self.run_id,
            stage = ?degradation.stage,
            component = %degradation.component,
            message = %degradation.message,
            "Pipeline component degraded"
        );
        self.degradations.push(degradation);
    }
}

/// Paths adapted from one precedent.
struct Adapted {
    paths: Vec<ReasoningPath>,
    failures: Vec<RuleFailure>,
}

/// Reasoning pipeline over a precedent collection.
pub struct ReasoningPipeline {
    config: EngineConfig,
    registry: Arc<FrameworkRegistry>,
    adaptation: Arc<AdaptationEngine>,
    rewriter: Arc<ArgumentRewriter>,
    detector: ConflictDetector,
    resolver: ConflictResolver,
    scorer: Arc<dyn SimilarityScorer>,
    generator: Arc<dyn SyntheticPathGenerator>,
}

impl ReasoningPipeline {
    /// Pipeline with default config and collaborators.
    pub fn new(registry: Arc<FrameworkRegistry>) -> Self {
        ReasoningPipelineBuilder::new(registry).assemble()
    }

    pub fn builder(registry: Arc<FrameworkRegistry>) -> ReasoningPipelineBuilder {
        ReasoningPipelineBuilder::new(registry)
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn registry(&self) -> &Arc<FrameworkRegistry> {
        &self.registry
    }

    /// Run the pipeline. Never fails; errors surface as [`MatchCase::Error`].
    pub async fn run(
        &self,
        dilemma: &Dilemma,
        precedents: &[Precedent],
        options: &PipelineOptions,
    ) -> PipelineOutcome {
        let mut outcome = PipelineOutcome::start();
        info!(
            run_id = %outcome.run_id,
            dilemma_id = %dilemma.id,
            precedents = precedents.len(),
            "Pipeline run started"
        );

        let result = AssertUnwindSafe(self.execute(dilemma, precedents, options, &mut outcome))
            .catch_unwind()
            .await;

        match result {
            Ok(Ok(())) => {}
            Ok(Err(e)) => self.fail(&mut outcome, e),
            Err(payload) => self.fail(&mut outcome, PipelineError::Panic(panic_message(&*payload))),
        }

        self.enter(&outcome.run_id, PipelineState::Resolved);
        info!(
            run_id = %outcome.run_id,
            match_case = %outcome.match_case,
            paths = outcome.reasoning_paths.len(),
            conflicts = outcome.conflicts.len(),
            resolutions = outcome.resolutions.len(),
            degradations = outcome.degradations.len(),
            "Pipeline run finished"
        );
        outcome
    }

    async fn execute(
        &self,
        dilemma: &Dilemma,
        precedents: &[Precedent],
        options: &PipelineOptions,
        outcome: &mut PipelineOutcome,
    ) -> Result<()> {
        self.enter(&outcome.run_id, PipelineState::Searching);
        dilemma.validate()?;

        let threshold = options
            .similarity_threshold
            .unwrap_or(self.config.search.similarity_threshold)
            .clamp(0.0, 1.0);
        let max_results = options.max_results.unwrap_or(self.config.search.max_results);

        let candidates = self.candidates(precedents, outcome);
        let ranked = self.score(dilemma, &candidates, outcome).await;

        let matched: Vec<(usize, f64)> = ranked
            .iter()
            .copied()
            .filter(|(_, score)| *score >= threshold)
            .take(max_results)
            .collect();
        debug!(
            run_id = %outcome.run_id,
            candidates = candidates.len(),
            matched = matched.len(),
            threshold,
            "Precedent search complete"
        );

        if matched.is_empty() {
            let nearest: Vec<Precedent> = ranked
                .iter()
                .take(max_results)
                .map(|(i, _)| candidates[*i].clone())
                .collect();
            outcome.reasoning_paths = self.synthesize(dilemma, &nearest, outcome).await;
            outcome.match_case = MatchCase::NoMatch;
        } else {
            outcome.matches = matched
                .iter()
                .map(|(i, score)| PrecedentMatch {
                    precedent_id: candidates[*i].id().to_string(),
                    title: candidates[*i].title().to_string(),
                    similarity: *score,
                })
                .collect();

            let paths = self.adapt(dilemma, &candidates, &matched, outcome).await?;
            if paths.is_empty() {
                outcome.degrade(
                    Stage::Adaptation,
                    "adaptation_engine",
                    "Matched precedents yielded no usable paths, using synthetic paths",
                );
                let nearest: Vec<Precedent> =
                    matched.iter().map(|(i, _)| candidates[*i].clone()).collect();
                outcome.reasoning_paths = self.synthesize(dilemma, &nearest, outcome).await;
                outcome.match_case = MatchCase::NoMatch;
            } else {
                outcome.reasoning_paths = paths;
                outcome.match_case = self.classify(&matched);
            }
        }
        self.enter(&outcome.run_id, PipelineState::Classified(outcome.match_case));

        outcome.conflicts = self.detector.detect(&outcome.reasoning_paths);

        let resolve_options = ResolveOptions {
            strategy: options.strategy.clone(),
        };
        let report = self.resolver.resolve(
            &outcome.conflicts,
            &outcome.reasoning_paths,
            dilemma,
            &resolve_options,
        );
        for failure in &report.failures {
            outcome.degrade(Stage::Resolution, failure.strategy.clone(), failure.message.clone());
        }
        for skipped in &report.skipped {
            outcome.degrade(
                Stage::Resolution,
                "conflict_resolver",
                format!("Skipped conflict: {}", skipped),
            );
        }
        outcome.resolutions = report.resolutions;

        Ok(())
    }

    /// Bound the store, skip invalid precedents and drop unusable paths.
    fn candidates(
        &self,
        precedents: &[Precedent],
        outcome: &mut PipelineOutcome,
    ) -> Vec<Precedent> {
        let max = self.config.search.max_precedents;
        if precedents.len() > max {
            outcome.degrade(
                Stage::Search,
                "precedent_store",
                format!(
                    "{} precedents supplied, only the first {} considered",
                    precedents.len(),
                    max
                ),
            );
        }

        let mut candidates = Vec::with_capacity(precedents.len().min(max));
        for precedent in precedents.iter().take(max) {
            if let Err(e) = precedent.dilemma.validate() {
                outcome.degrade(Stage::Validation, precedent.id(), e.to_string());
                continue;
            }
            if precedent.id().trim().is_empty() {
                outcome.degrade(Stage::Validation, precedent.title(), "Precedent has no id");
                continue;
            }

            let mut usable = precedent.clone();
            usable.reasoning_paths.retain(ReasoningPath::is_usable);
            let dropped = precedent.reasoning_paths.len() - usable.reasoning_paths.len();
            if dropped > 0 {
                outcome.degrade(
                    Stage::Validation,
                    precedent.id(),
                    format!("{} unusable reasoning path(s) ignored", dropped),
                );
            }
            candidates.push(usable);
        }
        candidates
    }

    /// Score all candidates, ranked by descending similarity.
    async fn score(
        &self,
        dilemma: &Dilemma,
        candidates: &[Precedent],
        outcome: &mut PipelineOutcome,
    ) -> Vec<(usize, f64)> {
        let text = dilemma.search_text();
        let scores = join_all(candidates.iter().map(|precedent| {
            let text = &text;
            let other = precedent.dilemma.search_text();
            async move { self.scorer.similarity(text, &other).await }
        }))
        .await;

        let mut ranked: Vec<(usize, f64)> = Vec::with_capacity(scores.len());
        for (i, score) in scores.into_iter().enumerate() {
            let score = score.and_then(|s| {
                if (0.0..=1.0).contains(&s) {
                    Ok(s)
                } else {
                    Err(ScorerError::OutOfRange(format!("{} (treated as 0)", s)))
                }
            });
            let score = match score {
                Ok(s) => s,
                Err(e) => {
                    outcome.degrade(Stage::Search, candidates[i].id(), e.to_string());
                    0.0
                }
            };
            ranked.push((i, score));
        }

        // Stable: equal scores keep store order.
        ranked.sort_by(|a, b| b.1.total_cmp(&a.1));
        ranked
    }

    /// Adapt every matched precedent, re-joined in rank order.
    async fn adapt(
        &self,
        dilemma: &Dilemma,
        candidates: &[Precedent],
        matched: &[(usize, f64)],
        outcome: &mut PipelineOutcome,
    ) -> Result<Vec<ReasoningPath>> {
        let rewrite = self.config.adaptation.rewrite_arguments;
        let mut results = Vec::with_capacity(matched.len());

        if self.config.adaptation.parallel {
            let shared = Arc::new(dilemma.clone());
            let handles: Vec<_> = matched
                .iter()
                .map(|(i, similarity)| {
                    let engine = Arc::clone(&self.adaptation);
                    let rewriter = rewrite.then(|| Arc::clone(&self.rewriter));
                    let dilemma = Arc::clone(&shared);
                    let precedent = candidates[*i].clone();
                    let similarity = *similarity;
                    tokio::task::spawn_blocking(move || {
                        adapt_precedent(
                            &engine,
                            rewriter.as_deref(),
                            &dilemma,
                            &precedent,
                            similarity,
                        )
                    })
                })
                .collect();

            for handle in handles {
                let adapted = handle.await.map_err(|e| PipelineError::Join(e.to_string()))?;
                results.push(adapted);
            }
        } else {
            let rewriter = rewrite.then_some(self.rewriter.as_ref());
            for (i, similarity) in matched {
                results.push(adapt_precedent(
                    &self.adaptation,
                    rewriter,
                    dilemma,
                    &candidates[*i],
                    *similarity,
                ));
            }
        }

        let mut paths = Vec::new();
        for adapted in results {
            for failure in adapted.failures {
                outcome.degrade(Stage::Adaptation, failure.rule, failure.message);
            }
            paths.extend(adapted.paths);
        }
        debug!(run_id = %outcome.run_id, paths = paths.len(), "Adaptation complete");
        Ok(paths)
    }

    async fn synthesize(
        &self,
        dilemma: &Dilemma,
        candidates: &[Precedent],
        outcome: &mut PipelineOutcome,
    ) -> Vec<ReasoningPath> {
        let generated = self.generator.generate(dilemma, candidates).await;
        let total = generated.len();
        let paths: Vec<ReasoningPath> = generated
            .into_iter()
            .filter(ReasoningPath::is_usable)
            .map(|mut p| {
                p.is_synthetic = true;
                p
            })
            .collect();
        if paths.len() < total {
            outcome.degrade(
                Stage::Synthesis,
                "synthetic_generator",
                format!("{} unusable synthetic path(s) ignored", total - paths.len()),
            );
        }
        debug!(run_id = %outcome.run_id, paths = paths.len(), "Synthetic paths generated");
        paths
    }

    /// Escalate over matched precedents in rank order.
    fn classify(&self, matched: &[(usize, f64)]) -> MatchCase {
        let search = &self.config.search;
        let mut case = MatchCase::PartialMatch;
        for (_, similarity) in matched {
            if *similarity >= search.exact_match_threshold {
                case = MatchCase::ExactMatch;
            } else if *similarity >= search.close_match_threshold && case != MatchCase::ExactMatch {
                case = MatchCase::CloseMatch;
            }
        }
        case
    }

    fn fail(&self, outcome: &mut PipelineOutcome, error: PipelineError) {
        let message = error.to_string();
        warn!(run_id = %outcome.run_id, error = %message, "Pipeline run failed");
        if self.config.general.audit_enabled {
            if let Some(sink) = self.registry.audit_sink() {
                sink.record(
                    AuditEvent::failure("pipeline", LOCATION)
                        .with_context("run_id", outcome.run_id.clone())
                        .with_context("error", message.clone()),
                );
            }
        }
        outcome.match_case = MatchCase::Error;
        outcome.error = Some(message);
        outcome.reasoning_paths.clear();
        outcome.conflicts.clear();
        outcome.resolutions.clear();
    }

    fn enter(&self, run_id: &str, state: PipelineState) {
        debug!(run_id = %run_id, state = %state, "Pipeline state");
        if self.config.general.audit_enabled {
            if let Some(sink) = self.registry.audit_sink() {
                sink.record(
                    AuditEvent::reference(&state.to_string(), LOCATION)
                        .with_context("run_id", run_id),
                );
            }
        }
    }
}

fn adapt_precedent(
    engine: &AdaptationEngine,
    rewriter: Option<&ArgumentRewriter>,
    dilemma: &Dilemma,
    precedent: &Precedent,
    similarity: f64,
) -> Adapted {
    let mut adapted = Adapted {
        paths: Vec::with_capacity(precedent.reasoning_paths.len()),
        failures: Vec::new(),
    };

    for (index, original) in precedent.reasoning_paths.iter().enumerate() {
        let report = engine.adapt_with_report(original, dilemma, &precedent.dilemma);
        let mut path = match rewriter {
            Some(rewriter) => rewriter.rewrite(&report.path, &precedent.dilemma, dilemma),
            None => report.path,
        };

        let local_id = if original.id.trim().is_empty() {
            format!("path-{}", index + 1)
        } else {
            original.id.clone()
        };
        path.id = format!("{}:{}", precedent.id(), local_id);
        path.relevance = Some(similarity);
        path.source_precedent = Some(precedent.id().to_string());
        path.is_synthetic = false;

        adapted.failures.extend(report.failures);
        adapted.paths.push(path);
    }
    adapted
}

/// Builder for [`ReasoningPipeline`].
pub struct ReasoningPipelineBuilder {
    registry: Arc<FrameworkRegistry>,
    config: EngineConfig,
    scorer: Option<Arc<dyn SimilarityScorer>>,
    generator: Option<Arc<dyn SyntheticPathGenerator>>,
    rewriter: Option<ArgumentRewriter>,
    rules: Option<Vec<Box<dyn AdaptationRule>>>,
    strategies: Vec<Box<dyn ResolutionStrategy>>,
}

impl ReasoningPipelineBuilder {
    pub fn new(registry: Arc<FrameworkRegistry>) -> Self {
        Self {
            registry,
            config: EngineConfig::default(),
            scorer: None,
            generator: None,
            rewriter: None,
            rules: None,
            strategies: Vec::new(),
        }
    }

    pub fn config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn scorer(mut self, scorer: Arc<dyn SimilarityScorer>) -> Self {
        self.scorer = Some(scorer);
        self
    }

    pub fn generator(mut self, generator: Arc<dyn SyntheticPathGenerator>) -> Self {
        self.generator = Some(generator);
        self
    }

    pub fn rewriter(mut self, rewriter: ArgumentRewriter) -> Self {
        self.rewriter = Some(rewriter);
        self
    }

    /// Replace the builtin rule chain.
    pub fn rules(mut self, rules: Vec<Box<dyn AdaptationRule>>) -> Self {
        self.rules = Some(rules);
        self
    }

    /// Register an extra resolution strategy.
    pub fn strategy(mut self, strategy: Box<dyn ResolutionStrategy>) -> Self {
        self.strategies.push(strategy);
        self
    }

    /// Validate the config and build.
    pub fn build(self) -> Result<ReasoningPipeline> {
        self.config.validate().map_err(PipelineError::Config)?;
        Ok(self.assemble())
    }

    fn assemble(self) -> ReasoningPipeline {
        let registry = self.registry;
        let rules = self.rules.unwrap_or_else(crate::adaptation::builtin_rules);
        let adaptation = AdaptationEngine::with_rules(Arc::clone(&registry), rules)
            .max_rules(self.config.adaptation.max_rules);

        let mut resolver = ConflictResolver::new(Arc::clone(&registry))
            .with_default_strategy(self.config.resolution.default_strategy.clone());
        for strategy in self.strategies {
            resolver.register_strategy(strategy);
        }

        ReasoningPipeline {
            detector: ConflictDetector::new(Arc::clone(&registry)),
            resolver,
            adaptation: Arc::new(adaptation),
            rewriter: Arc::new(self.rewriter.unwrap_or_default()),
            scorer: self.scorer.unwrap_or_else(|| Arc::new(KeywordSimilarity)),
            generator: self.generator.unwrap_or_else(|| Arc::new(TemplatePathGenerator)),
            config: self.config,
            registry,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use casebase::{AuditEventKind, MemoryAuditLog, StrengthLevel};

    struct FixedScorer(f64);

    #[async_trait]
    impl SimilarityScorer for FixedScorer {
        async fn similarity(&self, _: &str, _: &str) -> std::result::Result<f64, ScorerError> {
            Ok(self.0)
        }
    }

    struct UnavailableScorer;

    #[async_trait]
    impl SimilarityScorer for UnavailableScorer {
        async fn similarity(&self, _: &str, _: &str) -> std::result::Result<f64, ScorerError> {
            Err(ScorerError::Unavailable("index offline".to_string()))
        }
    }

    struct PanickingScorer;

    #[async_trait]
    impl SimilarityScorer for PanickingScorer {
        async fn similarity(&self, _: &str, _: &str) -> std::result::Result<f64, ScorerError> {
            panic!("scorer exploded")
        }
    }

    fn precedent(id: &str) -> Precedent {
        Precedent::new(
            Dilemma::new(id, "The Trolley Problem")
                .with_type("life_and_death")
                .with_parameter("num_people_affected", 5, ""),
            vec![ReasoningPath::new(
                "util",
                "Utilitarianism",
                "pull_lever",
                StrengthLevel::Moderate,
                "Saving five outweighs one.",
            )],
        )
    }

    fn dilemma() -> Dilemma {
        Dilemma::new("new", "Runaway Tram")
            .with_type("life_and_death")
            .with_parameter("num_people_affected", 5, "")
    }

    fn pipeline(scorer: Arc<dyn SimilarityScorer>) -> ReasoningPipeline {
        ReasoningPipeline::builder(Arc::new(FrameworkRegistry::with_defaults()))
            .scorer(scorer)
            .build()
            .unwrap()
    }

    #[test]
    fn test_match_case_serialization() {
        assert_eq!(serde_json::to_value(MatchCase::CloseMatch).unwrap(), "close_match");
        assert_eq!(MatchCase::NoMatch.to_string(), "no_match");
        assert_eq!(
            PipelineState::Classified(MatchCase::ExactMatch).to_string(),
            "classified:exact_match"
        );
    }

    #[test]
    fn test_builder_rejects_invalid_config() {
        let mut config = EngineConfig::default();
        config.search.close_match_threshold = 0.95;
        let result = ReasoningPipeline::builder(Arc::new(FrameworkRegistry::with_defaults()))
            .config(config)
            .build();
        assert!(matches!(result, Err(PipelineError::Config(_))));
    }

    #[tokio::test]
    async fn test_adapted_paths_carry_provenance() {
        let outcome = pipeline(Arc::new(FixedScorer(0.8)))
            .run(&dilemma(), &[precedent("trolley")], &PipelineOptions::default())
            .await;

        assert_eq!(outcome.match_case, MatchCase::CloseMatch);
        assert_eq!(outcome.reasoning_paths.len(), 1);
        let path = &outcome.reasoning_paths[0];
        assert_eq!(path.id, "trolley:util");
        assert_eq!(path.relevance, Some(0.8));
        assert_eq!(path.source_precedent.as_deref(), Some("trolley"));
        assert!(!path.is_synthetic);
        assert_eq!(outcome.matches[0].precedent_id, "trolley");
    }

    #[tokio::test]
    async fn test_invalid_dilemma_is_error() {
        let outcome = pipeline(Arc::new(FixedScorer(0.9)))
            .run(&Dilemma::new("d", " "), &[precedent("p")], &PipelineOptions::default())
            .await;

        assert!(outcome.is_error());
        assert!(outcome.error.as_deref().unwrap_or_default().contains("title"));
        assert!(outcome.reasoning_paths.is_empty());
    }

    #[tokio::test]
    async fn test_panicking_scorer_is_error() {
        let log = Arc::new(MemoryAuditLog::new());
        let registry = Arc::new(
            FrameworkRegistry::builder()
                .with_defaults()
                .audit_sink(log.clone())
                .build(),
        );
        let pipeline = ReasoningPipeline::builder(registry)
            .scorer(Arc::new(PanickingScorer))
            .build()
            .unwrap();

        let outcome = pipeline
            .run(&dilemma(), &[precedent("p")], &PipelineOptions::default())
            .await;

        assert_eq!(outcome.match_case, MatchCase::Error);
        assert!(outcome.error.unwrap().contains("scorer exploded"));
        assert_eq!(log.by_name("pipeline").len(), 1);
        assert_eq!(log.by_kind(AuditEventKind::Failure).len(), 1);
    }

    #[tokio::test]
    async fn test_scorer_errors_degrade_to_zero() {
        let outcome = pipeline(Arc::new(UnavailableScorer))
            .run(&dilemma(), &[precedent("p")], &PipelineOptions::default())
            .await;

        assert_eq!(outcome.match_case, MatchCase::NoMatch);
        assert_eq!(outcome.degradations.len(), 1);
        assert_eq!(outcome.degradations[0].stage, Stage::Search);
        assert!(outcome.degradations[0].message.contains("index offline"));
    }

    #[tokio::test]
    async fn test_out_of_range_scores_are_rejected() {
        for score in [1.5, -0.2, f64::NAN] {
            let outcome = pipeline(Arc::new(FixedScorer(score)))
                .run(&dilemma(), &[precedent("p")], &PipelineOptions::default())
                .await;

            assert_eq!(outcome.match_case, MatchCase::NoMatch);
            assert!(outcome.matches.is_empty());
            assert_eq!(outcome.degradations.len(), 1);
            assert_eq!(outcome.degradations[0].stage, Stage::Search);
            assert_eq!(outcome.degradations[0].component, "p");
            assert!(outcome.degradations[0]
                .message
                .starts_with("Similarity score out of range"));
        }

        // The bounds themselves are valid
        let outcome = pipeline(Arc::new(FixedScorer(1.0)))
            .run(&dilemma(), &[precedent("p")], &PipelineOptions::default())
            .await;
        assert_eq!(outcome.match_case, MatchCase::ExactMatch);
        assert!(outcome.degradations.iter().all(|d| d.stage != Stage::Search));
    }

    #[tokio::test]
    async fn test_invalid_precedents_are_skipped() {
        let mut untitled = precedent("untitled");
        untitled.dilemma.title = String::new();
        let mut half = precedent("half");
        half.reasoning_paths.push(ReasoningPath::new("x", "", "act", StrengthLevel::Weak, ""));

        let outcome = pipeline(Arc::new(FixedScorer(0.5)))
            .run(&dilemma(), &[untitled, half], &PipelineOptions::default())
            .await;

        assert_eq!(outcome.match_case, MatchCase::PartialMatch);
        assert_eq!(outcome.matches.len(), 1);
        assert_eq!(outcome.reasoning_paths.len(), 1);
        assert_eq!(outcome.degradations.len(), 2);
        assert!(outcome.degradations.iter().all(|d| d.stage == Stage::Validation));
    }

    #[tokio::test]
    async fn test_store_is_bounded() {
        let mut config = EngineConfig::default();
        config.search.max_precedents = 1;
        let pipeline = ReasoningPipeline::builder(Arc::new(FrameworkRegistry::with_defaults()))
            .config(config)
            .scorer(Arc::new(FixedScorer(0.5)))
            .build()
            .unwrap();

        let outcome = pipeline
            .run(&dilemma(), &[precedent("a"), precedent("b")], &PipelineOptions::default())
            .await;

        assert_eq!(outcome.matches.len(), 1);
        assert_eq!(outcome.matches[0].precedent_id, "a");
        assert_eq!(outcome.degradations[0].component, "precedent_store");
    }

    #[tokio::test]
    async fn test_sequential_matches_parallel() {
        let mut config = EngineConfig::default();
        config.adaptation.parallel = false;
        let sequential = ReasoningPipeline::builder(Arc::new(FrameworkRegistry::with_defaults()))
            .config(config)
            .scorer(Arc::new(FixedScorer(0.6)))
            .build()
            .unwrap();
        let parallel = pipeline(Arc::new(FixedScorer(0.6)));

        let precedents = [precedent("a"), precedent("b")];
        let options = PipelineOptions::default();
        let a = sequential.run(&dilemma(), &precedents, &options).await;
        let b = parallel.run(&dilemma(), &precedents, &options).await;

        assert_ne!(a.run_id, b.run_id);
        assert_eq!(a.fingerprint(), b.fingerprint());
    }
}
