//! Casuist Engine - Precedent-Based Ethical Reasoning
//!
//! Reasons about a new dilemma by analogy to previously reasoned precedents:
//!
//! - **Search**: Score precedents against the dilemma and keep the closest
//! - **Adaptation**: Rewrite each precedent's reasoning paths for the new parameters
//! - **Conflict detection**: Find where frameworks disagree, and how badly
//! - **Resolution**: Reconcile each conflict through a named strategy
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    ReasoningPipeline                        │
//! │                                                             │
//! │  ┌────────┐  ┌──────────┐  ┌──────────┐  ┌──────────┐      │
//! │  │ Search │──│  Adapt   │──│  Detect  │──│ Resolve  │      │
//! │  └────────┘  └──────────┘  └──────────┘  └──────────┘      │
//! │      │            │              │             │            │
//! │  ┌───▼──────┐     └──────┬───────┴─────────────┘            │
//! │  │Synthetic │     ┌──────▼────────────┐                     │
//! │  │generator │     │ FrameworkRegistry │                     │
//! │  └──────────┘     └───────────────────┘                     │
//! └─────────────────────────────────────────────────────────────┘
//! ```

pub mod adaptation;
pub mod collaborators;
pub mod config;
pub mod conflict;
pub mod pipeline;
pub mod resolution;
pub mod types;

// Re-export main types
pub use adaptation::{
    AdaptationContext, AdaptationEngine, AdaptationReport, AdaptationRule, ArgumentRewriter,
    RuleFailure,
};
pub use collaborators::{
    KeywordSimilarity, SimilarityScorer, SyntheticPathGenerator, TemplatePathGenerator,
};
pub use config::{EngineConfig, LOG_LEVELS};
pub use conflict::ConflictDetector;
pub use pipeline::{
    Degradation, MatchCase, PipelineOptions, PipelineOutcome, PipelineState, PrecedentMatch,
    ReasoningPipeline, ReasoningPipelineBuilder, Stage,
};
pub use resolution::{ConflictResolver, ResolutionReport, ResolutionStrategy, ResolveOptions};
pub use types::*;
