//! Error types and shared result alias for the casuist engine.

use casebase::ValidationError;

/// An adaptation rule could not be applied.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RuleError {
    /// Parameter value cannot be placed on the rule's scale
    #[error("Parameter '{name}' has unusable value {value}: {reason}")]
    InvalidParameter {
        name: String,
        value: String,
        reason: String,
    },
}

impl RuleError {
    pub(crate) fn invalid(
        name: &str,
        value: &serde_json::Value,
        reason: impl Into<String>,
    ) -> Self {
        Self::InvalidParameter {
            name: name.to_string(),
            value: value.to_string(),
            reason: reason.into(),
        }
    }
}

/// A resolution strategy failed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StrategyError {
    /// The strategy cannot handle this conflict
    #[error("Strategy '{strategy}' cannot resolve conflict: {reason}")]
    Unsupported { strategy: String, reason: String },

    /// The strategy produced an unusable resolution
    #[error("Strategy '{strategy}' produced invalid output: {reason}")]
    InvalidOutput { strategy: String, reason: String },
}

/// The similarity collaborator failed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ScorerError {
    #[error("Similarity scoring unavailable: {0}")]
    Unavailable(String),

    #[error("Similarity score out of range: {0}")]
    OutOfRange(String),
}

/// A pipeline run could not complete.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// The input dilemma is unusable
    #[error("Invalid dilemma: {0}")]
    InvalidDilemma(#[from] ValidationError),

    /// A blocking adaptation task failed to join
    #[error("Adaptation task failed: {0}")]
    Join(String),

    /// A stage panicked
    #[error("Pipeline panicked: {0}")]
    Panic(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Result type for engine operations.
pub type Result<T> = std::result::Result<T, PipelineError>;

/// Best-effort text of a caught panic payload.
pub(crate) fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
