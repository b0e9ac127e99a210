//! Conflict and resolution records produced by a pipeline run.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

#[cfg(feature = "typescript")]
use ts_rs::TS;

use crate::framework::FrameworkRef;
use crate::types::Strength;

/// Conflict taxonomy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
#[serde(rename_all = "snake_case")]
pub enum ConflictType {
    /// Opposing values, e.g. rights against utility
    Value,
    /// Mutually exclusive principles
    Principle,
    /// Same action, different ranked priorities
    Priority,
    /// Same action, confidence two ordinal steps apart
    Strength,
}

impl ConflictType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Value => "VALUE",
            Self::Principle => "PRINCIPLE",
            Self::Priority => "PRIORITY",
            Self::Strength => "STRENGTH",
        }
    }
}

impl fmt::Display for ConflictType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How serious a conflict is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Low,
    Medium,
    High,
}

impl Severity {
    /// Map a severity score: 1 or less is low, 2 medium, 3 or more high.
    pub fn from_score(score: u8) -> Self {
        match score {
            0 | 1 => Self::Low,
            2 => Self::Medium,
            _ => Self::High,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }
}

/// What kind of content a conflicting element refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
#[serde(rename_all = "snake_case")]
pub enum ElementKind {
    Value,
    Principle,
    Priority,
    Strength,
    Action,
}

/// One pair of contents in tension, one per side.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
pub struct ConflictElement {
    pub kind: ElementKind,
    /// Content on the `framework_a` side
    pub side_a: String,
    /// Content on the `framework_b` side
    pub side_b: String,
}

/// A detected tension between two reasoning paths.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
pub struct Conflict {
    pub conflict_type: ConflictType,
    pub framework_a: FrameworkRef,
    pub framework_b: FrameworkRef,
    /// Id of the path on side a
    pub path_a: String,
    /// Id of the path on side b
    pub path_b: String,
    /// One action for same-action conflicts, two for cross-action conflicts
    pub actions: Vec<String>,
    pub severity: Severity,
    pub conflicting_elements: Vec<ConflictElement>,
    pub description: String,
}

impl Conflict {
    /// Whether the two sides reached different conclusions.
    pub fn is_cross_action(&self) -> bool {
        self.actions.len() > 1
    }

    /// Whether a framework id is one of the two sides.
    pub fn involves(&self, framework_id: &str) -> bool {
        self.framework_a.id == framework_id || self.framework_b.id == framework_id
    }
}

/// The non-opaque content of a resolution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
pub struct ResolutionContent {
    /// Synthesized framework name
    pub framework: String,
    pub action: String,
    pub strength: Strength,
    pub argument: String,
    /// Canonical names of the reconciled frameworks
    pub original_frameworks: Vec<String>,
    pub conflict_type: ConflictType,
    pub resolution_strategy: String,
    pub resolution_description: String,
}

/// A synthesized reconciliation of a conflict.
///
/// `id` and `created_at` are opaque and differ between runs; everything in
/// `content` is reproducible from the same inputs.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
pub struct Resolution {
    pub id: String,
    #[cfg_attr(feature = "typescript", ts(type = "string"))]
    pub created_at: DateTime<Utc>,
    #[serde(flatten)]
    pub content: ResolutionContent,
}

impl Resolution {
    /// Stamp content with a fresh id and timestamp.
    pub fn synthesize(content: ResolutionContent) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            created_at: Utc::now(),
            content,
        }
    }

    /// SHA-256 over the reproducible content.
    pub fn content_hash(&self) -> String {
        let bytes = serde_json::to_vec(&self.content).unwrap_or_default();
        hex::encode(Sha256::digest(&bytes))
    }
}
