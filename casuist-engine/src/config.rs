//! Configuration for the casuist engine.

use serde::{Deserialize, Serialize};

/// Accepted values of `general.log_level`.
pub const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Configuration for a reasoning pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct EngineConfig {
    /// Precedent search configuration
    pub search: SearchConfig,
    /// Adaptation configuration
    pub adaptation: AdaptationConfig,
    /// Resolution configuration
    pub resolution: ResolutionConfig,
    /// General settings
    pub general: GeneralConfig,
}

impl EngineConfig {
    /// Load config from YAML.
    pub fn from_yaml(yaml: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(yaml)
    }

    /// Serialize to YAML.
    pub fn to_yaml(&self) -> Result<String, serde_yaml::Error> {
        serde_yaml::to_string(self)
    }

    /// Check that thresholds are ordered and in range.
    pub fn validate(&self) -> Result<(), String> {
        let s = &self.search;
        for (name, value) in [
            ("similarity_threshold", s.similarity_threshold),
            ("exact_match_threshold", s.exact_match_threshold),
            ("close_match_threshold", s.close_match_threshold),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(format!("search.{} must be within [0, 1], got {}", name, value));
            }
        }
        if s.close_match_threshold > s.exact_match_threshold {
            return Err(format!(
                "search.close_match_threshold ({}) exceeds search.exact_match_threshold ({})",
                s.close_match_threshold, s.exact_match_threshold
            ));
        }
        if self.resolution.default_strategy.trim().is_empty() {
            return Err("resolution.default_strategy must not be empty".to_string());
        }
        let level = self.general.log_level.trim().to_lowercase();
        if !LOG_LEVELS.contains(&level.as_str()) {
            return Err(format!(
                "general.log_level must be one of {}, got {:?}",
                LOG_LEVELS.join(", "),
                self.general.log_level
            ));
        }
        Ok(())
    }
}

/// Precedent search configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Minimum similarity for a precedent to count as a match
    pub similarity_threshold: f64,
    /// Maximum matched precedents to adapt
    pub max_results: usize,
    /// Maximum precedents considered per run
    pub max_precedents: usize,
    /// Similarity at which a match is exact
    pub exact_match_threshold: f64,
    /// Similarity at which a match is close
    pub close_match_threshold: f64,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            similarity_threshold: 0.3,
            max_results: 5,
            max_precedents: 10_000,
            exact_match_threshold: 0.85,
            close_match_threshold: 0.75,
        }
    }
}

/// Adaptation configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdaptationConfig {
    /// Maximum rules run per path
    pub max_rules: usize,
    /// Rewrite argument text for the new dilemma
    pub rewrite_arguments: bool,
    /// Adapt precedents on blocking tasks
    pub parallel: bool,
}

impl Default for AdaptationConfig {
    fn default() -> Self {
        Self {
            max_rules: 32,
            rewrite_arguments: true,
            parallel: true,
        }
    }
}

/// Resolution configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolutionConfig {
    /// Strategy used when the caller names none
    pub default_strategy: String,
}

impl Default for ResolutionConfig {
    fn default() -> Self {
        Self {
            default_strategy: "balance".to_string(),
        }
    }
}

/// General configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Report stage events to the registry's audit sink
    pub audit_enabled: bool,
    /// Log level for casuist crates (see [`LOG_LEVELS`])
    pub log_level: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            audit_enabled: true,
            log_level: "info".to_string(),
        }
    }
}
