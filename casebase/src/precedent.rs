//! Precedent storage and retrieval.
//!
//! Manages the precedent corpus the pipeline searches. Uses an in-memory store
//! indexed by situation type; files are loaded as JSON or YAML arrays.

use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::types::*;
use crate::validation::ValidationError;

/// Default bound on the number of stored precedents.
pub const DEFAULT_MAX_PRECEDENTS: usize = 10_000;

/// Error types for precedent operations.
#[derive(Debug, thiserror::Error)]
pub enum PrecedentError {
    /// Precedent not found
    #[error("Precedent not found: {0}")]
    NotFound(String),

    /// Invalid precedent data
    #[error("Invalid precedent: {0}")]
    InvalidPrecedent(#[from] ValidationError),

    /// Store is full
    #[error("Precedent store is full ({0} precedents)")]
    CapacityExceeded(usize),

    /// JSON parse error
    #[error("Failed to parse precedents as JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML parse error
    #[error("Failed to parse precedents as YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// In-memory precedent store.
pub struct PrecedentStore {
    /// Precedents by id
    cache: Arc<RwLock<HashMap<String, Precedent>>>,
    /// Insertion order, for deterministic iteration
    order: Arc<RwLock<Vec<String>>>,
    /// Index by situation type
    by_type: Arc<RwLock<HashMap<String, Vec<String>>>>,
    /// Maximum precedents to store
    max_precedents: usize,
}

impl PrecedentStore {
    /// Create a new empty precedent store.
    pub fn new() -> Self {
        Self::with_max_precedents(DEFAULT_MAX_PRECEDENTS)
    }

    /// Create with custom limit.
    pub fn with_max_precedents(max: usize) -> Self {
        Self {
            cache: Arc::new(RwLock::new(HashMap::new())),
            order: Arc::new(RwLock::new(Vec::new())),
            by_type: Arc::new(RwLock::new(HashMap::new())),
            max_precedents: max,
        }
    }

    /// Store a precedent, replacing any precedent with the same id.
    pub async fn store(&self, precedent: Precedent) -> Result<(), PrecedentError> {
        precedent.validate()?;

        let id = precedent.id().to_string();
        let situation_type = precedent.dilemma.situation.situation_type.clone();

        let mut cache = self.cache.write().await;
        let replaced = cache.get(&id).map(|p| p.dilemma.situation.situation_type.clone());
        if replaced.is_none() && cache.len() >= self.max_precedents {
            return Err(PrecedentError::CapacityExceeded(self.max_precedents));
        }
        cache.insert(id.clone(), precedent);
        drop(cache);

        {
            let mut by_type = self.by_type.write().await;
            if let Some(old_type) = &replaced {
                if let Some(ids) = by_type.get_mut(old_type) {
                    ids.retain(|i| i != &id);
                }
            }
            by_type.entry(situation_type).or_default().push(id.clone());
        }

        if replaced.is_none() {
            let mut order = self.order.write().await;
            order.push(id.clone());
        }

        tracing::debug!(precedent_id = %id, "Stored precedent");
        Ok(())
    }

    /// Load a JSON array of precedents. Returns the number stored.
    pub async fn load_json(&self, json: &str) -> Result<usize, PrecedentError> {
        let precedents: Vec<Precedent> = serde_json::from_str(json)?;
        self.store_all(precedents).await
    }

    /// Load a YAML sequence of precedents. Returns the number stored.
    pub async fn load_yaml(&self, yaml: &str) -> Result<usize, PrecedentError> {
        let precedents: Vec<Precedent> = serde_yaml::from_str(yaml)?;
        self.store_all(precedents).await
    }

    async fn store_all(&self, precedents: Vec<Precedent>) -> Result<usize, PrecedentError> {
        let count = precedents.len();
        for precedent in precedents {
            self.store(precedent).await?;
        }
        tracing::info!(count, "Loaded precedents");
        Ok(count)
    }

    /// Get a precedent by id.
    pub async fn get(&self, id: &str) -> Result<Precedent, PrecedentError> {
        let cache = self.cache.read().await;
        cache
            .get(id)
            .cloned()
            .ok_or_else(|| PrecedentError::NotFound(id.to_string()))
    }

    /// All precedents in insertion order.
    pub async fn all(&self) -> Vec<Precedent> {
        let order = self.order.read().await;
        let cache = self.cache.read().await;

        order.iter().filter_map(|id| cache.get(id).cloned()).collect()
    }

    /// All precedents of a situation type.
    pub async fn by_situation_type(&self, situation_type: &str) -> Vec<Precedent> {
        let by_type = self.by_type.read().await;
        let cache = self.cache.read().await;

        by_type
            .get(situation_type)
            .map(|ids| ids.iter().filter_map(|id| cache.get(id).cloned()).collect())
            .unwrap_or_default()
    }

    /// Get total count of stored precedents.
    pub async fn count(&self) -> usize {
        let cache = self.cache.read().await;
        cache.len()
    }
}

impl Default for PrecedentStore {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for creating precedents.
pub struct PrecedentBuilder {
    dilemma: Dilemma,
    reasoning_paths: Vec<ReasoningPath>,
}

impl PrecedentBuilder {
    /// Create a new precedent builder.
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            dilemma: Dilemma::new(id, title),
            reasoning_paths: Vec::new(),
        }
    }

    /// Set the description.
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.dilemma.description = description.into();
        self
    }

    /// Set the situation type.
    pub fn situation_type(mut self, situation_type: impl Into<String>) -> Self {
        self.dilemma.situation.situation_type = situation_type.into();
        self
    }

    /// Add a parameter.
    pub fn parameter(
        mut self,
        name: impl Into<String>,
        value: impl Into<serde_json::Value>,
        description: impl Into<String>,
    ) -> Self {
        self.dilemma = self.dilemma.with_parameter(name, value, description);
        self
    }

    /// Add a contextual factor.
    pub fn factor(mut self, factor: impl Into<String>) -> Self {
        self.dilemma.situation.contextual_factors.push(factor.into());
        self
    }

    /// Add a possible action.
    pub fn action(mut self, action: impl Into<String>, description: impl Into<String>) -> Self {
        self.dilemma = self.dilemma.with_action(action, description);
        self
    }

    /// Add a stored reasoning path.
    pub fn path(mut self, path: ReasoningPath) -> Self {
        self.reasoning_paths.push(path);
        self
    }

    /// Build the precedent.
    pub fn build(self) -> Result<Precedent, PrecedentError> {
        let precedent = Precedent::new(self.dilemma, self.reasoning_paths);
        precedent.validate()?;
        Ok(precedent)
    }
}
