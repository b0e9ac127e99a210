//! Framework registry resolving free-text names to canonical records.
//!
//! Resolution order:
//!
//! 1. exact match on a canonical name, id or alias
//! 2. case-insensitive match
//! 3. normalized match (`-`, `_` and whitespace stripped, lowercased)
//! 4. hybrid pattern (`Hybrid: A + B` or `A + B`), components resolved recursively
//! 5. unknown placeholder, unless the caller disables fallback
//!
//! Canonical entries are registered once through [`FrameworkRegistryBuilder`];
//! afterwards the registry is read-only apart from a concurrent memo of
//! synthesized hybrid and unknown records.

use dashmap::DashMap;
use std::collections::HashMap;
use std::sync::Arc;

use crate::audit::{AuditEvent, AuditSink};
use crate::framework::{normalize_key, Framework, FrameworkComponent, FrameworkKind};

/// Audit location used when the caller does not supply one.
pub const DEFAULT_LOCATION: &str = "registry";

/// Default bound on memoized hybrid and unknown records.
pub const DEFAULT_MAX_SYNTHESIZED: usize = 1024;

/// Error types for registry construction.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    /// Record is missing its identity
    #[error("Invalid framework: {0}")]
    InvalidFramework(String),

    /// An exact lookup key already belongs to another record
    #[error("Duplicate framework name '{name}' (already registered to '{existing_id}')")]
    DuplicateName { name: String, existing_id: String },
}

/// Options for a single lookup.
#[derive(Debug, Clone, Copy)]
pub struct LookupOptions<'a> {
    /// Synthesize an unknown record when nothing matches
    pub allow_fallback: bool,
    /// Caller location reported to the audit sink
    pub location: &'a str,
}

impl Default for LookupOptions<'_> {
    fn default() -> Self {
        Self {
            allow_fallback: true,
            location: DEFAULT_LOCATION,
        }
    }
}

impl<'a> LookupOptions<'a> {
    /// Options that yield `None` instead of an unknown record.
    pub fn strict(location: &'a str) -> Self {
        Self {
            allow_fallback: false,
            location,
        }
    }

    pub fn at(location: &'a str) -> Self {
        Self {
            allow_fallback: true,
            location,
        }
    }
}

/// Registry of canonical framework records.
pub struct FrameworkRegistry {
    /// Canonical records by id
    records: HashMap<String, Framework>,
    /// Exact key -> id
    exact: HashMap<String, String>,
    /// Lowercased key -> id
    case_insensitive: HashMap<String, String>,
    /// Normalized key -> id
    normalized: HashMap<String, String>,
    /// Synthesized hybrid/unknown records by literal input
    synthesized: DashMap<String, Framework>,
    /// Memo bound; records past it are built per lookup
    max_synthesized: usize,
    /// Optional observer
    audit: Option<Arc<dyn AuditSink>>,
}

impl FrameworkRegistry {
    /// Create a builder.
    pub fn builder() -> FrameworkRegistryBuilder {
        FrameworkRegistryBuilder::new()
    }

    /// Registry holding the builtin frameworks and no audit sink.
    pub fn with_defaults() -> Self {
        Self::builder().with_defaults().build()
    }

    /// Resolve a name, falling back to an unknown record.
    pub fn resolve(&self, name: &str) -> Framework {
        self.resolve_at(name, DEFAULT_LOCATION)
    }

    /// Resolve a name on behalf of `location`.
    pub fn resolve_at(&self, name: &str, location: &str) -> Framework {
        self.lookup(name, LookupOptions::at(location))
            .unwrap_or_else(|| Framework::unknown(name))
    }

    /// Look up a name with explicit options.
    pub fn lookup(&self, name: &str, options: LookupOptions<'_>) -> Option<Framework> {
        let trimmed = name.trim();

        if let Some(framework) = self.find_canonical(trimmed) {
            self.emit(
                AuditEvent::lookup(trimmed, options.location, true)
                    .with_context("resolved_id", framework.id.clone()),
            );
            return Some(framework.clone());
        }

        if let Some(memo) = self.synthesized.get(trimmed) {
            if options.allow_fallback || !memo.is_unknown {
                self.emit(
                    AuditEvent::reference(trimmed, options.location)
                        .with_context("resolved_id", memo.id.clone()),
                );
                return Some(memo.clone());
            }
        }

        if let Some(parts) = split_hybrid(trimmed) {
            let components: Vec<FrameworkComponent> = parts
                .into_iter()
                .map(|part| {
                    match self.lookup(part, LookupOptions::strict(options.location)) {
                        Some(framework) => FrameworkComponent::Canonical(framework),
                        None => FrameworkComponent::Raw(part.to_string()),
                    }
                })
                .collect();

            let hybrid = Framework::hybrid(components);
            tracing::debug!(name = %trimmed, id = %hybrid.id, "Synthesized hybrid framework");
            self.emit(
                AuditEvent::lookup(trimmed, options.location, true)
                    .with_context("resolved_id", hybrid.id.clone())
                    .with_context("synthesized", "hybrid"),
            );
            self.remember(trimmed, &hybrid);
            return Some(hybrid);
        }

        if !options.allow_fallback {
            self.emit(
                AuditEvent::failure(trimmed, options.location)
                    .with_context("reason", "no canonical, hybrid or fallback match"),
            );
            return None;
        }

        let unknown = Framework::unknown(trimmed);
        tracing::debug!(name = %trimmed, id = %unknown.id, "Falling back to unknown framework");
        self.emit(
            AuditEvent::lookup(trimmed, options.location, false)
                .with_context("resolved_id", unknown.id.clone())
                .with_context("synthesized", "unknown"),
        );
        self.remember(trimmed, &unknown);
        Some(unknown)
    }

    /// Memoize a synthesized record while the memo has room.
    fn remember(&self, key: &str, framework: &Framework) {
        if self.synthesized.len() >= self.max_synthesized {
            tracing::debug!(
                name = %key,
                max = self.max_synthesized,
                "Synthesized framework memo full, not caching"
            );
            return;
        }
        self.synthesized.insert(key.to_string(), framework.clone());
    }

    /// Steps 1-3: exact, case-insensitive, normalized.
    fn find_canonical(&self, name: &str) -> Option<&Framework> {
        if name.is_empty() {
            return None;
        }

        self.exact
            .get(name)
            .or_else(|| self.case_insensitive.get(&name.to_lowercase()))
            .or_else(|| self.normalized.get(&normalize_key(name)))
            .and_then(|id| self.records.get(id))
    }

    /// Get a canonical record by id.
    pub fn get(&self, id: &str) -> Option<&Framework> {
        self.records.get(id)
    }

    /// Ids of all canonical records, sorted.
    pub fn canonical_ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.records.keys().map(String::as_str).collect();
        ids.sort_unstable();
        ids
    }

    /// Number of canonical records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Number of memoized hybrid/unknown records.
    pub fn synthesized_count(&self) -> usize {
        self.synthesized.len()
    }

    /// The audit sink, if any, for components that report alongside the registry.
    pub fn audit_sink(&self) -> Option<Arc<dyn AuditSink>> {
        self.audit.clone()
    }

    fn emit(&self, event: AuditEvent) {
        if let Some(sink) = &self.audit {
            sink.record(event);
        }
    }
}

impl Default for FrameworkRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

/// Builder for a [`FrameworkRegistry`].
pub struct FrameworkRegistryBuilder {
    records: HashMap<String, Framework>,
    exact: HashMap<String, String>,
    case_insensitive: HashMap<String, String>,
    normalized: HashMap<String, String>,
    max_synthesized: usize,
    audit: Option<Arc<dyn AuditSink>>,
}

impl FrameworkRegistryBuilder {
    /// Create an empty builder.
    pub fn new() -> Self {
        Self {
            records: HashMap::new(),
            exact: HashMap::new(),
            case_insensitive: HashMap::new(),
            normalized: HashMap::new(),
            max_synthesized: DEFAULT_MAX_SYNTHESIZED,
            audit: None,
        }
    }

    /// Register the builtin frameworks.
    pub fn with_defaults(mut self) -> Self {
        for framework in builtin_frameworks() {
            if let Err(e) = self.index(framework) {
                tracing::warn!(error = %e, "Skipping builtin framework");
            }
        }
        self
    }

    /// Register a canonical record.
    pub fn register(mut self, framework: Framework) -> Result<Self, RegistryError> {
        if framework.id.trim().is_empty() || framework.name.trim().is_empty() {
            return Err(RegistryError::InvalidFramework(format!(
                "framework requires an id and a name (id: {:?})",
                framework.id
            )));
        }
        self.index(framework)?;
        Ok(self)
    }

    /// Bound the memo of synthesized hybrid and unknown records.
    pub fn max_synthesized(mut self, max: usize) -> Self {
        self.max_synthesized = max;
        self
    }

    /// Attach an audit sink.
    pub fn audit_sink(mut self, sink: Arc<dyn AuditSink>) -> Self {
        self.audit = Some(sink);
        self
    }

    fn index(&mut self, framework: Framework) -> Result<(), RegistryError> {
        let id = framework.id.clone();

        for key in framework.keys() {
            if let Some(existing) = self.exact.get(key) {
                if existing != &id {
                    return Err(RegistryError::DuplicateName {
                        name: key.to_string(),
                        existing_id: existing.clone(),
                    });
                }
            }
        }

        for key in framework.keys() {
            self.exact.insert(key.to_string(), id.clone());
            // First registration wins for the looser matches
            self.case_insensitive
                .entry(key.to_lowercase())
                .or_insert_with(|| id.clone());
            self.normalized
                .entry(normalize_key(key))
                .or_insert_with(|| id.clone());
        }

        self.records.insert(id, framework);
        Ok(())
    }

    /// Build the registry.
    pub fn build(self) -> FrameworkRegistry {
        tracing::debug!(frameworks = self.records.len(), "Framework registry built");
        FrameworkRegistry {
            records: self.records,
            exact: self.exact,
            case_insensitive: self.case_insensitive,
            normalized: self.normalized,
            synthesized: DashMap::new(),
            max_synthesized: self.max_synthesized,
            audit: self.audit,
        }
    }
}

impl Default for FrameworkRegistryBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Split a hybrid name into component names.
///
/// `Hybrid:` names need at least one component; bare `A + B` names need two.
fn split_hybrid(name: &str) -> Option<Vec<&str>> {
    const PREFIX: &str = "hybrid:";

    let (rest, min_parts) = match name.get(..PREFIX.len()) {
        Some(head) if head.eq_ignore_ascii_case(PREFIX) => (&name[PREFIX.len()..], 1),
        _ if name.contains('+') => (name, 2),
        _ => return None,
    };

    let parts: Vec<&str> = rest
        .split(|c: char| c == '+' || c == ',')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .collect();

    if parts.len() >= min_parts {
        Some(parts)
    } else {
        None
    }
}

fn builtin_frameworks() -> Vec<Framework> {
    vec![
        Framework::builtin(
            "utilitarianism",
            "Utilitarianism",
            FrameworkKind::Utilitarian,
            &["Utilitarian", "Utilitarian Ethics", "Act Utilitarianism"],
        ),
        Framework::builtin(
            "deontology",
            "Deontology",
            FrameworkKind::Deontological,
            &[
                "Deontological Ethics",
                "Kantian Ethics",
                "Kantianism",
                "Duty-Based Ethics",
            ],
        ),
        Framework::builtin(
            "virtue_ethics",
            "Virtue Ethics",
            FrameworkKind::Virtue,
            &["Virtue", "Aristotelian Ethics"],
        ),
        Framework::builtin(
            "care_ethics",
            "Care Ethics",
            FrameworkKind::Care,
            &["Ethics of Care", "Care-Based Ethics"],
        ),
        Framework::builtin(
            "rights_based_ethics",
            "Rights-Based Ethics",
            FrameworkKind::RightsBased,
            &["Rights Ethics", "Human Rights Ethics"],
        ),
        Framework::builtin(
            "natural_law",
            "Natural Law Theory",
            FrameworkKind::NaturalLaw,
            &["Natural Law", "Thomistic Ethics"],
        ),
        Framework::builtin(
            "justice_ethics",
            "Justice Ethics",
            FrameworkKind::Justice,
            &["Justice as Fairness", "Rawlsian Ethics"],
        ),
        Framework::builtin(
            "contractarianism",
            "Contractarianism",
            FrameworkKind::Contractarian,
            &["Social Contract Theory", "Contractualism"],
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::{AuditEventKind, MemoryAuditLog};

    fn registry_with_log() -> (FrameworkRegistry, Arc<MemoryAuditLog>) {
        let log = Arc::new(MemoryAuditLog::new());
        let registry = FrameworkRegistry::builder()
            .with_defaults()
            .audit_sink(log.clone())
            .build();
        (registry, log)
    }

    #[test]
    fn test_resolution_order() {
        let registry = FrameworkRegistry::with_defaults();

        assert_eq!(registry.resolve("Utilitarianism").id, "utilitarianism");
        assert_eq!(registry.resolve("Kantian Ethics").id, "deontology");
        assert_eq!(registry.resolve("care ethics").id, "care_ethics");
        assert_eq!(registry.resolve("Rights-Based-Ethics").id, "rights_based_ethics");
        assert_eq!(registry.resolve("natural_law").id, "natural_law");
        assert_eq!(registry.resolve("  VIRTUE_ETHICS ").id, "virtue_ethics");
    }

    #[test]
    fn test_repeated_resolution_is_value_equal() {
        let registry = FrameworkRegistry::with_defaults();

        for name in ["Deontology", "Hybrid: Utilitarianism + Care Ethics", "Stoic Ethics"] {
            assert_eq!(registry.resolve(name), registry.resolve(name));
        }
        assert_eq!(registry.synthesized_count(), 2);
    }

    #[test]
    fn test_hybrid_resolution() {
        let registry = FrameworkRegistry::with_defaults();

        let hybrid = registry.resolve("Hybrid: Utilitarianism + Ethics of Care");
        assert!(hybrid.is_hybrid);
        assert_eq!(hybrid.id, "hybrid:utilitarianism+care_ethics");
        assert_eq!(hybrid.name, "Hybrid: Utilitarianism + Care Ethics");
        assert!(hybrid.has_kind(FrameworkKind::Utilitarian));
        assert!(hybrid.has_kind(FrameworkKind::Care));

        let bare = registry.resolve("Deontology + Virtue");
        assert_eq!(bare.id, "hybrid:deontology+virtue_ethics");

        let partial = registry.resolve("Hybrid: Deontology, Confucian Ethics");
        assert_eq!(
            partial.components[1],
            FrameworkComponent::Raw("Confucian Ethics".to_string())
        );
        assert!(!partial.is_unknown);
    }

    #[test]
    fn test_unknown_fallback_and_strict_lookup() {
        let (registry, log) = registry_with_log();

        let unknown = registry.resolve("Moral Particularism");
        assert!(unknown.is_unknown);
        assert_eq!(unknown.name, "Moral Particularism");

        assert!(registry
            .lookup("Ubuntu Ethics", LookupOptions::strict("test"))
            .is_none());
        // Memoized unknown records are not returned to strict callers
        assert!(registry
            .lookup("Moral Particularism", LookupOptions::strict("test"))
            .is_none());

        let failures = log.by_kind(AuditEventKind::Failure);
        assert_eq!(failures.len(), 2);
        assert!(failures.iter().all(|e| e.location == "test"));
    }

    #[test]
    fn test_every_attempt_is_audited() {
        let (registry, log) = registry_with_log();

        registry.resolve("Utilitarianism");
        registry.resolve("Stoic Ethics");
        registry.resolve("Stoic Ethics");

        let stats = log.stats();
        assert_eq!(stats.lookups, 2);
        assert_eq!(stats.references, 1);
        assert_eq!(stats.unsuccessful, 1);
    }

    #[test]
    fn test_register_custom_and_duplicates() {
        let stoicism = Framework::new("stoicism", "Stoicism", FrameworkKind::Virtue)
            .unwrap()
            .with_alias("Stoic Ethics");
        let registry = FrameworkRegistry::builder()
            .with_defaults()
            .register(stoicism)
            .unwrap()
            .build();
        assert_eq!(registry.resolve("stoic ethics").id, "stoicism");

        let clash = Framework::new("util2", "Utilitarianism", FrameworkKind::Utilitarian).unwrap();
        let err = FrameworkRegistry::builder()
            .with_defaults()
            .register(clash)
            .err()
            .unwrap();
        assert!(matches!(err, RegistryError::DuplicateName { .. }));
    }

    #[test]
    fn test_synthesized_memo_is_bounded() {
        let registry = FrameworkRegistry::builder()
            .with_defaults()
            .max_synthesized(2)
            .build();

        for name in ["Stoic Ethics", "Ubuntu Ethics", "Confucian Ethics", "Moral Particularism"] {
            let framework = registry.resolve(name);
            assert!(framework.is_unknown);
            assert_eq!(framework.name, name);
        }
        assert_eq!(registry.synthesized_count(), 2);

        // Records past the bound are still built, with the same identity
        let overflow = registry.resolve("Confucian Ethics");
        assert_eq!(overflow.id, "unknown:confucianethics");
        assert_eq!(overflow, registry.resolve("Confucian Ethics"));
        assert_eq!(
            registry.resolve("Hybrid: Deontology + Care Ethics").id,
            "hybrid:deontology+care_ethics"
        );
        assert_eq!(registry.synthesized_count(), 2);

        // Memoized names keep resolving from the memo
        assert_eq!(registry.resolve("Stoic Ethics").id, "unknown:stoicethics");
    }

    #[test]
    fn test_split_hybrid() {
        assert_eq!(split_hybrid("Hybrid: Care"), Some(vec!["Care"]));
        assert_eq!(split_hybrid("A + B, C"), Some(vec!["A", "B", "C"]));
        assert_eq!(split_hybrid("A, B"), None);
        assert_eq!(split_hybrid("A +"), None);
        assert_eq!(split_hybrid("Hybrid:"), None);
    }

    #[test]
    fn test_registry_is_shareable_across_threads() {
        let registry = Arc::new(FrameworkRegistry::with_defaults());
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let registry = registry.clone();
                std::thread::spawn(move || registry.resolve("Hybrid: Deontology + Care Ethics").id)
            })
            .collect();

        for handle in handles {
            assert_eq!(handle.join().unwrap(), "hybrid:deontology+care_ethics");
        }
    }
}
