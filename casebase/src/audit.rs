//! Audit trail for registry lookups and pipeline stages.
//!
//! Sinks are purely observational: recording an event never changes what the
//! caller does next.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, VecDeque};
use std::sync::Mutex;

/// Maximum entries in the in-memory audit log before pruning.
const MAX_AUDIT_ENTRIES: usize = 10_000;

/// Kind of audited event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditEventKind {
    /// A previously synthesized record was reused
    Reference,
    /// A resolution attempt or stage completion
    Lookup,
    /// Something degraded or could not be resolved
    Failure,
}

/// A single audit event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEvent {
    pub kind: AuditEventKind,
    /// Framework name, rule name, strategy name or stage name
    pub name: String,
    /// Where the event originated, e.g. `registry` or `pipeline.adaptation`
    pub location: String,
    /// Outcome, when the event has one
    pub success: Option<bool>,
    /// Free-form key/value context
    pub context: BTreeMap<String, String>,
    pub recorded_at: DateTime<Utc>,
}

impl AuditEvent {
    fn new(kind: AuditEventKind, name: &str, location: &str, success: Option<bool>) -> Self {
        Self {
            kind,
            name: name.to_string(),
            location: location.to_string(),
            success,
            context: BTreeMap::new(),
            recorded_at: Utc::now(),
        }
    }

    pub fn reference(name: &str, location: &str) -> Self {
        Self::new(AuditEventKind::Reference, name, location, Some(true))
    }

    pub fn lookup(name: &str, location: &str, success: bool) -> Self {
        Self::new(AuditEventKind::Lookup, name, location, Some(success))
    }

    pub fn failure(name: &str, location: &str) -> Self {
        Self::new(AuditEventKind::Failure, name, location, Some(false))
    }

    /// Builder: add a context entry.
    pub fn with_context(mut self, key: &str, value: impl Into<String>) -> Self {
        self.context.insert(key.to_string(), value.into());
        self
    }
}

/// Receiver of audit events. Must tolerate concurrent callers.
pub trait AuditSink: Send + Sync {
    fn record(&self, event: AuditEvent);
}

/// Bounded in-memory audit log, newest first.
pub struct MemoryAuditLog {
    entries: Mutex<VecDeque<AuditEvent>>,
    max_entries: usize,
}

impl MemoryAuditLog {
    /// Create a new audit log.
    pub fn new() -> Self {
        Self::with_max_entries(MAX_AUDIT_ENTRIES)
    }

    /// Create with custom max entries.
    pub fn with_max_entries(max_entries: usize) -> Self {
        Self {
            entries: Mutex::new(VecDeque::new()),
            max_entries,
        }
    }

    fn entries(&self) -> std::sync::MutexGuard<'_, VecDeque<AuditEvent>> {
        // A panicking recorder cannot leave the deque half-written.
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Get recent entries.
    pub fn recent(&self, limit: usize) -> Vec<AuditEvent> {
        self.entries().iter().take(limit).cloned().collect()
    }

    /// Get entries of one kind.
    pub fn by_kind(&self, kind: AuditEventKind) -> Vec<AuditEvent> {
        self.entries()
            .iter()
            .filter(|e| e.kind == kind)
            .cloned()
            .collect()
    }

    /// Get entries for a name.
    pub fn by_name(&self, name: &str) -> Vec<AuditEvent> {
        self.entries()
            .iter()
            .filter(|e| e.name == name)
            .cloned()
            .collect()
    }

    /// Get statistics.
    pub fn stats(&self) -> AuditStats {
        let entries = self.entries();

        AuditStats {
            total_events: entries.len(),
            references: entries
                .iter()
                .filter(|e| e.kind == AuditEventKind::Reference)
                .count(),
            lookups: entries
                .iter()
                .filter(|e| e.kind == AuditEventKind::Lookup)
                .count(),
            failures: entries
                .iter()
                .filter(|e| e.kind == AuditEventKind::Failure)
                .count(),
            unsuccessful: entries
                .iter()
                .filter(|e| e.success == Some(false))
                .count(),
        }
    }

    /// Clear the log.
    pub fn clear(&self) {
        self.entries().clear();
    }

    /// Get count.
    pub fn count(&self) -> usize {
        self.entries().len()
    }
}

impl Default for MemoryAuditLog {
    fn default() -> Self {
        Self::new()
    }
}

impl AuditSink for MemoryAuditLog {
    fn record(&self, event: AuditEvent) {
        let mut entries = self.entries();
        entries.push_front(event);

        // Prune if over limit
        while entries.len() > self.max_entries {
            entries.pop_back();
        }
    }
}

/// Statistics from the audit log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditStats {
    pub total_events: usize,
    pub references: usize,
    pub lookups: usize,
    pub failures: usize,
    /// Events of any kind with `success == Some(false)`
    pub unsuccessful: usize,
}

/// Forwards audit events to `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingAuditSink;

impl AuditSink for TracingAuditSink {
    fn record(&self, event: AuditEvent) {
        match event.kind {
            AuditEventKind::Failure => tracing::warn!(
                name = %event.name,
                location = %event.location,
                context = ?event.context,
                "Audit failure"
            ),
            _ => tracing::debug!(
                kind = ?event.kind,
                name = %event.name,
                location = %event.location,
                success = ?event.success,
                "Audit event"
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_log_records_newest_first() {
        let log = MemoryAuditLog::new();
        log.record(AuditEvent::lookup("Utilitarianism", "registry", true));
        log.record(AuditEvent::failure("Stoicism", "registry").with_context("reason", "no match"));

        let recent = log.recent(10);
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].name, "Stoicism");
        assert_eq!(recent[0].context.get("reason").map(String::as_str), Some("no match"));
    }

    #[test]
    fn test_memory_log_prunes() {
        let log = MemoryAuditLog::with_max_entries(3);
        for i in 0..5 {
            log.record(AuditEvent::lookup(&format!("fw-{}", i), "registry", true));
        }

        assert_eq!(log.count(), 3);
        assert_eq!(log.recent(1)[0].name, "fw-4");
    }

    #[test]
    fn test_audit_stats() {
        let log = MemoryAuditLog::new();
        log.record(AuditEvent::lookup("a", "registry", true));
        log.record(AuditEvent::lookup("b", "registry", false));
        log.record(AuditEvent::reference("c", "registry"));
        log.record(AuditEvent::failure("d", "registry"));

        let stats = log.stats();
        assert_eq!(stats.total_events, 4);
        assert_eq!(stats.lookups, 2);
        assert_eq!(stats.references, 1);
        assert_eq!(stats.failures, 1);
        assert_eq!(stats.unsuccessful, 2);

        log.clear();
        assert_eq!(log.count(), 0);
    }
}
