//! Case records for precedent-based ethical reasoning
//!
//! This crate holds the data the casuist engine reasons over:
//!
//! - **Dilemmas**: structured scenarios with parameters, contextual factors and actions
//! - **Precedents**: previously reasoned dilemmas carrying stored reasoning paths
//! - **Reasoning paths**: one framework's conclusion, confidence and argument
//! - **Conflicts and resolutions**: what a pipeline run detects and synthesizes
//!
//! # Key Components
//!
//! - [`FrameworkRegistry`]: Resolves free-text framework names to canonical records
//! - [`PrecedentStore`]: In-memory precedent corpus indexed by situation type
//! - [`AuditSink`]: Observer for registry lookups and pipeline stages
//!
//! # Example
//!
//! ```ignore
//! use casebase::{FrameworkRegistry, FrameworkKind};
//!
//! let registry = FrameworkRegistry::with_defaults();
//! let framework = registry.resolve("Kantian Ethics");
//! assert!(framework.has_kind(FrameworkKind::Deontological));
//! ```

pub mod audit;
pub mod conflict;
pub mod framework;
pub mod precedent;
pub mod registry;
pub mod types;
pub mod validation;

// Re-export main types
pub use audit::{
    AuditEvent, AuditEventKind, AuditSink, AuditStats, MemoryAuditLog, TracingAuditSink,
};
pub use conflict::*;
pub use framework::{normalize_key, Framework, FrameworkComponent, FrameworkKind, FrameworkRef};
pub use precedent::{PrecedentBuilder, PrecedentError, PrecedentStore};
pub use registry::{
    FrameworkRegistry, FrameworkRegistryBuilder, LookupOptions, RegistryError,
    DEFAULT_MAX_SYNTHESIZED,
};
pub use types::*;
pub use validation::ValidationError;
