//! Canonical framework identity records.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

#[cfg(feature = "typescript")]
use ts_rs::TS;

use crate::registry::RegistryError;

/// Family of ethical reasoning a framework belongs to.
///
/// Attached once when a record is registered or synthesized, so adaptation
/// rules switch on the tag instead of re-reading framework names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
#[serde(rename_all = "snake_case")]
pub enum FrameworkKind {
    Utilitarian,
    Deontological,
    Virtue,
    Care,
    RightsBased,
    NaturalLaw,
    Justice,
    Contractarian,
    Hybrid,
    Other,
}

impl FrameworkKind {
    /// Infer the leading kind from free text using substring cues.
    pub fn infer(text: &str) -> Self {
        Self::infer_all(text)
            .into_iter()
            .next()
            .unwrap_or(Self::Other)
    }

    /// Every kind whose cue appears in `text`, in precedence order.
    ///
    /// Empty when nothing matches.
    pub fn infer_all(text: &str) -> Vec<Self> {
        let lower = text.to_lowercase();
        let cues: [(Self, bool); 8] = [
            (Self::Utilitarian, lower.contains("utilitarian")),
            (Self::NaturalLaw, lower.contains("natural") && lower.contains("law")),
            (
                Self::Deontological,
                lower.contains("deontolog") || lower.contains("kantian"),
            ),
            (Self::Care, lower.contains("care")),
            (Self::Virtue, lower.contains("virtue")),
            (Self::RightsBased, lower.contains("right")),
            (Self::Justice, lower.contains("justice") || lower.contains("fair")),
            (Self::Contractarian, lower.contains("contract")),
        ];
        cues.into_iter()
            .filter_map(|(kind, matched)| matched.then_some(kind))
            .collect()
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Utilitarian => "utilitarian",
            Self::Deontological => "deontological",
            Self::Virtue => "virtue",
            Self::Care => "care",
            Self::RightsBased => "rights_based",
            Self::NaturalLaw => "natural_law",
            Self::Justice => "justice",
            Self::Contractarian => "contractarian",
            Self::Hybrid => "hybrid",
            Self::Other => "other",
        }
    }
}

/// A constituent of a hybrid framework.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
#[serde(rename_all = "snake_case")]
pub enum FrameworkComponent {
    /// Component that resolved to a registered record
    Canonical(Framework),
    /// Component text that matched nothing
    Raw(String),
}

impl FrameworkComponent {
    pub fn id(&self) -> String {
        match self {
            Self::Canonical(framework) => framework.id.clone(),
            Self::Raw(text) => normalize_key(text),
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Self::Canonical(framework) => &framework.name,
            Self::Raw(text) => text,
        }
    }

    pub fn has_kind(&self, kind: FrameworkKind) -> bool {
        match self {
            Self::Canonical(framework) => framework.has_kind(kind),
            Self::Raw(text) => FrameworkKind::infer_all(text).contains(&kind),
        }
    }
}

/// A named ethical viewpoint with a canonical identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
pub struct Framework {
    /// Stable snake_case key, the comparison key across components
    pub id: String,
    /// Display form
    pub name: String,
    /// Equivalent spellings
    pub aliases: BTreeSet<String>,
    /// Reasoning family
    pub kind: FrameworkKind,
    /// Further families cued by an unknown record's name
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub also_kinds: Vec<FrameworkKind>,
    pub is_hybrid: bool,
    pub is_unknown: bool,
    /// Ordered constituents, only for hybrids
    pub components: Vec<FrameworkComponent>,
}

impl Framework {
    /// Create a canonical record.
    ///
    /// A record without an id or name is a programming error and is rejected here.
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        kind: FrameworkKind,
    ) -> Result<Self, RegistryError> {
        let id = id.into();
        let name = name.into();
        if id.trim().is_empty() || name.trim().is_empty() {
            return Err(RegistryError::InvalidFramework(format!(
                "framework requires an id and a name (id: {:?}, name: {:?})",
                id, name
            )));
        }

        Ok(Self {
            id,
            name,
            aliases: BTreeSet::new(),
            kind,
            also_kinds: Vec::new(),
            is_hybrid: false,
            is_unknown: false,
            components: Vec::new(),
        })
    }

    /// Builder: add an alias.
    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.aliases.insert(alias.into());
        self
    }

    /// Builtin record from static data.
    pub(crate) fn builtin(id: &str, name: &str, kind: FrameworkKind, aliases: &[&str]) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            aliases: aliases.iter().map(|a| a.to_string()).collect(),
            kind,
            also_kinds: Vec::new(),
            is_hybrid: false,
            is_unknown: false,
            components: Vec::new(),
        }
    }

    /// Composite record for a hybrid name.
    pub(crate) fn hybrid(components: Vec<FrameworkComponent>) -> Self {
        let ids: Vec<String> = components.iter().map(FrameworkComponent::id).collect();
        let names: Vec<&str> = components.iter().map(FrameworkComponent::name).collect();

        Self {
            id: format!("hybrid:{}", ids.join("+")),
            name: format!("Hybrid: {}", names.join(" + ")),
            aliases: BTreeSet::new(),
            kind: FrameworkKind::Hybrid,
            also_kinds: Vec::new(),
            is_hybrid: true,
            is_unknown: false,
            components,
        }
    }

    /// Placeholder record carrying the caller's text as display name.
    pub(crate) fn unknown(text: &str) -> Self {
        let display = match text.trim() {
            "" => "Unknown",
            trimmed => trimmed,
        };

        let mut kinds = FrameworkKind::infer_all(display).into_iter();
        let kind = kinds.next().unwrap_or(FrameworkKind::Other);

        Self {
            id: format!("unknown:{}", normalize_key(display)),
            name: display.to_string(),
            aliases: BTreeSet::new(),
            kind,
            also_kinds: kinds.collect(),
            is_hybrid: false,
            is_unknown: true,
            components: Vec::new(),
        }
    }

    /// Whether this record, or any hybrid component, is of `kind`.
    pub fn has_kind(&self, kind: FrameworkKind) -> bool {
        self.kind == kind
            || self.also_kinds.contains(&kind)
            || self.components.iter().any(|c| c.has_kind(kind))
    }

    /// All exact lookup keys: name, id and aliases.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.name.as_str())
            .chain(std::iter::once(self.id.as_str()))
            .chain(self.aliases.iter().map(String::as_str))
    }

    /// Lightweight identity used in conflict records.
    pub fn identity(&self) -> FrameworkRef {
        FrameworkRef {
            id: self.id.clone(),
            name: self.name.clone(),
        }
    }
}

/// Canonical id and display name of a framework.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
pub struct FrameworkRef {
    pub id: String,
    pub name: String,
}

/// Normalized lookup key: lowercase with `-`, `_` and whitespace removed.
pub fn normalize_key(text: &str) -> String {
    text.chars()
        .filter(|c| !(c.is_whitespace() || *c == '-' || *c == '_'))
        .flat_map(char::to_lowercase)
        .collect()
}
