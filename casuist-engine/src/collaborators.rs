//! External collaborators of the pipeline.
//!
//! Similarity scoring and synthetic path generation are black boxes to the
//! engine. They are async so that implementations backed by a model or a
//! remote index fit behind the same seam; the defaults here are pure.

use async_trait::async_trait;
use std::collections::BTreeSet;

use casebase::{Dilemma, Precedent, ReasoningPath, StrengthLevel};

use crate::types::ScorerError;

/// Scores how similar two texts are.
#[async_trait]
pub trait SimilarityScorer: Send + Sync {
    /// Similarity in [0, 1].
    async fn similarity(&self, a: &str, b: &str) -> Result<f64, ScorerError>;
}

/// Produces reasoning paths when no precedent can be adapted.
#[async_trait]
pub trait SyntheticPathGenerator: Send + Sync {
    /// Generate paths for `dilemma`. Returns `[]` rather than failing.
    async fn generate(&self, dilemma: &Dilemma, candidates: &[Precedent]) -> Vec<ReasoningPath>;
}

const STOPWORDS: &[&str] = &[
    "a", "an", "and", "are", "as", "at", "be", "by", "for", "from", "has", "have", "in", "is",
    "it", "its", "of", "on", "or", "that", "the", "their", "this", "to", "was", "were", "which",
    "with",
];

/// Jaccard overlap of lowercase word sets, stopwords removed.
#[derive(Debug, Default, Clone, Copy)]
pub struct KeywordSimilarity;

impl KeywordSimilarity {
    fn words(text: &str) -> BTreeSet<String> {
        text.to_lowercase()
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty() && !STOPWORDS.contains(w))
            .map(str::to_string)
            .collect()
    }

    /// Synchronous score, shared by the async impl.
    pub fn score(a: &str, b: &str) -> f64 {
        let (wa, wb) = (Self::words(a), Self::words(b));
        let union = wa.union(&wb).count();
        if union == 0 {
            return 0.0;
        }
        wa.intersection(&wb).count() as f64 / union as f64
    }
}

#[async_trait]
impl SimilarityScorer for KeywordSimilarity {
    async fn similarity(&self, a: &str, b: &str) -> Result<f64, ScorerError> {
        Ok(Self::score(a, b))
    }
}

/// Weak template paths from three reference frameworks.
#[derive(Debug, Default, Clone, Copy)]
pub struct TemplatePathGenerator;

impl TemplatePathGenerator {
    const TEMPLATES: [(&'static str, &'static str); 3] = [
        (
            "Utilitarianism",
            "Choosing '{action}' is assessed by its expected consequences \
             for everyone affected by {title}.",
        ),
        (
            "Deontology",
            "Choosing '{action}' is assessed by whether it respects the duties \
             and constraints that apply in {title}.",
        ),
        (
            "Care Ethics",
            "Choosing '{action}' is assessed by how it sustains the relationships \
             and needs of those involved in {title}.",
        ),
    ];
}

#[async_trait]
impl SyntheticPathGenerator for TemplatePathGenerator {
    async fn generate(&self, dilemma: &Dilemma, candidates: &[Precedent]) -> Vec<ReasoningPath> {
        let Some(first) = dilemma.possible_actions.first() else {
            return Vec::new();
        };

        let mut note =
            String::from("No sufficiently similar precedent was found; this path is a template.");
        if !candidates.is_empty() {
            let titles: Vec<&str> = candidates.iter().map(|c| c.title()).collect();
            note.push_str(&format!(" Nearest precedents considered: {}.", titles.join(", ")));
        }

        Self::TEMPLATES
            .iter()
            .enumerate()
            .map(|(i, (framework, template))| {
                let action = dilemma
                    .possible_actions
                    .get(i)
                    .unwrap_or(first)
                    .action
                    .clone();
                let argument = format!(
                    "{}\n\n{}",
                    template
                        .replace("{action}", &action)
                        .replace("{title}", &dilemma.title),
                    note
                );
                ReasoningPath::new(
                    format!("synthetic:{}", i + 1),
                    *framework,
                    action,
                    StrengthLevel::Weak,
                    argument,
                )
                .synthetic()
            })
            .collect()
    }
}
