//! Argument rewriting for adapted paths.
//!
//! Replaces references to the precedent with references to the new dilemma
//! in a single left-to-right scan, then appends a provenance line.

use std::collections::HashMap;

use casebase::{Dilemma, ReasoningPath};

/// Generic phrases that always point at the current dilemma.
const GENERIC_PHRASES: &[&str] = &["this dilemma", "the dilemma"];

/// Opening of the provenance note appended to rewritten arguments.
pub(crate) const PROVENANCE_PREFIX: &str = "[Adapted from precedent ";

/// Rewrites argument prose from a precedent's vocabulary to a new dilemma's.
#[derive(Debug, Clone)]
pub struct ArgumentRewriter {
    /// (precedent id, new situation type) -> (term, replacement)
    synonyms: HashMap<(String, String), Vec<(String, String)>>,
}

impl ArgumentRewriter {
    /// Rewriter with the builtin synonym table.
    pub fn new() -> Self {
        Self::empty()
            .with_synonyms(
                "trolley_problem",
                "autonomous_vehicle",
                &[
                    ("trolley", "vehicle"),
                    ("lever", "steering decision"),
                    ("track", "lane"),
                ],
            )
            .with_synonyms(
                "heinz_dilemma",
                "resource_allocation",
                &[
                    ("drug", "resource"),
                    ("druggist", "supplier"),
                    ("steal", "appropriate"),
                ],
            )
    }

    /// Rewriter with no synonym entries.
    pub fn empty() -> Self {
        Self {
            synonyms: HashMap::new(),
        }
    }

    /// Builder: add synonyms for a precedent adapted to a situation type.
    pub fn with_synonyms(
        mut self,
        precedent_id: &str,
        situation_type: &str,
        pairs: &[(&str, &str)],
    ) -> Self {
        self.synonyms
            .entry((precedent_id.to_string(), situation_type.to_string()))
            .or_default()
            .extend(pairs.iter().map(|(t, r)| (t.to_string(), r.to_string())));
        self
    }

    /// New path whose argument speaks about `dilemma` instead of `precedent`.
    pub fn rewrite(
        &self,
        path: &ReasoningPath,
        precedent: &Dilemma,
        dilemma: &Dilemma,
    ) -> ReasoningPath {
        let mut rewritten = path.clone();
        rewritten.argument = self.rewrite_text(&path.argument, precedent, dilemma);
        rewritten
    }

    /// Rewrite a text and append the provenance suffix.
    pub fn rewrite_text(&self, text: &str, precedent: &Dilemma, dilemma: &Dilemma) -> String {
        let mut terms: Vec<(String, String)> = Vec::new();
        terms.push((precedent.title.clone(), dilemma.title.clone()));
        terms.extend(
            GENERIC_PHRASES
                .iter()
                .map(|p| (p.to_string(), dilemma.title.clone())),
        );
        if let Some(pairs) = self
            .synonyms
            .get(&(precedent.id.clone(), dilemma.situation.situation_type.clone()))
        {
            terms.extend(pairs.iter().cloned());
        }

        let mut out = substitute(text, &terms);
        out.push_str(&format!(
            "\n\n{}\"{}\" ({}) for \"{}\".]",
            PROVENANCE_PREFIX, precedent.title, precedent.id, dilemma.title
        ));
        out
    }
}

impl Default for ArgumentRewriter {
    fn default() -> Self {
        Self::new()
    }
}

fn is_word(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

fn same_letter(a: char, b: char) -> bool {
    a == b || a.to_lowercase().eq(b.to_lowercase())
}

/// Whether `term` matches at `start` as a whole word.
fn matches_at(chars: &[char], start: usize, term: &[char]) -> bool {
    let end = start + term.len();
    if term.is_empty() || end > chars.len() {
        return false;
    }
    if !chars[start..end]
        .iter()
        .zip(term)
        .all(|(a, b)| same_letter(*a, *b))
    {
        return false;
    }

    let opens = !is_word(term[0]) || start == 0 || !is_word(chars[start - 1]);
    let closes = !is_word(term[term.len() - 1]) || end == chars.len() || !is_word(chars[end]);
    opens && closes
}

/// Longest-match-first substitution; replaced text is never rescanned.
fn substitute(text: &str, terms: &[(String, String)]) -> String {
    let mut terms: Vec<(Vec<char>, &str)> = terms
        .iter()
        .filter(|(term, _)| !term.trim().is_empty())
        .map(|(term, replacement)| (term.chars().collect(), replacement.as_str()))
        .collect();
    terms.sort_by(|a, b| b.0.len().cmp(&a.0.len()));

    let chars: Vec<char> = text.chars().collect();
    let mut out = String::with_capacity(text.len());
    let mut i = 0;
    while i < chars.len() {
        let found = terms
            .iter()
            .find(|(term, _)| matches_at(&chars, i, term))
            .map(|(term, replacement)| (term.len(), *replacement));

        match found {
            Some((len, replacement)) => {
                out.push_str(replacement);
                i += len;
            }
            None => {
                out.push(chars[i]);
                i += 1;
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn trolley() -> Dilemma {
        Dilemma::new("trolley_problem", "The Trolley Problem").with_type("trolley_problem")
    }

    fn vehicle() -> Dilemma {
        Dilemma::new("av_crash", "Autonomous Vehicle Crash").with_type("autonomous_vehicle")
    }

    #[test]
    fn test_title_and_generic_phrases() {
        let rewriter = ArgumentRewriter::empty();
        let out = rewriter.rewrite_text(
            "In the trolley problem, as in this dilemma, THE DILEMMA is stark.",
            &trolley(),
            &vehicle(),
        );
        assert!(out.starts_with(
            "In Autonomous Vehicle Crash, as in Autonomous Vehicle Crash, \
             Autonomous Vehicle Crash is stark."
        ));
        assert!(out.ends_with(
            "\n\n[Adapted from precedent \"The Trolley Problem\" (trolley_problem) \
             for \"Autonomous Vehicle Crash\".]"
        ));
    }

    #[test]
    fn test_synonyms_are_whole_word_and_not_rescanned() {
        let rewriter = ArgumentRewriter::new();
        let out = rewriter.rewrite_text(
            "Pulling the lever moves the trolley to the side track; trolleys and racetracks stay.",
            &trolley(),
            &vehicle(),
        );
        assert!(out.starts_with(
            "Pulling the steering decision moves the vehicle to the side lane; \
             trolleys and racetracks stay."
        ));
    }

    #[test]
    fn test_replacement_text_is_not_substituted_again() {
        // "drug" -> "resource" must not then match anything; "druggist" wins over "drug"
        let heinz = Dilemma::new("heinz_dilemma", "Heinz").with_type("heinz");
        let allocation =
            Dilemma::new("ventilators", "Ventilators").with_type("resource_allocation");
        let out = ArgumentRewriter::new()
            .with_synonyms("heinz_dilemma", "resource_allocation", &[("resource", "asset")])
            .rewrite_text(
                "The druggist would not sell the drug, so Heinz may steal it.",
                &heinz,
                &allocation,
            );

        assert!(out.starts_with(
            "The supplier would not sell the resource, so Ventilators may appropriate it."
        ));
    }

    #[test]
    fn test_synonyms_require_matching_situation_type() {
        let other = Dilemma::new("x", "Something Else").with_type("medical");
        let out = ArgumentRewriter::new().rewrite_text("The lever decides.", &trolley(), &other);
        assert!(out.starts_with("The lever decides."));
    }

    #[test]
    fn test_rewrite_returns_new_path() {
        let path = ReasoningPath::new(
            "p",
            "Utilitarianism",
            "pull_lever",
            casebase::StrengthLevel::Strong,
            "this dilemma",
        );
        let rewritten = ArgumentRewriter::new().rewrite(&path, &trolley(), &vehicle());

        assert_eq!(path.argument, "this dilemma");
        assert!(rewritten.argument.starts_with("Autonomous Vehicle Crash\n\n[Adapted"));
        assert_eq!(rewritten.conclusion, path.conclusion);
    }
}
