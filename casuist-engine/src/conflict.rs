//! Conflict detection across reasoning paths.
//!
//! Paths are compared pairwise. Each pair is put in a canonical order before
//! analysis and the final list is sorted, so detection is symmetric in the
//! order paths are supplied.

use std::sync::Arc;
use tracing::debug;

use crate::adaptation::argued_text;
use casebase::{
    Conflict, ConflictElement, ConflictType, ElementKind, Framework, FrameworkRegistry,
    ReasoningPath, Severity, StrengthLevel,
};

/// Audit location for detector lookups.
const LOCATION: &str = "conflict_detection";

/// Values that pull against each other.
pub const OPPOSING_VALUES: &[(&str, &str)] = &[
    ("rights", "utility"),
    ("autonomy", "welfare"),
    ("freedom", "safety"),
    ("privacy", "security"),
    ("individual", "collective"),
    ("duty", "consequences"),
    ("justice", "efficiency"),
    ("liberty", "equality"),
    ("life", "property"),
    ("honesty", "compassion"),
];

/// Principles that cannot both hold.
pub const EXCLUSIVE_PRINCIPLES: &[(&str, &str)] = &[
    ("ends_justify_means", "means_matter"),
    ("impartiality", "special_obligations"),
    ("rule_following", "case_by_case"),
    ("sanctity_of_life", "quality_of_life"),
    ("individual_rights", "collective_welfare"),
    ("autonomy", "paternalism"),
    ("consequences_matter", "intentions_matter"),
];

/// Conclusions that exclude each other. Anything not listed is never
/// treated as opposed.
pub const OPPOSING_ACTIONS: &[(&str, &str)] = &[
    ("pull_lever", "do_nothing"),
    ("steal_drug", "respect_law"),
    ("criteria_based_selection", "random_selection"),
    ("override_refusal", "respect_refusal"),
    ("full_implementation", "reject_implementation"),
    ("limited_implementation", "reject_implementation"),
];

/// Whether two conclusions are opposed per [`OPPOSING_ACTIONS`].
pub fn are_opposed(a: &str, b: &str) -> bool {
    OPPOSING_ACTIONS
        .iter()
        .any(|(x, y)| (a == *x && b == *y) || (a == *y && b == *x))
}

/// Snake-case form used to compare principle and priority tags.
pub fn normalize_tag(tag: &str) -> String {
    tag.trim()
        .to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("_")
}

/// A path with its resolved framework.
struct Side<'a> {
    path: &'a ReasoningPath,
    framework: Framework,
}

impl Side<'_> {
    fn key(&self) -> (&str, &str, &str) {
        (
            self.framework.id.as_str(),
            self.path.conclusion.as_str(),
            self.path.id.as_str(),
        )
    }
}

/// Scans reasoning paths for typed conflicts.
pub struct ConflictDetector {
    registry: Arc<FrameworkRegistry>,
}

impl ConflictDetector {
    /// Create a detector over a registry.
    pub fn new(registry: Arc<FrameworkRegistry>) -> Self {
        Self { registry }
    }

    /// Detect conflicts between every pair of paths.
    pub fn detect(&self, paths: &[ReasoningPath]) -> Vec<Conflict> {
        let sides: Vec<Side<'_>> = paths
            .iter()
            .map(|path| Side {
                path,
                framework: self.registry.resolve_at(&path.framework, LOCATION),
            })
            .collect();

        let mut conflicts = Vec::new();
        for i in 0..sides.len() {
            for j in (i + 1)..sides.len() {
                let (x, y) = (&sides[i], &sides[j]);
                if x.path.id == y.path.id || x.framework.id == y.framework.id {
                    continue;
                }

                let (a, b) = if x.key() <= y.key() { (x, y) } else { (y, x) };
                conflicts.extend(analyze(a, b));
            }
        }

        conflicts.sort_by(|p, q| sort_key(p).cmp(&sort_key(q)));
        debug!(paths = paths.len(), conflicts = conflicts.len(), "Conflict detection complete");
        conflicts
    }
}

fn sort_key(c: &Conflict) -> (&str, &str, &str, &str, ConflictType, &str) {
    (
        c.framework_a.id.as_str(),
        c.framework_b.id.as_str(),
        c.path_a.as_str(),
        c.path_b.as_str(),
        c.conflict_type,
        c.description.as_str(),
    )
}

fn analyze(a: &Side<'_>, b: &Side<'_>) -> Vec<Conflict> {
    if a.path.conclusion != b.path.conclusion {
        cross_action(a, b).into_iter().collect()
    } else {
        same_action(a, b)
    }
}

fn cross_action(a: &Side<'_>, b: &Side<'_>) -> Option<Conflict> {
    let opposed = are_opposed(&a.path.conclusion, &b.path.conclusion);
    let bonus = u8::from(opposed);

    let tensions = value_tensions(&a.path.argument, &b.path.argument);
    if !tensions.is_empty() {
        return Some(build(a, b, ConflictType::Value, tensions, bonus));
    }

    let exclusive = exclusive_principles(a.path.principles(), b.path.principles());
    if !exclusive.is_empty() {
        return Some(build(a, b, ConflictType::Principle, exclusive, bonus));
    }

    if opposed {
        let actions = vec![ConflictElement {
            kind: ElementKind::Action,
            side_a: a.path.conclusion.clone(),
            side_b: b.path.conclusion.clone(),
        }];
        return Some(build(a, b, ConflictType::Value, actions, bonus));
    }

    None
}

fn same_action(a: &Side<'_>, b: &Side<'_>) -> Vec<Conflict> {
    let mut found = Vec::new();

    let exclusive = exclusive_principles(a.path.principles(), b.path.principles());
    if !exclusive.is_empty() {
        found.push(build(a, b, ConflictType::Principle, exclusive, 0));
    }

    if let (Some(pa), Some(pb)) = (a.path.priorities().first(), b.path.priorities().first()) {
        if normalize_tag(pa) != normalize_tag(pb) {
            let elements = vec![ConflictElement {
                kind: ElementKind::Priority,
                side_a: pa.clone(),
                side_b: pb.clone(),
            }];
            found.push(build(a, b, ConflictType::Priority, elements, 0));
        }
    }

    if a.path.strength.steps_from(&b.path.strength) >= 2 {
        let elements = vec![ConflictElement {
            kind: ElementKind::Strength,
            side_a: a.path.strength.describe(),
            side_b: b.path.strength.describe(),
        }];
        found.push(build(a, b, ConflictType::Strength, elements, 0));
    }

    found
}

/// Base severity score per conflict type.
fn base_score(conflict_type: ConflictType) -> u8 {
    match conflict_type {
        ConflictType::Value | ConflictType::Principle | ConflictType::Strength => 2,
        ConflictType::Priority => 1,
    }
}

fn severity(a: &Side<'_>, b: &Side<'_>, conflict_type: ConflictType, bonus: u8) -> Severity {
    let both_strong = a.path.strength.level() == StrengthLevel::Strong
        && b.path.strength.level() == StrengthLevel::Strong;
    let strong_bonus = u8::from(both_strong && conflict_type != ConflictType::Strength);
    Severity::from_score(base_score(conflict_type) + bonus + strong_bonus)
}

fn build(
    a: &Side<'_>,
    b: &Side<'_>,
    conflict_type: ConflictType,
    elements: Vec<ConflictElement>,
    bonus: u8,
) -> Conflict {
    let actions = if a.path.conclusion == b.path.conclusion {
        vec![a.path.conclusion.clone()]
    } else {
        vec![a.path.conclusion.clone(), b.path.conclusion.clone()]
    };

    let contents: Vec<String> = elements
        .iter()
        .map(|e| format!("{} vs {}", e.side_a, e.side_b))
        .collect();
    let description = format!(
        "{} conflict between {} ({}) and {} ({}): {}",
        conflict_type,
        a.framework.name,
        a.path.conclusion,
        b.framework.name,
        b.path.conclusion,
        contents.join("; "),
    );

    Conflict {
        conflict_type,
        framework_a: a.framework.identity(),
        framework_b: b.framework.identity(),
        path_a: a.path.id.clone(),
        path_b: b.path.id.clone(),
        actions,
        severity: severity(a, b, conflict_type, bonus),
        conflicting_elements: elements,
        description,
    }
}

/// Lowercase words of what a path argued, in order.
fn argued_words(argument: &str) -> Vec<String> {
    argued_text(argument)
        .to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|word| !word.is_empty())
        .map(str::to_string)
        .collect()
}

fn has_phrase(words: &[String], phrase: &[&str]) -> bool {
    words
        .windows(phrase.len())
        .any(|window| window.iter().zip(phrase).all(|(w, p)| w == p))
}

fn mentions(words: &[String], value: &str) -> bool {
    words.iter().any(|w| w == value)
}

/// Whether the words rank `x` above `y` explicitly.
fn ranks_above(words: &[String], x: &str, y: &str) -> bool {
    [
        &[x, "over", y][..],
        &[x, "outweighs", y][..],
        &[x, "takes", "precedence", "over", y][..],
    ]
    .iter()
    .any(|phrase| has_phrase(words, phrase))
}

/// Whether an argument favors `x` over its opposite `y`.
fn favors(words: &[String], x: &str, y: &str) -> bool {
    if ranks_above(words, x, y) {
        return true;
    }
    !ranks_above(words, y, x) && mentions(words, x) && !mentions(words, y)
}

fn value_tensions(argument_a: &str, argument_b: &str) -> Vec<ConflictElement> {
    let (wa, wb) = (argued_words(argument_a), argued_words(argument_b));

    OPPOSING_VALUES
        .iter()
        .filter_map(|(x, y)| {
            if favors(&wa, x, y) && favors(&wb, y, x) {
                Some((*x, *y))
            } else if favors(&wa, y, x) && favors(&wb, x, y) {
                Some((*y, *x))
            } else {
                None
            }
        })
        .map(|(va, vb)| ConflictElement {
            kind: ElementKind::Value,
            side_a: va.to_string(),
            side_b: vb.to_string(),
        })
        .collect()
}

fn exclusive_principles(principles_a: &[String], principles_b: &[String]) -> Vec<ConflictElement> {
    let na: Vec<String> = principles_a.iter().map(|p| normalize_tag(p)).collect();
    let nb: Vec<String> = principles_b.iter().map(|p| normalize_tag(p)).collect();
    let has = |list: &[String], tag: &str| list.iter().any(|p| p == tag);

    EXCLUSIVE_PRINCIPLES
        .iter()
        .filter_map(|(p, q)| {
            if has(&na, p) && has(&nb, q) {
                Some((*p, *q))
            } else if has(&na, q) && has(&nb, p) {
                Some((*q, *p))
            } else {
                None
            }
        })
        .map(|(pa, pb)| ConflictElement {
            kind: ElementKind::Principle,
            side_a: pa.to_string(),
            side_b: pb.to_string(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use casebase::SourceElements;

    fn detector() -> ConflictDetector {
        ConflictDetector::new(Arc::new(FrameworkRegistry::with_defaults()))
    }

    fn path(
        id: &str,
        framework: &str,
        conclusion: &str,
        level: StrengthLevel,
        argument: &str,
    ) -> ReasoningPath {
        ReasoningPath::new(id, framework, conclusion, level, argument)
    }

    fn moderate(id: &str, framework: &str, conclusion: &str, argument: &str) -> ReasoningPath {
        path(id, framework, conclusion, StrengthLevel::Moderate, argument)
    }

    fn surveillance() -> Vec<ReasoningPath> {
        vec![
            path(
                "u",
                "Utilitarianism",
                "deploy_surveillance",
                StrengthLevel::Strong,
                "Surveillance maximizes overall utility by preventing crime.",
            ),
            path(
                "r",
                "Rights-Based-Ethics",
                "reject_surveillance",
                StrengthLevel::Strong,
                "Citizens hold rights that mass monitoring violates.",
            ),
        ]
    }

    #[test]
    fn test_value_conflict_from_keyword_tension() {
        let conflicts = detector().detect(&surveillance());

        assert_eq!(conflicts.len(), 1);
        let conflict = &conflicts[0];
        assert_eq!(conflict.conflict_type, ConflictType::Value);
        assert_eq!(conflict.framework_a.id, "rights_based_ethics");
        assert_eq!(conflict.framework_b.id, "utilitarianism");
        assert_eq!(conflict.actions, vec!["reject_surveillance", "deploy_surveillance"]);
        assert_eq!(conflict.conflicting_elements[0].side_a, "rights");
        assert_eq!(conflict.conflicting_elements[0].side_b, "utility");
        assert_eq!(conflict.severity, Severity::High);
    }

    #[test]
    fn test_detection_is_symmetric() {
        let forward = detector().detect(&surveillance());
        let mut reversed_paths = surveillance();
        reversed_paths.reverse();
        let reversed = detector().detect(&reversed_paths);

        assert_eq!(forward, reversed);
    }

    #[test]
    fn test_never_pairs_a_path_with_itself_or_its_framework() {
        let paths = vec![
            path("a", "Utilitarianism", "pull_lever", StrengthLevel::Strong, "utility"),
            path("a", "Deontology", "do_nothing", StrengthLevel::Strong, "duty"),
            path("b", "Utilitarian", "do_nothing", StrengthLevel::Weak, "rights"),
        ];
        let conflicts = detector().detect(&paths);

        // Only (Deontology a) vs (Utilitarian b) is compared
        assert_eq!(conflicts.len(), 1);
        assert_eq!(conflicts[0].conflict_type, ConflictType::Strength);
        assert!(conflicts.iter().all(|c| c.path_a != c.path_b));
        assert!(conflicts
            .iter()
            .all(|c| c.framework_a.id != c.framework_b.id));
    }

    #[test]
    fn test_ranking_phrase_overrides_mentions() {
        let paths = vec![
            moderate(
                "u",
                "Utilitarianism",
                "lock_down",
                "Here safety takes precedence over freedom.",
            ),
            moderate("v", "Virtue Ethics", "stay_open", "Courage prizes freedom over safety."),
        ];
        let conflicts = detector().detect(&paths);

        assert_eq!(conflicts.len(), 1);
        assert_eq!(conflicts[0].conflict_type, ConflictType::Value);
        assert_eq!(conflicts[0].severity, Severity::Medium);
    }

    #[test]
    fn test_opposed_actions_without_tension() {
        let paths = vec![
            moderate("u", "Utilitarianism", "pull_lever", "Five is more than one."),
            moderate("d", "Deontology", "do_nothing", "Killing is wrong."),
        ];
        let conflicts = detector().detect(&paths);

        assert_eq!(conflicts.len(), 1);
        assert_eq!(conflicts[0].conflicting_elements[0].kind, ElementKind::Action);
        // Base 2 plus the opposed-action bonus
        assert_eq!(conflicts[0].severity, Severity::High);
    }

    #[test]
    fn test_unlisted_conclusions_are_not_opposed() {
        let paths = vec![
            moderate("u", "Utilitarianism", "go_left", "Fewer harmed."),
            moderate("d", "Deontology", "go_right", "No one targeted."),
        ];
        assert!(detector().detect(&paths).is_empty());
        assert!(are_opposed("do_nothing", "pull_lever"));
        assert!(!are_opposed("go_left", "go_right"));
    }

    #[test]
    fn test_cross_action_principle_conflict() {
        let util = moderate("u", "Utilitarianism", "sacrifice", "").with_elements(SourceElements {
            principles: vec!["Ends Justify Means".to_string()],
            ..Default::default()
        });
        let kant = moderate("k", "Kantian Ethics", "refuse", "").with_elements(SourceElements {
            principles: vec!["means-matter".to_string()],
            ..Default::default()
        });
        let conflicts = detector().detect(&[util, kant]);

        assert_eq!(conflicts.len(), 1);
        assert_eq!(conflicts[0].conflict_type, ConflictType::Principle);
        assert_eq!(conflicts[0].framework_a.id, "deontology");
        assert_eq!(conflicts[0].conflicting_elements[0].side_a, "means_matter");
    }

    #[test]
    fn test_same_action_conflicts() {
        let care = path("c", "Care Ethics", "treat_patient", StrengthLevel::Strong, "")
            .with_elements(SourceElements {
                principles: vec!["special_obligations".to_string()],
                priorities: vec!["relationships".to_string(), "wellbeing".to_string()],
                ..Default::default()
            });
        let justice = path("j", "Justice Ethics", "treat_patient", StrengthLevel::Weak, "")
            .with_elements(SourceElements {
                principles: vec!["impartiality".to_string()],
                priorities: vec!["fairness".to_string()],
                ..Default::default()
            });
        let conflicts = detector().detect(&[care, justice]);

        let types: Vec<ConflictType> = conflicts.iter().map(|c| c.conflict_type).collect();
        assert_eq!(
            types,
            vec![ConflictType::Principle, ConflictType::Priority, ConflictType::Strength]
        );
        assert!(conflicts.iter().all(|c| c.actions == vec!["treat_patient"]));

        let priority = &conflicts[1];
        assert_eq!(priority.severity, Severity::Low);
    }

    #[test]
    fn test_values_match_whole_words_only() {
        let paths = vec![
            moderate("c", "Care Ethics", "launch_boat", "Launch the lifeboat now."),
            moderate("d", "Deontology", "guard_cargo", "Guard the property entrusted to you."),
        ];
        assert!(detector().detect(&paths).is_empty());
    }

    #[test]
    fn test_provenance_and_rule_paragraphs_are_not_argued() {
        let paths = vec![
            moderate(
                "c",
                "Care Ethics",
                "comfort_friend",
                "Attend to the friend.\n\n\
                 [Adapted from precedent \"Saving A Life\" (rescue) for \"Now\".]",
            ),
            moderate(
                "d",
                "Deontology",
                "keep_promise",
                "Keep your word.\n\n\
                 Adaptation (property_value): property value changed from 1 to 2; \
                 property at stake is greater. \
                 This strengthens the conclusion for Deontology reasoning.",
            ),
        ];
        assert!(detector().detect(&paths).is_empty());

        // The same words inside the argued body still count
        let argued = vec![
            moderate("c", "Care Ethics", "comfort_friend", "A life is at stake."),
            moderate("d", "Deontology", "keep_promise", "Respect their property."),
        ];
        let conflicts = detector().detect(&argued);
        assert_eq!(conflicts.len(), 1);
        assert_eq!(conflicts[0].conflicting_elements[0].side_a, "life");
    }

    #[test]
    fn test_normalize_tag() {
        assert_eq!(normalize_tag("Sanctity of Life"), "sanctity_of_life");
        assert_eq!(normalize_tag(" rule-following "), "rule_following");
    }
}
