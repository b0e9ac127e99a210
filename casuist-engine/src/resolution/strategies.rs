//! Builtin resolution strategies.

use std::collections::BTreeSet;
use std::sync::Arc;

use casebase::{
    Conflict, Dilemma, FrameworkKind, FrameworkRegistry, ReasoningPath, ResolutionContent,
    Strength, StrengthLevel,
};
use serde_json::Value;

use super::ResolutionStrategy;
use crate::types::StrategyError;

/// Audit location for strategy lookups.
const LOCATION: &str = "conflict_resolution";

/// Action used by `balance` when the paths disagree.
pub const BALANCED_ACTION: &str = "balanced_approach";

/// Stakeholder terms and the framework kinds they make salient.
pub const STAKEHOLDER_TERMS: &[(&str, &[FrameworkKind])] = &[
    ("patient", &[FrameworkKind::Care]),
    ("family", &[FrameworkKind::Care]),
    ("child", &[FrameworkKind::Care]),
    ("children", &[FrameworkKind::Care]),
    ("friend", &[FrameworkKind::Care]),
    ("vulnerable", &[FrameworkKind::Care]),
    ("public", &[FrameworkKind::Utilitarian, FrameworkKind::Justice]),
    ("community", &[FrameworkKind::Utilitarian, FrameworkKind::Justice]),
    ("society", &[FrameworkKind::Utilitarian, FrameworkKind::Justice]),
    ("citizens", &[FrameworkKind::Utilitarian, FrameworkKind::Justice]),
    ("population", &[FrameworkKind::Utilitarian, FrameworkKind::Justice]),
    ("passengers", &[FrameworkKind::Utilitarian, FrameworkKind::Justice]),
    ("individual", &[FrameworkKind::RightsBased, FrameworkKind::Deontological]),
    ("privacy", &[FrameworkKind::RightsBased, FrameworkKind::Deontological]),
    ("consent", &[FrameworkKind::RightsBased, FrameworkKind::Deontological]),
    ("employees", &[FrameworkKind::RightsBased, FrameworkKind::Deontological]),
    ("workers", &[FrameworkKind::RightsBased, FrameworkKind::Deontological]),
    ("owner", &[FrameworkKind::Deontological, FrameworkKind::NaturalLaw]),
    ("property", &[FrameworkKind::Deontological, FrameworkKind::NaturalLaw]),
    ("law", &[FrameworkKind::Deontological, FrameworkKind::NaturalLaw]),
];

fn names(conflict: &Conflict) -> (&str, &str) {
    (&conflict.framework_a.name, &conflict.framework_b.name)
}

fn originals(conflict: &Conflict) -> Vec<String> {
    vec![
        conflict.framework_a.name.clone(),
        conflict.framework_b.name.clone(),
    ]
}

fn shared_action<'a>(a: &'a ReasoningPath, b: &'a ReasoningPath) -> Option<&'a str> {
    (a.conclusion == b.conclusion).then_some(a.conclusion.as_str())
}

fn content(
    conflict: &Conflict,
    strategy: &str,
    framework: String,
    action: String,
    strength: Strength,
    argument: String,
    description: String,
) -> ResolutionContent {
    ResolutionContent {
        framework,
        action,
        strength,
        argument,
        original_frameworks: originals(conflict),
        conflict_type: conflict.conflict_type,
        resolution_strategy: strategy.to_string(),
        resolution_description: description,
    }
}

fn render_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Bool(true) => "yes".to_string(),
        Value::Bool(false) => "no".to_string(),
        Value::Array(items) => items.iter().map(render_value).collect::<Vec<_>>().join(", "),
        Value::Null => "unspecified".to_string(),
        other => other.to_string(),
    }
}

fn scale_remark(n: f64) -> &'static str {
    if (0.0..1.0).contains(&n) && n.fract() != 0.0 {
        "a proportion"
    } else if n >= 100.0 {
        "large in scale"
    } else if n >= 10.0 {
        "moderate in scale"
    } else {
        "small in scale"
    }
}

/// Weighs both frameworks and recommends a balanced course. Neither side wins.
pub struct BalanceStrategy;

impl BalanceStrategy {
    fn contextual_analysis(dilemma: &Dilemma) -> String {
        let mut lines: Vec<String> = dilemma
            .situation
            .parameters
            .iter()
            .map(|(name, parameter)| match &parameter.value {
                Value::Number(n) => {
                    let remark = n.as_f64().map(scale_remark).unwrap_or("numeric");
                    format!("- {}: {} ({})", name, n, remark)
                }
                other => format!("- {}: {}", name, render_value(other)),
            })
            .collect();
        lines.extend(
            dilemma
                .situation
                .contextual_factors
                .iter()
                .map(|f| format!("- Contextual factor: {}", f)),
        );

        if lines.is_empty() {
            "No situational parameters were provided.".to_string()
        } else {
            lines.join("\n")
        }
    }
}

impl ResolutionStrategy for BalanceStrategy {
    fn name(&self) -> &'static str {
        "balance"
    }

    fn resolve(
        &self,
        conflict: &Conflict,
        a: &ReasoningPath,
        b: &ReasoningPath,
        dilemma: &Dilemma,
    ) -> Result<Option<ResolutionContent>, StrategyError> {
        let (name_a, name_b) = names(conflict);
        let shared = shared_action(a, b);
        let action = shared.unwrap_or(BALANCED_ACTION).to_string();

        let mut tension = conflict.description.clone();
        for element in &conflict.conflicting_elements {
            tension.push_str(&format!(
                "\n- {} ({}) against {} ({})",
                element.side_a, name_a, element.side_b, name_b
            ));
        }

        let recommendation = match shared {
            Some(action) => format!(
                "Neither {} nor {} prevails outright. Both support '{}', so the synthesis \
                 adopts it while keeping the concerns each raises in view.",
                name_a, name_b, action
            ),
            None => format!(
                "Neither {} nor {} prevails outright. Rather than choosing between '{}' and '{}', \
                 the synthesis recommends a balanced approach that secures the core concern \
                 of each framework as far as the situation allows.",
                name_a, name_b, a.conclusion, b.conclusion
            ),
        };

        let argument = format!(
            "## Values in Tension\n{}\n\n\
             ## {} Perspective\n{} recommends '{}' with {} confidence.\n{}\n\n\
             ## {} Perspective\n{} recommends '{}' with {} confidence.\n{}\n\n\
             ## Contextual Analysis\n{}\n\n\
             ## Synthesized Recommendation\n{}",
            tension,
            name_a,
            name_a,
            a.conclusion,
            a.strength.describe(),
            a.argument,
            name_b,
            name_b,
            b.conclusion,
            b.strength.describe(),
            b.argument,
            Self::contextual_analysis(dilemma),
            recommendation,
        );

        Ok(Some(content(
            conflict,
            self.name(),
            format!("Balanced Synthesis: {} + {}", name_a, name_b),
            action,
            Strength::Level(StrengthLevel::Moderate),
            argument,
            format!(
                "Balanced the {} conflict between {} and {}",
                conflict.conflict_type, name_a, name_b
            ),
        )))
    }
}

/// Prefers the framework whose values matter most to the dilemma's stakeholders.
pub struct StakeholderStrategy {
    registry: Arc<FrameworkRegistry>,
}

impl StakeholderStrategy {
    pub fn new(registry: Arc<FrameworkRegistry>) -> Self {
        Self { registry }
    }

    /// Lowercase words describing who the dilemma affects.
    fn stakeholder_words(dilemma: &Dilemma) -> BTreeSet<String> {
        let mut texts: Vec<String> = vec![dilemma.title.clone(), dilemma.description.clone()];
        texts.extend(dilemma.situation.contextual_factors.iter().cloned());
        for (name, parameter) in &dilemma.situation.parameters {
            texts.push(name.clone());
            texts.push(parameter.description.clone());
            match &parameter.value {
                Value::String(_) | Value::Array(_) => texts.push(render_value(&parameter.value)),
                _ => {}
            }
        }

        texts
            .iter()
            .flat_map(|t| {
                t.to_lowercase()
                    .split(|c: char| !c.is_alphanumeric())
                    .filter(|w| !w.is_empty())
                    .map(str::to_string)
                    .collect::<Vec<_>>()
            })
            .collect()
    }

    fn score(&self, path: &ReasoningPath, terms: &[&'static str]) -> usize {
        let framework = self.registry.resolve_at(&path.framework, LOCATION);
        STAKEHOLDER_TERMS
            .iter()
            .filter(|(term, _)| terms.contains(term))
            .filter(|(_, kinds)| kinds.iter().any(|k| framework.has_kind(*k)))
            .count()
    }
}

impl ResolutionStrategy for StakeholderStrategy {
    fn name(&self) -> &'static str {
        "stakeholder"
    }

    fn resolve(
        &self,
        conflict: &Conflict,
        a: &ReasoningPath,
        b: &ReasoningPath,
        dilemma: &Dilemma,
    ) -> Result<Option<ResolutionContent>, StrategyError> {
        let words = Self::stakeholder_words(dilemma);
        let terms: Vec<&'static str> = STAKEHOLDER_TERMS
            .iter()
            .map(|(term, _)| *term)
            .filter(|term| words.contains(*term))
            .collect();

        let (score_a, score_b) = (self.score(a, &terms), self.score(b, &terms));
        let (name_a, name_b) = names(conflict);
        let (winner, winner_name, loser_name) = match score_a.cmp(&score_b) {
            std::cmp::Ordering::Greater => (a, name_a, name_b),
            std::cmp::Ordering::Less => (b, name_b, name_a),
            std::cmp::Ordering::Equal => return Ok(None),
        };

        let argument = format!(
            "The stakeholders in this situation ({}) make the values of {} most salient \
             ({} against {}). Its recommendation '{}' is therefore preferred \
             over that of {}.\n\n{}",
            terms.join(", "),
            winner_name,
            score_a.max(score_b),
            score_a.min(score_b),
            winner.conclusion,
            loser_name,
            winner.argument,
        );

        Ok(Some(content(
            conflict,
            self.name(),
            format!("Stakeholder Priority: {}", winner_name),
            winner.conclusion.clone(),
            winner.strength,
            argument,
            format!("Resolved in favour of {} by stakeholder salience", winner_name),
        )))
    }
}

/// Recommends a middle-ground action.
pub struct CompromiseStrategy;

impl CompromiseStrategy {
    fn averaged(a: &Strength, b: &Strength) -> Strength {
        match (a, b) {
            (Strength::Score(x), Strength::Score(y)) => Strength::Score((x + y) / 2.0),
            _ => Strength::Level(StrengthLevel::from_rank(
                (a.level().rank() + b.level().rank()) / 2,
            )),
        }
    }
}

impl ResolutionStrategy for CompromiseStrategy {
    fn name(&self) -> &'static str {
        "compromise"
    }

    fn resolve(
        &self,
        conflict: &Conflict,
        a: &ReasoningPath,
        b: &ReasoningPath,
        dilemma: &Dilemma,
    ) -> Result<Option<ResolutionContent>, StrategyError> {
        let (name_a, name_b) = names(conflict);
        let action = match shared_action(a, b) {
            Some(action) => action.to_string(),
            None => dilemma
                .possible_actions
                .iter()
                .map(|p| p.action.as_str())
                .find(|p| *p != a.conclusion && *p != b.conclusion)
                .map(str::to_string)
                .unwrap_or_else(|| format!("compromise_{}_{}", a.conclusion, b.conclusion)),
        };

        let argument = format!(
            "{} recommends '{}' and {} recommends '{}'. As a middle ground, '{}' preserves part \
             of what each framework asks for without fully adopting either position.\n\n\
             {}: {}\n\n{}: {}",
            name_a,
            a.conclusion,
            name_b,
            b.conclusion,
            action,
            name_a,
            a.argument,
            name_b,
            b.argument,
        );

        Ok(Some(content(
            conflict,
            self.name(),
            format!("Compromise: {} + {}", name_a, name_b),
            action,
            Self::averaged(&a.strength, &b.strength),
            argument,
            format!("Middle ground between {} and {}", name_a, name_b),
        )))
    }
}

/// Refuses to reconcile; presents both positions as equally valid.
pub struct PluralisticStrategy;

impl ResolutionStrategy for PluralisticStrategy {
    fn name(&self) -> &'static str {
        "pluralistic"
    }

    fn resolve(
        &self,
        conflict: &Conflict,
        a: &ReasoningPath,
        b: &ReasoningPath,
        _dilemma: &Dilemma,
    ) -> Result<Option<ResolutionContent>, StrategyError> {
        let (name_a, name_b) = names(conflict);
        let action = match shared_action(a, b) {
            Some(action) => action.to_string(),
            None => format!("{}_or_{}", a.conclusion, b.conclusion),
        };
        let strength = if b.strength.level() < a.strength.level() {
            b.strength
        } else {
            a.strength
        };

        let argument = format!(
            "These perspectives are presented side by side as equally valid; \
             no reconciliation is attempted.\n\n### {} ({})\n{}\n\n### {} ({})\n{}",
            name_a, a.conclusion, a.argument, name_b, b.conclusion, b.argument,
        );

        Ok(Some(content(
            conflict,
            self.name(),
            format!("Pluralistic: {} | {}", name_a, name_b),
            action,
            strength,
            argument,
            format!("Both {} and {} presented as valid", name_a, name_b),
        )))
    }
}

/// Provisional resolution used when nothing else produced output.
pub struct FallbackStrategy;

impl ResolutionStrategy for FallbackStrategy {
    fn name(&self) -> &'static str {
        "fallback"
    }

    fn resolve(
        &self,
        conflict: &Conflict,
        a: &ReasoningPath,
        b: &ReasoningPath,
        _dilemma: &Dilemma,
    ) -> Result<Option<ResolutionContent>, StrategyError> {
        let (name_a, name_b) = names(conflict);
        let (leader, leader_name) = if b.strength.level() > a.strength.level() {
            (b, name_b)
        } else {
            (a, name_a)
        };

        let argument = format!(
            "No dedicated strategy reconciled this {} conflict. Provisionally following {} ('{}'), \
             the more confident position, at reduced confidence pending \
             further deliberation.\n\n{}",
            conflict.conflict_type, leader_name, leader.conclusion, leader.argument,
        );

        Ok(Some(content(
            conflict,
            self.name(),
            format!("Provisional Synthesis: {} + {}", name_a, name_b),
            leader.conclusion.clone(),
            Strength::Level(StrengthLevel::Weak),
            argument,
            format!("Provisional resolution following {}", leader_name),
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use casebase::{ConflictType, FrameworkRef, Severity};

    fn conflict(a: (&str, &str), b: (&str, &str)) -> Conflict {
        Conflict {
            conflict_type: ConflictType::Value,
            framework_a: FrameworkRef { id: a.0.to_string(), name: a.1.to_string() },
            framework_b: FrameworkRef { id: b.0.to_string(), name: b.1.to_string() },
            path_a: "a".to_string(),
            path_b: "b".to_string(),
            actions: vec![],
            severity: Severity::Medium,
            conflicting_elements: vec![],
            description: "VALUE conflict".to_string(),
        }
    }

    fn care_vs_util() -> (Conflict, ReasoningPath, ReasoningPath) {
        (
            conflict(("care_ethics", "Care Ethics"), ("utilitarianism", "Utilitarianism")),
            ReasoningPath::new(
                "a",
                "Care Ethics",
                "stay_with_patient",
                StrengthLevel::Strong,
                "Care matters.",
            ),
            ReasoningPath::new(
                "b",
                "Utilitarianism",
                "treat_many",
                StrengthLevel::Weak,
                "Numbers matter.",
            ),
        )
    }

    #[test]
    fn test_balance_sections_and_context() {
        let (c, a, b) = care_vs_util();
        let dilemma = Dilemma::new("d", "Ward")
            .with_parameter("num_people_affected", 12, "")
            .with_parameter("time_pressure", "high", "")
            .with_factor("night shift");

        let out = BalanceStrategy.resolve(&c, &a, &b, &dilemma).unwrap().unwrap();
        assert_eq!(out.framework, "Balanced Synthesis: Care Ethics + Utilitarianism");
        assert_eq!(out.action, BALANCED_ACTION);
        assert_eq!(out.strength, Strength::Level(StrengthLevel::Moderate));
        for section in [
            "## Values in Tension",
            "## Care Ethics Perspective",
            "## Utilitarianism Perspective",
            "## Contextual Analysis",
            "## Synthesized Recommendation",
        ] {
            assert!(out.argument.contains(section), "missing {}", section);
        }
        assert!(out.argument.contains("- num_people_affected: 12 (moderate in scale)"));
        assert!(out.argument.contains("- time_pressure: high"));
        assert!(out.argument.contains("- Contextual factor: night shift"));
    }

    #[test]
    fn test_stakeholder_prefers_salient_framework() {
        let (c, a, b) = care_vs_util();
        let strategy = StakeholderStrategy::new(Arc::new(FrameworkRegistry::with_defaults()));

        let ward = Dilemma::new("d", "Pediatric ward")
            .with_description("A vulnerable child patient and her family.");
        let out = strategy.resolve(&c, &a, &b, &ward).unwrap().unwrap();
        assert_eq!(out.action, "stay_with_patient");
        assert_eq!(out.framework, "Stakeholder Priority: Care Ethics");

        let city = Dilemma::new("d", "Water rationing").with_parameter(
            "stakeholders",
            vec!["community", "citizens"],
            "",
        );
        let out = strategy.resolve(&c, &a, &b, &city).unwrap().unwrap();
        assert_eq!(out.action, "treat_many");

        let empty = Dilemma::new("d", "Abstract");
        assert!(strategy.resolve(&c, &a, &b, &empty).unwrap().is_none());
    }

    #[test]
    fn test_compromise_actions() {
        let (c, a, b) = care_vs_util();
        let with_third = Dilemma::new("d", "Ward")
            .with_action("stay_with_patient", "")
            .with_action("treat_many", "")
            .with_action("call_for_help", "");
        let out = CompromiseStrategy.resolve(&c, &a, &b, &with_third).unwrap().unwrap();
        assert_eq!(out.action, "call_for_help");
        assert_eq!(out.strength, Strength::Level(StrengthLevel::Moderate));

        let bare = Dilemma::new("d", "Ward");
        let out = CompromiseStrategy.resolve(&c, &a, &b, &bare).unwrap().unwrap();
        assert_eq!(out.action, "compromise_stay_with_patient_treat_many");
    }

    #[test]
    fn test_pluralistic_keeps_both() {
        let (c, a, b) = care_vs_util();
        let out = PluralisticStrategy.resolve(&c, &a, &b, &Dilemma::default()).unwrap().unwrap();
        assert_eq!(out.framework, "Pluralistic: Care Ethics | Utilitarianism");
        assert_eq!(out.action, "stay_with_patient_or_treat_many");
        assert_eq!(out.strength, Strength::Level(StrengthLevel::Weak));
        assert!(out.argument.contains("Care matters."));
        assert!(out.argument.contains("Numbers matter."));
    }

    #[test]
    fn test_fallback_follows_stronger_path() {
        let (c, a, b) = care_vs_util();
        let out = FallbackStrategy.resolve(&c, &a, &b, &Dilemma::default()).unwrap().unwrap();
        assert_eq!(out.framework, "Provisional Synthesis: Care Ethics + Utilitarianism");
        assert_eq!(out.action, "stay_with_patient");
        assert_eq!(out.strength, Strength::Level(StrengthLevel::Weak));
        assert_eq!(out.resolution_strategy, "fallback");
    }
}
