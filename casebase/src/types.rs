//! Core types for dilemmas, precedents and reasoning paths.
//!
//! With the `typescript` feature enabled, these types can be exported to TypeScript
//! using ts-rs so that front-ends render the same records the engine produces.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[cfg(feature = "typescript")]
use ts_rs::TS;

/// A structured ethical scenario.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
pub struct Dilemma {
    /// Stable identifier (used to key synonym tables and adapted path ids)
    #[serde(default)]
    pub id: String,
    /// Short human-readable title
    pub title: String,
    /// Free-text description of the scenario
    #[serde(default)]
    pub description: String,
    /// Situation type, parameters and contextual factors
    #[serde(default)]
    pub situation: Situation,
    /// Actions available to the agent, in presentation order
    #[serde(default)]
    pub possible_actions: Vec<PossibleAction>,
}

/// The structured situation of a dilemma.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
pub struct Situation {
    /// Situation category, e.g. `trolley_problem` or `resource_allocation`
    #[serde(rename = "type", default)]
    pub situation_type: String,
    /// Named parameters of the situation
    #[serde(default)]
    pub parameters: BTreeMap<String, Parameter>,
    /// Ordered contextual factors
    #[serde(default)]
    pub contextual_factors: Vec<String>,
}

/// A single situation parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
pub struct Parameter {
    /// Number, string, bool or list
    #[cfg_attr(feature = "typescript", ts(type = "unknown"))]
    pub value: serde_json::Value,
    /// What the parameter measures
    #[serde(default)]
    pub description: String,
}

/// An action the agent could take.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
pub struct PossibleAction {
    /// Machine name of the action, e.g. `pull_lever`
    pub action: String,
    /// Human-readable description
    #[serde(default)]
    pub description: String,
}

impl Dilemma {
    /// Create a dilemma with an id and title.
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            ..Default::default()
        }
    }

    /// Builder: set the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Builder: set the situation type.
    pub fn with_type(mut self, situation_type: impl Into<String>) -> Self {
        self.situation.situation_type = situation_type.into();
        self
    }

    /// Builder: add a parameter.
    pub fn with_parameter(
        mut self,
        name: impl Into<String>,
        value: impl Into<serde_json::Value>,
        description: impl Into<String>,
    ) -> Self {
        self.situation.parameters.insert(
            name.into(),
            Parameter {
                value: value.into(),
                description: description.into(),
            },
        );
        self
    }

    /// Builder: add a contextual factor.
    pub fn with_factor(mut self, factor: impl Into<String>) -> Self {
        self.situation.contextual_factors.push(factor.into());
        self
    }

    /// Builder: add a possible action.
    pub fn with_action(
        mut self,
        action: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        self.possible_actions.push(PossibleAction {
            action: action.into(),
            description: description.into(),
        });
        self
    }

    /// Get the raw value of a parameter.
    pub fn parameter(&self, name: &str) -> Option<&serde_json::Value> {
        self.situation.parameters.get(name).map(|p| &p.value)
    }

    /// Machine names of the possible actions, in order.
    pub fn action_names(&self) -> Vec<&str> {
        self.possible_actions
            .iter()
            .map(|a| a.action.as_str())
            .collect()
    }

    /// Text used when scoring this dilemma against precedents.
    pub fn search_text(&self) -> String {
        let mut parts: Vec<&str> = vec![
            &self.title,
            &self.description,
            &self.situation.situation_type,
        ];
        parts.extend(self.situation.parameters.keys().map(String::as_str));
        parts.extend(self.situation.contextual_factors.iter().map(String::as_str));
        parts.extend(self.possible_actions.iter().map(|a| a.action.as_str()));
        parts
            .into_iter()
            .filter(|p| !p.is_empty())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// A previously reasoned dilemma carrying its stored reasoning paths.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
pub struct Precedent {
    /// The dilemma this precedent reasoned about
    #[serde(flatten)]
    pub dilemma: Dilemma,
    /// Stored reasoning paths, in authoring order
    #[serde(default)]
    pub reasoning_paths: Vec<ReasoningPath>,
}

impl Precedent {
    /// Wrap a dilemma with its reasoning paths.
    pub fn new(dilemma: Dilemma, reasoning_paths: Vec<ReasoningPath>) -> Self {
        Self {
            dilemma,
            reasoning_paths,
        }
    }

    pub fn id(&self) -> &str {
        &self.dilemma.id
    }

    pub fn title(&self) -> &str {
        &self.dilemma.title
    }
}

/// One framework's argument, conclusion and confidence for a dilemma.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
pub struct ReasoningPath {
    /// Path identifier, unique within a precedent or pipeline run
    #[serde(default)]
    pub id: String,
    /// Free-text framework name; resolved through the framework registry
    #[serde(default)]
    pub framework: String,
    /// The recommended action
    #[serde(default, alias = "action")]
    pub conclusion: String,
    /// Confidence in the conclusion
    #[serde(default)]
    pub strength: Strength,
    /// Prose argument
    #[serde(default)]
    pub argument: String,
    /// Relevance to the current dilemma (0.0-1.0)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relevance: Option<f64>,
    /// Structured elements extracted from the argument
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_elements: Option<SourceElements>,
    /// Id of the precedent this path was adapted from
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_precedent: Option<String>,
    /// Whether the path was generated rather than stored or adapted
    #[serde(default)]
    pub is_synthetic: bool,
}

impl ReasoningPath {
    /// Create a path with the required fields.
    pub fn new(
        id: impl Into<String>,
        framework: impl Into<String>,
        conclusion: impl Into<String>,
        strength: impl Into<Strength>,
        argument: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            framework: framework.into(),
            conclusion: conclusion.into(),
            strength: strength.into(),
            argument: argument.into(),
            relevance: None,
            source_elements: None,
            source_precedent: None,
            is_synthetic: false,
        }
    }

    /// Builder: attach source elements.
    pub fn with_elements(mut self, elements: SourceElements) -> Self {
        self.source_elements = Some(elements);
        self
    }

    /// Builder: set relevance.
    pub fn with_relevance(mut self, relevance: f64) -> Self {
        self.relevance = Some(relevance.clamp(0.0, 1.0));
        self
    }

    /// Builder: mark as synthetic.
    pub fn synthetic(mut self) -> Self {
        self.is_synthetic = true;
        self
    }

    /// Principle tags, empty when no elements were extracted.
    pub fn principles(&self) -> &[String] {
        self.source_elements
            .as_ref()
            .map(|e| e.principles.as_slice())
            .unwrap_or(&[])
    }

    /// Priority tags in ranked order.
    pub fn priorities(&self) -> &[String] {
        self.source_elements
            .as_ref()
            .map(|e| e.priorities.as_slice())
            .unwrap_or(&[])
    }
}

/// Elements extracted from an argument's prose.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
pub struct SourceElements {
    #[serde(default)]
    pub principles: Vec<String>,
    #[serde(default)]
    pub examples: Vec<String>,
    #[serde(default)]
    pub justifications: Vec<String>,
    /// Ranked priorities, most important first
    #[serde(default)]
    pub priorities: Vec<String>,
}

/// Ordinal confidence level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
#[serde(rename_all = "snake_case")]
pub enum StrengthLevel {
    #[serde(alias = "Weak")]
    Weak = 1,
    #[serde(alias = "Moderate")]
    Moderate = 2,
    #[serde(alias = "Strong")]
    Strong = 3,
}

impl StrengthLevel {
    /// Rank on the ordinal scale (weak = 1, strong = 3)
    pub fn rank(&self) -> u8 {
        *self as u8
    }

    /// Level for a rank, clamped to the scale.
    pub fn from_rank(rank: u8) -> Self {
        match rank {
            0 | 1 => Self::Weak,
            2 => Self::Moderate,
            _ => Self::Strong,
        }
    }

    /// One step up, absorbing at strong.
    pub fn stronger(&self) -> Self {
        Self::from_rank(self.rank() + 1)
    }

    /// One step down, absorbing at weak.
    pub fn weaker(&self) -> Self {
        Self::from_rank(self.rank().saturating_sub(1))
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Weak => "weak",
            Self::Moderate => "moderate",
            Self::Strong => "strong",
        }
    }
}

/// Confidence in a conclusion, either ordinal or a score in [0, 1].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
#[serde(untagged)]
pub enum Strength {
    Level(StrengthLevel),
    Score(f64),
}

/// Step applied by `strengthen`/`weaken` on numeric strengths.
pub const NUMERIC_STRENGTH_STEP: f64 = 0.2;

impl Strength {
    /// Raise confidence one step. Idempotent at the ceiling.
    pub fn strengthen(&self) -> Self {
        match self {
            Self::Level(level) => Self::Level(level.stronger()),
            Self::Score(score) => Self::Score((score + NUMERIC_STRENGTH_STEP).min(1.0)),
        }
    }

    /// Lower confidence one step. Idempotent at the floor.
    pub fn weaken(&self) -> Self {
        match self {
            Self::Level(level) => Self::Level(level.weaker()),
            Self::Score(score) => Self::Score((score - NUMERIC_STRENGTH_STEP).max(0.0)),
        }
    }

    /// Ordinal level; scores below 1/3 are weak, below 2/3 moderate.
    pub fn level(&self) -> StrengthLevel {
        match self {
            Self::Level(level) => *level,
            Self::Score(score) if *score < 1.0 / 3.0 => StrengthLevel::Weak,
            Self::Score(score) if *score < 2.0 / 3.0 => StrengthLevel::Moderate,
            Self::Score(_) => StrengthLevel::Strong,
        }
    }

    /// Number of ordinal steps between two strengths.
    pub fn steps_from(&self, other: &Strength) -> u8 {
        self.level().rank().abs_diff(other.level().rank())
    }

    /// Human-readable form used in generated arguments.
    pub fn describe(&self) -> String {
        match self {
            Self::Level(level) => level.as_str().to_string(),
            Self::Score(score) => format!("{:.2}", score),
        }
    }
}

impl Default for Strength {
    fn default() -> Self {
        Self::Level(StrengthLevel::Moderate)
    }
}

impl From<StrengthLevel> for Strength {
    fn from(level: StrengthLevel) -> Self {
        Self::Level(level)
    }
}

impl From<f64> for Strength {
    fn from(score: f64) -> Self {
        Self::Score(score.clamp(0.0, 1.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ordinal_strengthen_is_monotonic_and_absorbing() {
        let weak = Strength::Level(StrengthLevel::Weak);
        assert_eq!(weak.strengthen(), Strength::Level(StrengthLevel::Moderate));
        assert_eq!(
            weak.strengthen().strengthen(),
            Strength::Level(StrengthLevel::Strong)
        );

        let strong = Strength::Level(StrengthLevel::Strong);
        assert_eq!(strong.strengthen(), strong);
        assert_eq!(strong.strengthen().strengthen(), strong);
    }

    #[test]
    fn test_ordinal_weaken_is_monotonic_and_absorbing() {
        let strong = Strength::Level(StrengthLevel::Strong);
        assert_eq!(strong.weaken(), Strength::Level(StrengthLevel::Moderate));

        let weak = Strength::Level(StrengthLevel::Weak);
        assert_eq!(weak.weaken(), weak);
        for level in [StrengthLevel::Weak, StrengthLevel::Moderate, StrengthLevel::Strong] {
            let s = Strength::Level(level);
            assert!(s.strengthen().level() >= s.level());
            assert!(s.weaken().level() <= s.level());
        }
    }

    #[test]
    fn test_numeric_strength_clamps() {
        assert_eq!(Strength::Score(0.9).strengthen(), Strength::Score(1.0));
        assert_eq!(Strength::Score(1.0).strengthen(), Strength::Score(1.0));
        assert_eq!(Strength::Score(0.1).weaken(), Strength::Score(0.0));
        assert_eq!(Strength::Score(0.0).weaken(), Strength::Score(0.0));

        match Strength::Score(0.5).strengthen() {
            Strength::Score(s) => assert!((s - 0.7).abs() < 1e-9),
            other => panic!("unexpected strength {:?}", other),
        }
    }

    #[test]
    fn test_numeric_levels() {
        assert_eq!(Strength::Score(0.2).level(), StrengthLevel::Weak);
        assert_eq!(Strength::Score(0.5).level(), StrengthLevel::Moderate);
        assert_eq!(Strength::Score(0.9).level(), StrengthLevel::Strong);
        assert_eq!(
            Strength::Score(0.1).steps_from(&Strength::Level(StrengthLevel::Strong)),
            2
        );
    }

    #[test]
    fn test_path_deserializes_action_alias_and_strength_forms() {
        let json = r#"[
            {"id": "p1", "framework": "Utilitarianism", "action": "pull_lever",
             "strength": "strong", "argument": "Save five."},
            {"id": "p2", "framework": "Deontology", "conclusion": "do_nothing",
             "strength": 0.4, "argument": "Do not kill."}
        ]"#;
        let paths: Vec<ReasoningPath> = serde_json::from_str(json).unwrap();

        assert_eq!(paths[0].conclusion, "pull_lever");
        assert_eq!(paths[0].strength, Strength::Level(StrengthLevel::Strong));
        assert_eq!(paths[1].strength, Strength::Score(0.4));
        assert!(!paths[1].is_synthetic);
    }

    #[test]
    fn test_precedent_flattens_dilemma() {
        let json = r#"{
            "id": "trolley_problem",
            "title": "The Trolley Problem",
            "situation": {
                "type": "trolley_problem",
                "parameters": {
                    "num_people_affected": {"value": 5, "description": "People on the main track"}
                },
                "contextual_factors": ["time critical"]
            },
            "possible_actions": [{"action": "pull_lever"}, {"action": "do_nothing"}],
            "reasoning_paths": [{"id": "u", "framework": "Utilitarianism", "action": "pull_lever"}]
        }"#;
        let precedent: Precedent = serde_json::from_str(json).unwrap();

        assert_eq!(precedent.id(), "trolley_problem");
        assert_eq!(precedent.dilemma.situation.situation_type, "trolley_problem");
        assert_eq!(
            precedent.dilemma.parameter("num_people_affected"),
            Some(&serde_json::json!(5))
        );
        assert_eq!(precedent.dilemma.action_names(), vec!["pull_lever", "do_nothing"]);
        assert_eq!(precedent.reasoning_paths[0].strength, Strength::default());
    }

    #[test]
    fn test_search_text_includes_structure() {
        let dilemma = Dilemma::new("d", "Lifeboat")
            .with_type("resource_allocation")
            .with_parameter("num_people_affected", 12, "")
            .with_factor("storm")
            .with_action("draw_lots", "");

        let text = dilemma.search_text();
        assert!(text.contains("Lifeboat"));
        assert!(text.contains("resource_allocation"));
        assert!(text.contains("num_people_affected"));
        assert!(text.contains("storm"));
        assert!(text.contains("draw_lots"));
    }
}
