//! Builtin adaptation rules.
//!
//! Each rule reads one situation parameter from the original and the new
//! dilemma and, when the value moved, strengthens or weakens paths whose
//! framework kind cares about that axis. Rules never touch the conclusion,
//! except for the proximity flip in [`SpecialObligationsRule`].

use casebase::{Dilemma, FrameworkKind, ReasoningPath};
use serde_json::Value;

use super::{AdaptationContext, AdaptationRule};
use crate::types::RuleError;

/// Conclusion that the alternatives and proximity rules single out.
pub const SEEK_ALTERNATIVES: &str = "seek_alternatives";

/// Conclusion used when a proximity flip finds no other possible action.
pub const DIRECT_ACTION: &str = "take_direct_action";

/// Proximity increase that flips a care path away from `seek_alternatives`.
pub const PROXIMITY_FLIP_THRESHOLD: f64 = 5.0;

const CERTAINTY_SCALE: &[(&str, f64)] = &[
    ("very_low", 0.0),
    ("low", 1.0),
    ("medium", 2.0),
    ("moderate", 2.0),
    ("high", 3.0),
    ("very_high", 4.0),
    ("certain", 4.0),
];

const INFORMATION_SCALE: &[(&str, f64)] = &[
    ("none", 0.0),
    ("limited", 1.0),
    ("partial", 2.0),
    ("substantial", 3.0),
    ("complete", 4.0),
];

const TIME_PRESSURE_SCALE: &[(&str, f64)] = &[
    ("none", 0.0),
    ("low", 1.0),
    ("moderate", 2.0),
    ("medium", 2.0),
    ("high", 3.0),
    ("extreme", 4.0),
    ("immediate", 4.0),
];

const DIVISIBILITY_SCALE: &[(&str, f64)] = &[
    ("indivisible", 0.0),
    ("partially_divisible", 1.0),
    ("divisible", 2.0),
];

/// Relationship proximity, closest first.
pub const PROXIMITY_SCALE: &[(&str, f64)] = &[
    ("self", 10.0),
    ("child", 9.0),
    ("spouse", 8.0),
    ("parent", 7.0),
    ("sibling", 6.0),
    ("family_member", 5.0),
    ("friend", 4.0),
    ("colleague", 3.0),
    ("acquaintance", 2.0),
    ("stranger", 1.0),
    ("unknown", 0.0),
];

/// The builtin chain in its fixed order.
pub fn builtin_rules() -> Vec<Box<dyn AdaptationRule>> {
    vec![
        Box::new(NumberOfPeopleRule),
        Box::new(CertaintyRule),
        Box::new(InformationAvailabilityRule),
        Box::new(MedicalTriageRule),
        Box::new(TimePressureRule),
        Box::new(ResourceDivisibilityRule),
        Box::new(ExhaustedAlternativesRule),
        Box::new(SpecialObligationsRule),
        Box::new(PropertyValueRule),
        Box::new(LifeVsPropertyRule),
    ]
}

/// Direction a parameter moved between the original and the new dilemma.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Shift {
    Up,
    Down,
}

impl Shift {
    fn between(old: f64, new: f64) -> Option<Self> {
        if new > old {
            Some(Self::Up)
        } else if new < old {
            Some(Self::Down)
        } else {
            None
        }
    }

    fn from_flags(old: bool, new: bool) -> Option<Self> {
        match (old, new) {
            (false, true) => Some(Self::Up),
            (true, false) => Some(Self::Down),
            _ => None,
        }
    }

    fn sign(&self) -> i8 {
        match self {
            Self::Up => 1,
            Self::Down => -1,
        }
    }
}

/// Sum the per-kind votes for a framework; positive strengthens.
fn vote(ctx: &AdaptationContext<'_>, weights: &[(FrameworkKind, i8)], shift: Shift) -> i8 {
    weights
        .iter()
        .filter(|(kind, _)| ctx.framework.has_kind(*kind))
        .map(|(_, weight)| weight * shift.sign())
        .sum()
}

/// Both raw values of a parameter, or `None` when either dilemma lacks it.
fn values<'a>(ctx: &AdaptationContext<'a>, key: &str) -> Option<(&'a Value, &'a Value)> {
    Some((ctx.original.parameter(key)?, ctx.dilemma.parameter(key)?))
}

fn label(value: &Value) -> Option<String> {
    value
        .as_str()
        .map(|s| s.trim().to_lowercase().replace([' ', '-'], "_"))
}

fn display(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn numeric(key: &str, value: &Value) -> Result<f64, RuleError> {
    match value {
        Value::Number(n) => n
            .as_f64()
            .ok_or_else(|| RuleError::invalid(key, value, "number is not representable")),
        Value::String(s) => s
            .trim()
            .parse::<f64>()
            .map_err(|_| RuleError::invalid(key, value, "expected a number")),
        _ => Err(RuleError::invalid(key, value, "expected a number")),
    }
}

/// How bare numbers map onto a categorical scale.
#[derive(Clone, Copy)]
enum Numbers {
    /// Numbers in [0, 1] are multiplied by four
    Unit,
    /// Numbers are used as scale positions directly
    Raw,
}

fn scaled(
    key: &str,
    value: &Value,
    scale: &[(&str, f64)],
    numbers: Numbers,
) -> Result<f64, RuleError> {
    let n = match value {
        Value::Number(_) => numeric(key, value)?,
        Value::String(_) => {
            let wanted = label(value).unwrap_or_default();
            if let Some((_, position)) = scale.iter().find(|(name, _)| *name == wanted) {
                return Ok(*position);
            }
            // Numeric strings go through the same mapping as numbers.
            wanted
                .parse::<f64>()
                .ok()
                .filter(|n| n.is_finite())
                .ok_or_else(|| RuleError::invalid(key, value, "not a recognised scale value"))?
        }
        _ => return Err(RuleError::invalid(key, value, "expected a number or scale label")),
    };

    match numbers {
        Numbers::Unit if (0.0..=1.0).contains(&n) => Ok(n * 4.0),
        Numbers::Unit => Err(RuleError::invalid(key, value, "expected a number in [0, 1]")),
        Numbers::Raw => Ok(n),
    }
}

fn flag(key: &str, value: &Value) -> Result<bool, RuleError> {
    match value {
        Value::Bool(b) => Ok(*b),
        Value::String(_) => match label(value).as_deref() {
            Some("true") | Some("yes") => Ok(true),
            Some("false") | Some("no") => Ok(false),
            _ => Err(RuleError::invalid(key, value, "expected a boolean")),
        },
        _ => Err(RuleError::invalid(key, value, "expected a boolean")),
    }
}

/// New path with the strength moved by `net` and a paragraph appended.
fn adjusted(path: &ReasoningPath, net: i8, paragraph: String) -> ReasoningPath {
    let mut adapted = path.clone();
    adapted.strength = match net.signum() {
        1 => path.strength.strengthen(),
        -1 => path.strength.weaken(),
        _ => path.strength,
    };
    append_paragraph(&mut adapted.argument, &paragraph);
    adapted
}

pub(crate) fn append_paragraph(argument: &mut String, paragraph: &str) {
    if !argument.trim().is_empty() {
        argument.push_str("\n\n");
    }
    argument.push_str(paragraph);
}

fn verdict(net: i8) -> &'static str {
    if net > 0 {
        "This strengthens the conclusion"
    } else {
        "This weakens the conclusion"
    }
}

/// Shared body of the rules whose effect is a weighted vote on one scale.
fn scale_rule(
    ctx: &AdaptationContext<'_>,
    path: &ReasoningPath,
    key: &str,
    measure: impl Fn(&Value) -> Result<f64, RuleError>,
    weights: &[(FrameworkKind, i8)],
    describe: impl Fn(Shift) -> String,
) -> Result<Option<ReasoningPath>, RuleError> {
    let Some((old_raw, new_raw)) = values(ctx, key) else {
        return Ok(None);
    };
    let (old, new) = (measure(old_raw)?, measure(new_raw)?);
    let Some(shift) = Shift::between(old, new) else {
        return Ok(None);
    };

    let net = vote(ctx, weights, shift);
    if net == 0 {
        return Ok(None);
    }

    let paragraph = format!(
        "Adaptation ({}): {} changed from {} to {}; {}. {} for {} reasoning.",
        key,
        key.replace('_', " "),
        display(old_raw),
        display(new_raw),
        describe(shift),
        verdict(net),
        ctx.framework.name,
    );
    Ok(Some(adjusted(path, net, paragraph)))
}

fn moved(shift: Shift, up: &str, down: &str) -> String {
    match shift {
        Shift::Up => up.to_string(),
        Shift::Down => down.to_string(),
    }
}

/// Affected population count; utilitarian paths track the stakes.
pub struct NumberOfPeopleRule;

impl AdaptationRule for NumberOfPeopleRule {
    fn name(&self) -> &'static str {
        "numberOfPeople"
    }

    fn apply(
        &self,
        path: &ReasoningPath,
        ctx: &AdaptationContext<'_>,
    ) -> Result<Option<ReasoningPath>, RuleError> {
        const KEY: &str = "num_people_affected";
        scale_rule(
            ctx,
            path,
            KEY,
            |v| numeric(KEY, v),
            &[(FrameworkKind::Utilitarian, 1)],
            |shift| {
                moved(
                    shift,
                    "an increased number of people is affected",
                    "a decreased number of people is affected",
                )
            },
        )
    }
}

/// Certainty of outcome; consequence-based reasoning leans on predictability.
pub struct CertaintyRule;

impl AdaptationRule for CertaintyRule {
    fn name(&self) -> &'static str {
        "certainty"
    }

    fn apply(
        &self,
        path: &ReasoningPath,
        ctx: &AdaptationContext<'_>,
    ) -> Result<Option<ReasoningPath>, RuleError> {
        const KEY: &str = "certainty_of_outcome";
        scale_rule(
            ctx,
            path,
            KEY,
            |v| scaled(KEY, v, CERTAINTY_SCALE, Numbers::Unit),
            &[(FrameworkKind::Utilitarian, 1)],
            |shift| {
                moved(
                    shift,
                    "outcomes are more predictable",
                    "outcomes are less predictable",
                )
            },
        )
    }
}

/// Information availability; more information favours outcome calculation,
/// less information favours rule-based reasoning.
pub struct InformationAvailabilityRule;

impl AdaptationRule for InformationAvailabilityRule {
    fn name(&self) -> &'static str {
        "informationAvailability"
    }

    fn apply(
        &self,
        path: &ReasoningPath,
        ctx: &AdaptationContext<'_>,
    ) -> Result<Option<ReasoningPath>, RuleError> {
        const KEY: &str = "information_availability";
        scale_rule(
            ctx,
            path,
            KEY,
            |v| scaled(KEY, v, INFORMATION_SCALE, Numbers::Unit),
            &[
                (FrameworkKind::Utilitarian, 1),
                (FrameworkKind::Deontological, -1),
            ],
            |shift| {
                moved(
                    shift,
                    "more information is available to the decision maker",
                    "less information is available to the decision maker",
                )
            },
        )
    }
}

/// Entering or leaving a medical triage setting.
pub struct MedicalTriageRule;

impl AdaptationRule for MedicalTriageRule {
    fn name(&self) -> &'static str {
        "medicalTriageContext"
    }

    fn apply(
        &self,
        path: &ReasoningPath,
        ctx: &AdaptationContext<'_>,
    ) -> Result<Option<ReasoningPath>, RuleError> {
        const KEY: &str = "medical_triage";
        scale_rule(
            ctx,
            path,
            KEY,
            |v| flag(KEY, v).map(f64::from),
            &[
                (FrameworkKind::Utilitarian, 1),
                (FrameworkKind::Justice, 1),
                (FrameworkKind::Care, -1),
            ],
            |shift| {
                moved(
                    shift,
                    "the decision now takes place under triage protocols",
                    "the decision no longer takes place under triage protocols",
                )
            },
        )
    }
}

/// Time pressure; urgency favours settled duties over calculation.
pub struct TimePressureRule;

impl AdaptationRule for TimePressureRule {
    fn name(&self) -> &'static str {
        "timePressure"
    }

    fn apply(
        &self,
        path: &ReasoningPath,
        ctx: &AdaptationContext<'_>,
    ) -> Result<Option<ReasoningPath>, RuleError> {
        const KEY: &str = "time_pressure";
        scale_rule(
            ctx,
            path,
            KEY,
            |v| scaled(KEY, v, TIME_PRESSURE_SCALE, Numbers::Raw),
            &[
                (FrameworkKind::Deontological, 1),
                (FrameworkKind::NaturalLaw, 1),
                (FrameworkKind::Utilitarian, -1),
            ],
            |shift| {
                moved(
                    shift,
                    "there is more time pressure on the decision",
                    "there is less time pressure on the decision",
                )
            },
        )
    }
}

/// Resource divisibility; divisible goods make fair sharing possible.
pub struct ResourceDivisibilityRule;

impl AdaptationRule for ResourceDivisibilityRule {
    fn name(&self) -> &'static str {
        "resourceDivisibility"
    }

    fn apply(
        &self,
        path: &ReasoningPath,
        ctx: &AdaptationContext<'_>,
    ) -> Result<Option<ReasoningPath>, RuleError> {
        const KEY: &str = "resource_divisibility";
        scale_rule(
            ctx,
            path,
            KEY,
            |v| match v {
                Value::Bool(b) => Ok(if *b { 2.0 } else { 0.0 }),
                _ => scaled(KEY, v, DIVISIBILITY_SCALE, Numbers::Raw),
            },
            &[(FrameworkKind::Justice, 1), (FrameworkKind::Care, 1)],
            |shift| {
                moved(
                    shift,
                    "the resource is more divisible",
                    "the resource is less divisible",
                )
            },
        )
    }
}

/// Whether alternatives have been exhausted.
pub struct ExhaustedAlternativesRule;

impl AdaptationRule for ExhaustedAlternativesRule {
    fn name(&self) -> &'static str {
        "exhaustedAlternatives"
    }

    fn apply(
        &self,
        path: &ReasoningPath,
        ctx: &AdaptationContext<'_>,
    ) -> Result<Option<ReasoningPath>, RuleError> {
        const KEY: &str = "alternatives_exhausted";
        let Some((old_raw, new_raw)) = values(ctx, KEY) else {
            return Ok(None);
        };
        let Some(shift) = Shift::from_flags(flag(KEY, old_raw)?, flag(KEY, new_raw)?) else {
            return Ok(None);
        };

        // A path that still recommends looking for alternatives moves against
        // the shift whatever its framework.
        let net = if path.conclusion == SEEK_ALTERNATIVES {
            -shift.sign()
        } else {
            vote(ctx, &[(FrameworkKind::NaturalLaw, 1)], shift)
        };
        if net == 0 {
            return Ok(None);
        }

        let change = match shift {
            Shift::Up => "alternatives have now been exhausted",
            Shift::Down => "alternatives are available again",
        };
        let paragraph = format!(
            "Adaptation ({}): {} changed from {} to {}; {}. {} for {} reasoning concluding '{}'.",
            KEY,
            KEY.replace('_', " "),
            display(old_raw),
            display(new_raw),
            change,
            verdict(net),
            ctx.framework.name,
            path.conclusion,
        );
        Ok(Some(adjusted(path, net, paragraph)))
    }
}

/// Relationship proximity between the agent and those affected.
pub struct SpecialObligationsRule;

impl SpecialObligationsRule {
    fn proximity(value: &Value) -> Result<f64, RuleError> {
        const KEY: &str = "relationship_to_affected";
        match value {
            Value::Number(_) => {
                let n = numeric(KEY, value)?;
                if (0.0..=10.0).contains(&n) {
                    Ok(n)
                } else {
                    Err(RuleError::invalid(KEY, value, "proximity must be within [0, 10]"))
                }
            }
            _ => scaled(KEY, value, PROXIMITY_SCALE, Numbers::Raw),
        }
    }

    /// First possible action of the new dilemma other than `seek_alternatives`.
    fn direct_action(dilemma: &Dilemma) -> String {
        dilemma
            .possible_actions
            .iter()
            .map(|a| a.action.as_str())
            .find(|a| *a != SEEK_ALTERNATIVES)
            .unwrap_or(DIRECT_ACTION)
            .to_string()
    }
}

impl AdaptationRule for SpecialObligationsRule {
    fn name(&self) -> &'static str {
        "specialObligations"
    }

    fn apply(
        &self,
        path: &ReasoningPath,
        ctx: &AdaptationContext<'_>,
    ) -> Result<Option<ReasoningPath>, RuleError> {
        const KEY: &str = "relationship_to_affected";
        if !ctx.framework.has_kind(FrameworkKind::Care) {
            return Ok(None);
        }
        let Some((old_raw, new_raw)) = values(ctx, KEY) else {
            return Ok(None);
        };
        let (old, new) = (Self::proximity(old_raw)?, Self::proximity(new_raw)?);
        let Some(shift) = Shift::between(old, new) else {
            return Ok(None);
        };

        let mut paragraph = format!(
            "Adaptation ({}): relationship to those affected changed from {} to {}; \
             special obligations are {}. {} for {} reasoning.",
            KEY,
            display(old_raw),
            display(new_raw),
            moved(shift, "stronger", "weaker"),
            verdict(shift.sign()),
            ctx.framework.name,
        );

        let flip = shift == Shift::Up
            && new - old >= PROXIMITY_FLIP_THRESHOLD
            && path.conclusion == SEEK_ALTERNATIVES;
        let base = if flip {
            let action = Self::direct_action(ctx.dilemma);
            paragraph.push_str(&format!(
                " The closeness of the relationship calls for direct action: \
                 the conclusion changes from '{}' to '{}'.",
                SEEK_ALTERNATIVES, action
            ));
            let mut flipped = path.clone();
            flipped.conclusion = action;
            flipped
        } else {
            path.clone()
        };

        Ok(Some(adjusted(&base, shift.sign(), paragraph)))
    }
}

/// Value of the property at stake.
pub struct PropertyValueRule;

impl AdaptationRule for PropertyValueRule {
    fn name(&self) -> &'static str {
        "propertyValue"
    }

    fn apply(
        &self,
        path: &ReasoningPath,
        ctx: &AdaptationContext<'_>,
    ) -> Result<Option<ReasoningPath>, RuleError> {
        const KEY: &str = "property_value";
        scale_rule(
            ctx,
            path,
            KEY,
            |v| numeric(KEY, v),
            &[
                (FrameworkKind::Deontological, 1),
                (FrameworkKind::RightsBased, 1),
            ],
            |shift| {
                moved(
                    shift,
                    "property rights carry more weight",
                    "property rights carry less weight",
                )
            },
        )
    }
}

/// Whether human life is at stake.
pub struct LifeVsPropertyRule;

impl AdaptationRule for LifeVsPropertyRule {
    fn name(&self) -> &'static str {
        "lifeVsProperty"
    }

    fn apply(
        &self,
        path: &ReasoningPath,
        ctx: &AdaptationContext<'_>,
    ) -> Result<Option<ReasoningPath>, RuleError> {
        const KEY: &str = "life_at_stake";
        scale_rule(
            ctx,
            path,
            KEY,
            |v| flag(KEY, v).map(f64::from),
            &[
                (FrameworkKind::Utilitarian, 1),
                (FrameworkKind::Care, 1),
                (FrameworkKind::NaturalLaw, 1),
            ],
            |shift| moved(shift, "human life is now at stake", "human life is no longer at stake"),
        )
    }
}
