//! Declarative personality override rules.

use crate::action::Action;
use crate::state::{DistanceBin, HpBin, StateBins};

use super::{Personality, PersonalityTrait};

/// Situation a rule requires, evaluated against the personality and the
/// binned state.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RuleCondition {
    pub personality_trait: PersonalityTrait,
    /// Inclusive lower bound on the trait.
    pub min_trait: f64,
    #[cfg_attr(feature = "serde", serde(default))]
    pub hp: Option<HpBin>,
    /// Minimum enemy bin (0..=3).
    #[cfg_attr(feature = "serde", serde(default))]
    pub min_enemies: u8,
    /// Minimum ally bin (0..=3).
    #[cfg_attr(feature = "serde", serde(default))]
    pub min_allies: u8,
    #[cfg_attr(feature = "serde", serde(default))]
    pub distance: Option<DistanceBin>,
}

impl RuleCondition {
    pub fn new(personality_trait: PersonalityTrait, min_trait: f64) -> Self {
        Self {
            personality_trait,
            min_trait,
            hp: None,
            min_enemies: 0,
            min_allies: 0,
            distance: None,
        }
    }

    #[must_use]
    pub fn hp(mut self, hp: HpBin) -> Self {
        self.hp = Some(hp);
        self
    }

    #[must_use]
    pub fn min_enemies(mut self, bin: u8) -> Self {
        self.min_enemies = bin;
        self
    }

    #[must_use]
    pub fn min_allies(mut self, bin: u8) -> Self {
        self.min_allies = bin;
        self
    }

    #[must_use]
    pub fn distance(mut self, distance: DistanceBin) -> Self {
        self.distance = Some(distance);
        self
    }

    pub fn matches(&self, personality: &Personality, bins: &StateBins) -> bool {
        personality.get(self.personality_trait) >= self.min_trait
            && self.hp.is_none_or(|hp| hp == bins.hp)
            && bins.enemies >= self.min_enemies
            && bins.allies >= self.min_allies
            && self.distance.is_none_or(|d| d == bins.distance)
    }
}

/// One substitution: when `condition` holds and the exploited action is in
/// `applies_to`, return `replacement` instead.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct OverrideRule {
    pub name: String,
    pub applies_to: Vec<Action>,
    pub condition: RuleCondition,
    pub replacement: Action,
}

impl OverrideRule {
    pub fn new(
        name: impl Into<String>,
        applies_to: impl IntoIterator<Item = Action>,
        condition: RuleCondition,
        replacement: Action,
    ) -> Self {
        Self {
            name: name.into(),
            applies_to: applies_to.into_iter().collect(),
            condition,
            replacement,
        }
    }

    pub fn applies(&self, action: Action, personality: &Personality, bins: &StateBins) -> bool {
        self.applies_to.contains(&action) && self.condition.matches(personality, bins)
    }
}

/// Ordered rule list; the first matching rule wins.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct OverrideTable {
    rules: Vec<OverrideRule>,
}

impl OverrideTable {
    pub fn new(rules: Vec<OverrideRule>) -> Self {
        Self { rules }
    }

    /// Table that never overrides.
    pub fn empty() -> Self {
        Self { rules: Vec::new() }
    }

    /// The built-in rules. None of them fire for a neutral personality.
    pub fn standard() -> Self {
        const ATTACKS: [Action; 3] = [
            Action::AttackAggressive,
            Action::AttackDefensive,
            Action::Ambush,
        ];

        Self::new(vec![
            OverrideRule::new(
                "cautious_flight",
                ATTACKS,
                RuleCondition::new(PersonalityTrait::Caution, 0.85)
                    .hp(HpBin::Low)
                    .min_enemies(1),
                Action::Flee,
            ),
            OverrideRule::new(
                "cautious_guard",
                ATTACKS,
                RuleCondition::new(PersonalityTrait::Caution, 0.70)
                    .hp(HpBin::Low)
                    .min_enemies(1),
                Action::Defend,
            ),
            OverrideRule::new(
                "pack_call",
                [Action::AttackDefensive, Action::Defend, Action::Flee],
                RuleCondition::new(PersonalityTrait::PackMentality, 0.75)
                    .min_allies(1)
                    .min_enemies(1),
                Action::CallAllies,
            ),
            OverrideRule::new(
                "berserk_press",
                [Action::AttackDefensive, Action::Defend],
                RuleCondition::new(PersonalityTrait::Aggression, 0.80)
                    .hp(HpBin::High)
                    .min_enemies(1)
                    .distance(DistanceBin::Close),
                Action::AttackAggressive,
            ),
            OverrideRule::new(
                "cunning_ambush",
                [Action::Patrol],
                RuleCondition::new(PersonalityTrait::Cunning, 0.80)
                    .min_enemies(1)
                    .distance(DistanceBin::Far),
                Action::Ambush,
            ),
        ])
    }

    pub fn rules(&self) -> &[OverrideRule] {
        &self.rules
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// First rule that replaces `action`, if any.
    pub fn evaluate(
        &self,
        action: Action,
        personality: &Personality,
        bins: &StateBins,
    ) -> Option<&OverrideRule> {
        self.rules
            .iter()
            .find(|rule| rule.applies(action, personality, bins))
    }

    /// `action` after applying the first matching rule.
    pub fn apply(&self, action: Action, personality: &Personality, bins: &StateBins) -> Action {
        self.evaluate(action, personality, bins)
            .map_or(action, |rule| rule.replacement)
    }
}

impl Default for OverrideTable {
    fn default() -> Self {
        Self::standard()
    }
}
