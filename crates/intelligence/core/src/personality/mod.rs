//! Personality profiles and the override rules they drive.
//!
//! A [`Personality`] never changes Q-values. It only biases which action is
//! finally returned: after ε-greedy selection exploits the table, the
//! [`OverrideTable`] may substitute another action when a trait is strong
//! enough for the current situation.

mod rules;

pub use rules::{OverrideRule, OverrideTable, RuleCondition};

/// Trait axes of a personality.
#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    Hash,
    strum::Display,
    strum::EnumString,
    strum::AsRefStr,
    strum::EnumIter,
)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum PersonalityTrait {
    Aggression,
    Caution,
    PackMentality,
    Cunning,
}

/// Four traits in `[0, 1]`; 0.5 is neutral.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct Personality {
    pub aggression: f64,
    pub caution: f64,
    pub pack_mentality: f64,
    pub cunning: f64,
}

impl Personality {
    pub const NEUTRAL: f64 = 0.5;

    /// Builds a profile, clamping every trait into `[0, 1]`. NaN reads as
    /// neutral.
    pub fn new(aggression: f64, caution: f64, pack_mentality: f64, cunning: f64) -> Self {
        Self {
            aggression: clamp_trait(aggression),
            caution: clamp_trait(caution),
            pack_mentality: clamp_trait(pack_mentality),
            cunning: clamp_trait(cunning),
        }
    }

    pub const fn neutral() -> Self {
        Self {
            aggression: Self::NEUTRAL,
            caution: Self::NEUTRAL,
            pack_mentality: Self::NEUTRAL,
            cunning: Self::NEUTRAL,
        }
    }

    /// Re-clamps values that may have come from deserialization.
    #[must_use]
    pub fn normalized(self) -> Self {
        Self::new(self.aggression, self.caution, self.pack_mentality, self.cunning)
    }

    pub fn get(&self, personality_trait: PersonalityTrait) -> f64 {
        match personality_trait {
            PersonalityTrait::Aggression => self.aggression,
            PersonalityTrait::Caution => self.caution,
            PersonalityTrait::PackMentality => self.pack_mentality,
            PersonalityTrait::Cunning => self.cunning,
        }
    }
}

impl Default for Personality {
    fn default() -> Self {
        Self::neutral()
    }
}

fn clamp_trait(value: f64) -> f64 {
    if value.is_nan() {
        Personality::NEUTRAL
    } else {
        value.clamp(0.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn traits_are_clamped() {
        let personality = Personality::new(1.4, -0.2, f64::NAN, 0.7);
        assert_eq!(personality.aggression, 1.0);
        assert_eq!(personality.caution, 0.0);
        assert_eq!(personality.pack_mentality, 0.5);
        assert_eq!(personality.get(PersonalityTrait::Cunning), 0.7);
    }

    #[test]
    fn trait_names_parse() {
        assert_eq!(
            "pack_mentality".parse::<PersonalityTrait>().unwrap(),
            PersonalityTrait::PackMentality
        );
        assert_eq!(PersonalityTrait::Caution.as_ref(), "caution");
    }
}
