//! Per-dimension bins.

use super::Observation;

/// Health bracket of the monster.
#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    strum::Display,
    strum::FromRepr,
)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
#[strum(serialize_all = "snake_case")]
#[repr(u8)]
pub enum HpBin {
    Low = 0,
    Medium = 1,
    High = 2,
}

impl HpBin {
    pub const COUNT: usize = 3;
    pub const LOW_MAX: f64 = 0.33;
    pub const MEDIUM_MAX: f64 = 0.66;

    /// Bins an hp ratio already validated to lie in `[0, 1]`.
    pub fn from_ratio(ratio: f64) -> Self {
        if ratio <= Self::LOW_MAX {
            HpBin::Low
        } else if ratio <= Self::MEDIUM_MAX {
            HpBin::Medium
        } else {
            HpBin::High
        }
    }
}

/// Tactical grouping of room types.
#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    strum::Display,
    strum::EnumString,
    strum::AsRefStr,
    strum::FromRepr,
)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
#[repr(u8)]
pub enum RoomCategory {
    /// Armories, guard posts, throne rooms.
    Combat = 0,
    /// Living quarters and other neutral rooms.
    Safe = 1,
    /// Treasuries, crypts and other guarded or hazardous rooms.
    Treasure = 2,
}

impl RoomCategory {
    pub const COUNT: usize = 3;
}

/// Range bracket to the nearest threat.
#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    strum::Display,
    strum::FromRepr,
)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
#[strum(serialize_all = "snake_case")]
#[repr(u8)]
pub enum DistanceBin {
    Close = 0,
    Medium = 1,
    /// Also used when no threat is known.
    Far = 2,
}

impl DistanceBin {
    pub const COUNT: usize = 3;
    pub const CLOSE_MAX: f64 = 2.0;
    pub const MEDIUM_MAX: f64 = 5.0;

    /// Bins a validated distance; `None` (no threat) is [`DistanceBin::Far`].
    pub fn from_distance(distance: Option<f64>) -> Self {
        match distance {
            Some(d) if d <= Self::CLOSE_MAX => DistanceBin::Close,
            Some(d) if d <= Self::MEDIUM_MAX => DistanceBin::Medium,
            _ => DistanceBin::Far,
        }
    }
}

/// Bin assignment of one observation, one field per dimension.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct StateBins {
    pub hp: HpBin,
    /// Enemy bin, `0..=3` where 3 means "three or more".
    pub enemies: u8,
    /// Ally bin, `0..=3` where 3 means "three or more".
    pub allies: u8,
    pub room: RoomCategory,
    pub distance: DistanceBin,
}

impl StateBins {
    /// Bins for the enemy and ally count dimensions.
    pub const COUNT_BINS: usize = 4;

    /// Saturates a head count into its bin.
    pub fn count_bin(count: u32) -> u8 {
        count.min(Self::COUNT_BINS as u32 - 1) as u8
    }

    /// Computes every bin directly from a validated observation.
    pub fn from_observation(observation: &Observation) -> Self {
        Self {
            hp: HpBin::from_ratio(observation.hp_ratio()),
            enemies: Self::count_bin(observation.nearby_enemies()),
            allies: Self::count_bin(observation.nearby_allies()),
            room: observation.room(),
            distance: DistanceBin::from_distance(observation.distance_to_threat()),
        }
    }

    /// Digits in mixed-radix order, most significant first.
    pub(crate) fn digits(&self) -> [usize; 5] {
        [
            self.hp as usize,
            self.enemies as usize,
            self.allies as usize,
            self.room as usize,
            self.distance as usize,
        ]
    }

    /// Threat is considered present when at least one enemy is counted.
    pub fn has_enemies(&self) -> bool {
        self.enemies > 0
    }
}
