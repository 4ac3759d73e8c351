//! Fixed action set shared by every species.
//!
//! The declaration order is the Q-table column order. Adding, removing or
//! reordering variants changes the table layout and requires a bump of
//! [`crate::CURRENT_SCHEMA_VERSION`].

use strum::{EnumCount, IntoEnumIterator};

/// Number of columns in every Q-table.
pub const ACTION_COUNT: usize = Action::COUNT;

/// Behavior a monster can choose on its turn.
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
    strum::EnumIter,
    strum::EnumCount,
    strum::FromRepr,
)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "SCREAMING_SNAKE_CASE"))]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE", ascii_case_insensitive)]
#[repr(u8)]
pub enum Action {
    /// All-out attack: bonus damage, lowered defense.
    AttackAggressive = 0,
    /// Measured attack that keeps some guard up.
    AttackDefensive = 1,
    /// Hold position and absorb blows.
    Defend = 2,
    /// Disengage from the threat.
    Flee = 3,
    /// Alert nearby monsters of the same pack.
    CallAllies = 4,
    /// Wait in cover for a better opening.
    Ambush = 5,
    /// Move around the territory; no combat intent.
    Patrol = 6,
}

impl Action {
    /// All actions in column order.
    pub fn all() -> impl Iterator<Item = Action> {
        Action::iter()
    }

    /// Q-table column of this action.
    #[inline]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Inverse of [`Action::index`].
    pub fn from_index(index: usize) -> Option<Self> {
        u8::try_from(index).ok().and_then(Self::from_repr)
    }
}
