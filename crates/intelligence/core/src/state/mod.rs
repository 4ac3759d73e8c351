//! Discrete state space.
//!
//! A monster's situation is reduced to five binned dimensions, most
//! significant first:
//!
//! | Dimension | Bins | Values |
//! |-----------|------|--------|
//! | HP ratio | 3 | low ≤ 0.33, medium ≤ 0.66, high |
//! | Nearby enemies | 4 | 0, 1, 2, 3+ |
//! | Nearby allies | 4 | 0, 1, 2, 3+ |
//! | Room category | 3 | combat, safe, treasure |
//! | Distance to threat | 3 | close ≤ 2, medium ≤ 5, far (or no threat) |
//!
//! giving [`STATE_COUNT`] = 3 × 4 × 4 × 3 × 3 = 432 states.

mod bins;
mod encoder;
mod observation;

pub use bins::{DistanceBin, HpBin, RoomCategory, StateBins};
pub use encoder::{StateDescription, StateEncoder};
pub use observation::{Observation, ObservationError, RoomTable};

/// Bin counts per dimension, most significant first.
pub const DIMENSIONS: [usize; 5] = [
    HpBin::COUNT,
    StateBins::COUNT_BINS,
    StateBins::COUNT_BINS,
    RoomCategory::COUNT,
    DistanceBin::COUNT,
];

/// Total number of discrete states (Q-table rows).
pub const STATE_COUNT: usize =
    DIMENSIONS[0] * DIMENSIONS[1] * DIMENSIONS[2] * DIMENSIONS[3] * DIMENSIONS[4];

/// Row index into a Q-table. Always `< STATE_COUNT`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(try_from = "u16", into = "u16"))]
pub struct StateIndex(u16);

impl StateIndex {
    /// Checked constructor; `None` when `raw >= STATE_COUNT`.
    pub const fn new(raw: usize) -> Option<Self> {
        if raw < STATE_COUNT {
            Some(Self(raw as u16))
        } else {
            None
        }
    }

    #[inline]
    pub const fn get(self) -> usize {
        self.0 as usize
    }

    /// Iterates every state in index order.
    pub fn all() -> impl Iterator<Item = StateIndex> {
        (0..STATE_COUNT as u16).map(StateIndex)
    }
}

impl TryFrom<u16> for StateIndex {
    type Error = ObservationError;

    fn try_from(raw: u16) -> Result<Self, Self::Error> {
        StateIndex::new(raw as usize).ok_or(ObservationError::StateOutOfRange(raw as usize))
    }
}

impl From<StateIndex> for u16 {
    fn from(index: StateIndex) -> Self {
        index.0
    }
}

impl core::fmt::Display for StateIndex {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "s{}", self.0)
    }
}
