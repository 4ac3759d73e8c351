//! Mixed-radix state encoding.

use super::{
    DIMENSIONS, DistanceBin, HpBin, Observation, RoomCategory, STATE_COUNT, StateBins, StateIndex,
};

/// Maps observations to Q-table rows and back.
///
/// Each dimension's bin is weighted by the product of the sizes of all less
/// significant dimensions, so [`StateEncoder::encode_bins`] and
/// [`StateEncoder::decode`] are exact inverses.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct StateEncoder;

impl StateEncoder {
    pub const fn new() -> Self {
        Self
    }

    /// Number of rows produced by this encoder.
    pub const fn state_count(&self) -> usize {
        STATE_COUNT
    }

    /// Encodes a validated observation.
    pub fn encode(&self, observation: &Observation) -> StateIndex {
        self.encode_bins(&StateBins::from_observation(observation))
    }

    /// Encodes an explicit bin assignment. Counts above the top bin saturate.
    pub fn encode_bins(&self, bins: &StateBins) -> StateIndex {
        let mut digits = bins.digits();
        digits[1] = digits[1].min(DIMENSIONS[1] - 1);
        digits[2] = digits[2].min(DIMENSIONS[2] - 1);

        let flat = digits
            .iter()
            .zip(DIMENSIONS.iter())
            .fold(0usize, |acc, (&digit, &radix)| acc * radix + digit);

        // Every digit is below its radix, so flat < STATE_COUNT.
        debug_assert!(flat < STATE_COUNT);
        StateIndex(flat as u16)
    }

    /// Splits a state index back into its bins.
    pub fn decode(&self, index: StateIndex) -> StateBins {
        let mut remaining = index.get();
        let mut digits = [0usize; 5];
        for (slot, &radix) in digits.iter_mut().zip(DIMENSIONS.iter()).rev() {
            *slot = remaining % radix;
            remaining /= radix;
        }

        StateBins {
            hp: HpBin::from_repr(digits[0] as u8).unwrap_or(HpBin::High),
            enemies: digits[1] as u8,
            allies: digits[2] as u8,
            room: RoomCategory::from_repr(digits[3] as u8).unwrap_or(RoomCategory::Safe),
            distance: DistanceBin::from_repr(digits[4] as u8).unwrap_or(DistanceBin::Far),
        }
    }

    /// Human-readable labels for a state, for inspection UIs.
    pub fn describe(&self, index: StateIndex) -> StateDescription {
        let bins = self.decode(index);
        StateDescription {
            index: index.get(),
            hp: bins.hp.to_string(),
            enemies: count_label(bins.enemies),
            allies: count_label(bins.allies),
            room: bins.room.to_string(),
            distance: bins.distance.to_string(),
        }
    }
}

fn count_label(bin: u8) -> String {
    if bin as usize >= StateBins::COUNT_BINS - 1 {
        format!("{}+", bin)
    } else {
        bin.to_string()
    }
}

/// Labelled bins of one state.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct StateDescription {
    pub index: usize,
    pub hp: String,
    pub enemies: String,
    pub allies: String,
    pub room: String,
    pub distance: String,
}
