//! Dense Q-table storage.

use crate::action::{ACTION_COUNT, Action};
use crate::state::{STATE_COUNT, StateIndex};

use super::policy::greedy_action;

/// One Q-table row: a value per action, in column order.
pub type QValues = [f64; ACTION_COUNT];

/// Dense `[STATE_COUNT, ACTION_COUNT]` table stored row-major.
#[derive(Clone, Debug, PartialEq)]
pub struct QTable {
    values: Vec<f64>,
}

impl QTable {
    /// `[rows, columns]` of every table built by this crate.
    pub const SHAPE: [usize; 2] = [STATE_COUNT, ACTION_COUNT];

    /// Number of cells.
    pub const LEN: usize = STATE_COUNT * ACTION_COUNT;

    /// Zero-initialized table.
    pub fn zeros() -> Self {
        Self {
            values: vec![0.0; Self::LEN],
        }
    }

    /// Rebuilds a table from row-major values; `None` on length mismatch.
    pub fn from_flat(values: Vec<f64>) -> Option<Self> {
        (values.len() == Self::LEN).then_some(Self { values })
    }

    pub fn as_flat(&self) -> &[f64] {
        &self.values
    }

    pub const fn shape(&self) -> [usize; 2] {
        Self::SHAPE
    }

    #[inline]
    fn offset(state: StateIndex, action: Action) -> usize {
        state.get() * ACTION_COUNT + action.index()
    }

    pub fn get(&self, state: StateIndex, action: Action) -> f64 {
        self.values[Self::offset(state, action)]
    }

    pub fn set(&mut self, state: StateIndex, action: Action, value: f64) {
        let offset = Self::offset(state, action);
        self.values[offset] = value;
    }

    /// Copy of one row.
    pub fn row(&self, state: StateIndex) -> QValues {
        let start = state.get() * ACTION_COUNT;
        let mut row = [0.0; ACTION_COUNT];
        row.copy_from_slice(&self.values[start..start + ACTION_COUNT]);
        row
    }

    /// Highest value in a row.
    pub fn max_value(&self, state: StateIndex) -> f64 {
        self.row(state)
            .into_iter()
            .fold(f64::NEG_INFINITY, f64::max)
    }

    /// Greedy action of a row; ties go to the lowest column.
    pub fn best_action(&self, state: StateIndex) -> Action {
        greedy_action(&self.row(state))
    }

    /// Zeroes every cell.
    pub fn clear(&mut self) {
        self.values.fill(0.0);
    }

    /// Summary statistics for inspection.
    pub fn stats(&self) -> QTableStats {
        let nonzero = self.values.iter().filter(|v| **v != 0.0).count();
        let sum: f64 = self.values.iter().sum();
        let (min, max) = self
            .values
            .iter()
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
                (lo.min(*v), hi.max(*v))
            });

        QTableStats {
            nonzero,
            mean: sum / Self::LEN as f64,
            min,
            max,
        }
    }
}

impl Default for QTable {
    fn default() -> Self {
        Self::zeros()
    }
}

/// Aggregate view of a table.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct QTableStats {
    pub nonzero: usize,
    pub mean: f64,
    pub min: f64,
    pub max: f64,
}
