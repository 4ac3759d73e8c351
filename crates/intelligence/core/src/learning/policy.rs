//! ε-greedy action selection.

use crate::action::{ACTION_COUNT, Action};
use crate::rng::RngOracle;

use super::QValues;

/// Seed context for the explore/exploit roll.
const ROLL_CONTEXT: u32 = 0;
/// Seed context for the uniformly random action.
const PICK_CONTEXT: u32 = 1;

/// Outcome of ε-greedy selection, before any personality override.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Selection {
    pub action: Action,
    /// True when the action was drawn at random.
    pub explored: bool,
}

/// ε-greedy policy over one Q-table row.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EpsilonGreedy {
    exploration_rate: f64,
}

impl EpsilonGreedy {
    /// `exploration_rate` is clamped to `[0, 1]`.
    pub fn new(exploration_rate: f64) -> Self {
        let exploration_rate = if exploration_rate.is_nan() {
            0.0
        } else {
            exploration_rate.clamp(0.0, 1.0)
        };
        Self { exploration_rate }
    }

    pub fn exploration_rate(&self) -> f64 {
        self.exploration_rate
    }

    /// Selects from explicit random draws.
    ///
    /// `roll` lies in `[0, 1)`; the action is random when `roll < ε`, in which
    /// case `pick` chooses the column modulo [`ACTION_COUNT`].
    pub fn select_with(&self, q_values: &QValues, roll: f64, pick: u32) -> Selection {
        if roll < self.exploration_rate {
            let index = pick as usize % ACTION_COUNT;
            let action = Action::from_index(index).unwrap_or(Action::Patrol);
            Selection {
                action,
                explored: true,
            }
        } else {
            Selection {
                action: greedy_action(q_values),
                explored: false,
            }
        }
    }

    /// Selects using deterministic draws from `rng` seeded by `seed`.
    pub fn select<R: RngOracle + ?Sized>(&self, q_values: &QValues, rng: &R, seed: u64) -> Selection {
        let roll = rng.unit_f64(seed ^ u64::from(ROLL_CONTEXT));
        let pick = rng.next_u32(seed.rotate_left(17) ^ u64::from(PICK_CONTEXT));
        self.select_with(q_values, roll, pick)
    }
}

/// Index of the highest value; ties go to the lowest column.
pub fn greedy_action(q_values: &QValues) -> Action {
    let mut best = 0;
    for (index, value) in q_values.iter().enumerate().skip(1) {
        if *value > q_values[best] {
            best = index;
        }
    }
    Action::from_index(best).unwrap_or(Action::AttackAggressive)
}

/// Sigmoid of the row maximum, or 0.5 for an untrained row.
pub fn confidence(q_values: &QValues) -> f64 {
    let max = q_values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if max == 0.0 || !max.is_finite() {
        0.5
    } else {
        1.0 / (1.0 + (-max).exp())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rng::PcgRng;

    #[test]
    fn greedy_picks_strict_maximum() {
        let mut q = [0.0; ACTION_COUNT];
        q[Action::Flee.index()] = 0.4;
        q[Action::Defend.index()] = 0.3;
        assert_eq!(greedy_action(&q), Action::Flee);
    }

    #[test]
    fn greedy_ties_go_to_lowest_index() {
        let q = [1.0; ACTION_COUNT];
        assert_eq!(greedy_action(&q), Action::AttackAggressive);

        let mut q = [-1.0; ACTION_COUNT];
        q[Action::CallAllies.index()] = 0.0;
        q[Action::Patrol.index()] = 0.0;
        assert_eq!(greedy_action(&q), Action::CallAllies);
    }

    #[test]
    fn zero_epsilon_never_explores() {
        let policy = EpsilonGreedy::new(0.0);
        let mut q = [0.0; ACTION_COUNT];
        q[Action::Flee.index()] = 1.0;
        for seed in 0..500 {
            let selection = policy.select(&q, &PcgRng, seed);
            assert_eq!(selection, Selection { action: Action::Flee, explored: false });
        }
    }

    #[test]
    fn full_epsilon_always_explores_and_covers_actions() {
        let policy = EpsilonGreedy::new(1.0);
        let q = [0.0; ACTION_COUNT];
        let mut seen = [false; ACTION_COUNT];
        for seed in 0..2_000 {
            let selection = policy.select(&q, &PcgRng, seed);
            assert!(selection.explored);
            seen[selection.action.index()] = true;
        }
        assert!(seen.iter().all(|s| *s));
    }

    #[test]
    fn exploration_frequency_tracks_epsilon() {
        let policy = EpsilonGreedy::new(0.3);
        let q = [0.0; ACTION_COUNT];
        let explored = (0..10_000u64)
            .filter(|seed| policy.select(&q, &PcgRng, seed.wrapping_mul(0x9e37_79b9)).explored)
            .count();
        assert!((2_500..3_500).contains(&explored), "explored {explored} of 10000");
    }

    #[test]
    fn explicit_draws_are_respected() {
        let policy = EpsilonGreedy::new(0.5);
        let q = [0.0; ACTION_COUNT];
        assert_eq!(
            policy.select_with(&q, 0.49, 10),
            Selection { action: Action::Ambush, explored: true }
        );
        assert!(!policy.select_with(&q, 0.5, 10).explored);
    }

    #[test]
    fn confidence_is_neutral_for_untrained_rows() {
        assert_eq!(confidence(&[0.0; ACTION_COUNT]), 0.5);
        let mut q = [0.0; ACTION_COUNT];
        q[0] = 4.0;
        assert!(confidence(&q) > 0.98);
    }
}
