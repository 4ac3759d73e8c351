//! The Bellman update rule.

use crate::action::Action;
use crate::state::StateIndex;

use super::QTable;

/// α and γ for one update.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LearningParams {
    pub learning_rate: f64,
    pub discount_factor: f64,
}

/// Values observed while applying one update.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct QUpdate {
    /// `Q(s, a)` before the update.
    pub before: f64,
    /// `Q(s, a)` after the update.
    pub after: f64,
    /// `max_a' Q(s', a')` used as the bootstrap target.
    pub next_max: f64,
}

impl QUpdate {
    pub fn delta(&self) -> f64 {
        self.after - self.before
    }
}

/// Applies `Q(s,a) ← Q(s,a) + α (r + γ max Q(s',·) − Q(s,a))` in place.
///
/// The caller is responsible for serializing concurrent updates to the same
/// table; this function is a plain read-modify-write.
pub fn apply_bellman(
    table: &mut QTable,
    state: StateIndex,
    action: Action,
    reward: f64,
    next_state: StateIndex,
    params: LearningParams,
) -> QUpdate {
    let before = table.get(state, action);
    let next_max = table.max_value(next_state);

    let target = reward + params.discount_factor * next_max;
    let after = before + params.learning_rate * (target - before);
    table.set(state, action, after);

    QUpdate {
        before,
        after,
        next_max,
    }
}

/// Terminal variant of [`apply_bellman`]: there is no successor state, so the
/// bootstrap term is zero and `Q(s,a)` moves towards `r` alone.
pub fn apply_terminal(
    table: &mut QTable,
    state: StateIndex,
    action: Action,
    reward: f64,
    params: LearningParams,
) -> QUpdate {
    let before = table.get(state, action);
    let after = before + params.learning_rate * (reward - before);
    table.set(state, action, after);

    QUpdate {
        before,
        after,
        next_max: 0.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PARAMS: LearningParams = LearningParams {
        learning_rate: 0.1,
        discount_factor: 0.95,
    };

    fn state(raw: usize) -> StateIndex {
        StateIndex::new(raw).unwrap()
    }

    #[test]
    fn matches_worked_example() {
        let mut table = QTable::zeros();
        table.set(state(10), Action::Defend, 0.2);
        table.set(state(11), Action::Ambush, 0.5);
        table.set(state(11), Action::Flee, -4.0);

        let update = apply_bellman(&mut table, state(10), Action::Defend, 1.0, state(11), PARAMS);

        assert_eq!(update.before, 0.2);
        assert_eq!(update.next_max, 0.5);
        assert!((update.after - 0.3275).abs() < 1e-12);
        assert!((table.get(state(10), Action::Defend) - 0.3275).abs() < 1e-12);
        assert!((update.delta() - 0.1275).abs() < 1e-12);
    }

    #[test]
    fn self_transition_uses_pre_update_row() {
        let mut table = QTable::zeros();
        table.set(state(3), Action::Patrol, 1.0);

        let update = apply_bellman(&mut table, state(3), Action::Patrol, 0.0, state(3), PARAMS);

        // target = 0 + 0.95 * 1.0, after = 1.0 + 0.1 * (0.95 - 1.0)
        assert!((update.after - 0.995).abs() < 1e-12);
    }

    #[test]
    fn terminal_update_ignores_successor_values() {
        let mut table = QTable::zeros();
        table.set(state(3), Action::Flee, 9.0);
        let update = apply_terminal(&mut table, state(3), Action::Defend, -100.0, PARAMS);
        assert_eq!(update.next_max, 0.0);
        assert!((update.after + 10.0).abs() < 1e-12);
    }

    #[test]
    fn zero_learning_rate_freezes_table() {
        let mut table = QTable::zeros();
        let frozen = LearningParams {
            learning_rate: 0.0,
            ..PARAMS
        };
        let update = apply_bellman(&mut table, state(0), Action::Flee, 50.0, state(1), frozen);
        assert_eq!(update.after, 0.0);
        assert_eq!(table.stats().nonzero, 0);
    }

    #[test]
    fn repeated_rewards_converge_towards_target() {
        let mut table = QTable::zeros();
        let terminal = LearningParams {
            learning_rate: 0.5,
            discount_factor: 0.0,
        };
        for _ in 0..60 {
            apply_bellman(&mut table, state(7), Action::AttackAggressive, 10.0, state(8), terminal);
        }
        assert!((table.get(state(7), Action::AttackAggressive) - 10.0).abs() < 1e-9);
    }
}
