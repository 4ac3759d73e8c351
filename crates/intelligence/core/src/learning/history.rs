//! Bounded learning history.
//!
//! Diagnostic only: entries are read by inspection tools and never fed back
//! into learning.

use std::collections::VecDeque;

use crate::action::Action;
use crate::state::StateIndex;

use super::QUpdate;

/// One applied reward.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LearningHistoryEntry {
    pub tick: u64,
    /// Species generation when the reward was applied.
    pub generation: u64,
    pub state: StateIndex,
    pub action: Action,
    pub reward: f64,
    pub q_before: f64,
    pub q_after: f64,
    pub next_max_q: f64,
}

impl LearningHistoryEntry {
    pub fn from_update(
        tick: u64,
        generation: u64,
        state: StateIndex,
        action: Action,
        reward: f64,
        update: &QUpdate,
    ) -> Self {
        Self {
            tick,
            generation,
            state,
            action,
            reward,
            q_before: update.before,
            q_after: update.after,
            next_max_q: update.next_max,
        }
    }
}

/// FIFO ring buffer of the most recent entries.
#[derive(Clone, Debug, PartialEq)]
pub struct LearningHistory {
    entries: VecDeque<LearningHistoryEntry>,
    limit: usize,
}

impl LearningHistory {
    /// Empty history holding at most `limit` entries (minimum 1).
    pub fn new(limit: usize) -> Self {
        let limit = limit.max(1);
        Self {
            entries: VecDeque::with_capacity(limit),
            limit,
        }
    }

    /// Restores persisted entries, keeping only the newest `limit`.
    pub fn from_entries(entries: impl IntoIterator<Item = LearningHistoryEntry>, limit: usize) -> Self {
        let mut history = Self::new(limit);
        for entry in entries {
            history.push(entry);
        }
        history
    }

    /// Appends an entry, evicting the oldest once full.
    pub fn push(&mut self, entry: LearningHistoryEntry) {
        while self.entries.len() >= self.limit {
            self.entries.pop_front();
        }
        self.entries.push_back(entry);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &LearningHistoryEntry> {
        self.entries.iter()
    }

    /// The newest `count` entries, oldest first. `0` returns everything.
    pub fn recent(&self, count: usize) -> Vec<LearningHistoryEntry> {
        let skip = if count == 0 {
            0
        } else {
            self.entries.len().saturating_sub(count)
        };
        self.entries.iter().skip(skip).cloned().collect()
    }
}
