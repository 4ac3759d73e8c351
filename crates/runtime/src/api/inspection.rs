//! Read-only views served to inspection and administration clients.

use chrono::{DateTime, Utc};
use intelligence_core::{LearningHistoryEntry, Personality};
use serde::Serialize;

/// Knowledge summary of one species.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SpeciesSummary {
    pub species: String,
    pub generation: u64,
    pub encounters: u64,
    pub total_learning_steps: u64,
    pub schema_version: u32,
    pub exploration_rate: f64,
    pub shape: [usize; 2],
    /// Cells that have moved away from zero.
    pub nonzero: usize,
    pub mean_q: f64,
    pub min_q: f64,
    pub max_q: f64,
    pub history_len: usize,
    pub created_at: DateTime<Utc>,
    pub last_updated: DateTime<Utc>,
}

/// Bounded slice of a species' learning history.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct HistoryPage {
    pub species: String,
    pub entries: Vec<LearningHistoryEntry>,
}

/// Behavior profile of a species as exposed to clients.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ProfileView {
    pub species: String,
    pub description: String,
    pub personality: Personality,
    /// Names of the override rules in evaluation order.
    pub rules: Vec<String>,
}
