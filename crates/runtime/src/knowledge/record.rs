//! One species' accumulated knowledge.

use chrono::{DateTime, Utc};
use intelligence_core::{
    Action, LearningConfig, LearningHistory, LearningHistoryEntry,
    QTable, QUpdate, QValues, StateIndex, apply_bellman, apply_terminal,
};

use super::persisted::{PersistedKnowledge, TableDecodeError};
use crate::api::SpeciesSummary;
use crate::config::SchemaResetPolicy;

/// One reward to learn from.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Transition {
    pub tick: u64,
    pub state: StateIndex,
    pub action: Action,
    pub reward: f64,
    /// `None` for terminal transitions such as death.
    pub next_state: Option<StateIndex>,
}

/// How a persisted record was absorbed by [`SpeciesKnowledgeRecord::from_persisted`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LoadOutcome {
    /// Table and history restored as stored.
    Restored,
    /// Stored under another layout; table and history were reset.
    SchemaReset { persisted_version: u32 },
    /// Blob failed validation; table and history were reset.
    Corrupted { reason: String },
}

impl LoadOutcome {
    pub fn is_reset(&self) -> bool {
        !matches!(self, Self::Restored)
    }
}

/// Q-table plus bookkeeping for one species.
///
/// Mutations bump an internal revision; the record is dirty while that
/// revision differs from the last persisted one.
#[derive(Clone, Debug)]
pub struct SpeciesKnowledgeRecord {
    species: String,
    generation: u64,
    encounters: u64,
    total_learning_steps: u64,
    schema_version: u32,
    exploration_rate: f64,
    q_table: QTable,
    history: LearningHistory,
    created_at: DateTime<Utc>,
    last_updated: DateTime<Utc>,
    revision: u64,
    persisted_revision: u64,
}

impl SpeciesKnowledgeRecord {
    /// Zero-initialized record. New records start dirty.
    pub fn new(species: impl Into<String>, config: &LearningConfig) -> Self {
        let now = Utc::now();
        Self {
            species: species.into(),
            generation: 0,
            encounters: 0,
            total_learning_steps: 0,
            schema_version: config.schema_version,
            exploration_rate: config.exploration_rate,
            q_table: QTable::zeros(),
            history: LearningHistory::new(config.history_limit),
            created_at: now,
            last_updated: now,
            revision: 1,
            persisted_revision: 0,
        }
    }

    pub fn species(&self) -> &str {
        &self.species
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn encounters(&self) -> u64 {
        self.encounters
    }

    pub fn total_learning_steps(&self) -> u64 {
        self.total_learning_steps
    }

    pub fn schema_version(&self) -> u32 {
        self.schema_version
    }

    /// Live ε of this species.
    pub fn exploration_rate(&self) -> f64 {
        self.exploration_rate
    }

    pub fn q_table(&self) -> &QTable {
        &self.q_table
    }

    pub fn history(&self) -> &LearningHistory {
        &self.history
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn last_updated(&self) -> DateTime<Utc> {
        self.last_updated
    }

    pub fn q_values(&self, state: StateIndex) -> QValues {
        self.q_table.row(state)
    }

    pub fn is_dirty(&self) -> bool {
        self.revision != self.persisted_revision
    }

    pub(crate) fn revision(&self) -> u64 {
        self.revision
    }

    /// Marks `revision` as stored. Later mutations keep the record dirty.
    pub(crate) fn mark_persisted(&mut self, revision: u64) {
        self.persisted_revision = self.persisted_revision.max(revision);
    }

    fn touch(&mut self) {
        self.last_updated = Utc::now();
        self.revision += 1;
    }

    /// Bellman update, history append and ε decay.
    pub fn apply(&mut self, transition: &Transition, config: &LearningConfig) -> QUpdate {
        let params = config.params();
        let update = match transition.next_state {
            Some(next_state) => apply_bellman(
                &mut self.q_table,
                transition.state,
                transition.action,
                transition.reward,
                next_state,
                params,
            ),
            None => apply_terminal(
                &mut self.q_table,
                transition.state,
                transition.action,
                transition.reward,
                params,
            ),
        };

        self.total_learning_steps += 1;
        self.history.push(LearningHistoryEntry::from_update(
            transition.tick,
            self.generation,
            transition.state,
            transition.action,
            transition.reward,
            &update,
        ));
        self.exploration_rate = config.decay_exploration(self.exploration_rate);
        self.touch();
        update
    }

    pub fn record_encounter(&mut self) -> u64 {
        self.encounters += 1;
        self.touch();
        self.encounters
    }

    /// Increments the generation unless `cap` is reached. Never decreases.
    pub fn advance_generation(&mut self, cap: Option<u64>) -> u64 {
        if cap.is_none_or(|cap| self.generation < cap) {
            self.generation += 1;
            self.touch();
        }
        self.generation
    }

    /// Administrative reset: zero table, empty history, fresh ε and learning
    /// step count. Generation and encounters are kept.
    pub fn reset(&mut self, config: &LearningConfig) {
        self.q_table.clear();
        self.history = LearningHistory::new(config.history_limit);
        self.total_learning_steps = 0;
        self.exploration_rate = config.exploration_rate;
        self.schema_version = config.schema_version;
        self.touch();
    }

    /// Serializes the record for a repository.
    pub fn to_persisted(&self) -> PersistedKnowledge {
        let (q_table, checksum) = PersistedKnowledge::encode_table(&self.q_table);
        PersistedKnowledge {
            species: self.species.clone(),
            generation: self.generation,
            encounters: self.encounters,
            total_learning_steps: self.total_learning_steps,
            schema_version: self.schema_version,
            exploration_rate: self.exploration_rate,
            q_table_shape: PersistedKnowledge::current_shape(),
            q_table,
            checksum,
            history: self.history.iter().cloned().collect(),
            created_at: self.created_at,
            last_updated: self.last_updated,
        }
    }

    /// Rebuilds a record from storage.
    ///
    /// A schema or shape mismatch and a corrupted blob both fall back to a
    /// zero table under `policy`; neither is an error. Restored records are
    /// clean, reset records are dirty so the repaired form gets written back.
    pub fn from_persisted(
        persisted: PersistedKnowledge,
        config: &LearningConfig,
        policy: SchemaResetPolicy,
    ) -> (Self, LoadOutcome) {
        let outcome = if persisted.schema_version != config.schema_version {
            Err(LoadOutcome::SchemaReset {
                persisted_version: persisted.schema_version,
            })
        } else {
            match persisted.decode_table() {
                Ok(table) => Ok(table),
                Err(TableDecodeError::ShapeMismatch { .. }) => Err(LoadOutcome::SchemaReset {
                    persisted_version: persisted.schema_version,
                }),
                Err(err) => Err(LoadOutcome::Corrupted {
                    reason: err.to_string(),
                }),
            }
        };

        let mut record = Self {
            species: persisted.species,
            generation: persisted.generation,
            encounters: persisted.encounters,
            total_learning_steps: persisted.total_learning_steps,
            schema_version: config.schema_version,
            exploration_rate: clamp_rate(persisted.exploration_rate, config),
            q_table: QTable::zeros(),
            history: LearningHistory::new(config.history_limit),
            created_at: persisted.created_at,
            last_updated: persisted.last_updated,
            revision: 1,
            persisted_revision: 1,
        };

        match outcome {
            Ok(table) => {
                record.q_table = table;
                record.history =
                    LearningHistory::from_entries(persisted.history, config.history_limit);
                (record, LoadOutcome::Restored)
            }
            Err(reset) => {
                record.total_learning_steps = 0;
                record.exploration_rate = config.exploration_rate;
                if policy == SchemaResetPolicy::ResetCounters {
                    record.generation = 0;
                    record.encounters = 0;
                }
                record.touch();
                (record, reset)
            }
        }
    }

    /// Inspection view of the record.
    pub fn summary(&self) -> SpeciesSummary {
        let stats = self.q_table.stats();
        SpeciesSummary {
            species: self.species.clone(),
            generation: self.generation,
            encounters: self.encounters,
            total_learning_steps: self.total_learning_steps,
            schema_version: self.schema_version,
            exploration_rate: self.exploration_rate,
            shape: self.q_table.shape(),
            nonzero: stats.nonzero,
            mean_q: stats.mean,
            min_q: stats.min,
            max_q: stats.max,
            history_len: self.history.len(),
            created_at: self.created_at,
            last_updated: self.last_updated,
        }
    }
}

/// Keeps a restored ε inside the configured `[floor, initial]` band.
fn clamp_rate(rate: f64, config: &LearningConfig) -> f64 {
    if rate.is_finite() {
        rate.clamp(config.min_exploration_rate, config.exploration_rate)
    } else {
        config.exploration_rate
    }
}
