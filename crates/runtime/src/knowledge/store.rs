//! Shared per-species knowledge store.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};

use intelligence_core::{ConfigError, LearningConfig, LearningHistoryEntry, QUpdate, QValues, StateIndex};
use tracing::{debug, info, warn};

use super::persisted::PersistedKnowledge;
use super::record::{LoadOutcome, SpeciesKnowledgeRecord, Transition};
use crate::api::SpeciesSummary;
use crate::config::SchemaResetPolicy;
use crate::repository::{KnowledgeRepository, RepositoryError};

type SharedRecord = Arc<Mutex<SpeciesKnowledgeRecord>>;

/// What a decision needs from a species, read under one lock.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DecisionView {
    pub q_values: QValues,
    pub exploration_rate: f64,
    pub generation: u64,
}

/// Result of one reward, read under the same lock that applied it.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AppliedReward {
    pub update: QUpdate,
    /// Row of the rewarded state right after the update.
    pub q_values: QValues,
}

/// Keyed collection of species records.
///
/// The outer map is behind an `RwLock` and only write-locked to register a
/// species. Each record has its own mutex, so updates to one species never
/// block another and every Bellman read-modify-write is serialized per
/// species. Poisoned locks are recovered: a panic in one caller never makes
/// the store unusable.
pub struct SpeciesKnowledgeStore {
    records: RwLock<HashMap<String, SharedRecord>>,
    config: LearningConfig,
    schema_reset: SchemaResetPolicy,
    generation_cap: Option<u64>,
}

impl SpeciesKnowledgeStore {
    pub fn new(config: LearningConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            records: RwLock::new(HashMap::new()),
            config,
            schema_reset: SchemaResetPolicy::default(),
            generation_cap: None,
        })
    }

    #[must_use]
    pub fn with_schema_reset(mut self, policy: SchemaResetPolicy) -> Self {
        self.schema_reset = policy;
        self
    }

    #[must_use]
    pub fn with_generation_cap(mut self, cap: Option<u64>) -> Self {
        self.generation_cap = cap;
        self
    }

    pub fn config(&self) -> &LearningConfig {
        &self.config
    }

    pub fn schema_reset_policy(&self) -> SchemaResetPolicy {
        self.schema_reset
    }

    /// Returns the record of `species`, registering a fresh one if unseen.
    fn entry(&self, species: &str) -> SharedRecord {
        {
            let records = self.records.read().unwrap_or_else(PoisonError::into_inner);
            if let Some(record) = records.get(species) {
                return Arc::clone(record);
            }
        }

        let mut records = self.records.write().unwrap_or_else(PoisonError::into_inner);
        let record = records.entry(species.to_owned()).or_insert_with(|| {
            debug!(species, "registering species");
            Arc::new(Mutex::new(SpeciesKnowledgeRecord::new(species, &self.config)))
        });
        Arc::clone(record)
    }

    fn existing(&self, species: &str) -> Option<SharedRecord> {
        let records = self.records.read().unwrap_or_else(PoisonError::into_inner);
        records.get(species).cloned()
    }

    fn all(&self) -> Vec<SharedRecord> {
        let records = self.records.read().unwrap_or_else(PoisonError::into_inner);
        records.values().cloned().collect()
    }

    fn lock(record: &SharedRecord) -> MutexGuard<'_, SpeciesKnowledgeRecord> {
        record.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Q-values of one state. Unknown species are registered.
    pub fn get_q_values(&self, species: &str, state: StateIndex) -> QValues {
        let record = self.entry(species);
        let guard = Self::lock(&record);
        guard.q_values(state)
    }

    /// Row, live ε and generation of one state. Unknown species are registered.
    pub fn decision_view(&self, species: &str, state: StateIndex) -> DecisionView {
        let record = self.entry(species);
        let guard = Self::lock(&record);
        DecisionView {
            q_values: guard.q_values(state),
            exploration_rate: guard.exploration_rate(),
            generation: guard.generation(),
        }
    }

    /// Applies one reward under the species lock.
    pub fn apply_reward(&self, species: &str, transition: Transition) -> AppliedReward {
        let record = self.entry(species);
        let mut guard = Self::lock(&record);
        let update = guard.apply(&transition, &self.config);
        let q_values = guard.q_values(transition.state);
        debug!(
            species,
            state = transition.state.get(),
            action = %transition.action,
            reward = transition.reward,
            q_before = update.before,
            q_after = update.after,
            "applied reward"
        );
        AppliedReward { update, q_values }
    }

    pub fn record_encounter(&self, species: &str) -> u64 {
        let record = self.entry(species);
        let mut guard = Self::lock(&record);
        guard.record_encounter()
    }

    /// Advances the generation, stopping at the configured cap.
    pub fn advance_generation(&self, species: &str) -> u64 {
        let record = self.entry(species);
        let mut guard = Self::lock(&record);
        let before = guard.generation();
        let generation = guard.advance_generation(self.generation_cap);
        if generation > before {
            info!(species, generation, "species generation advanced");
        } else {
            debug!(species, generation, "generation cap reached");
        }
        generation
    }

    /// Administrative reset of one species.
    pub fn reset(&self, species: &str) {
        let record = self.entry(species);
        let mut guard = Self::lock(&record);
        guard.reset(&self.config);
        info!(species, generation = guard.generation(), "species knowledge reset");
    }

    /// Absorbs a persisted record, replacing any live one.
    pub fn load(&self, persisted: PersistedKnowledge) -> LoadOutcome {
        let species = persisted.species.clone();
        let (record, outcome) =
            SpeciesKnowledgeRecord::from_persisted(persisted, &self.config, self.schema_reset);

        match &outcome {
            LoadOutcome::Restored => info!(
                species,
                generation = record.generation(),
                steps = record.total_learning_steps(),
                "restored species knowledge"
            ),
            LoadOutcome::SchemaReset { persisted_version } => warn!(
                species,
                persisted_version,
                policy = ?self.schema_reset,
                "schema changed, species table reset"
            ),
            LoadOutcome::Corrupted { reason } => warn!(
                species,
                %reason,
                "corrupted species table, reset"
            ),
        }

        let mut records = self.records.write().unwrap_or_else(PoisonError::into_inner);
        records.insert(species, Arc::new(Mutex::new(record)));
        outcome
    }

    /// Persisted form of a species; `None` if it was never seen.
    pub fn serialize(&self, species: &str) -> Option<PersistedKnowledge> {
        let record = self.existing(species)?;
        let guard = Self::lock(&record);
        Some(guard.to_persisted())
    }

    pub fn contains(&self, species: &str) -> bool {
        self.existing(species).is_some()
    }

    /// Registered species, sorted.
    pub fn species(&self) -> Vec<String> {
        let records = self.records.read().unwrap_or_else(PoisonError::into_inner);
        let mut species: Vec<String> = records.keys().cloned().collect();
        species.sort_unstable();
        species
    }

    pub fn summary(&self, species: &str) -> Option<SpeciesSummary> {
        let record = self.existing(species)?;
        let guard = Self::lock(&record);
        Some(guard.summary())
    }

    /// Summaries of every species, sorted by name.
    pub fn summaries(&self) -> Vec<SpeciesSummary> {
        let mut summaries: Vec<SpeciesSummary> = self
            .all()
            .iter()
            .map(|record| Self::lock(record).summary())
            .collect();
        summaries.sort_by(|a, b| a.species.cmp(&b.species));
        summaries
    }

    /// The newest `limit` history entries, oldest first. Empty if unseen.
    pub fn recent_history(&self, species: &str, limit: usize) -> Vec<LearningHistoryEntry> {
        self.existing(species)
            .map(|record| Self::lock(&record).history().recent(limit))
            .unwrap_or_default()
    }

    /// Every row of a species table in state order.
    pub fn q_table_rows(&self, species: &str) -> Option<Vec<QValues>> {
        let record = self.existing(species)?;
        let guard = Self::lock(&record);
        Some(StateIndex::all().map(|state| guard.q_values(state)).collect())
    }

    /// Number of species with unsaved changes.
    pub fn dirty_count(&self) -> usize {
        self.all()
            .iter()
            .filter(|record| Self::lock(record).is_dirty())
            .count()
    }

    /// Writes every dirty species to `repository` and returns how many were
    /// saved.
    ///
    /// The species lock is released while the repository writes. A species
    /// mutated during its own write stays dirty for the next flush. A species
    /// the repository refuses is logged and left dirty while the remaining
    /// species are still written; the first such failure is returned once
    /// every species has been attempted.
    pub fn flush(&self, repository: &dyn KnowledgeRepository) -> Result<usize, RepositoryError> {
        let mut saved = 0;
        let mut first_failure = None;
        for record in self.all() {
            let pending = {
                let guard = Self::lock(&record);
                guard
                    .is_dirty()
                    .then(|| (guard.revision(), guard.to_persisted()))
            };
            let Some((revision, persisted)) = pending else {
                continue;
            };

            match repository.save(&persisted) {
                Ok(()) => {
                    Self::lock(&record).mark_persisted(revision);
                    saved += 1;
                }
                Err(error) => {
                    warn!(species = %persisted.species, %error, "species knowledge not saved");
                    first_failure.get_or_insert(error);
                }
            }
        }

        if saved > 0 {
            info!(saved, "flushed species knowledge");
        }
        match first_failure {
            Some(error) => Err(error),
            None => Ok(saved),
        }
    }

    /// Loads every record from `repository`.
    pub fn restore(
        &self,
        repository: &dyn KnowledgeRepository,
    ) -> Result<Vec<(String, LoadOutcome)>, RepositoryError> {
        let mut outcomes = Vec::new();
        for species in repository.list_species()? {
            match repository.load(&species) {
                Ok(Some(persisted)) => {
                    let outcome = self.load(persisted);
                    outcomes.push((species, outcome));
                }
                Ok(None) => {}
                Err(RepositoryError::CorruptedData(reason)) => {
                    warn!(species, %reason, "unreadable species record, starting fresh");
                    self.entry(&species);
                    outcomes.push((species, LoadOutcome::Corrupted { reason }));
                }
                Err(err) => return Err(err),
            }
        }
        Ok(outcomes)
    }
}
