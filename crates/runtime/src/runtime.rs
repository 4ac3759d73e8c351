//! High-level runtime facade.
//!
//! The runtime owns the shared knowledge store, the memory registry, the
//! decision engine and the snapshot worker, and exposes the simulation and
//! inspection interfaces through a builder-based API.

use std::sync::Arc;

use intelligence_core::{
    MonsterId, Personality, QValues, RoomTable, StateDescription, StateIndex,
};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::info;

use crate::api::{HistoryPage, ProfileView, Result, RuntimeError, SpeciesSummary};
use crate::config::RuntimeConfig;
use crate::engine::{
    DeathOutcome, Decision, DecisionEngine, DecisionSnapshot, MonsterObservation, Perception,
    RewardOutcome,
};
use crate::knowledge::{LoadOutcome, SpeciesKnowledgeStore};
use crate::memory::MemorySystem;
use crate::profiles::ProfileRegistry;
use crate::repository::{FileKnowledgeRepository, KnowledgeRepository};
use crate::workers::{SnapshotHandle, SnapshotWorker};

const COMMAND_BUFFER_SIZE: usize = 32;

/// Learning runtime shared by every monster of a session.
///
/// Decisions and rewards are synchronous and may be issued from any number of
/// threads through `&self`; persistence happens in the background.
pub struct IntelligenceRuntime {
    config: RuntimeConfig,
    engine: DecisionEngine,
    profiles: ProfileRegistry,
    restored: Vec<(String, LoadOutcome)>,

    snapshots: SnapshotHandle,
    snapshot_worker_handle: JoinHandle<()>,
}

impl IntelligenceRuntime {
    /// Create a new runtime builder
    pub fn builder() -> IntelligenceRuntimeBuilder {
        IntelligenceRuntimeBuilder::new()
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    pub fn engine(&self) -> &DecisionEngine {
        &self.engine
    }

    pub fn store(&self) -> &Arc<SpeciesKnowledgeStore> {
        self.engine.store()
    }

    pub fn memory(&self) -> &Arc<MemorySystem> {
        self.engine.memory()
    }

    pub fn profiles(&self) -> &ProfileRegistry {
        &self.profiles
    }

    /// How each stored species was absorbed at startup.
    pub fn restore_outcomes(&self) -> &[(String, LoadOutcome)] {
        &self.restored
    }

    /// Gives a freshly spawned monster an empty memory.
    pub fn spawn_monster(&self, monster: MonsterId) {
        self.memory().spawn(monster);
    }

    /// Forgets a monster removed from the simulation.
    pub fn despawn_monster(&self, monster: MonsterId) -> bool {
        self.memory().remove(monster)
    }

    /// Encodes an observation as the engine would, e.g. to obtain the next
    /// state of a reward.
    pub fn perceive(&self, observation: &MonsterObservation) -> Result<Perception> {
        Ok(self.engine.perceive(observation)?)
    }

    /// Decides with the species profile's personality and rules.
    pub fn decide(&self, observation: &MonsterObservation, species: &str) -> Result<Decision> {
        let personality = self.profiles.personality(species);
        self.decide_as(observation, species, &personality)
    }

    /// Decides with a per-monster personality that replaces the species
    /// default. Trait values are clamped into `[0, 1]`.
    pub fn decide_as(
        &self,
        observation: &MonsterObservation,
        species: &str,
        personality: &Personality,
    ) -> Result<Decision> {
        let personality = personality.normalized();
        let rules = self.profiles.overrides(species);
        Ok(self
            .engine
            .decide_with_rules(observation, &personality, rules, species)?)
    }

    pub fn apply_reward(
        &self,
        snapshot: &DecisionSnapshot,
        reward: f64,
        next_state: StateIndex,
    ) -> RewardOutcome {
        self.engine.apply_reward(snapshot, reward, next_state)
    }

    pub fn record_death(&self, snapshot: &DecisionSnapshot) -> DeathOutcome {
        self.engine.record_death(snapshot)
    }

    pub fn share_memory(&self, from: MonsterId, to: MonsterId) -> usize {
        self.engine.share_memory(from, to)
    }

    pub fn summaries(&self) -> Vec<SpeciesSummary> {
        self.store().summaries()
    }

    pub fn summary(&self, species: &str) -> Option<SpeciesSummary> {
        self.store().summary(species)
    }

    /// Newest `limit` history entries of a species; `0` returns everything.
    pub fn history(&self, species: &str, limit: usize) -> HistoryPage {
        HistoryPage {
            species: species.to_owned(),
            entries: self.store().recent_history(species, limit),
        }
    }

    /// Every row of a species table, or `None` for unseen species.
    pub fn q_table(&self, species: &str) -> Option<Vec<QValues>> {
        self.store().q_table_rows(species)
    }

    pub fn describe_state(&self, state: StateIndex) -> StateDescription {
        self.engine.encoder().describe(state)
    }

    pub fn profile_views(&self) -> Vec<ProfileView> {
        self.profiles.views()
    }

    /// Administrative reset of one species table.
    pub fn reset(&self, species: &str) {
        self.store().reset(species);
    }

    /// Writes every dirty species now.
    pub async fn flush(&self) -> Result<usize> {
        self.snapshots.flush().await
    }

    /// Stops the snapshot worker after a final flush.
    pub async fn shutdown(self) -> Result<()> {
        self.snapshots.shutdown().await?;
        self.snapshot_worker_handle
            .await
            .map_err(RuntimeError::WorkerJoin)?;
        info!("intelligence runtime stopped");
        Ok(())
    }
}

/// Builder for [`IntelligenceRuntime`].
pub struct IntelligenceRuntimeBuilder {
    config: RuntimeConfig,
    repository: Option<Arc<dyn KnowledgeRepository>>,
    profiles: Option<ProfileRegistry>,
    rooms: Option<RoomTable>,
}

impl IntelligenceRuntimeBuilder {
    fn new() -> Self {
        Self {
            config: RuntimeConfig::default(),
            repository: None,
            profiles: None,
            rooms: None,
        }
    }

    /// Override runtime configuration
    pub fn config(mut self, config: RuntimeConfig) -> Self {
        self.config = config;
        self
    }

    /// Persistence backend. Defaults to a file repository in the configured
    /// data directory.
    pub fn repository(mut self, repository: Arc<dyn KnowledgeRepository>) -> Self {
        self.repository = Some(repository);
        self
    }

    /// Species profiles. Defaults to [`ProfileRegistry::standard`].
    pub fn profiles(mut self, profiles: ProfileRegistry) -> Self {
        self.profiles = Some(profiles);
        self
    }

    /// Room lookup table. Defaults to [`RoomTable::default`].
    pub fn rooms(mut self, rooms: RoomTable) -> Self {
        self.rooms = Some(rooms);
        self
    }

    /// Validates the configuration, restores stored knowledge and starts the
    /// snapshot worker. Must be called within a tokio runtime.
    pub async fn build(self) -> Result<IntelligenceRuntime> {
        let config = self.config;
        config.validate()?;

        let store = SpeciesKnowledgeStore::new(config.learning.clone())?
            .with_schema_reset(config.schema_reset)
            .with_generation_cap(config.generation_cap);
        let store = Arc::new(store);
        let memory = Arc::new(MemorySystem::new(config.memory.clone())?);

        let repository: Arc<dyn KnowledgeRepository> = match self.repository {
            Some(repository) => repository,
            None => Arc::new(FileKnowledgeRepository::new(config.resolved_data_dir())?),
        };
        let restored = store.restore(repository.as_ref())?;
        let resets = restored.iter().filter(|(_, outcome)| outcome.is_reset()).count();
        info!(species = restored.len(), resets, "knowledge restored");

        let (command_tx, command_rx) = mpsc::channel(COMMAND_BUFFER_SIZE);
        let worker = SnapshotWorker::new(
            Arc::clone(&store),
            repository,
            config.snapshot_interval(),
            command_rx,
        );
        let snapshot_worker_handle = tokio::spawn(async move {
            worker.run().await;
        });

        let engine = DecisionEngine::new(store, memory, config.engine.clone())
            .with_rooms(self.rooms.unwrap_or_default());

        Ok(IntelligenceRuntime {
            config,
            engine,
            profiles: self.profiles.unwrap_or_default(),
            restored,
            snapshots: SnapshotHandle::new(command_tx),
            snapshot_worker_handle,
        })
    }
}
