//! Shared learning runtime for monster intelligence.
//!
//! This crate turns the pure primitives of `intelligence-core` into services
//! shared by every monster of a game session: a per-species knowledge store
//! safe for concurrent rewards, a registry of per-monster threat memories, the
//! decision engine, and a persistence boundary with a background snapshot
//! worker. Consumers embed [`IntelligenceRuntime`] to decide, reward and
//! inspect.
//!
//! Modules are organized by responsibility:
//! - [`runtime`] hosts the facade and builder
//! - [`engine`] turns observations into actions and rewards into updates
//! - [`knowledge`] owns species records and their persisted form
//! - [`memory`] keeps threat memory per monster
//! - [`profiles`] maps species to personalities and override rules
//! - [`api`] exposes error and inspection types for downstream clients
//! - [`config`] aggregates every tunable with file and environment loaders
//! - [`repository`] provides the file and in-memory persistence backends
//! - `workers` keeps background tasks internal to the crate
pub mod api;
pub mod config;
pub mod engine;
pub mod knowledge;
pub mod memory;
pub mod profiles;
pub mod repository;
pub mod runtime;

mod workers;

pub use api::{HistoryPage, ProfileView, Result, RuntimeError, SpeciesSummary};
pub use config::{EngineConfig, RuntimeConfig, SchemaResetPolicy};
pub use engine::{
    DeathOutcome, Decision, DecisionEngine, DecisionSnapshot, MonsterObservation, Perception,
    RewardOutcome,
};
pub use knowledge::{
    AppliedReward, DecisionView, LoadOutcome, PersistedKnowledge, SpeciesKnowledgeRecord, SpeciesKnowledgeStore,
    TableDecodeError, Transition,
};
pub use memory::MemorySystem;
pub use profiles::{ProfileRegistry, SpeciesProfile};
pub use repository::{
    FileKnowledgeRepository, InMemoryKnowledgeRepository, KnowledgeRepository, RepositoryError,
};
pub use runtime::{IntelligenceRuntime, IntelligenceRuntimeBuilder};
