//! Deterministic learning primitives for monster intelligence.
//!
//! `intelligence-core` defines the rules every monster species learns by:
//! the discrete state space, the fixed action set, the Bellman update, the
//! ε-greedy policy with its personality override table, and short-term
//! threat memory. Everything here is pure and synchronous; shared ownership,
//! locking and persistence live in the runtime crate.
//!
//! Modules are organized leaf-first:
//! - [`action`] is the fixed behavior enumeration indexing Q-table columns
//! - [`state`] validates observations and encodes them into [`StateIndex`]
//! - [`learning`] hosts the Q-table, the Bellman rule, history and policy
//! - [`personality`] holds trait profiles and the declarative override table
//! - [`memory`] tracks recent threat sightings per monster
//! - [`config`] and [`error`] carry validation shared by every consumer
pub mod action;
pub mod config;
pub mod error;
pub mod learning;
pub mod memory;
pub mod personality;
pub mod rng;
pub mod state;

pub use action::{ACTION_COUNT, Action};
pub use config::{CURRENT_SCHEMA_VERSION, ConfigError, LearningConfig, MemoryConfig};
pub use error::{ErrorSeverity, IntelligenceError};
pub use learning::{
    EpsilonGreedy, LearningHistory, LearningHistoryEntry, LearningParams, QTable, QTableStats,
    QUpdate, QValues, Selection, apply_bellman, apply_terminal, confidence, greedy_action,
};
pub use memory::{
    MAX_THREAT_EVENTS, MonsterId, Position, Sighting, ThreatEvent, ThreatKind, ThreatMemory,
};
pub use personality::{
    OverrideRule, OverrideTable, Personality, PersonalityTrait, RuleCondition,
};
pub use rng::{PcgRng, RngOracle, compute_seed};
pub use state::{
    DistanceBin, HpBin, Observation, ObservationError, RoomCategory, RoomTable, STATE_COUNT,
    StateBins, StateDescription, StateEncoder, StateIndex,
};
