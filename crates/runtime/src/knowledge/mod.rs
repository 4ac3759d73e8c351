//! Per-species knowledge: records, the shared store and the persisted form.

mod persisted;
mod record;
mod store;

pub use persisted::{PersistedKnowledge, TableDecodeError};
pub use record::{LoadOutcome, SpeciesKnowledgeRecord, Transition};
pub use store::{AppliedReward, DecisionView, SpeciesKnowledgeStore};
