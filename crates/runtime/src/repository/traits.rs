//! Repository contract for persisted species knowledge.

use crate::knowledge::PersistedKnowledge;

use super::error::Result;

/// Storage backend for [`PersistedKnowledge`] records, keyed by species.
///
/// Implementations report plain success or failure; they never retry.
/// Retrying belongs to whoever drives persistence (the snapshot worker
/// simply tries again on its next interval).
pub trait KnowledgeRepository: Send + Sync {
    /// Save or replace the record of `record.species`.
    fn save(&self, record: &PersistedKnowledge) -> Result<()>;

    /// Load one species; `Ok(None)` when nothing was stored.
    fn load(&self, species: &str) -> Result<Option<PersistedKnowledge>>;

    /// Every stored species, sorted.
    fn list_species(&self) -> Result<Vec<String>>;
}
