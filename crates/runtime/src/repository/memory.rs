use std::collections::BTreeMap;
use std::sync::RwLock;

use super::error::{RepositoryError, Result};
use super::KnowledgeRepository;
use crate::knowledge::PersistedKnowledge;

/// In-memory implementation of [`KnowledgeRepository`].
///
/// Records are stored in their encoded byte form so that round trips go
/// through the same codec as the file backend.
#[derive(Default)]
pub struct InMemoryKnowledgeRepository {
    records: RwLock<BTreeMap<String, Vec<u8>>>,
}

impl InMemoryKnowledgeRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Overwrites the stored bytes of a species, bypassing the codec.
    pub fn insert_raw(&self, species: impl Into<String>, bytes: Vec<u8>) -> Result<()> {
        let mut records = self
            .records
            .write()
            .map_err(|_| RepositoryError::LockPoisoned)?;
        records.insert(species.into(), bytes);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.records.read().map(|records| records.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl KnowledgeRepository for InMemoryKnowledgeRepository {
    fn save(&self, record: &PersistedKnowledge) -> Result<()> {
        let bytes = record.to_bytes()?;
        self.insert_raw(record.species.clone(), bytes)
    }

    fn load(&self, species: &str) -> Result<Option<PersistedKnowledge>> {
        let records = self
            .records
            .read()
            .map_err(|_| RepositoryError::LockPoisoned)?;
        records
            .get(species)
            .map(|bytes| PersistedKnowledge::from_bytes(bytes))
            .transpose()
    }

    fn list_species(&self) -> Result<Vec<String>> {
        let records = self
            .records
            .read()
            .map_err(|_| RepositoryError::LockPoisoned)?;
        Ok(records.keys().cloned().collect())
    }
}
