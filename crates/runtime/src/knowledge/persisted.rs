//! On-disk form of a species record.

use chrono::{DateTime, Utc};
use intelligence_core::{LearningHistoryEntry, QTable};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;

use crate::repository::RepositoryError;

const F64_BYTES: usize = std::mem::size_of::<f64>();

/// Persisted species knowledge.
///
/// The Q-table travels as a flat little-endian `f64` blob of
/// `q_table_shape[0] * q_table_shape[1]` values, guarded by a hex SHA-256
/// checksum of the blob bytes.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PersistedKnowledge {
    pub species: String,
    pub generation: u64,
    pub encounters: u64,
    pub total_learning_steps: u64,
    pub schema_version: u32,
    pub exploration_rate: f64,
    pub q_table_shape: [u32; 2],
    pub q_table: Vec<u8>,
    pub checksum: String,
    pub history: Vec<LearningHistoryEntry>,
    pub created_at: DateTime<Utc>,
    pub last_updated: DateTime<Utc>,
}

/// Reasons a persisted blob cannot be turned back into a table.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum TableDecodeError {
    #[error("table shape {found:?} does not match {expected:?}")]
    ShapeMismatch { expected: [u32; 2], found: [u32; 2] },

    #[error("table blob holds {found} bytes, expected {expected}")]
    BlobLength { expected: usize, found: usize },

    #[error("table checksum mismatch")]
    ChecksumMismatch,
}

impl PersistedKnowledge {
    /// Shape tag of tables built by this binary.
    pub fn current_shape() -> [u32; 2] {
        let [rows, columns] = QTable::SHAPE;
        [rows as u32, columns as u32]
    }

    /// Encodes a table into its blob and checksum.
    pub fn encode_table(table: &QTable) -> (Vec<u8>, String) {
        let mut blob = Vec::with_capacity(QTable::LEN * F64_BYTES);
        for value in table.as_flat() {
            blob.extend_from_slice(&value.to_le_bytes());
        }
        let checksum = checksum(&blob);
        (blob, checksum)
    }

    /// Decodes the blob, checking shape, length and checksum.
    pub fn decode_table(&self) -> Result<QTable, TableDecodeError> {
        let expected_shape = Self::current_shape();
        if self.q_table_shape != expected_shape {
            return Err(TableDecodeError::ShapeMismatch {
                expected: expected_shape,
                found: self.q_table_shape,
            });
        }

        let expected_len = QTable::LEN * F64_BYTES;
        if self.q_table.len() != expected_len {
            return Err(TableDecodeError::BlobLength {
                expected: expected_len,
                found: self.q_table.len(),
            });
        }
        if checksum(&self.q_table) != self.checksum {
            return Err(TableDecodeError::ChecksumMismatch);
        }

        let values = self
            .q_table
            .chunks_exact(F64_BYTES)
            .map(|chunk| {
                let mut bytes = [0u8; F64_BYTES];
                bytes.copy_from_slice(chunk);
                f64::from_le_bytes(bytes)
            })
            .collect();

        QTable::from_flat(values).ok_or(TableDecodeError::BlobLength {
            expected: expected_len,
            found: self.q_table.len(),
        })
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, RepositoryError> {
        bincode::serialize(self).map_err(|e| RepositoryError::Serialization(e.to_string()))
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, RepositoryError> {
        bincode::deserialize(bytes).map_err(|e| RepositoryError::CorruptedData(e.to_string()))
    }
}

fn checksum(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

#[cfg(test)]
mod tests {
    use intelligence_core::{Action, StateIndex};

    use super::*;

    fn persisted(table: &QTable) -> PersistedKnowledge {
        let (q_table, checksum) = PersistedKnowledge::encode_table(table);
        PersistedKnowledge {
            species: "goblin".into(),
            generation: 3,
            encounters: 40,
            total_learning_steps: 12,
            schema_version: intelligence_core::CURRENT_SCHEMA_VERSION,
            exploration_rate: 0.3,
            q_table_shape: PersistedKnowledge::current_shape(),
            q_table,
            checksum,
            history: Vec::new(),
            created_at: Utc::now(),
            last_updated: Utc::now(),
        }
    }

    #[test]
    fn blob_is_flat_little_endian() {
        let mut table = QTable::zeros();
        table.set(StateIndex::new(0).unwrap(), Action::AttackAggressive, 1.5);
        let (blob, checksum) = PersistedKnowledge::encode_table(&table);

        assert_eq!(blob.len(), 3024 * 8);
        assert_eq!(&blob[..8], &1.5f64.to_le_bytes());
        assert_eq!(checksum.len(), 64);
    }

    #[test]
    fn decode_restores_values() {
        let mut table = QTable::zeros();
        table.set(StateIndex::new(431).unwrap(), Action::Patrol, -2.25);
        let record = persisted(&table);

        let bytes = record.to_bytes().unwrap();
        let restored = PersistedKnowledge::from_bytes(&bytes).unwrap();
        assert_eq!(restored, record);
        assert_eq!(restored.decode_table().unwrap(), table);
    }

    #[test]
    fn tampered_blob_fails_checksum() {
        let mut record = persisted(&QTable::zeros());
        record.q_table[17] ^= 0xff;
        assert_eq!(record.decode_table(), Err(TableDecodeError::ChecksumMismatch));
    }

    #[test]
    fn foreign_shape_is_rejected_before_reading_blob() {
        let mut record = persisted(&QTable::zeros());
        record.q_table_shape = [324, 7];
        record.q_table.truncate(324 * 7 * 8);
        assert!(matches!(
            record.decode_table(),
            Err(TableDecodeError::ShapeMismatch { found: [324, 7], .. })
        ));
    }
}
