//! Persistence boundary for species knowledge.
//!
//! Repositories store [`crate::knowledge::PersistedKnowledge`] records. They
//! are invoked outside the tick path: at startup to restore knowledge, and by
//! the snapshot worker to flush dirty species.

mod error;
mod file;
mod memory;
mod traits;

pub use error::{RepositoryError, Result};
pub use file::FileKnowledgeRepository;
pub use memory::InMemoryKnowledgeRepository;
pub use traits::KnowledgeRepository;
