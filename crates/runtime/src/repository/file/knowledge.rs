//! File-based KnowledgeRepository implementation.

use std::fs;
use std::path::{Path, PathBuf};

use crate::knowledge::PersistedKnowledge;
use crate::repository::error::Result;
use crate::repository::{KnowledgeRepository, RepositoryError};

const FILE_PREFIX: &str = "knowledge_";
const FILE_SUFFIX: &str = ".bin";

/// Stores one bincode file per species.
///
/// # File Format
///
/// Records are stored as `knowledge_{species}.bin`. Each write goes to a
/// `.bin.tmp` sibling first and is then renamed over the previous file, so a
/// crash mid-write leaves the last complete snapshot in place.
///
/// Species names are stored escaped: ASCII alphanumerics, `_` and `-` are
/// kept, every other byte becomes `%XX`. Any name the store accepts therefore
/// maps onto exactly one file inside `base_dir`.
pub struct FileKnowledgeRepository {
    base_dir: PathBuf,
}

impl FileKnowledgeRepository {
    /// Create a repository rooted at `base_dir`, creating it if needed.
    pub fn new(base_dir: impl AsRef<Path>) -> Result<Self> {
        let base_dir = base_dir.as_ref().to_path_buf();
        fs::create_dir_all(&base_dir).map_err(RepositoryError::Io)?;
        Ok(Self { base_dir })
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Path of the file backing `species`.
    pub fn species_path(&self, species: &str) -> PathBuf {
        self.base_dir.join(format!(
            "{FILE_PREFIX}{}{FILE_SUFFIX}",
            escape_species(species)
        ))
    }
}

impl KnowledgeRepository for FileKnowledgeRepository {
    fn save(&self, record: &PersistedKnowledge) -> Result<()> {
        let path = self.species_path(&record.species);
        let temp_path = path.with_extension("bin.tmp");

        let bytes = record.to_bytes()?;
        fs::write(&temp_path, bytes).map_err(RepositoryError::Io)?;
        fs::rename(&temp_path, &path).map_err(RepositoryError::Io)?;

        tracing::debug!(
            species = %record.species,
            path = %path.display(),
            "saved species knowledge"
        );
        Ok(())
    }

    fn load(&self, species: &str) -> Result<Option<PersistedKnowledge>> {
        let path = self.species_path(species);
        if !path.exists() {
            return Ok(None);
        }

        let bytes = fs::read(&path).map_err(RepositoryError::Io)?;
        let record = PersistedKnowledge::from_bytes(&bytes)?;
        if record.species != species {
            return Err(RepositoryError::CorruptedData(format!(
                "{} holds species {:?}",
                path.display(),
                record.species
            )));
        }

        tracing::debug!(species, path = %path.display(), "loaded species knowledge");
        Ok(Some(record))
    }

    fn list_species(&self) -> Result<Vec<String>> {
        let mut species = Vec::new();

        let entries = fs::read_dir(&self.base_dir).map_err(RepositoryError::Io)?;
        for entry in entries {
            let entry = entry.map_err(RepositoryError::Io)?;
            let path = entry.path();

            if let Some(filename) = path.file_name().and_then(|s| s.to_str())
                && let Some(name) = filename
                    .strip_prefix(FILE_PREFIX)
                    .and_then(|s| s.strip_suffix(FILE_SUFFIX))
                    .and_then(unescape_species)
            {
                species.push(name);
            }
        }

        species.sort_unstable();
        Ok(species)
    }
}

fn is_plain(byte: u8) -> bool {
    byte.is_ascii_alphanumeric() || byte == b'_' || byte == b'-'
}

fn escape_species(species: &str) -> String {
    let mut escaped = String::with_capacity(species.len());
    for byte in species.bytes() {
        if is_plain(byte) {
            escaped.push(char::from(byte));
        } else {
            escaped.push('%');
            escaped.push_str(&hex::encode_upper([byte]));
        }
    }
    escaped
}

/// Inverse of [`escape_species`]; `None` for names it never produces.
fn unescape_species(escaped: &str) -> Option<String> {
    let bytes = escaped.as_bytes();
    let mut decoded = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'%' => {
                let pair = bytes.get(i + 1..i + 3)?;
                let byte = hex::decode(pair).ok()?;
                decoded.extend_from_slice(&byte);
                i += 3;
            }
            byte if is_plain(byte) => {
                decoded.push(byte);
                i += 1;
            }
            _ => return None,
        }
    }
    String::from_utf8(decoded).ok()
}

#[cfg(test)]
mod tests {
    use intelligence_core::LearningConfig;
    use tempfile::TempDir;

    use super::*;
    use crate::knowledge::SpeciesKnowledgeRecord;

    fn record(species: &str) -> PersistedKnowledge {
        SpeciesKnowledgeRecord::new(species, &LearningConfig::default()).to_persisted()
    }

    #[test]
    fn save_and_load() {
        let dir = TempDir::new().unwrap();
        let repo = FileKnowledgeRepository::new(dir.path()).unwrap();

        repo.save(&record("goblin")).unwrap();
        repo.save(&record("cave-troll")).unwrap();
        assert_eq!(repo.list_species().unwrap(), vec!["cave-troll", "goblin"]);

        let loaded = repo.load("goblin").unwrap().unwrap();
        assert_eq!(loaded.species, "goblin");
        assert!(repo.load("orc").unwrap().is_none());
        assert!(!dir.path().join("knowledge_goblin.bin.tmp").exists());
    }

    #[test]
    fn any_species_name_gets_its_own_file() {
        let dir = TempDir::new().unwrap();
        let repo = FileKnowledgeRepository::new(dir.path()).unwrap();

        for species in ["cave troll", "../escape", "Drache/Wyrm", "ogre%20", "ghoul"] {
            repo.save(&record(species)).unwrap();
            assert!(repo.species_path(species).starts_with(dir.path()));
        }
        assert_eq!(
            repo.species_path("cave troll"),
            dir.path().join("knowledge_cave%20troll.bin")
        );

        let mut listed = repo.list_species().unwrap();
        listed.sort();
        let mut expected = vec!["../escape", "Drache/Wyrm", "cave troll", "ghoul", "ogre%20"];
        expected.sort();
        assert_eq!(listed, expected);
        assert_eq!(repo.load("../escape").unwrap().unwrap().species, "../escape");
        let files = fs::read_dir(dir.path())
            .unwrap()
            .filter(|entry| entry.as_ref().unwrap().file_type().unwrap().is_file())
            .count();
        assert_eq!(files, 5);
    }

    #[test]
    fn escaping_round_trips_names() {
        assert_eq!(escape_species("orc"), "orc");
        assert_eq!(escape_species("ork ü"), "ork%20%C3%BC");
        assert_eq!(unescape_species("ork%20%C3%BC").as_deref(), Some("ork ü"));
        assert_eq!(unescape_species("bad%2"), None);
        assert_eq!(unescape_species("a b"), None);
    }

    #[test]
    fn unreadable_file_is_reported_as_corruption() {
        let dir = TempDir::new().unwrap();
        let repo = FileKnowledgeRepository::new(dir.path()).unwrap();
        fs::write(dir.path().join("knowledge_rat.bin"), b"not bincode").unwrap();
        assert!(repo.load("rat").is_err());
        assert_eq!(repo.list_species().unwrap(), vec!["rat"]);
    }
}
