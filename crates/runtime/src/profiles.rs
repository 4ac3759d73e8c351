//! Species behavior profiles.
//!
//! A profile pairs the default personality of a species with an optional
//! override table. Profiles are data: they can be loaded from RON files such
//! as
//!
//! ```ron
//! {
//!     "goblin": (
//!         description: "Cowardly scavengers that swarm in packs",
//!         personality: (aggression: 0.4, caution: 0.75, pack_mentality: 0.85, cunning: 0.6),
//!     ),
//! }
//! ```

use std::collections::HashMap;
use std::path::Path;

use intelligence_core::{OverrideTable, Personality};
use serde::{Deserialize, Serialize};

use crate::api::{ProfileView, Result, RuntimeError};

/// Behavior profile of one species.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpeciesProfile {
    pub description: String,
    pub personality: Personality,
    /// Species-specific rules replacing the registry default.
    pub overrides: Option<OverrideTable>,
}

impl SpeciesProfile {
    pub fn new(description: impl Into<String>, personality: Personality) -> Self {
        Self {
            description: description.into(),
            personality,
            overrides: None,
        }
    }

    #[must_use]
    pub fn with_overrides(mut self, overrides: OverrideTable) -> Self {
        self.overrides = Some(overrides);
        self
    }
}

/// Species name to profile mapping with a neutral fallback.
#[derive(Clone, Debug, PartialEq)]
pub struct ProfileRegistry {
    profiles: HashMap<String, SpeciesProfile>,
    fallback: SpeciesProfile,
    default_overrides: OverrideTable,
}

impl ProfileRegistry {
    /// Empty registry: every species is neutral under the standard rules.
    pub fn new() -> Self {
        Self {
            profiles: HashMap::new(),
            fallback: SpeciesProfile::new("unremarkable creature", Personality::neutral()),
            default_overrides: OverrideTable::standard(),
        }
    }

    /// Built-in bestiary.
    pub fn standard() -> Self {
        let mut registry = Self::new();
        registry.insert(
            "goblin",
            SpeciesProfile::new(
                "Cowardly scavengers that swarm in packs",
                Personality::new(0.4, 0.75, 0.85, 0.6),
            ),
        );
        registry.insert(
            "orc",
            SpeciesProfile::new(
                "Brutes that press every advantage",
                Personality::new(0.9, 0.2, 0.6, 0.3),
            ),
        );
        registry.insert(
            "skeleton",
            SpeciesProfile::new(
                "Mindless guardians that never retreat",
                Personality::new(0.6, 0.0, 0.5, 0.1),
            ),
        );
        registry.insert(
            "spider",
            SpeciesProfile::new(
                "Patient hunters that wait in the dark",
                Personality::new(0.5, 0.6, 0.2, 0.9),
            ),
        );
        registry.insert(
            "wolf",
            SpeciesProfile::new(
                "Pack hunters that howl for the rest",
                Personality::new(0.7, 0.5, 0.95, 0.5),
            ),
        );
        registry
    }

    /// Parses a RON map of species to profiles.
    pub fn from_ron_str(content: &str) -> std::result::Result<Self, ron::error::SpannedError> {
        let raw: HashMap<String, SpeciesProfile> = ron::from_str(content)?;
        let mut registry = Self::new();
        for (species, profile) in raw {
            registry.insert(species, profile);
        }
        Ok(registry)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| RuntimeError::ProfileLoad {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        let registry = Self::from_ron_str(&content).map_err(|e| RuntimeError::ProfileLoad {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        tracing::info!(path = %path.display(), species = registry.len(), "loaded species profiles");
        Ok(registry)
    }

    /// Adds or replaces a profile. Traits are re-clamped into `[0, 1]`.
    pub fn insert(&mut self, species: impl Into<String>, mut profile: SpeciesProfile) {
        profile.personality = profile.personality.normalized();
        self.profiles.insert(species.into(), profile);
    }

    #[must_use]
    pub fn with_default_overrides(mut self, overrides: OverrideTable) -> Self {
        self.default_overrides = overrides;
        self
    }

    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }

    pub fn contains(&self, species: &str) -> bool {
        self.profiles.contains_key(species)
    }

    /// Profile of `species`, or the neutral fallback.
    pub fn get(&self, species: &str) -> &SpeciesProfile {
        self.profiles.get(species).unwrap_or(&self.fallback)
    }

    pub fn personality(&self, species: &str) -> Personality {
        self.get(species).personality
    }

    /// Override rules in force for `species`.
    pub fn overrides(&self, species: &str) -> &OverrideTable {
        self.get(species)
            .overrides
            .as_ref()
            .unwrap_or(&self.default_overrides)
    }

    /// Sorted species names.
    pub fn species(&self) -> Vec<String> {
        let mut species: Vec<String> = self.profiles.keys().cloned().collect();
        species.sort_unstable();
        species
    }

    pub fn view(&self, species: &str) -> ProfileView {
        let profile = self.get(species);
        ProfileView {
            species: species.to_owned(),
            description: profile.description.clone(),
            personality: profile.personality,
            rules: self
                .overrides(species)
                .rules()
                .iter()
                .map(|rule| rule.name.clone())
                .collect(),
        }
    }

    /// Views of every registered species, sorted by name.
    pub fn views(&self) -> Vec<ProfileView> {
        self.species()
            .iter()
            .map(|species| self.view(species))
            .collect()
    }
}

impl Default for ProfileRegistry {
    fn default() -> Self {
        Self::standard()
    }
}
