//! Runtime configuration and its loaders.
//!
//! Configuration can be assembled from defaults, a TOML document or the
//! process environment. Every source ends in [`RuntimeConfig::validate`];
//! an invalid configuration is the only fatal error the runtime reports.

use std::env;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use intelligence_core::{LearningConfig, MemoryConfig};
use serde::{Deserialize, Serialize};

use crate::api::{Result, RuntimeError};

/// What happens to a species' counters when its persisted table is discarded
/// because of a schema change or a corrupted blob.
///
/// The Q-table and history are always reset. `total_learning_steps` always
/// restarts at zero because it counted updates to the discarded table.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SchemaResetPolicy {
    /// Keep `generation` and `encounters`.
    #[default]
    PreserveCounters,
    /// Zero `generation` and `encounters` as well.
    ResetCounters,
}

impl FromStr for SchemaResetPolicy {
    type Err = String;

    fn from_str(value: &str) -> std::result::Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "preserve" | "preserve_counters" => Ok(Self::PreserveCounters),
            "reset" | "reset_counters" => Ok(Self::ResetCounters),
            other => Err(format!("unknown schema reset policy {other:?}")),
        }
    }
}

/// Decision engine settings.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Base seed mixed into every exploration draw.
    pub game_seed: u64,
    /// Monsters at or below this intelligence perceive no enemies or threats.
    pub oblivious_intelligence: u8,
    /// Reward applied by `record_death`.
    pub death_penalty: f64,
    /// Intensity scale used when a monster shares its memory with allies.
    pub share_blend: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            game_seed: 0,
            oblivious_intelligence: 6,
            death_penalty: -100.0,
            share_blend: 0.5,
        }
    }
}

/// Complete runtime configuration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    pub learning: LearningConfig,
    pub memory: MemoryConfig,
    pub engine: EngineConfig,
    pub schema_reset: SchemaResetPolicy,
    /// Upper bound for species generations; `None` is unbounded.
    pub generation_cap: Option<u64>,
    /// Directory of the file repository. Defaults to the platform data dir.
    pub data_dir: Option<PathBuf>,
    /// Seconds between background snapshots.
    pub snapshot_interval_secs: u64,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            learning: LearningConfig::default(),
            memory: MemoryConfig::default(),
            engine: EngineConfig::default(),
            schema_reset: SchemaResetPolicy::default(),
            generation_cap: None,
            data_dir: None,
            snapshot_interval_secs: 30,
        }
    }
}

impl RuntimeConfig {
    /// Parse a TOML document. Missing keys take their defaults.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Self =
            toml::from_str(content).map_err(|e| RuntimeError::ConfigParse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            RuntimeError::ConfigParse(format!("failed to read {}: {e}", path.display()))
        })?;
        Self::from_toml_str(&content)
    }

    /// Construct configuration from process environment variables.
    ///
    /// Environment variables:
    /// - `MONSTER_AI_LEARNING_RATE` - α (default: 0.1)
    /// - `MONSTER_AI_DISCOUNT_FACTOR` - γ (default: 0.95)
    /// - `MONSTER_AI_EXPLORATION_RATE` - initial ε (default: 0.3)
    /// - `MONSTER_AI_HISTORY_LIMIT` - history entries per species (default: 100)
    /// - `MONSTER_AI_SCHEMA_VERSION` - table layout tag (default: current layout)
    /// - `MONSTER_AI_SCHEMA_RESET` - `preserve` or `reset` (default: preserve)
    /// - `MONSTER_AI_GENERATION_CAP` - generation ceiling (default: none)
    /// - `MONSTER_AI_DATA_DIR` - knowledge directory (default: platform-specific)
    /// - `MONSTER_AI_SNAPSHOT_SECS` - snapshot interval (default: 30)
    /// - `MONSTER_AI_SEED` - exploration seed (default: 0)
    ///
    /// A variable that is set but does not parse is an
    /// [`RuntimeError::InvalidSetting`]; out-of-range values fail validation.
    pub fn from_env() -> Result<Self> {
        Self::from_vars(|key| env::var(key).ok())
    }

    /// Same as [`RuntimeConfig::from_env`] with variables read from `lookup`.
    pub fn from_vars(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let read = EnvReader { lookup };
        let mut config = Self::default();

        if let Some(rate) = read.parse::<f64>("MONSTER_AI_LEARNING_RATE")? {
            config.learning.learning_rate = rate;
        }
        if let Some(factor) = read.parse::<f64>("MONSTER_AI_DISCOUNT_FACTOR")? {
            config.learning.discount_factor = factor;
        }
        if let Some(rate) = read.parse::<f64>("MONSTER_AI_EXPLORATION_RATE")? {
            config.learning = config.learning.with_exploration_rate(rate);
        }
        if let Some(limit) = read.parse::<usize>("MONSTER_AI_HISTORY_LIMIT")? {
            config.learning = config.learning.with_history_limit(limit);
        }
        if let Some(version) = read.parse::<u32>("MONSTER_AI_SCHEMA_VERSION")? {
            config.learning.schema_version = version;
        }
        if let Some(policy) = read.parse::<SchemaResetPolicy>("MONSTER_AI_SCHEMA_RESET")? {
            config.schema_reset = policy;
        }
        config.generation_cap = read.parse::<u64>("MONSTER_AI_GENERATION_CAP")?;
        config.data_dir = read.raw("MONSTER_AI_DATA_DIR").map(PathBuf::from);
        if let Some(secs) = read.parse::<u64>("MONSTER_AI_SNAPSHOT_SECS")? {
            config.snapshot_interval_secs = secs;
        }
        if let Some(seed) = read.parse::<u64>("MONSTER_AI_SEED")? {
            config.engine.game_seed = seed;
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        self.learning.validate()?;
        self.memory.validate()?;

        if self.snapshot_interval_secs == 0 {
            return Err(RuntimeError::InvalidSetting {
                key: "snapshot_interval_secs",
                reason: "must be at least 1".into(),
            });
        }
        if !self.engine.death_penalty.is_finite() {
            return Err(RuntimeError::InvalidSetting {
                key: "engine.death_penalty",
                reason: "must be finite".into(),
            });
        }
        if !(0.0..=1.0).contains(&self.engine.share_blend) {
            return Err(RuntimeError::InvalidSetting {
                key: "engine.share_blend",
                reason: format!("must lie within [0, 1], got {}", self.engine.share_blend),
            });
        }
        Ok(())
    }

    pub fn snapshot_interval(&self) -> Duration {
        Duration::from_secs(self.snapshot_interval_secs)
    }

    /// `data_dir`, or the platform data directory.
    ///
    /// - macOS: `~/Library/Application Support/monster-intelligence/knowledge`
    /// - Linux: `~/.local/share/monster-intelligence/knowledge`
    /// - Windows: `%APPDATA%\monster-intelligence\knowledge`
    /// - Fallback: `./save_data/knowledge`
    pub fn resolved_data_dir(&self) -> PathBuf {
        if let Some(dir) = &self.data_dir {
            return dir.clone();
        }
        directories::ProjectDirs::from("", "", "monster-intelligence")
            .map(|dirs| dirs.data_dir().to_path_buf())
            .unwrap_or_else(|| PathBuf::from("./save_data"))
            .join("knowledge")
    }
}

struct EnvReader<F> {
    lookup: F,
}

impl<F: Fn(&str) -> Option<String>> EnvReader<F> {
    fn raw(&self, key: &str) -> Option<String> {
        (self.lookup)(key).filter(|value| !value.trim().is_empty())
    }

    fn parse<T>(&self, key: &'static str) -> Result<Option<T>>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        let Some(value) = self.raw(key) else {
            return Ok(None);
        };
        value
            .trim()
            .parse()
            .map(Some)
            .map_err(|err| RuntimeError::InvalidSetting {
                key,
                reason: format!("cannot parse {value:?}: {err}"),
            })
    }
}
