//! Learning configuration constants and tunable parameters.

use crate::error::{ErrorSeverity, IntelligenceError};
use crate::learning::LearningParams;
use crate::memory::MAX_THREAT_EVENTS;

/// Layout tag of the live state space and action set.
///
/// Bump whenever [`crate::STATE_COUNT`] or [`crate::ACTION_COUNT`] changes, or
/// when bins are redefined: persisted tables of another version are reset.
pub const CURRENT_SCHEMA_VERSION: u32 = 4;

/// Configuration rejected at construction time.
#[derive(Clone, Debug, PartialEq, thiserror::Error)]
pub enum ConfigError {
    #[error("{name} must lie within [0, 1], got {value}")]
    OutOfUnitRange { name: &'static str, value: f64 },

    #[error("min_exploration_rate {min} exceeds exploration_rate {initial}")]
    ExplorationFloorAboveRate { min: f64, initial: f64 },

    #[error("exploration_decay must lie within (0, 1], got {0}")]
    InvalidExplorationDecay(f64),

    #[error("history_limit must be at least 1")]
    ZeroHistoryLimit,

    #[error("memory capacity must lie within 1..={max}, got {capacity}")]
    InvalidMemoryCapacity { capacity: usize, max: usize },

    #[error("memory intensity_decay must lie within [0, 1], got {0}")]
    InvalidIntensityDecay(f64),

    #[error("schema_version {configured} predates the live layout version {current}")]
    StaleSchemaVersion { configured: u32, current: u32 },
}

impl IntelligenceError for ConfigError {
    fn severity(&self) -> ErrorSeverity {
        ErrorSeverity::Fatal
    }

    fn error_code(&self) -> &'static str {
        match self {
            Self::OutOfUnitRange { .. } => "out_of_unit_range",
            Self::ExplorationFloorAboveRate { .. } => "exploration_floor_above_rate",
            Self::InvalidExplorationDecay(_) => "invalid_exploration_decay",
            Self::ZeroHistoryLimit => "zero_history_limit",
            Self::InvalidMemoryCapacity { .. } => "invalid_memory_capacity",
            Self::InvalidIntensityDecay(_) => "invalid_intensity_decay",
            Self::StaleSchemaVersion { .. } => "stale_schema_version",
        }
    }
}

/// Hyperparameters of the Q-learning loop.
///
/// `learning_rate` (α) and `discount_factor` (γ) drive the Bellman update;
/// `exploration_rate` (ε) is the initial probability of a random action and
/// decays towards `min_exploration_rate` by `exploration_decay` after every
/// reward. A decay of 1.0 keeps ε constant.
///
/// `schema_version` tags every table the store builds; persisted tables with
/// another tag are reset on load. It defaults to [`CURRENT_SCHEMA_VERSION`]
/// and may only be raised.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct LearningConfig {
    pub learning_rate: f64,
    pub discount_factor: f64,
    pub exploration_rate: f64,
    pub min_exploration_rate: f64,
    pub exploration_decay: f64,
    pub history_limit: usize,
    pub schema_version: u32,
}

impl LearningConfig {
    pub const DEFAULT_LEARNING_RATE: f64 = 0.1;
    pub const DEFAULT_DISCOUNT_FACTOR: f64 = 0.95;
    pub const DEFAULT_EXPLORATION_RATE: f64 = 0.3;
    pub const DEFAULT_MIN_EXPLORATION_RATE: f64 = 0.05;
    pub const DEFAULT_EXPLORATION_DECAY: f64 = 1.0;
    pub const DEFAULT_HISTORY_LIMIT: usize = 100;

    pub fn new() -> Self {
        Self {
            learning_rate: Self::DEFAULT_LEARNING_RATE,
            discount_factor: Self::DEFAULT_DISCOUNT_FACTOR,
            exploration_rate: Self::DEFAULT_EXPLORATION_RATE,
            min_exploration_rate: Self::DEFAULT_MIN_EXPLORATION_RATE,
            exploration_decay: Self::DEFAULT_EXPLORATION_DECAY,
            history_limit: Self::DEFAULT_HISTORY_LIMIT,
            schema_version: CURRENT_SCHEMA_VERSION,
        }
    }

    /// Sets the exploration rate and lowers the floor if it would exceed it.
    #[must_use]
    pub fn with_exploration_rate(mut self, exploration_rate: f64) -> Self {
        self.exploration_rate = exploration_rate;
        self.min_exploration_rate = self.min_exploration_rate.min(exploration_rate);
        self
    }

    #[must_use]
    pub fn with_history_limit(mut self, history_limit: usize) -> Self {
        self.history_limit = history_limit;
        self
    }

    /// Checks every parameter against its documented range.
    pub fn validate(&self) -> Result<(), ConfigError> {
        unit_range("learning_rate", self.learning_rate)?;
        unit_range("discount_factor", self.discount_factor)?;
        unit_range("exploration_rate", self.exploration_rate)?;
        unit_range("min_exploration_rate", self.min_exploration_rate)?;

        if self.min_exploration_rate > self.exploration_rate {
            return Err(ConfigError::ExplorationFloorAboveRate {
                min: self.min_exploration_rate,
                initial: self.exploration_rate,
            });
        }
        if !(self.exploration_decay > 0.0 && self.exploration_decay <= 1.0) {
            return Err(ConfigError::InvalidExplorationDecay(self.exploration_decay));
        }
        if self.history_limit == 0 {
            return Err(ConfigError::ZeroHistoryLimit);
        }
        // a newer tag forces a relearn; an older one would claim a layout
        // the encoder no longer produces
        if self.schema_version < CURRENT_SCHEMA_VERSION {
            return Err(ConfigError::StaleSchemaVersion {
                configured: self.schema_version,
                current: CURRENT_SCHEMA_VERSION,
            });
        }
        Ok(())
    }

    /// α and γ as consumed by [`crate::apply_bellman`].
    pub fn params(&self) -> LearningParams {
        LearningParams {
            learning_rate: self.learning_rate,
            discount_factor: self.discount_factor,
        }
    }

    /// One decay step of ε, never below the configured floor.
    pub fn decay_exploration(&self, current: f64) -> f64 {
        (current * self.exploration_decay).max(self.min_exploration_rate)
    }
}

impl Default for LearningConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Short-term threat memory settings.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct MemoryConfig {
    /// Events kept per monster, at most [`MAX_THREAT_EVENTS`].
    pub capacity: usize,
    /// Ticks after the last sighting at which a remembered threat goes stale.
    pub stale_after_ticks: u64,
    /// Linear intensity loss per elapsed tick.
    pub intensity_decay: f64,
}

impl MemoryConfig {
    pub const DEFAULT_CAPACITY: usize = 5;
    pub const DEFAULT_STALE_AFTER_TICKS: u64 = 10;
    pub const DEFAULT_INTENSITY_DECAY: f64 = 0.05;

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.capacity == 0 || self.capacity > MAX_THREAT_EVENTS {
            return Err(ConfigError::InvalidMemoryCapacity {
                capacity: self.capacity,
                max: MAX_THREAT_EVENTS,
            });
        }
        if !(0.0..=1.0).contains(&self.intensity_decay) {
            return Err(ConfigError::InvalidIntensityDecay(self.intensity_decay));
        }
        Ok(())
    }
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            capacity: Self::DEFAULT_CAPACITY,
            stale_after_ticks: Self::DEFAULT_STALE_AFTER_TICKS,
            intensity_decay: Self::DEFAULT_INTENSITY_DECAY,
        }
    }
}

fn unit_range(name: &'static str, value: f64) -> Result<(), ConfigError> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::OutOfUnitRange { name, value })
    }
}
