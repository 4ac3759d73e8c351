//! Unified error types surfaced by the runtime API.
//!
//! Wraps configuration, observation and repository failures together with
//! worker coordination errors so clients can bubble them up with consistent
//! context.

use std::path::PathBuf;

use intelligence_core::{ConfigError, ErrorSeverity, IntelligenceError, ObservationError};
use thiserror::Error;
use tokio::sync::oneshot;

pub use crate::repository::RepositoryError;

pub type Result<T> = std::result::Result<T, RuntimeError>;

#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Observation(#[from] ObservationError),

    #[error(transparent)]
    Repository(#[from] RepositoryError),

    #[error("invalid setting {key}: {reason}")]
    InvalidSetting { key: &'static str, reason: String },

    #[error("failed to parse configuration: {0}")]
    ConfigParse(String),

    #[error("failed to load species profiles from {path}: {reason}")]
    ProfileLoad { path: PathBuf, reason: String },

    #[error("snapshot worker command channel closed")]
    CommandChannelClosed,

    #[error("snapshot worker reply channel closed")]
    ReplyChannelClosed(#[source] oneshot::error::RecvError),

    #[error("snapshot worker join failed")]
    WorkerJoin(#[source] tokio::task::JoinError),
}

impl RuntimeError {
    /// Severity of the underlying failure.
    ///
    /// Observation errors are caller-correctable; everything else means the
    /// runtime cannot continue as configured.
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            Self::Config(e) => e.severity(),
            Self::Observation(e) => e.severity(),
            _ => ErrorSeverity::Fatal,
        }
    }
}
