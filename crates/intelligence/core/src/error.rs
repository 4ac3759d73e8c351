//! Common error infrastructure for intelligence-core.
//!
//! Domain errors ([`crate::ConfigError`], [`crate::ObservationError`]) are
//! defined beside the code that raises them. This module only provides the
//! classification shared by all of them.
//!
//! # Design Principles
//!
//! - **Caller-correctable**: every error names the offending field or value
//! - **Severity Classification**: consumers choose logging and recovery by severity
//! - **No retries**: core operations are deterministic, so retrying never helps

/// Severity level of an error, used for categorization and recovery strategies.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ErrorSeverity {
    /// Invalid input from upstream data; fix the caller and try again.
    ///
    /// Examples: hp ratio above 1.0, unknown room type
    Validation,

    /// The component cannot be constructed with the given settings.
    ///
    /// Examples: learning rate outside `[0, 1]`
    Fatal,
}

impl ErrorSeverity {
    /// Returns a human-readable description of this severity level.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Validation => "validation",
            Self::Fatal => "fatal",
        }
    }

    /// Returns true if the caller can recover by correcting its input.
    pub const fn is_recoverable(&self) -> bool {
        matches!(self, Self::Validation)
    }
}

/// Common trait for all intelligence-core errors.
///
/// # Implementation Guidelines
///
/// - Use `#[derive(thiserror::Error)]` for Display/Error impl
/// - Return a stable snake_case code per variant from `error_code`
pub trait IntelligenceError: core::fmt::Display + core::fmt::Debug {
    /// Returns the severity level of this error.
    fn severity(&self) -> ErrorSeverity;

    /// Returns a static string identifier for this error variant.
    fn error_code(&self) -> &'static str;
}
