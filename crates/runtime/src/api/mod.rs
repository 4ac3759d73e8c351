//! Public runtime API surface.
//!
//! This module gathers the types exposed to consumers of the runtime crate so
//! other layers can stay focused on learning, persistence and workers.

pub mod errors;
pub mod inspection;

pub use errors::{Result, RuntimeError};
pub use inspection::{HistoryPage, ProfileView, SpeciesSummary};
