//! Background workers owned by the runtime.
//!
//! Only persistence runs in the background; decisions and rewards are
//! synchronous calls on the shared store.

mod snapshot;

pub use snapshot::{Command, SnapshotHandle, SnapshotWorker};
