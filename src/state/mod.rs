//! File-backed checkpoint persistence for workflow runs.
//!
//! Every checkpoint is a complete, independently restorable snapshot of
//! state, context and history written to its own file.

pub mod checkpoint;
mod clock;
mod store;

pub use checkpoint::Checkpoint;
pub use clock::{Clock, ManualClock, SystemClock};
pub use store::{CheckpointStore, DEFAULT_RETENTION_LIMIT};
