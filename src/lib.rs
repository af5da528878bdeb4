//! Pipeline workflow controller with durable checkpoints.
//!
//! A [`WorkflowController`] walks one pipeline run through its stages
//! (validate request, load specs, select agents, execute agents, QA,
//! optional UI tests, summary) and writes a full checkpoint after every
//! accepted change, so a restarted process can resume from disk.

pub mod config;
pub mod error;
pub mod handle;
pub mod log;
pub mod state;
pub mod util;
pub mod workflow;

pub use error::{Error, Result};
pub use handle::ControllerHandle;
pub use state::{Checkpoint, CheckpointStore};
pub use workflow::{
    Context, ContextValue, ControllerOptions, ControllerSummary, PersistencePolicy,
    TransitionRecord, WorkflowController, WorkflowState,
};
