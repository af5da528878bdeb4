//! Workflow state machine for the pipeline controller.
//!
//! This module provides the pipeline states and their transition table, the
//! caller-owned context, transition records, and the controller that ties
//! them to checkpoint persistence.

mod context;
mod controller;
mod record;
mod types;

pub use context::{merge, validate, Context, ContextValue};
pub use controller::{ControllerOptions, ControllerSummary, PersistencePolicy, WorkflowController};
pub use record::TransitionRecord;
pub use types::WorkflowState;
