//! Shared, serialized access to a single controller.
//!
//! `WorkflowController` does no locking of its own. A `ControllerHandle`
//! wraps one controller in a mutex so every operation runs alone; clone the
//! handle to give each driver its own reference. The async methods run the
//! locked operation on the blocking pool since checkpoint writes touch disk.

use std::sync::{Arc, Mutex};

use crate::util::blocking;
use crate::workflow::{
    Context, ControllerSummary, TransitionRecord, WorkflowController, WorkflowState,
};
use crate::Result;

#[derive(Debug, Clone)]
pub struct ControllerHandle {
    inner: Arc<Mutex<WorkflowController>>,
}

impl ControllerHandle {
    pub fn new(controller: WorkflowController) -> Self {
        Self {
            inner: Arc::new(Mutex::new(controller)),
        }
    }

    /// Run `f` with exclusive access to the controller.
    ///
    /// A panic inside an earlier `f` does not poison the handle: the
    /// controller never holds a half-applied change between operations.
    pub fn with<R>(&self, f: impl FnOnce(&mut WorkflowController) -> R) -> R {
        let mut guard = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        f(&mut guard)
    }

    pub async fn transition(&self, state: WorkflowState, context_update: Context) -> Result<()> {
        let handle = self.clone();
        blocking(move || handle.with(|c| c.transition(state, context_update))).await
    }

    pub async fn rollback(&self, steps: usize) -> Result<()> {
        let handle = self.clone();
        blocking(move || handle.with(|c| c.rollback(steps))).await
    }

    pub async fn load_checkpoint(&self, identifier: impl Into<String>) -> Result<()> {
        let handle = self.clone();
        let identifier = identifier.into();
        blocking(move || handle.with(|c| c.load_checkpoint(&identifier))).await
    }

    pub async fn resume_latest(&self) -> Result<bool> {
        let handle = self.clone();
        blocking(move || handle.with(|c| c.resume_latest())).await
    }

    pub fn reset(&self) {
        self.with(|c| c.reset())
    }

    pub fn state(&self) -> WorkflowState {
        self.with(|c| c.state())
    }

    pub fn summary(&self) -> ControllerSummary {
        self.with(|c| c.summary())
    }

    pub fn export_history(&self) -> Vec<TransitionRecord> {
        self.with(|c| c.export_history())
    }
}
