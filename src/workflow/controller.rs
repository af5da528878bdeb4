//! Workflow controller with transition validation and checkpointing.
//!
//! `WorkflowController` owns the current state, the accumulated context and
//! the ordered transition history of one pipeline run, and writes a
//! checkpoint after every accepted change so a restarted process can
//! resume from disk.

use std::path::PathBuf;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::context::{merge, validate};
use super::{Context, TransitionRecord, WorkflowState};
use crate::state::{Checkpoint, CheckpointStore, Clock, SystemClock, DEFAULT_RETENTION_LIMIT};
use crate::{Error, Result};

/// What to do when the checkpoint for an accepted change cannot be written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PersistencePolicy {
    /// Fail the operation and leave the controller unchanged.
    #[default]
    Strict,
    /// Apply the change anyway; the write error is logged and reported by
    /// `summary().last_checkpoint_error` until the next successful write.
    BestEffort,
}

impl std::fmt::Display for PersistencePolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PersistencePolicy::Strict => write!(f, "strict"),
            PersistencePolicy::BestEffort => write!(f, "best_effort"),
        }
    }
}

/// Construction parameters for a controller.
#[derive(Clone)]
pub struct ControllerOptions {
    pub checkpoint_dir: PathBuf,
    pub retention_limit: usize,
    pub persistence: PersistencePolicy,
    pub clock: Arc<dyn Clock>,
}

impl ControllerOptions {
    pub fn new(checkpoint_dir: impl Into<PathBuf>) -> Self {
        Self {
            checkpoint_dir: checkpoint_dir.into(),
            retention_limit: DEFAULT_RETENTION_LIMIT,
            persistence: PersistencePolicy::default(),
            clock: Arc::new(SystemClock),
        }
    }

    pub fn retention_limit(mut self, limit: usize) -> Self {
        self.retention_limit = limit;
        self
    }

    pub fn persistence(mut self, policy: PersistencePolicy) -> Self {
        self.persistence = policy;
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }
}

impl std::fmt::Debug for ControllerOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ControllerOptions")
            .field("checkpoint_dir", &self.checkpoint_dir)
            .field("retention_limit", &self.retention_limit)
            .field("persistence", &self.persistence)
            .finish_non_exhaustive()
    }
}

/// Read-only view of a controller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ControllerSummary {
    pub current_state: WorkflowState,
    pub context_keys: Vec<String>,
    pub history_length: usize,
    pub last_checkpoint: Option<String>,
    pub last_checkpoint_error: Option<String>,
}

/// Drives one pipeline through its states.
///
/// Not synchronized: share it through [`crate::handle::ControllerHandle`]
/// when more than one caller needs to mutate it.
#[derive(Debug)]
pub struct WorkflowController {
    state: WorkflowState,
    context: Context,
    history: Vec<TransitionRecord>,
    store: CheckpointStore,
    persistence: PersistencePolicy,
    last_checkpoint: Option<String>,
    last_checkpoint_error: Option<String>,
}

impl WorkflowController {
    /// Open a controller over `checkpoint_dir` with default options.
    pub fn open(checkpoint_dir: impl Into<PathBuf>) -> Result<Self> {
        Self::with_options(ControllerOptions::new(checkpoint_dir))
    }

    /// Create a controller in `Idle`, ensuring the checkpoint directory exists.
    ///
    /// Existing checkpoints are not loaded; call [`Self::resume_latest`] or
    /// [`Self::load_checkpoint`] for that.
    pub fn with_options(options: ControllerOptions) -> Result<Self> {
        debug!(?options, "WorkflowController::with_options");
        let store = CheckpointStore::with_clock(
            options.checkpoint_dir,
            options.retention_limit,
            options.clock,
        )?;
        Ok(Self {
            state: WorkflowState::Idle,
            context: Context::new(),
            history: Vec::new(),
            store,
            persistence: options.persistence,
            last_checkpoint: None,
            last_checkpoint_error: None,
        })
    }

    pub fn state(&self) -> WorkflowState {
        self.state
    }

    pub fn context(&self) -> &Context {
        &self.context
    }

    pub fn history(&self) -> &[TransitionRecord] {
        &self.history
    }

    pub fn last_checkpoint(&self) -> Option<&str> {
        self.last_checkpoint.as_deref()
    }

    pub fn persistence(&self) -> PersistencePolicy {
        self.persistence
    }

    pub fn store(&self) -> &CheckpointStore {
        &self.store
    }

    pub fn can_transition(&self, target: WorkflowState) -> bool {
        self.state.can_transition_to(target)
    }

    /// Move to `new_state`, merging `context_update` into the context.
    ///
    /// Rejected transitions change nothing and write nothing. An accepted
    /// transition appends one history record and writes one checkpoint.
    /// Updates holding NaN or infinite floats are rejected with
    /// `Error::Validation`.
    pub fn transition(&mut self, new_state: WorkflowState, context_update: Context) -> Result<()> {
        if !self.state.can_transition_to(new_state) {
            warn!(from = %self.state, to = %new_state, "Rejected invalid transition");
            return Err(Error::InvalidTransition {
                from: self.state,
                to: new_state,
            });
        }
        if let Err(e) = validate(&context_update) {
            warn!(to = %new_state, error = %e, "Rejected context update");
            return Err(e);
        }

        let mut context = self.context.clone();
        merge(&mut context, &context_update);
        let record = TransitionRecord::new(
            self.state,
            new_state,
            context_update,
            self.store.clock().now(),
        );

        self.history.push(record);
        if let Err(e) = self.checkpoint_staged(new_state, &context) {
            self.history.pop();
            return Err(e);
        }

        info!(from = %self.state, to = %new_state, history = self.history.len(), "Transition accepted");
        self.state = new_state;
        self.context = context;
        Ok(())
    }

    /// Drop the last `steps` history records and recompute the state.
    ///
    /// The context is NOT rolled back: values merged by the discarded
    /// transitions stay in place. Only when the history becomes empty is
    /// the context cleared along with the return to `Idle`. The rollback
    /// writes its own checkpoint.
    pub fn rollback(&mut self, steps: usize) -> Result<()> {
        if steps == 0 {
            warn!("Rejected rollback of zero steps");
            return Err(Error::InvalidRollback);
        }
        if self.history.len() < steps {
            warn!(requested = steps, available = self.history.len(), "Rejected rollback");
            return Err(Error::RollbackUnderflow {
                requested: steps,
                available: self.history.len(),
            });
        }

        let removed = self.history.split_off(self.history.len() - steps);
        let new_state = self
            .history
            .last()
            .map(|record| record.to)
            .unwrap_or(WorkflowState::Idle);
        let cleared = Context::new();
        let context = if self.history.is_empty() {
            &cleared
        } else {
            &self.context
        };

        let outcome = self.store.write(new_state, context, &self.history);
        if let Err(e) = self.settle_checkpoint(outcome) {
            self.history.extend(removed);
            return Err(e);
        }

        info!(steps, from = %self.state, to = %new_state, "Rolled back");
        if self.history.is_empty() {
            self.context.clear();
        }
        self.state = new_state;
        Ok(())
    }

    /// Write a checkpoint of the current state, context and history.
    pub fn checkpoint(&mut self) -> Result<String> {
        let id = self.store.write(self.state, &self.context, &self.history)?;
        self.last_checkpoint = Some(id.clone());
        self.last_checkpoint_error = None;
        Ok(id)
    }

    /// Replace the live state with a checkpoint read from disk.
    ///
    /// `identifier` may be a path, a checkpoint file name, or a bare id.
    /// The file is parsed and validated before anything changes; on error
    /// the controller is untouched.
    pub fn load_checkpoint(&mut self, identifier: &str) -> Result<()> {
        let checkpoint = match self.store.load(identifier) {
            Ok(checkpoint) => checkpoint,
            Err(e) => {
                warn!(identifier, error = %e, "Failed to load checkpoint");
                return Err(e);
            }
        };
        self.restore(checkpoint);
        Ok(())
    }

    /// Load the most recent checkpoint if there is one.
    pub fn resume_latest(&mut self) -> Result<bool> {
        match self.latest_checkpoint()? {
            Some(name) => {
                self.load_checkpoint(&name)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn restore(&mut self, checkpoint: Checkpoint) {
        info!(
            checkpoint = %checkpoint.checkpoint_id,
            state = %checkpoint.state,
            history = checkpoint.history.len(),
            "Checkpoint loaded"
        );
        self.state = checkpoint.state;
        self.context = checkpoint.context;
        self.history = checkpoint.history;
        self.last_checkpoint = Some(checkpoint.checkpoint_id);
        self.last_checkpoint_error = None;
    }

    /// File name of the newest checkpoint in the directory.
    pub fn latest_checkpoint(&self) -> Result<Option<String>> {
        self.store.latest()
    }

    pub fn list_checkpoints(&self) -> Result<Vec<String>> {
        self.store.list()
    }

    /// Return to a fresh `Idle` controller. Files on disk are left alone.
    pub fn reset(&mut self) {
        debug!("WorkflowController::reset");
        self.state = WorkflowState::Idle;
        self.context.clear();
        self.history.clear();
        self.last_checkpoint = None;
        self.last_checkpoint_error = None;
    }

    pub fn summary(&self) -> ControllerSummary {
        ControllerSummary {
            current_state: self.state,
            context_keys: self.context.keys().cloned().collect(),
            history_length: self.history.len(),
            last_checkpoint: self.last_checkpoint.clone(),
            last_checkpoint_error: self.last_checkpoint_error.clone(),
        }
    }

    pub fn export_history(&self) -> Vec<TransitionRecord> {
        self.history.clone()
    }

    /// Checkpoint a staged change: `self.history` already holds the new
    /// records, `state`/`context` are what the controller will hold once
    /// committed.
    fn checkpoint_staged(&mut self, state: WorkflowState, context: &Context) -> Result<()> {
        let outcome = self.store.write(state, context, &self.history);
        self.settle_checkpoint(outcome)
    }

    /// Apply the persistence policy to a write result. `Err` means the
    /// staged change must be undone.
    fn settle_checkpoint(&mut self, outcome: Result<String>) -> Result<()> {
        match outcome {
            Ok(id) => {
                self.last_checkpoint = Some(id);
                self.last_checkpoint_error = None;
                Ok(())
            }
            Err(e) if self.persistence == PersistencePolicy::BestEffort => {
                warn!(error = %e, "Checkpoint write failed, continuing (best effort)");
                self.last_checkpoint_error = Some(e.to_string());
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, "Checkpoint write failed, change not applied");
                Err(e)
            }
        }
    }
}
