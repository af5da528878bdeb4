use std::path::PathBuf;

use thiserror::Error;

use crate::workflow::WorkflowState;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("No home directory")]
    NoHomeDir,

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Task join error: {0}")]
    TaskJoin(String),

    #[error("Invalid transition from {from} to {to}")]
    InvalidTransition {
        from: WorkflowState,
        to: WorkflowState,
    },

    #[error("Cannot roll back {requested} step(s): only {available} in history")]
    RollbackUnderflow { requested: usize, available: usize },

    #[error("Rollback step count must be at least 1")]
    InvalidRollback,

    #[error("Checkpoint write failed at {}: {source}", .path.display())]
    Checkpoint {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Checkpoint not found: {0}")]
    CheckpointNotFound(String),

    #[error("Corrupt checkpoint {}: {reason}", .path.display())]
    CorruptCheckpoint { path: PathBuf, reason: String },

    #[error("Unknown workflow state: {0}")]
    UnknownState(String),
}

pub type Result<T> = std::result::Result<T, Error>;
