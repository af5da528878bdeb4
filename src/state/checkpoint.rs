//! Checkpoint documents and the file naming scheme.
//!
//! A checkpoint file is named `checkpoint_<id>.json` where `<id>` is the
//! local time of the write formatted as `YYYYMMDD_HHMMSS_ffffff`. Because
//! every field is zero-padded, sorting names sorts checkpoints by creation.

use std::sync::LazyLock;

use chrono::{DateTime, Local, NaiveDateTime, Timelike, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::workflow::{Context, TransitionRecord, WorkflowState};

pub const FILE_PREFIX: &str = "checkpoint_";
pub const FILE_EXTENSION: &str = "json";

const ID_FORMAT: &str = "%Y%m%d_%H%M%S_%6f";

static FILE_NAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^checkpoint_(\d{8}_\d{6}_\d{6})\.json$").unwrap());

static ID_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\d{8}_\d{6}_\d{6}$").unwrap());

/// Format an instant as a checkpoint id in local time, truncated to microseconds.
pub fn format_id(instant: NaiveDateTime) -> String {
    instant.format(ID_FORMAT).to_string()
}

pub fn parse_id(id: &str) -> Option<NaiveDateTime> {
    if !ID_RE.is_match(id) {
        return None;
    }
    NaiveDateTime::parse_from_str(id, ID_FORMAT).ok()
}

/// Local wall-clock time of `instant`, truncated to whole microseconds.
pub fn local_micros(instant: DateTime<Utc>) -> NaiveDateTime {
    let local = instant.with_timezone(&Local).naive_local();
    let micros = local.nanosecond() / 1_000 * 1_000;
    local.with_nanosecond(micros).unwrap_or(local)
}

pub fn file_name(id: &str) -> String {
    format!("{}{}.{}", FILE_PREFIX, id, FILE_EXTENSION)
}

/// Extract the id from a recognized checkpoint file name.
pub fn id_from_file_name(name: &str) -> Option<&str> {
    FILE_NAME_RE
        .captures(name)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

pub fn is_checkpoint_file_name(name: &str) -> bool {
    FILE_NAME_RE.is_match(name)
}

pub fn is_checkpoint_id(id: &str) -> bool {
    ID_RE.is_match(id)
}

/// A checkpoint as read back from disk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Checkpoint {
    pub checkpoint_id: String,
    pub state: WorkflowState,
    #[serde(default)]
    pub context: Context,
    #[serde(default)]
    pub history: Vec<TransitionRecord>,
    pub timestamp: DateTime<Utc>,
}

impl Checkpoint {
    /// Check that the history is a legal chain starting from idle and that
    /// the recorded state is the one it leads to.
    pub fn validate(&self) -> std::result::Result<(), String> {
        let mut expected = WorkflowState::Idle;
        for (index, record) in self.history.iter().enumerate() {
            if record.from != expected {
                return Err(format!(
                    "history[{}] starts at {} (expected {})",
                    index, record.from, expected
                ));
            }
            if !record.from.can_transition_to(record.to) {
                return Err(format!(
                    "history[{}] is not a legal transition ({} -> {})",
                    index, record.from, record.to
                ));
            }
            expected = record.to;
        }
        if self.state != expected {
            return Err(format!(
                "state {} does not match history (expected {})",
                self.state, expected
            ));
        }
        Ok(())
    }
}

/// Borrowed view used when writing, so snapshots don't clone the history.
#[derive(Debug, Serialize)]
pub(crate) struct CheckpointDocument<'a> {
    pub checkpoint_id: &'a str,
    pub state: WorkflowState,
    pub context: &'a Context,
    pub history: &'a [TransitionRecord],
    pub timestamp: DateTime<Utc>,
}
