//! CheckpointStore - one-file-per-checkpoint persistence with retention.

use std::fmt;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{Duration, NaiveDateTime};
use tracing::{debug, info, warn};

use super::checkpoint::{self, Checkpoint, CheckpointDocument};
use super::clock::{Clock, SystemClock};
use crate::workflow::{Context, TransitionRecord, WorkflowState};
use crate::{Error, Result};

/// Number of checkpoint files kept on disk after each write.
pub const DEFAULT_RETENTION_LIMIT: usize = 100;

/// Writes full snapshots into a dedicated directory and prunes old ones.
///
/// The store assumes it is the only writer of `checkpoint_*.json` files in
/// its directory.
pub struct CheckpointStore {
    dir: PathBuf,
    retention_limit: usize,
    clock: Arc<dyn Clock>,
    last_issued: Option<NaiveDateTime>,
}

impl fmt::Debug for CheckpointStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CheckpointStore")
            .field("dir", &self.dir)
            .field("retention_limit", &self.retention_limit)
            .field("last_issued", &self.last_issued)
            .finish()
    }
}

impl CheckpointStore {
    /// Open a store over `dir` using the system clock, creating the directory.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        Self::with_clock(dir, DEFAULT_RETENTION_LIMIT, Arc::new(SystemClock))
    }

    pub fn with_clock(
        dir: impl Into<PathBuf>,
        retention_limit: usize,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        let dir = dir.into();
        if retention_limit == 0 {
            return Err(Error::Validation(
                "checkpoint retention limit must be at least 1".to_string(),
            ));
        }
        debug!(dir = %dir.display(), retention_limit, "CheckpointStore::open");
        ensure_dir(&dir)?;

        let mut store = Self {
            dir,
            retention_limit,
            clock,
            last_issued: None,
        };
        // Ids written by an earlier process must still sort before ours.
        store.last_issued = store
            .latest()?
            .as_deref()
            .and_then(checkpoint::id_from_file_name)
            .and_then(checkpoint::parse_id);
        Ok(store)
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn retention_limit(&self) -> usize {
        self.retention_limit
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    /// Issue the next checkpoint id.
    ///
    /// Ids are strictly increasing within a store: when the clock has not
    /// moved past the previous id (same microsecond, or time went
    /// backwards) the new id is one microsecond after the previous one.
    fn next_id(&mut self, now: chrono::DateTime<chrono::Utc>) -> String {
        let mut candidate = checkpoint::local_micros(now);
        if let Some(last) = self.last_issued {
            if candidate <= last {
                candidate = last + Duration::microseconds(1);
            }
        }
        self.last_issued = Some(candidate);
        checkpoint::format_id(candidate)
    }

    /// Write a full snapshot and enforce retention. Returns the new id.
    pub fn write(
        &mut self,
        state: WorkflowState,
        context: &Context,
        history: &[TransitionRecord],
    ) -> Result<String> {
        let now = self.clock.now();
        let id = self.next_id(now);
        let document = CheckpointDocument {
            checkpoint_id: &id,
            state,
            context,
            history,
            timestamp: now,
        };
        let contents = serde_json::to_string_pretty(&document)?;

        ensure_dir(&self.dir)?;
        let path = self.dir.join(checkpoint::file_name(&id));
        let temp_path = path.with_extension("json.tmp");
        fs::write(&temp_path, contents).map_err(|source| Error::Checkpoint {
            path: temp_path.clone(),
            source,
        })?;
        if let Err(source) = fs::rename(&temp_path, &path) {
            let _ = fs::remove_file(&temp_path);
            return Err(Error::Checkpoint { path, source });
        }
        info!(checkpoint = %id, state = %state, history = history.len(), "Checkpoint saved");

        self.enforce_retention();
        Ok(id)
    }

    /// Delete the oldest checkpoints until at most `retention_limit` remain.
    ///
    /// Best effort: listing or deletion failures are logged and skipped.
    /// Returns how many files were removed.
    pub fn enforce_retention(&self) -> usize {
        let names = match self.list() {
            Ok(names) => names,
            Err(e) => {
                warn!(dir = %self.dir.display(), error = %e, "Could not list checkpoints for retention");
                return 0;
            }
        };
        if names.len() <= self.retention_limit {
            return 0;
        }

        let excess = names.len() - self.retention_limit;
        let mut removed = 0;
        for name in &names[..excess] {
            let path = self.dir.join(name);
            match fs::remove_file(&path) {
                Ok(()) => {
                    debug!(checkpoint = %name, "Removed old checkpoint");
                    removed += 1;
                }
                Err(e) => warn!(path = %path.display(), error = %e, "Failed to remove old checkpoint"),
            }
        }
        removed
    }

    /// Recognized checkpoint file names, oldest first.
    ///
    /// A missing directory holds no checkpoints.
    pub fn list(&self) -> Result<Vec<String>> {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut names = Vec::new();
        for entry in entries {
            let entry = entry?;
            if let Some(name) = entry.file_name().to_str() {
                if checkpoint::is_checkpoint_file_name(name) {
                    names.push(name.to_string());
                }
            }
        }
        names.sort();
        Ok(names)
    }

    /// File name of the most recent checkpoint, if any.
    pub fn latest(&self) -> Result<Option<String>> {
        Ok(self.list()?.pop())
    }

    /// Resolve an identifier to a path.
    ///
    /// Accepts a path (anything with a directory component), a checkpoint
    /// file name, or a bare id; names and ids are looked up in the store
    /// directory.
    pub fn resolve(&self, identifier: &str) -> PathBuf {
        let as_path = Path::new(identifier);
        if as_path.is_absolute() || as_path.components().count() > 1 {
            return as_path.to_path_buf();
        }
        if checkpoint::is_checkpoint_id(identifier) {
            return self.dir.join(checkpoint::file_name(identifier));
        }
        self.dir.join(identifier)
    }

    /// Read and fully validate a checkpoint without touching any live state.
    pub fn load(&self, identifier: &str) -> Result<Checkpoint> {
        let path = self.resolve(identifier);
        debug!(path = %path.display(), "CheckpointStore::load");

        let contents = match fs::read_to_string(&path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(Error::CheckpointNotFound(identifier.to_string()))
            }
            Err(e) => return Err(e.into()),
        };

        let checkpoint: Checkpoint =
            serde_json::from_str(&contents).map_err(|e| Error::CorruptCheckpoint {
                path: path.clone(),
                reason: e.to_string(),
            })?;
        checkpoint
            .validate()
            .map_err(|reason| Error::CorruptCheckpoint { path, reason })?;
        Ok(checkpoint)
    }
}

fn ensure_dir(dir: &Path) -> Result<()> {
    if dir.is_dir() {
        return Ok(());
    }
    debug!(dir = %dir.display(), "Creating checkpoint directory");
    fs::create_dir_all(dir).map_err(|source| Error::Checkpoint {
        path: dir.to_path_buf(),
        source,
    })
}
