use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::state::DEFAULT_RETENTION_LIMIT;
use crate::util::expand_tilde;
use crate::workflow::{ControllerOptions, PersistencePolicy};
use crate::{Error, Result};

#[derive(Debug, Clone, Deserialize, Default, PartialEq)]
pub struct Config {
    pub checkpoint_dir: Option<String>,
    pub retention_limit: Option<usize>,
    pub persistence: Option<PersistencePolicy>,
}

impl Config {
    pub fn app_dir() -> Result<PathBuf> {
        Ok(dirs::home_dir().ok_or(Error::NoHomeDir)?.join(".orchestrator"))
    }

    pub fn config_path() -> Result<PathBuf> {
        Ok(Self::app_dir()?.join("orchestrator.toml"))
    }

    pub fn log_path() -> Result<PathBuf> {
        Ok(Self::app_dir()?.join("orchestrator.log"))
    }

    pub fn default_checkpoint_dir() -> Result<PathBuf> {
        Ok(Self::app_dir()?.join("checkpoints"))
    }

    pub fn checkpoint_dir(&self) -> Result<PathBuf> {
        match &self.checkpoint_dir {
            Some(dir) => Ok(expand_tilde(dir)),
            None => Self::default_checkpoint_dir(),
        }
    }

    pub fn effective_retention_limit(&self) -> usize {
        self.retention_limit.unwrap_or(DEFAULT_RETENTION_LIMIT)
    }

    pub fn effective_persistence(&self) -> PersistencePolicy {
        self.persistence.unwrap_or_default()
    }

    /// Controller options described by this config.
    pub fn controller_options(&self) -> Result<ControllerOptions> {
        let limit = self.effective_retention_limit();
        if limit == 0 {
            return Err(Error::Validation(
                "retention_limit must be at least 1".to_string(),
            ));
        }
        Ok(ControllerOptions::new(self.checkpoint_dir()?)
            .retention_limit(limit)
            .persistence(self.effective_persistence()))
    }

    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        debug!(path = %path.display(), "Config::load");
        if !path.exists() {
            debug!("Config file not found, using defaults");
            return Ok(Self::default());
        }
        let config: Self = toml::from_str(&fs::read_to_string(path)?)?;
        debug!(
            checkpoint_dir = ?config.checkpoint_dir,
            retention_limit = ?config.retention_limit,
            persistence = ?config.persistence,
            "Config loaded"
        );
        Ok(config)
    }
}
