//! Logging setup for the orchestrator.
//!
//! Library code logs through `tracing` macros:
//! - WARN: rejected transitions/rollbacks, failed checkpoint writes or loads
//! - INFO: accepted transitions, checkpoints written or loaded
//! - DEBUG: detailed operation traces
//!
//! The binary installs a subscriber that writes to
//! `~/.orchestrator/orchestrator.log`. Debug mode can be enabled with
//! `--debug` or `ORCHESTRATOR_DEBUG=1`; `RUST_LOG` overrides both.

use std::fs::File;
use std::path::Path;
use std::sync::Mutex;

use tracing_subscriber::EnvFilter;

use crate::config::Config;

pub const DEBUG_ENV: &str = "ORCHESTRATOR_DEBUG";

/// True when `ORCHESTRATOR_DEBUG` is `1` or `true`.
pub fn debug_from_env() -> bool {
    std::env::var(DEBUG_ENV)
        .map(|v| is_truthy(&v))
        .unwrap_or(false)
}

fn is_truthy(value: &str) -> bool {
    value == "1" || value.eq_ignore_ascii_case("true")
}

/// Default filter directive for the given mode.
pub fn default_directive(debug: bool) -> &'static str {
    if debug {
        "orchestrator=debug"
    } else {
        "orchestrator=info"
    }
}

/// Initialize logging to `~/.orchestrator/orchestrator.log`.
pub fn init_with_debug(debug: bool) {
    let debug = debug || debug_from_env();
    if let Ok(path) = Config::log_path() {
        init_at(&path, debug);
    }
}

/// Initialize logging into `path`, truncating it.
///
/// Logging is optional: if the file cannot be created or a subscriber is
/// already installed, this does nothing.
pub fn init_at(path: &Path, debug: bool) {
    if let Some(parent) = path.parent() {
        let _ = std::fs::create_dir_all(parent);
    }
    let Ok(file) = File::create(path) else {
        return;
    };

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(debug)));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .with_target(false)
        .try_init();
}
