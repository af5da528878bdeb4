use std::path::PathBuf;

use clap::{Parser, Subcommand};

use orchestrator::config::Config;
use orchestrator::{Context, ContextValue, Result, WorkflowController, WorkflowState};

/// Orchestrator - inspect and drive a checkpointed pipeline workflow
#[derive(Parser, Debug)]
#[command(name = "orchestrator")]
#[command(version, about, long_about = None)]
#[command(after_help = "ENVIRONMENT:\n    ORCHESTRATOR_DEBUG=1     Enable debug logging (alternative to --debug)")]
pub struct Cli {
    /// Enable debug logging (writes to ~/.orchestrator/orchestrator.log)
    #[arg(short = 'd', long)]
    pub debug: bool,

    /// Checkpoint directory (overrides the config file)
    #[arg(long, global = true)]
    pub dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Command {
    /// Show current state, context keys and last checkpoint
    Status,

    /// Print the transition history as JSON
    History,

    /// List checkpoint files, oldest first
    Checkpoints,

    /// Print a checkpoint document
    Show {
        /// Checkpoint id, file name or path (latest if omitted)
        identifier: Option<String>,
    },

    /// Move the workflow to a new state
    Transition {
        /// Target state, e.g. validating_request
        #[arg(value_parser = parse_state)]
        state: WorkflowState,

        /// Context update as key=value (repeatable); values are parsed as JSON when possible
        #[arg(long = "set", value_parser = parse_assignment)]
        set: Vec<(String, ContextValue)>,
    },

    /// Discard the most recent transitions
    Rollback {
        /// Number of transitions to discard
        #[arg(default_value_t = 1)]
        steps: usize,
    },

    /// Print the transition table
    States,
}

fn parse_state(raw: &str) -> std::result::Result<WorkflowState, String> {
    raw.parse::<WorkflowState>().map_err(|e| e.to_string())
}

fn parse_assignment(raw: &str) -> std::result::Result<(String, ContextValue), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected key=value, got '{}'", raw))?;
    if key.is_empty() {
        return Err("context key must not be empty".to_string());
    }
    Ok((key.to_string(), ContextValue::parse_literal(value)))
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    orchestrator::log::init_with_debug(cli.debug);

    if cli.command == Command::States {
        print_states();
        return Ok(());
    }

    let config = Config::load()?;
    let mut options = config.controller_options()?;
    if let Some(dir) = cli.dir {
        options.checkpoint_dir = dir;
    }
    let mut controller = WorkflowController::with_options(options)?;
    if needs_resume(&cli.command) {
        controller.resume_latest()?;
    }

    match cli.command {
        Command::Status => print_json(&controller.summary())?,
        Command::History => print_json(&controller.export_history())?,
        Command::Checkpoints => {
            for name in controller.list_checkpoints()? {
                println!("{}", name);
            }
        }
        Command::Show { identifier } => {
            let identifier = match identifier.or(controller.latest_checkpoint()?) {
                Some(identifier) => identifier,
                None => {
                    eprintln!("No checkpoints in {}", controller.store().dir().display());
                    return Ok(());
                }
            };
            print_json(&controller.store().load(&identifier)?)?;
        }
        Command::Transition { state, set } => {
            let update: Context = set.into_iter().collect();
            controller.transition(state, update)?;
            print_json(&controller.summary())?;
        }
        Command::Rollback { steps } => {
            controller.rollback(steps)?;
            print_json(&controller.summary())?;
        }
        Command::States => print_states(),
    }

    Ok(())
}

/// Commands that act on the live workflow start from the latest checkpoint.
/// Listing and showing files must keep working when that checkpoint is bad.
fn needs_resume(command: &Command) -> bool {
    !matches!(
        command,
        Command::Checkpoints | Command::Show { .. } | Command::States
    )
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn print_states() {
    for state in WorkflowState::ALL {
        let targets: Vec<&str> = state.valid_targets().iter().map(|t| t.as_str()).collect();
        println!("{:<20} -> {}", state.as_str(), targets.join(", "));
    }
}
