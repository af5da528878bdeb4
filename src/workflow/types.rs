//! Core workflow type definitions.

use serde::{Deserialize, Serialize};

use crate::Error;

/// Stages of the pipeline driven by the controller.
///
/// A run moves through the stages in order:
/// 1. ValidatingRequest - check the incoming request
/// 2. LoadingSpecs - load the specifications the run needs
/// 3. SelectingAgents - choose which agents will do the work
/// 4. ExecutingAgents - run the selected agents
/// 5. RunningQA - quality checks on agent output
/// 6. RunningUITests - optional UI test pass
/// 7. GeneratingSummary - produce the run summary
/// 8. Completed - run finished
///
/// Any working stage may drop to `Failed`. Both `Completed` and `Failed`
/// return to `Idle`, so the machine cycles once per run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowState {
    /// Waiting for a request
    #[default]
    Idle,
    ValidatingRequest,
    LoadingSpecs,
    SelectingAgents,
    ExecutingAgents,
    #[serde(rename = "running_qa")]
    RunningQA,
    #[serde(rename = "running_ui_tests")]
    RunningUITests,
    GeneratingSummary,
    Completed,
    Failed,
}

impl WorkflowState {
    pub const ALL: [WorkflowState; 10] = [
        WorkflowState::Idle,
        WorkflowState::ValidatingRequest,
        WorkflowState::LoadingSpecs,
        WorkflowState::SelectingAgents,
        WorkflowState::ExecutingAgents,
        WorkflowState::RunningQA,
        WorkflowState::RunningUITests,
        WorkflowState::GeneratingSummary,
        WorkflowState::Completed,
        WorkflowState::Failed,
    ];

    /// States reachable in one step from `self`.
    pub fn valid_targets(self) -> &'static [WorkflowState] {
        use WorkflowState::*;
        match self {
            Idle => &[ValidatingRequest],
            ValidatingRequest => &[LoadingSpecs, Failed],
            LoadingSpecs => &[SelectingAgents, Failed],
            SelectingAgents => &[ExecutingAgents, Failed],
            ExecutingAgents => &[RunningQA, Failed],
            RunningQA => &[RunningUITests, GeneratingSummary, Failed],
            RunningUITests => &[GeneratingSummary, Failed],
            GeneratingSummary => &[Completed, Failed],
            Completed => &[Idle],
            Failed => &[Idle],
        }
    }

    /// Check whether `self -> target` is in the transition table.
    ///
    /// No state may transition to itself.
    pub fn can_transition_to(self, target: WorkflowState) -> bool {
        self.valid_targets().contains(&target)
    }

    /// `Completed` and `Failed` end a run; the only way on is back to `Idle`.
    pub fn is_terminal(self) -> bool {
        matches!(self, WorkflowState::Completed | WorkflowState::Failed)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            WorkflowState::Idle => "idle",
            WorkflowState::ValidatingRequest => "validating_request",
            WorkflowState::LoadingSpecs => "loading_specs",
            WorkflowState::SelectingAgents => "selecting_agents",
            WorkflowState::ExecutingAgents => "executing_agents",
            WorkflowState::RunningQA => "running_qa",
            WorkflowState::RunningUITests => "running_ui_tests",
            WorkflowState::GeneratingSummary => "generating_summary",
            WorkflowState::Completed => "completed",
            WorkflowState::Failed => "failed",
        }
    }
}

impl std::fmt::Display for WorkflowState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for WorkflowState {
    type Err = Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        WorkflowState::ALL
            .into_iter()
            .find(|state| state.as_str() == s)
            .ok_or_else(|| Error::UnknownState(s.to_string()))
    }
}
