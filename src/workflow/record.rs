use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{Context, WorkflowState};

/// One accepted state change.
///
/// Records are appended to the controller's history and never modified;
/// rollback only truncates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransitionRecord {
    pub from: WorkflowState,
    pub to: WorkflowState,
    /// The update merged into the context by this transition.
    #[serde(rename = "context", default)]
    pub context_update: Context,
    pub timestamp: DateTime<Utc>,
}

impl TransitionRecord {
    pub fn new(
        from: WorkflowState,
        to: WorkflowState,
        context_update: Context,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            from,
            to,
            context_update,
            timestamp,
        }
    }
}
