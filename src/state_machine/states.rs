use serde::{Deserialize, Serialize};
use std::fmt;

/// Task status definitions for the orchestration lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// Initial state; also the state a task returns to on release or retry
    Pending,
    /// Claimed by an agent, not yet executing
    Assigned,
    /// Agent reported execution has begun
    Running,
    /// Task finished successfully
    Completed,
    /// Task failed; may re-enter pending while retry budget remains
    Failed,
    /// Task was cancelled before it finished
    Cancelled,
}

impl TaskStatus {
    /// Check if this is a terminal state (no further transitions except the retry path)
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Cancelled)
    }

    /// Check if this state counts against a team's concurrency usage
    pub fn is_in_flight(&self) -> bool {
        matches!(self, Self::Assigned | Self::Running)
    }

    /// Check if an agent may claim a task in this state
    pub fn is_claimable(&self) -> bool {
        matches!(self, Self::Pending)
    }

    /// Check if a task in this state satisfies dependencies of downstream tasks
    pub fn satisfies_dependencies(&self) -> bool {
        matches!(self, Self::Completed)
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Assigned => write!(f, "assigned"),
            Self::Running => write!(f, "running"),
            Self::Completed => write!(f, "completed"),
            Self::Failed => write!(f, "failed"),
            Self::Cancelled => write!(f, "cancelled"),
        }
    }
}

impl std::str::FromStr for TaskStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "assigned" => Ok(Self::Assigned),
            "running" => Ok(Self::Running),
            "completed" => Ok(Self::Completed),
            "failed" => Ok(Self::Failed),
            "cancelled" => Ok(Self::Cancelled),
            _ => Err(format!("Invalid task status: {s}")),
        }
    }
}

/// Default status for new tasks
impl Default for TaskStatus {
    fn default() -> Self {
        Self::Pending
    }
}
