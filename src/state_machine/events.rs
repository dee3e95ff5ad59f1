use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Events that can trigger task state transitions
///
/// Each variant carries the data its transition records on the task document.
/// The retry events ([`TaskEvent::Requeue`] and [`TaskEvent::Exhaust`]) are
/// emitted by the retry controller, never directly by callers.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum TaskEvent {
    /// Claim the task for an agent
    Assign {
        agent_name: String,
        sandbox_id: Option<String>,
    },
    /// Mark execution as begun
    Start,
    /// Mark task as completed with an optional result payload
    Complete { result: Option<String> },
    /// Mark task as failed with an error message
    Fail { error_message: String },
    /// Cancel the task before it finishes
    Cancel,
    /// Return a claimed task to the pool without penalty
    Release,
    /// Send the task back to pending with a backoff gate (retry path)
    Requeue {
        error_message: String,
        next_retry_after: DateTime<Utc>,
    },
    /// Mark the task permanently failed after the retry budget is spent
    Exhaust { error_message: String },
}

impl TaskEvent {
    /// Get a string representation of the event type for logging
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::Assign { .. } => "assign",
            Self::Start => "start",
            Self::Complete { .. } => "complete",
            Self::Fail { .. } => "fail",
            Self::Cancel => "cancel",
            Self::Release => "release",
            Self::Requeue { .. } => "requeue",
            Self::Exhaust { .. } => "exhaust",
        }
    }

    /// Extract the error message if this event carries one
    pub fn error_message(&self) -> Option<&str> {
        match self {
            Self::Fail { error_message }
            | Self::Requeue { error_message, .. }
            | Self::Exhaust { error_message } => Some(error_message),
            _ => None,
        }
    }

    /// Check if this event lands the task in a terminal state
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Complete { .. } | Self::Fail { .. } | Self::Cancel | Self::Exhaust { .. }
        )
    }
}
