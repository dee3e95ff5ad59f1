//! # Orchestration Types
//!
//! Outcome types shared across orchestration components.
//!
//! Components that mutate tasks report what actually happened through these
//! types rather than through errors: a retry request against a terminal task
//! or a cascade pass over already-unblocked dependents is a normal outcome,
//! not a failure.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::state_machine::states::TaskStatus;

/// Result of a schedule-retry request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum RetryOutcome {
    /// Task went back to pending behind a backoff gate
    Requeued {
        retry_count: i32,
        next_retry_after: DateTime<Utc>,
    },
    /// Retry budget spent; task is now terminally failed
    Exhausted { retry_count: i32 },
    /// Task was not retryable (terminal, or its budget was already spent)
    Ignored { status: TaskStatus },
}

impl RetryOutcome {
    /// Check if the task was given another attempt
    pub fn is_requeued(&self) -> bool {
        matches!(self, RetryOutcome::Requeued { .. })
    }

    /// Check if the retry budget is spent
    pub fn is_exhausted(&self) -> bool {
        matches!(self, RetryOutcome::Exhausted { .. })
    }

    /// Check if the request left the task untouched
    pub fn is_ignored(&self) -> bool {
        matches!(self, RetryOutcome::Ignored { .. })
    }
}

/// Counters from one completion cascade pass over a task's dependents
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CascadeStats {
    /// Dependents the completed task named
    pub dependents_seen: usize,
    /// Dependents whose eligibility gate was cleared
    pub unblocked: usize,
    /// Dependents skipped: absent, not pending, or still blocked
    pub skipped: usize,
    /// Dependents whose processing hit a store error (logged and swallowed)
    pub errors: usize,
}
