//! # Orchestration Task Model
//!
//! The task document is the unit of scheduling: one agent-executable prompt
//! with lifecycle status, dependency edges, assignment bookkeeping, and retry
//! state.
//!
//! ## Document Format
//!
//! Tasks serialize with camelCase field names to match the documents the
//! surrounding control plane already stores:
//!
//! ```json
//! {
//!   "taskUuid": "2f4d…",
//!   "teamId": "team-a",
//!   "status": "pending",
//!   "dependencies": ["9c1b…"],
//!   "dependents": [],
//!   "retryCount": 0,
//!   "createdAt": "2025-11-02T08:30:00Z",
//!   "updatedAt": "2025-11-02T08:30:00Z"
//! }
//! ```
//!
//! ## Invariants
//!
//! - `dependencies` and `dependents` are consistent inverses across documents
//!   (maintained by the dependency graph engine, never mutated directly).
//! - `retry_count` only increases.
//! - `updated_at` bumps on every committed mutation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::constants::system;
use crate::error::{SchedulerError, SchedulerResult};
use crate::state_machine::states::TaskStatus;

/// A schedulable unit of agent work with dependency and retry bookkeeping
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrchestrationTask {
    pub task_uuid: Uuid,
    pub team_id: String,
    pub user_id: String,
    pub prompt: String,
    /// 1 (highest) to 10 (lowest). Recorded for callers; ready-task
    /// selection is FIFO by creation and does not consult it.
    pub priority: i32,
    pub status: TaskStatus,
    /// Tasks that must reach completed before this one is eligible
    #[serde(default)]
    pub dependencies: Vec<Uuid>,
    /// Reverse edges, maintained as the inverse of `dependencies`
    #[serde(default)]
    pub dependents: Vec<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assigned_agent_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assigned_sandbox_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assigned_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    pub retry_count: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_retry_at: Option<DateTime<Utc>>,
    /// Not-eligible-before gate; set by the retry controller (backoff) and
    /// cleared to `now` by the completion cascade
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_retry_after: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_task_uuid: Option<Uuid>,
    /// Link into the control plane's task record
    #[serde(skip_serializing_if = "Option::is_none")]
    pub external_task_id: Option<String>,
    /// Link into the control plane's run record
    #[serde(skip_serializing_if = "Option::is_none")]
    pub external_run_id: Option<String>,
    /// Grouping key clustering tasks into one orchestration
    #[serde(skip_serializing_if = "Option::is_none")]
    pub orchestration_group: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// New task for creation (without generated fields)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTask {
    pub team_id: String,
    pub user_id: String,
    pub prompt: String,
    /// Defaults to 5 when not provided
    pub priority: Option<i32>,
    #[serde(default)]
    pub dependencies: Vec<Uuid>,
    pub parent_task_uuid: Option<Uuid>,
    pub external_task_id: Option<String>,
    pub external_run_id: Option<String>,
    pub orchestration_group: Option<String>,
}

impl OrchestrationTask {
    /// Build a pending task document from creation input.
    ///
    /// Assigns a fresh `task_uuid`, stamps both timestamps with `now`, and
    /// validates priority bounds. Dependency ids are deduplicated and
    /// count-capped here; their existence, team, and acyclicity checks
    /// belong to the dependency graph engine.
    pub fn create(new_task: NewTask, now: DateTime<Utc>) -> SchedulerResult<Self> {
        if new_task.team_id.is_empty() {
            return Err(SchedulerError::validation("team_id", "must not be empty"));
        }

        let priority = new_task.priority.unwrap_or(system::DEFAULT_TASK_PRIORITY);
        if !(system::MIN_TASK_PRIORITY..=system::MAX_TASK_PRIORITY).contains(&priority) {
            return Err(SchedulerError::validation(
                "priority",
                format!(
                    "must be between {} and {}, got {priority}",
                    system::MIN_TASK_PRIORITY,
                    system::MAX_TASK_PRIORITY
                ),
            ));
        }

        let mut dependencies = new_task.dependencies;
        dependencies.sort_unstable();
        dependencies.dedup();
        if dependencies.len() > system::MAX_DEPENDENCIES_PER_TASK {
            return Err(SchedulerError::validation(
                "dependencies",
                format!(
                    "Task cannot have more than {} dependencies",
                    system::MAX_DEPENDENCIES_PER_TASK
                ),
            ));
        }

        Ok(Self {
            task_uuid: Uuid::new_v4(),
            team_id: new_task.team_id,
            user_id: new_task.user_id,
            prompt: new_task.prompt,
            priority,
            status: TaskStatus::Pending,
            dependencies,
            dependents: Vec::new(),
            assigned_agent_name: None,
            assigned_sandbox_id: None,
            assigned_at: None,
            started_at: None,
            completed_at: None,
            retry_count: 0,
            last_retry_at: None,
            next_retry_after: None,
            result: None,
            error_message: None,
            parent_task_uuid: new_task.parent_task_uuid,
            external_task_id: new_task.external_task_id,
            external_run_id: new_task.external_run_id,
            orchestration_group: new_task.orchestration_group,
            created_at: now,
            updated_at: now,
        })
    }

    /// Check if this task is in a terminal state
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Check if an agent may currently claim this task
    pub fn is_claimable(&self) -> bool {
        self.status.is_claimable()
    }

    /// Check if the eligibility gate has passed.
    ///
    /// A task with `next_retry_after` in the future is excluded from
    /// ready-task selection even when pending and dependency-satisfied.
    pub fn gate_open(&self, now: DateTime<Utc>) -> bool {
        self.next_retry_after.is_none_or(|gate| gate <= now)
    }

    /// Clear assignment fields (release and requeue paths)
    pub fn clear_assignment(&mut self) {
        self.assigned_agent_name = None;
        self.assigned_sandbox_id = None;
        self.assigned_at = None;
    }

    /// True when `other` is one of this task's direct dependencies
    pub fn depends_on(&self, other: Uuid) -> bool {
        self.dependencies.contains(&other)
    }
}
