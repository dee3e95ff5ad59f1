//! # System Constants
//!
//! Core constants and value groups that define the operational boundaries of
//! the swarm orchestration scheduler.
//!
//! Event names, status groupings, and numeric limits live here so that every
//! component references one definition instead of scattering literals.

// Re-export the status type for convenience
pub use crate::state_machine::states::TaskStatus;

/// Lifecycle events published on the scheduler event stream
pub mod events {
    // Task lifecycle events
    pub const TASK_CREATED: &str = "task.created";
    pub const TASK_ASSIGNED: &str = "task.assigned";
    pub const TASK_STARTED: &str = "task.started";
    pub const TASK_COMPLETED: &str = "task.completed";
    pub const TASK_FAILED: &str = "task.failed";
    pub const TASK_CANCELLED: &str = "task.cancelled";
    pub const TASK_RELEASED: &str = "task.released";
    pub const TASK_RETRY_SCHEDULED: &str = "task.retry_scheduled";
    pub const TASK_RETRIES_EXHAUSTED: &str = "task.retries_exhausted";
    pub const TASK_UNBLOCKED: &str = "task.unblocked";

    // Provider health events
    pub const PROVIDER_HEALTH_UPDATED: &str = "provider_health.updated";
}

/// Status groupings used by queries and guard checks
pub mod status_groups {
    use super::TaskStatus;

    /// Task statuses that admit no further transitions (modulo the retry path)
    pub const TASK_TERMINAL_STATES: &[TaskStatus] = &[
        TaskStatus::Completed,
        TaskStatus::Failed,
        TaskStatus::Cancelled,
    ];

    /// Task statuses that count against a team's concurrency usage
    pub const TASK_IN_FLIGHT_STATES: &[TaskStatus] =
        &[TaskStatus::Assigned, TaskStatus::Running];

    /// Task statuses from which a retry may be scheduled
    pub const TASK_RETRYABLE_STATES: &[TaskStatus] = &[
        TaskStatus::Pending,
        TaskStatus::Assigned,
        TaskStatus::Running,
        TaskStatus::Failed,
    ];
}

/// System-wide numeric limits and defaults
pub mod system {
    /// Version compatibility marker
    pub const SWARM_CORE_VERSION: &str = "0.1.0";

    /// Default priority assigned when task creation omits one
    pub const DEFAULT_TASK_PRIORITY: i32 = 5;

    /// Lowest accepted task priority
    pub const MIN_TASK_PRIORITY: i32 = 1;

    /// Highest accepted task priority
    pub const MAX_TASK_PRIORITY: i32 = 10;

    /// Default retry budget when a retry request omits one
    pub const DEFAULT_MAX_RETRIES: i32 = 3;

    /// First retry delay in milliseconds (doubles per attempt)
    pub const BASE_RETRY_DELAY_MS: i64 = 30_000;

    /// Ceiling on any single retry delay in milliseconds
    pub const MAX_RETRY_DELAY_MS: i64 = 300_000;

    /// Maximum number of direct dependencies accepted per task
    pub const MAX_DEPENDENCIES_PER_TASK: usize = 50;

    /// Default upper bound for a single ready-task query
    pub const DEFAULT_READY_BATCH_LIMIT: usize = 50;
}
