//! # Task Transition Table
//!
//! The single authoritative mapping from `(current status, event)` to target
//! status, plus the effect application that stamps the corresponding fields
//! on the task document.
//!
//! Every lifecycle mutation in the crate routes through [`apply`] inside a
//! store compare-and-set, so the legality check and the field effects commit
//! atomically per document. Anything not named in [`target_status`] is an
//! illegal transition and must leave the document untouched.

use chrono::{DateTime, Utc};

use crate::models::task::OrchestrationTask;
use crate::state_machine::events::TaskEvent;
use crate::state_machine::states::TaskStatus;

/// Determine the target status for an event, or `None` when the transition
/// is illegal from the current status.
///
/// The retry events (`Requeue`, `Exhaust`) are legal from every non-terminal
/// status plus `Failed`; the retry controller enforces the budget that keeps
/// exhausted tasks from resurrecting. `Completed` and `Cancelled` admit
/// nothing.
pub fn target_status(current: TaskStatus, event: &TaskEvent) -> Option<TaskStatus> {
    use TaskStatus::{Assigned, Cancelled, Completed, Failed, Pending, Running};

    match (current, event) {
        (Pending, TaskEvent::Assign { .. }) => Some(Assigned),
        // Direct pending -> running supports callers that assign and start
        // as one logical step.
        (Pending | Assigned, TaskEvent::Start) => Some(Running),
        (Running, TaskEvent::Complete { .. }) => Some(Completed),
        (Running, TaskEvent::Fail { .. }) => Some(Failed),
        (Pending | Assigned | Running, TaskEvent::Cancel) => Some(Cancelled),
        (Assigned, TaskEvent::Release) => Some(Pending),
        (Pending | Assigned | Running | Failed, TaskEvent::Requeue { .. }) => Some(Pending),
        (Pending | Assigned | Running | Failed, TaskEvent::Exhaust { .. }) => Some(Failed),
        _ => None,
    }
}

/// Apply an event to a task document, mutating status and effect fields.
///
/// Returns the new status on success. Returns `None` without touching the
/// document when the transition is illegal.
pub fn apply(
    task: &mut OrchestrationTask,
    event: &TaskEvent,
    now: DateTime<Utc>,
) -> Option<TaskStatus> {
    let target = target_status(task.status, event)?;

    match event {
        TaskEvent::Assign {
            agent_name,
            sandbox_id,
        } => {
            task.assigned_agent_name = Some(agent_name.clone());
            task.assigned_sandbox_id = sandbox_id.clone();
            task.assigned_at = Some(now);
        }
        TaskEvent::Start => {
            task.started_at = Some(now);
        }
        TaskEvent::Complete { result } => {
            task.completed_at = Some(now);
            task.result = result.clone();
        }
        TaskEvent::Fail { error_message } => {
            task.completed_at = Some(now);
            task.error_message = Some(error_message.clone());
        }
        TaskEvent::Cancel => {
            task.completed_at = Some(now);
        }
        TaskEvent::Release => {
            task.clear_assignment();
        }
        TaskEvent::Requeue {
            error_message,
            next_retry_after,
        } => {
            task.clear_assignment();
            task.started_at = None;
            task.completed_at = None;
            task.result = None;
            task.error_message = Some(error_message.clone());
            task.retry_count += 1;
            task.last_retry_at = Some(now);
            task.next_retry_after = Some(*next_retry_after);
        }
        TaskEvent::Exhaust { error_message } => {
            task.error_message = Some(error_message.clone());
            task.retry_count += 1;
            task.completed_at = Some(now);
        }
    }

    task.status = target;
    task.updated_at = now;
    Some(target)
}
