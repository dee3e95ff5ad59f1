//! # Task Finalizer
//!
//! Drives tasks through execution transitions and into terminal states.
//!
//! ## Overview
//!
//! The TaskFinalizer owns every lifecycle transition after the claim: start,
//! complete, fail, cancel. Each transition is one CAS through the shared
//! transition table, so a stale caller (agent finishing a task that was
//! cancelled underneath it, a double completion) observes a rejected swap and
//! gets an invalid-transition error instead of corrupting state.
//!
//! ## Key Features
//!
//! - **Single completion**: terminal states are absorbing; the first
//!   completer wins and later attempts error
//! - **Cascade trigger**: a successful completion queues a fan-out pass so
//!   dependents become discoverable without polling delay
//! - **Lifecycle events**: every applied transition publishes its event

use std::sync::Arc;

use chrono::Utc;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::constants::events::{
    TASK_CANCELLED, TASK_COMPLETED, TASK_FAILED, TASK_STARTED,
};
use crate::error::{SchedulerError, SchedulerResult};
use crate::events::EventPublisher;
use crate::models::task::OrchestrationTask;
use crate::orchestration::completion_cascade::CompletionCascade;
use crate::state_machine::events::TaskEvent;
use crate::state_machine::transitions;
use crate::store::{CasOutcome, TaskStore};

/// Applies execution and terminal transitions to tasks
#[derive(Clone)]
pub struct TaskFinalizer {
    store: Arc<dyn TaskStore>,
    publisher: EventPublisher,
    cascade: CompletionCascade,
}

impl TaskFinalizer {
    /// Create a new TaskFinalizer
    pub fn new(
        store: Arc<dyn TaskStore>,
        publisher: EventPublisher,
        cascade: CompletionCascade,
    ) -> Self {
        Self {
            store,
            publisher,
            cascade,
        }
    }

    /// Mark a task as running.
    ///
    /// Legal from `assigned` (the normal path) and directly from `pending`
    /// for agents that execute without a separate claim step.
    #[instrument(skip(self))]
    pub async fn start_task(&self, task_uuid: Uuid) -> SchedulerResult<OrchestrationTask> {
        let task = self
            .apply_event(task_uuid, TaskEvent::Start, TASK_STARTED)
            .await?;
        info!(task_uuid = %task_uuid, "Task started");
        Ok(task)
    }

    /// Complete a running task and fan out to its dependents.
    #[instrument(skip(self, result))]
    pub async fn complete_task(
        &self,
        task_uuid: Uuid,
        result: Option<String>,
    ) -> SchedulerResult<OrchestrationTask> {
        let task = self
            .apply_event(task_uuid, TaskEvent::Complete { result }, TASK_COMPLETED)
            .await?;

        info!(
            task_uuid = %task_uuid,
            dependent_count = task.dependents.len(),
            "✅ TASK COMPLETED"
        );
        self.cascade.enqueue(task.clone());
        Ok(task)
    }

    /// Fail a running task terminally, without consuming retry budget.
    ///
    /// This is the hard-failure path for errors no retry can fix. Transient
    /// failures go through the retry controller instead.
    #[instrument(skip(self, error_message))]
    pub async fn fail_task(
        &self,
        task_uuid: Uuid,
        error_message: String,
    ) -> SchedulerResult<OrchestrationTask> {
        let task = self
            .apply_event(task_uuid, TaskEvent::Fail { error_message }, TASK_FAILED)
            .await?;
        warn!(
            task_uuid = %task_uuid,
            error = task.error_message.as_deref().unwrap_or_default(),
            "Task failed terminally"
        );
        Ok(task)
    }

    /// Cancel a task that has not yet finished.
    ///
    /// Legal from `pending`, `assigned`, and `running`. Cancellation is
    /// terminal and does not cascade: dependents of a cancelled task stay
    /// blocked forever, which is the designed behavior for abandoned chains.
    #[instrument(skip(self))]
    pub async fn cancel_task(&self, task_uuid: Uuid) -> SchedulerResult<OrchestrationTask> {
        let task = self
            .apply_event(task_uuid, TaskEvent::Cancel, TASK_CANCELLED)
            .await?;
        info!(task_uuid = %task_uuid, "Task cancelled");
        Ok(task)
    }

    async fn apply_event(
        &self,
        task_uuid: Uuid,
        event: TaskEvent,
        event_name: &'static str,
    ) -> SchedulerResult<OrchestrationTask> {
        let event_type = event.event_type();
        let now = Utc::now();
        let outcome = self
            .store
            .update(
                task_uuid,
                Box::new(move |task| transitions::apply(task, &event, now).is_some()),
            )
            .await?;

        match outcome {
            CasOutcome::Updated(task) => {
                self.publisher.publish_task_event(event_name, &task);
                Ok(task)
            }
            CasOutcome::Rejected(task) => Err(SchedulerError::invalid_transition(
                task_uuid,
                task.status,
                event_type,
            )),
        }
    }
}
