//! # Task Claimer
//!
//! ## Architecture: Atomic Claiming via Document CAS
//!
//! Claiming is the single exclusivity boundary in the scheduler. An agent
//! claims a task through one compare-and-swap on the task document: the swap
//! applies only while the status is still `pending`, so when N agents race
//! for the same task exactly one CAS lands and the rest observe a rejected
//! swap. No component ever needs a broader lock than the document itself.
//!
//! ## Key Features
//!
//! - **Atomic claiming**: status check and assignment write are one CAS
//! - **Lost races are not errors**: a lost claim returns `false`, callers
//!   move on to the next candidate
//! - **Strict assignment**: `assign` performs the same transition but treats
//!   rejection as an invalid-transition error, for callers that already hold
//!   a candidate and need the updated document
//! - **Release**: returns an `assigned` task to `pending` without touching
//!   its retry budget
//!
//! ## Usage
//!
//! ```rust
//! use std::sync::Arc;
//! use swarm_core::events::EventPublisher;
//! use swarm_core::orchestration::task_claimer::TaskClaimer;
//! use swarm_core::store::InMemoryStore;
//! use uuid::Uuid;
//!
//! # async fn example(task_uuid: Uuid) -> Result<(), Box<dyn std::error::Error>> {
//! let store = Arc::new(InMemoryStore::new());
//! let claimer = TaskClaimer::new(store, EventPublisher::default());
//!
//! if claimer.claim(task_uuid, "agent-7", None).await? {
//!     // won the race; the task is now assigned to agent-7
//! }
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::constants::events::{TASK_ASSIGNED, TASK_RELEASED};
use crate::error::{SchedulerError, SchedulerResult};
use crate::events::EventPublisher;
use crate::models::task::OrchestrationTask;
use crate::state_machine::events::TaskEvent;
use crate::state_machine::transitions;
use crate::store::{CasOutcome, TaskStore};

/// Claims tasks for agents through per-document CAS
#[derive(Clone)]
pub struct TaskClaimer {
    store: Arc<dyn TaskStore>,
    publisher: EventPublisher,
}

impl TaskClaimer {
    /// Create a new task claimer
    pub fn new(store: Arc<dyn TaskStore>, publisher: EventPublisher) -> Self {
        Self { store, publisher }
    }

    /// Attempt to claim a pending task for an agent.
    ///
    /// Returns `Ok(true)` when this caller won the claim, `Ok(false)` when
    /// the task was no longer `pending` (another agent won, or the task
    /// moved on). Only a missing document is an error.
    #[instrument(skip(self), fields(agent_name = %agent_name))]
    pub async fn claim(
        &self,
        task_uuid: Uuid,
        agent_name: &str,
        sandbox_id: Option<&str>,
    ) -> SchedulerResult<bool> {
        match self.try_assign(task_uuid, agent_name, sandbox_id).await? {
            CasOutcome::Updated(task) => {
                self.publisher.publish_task_event(TASK_ASSIGNED, &task);
                info!(
                    task_uuid = %task_uuid,
                    agent_name = %agent_name,
                    "Task claimed"
                );
                Ok(true)
            }
            CasOutcome::Rejected(task) => {
                debug!(
                    task_uuid = %task_uuid,
                    agent_name = %agent_name,
                    current_status = %task.status,
                    "Claim lost, task no longer pending"
                );
                Ok(false)
            }
        }
    }

    /// Assign a pending task to an agent, returning the updated document.
    ///
    /// Same transition as [`claim`](Self::claim), but a rejected swap is an
    /// invalid-transition error instead of `false`.
    #[instrument(skip(self), fields(agent_name = %agent_name))]
    pub async fn assign(
        &self,
        task_uuid: Uuid,
        agent_name: &str,
        sandbox_id: Option<&str>,
    ) -> SchedulerResult<OrchestrationTask> {
        match self.try_assign(task_uuid, agent_name, sandbox_id).await? {
            CasOutcome::Updated(task) => {
                self.publisher.publish_task_event(TASK_ASSIGNED, &task);
                info!(
                    task_uuid = %task_uuid,
                    agent_name = %agent_name,
                    "Task assigned"
                );
                Ok(task)
            }
            CasOutcome::Rejected(task) => Err(SchedulerError::invalid_transition(
                task_uuid,
                task.status,
                TaskEvent::Assign {
                    agent_name: agent_name.to_string(),
                    sandbox_id: sandbox_id.map(str::to_string),
                }
                .event_type(),
            )),
        }
    }

    /// Return an assigned task to the pending pool.
    ///
    /// Used when an agent gives a claim back without having started the
    /// work. The retry budget is untouched and no backoff gate is set.
    #[instrument(skip(self))]
    pub async fn release(&self, task_uuid: Uuid) -> SchedulerResult<OrchestrationTask> {
        let now = Utc::now();
        let outcome = self
            .store
            .update(
                task_uuid,
                Box::new(move |task| {
                    transitions::apply(task, &TaskEvent::Release, now).is_some()
                }),
            )
            .await?;

        match outcome {
            CasOutcome::Updated(task) => {
                self.publisher.publish_task_event(TASK_RELEASED, &task);
                info!(task_uuid = %task_uuid, "Task released back to pending");
                Ok(task)
            }
            CasOutcome::Rejected(task) => {
                warn!(
                    task_uuid = %task_uuid,
                    current_status = %task.status,
                    "Release rejected, task is not assigned"
                );
                Err(SchedulerError::invalid_transition(
                    task_uuid,
                    task.status,
                    TaskEvent::Release.event_type(),
                ))
            }
        }
    }

    async fn try_assign(
        &self,
        task_uuid: Uuid,
        agent_name: &str,
        sandbox_id: Option<&str>,
    ) -> SchedulerResult<CasOutcome> {
        let event = TaskEvent::Assign {
            agent_name: agent_name.to_string(),
            sandbox_id: sandbox_id.map(str::to_string),
        };
        let now = Utc::now();
        self.store
            .update(
                task_uuid,
                Box::new(move |task| transitions::apply(task, &event, now).is_some()),
            )
            .await
    }
}
