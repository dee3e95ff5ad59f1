//! # Completion Cascade
//!
//! Deferred fan-out that reacts to task completion by re-opening dependents.
//!
//! ## Overview
//!
//! When a task completes, each of its dependents may have just become ready.
//! The cascade walks the completed task's `dependents` list and, for every
//! dependent that is still `pending` with all dependencies completed, clears
//! any stale backoff gate by stamping `next_retry_after` with the current
//! time. That makes the dependent visible to discovery immediately instead of
//! waiting out a gate that was set while it was blocked.
//!
//! ## Architecture
//!
//! The cascade is advisory. Readiness is always recomputed at discovery time,
//! so a missed or duplicated pass changes latency, never correctness. Fan-out
//! runs on a dedicated worker fed by a bounded channel; when the channel is
//! full the pass runs on a fresh task instead of blocking the completion
//! path. Per-dependent store errors are counted and logged, never propagated:
//! one broken dependent must not stall its siblings.

use std::sync::Arc;

use chrono::Utc;
use tokio::sync::mpsc;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::constants::events::TASK_UNBLOCKED;
use crate::error::SchedulerResult;
use crate::events::EventPublisher;
use crate::models::task::OrchestrationTask;
use crate::orchestration::types::CascadeStats;
use crate::state_machine::states::TaskStatus;
use crate::store::{CasOutcome, TaskStore};

/// One queued fan-out pass
struct CascadeJob {
    completed: OrchestrationTask,
}

struct CascadeInner {
    store: Arc<dyn TaskStore>,
    publisher: EventPublisher,
}

/// Hands completion fan-out to a background worker
#[derive(Clone)]
pub struct CompletionCascade {
    inner: Arc<CascadeInner>,
    tx: mpsc::Sender<CascadeJob>,
}

impl CompletionCascade {
    /// Spawn the cascade worker and return a handle to it.
    ///
    /// The worker runs until every handle is dropped.
    pub fn spawn(
        store: Arc<dyn TaskStore>,
        publisher: EventPublisher,
        queue_capacity: usize,
    ) -> Self {
        let inner = Arc::new(CascadeInner { store, publisher });
        let (tx, mut rx) = mpsc::channel::<CascadeJob>(queue_capacity);

        let worker = inner.clone();
        tokio::spawn(async move {
            while let Some(job) = rx.recv().await {
                worker.fan_out(&job.completed).await;
            }
            debug!("Completion cascade worker stopped");
        });

        Self { inner, tx }
    }

    /// Queue a fan-out pass for a task that just completed.
    ///
    /// Never blocks: if the queue is full the pass runs on its own task, and
    /// a closed queue is logged and dropped.
    pub fn enqueue(&self, completed: OrchestrationTask) {
        if completed.dependents.is_empty() {
            return;
        }
        match self.tx.try_send(CascadeJob { completed }) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(job)) => {
                warn!(
                    task_uuid = %job.completed.task_uuid,
                    "Cascade queue full, running fan-out inline"
                );
                let inner = self.inner.clone();
                tokio::spawn(async move {
                    inner.fan_out(&job.completed).await;
                });
            }
            Err(mpsc::error::TrySendError::Closed(job)) => {
                warn!(
                    task_uuid = %job.completed.task_uuid,
                    "Cascade worker gone, dropping fan-out pass"
                );
            }
        }
    }

    /// Run one fan-out pass synchronously.
    ///
    /// Exposed for callers that need the pass completed before returning,
    /// such as a drain during shutdown.
    pub async fn fan_out_now(&self, completed: &OrchestrationTask) -> CascadeStats {
        self.inner.fan_out(completed).await
    }
}

impl CascadeInner {
    #[instrument(skip(self, completed), fields(task_uuid = %completed.task_uuid))]
    async fn fan_out(&self, completed: &OrchestrationTask) -> CascadeStats {
        let mut stats = CascadeStats {
            dependents_seen: completed.dependents.len(),
            ..CascadeStats::default()
        };

        let passes = completed
            .dependents
            .iter()
            .map(|dependent_uuid| self.unblock_if_ready(*dependent_uuid));
        let results = futures::future::join_all(passes).await;

        for (dependent_uuid, result) in completed.dependents.iter().zip(results) {
            match result {
                Ok(Some(task)) => {
                    stats.unblocked += 1;
                    self.publisher.publish_task_event(TASK_UNBLOCKED, &task);
                }
                Ok(None) => stats.skipped += 1,
                Err(error) => {
                    stats.errors += 1;
                    warn!(
                        dependent_uuid = %dependent_uuid,
                        error = %error,
                        "Cascade pass failed for dependent"
                    );
                }
            }
        }

        if stats.unblocked > 0 {
            info!(
                task_uuid = %completed.task_uuid,
                unblocked = stats.unblocked,
                skipped = stats.skipped,
                "⚡ CASCADE: Dependents unblocked"
            );
        } else {
            debug!(
                task_uuid = %completed.task_uuid,
                skipped = stats.skipped,
                errors = stats.errors,
                "Cascade pass unblocked nothing"
            );
        }

        stats
    }

    /// Clear the backoff gate of a dependent that just became ready.
    ///
    /// Skips (returns `Ok(None)`) when the dependent is absent, not pending,
    /// or still has an incomplete dependency. The gate write is a CAS
    /// conditioned on the task still being pending, so a concurrent claim or
    /// cancel cannot be overwritten.
    async fn unblock_if_ready(
        &self,
        dependent_uuid: Uuid,
    ) -> SchedulerResult<Option<OrchestrationTask>> {
        let Some(dependent) = self.store.fetch(dependent_uuid).await? else {
            return Ok(None);
        };
        if dependent.status != TaskStatus::Pending {
            return Ok(None);
        }

        let resolved = self.store.fetch_many(&dependent.dependencies).await?;
        let all_completed = resolved
            .iter()
            .all(|dep| matches!(dep, Some(d) if d.status.satisfies_dependencies()));
        if !all_completed {
            return Ok(None);
        }

        let now = Utc::now();
        let outcome = self
            .store
            .update(
                dependent_uuid,
                Box::new(move |task| {
                    if task.status == TaskStatus::Pending {
                        task.next_retry_after = Some(now);
                        task.updated_at = now;
                        true
                    } else {
                        false
                    }
                }),
            )
            .await?;

        match outcome {
            CasOutcome::Updated(task) => Ok(Some(task)),
            CasOutcome::Rejected(_) => Ok(None),
        }
    }
}
