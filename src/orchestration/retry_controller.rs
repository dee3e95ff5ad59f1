//! # Retry Controller
//!
//! Schedules retries with exponential backoff and enforces the retry budget.
//!
//! ## Overview
//!
//! A transient failure reported against a task either requeues it behind a
//! backoff gate or, once the budget is spent, fails it terminally. The whole
//! decision runs inside one CAS closure against the task document: the status
//! check, the budget check, and the transition are a single atomic step, so
//! two racing retry reports cannot both consume the same attempt.
//!
//! ## Backoff
//!
//! The delay before attempt `n` doubles from the base and is capped:
//! 30s, 60s, 120s, 240s, then 300s for every later attempt under the default
//! configuration. The gate is stored on the task as `next_retry_after`;
//! discovery skips gated tasks until the gate elapses.
//!
//! ## Budget
//!
//! `retry_count` counts consumed attempts, including the final exhausting
//! one. With a budget of 3, attempts 1 through 3 requeue and attempt 4
//! exhausts, leaving the task `failed` with `retry_count` 4. Requests against
//! terminal or already-exhausted tasks return
//! [`RetryOutcome::Ignored`] rather than an error.

use std::sync::Arc;

use chrono::{Duration, Utc};
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::config::BackoffConfig;
use crate::constants::events::{TASK_RETRIES_EXHAUSTED, TASK_RETRY_SCHEDULED};
use crate::error::SchedulerResult;
use crate::events::EventPublisher;
use crate::orchestration::types::RetryOutcome;
use crate::state_machine::events::TaskEvent;
use crate::state_machine::states::TaskStatus;
use crate::state_machine::transitions;
use crate::store::{CasOutcome, TaskStore};

/// Backoff delay in milliseconds before retry attempt `retry_count`.
///
/// Attempt numbering starts at 1. The exponent is clamped before the shift
/// so absurd attempt numbers saturate at the cap instead of overflowing.
pub fn backoff_delay_ms(config: &BackoffConfig, retry_count: i32) -> i64 {
    let exponent = retry_count.saturating_sub(1).clamp(0, 30) as u32;
    config
        .base_delay_ms
        .saturating_mul(1_i64 << exponent)
        .min(config.max_delay_ms)
}

/// Schedules retries and terminally fails tasks that run out of budget
#[derive(Clone)]
pub struct RetryController {
    store: Arc<dyn TaskStore>,
    publisher: EventPublisher,
    config: BackoffConfig,
}

impl RetryController {
    /// Create a retry controller with default backoff settings
    pub fn new(store: Arc<dyn TaskStore>, publisher: EventPublisher) -> Self {
        Self::with_config(store, publisher, BackoffConfig::default())
    }

    /// Create a retry controller with custom backoff settings
    pub fn with_config(
        store: Arc<dyn TaskStore>,
        publisher: EventPublisher,
        config: BackoffConfig,
    ) -> Self {
        Self {
            store,
            publisher,
            config,
        }
    }

    /// Delay before the given retry attempt under this controller's config
    pub fn delay_for(&self, retry_count: i32) -> i64 {
        backoff_delay_ms(&self.config, retry_count)
    }

    /// Report a transient failure and let the controller decide the outcome.
    ///
    /// Requeues the task behind a backoff gate while budget remains,
    /// exhausts it to `failed` when the next attempt would exceed the
    /// budget, and ignores tasks that are terminal or already exhausted.
    /// `max_retries` overrides the configured default budget per call.
    #[instrument(skip(self, error_message))]
    pub async fn schedule_retry(
        &self,
        task_uuid: Uuid,
        error_message: &str,
        max_retries: Option<i32>,
    ) -> SchedulerResult<RetryOutcome> {
        let budget = max_retries.unwrap_or(self.config.default_max_retries);
        let config = self.config.clone();
        let message = error_message.to_string();
        let now = Utc::now();

        let outcome = self
            .store
            .update(
                task_uuid,
                Box::new(move |task| {
                    match task.status {
                        TaskStatus::Completed | TaskStatus::Cancelled => false,
                        TaskStatus::Failed if task.retry_count > budget => false,
                        _ => {
                            let prospective = task.retry_count + 1;
                            let event = if prospective > budget {
                                TaskEvent::Exhaust {
                                    error_message: message,
                                }
                            } else {
                                let delay = backoff_delay_ms(&config, prospective);
                                TaskEvent::Requeue {
                                    error_message: message,
                                    next_retry_after: now + Duration::milliseconds(delay),
                                }
                            };
                            transitions::apply(task, &event, now).is_some()
                        }
                    }
                }),
            )
            .await?;

        match outcome {
            CasOutcome::Updated(task) if task.status == TaskStatus::Pending => {
                let next_retry_after = task.next_retry_after.unwrap_or(now);
                self.publisher
                    .publish_task_event(TASK_RETRY_SCHEDULED, &task);
                info!(
                    task_uuid = %task_uuid,
                    retry_count = task.retry_count,
                    next_retry_after = %next_retry_after,
                    "Retry scheduled"
                );
                Ok(RetryOutcome::Requeued {
                    retry_count: task.retry_count,
                    next_retry_after,
                })
            }
            CasOutcome::Updated(task) => {
                self.publisher
                    .publish_task_event(TASK_RETRIES_EXHAUSTED, &task);
                warn!(
                    task_uuid = %task_uuid,
                    retry_count = task.retry_count,
                    budget,
                    "Retry budget exhausted, task failed terminally"
                );
                Ok(RetryOutcome::Exhausted {
                    retry_count: task.retry_count,
                })
            }
            CasOutcome::Rejected(task) => {
                debug!(
                    task_uuid = %task_uuid,
                    status = %task.status,
                    "Retry request ignored"
                );
                Ok(RetryOutcome::Ignored {
                    status: task.status,
                })
            }
        }
    }
}
