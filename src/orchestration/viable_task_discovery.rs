//! # Viable Task Discovery
//!
//! ## Architecture: Recomputed Readiness
//!
//! Discovery answers one question for dispatch loops: which pending tasks
//! could an agent claim right now? Readiness is recomputed from the documents
//! on every call rather than cached, which is what makes the completion
//! cascade advisory: even if a cascade pass is lost, the next discovery call
//! still sees the true dependency state.
//!
//! ## Key Features
//!
//! - **Three-part readiness**: status `pending`, backoff gate elapsed, every
//!   dependency completed
//! - **FIFO within a team**: candidates are considered in creation order
//! - **Bounded batches**: the caller's limit is capped by configuration

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info, instrument};

use crate::config::DiscoveryConfig;
use crate::constants::status_groups::TASK_IN_FLIGHT_STATES;
use crate::error::SchedulerResult;
use crate::models::task::OrchestrationTask;
use crate::orchestration::dependency_graph::DependencyGraph;
use crate::state_machine::states::TaskStatus;
use crate::store::TaskStore;

/// Finds claimable tasks for dispatch loops
#[derive(Clone)]
pub struct ViableTaskDiscovery {
    store: Arc<dyn TaskStore>,
    graph: DependencyGraph,
    config: DiscoveryConfig,
}

impl ViableTaskDiscovery {
    /// Create a discovery instance with default batch limits
    pub fn new(store: Arc<dyn TaskStore>) -> Self {
        Self::with_config(store, DiscoveryConfig::default())
    }

    /// Create a discovery instance with custom batch limits
    pub fn with_config(store: Arc<dyn TaskStore>, config: DiscoveryConfig) -> Self {
        let graph = DependencyGraph::new(store.clone());
        Self {
            store,
            graph,
            config,
        }
    }

    /// Find up to `limit` tasks an agent could claim right now.
    ///
    /// A task qualifies when it is `pending`, its backoff gate has elapsed,
    /// and every dependency is `completed`. Results come back in creation
    /// order; the limit is capped by the configured max batch size.
    #[instrument(skip(self), fields(team_id = %team_id))]
    pub async fn get_ready_tasks(
        &self,
        team_id: &str,
        limit: usize,
    ) -> SchedulerResult<Vec<OrchestrationTask>> {
        let capped = limit.min(self.config.max_batch_size);
        let now = Utc::now();

        let pending = self
            .store
            .list_by_team_and_status(team_id, TaskStatus::Pending)
            .await?;
        let candidate_count = pending.len();

        let mut ready = Vec::new();
        for task in pending {
            if ready.len() == capped {
                break;
            }
            if !task.gate_open(now) {
                continue;
            }
            if self.graph.is_ready(&task).await? {
                ready.push(task);
            }
        }

        if ready.is_empty() {
            debug!(
                team_id = %team_id,
                candidates = candidate_count,
                "No ready tasks"
            );
        } else {
            info!(
                team_id = %team_id,
                ready_count = ready.len(),
                candidates = candidate_count,
                "Ready tasks discovered"
            );
        }

        Ok(ready)
    }

    /// Count a team's in-flight tasks (`assigned` or `running`).
    ///
    /// Used by dispatch loops for concurrency budgeting.
    #[instrument(skip(self), fields(team_id = %team_id))]
    pub async fn count_running_tasks(&self, team_id: &str) -> SchedulerResult<usize> {
        self.store
            .count_by_statuses(team_id, TASK_IN_FLIGHT_STATES)
            .await
    }
}
