//! # Task Initializer
//!
//! Task creation with dependency validation and graph wiring.
//!
//! ## Overview
//!
//! The TaskInitializer turns a [`NewTask`] request into a stored
//! [`OrchestrationTask`]: it validates the request, checks every declared
//! dependency before anything is written, inserts the document with its
//! forward dependency list already in place, and only then wires the reverse
//! edges onto the dependencies.
//!
//! ## Key Features
//!
//! - **Validate-then-write**: a request with a missing, cross-team, or
//!   self-referential dependency fails before the task document exists
//! - **No unblock race**: the reverse edges land after the insert, but a fresh
//!   task carries no backoff gate, so discovery picks it up as soon as its
//!   dependencies complete even if a cascade pass ran in between
//! - **Creation events**: publishes `task.created` once the document is stored

use std::sync::Arc;

use chrono::Utc;
use tracing::{info, instrument};

use crate::constants::events::TASK_CREATED;
use crate::error::SchedulerResult;
use crate::events::EventPublisher;
use crate::models::task::{NewTask, OrchestrationTask};
use crate::orchestration::dependency_graph::DependencyGraph;
use crate::store::TaskStore;

/// Creates task documents and their dependency edges
#[derive(Clone)]
pub struct TaskInitializer {
    store: Arc<dyn TaskStore>,
    graph: DependencyGraph,
    publisher: EventPublisher,
}

impl TaskInitializer {
    /// Create a new TaskInitializer
    pub fn new(store: Arc<dyn TaskStore>, publisher: EventPublisher) -> Self {
        let graph = DependencyGraph::new(store.clone());
        Self {
            store,
            graph,
            publisher,
        }
    }

    /// Create a task from a request.
    ///
    /// The stored document starts `pending` with `retry_count` 0 and no
    /// assignment. Declared dependencies are validated (existence, team
    /// match, no self-reference) before the insert; a fresh UUID cannot be
    /// reachable from existing tasks, so no cycle walk is needed here.
    #[instrument(skip(self, new_task), fields(team_id = %new_task.team_id))]
    pub async fn create_task(&self, new_task: NewTask) -> SchedulerResult<OrchestrationTask> {
        let now = Utc::now();
        let task = OrchestrationTask::create(new_task, now)?;

        if !task.dependencies.is_empty() {
            self.graph
                .validate_edges(task.task_uuid, &task.team_id, &task.dependencies)
                .await?;
        }

        self.store.insert(task.clone()).await?;

        if !task.dependencies.is_empty() {
            self.graph
                .wire_reverse_edges(task.task_uuid, &task.dependencies, now)
                .await?;
        }

        self.publisher.publish_task_event(TASK_CREATED, &task);

        info!(
            task_uuid = %task.task_uuid,
            team_id = %task.team_id,
            priority = task.priority,
            dependency_count = task.dependencies.len(),
            "🎯 TASK CREATED: Stored and wired into dependency graph"
        );

        Ok(task)
    }
}
