//! # Unified Scheduler Core
//!
//! Single bootstrap path that wires every orchestration component against
//! one store and one event publisher.
//!
//! ## Architecture
//!
//! The core is a facade: each operation delegates to the component that owns
//! it, and components share nothing but the store seam and the publisher.
//! Embedding hosts construct one `SchedulerCore` and call its surface;
//! service hosts wrap the same surface in their transport of choice.
//!
//! ## Key Benefits
//!
//! 1. **Single wiring point**: components agree on store, publisher, and
//!    configuration because the core hands them out
//! 2. **Store-agnostic**: any [`TaskStore`]/[`ProviderHealthStore`] pair
//!    plugs in; the bundled in-memory driver backs the default constructors
//! 3. **One cascade worker**: completion fan-out shares a single queue
//!    regardless of how many components trigger it

use std::sync::Arc;

use tokio::sync::broadcast;
use tracing::info;
use uuid::Uuid;

use crate::config::SwarmConfig;
use crate::error::{SchedulerError, SchedulerResult};
use crate::events::{EventPublisher, PublishedEvent};
use crate::logging::init_structured_logging;
use crate::models::provider_health::{HealthProbe, ProviderHealth};
use crate::models::task::{NewTask, OrchestrationTask};
use crate::orchestration::completion_cascade::CompletionCascade;
use crate::orchestration::dependency_graph::DependencyGraph;
use crate::orchestration::retry_controller::RetryController;
use crate::orchestration::task_claimer::TaskClaimer;
use crate::orchestration::task_finalizer::TaskFinalizer;
use crate::orchestration::task_initializer::TaskInitializer;
use crate::orchestration::types::RetryOutcome;
use crate::orchestration::viable_task_discovery::ViableTaskDiscovery;
use crate::registry::ProviderHealthRegistry;
use crate::state_machine::states::TaskStatus;
use crate::store::{InMemoryStore, ProviderHealthStore, TaskStore};

/// Unified scheduler facade that all embedding hosts use.
///
/// Cloning is cheap: every component shares the same stores and event
/// channel through `Arc` handles.
#[derive(Clone)]
pub struct SchedulerCore {
    /// Task document store shared by every component
    pub task_store: Arc<dyn TaskStore>,

    /// Provider health record store
    pub health_store: Arc<dyn ProviderHealthStore>,

    /// Lifecycle event publisher
    pub event_publisher: EventPublisher,

    /// Task creation with dependency validation
    pub task_initializer: TaskInitializer,

    /// Atomic claim, assign, and release
    pub task_claimer: TaskClaimer,

    /// Execution and terminal transitions
    pub task_finalizer: TaskFinalizer,

    /// Retry scheduling with exponential backoff
    pub retry_controller: RetryController,

    /// Ready-task and concurrency queries
    pub discovery: ViableTaskDiscovery,

    /// Dependency edge validation and wiring
    pub dependency_graph: DependencyGraph,

    /// Completion fan-out worker handle
    pub completion_cascade: CompletionCascade,

    /// Provider health records with team precedence
    pub provider_health: ProviderHealthRegistry,

    config: SwarmConfig,
}

impl SchedulerCore {
    /// Create a core with environment-aware configuration and the bundled
    /// in-memory store.
    ///
    /// This is the bootstrap path for embedded use: it initializes
    /// structured logging, loads configuration from file and environment,
    /// and wires every component.
    pub async fn new() -> SchedulerResult<Self> {
        init_structured_logging();
        info!("🔧 Initializing SchedulerCore with auto-detected environment configuration");

        let config = SwarmConfig::load()?;
        Self::from_config(config).await
    }

    /// Create a core from explicit configuration, backed by the bundled
    /// in-memory store.
    pub async fn from_config(config: SwarmConfig) -> SchedulerResult<Self> {
        let store = Arc::new(InMemoryStore::new());
        Self::with_stores(config, store.clone(), store).await
    }

    /// Create a core over caller-provided stores.
    ///
    /// The constructor is async because it spawns the completion cascade
    /// worker on the current runtime.
    pub async fn with_stores(
        config: SwarmConfig,
        task_store: Arc<dyn TaskStore>,
        health_store: Arc<dyn ProviderHealthStore>,
    ) -> SchedulerResult<Self> {
        config.validate()?;

        let event_publisher = EventPublisher::new(config.system.event_channel_capacity);
        let completion_cascade = CompletionCascade::spawn(
            task_store.clone(),
            event_publisher.clone(),
            config.cascade.queue_capacity,
        );

        let task_initializer = TaskInitializer::new(task_store.clone(), event_publisher.clone());
        let task_claimer = TaskClaimer::new(task_store.clone(), event_publisher.clone());
        let task_finalizer = TaskFinalizer::new(
            task_store.clone(),
            event_publisher.clone(),
            completion_cascade.clone(),
        );
        let retry_controller = RetryController::with_config(
            task_store.clone(),
            event_publisher.clone(),
            config.backoff.clone(),
        );
        let discovery =
            ViableTaskDiscovery::with_config(task_store.clone(), config.discovery.clone());
        let dependency_graph = DependencyGraph::new(task_store.clone());
        let provider_health =
            ProviderHealthRegistry::new(health_store.clone(), event_publisher.clone());

        info!(
            environment = %config.system.environment,
            "✅ CORE: Scheduler components wired"
        );

        Ok(Self {
            task_store,
            health_store,
            event_publisher,
            task_initializer,
            task_claimer,
            task_finalizer,
            retry_controller,
            discovery,
            dependency_graph,
            completion_cascade,
            provider_health,
            config,
        })
    }

    /// Active configuration
    pub fn config(&self) -> &SwarmConfig {
        &self.config
    }

    /// Subscribe to lifecycle events
    pub fn subscribe(&self) -> broadcast::Receiver<PublishedEvent> {
        self.event_publisher.subscribe()
    }

    // ---- Task lifecycle ----

    /// Create a task; see [`TaskInitializer::create_task`]
    pub async fn create_task(&self, new_task: NewTask) -> SchedulerResult<OrchestrationTask> {
        self.task_initializer.create_task(new_task).await
    }

    /// Attempt to claim a pending task; `false` means the race was lost
    pub async fn claim_task(
        &self,
        task_uuid: Uuid,
        agent_name: &str,
        sandbox_id: Option<&str>,
    ) -> SchedulerResult<bool> {
        self.task_claimer.claim(task_uuid, agent_name, sandbox_id).await
    }

    /// Assign a pending task, erroring if it is no longer pending
    pub async fn assign_task(
        &self,
        task_uuid: Uuid,
        agent_name: &str,
        sandbox_id: Option<&str>,
    ) -> SchedulerResult<OrchestrationTask> {
        self.task_claimer.assign(task_uuid, agent_name, sandbox_id).await
    }

    /// Return an assigned task to the pending pool
    pub async fn release_task(&self, task_uuid: Uuid) -> SchedulerResult<OrchestrationTask> {
        self.task_claimer.release(task_uuid).await
    }

    /// Mark a task as running
    pub async fn start_task(&self, task_uuid: Uuid) -> SchedulerResult<OrchestrationTask> {
        self.task_finalizer.start_task(task_uuid).await
    }

    /// Complete a running task and fan out to its dependents
    pub async fn complete_task(
        &self,
        task_uuid: Uuid,
        result: Option<String>,
    ) -> SchedulerResult<OrchestrationTask> {
        self.task_finalizer.complete_task(task_uuid, result).await
    }

    /// Fail a running task terminally without consuming retry budget
    pub async fn fail_task(
        &self,
        task_uuid: Uuid,
        error_message: String,
    ) -> SchedulerResult<OrchestrationTask> {
        self.task_finalizer.fail_task(task_uuid, error_message).await
    }

    /// Cancel a task that has not yet finished
    pub async fn cancel_task(&self, task_uuid: Uuid) -> SchedulerResult<OrchestrationTask> {
        self.task_finalizer.cancel_task(task_uuid).await
    }

    /// Report a transient failure; requeues with backoff or exhausts
    pub async fn schedule_retry(
        &self,
        task_uuid: Uuid,
        error_message: &str,
        max_retries: Option<i32>,
    ) -> SchedulerResult<RetryOutcome> {
        self.retry_controller
            .schedule_retry(task_uuid, error_message, max_retries)
            .await
    }

    // ---- Dependency graph ----

    /// Add dependency edges to an existing task
    pub async fn add_dependencies(
        &self,
        task_uuid: Uuid,
        dependency_uuids: &[Uuid],
    ) -> SchedulerResult<OrchestrationTask> {
        self.dependency_graph
            .add_dependencies(task_uuid, dependency_uuids)
            .await
    }

    // ---- Queries ----

    /// Fetch a task, erroring when the id resolves to nothing
    pub async fn get_task(&self, task_uuid: Uuid) -> SchedulerResult<OrchestrationTask> {
        self.task_store
            .fetch(task_uuid)
            .await?
            .ok_or_else(|| SchedulerError::task_not_found(task_uuid))
    }

    /// Tasks an agent could claim right now, in creation order
    pub async fn get_ready_tasks(
        &self,
        team_id: &str,
        limit: usize,
    ) -> SchedulerResult<Vec<OrchestrationTask>> {
        self.discovery.get_ready_tasks(team_id, limit).await
    }

    /// Count of a team's in-flight tasks, for concurrency budgeting
    pub async fn count_running_tasks(&self, team_id: &str) -> SchedulerResult<usize> {
        self.discovery.count_running_tasks(team_id).await
    }

    /// List a team's tasks.
    ///
    /// With a status filter the result is ordered by most recent update
    /// first, which is what status dashboards want; without one it is
    /// creation order. `limit` truncates after ordering.
    pub async fn list_tasks_by_team(
        &self,
        team_id: &str,
        status: Option<TaskStatus>,
        limit: usize,
    ) -> SchedulerResult<Vec<OrchestrationTask>> {
        let mut tasks = match status {
            Some(status) => {
                let mut filtered = self
                    .task_store
                    .list_by_team_and_status(team_id, status)
                    .await?;
                filtered.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
                filtered
            }
            None => self.task_store.list_by_team(team_id).await?,
        };
        tasks.truncate(limit);
        Ok(tasks)
    }

    /// A team's tasks in one orchestration group, in creation order
    pub async fn list_tasks_by_group(
        &self,
        team_id: &str,
        orchestration_group: &str,
    ) -> SchedulerResult<Vec<OrchestrationTask>> {
        let tasks = self.task_store.list_by_team(team_id).await?;
        Ok(tasks
            .into_iter()
            .filter(|task| task.orchestration_group.as_deref() == Some(orchestration_group))
            .collect())
    }

    /// Tasks currently assigned to an agent, for liveness sweeps
    pub async fn list_tasks_by_agent(
        &self,
        agent_name: &str,
    ) -> SchedulerResult<Vec<OrchestrationTask>> {
        self.task_store.list_by_agent(agent_name).await
    }

    // ---- Provider health ----

    /// Record a provider health probe
    pub async fn upsert_provider_health(
        &self,
        provider_id: &str,
        team_id: Option<&str>,
        probe: HealthProbe,
    ) -> SchedulerResult<ProviderHealth> {
        self.provider_health
            .upsert_health(provider_id, team_id, probe)
            .await
    }

    /// Resolve provider health with team precedence
    pub async fn get_provider_health(
        &self,
        provider_id: &str,
        team_id: Option<&str>,
    ) -> SchedulerResult<Option<ProviderHealth>> {
        self.provider_health.get_health(provider_id, team_id).await
    }

    /// Every health record for a provider
    pub async fn list_provider_health(
        &self,
        provider_id: &str,
    ) -> SchedulerResult<Vec<ProviderHealth>> {
        self.provider_health.list_provider_health(provider_id).await
    }
}
