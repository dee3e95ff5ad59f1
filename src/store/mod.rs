//! Task and provider-health store traits, the persistence seam.
//!
//! The scheduler owns no storage engine. Everything it needs from one is
//! captured by [`TaskStore`] and [`ProviderHealthStore`], and the single
//! strict concurrency requirement lives in [`TaskStore::update`]: a
//! linearizable read-modify-write per document. Cross-document operations
//! (reverse-edge wiring, cascade passes) are intentionally non-transactional
//! and designed to tolerate interleaving.
//!
//! [`memory::InMemoryStore`] is the bundled driver; network-backed drivers
//! implement the same traits outside this crate.

pub mod memory;

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::SchedulerResult;
use crate::models::provider_health::ProviderHealth;
use crate::models::task::OrchestrationTask;
use crate::state_machine::states::TaskStatus;

pub use memory::InMemoryStore;

/// Outcome of a compare-and-set document update
#[derive(Debug, Clone)]
pub enum CasOutcome {
    /// Mutation accepted; carries the post-commit document
    Updated(OrchestrationTask),
    /// Mutation declined by the closure; carries the untouched document
    Rejected(OrchestrationTask),
}

impl CasOutcome {
    /// The document this outcome observed, committed or not
    pub fn into_task(self) -> OrchestrationTask {
        match self {
            Self::Updated(task) | Self::Rejected(task) => task,
        }
    }

    /// True when the mutation committed
    pub fn is_updated(&self) -> bool {
        matches!(self, Self::Updated(_))
    }
}

/// Document mutation run under exclusive per-document access.
///
/// Returning `false` declines the update and the store must discard every
/// change the closure made.
pub type TaskMutation = Box<dyn FnOnce(&mut OrchestrationTask) -> bool + Send>;

/// Task document persistence
#[async_trait]
pub trait TaskStore: Send + Sync {
    /// Insert a new task document. Duplicate ids are a validation error.
    async fn insert(&self, task: OrchestrationTask) -> SchedulerResult<()>;

    /// Fetch one document by id.
    async fn fetch(&self, task_uuid: Uuid) -> SchedulerResult<Option<OrchestrationTask>>;

    /// Fetch a batch, positionally aligned with the input ids.
    ///
    /// A missing document stays `None` so callers can distinguish "absent"
    /// from "satisfied"; dependency checks must never be vacuously true.
    async fn fetch_many(
        &self,
        task_uuids: &[Uuid],
    ) -> SchedulerResult<Vec<Option<OrchestrationTask>>>;

    /// Linearizable read-modify-write on one document.
    ///
    /// The mutation runs under exclusive access to the document; no other
    /// update of the same document may interleave. Returns `TaskNotFound`
    /// when the document does not exist (documents are never deleted, so
    /// this only happens for ids the caller invented).
    async fn update(&self, task_uuid: Uuid, mutation: TaskMutation) -> SchedulerResult<CasOutcome>;

    /// All tasks for a team in creation order.
    async fn list_by_team(&self, team_id: &str) -> SchedulerResult<Vec<OrchestrationTask>>;

    /// Tasks for a team with the given status, in creation order.
    async fn list_by_team_and_status(
        &self,
        team_id: &str,
        status: TaskStatus,
    ) -> SchedulerResult<Vec<OrchestrationTask>>;

    /// Tasks currently assigned to an agent, for the external liveness sweep.
    async fn list_by_agent(&self, agent_name: &str) -> SchedulerResult<Vec<OrchestrationTask>>;

    /// Count a team's tasks across the given statuses.
    async fn count_by_statuses(
        &self,
        team_id: &str,
        statuses: &[TaskStatus],
    ) -> SchedulerResult<usize>;
}

/// Health record mutation applied under the record's entry lock
pub type HealthMutation = Box<dyn FnOnce(&mut ProviderHealth) + Send>;

/// Provider health record persistence, keyed by `(provider_id, team_id)`
#[async_trait]
pub trait ProviderHealthStore: Send + Sync {
    /// Fetch the record under the exact identity key.
    async fn fetch_by_key(
        &self,
        provider_id: &str,
        team_id: Option<&str>,
    ) -> SchedulerResult<Option<ProviderHealth>>;

    /// Find-or-insert under `seed`'s identity key, then apply the mutation.
    ///
    /// The seed is only stored when no record exists yet; the mutation runs
    /// either way. Returns the record as committed.
    async fn upsert_by_key(
        &self,
        seed: ProviderHealth,
        mutation: HealthMutation,
    ) -> SchedulerResult<ProviderHealth>;

    /// Every record for a provider across team scopes.
    async fn list_by_provider(&self, provider_id: &str) -> SchedulerResult<Vec<ProviderHealth>>;
}
