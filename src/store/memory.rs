//! # In-Memory Store Driver
//!
//! The bundled [`TaskStore`]/[`ProviderHealthStore`] implementation backed by
//! `DashMap`. Suitable for tests, single-process deployments, and as the
//! reference semantics for network-backed drivers.
//!
//! ## Concurrency
//!
//! `DashMap::get_mut` holds the document's shard lock for the duration of a
//! mutation, which provides the exclusive per-document access that
//! [`TaskStore::update`] requires. Mutations are applied copy-on-write: the
//! closure runs against a clone and the clone replaces the stored document
//! only when the closure accepts, so a declining closure can never leave a
//! half-applied document behind.
//!
//! An append-only insertion log preserves creation order for the team scans;
//! the (team, status) index family a network driver would maintain reduces
//! to ordered filters here.

use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use parking_lot::RwLock;
use uuid::Uuid;

use crate::error::{SchedulerError, SchedulerResult};
use crate::models::provider_health::ProviderHealth;
use crate::models::task::OrchestrationTask;
use crate::state_machine::states::TaskStatus;
use crate::store::{CasOutcome, HealthMutation, ProviderHealthStore, TaskMutation, TaskStore};

type HealthKey = (String, Option<String>);

/// DashMap-backed store for tasks and provider health records
#[derive(Debug, Default)]
pub struct InMemoryStore {
    tasks: DashMap<Uuid, OrchestrationTask>,
    insertion_log: RwLock<Vec<Uuid>>,
    health: DashMap<HealthKey, ProviderHealth>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of task documents held
    pub fn task_count(&self) -> usize {
        self.tasks.len()
    }

    /// Walk task ids in creation order, cloning documents that pass `keep`
    fn scan_in_order<F>(&self, keep: F) -> Vec<OrchestrationTask>
    where
        F: Fn(&OrchestrationTask) -> bool,
    {
        let log = self.insertion_log.read();
        log.iter()
            .filter_map(|task_uuid| self.tasks.get(task_uuid))
            .filter(|task| keep(task))
            .map(|task| task.clone())
            .collect()
    }
}

#[async_trait]
impl TaskStore for InMemoryStore {
    async fn insert(&self, task: OrchestrationTask) -> SchedulerResult<()> {
        let task_uuid = task.task_uuid;
        match self.tasks.entry(task_uuid) {
            Entry::Occupied(_) => Err(SchedulerError::validation(
                "task_uuid",
                format!("duplicate task id {task_uuid}"),
            )),
            Entry::Vacant(vacant) => {
                vacant.insert(task);
                self.insertion_log.write().push(task_uuid);
                Ok(())
            }
        }
    }

    async fn fetch(&self, task_uuid: Uuid) -> SchedulerResult<Option<OrchestrationTask>> {
        Ok(self.tasks.get(&task_uuid).map(|task| task.clone()))
    }

    async fn fetch_many(
        &self,
        task_uuids: &[Uuid],
    ) -> SchedulerResult<Vec<Option<OrchestrationTask>>> {
        Ok(task_uuids
            .iter()
            .map(|task_uuid| self.tasks.get(task_uuid).map(|task| task.clone()))
            .collect())
    }

    async fn update(&self, task_uuid: Uuid, mutation: TaskMutation) -> SchedulerResult<CasOutcome> {
        // get_mut pins the shard lock, so the whole read-modify-write is
        // exclusive against other updates of this document
        let Some(mut entry) = self.tasks.get_mut(&task_uuid) else {
            return Err(SchedulerError::task_not_found(task_uuid));
        };

        let mut candidate = entry.clone();
        if mutation(&mut candidate) {
            *entry = candidate.clone();
            Ok(CasOutcome::Updated(candidate))
        } else {
            Ok(CasOutcome::Rejected(entry.clone()))
        }
    }

    async fn list_by_team(&self, team_id: &str) -> SchedulerResult<Vec<OrchestrationTask>> {
        Ok(self.scan_in_order(|task| task.team_id == team_id))
    }

    async fn list_by_team_and_status(
        &self,
        team_id: &str,
        status: TaskStatus,
    ) -> SchedulerResult<Vec<OrchestrationTask>> {
        Ok(self.scan_in_order(|task| task.team_id == team_id && task.status == status))
    }

    async fn list_by_agent(&self, agent_name: &str) -> SchedulerResult<Vec<OrchestrationTask>> {
        Ok(self.scan_in_order(|task| {
            task.assigned_agent_name.as_deref() == Some(agent_name)
        }))
    }

    async fn count_by_statuses(
        &self,
        team_id: &str,
        statuses: &[TaskStatus],
    ) -> SchedulerResult<usize> {
        Ok(self
            .tasks
            .iter()
            .filter(|task| task.team_id == team_id && statuses.contains(&task.status))
            .count())
    }
}

#[async_trait]
impl ProviderHealthStore for InMemoryStore {
    async fn fetch_by_key(
        &self,
        provider_id: &str,
        team_id: Option<&str>,
    ) -> SchedulerResult<Option<ProviderHealth>> {
        let key = (provider_id.to_string(), team_id.map(str::to_string));
        Ok(self.health.get(&key).map(|record| record.clone()))
    }

    async fn upsert_by_key(
        &self,
        seed: ProviderHealth,
        mutation: HealthMutation,
    ) -> SchedulerResult<ProviderHealth> {
        let key = (seed.provider_id.clone(), seed.team_id.clone());
        let mut entry = self.health.entry(key).or_insert(seed);
        mutation(&mut entry);
        Ok(entry.clone())
    }

    async fn list_by_provider(&self, provider_id: &str) -> SchedulerResult<Vec<ProviderHealth>> {
        let mut records: Vec<ProviderHealth> = self
            .health
            .iter()
            .filter(|entry| entry.key().0 == provider_id)
            .map(|entry| entry.value().clone())
            .collect();
        // Global record first, then team scopes alphabetically
        records.sort_by(|a, b| a.team_id.cmp(&b.team_id));
        Ok(records)
    }
}
