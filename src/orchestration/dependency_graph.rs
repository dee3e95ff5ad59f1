//! # Dependency Graph
//!
//! Validates and maintains the task dependency DAG.
//!
//! Dependencies are stored as doubly-linked adjacency lists: each task carries
//! the UUIDs it depends on (`dependencies`) and the UUIDs that depend on it
//! (`dependents`). This component is the only writer of those edges.
//!
//! ## Key Features
//!
//! - **Cycle prevention**: acyclicity is enforced at edge-insertion time with a
//!   breadth-first walk, so no traversal elsewhere needs a cycle guard
//! - **Team isolation**: edges never cross team boundaries
//! - **Readiness checks**: a task is ready only when every dependency document
//!   exists and is `completed`; a missing dependency blocks forever rather than
//!   counting as vacuously satisfied
//!
//! ## Architecture
//!
//! All validation for an edge batch happens before any write. The writes
//! themselves are per-document CAS updates: reverse edges land on each
//! dependency first, then the forward list lands on the dependent task.

use std::collections::{HashSet, VecDeque};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, info, instrument};
use uuid::Uuid;

use crate::error::{SchedulerError, SchedulerResult};
use crate::models::task::OrchestrationTask;
use crate::state_machine::states::TaskStatus;
use crate::store::TaskStore;

/// Validates and writes dependency edges against a task store
#[derive(Clone)]
pub struct DependencyGraph {
    store: Arc<dyn TaskStore>,
}

impl DependencyGraph {
    /// Create a new dependency graph over the given store
    pub fn new(store: Arc<dyn TaskStore>) -> Self {
        Self { store }
    }

    /// Check whether adding edges from `task_uuid` to `proposed` would close a cycle.
    ///
    /// Walks dependency edges breadth-first from the proposed dependencies; a
    /// cycle exists iff the walk reaches `task_uuid` itself. The walk follows
    /// edges regardless of task status, so completed ancestors still count.
    /// Missing documents contribute no edges.
    #[instrument(skip(self, proposed))]
    pub async fn would_create_cycle(
        &self,
        task_uuid: Uuid,
        proposed: &[Uuid],
    ) -> SchedulerResult<bool> {
        let mut queue: VecDeque<Uuid> = proposed.iter().copied().collect();
        let mut seen: HashSet<Uuid> = proposed.iter().copied().collect();

        while let Some(current) = queue.pop_front() {
            if current == task_uuid {
                return Ok(true);
            }
            let Some(task) = self.store.fetch(current).await? else {
                continue;
            };
            for dep in task.dependencies {
                if seen.insert(dep) {
                    queue.push_back(dep);
                }
            }
        }

        Ok(false)
    }

    /// Check whether every dependency of `task` is satisfied.
    ///
    /// Empty dependency list is trivially ready. A dependency that resolves to
    /// no document is treated as unsatisfied, not as absent.
    pub async fn is_ready(&self, task: &OrchestrationTask) -> SchedulerResult<bool> {
        if task.dependencies.is_empty() {
            return Ok(true);
        }
        let resolved = self.store.fetch_many(&task.dependencies).await?;
        Ok(resolved
            .iter()
            .all(|dep| matches!(dep, Some(d) if d.status.satisfies_dependencies())))
    }

    /// Add dependency edges to an existing task.
    ///
    /// Validates the whole batch (existence, team match, acyclicity) before
    /// writing anything, then wires reverse edges on each dependency and
    /// merges the forward list on the task. Dependencies the task already has
    /// are silently skipped; re-adding an existing edge is a no-op.
    #[instrument(skip(self, dependency_uuids), fields(dependency_count = dependency_uuids.len()))]
    pub async fn add_dependencies(
        &self,
        task_uuid: Uuid,
        dependency_uuids: &[Uuid],
    ) -> SchedulerResult<OrchestrationTask> {
        let task = self
            .store
            .fetch(task_uuid)
            .await?
            .ok_or_else(|| SchedulerError::task_not_found(task_uuid))?;

        let mut additions: Vec<Uuid> = Vec::new();
        for dep in dependency_uuids {
            if !task.depends_on(*dep) && !additions.contains(dep) {
                additions.push(*dep);
            }
        }
        if additions.is_empty() {
            debug!(
                task_uuid = %task_uuid,
                "All requested dependencies already present, nothing to add"
            );
            return Ok(task);
        }

        if task.dependencies.len() + additions.len()
            > crate::constants::system::MAX_DEPENDENCIES_PER_TASK
        {
            return Err(SchedulerError::validation(
                "dependencies",
                format!(
                    "Task cannot have more than {} dependencies",
                    crate::constants::system::MAX_DEPENDENCIES_PER_TASK
                ),
            ));
        }

        self.validate_edges(task_uuid, &task.team_id, &additions)
            .await?;
        for dep in &additions {
            if self.would_create_cycle(task_uuid, &[*dep]).await? {
                return Err(SchedulerError::circular_dependency(task_uuid, *dep));
            }
        }

        let now = Utc::now();
        self.wire_reverse_edges(task_uuid, &additions, now).await?;

        let merged = additions.clone();
        let outcome = self
            .store
            .update(
                task_uuid,
                Box::new(move |task| {
                    for dep in merged {
                        if !task.depends_on(dep) {
                            task.dependencies.push(dep);
                        }
                    }
                    task.updated_at = now;
                    true
                }),
            )
            .await?;

        let updated = outcome.into_task();
        info!(
            task_uuid = %task_uuid,
            added = additions.len(),
            total = updated.dependencies.len(),
            "Dependencies added"
        );
        Ok(updated)
    }

    /// Validate a batch of candidate dependencies for a task: no self-edges,
    /// every target exists, every target belongs to the same team.
    pub(crate) async fn validate_edges(
        &self,
        task_uuid: Uuid,
        team_id: &str,
        candidates: &[Uuid],
    ) -> SchedulerResult<()> {
        for dep in candidates {
            if *dep == task_uuid {
                return Err(SchedulerError::circular_dependency(task_uuid, *dep));
            }
            let target = self
                .store
                .fetch(*dep)
                .await?
                .ok_or_else(|| SchedulerError::dependency_not_found(*dep))?;
            if target.team_id != team_id {
                return Err(SchedulerError::cross_team_dependency(*dep));
            }
        }
        Ok(())
    }

    /// Append `task_uuid` to the dependents list of each dependency.
    ///
    /// Appends are set-unions under each document's CAS, so concurrent wiring
    /// of different dependents cannot lose entries.
    pub(crate) async fn wire_reverse_edges(
        &self,
        task_uuid: Uuid,
        dependency_uuids: &[Uuid],
        now: DateTime<Utc>,
    ) -> SchedulerResult<()> {
        for dep in dependency_uuids {
            self.store
                .update(
                    *dep,
                    Box::new(move |dependency| {
                        if !dependency.dependents.contains(&task_uuid) {
                            dependency.dependents.push(task_uuid);
                            dependency.updated_at = now;
                            true
                        } else {
                            false
                        }
                    }),
                )
                .await?;
        }
        Ok(())
    }

    /// True when `task` is pending, its backoff gate has elapsed, and every
    /// dependency is completed
    pub async fn is_claimable_now(
        &self,
        task: &OrchestrationTask,
        now: DateTime<Utc>,
    ) -> SchedulerResult<bool> {
        if task.status != TaskStatus::Pending || !task.gate_open(now) {
            return Ok(false);
        }
        self.is_ready(task).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::task::NewTask;
    use crate::store::memory::InMemoryStore;

    fn store() -> Arc<InMemoryStore> {
        Arc::new(InMemoryStore::new())
    }

    async fn seed_task(store: &Arc<InMemoryStore>, team: &str) -> OrchestrationTask {
        let task = OrchestrationTask::create(
            NewTask {
                team_id: team.to_string(),
                user_id: "user-1".to_string(),
                prompt: "do the thing".to_string(),
                ..Default::default()
            },
            Utc::now(),
        )
        .unwrap();
        store.insert(task.clone()).await.unwrap();
        task
    }

    #[tokio::test]
    async fn test_self_dependency_is_a_cycle() {
        let store = store();
        let graph = DependencyGraph::new(store.clone());
        let task = seed_task(&store, "team-a").await;

        let result = graph
            .add_dependencies(task.task_uuid, &[task.task_uuid])
            .await;
        assert!(matches!(
            result,
            Err(SchedulerError::CircularDependency { .. })
        ));
    }

    #[tokio::test]
    async fn test_chain_cycle_rejected() {
        let store = store();
        let graph = DependencyGraph::new(store.clone());
        let a = seed_task(&store, "team-a").await;
        let b = seed_task(&store, "team-a").await;
        let c = seed_task(&store, "team-a").await;

        graph
            .add_dependencies(b.task_uuid, &[a.task_uuid])
            .await
            .unwrap();
        graph
            .add_dependencies(c.task_uuid, &[b.task_uuid])
            .await
            .unwrap();

        // a -> b -> c already holds; a depending on c closes the loop
        let result = graph.add_dependencies(a.task_uuid, &[c.task_uuid]).await;
        assert!(matches!(
            result,
            Err(SchedulerError::CircularDependency { .. })
        ));

        // No partial writes: c gained no dependents from the failed call
        let c_after = store.fetch(c.task_uuid).await.unwrap().unwrap();
        assert!(c_after.dependents.is_empty());
    }

    #[tokio::test]
    async fn test_diamond_is_not_a_cycle() {
        let store = store();
        let graph = DependencyGraph::new(store.clone());
        let root = seed_task(&store, "team-a").await;
        let left = seed_task(&store, "team-a").await;
        let right = seed_task(&store, "team-a").await;
        let join = seed_task(&store, "team-a").await;

        graph
            .add_dependencies(left.task_uuid, &[root.task_uuid])
            .await
            .unwrap();
        graph
            .add_dependencies(right.task_uuid, &[root.task_uuid])
            .await
            .unwrap();
        let joined = graph
            .add_dependencies(join.task_uuid, &[left.task_uuid, right.task_uuid])
            .await
            .unwrap();

        assert_eq!(joined.dependencies.len(), 2);
        let root_after = store.fetch(root.task_uuid).await.unwrap().unwrap();
        assert_eq!(root_after.dependents.len(), 2);
    }

    #[tokio::test]
    async fn test_missing_document_contributes_no_edges() {
        let store = store();
        let graph = DependencyGraph::new(store.clone());
        let task = seed_task(&store, "team-a").await;

        // Walk starting from a uuid with no document terminates cleanly
        let phantom = Uuid::new_v4();
        let cyclic = graph
            .would_create_cycle(task.task_uuid, &[phantom])
            .await
            .unwrap();
        assert!(!cyclic);
    }

    #[tokio::test]
    async fn test_dependency_must_exist() {
        let store = store();
        let graph = DependencyGraph::new(store.clone());
        let task = seed_task(&store, "team-a").await;

        let result = graph
            .add_dependencies(task.task_uuid, &[Uuid::new_v4()])
            .await;
        assert!(matches!(
            result,
            Err(SchedulerError::DependencyNotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_cross_team_dependency_rejected() {
        let store = store();
        let graph = DependencyGraph::new(store.clone());
        let ours = seed_task(&store, "team-a").await;
        let theirs = seed_task(&store, "team-b").await;

        let result = graph
            .add_dependencies(ours.task_uuid, &[theirs.task_uuid])
            .await;
        assert!(matches!(
            result,
            Err(SchedulerError::CrossTeamDependency { .. })
        ));

        let theirs_after = store.fetch(theirs.task_uuid).await.unwrap().unwrap();
        assert!(theirs_after.dependents.is_empty());
    }

    #[tokio::test]
    async fn test_re_adding_existing_edge_is_noop() {
        let store = store();
        let graph = DependencyGraph::new(store.clone());
        let a = seed_task(&store, "team-a").await;
        let b = seed_task(&store, "team-a").await;

        graph
            .add_dependencies(b.task_uuid, &[a.task_uuid])
            .await
            .unwrap();
        let again = graph
            .add_dependencies(b.task_uuid, &[a.task_uuid])
            .await
            .unwrap();

        assert_eq!(again.dependencies, vec![a.task_uuid]);
        let a_after = store.fetch(a.task_uuid).await.unwrap().unwrap();
        assert_eq!(a_after.dependents, vec![b.task_uuid]);
    }

    #[tokio::test]
    async fn test_readiness_requires_all_dependencies_completed() {
        let store = store();
        let graph = DependencyGraph::new(store.clone());
        let a = seed_task(&store, "team-a").await;
        let b = seed_task(&store, "team-a").await;
        let c = seed_task(&store, "team-a").await;

        let c = graph
            .add_dependencies(c.task_uuid, &[a.task_uuid, b.task_uuid])
            .await
            .unwrap();
        assert!(!graph.is_ready(&c).await.unwrap());

        store
            .update(
                a.task_uuid,
                Box::new(|task| {
                    task.status = TaskStatus::Completed;
                    true
                }),
            )
            .await
            .unwrap();
        assert!(!graph.is_ready(&c).await.unwrap());

        store
            .update(
                b.task_uuid,
                Box::new(|task| {
                    task.status = TaskStatus::Completed;
                    true
                }),
            )
            .await
            .unwrap();
        assert!(graph.is_ready(&c).await.unwrap());
    }

    #[tokio::test]
    async fn test_missing_dependency_blocks_readiness() {
        let store = store();
        let graph = DependencyGraph::new(store.clone());
        let mut task = seed_task(&store, "team-a").await;

        // Simulate a dependency uuid that resolves to no document
        task.dependencies.push(Uuid::new_v4());
        assert!(!graph.is_ready(&task).await.unwrap());
    }

    #[tokio::test]
    async fn test_failed_dependency_does_not_satisfy() {
        let store = store();
        let graph = DependencyGraph::new(store.clone());
        let a = seed_task(&store, "team-a").await;
        let b = seed_task(&store, "team-a").await;

        let b = graph
            .add_dependencies(b.task_uuid, &[a.task_uuid])
            .await
            .unwrap();

        store
            .update(
                a.task_uuid,
                Box::new(|task| {
                    task.status = TaskStatus::Failed;
                    true
                }),
            )
            .await
            .unwrap();
        assert!(!graph.is_ready(&b).await.unwrap());
    }
}
