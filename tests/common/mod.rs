//! Shared fixtures for scheduler integration tests: core builders and a
//! polling helper for the asynchronous cascade path.

#![allow(dead_code)] // Each test binary uses a different subset of these helpers

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use swarm_core::config::SwarmConfig;
use swarm_core::models::task::{NewTask, OrchestrationTask};
use swarm_core::store::InMemoryStore;
use swarm_core::SchedulerCore;
use uuid::Uuid;

/// A core over a fresh in-memory store, with the store handle kept for
/// direct inspection
pub async fn core_with_store() -> (SchedulerCore, Arc<InMemoryStore>) {
    let store = Arc::new(InMemoryStore::new());
    let core = SchedulerCore::with_stores(SwarmConfig::default(), store.clone(), store.clone())
        .await
        .expect("core construction");
    (core, store)
}

/// A core with custom configuration over a fresh in-memory store
pub async fn core_with_config(config: SwarmConfig) -> (SchedulerCore, Arc<InMemoryStore>) {
    let store = Arc::new(InMemoryStore::new());
    let core = SchedulerCore::with_stores(config, store.clone(), store.clone())
        .await
        .expect("core construction");
    (core, store)
}

/// Minimal creation request for a team
pub fn task_request(team_id: &str) -> NewTask {
    NewTask {
        team_id: team_id.to_string(),
        user_id: "user-1".to_string(),
        prompt: "integration test task".to_string(),
        ..Default::default()
    }
}

/// Creation request with dependencies
pub fn dependent_task_request(team_id: &str, dependencies: Vec<Uuid>) -> NewTask {
    NewTask {
        dependencies,
        ..task_request(team_id)
    }
}

/// Create a chain t0 <- t1 <- ... <- t(n-1) where each task depends on the
/// previous one; returns the tasks in creation order
pub async fn create_chain(core: &SchedulerCore, team_id: &str, len: usize) -> Vec<OrchestrationTask> {
    let mut chain: Vec<OrchestrationTask> = Vec::with_capacity(len);
    for i in 0..len {
        let deps = chain.last().map(|prev| vec![prev.task_uuid]).unwrap_or_default();
        let task = core
            .create_task(dependent_task_request(team_id, deps))
            .await
            .expect("chain task creation");
        assert_eq!(task.dependencies.len(), usize::from(i > 0));
        chain.push(task);
    }
    chain
}

/// Drive a task from pending through completion
pub async fn run_to_completion(core: &SchedulerCore, task_uuid: Uuid, agent: &str) {
    assert!(core
        .claim_task(task_uuid, agent, None)
        .await
        .expect("claim"));
    core.start_task(task_uuid).await.expect("start");
    core.complete_task(task_uuid, Some("done".to_string()))
        .await
        .expect("complete");
}

/// Poll `condition` until it holds or ~1s elapses; returns whether it held.
///
/// The completion cascade runs on a background worker, so tests that assert
/// on its effects need to wait rather than assume ordering.
pub async fn wait_until<F, Fut>(mut condition: F) -> bool
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    for _ in 0..200 {
        if condition().await {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    false
}
