//! # Dependency Graph Integration Tests
//!
//! Covers edge validation at creation and mutation time, cycle rejection,
//! readiness recomputation, and the completion cascade that unblocks
//! dependents through the background worker.

mod common;

use common::*;
use swarm_core::constants::events::TASK_UNBLOCKED;
use swarm_core::error::SchedulerError;
use swarm_core::TaskStatus;
use uuid::Uuid;

#[tokio::test]
async fn test_completing_dependency_unblocks_dependent() {
    let (core, _store) = core_with_store().await;

    let upstream = core
        .create_task(task_request("team-alpha"))
        .await
        .expect("create upstream");
    let downstream = core
        .create_task(dependent_task_request(
            "team-alpha",
            vec![upstream.task_uuid],
        ))
        .await
        .expect("create downstream");

    // Blocked while the dependency is outstanding
    let ready = core.get_ready_tasks("team-alpha", 10).await.expect("ready");
    assert_eq!(ready.len(), 1);
    assert_eq!(ready[0].task_uuid, upstream.task_uuid);

    run_to_completion(&core, upstream.task_uuid, "agent-1").await;

    let unblocked = wait_until(|| async {
        let ready = core.get_ready_tasks("team-alpha", 10).await.expect("ready");
        ready.iter().any(|t| t.task_uuid == downstream.task_uuid)
    })
    .await;
    assert!(unblocked, "dependent never became claimable");
}

#[tokio::test]
async fn test_fan_in_waits_for_all_dependencies() {
    let (core, _store) = core_with_store().await;

    let a = core
        .create_task(task_request("team-alpha"))
        .await
        .expect("create a");
    let b = core
        .create_task(task_request("team-alpha"))
        .await
        .expect("create b");
    let c = core
        .create_task(dependent_task_request(
            "team-alpha",
            vec![a.task_uuid, b.task_uuid],
        ))
        .await
        .expect("create c");

    run_to_completion(&core, a.task_uuid, "agent-1").await;

    // One of two dependencies done: c stays blocked
    tokio::time::sleep(std::time::Duration::from_millis(50)).await;
    let ready = core.get_ready_tasks("team-alpha", 10).await.expect("ready");
    assert!(!ready.iter().any(|t| t.task_uuid == c.task_uuid));

    run_to_completion(&core, b.task_uuid, "agent-2").await;

    let unblocked = wait_until(|| async {
        let ready = core.get_ready_tasks("team-alpha", 10).await.expect("ready");
        ready.iter().any(|t| t.task_uuid == c.task_uuid)
    })
    .await;
    assert!(unblocked, "fan-in dependent never became claimable");
}

#[tokio::test]
async fn test_unblock_publishes_event() {
    let (core, _store) = core_with_store().await;
    let mut events = core.subscribe();

    let upstream = core
        .create_task(task_request("team-alpha"))
        .await
        .expect("create upstream");
    let downstream = core
        .create_task(dependent_task_request(
            "team-alpha",
            vec![upstream.task_uuid],
        ))
        .await
        .expect("create downstream");

    run_to_completion(&core, upstream.task_uuid, "agent-1").await;

    let mut saw_unblock = false;
    for _ in 0..20 {
        match tokio::time::timeout(std::time::Duration::from_millis(250), events.recv()).await {
            Ok(Ok(event)) if event.name == TASK_UNBLOCKED => {
                assert_eq!(
                    event.context["taskUuid"],
                    serde_json::json!(downstream.task_uuid)
                );
                saw_unblock = true;
                break;
            }
            Ok(Ok(_)) => continue,
            _ => break,
        }
    }
    assert!(saw_unblock, "no task.unblocked event observed");
}

#[tokio::test]
async fn test_failed_dependency_keeps_dependent_blocked() {
    let (core, _store) = core_with_store().await;

    let upstream = core
        .create_task(task_request("team-alpha"))
        .await
        .expect("create upstream");
    let downstream = core
        .create_task(dependent_task_request(
            "team-alpha",
            vec![upstream.task_uuid],
        ))
        .await
        .expect("create downstream");

    core.claim_task(upstream.task_uuid, "agent-1", None)
        .await
        .expect("claim");
    core.start_task(upstream.task_uuid).await.expect("start");
    core.fail_task(upstream.task_uuid, "tool error".to_string())
        .await
        .expect("fail");

    tokio::time::sleep(std::time::Duration::from_millis(50)).await;
    let ready = core.get_ready_tasks("team-alpha", 10).await.expect("ready");
    assert!(!ready.iter().any(|t| t.task_uuid == downstream.task_uuid));
}

#[tokio::test]
async fn test_self_dependency_rejected_at_creation() {
    let (core, _store) = core_with_store().await;

    // A task cannot name itself; the uuid is unknown at creation time, so
    // this arrives as a missing dependency
    let bogus = Uuid::new_v4();
    let err = core
        .create_task(dependent_task_request("team-alpha", vec![bogus]))
        .await
        .expect_err("unknown dependency must be rejected");
    assert!(matches!(
        err,
        SchedulerError::DependencyNotFound { dependency_uuid } if dependency_uuid == bogus
    ));

    // Rejected creations leave nothing behind
    let tasks = core
        .list_tasks_by_team("team-alpha", None, 10)
        .await
        .expect("list");
    assert!(tasks.is_empty());
}

#[tokio::test]
async fn test_add_dependencies_rejects_self_loop() {
    let (core, _store) = core_with_store().await;
    let task = core
        .create_task(task_request("team-alpha"))
        .await
        .expect("create");

    let err = core
        .add_dependencies(task.task_uuid, &[task.task_uuid])
        .await
        .expect_err("self loop must be rejected");
    assert!(matches!(err, SchedulerError::CircularDependency { .. }));
}

#[tokio::test]
async fn test_add_dependencies_rejects_cycle_through_chain() {
    let (core, _store) = core_with_store().await;
    let chain = create_chain(&core, "team-alpha", 3).await;

    // chain[2] -> chain[1] -> chain[0]; closing the loop must fail
    let err = core
        .add_dependencies(chain[0].task_uuid, &[chain[2].task_uuid])
        .await
        .expect_err("cycle must be rejected");
    assert!(matches!(
        err,
        SchedulerError::CircularDependency { task_uuid, dependency_uuid }
            if task_uuid == chain[0].task_uuid && dependency_uuid == chain[2].task_uuid
    ));

    // The rejected edge left no partial writes on either side
    let head = core.get_task(chain[0].task_uuid).await.expect("fetch");
    assert!(head.dependencies.is_empty());
    let tail = core.get_task(chain[2].task_uuid).await.expect("fetch");
    assert!(tail.dependents.is_empty());
}

#[tokio::test]
async fn test_cross_team_dependency_rejected() {
    let (core, _store) = core_with_store().await;

    let alpha = core
        .create_task(task_request("team-alpha"))
        .await
        .expect("create");
    let err = core
        .create_task(dependent_task_request("team-beta", vec![alpha.task_uuid]))
        .await
        .expect_err("cross-team edge must be rejected");
    assert!(matches!(
        err,
        SchedulerError::CrossTeamDependency { dependency_uuid } if dependency_uuid == alpha.task_uuid
    ));
}

#[tokio::test]
async fn test_add_dependencies_is_idempotent() {
    let (core, _store) = core_with_store().await;

    let upstream = core
        .create_task(task_request("team-alpha"))
        .await
        .expect("create");
    let task = core
        .create_task(task_request("team-alpha"))
        .await
        .expect("create");

    let first = core
        .add_dependencies(task.task_uuid, &[upstream.task_uuid])
        .await
        .expect("add");
    assert_eq!(first.dependencies, vec![upstream.task_uuid]);

    let second = core
        .add_dependencies(task.task_uuid, &[upstream.task_uuid])
        .await
        .expect("re-add");
    assert_eq!(second.dependencies, vec![upstream.task_uuid]);

    let upstream_doc = core.get_task(upstream.task_uuid).await.expect("fetch");
    assert_eq!(upstream_doc.dependents, vec![task.task_uuid]);
}

#[tokio::test]
async fn test_chain_completes_stage_by_stage() {
    let (core, _store) = core_with_store().await;
    let chain = create_chain(&core, "team-alpha", 4).await;

    for (stage, task) in chain.iter().enumerate() {
        let became_ready = wait_until(|| async {
            let ready = core.get_ready_tasks("team-alpha", 10).await.expect("ready");
            ready.iter().any(|t| t.task_uuid == task.task_uuid)
        })
        .await;
        assert!(became_ready, "stage {stage} never became claimable");

        run_to_completion(&core, task.task_uuid, "agent-1").await;
    }

    for task in &chain {
        let doc = core.get_task(task.task_uuid).await.expect("fetch");
        assert_eq!(doc.status, TaskStatus::Completed);
    }
}

#[tokio::test]
async fn test_dependency_added_after_creation_blocks_readiness() {
    let (core, _store) = core_with_store().await;

    let gate = core
        .create_task(task_request("team-alpha"))
        .await
        .expect("create gate");
    let task = core
        .create_task(task_request("team-alpha"))
        .await
        .expect("create task");

    core.add_dependencies(task.task_uuid, &[gate.task_uuid])
        .await
        .expect("add");

    let ready = core.get_ready_tasks("team-alpha", 10).await.expect("ready");
    assert!(!ready.iter().any(|t| t.task_uuid == task.task_uuid));

    run_to_completion(&core, gate.task_uuid, "agent-1").await;

    let unblocked = wait_until(|| async {
        let ready = core.get_ready_tasks("team-alpha", 10).await.expect("ready");
        ready.iter().any(|t| t.task_uuid == task.task_uuid)
    })
    .await;
    assert!(unblocked, "late-added dependency never released the task");
}
