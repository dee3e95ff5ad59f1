//! # Property-Based Tests
//!
//! Proptest coverage for the pure pieces of the scheduler: backoff delay
//! arithmetic, the lifecycle transition table, and creation validation.
//! Randomized async invariants (graph acyclicity, retry storms) run as
//! plain tokio tests since proptest closures are synchronous.

mod common;

use chrono::Utc;
use common::*;
use futures::future::join_all;
use proptest::prelude::*;
use std::collections::HashSet;
use swarm_core::config::BackoffConfig;
use swarm_core::constants::system::{MAX_TASK_PRIORITY, MIN_TASK_PRIORITY};
use swarm_core::models::task::{NewTask, OrchestrationTask};
use swarm_core::orchestration::backoff_delay_ms;
use swarm_core::orchestration::types::RetryOutcome;
use swarm_core::state_machine::{apply, target_status, TaskEvent, TaskStatus};

fn pending_task() -> OrchestrationTask {
    OrchestrationTask::create(
        NewTask {
            team_id: "team-prop".to_string(),
            user_id: "user-1".to_string(),
            prompt: "property target".to_string(),
            ..Default::default()
        },
        Utc::now(),
    )
    .expect("valid creation input")
}

fn arb_status() -> impl Strategy<Value = TaskStatus> {
    prop_oneof![
        Just(TaskStatus::Pending),
        Just(TaskStatus::Assigned),
        Just(TaskStatus::Running),
        Just(TaskStatus::Completed),
        Just(TaskStatus::Failed),
        Just(TaskStatus::Cancelled),
    ]
}

fn arb_event() -> impl Strategy<Value = TaskEvent> {
    prop_oneof![
        ("[a-z]{3,10}", prop::option::of("[a-z0-9]{4,8}")).prop_map(|(agent, sandbox)| {
            TaskEvent::Assign {
                agent_name: agent,
                sandbox_id: sandbox,
            }
        }),
        Just(TaskEvent::Start),
        prop::option::of("[a-z ]{0,20}").prop_map(|result| TaskEvent::Complete { result }),
        "[a-z ]{1,20}".prop_map(|error_message| TaskEvent::Fail { error_message }),
        Just(TaskEvent::Cancel),
        Just(TaskEvent::Release),
        ("[a-z ]{1,20}", 0_i64..600_000).prop_map(|(error_message, delay_ms)| {
            TaskEvent::Requeue {
                error_message,
                next_retry_after: Utc::now() + chrono::Duration::milliseconds(delay_ms),
            }
        }),
        "[a-z ]{1,20}".prop_map(|error_message| TaskEvent::Exhaust { error_message }),
    ]
}

proptest! {
    /// Delay arithmetic never panics and never exceeds the cap, for any
    /// retry count including negative and absurd ones
    #[test]
    fn prop_backoff_bounded_for_any_count(
        retry_count in any::<i32>(),
        base in 1_i64..=1_000_000,
        max in 1_i64..=1_000_000_000,
    ) {
        let config = BackoffConfig {
            base_delay_ms: base,
            max_delay_ms: max,
            default_max_retries: 3,
        };
        let delay = backoff_delay_ms(&config, retry_count);
        prop_assert!(delay >= 0);
        prop_assert!(delay <= max);
    }

    /// More failures never shorten the wait
    #[test]
    fn prop_backoff_monotone_in_attempts(
        a in 1_i32..=40,
        b in 1_i32..=40,
    ) {
        let config = BackoffConfig::default();
        let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
        prop_assert!(backoff_delay_ms(&config, lo) <= backoff_delay_ms(&config, hi));
    }

    /// Below the cap the delay doubles exactly per attempt
    #[test]
    fn prop_backoff_doubles_below_cap(
        retry_count in 1_i32..=20,
        base in 1_i64..=1_000,
    ) {
        let config = BackoffConfig {
            base_delay_ms: base,
            max_delay_ms: i64::MAX,
            default_max_retries: 3,
        };
        let current = backoff_delay_ms(&config, retry_count);
        let next = backoff_delay_ms(&config, retry_count + 1);
        prop_assert_eq!(next, current * 2);
    }

    /// Completed and cancelled tasks accept no lifecycle event at all
    #[test]
    fn prop_terminal_states_absorb_everything(
        terminal in prop_oneof![Just(TaskStatus::Completed), Just(TaskStatus::Cancelled)],
        event in arb_event(),
    ) {
        let mut task = pending_task();
        task.status = terminal;
        let before_status = task.status;
        let before_retries = task.retry_count;

        prop_assert!(target_status(terminal, &event).is_none());
        prop_assert!(apply(&mut task, &event, Utc::now()).is_none());
        prop_assert_eq!(task.status, before_status);
        prop_assert_eq!(task.retry_count, before_retries);
    }

    /// Random event walks only move along table edges, never lose retry
    /// credit, and keep assignment fields clear whenever the task is pending
    #[test]
    fn prop_event_walks_respect_the_table(events in prop::collection::vec(arb_event(), 1..24)) {
        let mut task = pending_task();
        for event in &events {
            let before = task.status;
            let before_retries = task.retry_count;
            let expected = target_status(before, event);

            let applied = apply(&mut task, event, Utc::now());
            prop_assert_eq!(applied, expected);
            match expected {
                Some(target) => prop_assert_eq!(task.status, target),
                None => prop_assert_eq!(task.status, before),
            }
            prop_assert!(task.retry_count >= before_retries);
            if task.status == TaskStatus::Pending {
                prop_assert!(task.assigned_agent_name.is_none());
                prop_assert!(task.assigned_at.is_none());
            }
        }
    }

    /// Priority bounds are enforced at creation for every integer
    #[test]
    fn prop_priority_bounds_enforced(priority in any::<i32>()) {
        let outcome = OrchestrationTask::create(
            NewTask {
                team_id: "team-prop".to_string(),
                user_id: "user-1".to_string(),
                prompt: "bounds".to_string(),
                priority: Some(priority),
                ..Default::default()
            },
            Utc::now(),
        );
        let in_bounds = (MIN_TASK_PRIORITY..=MAX_TASK_PRIORITY).contains(&priority);
        prop_assert_eq!(outcome.is_ok(), in_bounds);
    }

    /// Only completion satisfies a dependent's wait
    #[test]
    fn prop_only_completion_satisfies_dependencies(status in arb_status()) {
        prop_assert_eq!(
            status.satisfies_dependencies(),
            status == TaskStatus::Completed
        );
    }
}

/// Congruential generator for shuffled edge picks, so the sweep stays
/// deterministic without a dedicated dependency in the dev tree
struct Lcg(u64);

impl Lcg {
    fn next(&mut self) -> u64 {
        self.0 = self
            .0
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        self.0 >> 16
    }

    fn pick(&mut self, bound: usize) -> usize {
        (self.next() % bound as u64) as usize
    }
}

#[tokio::test]
async fn test_random_edge_insertions_never_create_cycle() {
    let (core, _store) = core_with_store().await;

    let mut task_uuids = Vec::new();
    for _ in 0..12 {
        let task = core
            .create_task(task_request("team-prop"))
            .await
            .expect("create");
        task_uuids.push(task.task_uuid);
    }

    let mut rng = Lcg(0x5eed_cafe);
    for _ in 0..80 {
        let from = task_uuids[rng.pick(task_uuids.len())];
        let to = task_uuids[rng.pick(task_uuids.len())];
        // Rejections (cycles, self loops, duplicates) are expected; the graph
        // must stay consistent either way
        let _ = core.add_dependencies(from, &[to]).await;
    }

    // Kahn-style peel: a DAG always leaves a removable node
    let mut deps: Vec<(uuid::Uuid, HashSet<uuid::Uuid>)> = Vec::new();
    for task_uuid in &task_uuids {
        let task = core.get_task(*task_uuid).await.expect("fetch");
        deps.push((*task_uuid, task.dependencies.iter().copied().collect()));

        // Reverse edges agree with forward edges
        for dep in &task.dependencies {
            let upstream = core.get_task(*dep).await.expect("fetch dep");
            assert!(
                upstream.dependents.contains(task_uuid),
                "forward edge without matching reverse edge"
            );
        }
    }
    while !deps.is_empty() {
        let position = deps
            .iter()
            .position(|(_, d)| d.is_empty())
            .expect("cycle made it into the store");
        let (removed, _) = deps.swap_remove(position);
        for (_, d) in &mut deps {
            d.remove(&removed);
        }
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn test_retry_storm_exhausts_exactly_once() {
    let (core, _store) = core_with_store().await;
    let task = core
        .create_task(task_request("team-prop"))
        .await
        .expect("create");

    let storms = (0..16).map(|_| {
        let core = core.clone();
        let task_uuid = task.task_uuid;
        async move {
            core.schedule_retry(task_uuid, "storm", Some(0))
                .await
                .expect("retry")
        }
    });
    let outcomes: Vec<RetryOutcome> = join_all(storms).await;

    let exhausted = outcomes.iter().filter(|o| o.is_exhausted()).count();
    let ignored = outcomes.iter().filter(|o| o.is_ignored()).count();
    assert_eq!(exhausted, 1, "exactly one attempt may exhaust the budget");
    assert_eq!(ignored, outcomes.len() - 1);

    let task = core.get_task(task.task_uuid).await.expect("fetch");
    assert_eq!(task.status, TaskStatus::Failed);
    assert_eq!(task.retry_count, 1);
}
