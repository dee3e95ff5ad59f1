//! # Orchestration Engine
//!
//! Scheduling core for agent task coordination.
//!
//! ## Architecture
//!
//! The engine follows a **document-per-task architecture** where:
//! - **The store seam provides atomicity**: every state change is one
//!   compare-and-swap on a single task document
//! - **Components own one concern each**: creation, claiming, finalization,
//!   retry, discovery, and cascade are separate components sharing only the
//!   store and the event publisher
//! - **Readiness is recomputed, never cached**: dependency state is derived
//!   from the documents on demand, so advisory paths (the cascade) can be
//!   lossy without affecting correctness
//!
//! ## Core Components
//!
//! - **SchedulerCore**: facade that wires and exposes everything below
//! - **TaskInitializer**: task creation with dependency validation
//! - **TaskClaimer**: atomic claim/assign/release of pending tasks
//! - **TaskFinalizer**: start, complete, fail, and cancel transitions
//! - **RetryController**: backoff scheduling and retry budget enforcement
//! - **CompletionCascade**: deferred fan-out that unblocks dependents
//! - **ViableTaskDiscovery**: ready-task queries for dispatch loops
//! - **DependencyGraph**: DAG validation and doubly-linked edge wiring

pub mod completion_cascade;
pub mod core;
pub mod dependency_graph;
pub mod retry_controller;
pub mod task_claimer;
pub mod task_finalizer;
pub mod task_initializer;
pub mod types;
pub mod viable_task_discovery;

// Re-export core types and components for easy access
pub use completion_cascade::CompletionCascade;
pub use core::SchedulerCore;
pub use dependency_graph::DependencyGraph;
pub use retry_controller::{backoff_delay_ms, RetryController};
pub use task_claimer::TaskClaimer;
pub use task_finalizer::TaskFinalizer;
pub use task_initializer::TaskInitializer;
pub use types::{CascadeStats, RetryOutcome};
pub use viable_task_discovery::ViableTaskDiscovery;
