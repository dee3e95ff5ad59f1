#![allow(clippy::missing_errors_doc)] // Allow public functions without # Errors sections
#![allow(clippy::must_use_candidate)] // Allow methods without must_use when context is clear

//! # Swarm Core Rust
//!
//! Embeddable orchestration scheduler for fleets of AI agents working through
//! interdependent tasks.
//!
//! ## Overview
//!
//! Swarm Core coordinates which task runs next, who runs it, and what happens
//! when it finishes or fails. Tasks are self-contained documents carrying
//! their own lifecycle state, dependency links, retry bookkeeping, and
//! assignment; every state change is a single atomic compare-and-swap on one
//! document, so the scheduler needs no cross-document transactions.
//!
//! ## Architecture
//!
//! The crate implements a **claim-based scheduling model**: agents discover
//! ready tasks, race to claim them through document CAS, execute, and report
//! back. Dependency readiness is recomputed from the documents on every
//! query, which keeps the completion cascade advisory and makes lost
//! notifications harmless.
//!
//! ## Key Features
//!
//! - **Atomic claiming**: N racing agents, exactly one winner, no locks
//!   beyond the document itself
//! - **Dependency DAG**: cycle-checked doubly-linked edges with team isolation
//! - **Retry with backoff**: exponential delays behind a per-task gate, with
//!   a hard budget that terminally fails exhausted tasks
//! - **Completion cascade**: completed tasks proactively unblock dependents
//! - **Provider health registry**: team-scoped records take precedence over
//!   global ones
//! - **Pluggable persistence**: everything runs against the [`store`] traits;
//!   an in-memory driver ships in the crate
//!
//! ## Module Organization
//!
//! - [`models`] - Task document and provider health records
//! - [`state_machine`] - Lifecycle states, events, and the transition table
//! - [`store`] - Persistence seam and the bundled in-memory driver
//! - [`orchestration`] - Scheduling components and the [`SchedulerCore`] facade
//! - [`registry`] - Provider health registry
//! - [`events`] - Lifecycle event publishing
//! - [`config`] - Configuration management
//! - [`error`] - Structured error handling
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use swarm_core::models::task::NewTask;
//! use swarm_core::SchedulerCore;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let core = SchedulerCore::new().await?;
//!
//! let task = core
//!     .create_task(NewTask {
//!         team_id: "team-a".to_string(),
//!         user_id: "user-1".to_string(),
//!         prompt: "Summarize yesterday's incident".to_string(),
//!         ..Default::default()
//!     })
//!     .await?;
//!
//! if core.claim_task(task.task_uuid, "agent-7", None).await? {
//!     core.start_task(task.task_uuid).await?;
//!     core.complete_task(task.task_uuid, Some("summary attached".to_string()))
//!         .await?;
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Integration
//!
//! The crate is transport-free: embed [`SchedulerCore`] directly, or wrap its
//! surface in whatever service layer the deployment needs. External concerns
//! such as agent liveness detection sit outside and drive the same surface
//! (`release_task`, `schedule_retry`) when they intervene.

pub mod config;
pub mod constants;
pub mod error;
pub mod events;
pub mod logging;
pub mod models;
pub mod orchestration;
pub mod registry;
pub mod state_machine;
pub mod store;

pub use config::SwarmConfig;
pub use constants::{status_groups, system, TaskStatus};
// Re-export constants events with different name to avoid conflict
pub use constants::events as system_events;
pub use error::{SchedulerError, SchedulerResult};
pub use events::{EventPublisher, PublishedEvent};
pub use models::provider_health::{CircuitState, HealthProbe, ProviderHealth, ProviderStatus};
pub use models::task::{NewTask, OrchestrationTask};
pub use orchestration::{CascadeStats, RetryOutcome, SchedulerCore};
pub use registry::ProviderHealthRegistry;
pub use store::{CasOutcome, InMemoryStore, ProviderHealthStore, TaskStore};
