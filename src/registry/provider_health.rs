//! # Provider Health Registry
//!
//! Registry of model provider health, scoped globally and per team.
//!
//! ## Overview
//!
//! Dispatch decisions need to know whether a provider is usable before
//! handing it a task. The registry keeps one health record per
//! `(provider_id, team_id)` pair, where a `None` team is the global record.
//! Probes upsert records; reads resolve with team precedence.
//!
//! ## Precedence
//!
//! A team-scoped read returns the team's own record when one exists and
//! falls back to the global record otherwise. A team record always wins,
//! even when it reports worse health than the global one: a team that has
//! its own view of a provider trusts that view.
//!
//! ## Usage
//!
//! ```rust
//! use std::sync::Arc;
//! use swarm_core::events::EventPublisher;
//! use swarm_core::models::provider_health::{CircuitState, HealthProbe, ProviderStatus};
//! use swarm_core::registry::ProviderHealthRegistry;
//! use swarm_core::store::InMemoryStore;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let registry = ProviderHealthRegistry::new(
//!     Arc::new(InMemoryStore::new()),
//!     EventPublisher::default(),
//! );
//!
//! let probe = HealthProbe {
//!     status: ProviderStatus::Healthy,
//!     circuit_state: CircuitState::Closed,
//!     failure_count: 0,
//!     success_rate: 0.99,
//!     latency_p50: 120.0,
//!     latency_p99: 900.0,
//!     total_requests: 10_000,
//!     last_error: None,
//! };
//! registry.upsert_health("openai", None, probe).await?;
//!
//! let health = registry.get_health("openai", Some("team-a")).await?;
//! // team-a has no record of its own, so this is the global one
//! assert!(health.is_some());
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;

use chrono::Utc;
use serde_json::json;
use tracing::{debug, info, instrument};

use crate::constants::events::PROVIDER_HEALTH_UPDATED;
use crate::error::SchedulerResult;
use crate::events::EventPublisher;
use crate::models::provider_health::{HealthProbe, ProviderHealth};
use crate::store::ProviderHealthStore;

/// Thread-safe provider health registry with team precedence
#[derive(Clone)]
pub struct ProviderHealthRegistry {
    store: Arc<dyn ProviderHealthStore>,
    publisher: EventPublisher,
}

impl ProviderHealthRegistry {
    /// Create a new provider health registry
    pub fn new(store: Arc<dyn ProviderHealthStore>, publisher: EventPublisher) -> Self {
        Self { store, publisher }
    }

    /// Record a health probe for a provider.
    ///
    /// Creates the `(provider_id, team_id)` record if this is the first
    /// probe for that scope, otherwise patches the existing record. The
    /// record's identity fields never change after creation.
    #[instrument(skip(self, probe), fields(provider_id = %provider_id))]
    pub async fn upsert_health(
        &self,
        provider_id: &str,
        team_id: Option<&str>,
        probe: HealthProbe,
    ) -> SchedulerResult<ProviderHealth> {
        let now = Utc::now();
        let seed = ProviderHealth::from_probe(
            provider_id.to_string(),
            team_id.map(str::to_string),
            &probe,
            now,
        );

        let record = self
            .store
            .upsert_by_key(seed, Box::new(move |record| record.apply_probe(&probe, now)))
            .await?;

        self.publisher.publish(
            PROVIDER_HEALTH_UPDATED,
            json!({
                "providerId": record.provider_id,
                "teamId": record.team_id,
                "status": record.status,
                "circuitState": record.circuit_state,
            }),
        );

        info!(
            provider_id = %record.provider_id,
            team_id = record.team_id.as_deref().unwrap_or("global"),
            status = %record.status,
            circuit_state = %record.circuit_state,
            "Provider health updated"
        );

        Ok(record)
    }

    /// Resolve health for a provider with team precedence.
    ///
    /// With a team: that team's record if present, else the global record.
    /// Without a team: the global record only. `None` means no probe has
    /// ever been recorded for the resolvable scopes.
    #[instrument(skip(self), fields(provider_id = %provider_id))]
    pub async fn get_health(
        &self,
        provider_id: &str,
        team_id: Option<&str>,
    ) -> SchedulerResult<Option<ProviderHealth>> {
        if let Some(team) = team_id {
            if let Some(record) = self.store.fetch_by_key(provider_id, Some(team)).await? {
                debug!(
                    provider_id = %provider_id,
                    team_id = %team,
                    "Resolved team-scoped health record"
                );
                return Ok(Some(record));
            }
        }
        self.store.fetch_by_key(provider_id, None).await
    }

    /// Every health record for a provider, global and team-scoped
    pub async fn list_provider_health(
        &self,
        provider_id: &str,
    ) -> SchedulerResult<Vec<ProviderHealth>> {
        self.store.list_by_provider(provider_id).await
    }
}
