//! # Provider Health Model
//!
//! Rolling health snapshot for an agent provider, keyed by
//! `(provider_id, optional team_id)`.
//!
//! The scheduler records what health probes report and answers lookups with
//! team-scoped precedence; it does not compute circuit-breaker decisions
//! itself. Records serialize with the same camelCase field names the probes
//! already emit (`circuitState`, `latencyP50`, ...).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Reported provider condition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderStatus {
    Healthy,
    Degraded,
    Unhealthy,
}

impl fmt::Display for ProviderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Healthy => write!(f, "healthy"),
            Self::Degraded => write!(f, "degraded"),
            Self::Unhealthy => write!(f, "unhealthy"),
        }
    }
}

/// Circuit breaker position as reported by the probing side
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CircuitState {
    /// Normal operation, calls allowed through
    Closed,
    /// Failure mode, calls failing fast
    Open,
    /// Testing recovery with limited calls
    HalfOpen,
}

impl fmt::Display for CircuitState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Closed => write!(f, "closed"),
            Self::Open => write!(f, "open"),
            Self::HalfOpen => write!(f, "half-open"),
        }
    }
}

/// Per-(provider, optional team) health snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderHealth {
    pub provider_id: String,
    /// None means the record applies team-wide (global scope)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub team_id: Option<String>,
    pub status: ProviderStatus,
    pub circuit_state: CircuitState,
    pub failure_count: u32,
    /// Fraction of successful calls in the probe window, 0.0 to 1.0
    pub success_rate: f64,
    /// Milliseconds
    pub latency_p50: f64,
    /// Milliseconds
    pub latency_p99: f64,
    pub total_requests: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
    pub last_check: DateTime<Utc>,
}

/// Probe payload applied wholesale on each upsert.
///
/// Identity (`provider_id`, `team_id`) and the `last_check` stamp come from
/// the registry, everything else from the probe.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthProbe {
    pub status: ProviderStatus,
    pub circuit_state: CircuitState,
    pub failure_count: u32,
    pub success_rate: f64,
    pub latency_p50: f64,
    pub latency_p99: f64,
    pub total_requests: u64,
    pub last_error: Option<String>,
}

impl ProviderHealth {
    /// Build a record from the first probe seen for an identity
    pub fn from_probe(
        provider_id: impl Into<String>,
        team_id: Option<String>,
        probe: &HealthProbe,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            provider_id: provider_id.into(),
            team_id,
            status: probe.status,
            circuit_state: probe.circuit_state,
            failure_count: probe.failure_count,
            success_rate: probe.success_rate,
            latency_p50: probe.latency_p50,
            latency_p99: probe.latency_p99,
            total_requests: probe.total_requests,
            last_error: probe.last_error.clone(),
            last_check: now,
        }
    }

    /// Overwrite the snapshot with a fresh probe and stamp `last_check`
    pub fn apply_probe(&mut self, probe: &HealthProbe, now: DateTime<Utc>) {
        self.status = probe.status;
        self.circuit_state = probe.circuit_state;
        self.failure_count = probe.failure_count;
        self.success_rate = probe.success_rate;
        self.latency_p50 = probe.latency_p50;
        self.latency_p99 = probe.latency_p99;
        self.total_requests = probe.total_requests;
        self.last_error = probe.last_error.clone();
        self.last_check = now;
    }

    /// True when the record is scoped to a specific team
    pub fn is_team_scoped(&self) -> bool {
        self.team_id.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn degraded_probe() -> HealthProbe {
        HealthProbe {
            status: ProviderStatus::Degraded,
            circuit_state: CircuitState::HalfOpen,
            failure_count: 4,
            success_rate: 0.82,
            latency_p50: 410.0,
            latency_p99: 2900.0,
            total_requests: 118,
            last_error: Some("upstream 529".to_string()),
        }
    }

    #[test]
    fn test_from_probe_stamps_identity_and_check_time() {
        let now = Utc::now();
        let record = ProviderHealth::from_probe("anthropic", Some("team-a".to_string()), &degraded_probe(), now);

        assert_eq!(record.provider_id, "anthropic");
        assert!(record.is_team_scoped());
        assert_eq!(record.status, ProviderStatus::Degraded);
        assert_eq!(record.last_check, now);
    }

    #[test]
    fn test_apply_probe_overwrites_wholesale() {
        let earlier = Utc::now() - chrono::Duration::minutes(5);
        let mut record =
            ProviderHealth::from_probe("openai", None, &degraded_probe(), earlier);

        let recovered = HealthProbe {
            status: ProviderStatus::Healthy,
            circuit_state: CircuitState::Closed,
            failure_count: 0,
            success_rate: 1.0,
            latency_p50: 120.0,
            latency_p99: 800.0,
            total_requests: 240,
            last_error: None,
        };
        let now = Utc::now();
        record.apply_probe(&recovered, now);

        assert_eq!(record.status, ProviderStatus::Healthy);
        assert_eq!(record.circuit_state, CircuitState::Closed);
        assert_eq!(record.last_error, None);
        assert_eq!(record.last_check, now);
        assert!(!record.is_team_scoped());
    }

    #[test]
    fn test_circuit_state_serializes_kebab_case() {
        let json = serde_json::to_string(&CircuitState::HalfOpen).unwrap();
        assert_eq!(json, "\"half-open\"");
        assert_eq!(CircuitState::HalfOpen.to_string(), "half-open");
    }

    #[test]
    fn test_record_serializes_camel_case() {
        let record =
            ProviderHealth::from_probe("anthropic", None, &degraded_probe(), Utc::now());
        let value = serde_json::to_value(&record).unwrap();

        assert!(value.get("providerId").is_some());
        assert!(value.get("circuitState").is_some());
        assert!(value.get("latencyP50").is_some());
        assert!(value.get("lastCheck").is_some());
        // Global records omit the team field entirely
        assert!(value.get("teamId").is_none());
    }
}
