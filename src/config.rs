//! # Scheduler Configuration
//!
//! Layered configuration for the scheduler: built-in defaults, an optional
//! file source, then `SWARM__`-prefixed environment overrides
//! (`SWARM__BACKOFF__MAX_DELAY_MS=600000` style, section and key separated
//! by double underscores).
//!
//! Every section has complete defaults so a bare `SwarmConfig::default()`
//! is a working development configuration.

use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::Path;

use crate::constants::system;
use crate::error::{SchedulerError, SchedulerResult};

/// Top-level scheduler configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SwarmConfig {
    #[serde(default)]
    pub system: SystemConfig,
    #[serde(default)]
    pub backoff: BackoffConfig,
    #[serde(default)]
    pub cascade: CascadeConfig,
    #[serde(default)]
    pub discovery: DiscoveryConfig,
}

/// Process-level settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemConfig {
    /// Deployment environment name (development, test, production)
    #[serde(default = "SystemConfig::default_environment")]
    pub environment: String,
    /// Broadcast channel capacity for lifecycle events
    #[serde(default = "SystemConfig::default_event_channel_capacity")]
    pub event_channel_capacity: usize,
}

/// Retry backoff settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackoffConfig {
    /// First retry delay in milliseconds; doubles per attempt
    #[serde(default = "BackoffConfig::default_base_delay_ms")]
    pub base_delay_ms: i64,
    /// Ceiling on any single retry delay in milliseconds
    #[serde(default = "BackoffConfig::default_max_delay_ms")]
    pub max_delay_ms: i64,
    /// Retry budget applied when a caller does not pass one
    #[serde(default = "BackoffConfig::default_max_retries")]
    pub default_max_retries: i32,
}

/// Completion cascade queue settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CascadeConfig {
    /// Bounded queue depth between completions and the fan-out worker
    #[serde(default = "CascadeConfig::default_queue_capacity")]
    pub queue_capacity: usize,
}

/// Ready-task discovery settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscoveryConfig {
    /// Hard cap applied to any single ready-task query
    #[serde(default = "DiscoveryConfig::default_max_batch_size")]
    pub max_batch_size: usize,
}

impl SystemConfig {
    fn default_environment() -> String {
        detect_environment()
    }

    fn default_event_channel_capacity() -> usize {
        1024
    }
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            environment: Self::default_environment(),
            event_channel_capacity: Self::default_event_channel_capacity(),
        }
    }
}

impl BackoffConfig {
    fn default_base_delay_ms() -> i64 {
        system::BASE_RETRY_DELAY_MS
    }

    fn default_max_delay_ms() -> i64 {
        system::MAX_RETRY_DELAY_MS
    }

    fn default_max_retries() -> i32 {
        system::DEFAULT_MAX_RETRIES
    }
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            base_delay_ms: Self::default_base_delay_ms(),
            max_delay_ms: Self::default_max_delay_ms(),
            default_max_retries: Self::default_max_retries(),
        }
    }
}

impl CascadeConfig {
    fn default_queue_capacity() -> usize {
        256
    }
}

impl Default for CascadeConfig {
    fn default() -> Self {
        Self {
            queue_capacity: Self::default_queue_capacity(),
        }
    }
}

impl DiscoveryConfig {
    fn default_max_batch_size() -> usize {
        system::DEFAULT_READY_BATCH_LIMIT
    }
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            max_batch_size: Self::default_max_batch_size(),
        }
    }
}

impl SwarmConfig {
    /// Load configuration from defaults plus `SWARM__` environment overrides
    pub fn load() -> SchedulerResult<Self> {
        let settings = Config::builder()
            .add_source(File::with_name("swarm-core").required(false))
            .add_source(
                Environment::with_prefix("SWARM")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let config: SwarmConfig = settings.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from an explicit file, then environment overrides
    pub fn load_from_file(path: &Path) -> SchedulerResult<Self> {
        let settings = Config::builder()
            .add_source(File::from(path))
            .add_source(
                Environment::with_prefix("SWARM")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let config: SwarmConfig = settings.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Reject configurations the scheduler cannot run with
    pub fn validate(&self) -> SchedulerResult<()> {
        if self.backoff.base_delay_ms <= 0 {
            return Err(SchedulerError::configuration(
                "backoff.base_delay_ms must be positive",
            ));
        }
        if self.backoff.max_delay_ms < self.backoff.base_delay_ms {
            return Err(SchedulerError::configuration(
                "backoff.max_delay_ms must be >= backoff.base_delay_ms",
            ));
        }
        if self.backoff.default_max_retries < 0 {
            return Err(SchedulerError::configuration(
                "backoff.default_max_retries must not be negative",
            ));
        }
        if self.cascade.queue_capacity == 0 {
            return Err(SchedulerError::configuration(
                "cascade.queue_capacity must be at least 1",
            ));
        }
        if self.discovery.max_batch_size == 0 {
            return Err(SchedulerError::configuration(
                "discovery.max_batch_size must be at least 1",
            ));
        }
        if self.system.event_channel_capacity == 0 {
            return Err(SchedulerError::configuration(
                "system.event_channel_capacity must be at least 1",
            ));
        }
        Ok(())
    }
}

/// Detect the deployment environment from conventional variables
pub fn detect_environment() -> String {
    env::var("SWARM_ENV")
        .or_else(|_| env::var("APP_ENV"))
        .unwrap_or_else(|_| "development".to_string())
}
