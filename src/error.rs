//! # Scheduler Error Types
//!
//! Structured error handling for the orchestration scheduler using thiserror
//! instead of `Box<dyn Error>` patterns.
//!
//! Validation failures, authorization failures, and illegal state transitions
//! each get their own variant so callers can branch on them rather than
//! string-match messages. Storage failures are carried opaquely in
//! [`SchedulerError::Store`] and propagated as-is.

use crate::state_machine::states::TaskStatus;
use thiserror::Error;
use uuid::Uuid;

/// Top-level error type for all scheduler operations
#[derive(Error, Debug)]
pub enum SchedulerError {
    #[error("Task not found: {task_uuid}")]
    TaskNotFound { task_uuid: Uuid },

    #[error("Dependency not found: {dependency_uuid}")]
    DependencyNotFound { dependency_uuid: Uuid },

    #[error("Dependency belongs to a different team: {dependency_uuid}")]
    CrossTeamDependency { dependency_uuid: Uuid },

    #[error("Would create a circular dependency: {task_uuid} -> {dependency_uuid}")]
    CircularDependency {
        task_uuid: Uuid,
        dependency_uuid: Uuid,
    },

    #[error("Invalid transition: cannot apply {event} to task {task_uuid} in state {current_state}")]
    InvalidTransition {
        task_uuid: Uuid,
        current_state: TaskStatus,
        event: String,
    },

    #[error("Validation failed: {field}: {message}")]
    Validation { field: String, message: String },

    #[error("Provider health record not found: {provider_id}")]
    ProviderHealthNotFound { provider_id: String },

    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Store operation failed: {operation}: {message}")]
    Store { operation: String, message: String },

    #[error("Event publish failed: {message}")]
    EventPublish { message: String },
}

impl SchedulerError {
    /// Create a task not found error
    pub fn task_not_found(task_uuid: Uuid) -> Self {
        Self::TaskNotFound { task_uuid }
    }

    /// Create a dependency not found error
    pub fn dependency_not_found(dependency_uuid: Uuid) -> Self {
        Self::DependencyNotFound { dependency_uuid }
    }

    /// Create a cross-team dependency error
    pub fn cross_team_dependency(dependency_uuid: Uuid) -> Self {
        Self::CrossTeamDependency { dependency_uuid }
    }

    /// Create a circular dependency error
    pub fn circular_dependency(task_uuid: Uuid, dependency_uuid: Uuid) -> Self {
        Self::CircularDependency {
            task_uuid,
            dependency_uuid,
        }
    }

    /// Create an invalid transition error
    pub fn invalid_transition(
        task_uuid: Uuid,
        current_state: TaskStatus,
        event: impl Into<String>,
    ) -> Self {
        Self::InvalidTransition {
            task_uuid,
            current_state,
            event: event.into(),
        }
    }

    /// Create a validation error
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create a configuration error
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Create a store error
    pub fn store(operation: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Store {
            operation: operation.into(),
            message: message.into(),
        }
    }

    /// True when the error indicates a caller mistake rather than a system fault
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::TaskNotFound { .. }
                | Self::DependencyNotFound { .. }
                | Self::CrossTeamDependency { .. }
                | Self::CircularDependency { .. }
                | Self::InvalidTransition { .. }
                | Self::Validation { .. }
                | Self::ProviderHealthNotFound { .. }
        )
    }
}

/// Conversion from config::ConfigError for the configuration loader
impl From<config::ConfigError> for SchedulerError {
    fn from(err: config::ConfigError) -> Self {
        SchedulerError::configuration(err.to_string())
    }
}

/// Conversion from serde_json::Error for payload handling
impl From<serde_json::Error> for SchedulerError {
    fn from(err: serde_json::Error) -> Self {
        SchedulerError::store("serialization", err.to_string())
    }
}

/// Convenient Result alias for scheduler operations
pub type SchedulerResult<T> = Result<T, SchedulerError>;
