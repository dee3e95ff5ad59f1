pub mod provider_health;
pub mod task;

// Re-export core models for easy access
pub use provider_health::{CircuitState, HealthProbe, ProviderHealth, ProviderStatus};
pub use task::{NewTask, OrchestrationTask};
