//! # Registry Infrastructure
//!
//! Registries consulted by dispatch decisions, separate from the
//! orchestration components that move tasks through their lifecycle.
//!
//! ## Available Registries
//!
//! - **ProviderHealthRegistry**: provider health records with team-scoped
//!   precedence over global records

pub mod provider_health;

pub use provider_health::ProviderHealthRegistry;
