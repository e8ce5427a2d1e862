//! lmsprov Common Library
//!
//! Shared types, configuration and plan construction for the lmsprov
//! provisioner.

pub mod builder;
pub mod config;
pub mod error;
pub mod plan;
pub mod types;

// Re-export commonly used types
pub use builder::PlanBuilder;
pub use config::DeploymentConfig;
pub use error::{Error, Result};
pub use plan::ProvisioningPlan;
pub use types::*;

/// lmsprov version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default configuration file name, resolved against the working directory
pub const DEFAULT_CONFIG_FILE: &str = "lmsprov.toml";
