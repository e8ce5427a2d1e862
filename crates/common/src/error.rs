//! Error types for lmsprov

use thiserror::Error;

use crate::types::ResourceId;

/// Result type alias using lmsprov Error
pub type Result<T> = std::result::Result<T, Error>;

/// lmsprov error types
#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Config parse error: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("Config encode error: {0}")]
    ConfigEncode(#[from] toml::ser::Error),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Unknown resource kind: {0}")]
    UnknownKind(String),

    #[error("Invalid resource id '{0}', expected <kind>/<name>")]
    InvalidResourceId(String),

    #[error("Resource declared more than once: {id}")]
    DuplicateResource { id: ResourceId },

    #[error("{resource} depends on {dependency}, which is not part of the plan")]
    UnknownDependency {
        resource: ResourceId,
        dependency: ResourceId,
    },

    #[error("Dependency cycle: {}", format_cycle(.path))]
    DependencyCycle { path: Vec<ResourceId> },

    #[error("Query failed for {id}: {message}")]
    QueryFailed { id: ResourceId, message: String },

    #[error("Creation failed for {id}: {message}")]
    CreationFailed { id: ResourceId, message: String },
}

fn format_cycle(path: &[ResourceId]) -> String {
    path.iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(" → ")
}
