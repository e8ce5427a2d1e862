//! Provider error types

use lmsprov_common::ResourceKind;
use thiserror::Error;

/// Result type alias for provider calls
pub type Result<T> = std::result::Result<T, ProviderError>;

#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("Failed to run {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("`{command}` exited with {status}: {stderr}")]
    CommandFailed {
        command: String,
        status: String,
        stderr: String,
    },

    #[error("{kind} {name} is missing required parameter '{parameter}'")]
    MissingParameter {
        kind: ResourceKind,
        name: String,
        parameter: &'static str,
    },

    /// A listing call failed, so presence is unknown
    #[error("Listing failed: {0}")]
    Query(#[source] Box<ProviderError>),

    #[error("Provider rejected request: {0}")]
    Rejected(String),

    #[error("State file error: {0}")]
    State(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl ProviderError {
    /// Mark an error raised while listing existing resources
    pub fn query(self) -> Self {
        match self {
            ProviderError::Query(_) => self,
            other => ProviderError::Query(Box::new(other)),
        }
    }

    /// Whether the error came from a listing call, whichever operation ran it
    pub fn is_query(&self) -> bool {
        matches!(self, ProviderError::Query(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_marking_is_idempotent() {
        let err = ProviderError::Rejected("denied".into()).query().query();
        assert!(err.is_query());
        assert_eq!(err.to_string(), "Listing failed: Provider rejected request: denied");
        assert!(!ProviderError::State("bad".into()).is_query());
    }
}
