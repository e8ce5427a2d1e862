//! The provisioning API seam
//!
//! Everything the reconciler needs from a cloud: list what exists, decide
//! whether one declared resource is present, and create it.

use async_trait::async_trait;
use lmsprov_common::{DeploymentConfig, ResourceKind, ResourceSpec};
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Where resources live: the project plus the location used for scoped listings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scope {
    pub project: String,
    pub region: String,
    pub zone: String,
}

impl Scope {
    pub fn new(
        project: impl Into<String>,
        region: impl Into<String>,
        zone: impl Into<String>,
    ) -> Self {
        Self {
            project: project.into(),
            region: region.into(),
            zone: zone.into(),
        }
    }

    pub fn from_config(config: &DeploymentConfig) -> Self {
        Self::new(&config.project_id, &config.region, &config.zone)
    }
}

/// Operations against an external provisioning API
#[async_trait]
pub trait Provisioner: Send + Sync {
    /// Backend name, for logs
    fn name(&self) -> &'static str;

    /// Identifiers of existing resources of `kind` within `scope`
    async fn list(&self, kind: ResourceKind, scope: &Scope) -> Result<Vec<String>>;

    /// Whether the resource declared by `spec` already exists
    async fn exists(&self, spec: &ResourceSpec, scope: &Scope) -> Result<bool> {
        let existing = self.list(spec.kind, scope).await?;
        Ok(existing.iter().any(|id| matches_name(id, &spec.name)))
    }

    /// Create the resource; returns once the provider reports it ready
    async fn create(&self, spec: &ResourceSpec, scope: &Scope) -> Result<()>;
}

/// Exact match of `name` against a listed identifier.
///
/// Listings may return full resource paths
/// (`projects/p/locations/l/repositories/name`); only the final segment is
/// compared, and it must be equal, not a prefix.
pub fn matches_name(identifier: &str, name: &str) -> bool {
    identifier
        .trim()
        .rsplit('/')
        .next()
        .map_or(false, |last| last == name)
}
