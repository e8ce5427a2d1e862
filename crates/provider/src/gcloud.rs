//! gcloud binding
//!
//! Drives the `gcloud` CLI. Calls are blocking from the caller's point of
//! view: `--async` is never passed, so a successful create means the
//! resource is ready.

use std::sync::Arc;

use async_trait::async_trait;
use lmsprov_common::{ResourceKind, ResourceSpec};
use tracing::{debug, info};

use crate::error::{ProviderError, Result};
use crate::provisioner::{Provisioner, Scope};
use crate::resources::{self, network, Invocation, Part};
use crate::runner::{CommandRunner, ProcessRunner};

pub const DEFAULT_BINARY: &str = "gcloud";

/// Provisioner backed by the gcloud CLI
pub struct GcloudProvisioner {
    binary: String,
    runner: Arc<dyn CommandRunner>,
}

impl GcloudProvisioner {
    pub fn new(binary: impl Into<String>) -> Self {
        Self::with_runner(binary, Arc::new(ProcessRunner))
    }

    pub fn with_runner(binary: impl Into<String>, runner: Arc<dyn CommandRunner>) -> Self {
        Self {
            binary: binary.into(),
            runner,
        }
    }

    /// Run one invocation against the project, returning stdout
    async fn run(&self, invocation: &Invocation, scope: &Scope) -> Result<String> {
        let invocation = invocation
            .clone()
            .flag("project", &scope.project)
            .switch("quiet");
        debug!(command = %invocation, "Running {}", self.binary);

        let output = self
            .runner
            .run(&self.binary, invocation.args())
            .await
            .map_err(|source| ProviderError::Spawn {
                program: self.binary.clone(),
                source,
            })?;

        if !output.success {
            return Err(ProviderError::CommandFailed {
                command: format!("{} {}", self.binary, invocation),
                status: output
                    .code
                    .map_or_else(|| "signal".to_string(), |c| format!("exit code {c}")),
                stderr: output.stderr,
            });
        }
        Ok(output.stdout)
    }

    async fn present(&self, part: &Part, scope: &Scope) -> Result<bool> {
        let listing = self
            .run(&part.list, scope)
            .await
            .map_err(ProviderError::query)?;
        Ok(part.present_in(&listing))
    }

    async fn list_lines(&self, invocation: &Invocation, scope: &Scope) -> Result<Vec<String>> {
        let stdout = self
            .run(invocation, scope)
            .await
            .map_err(ProviderError::query)?;
        Ok(stdout
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(ToString::to_string)
            .collect())
    }
}

#[async_trait]
impl Provisioner for GcloudProvisioner {
    fn name(&self) -> &'static str {
        "gcloud"
    }

    async fn list(&self, kind: ResourceKind, scope: &Scope) -> Result<Vec<String>> {
        match resources::list_invocation(kind, scope) {
            Some(invocation) => self.list_lines(&invocation, scope).await,
            None => {
                // NATs live under routers
                let mut nats = Vec::new();
                for router in self.list_lines(&network::list_routers(scope), scope).await? {
                    let listing = network::list_nats(&router, &scope.region);
                    nats.extend(self.list_lines(&listing, scope).await?);
                }
                Ok(nats)
            }
        }
    }

    /// Present only when every part is; later parts are not listed once an
    /// earlier one is missing, since their listings need the parent
    async fn exists(&self, spec: &ResourceSpec, scope: &Scope) -> Result<bool> {
        for part in resources::parts(spec, scope)? {
            if !self.present(&part, scope).await? {
                debug!(resource = %spec.id(), part = part.label, "Part not found");
                return Ok(false);
            }
        }
        Ok(true)
    }

    async fn create(&self, spec: &ResourceSpec, scope: &Scope) -> Result<()> {
        let parts = resources::parts(spec, scope)?;
        let composite = parts.len() > 1;

        for part in &parts {
            if composite && self.present(part, scope).await? {
                debug!(resource = %spec.id(), part = part.label, "Part already present");
                continue;
            }
            info!(resource = %spec.id(), part = part.label, "Creating");
            self.run(&part.create, scope).await?;
        }
        Ok(())
    }
}
