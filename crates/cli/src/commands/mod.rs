//! CLI Commands

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context as _, Result};
use clap::ValueEnum;
use lmsprov_common::{DeploymentConfig, PlanBuilder, ProvisioningPlan};
use lmsprov_engine::Reconciler;
use lmsprov_provider::{GcloudProvisioner, LocalProvisioner, Provisioner, Scope};
use tracing::debug;

use crate::output::OutputFormat;

pub mod apply;
pub mod init;
pub mod list;
pub mod plan;
pub mod validate;

/// Default state file of the local backend
pub const DEFAULT_STATE_FILE: &str = ".lmsprov/local-state.json";

/// Provider backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Backend {
    /// Real resources through the gcloud CLI
    Gcloud,
    /// Rehearsal against a JSON state file
    Local,
}

/// Flags that select and configure the backend
pub struct BackendArgs {
    pub backend: Backend,
    pub state_file: Option<PathBuf>,
    pub gcloud_bin: String,
}

/// Location flags that take precedence over the configuration file
#[derive(Default)]
pub struct Overrides {
    pub project: Option<String>,
    pub region: Option<String>,
    pub zone: Option<String>,
}

impl Overrides {
    fn apply(&self, config: &mut DeploymentConfig) {
        if let Some(project) = &self.project {
            config.project_id = project.clone();
        }
        if let Some(region) = &self.region {
            config.region = region.clone();
        }
        if let Some(zone) = &self.zone {
            config.zone = zone.clone();
        }
    }
}

/// Load the configuration (defaults when the file is absent) and apply overrides
pub fn load_config(path: &Path, overrides: &Overrides) -> Result<DeploymentConfig> {
    let mut config = DeploymentConfig::load(path)
        .with_context(|| format!("Failed to load configuration from {}", path.display()))?;
    if !path.exists() {
        debug!(path = %path.display(), "No configuration file, using defaults");
    }
    overrides.apply(&mut config);
    Ok(config)
}

/// Everything a command that talks to a backend needs
pub struct Context {
    pub config: DeploymentConfig,
    pub format: OutputFormat,
    provider: Arc<dyn Provisioner>,
}

impl Context {
    pub fn new(
        config_path: &Path,
        overrides: &Overrides,
        backend: BackendArgs,
        format: OutputFormat,
    ) -> Result<Self> {
        let config = load_config(config_path, overrides)?;
        let provider: Arc<dyn Provisioner> = match backend.backend {
            Backend::Gcloud => Arc::new(GcloudProvisioner::new(backend.gcloud_bin)),
            Backend::Local => {
                let path = backend
                    .state_file
                    .unwrap_or_else(|| PathBuf::from(DEFAULT_STATE_FILE));
                let local = LocalProvisioner::open(&path)
                    .with_context(|| format!("Failed to open state file {}", path.display()))?;
                Arc::new(local)
            }
        };

        Ok(Self {
            config,
            format,
            provider,
        })
    }

    pub fn provider(&self) -> Arc<dyn Provisioner> {
        self.provider.clone()
    }

    pub fn scope(&self) -> Scope {
        Scope::from_config(&self.config)
    }

    pub fn plan(&self) -> Result<ProvisioningPlan> {
        PlanBuilder::new(&self.config)
            .build()
            .context("Invalid deployment configuration")
    }

    pub fn reconciler(&self) -> Reconciler {
        Reconciler::new(self.provider(), self.scope())
    }
}
