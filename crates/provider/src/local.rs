//! Local state backend
//!
//! Keeps the set of existing resources in memory, optionally mirrored to a
//! JSON file so separate runs see each other's work. Used for rehearsing a
//! plan without a cloud account and as the test double for the reconciler.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use lmsprov_common::{ResourceId, ResourceKind, ResourceSpec};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{ProviderError, Result};
use crate::provisioner::{Provisioner, Scope};

/// Persisted form of the backend
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalState {
    pub resources: BTreeMap<ResourceKind, BTreeSet<String>>,
}

/// A provider call, as seen by the backend
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    List(ResourceKind),
    Create(ResourceId),
}

#[derive(Default)]
struct Failures {
    list: HashMap<ResourceKind, String>,
    create: HashMap<ResourceId, String>,
}

/// In-process provisioner with optional file persistence
#[derive(Default)]
pub struct LocalProvisioner {
    state: Mutex<LocalState>,
    state_file: Option<PathBuf>,
    failures: Mutex<Failures>,
    calls: Mutex<Vec<Call>>,
}

impl LocalProvisioner {
    /// Empty, memory-only backend
    pub fn new() -> Self {
        Self::default()
    }

    /// Backend mirrored to `path`; loads existing state when the file exists
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let state = if path.exists() {
            let content = std::fs::read_to_string(&path)?;
            serde_json::from_str(&content).map_err(|e| {
                ProviderError::State(format!("{} is not a valid state file: {}", path.display(), e))
            })?
        } else {
            LocalState::default()
        };
        debug!(path = %path.display(), "Opened local state");

        Ok(Self {
            state: Mutex::new(state),
            state_file: Some(path),
            ..Self::default()
        })
    }

    pub fn state_file(&self) -> Option<&Path> {
        self.state_file.as_deref()
    }

    /// Record a resource as already existing
    pub fn insert(&self, id: &ResourceId) -> Result<()> {
        let mut state = self.state.lock();
        let mut next = state.clone();
        next.resources
            .entry(id.kind)
            .or_default()
            .insert(id.name.clone());

        // Memory only changes once the file does
        self.persist(&next)?;
        *state = next;
        Ok(())
    }

    pub fn contains(&self, id: &ResourceId) -> bool {
        self.state
            .lock()
            .resources
            .get(&id.kind)
            .map_or(false, |names| names.contains(&id.name))
    }

    pub fn snapshot(&self) -> LocalState {
        self.state.lock().clone()
    }

    /// Make every create of `id` fail with `message`
    pub fn fail_create(&self, id: ResourceId, message: impl Into<String>) {
        self.failures.lock().create.insert(id, message.into());
    }

    /// Make every listing of `kind` fail with `message`
    pub fn fail_list(&self, kind: ResourceKind, message: impl Into<String>) {
        self.failures.lock().list.insert(kind, message.into());
    }

    pub fn clear_failures(&self) {
        let mut failures = self.failures.lock();
        failures.list.clear();
        failures.create.clear();
    }

    /// Calls received so far, oldest first
    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().clone()
    }

    pub fn reset_calls(&self) {
        self.calls.lock().clear();
    }

    fn persist(&self, state: &LocalState) -> Result<()> {
        let Some(path) = &self.state_file else {
            return Ok(());
        };
        let content = serde_json::to_string_pretty(state)?;
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        std::fs::write(path, content)?;
        Ok(())
    }
}

#[async_trait]
impl Provisioner for LocalProvisioner {
    fn name(&self) -> &'static str {
        "local"
    }

    async fn list(&self, kind: ResourceKind, _scope: &Scope) -> Result<Vec<String>> {
        self.calls.lock().push(Call::List(kind));
        if let Some(message) = self.failures.lock().list.get(&kind) {
            return Err(ProviderError::Rejected(message.clone()).query());
        }

        Ok(self
            .state
            .lock()
            .resources
            .get(&kind)
            .map(|names| names.iter().cloned().collect())
            .unwrap_or_default())
    }

    async fn create(&self, spec: &ResourceSpec, _scope: &Scope) -> Result<()> {
        let id = spec.id();
        self.calls.lock().push(Call::Create(id.clone()));
        if let Some(message) = self.failures.lock().create.get(&id) {
            return Err(ProviderError::Rejected(message.clone()));
        }

        info!(resource = %id, "Recorded in local state");
        self.insert(&id)
    }
}
