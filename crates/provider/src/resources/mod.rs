//! gcloud command tables
//!
//! Each resource kind maps to one or more parts. A part is a single remote
//! object with its own listing call and create call; most kinds have one
//! part, composite kinds (router + NAT, address + peering, instance +
//! database) have several. A resource exists when every part exists.

pub mod cluster;
pub mod managed;
pub mod network;
pub mod registry;

use std::fmt;

use lmsprov_common::{is_sensitive, ResourceKind, ResourceSpec, REDACTED};

use crate::error::{ProviderError, Result};
use crate::provisioner::{matches_name, Scope};

/// Arguments for one gcloud call, without the program name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    args: Vec<String>,
}

impl Invocation {
    pub fn new(base: &[&str]) -> Self {
        Self {
            args: base.iter().map(|s| s.to_string()).collect(),
        }
    }

    pub fn arg(mut self, value: impl Into<String>) -> Self {
        self.args.push(value.into());
        self
    }

    pub fn flag(mut self, name: &str, value: impl AsRef<str>) -> Self {
        self.args.push(format!("--{}={}", name, value.as_ref()));
        self
    }

    pub fn flag_opt(self, name: &str, value: Option<&str>) -> Self {
        match value {
            Some(v) if !v.is_empty() => self.flag(name, v),
            _ => self,
        }
    }

    pub fn switch(mut self, name: &str) -> Self {
        self.args.push(format!("--{name}"));
        self
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }
}

/// Renders the invocation with credential flags masked
impl fmt::Display for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rendered: Vec<String> = self
            .args
            .iter()
            .map(|arg| match arg.split_once('=') {
                Some((flag, _)) if flag.starts_with("--") && is_sensitive(flag) => {
                    format!("{flag}={REDACTED}")
                }
                _ => arg.clone(),
            })
            .collect();
        f.write_str(&rendered.join(" "))
    }
}

/// How a listing line is compared against a part's key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Match {
    /// Final path segment equals the key
    Name,
    /// Whitespace-separated fields equal the key's fields
    Row,
    /// Any `;`/`,` separated token equals the key
    Token,
}

impl Match {
    pub fn matches(&self, line: &str, key: &str) -> bool {
        match self {
            Match::Name => matches_name(line, key),
            Match::Row => line.split_whitespace().eq(key.split_whitespace()),
            Match::Token => line
                .split(|c| c == ';' || c == ',')
                .any(|token| matches_name(token, key)),
        }
    }
}

/// One remote object making up a resource
#[derive(Debug, Clone)]
pub struct Part {
    pub label: &'static str,
    pub list: Invocation,
    pub key: String,
    pub matcher: Match,
    pub create: Invocation,
}

impl Part {
    pub fn present_in(&self, listing: &str) -> bool {
        listing
            .lines()
            .filter(|line| !line.trim().is_empty())
            .any(|line| self.matcher.matches(line, &self.key))
    }
}

/// Parts making up `spec`, in creation order
pub fn parts(spec: &ResourceSpec, scope: &Scope) -> Result<Vec<Part>> {
    match spec.kind {
        ResourceKind::Network => network::network(spec).map(|p| vec![p]),
        ResourceKind::Subnet => network::subnet(spec, scope).map(|p| vec![p]),
        ResourceKind::PeeringRange => network::peering_range(spec),
        ResourceKind::RouterNat => network::router_nat(spec, scope),
        ResourceKind::Cluster => cluster::cluster(spec, scope).map(|p| vec![p]),
        ResourceKind::ManagedDatabase => managed::database(spec, scope),
        ResourceKind::Cache => managed::cache(spec, scope).map(|p| vec![p]),
        ResourceKind::FileShare => managed::file_share(spec, scope).map(|p| vec![p]),
        ResourceKind::ArtifactRepo => registry::artifact_repo(spec, scope).map(|p| vec![p]),
        ResourceKind::IamBinding => registry::iam_binding(spec, scope).map(|p| vec![p]),
    }
}

/// Scope-wide listing for `kind`; `None` when the kind needs a parent to list
/// under (NATs are listed per router)
pub fn list_invocation(kind: ResourceKind, scope: &Scope) -> Option<Invocation> {
    match kind {
        ResourceKind::Network => Some(network::list_networks()),
        ResourceKind::Subnet => Some(network::list_subnets(scope)),
        ResourceKind::PeeringRange => Some(network::list_peering_addresses()),
        ResourceKind::RouterNat => None,
        ResourceKind::Cluster => Some(cluster::list_clusters(scope)),
        ResourceKind::ManagedDatabase => Some(managed::list_instances()),
        ResourceKind::Cache => Some(managed::list_caches(scope)),
        ResourceKind::FileShare => Some(managed::list_file_shares(scope)),
        ResourceKind::ArtifactRepo => Some(registry::list_repositories(scope)),
        ResourceKind::IamBinding => Some(registry::list_bindings(scope)),
    }
}

/// Required parameter lookup
pub(crate) fn required<'a>(spec: &'a ResourceSpec, parameter: &'static str) -> Result<&'a str> {
    spec.get(parameter)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| ProviderError::MissingParameter {
            kind: spec.kind,
            name: spec.name.clone(),
            parameter,
        })
}

/// Parameter value, falling back to the scope's location
pub(crate) fn or_scope<'a>(spec: &'a ResourceSpec, parameter: &str, fallback: &'a str) -> &'a str {
    spec.get(parameter).filter(|v| !v.is_empty()).unwrap_or(fallback)
}
