//! Core types for lmsprov

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::Error;

/// Kind of infrastructure resource the provisioner knows how to ensure
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    Network,
    Subnet,
    Cluster,
    RouterNat,
    ManagedDatabase,
    Cache,
    FileShare,
    ArtifactRepo,
    IamBinding,
    PeeringRange,
}

impl ResourceKind {
    pub const ALL: [ResourceKind; 10] = [
        ResourceKind::Network,
        ResourceKind::Subnet,
        ResourceKind::Cluster,
        ResourceKind::RouterNat,
        ResourceKind::ManagedDatabase,
        ResourceKind::Cache,
        ResourceKind::FileShare,
        ResourceKind::ArtifactRepo,
        ResourceKind::IamBinding,
        ResourceKind::PeeringRange,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceKind::Network => "network",
            ResourceKind::Subnet => "subnet",
            ResourceKind::Cluster => "cluster",
            ResourceKind::RouterNat => "router_nat",
            ResourceKind::ManagedDatabase => "managed_database",
            ResourceKind::Cache => "cache",
            ResourceKind::FileShare => "file_share",
            ResourceKind::ArtifactRepo => "artifact_repo",
            ResourceKind::IamBinding => "iam_binding",
            ResourceKind::PeeringRange => "peering_range",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResourceKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace('-', "_");
        ResourceKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == normalized)
            .ok_or_else(|| Error::UnknownKind(s.to_string()))
    }
}

/// Identity of a resource within a plan: kind plus name
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ResourceId {
    pub kind: ResourceKind,
    pub name: String,
}

impl ResourceId {
    pub fn new(kind: ResourceKind, name: impl Into<String>) -> Self {
        Self {
            kind,
            name: name.into(),
        }
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.kind, self.name)
    }
}

impl FromStr for ResourceId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (kind, name) = s
            .split_once('/')
            .ok_or_else(|| Error::InvalidResourceId(s.to_string()))?;
        if name.is_empty() {
            return Err(Error::InvalidResourceId(s.to_string()));
        }
        Ok(Self::new(kind.parse()?, name))
    }
}

/// Desired resource: what must exist, with which creation parameters
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceSpec {
    pub kind: ResourceKind,
    pub name: String,
    #[serde(default)]
    pub parameters: BTreeMap<String, String>,
    #[serde(default)]
    pub depends_on: Vec<ResourceId>,
}

impl ResourceSpec {
    pub fn new(kind: ResourceKind, name: impl Into<String>) -> Self {
        Self {
            kind,
            name: name.into(),
            parameters: BTreeMap::new(),
            depends_on: Vec::new(),
        }
    }

    pub fn id(&self) -> ResourceId {
        ResourceId::new(self.kind, self.name.clone())
    }

    pub fn param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.parameters.insert(key.into(), value.into());
        self
    }

    pub fn depends_on(mut self, id: ResourceId) -> Self {
        if !self.depends_on.contains(&id) {
            self.depends_on.push(id);
        }
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.parameters.get(key).map(String::as_str)
    }

    /// Parameters with secret values masked, for logs and output
    pub fn redacted_parameters(&self) -> BTreeMap<String, String> {
        self.parameters
            .iter()
            .map(|(k, v)| {
                let value = if is_sensitive(k) {
                    REDACTED.to_string()
                } else {
                    v.clone()
                };
                (k.clone(), value)
            })
            .collect()
    }
}

pub const REDACTED: &str = "********";

/// Whether a parameter key names a credential
pub fn is_sensitive(key: &str) -> bool {
    let key = key.to_ascii_lowercase();
    key.contains("password") || key.contains("secret")
}

/// Outcome of one reconciliation step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepOutcome {
    AlreadyExists,
    Created,
    Failed,
}

impl fmt::Display for StepOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StepOutcome::AlreadyExists => write!(f, "already exists"),
            StepOutcome::Created => write!(f, "created"),
            StepOutcome::Failed => write!(f, "failed"),
        }
    }
}

/// Which provider call a failed step died in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// The existence query failed; presence is unknown
    Query,
    /// The provider rejected the create call
    Creation,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepFailure {
    pub kind: FailureKind,
    pub message: String,
}

/// Result of applying a single ResourceSpec
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepResult {
    pub resource: ResourceId,
    pub outcome: StepOutcome,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure: Option<StepFailure>,
    pub elapsed_ms: u64,
}

impl StepResult {
    pub fn already_exists(resource: ResourceId, elapsed_ms: u64) -> Self {
        Self {
            resource,
            outcome: StepOutcome::AlreadyExists,
            failure: None,
            elapsed_ms,
        }
    }

    pub fn created(resource: ResourceId, elapsed_ms: u64) -> Self {
        Self {
            resource,
            outcome: StepOutcome::Created,
            failure: None,
            elapsed_ms,
        }
    }

    pub fn failed(
        resource: ResourceId,
        kind: FailureKind,
        message: impl Into<String>,
        elapsed_ms: u64,
    ) -> Self {
        Self {
            resource,
            outcome: StepOutcome::Failed,
            failure: Some(StepFailure {
                kind,
                message: message.into(),
            }),
            elapsed_ms,
        }
    }

    /// The failure as a typed error, if this step failed
    pub fn error(&self) -> Option<Error> {
        let failure = self.failure.as_ref()?;
        let id = self.resource.clone();
        let message = failure.message.clone();
        Some(match failure.kind {
            FailureKind::Query => Error::QueryFailed { id, message },
            FailureKind::Creation => Error::CreationFailed { id, message },
        })
    }
}

/// Everything one `apply` run did
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApplyReport {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub steps: Vec<StepResult>,
    /// Plan entries skipped because an earlier step failed
    #[serde(default)]
    pub not_attempted: Vec<ResourceId>,
}

impl ApplyReport {
    pub fn begin() -> Self {
        Self {
            run_id: Uuid::new_v4(),
            started_at: Utc::now(),
            finished_at: None,
            steps: Vec::new(),
            not_attempted: Vec::new(),
        }
    }

    pub fn finish(&mut self) {
        self.finished_at = Some(Utc::now());
    }

    pub fn outcomes(&self) -> Vec<StepOutcome> {
        self.steps.iter().map(|s| s.outcome).collect()
    }

    pub fn created(&self) -> usize {
        self.count(StepOutcome::Created)
    }

    pub fn already_existing(&self) -> usize {
        self.count(StepOutcome::AlreadyExists)
    }

    pub fn failed(&self) -> Option<&StepResult> {
        self.steps
            .iter()
            .find(|s| s.outcome == StepOutcome::Failed)
    }

    pub fn is_success(&self) -> bool {
        self.failed().is_none()
    }

    /// Process exit code: 0 success, 1 creation failure, 2 query failure
    pub fn exit_code(&self) -> i32 {
        match self.failed().and_then(|s| s.failure.as_ref()) {
            None => 0,
            Some(StepFailure {
                kind: FailureKind::Query,
                ..
            }) => 2,
            Some(_) => 1,
        }
    }

    fn count(&self, outcome: StepOutcome) -> usize {
        self.steps.iter().filter(|s| s.outcome == outcome).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case("network", ResourceKind::Network)]
    #[test_case("router_nat", ResourceKind::RouterNat)]
    #[test_case("router-nat", ResourceKind::RouterNat)]
    #[test_case("Managed_Database", ResourceKind::ManagedDatabase)]
    fn test_kind_parse(input: &str, expected: ResourceKind) {
        assert_eq!(input.parse::<ResourceKind>().unwrap(), expected);
    }

    #[test]
    fn test_kind_parse_rejects_unknown() {
        assert!(matches!(
            "bucket".parse::<ResourceKind>(),
            Err(Error::UnknownKind(_))
        ));
    }

    #[test]
    fn test_resource_id_display_and_parse() {
        let id: ResourceId = "cluster/gke-a".parse().unwrap();
        assert_eq!(id, ResourceId::new(ResourceKind::Cluster, "gke-a"));
        assert_eq!(id.to_string(), "cluster/gke-a");
        assert!("cluster".parse::<ResourceId>().is_err());
        assert!("cluster/".parse::<ResourceId>().is_err());
    }

    #[test]
    fn test_spec_builder_dedupes_dependencies() {
        let net = ResourceId::new(ResourceKind::Network, "vpc-a");
        let spec = ResourceSpec::new(ResourceKind::Subnet, "sub-a")
            .param("range", "10.0.0.0/20")
            .depends_on(net.clone())
            .depends_on(net.clone());
        assert_eq!(spec.depends_on, vec![net]);
        assert_eq!(spec.get("range"), Some("10.0.0.0/20"));
        assert_eq!(spec.get("missing"), None);
    }

    #[test]
    fn test_redaction() {
        let spec = ResourceSpec::new(ResourceKind::ManagedDatabase, "db")
            .param("root_password", "hunter2")
            .param("tier", "db-n1-standard-2");
        let redacted = spec.redacted_parameters();
        assert_eq!(redacted["root_password"], REDACTED);
        assert_eq!(redacted["tier"], "db-n1-standard-2");
    }

    #[test]
    fn test_report_exit_codes() {
        let id = ResourceId::new(ResourceKind::Network, "vpc-a");
        let mut report = ApplyReport::begin();
        report.steps.push(StepResult::created(id.clone(), 5));
        assert_eq!(report.exit_code(), 0);
        assert!(report.is_success());

        report
            .steps
            .push(StepResult::failed(id.clone(), FailureKind::Creation, "quota", 1));
        assert_eq!(report.exit_code(), 1);
        assert!(matches!(
            report.failed().and_then(StepResult::error),
            Some(Error::CreationFailed { .. })
        ));

        let mut report = ApplyReport::begin();
        report
            .steps
            .push(StepResult::failed(id, FailureKind::Query, "denied", 1));
        assert_eq!(report.exit_code(), 2);
    }

    #[test]
    fn test_step_result_serializes_snake_case() {
        let step = StepResult::already_exists(ResourceId::new(ResourceKind::FileShare, "fs"), 3);
        let json = serde_json::to_value(&step).unwrap();
        assert_eq!(json["outcome"], "already_exists");
        assert_eq!(json["resource"]["kind"], "file_share");
        assert!(json.get("failure").is_none());
    }
}
