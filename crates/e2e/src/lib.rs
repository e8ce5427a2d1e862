//! lmsprov E2E fixtures
//!
//! Scenario tests drive the real reconciler against two stand-ins for a
//! cloud: the local backend, and `FakeGcloud`, a `CommandRunner` that keeps
//! just enough state to answer the gcloud binding's list and create calls.
//!
//! ```text
//! Reconciler ──► LocalProvisioner                  (in-memory / JSON file)
//! Reconciler ──► GcloudProvisioner ──► FakeGcloud  (simulated CLI)
//! ```

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use async_trait::async_trait;
use lmsprov_common::{ResourceId, ResourceKind, ResourceSpec};
use lmsprov_engine::Reconciler;
use lmsprov_provider::{CommandOutput, CommandRunner, GcloudProvisioner, LocalProvisioner, Scope};
use parking_lot::Mutex;

/// Verbs that end a gcloud command group
const VERBS: &[&str] = &[
    "list",
    "create",
    "connect",
    "get-iam-policy",
    "add-iam-policy-binding",
];

/// Group under which IAM bindings are stored
const IAM_GROUP: &str = "projects iam-policy";

/// Log to the test writer; safe to call from every test
pub fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("debug")),
        )
        .with_test_writer()
        .try_init();
}

pub fn scope() -> Scope {
    Scope::new("lms-e2e", "us-central1", "us-central1-a")
}

pub fn id(kind: ResourceKind, name: &str) -> ResourceId {
    ResourceId::new(kind, name)
}

/// Network vpc-a, Subnet sub-a → vpc-a, Cluster gke-a → sub-a
pub fn three_step_specs() -> Vec<ResourceSpec> {
    vec![
        ResourceSpec::new(ResourceKind::Network, "vpc-a"),
        ResourceSpec::new(ResourceKind::Subnet, "sub-a").depends_on(id(ResourceKind::Network, "vpc-a")),
        ResourceSpec::new(ResourceKind::Cluster, "gke-a").depends_on(id(ResourceKind::Subnet, "sub-a")),
    ]
}

/// The three-step plan followed by a database and a cache behind the cluster
pub fn five_step_specs() -> Vec<ResourceSpec> {
    let mut specs = three_step_specs();
    specs.push(
        ResourceSpec::new(ResourceKind::ManagedDatabase, "db-a")
            .depends_on(id(ResourceKind::Cluster, "gke-a")),
    );
    specs.push(
        ResourceSpec::new(ResourceKind::Cache, "cache-a")
            .depends_on(id(ResourceKind::Cluster, "gke-a")),
    );
    specs
}

/// Reconciler over a local backend the test keeps a handle to
pub struct LocalHarness {
    pub provider: Arc<LocalProvisioner>,
    pub reconciler: Reconciler,
}

impl LocalHarness {
    pub fn new() -> Self {
        Self::with_provider(LocalProvisioner::new())
    }

    pub fn with_provider(provider: LocalProvisioner) -> Self {
        let provider = Arc::new(provider);
        let reconciler = Reconciler::new(provider.clone(), scope());
        Self {
            provider,
            reconciler,
        }
    }
}

impl Default for LocalHarness {
    fn default() -> Self {
        Self::new()
    }
}

/// Simulated gcloud CLI
///
/// Objects are kept per command group (`compute networks`, `sql databases`,
/// ...) and keyed by the name a create call was given. Listings print one
/// object per line. Parent scoping (NATs per router, databases per instance)
/// is not modelled.
#[derive(Default)]
pub struct FakeGcloud {
    objects: Mutex<BTreeMap<String, BTreeSet<String>>>,
    failures: Mutex<Vec<(String, String)>>,
    calls: Mutex<Vec<String>>,
}

impl FakeGcloud {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Fail every call whose command line starts with `prefix`
    pub fn fail_on(&self, prefix: &str, stderr: &str) {
        self.failures
            .lock()
            .push((prefix.to_string(), stderr.to_string()));
    }

    pub fn clear_failures(&self) {
        self.failures.lock().clear();
    }

    /// Command lines received so far, without the program name
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }

    pub fn reset_calls(&self) {
        self.calls.lock().clear();
    }

    /// Calls that would change remote state
    pub fn mutations(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter(|c| {
                !c.split_whitespace()
                    .any(|word| word == "list" || word == "get-iam-policy")
            })
            .collect()
    }

    /// Objects stored under `group`
    pub fn objects(&self, group: &str) -> BTreeSet<String> {
        self.objects.lock().get(group).cloned().unwrap_or_default()
    }

    pub fn provisioner(self: &Arc<Self>) -> GcloudProvisioner {
        GcloudProvisioner::with_runner("gcloud", self.clone())
    }

    fn respond(&self, args: &[String]) -> CommandOutput {
        let Some(verb_at) = args.iter().position(|a| VERBS.contains(&a.as_str())) else {
            return CommandOutput::failed(2, "ERROR: (gcloud) unrecognised command");
        };
        let group = args[..verb_at].join(" ");
        let rest = &args[verb_at + 1..];

        match args[verb_at].as_str() {
            "list" => CommandOutput::ok(self.listing(&group)),
            "get-iam-policy" => CommandOutput::ok(self.listing(IAM_GROUP)),
            "create" => match positional(rest) {
                Some(name) => self.store(&group, name),
                None => CommandOutput::failed(2, "ERROR: (gcloud) missing resource name"),
            },
            "connect" => match flag(rest, "ranges") {
                Some(ranges) => self.store(&group, ranges),
                None => CommandOutput::failed(2, "ERROR: (gcloud) --ranges is required"),
            },
            _ => match (flag(rest, "role"), flag(rest, "member")) {
                (Some(role), Some(member)) => self.store(IAM_GROUP, &format!("{role}\t{member}")),
                _ => CommandOutput::failed(2, "ERROR: (gcloud) --role and --member are required"),
            },
        }
    }

    fn listing(&self, group: &str) -> String {
        self.objects(group)
            .into_iter()
            .map(|name| format!("{name}\n"))
            .collect()
    }

    fn store(&self, group: &str, name: &str) -> CommandOutput {
        let inserted = self
            .objects
            .lock()
            .entry(group.to_string())
            .or_default()
            .insert(name.to_string());
        if inserted {
            CommandOutput::ok("")
        } else {
            CommandOutput::failed(1, format!("ERROR: (gcloud) {name} already exists"))
        }
    }
}

#[async_trait]
impl CommandRunner for FakeGcloud {
    async fn run(&self, _program: &str, args: &[String]) -> std::io::Result<CommandOutput> {
        let line = args.join(" ");
        self.calls.lock().push(line.clone());

        let failure = self
            .failures
            .lock()
            .iter()
            .find(|(prefix, _)| line.starts_with(prefix.as_str()))
            .map(|(_, stderr)| stderr.clone());
        if let Some(stderr) = failure {
            return Ok(CommandOutput::failed(1, stderr));
        }
        Ok(self.respond(args))
    }
}

fn positional(args: &[String]) -> Option<&str> {
    args.iter().map(String::as_str).find(|a| !a.starts_with("--"))
}

fn flag<'a>(args: &'a [String], name: &str) -> Option<&'a str> {
    let prefix = format!("--{name}=");
    args.iter().find_map(|a| a.strip_prefix(prefix.as_str()))
}
