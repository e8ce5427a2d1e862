//! Reconciliation scenarios against the local backend

use lmsprov_common::{
    DeploymentConfig, FailureKind, PlanBuilder, ProvisioningPlan, ResourceKind, StepOutcome,
};
use lmsprov_e2e::{five_step_specs, id, init_logging, three_step_specs, LocalHarness};
use lmsprov_provider::local::{Call, LocalProvisioner};
use test_case::test_case;

use StepOutcome::{AlreadyExists, Created, Failed};

fn three_step_plan() -> ProvisioningPlan {
    ProvisioningPlan::new(three_step_specs()).unwrap()
}

fn five_step_plan() -> ProvisioningPlan {
    ProvisioningPlan::new(five_step_specs()).unwrap()
}

#[tokio::test]
async fn example_scenario_converges() {
    init_logging();
    let harness = LocalHarness::new();
    let plan = three_step_plan();

    let first = harness.reconciler.apply(&plan).await;
    assert_eq!(first.outcomes(), vec![Created, Created, Created]);
    assert_eq!(first.exit_code(), 0);

    let second = harness.reconciler.apply(&plan).await;
    assert_eq!(second.outcomes(), vec![AlreadyExists, AlreadyExists, AlreadyExists]);
    assert_eq!(second.created(), 0);
    assert_eq!(second.exit_code(), 0);
}

#[tokio::test]
async fn cluster_failure_halts_before_managed_services() {
    init_logging();
    let harness = LocalHarness::new();
    let plan = five_step_plan();
    let cluster = id(ResourceKind::Cluster, "gke-a");
    harness.provider.fail_create(cluster.clone(), "ZONE_RESOURCE_POOL_EXHAUSTED");

    let first = harness.reconciler.apply(&plan).await;
    assert_eq!(first.outcomes(), vec![Created, Created, Failed]);

    // Network and subnet stay in place; the next run finds them
    harness.provider.reset_calls();
    let report = harness.reconciler.apply(&plan).await;
    assert_eq!(report.outcomes(), vec![AlreadyExists, AlreadyExists, Failed]);
    assert_ne!(report.exit_code(), 0);

    let failed = report.failed().unwrap();
    assert_eq!(failed.resource, cluster);
    let failure = failed.failure.as_ref().unwrap();
    assert_eq!(failure.kind, FailureKind::Creation);
    assert!(failure.message.contains("ZONE_RESOURCE_POOL_EXHAUSTED"));

    assert_eq!(
        report.not_attempted,
        vec![
            id(ResourceKind::ManagedDatabase, "db-a"),
            id(ResourceKind::Cache, "cache-a"),
        ]
    );
    let calls = harness.provider.calls();
    assert!(!calls.contains(&Call::List(ResourceKind::ManagedDatabase)));
    assert!(!calls.contains(&Call::List(ResourceKind::Cache)));
    assert_eq!(calls.last(), Some(&Call::Create(cluster)));
}

#[tokio::test]
async fn rerun_resumes_at_failed_step() {
    let harness = LocalHarness::new();
    let plan = five_step_plan();
    harness
        .provider
        .fail_create(id(ResourceKind::ManagedDatabase, "db-a"), "quota exceeded");

    let failed = harness.reconciler.apply(&plan).await;
    assert_eq!(failed.outcomes(), vec![Created, Created, Created, Failed]);

    harness.provider.clear_failures();
    let resumed = harness.reconciler.apply(&plan).await;
    assert_eq!(
        resumed.outcomes(),
        vec![AlreadyExists, AlreadyExists, AlreadyExists, Created, Created]
    );
    assert!(resumed.not_attempted.is_empty());
    assert!(resumed.is_success());
}

#[test_case(0 ; "network")]
#[test_case(1 ; "subnet")]
#[test_case(2 ; "cluster")]
#[test_case(3 ; "database")]
#[test_case(4 ; "cache")]
#[tokio::test]
async fn nothing_after_failed_step_reaches_provider(failing: usize) {
    let harness = LocalHarness::new();
    let plan = five_step_plan();
    let ids = plan.ids();
    harness.provider.fail_create(ids[failing].clone(), "boom");

    let report = harness.reconciler.apply(&plan).await;
    assert_eq!(report.steps.len(), failing + 1);
    assert_eq!(report.not_attempted, ids[failing + 1..].to_vec());
    assert_eq!(report.exit_code(), 1);

    for later in &ids[failing + 1..] {
        assert!(!harness.provider.calls().iter().any(|call| match call {
            Call::List(kind) => *kind == later.kind,
            Call::Create(created) => created == later,
        }));
    }
}

#[tokio::test]
async fn query_failure_is_reported_with_its_own_exit_code() {
    let harness = LocalHarness::new();
    harness
        .provider
        .fail_list(ResourceKind::Subnet, "PERMISSION_DENIED: compute.subnetworks.list");

    let report = harness.reconciler.apply(&three_step_plan()).await;
    assert_eq!(report.outcomes(), vec![Created, Failed]);
    assert_eq!(report.failed().unwrap().failure.as_ref().unwrap().kind, FailureKind::Query);
    assert_eq!(report.exit_code(), 2);
    assert!(!harness
        .provider
        .calls()
        .contains(&Call::Create(id(ResourceKind::Subnet, "sub-a"))));
}

#[tokio::test]
async fn lms_stack_respects_dependencies() {
    init_logging();
    let config = DeploymentConfig::default();
    let plan = PlanBuilder::new(&config).build().unwrap();
    let harness = LocalHarness::new();

    let report = harness.reconciler.apply(&plan).await;
    assert!(report.is_success());
    assert_eq!(report.steps.len(), plan.len());

    for (position, step) in report.steps.iter().enumerate() {
        let spec = plan.get(&step.resource).unwrap();
        for dependency in &spec.depends_on {
            let before = report
                .steps
                .iter()
                .position(|s| &s.resource == dependency)
                .unwrap();
            assert!(before < position, "{} ran before {}", step.resource, dependency);
            assert_ne!(report.steps[before].outcome, Failed);
        }
    }
}

#[tokio::test]
async fn persisted_state_makes_separate_runs_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let state = dir.path().join("local-state.json");
    let config = DeploymentConfig::default();
    let plan = PlanBuilder::new(&config).build().unwrap();

    let first = LocalHarness::with_provider(LocalProvisioner::open(&state).unwrap());
    let report = first.reconciler.apply(&plan).await;
    assert_eq!(report.created(), plan.len());

    let second = LocalHarness::with_provider(LocalProvisioner::open(&state).unwrap());
    let report = second.reconciler.apply(&plan).await;
    assert_eq!(report.created(), 0);
    assert_eq!(report.already_existing(), plan.len());
    assert!(second
        .provider
        .calls()
        .iter()
        .all(|call| matches!(call, Call::List(_))));
}

#[tokio::test]
async fn similar_names_do_not_count_as_existing() {
    let harness = LocalHarness::new();
    harness
        .provider
        .insert(&id(ResourceKind::Network, "vpc-a-old"))
        .unwrap();

    let report = harness.reconciler.apply(&three_step_plan()).await;
    assert_eq!(report.outcomes(), vec![Created, Created, Created]);
}
