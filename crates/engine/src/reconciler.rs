//! Reconciliation
//!
//! Ensures every resource in a plan exists. Steps run strictly in plan
//! order, one provider call at a time; the first failure halts the run and
//! leaves everything created so far in place.

use std::sync::Arc;
use std::time::Instant;

use lmsprov_common::{
    ApplyReport, Error, FailureKind, ProvisioningPlan, ResourceId, ResourceSpec, StepOutcome,
    StepResult,
};
use lmsprov_provider::{ProviderError, Provisioner, Scope};
use serde::Serialize;
use tracing::{debug, error, info, info_span, warn, Instrument};

/// Reconciler that converges provider state toward a plan
pub struct Reconciler {
    provider: Arc<dyn Provisioner>,
    scope: Scope,
}

/// What `apply` would do for one resource
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PlannedAction {
    Keep,
    Create,
}

/// Dry-run entry for one plan step
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlanCheck {
    pub resource: ResourceId,
    pub action: PlannedAction,
}

impl Reconciler {
    pub fn new(provider: Arc<dyn Provisioner>, scope: Scope) -> Self {
        Self { provider, scope }
    }

    pub fn scope(&self) -> &Scope {
        &self.scope
    }

    /// Apply the plan
    pub async fn apply(&self, plan: &ProvisioningPlan) -> ApplyReport {
        self.apply_with(plan, |_| {}).await
    }

    /// Apply the plan, handing each step result to `observer` as it completes
    pub async fn apply_with<F>(&self, plan: &ProvisioningPlan, mut observer: F) -> ApplyReport
    where
        F: FnMut(&StepResult),
    {
        let mut report = ApplyReport::begin();
        info!(
            run_id = %report.run_id,
            steps = plan.len(),
            provider = self.provider.name(),
            project = %self.scope.project,
            "Applying plan"
        );

        let mut remaining = plan.iter();
        while let Some(spec) = remaining.next() {
            let span = info_span!("step", resource = %spec.id());
            let step = self.reconcile(spec).instrument(span).await;
            observer(&step);

            let failed = step.outcome == StepOutcome::Failed;
            report.steps.push(step);
            if failed {
                report.not_attempted = remaining.by_ref().map(ResourceSpec::id).collect();
                warn!(
                    skipped = report.not_attempted.len(),
                    "Halting plan after failed step"
                );
                break;
            }
        }

        report.finish();
        info!(
            run_id = %report.run_id,
            created = report.created(),
            existing = report.already_existing(),
            success = report.is_success(),
            "Plan applied"
        );
        report
    }

    /// Reconcile a single resource
    async fn reconcile(&self, spec: &ResourceSpec) -> StepResult {
        let id = spec.id();
        let started = Instant::now();
        let elapsed = || started.elapsed().as_millis() as u64;

        match self.provider.exists(spec, &self.scope).await {
            Ok(true) => {
                info!("Already exists");
                return StepResult::already_exists(id, elapsed());
            }
            Ok(false) => {
                debug!(parameters = ?spec.redacted_parameters(), "Not found, creating");
            }
            Err(e) => {
                error!("Existence query failed: {}", e);
                return StepResult::failed(id, failure_kind(&e), e.to_string(), elapsed());
            }
        }

        match self.provider.create(spec, &self.scope).await {
            Ok(()) => {
                info!(elapsed_ms = elapsed(), "Created");
                StepResult::created(id, elapsed())
            }
            Err(e) => {
                error!("Creation failed: {}", e);
                StepResult::failed(id, failure_kind(&e), e.to_string(), elapsed())
            }
        }
    }

    /// Dry run: report which resources `apply` would create, without creating
    pub async fn check(&self, plan: &ProvisioningPlan) -> lmsprov_common::Result<Vec<PlanCheck>> {
        let mut checks = Vec::with_capacity(plan.len());
        for spec in plan {
            let present = self
                .provider
                .exists(spec, &self.scope)
                .await
                .map_err(|e| Error::QueryFailed {
                    id: spec.id(),
                    message: e.to_string(),
                })?;
            checks.push(PlanCheck {
                resource: spec.id(),
                action: if present {
                    PlannedAction::Keep
                } else {
                    PlannedAction::Create
                },
            });
        }
        Ok(checks)
    }
}

/// Listing failures are queries wherever they surface; composite creates
/// list their parts too. Anything else means the resource cannot be created
/// as declared.
fn failure_kind(error: &ProviderError) -> FailureKind {
    if error.is_query() {
        FailureKind::Query
    } else {
        FailureKind::Creation
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lmsprov_common::ResourceKind;
    use lmsprov_provider::local::{Call, LocalProvisioner};

    fn scope() -> Scope {
        Scope::new("lms", "us-central1", "us-central1-a")
    }

    fn id(kind: ResourceKind, name: &str) -> ResourceId {
        ResourceId::new(kind, name)
    }

    fn three_step_plan() -> ProvisioningPlan {
        ProvisioningPlan::new(vec![
            ResourceSpec::new(ResourceKind::Network, "vpc-a"),
            ResourceSpec::new(ResourceKind::Subnet, "sub-a")
                .depends_on(id(ResourceKind::Network, "vpc-a")),
            ResourceSpec::new(ResourceKind::Cluster, "gke-a")
                .depends_on(id(ResourceKind::Subnet, "sub-a")),
        ])
        .unwrap()
    }

    #[tokio::test]
    async fn test_apply_creates_missing() {
        let local = Arc::new(LocalProvisioner::new());
        let reconciler = Reconciler::new(local.clone(), scope());

        let report = reconciler.apply(&three_step_plan()).await;
        assert_eq!(report.outcomes(), vec![StepOutcome::Created; 3]);
        assert!(report.is_success());
        assert!(report.finished_at.is_some());
        assert!(local.contains(&id(ResourceKind::Cluster, "gke-a")));
    }

    #[tokio::test]
    async fn test_existing_resource_is_not_recreated() {
        let local = Arc::new(LocalProvisioner::new());
        local.insert(&id(ResourceKind::Network, "vpc-a")).unwrap();
        let reconciler = Reconciler::new(local.clone(), scope());

        let report = reconciler.apply(&three_step_plan()).await;
        assert_eq!(
            report.outcomes(),
            vec![StepOutcome::AlreadyExists, StepOutcome::Created, StepOutcome::Created]
        );
        assert!(!local
            .calls()
            .contains(&Call::Create(id(ResourceKind::Network, "vpc-a"))));
    }

    #[tokio::test]
    async fn test_query_failure_halts_without_create() {
        let local = Arc::new(LocalProvisioner::new());
        local.fail_list(ResourceKind::Subnet, "permission denied");
        let reconciler = Reconciler::new(local.clone(), scope());

        let report = reconciler.apply(&three_step_plan()).await;
        assert_eq!(report.outcomes(), vec![StepOutcome::Created, StepOutcome::Failed]);
        let failure = report.failed().and_then(|s| s.failure.clone()).unwrap();
        assert_eq!(failure.kind, FailureKind::Query);
        assert!(failure.message.contains("permission denied"));
        assert_eq!(report.exit_code(), 2);
        assert_eq!(report.not_attempted, vec![id(ResourceKind::Cluster, "gke-a")]);
        assert!(!local
            .calls()
            .contains(&Call::Create(id(ResourceKind::Subnet, "sub-a"))));
    }

    #[test]
    fn test_failure_kind_follows_error() {
        assert_eq!(
            failure_kind(&ProviderError::Rejected("quota".into())),
            FailureKind::Creation
        );
        assert_eq!(
            failure_kind(&ProviderError::Rejected("denied".into()).query()),
            FailureKind::Query
        );
    }

    #[tokio::test]
    async fn test_missing_parameter_is_not_a_query_failure() {
        let gcloud = lmsprov_provider::GcloudProvisioner::new("lmsprov-no-such-gcloud");
        let reconciler = Reconciler::new(Arc::new(gcloud), scope());
        let plan =
            ProvisioningPlan::new(vec![ResourceSpec::new(ResourceKind::FileShare, "fs-a")]).unwrap();

        let report = reconciler.apply(&plan).await;
        let failure = report.failed().and_then(|s| s.failure.clone()).unwrap();
        assert_eq!(failure.kind, FailureKind::Creation);
        assert!(failure.message.contains("missing required parameter"));
        assert_eq!(report.exit_code(), 1);
    }

    #[tokio::test]
    async fn test_observer_sees_every_step() {
        let local = Arc::new(LocalProvisioner::new());
        let reconciler = Reconciler::new(local, scope());

        let mut seen = Vec::new();
        let report = reconciler
            .apply_with(&three_step_plan(), |step| seen.push(step.resource.clone()))
            .await;
        assert_eq!(seen, report.steps.iter().map(|s| s.resource.clone()).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn test_check_does_not_create() {
        let local = Arc::new(LocalProvisioner::new());
        local.insert(&id(ResourceKind::Network, "vpc-a")).unwrap();
        let reconciler = Reconciler::new(local.clone(), scope());

        let checks = reconciler.check(&three_step_plan()).await.unwrap();
        let actions: Vec<PlannedAction> = checks.iter().map(|c| c.action).collect();
        assert_eq!(
            actions,
            vec![PlannedAction::Keep, PlannedAction::Create, PlannedAction::Create]
        );
        assert!(local.calls().iter().all(|c| matches!(c, Call::List(_))));
    }

    #[tokio::test]
    async fn test_check_surfaces_query_failure() {
        let local = Arc::new(LocalProvisioner::new());
        local.fail_list(ResourceKind::Cluster, "timeout");
        let reconciler = Reconciler::new(local, scope());

        let err = reconciler.check(&three_step_plan()).await.unwrap_err();
        assert!(matches!(err, Error::QueryFailed { ref id, .. } if id.name == "gke-a"));
    }

    #[tokio::test]
    async fn test_report_serializes() {
        let reconciler = Reconciler::new(Arc::new(LocalProvisioner::new()), scope());
        let report = reconciler.apply(&three_step_plan()).await;
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["steps"].as_array().unwrap().len(), 3);
        assert_eq!(json["steps"][0]["outcome"], "created");
    }
}
