//! Validate Command
//!
//! Offline: builds the plan from configuration and prints it in apply order.

use anyhow::{Context, Result};
use lmsprov_common::{DeploymentConfig, PlanBuilder, ProvisioningPlan};
use serde::Serialize;

use crate::output::{print_list, print_success, OutputFormat, TableDisplay};

/// One plan step, as shown to the operator
#[derive(Debug, Serialize)]
pub struct PlanRow {
    pub step: usize,
    pub resource: String,
    pub depends_on: Vec<String>,
    pub parameters: std::collections::BTreeMap<String, String>,
}

impl TableDisplay for PlanRow {
    fn headers() -> Vec<&'static str> {
        vec!["#", "Resource", "Depends On", "Parameters"]
    }

    fn row(&self) -> Vec<String> {
        vec![
            self.step.to_string(),
            self.resource.clone(),
            self.depends_on.join(", "),
            self.parameters
                .iter()
                .map(|(k, v)| format!("{}={}", k, v))
                .collect::<Vec<_>>()
                .join("\n"),
        ]
    }
}

/// Rows in plan order; secret parameters are redacted
pub fn rows(plan: &ProvisioningPlan) -> Vec<PlanRow> {
    plan.iter()
        .enumerate()
        .map(|(i, spec)| PlanRow {
            step: i + 1,
            resource: spec.id().to_string(),
            depends_on: spec.depends_on.iter().map(ToString::to_string).collect(),
            parameters: spec.redacted_parameters(),
        })
        .collect()
}

pub fn execute(config: &DeploymentConfig, format: OutputFormat) -> Result<()> {
    let plan = PlanBuilder::new(config)
        .build()
        .context("Invalid deployment configuration")?;

    print_list(&rows(&plan), format)?;
    if format.is_human() {
        print_success(&format!(
            "Configuration is valid: {} resources for project {}",
            plan.len(),
            config.project_id
        ));
    }
    Ok(())
}
