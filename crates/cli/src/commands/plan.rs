//! Plan Command

use anyhow::Result;
use colored::Colorize;
use lmsprov_engine::{PlanCheck, PlannedAction};

use super::Context;
use crate::output::{print_list, print_success, TableDisplay};

impl TableDisplay for PlanCheck {
    fn headers() -> Vec<&'static str> {
        vec!["Resource", "Action"]
    }

    fn row(&self) -> Vec<String> {
        let action = match self.action {
            PlannedAction::Keep => "keep (exists)".dimmed().to_string(),
            PlannedAction::Create => "create".green().to_string(),
        };
        vec![self.resource.to_string(), action]
    }
}

pub async fn execute(ctx: &Context) -> Result<()> {
    let plan = ctx.plan()?;
    let checks = ctx.reconciler().check(&plan).await?;

    print_list(&checks, ctx.format)?;
    if ctx.format.is_human() {
        let to_create = checks
            .iter()
            .filter(|c| c.action == PlannedAction::Create)
            .count();
        if to_create == 0 {
            print_success("Everything already exists, nothing to do");
        } else {
            println!(
                "Plan: {} to create, {} unchanged",
                to_create,
                checks.len() - to_create
            );
        }
    }
    Ok(())
}
