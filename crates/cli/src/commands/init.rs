//! Init Command

use std::path::Path;

use anyhow::{bail, Context, Result};
use lmsprov_common::DeploymentConfig;

use crate::output::{print_info, print_success};

/// Write the default configuration to `path`
pub fn execute(path: &Path, force: bool) -> Result<()> {
    if path.exists() && !force {
        bail!(
            "{} already exists (use --force to overwrite)",
            path.display()
        );
    }

    DeploymentConfig::default()
        .save(path)
        .with_context(|| format!("Failed to write {}", path.display()))?;

    print_success(&format!("Wrote default configuration to {}", path.display()));
    print_info("Edit project_id and iam.member before running apply");
    Ok(())
}
