//! List Command

use anyhow::{Context as _, Result};
use lmsprov_common::ResourceKind;
use serde::Serialize;

use super::Context;
use crate::output::{print_list, TableDisplay};

/// One identifier reported by the backend
#[derive(Debug, Serialize)]
pub struct ListedResource {
    pub kind: ResourceKind,
    pub identifier: String,
}

impl TableDisplay for ListedResource {
    fn headers() -> Vec<&'static str> {
        vec!["Kind", "Identifier"]
    }

    fn row(&self) -> Vec<String> {
        vec![self.kind.to_string(), self.identifier.clone()]
    }
}

pub async fn execute(ctx: &Context, kind: ResourceKind) -> Result<()> {
    let identifiers = ctx
        .provider()
        .list(kind, &ctx.scope())
        .await
        .with_context(|| format!("Failed to list {} resources", kind))?;

    let items: Vec<ListedResource> = identifiers
        .into_iter()
        .map(|identifier| ListedResource { kind, identifier })
        .collect();
    print_list(&items, ctx.format)
}
