//! Artifact repository and project IAM bindings

use lmsprov_common::ResourceSpec;

use super::{or_scope, required, Invocation, Match, Part};
use crate::error::Result;
use crate::provisioner::Scope;

pub fn list_repositories(scope: &Scope) -> Invocation {
    Invocation::new(&["artifacts", "repositories", "list"])
        .flag("location", &scope.region)
        .flag("format", "value(name)")
}

/// One `role member` row per member of every binding in the project policy
pub fn list_bindings(scope: &Scope) -> Invocation {
    Invocation::new(&["projects", "get-iam-policy"])
        .arg(&scope.project)
        .flag("flatten", "bindings[].members")
        .flag("format", "value(bindings.role,bindings.members)")
}

pub fn artifact_repo(spec: &ResourceSpec, scope: &Scope) -> Result<Part> {
    let location = or_scope(spec, "location", &scope.region);

    Ok(Part {
        label: "repository",
        list: list_repositories(&Scope::new(&scope.project, location, &scope.zone)),
        key: spec.name.clone(),
        matcher: Match::Name,
        create: Invocation::new(&["artifacts", "repositories", "create"])
            .arg(&spec.name)
            .flag("repository-format", required(spec, "format")?)
            .flag("location", location),
    })
}

/// Bindings have no name on the provider side; they are found by role and member
pub fn iam_binding(spec: &ResourceSpec, scope: &Scope) -> Result<Part> {
    let role = required(spec, "role")?;
    let member = required(spec, "member")?;

    Ok(Part {
        label: "binding",
        list: list_bindings(scope),
        key: format!("{role} {member}"),
        matcher: Match::Row,
        create: Invocation::new(&["projects", "add-iam-policy-binding"])
            .arg(&scope.project)
            .flag("member", member)
            .flag("role", role)
            .flag("condition", "None"),
    })
}
