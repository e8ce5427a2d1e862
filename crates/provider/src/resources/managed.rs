//! Managed data services: relational database, cache, file share
//!
//! All three attach to the VPC through private service access, so they expect
//! the peering range to exist first.

use lmsprov_common::ResourceSpec;

use super::{or_scope, required, Invocation, Match, Part};
use crate::error::Result;
use crate::provisioner::Scope;

pub fn list_instances() -> Invocation {
    Invocation::new(&["sql", "instances", "list"]).flag("format", "value(name)")
}

pub fn list_caches(scope: &Scope) -> Invocation {
    Invocation::new(&["redis", "instances", "list"])
        .flag("region", &scope.region)
        .flag("format", "value(name)")
}

pub fn list_file_shares(scope: &Scope) -> Invocation {
    Invocation::new(&["filestore", "instances", "list"])
        .flag("zone", &scope.zone)
        .flag("format", "value(name)")
}

fn network_path(scope: &Scope, network: &str) -> String {
    format!("projects/{}/global/networks/{}", scope.project, network)
}

/// SQL instance on a private IP, then the application database inside it
pub fn database(spec: &ResourceSpec, scope: &Scope) -> Result<Vec<Part>> {
    let region = or_scope(spec, "region", &scope.region);
    let network = required(spec, "network")?;

    let instance = Part {
        label: "instance",
        list: list_instances(),
        key: spec.name.clone(),
        matcher: Match::Name,
        create: Invocation::new(&["sql", "instances", "create"])
            .arg(&spec.name)
            .flag("database-version", required(spec, "database_version")?)
            .flag("tier", required(spec, "tier")?)
            .flag("region", region)
            .flag("network", network_path(scope, network))
            .switch("no-assign-ip")
            .flag("root-password", required(spec, "root_password")?),
    };

    let mut parts = vec![instance];
    if let Some(db) = spec.get("database_name").filter(|v| !v.is_empty()) {
        parts.push(Part {
            label: "database",
            list: Invocation::new(&["sql", "databases", "list"])
                .flag("instance", &spec.name)
                .flag("format", "value(name)"),
            key: db.to_string(),
            matcher: Match::Name,
            create: Invocation::new(&["sql", "databases", "create"])
                .arg(db)
                .flag("instance", &spec.name),
        });
    }
    Ok(parts)
}

pub fn cache(spec: &ResourceSpec, scope: &Scope) -> Result<Part> {
    let region = or_scope(spec, "region", &scope.region);
    let network = required(spec, "network")?;

    Ok(Part {
        label: "cache",
        list: list_caches(&Scope::new(&scope.project, region, &scope.zone)),
        key: spec.name.clone(),
        matcher: Match::Name,
        create: Invocation::new(&["redis", "instances", "create"])
            .arg(&spec.name)
            .flag("region", region)
            .flag("size", required(spec, "size_gb")?)
            .flag_opt("tier", spec.get("tier"))
            .flag_opt("redis-version", spec.get("redis_version"))
            .flag("network", network_path(scope, network))
            .flag("connect-mode", "private-service-access"),
    })
}

pub fn file_share(spec: &ResourceSpec, scope: &Scope) -> Result<Part> {
    let zone = or_scope(spec, "zone", &scope.zone);
    let network = required(spec, "network")?;
    let share = required(spec, "share_name")?;
    let capacity = required(spec, "capacity_gb")?;

    Ok(Part {
        label: "file_share",
        list: list_file_shares(&Scope::new(&scope.project, &scope.region, zone)),
        key: spec.name.clone(),
        matcher: Match::Name,
        create: Invocation::new(&["filestore", "instances", "create"])
            .arg(&spec.name)
            .flag("zone", zone)
            .flag("tier", required(spec, "tier")?)
            .flag("file-share", format!("name={share},capacity={capacity}GB"))
            .flag(
                "network",
                format!("name={network},connect-mode=PRIVATE_SERVICE_ACCESS"),
            ),
    })
}
