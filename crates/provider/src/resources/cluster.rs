//! Managed Kubernetes cluster

use lmsprov_common::ResourceSpec;

use super::{or_scope, required, Invocation, Match, Part};
use crate::error::Result;
use crate::provisioner::Scope;

pub fn list_clusters(scope: &Scope) -> Invocation {
    Invocation::new(&["container", "clusters", "list"])
        .flag("region", &scope.region)
        .flag("format", "value(name)")
}

/// Regional VPC-native cluster with private nodes and autoscaling
pub fn cluster(spec: &ResourceSpec, scope: &Scope) -> Result<Part> {
    let region = or_scope(spec, "region", &scope.region);
    let network = required(spec, "network")?;
    let subnetwork = required(spec, "subnetwork")?;

    let mut create = Invocation::new(&["container", "clusters", "create"])
        .arg(&spec.name)
        .flag("region", region)
        .flag("network", network)
        .flag("subnetwork", subnetwork)
        .switch("enable-ip-alias")
        .flag_opt("cluster-secondary-range-name", spec.get("pods_range_name"))
        .flag_opt("services-secondary-range-name", spec.get("services_range_name"))
        .flag_opt("machine-type", spec.get("machine_type"))
        .flag_opt("num-nodes", spec.get("num_nodes"))
        .flag_opt("release-channel", spec.get("release_channel"));

    if let (Some(min), Some(max)) = (spec.get("min_nodes"), spec.get("max_nodes")) {
        create = create
            .switch("enable-autoscaling")
            .flag("min-nodes", min)
            .flag("max-nodes", max);
    }

    if let Some(master) = spec.get("master_cidr").filter(|v| !v.is_empty()) {
        create = create
            .switch("enable-private-nodes")
            .flag("master-ipv4-cidr", master);
    }

    Ok(Part {
        label: "cluster",
        list: list_clusters(&Scope::new(&scope.project, region, &scope.zone)),
        key: spec.name.clone(),
        matcher: Match::Name,
        create,
    })
}
