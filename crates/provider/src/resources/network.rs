//! VPC networking: networks, subnets, peering ranges, router NAT

use lmsprov_common::ResourceSpec;

use super::{or_scope, required, Invocation, Match, Part};
use crate::error::Result;
use crate::provisioner::Scope;

const SERVICE_NETWORKING: &str = "servicenetworking.googleapis.com";

pub fn list_networks() -> Invocation {
    Invocation::new(&["compute", "networks", "list"]).flag("format", "value(name)")
}

pub fn list_subnets(scope: &Scope) -> Invocation {
    Invocation::new(&["compute", "networks", "subnets", "list"])
        .flag("regions", &scope.region)
        .flag("format", "value(name)")
}

pub fn list_peering_addresses() -> Invocation {
    Invocation::new(&["compute", "addresses", "list"])
        .switch("global")
        .flag("filter", "purpose=VPC_PEERING")
        .flag("format", "value(name)")
}

pub fn list_routers(scope: &Scope) -> Invocation {
    Invocation::new(&["compute", "routers", "list"])
        .flag("regions", &scope.region)
        .flag("format", "value(name)")
}

pub fn list_nats(router: &str, region: &str) -> Invocation {
    Invocation::new(&["compute", "routers", "nats", "list"])
        .flag("router", router)
        .flag("region", region)
        .flag("format", "value(name)")
}

pub fn network(spec: &ResourceSpec) -> Result<Part> {
    Ok(Part {
        label: "network",
        list: list_networks(),
        key: spec.name.clone(),
        matcher: Match::Name,
        create: Invocation::new(&["compute", "networks", "create"])
            .arg(&spec.name)
            .flag("subnet-mode", required(spec, "subnet_mode")?),
    })
}

pub fn subnet(spec: &ResourceSpec, scope: &Scope) -> Result<Part> {
    let network = required(spec, "network")?;
    let range = required(spec, "range")?;
    let region = or_scope(spec, "region", &scope.region);

    let secondary: Vec<String> = [
        ("pods_range_name", "pods_range"),
        ("services_range_name", "services_range"),
    ]
    .iter()
    .filter_map(|(name_key, range_key)| {
        Some(format!("{}={}", spec.get(name_key)?, spec.get(range_key)?))
    })
    .collect();

    let mut create = Invocation::new(&["compute", "networks", "subnets", "create"])
        .arg(&spec.name)
        .flag("network", network)
        .flag("region", region)
        .flag("range", range)
        .switch("enable-private-ip-google-access");
    if !secondary.is_empty() {
        create = create.flag("secondary-range", secondary.join(","));
    }

    Ok(Part {
        label: "subnet",
        list: list_subnets(&Scope::new(&scope.project, region, &scope.zone)),
        key: spec.name.clone(),
        matcher: Match::Name,
        create,
    })
}

/// Allocated address range plus the service networking connection using it
pub fn peering_range(spec: &ResourceSpec) -> Result<Vec<Part>> {
    let network = required(spec, "network")?;
    let prefix_length = required(spec, "prefix_length")?;

    let address = Part {
        label: "address",
        list: list_peering_addresses(),
        key: spec.name.clone(),
        matcher: Match::Name,
        create: Invocation::new(&["compute", "addresses", "create"])
            .arg(&spec.name)
            .switch("global")
            .flag("purpose", "VPC_PEERING")
            .flag("prefix-length", prefix_length)
            .flag("network", network),
    };

    let connection = Part {
        label: "peering",
        list: Invocation::new(&["services", "vpc-peerings", "list"])
            .flag("network", network)
            .flag("service", SERVICE_NETWORKING)
            .flag("format", "value(reservedPeeringRanges)"),
        key: spec.name.clone(),
        matcher: Match::Token,
        create: Invocation::new(&["services", "vpc-peerings", "connect"])
            .flag("service", SERVICE_NETWORKING)
            .flag("ranges", &spec.name)
            .flag("network", network),
    };

    Ok(vec![address, connection])
}

/// Cloud router, then the NAT configuration on it. The resource name is the NAT's.
pub fn router_nat(spec: &ResourceSpec, scope: &Scope) -> Result<Vec<Part>> {
    let router = required(spec, "router")?;
    let network = required(spec, "network")?;
    let region = or_scope(spec, "region", &scope.region);

    let router_part = Part {
        label: "router",
        list: list_routers(&Scope::new(&scope.project, region, &scope.zone)),
        key: router.to_string(),
        matcher: Match::Name,
        create: Invocation::new(&["compute", "routers", "create"])
            .arg(router)
            .flag("network", network)
            .flag("region", region),
    };

    let nat_part = Part {
        label: "nat",
        list: list_nats(router, region),
        key: spec.name.clone(),
        matcher: Match::Name,
        create: Invocation::new(&["compute", "routers", "nats", "create"])
            .arg(&spec.name)
            .flag("router", router)
            .flag("region", region)
            .switch("auto-allocate-nat-external-ips")
            .switch("nat-all-subnet-ip-ranges"),
    };

    Ok(vec![router_part, nat_part])
}
