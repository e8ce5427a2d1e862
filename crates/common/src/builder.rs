//! Plan builder
//!
//! Turns a [`DeploymentConfig`] into the LMS infrastructure plan.

use tracing::debug;

use crate::config::DeploymentConfig;
use crate::error::Result;
use crate::plan::ProvisioningPlan;
use crate::types::{ResourceKind, ResourceSpec};

/// Builds the provisioning plan for one deployment
pub struct PlanBuilder<'a> {
    config: &'a DeploymentConfig,
}

impl<'a> PlanBuilder<'a> {
    pub fn new(config: &'a DeploymentConfig) -> Self {
        Self { config }
    }

    /// Validate the configuration and emit the ordered plan
    pub fn build(&self) -> Result<ProvisioningPlan> {
        self.config.validate()?;
        let specs = self.specs();
        debug!(resources = specs.len(), "Built resource specs");
        ProvisioningPlan::new(specs)
    }

    /// Resource specs in declaration order, before ordering
    pub fn specs(&self) -> Vec<ResourceSpec> {
        let c = self.config;
        let mut specs = Vec::new();

        let network = ResourceSpec::new(ResourceKind::Network, &c.network.name)
            .param("subnet_mode", "custom");
        let network_id = network.id();
        specs.push(network);

        let subnet = ResourceSpec::new(ResourceKind::Subnet, &c.network.subnet_name)
            .param("network", &c.network.name)
            .param("region", &c.region)
            .param("range", &c.network.subnet_cidr)
            .param("pods_range_name", &c.network.pods_range_name)
            .param("pods_range", &c.network.pods_cidr)
            .param("services_range_name", &c.network.services_range_name)
            .param("services_range", &c.network.services_cidr)
            .depends_on(network_id.clone());
        let subnet_id = subnet.id();
        specs.push(subnet);

        let peering = ResourceSpec::new(ResourceKind::PeeringRange, &c.network.peering_range_name)
            .param("network", &c.network.name)
            .param("prefix_length", c.network.peering_prefix_length.to_string())
            .depends_on(network_id.clone());
        let peering_id = peering.id();
        specs.push(peering);

        let nat = ResourceSpec::new(ResourceKind::RouterNat, &c.router.nat_name)
            .param("router", &c.router.name)
            .param("network", &c.network.name)
            .param("region", &c.region)
            .depends_on(network_id.clone());
        let nat_id = nat.id();
        specs.push(nat);

        let cluster = ResourceSpec::new(ResourceKind::Cluster, &c.cluster.name)
            .param("region", &c.region)
            .param("network", &c.network.name)
            .param("subnetwork", &c.network.subnet_name)
            .param("pods_range_name", &c.network.pods_range_name)
            .param("services_range_name", &c.network.services_range_name)
            .param("machine_type", &c.cluster.machine_type)
            .param("num_nodes", c.cluster.node_count.to_string())
            .param("min_nodes", c.cluster.min_nodes.to_string())
            .param("max_nodes", c.cluster.max_nodes.to_string())
            .param("release_channel", &c.cluster.release_channel)
            .param("master_cidr", &c.cluster.master_cidr)
            .depends_on(subnet_id)
            .depends_on(nat_id);
        let cluster_id = cluster.id();
        specs.push(cluster);

        specs.push(
            ResourceSpec::new(ResourceKind::ManagedDatabase, &c.database.instance_name)
                .param("region", &c.region)
                .param("network", &c.network.name)
                .param("database_version", &c.database.version)
                .param("tier", &c.database.tier)
                .param("root_password", &c.database.root_password)
                .param("database_name", &c.database.database_name)
                .depends_on(peering_id.clone()),
        );

        if c.cache.enabled {
            specs.push(
                ResourceSpec::new(ResourceKind::Cache, &c.cache.name)
                    .param("region", &c.region)
                    .param("network", &c.network.name)
                    .param("tier", &c.cache.tier)
                    .param("size_gb", c.cache.size_gb.to_string())
                    .param("redis_version", &c.cache.redis_version)
                    .depends_on(peering_id.clone()),
            );
        }

        if c.file_share.enabled {
            specs.push(
                ResourceSpec::new(ResourceKind::FileShare, &c.file_share.name)
                    .param("zone", &c.zone)
                    .param("network", &c.network.name)
                    .param("tier", &c.file_share.tier)
                    .param("share_name", &c.file_share.share_name)
                    .param("capacity_gb", c.file_share.capacity_gb.to_string())
                    .depends_on(peering_id),
            );
        }

        let repo_id = if c.artifacts.enabled {
            let repo = ResourceSpec::new(ResourceKind::ArtifactRepo, &c.artifacts.repository)
                .param("location", &c.region)
                .param("format", &c.artifacts.format);
            let id = repo.id();
            specs.push(repo);
            Some(id)
        } else {
            None
        };

        if c.iam.enabled {
            let mut binding = ResourceSpec::new(ResourceKind::IamBinding, &c.iam.name)
                .param("role", &c.iam.role)
                .param("member", &c.iam.member)
                .depends_on(cluster_id);
            if let Some(repo_id) = repo_id {
                binding = binding.depends_on(repo_id);
            }
            specs.push(binding);
        }

        specs
    }
}
