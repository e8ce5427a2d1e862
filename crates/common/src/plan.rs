//! Provisioning plan
//!
//! Validates a set of resource specs and orders them so that every spec comes
//! after everything it depends on:
//! - duplicate and dangling dependency detection
//! - cycle detection with the offending path
//! - stable topological ordering (declaration order breaks ties)

use std::collections::{HashMap, HashSet};

use serde::Serialize;
use tracing::debug;

use crate::error::{Error, Result};
use crate::types::{ResourceId, ResourceSpec};

/// Ordered, validated sequence of resource specs
#[derive(Debug, Clone, Serialize)]
pub struct ProvisioningPlan {
    steps: Vec<ResourceSpec>,
}

impl ProvisioningPlan {
    /// Build a plan from specs in declaration order
    pub fn new(specs: Vec<ResourceSpec>) -> Result<Self> {
        let mut index: HashMap<ResourceId, usize> = HashMap::new();
        for (i, spec) in specs.iter().enumerate() {
            if index.insert(spec.id(), i).is_some() {
                return Err(Error::DuplicateResource { id: spec.id() });
            }
        }

        for spec in &specs {
            for dep in &spec.depends_on {
                if !index.contains_key(dep) {
                    return Err(Error::UnknownDependency {
                        resource: spec.id(),
                        dependency: dep.clone(),
                    });
                }
            }
        }

        let order = topological_order(&specs, &index)?;
        let mut slots: Vec<Option<ResourceSpec>> = specs.into_iter().map(Some).collect();
        let steps = order
            .into_iter()
            .filter_map(|i| slots.get_mut(i).and_then(Option::take))
            .collect::<Vec<_>>();

        debug!(steps = steps.len(), "Provisioning plan ordered");
        Ok(Self { steps })
    }

    pub fn iter(&self) -> impl Iterator<Item = &ResourceSpec> {
        self.steps.iter()
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn get(&self, id: &ResourceId) -> Option<&ResourceSpec> {
        self.steps.iter().find(|s| &s.id() == id)
    }

    pub fn position(&self, id: &ResourceId) -> Option<usize> {
        self.steps.iter().position(|s| &s.id() == id)
    }

    pub fn ids(&self) -> Vec<ResourceId> {
        self.steps.iter().map(ResourceSpec::id).collect()
    }
}

impl<'a> IntoIterator for &'a ProvisioningPlan {
    type Item = &'a ResourceSpec;
    type IntoIter = std::slice::Iter<'a, ResourceSpec>;

    fn into_iter(self) -> Self::IntoIter {
        self.steps.iter()
    }
}

/// Kahn's algorithm, always taking the earliest-declared ready spec
fn topological_order(
    specs: &[ResourceSpec],
    index: &HashMap<ResourceId, usize>,
) -> Result<Vec<usize>> {
    let mut pending: Vec<usize> = specs.iter().map(|s| s.depends_on.len()).collect();
    let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); specs.len()];
    for (i, spec) in specs.iter().enumerate() {
        for dep in &spec.depends_on {
            if let Some(&d) = index.get(dep) {
                if let Some(list) = dependents.get_mut(d) {
                    list.push(i);
                }
            }
        }
    }

    let mut placed = vec![false; specs.len()];
    let mut order = Vec::with_capacity(specs.len());

    while order.len() < specs.len() {
        let next = (0..specs.len()).find(|&i| !placed[i] && pending[i] == 0);
        let Some(i) = next else {
            return Err(Error::DependencyCycle {
                path: find_cycle(specs, index, &placed),
            });
        };
        placed[i] = true;
        order.push(i);
        for &dependent in &dependents[i] {
            pending[dependent] = pending[dependent].saturating_sub(1);
        }
    }

    Ok(order)
}

/// Depth-first search over the unplaced remainder to name one cycle
fn find_cycle(
    specs: &[ResourceSpec],
    index: &HashMap<ResourceId, usize>,
    placed: &[bool],
) -> Vec<ResourceId> {
    fn dfs(
        node: usize,
        specs: &[ResourceSpec],
        index: &HashMap<ResourceId, usize>,
        visited: &mut HashSet<usize>,
        path: &mut Vec<usize>,
    ) -> Option<Vec<usize>> {
        if let Some(start) = path.iter().position(|&n| n == node) {
            let mut cycle = path[start..].to_vec();
            cycle.push(node);
            return Some(cycle);
        }
        if !visited.insert(node) {
            return None;
        }
        path.push(node);
        for dep in &specs[node].depends_on {
            if let Some(&d) = index.get(dep) {
                if let Some(cycle) = dfs(d, specs, index, visited, path) {
                    return Some(cycle);
                }
            }
        }
        path.pop();
        None
    }

    let mut visited = HashSet::new();
    for start in (0..specs.len()).filter(|&i| !placed[i]) {
        let mut path = Vec::new();
        if let Some(cycle) = dfs(start, specs, index, &mut visited, &mut path) {
            return cycle.into_iter().map(|i| specs[i].id()).collect();
        }
    }
    Vec::new()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ResourceKind;

    fn id(kind: ResourceKind, name: &str) -> ResourceId {
        ResourceId::new(kind, name)
    }

    #[test]
    fn test_orders_dependencies_first() {
        let cluster = ResourceSpec::new(ResourceKind::Cluster, "gke-a")
            .depends_on(id(ResourceKind::Subnet, "sub-a"));
        let subnet = ResourceSpec::new(ResourceKind::Subnet, "sub-a")
            .depends_on(id(ResourceKind::Network, "vpc-a"));
        let network = ResourceSpec::new(ResourceKind::Network, "vpc-a");

        let plan = ProvisioningPlan::new(vec![cluster, subnet, network]).unwrap();
        assert_eq!(
            plan.ids(),
            vec![
                id(ResourceKind::Network, "vpc-a"),
                id(ResourceKind::Subnet, "sub-a"),
                id(ResourceKind::Cluster, "gke-a"),
            ]
        );
    }

    #[test]
    fn test_preserves_declaration_order_between_independent_specs() {
        let repo = ResourceSpec::new(ResourceKind::ArtifactRepo, "images");
        let network = ResourceSpec::new(ResourceKind::Network, "vpc-a");
        let cache = ResourceSpec::new(ResourceKind::Cache, "redis")
            .depends_on(id(ResourceKind::Network, "vpc-a"));

        let plan = ProvisioningPlan::new(vec![repo, network, cache]).unwrap();
        assert_eq!(plan.position(&id(ResourceKind::ArtifactRepo, "images")), Some(0));
        assert_eq!(plan.position(&id(ResourceKind::Network, "vpc-a")), Some(1));
        assert_eq!(plan.position(&id(ResourceKind::Cache, "redis")), Some(2));
    }

    #[test]
    fn test_every_dependency_precedes_its_dependent() {
        let specs = vec![
            ResourceSpec::new(ResourceKind::IamBinding, "reader")
                .depends_on(id(ResourceKind::Cluster, "gke"))
                .depends_on(id(ResourceKind::ArtifactRepo, "images")),
            ResourceSpec::new(ResourceKind::Cluster, "gke")
                .depends_on(id(ResourceKind::Subnet, "sub"))
                .depends_on(id(ResourceKind::RouterNat, "nat")),
            ResourceSpec::new(ResourceKind::RouterNat, "nat")
                .depends_on(id(ResourceKind::Network, "vpc")),
            ResourceSpec::new(ResourceKind::ArtifactRepo, "images"),
            ResourceSpec::new(ResourceKind::Subnet, "sub")
                .depends_on(id(ResourceKind::Network, "vpc")),
            ResourceSpec::new(ResourceKind::Network, "vpc"),
        ];
        let plan = ProvisioningPlan::new(specs).unwrap();
        for spec in &plan {
            let me = plan.position(&spec.id()).unwrap();
            for dep in &spec.depends_on {
                assert!(plan.position(dep).unwrap() < me, "{} before {}", dep, spec.id());
            }
        }
    }

    #[test]
    fn test_rejects_duplicates() {
        let err = ProvisioningPlan::new(vec![
            ResourceSpec::new(ResourceKind::Network, "vpc"),
            ResourceSpec::new(ResourceKind::Network, "vpc"),
        ])
        .unwrap_err();
        assert!(matches!(err, Error::DuplicateResource { .. }));
    }

    #[test]
    fn test_same_name_different_kind_is_allowed() {
        let plan = ProvisioningPlan::new(vec![
            ResourceSpec::new(ResourceKind::Network, "lms"),
            ResourceSpec::new(ResourceKind::Subnet, "lms")
                .depends_on(id(ResourceKind::Network, "lms")),
        ])
        .unwrap();
        assert_eq!(plan.len(), 2);
    }

    #[test]
    fn test_rejects_unknown_dependency() {
        let err = ProvisioningPlan::new(vec![ResourceSpec::new(ResourceKind::Subnet, "sub")
            .depends_on(id(ResourceKind::Network, "missing"))])
        .unwrap_err();
        match err {
            Error::UnknownDependency { resource, dependency } => {
                assert_eq!(resource, id(ResourceKind::Subnet, "sub"));
                assert_eq!(dependency, id(ResourceKind::Network, "missing"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_cycle_detection() {
        let err = ProvisioningPlan::new(vec![
            ResourceSpec::new(ResourceKind::Network, "root"),
            ResourceSpec::new(ResourceKind::Subnet, "a")
                .depends_on(id(ResourceKind::Network, "root"))
                .depends_on(id(ResourceKind::Cluster, "b")),
            ResourceSpec::new(ResourceKind::Cluster, "b")
                .depends_on(id(ResourceKind::Subnet, "a")),
        ])
        .unwrap_err();
        match err {
            Error::DependencyCycle { path } => {
                assert_eq!(path.len(), 3);
                assert_eq!(path.first(), path.last());
                assert!(!path.contains(&id(ResourceKind::Network, "root")));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_self_dependency_is_a_cycle() {
        let err = ProvisioningPlan::new(vec![ResourceSpec::new(ResourceKind::Network, "vpc")
            .depends_on(id(ResourceKind::Network, "vpc"))])
        .unwrap_err();
        assert!(matches!(err, Error::DependencyCycle { ref path } if path.len() == 2));
    }

    #[test]
    fn test_empty_plan() {
        let plan = ProvisioningPlan::new(Vec::new()).unwrap();
        assert!(plan.is_empty());
        assert!(plan.get(&id(ResourceKind::Network, "vpc")).is_none());
    }
}
