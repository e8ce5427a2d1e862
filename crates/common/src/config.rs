//! Deployment configuration
//!
//! Every value here is substituted verbatim into resource parameters by the
//! plan builder. Nothing is derived.

use std::path::Path;

use ipnetwork::IpNetwork;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Error, Result};

/// Deployment configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeploymentConfig {
    /// Target project identifier
    pub project_id: String,

    /// Region for regional resources
    pub region: String,

    /// Zone for zonal resources; must sit inside `region`
    pub zone: String,

    pub network: NetworkConfig,
    pub router: RouterConfig,
    pub cluster: ClusterConfig,
    pub database: DatabaseConfig,
    pub cache: CacheConfig,
    pub file_share: FileShareConfig,
    pub artifacts: ArtifactsConfig,
    pub iam: IamConfig,
}

impl Default for DeploymentConfig {
    fn default() -> Self {
        Self {
            project_id: "lms-project".to_string(),
            region: "us-central1".to_string(),
            zone: "us-central1-a".to_string(),
            network: NetworkConfig::default(),
            router: RouterConfig::default(),
            cluster: ClusterConfig::default(),
            database: DatabaseConfig::default(),
            cache: CacheConfig::default(),
            file_share: FileShareConfig::default(),
            artifacts: ArtifactsConfig::default(),
            iam: IamConfig::default(),
        }
    }
}

/// VPC, subnet and private service access ranges
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    pub name: String,
    pub subnet_name: String,
    pub subnet_cidr: String,
    pub pods_range_name: String,
    pub pods_cidr: String,
    pub services_range_name: String,
    pub services_cidr: String,
    /// Allocated range for managed services peering
    pub peering_range_name: String,
    pub peering_prefix_length: u8,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            name: "lms-vpc".to_string(),
            subnet_name: "lms-subnet".to_string(),
            subnet_cidr: "10.10.0.0/20".to_string(),
            pods_range_name: "lms-pods".to_string(),
            pods_cidr: "10.20.0.0/14".to_string(),
            services_range_name: "lms-services".to_string(),
            services_cidr: "10.24.0.0/20".to_string(),
            peering_range_name: "lms-managed-services".to_string(),
            peering_prefix_length: 16,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RouterConfig {
    pub name: String,
    pub nat_name: String,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            name: "lms-router".to_string(),
            nat_name: "lms-nat".to_string(),
        }
    }
}

/// Managed Kubernetes cluster sizing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClusterConfig {
    pub name: String,
    pub machine_type: String,
    pub node_count: u32,
    pub min_nodes: u32,
    pub max_nodes: u32,
    pub release_channel: String,
    /// Control plane range for private nodes
    pub master_cidr: String,
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            name: "lms-gke".to_string(),
            machine_type: "e2-standard-4".to_string(),
            node_count: 1,
            min_nodes: 1,
            max_nodes: 5,
            release_channel: "regular".to_string(),
            master_cidr: "172.16.0.0/28".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub instance_name: String,
    pub version: String,
    pub tier: String,
    pub root_password: String,
    pub database_name: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            instance_name: "lms-mysql".to_string(),
            version: "MYSQL_8_0".to_string(),
            tier: "db-custom-2-7680".to_string(),
            root_password: "change-me".to_string(),
            database_name: "lms".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub enabled: bool,
    pub name: String,
    pub tier: String,
    pub size_gb: u32,
    pub redis_version: String,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            name: "lms-redis".to_string(),
            tier: "standard".to_string(),
            size_gb: 1,
            redis_version: "redis_7_0".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileShareConfig {
    pub enabled: bool,
    pub name: String,
    pub tier: String,
    pub share_name: String,
    pub capacity_gb: u32,
}

impl Default for FileShareConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            name: "lms-filestore".to_string(),
            tier: "BASIC_HDD".to_string(),
            share_name: "lms_media".to_string(),
            capacity_gb: 1024,
        }
    }
}

/// Container image repository
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArtifactsConfig {
    pub enabled: bool,
    pub repository: String,
    pub format: String,
}

impl Default for ArtifactsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            repository: "lms-images".to_string(),
            format: "docker".to_string(),
        }
    }
}

/// Project-level role grant, typically letting cluster nodes pull images
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IamConfig {
    pub enabled: bool,
    /// Local label for the binding; the provider identifies it by role and member
    pub name: String,
    pub role: String,
    pub member: String,
}

impl Default for IamConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            name: "nodes-artifact-reader".to_string(),
            role: "roles/artifactregistry.reader".to_string(),
            member: "serviceAccount:lms-nodes@lms-project.iam.gserviceaccount.com".to_string(),
        }
    }
}

impl DeploymentConfig {
    /// Load configuration from file
    pub fn load(path: &Path) -> Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            let config: Self = toml::from_str(&content)?;
            debug!(path = %path.display(), "Loaded deployment config");
            Ok(config)
        } else {
            Ok(Self::default())
        }
    }

    /// Save configuration to file
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Check the configuration for values no provider would accept
    pub fn validate(&self) -> Result<()> {
        let required = [
            ("project_id", &self.project_id),
            ("region", &self.region),
            ("zone", &self.zone),
            ("network.name", &self.network.name),
            ("network.subnet_name", &self.network.subnet_name),
            ("network.pods_range_name", &self.network.pods_range_name),
            ("network.services_range_name", &self.network.services_range_name),
            ("network.peering_range_name", &self.network.peering_range_name),
            ("router.name", &self.router.name),
            ("router.nat_name", &self.router.nat_name),
            ("cluster.name", &self.cluster.name),
            ("cluster.machine_type", &self.cluster.machine_type),
            ("database.instance_name", &self.database.instance_name),
            ("database.version", &self.database.version),
            ("database.tier", &self.database.tier),
            ("database.root_password", &self.database.root_password),
        ];
        for (field, value) in required {
            if value.trim().is_empty() {
                return Err(invalid(format!("{field} must not be empty")));
            }
        }

        if !self.zone.starts_with(&format!("{}-", self.region)) {
            return Err(invalid(format!(
                "zone {} is not in region {}",
                self.zone, self.region
            )));
        }

        let subnet = parse_cidr("network.subnet_cidr", &self.network.subnet_cidr)?;
        let pods = parse_cidr("network.pods_cidr", &self.network.pods_cidr)?;
        let services = parse_cidr("network.services_cidr", &self.network.services_cidr)?;
        let mut ranges = vec![
            ("network.subnet_cidr", subnet),
            ("network.pods_cidr", pods),
            ("network.services_cidr", services),
        ];
        // Empty master range means public cluster nodes
        if !self.cluster.master_cidr.trim().is_empty() {
            let master = parse_cidr("cluster.master_cidr", &self.cluster.master_cidr)?;
            ranges.push(("cluster.master_cidr", master));
        }
        for (i, (a_name, a)) in ranges.iter().enumerate() {
            for (b_name, b) in ranges.iter().skip(i + 1) {
                if overlaps(a, b) {
                    return Err(invalid(format!("{a_name} {a} overlaps {b_name} {b}")));
                }
            }
        }

        if !(8..=29).contains(&self.network.peering_prefix_length) {
            return Err(invalid(format!(
                "network.peering_prefix_length must be between 8 and 29, got {}",
                self.network.peering_prefix_length
            )));
        }

        if self.cluster.min_nodes > self.cluster.max_nodes {
            return Err(invalid(format!(
                "cluster.min_nodes ({}) exceeds cluster.max_nodes ({})",
                self.cluster.min_nodes, self.cluster.max_nodes
            )));
        }
        if self.cluster.max_nodes == 0 {
            return Err(invalid("cluster.max_nodes must be at least 1"));
        }

        if self.cache.enabled {
            non_empty("cache.name", &self.cache.name)?;
            if self.cache.size_gb == 0 {
                return Err(invalid("cache.size_gb must be at least 1"));
            }
        }
        if self.file_share.enabled {
            non_empty("file_share.name", &self.file_share.name)?;
            non_empty("file_share.tier", &self.file_share.tier)?;
            non_empty("file_share.share_name", &self.file_share.share_name)?;
            if self.file_share.capacity_gb == 0 {
                return Err(invalid("file_share.capacity_gb must be at least 1"));
            }
        }
        if self.artifacts.enabled {
            non_empty("artifacts.repository", &self.artifacts.repository)?;
            non_empty("artifacts.format", &self.artifacts.format)?;
        }
        if self.iam.enabled {
            non_empty("iam.name", &self.iam.name)?;
            non_empty("iam.role", &self.iam.role)?;
            non_empty("iam.member", &self.iam.member)?;
            if !self.iam.member.contains(':') {
                return Err(invalid(format!(
                    "iam.member must be <type>:<identity>, got {}",
                    self.iam.member
                )));
            }
        }

        Ok(())
    }
}

fn invalid(message: impl Into<String>) -> Error {
    Error::InvalidConfig(message.into())
}

fn non_empty(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(invalid(format!("{field} must not be empty")));
    }
    Ok(())
}

fn parse_cidr(field: &str, value: &str) -> Result<IpNetwork> {
    let network: IpNetwork = value
        .parse()
        .map_err(|e| invalid(format!("{field} is not a valid CIDR ({value}): {e}")))?;
    if network.network() != network.ip() {
        return Err(invalid(format!(
            "{field} has host bits set: {value} (did you mean {}/{}?)",
            network.network(),
            network.prefix()
        )));
    }
    Ok(network)
}

fn overlaps(a: &IpNetwork, b: &IpNetwork) -> bool {
    a.contains(b.network()) || b.contains(a.network())
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test]
    fn test_default_is_valid() {
        DeploymentConfig::default().validate().unwrap();
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("lmsprov.toml");

        let mut config = DeploymentConfig::default();
        config.project_id = "acme-lms".to_string();
        config.cluster.max_nodes = 9;
        config.save(&path).unwrap();

        let loaded = DeploymentConfig::load(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let loaded = DeploymentConfig::load(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(loaded, DeploymentConfig::default());
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lmsprov.toml");
        std::fs::write(
            &path,
            "project_id = \"acme\"\n[cluster]\nmax_nodes = 12\n[cache]\nenabled = false\n",
        )
        .unwrap();

        let loaded = DeploymentConfig::load(&path).unwrap();
        assert_eq!(loaded.project_id, "acme");
        assert_eq!(loaded.cluster.max_nodes, 12);
        assert_eq!(loaded.cluster.min_nodes, ClusterConfig::default().min_nodes);
        assert!(!loaded.cache.enabled);
        assert_eq!(loaded.network, NetworkConfig::default());
    }

    #[test]
    fn test_malformed_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lmsprov.toml");
        std::fs::write(&path, "project_id = [").unwrap();
        assert!(matches!(
            DeploymentConfig::load(&path),
            Err(Error::ConfigParse(_))
        ));
    }

    #[test_case(|c: &mut DeploymentConfig| c.project_id.clear(), "project_id" ; "empty project")]
    #[test_case(|c: &mut DeploymentConfig| c.zone = "europe-west1-b".into(), "not in region" ; "zone outside region")]
    #[test_case(|c: &mut DeploymentConfig| c.network.subnet_cidr = "10.10.0.0/33".into(), "subnet_cidr" ; "bad prefix")]
    #[test_case(|c: &mut DeploymentConfig| c.network.subnet_cidr = "10.10.0.1/20".into(), "host bits" ; "host bits")]
    #[test_case(|c: &mut DeploymentConfig| c.network.pods_cidr = "10.10.0.0/16".into(), "overlaps" ; "overlapping ranges")]
    #[test_case(|c: &mut DeploymentConfig| c.network.peering_prefix_length = 30, "peering_prefix_length" ; "peering prefix")]
    #[test_case(|c: &mut DeploymentConfig| c.cluster.min_nodes = 10, "min_nodes" ; "node bounds")]
    #[test_case(|c: &mut DeploymentConfig| c.database.root_password.clear(), "root_password" ; "no password")]
    #[test_case(|c: &mut DeploymentConfig| c.cache.size_gb = 0, "cache.size_gb" ; "zero cache")]
    #[test_case(|c: &mut DeploymentConfig| c.iam.member = "lms-nodes".into(), "iam.member" ; "bare member")]
    #[test_case(|c: &mut DeploymentConfig| c.file_share.tier.clear(), "file_share.tier" ; "no file share tier")]
    #[test_case(|c: &mut DeploymentConfig| c.cluster.master_cidr = "10.20.0.0/28".into(), "master_cidr" ; "master overlaps pods")]
    fn test_validation_rejects(mutate: fn(&mut DeploymentConfig), needle: &str) {
        let mut config = DeploymentConfig::default();
        mutate(&mut config);
        let err = config.validate().unwrap_err();
        assert!(matches!(err, Error::InvalidConfig(_)));
        assert!(err.to_string().contains(needle), "{err}");
    }

    #[test]
    fn test_empty_master_range_is_allowed() {
        let mut config = DeploymentConfig::default();
        config.cluster.master_cidr.clear();
        config.validate().unwrap();
    }

    #[test]
    fn test_disabled_sections_skip_validation() {
        let mut config = DeploymentConfig::default();
        config.cache.enabled = false;
        config.cache.size_gb = 0;
        config.iam.enabled = false;
        config.iam.member.clear();
        config.validate().unwrap();
    }
}
