use std::path::PathBuf;
use std::time::Duration;

use domain_provisioning::model::vo::{InstallMode, ResourceBudget, StorageLimits};
use infrastructure_common::config::CommonConfig;
use serde::Deserialize;

#[derive(Default, Clone, Deserialize, Debug)]
pub struct ProvisionerConfig {
    #[serde(default)]
    pub common: CommonConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub provisioning: ProvisioningConfig,
    #[serde(default)]
    pub host_platform: HostPlatformConfig,
}

#[derive(Default, Clone, Copy, Deserialize, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum StorageBackend {
    #[default]
    Redis,
    Memory,
}

#[derive(Clone, Deserialize, Debug)]
pub struct StorageConfig {
    #[serde(default)]
    pub backend: StorageBackend,
    /// Root of the fragment store.
    #[serde(default = "StorageConfig::default_fragment_dir")]
    pub fragment_dir: PathBuf,
    #[serde(default)]
    pub limits: StorageLimits,
    /// Lease of the finalize lock, so a crashed finalize can't wedge a session.
    #[serde(default = "StorageConfig::default_finalize_lease_ms")]
    pub finalize_lease_ms: u64,
}

impl StorageConfig {
    fn default_fragment_dir() -> PathBuf {
        "data".into()
    }
    fn default_finalize_lease_ms() -> u64 {
        60 * 60 * 1000
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: Default::default(),
            fragment_dir: Self::default_fragment_dir(),
            limits: Default::default(),
            finalize_lease_ms: Self::default_finalize_lease_ms(),
        }
    }
}

#[derive(Clone, Deserialize, Debug)]
pub struct ProvisioningConfig {
    #[serde(default = "ProvisioningConfig::default_cycles")]
    pub cycles: u64,
    /// Identity installed as controller of every new unit.
    #[serde(default = "ProvisioningConfig::default_controller")]
    pub controller: String,
    #[serde(default = "ProvisioningConfig::default_direct_install_ceiling")]
    pub direct_install_ceiling: usize,
    #[serde(default = "ProvisioningConfig::default_staging_chunk_size")]
    pub staging_chunk_size: usize,
    #[serde(default = "ProvisioningConfig::default_allocation_attempts")]
    pub allocation_attempts: u32,
    #[serde(default = "ProvisioningConfig::default_allocation_backoff_ms")]
    pub allocation_backoff_ms: u64,
    #[serde(default = "ProvisioningConfig::default_max_module_size")]
    pub max_module_size: u64,
    #[serde(default = "ProvisioningConfig::default_hash_display_len")]
    pub hash_display_len: usize,
    #[serde(default)]
    pub install_mode: InstallMode,
    /// Hex encoded argument passed to every install.
    #[serde(default)]
    pub init_arg: String,
}

impl ProvisioningConfig {
    fn default_cycles() -> u64 {
        ResourceBudget::DEFAULT_CYCLES
    }
    fn default_controller() -> String {
        "provisioner".to_string()
    }
    fn default_direct_install_ceiling() -> usize {
        service_provisioning::DIRECT_INSTALL_CEILING
    }
    fn default_staging_chunk_size() -> usize {
        service_provisioning::STAGING_CHUNK_SIZE
    }
    fn default_allocation_attempts() -> u32 {
        5
    }
    fn default_allocation_backoff_ms() -> u64 {
        200
    }
    fn default_max_module_size() -> u64 {
        100 * 1024 * 1024
    }
    fn default_hash_display_len() -> usize {
        16
    }

    pub fn resource_budget(&self) -> ResourceBudget {
        ResourceBudget {
            cycles: self.cycles,
        }
    }

    pub fn allocation_backoff(&self) -> Duration {
        Duration::from_millis(self.allocation_backoff_ms)
    }

    pub fn init_arg(&self) -> anyhow::Result<Vec<u8>> {
        Ok(hex::decode(self.init_arg.trim())?)
    }
}

impl Default for ProvisioningConfig {
    fn default() -> Self {
        Self {
            cycles: Self::default_cycles(),
            controller: Self::default_controller(),
            direct_install_ceiling: Self::default_direct_install_ceiling(),
            staging_chunk_size: Self::default_staging_chunk_size(),
            allocation_attempts: Self::default_allocation_attempts(),
            allocation_backoff_ms: Self::default_allocation_backoff_ms(),
            max_module_size: Self::default_max_module_size(),
            hash_display_len: Self::default_hash_display_len(),
            install_mode: Default::default(),
            init_arg: Default::default(),
        }
    }
}

#[derive(Clone, Deserialize, Debug)]
pub struct HostPlatformConfig {
    #[serde(default = "HostPlatformConfig::default_endpoint")]
    pub endpoint: String,
    /// Sent as a bearer token when set.
    #[serde(default)]
    pub auth_token: Option<String>,
}

impl HostPlatformConfig {
    fn default_endpoint() -> String {
        "http://localhost:4943/".to_string()
    }
}

impl Default for HostPlatformConfig {
    fn default() -> Self {
        Self {
            endpoint: Self::default_endpoint(),
            auth_token: None,
        }
    }
}
