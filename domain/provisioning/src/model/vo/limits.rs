use serde::{Deserialize, Serialize};

/// Size ceilings enforced at the storage boundary.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct StorageLimits {
    #[serde(default = "StorageLimits::default_max_key_size")]
    pub max_key_size: usize,
    #[serde(default = "StorageLimits::default_max_session_size")]
    pub max_session_size: usize,
    #[serde(default = "StorageLimits::default_max_record_size")]
    pub max_record_size: usize,
    #[serde(default = "StorageLimits::default_max_fragment_size")]
    pub max_fragment_size: usize,
}

impl StorageLimits {
    fn default_max_key_size() -> usize {
        256
    }
    fn default_max_session_size() -> usize {
        4096
    }
    fn default_max_record_size() -> usize {
        4096
    }
    fn default_max_fragment_size() -> usize {
        4 * 1024 * 1024
    }
}

impl Default for StorageLimits {
    fn default() -> Self {
        Self {
            max_key_size: Self::default_max_key_size(),
            max_session_size: Self::default_max_session_size(),
            max_record_size: Self::default_max_record_size(),
            max_fragment_size: Self::default_max_fragment_size(),
        }
    }
}
