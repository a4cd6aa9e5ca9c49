use serde::{Deserialize, Serialize};

/// Cycle budget attached to a newly allocated execution unit.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct ResourceBudget {
    pub cycles: u64,
}

impl ResourceBudget {
    pub const DEFAULT_CYCLES: u64 = 2_000_000_000_000;
}

impl Default for ResourceBudget {
    fn default() -> Self {
        Self {
            cycles: Self::DEFAULT_CYCLES,
        }
    }
}

/// How a module is loaded into an execution unit.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum InstallMode {
    #[default]
    Install,
    Reinstall,
    Upgrade,
}

impl std::fmt::Display for InstallMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Install => write!(f, "install"),
            Self::Reinstall => write!(f, "reinstall"),
            Self::Upgrade => write!(f, "upgrade"),
        }
    }
}

/// Opaque handle returned by the host platform for a staged chunk.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct ChunkHandle(pub String);

impl std::fmt::Display for ChunkHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}
