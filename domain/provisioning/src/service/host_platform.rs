use async_trait::async_trait;

use crate::exception::HostCallResult;
use crate::model::vo::{ChunkHandle, InstallMode, ResourceBudget};

/// # Host platform
///
/// The platform that owns execution units. Every call may suspend for as long
/// as the platform takes; no timeout is applied here.
#[async_trait]
pub trait HostPlatform: Send + Sync {
    /// Allocate a new execution unit controlled solely by `controller`.
    async fn allocate_unit(
        &self,
        budget: ResourceBudget,
        controller: &str,
    ) -> HostCallResult<String>;

    async fn install_module(
        &self,
        unit_id: &str,
        mode: InstallMode,
        module: &[u8],
        init_arg: &[u8],
    ) -> HostCallResult<()>;

    /// Upload one piece of a module into the unit's chunk staging area.
    async fn stage_chunk(&self, unit_id: &str, chunk: &[u8]) -> HostCallResult<ChunkHandle>;

    /// Install the module assembled from staged chunks, in handle order.
    async fn install_from_chunks(
        &self,
        unit_id: &str,
        mode: InstallMode,
        handles: &[ChunkHandle],
        module_hash: Option<String>,
        init_arg: &[u8],
    ) -> HostCallResult<()>;

    async fn clear_chunk_staging(&self, unit_id: &str) -> HostCallResult<()>;
}
