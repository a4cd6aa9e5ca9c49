use async_trait::async_trait;

use crate::exception::ProvisionResult;
use crate::model::entity::DeploymentRecord;

#[async_trait]
pub trait DeploymentLedgerService: Send + Sync {
    /// Durably append a record. Fails with `LedgerWriteFailed`.
    async fn append(&self, record: &DeploymentRecord) -> ProvisionResult<()>;

    async fn list(&self) -> ProvisionResult<Vec<DeploymentRecord>>;

    async fn find_by_hash_prefix(&self, prefix: &str) -> ProvisionResult<Vec<DeploymentRecord>>;
}
