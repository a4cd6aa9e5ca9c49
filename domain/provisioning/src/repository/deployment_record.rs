use async_trait::async_trait;

use crate::model::entity::DeploymentRecord;

/// Append-only store of deployment records, keyed by [`DeploymentRecord::key`].
#[async_trait]
pub trait DeploymentRecordRepo: Send + Sync {
    /// Errors if a record with the same key already exists.
    async fn append(&self, record: &DeploymentRecord) -> anyhow::Result<()>;

    async fn get_all(&self) -> anyhow::Result<Vec<DeploymentRecord>>;

    /// Records whose full hash starts with `prefix`.
    async fn get_by_hash_prefix(&self, prefix: &str) -> anyhow::Result<Vec<DeploymentRecord>>;
}
