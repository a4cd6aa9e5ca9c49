use std::sync::Arc;

use async_trait::async_trait;
use domain_provisioning::{
    exception::{ProvisionException, ProvisionResult},
    model::entity::DeploymentRecord,
    repository::DeploymentRecordRepo,
    service::DeploymentLedgerService,
};
use typed_builder::TypedBuilder;

#[derive(TypedBuilder)]
pub struct DeploymentLedgerServiceImpl {
    record_repo: Arc<dyn DeploymentRecordRepo>,
}

#[async_trait]
impl DeploymentLedgerService for DeploymentLedgerServiceImpl {
    async fn append(&self, record: &DeploymentRecord) -> ProvisionResult<()> {
        self.record_repo.append(record).await.map_err(|e| {
            ProvisionException::LedgerWriteFailed {
                unit_id: record.unit_id.to_owned(),
                reason: e.to_string(),
            }
        })
    }

    async fn list(&self) -> ProvisionResult<Vec<DeploymentRecord>> {
        let mut records = self.record_repo.get_all().await?;
        records.sort_by_key(|r| r.deployed_at);
        Ok(records)
    }

    async fn find_by_hash_prefix(&self, prefix: &str) -> ProvisionResult<Vec<DeploymentRecord>> {
        let prefix = prefix.trim().to_lowercase();
        let mut records = self.record_repo.get_by_hash_prefix(&prefix).await?;
        records.sort_by_key(|r| r.deployed_at);
        Ok(records)
    }
}
