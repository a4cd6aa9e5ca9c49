use async_trait::async_trait;

use crate::exception::ProvisionResult;
use crate::model::vo::DeploymentReceipt;

/// # Provisioning orchestrator
///
/// Turns a fully uploaded session into a live execution unit.
#[async_trait]
pub trait ProvisioningService: Send + Sync {
    /// Reassemble, verify, allocate, install and record.
    ///
    /// Failures before `Recording` leave the session not completed and its
    /// fragments stored, so the call can be repeated.
    async fn finalize(&self, session_id: &str) -> ProvisionResult<DeploymentReceipt>;

    /// Deploy a small compressed module through an implicit one-fragment session.
    async fn deploy_single_blob(
        &self,
        compressed_module: Vec<u8>,
        uploader: &str,
    ) -> ProvisionResult<DeploymentReceipt>;
}
