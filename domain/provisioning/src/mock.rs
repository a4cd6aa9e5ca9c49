use async_trait::async_trait;
use mockall::mock;

use crate::{
    command::OpenUploadCommand,
    exception::{HostCallResult, ProvisionResult},
    model::{
        entity::{DeploymentRecord, UploadSession},
        vo::{
            ChunkHandle, DeploymentReceipt, Fragment, FragmentReceipt, InstallMode,
            ResourceBudget, TransportDigest, VerifiedModule,
        },
    },
    repository::{DeploymentRecordRepo, UploadSessionRepo},
    service::{
        ContentVerifierService, DeploymentLedgerService, FragmentStore, HostPlatform,
        ProvisioningService, UploadSessionService,
    },
};

mock! {
    pub UploadSessionRepo {}
    #[async_trait]
    impl UploadSessionRepo for UploadSessionRepo {
        async fn insert_new(&self, session: &UploadSession) -> anyhow::Result<bool>;
        async fn get(&self, session_id: &str) -> anyhow::Result<Option<UploadSession>>;
        async fn update(&self, session: &UploadSession) -> anyhow::Result<()>;
        async fn record_fragment(&self, session_id: &str, index: u64) -> anyhow::Result<u64>;
        async fn try_lock_finalize(&self, session_id: &str, lease_msecs: u64) -> anyhow::Result<bool>;
        async fn unlock_finalize(&self, session_id: &str) -> anyhow::Result<()>;
        async fn is_finalize_locked(&self, session_id: &str) -> anyhow::Result<bool>;
    }
}

mock! {
    pub DeploymentRecordRepo {}
    #[async_trait]
    impl DeploymentRecordRepo for DeploymentRecordRepo {
        async fn append(&self, record: &DeploymentRecord) -> anyhow::Result<()>;
        async fn get_all(&self) -> anyhow::Result<Vec<DeploymentRecord>>;
        async fn get_by_hash_prefix(&self, prefix: &str) -> anyhow::Result<Vec<DeploymentRecord>>;
    }
}

mock! {
    pub FragmentStore {}
    #[async_trait]
    impl FragmentStore for FragmentStore {
        async fn put(&self, session_id: &str, index: u64, content: &[u8]) -> anyhow::Result<()>;
        async fn get(&self, session_id: &str, index: u64) -> anyhow::Result<Option<Vec<u8>>>;
        async fn release(&self, session_id: &str) -> anyhow::Result<()>;
    }
}

mock! {
    pub ContentVerifierService {}
    impl ContentVerifierService for ContentVerifierService {
        fn reassemble_and_verify(
            &self,
            fragments: Vec<Vec<u8>>,
            expected_total_size: u64,
            digest: Option<TransportDigest>,
        ) -> ProvisionResult<VerifiedModule>;
    }
}

mock! {
    pub DeploymentLedgerService {}
    #[async_trait]
    impl DeploymentLedgerService for DeploymentLedgerService {
        async fn append(&self, record: &DeploymentRecord) -> ProvisionResult<()>;
        async fn list(&self) -> ProvisionResult<Vec<DeploymentRecord>>;
        async fn find_by_hash_prefix(&self, prefix: &str) -> ProvisionResult<Vec<DeploymentRecord>>;
    }
}

mock! {
    pub HostPlatform {}
    #[async_trait]
    impl HostPlatform for HostPlatform {
        async fn allocate_unit(&self, budget: ResourceBudget, controller: &str) -> HostCallResult<String>;
        async fn install_module(
            &self,
            unit_id: &str,
            mode: InstallMode,
            module: &[u8],
            init_arg: &[u8],
        ) -> HostCallResult<()>;
        async fn stage_chunk(&self, unit_id: &str, chunk: &[u8]) -> HostCallResult<ChunkHandle>;
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
}

mock! {
    pub UploadSessionService {}
    #[async_trait]
    impl UploadSessionService for UploadSessionService {
        async fn open(&self, cmd: OpenUploadCommand) -> ProvisionResult<String>;
        async fn status(&self, session_id: &str) -> ProvisionResult<Option<UploadSession>>;
        async fn upload_fragment(&self, fragment: Fragment) -> ProvisionResult<FragmentReceipt>;
        async fn record_fragment_write(&self, session_id: &str, index: u64) -> ProvisionResult<UploadSession>;
        async fn mark_completed(&self, session_id: &str) -> ProvisionResult<()>;
        async fn begin_finalize(&self, session_id: &str) -> ProvisionResult<UploadSession>;
        async fn end_finalize(&self, session_id: &str) -> ProvisionResult<()>;
        async fn abandon(&self, session_id: &str) -> ProvisionResult<()>;
    }
}

mock! {
    pub ProvisioningService {}
    #[async_trait]
    impl ProvisioningService for ProvisioningService {
        async fn finalize(&self, session_id: &str) -> ProvisionResult<DeploymentReceipt>;
        async fn deploy_single_blob(&self, compressed_module: Vec<u8>, uploader: &str) -> ProvisionResult<DeploymentReceipt>;
    }
}
