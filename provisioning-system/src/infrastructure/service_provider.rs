use std::sync::Arc;

use anyhow::Context;
use domain_provisioning::{
    repository::{DeploymentRecordRepo, UploadSessionRepo},
    service::{DeploymentLedgerService, HostPlatform, ProvisioningService, UploadSessionService},
};
use service_provisioning::{
    ContentVerifierServiceImpl, DeploymentLedgerServiceImpl, LocalFragmentStoreImpl,
    ProvisioningServiceImpl, UploadSessionServiceImpl,
};

use super::{
    HttpHostPlatform, MemoryRepository, ProvisionerConfig, RedisRepository, StorageBackend,
};

/// Services shared by every request handler.
pub struct ServiceProvider {
    pub config: ProvisionerConfig,
    pub session_service: Arc<dyn UploadSessionService>,
    pub provisioning_service: Arc<dyn ProvisioningService>,
    pub ledger_service: Arc<dyn DeploymentLedgerService>,
}

impl ServiceProvider {
    pub async fn build(config: config::Config) -> anyhow::Result<Self> {
        let config: ProvisionerConfig = config.try_deserialize()?;
        let limits = config.storage.limits;

        let session_repo: Arc<dyn UploadSessionRepo>;
        let record_repo: Arc<dyn DeploymentRecordRepo>;
        match config.storage.backend {
            StorageBackend::Redis => {
                let url = config.common.redis.urls.first().context("common.redis.urls is empty")?;
                let repo = Arc::new(RedisRepository::connect(url, limits).await?);
                session_repo = repo.clone();
                record_repo = repo;
            }
            StorageBackend::Memory => {
                let repo = Arc::new(MemoryRepository::new(limits));
                session_repo = repo.clone();
                record_repo = repo;
            }
        }

        let host_platform = Arc::new(HttpHostPlatform::new(
            Arc::new(reqwest::Client::new()),
            &config.host_platform.endpoint,
            config.host_platform.auth_token.clone(),
        )?);

        Self::wire(config, session_repo, record_repo, host_platform)
    }

    /// Assemble the services on top of the given stores and host platform.
    pub fn wire(
        config: ProvisionerConfig,
        session_repo: Arc<dyn UploadSessionRepo>,
        record_repo: Arc<dyn DeploymentRecordRepo>,
        host_platform: Arc<dyn HostPlatform>,
    ) -> anyhow::Result<Self> {
        let fragment_store = Arc::new(
            LocalFragmentStoreImpl::builder()
                .base(config.storage.fragment_dir.clone())
                .limits(config.storage.limits)
                .build(),
        );
        let session_service = Arc::new(
            UploadSessionServiceImpl::builder()
                .session_repo(session_repo)
                .fragment_store(fragment_store.clone())
                .finalize_lease_msecs(config.storage.finalize_lease_ms)
                .build(),
        );
        let ledger_service = Arc::new(
            DeploymentLedgerServiceImpl::builder()
                .record_repo(record_repo)
                .build(),
        );
        let content_verifier = Arc::new(
            ContentVerifierServiceImpl::builder()
                .max_module_size(config.provisioning.max_module_size)
                .build(),
        );
        let provisioning = &config.provisioning;
        let provisioning_service = Arc::new(
            ProvisioningServiceImpl::builder()
                .session_service(session_service.clone())
                .fragment_store(fragment_store)
                .content_verifier(content_verifier)
                .host_platform(host_platform)
                .deployment_ledger(ledger_service.clone())
                .controller(provisioning.controller.as_str())
                .resource_budget(provisioning.resource_budget())
                .install_mode(provisioning.install_mode)
                .init_arg(provisioning.init_arg().context("provisioning.init_arg isn't hex")?)
                .direct_install_ceiling(provisioning.direct_install_ceiling)
                .staging_chunk_size(provisioning.staging_chunk_size)
                .allocation_attempts(provisioning.allocation_attempts)
                .allocation_backoff(provisioning.allocation_backoff())
                .hash_display_len(provisioning.hash_display_len)
                .build(),
        );
        Ok(Self {
            config,
            session_service,
            provisioning_service,
            ledger_service,
        })
    }
}
