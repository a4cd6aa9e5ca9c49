use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use domain_provisioning::{
    command::OpenUploadCommand,
    exception::{HostCallError, ProvisionException, ProvisionResult},
    model::{
        entity::{DeploymentRecord, UploadSession},
        vo::{
            ChunkHandle, DeploymentReceipt, FinalizeStage, Fragment, InstallMode,
            ResourceBudget, VerifiedModule,
        },
    },
    service::{
        ContentVerifierService, DeploymentLedgerService, FragmentStore, HostPlatform,
        ProvisioningService, UploadSessionService,
    },
};
use typed_builder::TypedBuilder;

/// Largest decompressed module installed with a single call.
pub const DIRECT_INSTALL_CEILING: usize = 10 * 1024 * 1024;
/// Size of the pieces staged on the host for a chunked install.
pub const STAGING_CHUNK_SIZE: usize = 1024 * 1024;

#[derive(TypedBuilder)]
pub struct ProvisioningServiceImpl {
    session_service: Arc<dyn UploadSessionService>,
    fragment_store: Arc<dyn FragmentStore>,
    content_verifier: Arc<dyn ContentVerifierService>,
    host_platform: Arc<dyn HostPlatform>,
    deployment_ledger: Arc<dyn DeploymentLedgerService>,
    /// Identity installed as the sole controller of new units.
    #[builder(setter(into))]
    controller: String,
    #[builder(default)]
    resource_budget: ResourceBudget,
    #[builder(default)]
    install_mode: InstallMode,
    #[builder(default)]
    init_arg: Vec<u8>,
    #[builder(default = DIRECT_INSTALL_CEILING)]
    direct_install_ceiling: usize,
    #[builder(default = STAGING_CHUNK_SIZE)]
    staging_chunk_size: usize,
    #[builder(default = 5)]
    allocation_attempts: u32,
    #[builder(default = Duration::from_millis(200))]
    allocation_backoff: Duration,
    #[builder(default = 16)]
    hash_display_len: usize,
}

#[async_trait]
impl ProvisioningService for ProvisioningServiceImpl {
    #[tracing::instrument(skip(self))]
    async fn finalize(&self, session_id: &str) -> ProvisionResult<DeploymentReceipt> {
        tracing::info!(stage = %FinalizeStage::Validating, "Finalizing upload session");
        let session = self.session_service.begin_finalize(session_id).await?;
        let result = self.run(&session).await;
        if let Err(e) = self.session_service.end_finalize(session_id).await {
            tracing::warn!("Releasing finalize lock of {session_id} failed: {e}");
        }
        match &result {
            Ok(receipt) => tracing::info!(
                stage = %FinalizeStage::Done,
                "Unit {} is live with module {}",
                receipt.record.unit_id,
                receipt.record.content_hash
            ),
            Err(e) => tracing::error!("Finalize failed: {e}"),
        }
        result
    }

    async fn deploy_single_blob(
        &self,
        compressed_module: Vec<u8>,
        uploader: &str,
    ) -> ProvisionResult<DeploymentReceipt> {
        let total_size = compressed_module.len() as u64;
        let session_id = self
            .session_service
            .open(OpenUploadCommand::new(total_size, 1, uploader))
            .await?;
        self.session_service
            .upload_fragment(Fragment {
                session_id: session_id.to_owned(),
                index: 0,
                content: compressed_module,
            })
            .await?;
        self.finalize(&session_id).await
    }
}

impl ProvisioningServiceImpl {
    async fn run(&self, session: &UploadSession) -> ProvisionResult<DeploymentReceipt> {
        tracing::info!(stage = %FinalizeStage::Reassembling, "Reassembling {} fragments", session.chunk_count);
        let module = self.reassemble(session).await?;

        tracing::info!(
            stage = %FinalizeStage::Allocating,
            "Module {} verified: {} bytes, {} compressed",
            module.content_hash.truncated(self.hash_display_len),
            module.original_size,
            module.compressed_size
        );
        let unit_id = self.allocate().await?;

        tracing::info!(stage = %FinalizeStage::Installing, "Installing into unit {unit_id}");
        self.install(&unit_id, &module).await?;

        tracing::info!(stage = %FinalizeStage::Recording, "Recording deployment of unit {unit_id}");
        Ok(self.record(session, &unit_id, &module).await)
    }

    async fn reassemble(&self, session: &UploadSession) -> ProvisionResult<VerifiedModule> {
        let mut fragments = Vec::with_capacity(session.chunk_count as usize);
        for index in 0..session.chunk_count {
            let fragment = self
                .fragment_store
                .get(&session.session_id, index)
                .await?
                .ok_or_else(|| ProvisionException::MissingFragment {
                    session_id: session.session_id.to_owned(),
                    index,
                })?;
            fragments.push(fragment);
        }
        self.content_verifier.reassemble_and_verify(
            fragments,
            session.total_size,
            session.digest.clone(),
        )
    }

    async fn allocate(&self) -> ProvisionResult<String> {
        let mut last_collision = String::new();
        for attempt in 1..=self.allocation_attempts {
            match self.host_platform.allocate_unit(self.resource_budget, &self.controller).await {
                Ok(unit_id) => return Ok(unit_id),
                Err(HostCallError::IdCollision { message }) => {
                    tracing::warn!(
                        "Allocation attempt {attempt}/{} collided: {message}",
                        self.allocation_attempts
                    );
                    last_collision = message;
                    if attempt < self.allocation_attempts {
                        tokio::time::sleep(self.allocation_backoff).await;
                    }
                }
                Err(e) => {
                    return Err(ProvisionException::AllocationFatal {
                        message: e.to_string(),
                    })
                }
            }
        }
        Err(ProvisionException::AllocationCollision {
            attempts: self.allocation_attempts,
            message: last_collision,
        })
    }

    async fn install(&self, unit_id: &str, module: &VerifiedModule) -> ProvisionResult<()> {
        if module.bytes.len() <= self.direct_install_ceiling {
            return self
                .host_platform
                .install_module(unit_id, self.install_mode, &module.bytes, &self.init_arg)
                .await
                .map_err(|e| self.install_error(unit_id, e));
        }

        let result = self.install_chunked(unit_id, module).await;
        if result.is_err() {
            if let Err(e) = self.host_platform.clear_chunk_staging(unit_id).await {
                tracing::warn!(
                    stage = %FinalizeStage::Installing,
                    "Clearing chunk staging of unit {unit_id} failed: {e}"
                );
            }
        }
        result.map_err(|e| self.install_error(unit_id, e))
    }

    async fn install_chunked(
        &self,
        unit_id: &str,
        module: &VerifiedModule,
    ) -> Result<(), HostCallError> {
        let chunks = module.bytes.chunks(self.staging_chunk_size.max(1));
        let total = chunks.len();
        let mut handles: Vec<ChunkHandle> = Vec::with_capacity(total);
        for (nth, chunk) in chunks.enumerate() {
            let handle = self.host_platform.stage_chunk(unit_id, chunk).await?;
            tracing::debug!("Staged chunk {}/{total} of unit {unit_id} as {handle}", nth + 1);
            handles.push(handle);
        }
        self.host_platform
            .install_from_chunks(
                unit_id,
                self.install_mode,
                &handles,
                Some(module.content_hash.as_str().to_owned()),
                &self.init_arg,
            )
            .await
    }

    fn install_error(&self, unit_id: &str, e: HostCallError) -> ProvisionException {
        match e {
            HostCallError::ChunkedInstallUnsupported { message } => {
                ProvisionException::ChunkedInstallUnsupported {
                    unit_id: unit_id.to_owned(),
                    message,
                    ceiling: self.direct_install_ceiling,
                }
            }
            e => ProvisionException::InstallFailed {
                unit_id: unit_id.to_owned(),
                message: e.to_string(),
            },
        }
    }

    /// The unit is live at this point: nothing here fails the finalize.
    async fn record(
        &self,
        session: &UploadSession,
        unit_id: &str,
        module: &VerifiedModule,
    ) -> DeploymentReceipt {
        let record =
            DeploymentRecord::new(unit_id, &session.session_id, module, self.hash_display_len);
        let mut warnings = vec![];

        if let Err(e) = self.deployment_ledger.append(&record).await {
            tracing::warn!(stage = %FinalizeStage::Recording, "{e}");
            warnings.push(e.to_string());
        }
        match self.session_service.mark_completed(&session.session_id).await {
            Ok(()) => {
                if let Err(e) = self.fragment_store.release(&session.session_id).await {
                    tracing::warn!(
                        stage = %FinalizeStage::Recording,
                        "Fragments of session {} could not be released: {e}",
                        session.session_id
                    );
                }
            }
            Err(e) => {
                // Fragments stay so the session can still be finalized or abandoned.
                let e = ProvisionException::CompletionMarkFailed {
                    session_id: session.session_id.to_owned(),
                    reason: format!("{e}. Its fragments were kept"),
                };
                tracing::warn!(stage = %FinalizeStage::Recording, "{e}");
                warnings.push(e.to_string());
            }
        }
        DeploymentReceipt { record, warnings }
    }
}
