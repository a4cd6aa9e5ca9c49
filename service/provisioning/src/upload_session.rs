use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use domain_provisioning::{
    command::OpenUploadCommand,
    exception::{ProvisionException, ProvisionResult},
    model::{
        entity::UploadSession,
        vo::{Fragment, FragmentReceipt},
    },
    repository::UploadSessionRepo,
    service::{FragmentStore, UploadSessionService},
};
use typed_builder::TypedBuilder;

const MAX_ID_ATTEMPTS: usize = 8;

#[derive(TypedBuilder)]
pub struct UploadSessionServiceImpl {
    session_repo: Arc<dyn UploadSessionRepo>,
    fragment_store: Arc<dyn FragmentStore>,
    /// Lease of the finalize lock in milliseconds.
    #[builder(default = 60 * 60 * 1000)]
    finalize_lease_msecs: u64,
}

/// 128-bit session id derived from the uploader, the clock and fresh randomness.
fn generate_session_id(uploader: &str) -> String {
    let mut hasher = blake3::Hasher::new();
    hasher.update(uploader.as_bytes());
    hasher.update(&Utc::now().timestamp_nanos_opt().unwrap_or_default().to_le_bytes());
    hasher.update(&rand::random::<u128>().to_le_bytes());
    hasher.finalize().to_hex()[..32].to_string()
}

impl UploadSessionServiceImpl {
    async fn get_session(&self, session_id: &str) -> ProvisionResult<UploadSession> {
        self.session_repo
            .get(session_id)
            .await?
            .ok_or_else(|| ProvisionException::SessionNotFound {
                session_id: session_id.to_owned(),
            })
    }

    async fn ensure_not_finalizing(&self, session_id: &str) -> ProvisionResult<()> {
        if self.session_repo.is_finalize_locked(session_id).await? {
            return Err(ProvisionException::FinalizeInProgress {
                session_id: session_id.to_owned(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl UploadSessionService for UploadSessionServiceImpl {
    async fn open(&self, cmd: OpenUploadCommand) -> ProvisionResult<String> {
        UploadSession::check_layout(cmd.total_size, cmd.chunk_count)?;
        for _ in 0..MAX_ID_ATTEMPTS {
            let session = UploadSession::new(
                generate_session_id(&cmd.uploader),
                &cmd.uploader,
                cmd.total_size,
                cmd.chunk_count,
                cmd.digest.clone(),
            );
            if self.session_repo.insert_new(&session).await? {
                tracing::info!(
                    "Opened upload session {} for {}: {} bytes in {} chunks",
                    session.session_id,
                    session.uploader,
                    session.total_size,
                    session.chunk_count
                );
                return Ok(session.session_id);
            }
            tracing::warn!("Session id {} collided, regenerating", session.session_id);
        }
        Err(anyhow::anyhow!("no free session id after {MAX_ID_ATTEMPTS} attempts").into())
    }

    async fn status(&self, session_id: &str) -> ProvisionResult<Option<UploadSession>> {
        Ok(self.session_repo.get(session_id).await?)
    }

    async fn upload_fragment(&self, fragment: Fragment) -> ProvisionResult<FragmentReceipt> {
        let Fragment {
            session_id,
            index,
            content,
        } = fragment;
        self.get_session(&session_id).await?.check_writable(index)?;
        self.ensure_not_finalizing(&session_id).await?;

        self.fragment_store.put(&session_id, index, &content).await?;
        let recorded = self.record_fragment_write(&session_id, index).await;
        if let Err(ProvisionException::SessionAlreadyCompleted { .. }) = &recorded {
            // A finalize released the session before this write landed.
            if let Err(e) = self.fragment_store.release(&session_id).await {
                tracing::warn!("Releasing late fragment {index} of session {session_id} failed: {e}");
            }
        }
        let session = recorded?;
        // A finalize that started after the first check may have read the old bytes.
        self.ensure_not_finalizing(&session_id).await?;
        Ok(FragmentReceipt {
            index,
            uploaded_count: session.uploaded_chunks,
            total_count: session.chunk_count,
        })
    }

    async fn record_fragment_write(
        &self,
        session_id: &str,
        index: u64,
    ) -> ProvisionResult<UploadSession> {
        let mut session = self.get_session(session_id).await?;
        session.check_writable(index)?;
        session.uploaded_chunks = self.session_repo.record_fragment(session_id, index).await?;
        Ok(session)
    }

    async fn mark_completed(&self, session_id: &str) -> ProvisionResult<()> {
        let mut session = self.get_session(session_id).await?;
        if session.completed {
            return Err(ProvisionException::SessionAlreadyCompleted {
                session_id: session_id.to_owned(),
            });
        }
        session.completed = true;
        self.session_repo.update(&session).await?;
        Ok(())
    }

    async fn begin_finalize(&self, session_id: &str) -> ProvisionResult<UploadSession> {
        // Unknown sessions must not leave a lock behind.
        self.get_session(session_id).await?;
        if !self.session_repo.try_lock_finalize(session_id, self.finalize_lease_msecs).await? {
            return Err(ProvisionException::FinalizeInProgress {
                session_id: session_id.to_owned(),
            });
        }
        let checked = match self.get_session(session_id).await {
            Ok(session) => session.check_finalizable().map(|_| session),
            Err(e) => Err(e),
        };
        if checked.is_err() {
            self.end_finalize(session_id).await?;
        }
        checked
    }

    async fn end_finalize(&self, session_id: &str) -> ProvisionResult<()> {
        Ok(self.session_repo.unlock_finalize(session_id).await?)
    }

    async fn abandon(&self, session_id: &str) -> ProvisionResult<()> {
        self.get_session(session_id).await?;
        self.ensure_not_finalizing(session_id).await?;
        if let Err(e) = self.fragment_store.release(session_id).await {
            tracing::warn!(
                "Abandoned session {session_id} kept fragments that could not be released: {e}"
            );
        }
        tracing::info!("Abandoned upload session {session_id}");
        Ok(())
    }
}
