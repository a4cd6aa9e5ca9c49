use async_trait::async_trait;

use crate::command::OpenUploadCommand;
use crate::exception::ProvisionResult;
use crate::model::entity::UploadSession;
use crate::model::vo::{Fragment, FragmentReceipt};

/// # Upload session manager
///
/// An upload session tracks how many fragments of a compressed module have been
/// stored. Fragments stay in the fragment store until the session is finalized
/// successfully or abandoned.
#[async_trait]
pub trait UploadSessionService: Send + Sync {
    /// Create a session and return its id. Id collisions are retried.
    async fn open(&self, cmd: OpenUploadCommand) -> ProvisionResult<String>;

    async fn status(&self, session_id: &str) -> ProvisionResult<Option<UploadSession>>;

    /// Validate, store one fragment, and count it.
    async fn upload_fragment(&self, fragment: Fragment) -> ProvisionResult<FragmentReceipt>;

    /// Count a durably stored fragment.
    async fn record_fragment_write(
        &self,
        session_id: &str,
        index: u64,
    ) -> ProvisionResult<UploadSession>;

    /// Set the terminal `completed` flag.
    async fn mark_completed(&self, session_id: &str) -> ProvisionResult<()>;

    /// Take the finalize lock and check that the session can be finalized.
    ///
    /// The lock is released again when the checks fail.
    async fn begin_finalize(&self, session_id: &str) -> ProvisionResult<UploadSession>;

    async fn end_finalize(&self, session_id: &str) -> ProvisionResult<()>;

    /// Release the fragments of a session that will not be finalized.
    async fn abandon(&self, session_id: &str) -> ProvisionResult<()>;
}
