use async_trait::async_trait;

use crate::model::entity::UploadSession;

/// Durable store of upload sessions, keyed by session id.
#[async_trait]
pub trait UploadSessionRepo: Send + Sync {
    /// Insert only if no session with the same id exists.
    ///
    /// Returns `false` on an id collision, leaving the stored session untouched.
    async fn insert_new(&self, session: &UploadSession) -> anyhow::Result<bool>;

    /// Returns the session with `uploaded_chunks` set to the number of distinct
    /// received indices.
    async fn get(&self, session_id: &str) -> anyhow::Result<Option<UploadSession>>;

    /// Overwrite the stored session. Its `uploaded_chunks` is not persisted.
    async fn update(&self, session: &UploadSession) -> anyhow::Result<()>;

    /// Atomically add `index` to the received set of a session and return the
    /// size of the set. Adding an index twice is a no-op.
    async fn record_fragment(&self, session_id: &str, index: u64) -> anyhow::Result<u64>;

    /// Take the finalize lock of a session with a lease in milliseconds.
    ///
    /// Returns `false` when another finalize holds it.
    async fn try_lock_finalize(&self, session_id: &str, lease_msecs: u64) -> anyhow::Result<bool>;

    async fn unlock_finalize(&self, session_id: &str) -> anyhow::Result<()>;

    async fn is_finalize_locked(&self, session_id: &str) -> anyhow::Result<bool>;
}
