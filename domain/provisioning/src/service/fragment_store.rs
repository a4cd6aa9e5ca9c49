use async_trait::async_trait;

/// # Fragment store
///
/// Durable byte store keyed by `(session_id, index)`. It knows nothing about
/// sessions; callers validate session state before writing.
#[async_trait]
pub trait FragmentStore: Send + Sync {
    /// Store or overwrite one fragment.
    async fn put(&self, session_id: &str, index: u64, content: &[u8]) -> anyhow::Result<()>;

    async fn get(&self, session_id: &str, index: u64) -> anyhow::Result<Option<Vec<u8>>>;

    /// Delete every stored fragment of a session. Releasing a session without
    /// fragments succeeds.
    async fn release(&self, session_id: &str) -> anyhow::Result<()>;
}
