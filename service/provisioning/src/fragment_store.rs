use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, bail};
use async_trait::async_trait;
use domain_provisioning::{
    exception::ProvisionException, model::vo::StorageLimits, service::FragmentStore,
};
use typed_builder::TypedBuilder;

/// Fragment store on the local filesystem.
///
/// Fragment `n` of a session lives at `{base}/fragments/{session_id}/{n}`.
#[derive(TypedBuilder, Clone)]
pub struct LocalFragmentStoreImpl {
    #[builder(default = "base_dir".into(), setter(into))]
    base: PathBuf,
    #[builder(default)]
    limits: StorageLimits,
}

impl LocalFragmentStoreImpl {
    fn session_dir(&self, session_id: &str) -> PathBuf {
        self.base.join(format!("fragments/{session_id}"))
    }

    fn fragment_path(&self, session_id: &str, index: u64) -> PathBuf {
        self.base.join(format!("fragments/{session_id}/{index}"))
    }

    fn check_key(&self, session_id: &str, index: u64) -> anyhow::Result<()> {
        if session_id.is_empty()
            || !session_id.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        {
            bail!("session id {session_id:?} can't be used as a fragment key");
        }
        let key_size = session_id.len() + 1 + index.to_string().len();
        if key_size > self.limits.max_key_size {
            return Err(ProvisionException::StorageLimitExceeded {
                what: "fragment key",
                size: key_size,
                limit: self.limits.max_key_size,
            }
            .into());
        }
        Ok(())
    }
}

async fn create_parent_and_write(path: &Path, content: &[u8]) -> anyhow::Result<()> {
    let parent = path.parent().ok_or(anyhow!("path: {path:?} doesn't has parent."))?;
    tokio::fs::create_dir_all(parent).await?;
    // Readers never observe a torn fragment.
    let staging = path.with_extension("part");
    tokio::fs::write(&staging, content).await?;
    tokio::fs::rename(&staging, path).await?;
    Ok(())
}

#[async_trait]
impl FragmentStore for LocalFragmentStoreImpl {
    async fn put(&self, session_id: &str, index: u64, content: &[u8]) -> anyhow::Result<()> {
        self.check_key(session_id, index)?;
        if content.len() > self.limits.max_fragment_size {
            return Err(ProvisionException::StorageLimitExceeded {
                what: "fragment",
                size: content.len(),
                limit: self.limits.max_fragment_size,
            }
            .into());
        }
        create_parent_and_write(&self.fragment_path(session_id, index), content).await
    }

    async fn get(&self, session_id: &str, index: u64) -> anyhow::Result<Option<Vec<u8>>> {
        self.check_key(session_id, index)?;
        match tokio::fs::read(self.fragment_path(session_id, index)).await {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn release(&self, session_id: &str) -> anyhow::Result<()> {
        self.check_key(session_id, 0)?;
        match tokio::fs::remove_dir_all(self.session_dir(session_id)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn load(dir: &tempfile::TempDir) -> LocalFragmentStoreImpl {
        LocalFragmentStoreImpl::builder().base(dir.path()).build()
    }

    #[tokio::test]
    async fn put_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let store = load(&dir);
        store.put("s1", 0, b"123").await.unwrap();
        store.put("s1", 0, b"456").await.unwrap();
        let content = store.get("s1", 0).await.unwrap().unwrap();
        assert_eq!(b"456", content.as_slice());
        assert!(store.get("s1", 1).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn missing_fragment_is_absent() {
        let dir = tempfile::tempdir().unwrap();
        let store = load(&dir);
        assert!(store.get("s1", 3).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn release_removes_the_whole_session() {
        let dir = tempfile::tempdir().unwrap();
        let store = load(&dir);
        store.put("s1", 0, b"a").await.unwrap();
        store.put("s1", u64::MAX, b"z").await.unwrap();
        store.put("s2", 0, b"other").await.unwrap();
        std::fs::write(dir.path().join("fragments/s1/7.part"), b"torn").unwrap();
        store.release("s1").await.unwrap();
        assert!(store.get("s1", 0).await.unwrap().is_none());
        assert!(store.get("s1", u64::MAX).await.unwrap().is_none());
        assert!(!dir.path().join("fragments/s1").exists());
        assert_eq!(store.get("s2", 0).await.unwrap().unwrap(), b"other");

        store.release("s1").await.unwrap();
        store.release("never-written").await.unwrap();
    }

    #[tokio::test]
    async fn survives_a_new_instance() {
        let dir = tempfile::tempdir().unwrap();
        load(&dir).put("s1", 1, b"durable").await.unwrap();
        let reopened = load(&dir);
        assert_eq!(reopened.get("s1", 1).await.unwrap().unwrap(), b"durable");
    }

    #[tokio::test]
    async fn oversized_fragment_is_refused() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalFragmentStoreImpl::builder()
            .base(dir.path())
            .limits(StorageLimits {
                max_fragment_size: 4,
                ..Default::default()
            })
            .build();
        let e = store.put("s1", 0, b"12345").await.unwrap_err();
        let e = ProvisionException::from(e);
        assert!(matches!(e, ProvisionException::StorageLimitExceeded { size: 5, limit: 4, .. }));
        assert!(store.get("s1", 0).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn path_like_session_ids_are_refused() {
        let dir = tempfile::tempdir().unwrap();
        let store = load(&dir);
        assert!(store.put("../escape", 0, b"x").await.is_err());
        assert!(store.release("../escape").await.is_err());
        assert!(store.release("").await.is_err());
    }
}
