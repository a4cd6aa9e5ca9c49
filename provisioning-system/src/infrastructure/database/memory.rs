use std::collections::HashSet;
use std::time::{Duration, Instant};

use anyhow::bail;
use async_trait::async_trait;
use dashmap::{mapref::entry::Entry, DashMap};
use domain_provisioning::{
    model::{
        entity::{DeploymentRecord, UploadSession},
        vo::StorageLimits,
    },
    repository::{DeploymentRecordRepo, UploadSessionRepo},
};

use super::{check_key, encode};

/// In-process store for single-node deployments and tests. Nothing survives a
/// restart except the fragments, which live on disk.
#[derive(Default)]
pub struct MemoryRepository {
    sessions: DashMap<String, UploadSession>,
    /// Received fragment indices per session.
    received: DashMap<String, HashSet<u64>>,
    /// Finalize locks with their expiry.
    locks: DashMap<String, Instant>,
    records: DashMap<String, DeploymentRecord>,
    limits: StorageLimits,
}

impl MemoryRepository {
    pub fn new(limits: StorageLimits) -> Self {
        Self {
            limits,
            ..Default::default()
        }
    }
}

#[async_trait]
impl UploadSessionRepo for MemoryRepository {
    async fn insert_new(&self, session: &UploadSession) -> anyhow::Result<bool> {
        check_key(&session.session_id, &self.limits)?;
        encode("session", session, self.limits.max_session_size)?;
        Ok(match self.sessions.entry(session.session_id.to_owned()) {
            Entry::Occupied(_) => false,
            Entry::Vacant(e) => {
                e.insert(session.clone());
                true
            }
        })
    }

    async fn get(&self, session_id: &str) -> anyhow::Result<Option<UploadSession>> {
        Ok(self.sessions.get(session_id).map(|x| {
            let mut session = x.value().clone();
            session.uploaded_chunks =
                self.received.get(session_id).map_or(0, |r| r.len() as u64);
            session
        }))
    }

    async fn update(&self, session: &UploadSession) -> anyhow::Result<()> {
        encode("session", session, self.limits.max_session_size)?;
        match self.sessions.get_mut(&session.session_id) {
            Some(mut x) => *x = session.clone(),
            None => bail!("upload session {} doesn't exist", session.session_id),
        }
        Ok(())
    }

    async fn record_fragment(&self, session_id: &str, index: u64) -> anyhow::Result<u64> {
        let mut received = self.received.entry(session_id.to_owned()).or_default();
        received.insert(index);
        Ok(received.len() as u64)
    }

    async fn try_lock_finalize(&self, session_id: &str, lease_msecs: u64) -> anyhow::Result<bool> {
        let now = Instant::now();
        let expiry = now + Duration::from_millis(lease_msecs);
        Ok(match self.locks.entry(session_id.to_owned()) {
            Entry::Occupied(mut e) => {
                if *e.get() > now {
                    false
                } else {
                    e.insert(expiry);
                    true
                }
            }
            Entry::Vacant(e) => {
                e.insert(expiry);
                true
            }
        })
    }

    async fn unlock_finalize(&self, session_id: &str) -> anyhow::Result<()> {
        self.locks.remove(session_id);
        Ok(())
    }

    async fn is_finalize_locked(&self, session_id: &str) -> anyhow::Result<bool> {
        Ok(self.locks.get(session_id).is_some_and(|x| *x.value() > Instant::now()))
    }
}

#[async_trait]
impl DeploymentRecordRepo for MemoryRepository {
    async fn append(&self, record: &DeploymentRecord) -> anyhow::Result<()> {
        let key = record.key();
        check_key(&key, &self.limits)?;
        encode("deployment record", record, self.limits.max_record_size)?;
        match self.records.entry(key) {
            Entry::Occupied(e) => bail!("deployment record {} already exists", e.key()),
            Entry::Vacant(e) => {
                e.insert(record.clone());
            }
        }
        Ok(())
    }

    async fn get_all(&self) -> anyhow::Result<Vec<DeploymentRecord>> {
        Ok(self.records.iter().map(|x| x.value().clone()).collect())
    }

    async fn get_by_hash_prefix(&self, prefix: &str) -> anyhow::Result<Vec<DeploymentRecord>> {
        Ok(self
            .records
            .iter()
            .filter(|x| x.full_hash.as_str().starts_with(prefix))
            .map(|x| x.value().clone())
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use domain_provisioning::{exception::ProvisionException, model::vo::ContentHash};

    use super::*;

    fn session(id: &str) -> UploadSession {
        UploadSession::new(id.to_string(), "alice", 10, 2, None)
    }

    fn record(hash: &str) -> DeploymentRecord {
        DeploymentRecord {
            unit_id: "u1".to_string(),
            content_hash: hash.to_string(),
            full_hash: ContentHash::new(hash),
            deployed_at: chrono::Utc::now(),
            original_size: 1,
            compressed_size: 1,
            session_id: "s1".to_string(),
        }
    }

    #[tokio::test]
    async fn insert_is_create_only() {
        let repo = MemoryRepository::default();
        assert!(repo.insert_new(&session("s1")).await.unwrap());
        let mut other = session("s1");
        other.uploader = "mallory".to_string();
        assert!(!repo.insert_new(&other).await.unwrap());
        assert_eq!(repo.get("s1").await.unwrap().unwrap().uploader, "alice");
    }

    #[tokio::test]
    async fn received_indices_are_counted_once() {
        let repo = MemoryRepository::default();
        repo.insert_new(&session("s1")).await.unwrap();
        assert_eq!(repo.record_fragment("s1", 1).await.unwrap(), 1);
        assert_eq!(repo.record_fragment("s1", 1).await.unwrap(), 1);
        assert_eq!(repo.record_fragment("s1", 0).await.unwrap(), 2);
        let mut stored = repo.get("s1").await.unwrap().unwrap();
        assert_eq!(stored.uploaded_chunks, 2);

        stored.uploaded_chunks = 0;
        stored.completed = true;
        repo.update(&stored).await.unwrap();
        let stored = repo.get("s1").await.unwrap().unwrap();
        assert!(stored.completed);
        assert_eq!(stored.uploaded_chunks, 2);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_fragments_are_all_counted() {
        let repo = std::sync::Arc::new(MemoryRepository::default());
        repo.insert_new(&session("s1")).await.unwrap();
        let tasks: Vec<_> = (0..64u64)
            .map(|index| {
                let repo = repo.clone();
                tokio::spawn(async move { repo.record_fragment("s1", index % 32).await.unwrap() })
            })
            .collect();
        for task in tasks {
            task.await.unwrap();
        }
        assert_eq!(repo.get("s1").await.unwrap().unwrap().uploaded_chunks, 32);
    }

    #[tokio::test]
    async fn update_of_missing_session_fails() {
        let repo = MemoryRepository::default();
        assert!(repo.update(&session("s1")).await.is_err());
    }

    #[tokio::test]
    async fn finalize_lock_is_exclusive_until_released_or_expired() {
        let repo = MemoryRepository::default();
        assert!(repo.try_lock_finalize("s1", 60_000).await.unwrap());
        assert!(!repo.try_lock_finalize("s1", 60_000).await.unwrap());
        assert!(repo.is_finalize_locked("s1").await.unwrap());
        repo.unlock_finalize("s1").await.unwrap();
        assert!(!repo.is_finalize_locked("s1").await.unwrap());

        assert!(repo.try_lock_finalize("s2", 0).await.unwrap());
        assert!(!repo.is_finalize_locked("s2").await.unwrap());
        assert!(repo.try_lock_finalize("s2", 60_000).await.unwrap());
    }

    #[tokio::test]
    async fn oversized_session_is_refused() {
        let repo = MemoryRepository::new(StorageLimits {
            max_session_size: 16,
            ..Default::default()
        });
        let e = ProvisionException::from(repo.insert_new(&session("s1")).await.unwrap_err());
        assert!(matches!(e, ProvisionException::StorageLimitExceeded { what: "session", .. }));
        assert!(repo.get("s1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn records_are_append_only_and_found_by_prefix() {
        let repo = MemoryRepository::default();
        let first = record("abc123");
        repo.append(&first).await.unwrap();
        assert!(repo.append(&first).await.is_err());
        repo.append(&record("def456")).await.unwrap();
        assert_eq!(repo.get_all().await.unwrap().len(), 2);
        let found = repo.get_by_hash_prefix("abc").await.unwrap();
        assert_eq!(found, vec![first]);
    }
}
