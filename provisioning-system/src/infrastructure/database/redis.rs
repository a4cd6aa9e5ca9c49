use anyhow::bail;
use async_trait::async_trait;
use domain_provisioning::{
    model::{
        entity::{DeploymentRecord, UploadSession},
        vo::StorageLimits,
    },
    repository::{DeploymentRecordRepo, UploadSessionRepo},
};
use redis::{aio::ConnectionManager, AsyncCommands};
use typed_builder::TypedBuilder;

use super::{check_key, encode};

/// Sessions, finalize locks and deployment records stored in Redis.
///
/// Keys: `upload_session_{id}`, `upload_fragments_{id}` (set of received
/// indices), `upload_lock_{id}` and `deployment_{full_hash}_{micros}`.
#[derive(TypedBuilder, Clone)]
pub struct RedisRepository {
    connection: ConnectionManager,
    #[builder(default)]
    limits: StorageLimits,
}

fn session_key(session_id: &str) -> String {
    format!("upload_session_{session_id}")
}

fn fragments_key(session_id: &str) -> String {
    format!("upload_fragments_{session_id}")
}

fn lock_key(session_id: &str) -> String {
    format!("upload_lock_{session_id}")
}

fn record_key(record: &DeploymentRecord) -> String {
    format!("deployment_{}", record.key())
}

impl RedisRepository {
    pub async fn connect(url: &str, limits: StorageLimits) -> anyhow::Result<Self> {
        let client = redis::Client::open(url)?;
        let connection = ConnectionManager::new(client).await?;
        Ok(Self::builder().connection(connection).limits(limits).build())
    }

    async fn get_records(&self, pattern: &str) -> anyhow::Result<Vec<DeploymentRecord>> {
        let mut connection = self.connection.clone();
        let keys: Vec<String> = connection.keys(pattern).await?;
        if keys.is_empty() {
            return Ok(vec![]);
        }
        let values: Vec<Option<String>> = redis::cmd("MGET").arg(&keys).query_async(&mut connection).await?;
        values
            .into_iter()
            .flatten()
            .map(|x| Ok(serde_json::from_str::<DeploymentRecord>(&x)?))
            .collect()
    }
}

#[async_trait]
impl UploadSessionRepo for RedisRepository {
    async fn insert_new(&self, session: &UploadSession) -> anyhow::Result<bool> {
        let key = session_key(&session.session_id);
        check_key(&key, &self.limits)?;
        let value = encode("session", session, self.limits.max_session_size)?;
        let mut connection = self.connection.clone();
        Ok(connection.set_nx(key, value).await?)
    }

    async fn get(&self, session_id: &str) -> anyhow::Result<Option<UploadSession>> {
        let key = session_key(session_id);
        check_key(&key, &self.limits)?;
        let mut connection = self.connection.clone();
        let (value, received): (Option<String>, u64) = redis::pipe()
            .atomic()
            .get(key)
            .scard(fragments_key(session_id))
            .query_async(&mut connection)
            .await?;
        Ok(match value {
            Some(x) => {
                let mut session: UploadSession = serde_json::from_str(&x)?;
                session.uploaded_chunks = received;
                Some(session)
            }
            None => None,
        })
    }

    async fn update(&self, session: &UploadSession) -> anyhow::Result<()> {
        let key = session_key(&session.session_id);
        check_key(&key, &self.limits)?;
        let value = encode("session", session, self.limits.max_session_size)?;
        let mut connection = self.connection.clone();
        // XX: never resurrect a session that disappeared.
        let updated: Option<String> = redis::cmd("SET")
            .arg(&key)
            .arg(value)
            .arg("XX")
            .query_async(&mut connection)
            .await?;
        if updated.is_none() {
            bail!("upload session {} doesn't exist", session.session_id);
        }
        Ok(())
    }

    async fn record_fragment(&self, session_id: &str, index: u64) -> anyhow::Result<u64> {
        let key = fragments_key(session_id);
        check_key(&key, &self.limits)?;
        let mut connection = self.connection.clone();
        let (received,): (u64,) = redis::pipe()
            .atomic()
            .sadd(&key, index)
            .ignore()
            .scard(&key)
            .query_async(&mut connection)
            .await?;
        Ok(received)
    }

    async fn try_lock_finalize(&self, session_id: &str, lease_msecs: u64) -> anyhow::Result<bool> {
        let key = lock_key(session_id);
        check_key(&key, &self.limits)?;
        let mut connection = self.connection.clone();
        let locked: Option<String> = redis::cmd("SET")
            .arg(&key)
            .arg(1)
            .arg("NX")
            .arg("PX")
            .arg(lease_msecs)
            .query_async(&mut connection)
            .await?;
        Ok(locked.is_some())
    }

    async fn unlock_finalize(&self, session_id: &str) -> anyhow::Result<()> {
        let mut connection = self.connection.clone();
        let _: i64 = connection.del(lock_key(session_id)).await?;
        Ok(())
    }

    async fn is_finalize_locked(&self, session_id: &str) -> anyhow::Result<bool> {
        let mut connection = self.connection.clone();
        Ok(connection.exists(lock_key(session_id)).await?)
    }
}

#[async_trait]
impl DeploymentRecordRepo for RedisRepository {
    async fn append(&self, record: &DeploymentRecord) -> anyhow::Result<()> {
        let key = record_key(record);
        check_key(&key, &self.limits)?;
        let value = encode("deployment record", record, self.limits.max_record_size)?;
        let mut connection = self.connection.clone();
        let inserted: bool = connection.set_nx(&key, value).await?;
        if !inserted {
            bail!("deployment record {key} already exists");
        }
        Ok(())
    }

    async fn get_all(&self) -> anyhow::Result<Vec<DeploymentRecord>> {
        self.get_records("deployment_*").await
    }

    async fn get_by_hash_prefix(&self, prefix: &str) -> anyhow::Result<Vec<DeploymentRecord>> {
        // Hex only, so the prefix can't smuggle glob patterns into KEYS.
        if !prefix.chars().all(|c| c.is_ascii_hexdigit()) {
            return Ok(vec![]);
        }
        self.get_records(&format!("deployment_{prefix}*")).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_keys_start_with_the_full_hash() {
        let record = DeploymentRecord {
            unit_id: "u1".to_string(),
            content_hash: "abcd".to_string(),
            full_hash: domain_provisioning::model::vo::ContentHash::new("abcdef"),
            deployed_at: chrono::Utc::now(),
            original_size: 1,
            compressed_size: 1,
            session_id: "s1".to_string(),
        };
        assert!(record_key(&record).starts_with("deployment_abcdef_"));
        assert_eq!(session_key("s1"), "upload_session_s1");
        assert_eq!(lock_key("s1"), "upload_lock_s1");
        assert_eq!(fragments_key("s1"), "upload_fragments_s1");
    }
}
