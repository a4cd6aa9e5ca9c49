#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::io::Write;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use domain_provisioning::{
    exception::{HostCallError, HostCallResult},
    model::{
        entity::{DeploymentRecord, UploadSession},
        vo::{ChunkHandle, InstallMode, ResourceBudget},
    },
    repository::{DeploymentRecordRepo, UploadSessionRepo},
    service::{FragmentStore, UploadSessionService},
};
use flate2::{write::GzEncoder, Compression, GzBuilder};
use service_provisioning::{
    ContentVerifierServiceImpl, DeploymentLedgerServiceImpl, LocalFragmentStoreImpl,
    ProvisioningServiceImpl, UploadSessionServiceImpl,
};

pub fn gzip(content: &[u8]) -> Vec<u8> {
    let mut encoder = GzEncoder::new(vec![], Compression::default());
    encoder.write_all(content).unwrap();
    encoder.finish().unwrap()
}

fn gzip_with_extra(content: &[u8], extra: usize) -> Vec<u8> {
    let mut builder = GzBuilder::new().mtime(0);
    if extra > 0 {
        builder = builder.extra(vec![0u8; extra]);
    }
    let mut encoder = builder.write(vec![], Compression::default());
    encoder.write_all(content).unwrap();
    encoder.finish().unwrap()
}

/// Gzip payload of exactly `size` bytes, padded through the header extra field.
pub fn gzip_exact(content: &[u8], size: usize) -> Vec<u8> {
    let base = gzip_with_extra(content, 0).len();
    assert!(size >= base + 2, "{size} bytes can't hold {base} bytes of gzip");
    let payload = gzip_with_extra(content, size - base - 2);
    assert_eq!(payload.len(), size);
    payload
}

#[derive(Default)]
pub struct MemorySessionRepo {
    sessions: Mutex<HashMap<String, UploadSession>>,
    received: Mutex<HashMap<String, HashSet<u64>>>,
    locks: Mutex<HashSet<String>>,
    /// Number of upcoming `record_fragment` calls that fail like a dropped connection.
    pub failing_records: Mutex<u32>,
}

#[async_trait]
impl UploadSessionRepo for MemorySessionRepo {
    async fn insert_new(&self, session: &UploadSession) -> anyhow::Result<bool> {
        let mut sessions = self.sessions.lock().unwrap();
        if sessions.contains_key(&session.session_id) {
            return Ok(false);
        }
        sessions.insert(session.session_id.to_owned(), session.clone());
        Ok(true)
    }

    async fn get(&self, session_id: &str) -> anyhow::Result<Option<UploadSession>> {
        // Suspend like a network round trip.
        tokio::task::yield_now().await;
        let session = self.sessions.lock().unwrap().get(session_id).cloned();
        Ok(session.map(|mut session| {
            session.uploaded_chunks = self
                .received
                .lock()
                .unwrap()
                .get(session_id)
                .map_or(0, |r| r.len() as u64);
            session
        }))
    }

    async fn update(&self, session: &UploadSession) -> anyhow::Result<()> {
        tokio::task::yield_now().await;
        self.sessions
            .lock()
            .unwrap()
            .insert(session.session_id.to_owned(), session.clone());
        Ok(())
    }

    async fn record_fragment(&self, session_id: &str, index: u64) -> anyhow::Result<u64> {
        tokio::task::yield_now().await;
        {
            let mut failing = self.failing_records.lock().unwrap();
            if *failing > 0 {
                *failing -= 1;
                anyhow::bail!("redis connection reset");
            }
        }
        let mut received = self.received.lock().unwrap();
        let indices = received.entry(session_id.to_owned()).or_default();
        indices.insert(index);
        Ok(indices.len() as u64)
    }

    async fn try_lock_finalize(&self, session_id: &str, _lease_msecs: u64) -> anyhow::Result<bool> {
        Ok(self.locks.lock().unwrap().insert(session_id.to_owned()))
    }

    async fn unlock_finalize(&self, session_id: &str) -> anyhow::Result<()> {
        self.locks.lock().unwrap().remove(session_id);
        Ok(())
    }

    async fn is_finalize_locked(&self, session_id: &str) -> anyhow::Result<bool> {
        Ok(self.locks.lock().unwrap().contains(session_id))
    }
}

#[derive(Default)]
pub struct MemoryRecordRepo {
    pub records: Mutex<Vec<DeploymentRecord>>,
    pub broken: Mutex<bool>,
}

#[async_trait]
impl DeploymentRecordRepo for MemoryRecordRepo {
    async fn append(&self, record: &DeploymentRecord) -> anyhow::Result<()> {
        if *self.broken.lock().unwrap() {
            anyhow::bail!("ledger storage is unavailable");
        }
        let mut records = self.records.lock().unwrap();
        if records.iter().any(|r| r.key() == record.key()) {
            anyhow::bail!("record {} already exists", record.key());
        }
        records.push(record.clone());
        Ok(())
    }

    async fn get_all(&self) -> anyhow::Result<Vec<DeploymentRecord>> {
        Ok(self.records.lock().unwrap().clone())
    }

    async fn get_by_hash_prefix(&self, prefix: &str) -> anyhow::Result<Vec<DeploymentRecord>> {
        Ok(self
            .records
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.full_hash.as_str().starts_with(prefix))
            .cloned()
            .collect())
    }
}

/// Host platform double that records every call it receives.
#[derive(Default)]
pub struct FakeHost {
    pub calls: Mutex<Vec<String>>,
    /// Number of allocations answered with an id collision before succeeding.
    pub collisions: Mutex<u32>,
    pub refuse_allocation: Mutex<bool>,
    pub refuse_install: Mutex<bool>,
    pub chunked_unsupported: Mutex<bool>,
    pub installed: Mutex<HashMap<String, Vec<u8>>>,
    staged: Mutex<HashMap<String, Vec<Vec<u8>>>>,
    next_unit: Mutex<u32>,
}

impl FakeHost {
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, prefix: &str) -> usize {
        self.calls().iter().filter(|c| c.starts_with(prefix)).count()
    }

    fn log(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait]
impl domain_provisioning::service::HostPlatform for FakeHost {
    async fn allocate_unit(
        &self,
        budget: ResourceBudget,
        controller: &str,
    ) -> HostCallResult<String> {
        self.log(format!("allocate {} {controller}", budget.cycles));
        if *self.refuse_allocation.lock().unwrap() {
            return Err(HostCallError::Rejected {
                code: 403,
                message: "controller is not allowed to allocate".to_string(),
            });
        }
        let mut collisions = self.collisions.lock().unwrap();
        if *collisions > 0 {
            *collisions -= 1;
            return Err(HostCallError::IdCollision {
                message: "unit id already taken".to_string(),
            });
        }
        let mut next = self.next_unit.lock().unwrap();
        *next += 1;
        Ok(format!("unit-{next}"))
    }

    async fn install_module(
        &self,
        unit_id: &str,
        mode: InstallMode,
        module: &[u8],
        _init_arg: &[u8],
    ) -> HostCallResult<()> {
        self.log(format!("install {unit_id} {mode} {}", module.len()));
        if *self.refuse_install.lock().unwrap() {
            return Err(HostCallError::Rejected {
                code: 400,
                message: "module is not valid".to_string(),
            });
        }
        self.installed.lock().unwrap().insert(unit_id.to_owned(), module.to_vec());
        Ok(())
    }

    async fn stage_chunk(&self, unit_id: &str, chunk: &[u8]) -> HostCallResult<ChunkHandle> {
        self.log(format!("stage {unit_id} {}", chunk.len()));
        let mut staged = self.staged.lock().unwrap();
        let chunks = staged.entry(unit_id.to_owned()).or_default();
        chunks.push(chunk.to_vec());
        Ok(ChunkHandle(format!("{unit_id}/{}", chunks.len() - 1)))
    }

    async fn install_from_chunks(
        &self,
        unit_id: &str,
        mode: InstallMode,
        handles: &[ChunkHandle],
        module_hash: Option<String>,
        _init_arg: &[u8],
    ) -> HostCallResult<()> {
        self.log(format!(
            "install-chunked {unit_id} {mode} {} {}",
            handles.len(),
            module_hash.unwrap_or_default()
        ));
        if *self.chunked_unsupported.lock().unwrap() {
            return Err(HostCallError::ChunkedInstallUnsupported {
                message: "the host has no chunk store".to_string(),
            });
        }
        let staged = self.staged.lock().unwrap();
        let chunks = staged.get(unit_id).cloned().unwrap_or_default();
        self.installed.lock().unwrap().insert(unit_id.to_owned(), chunks.concat());
        Ok(())
    }

    async fn clear_chunk_staging(&self, unit_id: &str) -> HostCallResult<()> {
        self.log(format!("clear {unit_id}"));
        self.staged.lock().unwrap().remove(unit_id);
        Ok(())
    }
}

pub struct Harness {
    pub provisioning: ProvisioningServiceImpl,
    pub sessions: Arc<UploadSessionServiceImpl>,
    pub session_repo: Arc<MemorySessionRepo>,
    pub record_repo: Arc<MemoryRecordRepo>,
    pub store: Arc<LocalFragmentStoreImpl>,
    pub host: Arc<FakeHost>,
    pub dir: tempfile::TempDir,
}

impl Harness {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let session_repo = Arc::new(MemorySessionRepo::default());
        let record_repo = Arc::new(MemoryRecordRepo::default());
        let store = Arc::new(LocalFragmentStoreImpl::builder().base(dir.path()).build());
        let host = Arc::new(FakeHost::default());
        let sessions = Arc::new(
            UploadSessionServiceImpl::builder()
                .session_repo(session_repo.clone())
                .fragment_store(store.clone())
                .build(),
        );
        let ledger = Arc::new(
            DeploymentLedgerServiceImpl::builder()
                .record_repo(record_repo.clone())
                .build(),
        );
        let provisioning = ProvisioningServiceImpl::builder()
            .session_service(sessions.clone())
            .fragment_store(store.clone())
            .content_verifier(Arc::new(ContentVerifierServiceImpl::builder().build()))
            .host_platform(host.clone())
            .deployment_ledger(ledger)
            .controller("provisioner")
            .allocation_backoff(Duration::ZERO)
            .build();
        Self {
            provisioning,
            sessions,
            session_repo,
            record_repo,
            store,
            host,
            dir,
        }
    }

    /// Open a session for `payload` split into `chunk_count` near-equal fragments.
    pub async fn open(&self, payload: &[u8], chunk_count: u64) -> (String, Vec<Vec<u8>>) {
        use domain_provisioning::command::OpenUploadCommand;

        let session_id = self
            .sessions
            .open(OpenUploadCommand::new(payload.len() as u64, chunk_count, "alice"))
            .await
            .unwrap();
        let size = payload.len().div_ceil(chunk_count as usize).max(1);
        let mut fragments: Vec<Vec<u8>> = payload.chunks(size).map(<[u8]>::to_vec).collect();
        fragments.resize(chunk_count as usize, vec![]);
        (session_id, fragments)
    }

    pub async fn upload(&self, session_id: &str, index: u64, content: &[u8]) {
        use domain_provisioning::model::vo::Fragment;

        self.sessions
            .upload_fragment(Fragment {
                session_id: session_id.to_owned(),
                index,
                content: content.to_vec(),
            })
            .await
            .unwrap();
    }

    pub async fn fragment_count(&self, session_id: &str, chunk_count: u64) -> usize {
        let mut count = 0;
        for index in 0..chunk_count {
            if self.store.get(session_id, index).await.unwrap().is_some() {
                count += 1;
            }
        }
        count
    }
}
