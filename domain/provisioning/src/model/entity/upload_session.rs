use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::exception::{ProvisionException, ProvisionResult};
use crate::model::vo::TransportDigest;

/// One in-progress transfer of a compressed module.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct UploadSession {
    pub session_id: String,
    /// Identity of the caller that opened the session.
    pub uploader: String,
    /// Size of the compressed payload, in bytes.
    pub total_size: u64,
    pub chunk_count: u64,
    /// Number of distinct fragment indices stored so far. Repositories derive
    /// it from the set of received indices.
    pub uploaded_chunks: u64,
    pub created_at: DateTime<Utc>,
    pub completed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub digest: Option<TransportDigest>,
}

impl UploadSession {
    pub fn new(
        session_id: String,
        uploader: &str,
        total_size: u64,
        chunk_count: u64,
        digest: Option<TransportDigest>,
    ) -> Self {
        Self {
            session_id,
            uploader: uploader.to_owned(),
            total_size,
            chunk_count,
            uploaded_chunks: 0,
            created_at: Utc::now(),
            completed: false,
            digest,
        }
    }

    /// Errors unless a fragment with `index` may still be written.
    pub fn check_writable(&self, index: u64) -> ProvisionResult<()> {
        if self.completed {
            return Err(ProvisionException::SessionAlreadyCompleted {
                session_id: self.session_id.to_owned(),
            });
        }
        if index >= self.chunk_count {
            return Err(ProvisionException::InvalidFragmentIndex {
                session_id: self.session_id.to_owned(),
                index,
                chunk_count: self.chunk_count,
            });
        }
        Ok(())
    }

    /// Errors when `chunk_count` fragments can't carry `total_size` bytes
    /// without empty fragments.
    pub fn check_layout(total_size: u64, chunk_count: u64) -> ProvisionResult<()> {
        if chunk_count > total_size.max(1) {
            return Err(ProvisionException::InvalidChunkCount {
                total_size,
                chunk_count,
            });
        }
        Ok(())
    }

    pub fn is_fully_uploaded(&self) -> bool {
        self.uploaded_chunks == self.chunk_count
    }

    /// Errors unless the session can enter finalize.
    pub fn check_finalizable(&self) -> ProvisionResult<()> {
        if self.completed {
            return Err(ProvisionException::SessionAlreadyCompleted {
                session_id: self.session_id.to_owned(),
            });
        }
        if !self.is_fully_uploaded() {
            return Err(ProvisionException::IncompleteUpload {
                session_id: self.session_id.to_owned(),
                uploaded: self.uploaded_chunks,
                expected: self.chunk_count,
            });
        }
        Ok(())
    }
}
