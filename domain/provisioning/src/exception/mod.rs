use crate::model::vo::FinalizeStage;

pub type ProvisionResult<T> = Result<T, ProvisionException>;

#[derive(Debug, thiserror::Error)]
pub enum ProvisionException {
    #[error("validation: upload session {session_id} not found.")]
    SessionNotFound { session_id: String },

    #[error("validation: upload session {session_id} is already completed.")]
    SessionAlreadyCompleted { session_id: String },

    #[error("validation: fragment index {index} is out of range for session {session_id} with {chunk_count} chunks.")]
    InvalidFragmentIndex {
        session_id: String,
        index: u64,
        chunk_count: u64,
    },

    #[error("validation: {chunk_count} chunks can't split a payload of {total_size} bytes.")]
    InvalidChunkCount { total_size: u64, chunk_count: u64 },

    #[error("validation: a finalize of upload session {session_id} is already in progress.")]
    FinalizeInProgress { session_id: String },

    #[error("validation: missing chunks in session {session_id}, uploaded {uploaded} of {expected}.")]
    IncompleteUpload {
        session_id: String,
        uploaded: u64,
        expected: u64,
    },

    #[error("validation: {what} of {size} bytes exceeds the storage limit of {limit} bytes.")]
    StorageLimitExceeded {
        what: &'static str,
        size: usize,
        limit: usize,
    },

    #[error("reassembly: fragment {index} of session {session_id} is missing.")]
    MissingFragment { session_id: String, index: u64 },

    #[error("reassembly: reassembled payload is {actual} bytes, declared total size is {expected} bytes.")]
    FragmentSizeMismatch { expected: u64, actual: u64 },

    #[error("reassembly: {algorithm} digest {completed} of the payload doesn't match provided digest {provided}.")]
    UnmatchedDigest {
        algorithm: String,
        provided: String,
        completed: String,
    },

    #[error("reassembly: decompression failed: {reason}")]
    DecompressionFailed { reason: String },

    #[error("allocation: allocation exhausted after {attempts} attempts, last collision: {message}")]
    AllocationCollision { attempts: u32, message: String },

    #[error("allocation: host platform refused to allocate an execution unit: {message}")]
    AllocationFatal { message: String },

    #[error("install: installing module into unit {unit_id} failed: {message}")]
    InstallFailed { unit_id: String, message: String },

    #[error("install: host platform doesn't support chunked installs (unit {unit_id}): {message}. Upload a module of at most {ceiling} bytes once decompressed, or enable chunked code installation on the host.")]
    ChunkedInstallUnsupported {
        unit_id: String,
        message: String,
        ceiling: usize,
    },

    #[error("recording: writing deployment record for unit {unit_id} failed: {reason}")]
    LedgerWriteFailed { unit_id: String, reason: String },

    #[error("recording: marking upload session {session_id} completed failed: {reason}")]
    CompletionMarkFailed { session_id: String, reason: String },

    #[error("internal error: {source}")]
    InternalError {
        #[source]
        source: anyhow::Error,
    },
}

impl ProvisionException {
    /// Stage of the finalize state machine the failure belongs to.
    pub fn stage(&self) -> Option<FinalizeStage> {
        use ProvisionException::*;
        Some(match self {
            SessionNotFound { .. }
            | SessionAlreadyCompleted { .. }
            | InvalidFragmentIndex { .. }
            | InvalidChunkCount { .. }
            | FinalizeInProgress { .. }
            | IncompleteUpload { .. }
            | StorageLimitExceeded { .. } => FinalizeStage::Validating,
            MissingFragment { .. }
            | FragmentSizeMismatch { .. }
            | UnmatchedDigest { .. }
            | DecompressionFailed { .. } => FinalizeStage::Reassembling,
            AllocationCollision { .. } | AllocationFatal { .. } => FinalizeStage::Allocating,
            InstallFailed { .. } | ChunkedInstallUnsupported { .. } => FinalizeStage::Installing,
            LedgerWriteFailed { .. } | CompletionMarkFailed { .. } => FinalizeStage::Recording,
            InternalError { .. } => return None,
        })
    }

    /// Numeric code reported to callers alongside the message.
    pub fn status(&self) -> u16 {
        use ProvisionException::*;
        match self {
            SessionNotFound { .. } => 301,
            SessionAlreadyCompleted { .. } => 302,
            InvalidFragmentIndex { .. } => 303,
            FinalizeInProgress { .. } => 304,
            IncompleteUpload { .. } => 305,
            StorageLimitExceeded { .. } => 306,
            InvalidChunkCount { .. } => 307,
            MissingFragment { .. } => 311,
            FragmentSizeMismatch { .. } => 312,
            UnmatchedDigest { .. } => 313,
            DecompressionFailed { .. } => 314,
            AllocationCollision { .. } => 321,
            AllocationFatal { .. } => 322,
            InstallFailed { .. } => 331,
            ChunkedInstallUnsupported { .. } => 332,
            LedgerWriteFailed { .. } => 341,
            CompletionMarkFailed { .. } => 342,
            InternalError { .. } => 500,
        }
    }
}

impl From<anyhow::Error> for ProvisionException {
    fn from(e: anyhow::Error) -> Self {
        match e.downcast::<ProvisionException>() {
            Ok(e) => e,
            Err(source) => ProvisionException::InternalError { source },
        }
    }
}

/// Failure reported by the host platform for a single call.
#[derive(Debug, thiserror::Error)]
pub enum HostCallError {
    /// Transient: the platform picked an identifier that is already taken.
    #[error("identifier collision: {message}")]
    IdCollision { message: String },

    #[error("chunked code installation is not supported: {message}")]
    ChunkedInstallUnsupported { message: String },

    #[error("rejected with code {code}: {message}")]
    Rejected { code: u16, message: String },

    #[error("transport error: {source}")]
    Transport {
        #[source]
        source: anyhow::Error,
    },
}

pub type HostCallResult<T> = Result<T, HostCallError>;

impl From<anyhow::Error> for HostCallError {
    fn from(source: anyhow::Error) -> Self {
        HostCallError::Transport { source }
    }
}
