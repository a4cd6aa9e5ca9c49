use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use domain_provisioning::exception::ProvisionException;
use serde::Serialize;

pub type ApiResult<T> = Result<actix_web::web::Json<T>, ApiError>;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error(transparent)]
    Provision(#[from] ProvisionException),
    #[error("validation: {0}")]
    InvalidRequest(String),
}

#[derive(Serialize)]
pub struct ErrorBody {
    pub status: u16,
    /// Failing finalize stage, absent for internal errors.
    pub stage: Option<String>,
    pub message: String,
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        use ProvisionException::*;
        let e = match self {
            ApiError::Provision(e) => e,
            ApiError::InvalidRequest(_) => return StatusCode::BAD_REQUEST,
        };
        match e {
            SessionNotFound { .. } => StatusCode::NOT_FOUND,
            SessionAlreadyCompleted { .. } | FinalizeInProgress { .. } => StatusCode::CONFLICT,
            InvalidFragmentIndex { .. }
            | InvalidChunkCount { .. }
            | IncompleteUpload { .. }
            | StorageLimitExceeded { .. }
            | MissingFragment { .. }
            | FragmentSizeMismatch { .. }
            | UnmatchedDigest { .. }
            | DecompressionFailed { .. } => StatusCode::BAD_REQUEST,
            AllocationCollision { .. }
            | AllocationFatal { .. }
            | InstallFailed { .. }
            | ChunkedInstallUnsupported { .. } => StatusCode::BAD_GATEWAY,
            LedgerWriteFailed { .. } | CompletionMarkFailed { .. } | InternalError { .. } => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn error_response(&self) -> HttpResponse {
        let body = match self {
            ApiError::Provision(e) => ErrorBody {
                status: e.status(),
                stage: e.stage().map(|x| x.to_string()),
                message: e.to_string(),
            },
            ApiError::InvalidRequest(_) => ErrorBody {
                status: 300,
                stage: Some("validation".to_string()),
                message: self.to_string(),
            },
        };
        HttpResponse::build(self.status_code()).json(body)
    }
}
