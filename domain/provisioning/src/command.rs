use serde::{Deserialize, Serialize};

use crate::model::vo::TransportDigest;

/// Open a new upload session.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenUploadCommand {
    /// Size of the compressed payload, in bytes.
    pub total_size: u64,
    pub chunk_count: u64,
    pub uploader: String,
    #[serde(default)]
    pub digest: Option<TransportDigest>,
}

impl OpenUploadCommand {
    pub fn new(total_size: u64, chunk_count: u64, uploader: &str) -> Self {
        Self {
            total_size,
            chunk_count,
            uploader: uploader.to_owned(),
            digest: None,
        }
    }

    pub fn with_digest(mut self, digest: TransportDigest) -> Self {
        self.digest = Some(digest);
        self
    }
}
