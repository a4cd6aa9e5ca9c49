use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::vo::{ContentHash, VerifiedModule};

/// Audit entry of one successful provisioning.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DeploymentRecord {
    /// Identifier assigned by the host platform.
    pub unit_id: String,
    /// Display prefix of `full_hash`.
    pub content_hash: String,
    pub full_hash: ContentHash,
    pub deployed_at: DateTime<Utc>,
    pub original_size: u64,
    pub compressed_size: u64,
    pub session_id: String,
}

impl DeploymentRecord {
    pub fn new(
        unit_id: &str,
        session_id: &str,
        module: &VerifiedModule,
        hash_display_len: usize,
    ) -> Self {
        Self {
            unit_id: unit_id.to_owned(),
            content_hash: module.content_hash.truncated(hash_display_len).to_owned(),
            full_hash: module.content_hash.clone(),
            deployed_at: Utc::now(),
            original_size: module.original_size,
            compressed_size: module.compressed_size,
            session_id: session_id.to_owned(),
        }
    }

    /// Ledger key, unique across repeated deployments of identical content.
    pub fn key(&self) -> String {
        format!("{}_{}", self.full_hash, self.deployed_at.timestamp_micros())
    }
}
