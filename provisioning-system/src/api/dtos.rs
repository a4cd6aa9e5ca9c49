use domain_provisioning::{
    command::OpenUploadCommand,
    model::vo::{HashAlgorithm, TransportDigest},
};
use serde::Deserialize;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenUploadRequest {
    pub total_size: u64,
    pub chunk_count: u64,
    /// Expected digest of the whole compressed payload.
    #[serde(default)]
    pub hash: Option<String>,
    #[serde(default)]
    pub hash_algorithm: Option<HashAlgorithm>,
}

impl OpenUploadRequest {
    pub fn into_command(self, uploader: &str) -> OpenUploadCommand {
        let cmd = OpenUploadCommand::new(self.total_size, self.chunk_count, uploader);
        match self.hash {
            Some(hash) => cmd.with_digest(TransportDigest::new(
                self.hash_algorithm.unwrap_or_default(),
                &hash,
            )),
            None => cmd,
        }
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordsQuery {
    #[serde(default)]
    pub hash_prefix: Option<String>,
}
