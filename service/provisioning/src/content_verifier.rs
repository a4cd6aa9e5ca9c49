use std::io::Read;

use domain_provisioning::{
    exception::{ProvisionException, ProvisionResult},
    model::vo::{ContentHash, HashAlgorithm, TransportDigest, VerifiedModule},
    service::ContentVerifierService,
};
use flate2::read::GzDecoder;
use sha2::{Digest, Sha256};
use typed_builder::TypedBuilder;

/// Verifier for gzip-compressed modules.
#[derive(TypedBuilder)]
pub struct ContentVerifierServiceImpl {
    /// Largest decompressed module accepted, in bytes.
    #[builder(default = 100 * 1024 * 1024)]
    max_module_size: u64,
}

pub(crate) fn hex_digest(algorithm: HashAlgorithm, content: &[u8]) -> String {
    match algorithm {
        HashAlgorithm::Blake3 => blake3::hash(content).to_hex().to_string(),
        HashAlgorithm::Sha256 => hex::encode(Sha256::digest(content)),
    }
}

impl ContentVerifierServiceImpl {
    fn decompress(&self, compressed: &[u8]) -> ProvisionResult<Vec<u8>> {
        if compressed.is_empty() {
            return Err(ProvisionException::DecompressionFailed {
                reason: "payload is empty".to_string(),
            });
        }
        let mut module = vec![];
        GzDecoder::new(compressed)
            .take(self.max_module_size + 1)
            .read_to_end(&mut module)
            .map_err(|e| ProvisionException::DecompressionFailed {
                reason: e.to_string(),
            })?;
        if module.len() as u64 > self.max_module_size {
            return Err(ProvisionException::DecompressionFailed {
                reason: format!(
                    "decompressed module exceeds {} bytes",
                    self.max_module_size
                ),
            });
        }
        Ok(module)
    }
}

impl ContentVerifierService for ContentVerifierServiceImpl {
    fn reassemble_and_verify(
        &self,
        fragments: Vec<Vec<u8>>,
        expected_total_size: u64,
        digest: Option<TransportDigest>,
    ) -> ProvisionResult<VerifiedModule> {
        let compressed = fragments.concat();
        let compressed_size = compressed.len() as u64;
        if compressed_size != expected_total_size {
            return Err(ProvisionException::FragmentSizeMismatch {
                expected: expected_total_size,
                actual: compressed_size,
            });
        }
        if let Some(digest) = digest {
            let completed = hex_digest(digest.algorithm, &compressed);
            if completed != digest.hash {
                return Err(ProvisionException::UnmatchedDigest {
                    algorithm: digest.algorithm.to_string(),
                    provided: digest.hash,
                    completed,
                });
            }
        }
        let bytes = self.decompress(&compressed)?;
        let content_hash = ContentHash::new(hex_digest(HashAlgorithm::Sha256, &bytes));
        Ok(VerifiedModule {
            original_size: bytes.len() as u64,
            compressed_size,
            content_hash,
            bytes,
        })
    }
}
