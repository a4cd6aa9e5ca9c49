use crate::exception::ProvisionResult;
use crate::model::vo::{TransportDigest, VerifiedModule};

/// # Content verifier
///
/// Turns the ordered fragments of a session into an installable module.
pub trait ContentVerifierService: Send + Sync {
    /// Concatenate `fragments` in the given order, check the length against
    /// `expected_total_size` and the optional transport digest, decompress and
    /// hash the result.
    fn reassemble_and_verify(
        &self,
        fragments: Vec<Vec<u8>>,
        expected_total_size: u64,
        digest: Option<TransportDigest>,
    ) -> ProvisionResult<VerifiedModule>;
}
