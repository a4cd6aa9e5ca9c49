use serde::{Deserialize, Serialize};

/// One transport-sized slice of a compressed payload.
#[derive(Debug, Clone)]
pub struct Fragment {
    pub session_id: String,
    /// Position of the fragment, in `[0, chunk_count)`.
    pub index: u64,
    pub content: Vec<u8>,
}

/// Progress reported back to the uploader after a fragment is stored.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct FragmentReceipt {
    pub index: u64,
    pub uploaded_count: u64,
    pub total_count: u64,
}
