use serde::{Deserialize, Serialize};

/// Full hex digest of a decompressed module.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContentHash(String);

impl ContentHash {
    pub fn new(hex: impl Into<String>) -> Self {
        Self(hex.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Prefix used for display, never for identity.
    pub fn truncated(&self, len: usize) -> &str {
        let end = len.min(self.0.len());
        &self.0[..end]
    }
}

impl std::fmt::Display for ContentHash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A reassembled, decompressed and hashed module, ready to install.
#[derive(Debug, Clone)]
pub struct VerifiedModule {
    pub bytes: Vec<u8>,
    /// SHA-256 of `bytes`.
    pub content_hash: ContentHash,
    pub original_size: u64,
    pub compressed_size: u64,
}
