use anyhow::bail;
use serde::{Deserialize, Serialize};

/// Hash algorithm of a caller-provided transport digest.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum HashAlgorithm {
    #[default]
    Blake3,
    Sha256,
}

impl std::fmt::Display for HashAlgorithm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Blake3 => write!(f, "blake3"),
            Self::Sha256 => write!(f, "sha256"),
        }
    }
}

impl std::str::FromStr for HashAlgorithm {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "blake3" => Ok(Self::Blake3),
            "sha256" => Ok(Self::Sha256),
            _ => bail!("{s} can't be transformed to HashAlgorithm"),
        }
    }
}

/// Expected digest of the compressed payload, checked after reassembly.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct TransportDigest {
    pub algorithm: HashAlgorithm,
    /// Lowercase hex.
    pub hash: String,
}

impl TransportDigest {
    pub fn new(algorithm: HashAlgorithm, hash: &str) -> Self {
        Self {
            algorithm,
            hash: hash.trim().to_lowercase(),
        }
    }
}
