use serde::{Deserialize, Serialize};

/// Steps of one finalize call.
///
/// A finalize walks `Validating → Reassembling → Allocating → Installing →
/// Recording → Done`; a failure at any step ends the call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FinalizeStage {
    Validating,
    Reassembling,
    Allocating,
    Installing,
    Recording,
    Done,
}

impl std::fmt::Display for FinalizeStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validating => write!(f, "validation"),
            Self::Reassembling => write!(f, "reassembly"),
            Self::Allocating => write!(f, "allocation"),
            Self::Installing => write!(f, "install"),
            Self::Recording => write!(f, "recording"),
            Self::Done => write!(f, "done"),
        }
    }
}
