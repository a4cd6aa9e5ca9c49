use serde::{Deserialize, Serialize};

use crate::model::entity::DeploymentRecord;

/// Result of a successful finalize.
///
/// The unit is live whenever a receipt exists. `warnings` lists bookkeeping
/// steps that failed afterwards, so the ledger or session state may lag.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeploymentReceipt {
    #[serde(flatten)]
    pub record: DeploymentRecord,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}
