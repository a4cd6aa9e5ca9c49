mod content_verifier;
mod deployment_ledger;
mod fragment_store;
mod provisioning;
mod upload_session;

#[rustfmt::skip]
pub use {
    content_verifier::ContentVerifierServiceImpl,
    deployment_ledger::DeploymentLedgerServiceImpl,
    fragment_store::LocalFragmentStoreImpl,
    provisioning::{ProvisioningServiceImpl, DIRECT_INSTALL_CEILING, STAGING_CHUNK_SIZE},
    upload_session::UploadSessionServiceImpl,
};
