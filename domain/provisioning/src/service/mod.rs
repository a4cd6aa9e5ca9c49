mod content_verifier;
mod deployment_ledger;
mod fragment_store;
mod host_platform;
mod provisioning;
mod upload_session;

#[rustfmt::skip]
pub use {
    content_verifier::ContentVerifierService,
    deployment_ledger::DeploymentLedgerService,
    fragment_store::FragmentStore,
    host_platform::HostPlatform,
    provisioning::ProvisioningService,
    upload_session::UploadSessionService,
};
