mod deployment_record;
mod upload_session;

#[rustfmt::skip]
pub use {
    deployment_record::DeploymentRecordRepo,
    upload_session::UploadSessionRepo,
};
