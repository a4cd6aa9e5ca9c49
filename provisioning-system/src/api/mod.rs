use actix_web::{web, HttpRequest};

pub mod deployment;
pub mod dtos;
pub mod response;

/// Header naming the caller, recorded as the uploader of new sessions.
pub const CALLER_IDENTITY_HEADER: &str = "X-Caller-Identity";

fn caller_identity(req: &HttpRequest) -> String {
    req.headers()
        .get(CALLER_IDENTITY_HEADER)
        .and_then(|x| x.to_str().ok())
        .map(str::trim)
        .filter(|x| !x.is_empty())
        .unwrap_or("anonymous")
        .to_string()
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("deployment")
            .service(deployment::open_upload)
            .service(deployment::upload_fragment)
            .service(deployment::get_upload_status)
            .service(deployment::finalize)
            .service(deployment::deploy_single_blob)
            .service(deployment::abandon_upload)
            .service(deployment::get_records),
    );
}
