use actix_web::{get, post, web, HttpRequest, HttpResponse};
use domain_provisioning::model::{
    entity::{DeploymentRecord, UploadSession},
    vo::{DeploymentReceipt, Fragment, FragmentReceipt},
};

use super::{
    caller_identity,
    dtos::{OpenUploadRequest, RecordsQuery},
    response::{ApiError, ApiResult},
};
use crate::infrastructure::ServiceProvider;

#[post("OpenUpload")]
pub async fn open_upload(
    sp: web::Data<ServiceProvider>,
    req: HttpRequest,
    data: web::Json<OpenUploadRequest>,
) -> ApiResult<String> {
    let cmd = data.into_inner().into_command(&caller_identity(&req));
    let session_id = sp.session_service.open(cmd).await?;
    Ok(web::Json(session_id))
}

#[post("UploadFragment/{session_id}/{index}")]
pub async fn upload_fragment(
    sp: web::Data<ServiceProvider>,
    path: web::Path<(String, u64)>,
    body: web::Bytes,
) -> ApiResult<FragmentReceipt> {
    let (session_id, index) = path.into_inner();
    let receipt = sp
        .session_service
        .upload_fragment(Fragment {
            session_id,
            index,
            content: body.to_vec(),
        })
        .await?;
    Ok(web::Json(receipt))
}

#[get("UploadStatus/{session_id}")]
pub async fn get_upload_status(
    sp: web::Data<ServiceProvider>,
    session_id: web::Path<String>,
) -> ApiResult<Option<UploadSession>> {
    Ok(web::Json(sp.session_service.status(&session_id).await?))
}

#[post("Finalize/{session_id}")]
pub async fn finalize(
    sp: web::Data<ServiceProvider>,
    session_id: web::Path<String>,
) -> ApiResult<DeploymentReceipt> {
    Ok(web::Json(sp.provisioning_service.finalize(&session_id).await?))
}

#[post("DeploySingleBlob")]
pub async fn deploy_single_blob(
    sp: web::Data<ServiceProvider>,
    req: HttpRequest,
    body: web::Bytes,
) -> ApiResult<DeploymentReceipt> {
    if body.is_empty() {
        return Err(ApiError::InvalidRequest("module body is empty".to_string()));
    }
    let receipt = sp
        .provisioning_service
        .deploy_single_blob(body.to_vec(), &caller_identity(&req))
        .await?;
    Ok(web::Json(receipt))
}

#[post("AbandonUpload/{session_id}")]
pub async fn abandon_upload(
    sp: web::Data<ServiceProvider>,
    session_id: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    sp.session_service.abandon(&session_id).await?;
    Ok(HttpResponse::NoContent().finish())
}

#[get("Records")]
pub async fn get_records(
    sp: web::Data<ServiceProvider>,
    query: web::Query<RecordsQuery>,
) -> ApiResult<Vec<DeploymentRecord>> {
    let records = match query.into_inner().hash_prefix {
        Some(prefix) => sp.ledger_service.find_by_hash_prefix(&prefix).await?,
        None => sp.ledger_service.list().await?,
    };
    Ok(web::Json(records))
}
