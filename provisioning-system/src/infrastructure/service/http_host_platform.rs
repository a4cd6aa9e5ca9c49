use std::sync::Arc;

use anyhow::anyhow;
use async_trait::async_trait;
use domain_provisioning::{
    exception::{HostCallError, HostCallResult},
    model::vo::{ChunkHandle, InstallMode, ResourceBudget},
    service::HostPlatform,
};
use reqwest::{header::AUTHORIZATION, Method, RequestBuilder, Response, StatusCode};
use serde::{Deserialize, Serialize};
use url::Url;

/// [`HostPlatform`] over the platform's HTTP management API.
pub struct HttpHostPlatform {
    client: Arc<reqwest::Client>,
    endpoint: Url,
    auth_token: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct AllocateRequest<'a> {
    cycles: u64,
    controller: &'a str,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct AllocateResponse {
    unit_id: String,
}

#[derive(Deserialize)]
struct StageResponse {
    handle: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct InstallChunkedRequest<'a> {
    mode: InstallMode,
    chunk_handles: &'a [ChunkHandle],
    #[serde(skip_serializing_if = "Option::is_none")]
    module_hash: Option<String>,
    /// Hex.
    init_arg: String,
}

#[derive(Deserialize, Default)]
struct ErrorBody {
    #[serde(default)]
    code: String,
    #[serde(default)]
    message: String,
}

/// Map a failed response onto the host error taxonomy.
fn classify(status: StatusCode, body: &str) -> HostCallError {
    let error = serde_json::from_str::<ErrorBody>(body).unwrap_or_else(|_| ErrorBody {
        message: body.trim().to_string(),
        ..Default::default()
    });
    let message = if error.message.is_empty() {
        status.to_string()
    } else {
        error.message
    };
    if status == StatusCode::CONFLICT || error.code == "id_collision" {
        HostCallError::IdCollision { message }
    } else if status == StatusCode::NOT_IMPLEMENTED || error.code == "chunked_install_unsupported" {
        HostCallError::ChunkedInstallUnsupported { message }
    } else {
        HostCallError::Rejected {
            code: status.as_u16(),
            message,
        }
    }
}

impl HttpHostPlatform {
    pub fn new(
        client: Arc<reqwest::Client>,
        endpoint: &str,
        auth_token: Option<String>,
    ) -> anyhow::Result<Self> {
        let endpoint = Url::parse(endpoint)?;
        if endpoint.cannot_be_a_base() {
            anyhow::bail!("host platform endpoint {endpoint} can't be a base url");
        }
        Ok(Self {
            client,
            endpoint,
            auth_token,
        })
    }

    fn url(&self, segments: &[&str]) -> HostCallResult<Url> {
        let mut url = self.endpoint.clone();
        url.path_segments_mut()
            .map_err(|_| anyhow!("endpoint {} can't be a base url", self.endpoint))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        let request = self.client.request(method, url);
        match &self.auth_token {
            Some(token) => request.header(AUTHORIZATION, format!("Bearer {token}")),
            None => request,
        }
    }

    async fn send(&self, request: RequestBuilder) -> HostCallResult<Response> {
        let response = request.send().await.map_err(anyhow::Error::from)?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(classify(status, &body))
    }
}

#[async_trait]
impl HostPlatform for HttpHostPlatform {
    async fn allocate_unit(
        &self,
        budget: ResourceBudget,
        controller: &str,
    ) -> HostCallResult<String> {
        let request = self.request(Method::POST, self.url(&["units"])?).json(&AllocateRequest {
            cycles: budget.cycles,
            controller,
        });
        let response: AllocateResponse =
            self.send(request).await?.json().await.map_err(anyhow::Error::from)?;
        Ok(response.unit_id)
    }

    async fn install_module(
        &self,
        unit_id: &str,
        mode: InstallMode,
        module: &[u8],
        init_arg: &[u8],
    ) -> HostCallResult<()> {
        let request = self
            .request(Method::POST, self.url(&["units", unit_id, "install"])?)
            .query(&[("mode", mode.to_string()), ("initArg", hex::encode(init_arg))])
            .header(reqwest::header::CONTENT_TYPE, "application/wasm")
            .body(module.to_vec());
        self.send(request).await?;
        Ok(())
    }

    async fn stage_chunk(&self, unit_id: &str, chunk: &[u8]) -> HostCallResult<ChunkHandle> {
        let request = self
            .request(Method::POST, self.url(&["units", unit_id, "chunks"])?)
            .header(reqwest::header::CONTENT_TYPE, "application/octet-stream")
            .body(chunk.to_vec());
        let response: StageResponse =
            self.send(request).await?.json().await.map_err(anyhow::Error::from)?;
        Ok(ChunkHandle(response.handle))
    }

    async fn install_from_chunks(
        &self,
        unit_id: &str,
        mode: InstallMode,
        handles: &[ChunkHandle],
        module_hash: Option<String>,
        init_arg: &[u8],
    ) -> HostCallResult<()> {
        let request = self
            .request(Method::POST, self.url(&["units", unit_id, "install-chunked"])?)
            .json(&InstallChunkedRequest {
                mode,
                chunk_handles: handles,
                module_hash,
                init_arg: hex::encode(init_arg),
            });
        self.send(request).await?;
        Ok(())
    }

    async fn clear_chunk_staging(&self, unit_id: &str) -> HostCallResult<()> {
        let request = self.request(Method::DELETE, self.url(&["units", unit_id, "chunks"])?);
        self.send(request).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn platform(endpoint: &str) -> HttpHostPlatform {
        HttpHostPlatform::new(Arc::new(reqwest::Client::new()), endpoint, None).unwrap()
    }

    #[test]
    fn conflict_is_an_id_collision() {
        let e = classify(StatusCode::CONFLICT, r#"{"message":"taken"}"#);
        assert!(matches!(e, HostCallError::IdCollision { message } if message == "taken"));
        let e = classify(StatusCode::BAD_REQUEST, r#"{"code":"id_collision","message":"taken"}"#);
        assert!(matches!(e, HostCallError::IdCollision { .. }));
    }

    #[test]
    fn not_implemented_is_unsupported_chunking() {
        let e = classify(StatusCode::NOT_IMPLEMENTED, "");
        assert!(matches!(e, HostCallError::ChunkedInstallUnsupported { .. }));
        let e = classify(
            StatusCode::BAD_REQUEST,
            r#"{"code":"chunked_install_unsupported","message":"no"}"#,
        );
        assert!(matches!(e, HostCallError::ChunkedInstallUnsupported { .. }));
    }

    #[test]
    fn other_failures_are_rejections_with_plain_text() {
        match classify(StatusCode::FORBIDDEN, "not a controller\n") {
            HostCallError::Rejected { code, message } => {
                assert_eq!(code, 403);
                assert_eq!(message, "not a controller");
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn urls_escape_unit_ids() {
        let host = platform("http://host:4943/api/");
        let url = host.url(&["units", "a/b", "install"]).unwrap();
        assert_eq!(url.as_str(), "http://host:4943/api/units/a%2Fb/install");
        let host = platform("http://host:4943/api");
        assert_eq!(host.url(&["units"]).unwrap().as_str(), "http://host:4943/api/units");
    }

    #[test]
    fn non_base_endpoints_are_refused() {
        assert!(HttpHostPlatform::new(Arc::new(reqwest::Client::new()), "mailto:x@y", None).is_err());
    }

    #[test]
    fn chunked_install_body_is_camel_case() {
        let handles = [ChunkHandle("h1".to_string())];
        let json = serde_json::to_value(InstallChunkedRequest {
            mode: InstallMode::Upgrade,
            chunk_handles: &handles,
            module_hash: Some("ab".to_string()),
            init_arg: hex::encode([1u8]),
        })
        .unwrap();
        assert_eq!(
            json,
            serde_json::json!({"mode":"upgrade","chunkHandles":["h1"],"moduleHash":"ab","initArg":"01"})
        );
    }
}
