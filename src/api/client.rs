//! Authenticated HTTP executor for one backend service
//!
//! [`ServiceClient`] performs a single API call with a guaranteed-valid
//! bearer token and the owning service's header conventions, and classifies
//! the outcome: raw bytes for 2xx, a status-coded [`ApiError`] otherwise.
//! Obtaining the token may transparently refresh or re-authenticate the
//! session; callers only see the added latency.

use log::debug;
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;

use super::auth::SessionManager;
use super::constants::headers;
use super::error::{ApiError, ApiErrorBody};
use super::models::ServiceKind;
use super::resilience::{RetryConfig, RetryPolicy};

/// Raw response of a successful API call
#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

impl ApiResponse {
    /// Deserialize the response body
    pub fn json<T: DeserializeOwned>(&self) -> serde_json::Result<T> {
        serde_json::from_slice(&self.body)
    }
}

/// Issues authenticated requests against one backend service
#[derive(Debug)]
pub struct ServiceClient {
    session: Arc<SessionManager>,
    retry_policy: RetryPolicy,
}

impl ServiceClient {
    pub fn new(session: Arc<SessionManager>, retry_config: RetryConfig) -> Self {
        Self {
            session,
            retry_policy: RetryPolicy::new(retry_config),
        }
    }

    pub fn service(&self) -> ServiceKind {
        self.session.service()
    }

    pub fn session(&self) -> &Arc<SessionManager> {
        &self.session
    }

    /// Best-effort logout of the underlying session
    pub async fn logout(&self) {
        self.session.logout().await;
    }

    pub async fn get(&self, url: &str) -> Result<ApiResponse, ApiError> {
        self.request(Method::GET, url, None).await
    }

    pub async fn post(&self, url: &str, body: &Value) -> Result<ApiResponse, ApiError> {
        self.request(Method::POST, url, Some(body)).await
    }

    pub async fn put(&self, url: &str, body: &Value) -> Result<ApiResponse, ApiError> {
        self.request(Method::PUT, url, Some(body)).await
    }

    pub async fn delete(&self, url: &str) -> Result<ApiResponse, ApiError> {
        self.request(Method::DELETE, url, None).await
    }

    /// Perform one authenticated call. `url` may be absolute or a path
    /// relative to the service base URL (resource paths embed the API
    /// version where the service expects it; they are treated as opaque
    /// here). Transport failures and retryable statuses go through the
    /// client's retry policy; whatever response survives it is classified
    /// uniformly.
    pub async fn request(
        &self,
        method: Method,
        url: &str,
        body: Option<&Value>,
    ) -> Result<ApiResponse, ApiError> {
        let token = self.session.get_valid_token().await?;
        let url = self.resolve_url(url);

        let response = self
            .retry_policy
            .execute(|| async {
                let mut request = self
                    .session
                    .http_client()
                    .request(method.clone(), &url)
                    .bearer_auth(&token)
                    .header("Accept", headers::CONTENT_TYPE_JSON);
                request = self.version_header(request);
                if let Some(body) = body {
                    request = request
                        .header("Content-Type", headers::CONTENT_TYPE_JSON)
                        .json(body);
                }
                request.send().await
            })
            .await?;

        let status = response.status().as_u16();
        debug!("{} {} -> HTTP {}", method, url, status);

        let bytes = response.bytes().await?;
        if (200..300).contains(&status) {
            Ok(ApiResponse {
                status,
                body: bytes.to_vec(),
            })
        } else {
            let detail = serde_json::from_slice::<ApiErrorBody>(&bytes)
                .ok()
                .filter(ApiErrorBody::is_structured);
            Err(ApiError::HttpStatus {
                status,
                body: String::from_utf8_lossy(&bytes).into_owned(),
                detail,
            })
        }
    }

    fn resolve_url(&self, url: &str) -> String {
        if url.starts_with("http://") || url.starts_with("https://") {
            url.to_string()
        } else {
            format!("{}{}", self.session.base_url(), url)
        }
    }

    /// Attach the service's API version header. Azure Backup expects
    /// `X-API-Version` on data calls; VBR expects `x-api-version`.
    fn version_header(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match self.service() {
            ServiceKind::Azure => {
                request.header(headers::AZURE_API_VERSION, self.session.api_version())
            }
            ServiceKind::Vbr => {
                request.header(headers::VBR_API_VERSION, self.session.api_version())
            }
        }
    }
}
