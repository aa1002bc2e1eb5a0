//! REST client for the session backend
//!
//! Every call goes through the offline cache stack, so a GET made while the
//! backend is unreachable is answered from the `api` namespace or turns into
//! an `ApiError` with status 503. Non-2xx responses become
//! [`CockpitError::Api`] carrying the body's `detail`.

use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tower::{Layer, ServiceExt};
use url::Url;

use crate::cache::orchestrator::is_offline_response;
use crate::cache::{FetchRequest, FetchResponse, HttpFetcher, OfflineCacheLayer, OfflineCacheService};
use crate::endpoints::Endpoints;
use crate::error::{CockpitError, Result};

pub mod models;

pub use models::*;

/// Typed client for every backend REST endpoint
#[derive(Debug, Clone)]
pub struct ApiClient {
    endpoints: Endpoints,
    service: OfflineCacheService<HttpFetcher>,
}

/// Build the error for a non-2xx response
///
/// Uses the JSON body's `detail`; a body that is not JSON falls back to the
/// status reason phrase, and a JSON body without a usable `detail` (absent,
/// null, false or empty) to `API error: <status>`.
pub fn api_error(response: &FetchResponse) -> CockpitError {
    let status = response.status.as_u16();
    let fallback = || format!("API error: {}", status);

    let detail = if is_offline_response(response) {
        response.text()
    } else {
        match serde_json::from_slice::<serde_json::Value>(&response.body) {
            Ok(body) => match body.get("detail") {
                Some(serde_json::Value::String(detail)) if !detail.is_empty() => detail.clone(),
                Some(serde_json::Value::String(_))
                | Some(serde_json::Value::Null)
                | Some(serde_json::Value::Bool(false))
                | None => fallback(),
                Some(other) => other.to_string(),
            },
            Err(_) => response
                .status
                .canonical_reason()
                .map(str::to_string)
                .unwrap_or_else(fallback),
        }
    };

    CockpitError::Api { status, detail }
}

impl ApiClient {
    /// Create a client that fetches through `cache` over `fetcher`
    pub fn new(endpoints: Endpoints, fetcher: HttpFetcher, cache: OfflineCacheLayer) -> Self {
        Self {
            endpoints,
            service: cache.layer(fetcher),
        }
    }

    pub fn endpoints(&self) -> &Endpoints {
        &self.endpoints
    }

    /// Send a raw request through the stack
    pub async fn fetch(&self, request: FetchRequest) -> Result<FetchResponse> {
        self.service.clone().oneshot(request).await
    }

    async fn execute<T: DeserializeOwned>(&self, request: FetchRequest) -> Result<T> {
        let method = request.method.clone();
        let url = request.url.clone();
        let response = self.fetch(request).await?;
        if !response.is_ok() {
            let error = api_error(&response);
            tracing::warn!(method = %method, url = %url, error = %error, "API request failed");
            return Err(error.into());
        }
        tracing::debug!(method = %method, url = %url, "API request succeeded");
        response.json()
    }

    async fn get<T: DeserializeOwned>(&self, url: Url) -> Result<T> {
        self.execute(FetchRequest::get(url)).await
    }

    async fn send_json<B: Serialize, T: DeserializeOwned>(
        &self,
        method: Method,
        url: Url,
        body: &B,
    ) -> Result<T> {
        self.execute(FetchRequest::new(method, url).with_json(body)?)
            .await
    }

    async fn send_empty<T: DeserializeOwned>(&self, method: Method, url: Url) -> Result<T> {
        self.execute(FetchRequest::new(method, url)).await
    }

    // Sessions

    pub async fn list_sessions(&self) -> Result<Vec<SessionInfo>> {
        self.get(self.endpoints.api(&["sessions"])).await
    }

    pub async fn create_session(&self, request: &CreateSessionRequest) -> Result<SessionInfo> {
        self.send_json(Method::POST, self.endpoints.api(&["sessions"]), request)
            .await
    }

    pub async fn get_session(&self, id: &str) -> Result<SessionInfo> {
        self.get(self.endpoints.api(&["sessions", id])).await
    }

    /// Send a message to a session over REST
    pub async fn send_message(&self, id: &str, content: &str) -> Result<StatusResponse> {
        let body = SendMessageRequest {
            content: content.to_string(),
        };
        self.send_json(Method::POST, self.endpoints.api(&["sessions", id, "send"]), &body)
            .await
    }

    /// Run a one-shot prompt in a session and wait for its result
    pub async fn send_oneshot(&self, id: &str, content: &str) -> Result<OneshotResponse> {
        let body = SendMessageRequest {
            content: content.to_string(),
        };
        self.send_json(
            Method::POST,
            self.endpoints.api(&["sessions", id, "oneshot"]),
            &body,
        )
        .await
    }

    pub async fn stop_session(&self, id: &str) -> Result<StatusResponse> {
        self.send_empty(Method::DELETE, self.endpoints.api(&["sessions", id]))
            .await
    }

    // Projects

    pub async fn list_projects(&self) -> Result<Vec<ProjectInfo>> {
        self.get(self.endpoints.api(&["projects"])).await
    }

    pub async fn create_project(&self, request: &CreateProjectRequest) -> Result<ProjectInfo> {
        self.send_json(Method::POST, self.endpoints.api(&["projects"]), request)
            .await
    }

    pub async fn get_project(&self, id: &str) -> Result<ProjectInfo> {
        self.get(self.endpoints.api(&["projects", id])).await
    }

    pub async fn update_project(
        &self,
        id: &str,
        request: &UpdateProjectRequest,
    ) -> Result<ProjectInfo> {
        self.send_json(Method::PUT, self.endpoints.api(&["projects", id]), request)
            .await
    }

    pub async fn delete_project(&self, id: &str) -> Result<StatusResponse> {
        self.send_empty(Method::DELETE, self.endpoints.api(&["projects", id]))
            .await
    }

    pub async fn project_sessions(&self, id: &str) -> Result<Vec<SessionInfo>> {
        self.get(self.endpoints.api(&["projects", id, "sessions"]))
            .await
    }

    // Repositories

    pub async fn list_repos(&self) -> Result<Vec<RepoInfo>> {
        self.get(self.endpoints.api(&["repos"])).await
    }

    /// Browse directories on the backend host, starting at `path` or the
    /// backend's default root
    pub async fn browse_directories(&self, path: Option<&str>) -> Result<BrowseResult> {
        let mut url = self.endpoints.api(&["repos", "browse"]);
        if let Some(path) = path.filter(|p| !p.is_empty()) {
            url.query_pairs_mut().append_pair("path", path);
        }
        self.get(url).await
    }

    // Accounts

    pub async fn list_accounts(&self) -> Result<Vec<AccountInfo>> {
        self.get(self.endpoints.api(&["accounts"])).await
    }

    pub async fn reset_account_limit(&self, id: &str) -> Result<StatusResponse> {
        self.send_empty(
            Method::POST,
            self.endpoints.api(&["accounts", id, "reset-limit"]),
        )
        .await
    }

    pub async fn auth_status(&self, id: &str) -> Result<AuthStatusResponse> {
        self.get(self.endpoints.api(&["accounts", id, "auth-status"]))
            .await
    }

    pub async fn start_authentication(&self, id: &str) -> Result<StartAuthResponse> {
        self.send_empty(
            Method::POST,
            self.endpoints.api(&["accounts", id, "authenticate"]),
        )
        .await
    }

    pub async fn confirm_auth(&self, id: &str) -> Result<AuthConfirmResponse> {
        self.send_empty(
            Method::POST,
            self.endpoints.api(&["accounts", id, "auth-confirm"]),
        )
        .await
    }

    // Health

    pub async fn health(&self) -> Result<HealthResponse> {
        self.get(self.endpoints.api(&["health"])).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::layer::API_OFFLINE_MESSAGE;
    use reqwest::StatusCode;

    #[test]
    fn test_api_error_uses_detail() {
        let response = FetchResponse::new(StatusCode::NOT_FOUND, r#"{"detail":"Session not found"}"#);
        let error = api_error(&response);
        assert!(error.is_api_status(404));
        assert_eq!(error.to_string(), "API error (404): Session not found");
    }

    #[test]
    fn test_api_error_falls_back_to_reason_phrase() {
        let response = FetchResponse::new(StatusCode::BAD_GATEWAY, "<html>bad gateway</html>");
        match api_error(&response) {
            CockpitError::Api { status, detail } => {
                assert_eq!(status, 502);
                assert_eq!(detail, "Bad Gateway");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_api_error_json_without_detail() {
        let response = FetchResponse::new(StatusCode::INTERNAL_SERVER_ERROR, r#"{"error":"x"}"#);
        match api_error(&response) {
            CockpitError::Api { detail, .. } => assert_eq!(detail, "API error: 500"),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_api_error_empty_detail_uses_status() {
        for body in [r#"{"detail":""}"#, r#"{"detail":null}"#] {
            let response = FetchResponse::new(StatusCode::BAD_REQUEST, body);
            match api_error(&response) {
                CockpitError::Api { detail, .. } => assert_eq!(detail, "API error: 400"),
                other => panic!("unexpected error: {:?}", other),
            }
        }
    }

    #[test]
    fn test_api_error_for_offline_response() {
        let response = FetchResponse::offline(API_OFFLINE_MESSAGE);
        match api_error(&response) {
            CockpitError::Api { status, detail } => {
                assert_eq!(status, 503);
                assert_eq!(detail, API_OFFLINE_MESSAGE);
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_api_error_validation_detail_is_rendered() {
        let response = FetchResponse::new(
            StatusCode::UNPROCESSABLE_ENTITY,
            r#"{"detail":[{"msg":"field required"}]}"#,
        );
        match api_error(&response) {
            CockpitError::Api { detail, .. } => assert!(detail.contains("field required")),
            other => panic!("unexpected error: {:?}", other),
        }
    }
}
