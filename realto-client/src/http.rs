//! HTTP plumbing for the back-office API
//!
//! Shared client construction, typed response envelopes, and the auth
//! interceptor that fronts every outbound request: it injects the current
//! token as a header and turns a 401 into a forced logout before re-raising
//! the error unchanged.

use async_trait::async_trait;
use log::{debug, warn};
use realto_core::{ApiConfig, ErrorContext, RealtoError, RealtoResult, UserProfile, TOKEN_HEADER};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, RwLock};

use crate::session::SessionState;

/// Response envelope every endpoint wraps its payload in
#[derive(Debug, Clone, Deserialize)]
pub struct ApiEnvelope<T> {
    pub data: T,
}

/// Payload of a successful login
#[derive(Debug, Clone, Deserialize)]
pub struct LoginPayload {
    pub token: String,
    pub user: UserProfile,
}

/// One page of a paginated list
#[derive(Debug, Clone, Deserialize)]
pub struct ListPayload<T> {
    pub items: Vec<T>,
    pub pages: u32,
    #[serde(rename = "totalCount")]
    pub total_count: u64,
}

/// Stand-in for the application router: where to send the user after a
/// forced logout.
pub trait Navigator: Send + Sync {
    fn to_login(&self);
}

/// Handler awaited exactly once per 401 response, before the error is
/// re-raised to the original caller.
#[async_trait]
pub trait OnUnauthorized: Send + Sync {
    async fn on_unauthorized(&self);
}

/// Helper function to create HTTP client with common configuration
pub fn create_http_client(config: &ApiConfig) -> RealtoResult<reqwest::Client> {
    let mut headers = reqwest::header::HeaderMap::new();

    headers.insert(
        reqwest::header::USER_AGENT,
        reqwest::header::HeaderValue::from_str(&config.user_agent).map_err(|e| {
            RealtoError::Config {
                message: format!("Invalid user agent: {}", e),
                source: Some(Box::new(e)),
                context: ErrorContext::new("http_client").with_operation("create_client"),
            }
        })?,
    );

    let client = reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(config.timeout_seconds))
        .default_headers(headers)
        .build()
        .map_err(|e| RealtoError::Network {
            message: format!("Failed to create HTTP client: {}", e),
            status: None,
            source: Some(Box::new(e)),
            context: ErrorContext::new("http_client").with_operation("create_client"),
        })?;

    Ok(client)
}

/// Middleware around every outbound request
///
/// Consults the shared session state on each call; never swallows an error,
/// only observes and reacts to it. The unauthorized handler is installed
/// after construction by the composition root, which breaks the
/// manager/interceptor dependency cycle without ambient globals.
pub struct AuthInterceptor {
    state: SessionState,
    handler: RwLock<Option<Arc<dyn OnUnauthorized>>>,
}

impl AuthInterceptor {
    pub fn new(state: SessionState) -> Self {
        Self {
            state,
            handler: RwLock::new(None),
        }
    }

    pub fn install_unauthorized_handler(&self, handler: Arc<dyn OnUnauthorized>) {
        *self.handler.write().unwrap() = Some(handler);
    }

    /// Add the token header when a session is active; otherwise pass the
    /// request through unmodified.
    fn decorate(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        if self.state.is_authenticated() {
            request.header(TOKEN_HEADER, self.state.token())
        } else {
            request
        }
    }

    /// Send the request and map failures into the error taxonomy.
    pub async fn execute(
        &self,
        request: reqwest::RequestBuilder,
    ) -> RealtoResult<reqwest::Response> {
        let response = self.decorate(request).send().await.map_err(|e| {
            RealtoError::Network {
                message: format!("Request failed: {}", e),
                status: e.status().map(|s| s.as_u16()),
                source: Some(Box::new(e)),
                context: ErrorContext::new("auth_interceptor").with_operation("execute"),
            }
        })?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let url = response.url().to_string();
        let body = response.text().await.unwrap_or_default();

        Err(self.fail_for_status(status.as_u16(), &url, body).await)
    }

    /// Build the error for a non-success status. A 401 additionally fires
    /// the forced-logout handler exactly once before the error is returned.
    async fn fail_for_status(&self, status: u16, url: &str, body: String) -> RealtoError {
        if status == 401 {
            debug!("401 from {}, forcing logout", url);
            self.fire_unauthorized().await;

            return RealtoError::Authentication {
                message: format!("Unauthorized request to {}", url),
                context: ErrorContext::new("auth_interceptor")
                    .with_operation("execute")
                    .with_suggestion("Log in again"),
            };
        }

        RealtoError::Network {
            message: format!(
                "HTTP {} error for {}: {}",
                status,
                url,
                if body.is_empty() { "no body" } else { &body }
            ),
            status: Some(status),
            source: None,
            context: ErrorContext::new("auth_interceptor")
                .with_operation("execute")
                .with_suggestion(match status {
                    403 => "Check account permissions",
                    404 => "Resource not found or not accessible",
                    _ => "Check network connectivity and API status",
                }),
        }
    }

    async fn fire_unauthorized(&self) {
        let handler = self.handler.read().unwrap().clone();

        match handler {
            Some(handler) => handler.on_unauthorized().await,
            None => warn!("401 received but no unauthorized handler is installed"),
        }
    }
}

/// Typed gateway over the interceptor used by all endpoint groups
#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    interceptor: Arc<AuthInterceptor>,
}

impl ApiClient {
    pub fn new(config: &ApiConfig, interceptor: Arc<AuthInterceptor>) -> RealtoResult<Self> {
        let http = create_http_client(config)?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            interceptor,
        })
    }

    pub fn interceptor(&self) -> &Arc<AuthInterceptor> {
        &self.interceptor
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    pub async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(String, String)],
    ) -> RealtoResult<T> {
        let request = self.http.get(self.url(path)).query(query);
        let response = self.interceptor.execute(request).await?;

        Self::decode(response, path).await
    }

    pub async fn post_json<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> RealtoResult<T> {
        let request = self.http.post(self.url(path)).json(body);
        let response = self.interceptor.execute(request).await?;

        Self::decode(response, path).await
    }

    pub async fn put_json<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> RealtoResult<T> {
        let request = self.http.put(self.url(path)).json(body);
        let response = self.interceptor.execute(request).await?;

        Self::decode(response, path).await
    }

    pub async fn delete(&self, path: &str) -> RealtoResult<()> {
        let request = self.http.delete(self.url(path));
        self.interceptor.execute(request).await?;

        Ok(())
    }

    async fn decode<T: DeserializeOwned>(
        response: reqwest::Response,
        path: &str,
    ) -> RealtoResult<T> {
        response.json::<T>().await.map_err(|e| RealtoError::Network {
            message: format!("Failed to decode response from {}: {}", path, e),
            status: None,
            source: Some(Box::new(e)),
            context: ErrorContext::new("api_client").with_operation("decode_response"),
        })
    }
}
