//! # API Gateway Client
//!
//! The one place requests leave the process.
//!
//! ## Request Pipeline
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                          Request Pipeline                               │
//! │                                                                         │
//! │  service call                                                           │
//! │      │                                                                  │
//! │      ▼                                                                  │
//! │  base_url + path, query params (empty values already dropped)          │
//! │      │                                                                  │
//! │      ▼                                                                  │
//! │  Authorization: Bearer <token>   (when a session exists)               │
//! │      │                                                                  │
//! │      ▼                                                                  │
//! │  reqwest ──► transport error ──────────────────► ClientError::Transport │
//! │      │                                                                  │
//! │      ▼                                                                  │
//! │  2xx ──► decode JSON / bytes                                            │
//! │  401 ──► path is /login? ── no ──► SessionContext::expire()            │
//! │      │                     yes ──► credential rejection only            │
//! │  4xx/5xx ──► message from detail | message | raw body | fallback       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! No retries, no backoff. The only timeout is the optional one from
//! [`ApiSettings`](crate::config::ApiSettings).

use reqwest::{Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, error};

use crate::config::ConsoleConfig;
use crate::error::{ClientError, ClientResult, GENERIC_ERROR_MESSAGE};
use crate::session::SessionContext;

// =============================================================================
// Query Parameters
// =============================================================================

/// Query string builder that drops absent and empty values.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Params(Vec<(String, String)>);

impl Params {
    pub fn new() -> Self {
        Self::default()
    }

    /// Always included.
    pub fn with(mut self, key: &str, value: impl ToString) -> Self {
        self.0.push((key.to_string(), value.to_string()));
        self
    }

    /// Included only when present and not blank.
    pub fn opt<V: ToString>(mut self, key: &str, value: Option<V>) -> Self {
        if let Some(value) = value {
            let value = value.to_string();
            if !value.trim().is_empty() {
                self.0.push((key.to_string(), value));
            }
        }
        self
    }

    /// Like [`Params::opt`], and the select-box value `all` also means
    /// "no filter".
    pub fn filter(self, key: &str, value: Option<&str>) -> Self {
        self.opt(key, value.filter(|v| !v.eq_ignore_ascii_case("all")))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn as_slice(&self) -> &[(String, String)] {
        &self.0
    }
}

// =============================================================================
// Api Client
// =============================================================================

/// Thin wrapper over `reqwest::Client` that knows the base URL and the
/// session. Cheap to clone.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    session: Arc<SessionContext>,
}

impl ApiClient {
    pub fn new(config: &ConsoleConfig, session: Arc<SessionContext>) -> ClientResult<Self> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = config.api.timeout() {
            builder = builder.timeout(timeout);
        }
        let http = builder
            .build()
            .map_err(|e| ClientError::Config(format!("HTTP client: {}", e)))?;

        Ok(ApiClient {
            http,
            base_url: config.base_url().to_string(),
            session,
        })
    }

    pub fn session(&self) -> &Arc<SessionContext> {
        &self.session
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn url(&self, path: &str) -> String {
        if path.starts_with('/') {
            format!("{}{}", self.base_url, path)
        } else {
            format!("{}/{}", self.base_url, path)
        }
    }

    // =========================================================================
    // Verbs
    // =========================================================================

    pub async fn get<T: DeserializeOwned>(&self, path: &str, params: &Params) -> ClientResult<T> {
        let request = self.request(Method::GET, path).query(params.as_slice());
        let response = self.send(Method::GET, path, request).await?;
        decode_json(response).await
    }

    /// Binary downloads: invoice PDFs and report exports.
    pub async fn get_bytes(&self, path: &str, params: &Params) -> ClientResult<Vec<u8>> {
        let request = self.request(Method::GET, path).query(params.as_slice());
        let response = self.send(Method::GET, path, request).await?;
        Ok(response.bytes().await?.to_vec())
    }

    pub async fn post<B, T>(&self, path: &str, body: &B) -> ClientResult<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let request = self.request(Method::POST, path).json(body);
        let response = self.send(Method::POST, path, request).await?;
        decode_json(response).await
    }

    /// POST without a body, for action endpoints such as approvals.
    pub async fn post_empty<T: DeserializeOwned>(&self, path: &str) -> ClientResult<T> {
        let request = self.request(Method::POST, path);
        let response = self.send(Method::POST, path, request).await?;
        decode_json(response).await
    }

    pub async fn put<B, T>(&self, path: &str, body: &B) -> ClientResult<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let request = self.request(Method::PUT, path).json(body);
        let response = self.send(Method::PUT, path, request).await?;
        decode_json(response).await
    }

    pub async fn patch<B, T>(&self, path: &str, body: &B) -> ClientResult<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let request = self.request(Method::PATCH, path).json(body);
        let response = self.send(Method::PATCH, path, request).await?;
        decode_json(response).await
    }

    /// Any response body is ignored.
    pub async fn delete(&self, path: &str) -> ClientResult<()> {
        let request = self.request(Method::DELETE, path);
        self.send(Method::DELETE, path, request).await?;
        Ok(())
    }

    /// `application/x-www-form-urlencoded` POST, used by the login endpoint.
    pub async fn post_form<T: DeserializeOwned>(
        &self,
        path: &str,
        form: &[(&str, &str)],
    ) -> ClientResult<T> {
        let request = self.request(Method::POST, path).form(form);
        let response = self.send(Method::POST, path, request).await?;
        decode_json(response).await
    }

    // =========================================================================
    // Pipeline
    // =========================================================================

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let mut request = self.http.request(method, self.url(path));
        if let Some(token) = self.session.token() {
            request = request.header("Authorization", format!("Bearer {}", token));
        }
        request
    }

    async fn send(&self, method: Method, path: &str, request: RequestBuilder) -> ClientResult<Response> {
        debug!(method = %method, path = %path, "API request");

        let response = match request.send().await {
            Ok(response) => response,
            Err(e) => {
                error!(method = %method, path = %path, error = %e, "API request failed");
                return Err(e.into());
            }
        };

        let status = response.status();
        debug!(method = %method, path = %path, status = status.as_u16(), "API response");
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let message = extract_error_message(&body).unwrap_or_else(|| fallback_message(status));

        if status == StatusCode::UNAUTHORIZED && !is_login_path(path) {
            self.session.expire();
        }

        Err(ClientError::from_status(status.as_u16(), message))
    }
}

async fn decode_json<T: DeserializeOwned>(response: Response) -> ClientResult<T> {
    let bytes = response.bytes().await?;
    // Some endpoints answer 204 or an empty 200 to mutations.
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(serde_json::from_str("null")?);
    }
    Ok(serde_json::from_slice(&bytes)?)
}

fn is_login_path(path: &str) -> bool {
    path.contains("/login")
}

fn fallback_message(status: StatusCode) -> String {
    match status.canonical_reason() {
        Some(reason) if status.is_server_error() => reason.to_string(),
        _ => GENERIC_ERROR_MESSAGE.to_string(),
    }
}

/// User-facing message of an error body.
///
/// Order: `detail` (string, or a list of `{msg}` objects as FastAPI sends
/// for validation failures), then `message`, then the raw body text.
pub fn extract_error_message(body: &str) -> Option<String> {
    let body = body.trim();
    if body.is_empty() {
        return None;
    }

    let Ok(value) = serde_json::from_str::<serde_json::Value>(body) else {
        return Some(body.to_string());
    };

    match value.get("detail") {
        Some(serde_json::Value::String(detail)) if !detail.trim().is_empty() => {
            return Some(detail.clone());
        }
        Some(serde_json::Value::Array(items)) => {
            let messages: Vec<&str> = items
                .iter()
                .filter_map(|item| item.get("msg").and_then(|m| m.as_str()))
                .collect();
            if !messages.is_empty() {
                return Some(messages.join("\n"));
            }
        }
        Some(serde_json::Value::Object(detail)) => {
            if let Some(msg) = detail.get("msg").and_then(|m| m.as_str()) {
                return Some(msg.to_string());
            }
        }
        _ => {}
    }

    if let Some(message) = value.get("message").and_then(|m| m.as_str()) {
        if !message.trim().is_empty() {
            return Some(message.to_string());
        }
    }

    Some(body.to_string())
}
