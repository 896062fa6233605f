//! The one place HTTP happens.
//!
//! Every call resolves to either a decoded payload or a structured
//! `ApiError`. Connection failures become status 0, a 401 tears the session
//! down, and other failures carry the backend's own message when it sent one.

use bytes::Bytes;
use reqwest::Method;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::sync::{Arc, RwLock};
use tracing::{debug, warn};

use crate::error::{ApiError, ApiResult};
use crate::navigation::{LOGIN_ROUTE, Navigator};
use crate::session::{SessionScoped, SessionStore};

pub enum RequestBody {
    Empty,
    Json(serde_json::Value),
    Multipart(reqwest::multipart::Form),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseShape {
    Json,
    Text,
    Blob,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    Json(serde_json::Value),
    Text(String),
    Blob(Bytes),
}

pub struct RequestOptions {
    pub method: Method,
    pub headers: HeaderMap,
    pub body: RequestBody,
    pub expect: ResponseShape,
}

impl Default for RequestOptions {
    fn default() -> Self {
        Self {
            method: Method::GET,
            headers: HeaderMap::new(),
            body: RequestBody::Empty,
            expect: ResponseShape::Json,
        }
    }
}

impl RequestOptions {
    pub fn new(method: Method) -> Self {
        Self {
            method,
            ..Default::default()
        }
    }

    pub fn json(mut self, body: serde_json::Value) -> Self {
        self.body = RequestBody::Json(body);
        self
    }

    pub fn multipart(mut self, form: reqwest::multipart::Form) -> Self {
        self.body = RequestBody::Multipart(form);
        self
    }

    pub fn expect(mut self, shape: ResponseShape) -> Self {
        self.expect = shape;
        self
    }

    pub fn header(mut self, name: reqwest::header::HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }
}

pub struct Transport {
    http: reqwest::Client,
    base_url: String,
    session: Arc<SessionStore>,
    navigator: Arc<dyn Navigator>,
    session_scoped: RwLock<Vec<Arc<dyn SessionScoped>>>,
}

impl Transport {
    pub fn new(base_url: &str, session: Arc<SessionStore>, navigator: Arc<dyn Navigator>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            session,
            navigator,
            session_scoped: RwLock::new(Vec::new()),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Register a cache that must be emptied when the backend rejects the session.
    pub fn register_session_scoped(&self, scoped: Arc<dyn SessionScoped>) {
        self.session_scoped
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(scoped);
    }

    pub async fn request(&self, path: &str, options: RequestOptions) -> ApiResult<Payload> {
        self.execute(path, options).await.map(|(_, payload)| payload)
    }

    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> ApiResult<T> {
        self.request_json(path, RequestOptions::new(Method::GET)).await
    }

    pub async fn send_json<B, T>(&self, method: Method, path: &str, body: Option<&B>) -> ApiResult<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let mut options = RequestOptions::new(method);
        if let Some(body) = body {
            let value = serde_json::to_value(body)
                .map_err(|e| ApiError::local("failed to encode request", e))?;
            options = options.json(value);
        }
        self.request_json(path, options).await
    }

    pub async fn get_blob(&self, path: &str) -> ApiResult<Bytes> {
        let options = RequestOptions::new(Method::GET).expect(ResponseShape::Blob);
        match self.execute(path, options).await? {
            (_, Payload::Blob(bytes)) => Ok(bytes),
            (status, _) => Err(ApiError::new(status, "failed to decode response: expected binary body")),
        }
    }

    async fn request_json<T: DeserializeOwned>(&self, path: &str, options: RequestOptions) -> ApiResult<T> {
        let options = RequestOptions {
            expect: ResponseShape::Json,
            ..options
        };
        match self.execute(path, options).await? {
            (status, Payload::Json(value)) => serde_json::from_value(value)
                .map_err(|e| ApiError::new(status, format!("failed to decode response: {}", e))),
            (status, _) => Err(ApiError::new(status, "failed to decode response: expected JSON body")),
        }
    }

    async fn execute(&self, path: &str, options: RequestOptions) -> ApiResult<(u16, Payload)> {
        let url = format!("{}{}", self.base_url, path);
        let RequestOptions {
            method,
            mut headers,
            body,
            expect,
        } = options;

        // Multipart sets its own boundary content type
        if !matches!(body, RequestBody::Multipart(_)) {
            headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        }
        if let Some(token) = self.session.token() {
            match HeaderValue::from_str(&format!("Bearer {}", token)) {
                Ok(value) => {
                    headers.insert(AUTHORIZATION, value);
                }
                Err(_) => warn!("stored token is not a valid header value; sending unauthenticated"),
            }
        }

        debug!(method = %method, url = %url, "request");

        let mut request = self.http.request(method.clone(), &url).headers(headers);
        request = match body {
            RequestBody::Empty => request,
            RequestBody::Json(value) => request.json(&value),
            RequestBody::Multipart(form) => request.multipart(form),
        };

        let response = match request.send().await {
            Ok(response) => response,
            Err(e) if e.is_builder() => {
                warn!(url = %url, error = %e, "request could not be built");
                return Err(ApiError::local("invalid request", e));
            }
            Err(e) => {
                warn!(method = %method, url = %url, error = %e, "network failure");
                return Err(ApiError::network());
            }
        };

        let status = response.status().as_u16();

        if status == ApiError::UNAUTHORIZED_STATUS {
            self.end_session();
            return Err(ApiError::unauthorized());
        }

        if !response.status().is_success() {
            let body = response.bytes().await.unwrap_or_default();
            let err = match extract_error_message(&body) {
                Some(message) => ApiError::new(status, message),
                None => ApiError::from_status(status),
            };
            debug!(status, message = %err.message, "request rejected");
            return Err(err);
        }

        let payload = match expect {
            ResponseShape::Json => {
                let body = response.bytes().await.map_err(|_| ApiError::network())?;
                if body.iter().all(u8::is_ascii_whitespace) {
                    Payload::Json(serde_json::Value::Null)
                } else {
                    Payload::Json(serde_json::from_slice(&body).map_err(|e| {
                        ApiError::new(status, format!("failed to decode response: {}", e))
                    })?)
                }
            }
            ResponseShape::Text => Payload::Text(response.text().await.map_err(|_| ApiError::network())?),
            ResponseShape::Blob => Payload::Blob(response.bytes().await.map_err(|_| ApiError::network())?),
        };

        Ok((status, payload))
    }

    fn end_session(&self) {
        warn!("backend rejected the session; signing out");
        if let Err(e) = self.session.logout() {
            warn!(error = %e, "failed to clear stored session");
        }
        for scoped in self
            .session_scoped
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .iter()
        {
            scoped.clear_session_data();
        }
        if !self.navigator.current_location().contains(LOGIN_ROUTE) {
            self.navigator.navigate(LOGIN_ROUTE);
        }
    }
}

/// Pull a readable message out of an error body: `detail`, then `message`,
/// then `error`. Empty and null fields are skipped.
fn extract_error_message(body: &[u8]) -> Option<String> {
    let value: serde_json::Value = serde_json::from_slice(body).ok()?;
    ["detail", "message", "error"].iter().find_map(|key| match value.get(*key)? {
        serde_json::Value::Null | serde_json::Value::Bool(false) => None,
        serde_json::Value::String(s) if s.is_empty() => None,
        serde_json::Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    })
}
