//! Authenticated Request Gateway: the single point of entry for all backend calls.
//!
//! ARCHITECTURAL RULE: No other module may talk to the backend directly.
//! Every request goes through `Gateway::call`, which attaches a just-in-time validated
//! bearer credential and normalizes failures into `ClientError`.
//!
//! The gateway returns untyped JSON. Shape enforcement belongs to `crate::schema`, applied by
//! the service adapters that own each endpoint.
use std::sync::Arc;

use bytes::Bytes;
use chrono::Utc;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Method};
use serde_json::Value;
use tracing::{debug, warn};

use crate::errors::ClientError;
use crate::session::{Credential, SessionProvider};

/// File payload sent as a single multipart field.
#[derive(Debug, Clone)]
pub struct MultipartFile {
    pub field: String,
    pub file_name: String,
    pub mime: String,
    pub bytes: Bytes,
}

#[derive(Debug, Clone)]
pub enum RequestBody {
    Empty,
    Json(Value),
    Multipart(MultipartFile),
}

#[derive(Debug, Clone)]
pub struct RequestOptions {
    pub method: Method,
    pub headers: HeaderMap,
    pub body: RequestBody,
}

impl RequestOptions {
    pub fn get() -> Self {
        Self {
            method: Method::GET,
            headers: HeaderMap::new(),
            body: RequestBody::Empty,
        }
    }

    pub fn post_json(body: Value) -> Self {
        Self {
            method: Method::POST,
            headers: HeaderMap::new(),
            body: RequestBody::Json(body),
        }
    }

    pub fn post_multipart(file: MultipartFile) -> Self {
        Self {
            method: Method::POST,
            headers: HeaderMap::new(),
            body: RequestBody::Multipart(file),
        }
    }

    /// Adds a caller header. `Authorization` is always replaced by the gateway.
    pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }
}

#[derive(Clone)]
pub struct Gateway {
    http: Client,
    base_url: String,
    session: Arc<dyn SessionProvider>,
}

impl Gateway {
    pub fn with_client(http: Client, base_url: &str, session: Arc<dyn SessionProvider>) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            session,
        }
    }

    /// Issues an authenticated request against `endpoint` and returns the parsed JSON body.
    pub async fn call(
        &self,
        endpoint: &str,
        options: RequestOptions,
    ) -> Result<Value, ClientError> {
        let credential = self.credential().await?;

        let RequestOptions {
            method,
            headers: caller_headers,
            body,
        } = options;
        let headers = merge_headers(&credential, caller_headers, &body)?;
        let url = format!("{}{}", self.base_url, endpoint);

        debug!("{} {}", method, url);

        let mut request = self.http.request(method.clone(), &url).headers(headers);
        request = match body {
            RequestBody::Empty => request,
            RequestBody::Json(value) => request.body(value.to_string()),
            RequestBody::Multipart(file) => request.multipart(multipart_form(file)?),
        };

        let response = request.send().await.map_err(|e| {
            warn!("{} {} failed before a response: {}", method, url, e);
            ClientError::from(e)
        })?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            let message = error_message(status.as_u16(), &body);
            warn!("{} {} returned {}: {}", method, url, status, message);
            return Err(ClientError::Http {
                status: status.as_u16(),
                message,
            });
        }

        debug!("{} {} returned {}", method, url, status);
        serde_json::from_str(&body).map_err(|e| ClientError::MalformedResponse(e.to_string()))
    }

    /// Returns a credential that is unexpired right now, refreshing it at most once.
    async fn credential(&self) -> Result<Credential, ClientError> {
        let mut credential = self
            .session
            .get_session()
            .await
            .ok_or(ClientError::NoSession)?;

        if credential.is_expired_at(Utc::now()) {
            warn!(
                "Access token expired at {}, attempting refresh",
                credential.expires_at
            );
            let refreshed = self.session.refresh_session().await.map_err(|e| {
                warn!("Token refresh failed: {e}");
                ClientError::SessionExpiredUnrefreshable
            })?;
            if refreshed.is_expired_at(Utc::now()) {
                warn!(
                    "Refreshed token already expired at {}",
                    refreshed.expires_at
                );
                return Err(ClientError::SessionExpiredUnrefreshable);
            }
            credential.access_token = refreshed.access_token;
            credential.expires_at = refreshed.expires_at;
            debug!("Token refreshed, now expires at {}", credential.expires_at);
        }

        Ok(credential)
    }
}

/// Gateway defaults, then caller headers, then the bearer credential on top.
fn merge_headers(
    credential: &Credential,
    caller: HeaderMap,
    body: &RequestBody,
) -> Result<HeaderMap, ClientError> {
    let mut headers = HeaderMap::new();
    if !matches!(body, RequestBody::Multipart(_)) {
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    }

    for name in caller.keys() {
        headers.remove(name);
    }
    headers.extend(caller);

    if matches!(body, RequestBody::Multipart(_)) {
        headers.remove(CONTENT_TYPE);
    }

    let mut bearer = HeaderValue::from_str(&format!("Bearer {}", credential.access_token))
        .map_err(|_| ClientError::precondition("Access token is not a valid header value"))?;
    bearer.set_sensitive(true);
    headers.insert(AUTHORIZATION, bearer);

    Ok(headers)
}

fn multipart_form(file: MultipartFile) -> Result<Form, ClientError> {
    let part = Part::bytes(file.bytes.to_vec())
        .file_name(file.file_name)
        .mime_str(&file.mime)?;
    Ok(Form::new().part(file.field, part))
}

/// Extracts the human-readable message from a failed response body.
///
/// JSON bodies yield `detail`, then `message`; other bodies are surfaced as raw text.
pub fn error_message(status: u16, body: &str) -> String {
    let fallback = format!("Request failed ({status})");
    match serde_json::from_str::<Value>(body) {
        Ok(json) => ["detail", "message"]
            .iter()
            .find_map(|key| match json.get(key) {
                Some(Value::String(s)) if !s.is_empty() => Some(s.clone()),
                Some(Value::String(_)) | Some(Value::Null) | None => None,
                Some(other) if key == &"detail" => Some(other.to_string()),
                Some(_) => None,
            })
            .unwrap_or(fallback),
        Err(_) if body.trim().is_empty() => fallback,
        Err(_) => body.to_string(),
    }
}
