//! One HTTP POST round trip, JSON in and JSON out.
//!
//! The client never talks to `reqwest` directly; it goes through the
//! [`Transport`] trait so tests can script replies and count requests.

use std::time::Duration;

use reqwest::header::SET_COOKIE;
use serde_json::Value;
use tracing::debug;

use crate::error::SessionError;

/// Name of the cookie the server uses for the session id.
pub const SESSION_COOKIE: &str = "session_id";

/// Header carrying the session id on logout and object calls.
pub const SESSION_HEADER: &str = "X-Openerp-Session-Id";

/// An outbound POST.
#[derive(Debug, Clone, PartialEq)]
pub struct TransportRequest {
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Value,
    pub timeout: Duration,
}

/// What came back: the decoded body plus the session cookie, if the
/// server set one.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TransportResponse {
    pub body: Value,
    pub session_cookie: Option<String>,
}

/// Pluggable transport. Implementations perform exactly one network
/// request per call and map failures onto [`SessionError`]:
/// expiry to `Timeout`, network failure to `Transport`, an unparsable
/// body to `Decode`.
#[async_trait::async_trait]
pub trait Transport: Send + Sync + 'static {
    async fn post(&self, req: TransportRequest) -> Result<TransportResponse, SessionError>;
}

/// `reqwest`-backed transport. Connection pooling is left to the
/// underlying `reqwest::Client`.
#[derive(Debug, Clone, Default)]
pub struct HttpTransport {
    http: reqwest::Client,
}

impl HttpTransport {
    pub fn new() -> Self {
        Self {
            http: reqwest::Client::new(),
        }
    }

    /// Wrap an existing client (custom TLS, proxies).
    pub fn with_client(http: reqwest::Client) -> Self {
        Self { http }
    }
}

#[async_trait::async_trait]
impl Transport for HttpTransport {
    async fn post(&self, req: TransportRequest) -> Result<TransportResponse, SessionError> {
        debug!(url = %req.url, "POST");
        let mut builder = self.http.post(&req.url).json(&req.body).timeout(req.timeout);
        for (name, value) in &req.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        let resp = builder.send().await.map_err(|e| map_send_error(e, req.timeout))?;

        let status = resp.status();
        let session_cookie = session_cookie(resp.headers());
        let bytes = resp.bytes().await.map_err(|e| map_send_error(e, req.timeout))?;

        if !status.is_success() {
            let text = String::from_utf8_lossy(&bytes);
            return Err(SessionError::Transport(format!("HTTP {}: {}", status.as_u16(), text.trim())));
        }

        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).map_err(|e| SessionError::Decode(format!("response body: {}", e)))?
        };

        Ok(TransportResponse { body, session_cookie })
    }
}

fn map_send_error(err: reqwest::Error, timeout: Duration) -> SessionError {
    if err.is_timeout() {
        SessionError::Timeout(timeout)
    } else {
        SessionError::from(err)
    }
}

/// Pull `session_id` out of the `Set-Cookie` headers.
fn session_cookie(headers: &reqwest::header::HeaderMap) -> Option<String> {
    headers
        .get_all(SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .find_map(parse_session_cookie)
}

fn parse_session_cookie(set_cookie: &str) -> Option<String> {
    let pair = set_cookie.split(';').next()?.trim();
    let (name, value) = pair.split_once('=')?;
    if name.trim() == SESSION_COOKIE && !value.is_empty() {
        Some(value.trim().to_string())
    } else {
        None
    }
}
