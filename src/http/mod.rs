use crate::config::Config;
use crate::error::DirectoryError;
use crate::types::RateMeta;
use log::{debug, warn};
use reqwest::header::{HeaderValue, ACCEPT, AUTHORIZATION};
use reqwest::{Client, Method, StatusCode};
use serde::de::DeserializeOwned;
use std::time::Duration;

pub const GITHUB_MEDIA_TYPE: &str = "application/vnd.github+json";

/// Status, rate budget and raw body of one REST exchange. Status interpretation is left to the
/// caller because each operation classifies statuses differently.
#[derive(Debug, Clone)]
pub struct RestResponse {
    pub status: StatusCode,
    pub rate: RateMeta,
    pub body: String,
}

impl RestResponse {
    pub fn json<T: DeserializeOwned>(&self, context: &str) -> Result<T, DirectoryError> {
        serde_json::from_str(&self.body).map_err(|e| {
            DirectoryError::transport(
                Some(self.status.as_u16()),
                format!("{}: malformed response body: {}", context, e),
            )
        })
    }

    /// Host-provided `message` field, falling back to the raw body.
    pub fn host_message(&self) -> String {
        serde_json::from_str::<serde_json::Value>(&self.body)
            .ok()
            .and_then(|v| v.get("message").and_then(|m| m.as_str()).map(str::to_string))
            .unwrap_or_else(|| self.body.trim().to_string())
    }
}

pub fn build_client(cfg: &Config) -> reqwest::Result<Client> {
    // Authorization header is injected per request; the client itself carries no credential.
    let mut builder = Client::builder()
        .user_agent(cfg.user_agent.as_str())
        .use_rustls_tls();
    if let Some(secs) = cfg.timeout_secs {
        builder = builder.timeout(Duration::from_secs(secs));
    }
    builder.build()
}

fn auth_header(token: &str) -> Result<HeaderValue, DirectoryError> {
    let mut value =
        HeaderValue::from_str(&format!("Bearer {}", token)).map_err(|_| DirectoryError::Auth {
            status: None,
            message: "Credential contains characters that cannot be sent in a header".into(),
        })?;
    value.set_sensitive(true);
    Ok(value)
}

/// Classify a non-success status into the matching error kind.
pub fn map_status_to_error(status: StatusCode, message: String) -> DirectoryError {
    let code = Some(status.as_u16());
    match status {
        StatusCode::UNAUTHORIZED => DirectoryError::Auth {
            status: code,
            message,
        },
        StatusCode::FORBIDDEN => DirectoryError::Permission {
            status: code,
            message,
        },
        StatusCode::NOT_FOUND => DirectoryError::NotFound {
            status: code,
            message,
        },
        StatusCode::UNPROCESSABLE_ENTITY => DirectoryError::InvalidName {
            status: code,
            message,
        },
        _ => DirectoryError::transport(code, message),
    }
}

pub fn extract_rate_from_rest(headers: &reqwest::header::HeaderMap) -> RateMeta {
    let remaining = headers
        .get("x-ratelimit-remaining")
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.parse::<i32>().ok());
    let used = headers
        .get("x-ratelimit-used")
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.parse::<i32>().ok());
    let reset_at = headers
        .get("x-ratelimit-reset")
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.parse::<i64>().ok())
        .and_then(|epoch| chrono::DateTime::<chrono::Utc>::from_timestamp(epoch, 0))
        .map(|t| t.to_rfc3339());
    RateMeta {
        remaining,
        used,
        reset_at,
    }
}

/// Percent-encode one URL path segment (owner, repository name).
pub fn encode_path_segment(segment: &str) -> String {
    urlencoding::encode(segment).into_owned()
}

/// Percent-encode a slash-separated repository path, keeping the separators.
pub fn encode_repo_path(path: &str) -> String {
    path.split('/')
        .filter(|s| !s.is_empty())
        .map(encode_path_segment)
        .collect::<Vec<_>>()
        .join("/")
}

/// Issue exactly one request. Network and body-read failures become `Transport` errors carrying
/// `context`; HTTP statuses, including failures, are returned for the caller to classify.
pub async fn send(
    client: &Client,
    cfg: &Config,
    method: Method,
    path: &str,
    query: &[(&str, String)],
    body: Option<&serde_json::Value>,
    context: &str,
) -> Result<RestResponse, DirectoryError> {
    let url = format!("{}{}", cfg.api_url, path);
    let mut req = client
        .request(method.clone(), &url)
        .header("X-GitHub-Api-Version", &cfg.api_version)
        .header(ACCEPT, HeaderValue::from_static(GITHUB_MEDIA_TYPE));
    if let Some(token) = cfg.token.as_deref() {
        req = req.header(AUTHORIZATION, auth_header(token)?);
    }
    if !query.is_empty() {
        req = req.query(query);
    }
    if let Some(b) = body {
        req = req.json(b);
    }

    let res = req.send().await.map_err(|e| {
        warn!("REST {} {} failed to send: {}", method, path, e);
        DirectoryError::from_reqwest(context, e)
    })?;

    let status = res.status();
    let rate = extract_rate_from_rest(res.headers());
    debug!(
        "REST {} {} -> {} (rate {})",
        method, path, status, rate
    );
    let body = res
        .text()
        .await
        .map_err(|e| DirectoryError::from_reqwest(context, e))?;
    Ok(RestResponse { status, rate, body })
}
