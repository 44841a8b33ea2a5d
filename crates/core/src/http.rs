//! Shared plumbing for the HTTP clients

use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use reqwest::{Client, Response, StatusCode};

use crate::config::SyncConfig;
use crate::error::Error;
use crate::Result;

pub(crate) fn build_client(config: &SyncConfig) -> Result<Client> {
    Client::builder()
        .timeout(config.request_timeout())
        .build()
        .map_err(|e| Error::Config(format!("Failed to build HTTP client: {}", e)))
}

/// `apikey` plus a bearer token, falling back to the key when nobody is signed in
pub(crate) fn auth_headers(api_key: &str, access_token: Option<&str>) -> Result<HeaderMap> {
    let mut headers = HeaderMap::new();
    let key = HeaderValue::from_str(api_key)
        .map_err(|_| Error::Config("api_key is not a valid header value".into()))?;
    let bearer = HeaderValue::from_str(&format!("Bearer {}", access_token.unwrap_or(api_key)))
        .map_err(|_| Error::Unauthorized("Access token is not a valid header value".into()))?;
    headers.insert("apikey", key);
    headers.insert(AUTHORIZATION, bearer);
    Ok(headers)
}

pub(crate) fn error_for_status(status: StatusCode, message: String) -> Error {
    match status.as_u16() {
        401 | 403 => Error::Unauthorized(message),
        404 => Error::NotFound(message),
        400 | 409 | 422 => Error::Validation(message),
        _ => Error::Transport(message),
    }
}

/// Pass successful responses through, turn the rest into typed errors
pub(crate) async fn check_status(resp: Response, action: &str) -> Result<Response> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().await.unwrap_or_default();
    Err(error_for_status(
        status,
        format!("{} failed: HTTP {} {}", action, status, body.trim()),
    ))
}

pub(crate) fn transport(action: &str, err: reqwest::Error) -> Error {
    Error::Transport(format!("{} failed: {}", action, err))
}
