//! HTTP utilities for the analysis backend
//!
//! Common request/response handling shared by the Files API and
//! `generateContent` calls.

use crate::backend::BackendError;
use reqwest::{Client as HttpClient, RequestBuilder, Response};
use serde_json::Value;
use std::time::Duration;

/// Maximum length of an error body kept in an error message
const MAX_ERROR_BODY_CHARS: usize = 500;

/// Creates an HTTP client with the given timeout.
///
/// This prevents infinite hangs when the API is slow or unresponsive.
#[must_use]
pub fn create_http_client(timeout: Duration) -> HttpClient {
    HttpClient::builder()
        .timeout(timeout)
        .build()
        .unwrap_or_else(|_| HttpClient::new())
}

/// Sends a request and checks the response status.
///
/// # Errors
///
/// Returns `BackendError::Network` on connectivity issues and
/// `BackendError::Api` on non-success status codes.
pub async fn send_request(request: RequestBuilder) -> Result<Response, BackendError> {
    let response = request
        .send()
        .await
        .map_err(|e| BackendError::Network(e.without_url().to_string()))?;

    if response.status().is_success() {
        return Ok(response);
    }

    let status = response.status();
    let error_text = response.text().await.unwrap_or_default();
    Err(BackendError::Api(describe_error(status, &error_text)))
}

/// Sends a request and parses the JSON response.
///
/// # Errors
///
/// Same as [`send_request`], plus `BackendError::Json` if parsing fails.
pub async fn send_json_request(request: RequestBuilder) -> Result<Value, BackendError> {
    send_request(request)
        .await?
        .json()
        .await
        .map_err(|e| BackendError::Json(e.to_string()))
}

/// Builds a readable message from an error response.
fn describe_error(status: reqwest::StatusCode, body: &str) -> String {
    // Detect HTML error pages from proxies
    let trimmed = body.trim_start();
    let is_html = trimmed.starts_with("<!DOCTYPE")
        || trimmed.starts_with("<html")
        || trimmed.starts_with("<HTML");

    if is_html {
        return format!("API error: {status} (Server returned HTML error page)");
    }

    let truncated = if body.chars().count() > MAX_ERROR_BODY_CHARS {
        format!(
            "{}... (truncated)",
            crate::utils::truncate_str(body, MAX_ERROR_BODY_CHARS)
        )
    } else {
        body.to_string()
    };
    format!("API error: {status} - {truncated}")
}

/// Extracts a string from a JSON response by navigating a path.
///
/// # Example
/// ```ignore
/// let name = extract_text_content(&response, &["file", "name"])?;
/// ```
///
/// # Errors
///
/// Returns `BackendError::Api` if the path is invalid or the target is not a string.
pub fn extract_text_content(response: &Value, path: &[&str]) -> Result<String, BackendError> {
    let mut current = response;

    for segment in path {
        if let Ok(index) = segment.parse::<usize>() {
            current = current.get(index).ok_or_else(|| {
                BackendError::Api(format!("Invalid path: missing index {index}"))
            })?;
        } else {
            current = current.get(*segment).ok_or_else(|| {
                BackendError::Api(format!("Invalid path: missing key {segment}"))
            })?;
        }
    }

    current
        .as_str()
        .map(ToString::to_string)
        .ok_or_else(|| BackendError::Api(format!("Expected string at path, got: {current:?}")))
}
