//! Google Translate client using the public `gtx` endpoint.

use async_trait::async_trait;
use reqwest::Client as HttpClient;
use serde_json::Value;
use std::time::Duration;

use super::{TranslateError, Translator};
use crate::session::Language;

const GTX_ENDPOINT: &str = "https://translate.googleapis.com/translate_a/single";

/// Translator backed by Google Translate
pub struct GoogleTranslator {
    http_client: HttpClient,
    endpoint: String,
}

impl GoogleTranslator {
    /// Creates a translator with the given request timeout
    #[must_use]
    pub fn new(timeout: Duration) -> Self {
        let http_client = HttpClient::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|_| HttpClient::new());
        Self {
            http_client,
            endpoint: GTX_ENDPOINT.to_string(),
        }
    }
}

#[async_trait]
impl Translator for GoogleTranslator {
    async fn translate(&self, text: &str, target: Language) -> Result<String, TranslateError> {
        let response = self
            .http_client
            .post(&self.endpoint)
            .query(&[
                ("client", "gtx"),
                ("sl", "auto"),
                ("tl", target.code()),
                ("dt", "t"),
            ])
            .form(&[("q", text)])
            .send()
            .await
            .map_err(|e| TranslateError::Network(e.to_string()))?;

        if !response.status().is_success() {
            return Err(TranslateError::Api(format!(
                "translate returned {}",
                response.status()
            )));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| TranslateError::Json(e.to_string()))?;
        parse_gtx_response(&body)
    }
}

/// Joins the translated segments of a `gtx` response.
///
/// The payload looks like `[[["Xin chào", "Hello", ...], ...], ...]`.
fn parse_gtx_response(body: &Value) -> Result<String, TranslateError> {
    let segments = body
        .get(0)
        .and_then(Value::as_array)
        .ok_or_else(|| TranslateError::Json("missing translation segments".to_string()))?;

    Ok(segments
        .iter()
        .filter_map(|segment| segment.get(0).and_then(Value::as_str))
        .collect())
}
