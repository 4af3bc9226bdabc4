use crate::backend::http_utils::{
    create_http_client, extract_text_content, send_json_request, send_request,
};
use crate::backend::{BackendError, DocumentBackend, DocumentHandle};
use crate::config::{GEMINI_FILE_POLL_ATTEMPTS, GEMINI_FILE_POLL_INTERVAL_MS};
use async_trait::async_trait;
use reqwest::Client as HttpClient;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, info};

const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com";
const PDF_MIME_TYPE: &str = "application/pdf";

/// Document backend on top of the Gemini Files API
pub struct GeminiBackend {
    http_client: HttpClient,
    api_key: String,
    model: String,
    base_url: String,
}

impl GeminiBackend {
    /// Create a new Gemini backend instance
    #[must_use]
    pub fn new(api_key: String, model: String, timeout: Duration) -> Self {
        Self {
            http_client: create_http_client(timeout),
            api_key,
            model,
            base_url: GEMINI_BASE_URL.to_string(),
        }
    }

    async fn start_upload(&self, label: &str, size: usize) -> Result<String, BackendError> {
        let url = format!("{}/upload/v1beta/files?key={}", self.base_url, self.api_key);
        let request = self
            .http_client
            .post(&url)
            .header("X-Goog-Upload-Protocol", "resumable")
            .header("X-Goog-Upload-Command", "start")
            .header("X-Goog-Upload-Header-Content-Length", size.to_string())
            .header("X-Goog-Upload-Header-Content-Type", PDF_MIME_TYPE)
            .json(&json!({ "file": { "display_name": label } }));

        let response = send_request(request).await?;
        response
            .headers()
            .get("x-goog-upload-url")
            .and_then(|value| value.to_str().ok())
            .map(ToString::to_string)
            .ok_or_else(|| BackendError::Api("Upload session URL missing".to_string()))
    }

    async fn finish_upload(&self, upload_url: &str, bytes: Vec<u8>) -> Result<Value, BackendError> {
        let request = self
            .http_client
            .post(upload_url)
            .header("X-Goog-Upload-Offset", "0")
            .header("X-Goog-Upload-Command", "upload, finalize")
            .body(bytes);
        let response = send_json_request(request).await?;
        response
            .get("file")
            .cloned()
            .ok_or_else(|| BackendError::Json("Upload response has no file".to_string()))
    }

    async fn file_metadata(&self, name: &str) -> Result<Value, BackendError> {
        let url = format!("{}/v1beta/{name}?key={}", self.base_url, self.api_key);
        send_json_request(self.http_client.get(&url)).await
    }

    /// Polls a freshly uploaded file until the backend finishes processing it.
    async fn wait_until_active(&self, mut file: Value) -> Result<Value, BackendError> {
        for _ in 0..GEMINI_FILE_POLL_ATTEMPTS {
            match file_state(&file) {
                FileState::Active => return Ok(file),
                FileState::Failed => {
                    return Err(BackendError::Processing(
                        "The file could not be processed".to_string(),
                    ))
                }
                FileState::Processing => {
                    tokio::time::sleep(Duration::from_millis(GEMINI_FILE_POLL_INTERVAL_MS)).await;
                    let name = extract_text_content(&file, &["name"])?;
                    file = self.file_metadata(&name).await?;
                }
            }
        }
        Err(BackendError::Processing(
            "Timed out waiting for the file to become active".to_string(),
        ))
    }

    async fn generate(
        &self,
        documents: &[DocumentHandle],
        prompt: &str,
    ) -> Result<String, BackendError> {
        let url = format!(
            "{}/v1beta/models/{}:generateContent?key={}",
            self.base_url, self.model, self.api_key
        );
        let body = build_generate_body(documents, prompt);
        let res = send_json_request(self.http_client.post(&url).json(&body)).await?;
        collect_text_parts(&res)
    }
}

#[async_trait]
impl DocumentBackend for GeminiBackend {
    async fn register_document(
        &self,
        label: &str,
        bytes: Vec<u8>,
    ) -> Result<DocumentHandle, BackendError> {
        let size = bytes.len();
        let upload_url = self.start_upload(label, size).await?;
        let file = self.finish_upload(&upload_url, bytes).await?;
        let file = self.wait_until_active(file).await?;
        let handle = handle_from_file(&file)?;
        info!(label = %label, name = %handle.name, size, "Document registered");
        Ok(handle)
    }

    async fn analyze(
        &self,
        document: &DocumentHandle,
        prompt: &str,
    ) -> Result<String, BackendError> {
        self.generate(std::slice::from_ref(document), prompt).await
    }

    async fn compare(
        &self,
        documents: &[DocumentHandle],
        prompt: &str,
    ) -> Result<String, BackendError> {
        self.generate(documents, prompt).await
    }

    async fn release_document(&self, document: &DocumentHandle) -> Result<(), BackendError> {
        let url = format!("{}/v1beta/{}?key={}", self.base_url, document.name, self.api_key);
        send_request(self.http_client.delete(&url)).await?;
        debug!(name = %document.name, "Document released");
        Ok(())
    }
}

#[derive(Debug, PartialEq, Eq)]
enum FileState {
    Processing,
    Active,
    Failed,
}

fn file_state(file: &Value) -> FileState {
    match file.get("state").and_then(Value::as_str) {
        Some("PROCESSING") => FileState::Processing,
        Some("FAILED") => FileState::Failed,
        // Older responses omit the state once the file is usable
        _ => FileState::Active,
    }
}

fn handle_from_file(file: &Value) -> Result<DocumentHandle, BackendError> {
    Ok(DocumentHandle {
        name: extract_text_content(file, &["name"])?,
        uri: extract_text_content(file, &["uri"])?,
        mime_type: extract_text_content(file, &["mimeType"])
            .unwrap_or_else(|_| PDF_MIME_TYPE.to_string()),
    })
}

fn build_generate_body(documents: &[DocumentHandle], prompt: &str) -> Value {
    let mut parts: Vec<Value> = documents
        .iter()
        .map(|doc| {
            json!({
                "file_data": { "mime_type": doc.mime_type, "file_uri": doc.uri }
            })
        })
        .collect();
    parts.push(json!({ "text": prompt }));

    json!({ "contents": [{ "role": "user", "parts": parts }] })
}

/// Concatenates every text part of the first candidate.
fn collect_text_parts(res: &Value) -> Result<String, BackendError> {
    let parts = res
        .pointer("/candidates/0/content/parts")
        .and_then(Value::as_array)
        .ok_or_else(|| {
            let reason = res
                .pointer("/promptFeedback/blockReason")
                .and_then(Value::as_str)
                .unwrap_or("no candidates returned");
            BackendError::Api(format!("Empty response: {reason}"))
        })?;

    Ok(parts
        .iter()
        .filter_map(|part| part.get("text").and_then(Value::as_str))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn handle(name: &str) -> DocumentHandle {
        DocumentHandle {
            name: format!("files/{name}"),
            uri: format!("https://example.test/v1beta/files/{name}"),
            mime_type: PDF_MIME_TYPE.to_string(),
        }
    }

    #[test]
    fn test_generate_body_lists_documents_before_prompt() {
        let body = build_generate_body(&[handle("a"), handle("b")], "Compare");
        let parts = body["contents"][0]["parts"].as_array().cloned().unwrap_or_default();

        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0]["file_data"]["file_uri"], "https://example.test/v1beta/files/a");
        assert_eq!(parts[1]["file_data"]["mime_type"], PDF_MIME_TYPE);
        assert_eq!(parts[2]["text"], "Compare");
        assert_eq!(body["contents"][0]["role"], "user");
    }

    #[test]
    fn test_collect_text_parts_joins_all_parts() {
        let res = json!({
            "candidates": [{"content": {"parts": [{"text": "Hello, "}, {"text": "world"}]}}]
        });
        assert_eq!(collect_text_parts(&res).ok().as_deref(), Some("Hello, world"));
    }

    #[test]
    fn test_collect_text_parts_reports_block_reason() {
        let res = json!({"promptFeedback": {"blockReason": "SAFETY"}});
        let err = collect_text_parts(&res).err().map(|e| e.to_string());
        assert_eq!(err.as_deref(), Some("API error: Empty response: SAFETY"));
    }

    #[test]
    fn test_file_state_and_handle() {
        let file = json!({
            "name": "files/abc",
            "uri": "https://example.test/v1beta/files/abc",
            "mimeType": "application/pdf",
            "state": "ACTIVE"
        });
        assert_eq!(file_state(&file), FileState::Active);
        assert_eq!(file_state(&json!({"state": "PROCESSING"})), FileState::Processing);
        assert_eq!(file_state(&json!({"state": "FAILED"})), FileState::Failed);

        let handle = handle_from_file(&file).ok();
        assert_eq!(handle.map(|h| h.name), Some("files/abc".to_string()));
        assert!(handle_from_file(&json!({"uri": "x"})).is_err());
    }
}
