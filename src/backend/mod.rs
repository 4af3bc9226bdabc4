//! Document-analysis backend
//!
//! The backend owns uploaded documents; the bot only keeps opaque handles.

pub mod gemini;
mod http_utils;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use gemini::GeminiBackend;

/// Errors that can occur while talking to the analysis backend
#[derive(Debug, Error)]
pub enum BackendError {
    /// Error returned by the provider's API
    #[error("API error: {0}")]
    Api(String),
    /// Error during network communication
    #[error("Network error: {0}")]
    Network(String),
    /// Error during JSON serialization or deserialization
    #[error("JSON error: {0}")]
    Json(String),
    /// The provider could not process the uploaded document
    #[error("Document processing failed: {0}")]
    Processing(String),
    /// Missing API key or other configuration
    #[error("Missing configuration: {0}")]
    MissingConfig(String),
}

/// Opaque reference to a document registered with the backend
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentHandle {
    /// Backend resource name, e.g. `files/abc123`
    pub name: String,
    /// URI passed back to the model when the document is referenced
    pub uri: String,
    /// MIME type the backend stored the document with
    pub mime_type: String,
}

/// "Given N documents and a prompt, return text"
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DocumentBackend: Send + Sync {
    /// Uploads a document and waits until the backend can use it.
    async fn register_document(
        &self,
        label: &str,
        bytes: Vec<u8>,
    ) -> Result<DocumentHandle, BackendError>;

    /// Runs `prompt` against a single document.
    async fn analyze(&self, document: &DocumentHandle, prompt: &str)
        -> Result<String, BackendError>;

    /// Runs `prompt` against several documents at once.
    async fn compare(
        &self,
        documents: &[DocumentHandle],
        prompt: &str,
    ) -> Result<String, BackendError>;

    /// Deletes the document on the backend.
    async fn release_document(&self, document: &DocumentHandle) -> Result<(), BackendError>;
}
