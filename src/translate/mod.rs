//! Translation of AI output into the user's language
//!
//! [`Localizer`] wraps a [`Translator`] with batching and the "never fail"
//! policy: when translation breaks, the user gets the original text with a
//! short notice instead of an error.

pub mod google;

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tracing::warn;

use crate::session::Language;
use crate::text::chunker;

pub use google::GoogleTranslator;

/// Errors that can occur while translating
#[derive(Debug, Error)]
pub enum TranslateError {
    /// Error during network communication
    #[error("Network error: {0}")]
    Network(String),
    /// The service answered with an error status
    #[error("API error: {0}")]
    Api(String),
    /// The response could not be parsed
    #[error("JSON error: {0}")]
    Json(String),
}

/// Machine translation service
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Translator: Send + Sync {
    /// Translates `text` into `target`.
    async fn translate(&self, text: &str, target: Language) -> Result<String, TranslateError>;
}

/// Translates long texts in paragraph-aligned batches
#[derive(Clone)]
pub struct Localizer {
    translator: Arc<dyn Translator>,
    batch_size: usize,
}

impl Localizer {
    /// Creates a localizer sending at most `batch_size` characters per request
    #[must_use]
    pub fn new(translator: Arc<dyn Translator>, batch_size: usize) -> Self {
        Self {
            translator,
            batch_size,
        }
    }

    /// Translates backend output into `language`.
    ///
    /// English output is returned as is. On any translation error the
    /// original text is returned with `failure_notice` appended.
    pub async fn localize(&self, text: &str, language: Language, failure_notice: &str) -> String {
        if language == Language::English || text.trim().is_empty() {
            return text.to_string();
        }

        match self.translate_batched(text, language).await {
            Ok(translated) => translated,
            Err(e) => {
                warn!(language = language.code(), "Translation failed: {e}");
                format!("{text}\n\n{failure_notice}")
            }
        }
    }

    async fn translate_batched(
        &self,
        text: &str,
        language: Language,
    ) -> Result<String, TranslateError> {
        let mut result = String::with_capacity(text.len());
        for batch in chunker::split(text, None, self.batch_size) {
            // The service drops trailing whitespace, so carry it over by hand
            let content = batch.body.trim_end();
            let trailing = &batch.body[content.len()..];
            if !content.is_empty() {
                result.push_str(&self.translator.translate(content, language).await?);
            }
            result.push_str(trailing);
        }
        Ok(result)
    }
}
