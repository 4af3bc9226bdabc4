//! Telegram implementation of the transport seam
//!
//! Transient failures (network, I/O, flood control) are retried with
//! exponential backoff. Flood control first waits the time Telegram asks
//! for. Everything else is classified into [`TransportError`] and handed
//! to the caller untouched.

use async_trait::async_trait;
use teloxide::net::Download;
use teloxide::prelude::*;
use teloxide::types::{ChatAction, FileId, InlineKeyboardMarkup, MessageId, ParseMode};
use teloxide::{ApiError, RequestError};
use tracing::warn;

use super::transport::{DocumentSource, TextMode, Transport, TransportError};
use crate::utils::retry_transient;

const ERROR_CANT_PARSE: &str = "can't parse entities";
const ERROR_NOT_MODIFIED: &str = "message is not modified";
const ERROR_NOT_FOUND: &str = "not found";

/// Transport backed by the Bot API
#[derive(Clone)]
pub struct TelegramTransport {
    bot: Bot,
}

impl TelegramTransport {
    /// Wraps a bot handle
    #[must_use]
    pub const fn new(bot: Bot) -> Self {
        Self { bot }
    }
}

fn is_transient(e: &RequestError) -> bool {
    matches!(
        e,
        RequestError::Network(_) | RequestError::Io(_) | RequestError::RetryAfter(_)
    )
}

/// Sleeps for the flood-control interval before the error reaches the retry loop.
async fn wait_out_flood<T>(result: Result<T, RequestError>) -> Result<T, RequestError> {
    if let Err(RequestError::RetryAfter(wait)) = &result {
        warn!(seconds = wait.seconds(), "Telegram flood control, waiting");
        tokio::time::sleep(wait.duration()).await;
    }
    result
}

fn classify(e: RequestError) -> TransportError {
    match &e {
        RequestError::Api(ApiError::MessageNotModified) => TransportError::NotModified,
        RequestError::Api(ApiError::MessageToDeleteNotFound) => TransportError::AlreadyGone,
        RequestError::Api(api) => classify_api_message(&api.to_string()),
        _ => TransportError::Other(e.to_string()),
    }
}

/// Classifies API errors teloxide reports only as text.
fn classify_api_message(message: &str) -> TransportError {
    let lower = message.to_lowercase();
    if lower.contains(ERROR_CANT_PARSE) {
        TransportError::MarkupRejected(message.to_string())
    } else if lower.contains(ERROR_NOT_MODIFIED) {
        TransportError::NotModified
    } else if lower.contains("message") && lower.contains(ERROR_NOT_FOUND) {
        TransportError::AlreadyGone
    } else {
        TransportError::Other(message.to_string())
    }
}

#[async_trait]
impl Transport for TelegramTransport {
    async fn send_message(
        &self,
        chat_id: ChatId,
        text: &str,
        mode: TextMode,
        controls: Option<InlineKeyboardMarkup>,
    ) -> Result<MessageId, TransportError> {
        let message = retry_transient(
            || async {
                let mut req = self.bot.send_message(chat_id, text);
                if mode == TextMode::Html {
                    req = req.parse_mode(ParseMode::Html);
                }
                if let Some(markup) = controls.clone() {
                    req = req.reply_markup(markup);
                }
                wait_out_flood(req.await).await
            },
            is_transient,
        )
        .await
        .map_err(classify)?;
        Ok(message.id)
    }

    async fn edit_message(
        &self,
        chat_id: ChatId,
        message_id: MessageId,
        text: &str,
        mode: TextMode,
        controls: Option<InlineKeyboardMarkup>,
    ) -> Result<(), TransportError> {
        retry_transient(
            || async {
                let mut req = self.bot.edit_message_text(chat_id, message_id, text);
                if mode == TextMode::Html {
                    req = req.parse_mode(ParseMode::Html);
                }
                if let Some(markup) = controls.clone() {
                    req = req.reply_markup(markup);
                }
                wait_out_flood(req.await).await
            },
            is_transient,
        )
        .await
        .map(|_| ())
        .map_err(classify)
    }

    async fn delete_message(
        &self,
        chat_id: ChatId,
        message_id: MessageId,
    ) -> Result<(), TransportError> {
        retry_transient(
            || async {
                wait_out_flood(self.bot.delete_message(chat_id, message_id).await).await
            },
            is_transient,
        )
        .await
        .map(|_| ())
        .map_err(classify)
    }

    async fn send_typing(&self, chat_id: ChatId) -> Result<(), TransportError> {
        self.bot
            .send_chat_action(chat_id, ChatAction::Typing)
            .await
            .map(|_| ())
            .map_err(classify)
    }
}

/// A document attached to a Telegram message, downloaded on demand
pub struct TelegramDocument {
    bot: Bot,
    file_id: FileId,
}

impl TelegramDocument {
    #[must_use]
    pub const fn new(bot: Bot, file_id: FileId) -> Self {
        Self { bot, file_id }
    }
}

#[async_trait]
impl DocumentSource for TelegramDocument {
    async fn fetch(&self) -> Result<Vec<u8>, TransportError> {
        let file = retry_transient(
            || async {
                wait_out_flood(self.bot.get_file(self.file_id.clone()).await).await
            },
            is_transient,
        )
        .await
        .map_err(classify)?;

        let mut bytes = Vec::new();
        self.bot
            .download_file(&file.path, &mut bytes)
            .await
            .map_err(|e| TransportError::Other(format!("Download failed: {e}")))?;
        Ok(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use teloxide::types::Seconds;
    use tokio::time::Instant;

    #[tokio::test(start_paused = true)]
    async fn test_flood_control_waits_requested_interval() {
        let calls = AtomicUsize::new(0);
        let start = Instant::now();

        let result = retry_transient(
            || async {
                let attempt = calls.fetch_add(1, Ordering::SeqCst);
                let reply = if attempt == 0 {
                    Err(RequestError::RetryAfter(Seconds::from_seconds(30)))
                } else {
                    Ok(attempt)
                };
                wait_out_flood(reply).await
            },
            is_transient,
        )
        .await;

        assert_eq!(result.expect("second attempt succeeds"), 1);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert!(start.elapsed() >= Duration::from_secs(30));
    }

    #[tokio::test(start_paused = true)]
    async fn test_other_results_pass_without_waiting() {
        let start = Instant::now();
        let ok: Result<u8, RequestError> = wait_out_flood(Ok(1)).await;
        assert_eq!(ok.expect("ok passes through"), 1);

        let api = wait_out_flood::<()>(Err(RequestError::Api(ApiError::MessageNotModified))).await;
        assert!(matches!(api, Err(RequestError::Api(_))));
        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[test]
    fn test_classify_markup_rejection() {
        let err = classify_api_message(
            "Bad Request: can't parse entities: Unsupported start tag \"h1\" at byte offset 0",
        );
        assert!(matches!(err, TransportError::MarkupRejected(_)));
    }

    #[test]
    fn test_classify_gone_and_not_modified() {
        assert_eq!(
            classify_api_message("Bad Request: message to delete not found"),
            TransportError::AlreadyGone
        );
        assert_eq!(
            classify_api_message("Bad Request: message is not modified: specified new message content"),
            TransportError::NotModified
        );
    }

    #[test]
    fn test_classify_other_errors() {
        assert_eq!(
            classify_api_message("Forbidden: bot was blocked by the user"),
            TransportError::Other("Forbidden: bot was blocked by the user".to_string())
        );
    }
}
