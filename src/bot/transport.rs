//! Chat transport seam
//!
//! The conversation core talks to Telegram only through [`Transport`], so
//! it can be driven by fakes in tests. Errors are pre-classified into the
//! few cases the delivery layer reacts to.

use async_trait::async_trait;
use teloxide::types::{ChatId, InlineKeyboardMarkup, MessageId};
use thiserror::Error;

/// Errors surfaced by the transport
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// The rich markup in the text could not be parsed
    #[error("Markup rejected: {0}")]
    MarkupRejected(String),
    /// An edit would not change the message
    #[error("Message is not modified")]
    NotModified,
    /// The message no longer exists or can no longer be touched
    #[error("Message is already gone")]
    AlreadyGone,
    /// Anything else, including exhausted network retries
    #[error("Transport error: {0}")]
    Other(String),
}

/// How the transport should interpret message text
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextMode {
    /// Telegram HTML
    Html,
    /// Text shown verbatim
    Plain,
}

/// Outbound side of the chat transport
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Transport: Send + Sync {
    /// Sends a new message and returns its id.
    async fn send_message(
        &self,
        chat_id: ChatId,
        text: &str,
        mode: TextMode,
        controls: Option<InlineKeyboardMarkup>,
    ) -> Result<MessageId, TransportError>;

    /// Replaces the text and controls of an existing message.
    async fn edit_message(
        &self,
        chat_id: ChatId,
        message_id: MessageId,
        text: &str,
        mode: TextMode,
        controls: Option<InlineKeyboardMarkup>,
    ) -> Result<(), TransportError>;

    /// Deletes a message.
    async fn delete_message(&self, chat_id: ChatId, message_id: MessageId)
        -> Result<(), TransportError>;

    /// Shows the "typing…" indicator.
    async fn send_typing(&self, chat_id: ChatId) -> Result<(), TransportError>;
}

/// Lazily downloaded content of an uploaded file
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DocumentSource: Send + Sync {
    /// Downloads the file's bytes.
    async fn fetch(&self) -> Result<Vec<u8>, TransportError>;
}
