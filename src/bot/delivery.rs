//! Safe message delivery with graceful formatting degradation.
//!
//! Every outgoing message goes through [`DeliveryGateway::deliver`]:
//!
//! 1. the text is sent as Telegram HTML;
//! 2. if Telegram rejects the markup, the sanitized text is sent as HTML;
//! 3. if that is rejected too, the sanitized text is stripped of all markup
//!    and sent as plain text.
//!
//! "Not modified" on an edit counts as success. Any other error is returned
//! to the caller untouched.

use std::sync::Arc;

use teloxide::types::{InlineKeyboardMarkup, MessageId};
use tracing::{debug, warn};

use super::transport::{TextMode, Transport, TransportError};
use crate::session::Session;
use crate::text::{chunker, markdown, sanitize, strip_markup};

/// Where a message goes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    /// Send a new message
    New,
    /// Replace an existing message
    Edit(MessageId),
}

/// Sends and edits messages through the sanitize fallback chain
#[derive(Clone)]
pub struct DeliveryGateway {
    transport: Arc<dyn Transport>,
    message_limit: usize,
}

impl DeliveryGateway {
    /// Creates a gateway that chunks long texts at `message_limit` characters
    #[must_use]
    pub fn new(transport: Arc<dyn Transport>, message_limit: usize) -> Self {
        Self {
            transport,
            message_limit,
        }
    }

    /// Underlying transport, for calls that need no fallback handling
    #[must_use]
    pub fn transport(&self) -> &dyn Transport {
        self.transport.as_ref()
    }

    /// Delivers one message and returns its id.
    ///
    /// A successful new message is tracked on `session` for cleanup.
    ///
    /// # Errors
    ///
    /// Returns any transport error other than a markup rejection (which is
    /// handled by the fallback chain) or "not modified" on an edit.
    pub async fn deliver(
        &self,
        session: &mut Session,
        target: Target,
        text: &str,
        controls: Option<InlineKeyboardMarkup>,
    ) -> Result<MessageId, TransportError> {
        let chat_id = session.chat_id();

        let result = match self.attempt(session, target, text, TextMode::Html, controls.clone()).await
        {
            Err(TransportError::MarkupRejected(reason)) => {
                debug!(chat_id = chat_id.0, "Markup rejected, retrying sanitized: {reason}");
                let sanitized = sanitize(text);
                match self
                    .attempt(session, target, &sanitized, TextMode::Html, controls.clone())
                    .await
                {
                    Err(TransportError::MarkupRejected(reason)) => {
                        warn!(chat_id = chat_id.0, "Sanitized markup rejected, sending plain text: {reason}");
                        let plain = strip_markup(&sanitized);
                        self.attempt(session, target, &plain, TextMode::Plain, controls)
                            .await
                    }
                    other => other,
                }
            }
            other => other,
        };

        if let (Ok(message_id), Target::New) = (&result, target) {
            session.track_message(*message_id);
        }
        result
    }

    /// Splits Markdown text into bounded chunks, renders each one as HTML
    /// and delivers them in order as new messages.
    ///
    /// Only the final chunk carries `controls`.
    ///
    /// # Errors
    ///
    /// Stops at the first chunk that cannot be delivered.
    pub async fn deliver_chunked(
        &self,
        session: &mut Session,
        text: &str,
        title: Option<&str>,
        controls: Option<InlineKeyboardMarkup>,
    ) -> Result<Vec<MessageId>, TransportError> {
        let chunks = chunker::split(text, title, self.message_limit);
        let last = chunks.len().saturating_sub(1);
        let mut sent = Vec::with_capacity(chunks.len());

        for (idx, chunk) in chunks.into_iter().enumerate() {
            let message = format!("{}{}", chunk.header, markdown::render(&chunk.body));
            let chunk_controls = if idx == last { controls.clone() } else { None };
            sent.push(
                self.deliver(session, Target::New, &message, chunk_controls)
                    .await?,
            );
        }
        Ok(sent)
    }

    async fn attempt(
        &self,
        session: &Session,
        target: Target,
        text: &str,
        mode: TextMode,
        controls: Option<InlineKeyboardMarkup>,
    ) -> Result<MessageId, TransportError> {
        let chat_id = session.chat_id();
        match target {
            Target::New => {
                self.transport
                    .send_message(chat_id, text, mode, controls)
                    .await
            }
            Target::Edit(message_id) => {
                match self
                    .transport
                    .edit_message(chat_id, message_id, text, mode, controls)
                    .await
                {
                    Ok(()) | Err(TransportError::NotModified) => Ok(message_id),
                    Err(e) => Err(e),
                }
            }
        }
    }
}
