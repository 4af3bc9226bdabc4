//! Testing helpers and mock utilities.
//!
//! Provides convenient constructors for mocked transports and translators
//! and small helpers for inspecting inline keyboards.

use std::sync::atomic::{AtomicI32, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use mockall::predicate::always;
use teloxide::types::{
    ChatId, InlineKeyboardButton, InlineKeyboardButtonKind, InlineKeyboardMarkup, MessageId,
};

use crate::bot::transport::{MockTransport, TextMode, Transport, TransportError};
use crate::translate::MockTranslator;

/// Error Telegram returns for unparseable HTML.
#[must_use]
pub fn rejects_markup() -> TransportError {
    TransportError::MarkupRejected("Bad Request: can't parse entities".to_string())
}

/// Single-column keyboard whose buttons carry the given callback payloads.
#[must_use]
pub fn keyboard_with(payloads: &[&str]) -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(
        payloads
            .iter()
            .map(|data| vec![InlineKeyboardButton::callback(*data, *data)])
            .collect::<Vec<_>>(),
    )
}

/// Callback payloads of every button, row by row.
#[must_use]
pub fn callback_payloads(markup: &InlineKeyboardMarkup) -> Vec<String> {
    markup
        .inline_keyboard
        .iter()
        .flatten()
        .filter_map(|button| match &button.kind {
            InlineKeyboardButtonKind::CallbackData(data) => Some(data.clone()),
            _ => None,
        })
        .collect()
}

/// Create a mock transport that accepts every call.
///
/// New messages get increasing ids starting at 1.
#[must_use]
pub fn mock_transport_accepting_all() -> MockTransport {
    let next_id = Arc::new(AtomicI32::new(1));
    let mut mock = MockTransport::new();

    mock.expect_send_message()
        .returning(move |_, _, _, _| Ok(MessageId(next_id.fetch_add(1, Ordering::SeqCst))));
    mock.expect_edit_message()
        .returning(|_, _, _, _, _| Ok(()));
    mock.expect_delete_message()
        .with(always(), always())
        .returning(|_, _| Ok(()));
    mock.expect_send_typing().returning(|_| Ok(()));

    mock
}

/// Create a mock translator that returns its input unchanged.
#[must_use]
pub fn mock_translator_identity() -> MockTranslator {
    let mut mock = MockTranslator::new();
    mock.expect_translate()
        .returning(|text, _| Ok(text.to_string()));
    mock
}

/// One call observed by [`RecordingTransport`].
#[derive(Debug, Clone, PartialEq)]
pub enum Sent {
    Message {
        id: MessageId,
        text: String,
        mode: TextMode,
        controls: Option<InlineKeyboardMarkup>,
    },
    Edit {
        id: MessageId,
        text: String,
        controls: Option<InlineKeyboardMarkup>,
    },
    Delete(MessageId),
}

/// Transport fake that accepts everything and records what it was asked to do.
#[derive(Default)]
pub struct RecordingTransport {
    next_id: AtomicI32,
    log: Mutex<Vec<Sent>>,
}

impl RecordingTransport {
    /// Everything recorded so far, in call order.
    #[must_use]
    pub fn log(&self) -> Vec<Sent> {
        self.log.lock().map(|log| log.clone()).unwrap_or_default()
    }

    /// Texts of new messages, in send order.
    #[must_use]
    pub fn sent_texts(&self) -> Vec<String> {
        self.log()
            .into_iter()
            .filter_map(|entry| match entry {
                Sent::Message { text, .. } => Some(text),
                _ => None,
            })
            .collect()
    }

    fn record(&self, entry: Sent) {
        if let Ok(mut log) = self.log.lock() {
            log.push(entry);
        }
    }
}

#[async_trait]
impl Transport for RecordingTransport {
    async fn send_message(
        &self,
        _chat_id: ChatId,
        text: &str,
        mode: TextMode,
        controls: Option<InlineKeyboardMarkup>,
    ) -> Result<MessageId, TransportError> {
        let id = MessageId(self.next_id.fetch_add(1, Ordering::SeqCst) + 1);
        self.record(Sent::Message {
            id,
            text: text.to_string(),
            mode,
            controls,
        });
        Ok(id)
    }

    async fn edit_message(
        &self,
        _chat_id: ChatId,
        message_id: MessageId,
        text: &str,
        _mode: TextMode,
        controls: Option<InlineKeyboardMarkup>,
    ) -> Result<(), TransportError> {
        self.record(Sent::Edit {
            id: message_id,
            text: text.to_string(),
            controls,
        });
        Ok(())
    }

    async fn delete_message(
        &self,
        _chat_id: ChatId,
        message_id: MessageId,
    ) -> Result<(), TransportError> {
        self.record(Sent::Delete(message_id));
        Ok(())
    }

    async fn send_typing(&self, _chat_id: ChatId) -> Result<(), TransportError> {
        Ok(())
    }
}
