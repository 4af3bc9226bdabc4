//! Telegram update handlers
//!
//! Turns raw updates into [`Event`]s for the [`Conversation`] and answers
//! callback queries with its toast. Users outside the allow-list are
//! filtered out here and never reach the session store.

use std::sync::Arc;

use teloxide::dispatching::UpdateHandler;
use teloxide::prelude::*;
use teloxide::types::{CallbackQuery, User};
use teloxide::utils::command::BotCommands;
use teloxide::RequestError;
use tracing::{debug, error, warn};

use super::access::AccessGate;
use super::conversation::{Caller, Conversation};
use super::events::{Event, Upload};
use super::telegram::TelegramDocument;
use super::views::Msg;
use crate::session::Language;

/// Label used when Telegram does not report a file name
const UNNAMED_DOCUMENT: &str = "document";

/// Supported bot commands
#[derive(BotCommands, Clone, Copy, Debug, PartialEq, Eq)]
#[command(rename_rule = "lowercase", description = "Supported commands:")]
pub enum Command {
    #[command(description = "start over and show the main menu")]
    Start,
    #[command(description = "show the main menu")]
    Menu,
    #[command(description = "show help")]
    Help,
    #[command(description = "change the interface language")]
    Language,
    #[command(description = "cancel the current operation")]
    Cancel,
    #[command(description = "go back to the main menu")]
    Back,
}

impl From<Command> for Event {
    fn from(cmd: Command) -> Self {
        match cmd {
            Command::Start => Self::Restart,
            Command::Menu => Self::Menu,
            Command::Help => Self::Help,
            Command::Language => Self::LanguageMenu,
            Command::Cancel => Self::Cancel,
            Command::Back => Self::Back,
        }
    }
}

/// Dispatch tree: denied users first, then commands, documents and text.
#[must_use]
pub fn schema() -> UpdateHandler<RequestError> {
    dptree::entry()
        .branch(
            Update::filter_callback_query()
                .branch(
                    dptree::filter(|q: CallbackQuery, gate: Arc<AccessGate>| {
                        !gate.is_allowed(q.from.id.0.cast_signed())
                    })
                    .endpoint(deny_callback),
                )
                .branch(dptree::endpoint(on_callback)),
        )
        .branch(
            Update::filter_message()
                .branch(
                    dptree::filter(|msg: Message, gate: Arc<AccessGate>| {
                        !gate.is_allowed(sender_id(&msg))
                    })
                    .endpoint(deny_message),
                )
                .branch(
                    dptree::entry()
                        .filter_command::<Command>()
                        .endpoint(on_command),
                )
                .branch(
                    dptree::filter(|msg: Message| msg.document().is_some())
                        .endpoint(on_document),
                )
                .branch(dptree::filter(|msg: Message| msg.text().is_some()).endpoint(on_text)),
        )
}

fn sender_id(msg: &Message) -> i64 {
    msg.from.as_ref().map_or(0, |u| u.id.0.cast_signed())
}

fn caller(user: &User, chat_id: ChatId) -> Caller {
    Caller {
        user_id: user.id,
        chat_id,
        first_name: user.first_name.clone(),
    }
}

fn message_caller(msg: &Message) -> Option<Caller> {
    msg.from.as_ref().map(|user| caller(user, msg.chat.id))
}

async fn on_command(
    msg: Message,
    cmd: Command,
    conversation: Arc<Conversation>,
) -> Result<(), RequestError> {
    if let Some(caller) = message_caller(&msg) {
        debug!(user_id = caller.user_id.0, ?cmd, "Command");
        conversation.handle(&caller, cmd.into()).await;
    }
    respond(())
}

async fn on_document(
    bot: Bot,
    msg: Message,
    conversation: Arc<Conversation>,
) -> Result<(), RequestError> {
    let (Some(caller), Some(doc)) = (message_caller(&msg), msg.document()) else {
        return respond(());
    };

    let upload = Upload {
        label: doc
            .file_name
            .clone()
            .unwrap_or_else(|| UNNAMED_DOCUMENT.to_string()),
        mime_type: doc.mime_type.as_ref().map(ToString::to_string),
        source: Arc::new(TelegramDocument::new(bot, doc.file.id.clone())),
    };
    debug!(user_id = caller.user_id.0, label = %upload.label, "Document received");
    conversation.handle(&caller, Event::Upload(upload)).await;
    respond(())
}

async fn on_text(msg: Message, conversation: Arc<Conversation>) -> Result<(), RequestError> {
    if let (Some(caller), Some(text)) = (message_caller(&msg), msg.text()) {
        conversation
            .handle(&caller, Event::Text(text.to_string()))
            .await;
    }
    respond(())
}

async fn on_callback(
    bot: Bot,
    q: CallbackQuery,
    conversation: Arc<Conversation>,
) -> Result<(), RequestError> {
    let origin = q.message.as_ref().map(|m| m.id());
    let chat_id = q
        .message
        .as_ref()
        .map_or_else(|| ChatId::from(q.from.id), |m| m.chat().id);
    let payload = q.data.as_deref().unwrap_or_default();

    let outcome = conversation
        .handle(&caller(&q.from, chat_id), Event::from_callback(payload, origin))
        .await;
    debug!(user_id = q.from.id.0, state = ?outcome.state, "Callback handled");

    let mut answer = bot.answer_callback_query(q.id.clone());
    if let Some(toast) = outcome.toast {
        answer = answer.text(toast);
    }
    // Fails when the query is too old, e.g. after a long analysis
    if let Err(e) = answer.await {
        warn!(user_id = q.from.id.0, "Failed to answer callback query: {e}");
    }
    respond(())
}

async fn deny_message(bot: Bot, msg: Message, gate: Arc<AccessGate>) -> Result<(), RequestError> {
    let user_name = msg
        .from
        .as_ref()
        .map_or_else(|| "Unknown".to_string(), |u| u.first_name.clone());

    if gate.should_reply(sender_id(&msg), &user_name).await {
        let text = Msg::AccessDenied.text(Language::default());
        if let Err(e) = bot.send_message(msg.chat.id, text).await {
            error!(user_id = sender_id(&msg), "Failed to send access denied message: {e}");
        }
    }
    respond(())
}

async fn deny_callback(
    bot: Bot,
    q: CallbackQuery,
    gate: Arc<AccessGate>,
) -> Result<(), RequestError> {
    let user_id = q.from.id.0.cast_signed();
    let mut answer = bot.answer_callback_query(q.id.clone());
    if gate.should_reply(user_id, &q.from.first_name).await {
        answer = answer.text(Msg::AccessDenied.text(Language::default()));
    }
    if let Err(e) = answer.await {
        warn!(user_id, "Failed to answer callback query: {e}");
    }
    respond(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_commands_parse_lowercase() {
        assert_eq!(
            Command::parse("/start", "pdf_bot").expect("start parses"),
            Command::Start
        );
        assert_eq!(
            Command::parse("/language", "pdf_bot").expect("language parses"),
            Command::Language
        );
        assert!(Command::parse("/unknown", "pdf_bot").is_err());
    }

    #[test]
    fn test_commands_map_to_events() {
        assert!(matches!(Event::from(Command::Start), Event::Restart));
        assert!(matches!(Event::from(Command::Menu), Event::Menu));
        assert!(matches!(Event::from(Command::Language), Event::LanguageMenu));
        assert!(matches!(Event::from(Command::Cancel), Event::Cancel));
        assert!(matches!(Event::from(Command::Back), Event::Back));
    }
}
