//! Per-user conversation state machine
//!
//! [`Conversation::handle`] is the single entry point: it looks up the
//! user's session, holds its lock for the whole event and maps
//! `(state, event)` to views, collaborator calls and the next state.
//!
//! Holding the lock for the whole event serializes a user's events in
//! arrival order. A restart sent while an analysis is running waits for it,
//! so the result is delivered first and the restart then resets the view.

mod analysis;
mod documents;
mod menu;

use std::sync::Arc;
use std::time::Duration;

use teloxide::types::{ChatId, InlineKeyboardMarkup, MessageId, UserId};
use tracing::{debug, error, warn};

use super::delivery::{DeliveryGateway, Target};
use super::events::{Action, Event};
use super::state::ConversationState;
use super::transport::TransportError;
use super::views::{keyboards, Msg};
use crate::backend::{DocumentBackend, DocumentHandle};
use crate::session::{Session, SessionStore};
use crate::translate::Localizer;

/// Tunables of the conversation flow
#[derive(Debug, Clone, Copy)]
pub struct ConversationSettings {
    /// Bot messages left visible when a menu is shown
    pub keep_messages: usize,
    /// Pause between the language confirmation and the menu
    pub language_confirm_delay: Duration,
}

/// Who sent an event
#[derive(Debug, Clone)]
pub struct Caller {
    pub user_id: UserId,
    pub chat_id: ChatId,
    /// Shown in the welcome message
    pub first_name: String,
}

/// Result of handling one event
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outcome {
    /// State the session settled in
    pub state: ConversationState,
    /// Short notice for the button press that triggered the event, if any
    pub toast: Option<String>,
}

/// How a transition went
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Ack {
    Done,
    /// Handled, with a short notice for the pressed button
    Toast(Msg),
    /// Not valid in the current state
    Ignored,
}

type Step = Result<Ack, TransportError>;

/// Orchestrates sessions, views and collaborators
pub struct Conversation {
    gateway: DeliveryGateway,
    backend: Arc<dyn DocumentBackend>,
    localizer: Localizer,
    sessions: Arc<SessionStore>,
    settings: ConversationSettings,
}

impl Conversation {
    /// Wires the machine to its collaborators
    #[must_use]
    pub fn new(
        gateway: DeliveryGateway,
        backend: Arc<dyn DocumentBackend>,
        localizer: Localizer,
        sessions: Arc<SessionStore>,
        settings: ConversationSettings,
    ) -> Self {
        Self {
            gateway,
            backend,
            localizer,
            sessions,
            settings,
        }
    }

    /// Session store backing the machine
    #[must_use]
    pub fn sessions(&self) -> &Arc<SessionStore> {
        &self.sessions
    }

    /// Handles one inbound event for `caller`.
    ///
    /// Never fails: collaborator errors become error views inside the flows,
    /// and transport errors end in the generic error view with a restart
    /// button.
    pub async fn handle(&self, caller: &Caller, event: Event) -> Outcome {
        let shared = self
            .sessions
            .get_or_create(caller.user_id, caller.chat_id)
            .await;
        let mut session = shared.lock().await;

        let from_button = matches!(event, Event::Button { .. } | Event::UnknownButton { .. });
        let toast = match self.dispatch(caller, &mut session, event).await {
            Ok(Ack::Done) => None,
            Ok(Ack::Toast(msg)) => Some(msg.text(session.language).to_string()),
            Ok(Ack::Ignored) if from_button => {
                Some(Msg::StaleButton.text(session.language).to_string())
            }
            Ok(Ack::Ignored) => {
                self.acknowledge(&mut session).await;
                None
            }
            Err(e) => {
                self.transport_failure(&mut session, &e).await;
                None
            }
        };

        Outcome {
            state: session.state,
            toast,
        }
    }

    async fn dispatch(&self, caller: &Caller, session: &mut Session, event: Event) -> Step {
        use ConversationState::{Analyzing, LanguageSelection, MainMenu, Uploading};

        match (session.state, event) {
            (_, Event::Restart) => self.restart(session, &caller.first_name).await,
            (_, Event::Cancel) => self.cancel(session).await,
            (_, Event::Help) => self.help(session).await,
            (_, Event::LanguageMenu) => self.show_languages(session, None).await,
            (_, Event::Menu | Event::Back) => self.back_to_menu(session, None).await,
            (
                _,
                Event::Button {
                    action: Action::Back,
                    origin,
                },
            ) => self.back_to_menu(session, origin).await,
            (_, Event::UnknownButton { .. }) => Ok(Ack::Ignored),
            (MainMenu | Uploading, Event::Upload(upload)) => self.upload(session, upload).await,
            (Uploading, _) => self.remind_upload(session).await,
            (
                LanguageSelection,
                Event::Button {
                    action: Action::SetLanguage(language),
                    origin,
                },
            ) => self.set_language(session, language, origin).await,
            (Analyzing, Event::Text(question)) => self.ask(session, &question).await,
            (MainMenu, Event::Text(_)) => self.use_menu(session).await,
            (MainMenu | Analyzing, Event::Button { action, origin }) => {
                self.on_button(session, action, origin).await
            }
            (LanguageSelection, _) | (Analyzing, Event::Upload(_)) => Ok(Ack::Ignored),
        }
    }

    async fn on_button(
        &self,
        session: &mut Session,
        action: Action,
        origin: Option<MessageId>,
    ) -> Step {
        match action {
            Action::MenuUpload => self.prompt_upload(session, origin).await,
            Action::MenuDocuments => self.show_documents(session, origin, None).await,
            Action::MenuAnalyze => self.show_analysis_options(session, origin).await,
            Action::MenuAsk => self.prompt_question(session, origin).await,
            Action::MenuCompare => self.start_compare(session, origin).await,
            Action::MenuLanguage => self.show_languages(session, origin).await,
            Action::SelectDocument(token) => self.select_document(session, &token, origin).await,
            Action::DeleteDocument(token) => self.delete_document(session, &token, origin).await,
            Action::ToggleCompare(token) => self.toggle_compare(session, &token, origin).await,
            Action::ExecuteCompare => self.choose_compare_kind(session, origin).await,
            Action::RunCompare(kind) => self.run_compare(session, kind).await,
            Action::Analyze(kind) => self.run_fixed_analysis(session, kind).await,
            Action::SetLanguage(_) | Action::Back | Action::Restart => Ok(Ack::Ignored),
        }
    }

    // ─────────────────────────────────────────────────────────────────────
    // Shared view helpers
    // ─────────────────────────────────────────────────────────────────────

    /// Replaces `origin` with the view, or sends it as a new message when
    /// there is nothing to edit or the edit fails.
    async fn show(
        &self,
        session: &mut Session,
        origin: Option<MessageId>,
        text: &str,
        controls: Option<InlineKeyboardMarkup>,
    ) -> Result<MessageId, TransportError> {
        if let Some(message_id) = origin {
            match self
                .gateway
                .deliver(session, Target::Edit(message_id), text, controls.clone())
                .await
            {
                Ok(id) => return Ok(id),
                Err(e) => debug!(message_id = message_id.0, "Edit failed, sending anew: {e}"),
            }
        }
        self.gateway
            .deliver(session, Target::New, text, controls)
            .await
    }

    /// Sends a new message with a single back-to-menu button.
    async fn notice(&self, session: &mut Session, text: &str) -> Step {
        let controls = keyboards::back_to_menu(session.language);
        self.gateway
            .deliver(session, Target::New, text, Some(controls))
            .await?;
        Ok(Ack::Done)
    }

    /// Renders a collaborator failure and settles in the main menu.
    async fn collaborator_failure(
        &self,
        session: &mut Session,
        origin: Option<MessageId>,
        msg: Msg,
        error: &(dyn std::fmt::Display + Sync),
    ) -> Step {
        error!(user_id = session.user_id().0, "Collaborator call failed: {error}");
        session.state = ConversationState::MainMenu;
        let text = super::views::render(session.language, msg, &[("error", &error.to_string())]);
        let controls = keyboards::back_to_menu(session.language);
        self.show(session, origin, &text, Some(controls)).await?;
        Ok(Ack::Done)
    }

    /// Releases a backend handle; failures are only logged.
    async fn release(&self, handle: &DocumentHandle) {
        if let Err(e) = self.backend.release_document(handle).await {
            warn!(name = %handle.name, "Failed to release document: {e}");
        }
    }

    async fn acknowledge(&self, session: &mut Session) {
        if let Err(e) = self.use_menu(session).await {
            self.transport_failure(session, &e).await;
        }
    }

    async fn transport_failure(&self, session: &mut Session, e: &TransportError) {
        error!(user_id = session.user_id().0, "Transport failure: {e}");
        session.state = ConversationState::MainMenu;
        let language = session.language;
        if let Err(e) = self
            .gateway
            .deliver(
                session,
                Target::New,
                Msg::GenericError.text(language),
                Some(keyboards::restart(language)),
            )
            .await
        {
            warn!(user_id = session.user_id().0, "Could not send error view: {e}");
        }
    }
}

#[cfg(test)]
mod tests;
