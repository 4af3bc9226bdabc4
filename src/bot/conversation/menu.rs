//! Menu, commands and language selection

use teloxide::types::MessageId;
use tracing::info;

use super::{Ack, Conversation, Step};
use crate::bot::delivery::Target;
use crate::bot::state::ConversationState;
use crate::bot::transport::TransportError;
use crate::bot::views::{self, keyboards, render, Msg};
use crate::session::{cleanup, Language, Session};

impl Conversation {
    /// Cleans up old messages and shows the main menu, optionally headed by
    /// a one-line notice.
    pub(super) async fn show_menu(
        &self,
        session: &mut Session,
        origin: Option<MessageId>,
        notice: Option<String>,
    ) -> Result<MessageId, TransportError> {
        cleanup::enforce(
            self.gateway.transport(),
            session,
            self.settings.keep_messages,
        )
        .await;

        let menu = views::menu_text(session);
        let text = match notice {
            Some(notice) => format!("{notice}\n\n{menu}"),
            None => menu,
        };
        let controls = keyboards::main_menu(session);
        self.show(session, origin, &text, Some(controls)).await
    }

    pub(super) async fn back_to_menu(
        &self,
        session: &mut Session,
        origin: Option<MessageId>,
    ) -> Step {
        session.state = ConversationState::MainMenu;
        self.show_menu(session, origin, None).await?;
        Ok(Ack::Done)
    }

    pub(super) async fn restart(&self, session: &mut Session, first_name: &str) -> Step {
        session.state = ConversationState::MainMenu;
        session.clear_compare();

        let welcome = render(session.language, Msg::Welcome, &[("name", first_name)]);
        self.gateway
            .deliver(session, Target::New, &welcome, None)
            .await?;
        self.show_menu(session, None, None).await?;
        Ok(Ack::Done)
    }

    pub(super) async fn cancel(&self, session: &mut Session) -> Step {
        session.state = ConversationState::MainMenu;
        session.clear_compare();
        let text = Msg::Cancelled.text(session.language);
        self.gateway.deliver(session, Target::New, text, None).await?;
        Ok(Ack::Done)
    }

    pub(super) async fn help(&self, session: &mut Session) -> Step {
        let text = Msg::Help.text(session.language);
        self.gateway.deliver(session, Target::New, text, None).await?;
        Ok(Ack::Done)
    }

    pub(super) async fn use_menu(&self, session: &mut Session) -> Step {
        let text = Msg::UseMenu.text(session.language);
        self.gateway.deliver(session, Target::New, text, None).await?;
        Ok(Ack::Done)
    }

    pub(super) async fn show_languages(
        &self,
        session: &mut Session,
        origin: Option<MessageId>,
    ) -> Step {
        session.state = ConversationState::LanguageSelection;
        let text = Msg::LanguagePrompt.text(session.language);
        self.show(session, origin, text, Some(keyboards::languages()))
            .await?;
        Ok(Ack::Done)
    }

    /// Confirms the new language, then lets the menu replace the
    /// confirmation after a short pause.
    pub(super) async fn set_language(
        &self,
        session: &mut Session,
        language: Language,
        origin: Option<MessageId>,
    ) -> Step {
        session.language = language;
        info!(user_id = session.user_id().0, language = language.code(), "Language changed");

        let confirmation = self
            .show(session, origin, Msg::LanguageSet.text(language), None)
            .await?;
        tokio::time::sleep(self.settings.language_confirm_delay).await;

        session.state = ConversationState::MainMenu;
        self.show_menu(session, Some(confirmation), None).await?;
        Ok(Ack::Done)
    }
}
