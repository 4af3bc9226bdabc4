//! Analysis, questions and comparison

use teloxide::types::{InlineKeyboardMarkup, MessageId};
use tracing::{info, warn};

use super::{Ack, Conversation, Step};
use crate::backend::BackendError;
use crate::bot::delivery::Target;
use crate::bot::events::{AnalysisKind, CompareKind};
use crate::bot::state::ConversationState;
use crate::bot::views::{self, keyboards, render, Msg};
use crate::session::{DocToken, Session};

/// Number of documents a comparison needs
const MIN_COMPARE_DOCUMENTS: usize = 2;

/// Labels shown around a backend call
struct ResultView {
    processing: String,
    title: Msg,
    error: Msg,
    controls: InlineKeyboardMarkup,
}

impl Conversation {
    pub(super) async fn show_analysis_options(
        &self,
        session: &mut Session,
        origin: Option<MessageId>,
    ) -> Step {
        let Some(label) = session.active_document().map(ToString::to_string) else {
            return self.no_active_document(session).await;
        };

        // Free text typed next is a custom prompt
        session.state = ConversationState::Analyzing;
        let language = session.language;
        let text = render(language, Msg::AnalyzeOptions, &[("doc", &label)]);
        self.show(session, origin, &text, Some(keyboards::analysis_options(language)))
            .await?;
        Ok(Ack::Done)
    }

    pub(super) async fn prompt_question(
        &self,
        session: &mut Session,
        origin: Option<MessageId>,
    ) -> Step {
        let Some(label) = session.active_document().map(ToString::to_string) else {
            return self.no_active_document(session).await;
        };

        session.state = ConversationState::Analyzing;
        let language = session.language;
        let text = render(language, Msg::AskPrompt, &[("doc", &label)]);
        self.show(session, origin, &text, Some(keyboards::back_to_menu(language)))
            .await?;
        Ok(Ack::Done)
    }

    /// Free text while analyzing: a question about the active document.
    pub(super) async fn ask(&self, session: &mut Session, question: &str) -> Step {
        let language = session.language;
        let controls = keyboards::follow_up(language, Msg::BtnAskAnother);
        self.run_analysis(session, question, controls).await
    }

    pub(super) async fn run_fixed_analysis(&self, session: &mut Session, kind: AnalysisKind) -> Step {
        let language = session.language;
        let prompt = kind.prompt().text(language);
        let controls = keyboards::follow_up(language, Msg::BtnFollowUp);
        self.run_analysis(session, prompt, controls).await
    }

    async fn run_analysis(
        &self,
        session: &mut Session,
        prompt: &str,
        controls: InlineKeyboardMarkup,
    ) -> Step {
        let Some((label, handle)) = session
            .active()
            .map(|(label, handle)| (label.to_string(), handle.clone()))
        else {
            session.state = ConversationState::MainMenu;
            return self.no_active_document(session).await;
        };

        info!(user_id = session.user_id().0, label = %label, "Analyzing document");
        let view = ResultView {
            processing: render(session.language, Msg::Analyzing, &[("doc", &label)]),
            title: Msg::AnalysisTitle,
            error: Msg::AnalysisError,
            controls,
        };
        let ack = self
            .deliver_result(session, view, self.backend.analyze(&handle, prompt))
            .await?;
        // Another question goes through the follow-up button
        session.state = ConversationState::MainMenu;
        Ok(ack)
    }

    /// Entering the comparison flow always starts from an empty selection.
    pub(super) async fn start_compare(
        &self,
        session: &mut Session,
        origin: Option<MessageId>,
    ) -> Step {
        if session.document_count() < MIN_COMPARE_DOCUMENTS {
            let text = Msg::NeedTwoDocuments.text(session.language);
            return self.notice(session, text).await;
        }

        session.clear_compare();
        self.show_compare_selection(session, origin).await
    }

    pub(super) async fn toggle_compare(
        &self,
        session: &mut Session,
        token: &DocToken,
        origin: Option<MessageId>,
    ) -> Step {
        let Some(label) = session.label_for(token).map(ToString::to_string) else {
            return Ok(Ack::Ignored);
        };
        session.toggle_compare(&label);
        self.show_compare_selection(session, origin).await
    }

    async fn show_compare_selection(
        &self,
        session: &mut Session,
        origin: Option<MessageId>,
    ) -> Step {
        let text = views::compare_selection_text(session);
        let controls = keyboards::compare_selection(session);
        self.show(session, origin, &text, Some(controls)).await?;
        Ok(Ack::Done)
    }

    pub(super) async fn choose_compare_kind(
        &self,
        session: &mut Session,
        origin: Option<MessageId>,
    ) -> Step {
        if session.compare_selection().len() < MIN_COMPARE_DOCUMENTS {
            return Ok(Ack::Toast(Msg::SelectAtLeastTwo));
        }

        let text = views::compare_kinds_text(session);
        let controls = keyboards::compare_kinds(session.language);
        self.show(session, origin, &text, Some(controls)).await?;
        Ok(Ack::Done)
    }

    /// Compares the selected documents. The result's last chunk carries
    /// the main menu.
    pub(super) async fn run_compare(&self, session: &mut Session, kind: CompareKind) -> Step {
        let handles = session.compare_handles();
        if handles.len() < MIN_COMPARE_DOCUMENTS {
            return Ok(Ack::Toast(Msg::SelectAtLeastTwo));
        }

        let language = session.language;
        info!(user_id = session.user_id().0, documents = handles.len(), "Comparing documents");
        let view = ResultView {
            processing: Msg::Comparing.text(language).to_string(),
            title: Msg::ComparisonTitle,
            error: Msg::ComparisonError,
            controls: keyboards::main_menu(session),
        };
        let prompt = kind.prompt().text(language);
        let step = self
            .deliver_result(session, view, self.backend.compare(&handles, prompt))
            .await;
        session.clear_compare();
        step
    }

    /// Shows a processing message while `call` runs, then replaces it with
    /// the translated, chunked result or an error view.
    async fn deliver_result<F>(&self, session: &mut Session, view: ResultView, call: F) -> Step
    where
        F: std::future::Future<Output = Result<String, BackendError>> + Send,
    {
        let chat_id = session.chat_id();
        if let Err(e) = self.gateway.transport().send_typing(chat_id).await {
            warn!(chat_id = chat_id.0, "Typing indicator failed: {e}");
        }
        let processing = self
            .gateway
            .deliver(session, Target::New, &view.processing, None)
            .await?;

        let text = match call.await {
            Ok(text) if text.trim().is_empty() => {
                let e = BackendError::Api("empty response".to_string());
                return self
                    .collaborator_failure(session, Some(processing), view.error, &e)
                    .await;
            }
            Ok(text) => text,
            Err(e) => {
                return self
                    .collaborator_failure(session, Some(processing), view.error, &e)
                    .await
            }
        };

        let language = session.language;
        let localized = self
            .localizer
            .localize(&text, language, Msg::TranslationFailed.text(language))
            .await;

        if let Err(e) = self
            .gateway
            .transport()
            .delete_message(chat_id, processing)
            .await
        {
            warn!(message_id = processing.0, "Could not delete processing message: {e}");
        }
        session.forget_message(processing);

        self.gateway
            .deliver_chunked(
                session,
                &localized,
                Some(view.title.text(language)),
                Some(view.controls),
            )
            .await?;
        Ok(Ack::Done)
    }
}
