//! Uploading, listing, selecting and deleting documents

use teloxide::types::MessageId;
use tracing::info;

use super::{Ack, Conversation, Step};
use crate::bot::delivery::Target;
use crate::bot::events::Upload;
use crate::bot::state::ConversationState;
use crate::bot::views::{self, keyboards, render, Msg};
use crate::session::{DocToken, Session};

impl Conversation {
    pub(super) async fn prompt_upload(
        &self,
        session: &mut Session,
        origin: Option<MessageId>,
    ) -> Step {
        session.state = ConversationState::Uploading;
        let language = session.language;
        self.show(
            session,
            origin,
            Msg::UploadPrompt.text(language),
            Some(keyboards::back_to_menu(language)),
        )
        .await?;
        Ok(Ack::Done)
    }

    pub(super) async fn remind_upload(&self, session: &mut Session) -> Step {
        let text = Msg::AwaitingUpload.text(session.language);
        self.notice(session, text).await
    }

    /// Downloads the file, registers it with the backend and makes it the
    /// active document. Progress is shown by editing a single message.
    pub(super) async fn upload(&self, session: &mut Session, upload: Upload) -> Step {
        let language = session.language;
        if !upload.is_pdf() {
            return self.notice(session, Msg::OnlyPdf.text(language)).await;
        }

        let label = upload.label.as_str();
        let args = [("doc", label)];
        let progress = self
            .gateway
            .deliver(
                session,
                Target::New,
                &render(language, Msg::Downloading, &args),
                None,
            )
            .await?;

        let bytes = match upload.source.fetch().await {
            Ok(bytes) => bytes,
            Err(e) => {
                return self
                    .collaborator_failure(session, Some(progress), Msg::UploadError, &e)
                    .await
            }
        };

        self.gateway
            .deliver(
                session,
                Target::Edit(progress),
                &render(language, Msg::UploadingToAi, &args),
                None,
            )
            .await?;

        let handle = match self.backend.register_document(label, bytes).await {
            Ok(handle) => handle,
            Err(e) => {
                return self
                    .collaborator_failure(session, Some(progress), Msg::UploadError, &e)
                    .await
            }
        };

        if let Some(replaced) = session.add_document(label, handle) {
            self.release(&replaced).await;
        }
        session.activate(label);
        session.state = ConversationState::MainMenu;
        info!(
            user_id = session.user_id().0,
            label = %label,
            documents = session.document_count(),
            "Document stored"
        );

        self.gateway
            .deliver(
                session,
                Target::Edit(progress),
                &render(language, Msg::UploadSuccess, &args),
                Some(keyboards::upload_success(language)),
            )
            .await?;
        Ok(Ack::Done)
    }

    /// Lists stored documents, or the menu when there are none.
    pub(super) async fn show_documents(
        &self,
        session: &mut Session,
        origin: Option<MessageId>,
        notice: Option<String>,
    ) -> Step {
        if session.document_count() == 0 {
            self.show_menu(session, origin, notice).await?;
            return Ok(Ack::Done);
        }

        let list = views::documents_text(session);
        let text = match notice {
            Some(notice) => format!("{notice}\n\n{list}"),
            None => list,
        };
        let controls = keyboards::documents(session);
        self.show(session, origin, &text, Some(controls)).await?;
        Ok(Ack::Done)
    }

    pub(super) async fn select_document(
        &self,
        session: &mut Session,
        token: &DocToken,
        origin: Option<MessageId>,
    ) -> Step {
        let Some(label) = session.label_for(token).map(ToString::to_string) else {
            return self.no_active_document(session).await;
        };

        session.activate(&label);
        session.state = ConversationState::MainMenu;
        let notice = render(session.language, Msg::DocumentSelected, &[("doc", &label)]);
        self.show_menu(session, origin, Some(notice)).await?;
        Ok(Ack::Done)
    }

    /// Removes the document and releases its backend handle best-effort.
    pub(super) async fn delete_document(
        &self,
        session: &mut Session,
        token: &DocToken,
        origin: Option<MessageId>,
    ) -> Step {
        let Some(label) = session.label_for(token).map(ToString::to_string) else {
            return self.no_active_document(session).await;
        };

        if let Some(handle) = session.remove_document(&label) {
            self.release(&handle).await;
        }
        info!(user_id = session.user_id().0, label = %label, "Document deleted");

        let notice = render(session.language, Msg::DocumentDeleted, &[("doc", &label)]);
        self.show_documents(session, origin, Some(notice)).await
    }

    /// Rejects a document action in place.
    pub(super) async fn no_active_document(&self, session: &mut Session) -> Step {
        let text = Msg::NoActiveDocument.text(session.language);
        self.notice(session, text).await
    }
}
