use super::*;
use crate::backend::{BackendError, MockDocumentBackend};
use crate::bot::events::{AnalysisKind, CompareKind, Upload};
use crate::bot::transport::{MockDocumentSource, MockTransport, TextMode};
use crate::session::{DocToken, Language};
use crate::testing::{callback_payloads, mock_translator_identity, RecordingTransport, Sent};

const USER: UserId = UserId(7);
const CHAT: ChatId = ChatId(7);

fn handle(name: &str) -> DocumentHandle {
    DocumentHandle {
        name: format!("files/{name}"),
        uri: format!("https://example.test/files/{name}"),
        mime_type: "application/pdf".to_string(),
    }
}

fn caller() -> Caller {
    Caller {
        user_id: USER,
        chat_id: CHAT,
        first_name: "Ann".to_string(),
    }
}

fn conversation(
    transport: Arc<dyn crate::bot::transport::Transport>,
    backend: MockDocumentBackend,
) -> Conversation {
    Conversation::new(
        DeliveryGateway::new(transport, 4000),
        Arc::new(backend),
        Localizer::new(Arc::new(mock_translator_identity()), 4500),
        Arc::new(SessionStore::new()),
        ConversationSettings {
            keep_messages: 3,
            language_confirm_delay: Duration::ZERO,
        },
    )
}

fn pdf_upload(label: &str) -> Event {
    let mut source = MockDocumentSource::new();
    source.expect_fetch().returning(|| Ok(b"%PDF-1.7".to_vec()));
    Event::Upload(Upload {
        label: label.to_string(),
        mime_type: Some("application/pdf".to_string()),
        source: Arc::new(source),
    })
}

fn press(action: Action) -> Event {
    Event::Button {
        action,
        origin: None,
    }
}

async fn seed(conversation: &Conversation, labels: &[&str]) {
    conversation
        .sessions()
        .mutate(USER, CHAT, |session| {
            for label in labels {
                session.add_document(label, handle(label));
            }
        })
        .await;
}

async fn snapshot(conversation: &Conversation) -> Session {
    conversation
        .sessions()
        .mutate(USER, CHAT, |session| session.clone())
        .await
}

async fn token_of(conversation: &Conversation, label: &str) -> DocToken {
    conversation
        .sessions()
        .mutate(USER, CHAT, |session| {
            session
                .documents()
                .find(|(l, _)| *l == label)
                .map(|(_, doc)| doc.token.clone())
        })
        .await
        .expect("document is stored")
}

#[tokio::test]
async fn test_first_upload_activates_document() {
    let mut backend = MockDocumentBackend::new();
    backend
        .expect_register_document()
        .withf(|label, bytes| label == "report.pdf" && bytes.starts_with(b"%PDF"))
        .times(1)
        .returning(|_, _| Ok(handle("h1")));

    let transport = Arc::new(RecordingTransport::default());
    let conv = conversation(transport.clone(), backend);
    conv.handle(&caller(), press(Action::MenuUpload)).await;
    let outcome = conv.handle(&caller(), pdf_upload("report.pdf")).await;

    assert_eq!(outcome.state, ConversationState::MainMenu);
    let session = snapshot(&conv).await;
    assert_eq!(session.document_count(), 1);
    assert_eq!(session.active_document(), Some("report.pdf"));
    assert_eq!(session.handle("report.pdf"), Some(&handle("h1")));

    let last = transport.log().pop();
    assert!(matches!(
        last,
        Some(Sent::Edit { text, controls: Some(_), .. }) if text.contains("Successfully uploaded: report.pdf")
    ));
}

#[tokio::test]
async fn test_non_pdf_upload_is_rejected_in_place() {
    let backend = MockDocumentBackend::new();
    let transport = Arc::new(RecordingTransport::default());
    let conv = conversation(transport.clone(), backend);
    conv.handle(&caller(), press(Action::MenuUpload)).await;

    let source = MockDocumentSource::new();
    let outcome = conv
        .handle(
            &caller(),
            Event::Upload(Upload {
                label: "notes.docx".to_string(),
                mime_type: Some("application/msword".to_string()),
                source: Arc::new(source),
            }),
        )
        .await;

    assert_eq!(outcome.state, ConversationState::Uploading);
    assert_eq!(snapshot(&conv).await.document_count(), 0);
    assert!(transport
        .sent_texts()
        .iter()
        .any(|text| text.contains("Only PDF documents")));
}

#[tokio::test]
async fn test_reupload_releases_replaced_handle() {
    let mut backend = MockDocumentBackend::new();
    backend
        .expect_register_document()
        .returning(|_, _| Ok(handle("new")));
    backend
        .expect_release_document()
        .withf(|h| *h == handle("a.pdf"))
        .times(1)
        .returning(|_| Ok(()));

    let conv = conversation(Arc::new(RecordingTransport::default()), backend);
    seed(&conv, &["a.pdf"]).await;
    conv.handle(&caller(), pdf_upload("a.pdf")).await;

    let session = snapshot(&conv).await;
    assert_eq!(session.document_count(), 1);
    assert_eq!(session.handle("a.pdf"), Some(&handle("new")));
}

#[tokio::test]
async fn test_upload_failure_shows_error_and_settles_in_menu() {
    let mut backend = MockDocumentBackend::new();
    backend
        .expect_register_document()
        .returning(|_, _| Err(BackendError::Processing("bad file".to_string())));

    let transport = Arc::new(RecordingTransport::default());
    let conv = conversation(transport.clone(), backend);
    conv.handle(&caller(), press(Action::MenuUpload)).await;
    let outcome = conv.handle(&caller(), pdf_upload("broken.pdf")).await;

    assert_eq!(outcome.state, ConversationState::MainMenu);
    assert_eq!(snapshot(&conv).await.document_count(), 0);
    let last = transport.log().pop();
    assert!(matches!(
        last,
        Some(Sent::Edit { text, controls: Some(controls), .. })
            if text.starts_with("❌ Error processing PDF") && callback_payloads(&controls) == ["nav:back"]
    ));
}

#[tokio::test]
async fn test_summarize_calls_backend_once_and_puts_controls_last() {
    let mut backend = MockDocumentBackend::new();
    backend
        .expect_analyze()
        .withf(|h, prompt| *h == handle("report.pdf") && prompt.starts_with("Summarize this document"))
        .times(1)
        .returning(|_, _| Ok(format!("{}\n\n{}", "a".repeat(3000), "b".repeat(3000))));

    let transport = Arc::new(RecordingTransport::default());
    let conv = conversation(transport.clone(), backend);
    seed(&conv, &["report.pdf"]).await;
    conv.sessions()
        .mutate(USER, CHAT, |s| s.activate("report.pdf"))
        .await;

    let outcome = conv
        .handle(&caller(), press(Action::Analyze(AnalysisKind::Summarize)))
        .await;
    assert_eq!(outcome.state, ConversationState::MainMenu);

    let log = transport.log();
    // Processing message is removed once the result is in
    assert!(log.contains(&Sent::Delete(MessageId(1))));

    let chunks: Vec<(String, bool)> = log
        .into_iter()
        .filter_map(|entry| match entry {
            Sent::Message { text, controls, .. } if text.contains("Analysis Results") => {
                Some((text, controls.is_some()))
            }
            _ => None,
        })
        .collect();
    assert_eq!(chunks.len(), 2);
    assert!(chunks[0].0.starts_with("📝 <b>Analysis Results</b> (Part 1/2)"));
    assert!(!chunks[0].1);
    assert!(chunks[1].1);
}

#[tokio::test]
async fn test_analyze_without_active_document_is_rejected_in_place() {
    let mut backend = MockDocumentBackend::new();
    backend.expect_analyze().times(0);

    let transport = Arc::new(RecordingTransport::default());
    let conv = conversation(transport.clone(), backend);
    seed(&conv, &["a.pdf"]).await;

    let outcome = conv
        .handle(&caller(), press(Action::Analyze(AnalysisKind::KeyPoints)))
        .await;

    assert_eq!(outcome.state, ConversationState::MainMenu);
    assert!(transport.sent_texts()[0].starts_with("❗ No document selected"));
}

#[tokio::test]
async fn test_question_in_analyzing_uses_text_as_prompt() {
    let mut backend = MockDocumentBackend::new();
    backend
        .expect_analyze()
        .withf(|_, prompt| prompt == "Who wrote it?")
        .times(1)
        .returning(|_, _| Ok("Nobody.".to_string()));

    let conv = conversation(Arc::new(RecordingTransport::default()), backend);
    seed(&conv, &["a.pdf"]).await;
    conv.sessions().mutate(USER, CHAT, |s| s.activate("a.pdf")).await;

    let outcome = conv.handle(&caller(), press(Action::MenuAsk)).await;
    assert_eq!(outcome.state, ConversationState::Analyzing);

    let outcome = conv
        .handle(&caller(), Event::Text("Who wrote it?".to_string()))
        .await;
    assert_eq!(outcome.state, ConversationState::MainMenu);

    // The follow-up button asks again
    let outcome = conv.handle(&caller(), press(Action::MenuAsk)).await;
    assert_eq!(outcome.state, ConversationState::Analyzing);
}

#[tokio::test]
async fn test_analysis_from_options_menu_returns_to_main_menu() {
    let mut backend = MockDocumentBackend::new();
    backend
        .expect_analyze()
        .times(1)
        .returning(|_, _| Ok("Short summary.".to_string()));

    let transport = Arc::new(RecordingTransport::default());
    let conv = conversation(transport.clone(), backend);
    seed(&conv, &["a.pdf"]).await;
    conv.sessions().mutate(USER, CHAT, |s| s.activate("a.pdf")).await;

    let outcome = conv.handle(&caller(), press(Action::MenuAnalyze)).await;
    assert_eq!(outcome.state, ConversationState::Analyzing);

    let outcome = conv
        .handle(&caller(), press(Action::Analyze(AnalysisKind::Summarize)))
        .await;
    assert_eq!(outcome.state, ConversationState::MainMenu);
    assert_eq!(snapshot(&conv).await.state, ConversationState::MainMenu);

    // Text now gets the menu reminder, not a second backend call
    conv.handle(&caller(), Event::Text("and more?".to_string()))
        .await;
    let texts = transport.sent_texts();
    assert!(texts.last().is_some_and(|t| t.starts_with("Please use the menu buttons")));
}

#[tokio::test]
async fn test_analysis_failure_returns_to_menu_with_error_view() {
    let mut backend = MockDocumentBackend::new();
    backend
        .expect_analyze()
        .returning(|_, _| Err(BackendError::Network("timeout".to_string())));

    let transport = Arc::new(RecordingTransport::default());
    let conv = conversation(transport.clone(), backend);
    seed(&conv, &["a.pdf"]).await;
    conv.sessions().mutate(USER, CHAT, |s| s.activate("a.pdf")).await;
    conv.handle(&caller(), press(Action::MenuAsk)).await;

    let outcome = conv.handle(&caller(), Event::Text("Why?".to_string())).await;

    assert_eq!(outcome.state, ConversationState::MainMenu);
    let last = transport.log().pop();
    assert!(matches!(
        last,
        Some(Sent::Edit { text, .. }) if text.contains("Error analyzing document: Network error: timeout")
    ));
}

#[tokio::test]
async fn test_compare_runs_once_with_both_handles() {
    let mut backend = MockDocumentBackend::new();
    backend
        .expect_compare()
        .withf(|handles, prompt| {
            handles == [handle("a.pdf"), handle("b.pdf")] && prompt.starts_with("Compare these documents")
        })
        .times(1)
        .returning(|_, _| Ok("Both discuss budgets.".to_string()));

    let transport = Arc::new(RecordingTransport::default());
    let conv = conversation(transport.clone(), backend);
    seed(&conv, &["a.pdf", "b.pdf"]).await;
    let a = token_of(&conv, "a.pdf").await;
    let b = token_of(&conv, "b.pdf").await;

    conv.handle(&caller(), press(Action::MenuCompare)).await;
    conv.handle(&caller(), press(Action::ToggleCompare(a))).await;
    conv.handle(&caller(), press(Action::ToggleCompare(b))).await;
    conv.handle(&caller(), press(Action::ExecuteCompare)).await;
    let outcome = conv
        .handle(&caller(), press(Action::RunCompare(CompareKind::General)))
        .await;

    assert_eq!(outcome.state, ConversationState::MainMenu);
    assert!(snapshot(&conv).await.compare_selection().is_empty());
    assert!(transport
        .sent_texts()
        .iter()
        .any(|text| text.starts_with("📊 <b>Comparison Results</b>\n\nBoth discuss budgets.")));
}

#[tokio::test]
async fn test_compare_with_one_selected_never_calls_backend() {
    let mut backend = MockDocumentBackend::new();
    backend.expect_compare().times(0);

    let conv = conversation(Arc::new(RecordingTransport::default()), backend);
    seed(&conv, &["a.pdf", "b.pdf"]).await;
    let a = token_of(&conv, "a.pdf").await;

    conv.handle(&caller(), press(Action::MenuCompare)).await;
    conv.handle(&caller(), press(Action::ToggleCompare(a))).await;

    let outcome = conv.handle(&caller(), press(Action::ExecuteCompare)).await;
    assert_eq!(outcome.toast.as_deref(), Some("❗ Please select at least 2 documents to compare."));

    let outcome = conv
        .handle(&caller(), press(Action::RunCompare(CompareKind::Data)))
        .await;
    assert!(outcome.toast.is_some());
}

#[tokio::test]
async fn test_compare_needs_two_documents() {
    let transport = Arc::new(RecordingTransport::default());
    let conv = conversation(transport.clone(), MockDocumentBackend::new());
    seed(&conv, &["a.pdf"]).await;

    conv.handle(&caller(), press(Action::MenuCompare)).await;
    assert!(transport.sent_texts()[0].starts_with("❗ You need at least 2 documents"));
}

#[tokio::test]
async fn test_deleting_documents_updates_active_slot() {
    let mut backend = MockDocumentBackend::new();
    backend
        .expect_release_document()
        .times(2)
        .returning(|_| Err(BackendError::Api("gone".to_string())));

    let conv = conversation(Arc::new(RecordingTransport::default()), backend);
    seed(&conv, &["a.pdf", "b.pdf"]).await;
    conv.sessions().mutate(USER, CHAT, |s| s.activate("a.pdf")).await;
    let a = token_of(&conv, "a.pdf").await;
    let b = token_of(&conv, "b.pdf").await;

    conv.handle(&caller(), press(Action::DeleteDocument(b))).await;
    assert_eq!(snapshot(&conv).await.active_document(), Some("a.pdf"));

    conv.handle(&caller(), press(Action::DeleteDocument(a))).await;
    let session = snapshot(&conv).await;
    assert_eq!(session.active_document(), None);
    assert_eq!(session.document_count(), 0);
}

#[tokio::test]
async fn test_unknown_token_is_treated_as_no_document() {
    let transport = Arc::new(RecordingTransport::default());
    let conv = conversation(transport.clone(), MockDocumentBackend::new());

    let outcome = conv
        .handle(&caller(), press(Action::SelectDocument(DocToken::new("d99"))))
        .await;

    assert_eq!(outcome.state, ConversationState::MainMenu);
    assert!(transport.sent_texts()[0].starts_with("❗ No document selected"));
}

#[tokio::test]
async fn test_uploading_reminds_on_text_and_keeps_state() {
    let transport = Arc::new(RecordingTransport::default());
    let conv = conversation(transport.clone(), MockDocumentBackend::new());
    conv.handle(&caller(), press(Action::MenuUpload)).await;

    let outcome = conv.handle(&caller(), Event::Text("hello".to_string())).await;

    assert_eq!(outcome.state, ConversationState::Uploading);
    assert!(transport
        .sent_texts()
        .last()
        .is_some_and(|text| text.starts_with("I'm waiting for you to upload")));

    let outcome = conv.handle(&caller(), Event::Back).await;
    assert_eq!(outcome.state, ConversationState::MainMenu);
}

#[tokio::test]
async fn test_language_choice_switches_and_returns_to_menu() {
    let transport = Arc::new(RecordingTransport::default());
    let conv = conversation(transport.clone(), MockDocumentBackend::new());

    let outcome = conv.handle(&caller(), Event::LanguageMenu).await;
    assert_eq!(outcome.state, ConversationState::LanguageSelection);

    let outcome = conv
        .handle(&caller(), press(Action::SetLanguage(Language::Vietnamese)))
        .await;
    assert_eq!(outcome.state, ConversationState::MainMenu);
    assert_eq!(snapshot(&conv).await.language, Language::Vietnamese);
    assert!(transport
        .sent_texts()
        .contains(&"✅ Đã chọn Tiếng Việt".to_string()));
    // The menu replaces the confirmation
    assert!(matches!(
        transport.log().pop(),
        Some(Sent::Edit { id: MessageId(2), text, .. }) if text.starts_with("📋 <b>Menu Chính</b>")
    ));
}

#[tokio::test]
async fn test_stale_buttons_get_a_toast_and_keep_state() {
    let conv = conversation(Arc::new(RecordingTransport::default()), MockDocumentBackend::new());
    conv.handle(&caller(), Event::LanguageMenu).await;

    let outcome = conv.handle(&caller(), press(Action::MenuUpload)).await;
    assert_eq!(outcome.state, ConversationState::LanguageSelection);
    assert_eq!(outcome.toast.as_deref(), Some("This button is no longer active."));

    let outcome = conv
        .handle(
            &caller(),
            Event::UnknownButton {
                payload: "analyze_summary".to_string(),
            },
        )
        .await;
    assert_eq!(outcome.state, ConversationState::LanguageSelection);
    assert!(outcome.toast.is_some());
}

#[tokio::test]
async fn test_restart_is_accepted_in_every_state() {
    let transport = Arc::new(RecordingTransport::default());
    let conv = conversation(transport.clone(), MockDocumentBackend::new());

    for setup in [press(Action::MenuUpload), Event::LanguageMenu, Event::Menu] {
        conv.handle(&caller(), setup).await;
        let outcome = conv.handle(&caller(), Event::Restart).await;
        assert_eq!(outcome.state, ConversationState::MainMenu);
    }
    assert!(transport
        .sent_texts()
        .iter()
        .any(|text| text.starts_with("👋 Hi Ann!")));
}

#[tokio::test]
async fn test_menu_entry_cleans_up_old_messages() {
    let transport = Arc::new(RecordingTransport::default());
    let conv = conversation(transport.clone(), MockDocumentBackend::new());

    for _ in 0..4 {
        conv.handle(&caller(), Event::Help).await;
    }
    conv.handle(&caller(), Event::Menu).await;

    let session = snapshot(&conv).await;
    assert!(session.recent_message_ids().len() <= 4);
    assert!(transport.log().contains(&Sent::Delete(MessageId(1))));
}

#[tokio::test]
async fn test_transport_failure_shows_restart_view() {
    let mut transport = MockTransport::new();
    let mut failed_once = false;
    transport
        .expect_send_message()
        .returning(move |_, text, mode, controls| {
            if !failed_once {
                failed_once = true;
                return Err(TransportError::Other("chat not found".to_string()));
            }
            assert!(text.starts_with("❌ Sorry, an error occurred"));
            assert_eq!(mode, TextMode::Html);
            assert_eq!(controls.map(|c| callback_payloads(&c)), Some(vec!["nav:restart".to_string()]));
            Ok(MessageId(9))
        });

    let conv = conversation(Arc::new(transport), MockDocumentBackend::new());
    let outcome = conv.handle(&caller(), Event::Help).await;
    assert_eq!(outcome.state, ConversationState::MainMenu);
}
