//! Inline keyboards
//!
//! Buttons carry [`Action`] payloads; document buttons reference stable
//! tokens so long file names never end up in callback data.

use teloxide::types::{InlineKeyboardButton, InlineKeyboardMarkup};

use super::catalog::{label, Msg};
use crate::bot::events::{Action, AnalysisKind, CompareKind};
use crate::session::{Language, Session};
use crate::utils::truncate_str;

/// Longest document name shown on a button
const BUTTON_LABEL_CHARS: usize = 30;

fn button(language: Language, msg: Msg, action: &Action) -> InlineKeyboardButton {
    InlineKeyboardButton::callback(msg.text(language), action.encode())
}

fn doc_button(language: Language, msg: Msg, doc: &str, action: &Action) -> InlineKeyboardButton {
    let caption = label(language, msg, &[("doc", &short_label(doc))]);
    InlineKeyboardButton::callback(caption, action.encode())
}

/// Shortens a document name for button captions.
#[must_use]
pub fn short_label(doc: &str) -> String {
    if doc.chars().count() > BUTTON_LABEL_CHARS {
        format!("{}…", truncate_str(doc, BUTTON_LABEL_CHARS - 1))
    } else {
        doc.to_string()
    }
}

/// Main menu; entries depend on what the session holds
#[must_use]
pub fn main_menu(session: &Session) -> InlineKeyboardMarkup {
    let language = session.language;
    let mut rows = vec![vec![button(language, Msg::BtnUpload, &Action::MenuUpload)]];

    if session.document_count() > 0 {
        rows.push(vec![button(language, Msg::BtnDocuments, &Action::MenuDocuments)]);
    }
    if let Some(active) = session.active_document() {
        rows.push(vec![doc_button(language, Msg::BtnAnalyze, active, &Action::MenuAnalyze)]);
        rows.push(vec![button(language, Msg::BtnAsk, &Action::MenuAsk)]);
    }
    if session.document_count() >= 2 {
        rows.push(vec![button(language, Msg::BtnCompare, &Action::MenuCompare)]);
    }
    rows.push(vec![button(language, Msg::BtnLanguage, &Action::MenuLanguage)]);

    InlineKeyboardMarkup::new(rows)
}

/// One select/delete row per stored document
#[must_use]
pub fn documents(session: &Session) -> InlineKeyboardMarkup {
    let language = session.language;
    let active = session.active_document();

    let mut rows: Vec<Vec<InlineKeyboardButton>> = session
        .documents()
        .map(|(doc, stored)| {
            let select = if Some(doc) == active { Msg::BtnSelected } else { Msg::BtnSelect };
            vec![
                doc_button(language, select, doc, &Action::SelectDocument(stored.token.clone())),
                doc_button(
                    language,
                    Msg::BtnDelete,
                    doc,
                    &Action::DeleteDocument(stored.token.clone()),
                ),
            ]
        })
        .collect();
    rows.push(vec![button(language, Msg::BtnBackToMenu, &Action::Back)]);

    InlineKeyboardMarkup::new(rows)
}

/// Fixed analysis requests
#[must_use]
pub fn analysis_options(language: Language) -> InlineKeyboardMarkup {
    let mut rows: Vec<Vec<InlineKeyboardButton>> = AnalysisKind::ALL
        .into_iter()
        .map(|kind| vec![button(language, kind.button(), &Action::Analyze(kind))])
        .collect();
    rows.push(vec![button(language, Msg::BtnBackToMenu, &Action::Back)]);
    InlineKeyboardMarkup::new(rows)
}

/// Checklist of documents for comparison
#[must_use]
pub fn compare_selection(session: &Session) -> InlineKeyboardMarkup {
    let language = session.language;
    let mut rows: Vec<Vec<InlineKeyboardButton>> = session
        .documents()
        .map(|(doc, stored)| {
            let mark = if session.is_selected(doc) { "☑️" } else { "⬜" };
            vec![InlineKeyboardButton::callback(
                format!("{mark} {}", short_label(doc)),
                Action::ToggleCompare(stored.token.clone()).encode(),
            )]
        })
        .collect();
    rows.push(vec![button(language, Msg::BtnCompareSelected, &Action::ExecuteCompare)]);
    rows.push(vec![button(language, Msg::BtnBackToMenu, &Action::Back)]);
    InlineKeyboardMarkup::new(rows)
}

/// Comparison kinds
#[must_use]
pub fn compare_kinds(language: Language) -> InlineKeyboardMarkup {
    let mut rows: Vec<Vec<InlineKeyboardButton>> = CompareKind::ALL
        .into_iter()
        .map(|kind| vec![button(language, kind.button(), &Action::RunCompare(kind))])
        .collect();
    rows.push(vec![button(language, Msg::BtnBack, &Action::MenuCompare)]);
    InlineKeyboardMarkup::new(rows)
}

/// Language picker, captions in each language's own name
#[must_use]
pub fn languages() -> InlineKeyboardMarkup {
    let mut rows: Vec<Vec<InlineKeyboardButton>> = Language::ALL
        .into_iter()
        .map(|language| {
            vec![button(language, Msg::LanguageName, &Action::SetLanguage(language))]
        })
        .collect();
    rows.push(vec![button(Language::English, Msg::BtnLanguageBack, &Action::Back)]);
    InlineKeyboardMarkup::new(rows)
}

/// Controls shown after an analysis or answer
#[must_use]
pub fn follow_up(language: Language, ask: Msg) -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![
        vec![button(language, ask, &Action::MenuAsk)],
        vec![button(language, Msg::BtnBackToMenu, &Action::Back)],
    ])
}

/// Next steps right after an upload
#[must_use]
pub fn upload_success(language: Language) -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![
        vec![
            button(language, Msg::BtnSummarize, &Action::Analyze(AnalysisKind::Summarize)),
            button(language, Msg::BtnKeyPoints, &Action::Analyze(AnalysisKind::KeyPoints)),
        ],
        vec![button(language, Msg::BtnAsk, &Action::MenuAsk)],
        vec![button(language, Msg::BtnBackToMenu, &Action::Back)],
    ])
}

/// Single "back to menu" button
#[must_use]
pub fn back_to_menu(language: Language) -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![vec![button(language, Msg::BtnBackToMenu, &Action::Back)]])
}

/// Single restart button
#[must_use]
pub fn restart(language: Language) -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![vec![button(language, Msg::BtnRestart, &Action::Restart)]])
}
