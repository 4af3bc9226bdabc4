//! Presentation: catalog strings, keyboards and composed view texts

pub mod catalog;
pub mod keyboards;

pub use catalog::{label, render, Msg};

use crate::session::Session;

/// Main menu text for the session's current document
#[must_use]
pub fn menu_text(session: &Session) -> String {
    let language = session.language;
    let current = match session.active_document() {
        Some(doc) => render(language, Msg::CurrentDocument, &[("doc", doc)]),
        None => Msg::NoDocumentSelected.text(language).to_string(),
    };
    format!(
        "{}\n\n{current}\n\n{}",
        Msg::MenuTitle.text(language),
        Msg::ChooseOption.text(language)
    )
}

/// Document list header
#[must_use]
pub fn documents_text(session: &Session) -> String {
    let language = session.language;
    let current = match session.active_document() {
        Some(doc) => render(language, Msg::CurrentDocument, &[("doc", doc)]),
        None => Msg::NoDocumentSelected.text(language).to_string(),
    };
    format!("{}\n\n{current}", Msg::DocumentsTitle.text(language))
}

/// Comparison checklist header with the selection count
#[must_use]
pub fn compare_selection_text(session: &Session) -> String {
    let count = session.compare_selection().len().to_string();
    render(session.language, Msg::CompareSelection, &[("count", &count)])
}

/// Bullet list of the selected documents followed by the kind prompt
#[must_use]
pub fn compare_kinds_text(session: &Session) -> String {
    let docs = session
        .compare_selection()
        .iter()
        .map(|doc| format!("• {doc}"))
        .collect::<Vec<_>>()
        .join("\n");
    render(session.language, Msg::CompareKinds, &[("docs", &docs)])
}
