//! Per-user session model
//!
//! A [`Session`] holds one user's conversation state and document set.
//! Mutators keep the cross-field invariants: the active document and the
//! compare selection only ever point at stored documents.

pub mod cleanup;
pub mod store;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use teloxide::types::{ChatId, MessageId, UserId};

use crate::backend::DocumentHandle;
use crate::bot::state::ConversationState;

pub use store::{SessionStore, SharedSession};

/// Interface language
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Language {
    /// English, the language the backend answers in
    #[default]
    English,
    /// Vietnamese
    Vietnamese,
}

impl Language {
    /// All supported languages, in menu order
    pub const ALL: [Self; 2] = [Self::English, Self::Vietnamese];

    /// ISO 639-1 code
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::English => "en",
            Self::Vietnamese => "vi",
        }
    }

    /// Parses an ISO 639-1 code
    #[must_use]
    pub fn from_code(code: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|lang| lang.code() == code)
    }
}

/// Short opaque token identifying a stored document in callback payloads
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DocToken(String);

impl DocToken {
    /// Wraps a token previously produced by [`DocToken::as_str`]
    #[must_use]
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// Token text as embedded in callback data
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for DocToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A document the user uploaded
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredDocument {
    /// Stable token for buttons
    pub token: DocToken,
    /// Backend handle
    pub handle: DocumentHandle,
}

/// One user's conversation progress and document set
#[derive(Debug, Clone)]
pub struct Session {
    user_id: UserId,
    chat_id: ChatId,
    /// Current conversation state
    pub state: ConversationState,
    /// Interface language
    pub language: Language,
    documents: BTreeMap<String, StoredDocument>,
    active_document: Option<String>,
    compare_selection: Vec<String>,
    recent_message_ids: Vec<MessageId>,
    next_token: u64,
}

impl Session {
    /// Creates an empty session in the main menu
    #[must_use]
    pub fn new(user_id: UserId, chat_id: ChatId) -> Self {
        Self {
            user_id,
            chat_id,
            state: ConversationState::default(),
            language: Language::default(),
            documents: BTreeMap::new(),
            active_document: None,
            compare_selection: Vec::new(),
            recent_message_ids: Vec::new(),
            next_token: 1,
        }
    }

    /// Owner of the session
    #[must_use]
    pub const fn user_id(&self) -> UserId {
        self.user_id
    }

    /// Chat the bot answers in
    #[must_use]
    pub const fn chat_id(&self) -> ChatId {
        self.chat_id
    }

    pub(crate) fn set_chat_id(&mut self, chat_id: ChatId) {
        self.chat_id = chat_id;
    }

    // ─────────────────────────────────────────────────────────────────────
    // Documents
    // ─────────────────────────────────────────────────────────────────────

    /// Stored documents ordered by label
    pub fn documents(&self) -> impl Iterator<Item = (&str, &StoredDocument)> {
        self.documents.iter().map(|(label, doc)| (label.as_str(), doc))
    }

    /// Number of stored documents
    #[must_use]
    pub fn document_count(&self) -> usize {
        self.documents.len()
    }

    /// Backend handle for `label`
    #[must_use]
    pub fn handle(&self, label: &str) -> Option<&DocumentHandle> {
        self.documents.get(label).map(|doc| &doc.handle)
    }

    /// Stores a document under `label`, replacing any previous one.
    ///
    /// Returns the replaced handle so the caller can release it. A replaced
    /// label keeps its token.
    pub fn add_document(&mut self, label: &str, handle: DocumentHandle) -> Option<DocumentHandle> {
        if let Some(existing) = self.documents.get_mut(label) {
            return Some(std::mem::replace(&mut existing.handle, handle));
        }

        let token = DocToken(format!("d{}", self.next_token));
        self.next_token += 1;
        self.documents
            .insert(label.to_string(), StoredDocument { token, handle });
        None
    }

    /// Removes a document, clearing it from the active slot and the
    /// compare selection. Returns its handle for release.
    pub fn remove_document(&mut self, label: &str) -> Option<DocumentHandle> {
        let removed = self.documents.remove(label)?;
        if self.active_document.as_deref() == Some(label) {
            self.active_document = None;
        }
        self.compare_selection.retain(|selected| selected != label);
        Some(removed.handle)
    }

    /// Makes `label` the active document; unknown labels are ignored.
    pub fn activate(&mut self, label: &str) -> bool {
        if self.documents.contains_key(label) {
            self.active_document = Some(label.to_string());
            true
        } else {
            false
        }
    }

    /// Active document label, only if it is still stored
    #[must_use]
    pub fn active_document(&self) -> Option<&str> {
        self.active_document
            .as_deref()
            .filter(|label| self.documents.contains_key(*label))
    }

    /// Active document label together with its handle
    #[must_use]
    pub fn active(&self) -> Option<(&str, &DocumentHandle)> {
        let label = self.active_document()?;
        self.handle(label).map(|handle| (label, handle))
    }

    /// Resolves a callback token back to its label
    #[must_use]
    pub fn label_for(&self, token: &DocToken) -> Option<&str> {
        self.documents
            .iter()
            .find(|(_, doc)| &doc.token == token)
            .map(|(label, _)| label.as_str())
    }

    // ─────────────────────────────────────────────────────────────────────
    // Comparison
    // ─────────────────────────────────────────────────────────────────────

    /// Flips `label` in the compare selection. Returns whether it is now selected.
    pub fn toggle_compare(&mut self, label: &str) -> bool {
        if !self.documents.contains_key(label) {
            return false;
        }
        if let Some(pos) = self.compare_selection.iter().position(|s| s == label) {
            self.compare_selection.remove(pos);
            false
        } else {
            self.compare_selection.push(label.to_string());
            true
        }
    }

    /// Empties the compare selection
    pub fn clear_compare(&mut self) {
        self.compare_selection.clear();
    }

    /// Selected labels in selection order
    #[must_use]
    pub fn compare_selection(&self) -> &[String] {
        &self.compare_selection
    }

    /// Whether `label` is selected for comparison
    #[must_use]
    pub fn is_selected(&self, label: &str) -> bool {
        self.compare_selection.iter().any(|s| s == label)
    }

    /// Handles of the selected documents, in selection order
    #[must_use]
    pub fn compare_handles(&self) -> Vec<DocumentHandle> {
        self.compare_selection
            .iter()
            .filter_map(|label| self.handle(label).cloned())
            .collect()
    }

    // ─────────────────────────────────────────────────────────────────────
    // Sent messages
    // ─────────────────────────────────────────────────────────────────────

    /// Records a message the bot sent, oldest first
    pub fn track_message(&mut self, message_id: MessageId) {
        self.recent_message_ids.push(message_id);
    }

    /// Stops tracking a message, e.g. after deleting it directly
    pub fn forget_message(&mut self, message_id: MessageId) {
        self.recent_message_ids.retain(|id| *id != message_id);
    }

    /// Tracked messages, oldest first
    #[must_use]
    pub fn recent_message_ids(&self) -> &[MessageId] {
        &self.recent_message_ids
    }

    /// Removes and returns every tracked message except the newest `keep`.
    pub fn take_stale_messages(&mut self, keep: usize) -> Vec<MessageId> {
        let excess = self.recent_message_ids.len().saturating_sub(keep);
        self.recent_message_ids.drain(..excess).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn handle(name: &str) -> DocumentHandle {
        DocumentHandle {
            name: format!("files/{name}"),
            uri: format!("https://example.test/files/{name}"),
            mime_type: "application/pdf".to_string(),
        }
    }

    fn session() -> Session {
        Session::new(UserId(7), ChatId(7))
    }

    #[test]
    fn test_new_session_defaults() {
        let s = session();
        assert_eq!(s.state, ConversationState::MainMenu);
        assert_eq!(s.language, Language::English);
        assert_eq!(s.document_count(), 0);
        assert!(s.active_document().is_none());
        assert!(s.recent_message_ids().is_empty());
    }

    #[test]
    fn test_tokens_are_unique_and_stable() {
        let mut s = session();
        assert!(s.add_document("a.pdf", handle("a")).is_none());
        assert!(s.add_document("b.pdf", handle("b")).is_none());

        let tokens: Vec<DocToken> = s.documents().map(|(_, d)| d.token.clone()).collect();
        assert_eq!(tokens, vec![DocToken::new("d1"), DocToken::new("d2")]);

        let replaced = s.add_document("a.pdf", handle("a2"));
        assert_eq!(replaced, Some(handle("a")));
        assert_eq!(s.label_for(&DocToken::new("d1")), Some("a.pdf"));
        assert_eq!(s.handle("a.pdf"), Some(&handle("a2")));

        s.remove_document("b.pdf");
        s.add_document("c.pdf", handle("c"));
        assert_eq!(s.label_for(&DocToken::new("d3")), Some("c.pdf"));
        assert_eq!(s.label_for(&DocToken::new("d2")), None);
    }

    #[test]
    fn test_removing_active_document_clears_it() {
        let mut s = session();
        s.add_document("a.pdf", handle("a"));
        s.add_document("b.pdf", handle("b"));
        assert!(s.activate("a.pdf"));

        s.remove_document("b.pdf");
        assert_eq!(s.active_document(), Some("a.pdf"));

        s.remove_document("a.pdf");
        assert_eq!(s.active_document(), None);
        assert!(s.active().is_none());
    }

    #[test]
    fn test_activate_unknown_label_is_ignored() {
        let mut s = session();
        assert!(!s.activate("ghost.pdf"));
        assert!(s.active_document().is_none());
    }

    #[test]
    fn test_compare_selection_stays_subset() {
        let mut s = session();
        s.add_document("a.pdf", handle("a"));
        s.add_document("b.pdf", handle("b"));

        assert!(s.toggle_compare("b.pdf"));
        assert!(s.toggle_compare("a.pdf"));
        assert!(!s.toggle_compare("ghost.pdf"));
        assert_eq!(s.compare_selection(), ["b.pdf", "a.pdf"]);
        assert_eq!(s.compare_handles(), vec![handle("b"), handle("a")]);

        s.remove_document("b.pdf");
        assert_eq!(s.compare_selection(), ["a.pdf"]);

        assert!(!s.toggle_compare("a.pdf"));
        assert!(s.compare_selection().is_empty());
    }

    #[test]
    fn test_take_stale_messages_keeps_newest() {
        let mut s = session();
        for id in 1..=5 {
            s.track_message(MessageId(id));
        }
        let stale = s.take_stale_messages(3);
        assert_eq!(stale, vec![MessageId(1), MessageId(2)]);
        assert_eq!(s.recent_message_ids(), [MessageId(3), MessageId(4), MessageId(5)]);
        assert!(s.take_stale_messages(3).is_empty());
    }

    #[test]
    fn test_forget_message() {
        let mut s = session();
        s.track_message(MessageId(1));
        s.track_message(MessageId(2));
        s.forget_message(MessageId(1));
        assert_eq!(s.recent_message_ids(), [MessageId(2)]);
    }

    #[test]
    fn test_language_codes() {
        assert_eq!(Language::from_code("vi"), Some(Language::Vietnamese));
        assert_eq!(Language::from_code("en"), Some(Language::English));
        assert_eq!(Language::from_code("fr"), None);
    }
}
