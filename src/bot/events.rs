//! Inbound events and the callback payload codec
//!
//! Telegram updates are decoded once at the boundary into [`Event`], so the
//! conversation machine matches on variants instead of string prefixes.

use std::fmt;
use std::sync::Arc;

use teloxide::types::MessageId;

use super::transport::DocumentSource;
use crate::session::{DocToken, Language};

/// Telegram limits callback data to 64 bytes
pub const MAX_CALLBACK_DATA_BYTES: usize = 64;

/// Fixed analysis requests offered for the active document
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnalysisKind {
    Summarize,
    KeyPoints,
    Arguments,
    Data,
}

impl AnalysisKind {
    pub const ALL: [Self; 4] = [Self::Summarize, Self::KeyPoints, Self::Arguments, Self::Data];

    const fn code(self) -> &'static str {
        match self {
            Self::Summarize => "summarize",
            Self::KeyPoints => "keypoints",
            Self::Arguments => "arguments",
            Self::Data => "data",
        }
    }

    fn from_code(code: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.code() == code)
    }
}

/// Comparison requests offered for the selected documents
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareKind {
    General,
    Differences,
    Common,
    Data,
}

impl CompareKind {
    pub const ALL: [Self; 4] = [Self::General, Self::Differences, Self::Common, Self::Data];

    const fn code(self) -> &'static str {
        match self {
            Self::General => "general",
            Self::Differences => "differences",
            Self::Common => "common",
            Self::Data => "data",
        }
    }

    fn from_code(code: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.code() == code)
    }
}

/// What an inline button asks for
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    MenuUpload,
    MenuDocuments,
    MenuAnalyze,
    MenuAsk,
    MenuCompare,
    MenuLanguage,
    SelectDocument(DocToken),
    DeleteDocument(DocToken),
    ToggleCompare(DocToken),
    ExecuteCompare,
    RunCompare(CompareKind),
    Analyze(AnalysisKind),
    SetLanguage(Language),
    Back,
    Restart,
}

impl Action {
    /// Encodes the action as callback data.
    #[must_use]
    pub fn encode(&self) -> String {
        match self {
            Self::MenuUpload => "menu:upload".to_string(),
            Self::MenuDocuments => "menu:docs".to_string(),
            Self::MenuAnalyze => "menu:analyze".to_string(),
            Self::MenuAsk => "menu:ask".to_string(),
            Self::MenuCompare => "menu:compare".to_string(),
            Self::MenuLanguage => "menu:lang".to_string(),
            Self::SelectDocument(token) => format!("doc:select:{token}"),
            Self::DeleteDocument(token) => format!("doc:delete:{token}"),
            Self::ToggleCompare(token) => format!("cmp:toggle:{token}"),
            Self::ExecuteCompare => "cmp:run".to_string(),
            Self::RunCompare(kind) => format!("cmp:kind:{}", kind.code()),
            Self::Analyze(kind) => format!("an:{}", kind.code()),
            Self::SetLanguage(language) => format!("lang:{}", language.code()),
            Self::Back => "nav:back".to_string(),
            Self::Restart => "nav:restart".to_string(),
        }
    }

    /// Decodes callback data produced by [`Action::encode`].
    #[must_use]
    pub fn decode(data: &str) -> Option<Self> {
        let parts: Vec<&str> = data.split(':').collect();
        let action = match parts.as_slice() {
            ["menu", "upload"] => Self::MenuUpload,
            ["menu", "docs"] => Self::MenuDocuments,
            ["menu", "analyze"] => Self::MenuAnalyze,
            ["menu", "ask"] => Self::MenuAsk,
            ["menu", "compare"] => Self::MenuCompare,
            ["menu", "lang"] => Self::MenuLanguage,
            ["doc", "select", token] => Self::SelectDocument(parse_token(token)?),
            ["doc", "delete", token] => Self::DeleteDocument(parse_token(token)?),
            ["cmp", "toggle", token] => Self::ToggleCompare(parse_token(token)?),
            ["cmp", "run"] => Self::ExecuteCompare,
            ["cmp", "kind", kind] => Self::RunCompare(CompareKind::from_code(kind)?),
            ["an", kind] => Self::Analyze(AnalysisKind::from_code(kind)?),
            ["lang", code] => Self::SetLanguage(Language::from_code(code)?),
            ["nav", "back"] => Self::Back,
            ["nav", "restart"] => Self::Restart,
            _ => return None,
        };
        Some(action)
    }
}

fn parse_token(token: &str) -> Option<DocToken> {
    let valid = !token.is_empty()
        && token.len() <= MAX_CALLBACK_DATA_BYTES
        && token.chars().all(|c| c.is_ascii_alphanumeric());
    valid.then(|| DocToken::new(token))
}

/// A document the user sent
#[derive(Clone)]
pub struct Upload {
    /// File name shown to the user and used as the document label
    pub label: String,
    pub mime_type: Option<String>,
    pub source: Arc<dyn DocumentSource>,
}

impl Upload {
    /// Whether the upload looks like a PDF
    #[must_use]
    pub fn is_pdf(&self) -> bool {
        match self.mime_type.as_deref() {
            Some(mime) => mime.eq_ignore_ascii_case("application/pdf"),
            None => self.label.to_ascii_lowercase().ends_with(".pdf"),
        }
    }
}

impl fmt::Debug for Upload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Upload")
            .field("label", &self.label)
            .field("mime_type", &self.mime_type)
            .finish_non_exhaustive()
    }
}

/// Everything the conversation machine reacts to
#[derive(Debug, Clone)]
pub enum Event {
    /// `/start` or the Restart button
    Restart,
    /// `/menu`
    Menu,
    /// `/help`
    Help,
    /// `/cancel`
    Cancel,
    /// `/language`
    LanguageMenu,
    /// `/back`
    Back,
    Upload(Upload),
    Text(String),
    /// A decoded button press; `origin` is the message the button sits on
    Button {
        action: Action,
        origin: Option<MessageId>,
    },
    /// A button press whose payload could not be decoded
    UnknownButton { payload: String },
}

impl Event {
    /// Decodes a button press.
    #[must_use]
    pub fn from_callback(payload: &str, origin: Option<MessageId>) -> Self {
        match Action::decode(payload) {
            Some(Action::Restart) => Self::Restart,
            Some(action) => Self::Button { action, origin },
            None => Self::UnknownButton {
                payload: payload.to_string(),
            },
        }
    }
}
