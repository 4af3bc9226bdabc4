use serde::{Deserialize, Serialize};

/// Where a user currently is in the conversation
#[derive(Clone, Copy, Debug, Serialize, Deserialize, Default, PartialEq, Eq)]
pub enum ConversationState {
    /// Main menu; initial state and the state every flow settles back into
    #[default]
    MainMenu,
    /// Waiting for the user to send a PDF
    Uploading,
    /// Free text is treated as a question about the active document
    Analyzing,
    /// Waiting for a language choice
    LanguageSelection,
}
