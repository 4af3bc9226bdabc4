/// Allow-list with flood-protected denial replies
pub mod access;
/// Per-user conversation state machine
pub mod conversation;
/// Safe delivery of formatted messages
pub mod delivery;
/// Inbound events and callback payloads
pub mod events;
/// Telegram update handlers and command parsing
pub mod handlers;
/// Conversation states
pub mod state;
/// Bot API implementation of the transport
pub mod telegram;
/// Messaging seam between the bot and Telegram
pub mod transport;
/// Localized texts and keyboards
pub mod views;

pub use access::AccessGate;
pub use conversation::{Caller, Conversation, ConversationSettings, Outcome};
pub use delivery::DeliveryGateway;
pub use events::Event;
pub use state::ConversationState;
pub use telegram::TelegramTransport;
pub use transport::{DocumentSource, TextMode, Transport, TransportError};
