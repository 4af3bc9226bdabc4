//! Rolling cleanup of bot messages
//!
//! Keeps the chat tidy by deleting all but the newest bot messages when a
//! menu is shown. Deletion is best-effort; the tracked list is truncated
//! regardless of individual outcomes.

use tracing::{debug, warn};

use super::Session;
use crate::bot::transport::{Transport, TransportError};

/// Deletes tracked messages beyond the newest `keep` and truncates the list.
pub async fn enforce(transport: &dyn Transport, session: &mut Session, keep: usize) {
    let stale = session.take_stale_messages(keep);
    if stale.is_empty() {
        return;
    }

    let chat_id = session.chat_id();
    debug!(user_id = session.user_id().0, count = stale.len(), "Cleaning up old messages");

    for message_id in stale {
        match transport.delete_message(chat_id, message_id).await {
            Ok(()) | Err(TransportError::AlreadyGone) => {}
            Err(e) => warn!(message_id = message_id.0, "Could not delete message: {e}"),
        }
    }
}
