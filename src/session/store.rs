//! Process-wide session store
//!
//! Sessions are created lazily on a user's first event and live for the
//! lifetime of the process. Each session sits behind its own async mutex:
//! holding the guard for a whole event is the per-user critical section,
//! while different users never contend on anything but the map itself.

use std::collections::HashMap;
use std::sync::Arc;

use teloxide::types::{ChatId, UserId};
use tokio::sync::{Mutex, RwLock};
use tracing::info;

use super::Session;

/// A session shared between the store and the task handling its user
pub type SharedSession = Arc<Mutex<Session>>;

/// Mapping from user identity to session state
#[derive(Default)]
pub struct SessionStore {
    sessions: RwLock<HashMap<UserId, SharedSession>>,
}

impl SessionStore {
    /// Create a new empty store
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the user's session, creating it on first contact. Never fails.
    ///
    /// The chat id is refreshed on every call so replies follow the user.
    pub async fn get_or_create(&self, user_id: UserId, chat_id: ChatId) -> SharedSession {
        let existing = {
            let sessions = self.sessions.read().await;
            sessions.get(&user_id).cloned()
        };

        let session = match existing {
            Some(session) => session,
            None => {
                let mut sessions = self.sessions.write().await;
                sessions
                    .entry(user_id)
                    .or_insert_with(|| {
                        info!(user_id = user_id.0, "Creating new session");
                        Arc::new(Mutex::new(Session::new(user_id, chat_id)))
                    })
                    .clone()
            }
        };

        {
            let mut guard = session.lock().await;
            if guard.chat_id() != chat_id {
                guard.set_chat_id(chat_id);
            }
        }
        session
    }

    /// Applies `f` to the user's session inside its critical section.
    pub async fn mutate<F, R>(&self, user_id: UserId, chat_id: ChatId, f: F) -> R
    where
        F: FnOnce(&mut Session) -> R,
    {
        let session = self.get_or_create(user_id, chat_id).await;
        let mut guard = session.lock().await;
        f(&mut guard)
    }

    /// Get session if exists
    #[cfg(test)]
    pub(crate) async fn get(&self, user_id: UserId) -> Option<SharedSession> {
        self.sessions.read().await.get(&user_id).cloned()
    }

    /// Number of sessions
    #[cfg(test)]
    pub(crate) async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    /// Check if the store holds no sessions
    #[cfg(test)]
    pub(crate) async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bot::state::ConversationState;

    #[tokio::test]
    async fn test_get_or_create_is_idempotent() {
        let store = SessionStore::new();
        let first = store.get_or_create(UserId(1), ChatId(1)).await;
        let second = store.get_or_create(UserId(1), ChatId(1)).await;

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_users_are_partitioned() {
        let store = SessionStore::new();
        store
            .mutate(UserId(1), ChatId(1), |s| s.state = ConversationState::Uploading)
            .await;

        let other = store
            .mutate(UserId(2), ChatId(2), |s| s.state)
            .await;
        assert_eq!(other, ConversationState::MainMenu);
        assert_eq!(store.len().await, 2);
    }

    #[tokio::test]
    async fn test_chat_id_follows_user() {
        let store = SessionStore::new();
        store.get_or_create(UserId(1), ChatId(10)).await;
        let session = store.get_or_create(UserId(1), ChatId(20)).await;
        assert_eq!(session.lock().await.chat_id(), ChatId(20));
    }

    #[tokio::test]
    async fn test_concurrent_mutations_are_serialized() {
        let store = Arc::new(SessionStore::new());
        let mut tasks = Vec::new();
        for id in 0..50 {
            let store = Arc::clone(&store);
            tasks.push(tokio::spawn(async move {
                store
                    .mutate(UserId(1), ChatId(1), |s| {
                        s.track_message(teloxide::types::MessageId(id));
                    })
                    .await;
            }));
        }
        for task in tasks {
            task.await.expect("task panicked");
        }

        let session = store.get(UserId(1)).await.expect("session exists");
        assert_eq!(session.lock().await.recent_message_ids().len(), 50);
        assert!(!store.is_empty().await);
    }
}
