//! Access control with flood protection
//!
//! With an allow-list configured, everyone else gets a single "Access
//! denied" reply per cooldown window. Repeated attempts are dropped
//! silently so the bot never floods Telegram on their behalf.

use moka::future::Cache;
use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// Allow-list plus the cooldown cache for denial replies
#[derive(Clone)]
pub struct AccessGate {
    allowed: Arc<HashSet<i64>>,
    /// user_id -> () while the user is in cooldown
    denied: Cache<i64, ()>,
    silenced_count: Arc<AtomicU64>,
}

impl AccessGate {
    /// Creates a gate; an empty allow-list admits everyone.
    ///
    /// # Examples
    ///
    /// ```
    /// use std::collections::HashSet;
    /// use pdf_analyst::bot::AccessGate;
    ///
    /// let gate = AccessGate::new(HashSet::from([42]), 1200, 10_000);
    /// assert!(gate.is_allowed(42));
    /// assert!(!gate.is_allowed(7));
    /// ```
    #[must_use]
    pub fn new(allowed: HashSet<i64>, cooldown_secs: u64, max_capacity: u64) -> Self {
        let denied = Cache::builder()
            .max_capacity(max_capacity)
            .time_to_live(Duration::from_secs(cooldown_secs))
            .build();

        Self {
            allowed: Arc::new(allowed),
            denied,
            silenced_count: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Whether `user_id` may use the bot
    #[must_use]
    pub fn is_allowed(&self, user_id: i64) -> bool {
        self.allowed.is_empty() || self.allowed.contains(&user_id)
    }

    /// Whether a denied user should get a reply now.
    ///
    /// Starts the cooldown when it returns `true`.
    pub async fn should_reply(&self, user_id: i64, user_name: &str) -> bool {
        if self.denied.get(&user_id).await.is_none() {
            info!(user_id, user_name, "Access denied");
            self.denied.insert(user_id, ()).await;
            return true;
        }

        let count = self.silenced_count.fetch_add(1, Ordering::Relaxed) + 1;
        // Log only every 100th silenced attempt
        if count.is_multiple_of(100) {
            debug!(user_id, user_name, "Silenced {count} unauthorized attempts");
        }
        false
    }
}
