//! Small shared helpers: retrying transient failures and UTF-8 safe truncation.

use std::future::Future;
use std::time::Duration;
use tokio_retry::strategy::{jitter, ExponentialBackoff};
use tokio_retry::RetryIf;
use tracing::warn;

use crate::config::{
    TELEGRAM_API_INITIAL_BACKOFF_MS, TELEGRAM_API_MAX_BACKOFF_MS, TELEGRAM_API_MAX_RETRIES,
};

/// Retries an operation with exponential backoff while `is_transient` says so.
///
/// Errors the predicate rejects are returned immediately, so a Telegram
/// "can't parse entities" never costs a backoff cycle while a dropped
/// connection or flood-wait does.
///
/// # Examples
///
/// ```no_run
/// # async fn example() -> Result<(), std::io::Error> {
/// use pdf_analyst::utils::retry_transient;
///
/// let value = retry_transient(
///     || async { Ok::<_, std::io::Error>(42) },
///     |e: &std::io::Error| e.kind() == std::io::ErrorKind::TimedOut,
/// )
/// .await?;
/// # Ok(())
/// # }
/// ```
///
/// # Errors
///
/// Returns the last error once retries are exhausted, or the first
/// non-transient error.
pub async fn retry_transient<F, Fut, T, E, P>(operation: F, is_transient: P) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    P: FnMut(&E) -> bool,
    E: std::fmt::Display,
{
    let retry_strategy = ExponentialBackoff::from_millis(TELEGRAM_API_INITIAL_BACKOFF_MS)
        .max_delay(Duration::from_millis(TELEGRAM_API_MAX_BACKOFF_MS))
        .map(jitter) // Add jitter to prevent thundering herd
        .take(TELEGRAM_API_MAX_RETRIES);

    RetryIf::spawn(retry_strategy, operation, is_transient)
        .await
        .map_err(|e| {
            warn!("Operation failed after retries: {e}");
            e
        })
}

/// Safely truncates a string to a maximum character length (not bytes).
///
/// This is UTF-8 safe and will not panic on multi-byte characters.
///
/// # Examples
///
/// ```
/// use pdf_analyst::utils::truncate_str;
/// let s = "Tiếng Việt";
/// assert_eq!(truncate_str(s, 5), "Tiếng");
/// ```
pub fn truncate_str(s: impl AsRef<str>, max_chars: usize) -> String {
    let s = s.as_ref();
    if s.chars().count() <= max_chars {
        return s.to_string();
    }
    s.char_indices()
        .nth(max_chars)
        .map_or_else(|| s.to_string(), |(pos, _)| s[..pos].to_string())
}
