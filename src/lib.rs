//! Telegram front-end for analyzing PDF documents with an AI backend

/// Document-analysis backend
pub mod backend;
/// Telegram bot layer
pub mod bot;
/// Settings and tunables
pub mod config;
/// Per-user sessions and message cleanup
pub mod session;
/// Markup sanitizing, rendering and chunking
pub mod text;
/// Translation of AI output
pub mod translate;
/// Retry and string helpers
pub mod utils;

#[cfg(test)]
pub mod testing;
