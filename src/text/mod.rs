//! Text rendering pipeline: Markdown rendering, Telegram-safe sanitizing
//! and length-bounded chunking.

pub mod chunker;
pub mod markdown;
pub mod sanitize;

pub use chunker::{split, Chunk};
pub use markdown::render;
pub use sanitize::{sanitize, strip_markup};
