//! LINE Messaging API.

pub mod client;
pub mod events;
pub mod signature;

/// LINE rejects text messages longer than this many characters.
pub const MAX_TEXT_CHARS: usize = 5000;
