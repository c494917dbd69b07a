//! Notification delivery implementations.
//!
//! Available implementations:
//! - `telegram`: Telegram Bot API `sendMessage`

pub mod telegram;

pub use telegram::*;
