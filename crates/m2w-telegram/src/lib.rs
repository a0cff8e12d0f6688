//! Telegram adapter (teloxide).
//!
//! Receives text messages, runs them through `m2w-core`'s resolver and replies
//! with a Waze link.

pub mod handlers;
pub mod router;
