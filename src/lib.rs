//! Synk gateway: relays stored posts to Discord and Telegram.

pub mod channels;
pub mod config;
pub mod dispatch;
pub mod envelope;
pub mod error;
pub mod routes;
pub mod store;
