//! Channel clients: one per provider, behind the `Channel` trait.

pub mod channel;
pub mod discord;
pub mod telegram;

pub use channel::*;
pub use discord::DiscordChannel;
pub use telegram::TelegramChannel;
