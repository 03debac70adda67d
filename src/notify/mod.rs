//! Discord webhook notifications.

pub mod discord;

pub use discord::DiscordNotifier;
