//! Channel abstraction for message I/O.

pub mod channel;
pub mod discord;

pub use channel::*;
pub use discord::{DiscordChannel, DiscordConfig};
