//! Emoji Reactor — reacts to chat images with emoji picked from an
//! AI-generated description.

pub mod bot;
pub mod channels;
pub mod config;
pub mod emoji;
pub mod error;
pub mod logging;
pub mod pipeline;
pub mod vision;
