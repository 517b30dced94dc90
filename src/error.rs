//! Error types for the emoji reactor.

use std::time::Duration;

/// Top-level error type.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Channel error: {0}")]
    Channel(#[from] ChannelError),
}

/// Configuration-related errors. All of these are fatal at startup.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variables: {}", .0.join(", "))]
    MissingRequired(Vec<String>),

    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },

    #[error("Logging setup failed: {0}")]
    Logging(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Chat channel errors (gateway, downloads, reactions, replies).
#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    #[error("Channel {name} failed to start: {reason}")]
    StartupFailed { name: String, reason: String },

    #[error("Channel {name} disconnected: {reason}")]
    Disconnected { name: String, reason: String },

    #[error("Failed to send message on channel {name}: {reason}")]
    SendFailed { name: String, reason: String },

    #[error("Failed to add reaction {emoji}: {reason}")]
    ReactionFailed { emoji: String, reason: String },

    #[error("Failed to download {filename}: {reason}")]
    DownloadFailed { filename: String, reason: String },

    #[error("Attachment {filename} too large: {size} > {max} bytes")]
    TooLarge {
        filename: String,
        size: u64,
        max: u64,
    },

    #[error("Download of {filename} timed out after {timeout:?}")]
    DownloadTimeout { filename: String, timeout: Duration },

    #[error("Rate limited on channel {name}")]
    RateLimited { name: String },

    #[error("HTTP error: {0}")]
    Http(String),
}

/// Vision analysis errors.
#[derive(Debug, thiserror::Error)]
pub enum VisionError {
    #[error("Provider {provider} request failed: {reason}")]
    RequestFailed { provider: String, reason: String },

    #[error("Authentication failed for provider {provider}")]
    AuthFailed { provider: String },

    #[error("Provider {provider} rate limited")]
    RateLimited { provider: String },

    #[error("Provider {provider} returned HTTP {status}: {body}")]
    Http {
        provider: String,
        status: u16,
        body: String,
    },

    #[error("Invalid response from {provider}: {reason}")]
    InvalidResponse { provider: String, reason: String },

    #[error("Provider {provider} returned no analysis")]
    EmptyResult { provider: String },

    #[error("Analysis timed out after {0:?}")]
    Timeout(Duration),

    #[error("Analysis task aborted: {0}")]
    TaskAborted(String),
}

/// Keyword table and classifier errors.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum MappingError {
    #[error("Keyword must not be empty")]
    EmptyKeyword,

    #[error("Keyword '{keyword}' needs at least one emoji")]
    EmptyCandidates { keyword: String },

    #[error("Random source returned index {index} for a pool of {len}")]
    RandomOutOfRange { index: usize, len: usize },
}

/// Per-attachment pipeline errors.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("Download failed: {0}")]
    Download(#[source] ChannelError),

    #[error("Analysis failed: {0}")]
    Analysis(#[from] VisionError),

    #[error("Command failed: {0}")]
    Command(String),
}

/// Result type for startup and the event loop.
pub type Result<T> = std::result::Result<T, Error>;
