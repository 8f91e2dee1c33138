//! Error types for the tripwire core.
//!
//! Triage operations themselves are total and never return these; only the
//! I/O-facing edges (feed client, transcript replay, config loading) do.

use thiserror::Error;

/// Top-level tripwire error.
#[derive(Debug, Error)]
pub enum TripwireError {
    #[error("feed error: {0}")]
    Feed(#[from] FeedError),
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors from the upstream incident feed.
#[derive(Debug, Error)]
pub enum FeedError {
    #[error("invalid feed URL '{url}': {message}")]
    InvalidUrl { url: String, message: String },
    #[error("request to {url} failed: {message}")]
    Request { url: String, message: String },
    #[error("HTTP {status} from {url}")]
    Status { url: String, status: u16 },
    #[error("failed to read feed stream: {message}")]
    Stream { message: String },
    #[error("malformed '{event}' payload: {message}")]
    MalformedPayload { event: String, message: String },
    #[error("feed consumer went away")]
    ConsumerClosed,
}

/// Errors from configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] Box<figment::Error>),
    #[error("failed to render configuration: {0}")]
    Render(#[from] toml::ser::Error),
}
