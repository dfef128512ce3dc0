//! Error taxonomy for routewatch.
//!
//! Each stage of the pipeline owns one error type. Startup failures
//! (`ConfigError`, `AuthenticationError`, `SourceError` while connecting) stop
//! the process before the dispatcher runs. `DispatchError` is what the running
//! loop returns when it can no longer continue.

use std::path::PathBuf;
use thiserror::Error;

/// Malformed, unreadable or incomplete configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] Box<figment::Error>),

    #[error("configuration file not found: {}", .0.display())]
    MissingFile(PathBuf),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        ConfigError::Load(Box::new(err))
    }
}

/// The chat transport refused the bot credentials.
#[derive(Debug, Error)]
pub enum AuthenticationError {
    #[error("chat transport rejected bot credentials: {description}")]
    Rejected { description: String },

    #[error("credential check request failed: {0}")]
    Transport(#[source] reqwest::Error),
}

/// Failures of the upstream event source.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("cannot read credential file {}: {source}", path.display())]
    Credentials {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid TLS setup: {0}")]
    Tls(String),

    #[error("failed to connect to event source: {0}")]
    Connect(String),

    #[error("event stream transport error: {0}")]
    Transport(#[from] Box<tokio_tungstenite::tungstenite::Error>),

    #[error("upstream returned error {code}: {message}")]
    Upstream { code: i64, message: String },

    #[error("malformed event frame: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("node lookup failed: {0}")]
    Lookup(String),
}

/// A single delivery attempt failed.
#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("chat transport request failed: {0}")]
    Transport(#[source] reqwest::Error),

    #[error("chat transport rejected message (status {status}): {description}")]
    Rejected { status: u16, description: String },

    #[error("unexpected chat transport response: {0}")]
    InvalidResponse(String),
}

impl From<reqwest::Error> for DeliveryError {
    fn from(err: reqwest::Error) -> Self {
        // Request URLs embed the bot token.
        DeliveryError::Transport(err.without_url())
    }
}

/// Reasons the dispatch loop stopped.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("event source disconnected")]
    SourceDisconnect,

    #[error(transparent)]
    Source(#[from] SourceError),

    #[error("observer '{observer}' failed to handle {event} event: {source}")]
    Delivery {
        observer: String,
        event: String,
        #[source]
        source: DeliveryError,
    },
}
