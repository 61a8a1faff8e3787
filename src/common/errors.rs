use serde::{Deserialize, Serialize};

use crate::common::types::GuildId;

/// Exception severity levels.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Severity {
    Common,
    Suspicious,
    Fault,
    #[serde(other)]
    Unknown,
}

/// JSON error body returned by a node on a failed REST call.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorResponse {
    /// Unix timestamp in milliseconds.
    #[serde(default)]
    pub timestamp: u64,
    /// HTTP status code.
    pub status: u16,
    /// HTTP status reason phrase (e.g. "Bad Request").
    #[serde(default)]
    pub error: String,
    /// Human-readable error message.
    #[serde(default)]
    pub message: String,
    /// The request path that caused the error.
    #[serde(default)]
    pub path: String,
    #[serde(default)]
    pub trace: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("invalid argument: {0}")]
    Validation(String),

    #[error("no player exists for guild {0}")]
    NoSuchPlayer(GuildId),

    #[error("a player already exists for guild {0}")]
    PlayerAlreadyExists(GuildId),

    #[error("no node named {0}")]
    NoSuchNode(String),

    #[error("no connected node is available")]
    NoNodeAvailable,

    #[error("queueing is disabled")]
    QueueDisabled,

    #[error("node {0} has no active session")]
    NotConnected(String),

    #[error("node responded with {status}: {message}")]
    Remote { status: u16, message: String },

    #[error("gateway forwarding failed: {0}")]
    Gateway(String),

    #[error(transparent)]
    Http(#[from] reqwest::Error),

    #[error(transparent)]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Toml(#[from] toml::de::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Builds a `Remote` error from a failed response body, preferring the
    /// node's structured message when the body is a JSON error.
    pub fn remote(status: u16, body: &str) -> Self {
        let message = serde_json::from_str::<ErrorResponse>(body)
            .map(|e| {
                if e.message.is_empty() {
                    e.error
                } else {
                    e.message
                }
            })
            .unwrap_or_else(|_| body.to_string());

        Self::Remote { status, message }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
