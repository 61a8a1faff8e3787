use serde::Deserialize;

use crate::{
    common::types::{GuildId, SessionId},
    protocol::{events::NodeEvent, player::PlayerState, stats::Stats},
};

/// Frames received from a node over its WebSocket.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "op", rename_all = "camelCase")]
pub enum IncomingMessage {
    #[serde(rename_all = "camelCase")]
    Ready {
        #[serde(default)]
        resumed: bool,
        session_id: SessionId,
    },
    Stats(Stats),
    #[serde(rename_all = "camelCase")]
    PlayerUpdate { guild_id: GuildId, state: PlayerState },
    Event(NodeEvent),
    /// Ops this client doesn't know about.
    #[serde(other)]
    Unknown,
}

impl IncomingMessage {
    pub fn parse(text: &str) -> serde_json::Result<Self> {
        serde_json::from_str(text)
    }
}
