pub mod bus;
pub mod dispatcher;

pub use bus::EventBus;
pub use dispatcher::{DispatchOutcome, Dispatcher};

use crate::{
    common::types::{GuildId, SessionId},
    player::PlayerSnapshot,
    protocol::{Track, TrackEndReason, TrackException},
};

/// Domain events published to subscribers of the client.
///
/// Player events carry the originating node, the guild and a snapshot of the
/// player taken after the event was applied.
#[derive(Debug, Clone)]
pub enum ClientEvent {
    TrackStart {
        node: String,
        guild_id: GuildId,
        player: PlayerSnapshot,
        track: Track,
    },
    TrackEnd {
        node: String,
        guild_id: GuildId,
        player: PlayerSnapshot,
        track: Track,
        reason: TrackEndReason,
    },
    TrackException {
        node: String,
        guild_id: GuildId,
        player: PlayerSnapshot,
        track: Track,
        exception: TrackException,
    },
    TrackStuck {
        node: String,
        guild_id: GuildId,
        player: PlayerSnapshot,
        track: Track,
        threshold_ms: u64,
    },
    /// The node's voice connection for this guild was closed by Discord.
    WebSocketClosed {
        node: String,
        guild_id: GuildId,
        player: PlayerSnapshot,
        code: u16,
        reason: String,
        by_remote: bool,
    },
    NodeConnected {
        node: String,
        session_id: SessionId,
        resumed: bool,
    },
    NodeDisconnected {
        node: String,
    },
}

impl ClientEvent {
    pub fn node(&self) -> &str {
        match self {
            Self::TrackStart { node, .. }
            | Self::TrackEnd { node, .. }
            | Self::TrackException { node, .. }
            | Self::TrackStuck { node, .. }
            | Self::WebSocketClosed { node, .. }
            | Self::NodeConnected { node, .. }
            | Self::NodeDisconnected { node } => node,
        }
    }

    pub fn guild_id(&self) -> Option<&GuildId> {
        match self {
            Self::TrackStart { guild_id, .. }
            | Self::TrackEnd { guild_id, .. }
            | Self::TrackException { guild_id, .. }
            | Self::TrackStuck { guild_id, .. }
            | Self::WebSocketClosed { guild_id, .. } => Some(guild_id),
            Self::NodeConnected { .. } | Self::NodeDisconnected { .. } => None,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::TrackStart { .. } => "TrackStart",
            Self::TrackEnd { .. } => "TrackEnd",
            Self::TrackException { .. } => "TrackException",
            Self::TrackStuck { .. } => "TrackStuck",
            Self::WebSocketClosed { .. } => "WebSocketClosed",
            Self::NodeConnected { .. } => "NodeConnected",
            Self::NodeDisconnected { .. } => "NodeDisconnected",
        }
    }
}
