use serde::Deserialize;

use crate::{common::types::GuildId, protocol::tracks::Track};

/// Events pushed by a node inside an `event` frame.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type")]
pub enum NodeEvent {
    #[serde(rename = "TrackStartEvent", rename_all = "camelCase")]
    TrackStart { guild_id: GuildId, track: Track },

    #[serde(rename = "TrackEndEvent", rename_all = "camelCase")]
    TrackEnd {
        guild_id: GuildId,
        track: Track,
        reason: TrackEndReason,
    },

    #[serde(rename = "TrackExceptionEvent", rename_all = "camelCase")]
    TrackException {
        guild_id: GuildId,
        track: Track,
        exception: TrackException,
    },

    #[serde(rename = "TrackStuckEvent", rename_all = "camelCase")]
    TrackStuck {
        guild_id: GuildId,
        track: Track,
        threshold_ms: u64,
    },

    #[serde(rename = "WebSocketClosedEvent", rename_all = "camelCase")]
    WebSocketClosed {
        guild_id: GuildId,
        code: u16,
        reason: String,
        by_remote: bool,
    },

    /// Plugin or future event types.
    #[serde(other)]
    Unknown,
}

impl NodeEvent {
    pub fn guild_id(&self) -> Option<&GuildId> {
        match self {
            Self::TrackStart { guild_id, .. }
            | Self::TrackEnd { guild_id, .. }
            | Self::TrackException { guild_id, .. }
            | Self::TrackStuck { guild_id, .. }
            | Self::WebSocketClosed { guild_id, .. } => Some(guild_id),
            Self::Unknown => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TrackEndReason {
    Finished,
    LoadFailed,
    Stopped,
    Replaced,
    Cleanup,
    /// A reason this client does not know yet. Treated like `finished`.
    #[serde(other)]
    Unknown,
}

impl TrackEndReason {
    /// Whether the queue should move on after a track ended this way.
    pub fn may_start_next(self) -> bool {
        !matches!(self, Self::Replaced)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackException {
    pub message: Option<String>,
    pub severity: crate::common::Severity,
    #[serde(default)]
    pub cause: String,
    #[serde(default)]
    pub cause_stack_trace: Option<String>,
}
